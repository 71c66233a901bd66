use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderStatus, PaymentStatus};

/// Process-local order store. Used for local runs and tests.
///
/// Reads and writes can be switched to fail independently, to exercise the
/// persistence error paths.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.check_writes()?;
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.check_reads()?;
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_for_owner(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
        self.check_reads()?;
        Ok(self
            .orders
            .read()
            .await
            .get(&id)
            .filter(|order| order.is_owned_by(user_id))
            .cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        order.status = status;
        order.error_message = error_message;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_payment_status(&self, id: Uuid, payment_status: PaymentStatus) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        order.payment_status = payment_status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reads()
    }
}

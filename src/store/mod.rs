// ============================================================================
// Order Store - the single source of truth
// ============================================================================
//
// Every write is its own operation. Callers that need several fields changed
// (status, then payment status) issue several writes; concurrent readers can
// observe the intermediate state.
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus, PaymentStatus};

pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Order {0} does not exist")]
    NotFound(Uuid),

    #[error("Stored order {id} is unreadable: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Unscoped lookup, for the worker.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Lookup filtered by owner. An order belonging to someone else is `None`.
    async fn find_for_owner(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Set the status, and the error message alongside it (`None` clears it).
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        error_message: Option<String>,
    ) -> Result<(), StoreError>;

    async fn update_payment_status(&self, id: Uuid, payment_status: PaymentStatus) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

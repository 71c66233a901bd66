use std::sync::Arc;

use crate::auth::Principal;
use crate::cache::OrderCache;
use crate::domain::order::{Order, OrderError, OrderItem, OrderJob, ShippingAddress};
use crate::messaging::WorkQueue;
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("Failed to persist order: {0}")]
    Persistence(#[from] StoreError),
}

// ============================================================================
// Order Producer
// ============================================================================
//
// create → persist → enqueue → cache-warm
//
// Only building the order and the persist step can fail the call. If the enqueue fails after a
// successful persist the order stays pending with no job behind it; that is
// logged and counted (orders_orphaned_total), not repaired here.
//
// ============================================================================

pub struct OrderProducer {
    store: Arc<dyn OrderStore>,
    queue: Arc<dyn WorkQueue>,
    cache: Arc<dyn OrderCache>,
    metrics: Arc<Metrics>,
}

impl OrderProducer {
    pub fn new(
        store: Arc<dyn OrderStore>,
        queue: Arc<dyn WorkQueue>,
        cache: Arc<dyn OrderCache>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            queue,
            cache,
            metrics,
        }
    }

    /// Create a pending order for `owner`. Input is assumed validated.
    pub async fn create(
        &self,
        owner: &Principal,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> Result<Order, ProducerError> {
        let order = Order::new(owner.user_id, items, shipping_address)?;

        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            item_count = order.items.len(),
            total_amount = %order.total_amount,
            "Creating new order"
        );

        self.store.insert(&order).await.map_err(|e| {
            tracing::error!(order_id = %order.id, error = %e, "Failed to persist order");
            e
        })?;
        self.metrics.orders_created.inc();

        let job = OrderJob::for_order(&order, owner.email.clone());
        match self.queue.enqueue(&job).await {
            Ok(message_id) => {
                tracing::info!(
                    order_id = %order.id,
                    message_id = %message_id,
                    "📤 Enqueued order for processing"
                );
            }
            Err(e) => {
                self.metrics.orders_orphaned.inc();
                tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    "Order persisted but processing job could not be enqueued; order stays pending"
                );
            }
        }

        if let Err(e) = self.cache.set(&order).await {
            self.metrics.record_cache_write_failure("warm");
            tracing::warn!(order_id = %order.id, error = %e, "Failed to warm order cache");
        }

        Ok(order)
    }
}

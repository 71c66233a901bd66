use std::sync::Arc;
use uuid::Uuid;

use crate::cache::OrderCache;
use crate::domain::order::Order;
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Missing, or owned by someone else. The two are indistinguishable.
    #[error("Order not found")]
    NotFound,

    #[error("Failed to read order: {0}")]
    Persistence(#[from] StoreError),
}

/// Cache-aside reads scoped to the requesting owner.
pub struct OrderReader {
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    metrics: Arc<Metrics>,
}

impl OrderReader {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<dyn OrderCache>, metrics: Arc<Metrics>) -> Self {
        Self { store, cache, metrics }
    }

    pub async fn get(&self, owner_id: Uuid, order_id: Uuid) -> Result<Order, ReadError> {
        match self.cache.get(order_id).await {
            Ok(Some(order)) if order.is_owned_by(owner_id) => {
                self.metrics.record_cache_lookup("hit");
                tracing::debug!(order_id = %order_id, "Order served from cache");
                return Ok(order);
            }
            Ok(Some(_)) => {
                // Someone else's order: answer exactly as for a missing one
                self.metrics.record_cache_lookup("hit");
                tracing::debug!(order_id = %order_id, "Cached order belongs to another user");
                return Err(ReadError::NotFound);
            }
            Ok(None) => self.metrics.record_cache_lookup("miss"),
            Err(e) => {
                self.metrics.record_cache_lookup("error");
                tracing::warn!(order_id = %order_id, error = %e, "Cache lookup failed, falling back to store");
            }
        }

        let order = self
            .store
            .find_for_owner(order_id, owner_id)
            .await?
            .ok_or(ReadError::NotFound)?;

        if let Err(e) = self.cache.set(&order).await {
            self.metrics.record_cache_write_failure("populate");
            tracing::warn!(order_id = %order_id, error = %e, "Failed to populate order cache");
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryOrderCache;
    use crate::domain::order::{OrderItem, OrderStatus, ShippingAddress};
    use crate::store::InMemoryOrderStore;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<InMemoryOrderStore>,
        cache: Arc<InMemoryOrderCache>,
        reader: OrderReader,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryOrderStore::new());
        let cache = Arc::new(InMemoryOrderCache::default());
        let reader = OrderReader::new(store.clone(), cache.clone(), Arc::new(Metrics::new().unwrap()));
        Fixture { store, cache, reader }
    }

    fn order(owner: Uuid) -> Order {
        Order::new(
            owner,
            vec![OrderItem {
                product_id: "P1".into(),
                name: "Widget".into(),
                quantity: 1,
                price: Decimal::new(1999, 2),
            }],
            ShippingAddress {
                street: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                zip_code: "62701".into(),
                country: "US".into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_miss_reads_store_and_populates_cache() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let order = order(owner);
        f.store.insert(&order).await.unwrap();

        let found = f.reader.get(owner, order.id).await.unwrap();

        assert_eq!(found, order);
        assert!(f.cache.contains(order.id).await);
    }

    #[tokio::test]
    async fn test_hit_does_not_touch_store() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let order = order(owner);
        f.store.insert(&order).await.unwrap();
        f.cache.set(&order).await.unwrap();
        f.store.set_fail_reads(true);

        let found = f.reader.get(owner, order.id).await.unwrap();
        assert_eq!(found, order);
    }

    #[tokio::test]
    async fn test_stale_snapshot_served_within_ttl() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let order = order(owner);
        f.store.insert(&order).await.unwrap();
        f.cache.set(&order).await.unwrap();

        f.store.update_status(order.id, OrderStatus::Processing, None).await.unwrap();

        let found = f.reader.get(owner, order.id).await.unwrap();
        assert_eq!(found.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_foreign_owner_gets_not_found_from_store() {
        let f = fixture();
        let order = order(Uuid::new_v4());
        f.store.insert(&order).await.unwrap();

        let result = f.reader.get(Uuid::new_v4(), order.id).await;
        assert!(matches!(result, Err(ReadError::NotFound)));
        assert!(!f.cache.contains(order.id).await);
    }

    #[tokio::test]
    async fn test_foreign_owner_gets_not_found_from_cache() {
        let f = fixture();
        let order = order(Uuid::new_v4());
        f.cache.set(&order).await.unwrap();

        let result = f.reader.get(Uuid::new_v4(), order.id).await;
        assert!(matches!(result, Err(ReadError::NotFound)));
    }

    #[tokio::test]
    async fn test_missing_order() {
        let f = fixture();
        let result = f.reader.get(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(ReadError::NotFound)));
    }

    #[tokio::test]
    async fn test_cache_outage_falls_back_to_store() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let order = order(owner);
        f.store.insert(&order).await.unwrap();
        f.cache.set_unavailable(true);

        assert_eq!(f.reader.get(owner, order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_store_outage_on_miss_is_persistence_error() {
        let f = fixture();
        f.store.set_fail_reads(true);

        let result = f.reader.get(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(ReadError::Persistence(_))));
    }
}

// ============================================================================
// Order Cache - ephemeral read-through snapshots
// ============================================================================
//
// Key:   order:<id>
// Value: JSON-serialized Order
// TTL:   fixed per write, 600s unless the caller says otherwise
//
// The cache is never a source of truth. Callers log and swallow every
// CacheError; nothing here may fail a request or a job.
//
// ============================================================================

mod memory;
mod redis;

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::order::Order;

pub use self::memory::InMemoryOrderCache;
pub use self::redis::RedisOrderCache;

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

pub fn cache_key(order_id: Uuid) -> String {
    format!("order:{order_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderCache: Send + Sync {
    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, CacheError>;

    async fn set_with_ttl(&self, order: &Order, ttl: Duration) -> Result<(), CacheError>;

    async fn invalidate(&self, order_id: Uuid) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    fn default_ttl(&self) -> Duration {
        DEFAULT_TTL
    }

    async fn set(&self, order: &Order) -> Result<(), CacheError> {
        self.set_with_ttl(order, self.default_ttl()).await
    }
}

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::AsyncCommands;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{cache_key, CacheError, OrderCache};
use crate::domain::order::Order;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed snapshot cache (`SET order:<id> <json> EX <ttl>`).
///
/// The connection is opened on first use and then reused. Until Redis is
/// reachable every operation fails with `CacheError::Redis`.
pub struct RedisOrderCache {
    client: ::redis::Client,
    connection: OnceCell<ConnectionManager>,
    default_ttl: Duration,
}

impl RedisOrderCache {
    /// Connect now, failing if Redis cannot be reached.
    pub async fn connect(redis_url: &str, default_ttl: Duration) -> Result<Self, CacheError> {
        let cache = Self::lazy(redis_url, default_ttl)?;
        cache.connection().await?;

        tracing::info!(default_ttl_secs = default_ttl.as_secs(), "Connected to Redis");
        Ok(cache)
    }

    /// Build without connecting. Only an invalid URL fails here.
    pub fn lazy(redis_url: &str, default_ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            client: ::redis::Client::open(redis_url)?,
            connection: OnceCell::new(),
            default_ttl,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(1)
                    .set_connection_timeout(CONNECT_TIMEOUT);
                let connection = ConnectionManager::new_with_config(self.client.clone(), config).await?;
                tracing::info!("🔌 Redis connection established");
                Ok::<_, CacheError>(connection)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl OrderCache for RedisOrderCache {
    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(cache_key(order_id)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(order)?;
        let mut conn = self.connection().await?;

        // Redis rejects EX 0
        let _: () = conn
            .set_ex(cache_key(order.id), json, ttl.as_secs().max(1))
            .await?;

        tracing::debug!(order_id = %order.id, ttl_secs = ttl.as_secs(), "Cached order snapshot");
        Ok(())
    }

    async fn invalidate(&self, order_id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(cache_key(order_id)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthChecker, HealthStatus};
    use crate::store::InMemoryOrderStore;
    use std::sync::Arc;

    // Nothing listens on port 1
    const UNREACHABLE: &str = "redis://127.0.0.1:1";

    #[test]
    fn test_lazy_rejects_invalid_url() {
        assert!(RedisOrderCache::lazy("not a url", Duration::from_secs(60)).is_err());
    }

    #[tokio::test]
    async fn test_connect_fails_when_unreachable() {
        assert!(RedisOrderCache::connect(UNREACHABLE, Duration::from_secs(60)).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_cache_errors_and_degrades_health() {
        let cache = Arc::new(RedisOrderCache::lazy(UNREACHABLE, Duration::from_secs(60)).unwrap());

        assert!(matches!(cache.get(Uuid::new_v4()).await, Err(CacheError::Redis(_))));
        assert!(cache.invalidate(Uuid::new_v4()).await.is_err());
        assert!(cache.ping().await.is_err());

        let checker = HealthChecker::new("test", Arc::new(InMemoryOrderStore::new()), cache);
        assert!(matches!(checker.check().await.status, HealthStatus::Degraded(_)));
    }
}

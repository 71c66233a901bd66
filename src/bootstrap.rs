use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::cache::RedisOrderCache;
use crate::config::AppConfig;
use crate::messaging::PgWorkQueue;
use crate::store::PgOrderStore;
use crate::utils::{retry_with_backoff, RetryConfig};

/// Connected adapters shared by the API and the worker.
pub struct Backends {
    pub store: Arc<PgOrderStore>,
    pub cache: Arc<RedisOrderCache>,
    pub queue: Arc<PgWorkQueue>,
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<Backends> {
    let retry = RetryConfig::default().with_max_attempts(config.startup_retry_attempts);

    // === 1. PostgreSQL ===
    tracing::info!("Connecting to PostgreSQL...");
    let pool = retry_with_backoff("postgres_connect", &retry, |_| {
        PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
    })
    .await
    .context("failed to connect to PostgreSQL")?;

    let store = PgOrderStore::new(pool.clone());
    store.ensure_schema().await.context("failed to create orders table")?;

    let queue = PgWorkQueue::new(
        pool.clone(),
        config.queue_name.clone(),
        config.visibility_timeout(),
        config.poll_interval(),
    );
    queue.ensure_schema().await.context("failed to create queue table")?;
    tracing::info!(queue = %config.queue_name, "✅ PostgreSQL ready");

    // === 2. Redis ===
    tracing::info!("Connecting to Redis...");
    // An unreachable Redis degrades the cache instead of failing startup
    let cache = match retry_with_backoff("redis_connect", &retry, |_| {
        RedisOrderCache::connect(&config.redis_url, config.cache_ttl())
    })
    .await
    {
        Ok(cache) => {
            tracing::info!(ttl_secs = config.cache_ttl_secs, "✅ Redis ready");
            cache
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "⚠️  Redis unreachable, starting with a degraded cache; reads fall through to PostgreSQL"
            );
            RedisOrderCache::lazy(&config.redis_url, config.cache_ttl()).context("invalid Redis URL")?
        }
    };

    Ok(Backends {
        store: Arc::new(store),
        cache: Arc::new(cache),
        queue: Arc::new(queue),
    })
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::{cache_key, CacheError, OrderCache, DEFAULT_TTL};
use crate::domain::order::Order;

struct Entry {
    json: String,
    expires_at: Instant,
}

/// Process-local cache that keeps serialized snapshots with an expiry, the
/// same shape Redis holds. Expired entries are dropped lazily on read.
pub struct InMemoryOrderCache {
    entries: Mutex<HashMap<String, Entry>>,
    default_ttl: Duration,
    unavailable: AtomicBool,
}

impl Default for InMemoryOrderCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl InMemoryOrderCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every operation fail with `CacheError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn contains(&self, order_id: Uuid) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(&cache_key(order_id))
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("cache disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderCache for InMemoryOrderCache {
    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, CacheError> {
        self.check()?;
        let key = cache_key(order_id);
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(serde_json::from_str(&entry.json)?));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(&key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        let json = serde_json::to_string(order)?;
        self.entries.lock().await.insert(
            cache_key(order.id),
            Entry {
                json,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, order_id: Uuid) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().await.remove(&cache_key(order_id));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

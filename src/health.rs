use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::OrderCache;
use crate::messaging::WorkQueue;
use crate::store::OrderStore;

// ============================================================================
// Health Checks
// ============================================================================
//
// The store is required: if it is down the service is unhealthy. The cache
// is optional by nature, so a cache outage only degrades the service.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
}

/// Probes the components a process depends on.
#[derive(Clone)]
pub struct HealthChecker {
    service: &'static str,
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    queue: Option<Arc<dyn WorkQueue>>,
}

impl HealthChecker {
    pub fn new(service: &'static str, store: Arc<dyn OrderStore>, cache: Arc<dyn OrderCache>) -> Self {
        Self {
            service,
            store,
            cache,
            queue: None,
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub async fn check(&self) -> SystemHealth {
        let mut components = Vec::with_capacity(3);

        components.push(ComponentHealth::new(
            "store",
            match self.store.ping().await {
                Ok(()) => HealthStatus::Healthy,
                Err(e) => HealthStatus::Unhealthy(e.to_string()),
            },
        ));

        components.push(ComponentHealth::new(
            "cache",
            match self.cache.ping().await {
                Ok(()) => HealthStatus::Healthy,
                Err(e) => HealthStatus::Degraded(e.to_string()),
            },
        ));

        if let Some(queue) = &self.queue {
            components.push(ComponentHealth::new(
                "queue",
                match queue.ping().await {
                    Ok(()) => HealthStatus::Healthy,
                    Err(e) => HealthStatus::Unhealthy(e.to_string()),
                },
            ));
        }

        let status = overall_status(&components);
        SystemHealth { status, components }
    }
}

fn overall_status(components: &[ComponentHealth]) -> HealthStatus {
    let unhealthy: Vec<&str> = components
        .iter()
        .filter(|c| c.status.is_unhealthy())
        .map(|c| c.name.as_str())
        .collect();
    if !unhealthy.is_empty() {
        return HealthStatus::Unhealthy(format!("unhealthy: {}", unhealthy.join(", ")));
    }

    let degraded: Vec<&str> = components
        .iter()
        .filter(|c| !c.status.is_healthy())
        .map(|c| c.name.as_str())
        .collect();
    if !degraded.is_empty() {
        return HealthStatus::Degraded(format!("degraded: {}", degraded.join(", ")));
    }

    HealthStatus::Healthy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryOrderCache;
    use crate::store::InMemoryOrderStore;

    #[tokio::test]
    async fn test_all_healthy() {
        let checker = HealthChecker::new(
            "test",
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryOrderCache::default()),
        );
        assert_eq!(checker.check().await.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_cache_outage_degrades() {
        let cache = Arc::new(InMemoryOrderCache::default());
        cache.set_unavailable(true);
        let checker = HealthChecker::new("test", Arc::new(InMemoryOrderStore::new()), cache);

        let health = checker.check().await;
        assert!(matches!(health.status, HealthStatus::Degraded(_)));
    }

    #[tokio::test]
    async fn test_store_outage_is_unhealthy() {
        let store = Arc::new(InMemoryOrderStore::new());
        store.set_fail_reads(true);
        let cache = Arc::new(InMemoryOrderCache::default());
        cache.set_unavailable(true);
        let checker = HealthChecker::new("test", store, cache);

        let health = checker.check().await;
        assert_eq!(
            health.status,
            HealthStatus::Unhealthy("unhealthy: store".to_string())
        );
    }
}

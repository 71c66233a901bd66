use async_trait::async_trait;
use std::time::Duration;

use crate::domain::order::Order;

/// Why the fulfillment step did not succeed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessingError {
    /// The order itself cannot be fulfilled.
    #[error("{0}")]
    Rejected(String),

    /// A dependency of the fulfillment step failed.
    #[error("{0}")]
    Unavailable(String),
}

/// The business effect applied to a claimed order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderProcessor: Send + Sync {
    async fn process(&self, order: &Order) -> Result<(), ProcessingError>;
}

/// Stand-in fulfillment: waits a fixed delay and succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedFulfillment {
    delay: Duration,
}

impl SimulatedFulfillment {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl OrderProcessor for SimulatedFulfillment {
    async fn process(&self, order: &Order) -> Result<(), ProcessingError> {
        tracing::debug!(
            order_id = %order.id,
            delay_ms = self.delay.as_millis() as u64,
            "Simulating fulfillment"
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

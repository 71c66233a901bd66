pub mod processing;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::cache::OrderCache;
use crate::config::AppConfig;
use crate::domain::order::{Order, OrderJob, OrderStatus, PaymentStatus};
use crate::messaging::{ReceivedMessage, WorkQueue};
use crate::metrics::Metrics;
use crate::notifier::Notifier;
use crate::store::OrderStore;

pub use processing::{OrderProcessor, ProcessingError, SimulatedFulfillment};

// ============================================================================
// Order Worker - queue consumer driving the status state machine
// ============================================================================
//
// Per message:
// 1. Decode the job and load the order. Undecodable or unknown → discard.
//    Terminal order (a redelivery) → skip, no mutation.
// 2. processing  → store, cache
// 3. Run the processing effect
// 4. processed   → store; payment completed → store; cache; notify
// 5. On any failure after the lookup: failed + reason → store, cache
// 6. Delete the message. Always.
//
// The visibility window is the only exclusion between worker instances.
// Writes inside a job are sequential and not atomic.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub batch_size: usize,
    pub wait_time: Duration,
    pub backoff: Duration,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size(),
            wait_time: config.wait_time(),
            backoff: config.backoff(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            wait_time: Duration::from_secs(20),
            backoff: Duration::from_secs(5),
        }
    }
}

/// What happened to one message. The message is deleted in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded,
    /// The failure was recorded on the order.
    Failed(String),
    /// The failure could not be recorded on the order.
    TransientError(String),
    /// Redelivery for an order already in a terminal state.
    Skipped,
    /// Undecodable payload or unknown order.
    Discarded,
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed(_) => "failed",
            JobOutcome::TransientError(_) => "transient_error",
            JobOutcome::Skipped => "skipped",
            JobOutcome::Discarded => "discarded",
        }
    }
}

pub struct OrderWorker {
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    queue: Arc<dyn WorkQueue>,
    processor: Arc<dyn OrderProcessor>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
    config: WorkerConfig,
}

impl OrderWorker {
    pub fn new(
        store: Arc<dyn OrderStore>,
        cache: Arc<dyn OrderCache>,
        queue: Arc<dyn WorkQueue>,
        processor: Arc<dyn OrderProcessor>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            cache,
            queue,
            processor,
            notifier,
            metrics,
            config,
        }
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation abandons an in-flight `receive` (anything it would have
    /// claimed is redelivered) but never interrupts a batch already received.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            batch_size = self.config.batch_size,
            wait_time_secs = self.config.wait_time.as_secs(),
            "🚀 Order worker started"
        );

        while !shutdown.is_cancelled() {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.queue.receive(self.config.batch_size, self.config.wait_time) => received,
            };

            match received {
                Ok(messages) => {
                    if !messages.is_empty() {
                        tracing::debug!(count = messages.len(), "Received batch");
                    }
                    for message in messages {
                        self.process_message(message).await;
                    }
                }
                Err(e) => {
                    self.metrics.queue_receive_errors.inc();
                    tracing::error!(
                        error = %e,
                        backoff_ms = self.config.backoff.as_millis() as u64,
                        "Failed to receive from queue, backing off"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.backoff) => {}
                    }
                }
            }
        }

        tracing::info!("🛑 Order worker stopped");
    }

    /// Handle one delivery and acknowledge it.
    pub async fn process_message(&self, message: ReceivedMessage) -> JobOutcome {
        let started = Instant::now();

        let outcome = match message.job() {
            Ok(job) => self.handle(&job).await,
            Err(e) => {
                tracing::error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Undecodable job payload, discarding"
                );
                JobOutcome::Discarded
            }
        };

        if let Err(e) = self.queue.delete(message.receipt_handle).await {
            // The message will come back after the visibility window
            tracing::error!(
                message_id = %message.message_id,
                receipt_handle = %message.receipt_handle,
                error = %e,
                "Failed to delete message"
            );
        }

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.record_job(outcome.label(), elapsed);

        match &outcome {
            JobOutcome::Succeeded => tracing::info!(
                message_id = %message.message_id,
                duration_secs = elapsed,
                "✅ Job completed"
            ),
            JobOutcome::Failed(reason) | JobOutcome::TransientError(reason) => tracing::warn!(
                message_id = %message.message_id,
                outcome = outcome.label(),
                reason = %reason,
                receive_count = message.receive_count,
                "❌ Job did not complete"
            ),
            JobOutcome::Skipped | JobOutcome::Discarded => tracing::debug!(
                message_id = %message.message_id,
                outcome = outcome.label(),
                "Job acknowledged without processing"
            ),
        }

        outcome
    }

    pub async fn handle(&self, job: &OrderJob) -> JobOutcome {
        let mut order = match self.store.find_by_id(job.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(order_id = %job.order_id, "Order not found, discarding job");
                return JobOutcome::Discarded;
            }
            Err(e) => {
                tracing::error!(order_id = %job.order_id, error = %e, "Failed to load order");
                return JobOutcome::TransientError(e.to_string());
            }
        };

        if order.status.is_terminal() {
            tracing::info!(
                order_id = %order.id,
                status = %order.status,
                "Order already finished, acknowledging redelivery"
            );
            return JobOutcome::Skipped;
        }

        match self.fulfil(&mut order, job).await {
            Ok(()) => JobOutcome::Succeeded,
            Err(reason) => self.record_failure(&mut order, reason).await,
        }
    }

    async fn fulfil(&self, order: &mut Order, job: &OrderJob) -> Result<(), String> {
        order.begin_processing().map_err(|e| e.to_string())?;
        self.store
            .update_status(order.id, OrderStatus::Processing, None)
            .await
            .map_err(|e| e.to_string())?;
        self.refresh_cache(order).await;
        tracing::info!(order_id = %order.id, "⚙️  Processing order");

        self.processor.process(order).await.map_err(|e| e.to_string())?;

        let mut processed = order.clone();
        processed.mark_processed().map_err(|e| e.to_string())?;
        self.store
            .update_status(order.id, OrderStatus::Processed, None)
            .await
            .map_err(|e| e.to_string())?;
        *order = processed;
        self.store
            .update_payment_status(order.id, PaymentStatus::Completed)
            .await
            .map_err(|e| e.to_string())?;
        self.refresh_cache(order).await;

        if let Err(e) = self.notifier.notify(order, &job.user_email).await {
            self.metrics.notifier_failures.inc();
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send order confirmation");
        }

        Ok(())
    }

    async fn record_failure(&self, order: &mut Order, reason: String) -> JobOutcome {
        if let Err(e) = order.mark_failed(reason.clone()) {
            // Already processed; only a trailing write failed
            tracing::error!(order_id = %order.id, reason = %reason, error = %e, "Cannot mark order failed");
            return JobOutcome::TransientError(reason);
        }

        if let Err(e) = self
            .store
            .update_status(order.id, OrderStatus::Failed, Some(reason.clone()))
            .await
        {
            tracing::error!(order_id = %order.id, reason = %reason, error = %e, "Failed to record order failure");
            self.invalidate_cache(order).await;
            return JobOutcome::TransientError(reason);
        }
        self.refresh_cache(order).await;

        tracing::warn!(order_id = %order.id, reason = %reason, "Order marked failed");
        JobOutcome::Failed(reason)
    }

    async fn refresh_cache(&self, order: &Order) {
        if let Err(e) = self.cache.set(order).await {
            self.metrics.record_cache_write_failure("refresh");
            tracing::warn!(order_id = %order.id, error = %e, "Failed to refresh order cache");
            self.invalidate_cache(order).await;
        }
    }

    async fn invalidate_cache(&self, order: &Order) {
        if let Err(e) = self.cache.invalidate(order.id).await {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to invalidate order cache");
        }
    }
}

// ============================================================================
// Work Queue - at-least-once job delivery
// ============================================================================
//
// Contract shared by every implementation:
// - `receive` long-polls: it suspends up to `wait` for at least one visible
//   message, returns early once something arrives, and may return nothing.
// - A received message is hidden for the visibility window. If its receipt
//   handle is not deleted in time, it becomes visible and is delivered again
//   under a NEW receipt handle.
// - Deleting a stale handle is a no-op; it never removes a redelivered copy.
//
// Consumers must therefore tolerate the same job arriving more than once.
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::order::OrderJob;

pub use memory::InMemoryWorkQueue;
pub use postgres::PgWorkQueue;

/// Opaque token identifying one delivery of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub Uuid);

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivered message. The body is kept raw so that undecodable payloads can
/// still be acknowledged by the consumer.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: Uuid,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    /// How many times this message has been handed out, this delivery included
    pub receive_count: u32,
}

impl ReceivedMessage {
    pub fn job(&self) -> serde_json::Result<OrderJob> {
        OrderJob::from_payload(&self.body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue transport error: {0}")]
    Transport(#[from] sqlx::Error),

    #[error("Job serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Returns the broker-assigned message id.
    async fn enqueue(&self, job: &OrderJob) -> Result<Uuid, QueueError>;

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>, QueueError>;

    async fn delete(&self, receipt_handle: ReceiptHandle) -> Result<(), QueueError>;

    async fn ping(&self) -> Result<(), QueueError>;
}

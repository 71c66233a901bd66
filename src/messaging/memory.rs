use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

use super::{QueueError, ReceiptHandle, ReceivedMessage, WorkQueue};
use crate::domain::order::OrderJob;

struct QueuedMessage {
    id: Uuid,
    body: String,
    visible_at: Instant,
    receipt_handle: Option<ReceiptHandle>,
    receive_count: u32,
}

/// In-process queue with real visibility-window semantics.
///
/// Waiting receivers are woken on enqueue, and re-check when the earliest
/// hidden message is due to become visible again.
pub struct InMemoryWorkQueue {
    messages: Mutex<Vec<QueuedMessage>>,
    arrivals: Notify,
    visibility_timeout: Duration,
    failing_receives: AtomicU32,
    failing_enqueues: AtomicU32,
}

impl InMemoryWorkQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            arrivals: Notify::new(),
            visibility_timeout,
            failing_receives: AtomicU32::new(0),
            failing_enqueues: AtomicU32::new(0),
        }
    }

    /// Push a raw body, bypassing job serialization.
    pub async fn enqueue_raw(&self, body: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.messages.lock().await.push(QueuedMessage {
            id,
            body: body.into(),
            visible_at: Instant::now(),
            receipt_handle: None,
            receive_count: 0,
        });
        self.arrivals.notify_waiters();
        id
    }

    /// Make the next `count` receive calls fail with a transport error.
    pub fn fail_next_receives(&self, count: u32) {
        self.failing_receives.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_enqueues(&self, count: u32) {
        self.failing_enqueues.store(count, Ordering::SeqCst);
    }

    /// Messages not yet deleted, visible or in flight.
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Claim up to `max_messages` visible messages. When none are visible,
    /// returns the instant the next hidden one reappears, if any.
    async fn claim(&self, max_messages: usize) -> (Vec<ReceivedMessage>, Option<Instant>) {
        let now = Instant::now();
        let mut messages = self.messages.lock().await;
        let mut batch = Vec::new();

        for message in messages.iter_mut() {
            if batch.len() >= max_messages {
                break;
            }
            if message.visible_at > now {
                continue;
            }

            let receipt_handle = ReceiptHandle(Uuid::new_v4());
            message.visible_at = now + self.visibility_timeout;
            message.receipt_handle = Some(receipt_handle);
            message.receive_count += 1;

            batch.push(ReceivedMessage {
                message_id: message.id,
                receipt_handle,
                body: message.body.clone(),
                receive_count: message.receive_count,
            });
        }

        let next_visible = if batch.is_empty() {
            messages.iter().map(|m| m.visible_at).min()
        } else {
            None
        };

        (batch, next_visible)
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, job: &OrderJob) -> Result<Uuid, QueueError> {
        if Self::take_failure(&self.failing_enqueues) {
            return Err(QueueError::Unavailable("enqueue failure injected".into()));
        }
        let body = job.to_payload()?;
        Ok(self.enqueue_raw(body).await)
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>, QueueError> {
        if Self::take_failure(&self.failing_receives) {
            return Err(QueueError::Unavailable("receive failure injected".into()));
        }

        let deadline = Instant::now() + wait;

        loop {
            // Registered before checking, so an enqueue between the check and
            // the await still wakes us.
            let arrival = self.arrivals.notified();

            let (batch, next_visible) = self.claim(max_messages).await;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = next_visible.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = arrival => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, receipt_handle: ReceiptHandle) -> Result<(), QueueError> {
        let mut messages = self.messages.lock().await;
        let before = messages.len();
        messages.retain(|m| m.receipt_handle != Some(receipt_handle));

        if messages.len() == before {
            tracing::warn!(
                receipt_handle = %receipt_handle,
                "Receipt handle matched no message (expired or already deleted)"
            );
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

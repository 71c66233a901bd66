use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use super::{QueueError, ReceiptHandle, ReceivedMessage, WorkQueue};
use crate::domain::order::OrderJob;

// ============================================================================
// PostgreSQL table queue
// ============================================================================
//
// One row per message. `visible_at` is the visibility deadline: receiving a
// batch pushes it forward by the visibility timeout and stamps a fresh
// receipt handle, inside one statement, with SKIP LOCKED so concurrent
// workers never claim the same row. Because only pending rows are claimed,
// the long-poll is a short database poll repeated until the wait elapses.
//
// ============================================================================

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS queue_messages (
    id             UUID PRIMARY KEY,
    queue          TEXT NOT NULL,
    body           TEXT NOT NULL,
    enqueued_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    visible_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    receipt_handle UUID,
    receive_count  INTEGER NOT NULL DEFAULT 0
)";

const VISIBLE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS queue_messages_visible_idx ON queue_messages (queue, visible_at)";

const RECEIVE: &str = "WITH next AS (
    SELECT id FROM queue_messages
    WHERE queue = $1 AND visible_at <= now()
    ORDER BY enqueued_at
    LIMIT $2
    FOR UPDATE SKIP LOCKED
)
UPDATE queue_messages m
SET visible_at = now() + make_interval(secs => $3),
    receipt_handle = gen_random_uuid(),
    receive_count = m.receive_count + 1
FROM next
WHERE m.id = next.id
RETURNING m.id, m.body, m.receipt_handle, m.receive_count";

#[derive(sqlx::FromRow)]
struct DeliveredRow {
    id: Uuid,
    body: String,
    receipt_handle: Uuid,
    receive_count: i32,
}

#[derive(Clone)]
pub struct PgWorkQueue {
    pool: PgPool,
    queue: String,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl PgWorkQueue {
    pub fn new(
        pool: PgPool,
        queue: impl Into<String>,
        visibility_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pool,
            queue: queue.into(),
            visibility_timeout,
            poll_interval,
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), QueueError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query(VISIBLE_INDEX).execute(&self.pool).await?;
        tracing::info!(queue = %self.queue, "Work queue schema ready");
        Ok(())
    }

    async fn claim_batch(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, QueueError> {
        let rows: Vec<DeliveredRow> = sqlx::query_as(RECEIVE)
            .bind(&self.queue)
            .bind(max_messages as i64)
            .bind(self.visibility_timeout.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReceivedMessage {
                message_id: row.id,
                receipt_handle: ReceiptHandle(row.receipt_handle),
                body: row.body,
                receive_count: row.receive_count.max(0) as u32,
            })
            .collect())
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    async fn enqueue(&self, job: &OrderJob) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        let body = job.to_payload()?;

        sqlx::query("INSERT INTO queue_messages (id, queue, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&self.queue)
            .bind(body)
            .execute(&self.pool)
            .await?;

        tracing::debug!(message_id = %id, order_id = %job.order_id, "Enqueued order job");
        Ok(id)
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>, QueueError> {
        let deadline = Instant::now() + wait;

        loop {
            let batch = self.claim_batch(max_messages).await?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn delete(&self, receipt_handle: ReceiptHandle) -> Result<(), QueueError> {
        let result = sqlx::query("DELETE FROM queue_messages WHERE receipt_handle = $1")
            .bind(receipt_handle.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                receipt_handle = %receipt_handle,
                "Receipt handle matched no message (expired or already deleted)"
            );
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

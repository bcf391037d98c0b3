//! Producer side of the request channel.

use async_trait::async_trait;
use chrono::Utc;
use report_core::ReportRequest;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{QueueError, Result};
use crate::{partition_for, ReportEnqueuer};

/// Appends requests to a topic.
#[derive(Debug, Clone)]
pub struct RequestProducer {
    pool: SqlitePool,
    topic: String,
    partitions: u32,
}

impl RequestProducer {
    pub fn new(pool: SqlitePool, topic: impl Into<String>, partitions: u32) -> Self {
        Self {
            pool,
            topic: topic.into(),
            partitions,
        }
    }

    /// Append a request and return its sequence number.
    pub async fn send(&self, request: &ReportRequest) -> Result<i64> {
        let partition = partition_for(request.user_id, self.partitions);

        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queue_messages (topic, partition, payload, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING seq
            "#,
        )
        .bind(&self.topic)
        .bind(i64::from(partition))
        .bind(request.encode())
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| QueueError::from(e).context("enqueue report request"))?;

        debug!(
            user_id = %request.user_id,
            period = %request.period,
            partition,
            seq,
            "Enqueued report request"
        );

        Ok(seq)
    }

    /// Append raw bytes to a partition.
    pub async fn send_raw(&self, partition: u32, payload: &[u8]) -> Result<i64> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queue_messages (topic, partition, payload, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING seq
            "#,
        )
        .bind(&self.topic)
        .bind(i64::from(partition % self.partitions.max(1)))
        .bind(payload)
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| QueueError::from(e).context("enqueue raw message"))?;

        Ok(seq)
    }
}

#[async_trait]
impl ReportEnqueuer for RequestProducer {
    async fn enqueue(&self, request: &ReportRequest) -> Result<()> {
        self.send(request).await.map(|_| ())
    }
}

//! Consumer side of the request channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{QueueError, Result};
use crate::RequestSource;

/// A message claimed from a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub seq: i64,
    pub partition: u32,
    pub payload: Vec<u8>,
}

/// One member of a consumer group.
///
/// Partitions are assigned statically: member `i` of `n` owns every
/// partition `p` with `p % n == i`. Members never share a partition, so
/// within a group each message is handled by exactly one member.
#[derive(Debug, Clone)]
pub struct RequestConsumer {
    pool: SqlitePool,
    topic: String,
    group: String,
    assigned: Vec<u32>,
    /// Partition the next claim starts from.
    cursor: Arc<AtomicUsize>,
}

impl RequestConsumer {
    pub fn new(
        pool: SqlitePool,
        topic: impl Into<String>,
        group: impl Into<String>,
        partitions: u32,
        member: u32,
        members: u32,
    ) -> Result<Self> {
        if partitions == 0 {
            return Err(QueueError::NoPartitions);
        }
        if members == 0 || member >= members {
            return Err(QueueError::InvalidMember {
                index: member,
                count: members,
            });
        }

        let assigned = (0..partitions).filter(|p| p % members == member).collect();

        Ok(Self {
            pool,
            topic: topic.into(),
            group: group.into(),
            assigned,
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Partitions owned by this member. Empty when the group has more
    /// members than the topic has partitions.
    pub fn assigned(&self) -> &[u32] {
        &self.assigned
    }

    /// Last acknowledged sequence number in a partition, 0 if none.
    pub async fn committed(&self, partition: u32) -> Result<i64> {
        let committed: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT committed
            FROM queue_offsets
            WHERE consumer_group = ? AND topic = ? AND partition = ?
            "#,
        )
        .bind(&self.group)
        .bind(&self.topic)
        .bind(i64::from(partition))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QueueError::from(e).context("read committed offset"))?;

        Ok(committed.unwrap_or(0))
    }

    /// Fetch up to `max` unacknowledged messages from the owned partitions,
    /// oldest first within each partition.
    ///
    /// Each claim starts one partition further along than the last, so a
    /// busy partition cannot hold the whole batch forever. Unacknowledged
    /// messages come back on later claims.
    pub async fn claim(&self, max: usize) -> Result<Vec<QueuedMessage>> {
        let mut claimed = Vec::new();
        if self.assigned.is_empty() {
            return Ok(claimed);
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % self.assigned.len();
        let (tail, head) = self.assigned.split_at(start);

        for &partition in head.iter().chain(tail) {
            let remaining = max.saturating_sub(claimed.len());
            if remaining == 0 {
                break;
            }

            let committed = self.committed(partition).await?;
            let rows: Vec<(i64, Vec<u8>)> = sqlx::query_as(
                r#"
                SELECT seq, payload
                FROM queue_messages
                WHERE topic = ? AND partition = ? AND seq > ?
                ORDER BY seq
                LIMIT ?
                "#,
            )
            .bind(&self.topic)
            .bind(i64::from(partition))
            .bind(committed)
            .bind(remaining as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueueError::from(e).context("claim messages"))?;

            claimed.extend(rows.into_iter().map(|(seq, payload)| QueuedMessage {
                seq,
                partition,
                payload,
            }));
        }

        if !claimed.is_empty() {
            debug!(group = %self.group, count = claimed.len(), "Claimed messages");
        }

        Ok(claimed)
    }

    /// Commit the offset of a processed message.
    ///
    /// Offsets only move forward; acknowledging an older message is a no-op.
    pub async fn ack(&self, message: &QueuedMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queue_offsets (consumer_group, topic, partition, committed)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(consumer_group, topic, partition) DO UPDATE SET
                committed = MAX(committed, excluded.committed)
            "#,
        )
        .bind(&self.group)
        .bind(&self.topic)
        .bind(i64::from(message.partition))
        .bind(message.seq)
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::from(e).context("acknowledge message"))?;

        Ok(())
    }

    /// Number of messages not yet acknowledged across owned partitions.
    pub async fn lag(&self) -> Result<i64> {
        let mut lag = 0;
        for &partition in &self.assigned {
            let committed = self.committed(partition).await?;
            let pending: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM queue_messages
                WHERE topic = ? AND partition = ? AND seq > ?
                "#,
            )
            .bind(&self.topic)
            .bind(i64::from(partition))
            .bind(committed)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| QueueError::from(e).context("measure lag"))?;
            lag += pending;
        }
        Ok(lag)
    }
}

#[async_trait]
impl RequestSource for RequestConsumer {
    async fn claim(&self, max: usize) -> Result<Vec<QueuedMessage>> {
        RequestConsumer::claim(self, max).await
    }

    async fn ack(&self, message: &QueuedMessage) -> Result<()> {
        RequestConsumer::ack(self, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn members_split_partitions() {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let first = RequestConsumer::new(pool.clone(), "t", "g", 5, 0, 2).unwrap();
        let second = RequestConsumer::new(pool.clone(), "t", "g", 5, 1, 2).unwrap();

        assert_eq!(first.assigned(), &[0, 2, 4]);
        assert_eq!(second.assigned(), &[1, 3]);
    }

    #[tokio::test]
    async fn member_outside_group_is_rejected() {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let err = RequestConsumer::new(pool, "t", "g", 4, 2, 2).unwrap_err();
        assert!(matches!(err, QueueError::InvalidMember { index: 2, count: 2 }));
    }
}

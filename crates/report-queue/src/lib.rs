//! Durable request channel for report builds.
//!
//! Messages are appended to a SQLite log, partitioned by user id so that one
//! user's requests stay in order. Consumer groups track a committed offset
//! per partition; every group sees every message, and members of one group
//! split the partitions between them.
//!
//! # Example
//!
//! ```no_run
//! use report_core::{ReportPeriod, ReportRequest, UserId};
//! use report_queue::{ReportEnqueuer, RequestSource, SqliteQueue};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = SqliteQueue::connect("sqlite:reports-queue.db?mode=rwc", 4).await?;
//!
//!     queue
//!         .producer()
//!         .enqueue(&ReportRequest::new(UserId(42), ReportPeriod::Month))
//!         .await?;
//!
//!     let consumer = queue.consumer("reporter", 0, 1)?;
//!     for message in consumer.claim(16).await? {
//!         // build and deliver, then:
//!         consumer.ack(&message).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod consumer;
pub mod error;
pub mod producer;

pub use consumer::{QueuedMessage, RequestConsumer};
pub use error::{QueueError, Result};
pub use producer::RequestProducer;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use report_core::{ReportRequest, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Topic carrying report build requests.
pub const REPORT_TOPIC: &str = "report-requests";

/// Publishes report requests.
#[async_trait]
pub trait ReportEnqueuer: Send + Sync {
    /// Append one request. Returns once the message is durable.
    async fn enqueue(&self, request: &ReportRequest) -> Result<()>;
}

/// Source of claimed request messages for one consumer.
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Fetch up to `max` messages past the committed offsets.
    async fn claim(&self, max: usize) -> Result<Vec<QueuedMessage>>;

    /// Mark a message consumed.
    async fn ack(&self, message: &QueuedMessage) -> Result<()>;
}

/// Partition for a user's requests.
pub fn partition_for(user_id: UserId, partitions: u32) -> u32 {
    // rem_euclid keeps negative ids in range
    user_id.get().rem_euclid(i64::from(partitions.max(1))) as u32
}

/// Handle to the queue database.
#[derive(Debug, Clone)]
pub struct SqliteQueue {
    pool: SqlitePool,
    partitions: u32,
}

impl SqliteQueue {
    /// Open (or create) the queue database.
    pub async fn connect(url: &str, partitions: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::info!("Connected to report queue: {} ({} partitions)", url, partitions);

        Self::with_pool(pool, partitions).await
    }

    /// Use an existing pool, creating the queue tables if needed.
    pub async fn with_pool(pool: SqlitePool, partitions: u32) -> Result<Self> {
        if partitions == 0 {
            return Err(QueueError::NoPartitions);
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                partition INTEGER NOT NULL,
                payload BLOB NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| QueueError::from(e).context("create queue tables"))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_queue_messages_partition
            ON queue_messages (topic, partition, seq)
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| QueueError::from(e).context("create queue tables"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_offsets (
                consumer_group TEXT NOT NULL,
                topic TEXT NOT NULL,
                partition INTEGER NOT NULL,
                committed INTEGER NOT NULL,
                PRIMARY KEY (consumer_group, topic, partition)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| QueueError::from(e).context("create queue tables"))?;

        Ok(Self { pool, partitions })
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Producer for the report topic.
    pub fn producer(&self) -> RequestProducer {
        RequestProducer::new(self.pool.clone(), REPORT_TOPIC, self.partitions)
    }

    /// Consumer `member` of `members` in `group`.
    pub fn consumer(&self, group: &str, member: u32, members: u32) -> Result<RequestConsumer> {
        RequestConsumer::new(
            self.pool.clone(),
            REPORT_TOPIC,
            group,
            self.partitions,
            member,
            members,
        )
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

//! Error types for the request channel.

use thiserror::Error;

/// Errors that can occur on the request channel.
#[derive(Debug, Error)]
pub enum QueueError {
    /// SQLx error (connection, query, etc.)
    #[error("queue database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A topic needs at least one partition.
    #[error("topic must have at least one partition")]
    NoPartitions,

    /// A consumer's member index is outside its group.
    #[error("member {index} is outside a group of {count}")]
    InvalidMember { index: u32, count: u32 },

    /// An error wrapped with the name of the queue operation.
    #[error("{op}: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: Box<QueueError>,
    },
}

impl QueueError {
    pub fn context(self, op: &'static str) -> Self {
        QueueError::Operation {
            op,
            source: Box::new(self),
        }
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

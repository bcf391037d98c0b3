//! Error types for report delivery.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when delivering or accepting reports.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The front end did not answer in time.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The front end answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The front end refused the report.
    #[error("report rejected: {0}")]
    Rejected(String),

    /// Acceptor server I/O failed.
    #[error("acceptor I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

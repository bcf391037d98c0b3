//! Error types for report operations.

use thiserror::Error;

/// Errors that can occur while decoding or building reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The period token is not one of the known periods.
    #[error("report period {0:?} is not supported")]
    UnknownPeriod(String),

    /// A request payload could not be decoded.
    #[error("decode report request: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A result payload could not be (de)serialized.
    #[error("report result json: {0}")]
    Json(#[from] serde_json::Error),

    /// A category sum or the total does not fit in an `f64`.
    #[error("report sum for {0} is out of range")]
    OutOfRange(String),

    /// A ledger read failed.
    #[error("generate report: {0}")]
    Ledger(#[from] ledger::LedgerError),
}

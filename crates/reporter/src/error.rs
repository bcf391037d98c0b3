//! Error types for the report worker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("ledger: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("queue: {0}")]
    Queue(#[from] report_queue::QueueError),

    #[error("delivery: {0}")]
    Delivery(#[from] report_delivery::DeliveryError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ReporterError>;

//! Error types for the finance bot.

use thiserror::Error;

use crate::rates::RatesError;

/// Errors that can occur in the front end.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("ledger: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("cache: {0}")]
    Cache(#[from] report_cache::CacheError),

    #[error("queue: {0}")]
    Queue(#[from] report_queue::QueueError),

    #[error("chat: {0}")]
    Chat(#[from] chat_client::ChatError),

    #[error("delivery: {0}")]
    Delivery(#[from] report_delivery::DeliveryError),

    #[error("rates: {0}")]
    Rates(#[from] RatesError),

    #[error("update stream ended")]
    StreamEnded,
}

/// A failed command, carrying the cushioned reply for the user.
#[derive(Debug, Error)]
#[error("{op}: {source}")]
pub struct HandlerError {
    /// Name of the failing handler, for logs.
    pub op: &'static str,
    /// Text shown to the user after the apology prefix.
    pub reply: &'static str,
    #[source]
    pub source: BotError,
}

impl HandlerError {
    /// Whether the failure is the user's monthly limit rather than an outage.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(&self.source, BotError::Ledger(e) if e.is_limit_exceeded())
    }
}

/// Attach a handler name and user reply to a failed call.
pub trait ReplyOnError<T> {
    fn or_reply(self, op: &'static str, reply: &'static str) -> Result<T, HandlerError>;
}

impl<T, E: Into<BotError>> ReplyOnError<T> for Result<T, E> {
    fn or_reply(self, op: &'static str, reply: &'static str) -> Result<T, HandlerError> {
        self.map_err(|e| HandlerError {
            op,
            reply,
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::{LedgerError, UserId};

    #[test]
    fn limit_errors_are_recognised_through_context() {
        let err: Result<(), _> =
            Err(LedgerError::LimitExceeded { user_id: UserId(1) }.context("save expense"));
        let handler_err = err.or_reply("handle expense", "nope").unwrap_err();

        assert!(handler_err.is_limit_exceeded());
        assert_eq!(
            handler_err.to_string(),
            "handle expense: ledger: save expense: monthly limit exceeded for user 1"
        );
    }
}

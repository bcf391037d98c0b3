//! Ledger error types.

use thiserror::Error;

use crate::models::UserId;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The expense would push the user over their monthly limit.
    #[error("monthly limit exceeded for user {user_id}")]
    LimitExceeded { user_id: UserId },

    /// No rate row exists for the currency.
    #[error("rate {code} not found")]
    RateNotFound { code: String },

    /// The currency is registered but has not been pulled yet.
    #[error("rate {code} is not set yet")]
    RateNotPopulated { code: String },

    /// An error wrapped with the name of the operation that produced it.
    #[error("{op}: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    /// Wrap this error with the name of the failing operation.
    pub fn context(self, op: &'static str) -> Self {
        LedgerError::Operation {
            op,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all operation context stripped.
    pub fn root(&self) -> &LedgerError {
        match self {
            LedgerError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error is (or wraps) a monthly limit violation.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self.root(), LedgerError::LimitExceeded { .. })
    }

    /// Whether this error is (or wraps) a missing or unpopulated rate.
    pub fn is_rate_unavailable(&self) -> bool {
        matches!(
            self.root(),
            LedgerError::RateNotFound { .. } | LedgerError::RateNotPopulated { .. }
        )
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_domain_error_reachable() {
        let err = LedgerError::LimitExceeded {
            user_id: UserId(7),
        }
        .context("save expense");

        assert!(err.is_limit_exceeded());
        assert_eq!(
            err.to_string(),
            "save expense: monthly limit exceeded for user 7"
        );
    }

    #[test]
    fn rate_errors_are_classified() {
        let err = LedgerError::RateNotPopulated {
            code: "USD".to_string(),
        }
        .context("get rate");
        assert!(err.is_rate_unavailable());
        assert!(!err.is_limit_exceeded());
    }
}

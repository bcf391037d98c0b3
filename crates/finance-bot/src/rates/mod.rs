//! Currency rate refresh.
//!
//! [`RatesProvider`] fetches rates relative to the base currency;
//! [`RatePuller`] publishes them into the ledger periodically.

mod fixer;
mod puller;

pub use fixer::{FixerClient, FixerConfig, DEFAULT_FIXER_URL};
pub use puller::{init_rates, RatePuller};

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RatesError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rates API answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rates API reported failure: {0}")]
    Unsuccessful(String),

    #[error("unknown base currency {0}")]
    UnknownBase(String),

    #[error("ledger: {0}")]
    Ledger(#[from] ledger::LedgerError),
}

/// Source of exchange rates.
#[async_trait]
pub trait RatesProvider: Send + Sync {
    /// Units of each `symbols` currency per one unit of `base`.
    async fn latest(&self, base: &str, symbols: &[&str])
        -> Result<HashMap<String, f64>, RatesError>;
}

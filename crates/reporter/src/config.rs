//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use report_delivery::DEFAULT_DELIVERY_TIMEOUT;

/// Report worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ledger database URL.
    pub database_url: String,
    /// Request channel database URL.
    pub queue_url: String,
    pub base_currency: String,
    /// Front-end report acceptor.
    pub acceptor_url: String,
    pub consumer_group: String,
    /// Worker tasks started by this process.
    pub consumers: u32,
    pub queue_partitions: u32,
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub delivery_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DATABASE_URL` | Ledger database | `sqlite:finance.db?mode=rwc` |
    /// | `QUEUE_URL` | Request channel database | `sqlite:reports-queue.db?mode=rwc` |
    /// | `BASE_CURRENCY` | Currency for users without a preference | `RUB` |
    /// | `ACCEPTOR_URL` | Front-end report acceptor | `http://127.0.0.1:8080` |
    /// | `CONSUMER_GROUP` | Consumer group name | `reporter` |
    /// | `CONSUMERS` | Worker tasks in this process | `1` |
    /// | `QUEUE_PARTITIONS` | Request channel partitions | `4` |
    /// | `BATCH_SIZE` | Messages claimed per cycle | `16` |
    /// | `POLL_INTERVAL_MS` | Wait after an empty claim | `500` |
    /// | `DELIVERY_TIMEOUT_SECS` | Result delivery timeout | `5` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_currency = var("BASE_CURRENCY")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "RUB".to_string());
        if !ledger::is_supported_currency(&base_currency) {
            return Err(ConfigError::UnknownCurrency(base_currency));
        }

        let consumers = positive(var("CONSUMERS"), "CONSUMERS", 1u32)?;
        let queue_partitions = positive(var("QUEUE_PARTITIONS"), "QUEUE_PARTITIONS", 4u32)?;
        let batch_size = positive(var("BATCH_SIZE"), "BATCH_SIZE", 16usize)?;
        let poll_ms = positive(var("POLL_INTERVAL_MS"), "POLL_INTERVAL_MS", 500u64)?;
        let timeout_secs = positive(
            var("DELIVERY_TIMEOUT_SECS"),
            "DELIVERY_TIMEOUT_SECS",
            DEFAULT_DELIVERY_TIMEOUT.as_secs(),
        )?;

        Ok(Self {
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:finance.db?mode=rwc".to_string()),
            queue_url: var("QUEUE_URL")
                .unwrap_or_else(|| "sqlite:reports-queue.db?mode=rwc".to_string()),
            base_currency,
            acceptor_url: var("ACCEPTOR_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8080".to_string()),
            consumer_group: var("CONSUMER_GROUP").unwrap_or_else(|| "reporter".to_string()),
            consumers,
            queue_partitions,
            batch_size,
            poll_interval: Duration::from_millis(poll_ms),
            delivery_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn positive<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::Invalid(key)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {0} value")]
    Invalid(&'static str),

    #[error("Unsupported base currency {0}")]
    UnknownCurrency(String),
}

//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Where rendered reports are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Sqlite,
}

/// Front-end configuration.
#[derive(Clone)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: String,
    /// Bot API base URL override.
    pub api_url: Option<String>,
    /// Ledger database URL.
    pub database_url: String,
    /// Request channel database URL.
    pub queue_url: String,
    pub base_currency: String,
    pub rate_pull_interval: Duration,
    /// Rates are not refreshed without a key.
    pub fixer_api_key: Option<String>,
    /// Bind address of the report acceptor.
    pub acceptor_addr: SocketAddr,
    pub queue_partitions: u32,
    pub cache_backend: CacheBackend,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("database_url", &self.database_url)
            .field("queue_url", &self.queue_url)
            .field("base_currency", &self.base_currency)
            .field("rate_pull_interval", &self.rate_pull_interval)
            .field("fixer_api_key", &self.fixer_api_key.as_ref().map(|_| "<redacted>"))
            .field("acceptor_addr", &self.acceptor_addr)
            .field("queue_partitions", &self.queue_partitions)
            .field("cache_backend", &self.cache_backend)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BOT_TOKEN` | Telegram bot token | (required) |
    /// | `TELEGRAM_API_URL` | Bot API base URL | `https://api.telegram.org` |
    /// | `DATABASE_URL` | Ledger database | `sqlite:finance.db?mode=rwc` |
    /// | `QUEUE_URL` | Request channel database | `sqlite:reports-queue.db?mode=rwc` |
    /// | `BASE_CURRENCY` | Currency amounts are stored in | `RUB` |
    /// | `RATE_PULL_INTERVAL_MINUTES` | Rate refresh period | `60` |
    /// | `FIXER_API_KEY` | apilayer key | (refresh disabled) |
    /// | `ACCEPTOR_ADDR` | Report acceptor bind address | `127.0.0.1:8080` |
    /// | `QUEUE_PARTITIONS` | Request channel partitions | `4` |
    /// | `CACHE_BACKEND` | `memory` or `sqlite` | `memory` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = var("BOT_TOKEN").ok_or(ConfigError::MissingBotToken)?;

        let base_currency = var("BASE_CURRENCY")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "RUB".to_string());
        if !ledger::is_supported_currency(&base_currency) {
            return Err(ConfigError::UnknownCurrency(base_currency));
        }

        let minutes: u64 = parse_or(var("RATE_PULL_INTERVAL_MINUTES"), "RATE_PULL_INTERVAL_MINUTES", 60)?;
        if minutes == 0 {
            return Err(ConfigError::Invalid("RATE_PULL_INTERVAL_MINUTES"));
        }

        let queue_partitions: u32 = parse_or(var("QUEUE_PARTITIONS"), "QUEUE_PARTITIONS", 4)?;
        if queue_partitions == 0 {
            return Err(ConfigError::Invalid("QUEUE_PARTITIONS"));
        }

        let acceptor_addr = var("ACCEPTOR_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("ACCEPTOR_ADDR"))?;

        let cache_backend = match var("CACHE_BACKEND").as_deref() {
            None | Some("memory") => CacheBackend::Memory,
            Some("sqlite") => CacheBackend::Sqlite,
            Some(_) => return Err(ConfigError::Invalid("CACHE_BACKEND")),
        };

        Ok(Self {
            bot_token,
            api_url: var("TELEGRAM_API_URL"),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:finance.db?mode=rwc".to_string()),
            queue_url: var("QUEUE_URL")
                .unwrap_or_else(|| "sqlite:reports-queue.db?mode=rwc".to_string()),
            base_currency,
            rate_pull_interval: Duration::from_secs(minutes * 60),
            fixer_api_key: var("FIXER_API_KEY"),
            acceptor_addr,
            queue_partitions,
            cache_backend,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BOT_TOKEN environment variable is required")]
    MissingBotToken,

    #[error("Invalid {0} value")]
    Invalid(&'static str),

    #[error("Unsupported base currency {0}")]
    UnknownCurrency(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("BOT_TOKEN", "1:abc")]).unwrap();
        assert_eq!(config.base_currency, "RUB");
        assert_eq!(config.rate_pull_interval, Duration::from_secs(3600));
        assert_eq!(config.queue_partitions, 4);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.acceptor_addr.to_string(), "127.0.0.1:8080");
        assert!(config.fixer_api_key.is_none());
        assert_eq!(config.database_url, "sqlite:finance.db?mode=rwc");
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingBotToken)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("BOT_TOKEN", "t"), ("QUEUE_PARTITIONS", "0")]),
            Err(ConfigError::Invalid("QUEUE_PARTITIONS"))
        ));
        assert!(matches!(
            load(&[("BOT_TOKEN", "t"), ("CACHE_BACKEND", "redis")]),
            Err(ConfigError::Invalid("CACHE_BACKEND"))
        ));
        assert!(matches!(
            load(&[("BOT_TOKEN", "t"), ("BASE_CURRENCY", "gbp")]),
            Err(ConfigError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = load(&[("BOT_TOKEN", "1:abc"), ("FIXER_API_KEY", "k3y")]).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("1:abc"));
        assert!(!debug.contains("k3y"));
    }
}

//! Configuration for the delivery client.

use std::time::Duration;

/// Default bound on one delivery call.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the worker delivers finished reports.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Base URL of the front end's acceptor (e.g., "http://127.0.0.1:8080").
    pub base_url: String,
    /// Bound on each delivery call.
    pub timeout: Duration,
}

impl DeliveryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint accepting report results.
    pub fn reports_url(&self) -> String {
        format!("{}/reports", self.base_url)
    }

    /// Health check endpoint.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8080")
    }
}

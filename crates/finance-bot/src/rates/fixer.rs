//! Client for the apilayer Fixer `latest` endpoint.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{RatesError, RatesProvider};

pub const DEFAULT_FIXER_URL: &str = "https://api.apilayer.com/fixer/latest";

#[derive(Clone)]
pub struct FixerConfig {
    pub api_key: String,
    pub url: String,
    pub timeout: Duration,
}

impl FixerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: DEFAULT_FIXER_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl fmt::Debug for FixerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixerConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    success: bool,
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct FixerClient {
    http: Client,
    config: FixerConfig,
}

impl FixerClient {
    pub fn new(config: FixerConfig) -> Result<Self, RatesError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl RatesProvider for FixerClient {
    async fn latest(
        &self,
        base: &str,
        symbols: &[&str],
    ) -> Result<HashMap<String, f64>, RatesError> {
        let symbols = symbols.join(",");
        let response = self
            .http
            .get(&self.config.url)
            .header("apikey", &self.config.api_key)
            .query(&[("base", base), ("symbols", symbols.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RatesError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let latest: LatestResponse = response.json().await?;
        debug!("Fixer answered for base {:?}: {:?}", latest.base, latest.rates);
        if !latest.success {
            let cause = latest
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "success = false".to_string());
            return Err(RatesError::Unsuccessful(cause));
        }

        Ok(latest.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn fake_fixer(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("secret") {
            return Json(json!({"success": false, "error": {"code": 101}}));
        }
        let rates: HashMap<String, f64> = q["symbols"]
            .split(',')
            .map(|s| (s.to_string(), 0.5))
            .collect();
        Json(json!({
            "success": true,
            "base": q["base"],
            "timestamp": 1_700_000_000,
            "rates": rates,
        }))
    }

    async fn start_fake() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/latest", get(fake_fixer));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/latest", addr)
    }

    #[tokio::test]
    async fn fetches_requested_symbols() {
        let url = start_fake().await;
        let client = FixerClient::new(FixerConfig::new("secret").with_url(url)).unwrap();

        let rates = client.latest("RUB", &["USD", "EUR"]).await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates["USD"], 0.5);
    }

    #[tokio::test]
    async fn unsuccessful_answer_is_an_error() {
        let url = start_fake().await;
        let client = FixerClient::new(FixerConfig::new("wrong").with_url(url)).unwrap();

        let err = client.latest("RUB", &["USD"]).await.unwrap_err();
        assert!(matches!(err, RatesError::Unsuccessful(_)));
    }

    #[test]
    fn debug_hides_key() {
        let debug = format!("{:?}", FixerConfig::new("secret"));
        assert!(!debug.contains("secret"));
    }
}

//! Worker-side delivery client.

use async_trait::async_trait;
use report_core::{DeliveryAck, ReportResult};
use reqwest::Client;
use tracing::debug;

use crate::config::DeliveryConfig;
use crate::error::{DeliveryError, Result};
use crate::ReportSink;

/// Posts finished reports to the front end.
#[derive(Clone)]
pub struct DeliveryClient {
    http: Client,
    config: DeliveryConfig,
}

impl DeliveryClient {
    /// Build a client. Does not contact the front end.
    pub fn new(config: DeliveryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DeliveryError::Http)?;

        Ok(Self { http, config })
    }

    /// Check whether the acceptor is up.
    pub async fn health_check(&self) -> Result<bool> {
        let url = self.config.health_url();
        debug!("Health check: {}", url);

        let resp = self.http.get(&url).send().await.map_err(|e| self.map_err(e))?;
        Ok(resp.status().is_success())
    }

    /// Deliver one report and wait for the acknowledgement.
    pub async fn deliver(&self, result: &ReportResult) -> Result<DeliveryAck> {
        let response = self
            .http
            .post(self.config.reports_url())
            .json(result)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: DeliveryAck = response.json().await.map_err(|e| self.map_err(e))?;
        if !ack.success {
            return Err(DeliveryError::Rejected(ack.error.unwrap_or_default()));
        }

        debug!(user_id = %result.user_id, period = %result.period, "Report delivered");
        Ok(ack)
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    fn map_err(&self, e: reqwest::Error) -> DeliveryError {
        if e.is_timeout() {
            DeliveryError::Timeout(self.config.timeout)
        } else {
            DeliveryError::Http(e)
        }
    }
}

impl std::fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl ReportSink for DeliveryClient {
    async fn deliver(&self, result: &ReportResult) -> Result<()> {
        DeliveryClient::deliver(self, result).await.map(|_| ())
    }
}

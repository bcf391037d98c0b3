//! Prometheus metrics for message handling.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, Encoder, HistogramVec, TextEncoder};
use tracing::error;

/// Covers 0.1ms to 2s.
const RESPONSE_TIME_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0,
];

/// Registered once per process in the default registry.
pub static METRICS: Lazy<Result<BotMetrics, prometheus::Error>> = Lazy::new(BotMetrics::new);

#[derive(Clone)]
pub struct BotMetrics {
    /// Labels: command, error
    pub response_time_seconds: HistogramVec,
}

impl BotMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            response_time_seconds: register_histogram_vec!(
                "finance_bot_response_time_seconds",
                "Time to compute the reply to one message",
                &["command", "error"],
                RESPONSE_TIME_BUCKETS.to_vec()
            )?,
        })
    }

    pub fn observe_response(&self, command: &str, failed: bool, elapsed: Duration) {
        let failed = if failed { "true" } else { "false" };
        self.response_time_seconds
            .with_label_values(&[command, failed])
            .observe(elapsed.as_secs_f64());
    }
}

/// Record one handled message. Does nothing if registration failed.
pub fn observe_response(command: &str, failed: bool, elapsed: Duration) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.observe_response(command, failed, elapsed);
    }
}

/// GET /metrics in Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

/// Routes merged into the report acceptor.
pub fn routes() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

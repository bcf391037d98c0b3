//! Result channel between the report worker and the front end.
//!
//! The front end exposes a small HTTP acceptor (`POST /reports`,
//! `GET /health`); workers post finished [`ReportResult`]s to it with a
//! bounded timeout. There is no return address in a request, so a single
//! front-end instance owns delivery.

pub mod client;
pub mod config;
pub mod error;
pub mod routes;

pub use client::DeliveryClient;
pub use config::{DeliveryConfig, DEFAULT_DELIVERY_TIMEOUT};
pub use error::{DeliveryError, Result};
pub use routes::router;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use report_core::ReportResult;
use tokio::net::TcpListener;
use tracing::info;

/// Front-end handler for finished reports.
#[async_trait]
pub trait ReportAcceptor: Send + Sync {
    /// Take ownership of a result. The error text is sent back to the worker.
    async fn accept(&self, result: ReportResult) -> std::result::Result<(), String>;
}

/// Destination for finished reports on the worker side.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, result: &ReportResult) -> Result<()>;
}

/// Serve the acceptor until `shutdown` completes.
pub async fn serve<S>(
    listener: TcpListener,
    acceptor: Arc<dyn ReportAcceptor>,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    serve_router(listener, router(acceptor), shutdown).await
}

/// Serve a prepared router, typically [`router`] merged with extra routes.
pub async fn serve_router<S>(listener: TcpListener, app: Router, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Report acceptor listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Report acceptor stopped");
    Ok(())
}

//! Route handlers for the report acceptor.

pub mod health;
pub mod reports;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::ReportAcceptor;

/// Shared acceptor state.
#[derive(Clone)]
pub struct AcceptorState {
    pub acceptor: Arc<dyn ReportAcceptor>,
}

/// Build the router with all routes.
pub fn router(acceptor: Arc<dyn ReportAcceptor>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/reports", post(reports::accept_report))
        .with_state(AcceptorState { acceptor })
}

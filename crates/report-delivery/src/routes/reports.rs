//! Report acceptance endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use report_core::{DeliveryAck, ReportResult};
use tracing::{info, warn};

use super::AcceptorState;

/// Accept a finished report from a worker.
///
/// A refused report is answered with `success: false` and a 200 status; the
/// worker logs it and moves on either way.
pub async fn accept_report(
    State(state): State<AcceptorState>,
    Json(result): Json<ReportResult>,
) -> (StatusCode, Json<DeliveryAck>) {
    info!(
        user_id = %result.user_id,
        period = %result.period,
        success = result.is_success(),
        "Report received"
    );

    match state.acceptor.accept(result).await {
        Ok(()) => (StatusCode::OK, Json(DeliveryAck::ok())),
        Err(e) => {
            warn!("Report not accepted: {}", e);
            (StatusCode::OK, Json(DeliveryAck::rejected(e)))
        }
    }
}

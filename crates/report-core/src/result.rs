//! Report results and their JSON encoding.

use ledger::UserId;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::period::ReportPeriod;

/// Total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub category: String,
    pub amount: f64,
}

/// Outcome of a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StatusWire", into = "StatusWire")]
pub enum ReportStatus {
    Success,
    /// The user has no expenses at all.
    NoData,
    /// The build failed; the message is safe to log but not to show.
    Failed(String),
}

#[derive(Serialize, Deserialize)]
struct StatusWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    no_data: bool,
}

impl From<StatusWire> for ReportStatus {
    fn from(wire: StatusWire) -> Self {
        match (wire.success, wire.no_data) {
            (true, true) => ReportStatus::NoData,
            (true, false) => ReportStatus::Success,
            (false, _) => ReportStatus::Failed(wire.error.unwrap_or_default()),
        }
    }
}

impl From<ReportStatus> for StatusWire {
    fn from(status: ReportStatus) -> Self {
        match status {
            ReportStatus::Success => StatusWire {
                success: true,
                error: None,
                no_data: false,
            },
            ReportStatus::NoData => StatusWire {
                success: true,
                error: None,
                no_data: true,
            },
            ReportStatus::Failed(error) => StatusWire {
                success: false,
                error: Some(error),
                no_data: false,
            },
        }
    }
}

/// A finished report, produced once per request by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub user_id: UserId,
    pub period: ReportPeriod,
    pub status: ReportStatus,
    #[serde(default)]
    pub records: Vec<ReportRecord>,
    #[serde(default)]
    pub total: f64,
    /// Clock reading when the build started, in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at_ms: Option<i64>,
}

impl ReportResult {
    pub fn success(
        user_id: UserId,
        period: ReportPeriod,
        records: Vec<ReportRecord>,
        total: f64,
    ) -> Self {
        Self {
            user_id,
            period,
            status: ReportStatus::Success,
            records,
            total,
            generated_at_ms: None,
        }
    }

    pub fn no_data(user_id: UserId, period: ReportPeriod) -> Self {
        Self {
            user_id,
            period,
            status: ReportStatus::NoData,
            records: Vec::new(),
            total: 0.0,
            generated_at_ms: None,
        }
    }

    pub fn failed(user_id: UserId, period: ReportPeriod, error: impl Into<String>) -> Self {
        Self {
            user_id,
            period,
            status: ReportStatus::Failed(error.into()),
            records: Vec::new(),
            total: 0.0,
            generated_at_ms: None,
        }
    }

    /// Stamp the build start time.
    pub fn generated_at(mut self, at_ms: i64) -> Self {
        self.generated_at_ms = Some(at_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ReportStatus::Success)
    }

    /// The failure cause, if the build failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ReportStatus::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ReportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ReportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reply to a delivered result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

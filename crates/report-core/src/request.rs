//! Report requests and their binary encoding.

use chrono::{DateTime, TimeZone, Utc};
use ledger::UserId;
use prost::Message;

use crate::error::ReportError;
use crate::period::ReportPeriod;

/// Wire representation carried on the request channel.
#[derive(Clone, PartialEq, Message)]
pub struct ReportRequestMessage {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(string, tag = "2")]
    pub period: String,
    #[prost(int64, tag = "3")]
    pub created_at_ms: i64,
}

/// A request to build one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub user_id: UserId,
    pub period: ReportPeriod,
    /// When the request was issued. Only used for logging.
    pub created_at: DateTime<Utc>,
}

impl ReportRequest {
    pub fn new(user_id: UserId, period: ReportPeriod) -> Self {
        Self {
            user_id,
            period,
            created_at: Utc::now(),
        }
    }

    /// Encode as protobuf bytes.
    pub fn encode(&self) -> Vec<u8> {
        ReportRequestMessage {
            user_id: self.user_id.get(),
            period: self.period.token().to_string(),
            created_at_ms: self.created_at.timestamp_millis(),
        }
        .encode_to_vec()
    }

    /// Decode protobuf bytes.
    ///
    /// Fails on malformed bytes and on unknown period tokens.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReportError> {
        let message = ReportRequestMessage::decode(bytes)?;
        let period = message.period.parse()?;
        let created_at = Utc
            .timestamp_millis_opt(message.created_at_ms)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Self {
            user_id: UserId(message.user_id),
            period,
            created_at,
        })
    }

    /// Time since the request was issued, in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_survives_the_wire() {
        let request = ReportRequest::new(UserId(42), ReportPeriod::Month);
        let decoded = ReportRequest::decode(&request.encode()).unwrap();

        assert_eq!(decoded.user_id, UserId(42));
        assert_eq!(decoded.period, ReportPeriod::Month);
        assert_eq!(
            decoded.created_at.timestamp_millis(),
            request.created_at.timestamp_millis()
        );
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = ReportRequest::decode(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ReportError::Decode(_)));
    }

    #[test]
    fn unknown_period_is_rejected() {
        let bytes = ReportRequestMessage {
            user_id: 1,
            period: "decade".to_string(),
            created_at_ms: 0,
        }
        .encode_to_vec();

        let err = ReportRequest::decode(&bytes).unwrap_err();
        assert!(matches!(err, ReportError::UnknownPeriod(_)));
    }
}

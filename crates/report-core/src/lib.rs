//! Shared report pipeline types.
//!
//! Periods, requests, results and the [`ReportBuilder`] used by the worker.
//! Requests travel as protobuf, results as JSON.

pub mod builder;
pub mod error;
pub mod period;
pub mod render;
pub mod request;
pub mod result;

pub use builder::ReportBuilder;
pub use error::ReportError;
pub use ledger::UserId;
pub use period::ReportPeriod;
pub use render::render;
pub use request::ReportRequest;
pub use result::{DeliveryAck, ReportRecord, ReportResult, ReportStatus};

/// Cache key for a user's report over a period.
///
/// `"{user_id}:{period}"`; all-time is written as `all`. User ids contain no
/// colon, so keys never collide.
pub fn cache_key(user_id: UserId, period: ReportPeriod) -> String {
    format!("{}:{}", user_id, period.key_token())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_distinct_per_period() {
        let keys: Vec<_> = ReportPeriod::ALL
            .iter()
            .map(|p| cache_key(UserId(-5), *p))
            .collect();
        assert_eq!(keys, ["-5:all", "-5:week", "-5:month", "-5:year"]);
    }
}

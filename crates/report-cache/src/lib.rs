//! Cache of rendered reports keyed by (user, period).
//!
//! Callers treat a failed `get` as a miss and log failed `put`/`invalidate`
//! calls; the cache never blocks a user.

pub mod error;
pub mod memory;
pub mod sqlite;

pub use error::{CacheError, Result};
pub use memory::MemoryReportCache;
pub use sqlite::SqliteReportCache;

use async_trait::async_trait;
use report_core::{ReportPeriod, UserId};

/// Key-value store from (user, period) to rendered report text.
#[async_trait]
pub trait ReportCache: Send + Sync {
    /// The cached report, or `None` on a miss.
    async fn get(&self, user_id: UserId, period: ReportPeriod) -> Result<Option<String>>;

    /// Store a rendered report.
    async fn put(&self, user_id: UserId, period: ReportPeriod, report: &str) -> Result<()>;

    /// Drop the user's entries for `periods`. Absent keys are not an error.
    async fn invalidate(&self, user_id: UserId, periods: &[ReportPeriod]) -> Result<()>;
}

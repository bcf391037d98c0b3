//! The ledger contract shared by the bot and the reporter.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ExpenseRecord, Rate, UserId, UserRecord};
use crate::rates::RateTable;

/// Read/write access to users, expenses and rates.
///
/// Every error returned by an implementation is wrapped with the name of
/// the failing operation (see [`crate::LedgerError::context`]). In-memory
/// implementations may make reads and settings writes infallible; only the
/// limit check and rate lookups fail there.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Get a user's settings. Unknown users get the default record.
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord>;

    /// Create or replace a user's settings.
    async fn save_user(&self, user_id: UserId, record: &UserRecord) -> Result<()>;

    /// Store an expense.
    ///
    /// Fails with [`crate::LedgerError::LimitExceeded`] (wrapped) when the
    /// current month's total would go over the user's limit; nothing is
    /// stored in that case.
    async fn save_expense(&self, user_id: UserId, expense: &ExpenseRecord) -> Result<()>;

    /// All expenses of a user.
    async fn get_expenses(&self, user_id: UserId) -> Result<Vec<ExpenseRecord>>;

    /// A populated rate for the currency.
    async fn get_rate(&self, code: &str) -> Result<Rate>;

    /// Store a pulled value for one currency.
    async fn set_rate(&self, code: &str, value: f64) -> Result<()>;

    /// Register a currency with no value yet.
    async fn new_rate(&self, code: &str) -> Result<()>;

    /// Replace the rates in `table` atomically.
    async fn publish_rates(&self, table: RateTable) -> Result<()>;
}

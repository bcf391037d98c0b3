//! SQLite persistence layer for the finance bot.
//!
//! This crate owns user settings, expense records and currency rates, and
//! exposes them through the [`Ledger`] trait. Two implementations are
//! provided: [`SqliteLedger`] (SQLx with SQLite) and [`MemoryLedger`].
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use ledger::{ExpenseRecord, Ledger, SqliteLedger, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = SqliteLedger::connect("sqlite:finance.db?mode=rwc").await?;
//!     ledger.migrate().await?;
//!
//!     let expense = ExpenseRecord::new(250.0, "Coffee", Utc::now());
//!     ledger.save_expense(UserId(42), &expense).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod error;
pub mod expense;
mod ledger;
pub mod memory;
pub mod models;
pub mod rate;
pub mod rates;
pub mod user;

pub use crate::ledger::Ledger;
pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use models::{
    is_supported_currency, ExpenseRecord, Rate, UserId, UserRecord, SUPPORTED_CURRENCIES,
};
pub use rates::{RateStore, RateTable};

use async_trait::async_trait;
use chrono::{Local, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// SQLite-backed [`Ledger`].
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// In-memory databases (`sqlite::memory:`) are per connection, so use a
    /// pool size of 1 for them.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to ledger database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running ledger migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord> {
        user::get_user(&self.pool, user_id)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| e.context("get user"))
    }

    async fn save_user(&self, user_id: UserId, record: &UserRecord) -> Result<()> {
        user::save_user(&self.pool, user_id, record)
            .await
            .map_err(|e| e.context("save user"))
    }

    async fn save_expense(&self, user_id: UserId, expense: &ExpenseRecord) -> Result<()> {
        let now = Local::now();
        expense::insert_expense(
            &self.pool,
            user_id,
            expense,
            calendar::beginning_of_month(&now),
            calendar::beginning_of_next_month(&now),
        )
        .await
        .map_err(|e| e.context("save expense"))
    }

    async fn get_expenses(&self, user_id: UserId) -> Result<Vec<ExpenseRecord>> {
        expense::list_expenses(&self.pool, user_id)
            .await
            .map_err(|e| e.context("get expenses"))
    }

    async fn get_rate(&self, code: &str) -> Result<Rate> {
        rate::get_rate(&self.pool, code)
            .await
            .map_err(|e| e.context("get rate"))
    }

    async fn set_rate(&self, code: &str, value: f64) -> Result<()> {
        rate::set_rate(&self.pool, code, value, Utc::now())
            .await
            .map_err(|e| e.context("set rate"))
    }

    async fn new_rate(&self, code: &str) -> Result<()> {
        rate::new_rate(&self.pool, code)
            .await
            .map_err(|e| e.context("new rate"))
    }

    async fn publish_rates(&self, table: RateTable) -> Result<()> {
        rate::publish_rates(&self.pool, &table)
            .await
            .map_err(|e| e.context("publish rates"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn test_ledger() -> SqliteLedger {
        let ledger = SqliteLedger::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        ledger.migrate().await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_user_roundtrip() {
        let ledger = test_ledger().await;
        let id = UserId(123);

        // Unknown users read as default
        assert_eq!(ledger.get_user(id).await.unwrap(), UserRecord::default());

        let record = UserRecord::default()
            .with_preferred_currency("USD")
            .with_month_limit(500.0);
        ledger.save_user(id, &record).await.unwrap();
        assert_eq!(ledger.get_user(id).await.unwrap(), record);

        // Update
        let updated = record.with_preferred_currency("EUR");
        ledger.save_user(id, &updated).await.unwrap();
        assert_eq!(
            ledger.get_user(id).await.unwrap().preferred_currency(),
            Some("EUR")
        );
        assert_eq!(user::count_users(ledger.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expenses_are_listed_per_user() {
        let ledger = test_ledger().await;
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        ledger
            .save_expense(UserId(1), &ExpenseRecord::new(1000.0, "Internet", created))
            .await
            .unwrap();
        ledger
            .save_expense(
                UserId(1),
                &ExpenseRecord::new(1500.0, "Shopping", created + Duration::hours(1)),
            )
            .await
            .unwrap();
        ledger
            .save_expense(UserId(2), &ExpenseRecord::new(5.0, "Other", created))
            .await
            .unwrap();

        let expenses = ledger.get_expenses(UserId(1)).await.unwrap();
        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[0].category, "Internet");
        assert_eq!(expenses[0].created, created);
        assert_eq!(expenses[1].amount, 1500.0);
    }

    #[tokio::test]
    async fn test_limit_exceeded_rolls_back() {
        let ledger = test_ledger().await;
        let id = UserId(9);
        ledger
            .save_user(id, &UserRecord::default().with_month_limit(1000.0))
            .await
            .unwrap();

        ledger
            .save_expense(id, &ExpenseRecord::new(900.0, "Rent", Utc::now()))
            .await
            .unwrap();
        let err = ledger
            .save_expense(id, &ExpenseRecord::new(200.0, "Rent", Utc::now()))
            .await
            .unwrap_err();

        assert!(err.is_limit_exceeded());
        assert!(err.to_string().starts_with("save expense: "));
        assert_eq!(expense::count_expenses(ledger.pool(), id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_limit_means_unlimited() {
        let ledger = test_ledger().await;
        let id = UserId(10);
        ledger.save_user(id, &UserRecord::default()).await.unwrap();

        for _ in 0..3 {
            ledger
                .save_expense(id, &ExpenseRecord::new(1_000_000.0, "Car", Utc::now()))
                .await
                .unwrap();
        }
        assert_eq!(ledger.get_expenses(id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rates_lifecycle() {
        let ledger = test_ledger().await;

        let err = ledger.get_rate("USD").await.unwrap_err();
        assert!(matches!(err.root(), LedgerError::RateNotFound { .. }));

        ledger.new_rate("USD").await.unwrap();
        let err = ledger.get_rate("USD").await.unwrap_err();
        assert!(matches!(err.root(), LedgerError::RateNotPopulated { .. }));

        ledger.set_rate("USD", 0.011).await.unwrap();
        let rate = ledger.get_rate("USD").await.unwrap();
        assert!(rate.populated);
        assert_eq!(rate.value, 0.011);

        // Registering again keeps the value
        ledger.new_rate("USD").await.unwrap();
        assert_eq!(ledger.get_rate("USD").await.unwrap().value, 0.011);
    }

    #[tokio::test]
    async fn test_publish_rates_table() {
        let ledger = test_ledger().await;
        let now = Utc::now();
        let table = RateTable::new()
            .with_rate(Rate::populated("RUB", 1.0, now))
            .with_rate(Rate::populated("EUR", 0.0095, now))
            .with_rate(Rate::unpopulated("CNY"));

        ledger.publish_rates(table).await.unwrap();

        assert_eq!(ledger.get_rate("RUB").await.unwrap().value, 1.0);
        assert_eq!(ledger.get_rate("EUR").await.unwrap().value, 0.0095);
        assert!(ledger.get_rate("CNY").await.unwrap_err().is_rate_unavailable());
        assert_eq!(rate::list_rates(ledger.pool()).await.unwrap().len(), 3);
    }
}

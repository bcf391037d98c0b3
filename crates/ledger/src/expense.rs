//! Expense storage with the monthly limit check.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{LedgerError, Result};
use crate::models::{ExpenseRecord, UserId};

fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Insert an expense, rejecting it if the month total would exceed the
/// user's limit.
///
/// The insert and the limit check run in one transaction; on
/// [`LedgerError::LimitExceeded`] the insert is rolled back. The month is the
/// half-open window `[month_start, month_end)`. A limit of zero disables the
/// check.
pub async fn insert_expense(
    pool: &SqlitePool,
    user_id: UserId,
    expense: &ExpenseRecord,
    month_start: DateTime<Utc>,
    month_end: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO expenses (user_id, amount, category, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id.get())
    .bind(expense.amount)
    .bind(&expense.category)
    .bind(to_millis(&expense.created))
    .execute(&mut *tx)
    .await?;

    let (spent, limit) = sqlx::query_as::<_, (f64, f64)>(
        r#"
        SELECT
            COALESCE((
                SELECT SUM(amount) FROM expenses
                WHERE user_id = ? AND created_at >= ? AND created_at < ?
            ), 0.0),
            COALESCE((SELECT month_limit FROM users WHERE id = ?), 0.0)
        "#,
    )
    .bind(user_id.get())
    .bind(to_millis(&month_start))
    .bind(to_millis(&month_end))
    .bind(user_id.get())
    .fetch_one(&mut *tx)
    .await?;

    if limit > 0.0 && spent > limit {
        tracing::info!(user_id = %user_id, spent, limit, "Expense rejected by monthly limit");
        return Err(LedgerError::LimitExceeded { user_id });
    }

    tx.commit().await?;
    Ok(())
}

/// List all expenses of a user, oldest first.
pub async fn list_expenses(pool: &SqlitePool, user_id: UserId) -> Result<Vec<ExpenseRecord>> {
    let rows = sqlx::query_as::<_, (f64, String, i64)>(
        r#"
        SELECT amount, category, created_at
        FROM expenses
        WHERE user_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(user_id.get())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(amount, category, created_at)| ExpenseRecord {
            amount,
            category,
            created: from_millis(created_at),
        })
        .collect())
}

/// Count expenses of a user.
pub async fn count_expenses(pool: &SqlitePool, user_id: UserId) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM expenses WHERE user_id = ?
        "#,
    )
    .bind(user_id.get())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

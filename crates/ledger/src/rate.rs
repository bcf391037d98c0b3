//! Currency rate storage.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{LedgerError, Result};
use crate::models::Rate;
use crate::rates::RateTable;

type RateRow = (String, f64, bool, Option<i64>);

fn rate_from_row((code, value, populated, updated_at): RateRow) -> Rate {
    Rate {
        code,
        value,
        populated,
        updated_at: updated_at.and_then(DateTime::from_timestamp_millis),
    }
}

/// Register a currency without a value. Existing rows are left untouched.
pub async fn new_rate(pool: &SqlitePool, code: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rates (name, base_rate, is_set)
        VALUES (?, 0, 0)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(code)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store a pulled rate value.
pub async fn set_rate(
    pool: &SqlitePool,
    code: &str,
    value: f64,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rates (name, base_rate, is_set, updated_at)
        VALUES (?, ?, 1, ?)
        ON CONFLICT(name) DO UPDATE SET
            base_rate = excluded.base_rate,
            is_set = 1,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(code)
    .bind(value)
    .bind(updated_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a usable rate.
///
/// Fails with [`LedgerError::RateNotPopulated`] if the currency is registered
/// but was never pulled.
pub async fn get_rate(pool: &SqlitePool, code: &str) -> Result<Rate> {
    let row = sqlx::query_as::<_, RateRow>(
        r#"
        SELECT name, base_rate, is_set, updated_at
        FROM rates
        WHERE name = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    match row.map(rate_from_row) {
        None => Err(LedgerError::RateNotFound {
            code: code.to_string(),
        }),
        Some(rate) if !rate.populated => Err(LedgerError::RateNotPopulated {
            code: code.to_string(),
        }),
        Some(rate) => Ok(rate),
    }
}

/// List every registered rate, populated or not.
pub async fn list_rates(pool: &SqlitePool) -> Result<Vec<Rate>> {
    let rows = sqlx::query_as::<_, RateRow>(
        r#"
        SELECT name, base_rate, is_set, updated_at
        FROM rates
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(rate_from_row).collect())
}

/// Write a whole rate table in one transaction.
///
/// Unpopulated entries only register the currency; they never overwrite a
/// stored value.
pub async fn publish_rates(pool: &SqlitePool, table: &RateTable) -> Result<()> {
    let mut tx = pool.begin().await?;

    for rate in table.iter() {
        if rate.populated {
            sqlx::query(
                r#"
                INSERT INTO rates (name, base_rate, is_set, updated_at)
                VALUES (?, ?, 1, ?)
                ON CONFLICT(name) DO UPDATE SET
                    base_rate = excluded.base_rate,
                    is_set = 1,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&rate.code)
            .bind(rate.value)
            .bind(rate.updated_at.unwrap_or_else(Utc::now).timestamp_millis())
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO rates (name, base_rate, is_set)
                VALUES (?, 0, 0)
                ON CONFLICT(name) DO NOTHING
                "#,
            )
            .bind(&rate.code)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

//! User settings storage.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{UserId, UserRecord};

/// Get a user's settings, or `None` if the user never registered.
pub async fn get_user(pool: &SqlitePool, user_id: UserId) -> Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, (Option<String>, f64)>(
        r#"
        SELECT preferred_currency, month_limit
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id.get())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(currency, month_limit)| UserRecord::new(currency, month_limit)))
}

/// Create or replace a user's settings.
pub async fn save_user(pool: &SqlitePool, user_id: UserId, record: &UserRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, preferred_currency, month_limit)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            preferred_currency = excluded.preferred_currency,
            month_limit = excluded.month_limit,
            updated_at = datetime('now')
        "#,
    )
    .bind(user_id.get())
    .bind(record.preferred_currency())
    .bind(record.month_limit())
    .execute(pool)
    .await?;

    Ok(())
}

/// Count registered users.
pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

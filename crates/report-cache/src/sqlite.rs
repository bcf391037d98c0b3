//! SQLite-backed report cache.
//!
//! Survives front-end restarts. The table is created on connect.

use async_trait::async_trait;
use report_core::{cache_key, ReportPeriod, UserId};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::ReportCache;

#[derive(Debug, Clone)]
pub struct SqliteReportCache {
    pool: SqlitePool,
}

impl SqliteReportCache {
    /// Use an existing pool, creating the cache table if needed.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS report_cache (
                cache_key TEXT PRIMARY KEY NOT NULL,
                report TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| crate::CacheError::from(e).context("create cache table"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReportCache for SqliteReportCache {
    async fn get(&self, user_id: UserId, period: ReportPeriod) -> Result<Option<String>> {
        let report: Option<String> = sqlx::query_scalar(
            r#"
            SELECT report
            FROM report_cache
            WHERE cache_key = ?
            "#,
        )
        .bind(cache_key(user_id, period))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| crate::CacheError::from(e).context("get cached report"))?;

        Ok(report)
    }

    async fn put(&self, user_id: UserId, period: ReportPeriod, report: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO report_cache (cache_key, report)
            VALUES (?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                report = excluded.report,
                updated_at = datetime('now')
            "#,
        )
        .bind(cache_key(user_id, period))
        .bind(report)
        .execute(&self.pool)
        .await
        .map_err(|e| crate::CacheError::from(e).context("put cached report"))?;

        Ok(())
    }

    async fn invalidate(&self, user_id: UserId, periods: &[ReportPeriod]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| crate::CacheError::from(e).context("invalidate reports"))?;

        for period in periods {
            sqlx::query("DELETE FROM report_cache WHERE cache_key = ?")
                .bind(cache_key(user_id, *period))
                .execute(&mut *tx)
                .await
                .map_err(|e| crate::CacheError::from(e).context("invalidate reports"))?;
        }

        tx.commit()
            .await
            .map_err(|e| crate::CacheError::from(e).context("invalidate reports"))?;

        debug!(user_id = %user_id, periods = periods.len(), "Invalidated cached reports");
        Ok(())
    }
}

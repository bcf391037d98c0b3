//! In-process report cache.

use std::collections::HashMap;

use async_trait::async_trait;
use report_core::{cache_key, ReportPeriod, UserId};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::ReportCache;

/// A [`ReportCache`] backed by a map. Entries live until invalidated.
#[derive(Debug, Default)]
pub struct MemoryReportCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached reports.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ReportCache for MemoryReportCache {
    async fn get(&self, user_id: UserId, period: ReportPeriod) -> Result<Option<String>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&cache_key(user_id, period))
            .cloned())
    }

    async fn put(&self, user_id: UserId, period: ReportPeriod, report: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(cache_key(user_id, period), report.to_string());
        Ok(())
    }

    async fn invalidate(&self, user_id: UserId, periods: &[ReportPeriod]) -> Result<()> {
        let mut entries = self.entries.write().await;
        for period in periods {
            entries.remove(&cache_key(user_id, *period));
        }
        Ok(())
    }
}

//! Receives finished reports from workers.

use std::sync::Arc;

use async_trait::async_trait;
use report_cache::ReportCache;
use report_core::{render, ReportResult, ReportStatus};
use report_delivery::ReportAcceptor;
use tracing::{debug, info, warn};

use crate::freshness::CacheFreshness;
use crate::messages;
use crate::sender::MessageSender;

/// Renders incoming results, caches successes and notifies the user.
pub struct ReportInbox {
    cache: Arc<dyn ReportCache>,
    sender: Arc<dyn MessageSender>,
    freshness: Arc<CacheFreshness>,
}

impl ReportInbox {
    pub fn new(
        cache: Arc<dyn ReportCache>,
        sender: Arc<dyn MessageSender>,
        freshness: Arc<CacheFreshness>,
    ) -> Self {
        Self {
            cache,
            sender,
            freshness,
        }
    }

    async fn reply_for(&self, result: &ReportResult) -> String {
        let user_id = result.user_id;
        match &result.status {
            ReportStatus::Success => {
                let text = render(result);
                let freshness = self.freshness.lock(user_id).await;
                if freshness.is_cacheable(result.generated_at_ms) {
                    if let Err(e) = self.cache.put(user_id, result.period, &text).await {
                        warn!(user_id = %user_id, "Failed to cache report: {}", e);
                    }
                } else {
                    debug!(user_id = %user_id, period = %result.period, "Report predates an invalidation, not caching");
                }
                text
            }
            ReportStatus::NoData => messages::NO_EXPENSES.to_string(),
            ReportStatus::Failed(cause) => {
                warn!(user_id = %user_id, period = %result.period, "Report build failed: {}", cause);
                format!("{}{}", messages::SORRY_PREFIX, messages::REPORT_FAILED)
            }
        }
    }
}

#[async_trait]
impl ReportAcceptor for ReportInbox {
    async fn accept(&self, result: ReportResult) -> Result<(), String> {
        info!(user_id = %result.user_id, period = %result.period, "Report received");
        let reply = self.reply_for(&result).await;
        self.sender
            .send_message(result.user_id, &reply)
            .await
            .map_err(|e| {
                warn!(user_id = %result.user_id, "Failed to notify user: {}", e);
                e.to_string()
            })
    }
}

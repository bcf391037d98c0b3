//! Guard against caching reports that predate an expense write.
//!
//! A build can read the ledger before a write and arrive after the write
//! invalidated the cache. Such a result is still shown to the user but must
//! not be cached, or later queries would serve it.
//!
//! The freshness check and the cache write happen under the user's lock, as
//! do the invalidation mark and the cache invalidation. A write can
//! therefore never slip in between a passed check and its `put`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use report_core::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Last invalidation time per user, in Unix milliseconds.
#[derive(Debug, Default)]
pub struct CacheFreshness {
    users: Mutex<HashMap<UserId, Arc<Mutex<Option<i64>>>>>,
}

impl CacheFreshness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the user's lock. Hold it across the cache call that depends on
    /// the check or mark made through the guard.
    pub async fn lock(&self, user_id: UserId) -> UserFreshness {
        let slot = self
            .users
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clone();
        UserFreshness {
            invalidated: slot.lock_owned().await,
        }
    }

    /// Record that the user's reports were invalidated now.
    pub async fn mark_invalidated(&self, user_id: UserId) {
        self.lock(user_id).await.mark_invalidated();
    }

    pub async fn mark_invalidated_at(&self, user_id: UserId, at_ms: i64) {
        self.lock(user_id).await.mark_invalidated_at(at_ms);
    }

    /// Whether a report built at `generated_at_ms` may be cached.
    pub async fn is_cacheable(&self, user_id: UserId, generated_at_ms: Option<i64>) -> bool {
        self.lock(user_id).await.is_cacheable(generated_at_ms)
    }
}

/// One user's freshness state, locked.
#[derive(Debug)]
pub struct UserFreshness {
    invalidated: OwnedMutexGuard<Option<i64>>,
}

impl UserFreshness {
    pub fn mark_invalidated(&mut self) {
        self.mark_invalidated_at(Utc::now().timestamp_millis());
    }

    pub fn mark_invalidated_at(&mut self, at_ms: i64) {
        let last = self.invalidated.get_or_insert(at_ms);
        *last = (*last).max(at_ms);
    }

    /// Unstamped results are only cacheable for users never invalidated.
    pub fn is_cacheable(&self, generated_at_ms: Option<i64>) -> bool {
        match (*self.invalidated, generated_at_ms) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(invalidated), Some(generated)) => generated > invalidated,
        }
    }
}

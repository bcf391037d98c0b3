//! Long-polling update stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{self, Stream};
use tracing::{debug, warn};

use crate::client::BotClient;
use crate::error::ChatError;
use crate::types::Update;

/// Retry policy after a failed poll.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum consecutive failures (None = infinite).
    pub max_retries: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }

    /// Check if we should retry after the given number of failures.
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_retries.map_or(true, |max| failures <= max)
    }
}

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Long-poll timeout in seconds passed to `getUpdates`.
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

/// A stream of incoming updates.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<Update, ChatError>> + Send>>;

struct PollState {
    client: BotClient,
    config: PollConfig,
    offset: Option<i64>,
    pending: VecDeque<Update>,
    failures: u32,
}

/// Subscribe to updates with default polling parameters.
pub fn subscribe(client: &BotClient) -> UpdateStream {
    subscribe_with_config(client, PollConfig::default())
}

/// Subscribe to updates.
///
/// Each update is yielded once; the offset advances past every received
/// update. Poll failures are yielded as errors and retried with backoff
/// until the retry budget runs out, which ends the stream.
pub fn subscribe_with_config(client: &BotClient, config: PollConfig) -> UpdateStream {
    let state = PollState {
        client: client.clone(),
        config,
        offset: None,
        pending: VecDeque::new(),
        failures: 0,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(update) = state.pending.pop_front() {
                return Some((Ok(update), state));
            }

            if state.failures > 0 {
                let delay = state.config.retry.delay_for_attempt(state.failures - 1);
                debug!("Retrying poll in {:?}", delay);
                tokio::time::sleep(delay).await;
            }

            match state
                .client
                .get_updates(state.offset, state.config.timeout_secs)
                .await
            {
                Ok(updates) => {
                    state.failures = 0;
                    if let Some(last) = updates.last() {
                        state.offset = Some(last.update_id + 1);
                    }
                    state.pending.extend(updates);
                }
                Err(e) => {
                    state.failures += 1;
                    if !state.config.retry.should_retry(state.failures) {
                        warn!("Giving up polling after {} failures: {}", state.failures, e);
                        return None;
                    }
                    return Some((Err(e), state));
                }
            }
        }
    }))
}

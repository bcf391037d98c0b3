//! Consumer loop: claim, build, deliver, acknowledge.

use std::collections::VecDeque;
use std::time::Duration;

use report_core::{ReportBuilder, ReportRequest, ReportResult};
use report_delivery::ReportSink;
use report_queue::{QueuedMessage, RequestSource};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Tuning for one worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Messages claimed per cycle.
    pub batch_size: usize,
    /// Wait after an empty or failed claim.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Counters reported when a worker stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Results accepted by the front end.
    pub delivered: u64,
    /// Results lost to delivery failures.
    pub dropped: u64,
    /// Messages that could not be decoded.
    pub poison: u64,
    pub acked: u64,
}

enum WorkerState {
    /// Waiting before the next claim.
    Idle,
    Claiming,
    Processing(VecDeque<QueuedMessage>),
    Acknowledging {
        message: QueuedMessage,
        rest: VecDeque<QueuedMessage>,
    },
    Stopped,
}

/// Drains a [`RequestSource`] into a [`ReportSink`].
///
/// Messages of a batch are handled one after another. A message is
/// acknowledged only after its result was handed to the sink, whether or
/// not the sink accepted it, so a crash in between redelivers it.
pub struct ReportWorker<S, K> {
    name: String,
    source: S,
    sink: K,
    builder: ReportBuilder,
    config: WorkerConfig,
    stats: WorkerStats,
}

impl<S, K> ReportWorker<S, K>
where
    S: RequestSource,
    K: ReportSink,
{
    pub fn new(
        name: impl Into<String>,
        source: S,
        sink: K,
        builder: ReportBuilder,
        config: WorkerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            sink,
            builder,
            config,
            stats: WorkerStats::default(),
        }
    }

    /// Run until shutdown. A batch in progress is finished first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerStats {
        info!(worker = %self.name, "Report worker started");
        let mut state = WorkerState::Claiming;

        loop {
            state = match state {
                WorkerState::Idle => {
                    tokio::select! {
                        biased;

                        _ = shutdown.changed() => WorkerState::Stopped,
                        _ = tokio::time::sleep(self.config.poll_interval) => WorkerState::Claiming,
                    }
                }
                WorkerState::Claiming => {
                    let stopping = *shutdown.borrow();
                    if stopping {
                        WorkerState::Stopped
                    } else {
                        self.claim().await
                    }
                }
                WorkerState::Processing(mut batch) => match batch.pop_front() {
                    Some(message) => {
                        self.process(&message).await;
                        WorkerState::Acknowledging {
                            message,
                            rest: batch,
                        }
                    }
                    None => WorkerState::Claiming,
                },
                WorkerState::Acknowledging { message, rest } => {
                    match self.source.ack(&message).await {
                        Ok(()) => {
                            self.stats.acked += 1;
                            WorkerState::Processing(rest)
                        }
                        Err(e) => {
                            // The rest of the batch comes back on the next claim
                            error!(worker = %self.name, seq = message.seq, "Failed to ack: {}", e);
                            WorkerState::Idle
                        }
                    }
                }
                WorkerState::Stopped => break,
            };
        }

        info!(worker = %self.name, stats = ?self.stats, "Report worker stopped");
        self.stats
    }

    async fn claim(&self) -> WorkerState {
        match self.source.claim(self.config.batch_size).await {
            Ok(batch) if batch.is_empty() => WorkerState::Idle,
            Ok(batch) => {
                debug!(worker = %self.name, count = batch.len(), "Claimed requests");
                WorkerState::Processing(batch.into())
            }
            Err(e) => {
                error!(worker = %self.name, "Failed to claim requests: {}", e);
                WorkerState::Idle
            }
        }
    }

    /// Build and deliver the report for one message.
    async fn process(&mut self, message: &QueuedMessage) {
        let request = match ReportRequest::decode(&message.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    worker = %self.name,
                    partition = message.partition,
                    seq = message.seq,
                    "Skipping undecodable request: {}", e
                );
                self.stats.poison += 1;
                return;
            }
        };

        info!(
            worker = %self.name,
            user_id = %request.user_id,
            period = %request.period,
            age_ms = request.age_ms(),
            "Building report"
        );
        let result = self.builder.build(request.user_id, request.period).await;
        self.deliver(&result).await;
    }

    async fn deliver(&mut self, result: &ReportResult) {
        match self.sink.deliver(result).await {
            Ok(()) => {
                debug!(worker = %self.name, user_id = %result.user_id, "Report delivered");
                self.stats.delivered += 1;
            }
            Err(e) => {
                // The user's next query rebuilds on cache miss
                warn!(
                    worker = %self.name,
                    user_id = %result.user_id,
                    period = %result.period,
                    "Dropping undeliverable report: {}", e
                );
                self.stats.dropped += 1;
            }
        }
    }
}

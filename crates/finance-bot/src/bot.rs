//! Command handlers and the report request path.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use ledger::{ExpenseRecord, Ledger, UserRecord};
use report_cache::ReportCache;
use report_core::{ReportPeriod, ReportRequest, UserId};
use report_queue::ReportEnqueuer;
use tracing::{debug, error, info, warn};

use crate::command::{expense_time, Command};
use crate::error::{BotError, HandlerError, ReplyOnError};
use crate::freshness::CacheFreshness;
use crate::messages;
use crate::metrics;
use crate::sender::MessageSender;

/// Front-end coordinator: answers commands, serves cached reports and
/// requests builds on a miss.
pub struct FinanceBot {
    ledger: Arc<dyn Ledger>,
    cache: Arc<dyn ReportCache>,
    queue: Arc<dyn ReportEnqueuer>,
    sender: Arc<dyn MessageSender>,
    freshness: Arc<CacheFreshness>,
    base_currency: String,
}

impl FinanceBot {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        cache: Arc<dyn ReportCache>,
        queue: Arc<dyn ReportEnqueuer>,
        sender: Arc<dyn MessageSender>,
        freshness: Arc<CacheFreshness>,
        base_currency: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            cache,
            queue,
            sender,
            freshness,
            base_currency: base_currency.into(),
        }
    }

    /// Handle one inbound message and send the reply.
    pub async fn handle_incoming(&self, user_id: UserId, text: &str) -> Result<(), BotError> {
        let reply = self.handle(user_id, text).await;
        self.sender.send_message(user_id, &reply).await
    }

    /// Compute the reply to a message.
    ///
    /// Malformed input gets its specific message. Failed handlers get their
    /// cushioned reply behind [`messages::SORRY_PREFIX`].
    pub async fn handle(&self, user_id: UserId, text: &str) -> String {
        let started = Instant::now();
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(e) => {
                debug!(user_id = %user_id, "Rejected input: {}", e);
                metrics::observe_response("rejected", false, started.elapsed());
                return e.reply();
            }
        };

        let name = command.name();
        info!(user_id = %user_id, command = name, "Handling command - start");
        let (reply, failed) = match self.dispatch(user_id, command).await {
            Ok(reply) => (reply, false),
            Err(e) => {
                if e.is_limit_exceeded() {
                    info!(user_id = %user_id, "Expense over monthly limit");
                } else {
                    error!(user_id = %user_id, "Command failed: {}", e);
                }
                (format!("{}{}", messages::SORRY_PREFIX, e.reply), true)
            }
        };
        metrics::observe_response(name, failed, started.elapsed());
        info!(user_id = %user_id, command = name, "Handling command - end");

        reply
    }

    async fn dispatch(&self, user_id: UserId, command: Command) -> Result<String, HandlerError> {
        match command {
            Command::Start => self.start(user_id).await,
            Command::Expense {
                category,
                amount,
                date,
            } => {
                let created = date.map(expense_time).unwrap_or_else(Utc::now);
                self.expense(user_id, &category, amount, created).await
            }
            Command::Report(period) => self.report(user_id, period).await,
            Command::Currency(code) => self.currency(user_id, &code).await,
            Command::Limit(limit) => self.limit(user_id, limit).await,
            Command::Chat(_) => Ok(messages::LOVE_TO_TALK.to_string()),
            Command::Unknown(_) => Ok(messages::DONT_UNDERSTAND.to_string()),
        }
    }

    async fn start(&self, user_id: UserId) -> Result<String, HandlerError> {
        self.ledger
            .save_user(user_id, &UserRecord::default())
            .await
            .or_reply("handle start", messages::HELLO_FAILED)?;
        Ok(messages::HELLO.to_string())
    }

    async fn expense(
        &self,
        user_id: UserId,
        category: &str,
        amount: f64,
        created: chrono::DateTime<Utc>,
    ) -> Result<String, HandlerError> {
        let user = self
            .ledger
            .get_user(user_id)
            .await
            .or_reply("handle expense", messages::CANNOT_GET_EXPENSES)?;
        let rate = self
            .ledger
            .get_rate(user.preferred_currency_or(&self.base_currency))
            .await
            .or_reply("handle expense", messages::CANNOT_GET_RATE)?;

        let stored = amount / rate.value;
        if !stored.is_finite() {
            debug!(user_id = %user_id, amount, "Converted expense out of range");
            return Ok(messages::INCORRECT_EXPENSE.to_string());
        }

        let expense = ExpenseRecord::new(stored, category, created);
        if let Err(e) = self.ledger.save_expense(user_id, &expense).await {
            let reply = if e.is_limit_exceeded() {
                messages::LIMIT_EXCEEDED
            } else {
                messages::CANNOT_SAVE_EXPENSE
            };
            return Err(e).or_reply("handle expense", reply);
        }

        self.invalidate_reports(user_id).await;
        Ok(messages::OK.to_string())
    }

    /// Drop every cached report of the user. Runs before the expense is
    /// acknowledged; failures are logged only.
    async fn invalidate_reports(&self, user_id: UserId) {
        let mut freshness = self.freshness.lock(user_id).await;
        freshness.mark_invalidated();
        if let Err(e) = self.cache.invalidate(user_id, &ReportPeriod::ALL).await {
            warn!(user_id = %user_id, "Failed to invalidate cached reports: {}", e);
        }
    }

    async fn report(&self, user_id: UserId, period: ReportPeriod) -> Result<String, HandlerError> {
        match self.cache.get(user_id, period).await {
            Ok(Some(report)) => {
                debug!(user_id = %user_id, period = %period, "Report cache hit");
                return Ok(report);
            }
            Ok(None) => {}
            Err(e) => warn!(user_id = %user_id, "Report cache unavailable, treating as miss: {}", e),
        }

        let expenses = self
            .ledger
            .get_expenses(user_id)
            .await
            .or_reply("handle report", messages::CANNOT_GET_EXPENSES)?;
        if expenses.is_empty() {
            return Ok(messages::NO_EXPENSES.to_string());
        }

        self.queue
            .enqueue(&ReportRequest::new(user_id, period))
            .await
            .or_reply("handle report", messages::CANNOT_GET_EXPENSES)?;
        info!(user_id = %user_id, period = %period, "Report requested");

        Ok(messages::GENERATING.to_string())
    }

    async fn currency(&self, user_id: UserId, code: &str) -> Result<String, HandlerError> {
        let user = self
            .ledger
            .get_user(user_id)
            .await
            .or_reply("handle currency", messages::CANNOT_SET_CURRENCY)?;
        self.ledger
            .save_user(user_id, &user.with_preferred_currency(code))
            .await
            .or_reply("handle currency", messages::CANNOT_SET_CURRENCY)?;

        // Cached reports are rendered in the old currency
        self.invalidate_reports(user_id).await;
        Ok(messages::OK.to_string())
    }

    async fn limit(&self, user_id: UserId, limit: f64) -> Result<String, HandlerError> {
        let user = self
            .ledger
            .get_user(user_id)
            .await
            .or_reply("handle limit", messages::CANNOT_SET_LIMIT)?;
        let rate = self
            .ledger
            .get_rate(user.preferred_currency_or(&self.base_currency))
            .await
            .or_reply("handle limit", messages::CANNOT_GET_RATE)?;

        let stored = limit / rate.value;
        if !stored.is_finite() {
            debug!(user_id = %user_id, limit, "Converted limit out of range");
            return Ok(messages::INCORRECT_LIMIT.to_string());
        }

        self.ledger
            .save_user(user_id, &user.with_month_limit(stored))
            .await
            .or_reply("handle limit", messages::CANNOT_SET_LIMIT)?;
        Ok(messages::OK.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledger::{MemoryLedger, Rate, RateTable};
    use report_cache::MemoryReportCache;
    use report_queue::QueueError;
    use tokio::sync::Mutex;

    use crate::sender::RecordingSender;

    #[derive(Default)]
    struct CountingQueue {
        requests: Mutex<Vec<ReportRequest>>,
    }

    #[async_trait]
    impl ReportEnqueuer for CountingQueue {
        async fn enqueue(&self, request: &ReportRequest) -> report_queue::Result<()> {
            self.requests.lock().await.push(*request);
            Ok(())
        }
    }

    struct BrokenQueue;

    #[async_trait]
    impl ReportEnqueuer for BrokenQueue {
        async fn enqueue(&self, _request: &ReportRequest) -> report_queue::Result<()> {
            Err(QueueError::NoPartitions)
        }
    }

    struct Harness {
        bot: FinanceBot,
        ledger: Arc<MemoryLedger>,
        cache: Arc<MemoryReportCache>,
        queue: Arc<CountingQueue>,
    }

    fn harness() -> Harness {
        let now = Utc::now();
        let ledger = Arc::new(MemoryLedger::with_rates(
            RateTable::new()
                .with_rate(Rate::populated("RUB", 1.0, now))
                .with_rate(Rate::populated("USD", 0.01, now))
                .with_rate(Rate::unpopulated("EUR")),
        ));
        let cache = Arc::new(MemoryReportCache::new());
        let queue = Arc::new(CountingQueue::default());
        let bot = FinanceBot::new(
            ledger.clone(),
            cache.clone(),
            queue.clone(),
            Arc::new(RecordingSender::new()),
            Arc::new(CacheFreshness::new()),
            "RUB",
        );
        Harness {
            bot,
            ledger,
            cache,
            queue,
        }
    }

    #[tokio::test]
    async fn start_registers_user() {
        let h = harness();
        assert_eq!(h.bot.handle(UserId(1), "/start").await, messages::HELLO);
        assert_eq!(
            h.ledger.get_user(UserId(1)).await.unwrap(),
            UserRecord::default()
        );
    }

    #[tokio::test]
    async fn chat_and_unknown_commands() {
        let h = harness();
        assert_eq!(h.bot.handle(UserId(1), "hello").await, messages::LOVE_TO_TALK);
        assert_eq!(h.bot.handle(UserId(1), "/dance").await, messages::DONT_UNDERSTAND);
        assert_eq!(
            h.bot.handle(UserId(1), "/expense Food").await,
            messages::INCORRECT_USAGE
        );
    }

    #[tokio::test]
    async fn expense_is_converted_to_base() {
        let h = harness();
        h.bot.handle(UserId(1), "/currency USD").await;

        assert_eq!(h.bot.handle(UserId(1), "/expense Food 5").await, messages::OK);
        let expenses = h.ledger.get_expenses(UserId(1)).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert!((expenses[0].amount - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn expense_invalidates_every_cached_period() {
        let h = harness();
        for period in ReportPeriod::ALL {
            h.cache.put(UserId(1), period, "stale").await.unwrap();
        }

        assert_eq!(h.bot.handle(UserId(1), "/expense Food 5").await, messages::OK);
        assert!(h.cache.is_empty().await);
    }

    #[tokio::test]
    async fn limit_exceeded_has_its_own_reply() {
        let h = harness();
        h.bot.handle(UserId(1), "/limit 100").await;
        h.bot.handle(UserId(1), "/expense Food 80").await;

        let reply = h.bot.handle(UserId(1), "/expense Food 30").await;
        assert_eq!(
            reply,
            format!("{}{}", messages::SORRY_PREFIX, messages::LIMIT_EXCEEDED)
        );
        assert_eq!(h.ledger.get_expenses(UserId(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unpopulated_rate_blocks_expense() {
        let h = harness();
        h.bot.handle(UserId(1), "/currency EUR").await;

        let reply = h.bot.handle(UserId(1), "/expense Food 30").await;
        assert_eq!(
            reply,
            format!("{}{}", messages::SORRY_PREFIX, messages::CANNOT_GET_RATE)
        );
    }

    #[tokio::test]
    async fn cold_report_enqueues_once() {
        let h = harness();
        h.bot.handle(UserId(1), "/expense Food 5").await;

        assert_eq!(
            h.bot.handle(UserId(1), "/report week").await,
            messages::GENERATING
        );
        let requests = h.queue.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_id, UserId(1));
        assert_eq!(requests[0].period, ReportPeriod::Week);
    }

    #[tokio::test]
    async fn cached_report_is_served_without_enqueue() {
        let h = harness();
        h.bot.handle(UserId(1), "/expense Food 5").await;
        h.cache
            .put(UserId(1), ReportPeriod::Month, "Food: 5.00\n\nTotal: 5.00")
            .await
            .unwrap();

        assert_eq!(
            h.bot.handle(UserId(1), "/report month").await,
            "Food: 5.00\n\nTotal: 5.00"
        );
        assert!(h.queue.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn no_expenses_short_circuits() {
        let h = harness();
        assert_eq!(h.bot.handle(UserId(1), "/report").await, messages::NO_EXPENSES);
        assert!(h.queue.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn enqueue_failure_is_cushioned() {
        let ledger = Arc::new(MemoryLedger::with_rates(
            RateTable::new().with_rate(Rate::populated("RUB", 1.0, Utc::now())),
        ));
        let bot = FinanceBot::new(
            ledger,
            Arc::new(MemoryReportCache::new()),
            Arc::new(BrokenQueue),
            Arc::new(RecordingSender::new()),
            Arc::new(CacheFreshness::new()),
            "RUB",
        );
        bot.handle(UserId(1), "/expense Food 5").await;

        assert_eq!(
            bot.handle(UserId(1), "/report").await,
            format!("{}{}", messages::SORRY_PREFIX, messages::CANNOT_GET_EXPENSES)
        );
    }

    #[tokio::test]
    async fn limit_is_stored_in_base_currency() {
        let h = harness();
        h.bot.handle(UserId(1), "/currency USD").await;
        assert_eq!(h.bot.handle(UserId(1), "/limit 10").await, messages::OK);

        let user = h.ledger.get_user(UserId(1)).await.unwrap();
        assert!((user.month_limit() - 1000.0).abs() < 1e-9);
        assert_eq!(user.preferred_currency(), Some("USD"));
    }

    #[tokio::test]
    async fn overflowing_conversion_is_rejected() {
        let h = harness();
        h.bot.handle(UserId(1), "/currency USD").await;

        assert_eq!(
            h.bot.handle(UserId(1), "/expense Car 1e307").await,
            messages::INCORRECT_EXPENSE
        );
        assert!(h.ledger.get_expenses(UserId(1)).await.unwrap().is_empty());

        assert_eq!(
            h.bot.handle(UserId(1), "/limit 1e307").await,
            messages::INCORRECT_LIMIT
        );
        assert_eq!(h.ledger.get_user(UserId(1)).await.unwrap().month_limit(), 0.0);
    }

    #[tokio::test]
    async fn failed_commands_are_observed_as_errors() {
        let h = harness();
        h.bot.handle(UserId(1), "/currency EUR").await;
        let samples = || {
            metrics::METRICS
                .as_ref()
                .unwrap()
                .response_time_seconds
                .with_label_values(&["expense", "true"])
                .get_sample_count()
        };
        let before = samples();

        h.bot.handle(UserId(1), "/expense Food 30").await;
        assert!(samples() > before);
    }
}

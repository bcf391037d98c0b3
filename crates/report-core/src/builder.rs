//! Report generation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use ledger::{Ledger, UserId};
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::period::ReportPeriod;
use crate::result::{ReportRecord, ReportResult};

/// Builds categorized spending reports from the ledger.
///
/// Reads the user, their expenses and one rate; performs no caching or
/// messaging. Two builds over the same ledger state yield equal results
/// apart from the `generated_at_ms` stamp, which records the build clock.
#[derive(Clone)]
pub struct ReportBuilder {
    ledger: Arc<dyn Ledger>,
    default_currency: String,
}

impl ReportBuilder {
    pub fn new(ledger: Arc<dyn Ledger>, default_currency: impl Into<String>) -> Self {
        Self {
            ledger,
            default_currency: default_currency.into(),
        }
    }

    /// Currency used for users without a preference.
    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Build a report for the period ending now.
    pub async fn build(&self, user_id: UserId, period: ReportPeriod) -> ReportResult {
        self.build_at(user_id, period, Local::now()).await
    }

    /// Build a report with an explicit clock.
    pub async fn build_at(
        &self,
        user_id: UserId,
        period: ReportPeriod,
        now: DateTime<Local>,
    ) -> ReportResult {
        let result = match self.try_build(user_id, period, now).await {
            Ok(result) => result,
            Err(e) => {
                warn!(user_id = %user_id, period = %period, error = %e, "Report build failed");
                ReportResult::failed(user_id, period, e.to_string())
            }
        };
        result.generated_at(now.timestamp_millis())
    }

    async fn try_build(
        &self,
        user_id: UserId,
        period: ReportPeriod,
        now: DateTime<Local>,
    ) -> Result<ReportResult, ReportError> {
        let user = self.ledger.get_user(user_id).await?;
        let currency = user.preferred_currency_or(&self.default_currency);

        let expenses = self.ledger.get_expenses(user_id).await?;
        if expenses.is_empty() {
            debug!(user_id = %user_id, "No expenses to report");
            return Ok(ReportResult::no_data(user_id, period));
        }

        let start = period.start(&now);
        let in_period = expenses
            .iter()
            .filter(|e| start.map_or(true, |start| e.created >= start));

        let rate = self.ledger.get_rate(currency).await?;

        let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
        for expense in in_period {
            *by_category.entry(expense.category.as_str()).or_default() += expense.amount * rate.value;
        }

        let mut records: Vec<ReportRecord> = by_category
            .into_iter()
            .map(|(category, amount)| ReportRecord {
                category: category.to_string(),
                amount,
            })
            .collect();
        records.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        if let Some(record) = records.iter().find(|r| !r.amount.is_finite()) {
            return Err(ReportError::OutOfRange(record.category.clone()));
        }
        let total: f64 = records.iter().map(|r| r.amount).sum();
        if !total.is_finite() {
            return Err(ReportError::OutOfRange("total".to_string()));
        }

        debug!(
            user_id = %user_id,
            period = %period,
            currency,
            categories = records.len(),
            "Report built"
        );

        Ok(ReportResult::success(user_id, period, records, total))
    }
}

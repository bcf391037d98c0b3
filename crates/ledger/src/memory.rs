//! In-process ledger, used by tests and single-process setups.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Local, Utc};
use tokio::sync::RwLock;

use crate::calendar;
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::models::{ExpenseRecord, Rate, UserId, UserRecord};
use crate::rates::{RateStore, RateTable};

/// A [`Ledger`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    users: RwLock<HashMap<UserId, UserRecord>>,
    expenses: RwLock<HashMap<UserId, Vec<ExpenseRecord>>>,
    rates: RateStore,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger with an initial rate table.
    pub fn with_rates(table: RateTable) -> Self {
        Self {
            rates: RateStore::new(table),
            ..Self::default()
        }
    }

    /// The rate snapshot holder.
    pub fn rates(&self) -> &RateStore {
        &self.rates
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_user(&self, user_id: UserId, record: &UserRecord) -> Result<()> {
        self.users.write().await.insert(user_id, record.clone());
        Ok(())
    }

    async fn save_expense(&self, user_id: UserId, expense: &ExpenseRecord) -> Result<()> {
        let limit = self
            .get_user(user_id)
            .await
            .map_err(|e| e.context("save expense"))?
            .month_limit();

        let mut expenses = self.expenses.write().await;
        let entries = expenses.entry(user_id).or_default();

        if limit > 0.0 {
            let now = Local::now();
            let start = calendar::beginning_of_month(&now);
            let end = calendar::beginning_of_next_month(&now);
            let in_window = |e: &ExpenseRecord| e.created >= start && e.created < end;

            let mut spent: f64 = entries.iter().filter(|e| in_window(*e)).map(|e| e.amount).sum();
            if in_window(expense) {
                spent += expense.amount;
            }
            if spent > limit {
                return Err(LedgerError::LimitExceeded { user_id }.context("save expense"));
            }
        }

        entries.push(expense.clone());
        Ok(())
    }

    async fn get_expenses(&self, user_id: UserId) -> Result<Vec<ExpenseRecord>> {
        Ok(self
            .expenses
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_rate(&self, code: &str) -> Result<Rate> {
        self.rates.lookup(code).await.map_err(|e| e.context("get rate"))
    }

    async fn set_rate(&self, code: &str, value: f64) -> Result<()> {
        let rate = Rate::populated(code, value, Utc::now());
        self.rates.update(|table| table.with_rate(rate)).await;
        Ok(())
    }

    async fn new_rate(&self, code: &str) -> Result<()> {
        let code = code.to_string();
        self.rates
            .update(|table| {
                if table.get(&code).is_some() {
                    table
                } else {
                    table.with_rate(Rate::unpopulated(code))
                }
            })
            .await;
        Ok(())
    }

    async fn publish_rates(&self, table: RateTable) -> Result<()> {
        self.rates
            .update(|current| {
                table.iter().fold(current, |acc, rate| {
                    if !rate.populated && acc.get(&rate.code).is_some() {
                        acc
                    } else {
                        acc.with_rate(rate.clone())
                    }
                })
            })
            .await;
        Ok(())
    }
}

//! Snapshot-based rate table.
//!
//! Readers take an `Arc` to the current table; a refresh builds a complete
//! new table and swaps it in. A report build therefore sees either the old
//! rates or the new ones, never a mix.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{LedgerError, Result};
use crate::models::Rate;

/// An immutable set of rates keyed by currency code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, Rate>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a rate, returning the extended table.
    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rates.insert(rate.code.clone(), rate);
        self
    }

    /// Look up a rate by code without checking whether it is populated.
    pub fn get(&self, code: &str) -> Option<&Rate> {
        self.rates.get(code)
    }

    /// Look up a usable rate.
    ///
    /// Unpopulated rates are reported as [`LedgerError::RateNotPopulated`].
    pub fn lookup(&self, code: &str) -> Result<Rate> {
        match self.rates.get(code) {
            None => Err(LedgerError::RateNotFound {
                code: code.to_string(),
            }),
            Some(rate) if !rate.populated => Err(LedgerError::RateNotPopulated {
                code: code.to_string(),
            }),
            Some(rate) => Ok(rate.clone()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rate> {
        self.rates.values()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Holder of the current [`RateTable`] snapshot.
#[derive(Debug, Default)]
pub struct RateStore {
    current: RwLock<Arc<RateTable>>,
}

impl RateStore {
    pub fn new(table: RateTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<RateTable> {
        self.current.read().await.clone()
    }

    /// Replace the current snapshot.
    pub async fn publish(&self, table: RateTable) {
        *self.current.write().await = Arc::new(table);
    }

    /// Build a new snapshot from the current one and publish it.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(RateTable) -> RateTable,
    {
        let mut guard = self.current.write().await;
        let next = f(guard.as_ref().clone());
        *guard = Arc::new(next);
    }

    /// Look up a usable rate in the current snapshot.
    pub async fn lookup(&self, code: &str) -> Result<Rate> {
        self.snapshot().await.lookup(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn unpopulated_rate_is_an_error() {
        let table = RateTable::new().with_rate(Rate::unpopulated("USD"));
        let err = table.lookup("USD").unwrap_err();
        assert!(matches!(err, LedgerError::RateNotPopulated { .. }));
    }

    #[test]
    fn missing_rate_is_an_error() {
        let err = RateTable::new().lookup("EUR").unwrap_err();
        assert!(matches!(err, LedgerError::RateNotFound { .. }));
    }

    #[tokio::test]
    async fn readers_keep_their_snapshot_across_publish() {
        let store = RateStore::new(
            RateTable::new().with_rate(Rate::populated("USD", 0.1, Utc::now())),
        );

        let before = store.snapshot().await;
        store
            .publish(RateTable::new().with_rate(Rate::populated("USD", 0.2, Utc::now())))
            .await;

        assert_eq!(before.lookup("USD").unwrap().value, 0.1);
        assert_eq!(store.lookup("USD").await.unwrap().value, 0.2);
    }

    #[tokio::test]
    async fn update_extends_current_table() {
        let store = RateStore::new(RateTable::new().with_rate(Rate::unpopulated("RUB")));
        store
            .update(|table| table.with_rate(Rate::populated("RUB", 1.0, Utc::now())))
            .await;
        assert_eq!(store.lookup("RUB").await.unwrap().value, 1.0);
    }
}

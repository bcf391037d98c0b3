//! Ledger models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Currencies the bot knows how to convert between.
pub const SUPPORTED_CURRENCIES: [&str; 4] = ["RUB", "USD", "EUR", "CNY"];

/// Check whether a currency code is one of [`SUPPORTED_CURRENCIES`].
pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Chat user identity, stable for the lifetime of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// The raw identifier.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// Per-user settings.
///
/// Immutable: updates go through the `with_*` constructors, which return a
/// new record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    preferred_currency: Option<String>,
    month_limit: f64,
}

impl UserRecord {
    /// Create a record from stored values.
    pub fn new(preferred_currency: Option<String>, month_limit: f64) -> Self {
        Self {
            preferred_currency: preferred_currency.filter(|c| !c.is_empty()),
            month_limit,
        }
    }

    /// The preferred currency, if the user picked one.
    pub fn preferred_currency(&self) -> Option<&str> {
        self.preferred_currency.as_deref()
    }

    /// The preferred currency, or `default` when unset.
    pub fn preferred_currency_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.preferred_currency().unwrap_or(default)
    }

    /// Monthly limit in the base currency. Zero means "no limit".
    pub fn month_limit(&self) -> f64 {
        self.month_limit
    }

    /// A copy of this record with a different preferred currency.
    pub fn with_preferred_currency(&self, currency: impl Into<String>) -> Self {
        Self::new(Some(currency.into()), self.month_limit)
    }

    /// A copy of this record with a different monthly limit.
    pub fn with_month_limit(&self, month_limit: f64) -> Self {
        Self {
            preferred_currency: self.preferred_currency.clone(),
            month_limit,
        }
    }
}

/// A single expense, stored in the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Positive amount in the base currency.
    pub amount: f64,
    /// Free-text category label.
    pub category: String,
    /// When the expense happened.
    pub created: DateTime<Utc>,
}

impl ExpenseRecord {
    pub fn new(amount: f64, category: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            amount,
            category: category.into(),
            created,
        }
    }
}

/// Exchange rate of a currency relative to the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Currency code, e.g. "USD".
    pub code: String,
    /// Units of this currency per one unit of base currency.
    pub value: f64,
    /// False until the rate has been pulled at least once.
    pub populated: bool,
    /// Last successful update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rate {
    /// A registered currency whose value has not been pulled yet.
    pub fn unpopulated(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            value: 0.0,
            populated: false,
            updated_at: None,
        }
    }

    /// A rate with a known value.
    pub fn populated(code: impl Into<String>, value: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            value,
            populated: true,
            updated_at: Some(updated_at),
        }
    }
}

//! Command parsing.
//!
//! Every inbound text maps to exactly one [`Command`]; malformed arguments
//! become a [`CommandError`] whose reply is sent back as is.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use report_core::ReportPeriod;
use thiserror::Error;

use crate::messages;

/// Date format accepted by `/expense`.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Offset in which user-supplied dates are interpreted (UTC+3).
const USER_OFFSET_SECS: i32 = 3 * 3600;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/expense <category> <amount> [dd.mm.yyyy]`
    Expense {
        category: String,
        amount: f64,
        date: Option<NaiveDate>,
    },
    /// `/report [week|month|year]`
    Report(ReportPeriod),
    /// `/currency <code>`
    Currency(String),
    /// `/limit <amount>`
    Limit(f64),
    /// Plain text without a command.
    Chat(String),
    /// A slash command we do not know.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("incorrect usage")]
    IncorrectUsage,
    #[error("invalid expense amount {0:?}")]
    InvalidAmount(String),
    #[error("invalid limit {0:?}")]
    InvalidLimit(String),
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("unknown currency {0:?}")]
    UnknownCurrency(String),
}

impl CommandError {
    /// Text shown to the user.
    pub fn reply(&self) -> String {
        match self {
            CommandError::IncorrectUsage => messages::INCORRECT_USAGE.to_string(),
            CommandError::InvalidAmount(_) => messages::INCORRECT_EXPENSE.to_string(),
            CommandError::InvalidLimit(_) => messages::INCORRECT_LIMIT.to_string(),
            CommandError::InvalidDate(_) => messages::INCORRECT_DATE.to_string(),
            CommandError::UnknownCurrency(_) => messages::unknown_currency(),
        }
    }
}

impl Command {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Expense { .. } => "expense",
            Command::Report(_) => "report",
            Command::Currency(_) => "currency",
            Command::Limit(_) => "limit",
            Command::Chat(_) => "chat",
            Command::Unknown(_) => "unknown",
        }
    }

    /// Parse a message text.
    pub fn parse(text: &str) -> Result<Command, CommandError> {
        let text = text.trim();
        if !text.starts_with('/') {
            return Ok(Command::Chat(text.to_string()));
        }

        let (cmd, arg) = match text.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (text, ""),
        };

        match cmd {
            "/start" => Ok(Command::Start),
            "/expense" => parse_expense(arg),
            "/report" => arg
                .parse()
                .map(Command::Report)
                .map_err(|_| CommandError::IncorrectUsage),
            "/currency" => parse_currency(arg),
            "/limit" => parse_limit(arg),
            other => Ok(Command::Unknown(other.to_string())),
        }
    }
}

fn parse_expense(arg: &str) -> Result<Command, CommandError> {
    let args: Vec<&str> = arg.split_whitespace().collect();
    let (category, amount, date) = match args.as_slice() {
        [category, amount] => (*category, *amount, None),
        [category, amount, date] => (*category, *amount, Some(*date)),
        _ => return Err(CommandError::IncorrectUsage),
    };

    let amount = match amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => return Err(CommandError::InvalidAmount(amount.to_string())),
    };

    let date = date
        .map(|d| {
            NaiveDate::parse_from_str(d, DATE_FORMAT)
                .map_err(|_| CommandError::InvalidDate(d.to_string()))
        })
        .transpose()?;

    Ok(Command::Expense {
        category: category.to_string(),
        amount,
        date,
    })
}

fn parse_currency(arg: &str) -> Result<Command, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::IncorrectUsage);
    }
    let code = arg.to_uppercase();
    if !ledger::is_supported_currency(&code) {
        return Err(CommandError::UnknownCurrency(arg.to_string()));
    }
    Ok(Command::Currency(code))
}

fn parse_limit(arg: &str) -> Result<Command, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::IncorrectUsage);
    }
    match arg.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Command::Limit(value)),
        _ => Err(CommandError::InvalidLimit(arg.to_string())),
    }
}

/// Midnight of `date` in the users' time zone.
pub fn expense_time(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match FixedOffset::east_opt(USER_OFFSET_SECS) {
        Some(offset) => match offset.from_local_datetime(&midnight).single() {
            Some(local) => local.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&midnight),
        },
        None => Utc.from_utc_datetime(&midnight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(
            Command::parse("  how are you? ").unwrap(),
            Command::Chat("how are you?".to_string())
        );
    }

    #[test]
    fn unknown_slash_command() {
        assert_eq!(
            Command::parse("/dance now").unwrap(),
            Command::Unknown("/dance".to_string())
        );
    }

    #[test]
    fn expense_with_and_without_date() {
        assert_eq!(
            Command::parse("/expense Food 12.5").unwrap(),
            Command::Expense {
                category: "Food".into(),
                amount: 12.5,
                date: None
            }
        );
        assert_eq!(
            Command::parse("/expense Taxi 300 01.02.2024").unwrap(),
            Command::Expense {
                category: "Taxi".into(),
                amount: 300.0,
                date: NaiveDate::from_ymd_opt(2024, 2, 1)
            }
        );
    }

    #[test]
    fn expense_errors() {
        assert_eq!(
            Command::parse("/expense Food").unwrap_err(),
            CommandError::IncorrectUsage
        );
        assert!(matches!(
            Command::parse("/expense Food -3").unwrap_err(),
            CommandError::InvalidAmount(_)
        ));
        assert!(matches!(
            Command::parse("/expense Food abc").unwrap_err(),
            CommandError::InvalidAmount(_)
        ));
        assert!(matches!(
            Command::parse("/expense Food 3 2024-02-01").unwrap_err(),
            CommandError::InvalidDate(_)
        ));
    }

    #[test]
    fn report_periods() {
        assert_eq!(
            Command::parse("/report").unwrap(),
            Command::Report(ReportPeriod::AllTime)
        );
        assert_eq!(
            Command::parse("/report month").unwrap(),
            Command::Report(ReportPeriod::Month)
        );
        assert_eq!(
            Command::parse("/report decade").unwrap_err(),
            CommandError::IncorrectUsage
        );
    }

    #[test]
    fn currency_is_validated() {
        assert_eq!(
            Command::parse("/currency usd").unwrap(),
            Command::Currency("USD".into())
        );
        let err = Command::parse("/currency GBP").unwrap_err();
        assert_eq!(
            err.reply(),
            "I don't know that currency. Try one of: RUB, USD, EUR, CNY"
        );
    }

    #[test]
    fn limit_accepts_zero() {
        assert_eq!(Command::parse("/limit 0").unwrap(), Command::Limit(0.0));
        assert_eq!(Command::parse("/limit 1000").unwrap(), Command::Limit(1000.0));
        assert!(matches!(
            Command::parse("/limit -1").unwrap_err(),
            CommandError::InvalidLimit(_)
        ));
    }

    #[test]
    fn user_dates_are_utc_plus_three() {
        let at = expense_time(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(at.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(at.hour(), 21);
    }
}

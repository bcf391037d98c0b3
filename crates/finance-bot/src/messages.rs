//! User-facing reply texts.

pub const HELLO: &str = "Hello! I am FinancesRoute bot 🤖";
pub const HELLO_FAILED: &str = "Haven't heard you. Please try /start one more time";
pub const DONT_UNDERSTAND: &str = "I don't understand you :(";
pub const LOVE_TO_TALK: &str = "I would love to talk about it more!";
pub const OK: &str = "Gotcha!";
pub const GENERATING: &str = "Generating your report, it will arrive in a moment";

pub const INCORRECT_USAGE: &str = "That is an incorrect command usage";
pub const INCORRECT_EXPENSE: &str = "Your expense amount is incorrect";
pub const INCORRECT_LIMIT: &str = "Your limit amount is incorrect";
pub const INCORRECT_DATE: &str = "The date is incorrect. Should be dd.mm.yyyy";

pub const CANNOT_GET_EXPENSES: &str = "Can't get your expenses atm. Try later";
pub const CANNOT_SAVE_EXPENSE: &str = "Can't save your expense atm. Try later";
pub const CANNOT_SET_CURRENCY: &str = "Can't set your preferred currency atm. Try later";
pub const CANNOT_SET_LIMIT: &str = "Can't set your month limit atm. Try later";
pub const CANNOT_GET_RATE: &str = "Can't get currencies rates atm. Try later";
pub const LIMIT_EXCEEDED: &str = "You exceeded your limit and I'm not writing that down! Congrats!";

/// Prepended to replies of handlers that failed.
pub const SORRY_PREFIX: &str = "Sorry, something wrong happened...\n";

pub use report_core::render::{NO_EXPENSES, REPORT_FAILED};

/// Reply for an unsupported currency code.
pub fn unknown_currency() -> String {
    format!(
        "I don't know that currency. Try one of: {}",
        ledger::SUPPORTED_CURRENCIES.join(", ")
    )
}

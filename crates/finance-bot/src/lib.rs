//! Chat front end of the finance tracker.
//!
//! Parses commands, writes expenses and settings to the ledger, serves
//! cached reports and requests new ones from the report workers. Finished
//! reports come back through the [`ReportInbox`] acceptor.

pub mod bot;
pub mod command;
pub mod config;
pub mod error;
pub mod freshness;
pub mod inbox;
pub mod listener;
pub mod messages;
pub mod metrics;
pub mod rates;
pub mod sender;

pub use bot::FinanceBot;
pub use command::{Command, CommandError};
pub use config::{CacheBackend, Config, ConfigError};
pub use error::{BotError, HandlerError};
pub use freshness::{CacheFreshness, UserFreshness};
pub use inbox::ReportInbox;
pub use listener::UpdateListener;
pub use sender::{MessageSender, RecordingSender, TelegramSender};

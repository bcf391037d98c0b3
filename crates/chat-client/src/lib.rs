//! Telegram Bot API client library.
//!
//! Supports sending text messages and receiving updates by long polling.
//!
//! # Example
//!
//! ```no_run
//! use chat_client::{BotClient, BotConfig};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), chat_client::ChatError> {
//! let client = BotClient::connect(BotConfig::new("123:token")).await?;
//!
//! let mut updates = chat_client::subscribe(&client);
//! while let Some(update) = updates.next().await {
//!     if let Some(message) = update?.message {
//!         client.send_text(message.chat.id, "Hello!").await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poll;
pub mod types;

pub use client::BotClient;
pub use config::{BotConfig, DEFAULT_API_URL};
pub use error::ChatError;
pub use poll::{subscribe, subscribe_with_config, PollConfig, RetryConfig, UpdateStream};
pub use types::*;

//! Message sender trait and implementations.

use async_trait::async_trait;
use chat_client::BotClient;
use report_core::UserId;
use tokio::sync::Mutex;

use crate::error::BotError;

/// Trait for sending replies to users.
///
/// Abstracted to support different transports (Telegram, tests, etc.)
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message to the user's chat.
    async fn send_message(&self, user_id: UserId, text: &str) -> Result<(), BotError>;
}

/// Sends through the Telegram Bot API. Users are addressed by their
/// private chat id.
#[derive(Debug, Clone)]
pub struct TelegramSender {
    client: BotClient,
}

impl TelegramSender {
    pub fn new(client: BotClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(&self, user_id: UserId, text: &str) -> Result<(), BotError> {
        self.client.send_text(user_id.get(), text).await?;
        Ok(())
    }
}

/// A sender that records every message, for tests.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(UserId, String)>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, in order.
    pub async fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to one user, in order.
    pub async fn sent_to(&self, user_id: UserId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| *to == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(&self, user_id: UserId, text: &str) -> Result<(), BotError> {
        tracing::debug!("Recording message to {}: {}", user_id, text);
        self.sent.lock().await.push((user_id, text.to_string()));
        Ok(())
    }
}

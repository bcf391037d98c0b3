//! Inbound update loop.

use std::sync::Arc;

use chat_client::{ChatError, Update};
use futures::{Stream, StreamExt};
use report_core::UserId;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::bot::FinanceBot;
use crate::error::BotError;

/// Sender identity and text of an update, if it carries a text message.
pub fn incoming_text(update: &Update) -> Option<(UserId, &str)> {
    let message = update.message.as_ref()?;
    let text = message.text()?;
    let user_id = message.from.as_ref().map_or(message.chat.id, |from| from.id);
    Some((UserId(user_id), text))
}

/// Dispatches every update to its own task.
pub struct UpdateListener {
    bot: Arc<FinanceBot>,
}

impl UpdateListener {
    pub fn new(bot: Arc<FinanceBot>) -> Self {
        Self { bot }
    }

    /// Process updates until shutdown or the end of the stream.
    ///
    /// Stops polling on shutdown and waits for handlers already running.
    pub async fn run<S>(self, updates: S, mut shutdown: watch::Receiver<bool>) -> Result<(), BotError>
    where
        S: Stream<Item = Result<Update, ChatError>> + Send,
    {
        info!("Starting update listener");
        tokio::pin!(updates);
        let mut tasks = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    info!("Shutdown signal received, stopping update listener");
                    break Ok(());
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Update handler panicked: {}", e);
                    }
                }

                next = updates.next() => match next {
                    Some(Ok(update)) => {
                        let Some((user_id, text)) = incoming_text(&update) else {
                            debug!("Skipping update {} without text", update.update_id);
                            continue;
                        };
                        let bot = self.bot.clone();
                        let text = text.to_string();
                        tasks.spawn(async move {
                            if let Err(e) = bot.handle_incoming(user_id, &text).await {
                                warn!(user_id = %user_id, "Failed to reply: {}", e);
                            }
                        });
                    }
                    Some(Err(e)) => error!("Update stream error: {}", e),
                    None => {
                        warn!("Update stream ended");
                        break Err(BotError::StreamEnded);
                    }
                },
            }
        };

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Update handler panicked: {}", e);
            }
        }
        info!("Update listener stopped");
        outcome
    }
}

//! Bot API HTTP client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BotConfig;
use crate::error::ChatError;
use crate::types::{ApiResponse, GetUpdatesParams, Message, SendMessageParams, Update, User};

/// Slack added on top of the long-poll timeout for the HTTP request.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// Client for the Telegram Bot API.
#[derive(Clone)]
pub struct BotClient {
    http: Client,
    config: BotConfig,
    connected: Arc<AtomicBool>,
}

impl BotClient {
    /// Connect to the Bot API, verifying the token with `getMe`.
    pub async fn connect(config: BotConfig) -> Result<Self, ChatError> {
        let client = Self::new(config)?;

        let me = match client.get_me().await {
            Ok(me) => me,
            Err(ChatError::Api { code: 401, .. }) => return Err(ChatError::Unauthorized),
            Err(e) => return Err(e),
        };
        client.connected.store(true, Ordering::SeqCst);
        info!(
            "Connected to Bot API at {} as @{}",
            client.config.api_url,
            me.username.as_deref().unwrap_or(&me.first_name)
        );

        Ok(client)
    }

    /// Build a client without contacting the API.
    pub fn new(config: BotConfig) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ChatError::Http)?;

        Ok(Self {
            http,
            config,
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Check if the last call reached the API.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the API.
    pub async fn health_check(&self) -> Result<bool, ChatError> {
        match self.get_me().await {
            Ok(_) => Ok(true),
            Err(ChatError::Api { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The bot's own account.
    pub async fn get_me(&self) -> Result<User, ChatError> {
        self.call::<(), _>("getMe", None, None).await
    }

    /// Send a text message to a chat.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Message, ChatError> {
        self.call("sendMessage", Some(SendMessageParams::text(chat_id, text)), None)
            .await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ChatError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message".to_string()],
        };
        let request_timeout = Duration::from_secs(timeout_secs) + LONG_POLL_GRACE;
        self.call("getUpdates", Some(params), Some(request_timeout))
            .await
    }

    /// Get the configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Call a Bot API method.
    async fn call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
        timeout: Option<Duration>,
    ) -> Result<R, ChatError> {
        debug!("Bot API call: {}", method);

        let mut request = self.http.post(self.config.method_url(method));
        if let Some(params) = params {
            request = request.json(&params);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            ChatError::Http(e)
        })?;
        self.connected.store(true, Ordering::SeqCst);

        // Error statuses still carry the JSON envelope
        let body = response.text().await.map_err(ChatError::Http)?;
        let envelope: ApiResponse<R> = serde_json::from_str(&body)?;

        if !envelope.ok {
            return Err(ChatError::Api {
                code: envelope.error_code.unwrap_or(-1),
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope
            .result
            .ok_or_else(|| ChatError::EmptyResponse(method.to_string()))
    }
}

impl std::fmt::Debug for BotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotClient")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

//! Error types for chat-client.

use thiserror::Error;

/// Errors that can occur when talking to the Bot API.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered `ok: false`.
    #[error("API error {code}: {description}")]
    Api { code: i32, description: String },

    /// The API answered `ok: true` without a result.
    #[error("empty API response for {0}")]
    EmptyResponse(String),

    /// The token was rejected during connect.
    #[error("bot token rejected")]
    Unauthorized,
}

//! Configuration types for the bot client.

/// Public Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Configuration for talking to the Bot API.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot token issued by BotFather.
    pub token: String,
    /// Base URL of the API server. Overridable for local API servers and tests.
    pub api_url: String,
}

impl BotConfig {
    /// Create a configuration for the public API.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Use a different API server.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of a Bot API method.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }
}

// The token is a credential; keep it out of logs.
impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_url_includes_token() {
        let config = BotConfig::new("123:abc").with_api_url("http://localhost:8081/");
        assert_eq!(
            config.method_url("getMe"),
            "http://localhost:8081/bot123:abc/getMe"
        );
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", BotConfig::new("secret-token"));
        assert!(!rendered.contains("secret-token"));
    }
}

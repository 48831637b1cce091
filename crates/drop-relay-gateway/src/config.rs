//! Gateway configuration

use serde::{Deserialize, Serialize};

/// Default upstream webhook send endpoint, keyed by the bot key.
const DEFAULT_SEND_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send";

/// Default upstream media upload endpoint.
const DEFAULT_UPLOAD_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/upload_media";

/// Gateway configuration.
///
/// The upstream URLs default to the chat webhook endpoints derived from
/// the bot key but stay overridable — tests point them at a local mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Upstream bot key.
    pub bot_key: String,

    /// Full send endpoint URL (including the key query parameter).
    pub send_url: String,

    /// Full media upload endpoint URL (including key and type).
    pub upload_url: String,

    /// Access token allowlist; empty means no token check.
    pub allow_tokens: Vec<String>,
}

impl GatewayConfig {
    /// Build a config with the standard upstream endpoints for `bot_key`.
    pub fn new(bot_key: impl Into<String>, allow_tokens: Vec<String>) -> Self {
        let bot_key = bot_key.into();
        Self {
            send_url: format!("{DEFAULT_SEND_URL}?key={bot_key}"),
            upload_url: format!("{DEFAULT_UPLOAD_URL}?key={bot_key}&type=file"),
            bot_key,
            allow_tokens,
        }
    }

    /// Override both upstream endpoints (test seam and proxies).
    pub fn with_upstream(mut self, send_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        self.send_url = send_url.into();
        self.upload_url = upload_url.into();
        self
    }

    /// Whether `token` satisfies the allowlist.
    pub fn token_allowed(&self, token: Option<&str>) -> bool {
        if self.allow_tokens.is_empty() {
            return true;
        }
        match token {
            Some(token) => self.allow_tokens.iter().any(|allowed| allowed == token),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

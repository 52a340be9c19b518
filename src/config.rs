use crate::sources::apod_api::DEMO_API_KEY;
use crate::types::Backend;
use std::path::PathBuf;
use std::time::Duration;

const MAX_MESSAGE_SEND_RETRIES: u32 = 10;
const MESSAGE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Bounded retry for message endpoints that answer 400 transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_MESSAGE_SEND_RETRIES,
            delay: MESSAGE_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub backend: Backend,
    pub token: String,
    pub chat_id: i64,
    pub error_chat_id: Option<i64>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub api_key: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: DEMO_API_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot: BotConfig,
    pub source: SourceConfig,
    pub status_file: PathBuf,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bot.token.is_empty() {
            anyhow::bail!("Bot token must not be empty");
        }
        if self.bot.chat_id == 0 {
            anyhow::bail!("Destination chat id must not be zero");
        }
        Ok(())
    }
}

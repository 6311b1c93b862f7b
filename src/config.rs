use std::{fmt, num::ParseIntError};

use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

static CHAT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").expect("chat id pattern is valid"));

/// Action inputs, as GitHub exposes them to the action's process.
///
/// Empty values are treated like missing ones.
#[derive(Debug, Default, Parser)]
#[clap(version, about = "Posts pull request notifications to a Telegram chat")]
pub struct Inputs {
    /// Token of the Telegram bot posting the notification
    #[clap(long, env = "INPUT_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,
    /// Numeric ID of the chat to post to, e.g. -100123456789
    #[clap(long, env = "INPUT_CHAT_ID")]
    pub chat_id: Option<String>,
    /// ID of the forum topic to post to, when the chat has topics
    #[clap(long, env = "INPUT_TOPIC_ID")]
    pub topic_id: Option<String>,
    /// Template used instead of the built-in ones
    #[clap(long, env = "INPUT_CUSTOM_TEMPLATE", hide_env_values = true)]
    pub custom_template: Option<String>,
    /// The `toJSON(github)` context of the workflow run
    #[clap(long, env = "INPUT_EVENT_PAYLOAD", hide_env_values = true)]
    pub event_payload: Option<String>,
    /// Base URL of the Telegram Bot API
    #[clap(long, env = "INPUT_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("chat_id must be a numeric value (e.g., -100123456789)")]
    InvalidChatId,
    #[error("invalid topic_id {value:?}")]
    InvalidTopicId {
        value: String,
        source: ParseIntError,
    },
    #[error("invalid api_url")]
    InvalidApiUrl(#[source] url::ParseError),
}

/// Where and as whom to post.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Thread of a forum chat, `None` posts to the general topic.
    pub topic_id: Option<i64>,
    pub api_url: Url,
}

// the token must never end up in logs
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("topic_id", &self.topic_id)
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

#[derive(Debug)]
pub struct NotifyConfig {
    pub telegram: TelegramConfig,
    pub custom_template: Option<String>,
    pub event_payload: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TryFrom<Inputs> for NotifyConfig {
    type Error = ConfigError;

    fn try_from(inputs: Inputs) -> Result<Self, Self::Error> {
        let bot_token = non_empty(inputs.bot_token).ok_or(ConfigError::Missing("bot_token"))?;

        let chat_id = non_empty(inputs.chat_id).ok_or(ConfigError::Missing("chat_id"))?;
        if !CHAT_ID_PATTERN.is_match(&chat_id) {
            return Err(ConfigError::InvalidChatId);
        }

        let topic_id = non_empty(inputs.topic_id)
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|source| ConfigError::InvalidTopicId { value, source })
            })
            .transpose()?;

        let api_url = non_empty(inputs.api_url);
        let api_url = Url::parse(api_url.as_deref().unwrap_or(DEFAULT_API_URL))
            .map_err(ConfigError::InvalidApiUrl)?;

        let event_payload =
            non_empty(inputs.event_payload).ok_or(ConfigError::Missing("event_payload"))?;

        Ok(Self {
            telegram: TelegramConfig {
                bot_token,
                chat_id,
                topic_id,
                api_url,
            },
            custom_template: non_empty(inputs.custom_template),
            event_payload,
        })
    }
}

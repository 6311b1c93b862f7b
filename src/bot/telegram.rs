//! Delivery of rendered messages through the Telegram Bot API `sendMessage` method.

use std::{borrow::Cow, error::Error as _, fmt::Write, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;

/// Telegram refuses messages longer than this, in characters.
const MAX_MESSAGE_LENGTH: usize = 4096;
const TRUNCATION_MARKER: &str = "\n\n[message truncated]";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("building HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("sending request to Telegram API: {0}")]
    Transport(String),
    #[error("parsing Telegram API response")]
    InvalidResponse(#[source] serde_json::Error),
    #[error("telegram API error: {description}")]
    Api { description: String },
}

/// An inline keyboard button opening `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyMarkup<'a> {
    /// Rows of buttons, we only ever send one.
    inline_keyboard: Vec<&'a [Button]>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.as_str().trim_end_matches('/'),
            self.config.bot_token
        )
    }

    /// Sends `text` as an HTML message, with `buttons` as a single row of inline buttons.
    ///
    /// Texts over Telegram's size limit are cut and marked as truncated.
    pub async fn send_message(&self, text: &str, buttons: &[Button]) -> Result<(), DeliveryError> {
        let text = fit_message(text);
        if let Cow::Owned(_) = text {
            warn!(
                "message is longer than {} characters, truncating it",
                MAX_MESSAGE_LENGTH
            );
        }

        let request = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
            message_thread_id: self.config.topic_id,
            reply_markup: (!buttons.is_empty()).then(|| ReplyMarkup {
                inline_keyboard: vec![buttons],
            }),
        };

        debug!(
            "sending message to chat {} (topic {:?}) with {} buttons",
            self.config.chat_id,
            self.config.topic_id,
            buttons.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(&err))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(&err))?;

        // the API answers with the same envelope on errors, whatever the status code
        let response: ApiResponse =
            serde_json::from_slice(&body).map_err(DeliveryError::InvalidResponse)?;
        if !response.ok {
            return Err(DeliveryError::Api {
                description: response.description.unwrap_or_default(),
            });
        }

        info!("message delivered to chat {} ({})", self.config.chat_id, status);
        Ok(())
    }

    /// The bot token is part of the endpoint URL, which reqwest likes to put in its errors.
    fn transport_error(&self, err: &reqwest::Error) -> DeliveryError {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = write!(message, ": {}", cause);
            source = cause.source();
        }

        DeliveryError::Transport(redact(&message, &self.config.bot_token))
    }
}

fn redact(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        message.to_owned()
    } else {
        message.replace(secret, REDACTED)
    }
}

fn fit_message(text: &str) -> Cow<'_, str> {
    if text.chars().count() <= MAX_MESSAGE_LENGTH {
        return Cow::Borrowed(text);
    }

    let keep = MAX_MESSAGE_LENGTH - TRUNCATION_MARKER.chars().count();
    let end = text
        .char_indices()
        .nth(keep)
        .map_or(text.len(), |(end, _)| end);

    Cow::Owned(format!("{}{}", &text[..end], TRUNCATION_MARKER))
}

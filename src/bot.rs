use anyhow::Context;
use tracing::{debug, trace};

use crate::{config::NotifyConfig, webhooks::NormalizedEvent};

pub mod github;
use github::handle_github_event;

pub mod telegram;
use telegram::{Button, TelegramClient};

pub mod template;
pub(crate) mod utils;

pub struct Notifier {
    client: TelegramClient,
    custom_template: Option<String>,
}

impl Notifier {
    /// Creates a new [`Notifier`] posting to the chat described in the provided [`NotifyConfig`].
    pub fn new(config: NotifyConfig) -> anyhow::Result<Self> {
        let client =
            TelegramClient::new(config.telegram).context("couldn't create Telegram client")?;

        Ok(Self {
            client,
            custom_template: config.custom_template,
        })
    }

    /// Renders the notification for `event` and sends it.
    ///
    /// Nothing is sent if rendering fails.
    pub async fn notify(&self, event: &NormalizedEvent) -> anyhow::Result<()> {
        debug!("handling {}:{} event", event.event_name, event.action);

        let Response { message, buttons } =
            handle_github_event(event, self.custom_template.as_deref())
                .context("rendering template")?;

        trace!("sending message `{}`", message);
        self.client
            .send_message(&message, &buttons)
            .await
            .context("sending message")?;

        Ok(())
    }
}

pub struct Response {
    pub message: String,
    pub buttons: Vec<Button>,
}

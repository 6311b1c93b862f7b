use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bot;
use bot::Notifier;

mod config;
use config::{Inputs, NotifyConfig};

mod webhooks;

#[cfg(test)]
mod test_utils;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let inputs = match Inputs::try_parse() {
        Ok(inputs) => inputs,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        // workflow commands are single-line, the usage that follows isn't needed
        Err(err) => fail(err.to_string().lines().next().unwrap_or_default()),
    };

    // GitHub redacts masked values from the logs of every later step, this has to come before
    // anything else is printed
    if let Some(directive) = mask_directive(&inputs) {
        println!("{}", directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(inputs).await {
        fail(format!("{:#}", err));
    }

    println!("Notification sent successfully");
}

fn mask_directive(inputs: &Inputs) -> Option<String> {
    inputs
        .bot_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .map(|token| format!("::add-mask::{}", token))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("::error::{}", message);
    std::process::exit(1);
}

async fn run(inputs: Inputs) -> anyhow::Result<()> {
    let config = NotifyConfig::try_from(inputs)?;

    let event = webhooks::github::parse(config.event_payload.as_bytes())
        .context("parsing event")?;
    info!(
        "{}:{} on {} by {}",
        event.event_name, event.action, event.repo.full_name, event.actor.login
    );

    let notifier = Notifier::new(config)?;
    notifier.notify(&event).await
}

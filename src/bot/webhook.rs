//! Webhook mode.
//!
//! teloxide's axum listener registers the webhook with Telegram, serves
//! updates on `WEBHOOK_PORT` and removes the webhook again on shutdown.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

use super::dispatcher::ThrottledBot;
use crate::config::Config;

/// Listener options: public URL, local bind address and optional secret.
fn listener_options(config: &Config) -> anyhow::Result<Options> {
    let raw_url = config
        .webhook_url
        .as_deref()
        .context("WEBHOOK_URL is required in webhook mode")?;
    let url = Url::parse(raw_url).with_context(|| format!("WEBHOOK_URL '{raw_url}' is not a URL"))?;
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.webhook_port));

    let options = Options::new(address, url);
    Ok(match config.webhook_secret.clone() {
        Some(secret) => options.secret_token(secret),
        None => options,
    })
}

/// Serve updates through the webhook until shutdown.
pub async fn start_webhook(
    config: &Config,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>,
    bot: ThrottledBot,
) -> anyhow::Result<()> {
    let options = listener_options(config)?;
    info!(
        "Webhook {} on {} (secret: {})",
        options.url,
        options.address,
        options.secret_token.is_some()
    );

    // Registration goes through the plain bot; throttling only matters for sends.
    let listener = webhooks::axum(bot.inner().clone(), options)
        .await
        .context("webhook registration failed")?;

    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Webhook listener error"),
        )
        .await;

    Ok(())
}

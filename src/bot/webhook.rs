//! Webhook mode.
//!
//! teloxide's axum listener registers the webhook with Telegram, serves
//! updates on the configured port, and removes the webhook on shutdown.

use std::net::SocketAddr;

use anyhow::Context;
use teloxide::dispatching::DefaultKey;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

use super::dispatcher::ThrottledBot;
use crate::config::Config;

/// Listener options from config.
fn webhook_options(config: &Config) -> anyhow::Result<Options> {
    let raw = config
        .webhook_url
        .as_deref()
        .context("WEBHOOK_URL must be set when using webhook mode")?;
    let url = Url::parse(raw).with_context(|| format!("invalid WEBHOOK_URL {raw:?}"))?;

    let address = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    let mut options = Options::new(address, url);
    if let Some(secret) = &config.webhook_secret {
        options = options.secret_token(secret.clone());
    }
    Ok(options)
}

/// Serve updates through a webhook until shutdown.
pub async fn start_webhook(
    config: &Config,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, DefaultKey>,
    bot: ThrottledBot,
) -> anyhow::Result<()> {
    let options = webhook_options(config)?;
    info!(url = %options.url, address = %options.address, "Setting webhook");

    // setWebhook needs no rate limiting.
    let listener = webhooks::axum(bot.inner().clone(), options)
        .await
        .context("failed to set up webhook")?;

    info!("Webhook ready, waiting for updates...");

    let error_handler = LoggingErrorHandler::with_custom_text("Error from update listener");
    dispatcher
        .dispatch_with_listener(listener, error_handler)
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_options_from_config() {
        let config = config(&[
            ("BOT_TOKEN", "1:abc"),
            ("BOT_MODE", "webhook"),
            ("WEBHOOK_URL", "https://bot.example.com/hook"),
            ("WEBHOOK_PORT", "9000"),
            ("WEBHOOK_SECRET", "s3cret"),
        ]);

        let options = webhook_options(&config).unwrap();
        assert_eq!(options.url.as_str(), "https://bot.example.com/hook");
        assert_eq!(options.address.port(), 9000);
        assert_eq!(options.secret_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_url_is_an_error() {
        let config = config(&[
            ("BOT_TOKEN", "1:abc"),
            ("BOT_MODE", "webhook"),
            ("WEBHOOK_URL", "not a url"),
        ]);
        assert!(webhook_options(&config).is_err());
    }
}

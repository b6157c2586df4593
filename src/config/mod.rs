//! Configuration module for Postcraft bot.
//!
//! Loads configuration from environment variables.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Bot running mode
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// VK ID application settings.
#[derive(Debug, Clone)]
pub struct VkConfig {
    /// Application (client) id registered in VK ID.
    pub client_id: String,

    /// Redirect URI registered for the application.
    /// Must point at this process's `/vk/callback` route.
    pub redirect_uri: String,

    /// Space-separated scopes requested at authorization.
    pub scope: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    // VK
    pub vk: VkConfig,

    /// Listen address of the OAuth callback server.
    pub oauth_bind: SocketAddr,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_else(|_| "polling".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = optional("WEBHOOK_URL");
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            bail!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let webhook_port = match optional("WEBHOOK_PORT") {
            Some(port) => port.parse().context("WEBHOOK_PORT must be a port number")?,
            None => 8443,
        };

        let oauth_bind = optional("OAUTH_BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("OAUTH_BIND must be a socket address like 0.0.0.0:8080")?;

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            bot_mode,
            webhook_url,
            webhook_port,
            webhook_secret: optional("WEBHOOK_SECRET"),
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: optional("MONGODB_DATABASE")
                .unwrap_or_else(|| "postcraft".to_string()),
            vk: VkConfig {
                client_id: required("VK_CLIENT_ID")?,
                redirect_uri: required("VK_REDIRECT_URI")?,
                scope: optional("VK_SCOPE").unwrap_or_else(|| "email groups".to_string()),
            },
            oauth_bind,
        })
    }
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} must be set"))
}

/// Read a variable, treating blank values as unset.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

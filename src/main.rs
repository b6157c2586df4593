//! Postcraft - image settings and VK connections for content categories
//!
//! A Telegram bot that stores per-category, per-platform image-generation
//! settings, composes prompts from them, and links VK accounts through
//! VK ID OAuth with PKCE.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB models and repositories
//! - `cache` - TTL caching with Moka
//! - `imagegen` - Presets and the prompt composer
//! - `vk` - VK ID OAuth client, PKCE store, token lifecycle
//! - `bot` - Core bot functionality (with Throttle for API rate limiting)
//! - `plugins` - Command and menu handlers
//! - `server` - OAuth callback HTTP server
//! - `utils` - Utility functions

mod bot;
mod cache;
mod config;
mod database;
mod imagegen;
mod plugins;
mod server;
mod utils;
mod vk;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bot::AppState;
use cache::CacheRegistry;
use config::Config;
use database::Database;
use vk::VkClient;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("postcraft=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Postcraft bot...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Bot mode: {:?}", config.bot_mode);

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;
    info!("Database connected");

    let cache = Arc::new(CacheRegistry::new());
    let vk_client = VkClient::new(config.vk.clone())?;
    let state = AppState::new(&db, &cache, vk_client);
    info!("Caches initialized: {:?}", cache.cache_names());

    // Throttle respects Telegram's global and per-chat rate limits.
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    let server_state = server::ServerState {
        bot: bot.clone(),
        app: state.clone(),
    };
    let oauth_bind = config.oauth_bind;
    tokio::spawn(async move {
        if let Err(e) = server::serve(oauth_bind, server_state).await {
            error!("OAuth server stopped: {:#}", e);
        }
    });

    let dispatcher = bot::build_dispatcher(bot.clone(), state);
    bot::run(&config, bot, dispatcher).await?;

    Ok(())
}

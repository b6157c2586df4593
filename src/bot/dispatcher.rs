//! Message dispatcher setup.
//!
//! Builds the dispatcher with all command and callback handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::cache::CacheRegistry;
use crate::database::{CategoryRepository, Database, VkRepository};
use crate::plugins;
use crate::vk::{PkceStore, VkClient};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Categories and their per-platform image settings.
    pub categories: Arc<CategoryRepository>,

    /// Linked VK accounts.
    pub vk_accounts: Arc<VkRepository>,

    /// Logins waiting for the VK ID redirect.
    pub pkce: PkceStore,

    pub vk: Arc<VkClient>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: &Database, cache: &CacheRegistry, vk: VkClient) -> Self {
        let categories = Arc::new(CategoryRepository::new(db, cache));
        let vk_accounts = Arc::new(VkRepository::new(db));
        let pkce = PkceStore::new(cache);

        Self {
            categories,
            vk_accounts,
            pkce,
            vk: Arc::new(vk),
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    let message_handler = Update::filter_message().branch(plugins::command_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(plugins::callback_handler())
}

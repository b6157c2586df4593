//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()` or a `CallbackAction` arm

pub mod callback;
pub mod categories;
pub mod help;
pub mod image_settings;
pub mod prompt;
pub mod start;
pub mod vk;

use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::Category;
use callback::CallbackAction;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show help")]
    Help,

    #[command(description = "List your categories")]
    Categories,

    #[command(description = "Create a category: /newcategory <name>")]
    Newcategory(String),

    #[command(description = "Compose a prompt: /prompt <category_id> <platform> <text>")]
    Prompt(String),

    #[command(description = "Manage linked VK accounts")]
    Vk,
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start::start_handler))
        .branch(case![Command::Help].endpoint(help::help_handler))
        .branch(case![Command::Categories].endpoint(categories::categories_command))
        .branch(case![Command::Newcategory(name)].endpoint(categories::newcategory_command))
        .branch(case![Command::Prompt(args)].endpoint(prompt::prompt_command))
        .branch(case![Command::Vk].endpoint(vk::vk_command))
}

/// Build the callback query handler.
pub fn callback_handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_callback_query().endpoint(handle_callback)
}

/// Decode the button once and route it.
async fn handle_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        debug!("Unknown callback data: {:?}", q.data);
        bot.answer_callback_query(q.id).text("Unknown action").await?;
        return Ok(());
    };

    match action {
        CallbackAction::Categories | CallbackAction::Category { .. } => {
            categories::handle_callback(bot, q, state, action).await
        }
        CallbackAction::VkMenu
        | CallbackAction::VkConnect
        | CallbackAction::VkUnlink { .. }
        | CallbackAction::VkGroups { .. } => vk::handle_callback(bot, q, state, action).await,
        _ => image_settings::handle_callback(bot, q, state, action).await,
    }
}

/// Load a category the user owns. Someone else's category reads as missing.
pub(crate) async fn owned_category(
    state: &AppState,
    category_id: i64,
    user_id: i64,
) -> anyhow::Result<Option<Category>> {
    Ok(state
        .categories
        .get(category_id)
        .await?
        .filter(|c| c.is_owned_by(user_id)))
}

/// Replace the menu a button belongs to, or send a new one if the message is gone.
pub(crate) async fn show_menu(
    bot: &ThrottledBot,
    q: &CallbackQuery,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> anyhow::Result<()> {
    let Some(message) = q.message.as_ref() else {
        bot.send_message(ChatId(q.from.id.0 as i64), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
        return Ok(());
    };

    let result = bot
        .edit_message_text(message.chat().id, message.id(), text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await;

    match result {
        // Pressing the button of the state already shown.
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
        Ok(_) => Ok(()),
    }
}

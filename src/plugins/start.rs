//! /start command plugin.
//!
//! Handles the /start command and sends a welcome message.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use super::callback::CallbackAction;
use crate::bot::dispatcher::{AppState, ThrottledBot};

/// Handle the /start command.
pub async fn start_handler(bot: ThrottledBot, msg: Message, _state: AppState) -> anyhow::Result<()> {
    let welcome_text = "<b>Hi!</b> 👋\n\n\
        I keep image-generation settings for your content categories, \
        separately for every platform you publish to, and compose prompts from them.\n\n\
        • /newcategory &lt;name&gt; creates a category\n\
        • /categories opens the settings menus\n\
        • /vk links a VK account\n\n\
        Use /help for the full command list.";

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📂 Categories",
            CallbackAction::Categories.encode(),
        )],
        vec![InlineKeyboardButton::callback(
            "🔗 VK accounts",
            CallbackAction::VkMenu.encode(),
        )],
    ]);

    bot.send_message(msg.chat.id, welcome_text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

//! Category plugin.
//!
//! Commands:
//! - /categories - list the user's categories
//! - /newcategory <name> - create a category
//!
//! Callback menus: category list and a single category with its platforms.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::info;

use super::callback::CallbackAction;
use super::{owned_category, show_menu};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{Category, Platform};
use crate::utils::{html_escape, truncate, user_key};

const MAX_NAME_CHARS: usize = 64;
const BUTTON_NAME_CHARS: usize = 28;

/// Category list: one button per category, oldest first.
pub fn list_view(categories: &[Category]) -> (String, InlineKeyboardMarkup) {
    let text = if categories.is_empty() {
        "📂 <b>Categories</b>\n\nYou have no categories yet. Create one with \
         /newcategory &lt;name&gt;."
            .to_string()
    } else {
        format!(
            "📂 <b>Categories</b>\n\nPick a category to edit its image settings. \
             You have {}.",
            categories.len()
        )
    };

    let rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|c| {
            vec![InlineKeyboardButton::callback(
                format!("#{} {}", c.category_id, truncate(&c.name, BUTTON_NAME_CHARS)),
                CallbackAction::Category {
                    category_id: c.category_id,
                }
                .encode(),
            )]
        })
        .collect();

    (text, InlineKeyboardMarkup::new(rows))
}

/// One category: a button per platform, two per row.
pub fn category_view(category: &Category) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "📁 <b>{}</b> (id <code>{}</code>)\n\nChoose a platform to configure.",
        html_escape(&category.name),
        category.category_id
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Platform::ALL
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&platform| {
                    InlineKeyboardButton::callback(
                        platform.display_name(),
                        CallbackAction::Platform {
                            category_id: category.category_id,
                            platform,
                        }
                        .encode(),
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "⬅️ Back",
        CallbackAction::Categories.encode(),
    )]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Handle /categories.
pub async fn categories_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let categories = state.categories.list_for_owner(user_key(user.id)).await?;
    let (text, keyboard) = list_view(&categories);

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

/// Handle /newcategory <name>.
pub async fn newcategory_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    name: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let name = name.trim();
    if name.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /newcategory <name>")
            .await?;
        return Ok(());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        bot.send_message(
            msg.chat.id,
            format!("Category names are limited to {MAX_NAME_CHARS} characters."),
        )
        .await?;
        return Ok(());
    }

    let category = state.categories.create(user_key(user.id), name).await?;
    info!(
        "User {} created category {} ({})",
        user.id, category.category_id, category.name
    );

    let (text, keyboard) = category_view(&category);
    bot.send_message(msg.chat.id, format!("✅ Category created.\n\n{text}"))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

/// Handle category list / category buttons.
pub async fn handle_callback(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
    action: CallbackAction,
) -> anyhow::Result<()> {
    let user_id = user_key(q.from.id);

    let (text, keyboard) = match action {
        CallbackAction::Categories => {
            let categories = state.categories.list_for_owner(user_id).await?;
            list_view(&categories)
        }
        CallbackAction::Category { category_id } => {
            let Some(category) = owned_category(&state, category_id, user_id).await? else {
                bot.answer_callback_query(q.id).text("Category not found").await?;
                return Ok(());
            };
            category_view(&category)
        }
        _ => return Ok(()),
    };

    show_menu(&bot, &q, text, keyboard).await?;
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

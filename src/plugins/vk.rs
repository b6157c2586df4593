//! VK account plugin.
//!
//! /vk lists linked accounts. From there the user can start a VK ID login,
//! list the communities an account administers, or unlink it.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::{info, warn};
use url::Url;

use super::callback::CallbackAction;
use super::show_menu;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{VkConnections, VkStatus};
use crate::utils::{html_escape, user_key};
use crate::vk::{VkGroup, valid_access_token};

/// Groups shown per account; VK may return far more.
const MAX_GROUPS_SHOWN: usize = 30;

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.encode())
}

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ Back", CallbackAction::VkMenu)]
}

/// Linked accounts with per-account actions.
pub fn menu_view(connections: &VkConnections) -> (String, InlineKeyboardMarkup) {
    let mut text = String::from("🔗 <b>VK accounts</b>\n\n");
    if connections.accounts.is_empty() {
        text.push_str("No VK account linked yet.");
    }

    let mut rows = Vec::new();
    for account in &connections.accounts {
        let name = if account.display_name.is_empty() {
            format!("id{}", account.vk_user_id)
        } else {
            account.display_name.clone()
        };
        let status = match account.status {
            VkStatus::Active => "active",
            VkStatus::ReauthRequired => "⚠️ reconnect required",
        };
        text.push_str(&format!(
            "• <b>{}</b> (id <code>{}</code>): {}\n",
            html_escape(&name),
            account.vk_user_id,
            status
        ));

        rows.push(vec![
            button(
                format!("👥 {name}"),
                CallbackAction::VkGroups {
                    vk_user_id: account.vk_user_id,
                },
            ),
            button(
                "❌ Unlink",
                CallbackAction::VkUnlink {
                    vk_user_id: account.vk_user_id,
                },
            ),
        ]);
    }
    rows.push(vec![button("➕ Connect VK account", CallbackAction::VkConnect)]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Administered communities of one account.
pub fn groups_view(account_name: &str, groups: &[VkGroup]) -> (String, InlineKeyboardMarkup) {
    let mut text = format!("👥 <b>Communities of {}</b>\n\n", html_escape(account_name));
    if groups.is_empty() {
        text.push_str("This account administers no communities.");
    }
    for group in groups.iter().take(MAX_GROUPS_SHOWN) {
        match &group.screen_name {
            Some(screen_name) => text.push_str(&format!(
                "• {} (<code>{}</code>, vk.com/{})\n",
                html_escape(&group.name),
                group.id,
                html_escape(screen_name)
            )),
            None => text.push_str(&format!(
                "• {} (<code>{}</code>)\n",
                html_escape(&group.name),
                group.id
            )),
        }
    }
    if groups.len() > MAX_GROUPS_SHOWN {
        text.push_str(&format!("…and {} more", groups.len() - MAX_GROUPS_SHOWN));
    }

    (text, InlineKeyboardMarkup::new(vec![back_row()]))
}

fn connect_view(url: Url) -> (String, InlineKeyboardMarkup) {
    let text = "🔐 <b>Connect VK</b>\n\nOpen the link below and allow access. \
                The link works once and expires in 10 minutes."
        .to_string();
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url("Open VK ID", url)],
        back_row(),
    ]);
    (text, keyboard)
}

fn reconnect_view(reason: &str) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "⚠️ {}\n\nConnect the account again to continue.",
        html_escape(reason)
    );
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![button("🔐 Reconnect", CallbackAction::VkConnect)],
        back_row(),
    ]);
    (text, keyboard)
}

/// Handle /vk.
pub async fn vk_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let connections = state.vk_accounts.get_or_default(user_key(user.id)).await?;
    let (text, keyboard) = menu_view(&connections);

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

/// Handle VK menu buttons.
pub async fn handle_callback(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
    action: CallbackAction,
) -> anyhow::Result<()> {
    let user_id = user_key(q.from.id);

    let (text, keyboard) = match action {
        CallbackAction::VkMenu => {
            let connections = state.vk_accounts.get_or_default(user_id).await?;
            menu_view(&connections)
        }
        CallbackAction::VkConnect => {
            let (oauth_state, challenge) = state.pkce.begin(user_id);
            let url = state.vk.authorize_url(&oauth_state, &challenge)?;
            connect_view(url)
        }
        CallbackAction::VkUnlink { vk_user_id } => {
            let connections = state.vk_accounts.get_or_default(user_id).await?;
            let Some(account) = connections.account(vk_user_id) else {
                bot.answer_callback_query(q.id).text("Account not found").await?;
                return Ok(());
            };

            state.vk.revoke(&account.access_token).await;
            state.vk_accounts.unlink_account(user_id, vk_user_id).await?;
            info!("User {} unlinked VK account {}", user_id, vk_user_id);

            let connections = state.vk_accounts.get_or_default(user_id).await?;
            menu_view(&connections)
        }
        CallbackAction::VkGroups { vk_user_id } => {
            let connections = state.vk_accounts.get_or_default(user_id).await?;
            let Some(mut account) = connections.account(vk_user_id).cloned() else {
                bot.answer_callback_query(q.id).text("Account not found").await?;
                return Ok(());
            };

            let token = valid_access_token(&mut account, state.vk.as_ref(), Utc::now()).await;
            if token.changed_account() {
                state.vk_accounts.update_account(user_id, &account).await?;
            }

            match token.token() {
                None => reconnect_view("The VK session has expired."),
                Some(access_token) => match state.vk.admin_groups(access_token).await {
                    Ok(groups) => groups_view(&account.display_name, &groups),
                    Err(e) => {
                        warn!("Listing VK groups for account {} failed: {}", vk_user_id, e);
                        (
                            format!("❌ VK error: {}", html_escape(&e.user_message())),
                            InlineKeyboardMarkup::new(vec![back_row()]),
                        )
                    }
                },
            }
        }
        _ => return Ok(()),
    };

    show_menu(&bot, &q, text, keyboard).await?;
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

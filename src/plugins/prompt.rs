//! /prompt command plugin.
//!
//! `/prompt <category_id> <platform> <text>` composes a prompt from the
//! stored settings with a randomly drawn format.

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::image_settings::describe_prompt;
use super::owned_category;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::Platform;
use crate::imagegen::build_image_prompt;
use crate::utils::user_key;

const USAGE: &str = "Usage: /prompt <category_id> <platform> <text>\nPlatforms: pin, tg, ig, vk, web";

/// Parsed /prompt arguments.
#[derive(Debug, PartialEq, Eq)]
pub struct PromptArgs {
    pub category_id: i64,
    pub platform: Platform,
    pub text: String,
}

/// Split `<category_id> <platform> <text>`; the text keeps its inner spacing.
pub fn parse_args(args: &str) -> Option<PromptArgs> {
    let args = args.trim_start();
    let (id, rest) = args.split_once(char::is_whitespace)?;
    let (platform, text) = rest.trim_start().split_once(char::is_whitespace)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(PromptArgs {
        category_id: id.trim_start_matches('#').parse().ok()?,
        platform: platform.parse().ok()?,
        text: text.to_string(),
    })
}

/// Handle /prompt.
pub async fn prompt_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let Some(args) = parse_args(&args) else {
        bot.send_message(msg.chat.id, USAGE).await?;
        return Ok(());
    };

    let Some(category) = owned_category(&state, args.category_id, user_key(user.id)).await? else {
        bot.send_message(msg.chat.id, "Category not found.").await?;
        return Ok(());
    };

    let settings = category.platform_settings(args.platform);
    let composed = build_image_prompt(&args.text, &settings, false, &mut rand::thread_rng());

    bot.send_message(msg.chat.id, describe_prompt(&composed))
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        assert_eq!(
            parse_args("12 ig  A latte   on a wooden table "),
            Some(PromptArgs {
                category_id: 12,
                platform: Platform::Instagram,
                text: "A latte   on a wooden table".to_string(),
            })
        );
        assert_eq!(
            parse_args("#3 pinterest Autumn leaves").map(|a| a.platform),
            Some(Platform::Pinterest)
        );
    }

    #[test]
    fn test_parse_args_rejects_incomplete_input() {
        assert_eq!(parse_args(""), None);
        assert_eq!(parse_args("12"), None);
        assert_eq!(parse_args("12 ig"), None);
        assert_eq!(parse_args("12 ig   "), None);
        assert_eq!(parse_args("x ig text"), None);
        assert_eq!(parse_args("12 myspace text"), None);
    }
}

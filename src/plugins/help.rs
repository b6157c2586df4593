//! /help command plugin.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use super::Command;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::Platform;
use crate::utils::html_escape;

/// Platform codes accepted by /prompt, one per line.
fn platform_list() -> String {
    Platform::ALL
        .iter()
        .map(|p| {
            format!(
                "• <code>{}</code> {} (recommended {})",
                p.code(),
                p.display_name(),
                p.recommended_format()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Handle the /help command.
pub async fn help_handler(bot: ThrottledBot, msg: Message, _state: AppState) -> anyhow::Result<()> {
    let text = format!(
        "{}\n\n<b>Platforms</b>\n{}",
        html_escape(&Command::descriptions().to_string()),
        platform_list()
    );

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_list_names_every_code() {
        let list = platform_list();
        for platform in Platform::ALL {
            assert!(list.contains(platform.code()));
        }
    }
}

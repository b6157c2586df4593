//! Utility functions.
//!
//! Collection of helper functions used across the bot.

use teloxide::types::UserId;

/// Escape text for Telegram HTML parse mode.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Storage key of a Telegram user. Telegram ids fit in 52 bits.
pub fn user_key(id: UserId) -> i64 {
    id.0 as i64
}

/// Shorten text for inline display, on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Привет мир", 7), "Привет…");
    }

    #[test]
    fn test_user_key() {
        assert_eq!(user_key(UserId(123_456_789)), 123_456_789);
    }
}

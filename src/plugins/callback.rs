//! Inline-button callback data.
//!
//! Every button the bot sends carries a `CallbackAction`, encoded as
//! colon-separated segments behind a short prefix. Telegram limits callback
//! data to 64 bytes, so ids and field names use their short codes.
//!
//! The last segment of a variant may contain `:` itself (format codes such as
//! `16:9`), so decoding splits a bounded number of times.

use crate::database::models::{HtmlStyle, Percent, Platform, SelectorField};

/// Telegram's limit on callback data, in bytes.
pub const MAX_CALLBACK_LEN: usize = 64;

/// Which percent setting a percent menu edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentKind {
    Text,
    Collage,
}

impl PercentKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Text => "tx",
            Self::Collage => "col",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "tx" => Some(Self::Text),
            "col" => Some(Self::Collage),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "Text on image",
            Self::Collage => "Collage",
        }
    }
}

/// A decoded button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Categories,
    Category {
        category_id: i64,
    },
    Platform {
        category_id: i64,
        platform: Platform,
    },
    Selector {
        category_id: i64,
        platform: Platform,
        field: SelectorField,
    },
    Toggle {
        category_id: i64,
        platform: Platform,
        field: SelectorField,
        code: String,
    },
    /// Reset a selector to "random".
    Clear {
        category_id: i64,
        platform: Platform,
        field: SelectorField,
    },
    PercentMenu {
        category_id: i64,
        platform: Platform,
        kind: PercentKind,
    },
    SetPercent {
        category_id: i64,
        platform: Platform,
        kind: PercentKind,
        value: Percent,
    },
    HtmlMenu {
        category_id: i64,
        platform: Platform,
    },
    SetHtml {
        category_id: i64,
        platform: Platform,
        style: HtmlStyle,
    },
    Preview {
        category_id: i64,
        platform: Platform,
    },
    VkMenu,
    VkConnect,
    VkUnlink {
        vk_user_id: i64,
    },
    VkGroups {
        vk_user_id: i64,
    },
}

impl CallbackAction {
    /// Encode to callback data.
    pub fn encode(&self) -> String {
        match self {
            Self::Categories => "cat:list".to_string(),
            Self::Category { category_id } => format!("cat:{category_id}"),
            Self::Platform {
                category_id,
                platform,
            } => format!("is:p:{category_id}:{}", platform.code()),
            Self::Selector {
                category_id,
                platform,
                field,
            } => format!("is:s:{category_id}:{}:{}", platform.code(), field.code()),
            Self::Toggle {
                category_id,
                platform,
                field,
                code,
            } => format!(
                "is:t:{category_id}:{}:{}:{code}",
                platform.code(),
                field.code()
            ),
            Self::Clear {
                category_id,
                platform,
                field,
            } => format!("is:c:{category_id}:{}:{}", platform.code(), field.code()),
            Self::PercentMenu {
                category_id,
                platform,
                kind,
            } => format!("is:pm:{category_id}:{}:{}", platform.code(), kind.code()),
            Self::SetPercent {
                category_id,
                platform,
                kind,
                value,
            } => format!(
                "is:ps:{category_id}:{}:{}:{}",
                platform.code(),
                kind.code(),
                value.code()
            ),
            Self::HtmlMenu {
                category_id,
                platform,
            } => format!("is:hm:{category_id}:{}", platform.code()),
            Self::SetHtml {
                category_id,
                platform,
                style,
            } => format!("is:hs:{category_id}:{}:{}", platform.code(), style.code()),
            Self::Preview {
                category_id,
                platform,
            } => format!("is:pv:{category_id}:{}", platform.code()),
            Self::VkMenu => "vk:menu".to_string(),
            Self::VkConnect => "vk:new".to_string(),
            Self::VkUnlink { vk_user_id } => format!("vk:un:{vk_user_id}"),
            Self::VkGroups { vk_user_id } => format!("vk:gr:{vk_user_id}"),
        }
    }

    /// Decode callback data. Anything malformed is `None`.
    pub fn parse(data: &str) -> Option<Self> {
        let (prefix, rest) = data.split_once(':')?;
        match prefix {
            "cat" => parse_category(rest),
            "is" => parse_image_settings(rest),
            "vk" => parse_vk(rest),
            _ => None,
        }
    }

    /// Category the action operates on, if any.
    pub fn category_id(&self) -> Option<i64> {
        match self {
            Self::Category { category_id }
            | Self::Platform { category_id, .. }
            | Self::Selector { category_id, .. }
            | Self::Toggle { category_id, .. }
            | Self::Clear { category_id, .. }
            | Self::PercentMenu { category_id, .. }
            | Self::SetPercent { category_id, .. }
            | Self::HtmlMenu { category_id, .. }
            | Self::SetHtml { category_id, .. }
            | Self::Preview { category_id, .. } => Some(*category_id),
            _ => None,
        }
    }
}

fn parse_category(rest: &str) -> Option<CallbackAction> {
    if rest == "list" {
        return Some(CallbackAction::Categories);
    }
    Some(CallbackAction::Category {
        category_id: rest.parse().ok()?,
    })
}

fn parse_image_settings(rest: &str) -> Option<CallbackAction> {
    // kind, category, platform, then up to two arguments; the last keeps any ':'.
    let mut parts = rest.splitn(5, ':');
    let kind = parts.next()?;
    let category_id: i64 = parts.next()?.parse().ok()?;
    let platform = Platform::from_code(parts.next()?)?;
    let first = parts.next();
    let second = parts.next();

    let action = match (kind, first, second) {
        ("p", None, None) => CallbackAction::Platform {
            category_id,
            platform,
        },
        ("hm", None, None) => CallbackAction::HtmlMenu {
            category_id,
            platform,
        },
        ("pv", None, None) => CallbackAction::Preview {
            category_id,
            platform,
        },
        ("s", Some(field), None) => CallbackAction::Selector {
            category_id,
            platform,
            field: SelectorField::from_code(field)?,
        },
        ("c", Some(field), None) => CallbackAction::Clear {
            category_id,
            platform,
            field: SelectorField::from_code(field)?,
        },
        ("t", Some(field), Some(code)) if !code.is_empty() => CallbackAction::Toggle {
            category_id,
            platform,
            field: SelectorField::from_code(field)?,
            code: code.to_string(),
        },
        ("pm", Some(kind), None) => CallbackAction::PercentMenu {
            category_id,
            platform,
            kind: PercentKind::from_code(kind)?,
        },
        ("ps", Some(kind), Some(value)) => CallbackAction::SetPercent {
            category_id,
            platform,
            kind: PercentKind::from_code(kind)?,
            value: parse_percent_code(value)?,
        },
        ("hs", Some(style), None) => CallbackAction::SetHtml {
            category_id,
            platform,
            style: HtmlStyle::from_code(style)?,
        },
        _ => return None,
    };
    Some(action)
}

/// Strict form of a percent code: `random` or an integer in 0..=100.
fn parse_percent_code(value: &str) -> Option<Percent> {
    if value == Percent::RANDOM_CODE {
        return Some(Percent::Random);
    }
    let n: u8 = value.parse().ok()?;
    (n <= 100).then_some(Percent::Fixed(n))
}

fn parse_vk(rest: &str) -> Option<CallbackAction> {
    match rest.split_once(':') {
        None if rest == "menu" => Some(CallbackAction::VkMenu),
        None if rest == "new" => Some(CallbackAction::VkConnect),
        Some(("un", id)) => Some(CallbackAction::VkUnlink {
            vk_user_id: id.parse().ok()?,
        }),
        Some(("gr", id)) => Some(CallbackAction::VkGroups {
            vk_user_id: id.parse().ok()?,
        }),
        _ => None,
    }
}

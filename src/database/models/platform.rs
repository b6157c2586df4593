//! Publishing platforms with their own settings namespace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target publishing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Pinterest,
    Telegram,
    Instagram,
    Vk,
    Website,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Pinterest,
        Platform::Telegram,
        Platform::Instagram,
        Platform::Vk,
        Platform::Website,
    ];

    /// Storage key prefix.
    pub fn key(self) -> &'static str {
        match self {
            Self::Pinterest => "pinterest",
            Self::Telegram => "telegram",
            Self::Instagram => "instagram",
            Self::Vk => "vk",
            Self::Website => "website",
        }
    }

    /// Short code used in callback data.
    pub fn code(self) -> &'static str {
        match self {
            Self::Pinterest => "pin",
            Self::Telegram => "tg",
            Self::Instagram => "ig",
            Self::Vk => "vk",
            Self::Website => "web",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pinterest => "Pinterest",
            Self::Telegram => "Telegram",
            Self::Instagram => "Instagram",
            Self::Vk => "VK",
            Self::Website => "Website",
        }
    }

    /// Aspect ratio used when no format is selected.
    pub fn recommended_format(self) -> &'static str {
        match self {
            Self::Pinterest => "2:3",
            Self::Telegram | Self::Website => "16:9",
            Self::Instagram => "4:5",
            Self::Vk => "1:1",
        }
    }

    /// Key of this platform's image settings inside a category settings blob.
    pub fn settings_key(self) -> String {
        format!("{}_image_settings", self.key())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = String;

    /// Accepts either the storage key or the short code, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.key() == s || p.code() == s)
            .ok_or_else(|| format!("unknown platform '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform() {
        assert_eq!("Pinterest".parse::<Platform>(), Ok(Platform::Pinterest));
        assert_eq!("ig".parse::<Platform>(), Ok(Platform::Instagram));
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_codes_roundtrip() {
        for p in Platform::ALL {
            assert_eq!(Platform::from_code(p.code()), Some(p));
        }
        assert_eq!(Platform::Vk.settings_key(), "vk_image_settings");
    }
}

//! Content category model.

use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::image_settings::PlatformImageSettings;
use super::platform::Platform;

/// A content bucket owned by one Telegram user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Sequential id used in commands and callback data (indexed)
    pub category_id: i64,

    /// Telegram user ID of the owner
    pub owner_id: i64,

    pub name: String,

    /// Free-form settings blob, platform-prefixed keys
    #[serde(default)]
    pub settings: Document,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(category_id: i64, owner_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: None,
            category_id,
            owner_id,
            name: name.into(),
            settings: Document::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }

    /// Image settings for a platform, defaulted when never saved.
    pub fn platform_settings(&self, platform: Platform) -> PlatformImageSettings {
        PlatformImageSettings::from_blob(platform, &self.settings)
    }

    /// Store image settings back into the blob (in memory only).
    pub fn set_platform_settings(&mut self, settings: &PlatformImageSettings) {
        self.settings
            .insert(settings.platform.settings_key(), settings.to_document());
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;
    use crate::database::models::SelectorField;

    #[test]
    fn test_platform_settings_are_namespaced() {
        let mut category = Category::new(1, 42, "Travel");
        let mut pin = category.platform_settings(Platform::Pinterest);
        pin.toggle(SelectorField::Styles, "water");
        category.set_platform_settings(&pin);

        assert_eq!(category.platform_settings(Platform::Pinterest), pin);
        assert!(category.platform_settings(Platform::Telegram).styles.is_empty());
    }

    #[test]
    fn test_other_blob_keys_survive() {
        let mut category = Category::new(1, 42, "Travel");
        category.settings = doc! { "posting_time": "09:00" };
        category.set_platform_settings(&PlatformImageSettings::defaults(Platform::Vk));

        assert_eq!(category.settings.get_str("posting_time").ok(), Some("09:00"));
        assert!(category.is_owned_by(42));
        assert!(!category.is_owned_by(43));
    }
}

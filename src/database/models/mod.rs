//! Database model exports.

pub mod category;
pub mod image_settings;
pub mod platform;
pub mod vk_connection;

pub use category::Category;
pub use image_settings::{HtmlStyle, Percent, PlatformImageSettings, SelectorField, SettingsPatch};
pub use platform::Platform;
pub use vk_connection::{VkAccount, VkConnections, VkStatus};

//! Image prompt composition.
//!
//! - `presets` - static code tables (style, tone, camera, angle, quality, format)
//! - `prompt` - composes a generation prompt from platform settings

pub mod presets;
pub mod prompt;

pub use prompt::{ComposedPrompt, build_image_prompt};

//! Prompt composer.
//!
//! Builds an image-generation prompt from a base text and a platform's
//! settings by sampling one preset per non-empty selector and rolling the
//! text-overlay and collage percentages. Pure: all randomness comes from the
//! caller's RNG, so a seeded RNG reproduces the same prompt.

use rand::Rng;
use rand::seq::SliceRandom;

use super::presets::{self, COLLAGE_FRAGMENT, SINGLE_COMPOSITION_FRAGMENT, TEXT_OVERLAY_FRAGMENT};
use crate::database::models::{Percent, PlatformImageSettings, SelectorField};

/// Result of one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub prompt: String,
    /// Aspect-ratio code of the image to request.
    pub format: String,
    pub text_added: bool,
    pub collage: bool,
}

/// Compose a prompt for `base` under `settings`.
///
/// With `use_first_format` the first stored format is used, otherwise one is
/// drawn uniformly. An empty format list falls back to the platform's
/// recommended format.
pub fn build_image_prompt<R: Rng + ?Sized>(
    base: &str,
    settings: &PlatformImageSettings,
    use_first_format: bool,
    rng: &mut R,
) -> ComposedPrompt {
    let format = if use_first_format {
        settings.formats.first()
    } else {
        settings.formats.choose(rng)
    }
    .cloned()
    .unwrap_or_else(|| settings.platform.recommended_format().to_string());

    let mut prompt = base.to_string();

    for field in SelectorField::PROMPT_ORDER {
        let Some(code) = settings.selector(field).choose(rng) else {
            continue;
        };
        match presets::lookup(field, code) {
            Some(preset) => append(&mut prompt, preset.fragment),
            None => tracing::debug!("Skipping unknown {:?} preset '{}'", field, code),
        }
    }

    let text_added = roll(settings.text_percent, rng);
    if text_added {
        append(&mut prompt, TEXT_OVERLAY_FRAGMENT);
    }

    let collage = roll(settings.collage_percent, rng);
    append(
        &mut prompt,
        if collage {
            COLLAGE_FRAGMENT
        } else {
            SINGLE_COMPOSITION_FRAGMENT
        },
    );

    ComposedPrompt {
        prompt,
        format,
        text_added,
        collage,
    }
}

/// One independent percent draw. Zero never hits and draws nothing.
fn roll<R: Rng + ?Sized>(percent: Percent, rng: &mut R) -> bool {
    let percent = percent.resolve(rng);
    percent > 0 && rng.gen_range(1..=100u8) <= percent
}

fn append(prompt: &mut String, fragment: &str) {
    prompt.push_str(". ");
    prompt.push_str(fragment);
}

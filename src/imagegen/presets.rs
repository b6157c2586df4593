//! Static preset tables for image prompts.
//!
//! Codes are stored in category settings and travel inside callback data,
//! so they stay short and ASCII.

use crate::database::models::SelectorField;

/// A named prompt preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub code: &'static str,
    pub name: &'static str,
    pub fragment: &'static str,
}

const fn preset(code: &'static str, name: &'static str, fragment: &'static str) -> Preset {
    Preset {
        code,
        name,
        fragment,
    }
}

pub static FORMATS: &[Preset] = &[
    preset("1:1", "Square 1:1", "square 1:1 frame"),
    preset("4:5", "Portrait 4:5", "portrait 4:5 frame"),
    preset("2:3", "Tall 2:3", "tall 2:3 frame"),
    preset("3:4", "Portrait 3:4", "portrait 3:4 frame"),
    preset("9:16", "Story 9:16", "vertical 9:16 frame"),
    preset("16:9", "Wide 16:9", "widescreen 16:9 frame"),
    preset("3:2", "Landscape 3:2", "landscape 3:2 frame"),
];

pub static STYLES: &[Preset] = &[
    preset("photo", "Photorealistic", "Photorealistic style, natural textures and true-to-life detail"),
    preset("cine", "Cinematic", "Cinematic style with film grain and dramatic depth"),
    preset("anime", "Anime", "Anime illustration style with clean line art"),
    preset("water", "Watercolor", "Soft watercolor painting style with visible paper texture"),
    preset("flat", "Flat vector", "Flat vector illustration with bold shapes and limited palette"),
    preset("3d", "3D render", "Polished 3D render with global illumination"),
    preset("oil", "Oil painting", "Classical oil painting style with rich brush strokes"),
    preset("mini", "Minimalism", "Minimalist composition with generous negative space"),
];

pub static TONES: &[Preset] = &[
    preset("warm", "Warm", "Warm color palette with golden highlights"),
    preset("cold", "Cold", "Cool color palette with blue and teal tones"),
    preset("pastel", "Pastel", "Gentle pastel colors with low contrast"),
    preset("vivid", "Vivid", "Vivid saturated colors with strong contrast"),
    preset("mono", "Monochrome", "Monochrome black and white tonality"),
    preset("dark", "Moody", "Dark moody atmosphere with deep shadows"),
];

pub static CAMERAS: &[Preset] = &[
    preset("dslr", "DSLR 50mm", "Shot on a full-frame DSLR with a 50mm lens"),
    preset("wide", "Wide angle", "Captured with a 24mm wide-angle lens"),
    preset("tele", "Telephoto", "Captured with a 200mm telephoto lens and compressed background"),
    preset("macro", "Macro", "Macro lens close-up with shallow depth of field"),
    preset("film", "35mm film", "Shot on 35mm analog film"),
    preset("phone", "Smartphone", "Casual smartphone camera look"),
];

pub static ANGLES: &[Preset] = &[
    preset("eye", "Eye level", "Eye-level viewpoint"),
    preset("low", "Low angle", "Low-angle shot looking up at the subject"),
    preset("high", "High angle", "High-angle shot looking down at the subject"),
    preset("top", "Top down", "Top-down flat lay perspective"),
    preset("close", "Close-up", "Tight close-up framing"),
    preset("dutch", "Dutch tilt", "Dutch angle with a tilted horizon"),
];

pub static QUALITY: &[Preset] = &[
    preset("hd", "HD", "High detail, sharp focus"),
    preset("8k", "Ultra 8K", "Ultra high resolution 8K detail"),
    preset("studio", "Studio light", "Professional studio lighting"),
    preset("hdr", "HDR", "HDR lighting with balanced exposure"),
    preset("soft", "Soft focus", "Soft dreamy focus and gentle bloom"),
];

/// Fragment appended when the text overlay draw succeeds.
pub const TEXT_OVERLAY_FRAGMENT: &str =
    "Add a short bold headline text overlay that is clearly readable";

/// Fragment appended when the collage draw succeeds.
pub const COLLAGE_FRAGMENT: &str =
    "Create a collage of several related scenes arranged in one frame";

/// Fragment appended whenever no collage is drawn.
pub const SINGLE_COMPOSITION_FRAGMENT: &str =
    "Create a cohesive single composition with one main subject";

/// Preset table backing a selector field.
pub fn table(field: SelectorField) -> &'static [Preset] {
    match field {
        SelectorField::Formats => FORMATS,
        SelectorField::Styles => STYLES,
        SelectorField::Tones => TONES,
        SelectorField::Cameras => CAMERAS,
        SelectorField::Angles => ANGLES,
        SelectorField::Quality => QUALITY,
    }
}

/// Find a preset by field and code.
pub fn lookup(field: SelectorField, code: &str) -> Option<&'static Preset> {
    table(field).iter().find(|p| p.code == code)
}

/// Human name for a code, falling back to the raw code for stale values.
pub fn display_name(field: SelectorField, code: &str) -> String {
    lookup(field, code).map_or_else(|| code.to_string(), |p| p.name.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_codes_are_unique_per_table() {
        for field in SelectorField::ALL {
            let codes: HashSet<_> = table(field).iter().map(|p| p.code).collect();
            assert_eq!(codes.len(), table(field).len(), "duplicate code in {field:?}");
        }
    }

    #[test]
    fn test_codes_fit_callback_data() {
        // Longest callback is the toggle: "is:t:<cat>:<platform>:<field>:<code>".
        for field in SelectorField::ALL {
            for p in table(field) {
                assert!(p.code.len() <= 8, "{} too long", p.code);
                assert!(p.code.is_ascii());
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(SelectorField::Styles, "anime").map(|p| p.name), Some("Anime"));
        assert!(lookup(SelectorField::Styles, "16:9").is_none());
        assert_eq!(display_name(SelectorField::Tones, "gone"), "gone");
    }
}

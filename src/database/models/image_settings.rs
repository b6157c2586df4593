//! Per-platform image generation settings.
//!
//! Stored as a sub-document of the category settings blob under
//! `<platform>_image_settings`. Older documents stored selector fields as a
//! single string and percents as numbers; both shapes are normalized here,
//! once, when the document is read.

use mongodb::bson::{Bson, Document, doc};
use rand::Rng;
use tracing::warn;

use super::platform::Platform;

/// Multi-select settings fields backed by a preset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorField {
    Formats,
    Styles,
    Tones,
    Cameras,
    Angles,
    Quality,
}

impl SelectorField {
    pub const ALL: [SelectorField; 6] = [
        SelectorField::Formats,
        SelectorField::Styles,
        SelectorField::Tones,
        SelectorField::Cameras,
        SelectorField::Angles,
        SelectorField::Quality,
    ];

    /// Fields sampled into the prompt, in prompt order.
    pub const PROMPT_ORDER: [SelectorField; 5] = [
        SelectorField::Styles,
        SelectorField::Tones,
        SelectorField::Cameras,
        SelectorField::Angles,
        SelectorField::Quality,
    ];

    /// Short code used in callback data.
    pub fn code(self) -> &'static str {
        match self {
            Self::Formats => "fmt",
            Self::Styles => "st",
            Self::Tones => "tn",
            Self::Cameras => "cam",
            Self::Angles => "ang",
            Self::Quality => "q",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Formats => "Formats",
            Self::Styles => "Styles",
            Self::Tones => "Tones",
            Self::Cameras => "Cameras",
            Self::Angles => "Angles",
            Self::Quality => "Quality",
        }
    }

    /// Key of the list inside the stored sub-document.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Formats => "formats",
            Self::Styles => "styles",
            Self::Tones => "tones",
            Self::Cameras => "cameras",
            Self::Angles => "angles",
            Self::Quality => "quality",
        }
    }

    /// Whether an empty selection is meaningful ("random").
    pub fn allows_empty(self) -> bool {
        self != Self::Formats
    }
}

/// Percent chance setting, or a fresh random percent per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Percent {
    Fixed(u8),
    Random,
}

impl Default for Percent {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

impl Percent {
    pub const RANDOM_CODE: &'static str = "random";

    /// Clamp any integer into `[0, 100]`.
    pub fn clamped(value: i64) -> Self {
        // Bounded by the clamp, the cast cannot truncate.
        Self::Fixed(value.clamp(0, 100) as u8)
    }

    /// Parse stored or user-supplied text. Unparseable input reads as 0.
    pub fn parse_lenient(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(Self::RANDOM_CODE) {
            return Self::Random;
        }
        let raw = raw.trim_end_matches('%');
        if let Ok(v) = raw.parse::<i64>() {
            return Self::clamped(v);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::clamped(v.round() as i64),
            _ => Self::default(),
        }
    }

    /// Read a stored value. Anything that is not a number or text reads as 0.
    fn from_stored(value: &Bson) -> Self {
        match value {
            Bson::Int32(v) => Self::clamped(i64::from(*v)),
            Bson::Int64(v) => Self::clamped(*v),
            Bson::Double(v) if v.is_finite() => Self::clamped(v.round() as i64),
            Bson::String(s) => Self::parse_lenient(s),
            _ => Self::default(),
        }
    }

    /// Storage and callback representation.
    pub fn code(self) -> String {
        match self {
            Self::Fixed(v) => v.to_string(),
            Self::Random => Self::RANDOM_CODE.to_string(),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Fixed(v) => format!("{v}%"),
            Self::Random => "random".to_string(),
        }
    }

    /// Concrete percent for one draw. `Random` is re-drawn on every call.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> u8 {
        match self {
            Self::Fixed(v) => v.min(100),
            Self::Random => rng.gen_range(0..=100),
        }
    }
}

/// Layout of the HTML post the image accompanies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HtmlStyle {
    #[default]
    News,
    Blog,
    Minimal,
    Bold,
}

impl HtmlStyle {
    pub const ALL: [HtmlStyle; 4] = [Self::News, Self::Blog, Self::Minimal, Self::Bold];

    pub fn code(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Blog => "blog",
            Self::Minimal => "minimal",
            Self::Bold => "bold",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::News => "News",
            Self::Blog => "Blog",
            Self::Minimal => "Minimal",
            Self::Bold => "Bold",
        }
    }
}

/// Read a stored selector: a single string, a list, or nothing.
///
/// Non-string list items are skipped; any other shape reads as empty.
fn codes_from_stored(value: &Bson) -> Vec<String> {
    let list = match value {
        Bson::String(s) => vec![s.clone()],
        Bson::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    normalize_codes(list)
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn normalize_codes(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for code in list {
        let code = code.trim();
        if !code.is_empty() && !out.iter().any(|c| c == code) {
            out.push(code.to_string());
        }
    }
    out
}

/// Image settings of one category on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformImageSettings {
    pub platform: Platform,
    /// Never empty.
    pub formats: Vec<String>,
    pub styles: Vec<String>,
    pub tones: Vec<String>,
    pub cameras: Vec<String>,
    pub angles: Vec<String>,
    pub quality: Vec<String>,
    pub text_percent: Percent,
    pub collage_percent: Percent,
    pub html_style: HtmlStyle,
}

impl PlatformImageSettings {
    /// Defaults: the platform's recommended format, everything else random/off.
    pub fn defaults(platform: Platform) -> Self {
        Self {
            platform,
            formats: vec![platform.recommended_format().to_string()],
            styles: Vec::new(),
            tones: Vec::new(),
            cameras: Vec::new(),
            angles: Vec::new(),
            quality: Vec::new(),
            text_percent: Percent::default(),
            collage_percent: Percent::default(),
            html_style: HtmlStyle::default(),
        }
    }

    /// Read this platform's settings out of a category settings blob.
    ///
    /// Every key is read on its own: a missing or malformed value falls back
    /// to that field's default and leaves the other fields intact.
    pub fn from_blob(platform: Platform, blob: &Document) -> Self {
        let key = platform.settings_key();
        let mut settings = Self::defaults(platform);
        let sub = match blob.get(&key) {
            Some(Bson::Document(sub)) => sub,
            None | Some(Bson::Null) => return settings,
            Some(other) => {
                warn!("Malformed {} settings ({:?}), using defaults", key, other.element_type());
                return settings;
            }
        };

        for field in SelectorField::ALL {
            if let Some(value) = sub.get(field.storage_key()) {
                *settings.selector_mut(field) = codes_from_stored(value);
            }
        }
        if let Some(value) = sub.get("text_percent") {
            settings.text_percent = Percent::from_stored(value);
        }
        if let Some(value) = sub.get("collage_percent") {
            settings.collage_percent = Percent::from_stored(value);
        }
        settings.html_style = sub
            .get_str("html_style")
            .ok()
            .and_then(HtmlStyle::from_code)
            .unwrap_or_default();

        settings.ensure_formats();
        settings
    }

    /// Canonical stored shape.
    pub fn to_document(&self) -> Document {
        doc! {
            "formats": self.formats.clone(),
            "styles": self.styles.clone(),
            "tones": self.tones.clone(),
            "cameras": self.cameras.clone(),
            "angles": self.angles.clone(),
            "quality": self.quality.clone(),
            "text_percent": self.text_percent.code(),
            "collage_percent": self.collage_percent.code(),
            "html_style": self.html_style.code(),
        }
    }

    pub fn selector(&self, field: SelectorField) -> &[String] {
        match field {
            SelectorField::Formats => &self.formats,
            SelectorField::Styles => &self.styles,
            SelectorField::Tones => &self.tones,
            SelectorField::Cameras => &self.cameras,
            SelectorField::Angles => &self.angles,
            SelectorField::Quality => &self.quality,
        }
    }

    fn selector_mut(&mut self, field: SelectorField) -> &mut Vec<String> {
        match field {
            SelectorField::Formats => &mut self.formats,
            SelectorField::Styles => &mut self.styles,
            SelectorField::Tones => &mut self.tones,
            SelectorField::Cameras => &mut self.cameras,
            SelectorField::Angles => &mut self.angles,
            SelectorField::Quality => &mut self.quality,
        }
    }

    pub fn is_selected(&self, field: SelectorField, code: &str) -> bool {
        self.selector(field).iter().any(|c| c == code)
    }

    /// Add the code if absent, remove it if present.
    ///
    /// Returns whether the code is selected afterwards. Removing the last
    /// format puts the recommended format back.
    pub fn toggle(&mut self, field: SelectorField, code: &str) -> bool {
        let list = self.selector_mut(field);
        if let Some(pos) = list.iter().position(|c| c == code) {
            list.remove(pos);
        } else {
            list.push(code.to_string());
        }
        self.ensure_formats();
        self.is_selected(field, code)
    }

    /// Overwrite the fields present in the patch.
    pub fn apply(&mut self, patch: SettingsPatch) {
        for (field, codes) in patch.selectors {
            *self.selector_mut(field) = normalize_codes(codes);
        }
        if let Some(p) = patch.text_percent {
            self.text_percent = p;
        }
        if let Some(p) = patch.collage_percent {
            self.collage_percent = p;
        }
        if let Some(style) = patch.html_style {
            self.html_style = style;
        }
        self.ensure_formats();
    }

    fn ensure_formats(&mut self) {
        if self.formats.is_empty() {
            self.formats
                .push(self.platform.recommended_format().to_string());
        }
    }
}

/// Partial update of platform settings. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub selectors: Vec<(SelectorField, Vec<String>)>,
    pub text_percent: Option<Percent>,
    pub collage_percent: Option<Percent>,
    pub html_style: Option<HtmlStyle>,
}

impl SettingsPatch {
    /// Replace one selector list.
    pub fn selector(field: SelectorField, codes: Vec<String>) -> Self {
        Self {
            selectors: vec![(field, codes)],
            ..Default::default()
        }
    }

    pub fn text_percent(percent: Percent) -> Self {
        Self {
            text_percent: Some(percent),
            ..Default::default()
        }
    }

    pub fn collage_percent(percent: Percent) -> Self {
        Self {
            collage_percent: Some(percent),
            ..Default::default()
        }
    }

    pub fn html_style(style: HtmlStyle) -> Self {
        Self {
            html_style: Some(style),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
            && self.text_percent.is_none()
            && self.collage_percent.is_none()
            && self.html_style.is_none()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn blob_with(platform: Platform, sub: Document) -> Document {
        let mut blob = Document::new();
        blob.insert(platform.settings_key(), sub);
        blob
    }

    #[test]
    fn test_defaults_on_missing_key() {
        let s = PlatformImageSettings::from_blob(Platform::Instagram, &Document::new());
        assert_eq!(s.formats, vec!["4:5".to_string()]);
        assert!(s.styles.is_empty());
        assert_eq!(s.text_percent, Percent::Fixed(0));
        assert_eq!(s.collage_percent, Percent::Fixed(0));
        assert_eq!(s.html_style, HtmlStyle::News);
    }

    #[test]
    fn test_legacy_scalar_selectors_are_normalized() {
        let blob = blob_with(
            Platform::Pinterest,
            doc! {
                "formats": "16:9",
                "styles": "anime",
                "tones": "",
                "cameras": ["dslr", "dslr", " wide "],
                "angles": Bson::Null,
                "text_percent": 250,
                "collage_percent": "abc",
                "html_style": "unknown",
            },
        );
        let s = PlatformImageSettings::from_blob(Platform::Pinterest, &blob);

        assert_eq!(s.formats, vec!["16:9".to_string()]);
        assert_eq!(s.styles, vec!["anime".to_string()]);
        assert!(s.tones.is_empty());
        assert_eq!(s.cameras, vec!["dslr".to_string(), "wide".to_string()]);
        assert!(s.angles.is_empty());
        assert_eq!(s.text_percent, Percent::Fixed(100));
        assert_eq!(s.collage_percent, Percent::Fixed(0));
        assert_eq!(s.html_style, HtmlStyle::News);
    }

    #[test]
    fn test_malformed_field_keeps_the_others() {
        let blob = blob_with(
            Platform::Instagram,
            doc! {
                "formats": ["1:1", 3, "9:16"],
                "styles": ["anime"],
                "tones": 5,
                "cameras": { "name": "dslr" },
                "text_percent": "75",
                "collage_percent": true,
                "html_style": "blog",
            },
        );
        let s = PlatformImageSettings::from_blob(Platform::Instagram, &blob);

        assert_eq!(s.formats, vec!["1:1".to_string(), "9:16".to_string()]);
        assert_eq!(s.styles, vec!["anime".to_string()]);
        assert!(s.tones.is_empty());
        assert!(s.cameras.is_empty());
        assert_eq!(s.text_percent, Percent::Fixed(75));
        assert_eq!(s.collage_percent, Percent::Fixed(0));
        assert_eq!(s.html_style, HtmlStyle::Blog);

        let blob = blob_with(
            Platform::Instagram,
            doc! { "styles": ["anime"], "collage_percent": { "v": 1 } },
        );
        let s = PlatformImageSettings::from_blob(Platform::Instagram, &blob);
        assert_eq!(s.styles, vec!["anime".to_string()]);
        assert_eq!(s.collage_percent, Percent::Fixed(0));
    }

    #[test]
    fn test_non_document_settings_read_as_defaults() {
        let mut blob = Document::new();
        blob.insert(Platform::Vk.settings_key(), "broken");
        assert_eq!(
            PlatformImageSettings::from_blob(Platform::Vk, &blob),
            PlatformImageSettings::defaults(Platform::Vk)
        );
    }

    #[test]
    fn test_empty_stored_formats_get_recommended() {
        let blob = blob_with(Platform::Vk, doc! { "formats": [] });
        let s = PlatformImageSettings::from_blob(Platform::Vk, &blob);
        assert_eq!(s.formats, vec!["1:1".to_string()]);
    }

    #[test]
    fn test_document_roundtrip() {
        let mut s = PlatformImageSettings::defaults(Platform::Telegram);
        s.toggle(SelectorField::Styles, "cine");
        s.text_percent = Percent::Random;
        s.collage_percent = Percent::Fixed(40);
        s.html_style = HtmlStyle::Blog;

        let blob = blob_with(Platform::Telegram, s.to_document());
        assert_eq!(PlatformImageSettings::from_blob(Platform::Telegram, &blob), s);
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let original = PlatformImageSettings::defaults(Platform::Website);
        let mut s = original.clone();

        assert!(s.toggle(SelectorField::Tones, "warm"));
        assert!(s.is_selected(SelectorField::Tones, "warm"));
        assert!(!s.toggle(SelectorField::Tones, "warm"));
        assert_eq!(s, original);
    }

    #[test]
    fn test_removing_last_format_substitutes_recommended() {
        let mut s = PlatformImageSettings::defaults(Platform::Pinterest);
        s.toggle(SelectorField::Formats, "1:1");
        s.toggle(SelectorField::Formats, "2:3");
        assert_eq!(s.formats, vec!["1:1".to_string()]);

        s.toggle(SelectorField::Formats, "1:1");
        assert_eq!(s.formats, vec!["2:3".to_string()]);

        // Toggling the sole recommended format off leaves it in place.
        assert!(s.toggle(SelectorField::Formats, "2:3"));
        assert_eq!(s.formats, vec!["2:3".to_string()]);
    }

    #[test]
    fn test_clear_selector() {
        let mut s = PlatformImageSettings::defaults(Platform::Vk);
        s.toggle(SelectorField::Angles, "low");
        s.toggle(SelectorField::Formats, "16:9");
        s.apply(SettingsPatch::selector(SelectorField::Angles, Vec::new()));
        s.apply(SettingsPatch::selector(SelectorField::Formats, Vec::new()));
        assert!(s.angles.is_empty());
        assert_eq!(s.formats, vec!["1:1".to_string()]);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut s = PlatformImageSettings::defaults(Platform::Telegram);
        s.toggle(SelectorField::Styles, "anime");
        s.text_percent = Percent::Fixed(30);

        s.apply(SettingsPatch::collage_percent(Percent::Fixed(0)));
        assert_eq!(s.styles, vec!["anime".to_string()]);
        assert_eq!(s.text_percent, Percent::Fixed(30));

        s.apply(SettingsPatch::selector(SelectorField::Styles, Vec::new()));
        assert!(s.styles.is_empty());
        assert_eq!(s.text_percent, Percent::Fixed(30));

        s.apply(SettingsPatch::selector(SelectorField::Formats, Vec::new()));
        assert_eq!(s.formats, vec!["16:9".to_string()]);
        assert!(SettingsPatch::default().is_empty());
    }

    #[test]
    fn test_percent_parsing() {
        assert_eq!(Percent::parse_lenient("50"), Percent::Fixed(50));
        assert_eq!(Percent::parse_lenient("75%"), Percent::Fixed(75));
        assert_eq!(Percent::parse_lenient("-5"), Percent::Fixed(0));
        assert_eq!(Percent::parse_lenient("1000"), Percent::Fixed(100));
        assert_eq!(Percent::parse_lenient("33.6"), Percent::Fixed(34));
        assert_eq!(Percent::parse_lenient("RANDOM"), Percent::Random);
        assert_eq!(Percent::parse_lenient("lots"), Percent::Fixed(0));
    }

    #[test]
    fn test_random_percent_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(Percent::Random.resolve(&mut rng) <= 100);
        }
        assert_eq!(Percent::Fixed(42).resolve(&mut rng), 42);
    }
}

//! Image settings menus.
//!
//! Every button here is scoped to one category and platform. The category
//! must belong to the user pressing the button; anything else reads as
//! "not found".

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::debug;

use super::callback::{CallbackAction, PercentKind};
use super::{owned_category, show_menu};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{
    Category, HtmlStyle, Percent, Platform, PlatformImageSettings, SelectorField, SettingsPatch,
};
use crate::imagegen::presets;
use crate::imagegen::{ComposedPrompt, build_image_prompt};
use crate::utils::{html_escape, user_key};

/// Choices offered by the percent menus.
pub const PERCENT_CHOICES: [Percent; 7] = [
    Percent::Fixed(0),
    Percent::Fixed(10),
    Percent::Fixed(25),
    Percent::Fixed(50),
    Percent::Fixed(75),
    Percent::Fixed(100),
    Percent::Random,
];

fn mark(selected: bool, label: &str) -> String {
    if selected {
        format!("✅ {label}")
    } else {
        label.to_string()
    }
}

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.encode())
}

fn percent_of(settings: &PlatformImageSettings, kind: PercentKind) -> Percent {
    match kind {
        PercentKind::Text => settings.text_percent,
        PercentKind::Collage => settings.collage_percent,
    }
}

/// Selected values of a field, or "random" when nothing is selected.
fn selection_summary(settings: &PlatformImageSettings, field: SelectorField) -> String {
    let selected = settings.selector(field);
    if selected.is_empty() {
        return "random".to_string();
    }
    selected
        .iter()
        .map(|code| html_escape(&presets::display_name(field, code)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Summary of one platform's settings with a button per setting.
pub fn platform_view(category: &Category, settings: &PlatformImageSettings) -> (String, InlineKeyboardMarkup) {
    let category_id = category.category_id;
    let platform = settings.platform;

    let mut text = format!(
        "🖼 <b>{}</b> · {}\n\n",
        html_escape(&category.name),
        platform.display_name()
    );
    for field in SelectorField::ALL {
        text.push_str(&format!(
            "<b>{}:</b> {}\n",
            field.label(),
            selection_summary(settings, field)
        ));
    }
    text.push_str(&format!(
        "<b>{}:</b> {}\n<b>{}:</b> {}\n<b>HTML style:</b> {}",
        PercentKind::Text.label(),
        settings.text_percent.label(),
        PercentKind::Collage.label(),
        settings.collage_percent.label(),
        settings.html_style.label()
    ));

    let mut rows: Vec<Vec<InlineKeyboardButton>> = SelectorField::ALL
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&field| {
                    button(
                        field.label(),
                        CallbackAction::Selector {
                            category_id,
                            platform,
                            field,
                        },
                    )
                })
                .collect()
        })
        .collect();

    rows.push(
        [PercentKind::Text, PercentKind::Collage]
            .into_iter()
            .map(|kind| {
                button(
                    kind.label(),
                    CallbackAction::PercentMenu {
                        category_id,
                        platform,
                        kind,
                    },
                )
            })
            .collect(),
    );
    rows.push(vec![
        button(
            "HTML style",
            CallbackAction::HtmlMenu {
                category_id,
                platform,
            },
        ),
        button(
            "👁 Preview",
            CallbackAction::Preview {
                category_id,
                platform,
            },
        ),
    ]);
    rows.push(vec![button("⬅️ Back", CallbackAction::Category { category_id })]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Multi-select menu for one selector field.
pub fn selector_view(
    category_id: i64,
    settings: &PlatformImageSettings,
    field: SelectorField,
) -> (String, InlineKeyboardMarkup) {
    let platform = settings.platform;
    let hint = if field.allows_empty() {
        "Nothing selected means a random pick from all options."
    } else {
        "At least one format stays selected."
    };
    let text = format!(
        "<b>{}</b> · {}\n\nSelected: {}\n<i>{}</i>",
        field.label(),
        platform.display_name(),
        selection_summary(settings, field),
        hint
    );

    let per_row = if field == SelectorField::Formats { 3 } else { 2 };
    let mut rows: Vec<Vec<InlineKeyboardButton>> = presets::table(field)
        .chunks(per_row)
        .map(|chunk| {
            chunk
                .iter()
                .map(|preset| {
                    button(
                        mark(settings.is_selected(field, preset.code), preset.name),
                        CallbackAction::Toggle {
                            category_id,
                            platform,
                            field,
                            code: preset.code.to_string(),
                        },
                    )
                })
                .collect()
        })
        .collect();

    let clear_label = if field.allows_empty() {
        "🎲 Random"
    } else {
        "↩️ Recommended only"
    };
    rows.push(vec![
        button(
            clear_label,
            CallbackAction::Clear {
                category_id,
                platform,
                field,
            },
        ),
        button(
            "⬅️ Back",
            CallbackAction::Platform {
                category_id,
                platform,
            },
        ),
    ]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Percent choices for the text overlay or collage chance.
pub fn percent_view(
    category_id: i64,
    settings: &PlatformImageSettings,
    kind: PercentKind,
) -> (String, InlineKeyboardMarkup) {
    let platform = settings.platform;
    let current = percent_of(settings, kind);
    let text = format!(
        "<b>{}</b> · {}\n\nChance per generated image: {}\n\
         <i>random draws a new percent for every image.</i>",
        kind.label(),
        platform.display_name(),
        current.label()
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = PERCENT_CHOICES
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&value| {
                    button(
                        mark(value == current, &value.label()),
                        CallbackAction::SetPercent {
                            category_id,
                            platform,
                            kind,
                            value,
                        },
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![button(
        "⬅️ Back",
        CallbackAction::Platform {
            category_id,
            platform,
        },
    )]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Layout choices for the accompanying HTML post.
pub fn html_view(category_id: i64, settings: &PlatformImageSettings) -> (String, InlineKeyboardMarkup) {
    let platform = settings.platform;
    let text = format!(
        "<b>HTML style</b> · {}\n\nCurrent: {}",
        platform.display_name(),
        settings.html_style.label()
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = HtmlStyle::ALL
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&style| {
                    button(
                        mark(style == settings.html_style, style.label()),
                        CallbackAction::SetHtml {
                            category_id,
                            platform,
                            style,
                        },
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![button(
        "⬅️ Back",
        CallbackAction::Platform {
            category_id,
            platform,
        },
    )]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Text block describing one composed prompt.
pub fn describe_prompt(composed: &ComposedPrompt) -> String {
    format!(
        "<b>Format:</b> {}\n<b>Text on image:</b> {}\n<b>Collage:</b> {}\n\n<code>{}</code>",
        composed.format,
        if composed.text_added { "yes" } else { "no" },
        if composed.collage { "yes" } else { "no" },
        html_escape(&composed.prompt)
    )
}

fn preview_view(
    category: &Category,
    platform: Platform,
    composed: &ComposedPrompt,
) -> (String, InlineKeyboardMarkup) {
    let category_id = category.category_id;
    let text = format!(
        "👁 <b>Preview</b> · {} · {}\n\n{}",
        html_escape(&category.name),
        platform.display_name(),
        describe_prompt(composed)
    );
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        button(
            "🔄 Again",
            CallbackAction::Preview {
                category_id,
                platform,
            },
        ),
        button(
            "⬅️ Back",
            CallbackAction::Platform {
                category_id,
                platform,
            },
        ),
    ]]);
    (text, keyboard)
}

/// Handle every category-scoped settings button.
pub async fn handle_callback(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
    action: CallbackAction,
) -> anyhow::Result<()> {
    let user_id = user_key(q.from.id);
    let Some(category_id) = action.category_id() else {
        return Ok(());
    };
    let Some(category) = owned_category(&state, category_id, user_id).await? else {
        bot.answer_callback_query(q.id).text("Category not found").await?;
        return Ok(());
    };

    let repo = &state.categories;
    let mut notice: Option<&str> = None;

    let (text, keyboard) = match action {
        CallbackAction::Platform { platform, .. } => {
            platform_view(&category, &category.platform_settings(platform))
        }
        CallbackAction::Selector { platform, field, .. } => {
            selector_view(category_id, &category.platform_settings(platform), field)
        }
        CallbackAction::Toggle {
            platform,
            field,
            code,
            ..
        } => {
            if presets::lookup(field, &code).is_none() {
                debug!("Ignoring unknown {:?} preset '{}'", field, code);
                bot.answer_callback_query(q.id).text("Unknown option").await?;
                return Ok(());
            }
            let Some(settings) = repo.toggle_selector(category_id, platform, field, &code).await? else {
                bot.answer_callback_query(q.id).text("Category not found").await?;
                return Ok(());
            };
            selector_view(category_id, &settings, field)
        }
        CallbackAction::Clear { platform, field, .. } => {
            let Some(settings) = repo.clear_selector(category_id, platform, field).await? else {
                bot.answer_callback_query(q.id).text("Category not found").await?;
                return Ok(());
            };
            notice = Some("Reset");
            selector_view(category_id, &settings, field)
        }
        CallbackAction::PercentMenu { platform, kind, .. } => {
            percent_view(category_id, &category.platform_settings(platform), kind)
        }
        CallbackAction::SetPercent {
            platform,
            kind,
            value,
            ..
        } => {
            let patch = match kind {
                PercentKind::Text => SettingsPatch::text_percent(value),
                PercentKind::Collage => SettingsPatch::collage_percent(value),
            };
            let Some(settings) = repo.save_platform_settings(category_id, platform, patch).await? else {
                bot.answer_callback_query(q.id).text("Category not found").await?;
                return Ok(());
            };
            notice = Some("Saved");
            platform_view(&category, &settings)
        }
        CallbackAction::HtmlMenu { platform, .. } => {
            html_view(category_id, &category.platform_settings(platform))
        }
        CallbackAction::SetHtml { platform, style, .. } => {
            let patch = SettingsPatch::html_style(style);
            let Some(settings) = repo.save_platform_settings(category_id, platform, patch).await? else {
                bot.answer_callback_query(q.id).text("Category not found").await?;
                return Ok(());
            };
            notice = Some("Saved");
            platform_view(&category, &settings)
        }
        CallbackAction::Preview { platform, .. } => {
            let settings = category.platform_settings(platform);
            let composed = build_image_prompt(&category.name, &settings, true, &mut rand::thread_rng());
            preview_view(&category, platform, &composed)
        }
        _ => return Ok(()),
    };

    show_menu(&bot, &q, text, keyboard).await?;

    let mut answer = bot.answer_callback_query(q.id);
    if let Some(notice) = notice {
        answer = answer.text(notice);
    }
    answer.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    fn buttons(keyboard: &InlineKeyboardMarkup) -> Vec<(String, CallbackAction)> {
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => {
                    CallbackAction::parse(data).map(|a| (b.text.clone(), a))
                }
                _ => None,
            })
            .collect()
    }

    fn settings() -> PlatformImageSettings {
        PlatformImageSettings::defaults(Platform::Telegram)
    }

    #[test]
    fn test_selector_view_marks_selected_presets() {
        let mut s = settings();
        s.toggle(SelectorField::Styles, "anime");
        let (text, keyboard) = selector_view(4, &s, SelectorField::Styles);

        assert!(text.contains("Anime") || text.contains("anime"));
        let all = buttons(&keyboard);
        let toggles: Vec<_> = all
            .iter()
            .filter(|(_, a)| matches!(a, CallbackAction::Toggle { .. }))
            .collect();
        assert_eq!(toggles.len(), presets::STYLES.len());

        for (label, action) in toggles {
            let CallbackAction::Toggle { code, .. } = action else {
                unreachable!()
            };
            assert_eq!(label.starts_with("✅"), code == "anime", "{label}");
        }
    }

    #[test]
    fn test_selector_view_formats_carry_colon_codes() {
        let (_, keyboard) = selector_view(4, &settings(), SelectorField::Formats);
        let selected: Vec<_> = buttons(&keyboard)
            .into_iter()
            .filter(|(label, _)| label.starts_with("✅"))
            .map(|(_, action)| action)
            .collect();

        assert_eq!(
            selected,
            vec![CallbackAction::Toggle {
                category_id: 4,
                platform: Platform::Telegram,
                field: SelectorField::Formats,
                code: "16:9".to_string(),
            }]
        );
    }

    #[test]
    fn test_percent_view_offers_all_choices() {
        let mut s = settings();
        s.collage_percent = Percent::Random;
        let (_, keyboard) = percent_view(4, &s, PercentKind::Collage);

        let choices: Vec<_> = buttons(&keyboard)
            .into_iter()
            .filter_map(|(label, action)| match action {
                CallbackAction::SetPercent { value, .. } => Some((label, value)),
                _ => None,
            })
            .collect();
        assert_eq!(choices.len(), PERCENT_CHOICES.len());
        for (label, value) in choices {
            assert_eq!(label.starts_with("✅"), value == Percent::Random);
        }
    }

    #[test]
    fn test_platform_view_summarises_defaults() {
        let category = Category::new(4, 1, "Coffee");
        let (text, keyboard) = platform_view(&category, &settings());

        assert!(text.contains("Styles:</b> random"));
        assert!(text.contains("0%"));
        let actions: Vec<_> = buttons(&keyboard).into_iter().map(|(_, a)| a).collect();
        assert!(actions.contains(&CallbackAction::Preview {
            category_id: 4,
            platform: Platform::Telegram
        }));
        assert!(actions.contains(&CallbackAction::Category { category_id: 4 }));
    }

    #[test]
    fn test_html_view_marks_current_style() {
        let mut s = settings();
        s.html_style = HtmlStyle::Bold;
        let (_, keyboard) = html_view(4, &s);
        let marked: Vec<_> = buttons(&keyboard)
            .into_iter()
            .filter(|(label, _)| label.starts_with("✅"))
            .map(|(_, a)| a)
            .collect();
        assert_eq!(
            marked,
            vec![CallbackAction::SetHtml {
                category_id: 4,
                platform: Platform::Telegram,
                style: HtmlStyle::Bold
            }]
        );
    }

    #[test]
    fn test_describe_prompt_escapes_html() {
        let composed = ComposedPrompt {
            prompt: "Cats <3".to_string(),
            format: "1:1".to_string(),
            text_added: true,
            collage: false,
        };
        let text = describe_prompt(&composed);
        assert!(text.contains("Cats &lt;3"));
        assert!(text.contains("<b>Text on image:</b> yes"));
    }
}

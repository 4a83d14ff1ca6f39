//! UI Builder module for creating keyboards and formatting messages

use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::callback_data::CallbackData;
use crate::dialogue::ProjectStage;
use crate::errors::FlowError;
use crate::localization::{t_args_lang, t_lang};
use crate::prompt_builder::Style;
use crate::response_parser::{escape_html, ChoiceOption, ParsedResponse};
use crate::state_machine::{Presentation, ProjectProfile};

/// Longest button label before truncation
pub const MAX_BUTTON_TEXT_CHARS: usize = 40;

/// External links shown in menus
#[derive(Debug, Clone, Default)]
pub struct BotLinks {
    pub workshop: Option<Url>,
    pub feedback: Option<Url>,
}

/// A message ready to send
#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

fn callback(text: impl Into<String>, data: CallbackData) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data.to_string())
}

fn menu_row(language_code: Option<&str>) -> Vec<InlineKeyboardButton> {
    vec![callback(
        t_lang("menu-back-button", language_code),
        CallbackData::MainMenu,
    )]
}

/// Shorten a label to fit on a button
pub fn truncate_button_text(text: &str) -> String {
    if text.chars().count() > MAX_BUTTON_TEXT_CHARS {
        let head: String = text.chars().take(MAX_BUTTON_TEXT_CHARS - 1).collect();
        format!("{}…", head.trim_end())
    } else {
        text.to_string()
    }
}

/// Main menu: start, help and the workshop link
pub fn main_menu_keyboard(links: &BotLinks, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![callback(
            t_lang("menu-start-button", language_code),
            CallbackData::CreateProject,
        )],
        vec![callback(
            t_lang("menu-help-button", language_code),
            CallbackData::Help,
        )],
    ];

    if let Some(url) = &links.workshop {
        rows.push(vec![InlineKeyboardButton::url(
            t_lang("menu-workshop-button", language_code),
            url.clone(),
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn main_menu(links: &BotLinks, language_code: Option<&str>) -> Rendered {
    Rendered {
        text: t_lang("menu-title", language_code),
        keyboard: Some(main_menu_keyboard(links, language_code)),
    }
}

pub fn help(language_code: Option<&str>) -> Rendered {
    Rendered {
        text: t_lang("help-text", language_code),
        keyboard: Some(InlineKeyboardMarkup::new(vec![menu_row(language_code)])),
    }
}

pub fn context_prompt_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![callback(
            t_lang("context-idea-button", language_code),
            CallbackData::SuggestIdea,
        )],
        menu_row(language_code),
    ])
}

/// First style menu: go without a style or pick one
pub fn style_entry_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![callback(
            t_lang("style-go-button", language_code),
            CallbackData::NoStyle,
        )],
        vec![callback(
            t_lang("style-pick-button", language_code),
            CallbackData::StyleMenu,
        )],
    ])
}

pub fn style_name(style: Style, language_code: Option<&str>) -> String {
    t_lang(&format!("style-{}", style.key()), language_code)
}

pub fn style_list_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Style::ALL
        .iter()
        .map(|style| vec![callback(style_name(*style, language_code), CallbackData::Style(*style))])
        .collect();
    rows.push(vec![callback(
        t_lang("style-back-button", language_code),
        CallbackData::StyleBack,
    )]);

    InlineKeyboardMarkup::new(rows)
}

pub fn style_list(language_code: Option<&str>) -> Rendered {
    Rendered {
        text: t_lang("style-list-title", language_code),
        keyboard: Some(style_list_keyboard(language_code)),
    }
}

pub fn usernames_keyboard(usernames: &[String], language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = usernames
        .iter()
        .enumerate()
        .map(|(i, name)| vec![callback(format!("@{name}"), CallbackData::Username(i as i64))])
        .collect();
    rows.push(vec![callback(
        t_lang("usernames-repeat-button", language_code),
        CallbackData::Repeat,
    )]);
    rows.push(menu_row(language_code));

    InlineKeyboardMarkup::new(rows)
}

/// One button per option plus Repeat and menu
pub fn options_keyboard(options: &[ChoiceOption], language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            vec![callback(
                truncate_button_text(&option.short),
                CallbackData::Option(i as i64),
            )]
        })
        .collect();
    rows.push(vec![callback(
        t_lang("repeat-button", language_code),
        CallbackData::Repeat,
    )]);
    rows.push(menu_row(language_code));

    InlineKeyboardMarkup::new(rows)
}

fn stage_title_key(stage: ProjectStage) -> &'static str {
    match stage {
        ProjectStage::Problem => "stage-problem-title",
        ProjectStage::Audience => "stage-audience-title",
        ProjectStage::Shape => "stage-shape-title",
    }
}

/// Stage message: title, comment and the full option lines
pub fn format_stage_message(
    stage: ProjectStage,
    parsed: &ParsedResponse,
    language_code: Option<&str>,
) -> String {
    let mut text = format!("<b>{}</b>\n\n", escape_html(&t_lang(stage_title_key(stage), language_code)));

    if !parsed.lead_comment.is_empty() {
        text.push_str(&format!(
            "<b>{}</b>\n{}\n\n",
            escape_html(&t_lang("stage-comment-title", language_code)),
            escape_html(&parsed.lead_comment)
        ));
    }

    text.push_str(&format!(
        "<b>{}</b>\n",
        escape_html(&t_lang("stage-options-title", language_code))
    ));
    for option in &parsed.options {
        text.push_str(&format!("• {}\n", option.full));
    }

    text.trim_end().to_string()
}

pub fn format_usernames_message(
    context: &str,
    style: Option<Style>,
    seconds: f64,
    language_code: Option<&str>,
) -> String {
    let seconds = format!("{seconds:.2}");
    let context = escape_html(context);
    let mut text = t_args_lang(
        "usernames-title",
        &[("seconds", seconds.as_str()), ("context", context.as_str())],
        language_code,
    );

    if let Some(style) = style {
        let name = escape_html(&style_name(style, language_code));
        text.push('\n');
        text.push_str(&t_args_lang("usernames-style", &[("style", name.as_str())], language_code));
    }

    text
}

pub fn format_profile_message(profile: &ProjectProfile, language_code: Option<&str>) -> String {
    let label = |key: &str| escape_html(&t_lang(key, language_code));

    let mut text = format!("<b>{}</b>\n\n", label("profile-title"));
    text.push_str(&format!(
        "<b>{}:</b> @{}\n",
        label("profile-username"),
        escape_html(&profile.username)
    ));
    text.push_str(&format!("<b>{}:</b> {}\n", label("profile-problem"), escape_html(&profile.problem)));
    text.push_str(&format!("<b>{}:</b> {}\n", label("profile-audience"), escape_html(&profile.audience)));
    text.push_str(&format!("<b>{}:</b> {}\n", label("profile-shape"), escape_html(&profile.shape)));

    if let Some(summary) = &profile.summary {
        if !summary.tagline.is_empty() {
            text.push_str(&format!(
                "\n<b>{}:</b> <i>{}</i>\n",
                label("profile-tagline"),
                escape_html(&summary.tagline)
            ));
        }
        if !summary.description.is_empty() {
            text.push_str(&format!(
                "\n<b>{}:</b>\n{}\n",
                label("profile-description"),
                escape_html(&summary.description)
            ));
        }
        if !summary.examples.is_empty() {
            text.push_str(&format!("\n<b>{}:</b>\n", label("profile-examples")));
            for example in &summary.examples {
                text.push_str(&format!("• {}\n", example.full));
            }
        }
    }

    text.trim_end().to_string()
}

pub fn profile_keyboard(links: &BotLinks, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows = vec![menu_row(language_code)];
    if let Some(url) = &links.feedback {
        rows.push(vec![InlineKeyboardButton::url(
            t_lang("profile-feedback-button", language_code),
            url.clone(),
        )]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Render a flow presentation
pub fn render(presentation: &Presentation, links: &BotLinks, language_code: Option<&str>) -> Rendered {
    match presentation {
        Presentation::ContextPrompt => Rendered {
            text: t_lang("context-prompt", language_code),
            keyboard: Some(context_prompt_keyboard(language_code)),
        },
        Presentation::StyleMenu { context } => Rendered {
            text: t_args_lang(
                "style-menu-title",
                &[("context", escape_html(context).as_str())],
                language_code,
            ),
            keyboard: Some(style_entry_keyboard(language_code)),
        },
        Presentation::Usernames {
            usernames,
            context,
            style,
            elapsed,
        } => Rendered {
            text: format_usernames_message(context, *style, elapsed.as_secs_f64(), language_code),
            keyboard: Some(usernames_keyboard(usernames, language_code)),
        },
        Presentation::StageOptions { stage, parsed } => Rendered {
            text: format_stage_message(*stage, parsed, language_code),
            keyboard: Some(options_keyboard(&parsed.options, language_code)),
        },
        Presentation::ProjectReady(profile) => Rendered {
            text: format_profile_message(profile, language_code),
            keyboard: Some(profile_keyboard(links, language_code)),
        },
    }
}

/// Render a flow error: retryable errors get Repeat, resets get the main menu
pub fn render_error(
    error: &FlowError,
    links: &BotLinks,
    max_context_length: usize,
    language_code: Option<&str>,
) -> Rendered {
    let max = max_context_length.to_string();
    let text = t_args_lang(error.message_key(), &[("max", max.as_str())], language_code);

    let keyboard = if error.is_retryable() {
        Some(InlineKeyboardMarkup::new(vec![
            vec![callback(t_lang("repeat-button", language_code), CallbackData::Repeat)],
            menu_row(language_code),
        ]))
    } else if error.resets_session() || matches!(error, FlowError::UnexpectedState) {
        Some(main_menu_keyboard(links, language_code))
    } else {
        None
    };

    Rendered { text, keyboard }
}

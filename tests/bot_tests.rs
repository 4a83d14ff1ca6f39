use brand_bot::bot::ui_builder::{
    format_stage_message, format_usernames_message, main_menu_keyboard, options_keyboard, render,
    render_error, style_list_keyboard, truncate_button_text, usernames_keyboard, BotLinks,
    MAX_BUTTON_TEXT_CHARS,
};
use brand_bot::bot::CallbackData;
use brand_bot::dialogue::{Field, ProjectStage};
use brand_bot::errors::FlowError;
use brand_bot::localization::init_localization;
use brand_bot::prompt_builder::Style;
use brand_bot::response_parser::{parse_response, ChoiceOption};
use brand_bot::state_machine::{Presentation, ProjectProfile};
use reqwest::Url;
use std::time::Duration;
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() {
        // Initialize localization if not already done
        let _ = init_localization();
    }

    /// Callback tokens of every callback button, row by row
    fn callback_tokens(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    fn url_count(keyboard: &InlineKeyboardMarkup) -> usize {
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter(|button| matches!(button.kind, InlineKeyboardButtonKind::Url(_)))
            .count()
    }

    fn links_with_urls() -> BotLinks {
        BotLinks {
            workshop: Url::parse("https://example.com/workshop").ok(),
            feedback: Url::parse("https://example.com/feedback").ok(),
        }
    }

    #[test]
    fn test_callback_data_round_trip() {
        let actions = [
            CallbackData::MainMenu,
            CallbackData::Help,
            CallbackData::CreateProject,
            CallbackData::SuggestIdea,
            CallbackData::StyleMenu,
            CallbackData::StyleBack,
            CallbackData::NoStyle,
            CallbackData::Style(Style::Cringe),
            CallbackData::Username(2),
            CallbackData::Option(0),
            CallbackData::Repeat,
        ];

        for action in actions {
            assert_eq!(CallbackData::parse(&action.to_string()), Ok(action));
        }
    }

    #[test]
    fn test_callback_data_rejects_garbage() {
        assert!(matches!(
            CallbackData::parse("opt:abc"),
            Err(FlowError::InvalidSelection(_))
        ));
        assert!(matches!(
            CallbackData::parse("style:baroque"),
            Err(FlowError::InvalidSelection(_))
        ));
        assert_eq!(CallbackData::parse("unknown_action"), Err(FlowError::UnexpectedState));
        assert_eq!(CallbackData::parse(""), Err(FlowError::UnexpectedState));
        // Negative indices parse; the state machine rejects them
        assert_eq!(CallbackData::parse("opt:-1"), Ok(CallbackData::Option(-1)));
    }

    #[test]
    fn test_main_menu_keyboard() {
        setup_localization();

        let plain = main_menu_keyboard(&BotLinks::default(), Some("ru"));
        assert_eq!(callback_tokens(&plain), vec!["create", "help"]);
        assert_eq!(url_count(&plain), 0);

        let linked = main_menu_keyboard(&links_with_urls(), Some("en"));
        assert_eq!(url_count(&linked), 1);
    }

    #[test]
    fn test_style_list_keyboard() {
        setup_localization();

        let keyboard = style_list_keyboard(Some("ru"));
        let tokens = callback_tokens(&keyboard);

        assert_eq!(tokens.len(), Style::ALL.len() + 1);
        assert_eq!(tokens[0], "style:epic");
        assert_eq!(tokens.last().map(String::as_str), Some("back_style"));
    }

    #[test]
    fn test_usernames_keyboard() {
        setup_localization();

        let usernames = vec!["coffee_spot".to_string(), "latte_art".to_string()];
        let keyboard = usernames_keyboard(&usernames, Some("ru"));

        assert_eq!(
            callback_tokens(&keyboard),
            vec!["user:0", "user:1", "repeat", "start"]
        );
        assert_eq!(keyboard.inline_keyboard[0][0].text, "@coffee_spot");
    }

    #[test]
    fn test_options_keyboard_truncates_labels() {
        setup_localization();

        let long_label = "Очень длинное название варианта, которое не влезет";
        let options = vec![
            ChoiceOption::new(Some("🔥"), long_label, "деталь"),
            ChoiceOption::new(None, "Коротко", "деталь"),
        ];
        let keyboard = options_keyboard(&options, Some("ru"));

        assert_eq!(callback_tokens(&keyboard), vec!["opt:0", "opt:1", "repeat", "start"]);
        let first = &keyboard.inline_keyboard[0][0].text;
        assert_eq!(first.chars().count(), MAX_BUTTON_TEXT_CHARS);
        assert!(first.ends_with('…'));
        assert_eq!(keyboard.inline_keyboard[1][0].text, "Коротко");
    }

    #[test]
    fn test_truncate_button_text() {
        assert_eq!(truncate_button_text("Кофейня"), "Кофейня");
        let exact = "я".repeat(MAX_BUTTON_TEXT_CHARS);
        assert_eq!(truncate_button_text(&exact), exact);
    }

    #[test]
    fn test_stage_message_escapes_html() {
        setup_localization();

        let parsed = parse_response("Комментарий: <script> & co\n1. 🔥 Огонь: горячая тема");
        let text = format_stage_message(ProjectStage::Problem, &parsed, Some("ru"));

        assert!(text.contains("&lt;script&gt; &amp; co"));
        assert!(text.contains("Огонь"));
        assert!(!text.contains("<script>"));
    }

    #[test]
    fn test_usernames_message() {
        setup_localization();

        let text = format_usernames_message("Кофейня", Some(Style::Funky), 1.5, Some("en"));
        assert!(text.contains("1.50"));
        assert!(text.contains("Кофейня"));
        assert!(text.contains("Funky"));

        let without_style = format_usernames_message("Кофейня", None, 0.0, Some("en"));
        assert!(!without_style.contains("Style:"));
    }

    #[test]
    fn test_render_presentations() {
        setup_localization();
        let links = links_with_urls();

        let prompt = render(&Presentation::ContextPrompt, &links, Some("ru"));
        let keyboard = prompt.keyboard.expect("context prompt keyboard");
        assert_eq!(callback_tokens(&keyboard), vec!["idea", "start"]);

        let style_menu = render(
            &Presentation::StyleMenu {
                context: "Кофейня".to_string(),
            },
            &links,
            Some("ru"),
        );
        assert!(style_menu.text.contains("Кофейня"));
        let keyboard = style_menu.keyboard.expect("style menu keyboard");
        assert_eq!(callback_tokens(&keyboard), vec!["no_style", "choose_style"]);

        let usernames = render(
            &Presentation::Usernames {
                usernames: vec!["coffee_spot".to_string()],
                context: "Кофейня".to_string(),
                style: None,
                elapsed: Duration::from_millis(1200),
            },
            &links,
            Some("ru"),
        );
        assert!(usernames.text.contains("1.20"));

        let profile = render(
            &Presentation::ProjectReady(ProjectProfile {
                username: "coffee_spot".to_string(),
                context: Some("Кофейня".to_string()),
                problem: "Доставка: кофе на дом".to_string(),
                audience: "Офисы: корпоративные заказы".to_string(),
                shape: "Скорость: кофе за минуту".to_string(),
                summary: None,
            }),
            &links,
            Some("en"),
        );
        assert!(profile.text.contains("@coffee_spot"));
        assert!(profile.text.contains("Доставка: кофе на дом"));
        let keyboard = profile.keyboard.expect("profile keyboard");
        assert_eq!(callback_tokens(&keyboard), vec!["start"]);
        assert_eq!(url_count(&keyboard), 1);
    }

    #[test]
    fn test_render_errors() {
        setup_localization();
        let links = BotLinks::default();

        let retry = render_error(
            &FlowError::Generation {
                step: "stage1".to_string(),
            },
            &links,
            200,
            Some("ru"),
        );
        let keyboard = retry.keyboard.expect("retry keyboard");
        assert_eq!(callback_tokens(&keyboard), vec!["repeat", "start"]);

        let lost = render_error(&FlowError::MissingField(Field::Username), &links, 200, Some("en"));
        let keyboard = lost.keyboard.expect("menu keyboard");
        assert_eq!(callback_tokens(&keyboard), vec!["create", "help"]);

        let too_long = render_error(&FlowError::InvalidContext("too_long"), &links, 200, Some("en"));
        assert!(too_long.text.contains("200"));
        assert!(too_long.keyboard.is_none());

        let invalid = render_error(
            &FlowError::InvalidSelection("index 7".to_string()),
            &links,
            200,
            Some("en"),
        );
        assert!(!invalid.text.starts_with("Missing translation"));
    }
}

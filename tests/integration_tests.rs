//! # Integration Tests
//!
//! This module contains integration tests for the brand bot, feeding
//! realistic (messy) model answers through the parsers and checking that the
//! prompts built from the resulting choices carry them forward.

use brand_bot::dialogue::{Field, ProjectStage};
use brand_bot::errors::FlowError;
use brand_bot::prompt_builder::{build_prompt, PromptTarget, Style};
use brand_bot::response_parser::parse_response;
use brand_bot::username::parse_username_response;

#[test]
fn test_markdown_heavy_stage_answer() {
    let answer = r#"
**Комментарий:** Имя @coffee_spot звучит уютно. Каким будет формат?

1. **☕ Кофейня у дома**: уютное место для соседей
2) 📦 Доставка — кофе к двери за 15 минут
3. 🎓 **Школа бариста** курсы для новичков
"#;

    let parsed = parse_response(answer);

    assert_eq!(
        parsed.lead_comment,
        "Имя @coffee_spot звучит уютно. Каким будет формат?"
    );
    assert_eq!(parsed.options.len(), 3);
    assert!(!parsed.is_failed());

    assert_eq!(parsed.options[0].short, "☕ Кофейня у дома");
    assert_eq!(parsed.options[0].detail, "уютное место для соседей");

    assert_eq!(parsed.options[1].short, "📦 Доставка");
    assert_eq!(parsed.options[1].detail, "кофе к двери за 15 минут");

    assert_eq!(parsed.options[2].short, "🎓 Школа бариста");
    assert_eq!(parsed.options[2].detail, "курсы для новичков");
}

#[test]
fn test_noisy_username_answer() {
    let answer = "Категория: **еда**\n1. @coffee_spot\n2. brew_time, latte-art, 9lives, bean_club_\n3. Coffee_Spot";

    let parsed = parse_username_response(answer);

    assert_eq!(parsed.category, "еда");
    assert_eq!(parsed.usernames, vec!["coffee_spot", "brew_time"]);
}

#[test]
fn test_choices_flow_into_later_prompts() {
    let stage1 = parse_response("Комментарий: ок\n1. 📦 Доставка: кофе на дом");
    let stage2 = parse_response("Комментарий: ок\n1. 💼 Офисы: корпоративные заказы");

    let mut fields = brand_bot::dialogue::SessionFields::default();
    fields.set(Field::Context, "Кофейня у дома");
    fields.set(Field::Style, Style::Minimal.key());
    fields.set(Field::Username, "coffee_spot");
    fields.set(Field::Stage1Choice, stage1.options[0].plain());

    let audience = build_prompt(PromptTarget::Stage(ProjectStage::Audience), &fields)
        .expect("audience prompt");
    assert!(audience.contains("@coffee_spot"));
    assert!(audience.contains("Доставка: кофе на дом"));
    assert!(audience.contains("Комментарий:"));

    assert_eq!(
        build_prompt(PromptTarget::Stage(ProjectStage::Shape), &fields),
        Err(FlowError::MissingField(Field::Stage2Choice))
    );

    fields.set(Field::Stage2Choice, stage2.options[0].plain());
    let shape = build_prompt(PromptTarget::Stage(ProjectStage::Shape), &fields)
        .expect("shape prompt");
    assert!(shape.contains("Доставка: кофе на дом"));
    assert!(shape.contains("Офисы: корпоративные заказы"));

    let usernames = build_prompt(PromptTarget::Usernames { count: 10 }, &fields)
        .expect("usernames prompt");
    assert!(usernames.contains("Кофейня у дома"));
    assert!(usernames.contains(Style::Minimal.display_name()));
}

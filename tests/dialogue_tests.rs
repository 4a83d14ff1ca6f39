use anyhow::Result;

use brand_bot::dialogue::{validate_context, ConversationSession, Field, ProjectStage, Stage};
use brand_bot::response_parser::ChoiceOption;

/// Integration test for context validation
#[tokio::test]
async fn test_context_validation() -> Result<()> {
    // Test valid contexts
    assert_eq!(validate_context("Кофейня у дома", 200), Ok("Кофейня у дома".to_string()));
    assert_eq!(validate_context("  подкаст о книгах  ", 200), Ok("подкаст о книгах".to_string()));

    // Test invalid contexts
    assert_eq!(validate_context("", 200), Err("empty"));
    assert_eq!(validate_context("\n\t ", 200), Err("empty"));
    assert_eq!(validate_context(&"a".repeat(201), 200), Err("too_long"));

    Ok(())
}

/// Sessions survive a serde round trip with every stage and field intact
#[tokio::test]
async fn test_session_serialization() -> Result<()> {
    let mut session = ConversationSession::new(Some("en".to_string()));
    session.stage = Stage::Project(ProjectStage::Audience);
    session.fields.set(Field::Context, "Кофейня у дома");
    session.fields.set(Field::Username, "coffee_spot");
    session.fields.set(Field::Stage1Choice, "Доставка: кофе на дом");
    session.options = vec![
        ChoiceOption::new(Some("🎓"), "Студенты", "недорогой кофе"),
        ChoiceOption::placeholder(),
    ];
    session.usernames = vec!["coffee_spot".to_string()];

    let json = serde_json::to_string(&session)?;
    assert!(json.contains("stage1_choice"));

    let restored: ConversationSession = serde_json::from_str(&json)?;
    assert_eq!(restored, session);
    assert!(restored.options[1].placeholder);

    Ok(())
}

/// Test session reset semantics
#[tokio::test]
async fn test_session_reset() -> Result<()> {
    let mut session = ConversationSession::new(Some("ru".to_string()));
    assert!(session.is_idle());

    session.stage = Stage::AwaitingUsernameChoice;
    session.fields.set(Field::Context, "Кофейня");
    session.fields.set(Field::Category, "бизнес");
    session.usernames = vec!["coffee_spot".to_string()];

    session.reset();

    assert!(session.is_idle());
    assert!(session.fields.is_empty());
    assert!(session.usernames.is_empty());
    assert_eq!(session.language_code.as_deref(), Some("ru"));

    Ok(())
}

/// Project stages advance in order and name their choice fields
#[tokio::test]
async fn test_project_stage_order() -> Result<()> {
    assert_eq!(ProjectStage::Problem.next(), Some(ProjectStage::Audience));
    assert_eq!(ProjectStage::Audience.next(), Some(ProjectStage::Shape));
    assert_eq!(ProjectStage::Shape.next(), None);

    let fields: Vec<Field> = ProjectStage::ALL.iter().map(|stage| stage.choice_field()).collect();
    assert_eq!(
        fields,
        vec![Field::Stage1Choice, Field::Stage2Choice, Field::Stage3Choice]
    );

    Ok(())
}

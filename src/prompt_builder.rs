//! Prompt construction for every generation step of the flow.
//!
//! Prompts are pure functions of the session fields: earlier choices are
//! embedded verbatim and each prompt spells out the answer shape that
//! [`crate::response_parser`] expects.

use serde::{Deserialize, Serialize};

use crate::dialogue::{Field, ProjectStage, SessionFields};
use crate::errors::FlowError;

/// Naming style offered before username generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Epic,
    Strict,
    Funky,
    Minimal,
    Cringe,
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::Epic,
        Style::Strict,
        Style::Funky,
        Style::Minimal,
        Style::Cringe,
    ];

    /// Stable key used in callback data and the session
    pub fn key(self) -> &'static str {
        match self {
            Style::Epic => "epic",
            Style::Strict => "strict",
            Style::Funky => "funky",
            Style::Minimal => "minimal",
            Style::Cringe => "cringe",
        }
    }

    pub fn from_key(key: &str) -> Option<Style> {
        Style::ALL.into_iter().find(|style| style.key() == key)
    }

    /// Name used inside prompts
    pub fn display_name(self) -> &'static str {
        match self {
            Style::Epic => "эпичный",
            Style::Strict => "строгий",
            Style::Funky => "фанк",
            Style::Minimal => "минимализм",
            Style::Cringe => "кринж",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Style::Epic => "мощные, звучные, внушительные username, которые вызывают ощущение силы и значимости",
            Style::Strict => "строгие, лаконичные, солидные username, которые выглядят профессионально",
            Style::Funky => "игривые, необычные, креативные username с элементами юмора",
            Style::Minimal => "простые, элегантные, короткие username, которые выглядят стильно",
            Style::Cringe => "абсурдные, нелепые, запоминающиеся username, которые могут выглядеть смешно или странно",
        }
    }
}

/// What a prompt is built for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptTarget {
    Usernames { count: usize },
    Stage(ProjectStage),
    Profile,
}

impl PromptTarget {
    /// Session fields the prompt cannot be built without
    pub fn required_fields(self) -> &'static [Field] {
        match self {
            PromptTarget::Usernames { .. } => &[Field::Context],
            PromptTarget::Stage(ProjectStage::Problem) => &[Field::Username],
            PromptTarget::Stage(ProjectStage::Audience) => &[Field::Username, Field::Stage1Choice],
            PromptTarget::Stage(ProjectStage::Shape) => {
                &[Field::Username, Field::Stage1Choice, Field::Stage2Choice]
            }
            PromptTarget::Profile => &[
                Field::Username,
                Field::Stage1Choice,
                Field::Stage2Choice,
                Field::Stage3Choice,
            ],
        }
    }
}

/// Build the prompt for `target` from the accumulated session fields.
///
/// Fails with [`FlowError::MissingField`] naming the first absent required field.
pub fn build_prompt(target: PromptTarget, fields: &SessionFields) -> Result<String, FlowError> {
    for field in target.required_fields() {
        fields.require(*field)?;
    }

    let prompt = match target {
        PromptTarget::Usernames { count } => usernames_prompt(count, fields),
        PromptTarget::Stage(stage) => stage_prompt(stage, fields),
        PromptTarget::Profile => profile_prompt(fields),
    };
    Ok(prompt)
}

fn value(fields: &SessionFields, field: Field) -> &str {
    fields.get(field).unwrap_or_default()
}

fn usernames_prompt(count: usize, fields: &SessionFields) -> String {
    let context = value(fields, Field::Context);
    let style_clause = fields
        .get(Field::Style)
        .and_then(Style::from_key)
        .map(|style| {
            format!(
                ", учитывая стиль «{}» ({})",
                style.display_name(),
                style.description()
            )
        })
        .unwrap_or_default();

    format!(
        "Создай {count} уникальных и разнообразных username для Telegram по теме «{context}»{style_clause}.\n\
         Только если тема явно указывает на бота, добавь 'bot' или '_bot'.\n\
         Используй только латинские буквы, цифры и нижнее подчёркивание (не в начале и не в конце).\n\
         Длина username: от 5 до 32 символов.\n\
         Сначала укажи только одну категорию темы (например, «бизнес»), затем на следующей строке список username через запятую."
    )
}

fn stage_prompt(stage: ProjectStage, fields: &SessionFields) -> String {
    let username = value(fields, Field::Username);

    let (task, subject) = match stage {
        ProjectStage::Problem => {
            let context_clause = fields
                .get(Field::Context)
                .map(|context| format!(" для идеи «{context}»"))
                .unwrap_or_default();
            (
                format!(
                    "Пользователь выбрал username @{username}{context_clause}.\n\
                     Проанализируй @{username} с точки зрения смысла, ассоциаций и контекстов.\n\
                     Предложи 3 варианта формата проекта: чем он может быть и какую задачу решать."
                ),
                format!("выбору @{username}"),
            )
        }
        ProjectStage::Audience => {
            let format_choice = value(fields, Field::Stage1Choice);
            (
                format!(
                    "Пользователь выбрал имя @{username} и формат «{format_choice}».\n\
                     Предложи 3 варианта того, в каком направлении может развиваться проект. Кто будет этим пользоваться?"
                ),
                "выбранному формату (назови только сам формат)".to_string(),
            )
        }
        ProjectStage::Shape => {
            let format_choice = value(fields, Field::Stage1Choice);
            let audience_choice = value(fields, Field::Stage2Choice);
            (
                format!(
                    "Пользователь выбрал имя @{username}.\n\
                     Формат проекта: «{format_choice}». Направление и аудитория: «{audience_choice}».\n\
                     Предложи 3 варианта сути и ценности проекта."
                ),
                "выбранному направлению (назови только само направление)".to_string(),
            )
        }
    };

    format!("{task}\n\n{}", answer_shape(&subject))
}

fn answer_shape(subject: &str) -> String {
    format!(
        "Ответ верни строго по этому шаблону (без лишнего текста):\n\n\
         Комментарий: [краткий комментарий к {subject} и короткий вопрос-подводка к вариантам, 1-2 предложения]\n\n\
         1. [Пиктограмма] [Краткое определение]: [1-2 предложения, поясняющие вариант]\n\
         2. [Пиктограмма] [Краткое определение]: [1-2 предложения, поясняющие вариант]\n\
         3. [Пиктограмма] [Краткое определение]: [1-2 предложения, поясняющие вариант]\n\n\
         Не более 12-15 слов на комментарий и на каждый из вариантов."
    )
}

fn profile_prompt(fields: &SessionFields) -> String {
    let context_line = fields
        .get(Field::Context)
        .map(|context| format!("Исходная идея: «{context}».\n"))
        .unwrap_or_default();

    format!(
        "{context_line}Username проекта: @{}.\n\
         Формат: «{}».\n\
         Направление и аудитория: «{}».\n\
         Суть и ценность: «{}».\n\n\
         Собери итоговую карточку проекта строго по шаблону (без лишнего текста):\n\n\
         Слоган: [одна короткая фраза]\n\
         Описание: [2-3 предложения о проекте]\n\
         Примеры:\n\
         1. [Пиктограмма] [Идея первой публикации]: [одно предложение]\n\
         2. [Пиктограмма] [Идея второй публикации]: [одно предложение]\n\
         3. [Пиктограмма] [Идея третьей публикации]: [одно предложение]",
        value(fields, Field::Username),
        value(fields, Field::Stage1Choice),
        value(fields, Field::Stage2Choice),
        value(fields, Field::Stage3Choice),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(Field, &str)]) -> SessionFields {
        let mut fields = SessionFields::default();
        for (field, value) in pairs {
            fields.set(*field, *value);
        }
        fields
    }

    #[test]
    fn test_style_keys_round_trip() {
        for style in Style::ALL {
            assert_eq!(Style::from_key(style.key()), Some(style));
        }
        assert_eq!(Style::from_key("baroque"), None);
    }

    #[test]
    fn test_usernames_prompt_requires_context() {
        let result = build_prompt(PromptTarget::Usernames { count: 10 }, &SessionFields::default());
        assert_eq!(result, Err(FlowError::MissingField(Field::Context)));
    }

    #[test]
    fn test_usernames_prompt_with_style() {
        let prompt = build_prompt(
            PromptTarget::Usernames { count: 10 },
            &fields(&[(Field::Context, "кофейня"), (Field::Style, "funky")]),
        )
        .unwrap();

        assert!(prompt.contains("Создай 10 уникальных"));
        assert!(prompt.contains("«кофейня»"));
        assert!(prompt.contains("«фанк»"));
    }

    #[test]
    fn test_usernames_prompt_without_style() {
        let prompt = build_prompt(
            PromptTarget::Usernames { count: 7 },
            &fields(&[(Field::Context, "кофейня")]),
        )
        .unwrap();
        assert!(!prompt.contains("учитывая стиль"));
    }

    #[test]
    fn test_stage_prompts_embed_prior_choices() {
        let all = fields(&[
            (Field::Username, "coffee_spot"),
            (Field::Stage1Choice, "Клуб: встречи"),
            (Field::Stage2Choice, "Студенты: недорого"),
        ]);

        let audience = build_prompt(PromptTarget::Stage(ProjectStage::Audience), &all).unwrap();
        assert!(audience.contains("@coffee_spot"));
        assert!(audience.contains("«Клуб: встречи»"));
        assert!(audience.contains("Комментарий:"));

        let shape = build_prompt(PromptTarget::Stage(ProjectStage::Shape), &all).unwrap();
        assert!(shape.contains("«Студенты: недорого»"));
    }

    #[test]
    fn test_missing_field_is_reported_in_order() {
        let partial = fields(&[(Field::Username, "coffee_spot")]);
        assert_eq!(
            build_prompt(PromptTarget::Stage(ProjectStage::Shape), &partial),
            Err(FlowError::MissingField(Field::Stage1Choice))
        );
        assert_eq!(
            build_prompt(PromptTarget::Profile, &partial),
            Err(FlowError::MissingField(Field::Stage1Choice))
        );
        assert!(build_prompt(PromptTarget::Stage(ProjectStage::Problem), &partial).is_ok());
    }
}

//! Conversation session state for the project-creation dialogue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::errors::FlowError;
use crate::response_parser::ChoiceOption;

/// The three option-choosing stages that follow the username choice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStage {
    /// What the project is and which problem it solves
    Problem,
    /// Who it is for
    Audience,
    /// Its core value and shape
    Shape,
}

impl ProjectStage {
    pub const ALL: [ProjectStage; 3] = [
        ProjectStage::Problem,
        ProjectStage::Audience,
        ProjectStage::Shape,
    ];

    /// 1-based stage number shown to the user
    pub fn number(self) -> u8 {
        match self {
            ProjectStage::Problem => 1,
            ProjectStage::Audience => 2,
            ProjectStage::Shape => 3,
        }
    }

    pub fn next(self) -> Option<ProjectStage> {
        match self {
            ProjectStage::Problem => Some(ProjectStage::Audience),
            ProjectStage::Audience => Some(ProjectStage::Shape),
            ProjectStage::Shape => None,
        }
    }

    /// Session field that receives the choice made in this stage
    pub fn choice_field(self) -> Field {
        match self {
            ProjectStage::Problem => Field::Stage1Choice,
            ProjectStage::Audience => Field::Stage2Choice,
            ProjectStage::Shape => Field::Stage3Choice,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProjectStage::Problem => "problem",
            ProjectStage::Audience => "audience",
            ProjectStage::Shape => "shape",
        }
    }
}

impl fmt::Display for ProjectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage{} ({})", self.number(), self.name())
    }
}

/// Where a conversation currently is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Idle,
    AwaitingContext,
    AwaitingStyle,
    AwaitingUsernameChoice,
    Project(ProjectStage),
    ProjectReady,
}

/// Named values accumulated over a conversation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Context,
    Style,
    Category,
    Username,
    Stage1Choice,
    Stage2Choice,
    Stage3Choice,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Context => "context",
            Field::Style => "style",
            Field::Category => "category",
            Field::Username => "username",
            Field::Stage1Choice => "stage1_choice",
            Field::Stage2Choice => "stage2_choice",
            Field::Stage3Choice => "stage3_choice",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to value mapping carried by a session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFields(BTreeMap<Field, String>);

impl SessionFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Value of a field that a later step depends on
    pub fn require(&self, field: Field) -> Result<&str, FlowError> {
        self.get(field).ok_or(FlowError::MissingField(field))
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Per-user conversation session stored by the dialogue storage
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub stage: Stage,
    pub fields: SessionFields,
    /// Options offered by the current project stage
    pub options: Vec<ChoiceOption>,
    /// Usernames offered in the username stage
    pub usernames: Vec<String>,
    pub language_code: Option<String>,
}

impl ConversationSession {
    pub fn new(language_code: Option<String>) -> Self {
        Self {
            language_code,
            ..Self::default()
        }
    }

    /// Back to [`Stage::Idle`] with every field dropped; the language stays.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.fields.clear();
        self.options.clear();
        self.usernames.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }
}

/// Type alias for the project dialogue
pub type BrandDialogue = Dialogue<ConversationSession, InMemStorage<ConversationSession>>;

/// Validates the free-text topic a user submits at the start of the flow
pub fn validate_context(context: &str, max_length: usize) -> Result<String, &'static str> {
    let trimmed = context.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.chars().count() > max_length {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

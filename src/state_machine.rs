//! # Conversation State Machine
//!
//! Drives a session through context, style, username and the three project
//! stages. Every operation mutates the session it is given and returns a
//! [`Presentation`] for the transport layer to render, or a [`FlowError`].
//!
//! Collaborators (LLM, persistence, availability checks) are injected so the
//! whole flow runs against scripted doubles in tests.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::FlowSettings;
use crate::db::{ChoiceSink, PersistedChoice, NONE_MARKER, STATUS_COMPLETED, STATUS_SELECTED};
use crate::dialogue::{validate_context, ConversationSession, Field, ProjectStage, Stage};
use crate::errors::FlowError;
use crate::llm::{complete_or_empty, LlmClient};
use crate::prompt_builder::{build_prompt, PromptTarget, Style};
use crate::response_parser::{
    parse_profile_response, parse_response, ChoiceOption, ParsedResponse, ProfileResponse,
};
use crate::username::{UsernameAvailability, UsernameGenerator, UsernameRequest};

/// What the user should see after an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// Ask for the free-text topic
    ContextPrompt,
    /// Offer the style choice for the accepted context
    StyleMenu { context: String },
    /// Offer the collected usernames
    Usernames {
        usernames: Vec<String>,
        context: String,
        style: Option<Style>,
        elapsed: Duration,
    },
    /// Offer the options of a project stage
    StageOptions {
        stage: ProjectStage,
        parsed: ParsedResponse,
    },
    /// The finished project
    ProjectReady(ProjectProfile),
}

/// Summary of a completed project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectProfile {
    pub username: String,
    pub context: Option<String>,
    pub problem: String,
    pub audience: String,
    pub shape: String,
    /// LLM-written tagline, description and examples, when generation succeeded
    pub summary: Option<ProfileResponse>,
}

/// Validate a user-supplied index against an option list.
///
/// Negative and out-of-range indices are rejected. A list holding only the
/// placeholder option still accepts index 0.
pub fn validate_selection<T>(options: &[T], index: i64) -> Result<usize, FlowError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < options.len())
        .ok_or_else(|| {
            FlowError::InvalidSelection(format!(
                "index {index} is outside 0..{}",
                options.len()
            ))
        })
}

/// The multi-stage conversation flow
pub struct ConversationStateMachine {
    llm: Arc<dyn LlmClient>,
    sink: Arc<dyn ChoiceSink>,
    usernames: UsernameGenerator,
    settings: FlowSettings,
}

impl ConversationStateMachine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        sink: Arc<dyn ChoiceSink>,
        availability: Arc<dyn UsernameAvailability>,
        settings: FlowSettings,
    ) -> Self {
        let usernames = UsernameGenerator::new(
            llm.clone(),
            availability,
            sink.clone(),
            settings.username_model.clone(),
            settings.limits.clone(),
        );

        Self {
            llm,
            sink,
            usernames,
            settings,
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Start a new project: clear the session and ask for the topic
    pub fn begin(&self, session: &mut ConversationSession) -> Presentation {
        session.reset();
        session.stage = Stage::AwaitingContext;
        debug!("Session entered AwaitingContext");
        Presentation::ContextPrompt
    }

    /// Back to the main menu
    pub fn reset(&self, session: &mut ConversationSession) {
        session.reset();
        debug!("Session reset to Idle");
    }

    /// Accept the free-text topic
    pub fn submit_context(
        &self,
        session: &mut ConversationSession,
        text: &str,
    ) -> Result<Presentation, FlowError> {
        if session.stage != Stage::AwaitingContext {
            return Err(FlowError::UnexpectedState);
        }

        let context = validate_context(text, self.settings.max_context_length)
            .map_err(FlowError::InvalidContext)?;

        info!(context_len = context.chars().count(), "Context accepted");
        session.fields.set(Field::Context, context.clone());
        session.stage = Stage::AwaitingStyle;
        Ok(Presentation::StyleMenu { context })
    }

    /// Accept a random topic from the configured ideas
    pub fn suggest_context<R: Rng + ?Sized>(
        &self,
        session: &mut ConversationSession,
        rng: &mut R,
    ) -> Result<Presentation, FlowError> {
        if session.stage != Stage::AwaitingContext {
            return Err(FlowError::UnexpectedState);
        }
        if self.settings.ideas.is_empty() {
            return Err(FlowError::Generation {
                step: "idea".to_string(),
            });
        }

        let index = rng.gen_range(0..self.settings.ideas.len());
        let idea = self.settings.ideas[index].clone();
        self.submit_context(session, &idea)
    }

    /// Store the style (or none) and generate usernames
    pub async fn choose_style(
        &self,
        session: &mut ConversationSession,
        style: Option<Style>,
    ) -> Result<Presentation, FlowError> {
        if session.stage != Stage::AwaitingStyle {
            return Err(FlowError::UnexpectedState);
        }

        match style {
            Some(style) => session.fields.set(Field::Style, style.key()),
            None => {
                session.fields.remove(Field::Style);
            }
        }

        self.generate_usernames(session).await
    }

    /// Pick one of the offered usernames and enter the first project stage
    pub async fn select_username(
        &self,
        session: &mut ConversationSession,
        index: i64,
    ) -> Result<Presentation, FlowError> {
        if session.stage != Stage::AwaitingUsernameChoice {
            return Err(FlowError::UnexpectedState);
        }

        let index = validate_selection(&session.usernames, index)?;
        let username = session.usernames[index].clone();
        info!(username = %username, "Username selected");

        session.fields.set(Field::Username, username.clone());
        self.sink
            .record(self.persisted(session, username, STATUS_SELECTED, &self.settings.username_model.model))
            .await;

        self.enter_stage(session, ProjectStage::Problem).await
    }

    /// Pick one of the current stage's options and move on
    pub async fn select_option(
        &self,
        session: &mut ConversationSession,
        index: i64,
    ) -> Result<Presentation, FlowError> {
        let Stage::Project(stage) = session.stage else {
            return Err(FlowError::UnexpectedState);
        };

        let index = validate_selection(&session.options, index)?;
        let option = &session.options[index];
        if option.placeholder {
            warn!(stage = %stage, "Placeholder option selected");
            return Err(FlowError::Generation {
                step: stage.name().to_string(),
            });
        }

        let choice = option.plain();
        info!(stage = %stage, choice = %choice, "Option selected");
        session.fields.set(stage.choice_field(), choice);

        match stage.next() {
            Some(next) => self.enter_stage(session, next).await,
            None => self.complete_project(session).await,
        }
    }

    /// Regenerate the active step, keeping every earlier choice
    pub async fn repeat(&self, session: &mut ConversationSession) -> Result<Presentation, FlowError> {
        match session.stage {
            Stage::AwaitingUsernameChoice => self.generate_usernames(session).await,
            Stage::Project(stage) => {
                debug!(stage = %stage, "Repeating stage generation");
                self.enter_stage(session, stage).await
            }
            _ => Err(FlowError::UnexpectedState),
        }
    }

    /// Build a prompt; a missing field sends the session back to the menu
    fn prompt_or_reset(
        &self,
        session: &mut ConversationSession,
        target: PromptTarget,
    ) -> Result<String, FlowError> {
        build_prompt(target, &session.fields).map_err(|e| {
            warn!(error = %e, "Session lost a required field, resetting");
            session.reset();
            e
        })
    }

    async fn generate_usernames(
        &self,
        session: &mut ConversationSession,
    ) -> Result<Presentation, FlowError> {
        let prompt = self.prompt_or_reset(
            session,
            PromptTarget::Usernames {
                count: self.settings.limits.generated_count,
            },
        )?;

        let context = session.fields.get(Field::Context).unwrap_or_default().to_string();
        let style_key = session.fields.get(Field::Style).map(str::to_string);
        let request = UsernameRequest {
            prompt,
            context: context.clone(),
            style: style_key.clone(),
        };

        session.usernames.clear();
        match self.usernames.generate(&request).await {
            Ok(batch) => {
                if !batch.category.is_empty() {
                    session.fields.set(Field::Category, batch.category.clone());
                }
                session.usernames = batch.usernames.clone();
                session.stage = Stage::AwaitingUsernameChoice;

                Ok(Presentation::Usernames {
                    usernames: batch.usernames,
                    context,
                    style: style_key.as_deref().and_then(Style::from_key),
                    elapsed: batch.elapsed,
                })
            }
            Err(e) => {
                error!(error = %e, "Username generation failed");
                if e.resets_session() {
                    session.reset();
                }
                Err(e)
            }
        }
    }

    async fn enter_stage(
        &self,
        session: &mut ConversationSession,
        stage: ProjectStage,
    ) -> Result<Presentation, FlowError> {
        let prompt = self.prompt_or_reset(session, PromptTarget::Stage(stage))?;

        session.stage = Stage::Project(stage);
        session.options.clear();

        let request = self.settings.brand_model.request(prompt);
        let raw = complete_or_empty(self.llm.as_ref(), &request).await;
        debug!(stage = %stage, response_len = raw.len(), "Stage response received");

        let parsed = parse_response(&raw);
        if parsed.is_failed() {
            error!(stage = %stage, "Stage generation produced no usable options");
            session.options = vec![ChoiceOption::placeholder()];
            return Err(FlowError::Generation {
                step: stage.name().to_string(),
            });
        }

        info!(stage = %stage, options = parsed.options.len(), "Stage options generated");
        session.options = parsed.options.clone();
        Ok(Presentation::StageOptions { stage, parsed })
    }

    async fn complete_project(
        &self,
        session: &mut ConversationSession,
    ) -> Result<Presentation, FlowError> {
        let prompt = self.prompt_or_reset(session, PromptTarget::Profile)?;

        let request = self.settings.brand_model.request(prompt);
        let raw = complete_or_empty(self.llm.as_ref(), &request).await;
        let summary = parse_profile_response(&raw);
        let summary = if summary.is_empty() {
            warn!("Profile summary generation failed, finishing without it");
            None
        } else {
            Some(summary)
        };

        let fields = &session.fields;
        let profile = ProjectProfile {
            username: fields.get(Field::Username).unwrap_or_default().to_string(),
            context: fields.get(Field::Context).map(str::to_string),
            problem: fields.get(Field::Stage1Choice).unwrap_or_default().to_string(),
            audience: fields.get(Field::Stage2Choice).unwrap_or_default().to_string(),
            shape: fields.get(Field::Stage3Choice).unwrap_or_default().to_string(),
            summary,
        };

        self.sink
            .record(self.persisted(
                session,
                profile.username.clone(),
                STATUS_COMPLETED,
                &self.settings.brand_model.model,
            ))
            .await;

        session.options.clear();
        session.stage = Stage::ProjectReady;
        info!(username = %profile.username, "Project completed");
        Ok(Presentation::ProjectReady(profile))
    }

    fn persisted(
        &self,
        session: &ConversationSession,
        value: String,
        status: &str,
        model: &str,
    ) -> PersistedChoice {
        let fields = &session.fields;
        PersistedChoice {
            value,
            status: status.to_string(),
            context: fields.get(Field::Context).unwrap_or_default().to_string(),
            category: fields.get(Field::Category).unwrap_or_default().to_string(),
            style: fields.get(Field::Style).unwrap_or(NONE_MARKER).to_string(),
            source_model: model.to_string(),
        }
    }
}

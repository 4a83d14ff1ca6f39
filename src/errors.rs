//! # Flow Error Types Module
//!
//! Error taxonomy of the conversation flow. Each variant maps to a localized
//! message key and says whether the session must be started over.

use std::time::Duration;
use thiserror::Error;

use crate::dialogue::Field;

/// Errors reported by conversation flow operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The LLM call or its parsing yielded nothing usable for a step
    #[error("generation failed at {step}")]
    Generation { step: String },
    /// Username generation hit one of its ceilings with no result
    #[error("username generation gave up after {attempts} attempts in {elapsed:?}")]
    GenerationExhausted { attempts: u32, elapsed: Duration },
    /// A field a step depends on is absent from the session
    #[error("required session field `{0}` is missing")]
    MissingField(Field),
    /// Malformed or out-of-range index
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    /// Rejected context text ("empty" or "too_long")
    #[error("invalid context: {0}")]
    InvalidContext(&'static str),
    /// The action does not belong to the current stage
    #[error("action is not available in the current stage")]
    UnexpectedState,
}

impl FlowError {
    /// Localization key of the user-facing message
    pub fn message_key(&self) -> &'static str {
        match self {
            FlowError::Generation { .. } => "error-generation",
            FlowError::GenerationExhausted { .. } => "error-generation-exhausted",
            FlowError::MissingField(_) => "error-session-lost",
            FlowError::InvalidSelection(_) => "error-invalid-selection",
            FlowError::InvalidContext("too_long") => "context-too-long",
            FlowError::InvalidContext(_) => "context-empty",
            FlowError::UnexpectedState => "error-unknown-state",
        }
    }

    /// Whether the session has been sent back to the main menu
    pub fn resets_session(&self) -> bool {
        matches!(
            self,
            FlowError::MissingField(_) | FlowError::GenerationExhausted { .. }
        )
    }

    /// Whether a repeat of the same step can help
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Generation { .. })
    }
}

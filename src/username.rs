//! # Username Module
//!
//! Username candidates for the project: parsing the "category line + list"
//! answers of the LLM, Telegram username syntax rules, and the bounded
//! generation loop that collects available names.

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{GenerationLimits, ModelSettings};
use crate::db::{
    ChoiceSink, PersistedChoice, NONE_MARKER, STATUS_AVAILABLE, STATUS_TAKEN, STATUS_UNKNOWN,
};
use crate::errors::FlowError;
use crate::llm::{complete_or_empty, LlmClient};
use crate::response_parser::strip_markup;

pub const MIN_USERNAME_LENGTH: usize = 5;
pub const MAX_USERNAME_LENGTH: usize = 32;

lazy_static! {
    static ref USERNAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]{3,30}[A-Za-z0-9]$").expect("Username pattern should be valid");
    static ref CATEGORY_LABEL: Regex =
        Regex::new(r"(?i)^(?:категория|category|тема)\s*[:：\-–—]\s*").expect("Category label pattern should be valid");
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:\d{1,2}[.)]|[•·●▪◦‣\-–—*+])\s*")
        .expect("List marker pattern should be valid");
}

/// A parsed username answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsernameResponse {
    pub category: String,
    pub usernames: Vec<String>,
}

/// `true` for names Telegram accepts: 5-32 latin letters, digits or
/// underscores, starting with a letter and not ending with an underscore.
///
/// ```rust
/// use brand_bot::username::is_valid_username;
///
/// assert!(is_valid_username("coffee_spot"));
/// assert!(!is_valid_username("1coffee"));
/// assert!(!is_valid_username("cafe_"));
/// ```
pub fn is_valid_username(name: &str) -> bool {
    USERNAME_PATTERN.is_match(name)
}

/// Strip list markers, markup, quotes and the `@` prefix from a candidate
/// and validate it.
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed = LIST_MARKER.replace(raw.trim(), "");
    let candidate = trimmed
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '*' | '`' | '"' | '\'' | '«' | '»' | '.' | '!' | '(' | ')')
        })
        .trim_start_matches('@');

    if is_valid_username(candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// Parse an answer whose first line names a category and whose following
/// lines list usernames separated by commas.
///
/// When the first line already looks like a list of usernames there is no
/// category. Invalid and duplicate (case-insensitive) names are dropped.
pub fn parse_username_response(response: &str) -> UsernameResponse {
    let mut parsed = UsernameResponse::default();
    let mut seen = HashSet::new();

    let mut lines = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    if let Some(first) = lines.peek() {
        let candidates: Vec<&str> = split_candidates(first).collect();
        let looks_like_list = !CATEGORY_LABEL.is_match(&strip_markup(first))
            && (normalize_username(first).is_some()
                || (!candidates.is_empty()
                    && candidates.iter().all(|c| normalize_username(c).is_some())));
        if !looks_like_list {
            let category = strip_markup(first);
            parsed.category = CATEGORY_LABEL
                .replace(&category, "")
                .trim()
                .trim_end_matches('.')
                .to_string();
            lines.next();
        }
    }

    for line in lines {
        for raw in split_candidates(line) {
            match normalize_username(raw) {
                Some(name) => {
                    if seen.insert(name.to_lowercase()) {
                        parsed.usernames.push(name);
                    }
                }
                None => debug!("Dropping invalid username candidate '{}'", raw),
            }
        }
    }

    debug!(
        "Parsed username response: category='{}', usernames={}",
        parsed.category,
        parsed.usernames.len()
    );
    parsed
}

fn split_candidates(line: &str) -> impl Iterator<Item = &str> {
    line.split([',', ';'])
        .flat_map(str::split_whitespace)
        .filter(|token| !token.is_empty())
}

/// Outcome of one availability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
    Unknown,
}

impl Availability {
    /// Status string persisted for a checked candidate
    pub fn as_status(self) -> &'static str {
        match self {
            Availability::Available => STATUS_AVAILABLE,
            Availability::Taken => STATUS_TAKEN,
            Availability::Unknown => STATUS_UNKNOWN,
        }
    }
}

/// Checks whether a username is free on the messaging platform
#[async_trait]
pub trait UsernameAvailability: Send + Sync {
    async fn check(&self, username: &str) -> Availability;
}

/// Inputs of one username generation
#[derive(Debug, Clone, PartialEq)]
pub struct UsernameRequest {
    pub prompt: String,
    pub context: String,
    /// Style key, if one was chosen
    pub style: Option<String>,
}

/// Available usernames collected by a generation
#[derive(Debug, Clone, PartialEq)]
pub struct UsernameBatch {
    pub usernames: Vec<String>,
    pub category: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Bounded loop asking the LLM for names until enough available ones are found
pub struct UsernameGenerator {
    llm: Arc<dyn LlmClient>,
    availability: Arc<dyn UsernameAvailability>,
    sink: Arc<dyn ChoiceSink>,
    model: ModelSettings,
    limits: GenerationLimits,
}

impl UsernameGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        availability: Arc<dyn UsernameAvailability>,
        sink: Arc<dyn ChoiceSink>,
        model: ModelSettings,
        limits: GenerationLimits,
    ) -> Self {
        Self {
            llm,
            availability,
            sink,
            model,
            limits,
        }
    }

    /// Collect up to `available_count` available usernames.
    ///
    /// Stops at the attempt ceiling, the wall-clock deadline, or after
    /// `max_empty_responses` answers without a valid name. Returns
    /// [`FlowError::GenerationExhausted`] when nothing was found.
    pub async fn generate(&self, request: &UsernameRequest) -> Result<UsernameBatch, FlowError> {
        let started = Instant::now();
        let deadline = started + self.limits.timeout;
        let completion = self.model.request(request.prompt.clone());

        let mut found: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut category = String::new();
        let mut attempts = 0u32;
        let mut empty_responses = 0u32;

        'attempts: while found.len() < self.limits.available_count
            && attempts < self.limits.attempts
        {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("Username generation deadline reached after {} attempts", attempts);
                break;
            }
            attempts += 1;

            let text = match tokio::time::timeout(
                remaining,
                complete_or_empty(self.llm.as_ref(), &completion),
            )
            .await
            {
                Ok(text) => text,
                Err(_) => {
                    warn!("Username generation timed out during attempt {}", attempts);
                    break;
                }
            };

            let parsed = parse_username_response(&text);
            if parsed.usernames.is_empty() {
                empty_responses += 1;
                warn!(
                    "Attempt {} produced no usable usernames ({}/{} empty answers)",
                    attempts, empty_responses, self.limits.max_empty_responses
                );
                if empty_responses >= self.limits.max_empty_responses {
                    break;
                }
                continue;
            }
            if category.is_empty() {
                category = parsed.category.clone();
            }

            for name in parsed.usernames {
                if found.len() >= self.limits.available_count {
                    break 'attempts;
                }
                if !seen.insert(name.to_lowercase()) {
                    continue;
                }

                let remaining = deadline.saturating_duration_since(Instant::now());
                let availability =
                    match tokio::time::timeout(remaining, self.availability.check(&name)).await {
                        Ok(availability) => availability,
                        Err(_) => {
                            warn!("Username generation timed out while checking '{}'", name);
                            break 'attempts;
                        }
                    };

                self.sink
                    .record(PersistedChoice {
                        value: name.clone(),
                        status: availability.as_status().to_string(),
                        context: request.context.clone(),
                        category: category.clone(),
                        style: request
                            .style
                            .clone()
                            .unwrap_or_else(|| NONE_MARKER.to_string()),
                        source_model: self.model.model.clone(),
                    })
                    .await;

                debug!("Username '{}' checked: {}", name, availability.as_status());
                if availability == Availability::Available {
                    found.push(name);
                }

                if !self.limits.request_interval.is_zero() {
                    tokio::time::sleep(self.limits.request_interval).await;
                }
            }
        }

        let elapsed = started.elapsed();
        if found.is_empty() {
            warn!(
                "Username generation exhausted: attempts={}, elapsed={:?}",
                attempts, elapsed
            );
            return Err(FlowError::GenerationExhausted { attempts, elapsed });
        }

        info!(
            "Username generation collected {} names in {} attempts ({:?})",
            found.len(),
            attempts,
            elapsed
        );
        Ok(UsernameBatch {
            usernames: found,
            category,
            attempts,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_syntax() {
        assert!(is_valid_username("coffee_spot"));
        assert!(is_valid_username("Brew5"));
        assert!(is_valid_username(&format!("a{}", "b".repeat(31))));

        assert!(!is_valid_username("abcd"));
        assert!(!is_valid_username(&format!("a{}", "b".repeat(32))));
        assert!(!is_valid_username("_coffee"));
        assert!(!is_valid_username("coffee_"));
        assert!(!is_valid_username("кофейня"));
        assert!(!is_valid_username("coffee-spot"));
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("@coffee_spot"), Some("coffee_spot".to_string()));
        assert_eq!(normalize_username("1. coffee_spot."), Some("coffee_spot".to_string()));
        assert_eq!(normalize_username("`brew_time`"), Some("brew_time".to_string()));
        assert_eq!(normalize_username("- «latte_art»"), Some("latte_art".to_string()));
        assert_eq!(normalize_username("no"), None);
    }

    #[test]
    fn test_parse_category_and_list() {
        let parsed = parse_username_response("Категория: бизнес\ncoffee_spot, brew_time, @latte_art");
        assert_eq!(parsed.category, "бизнес");
        assert_eq!(parsed.usernames, vec!["coffee_spot", "brew_time", "latte_art"]);
    }

    #[test]
    fn test_parse_without_category() {
        let parsed = parse_username_response("coffee_spot, brew_time\nlatte_art");
        assert!(parsed.category.is_empty());
        assert_eq!(parsed.usernames.len(), 3);
    }

    #[test]
    fn test_single_name_first_line_is_not_a_category() {
        let parsed = parse_username_response("coffee_spot\nbrew_time");
        assert!(parsed.category.is_empty());
        assert_eq!(parsed.usernames, vec!["coffee_spot", "brew_time"]);

        let parsed = parse_username_response("1. @garden_club\n2. green_hands");
        assert!(parsed.category.is_empty());
        assert_eq!(parsed.usernames, vec!["garden_club", "green_hands"]);

        let parsed = parse_username_response("Category: coffee_spot\nbrew_time");
        assert_eq!(parsed.category, "coffee_spot");
        assert_eq!(parsed.usernames, vec!["brew_time"]);
    }

    #[test]
    fn test_parse_drops_invalid_and_duplicates() {
        let parsed = parse_username_response("еда\ncoffee_spot, Coffee_Spot, 1bad, ok, brew_time_");
        assert_eq!(parsed.category, "еда");
        assert_eq!(parsed.usernames, vec!["coffee_spot"]);
    }

    #[test]
    fn test_parse_numbered_lines() {
        let parsed = parse_username_response("**хобби**\n1. garden_club\n2. green_hands");
        assert_eq!(parsed.category, "хобби");
        assert_eq!(parsed.usernames, vec!["garden_club", "green_hands"]);
    }

    #[test]
    fn test_availability_status() {
        assert_eq!(Availability::Available.as_status(), "available");
        assert_eq!(Availability::Taken.as_status(), "taken");
        assert_eq!(Availability::Unknown.as_status(), "unknown");
    }
}

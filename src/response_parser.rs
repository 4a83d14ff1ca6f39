//! # Response Parser Module
//!
//! This module turns the free-text answers of the LLM into structured option
//! lists that the conversation flow can render as buttons.
//!
//! ## Features
//!
//! - Lead comment extraction (`Комментарий: ...`) with a first-line fallback
//! - Option detection for numbered (`1.`, `2)`) and bulleted (`•`, `-`) lines
//! - Markup stripping (bold, italics, code, square brackets, simple HTML tags)
//! - An ordered list of split strategies for the label / detail pair
//! - A placeholder option when a non-empty answer yields no options
//! - The two-field profile shape (tagline + description) used by the final stage

use lazy_static::lazy_static;
use log::{debug, trace, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Button label of the synthetic option returned when nothing could be parsed
pub const PLACEHOLDER_SHORT: &str = "⚠️ Ошибка генерации";
/// Detail text of the synthetic option returned when nothing could be parsed
pub const PLACEHOLDER_DETAIL: &str = "Ошибка в генерации вариантов. Попробуйте снова.";
/// Detail used when an option line carries a label only
pub const NO_DESCRIPTION: &str = "без описания";

const COLON_SEPARATORS: [char; 2] = [':', '：'];
const OTHER_SEPARATORS: [char; 7] = ['—', '–', '-', '|', '/', '>', '→'];

lazy_static! {
    static ref COMMENT_LABEL: Regex =
        Regex::new(r"(?i)^(?:комментарий|comment|ответ\s+ai|ответ)\s*[:：\-–—]\s*(.*)$")
            .expect("Comment label pattern should be valid");
    static ref ORDINAL_MARKER: Regex =
        Regex::new(r"^\d{1,2}[.)](?:\s+(.+)|([^\d\s].*))$")
            .expect("Ordinal marker pattern should be valid");
    // Round glyphs may touch the text; ASCII dashes and stars need a space.
    static ref BULLET_MARKER: Regex = Regex::new(r"^(?:[•·●▪◦‣∙]\s*|[\-–—*+]\s+)(.+)$")
        .expect("Bullet marker pattern should be valid");
    static ref RAW_MARKER: Regex =
        Regex::new(r"^(?:\*\*|__)?\s*(?:\d{1,2}[.)]|[•·●▪◦‣∙\-–—*+])(?:\*\*|__)?\s*(.*)$")
            .expect("Raw marker pattern should be valid");
    static ref BOLD_LABEL: Regex =
        Regex::new(r"^(?:(\S+)\s+)?(?:\*\*|__|<b>)(.+?)(?:\*\*|__|</b>)\s*[:：]?\s*(.*)$")
            .expect("Bold label pattern should be valid");
    static ref HTML_TAG: Regex = Regex::new(r"(?i)</?(?:b|i|u|s|em|strong|code)>")
        .expect("HTML tag pattern should be valid");
    static ref EMPHASIS_STAR: Regex =
        Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("Emphasis pattern should be valid");
    static ref EMPHASIS_UNDERSCORE: Regex =
        Regex::new(r"(^|\s)_([^_\s](?:[^_]*[^_\s])?)_(\s|$|[.,!?:;])")
            .expect("Emphasis pattern should be valid");
    static ref TAGLINE_LABEL: Regex =
        Regex::new(r"(?i)^(?:слоган|tagline)\s*[:：\-–—]\s*(.*)$")
            .expect("Tagline label pattern should be valid");
    static ref DESCRIPTION_LABEL: Regex =
        Regex::new(r"(?i)^(?:описание|description)\s*[:：\-–—]\s*(.*)$")
            .expect("Description label pattern should be valid");
    static ref EXAMPLES_HEADER: Regex =
        Regex::new(r"(?i)^(?:примеры|examples|варианты)\s*[:：]?\s*$")
            .expect("Examples header pattern should be valid");
}

/// One selectable option produced by the LLM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Button label, pictogram first when the model supplied one (e.g. "🔥 Огонь")
    pub short: String,
    /// HTML detail line (e.g. "<b>Огонь</b>: горячая тема")
    pub full: String,
    /// Plain label without the pictogram
    pub label: String,
    /// Plain elaboration text
    pub detail: String,
    /// Set on the synthetic option returned for unparseable answers
    #[serde(default)]
    pub placeholder: bool,
}

impl ChoiceOption {
    /// Build an option from its parts.
    ///
    /// ```rust
    /// use brand_bot::response_parser::ChoiceOption;
    ///
    /// let option = ChoiceOption::new(Some("🔥"), "Огонь", "горячая тема");
    /// assert_eq!(option.short, "🔥 Огонь");
    /// assert_eq!(option.full, "<b>Огонь</b>: горячая тема");
    /// ```
    pub fn new(pictogram: Option<&str>, label: &str, detail: &str) -> Self {
        let short = match pictogram {
            Some(pictogram) => format!("{pictogram} {label}"),
            None => label.to_string(),
        };

        Self {
            short,
            full: format!("<b>{}</b>: {}", escape_html(label), escape_html(detail)),
            label: label.to_string(),
            detail: detail.to_string(),
            placeholder: false,
        }
    }

    /// The synthetic option shown when generation produced nothing usable
    pub fn placeholder() -> Self {
        Self {
            short: PLACEHOLDER_SHORT.to_string(),
            full: escape_html(PLACEHOLDER_DETAIL),
            label: PLACEHOLDER_SHORT.to_string(),
            detail: PLACEHOLDER_DETAIL.to_string(),
            placeholder: true,
        }
    }

    /// Plain-text form embedded into later prompts
    pub fn plain(&self) -> String {
        format!("{}: {}", self.label, self.detail)
    }
}

/// Structured form of a stage answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub lead_comment: String,
    pub options: Vec<ChoiceOption>,
}

impl ParsedResponse {
    /// `true` when the answer cannot be offered to the user as a real choice
    pub fn is_failed(&self) -> bool {
        self.options.is_empty() || self.options.iter().any(|option| option.placeholder)
    }
}

/// Structured form of the final profile answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub tagline: String,
    pub description: String,
    pub examples: Vec<ChoiceOption>,
}

impl ProfileResponse {
    pub fn is_empty(&self) -> bool {
        self.tagline.is_empty() && self.description.is_empty() && self.examples.is_empty()
    }
}

/// Strategies used to split an option line into its label and detail,
/// tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Colon, then the first other separator outside hyphenated words
    Separator,
    /// `🔥 **Label** detail` with an optional colon
    BoldLabel,
    /// First word is the label, the rest is the detail
    FirstToken,
}

/// Fallback order applied by [`parse_option_line`]
pub const SPLIT_STRATEGIES: [SplitStrategy; 3] = [
    SplitStrategy::Separator,
    SplitStrategy::BoldLabel,
    SplitStrategy::FirstToken,
];

impl SplitStrategy {
    /// Apply the strategy to an option body.
    ///
    /// `raw` is the body with its markup intact, `clean` the same body after
    /// [`strip_markup`]. Returns the label segment (pictogram included) and the
    /// detail, or `None` when the strategy does not apply.
    pub fn apply(self, raw: &str, clean: &str) -> Option<(String, String)> {
        match self {
            SplitStrategy::Separator => split_on_separator(clean),
            SplitStrategy::BoldLabel => split_bold_label(raw),
            SplitStrategy::FirstToken => split_first_token(clean),
        }
    }
}

/// Parse a stage answer into a lead comment and an ordered option list.
///
/// # Examples
///
/// ```rust
/// use brand_bot::response_parser::parse_response;
///
/// let parsed = parse_response("Комментарий: Привет\n1. 🔥 Огонь: горячая тема");
/// assert_eq!(parsed.lead_comment, "Привет");
/// assert_eq!(parsed.options[0].short, "🔥 Огонь");
/// ```
pub fn parse_response(response: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();

    if response.trim().is_empty() {
        warn!("Empty LLM response passed to the parser");
        return parsed;
    }

    let mut labelled_comment: Option<String> = None;
    let mut awaiting_comment_text = false;
    let mut fallback_comment: Option<String> = None;

    for (line_number, raw_line) in response.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let clean = strip_markup(line);
        if clean.is_empty() {
            continue;
        }
        trace!("Processing line {}: '{}'", line_number, clean);

        if labelled_comment.is_none() {
            if let Some(captures) = COMMENT_LABEL.captures(&clean) {
                let text = captures[1].trim();
                if text.is_empty() {
                    awaiting_comment_text = true;
                } else {
                    labelled_comment = Some(text.to_string());
                }
                continue;
            }
        }

        if let Some(option) = parse_option_line(line) {
            debug!("Option {} found at line {}: '{}'", parsed.options.len(), line_number, option.short);
            parsed.options.push(option);
            continue;
        }

        if awaiting_comment_text && labelled_comment.is_none() {
            labelled_comment = Some(clean);
            awaiting_comment_text = false;
            continue;
        }

        if fallback_comment.is_none() {
            fallback_comment = Some(clean);
        }
    }

    parsed.lead_comment = labelled_comment.or(fallback_comment).unwrap_or_default();

    if parsed.options.is_empty() {
        warn!("No options recovered from LLM response, returning placeholder");
        parsed.options.push(ChoiceOption::placeholder());
    }

    debug!(
        "Parsed response: comment_len={}, options={}",
        parsed.lead_comment.len(),
        parsed.options.len()
    );
    parsed
}

/// Parse a single line as an option.
///
/// Returns `None` when the line has no ordinal or bullet marker.
///
/// ```rust
/// use brand_bot::response_parser::parse_option_line;
///
/// let option = parse_option_line("2. 💧 Вода: спокойная тема").unwrap();
/// assert_eq!(option.short, "💧 Вода");
/// assert!(parse_option_line("Просто текст").is_none());
/// ```
pub fn parse_option_line(line: &str) -> Option<ChoiceOption> {
    let line = line.trim();
    let clean = strip_markup(line);

    let body = ORDINAL_MARKER
        .captures(&clean)
        .or_else(|| BULLET_MARKER.captures(&clean))
        .and_then(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|body| body.as_str().trim().to_string())?;
    if body.is_empty() {
        return None;
    }

    let raw_body = RAW_MARKER
        .captures(line)
        .map(|captures| captures[1].trim().to_string())
        .unwrap_or_else(|| body.clone());

    for strategy in SPLIT_STRATEGIES {
        if let Some((label_segment, detail)) = strategy.apply(&raw_body, &body) {
            let (pictogram, label) = split_label(&label_segment);
            if label.is_empty() {
                continue;
            }
            trace!("Strategy {:?} split '{}' into '{}' / '{}'", strategy, body, label, detail);
            let detail = if detail.is_empty() {
                NO_DESCRIPTION.to_string()
            } else {
                detail
            };
            return Some(ChoiceOption::new(pictogram.as_deref(), &label, &detail));
        }
    }

    None
}

/// Parse the final profile answer (tagline, description and an example list).
///
/// Labelled lines (`Слоган:`, `Описание:`) fill their fields; without labels
/// the first two plain lines are used. Option lines become examples.
pub fn parse_profile_response(response: &str) -> ProfileResponse {
    let mut profile = ProfileResponse::default();

    if response.trim().is_empty() {
        warn!("Empty LLM profile response passed to the parser");
        return profile;
    }

    let mut tagline: Option<String> = None;
    let mut description: Option<String> = None;
    let mut unlabelled: Vec<String> = Vec::new();

    for raw_line in response.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let clean = strip_markup(line);
        if clean.is_empty() || EXAMPLES_HEADER.is_match(&clean) {
            continue;
        }

        if tagline.is_none() {
            if let Some(captures) = TAGLINE_LABEL.captures(&clean) {
                tagline = Some(captures[1].trim().to_string());
                continue;
            }
        }
        if description.is_none() {
            if let Some(captures) = DESCRIPTION_LABEL.captures(&clean) {
                description = Some(captures[1].trim().to_string());
                continue;
            }
        }

        if let Some(option) = parse_option_line(line) {
            profile.examples.push(option);
            continue;
        }

        unlabelled.push(clean);
    }

    let mut leftovers = unlabelled.into_iter();
    profile.tagline = match tagline {
        Some(text) if !text.is_empty() => text,
        _ => leftovers.next().unwrap_or_default(),
    };
    profile.description = match description {
        Some(text) if !text.is_empty() => text,
        _ => leftovers.next().unwrap_or_default(),
    };

    debug!(
        "Parsed profile: tagline_len={}, description_len={}, examples={}",
        profile.tagline.len(),
        profile.description.len(),
        profile.examples.len()
    );
    profile
}

/// Remove formatting markup from a line while keeping punctuation, emoji and
/// the text inside brackets.
///
/// ```rust
/// use brand_bot::response_parser::strip_markup;
///
/// assert_eq!(strip_markup("**Комментарий:** [краткий] `текст`"), "Комментарий: краткий текст");
/// ```
pub fn strip_markup(line: &str) -> String {
    let without_tags = HTML_TAG.replace_all(line, "");
    let without_pairs = without_tags
        .replace("**", "")
        .replace("__", "")
        .replace("~~", "")
        .replace('`', "");
    let without_stars = EMPHASIS_STAR.replace_all(&without_pairs, "$1");
    let without_underscores = EMPHASIS_UNDERSCORE.replace_all(&without_stars, "$1$2$3");

    without_underscores
        .chars()
        .filter(|c| *c != '[' && *c != ']')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Escape the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A token made only of symbols (emoji, pictograms)
fn is_pictogram(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_alphanumeric)
}

/// Split a label segment into an optional leading pictogram and the text label
fn split_label(segment: &str) -> (Option<String>, String) {
    let segment = segment.trim();
    match split_token(segment) {
        Some((first, rest)) if is_pictogram(first) && !rest.is_empty() => {
            (Some(first.to_string()), rest.to_string())
        }
        _ => (None, segment.to_string()),
    }
}

/// First whitespace-delimited token and the trimmed remainder
fn split_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(index) => Some((&text[..index], text[index..].trim_start())),
        None => Some((text, "")),
    }
}

fn split_on_separator(text: &str) -> Option<(String, String)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let qualifies = |position: usize| -> bool {
        let before = position
            .checked_sub(1)
            .and_then(|i| chars.get(i))
            .map(|(_, c)| *c);
        let after = chars.get(position + 1).map(|(_, c)| *c);

        // Separators inside words ("онлайн-школа", "24/7", "10:30") do not split.
        let embedded = matches!(before, Some(c) if !c.is_whitespace())
            && matches!(after, Some(c) if !c.is_whitespace());
        if embedded {
            return false;
        }

        let label = text[..chars[position].0].trim();
        !label.is_empty() && !is_pictogram(label)
    };

    let colon = chars
        .iter()
        .enumerate()
        .find(|(position, (_, c))| COLON_SEPARATORS.contains(c) && qualifies(*position));
    let found = colon.or_else(|| {
        chars
            .iter()
            .enumerate()
            .find(|(position, (_, c))| OTHER_SEPARATORS.contains(c) && qualifies(*position))
    });

    let (_, (byte_index, separator)) = found?;
    let label = text[..*byte_index].trim();
    let rest = &text[byte_index + separator.len_utf8()..];
    // "->" and "—>" arrows
    let rest = match *separator {
        '-' | '–' | '—' => rest.strip_prefix('>').unwrap_or(rest),
        _ => rest,
    };
    let detail = rest.trim();

    Some((label.to_string(), detail.to_string()))
}

fn split_bold_label(raw: &str) -> Option<(String, String)> {
    let captures = BOLD_LABEL.captures(raw)?;
    let label = strip_markup(captures.get(2).map_or("", |m| m.as_str()));
    if label.is_empty() {
        return None;
    }

    let label_segment = match captures.get(1).map(|m| strip_markup(m.as_str())) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix} {label}"),
        _ => label,
    };
    let detail = strip_markup(captures.get(3).map_or("", |m| m.as_str()));

    Some((label_segment, detail))
}

fn split_first_token(text: &str) -> Option<(String, String)> {
    let (first, rest) = split_token(text)?;

    if is_pictogram(first) {
        if let Some((label, detail)) = split_token(rest) {
            return Some((format!("{first} {label}"), detail.to_string()));
        }
    }

    Some((first.to_string(), rest.to_string()))
}

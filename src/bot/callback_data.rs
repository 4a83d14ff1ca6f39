//! Callback data tokens carried by inline keyboard buttons

use std::fmt;

use crate::errors::FlowError;
use crate::prompt_builder::Style;

/// Action requested by an inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    MainMenu,
    Help,
    CreateProject,
    SuggestIdea,
    StyleMenu,
    StyleBack,
    NoStyle,
    Style(Style),
    Username(i64),
    Option(i64),
    Repeat,
}

impl CallbackData {
    /// Parse the token stored in a button.
    ///
    /// A known prefix with a malformed index yields
    /// [`FlowError::InvalidSelection`]; anything else unknown yields
    /// [`FlowError::UnexpectedState`].
    pub fn parse(data: &str) -> Result<Self, FlowError> {
        let (prefix, argument) = match data.split_once(':') {
            Some((prefix, argument)) => (prefix, Some(argument)),
            None => (data, None),
        };

        match (prefix, argument) {
            ("start", None) => Ok(CallbackData::MainMenu),
            ("help", None) => Ok(CallbackData::Help),
            ("create", None) => Ok(CallbackData::CreateProject),
            ("idea", None) => Ok(CallbackData::SuggestIdea),
            ("choose_style", None) => Ok(CallbackData::StyleMenu),
            ("back_style", None) => Ok(CallbackData::StyleBack),
            ("no_style", None) => Ok(CallbackData::NoStyle),
            ("repeat", None) => Ok(CallbackData::Repeat),
            ("style", Some(key)) => Style::from_key(key)
                .map(CallbackData::Style)
                .ok_or_else(|| FlowError::InvalidSelection(format!("unknown style '{key}'"))),
            ("user", Some(index)) => parse_index(index).map(CallbackData::Username),
            ("opt", Some(index)) => parse_index(index).map(CallbackData::Option),
            _ => Err(FlowError::UnexpectedState),
        }
    }
}

fn parse_index(raw: &str) -> Result<i64, FlowError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FlowError::InvalidSelection(format!("'{raw}' is not an index")))
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackData::MainMenu => f.write_str("start"),
            CallbackData::Help => f.write_str("help"),
            CallbackData::CreateProject => f.write_str("create"),
            CallbackData::SuggestIdea => f.write_str("idea"),
            CallbackData::StyleMenu => f.write_str("choose_style"),
            CallbackData::StyleBack => f.write_str("back_style"),
            CallbackData::NoStyle => f.write_str("no_style"),
            CallbackData::Repeat => f.write_str("repeat"),
            CallbackData::Style(style) => write!(f, "style:{}", style.key()),
            CallbackData::Username(index) => write!(f, "user:{index}"),
            CallbackData::Option(index) => write!(f, "opt:{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_parse_back() {
        let actions = [
            CallbackData::MainMenu,
            CallbackData::CreateProject,
            CallbackData::StyleBack,
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
    fn test_malformed_index() {
        assert!(matches!(
            CallbackData::parse("opt:abc"),
            Err(FlowError::InvalidSelection(_))
        ));
        assert_eq!(CallbackData::parse("opt:-1"), Ok(CallbackData::Option(-1)));
    }

    #[test]
    fn test_unknown_tokens() {
        assert_eq!(CallbackData::parse("confirm"), Err(FlowError::UnexpectedState));
        assert_eq!(CallbackData::parse("start:1"), Err(FlowError::UnexpectedState));
        assert!(matches!(
            CallbackData::parse("style:baroque"),
            Err(FlowError::InvalidSelection(_))
        ));
    }
}

// hidremap Config - Combo String Parser
// Parses combo strings like "Shift_L-Ctrl_L-A" into flags and a key

use std::str::FromStr;

use crate::key::{consumer_key_from_name, key_from_name};
use crate::{ConsumerKeyCode, Flags, KeyCode, ModifierFlag, PointingButton};

/// Prefix that turns a subset flag match into an exact one
const EXACT_PREFIX: &str = "EXACT";

/// Result of parsing a combo string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCombo<K> {
    /// Modifier flags, with `Flags::EXACT` when the combo starts with `Exact-`
    pub flags: Flags,
    /// The last component
    pub key: K,
}

/// Errors that can occur during combo parsing
#[derive(Debug, Clone, PartialEq)]
pub enum ComboParseError {
    /// Empty input string
    EmptyInput,
    /// Key name not recognized
    UnknownKey(String),
    /// Modifier name not recognized
    UnknownModifier(String),
    /// Input ends with hyphen (e.g., "Ctrl-")
    TrailingHyphen,
}

impl std::fmt::Display for ComboParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComboParseError::EmptyInput => write!(f, "combo string cannot be empty"),
            ComboParseError::UnknownKey(name) => write!(f, "unknown key name: '{}'", name),
            ComboParseError::UnknownModifier(name) => write!(f, "unknown modifier: '{}'", name),
            ComboParseError::TrailingHyphen => write!(f, "combo string cannot end with hyphen"),
        }
    }
}

impl std::error::Error for ComboParseError {}

/// Parse a key combo like "Shift_L-A" or "Exact-Ctrl_L-Space"
///
/// # Examples
/// ```
/// use hidremap_core::config::parse_combo_string;
/// use hidremap_core::{Flags, KeyCode};
/// let parsed = parse_combo_string("Shift_L-A").unwrap();
/// assert_eq!(parsed.flags, Flags::SHIFT_L);
/// assert_eq!(parsed.key, KeyCode(30));
/// ```
pub fn parse_combo_string(exp: &str) -> Result<ParsedCombo<KeyCode>, ComboParseError> {
    parse_combo_with(exp, key_from_name)
}

/// Parse a consumer key combo like "Fn-VolumeUp"
pub fn parse_consumer_combo(exp: &str) -> Result<ParsedCombo<ConsumerKeyCode>, ComboParseError> {
    parse_combo_with(exp, consumer_key_from_name)
}

/// Parse a pointer button combo like "Ctrl_L-Left"
pub fn parse_button_combo(exp: &str) -> Result<ParsedCombo<PointingButton>, ComboParseError> {
    parse_combo_with(exp, |name| PointingButton::from_str(name).ok())
}

/// Parse a bare modifier list like "Shift_L-Ctrl_L" (empty string = no flags)
pub fn parse_flags(exp: &str) -> Result<Flags, ComboParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Ok(Flags::empty());
    }
    if trimmed.ends_with('-') {
        return Err(ComboParseError::TrailingHyphen);
    }
    trimmed
        .split('-')
        .try_fold(Flags::empty(), |acc, part| Ok(acc | parse_modifier(part)?))
}

fn parse_combo_with<K>(
    exp: &str,
    resolve: impl Fn(&str) -> Option<K>,
) -> Result<ParsedCombo<K>, ComboParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Err(ComboParseError::EmptyInput);
    }
    if trimmed.ends_with('-') {
        return Err(ComboParseError::TrailingHyphen);
    }

    let (modifiers, key_str) = match trimmed.rsplit_once('-') {
        Some((modifiers, key)) => (Some(modifiers), key),
        None => (None, trimmed),
    };
    let key = resolve(key_str).ok_or_else(|| ComboParseError::UnknownKey(key_str.to_string()))?;

    let mut flags = Flags::empty();
    for part in modifiers.into_iter().flat_map(|m| m.split('-')) {
        flags |= parse_modifier(part)?;
    }

    Ok(ParsedCombo { flags, key })
}

fn parse_modifier(part: &str) -> Result<Flags, ComboParseError> {
    let part = part.trim();
    if part.eq_ignore_ascii_case(EXACT_PREFIX) {
        return Ok(Flags::EXACT);
    }
    ModifierFlag::from_str(part)
        .map(ModifierFlag::flag)
        .map_err(|_| ComboParseError::UnknownModifier(part.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_key() {
        let parsed = parse_combo_string("a").unwrap();
        assert_eq!(parsed.flags, Flags::empty());
        assert_eq!(parsed.key, KeyCode(30));
    }

    #[test]
    fn test_parse_multiple_modifiers() {
        let parsed = parse_combo_string("Shift_L-Ctrl_L-A").unwrap();
        assert_eq!(parsed.flags, Flags::SHIFT_L | Flags::CONTROL_L);
        assert_eq!(parsed.key, KeyCode(30));
    }

    #[test]
    fn test_parse_exact_prefix() {
        let parsed = parse_combo_string("Exact-Shift_L-Space").unwrap();
        assert_eq!(parsed.flags, Flags::EXACT | Flags::SHIFT_L);
        assert_eq!(parsed.key, KeyCode(57));
    }

    #[test]
    fn test_parse_modifier_key() {
        let parsed = parse_combo_string("Ctrl_L").unwrap();
        assert_eq!(parsed.flags, Flags::empty());
        assert_eq!(parsed.key, KeyCode(29));
    }

    #[test]
    fn test_parse_consumer_and_button() {
        let parsed = parse_consumer_combo("Fn-VolumeUp").unwrap();
        assert_eq!(parsed.flags, Flags::FN);
        assert_eq!(parsed.key, ConsumerKeyCode(115));

        let parsed = parse_button_combo("Meta_L-Middle").unwrap();
        assert_eq!(parsed.flags, Flags::META_L);
        assert_eq!(parsed.key, PointingButton::MIDDLE);
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_flags(""), Ok(Flags::empty()));
        assert_eq!(parse_flags("Shift_L-Alt_R"), Ok(Flags::SHIFT_L | Flags::ALT_R));
        assert!(parse_flags("Shift_L-").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_combo_string(""), Err(ComboParseError::EmptyInput));
        assert_eq!(parse_combo_string("Ctrl-"), Err(ComboParseError::TrailingHyphen));
        assert_eq!(
            parse_combo_string("Hyper-A"),
            Err(ComboParseError::UnknownModifier("Hyper".to_string()))
        );
        assert_eq!(
            parse_combo_string("Shift_L-Nope"),
            Err(ComboParseError::UnknownKey("Nope".to_string()))
        );
    }
}

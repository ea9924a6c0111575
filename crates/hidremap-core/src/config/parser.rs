// hidremap Config Parser - TOML with Serde
// Parses rules, timing parameters and device policy from TOML files

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strum_macros::{Display, EnumString};

use super::combo_parser::{
    parse_button_combo, parse_combo_string, parse_consumer_combo, parse_flags, ComboParseError,
    ParsedCombo,
};
use crate::remap::Parameters;
use crate::{ConsumerKeyCode, Flags, KeyCode, PointingButton};

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("Invalid combo string: {0}")]
    InvalidCombo(String),

    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },
}

impl From<ComboParseError> for ConfigError {
    fn from(e: ComboParseError) -> Self {
        match e {
            ComboParseError::UnknownKey(name) => ConfigError::InvalidKey(name),
            ComboParseError::UnknownModifier(name) => ConfigError::InvalidModifier(name),
            other => ConfigError::InvalidCombo(other.to_string()),
        }
    }
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// Global remap toggles
    #[serde(default)]
    pub general: Option<GeneralConfig>,

    /// Synthetic key repeat timing
    #[serde(default)]
    pub repeat: Option<RepeatConfig>,

    /// Per-translator timing
    #[serde(default)]
    pub parameters: Option<ParametersConfig>,

    /// Ordered rule chain
    #[serde(default)]
    pub rules: Vec<RuleToml>,

    /// Device selection
    #[serde(default)]
    pub devices: Option<DevicesConfig>,
}

/// Global toggles deciding which keyboards are remapped at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub dont_remap_internal: bool,
    #[serde(default)]
    pub dont_remap_external: bool,
    #[serde(default)]
    pub dont_remap_thirdvendor_keyboard: bool,
    /// Keyboard type stamped on every translated key event instead of the
    /// one the device reported
    #[serde(default)]
    pub keyboard_type: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatConfig {
    /// Delay until the first repeat
    pub initial_wait_ms: Option<u64>,
    /// Interval between repeats
    pub wait_ms: Option<u64>,
    pub consumer_initial_wait_ms: Option<u64>,
    pub consumer_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    pub holding_key_to_key_wait_ms: Option<u64>,
    pub double_press_threshold_ms: Option<u64>,
    pub key_overlaid_modifier_timeout_ms: Option<u64>,
    pub modifier_holding_key_to_key_wait_ms: Option<u64>,
    pub pointing_button_click_max_distance: Option<u32>,
    pub pointing_button_click_timeout_ms: Option<u64>,
}

/// Device filtering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Explicit device names/paths to use
    #[serde(default)]
    pub only: Vec<String>,
    /// Device names treated as internal keyboards
    #[serde(default)]
    pub internal: Vec<String>,
    /// Device names treated as first-party keyboards
    #[serde(default)]
    pub vendor: Vec<String>,
}

/// The translator a rule selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleKind {
    KeyToKey,
    ConsumerToConsumer,
    KeyToConsumer,
    ConsumerToKey,
    PointingButtonToPointingButton,
    KeyToPointingButton,
    PointingButtonToKey,
    PointingRelativeToScroll,
    KeyOverlaidModifier,
    DoublePressModifier,
    ModifierHoldingKeyToKey,
    HoldingKeyToKey,
    IgnoreMultipleSameKeyPress,
}

/// One `[[rules]]` entry.
///
/// Which of the optional fields are required depends on `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleToml {
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Tap key of key_overlaid_modifier, double-press key of double_press_modifier
    pub fire: Option<String>,
    /// Auto-repeat the fire key (key_overlaid_modifier)
    #[serde(default)]
    pub fire_repeat: bool,
    /// Tap substitute of holding_key_to_key
    pub normal: Option<String>,
    /// Hold substitute of holding_key_to_key
    pub holding: Option<String>,
    /// Trigger button of pointing_relative_to_scroll
    pub trigger: Option<String>,
    /// Modifier flags of pointing_relative_to_scroll
    pub flags: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// A fully resolved translator definition
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDef {
    KeyToKey {
        from: ParsedCombo<KeyCode>,
        to: ParsedCombo<KeyCode>,
    },
    ConsumerToConsumer {
        from: ParsedCombo<ConsumerKeyCode>,
        to: ParsedCombo<ConsumerKeyCode>,
    },
    KeyToConsumer {
        from: ParsedCombo<KeyCode>,
        to: ParsedCombo<ConsumerKeyCode>,
    },
    ConsumerToKey {
        from: ParsedCombo<ConsumerKeyCode>,
        to: ParsedCombo<KeyCode>,
    },
    PointingButtonToPointingButton {
        from: ParsedCombo<PointingButton>,
        to: ParsedCombo<PointingButton>,
    },
    KeyToPointingButton {
        from: ParsedCombo<KeyCode>,
        to: PointingButton,
    },
    PointingButtonToKey {
        from: ParsedCombo<PointingButton>,
        to: ParsedCombo<KeyCode>,
    },
    PointingRelativeToScroll {
        trigger: PointingButton,
        flags: Flags,
    },
    KeyOverlaidModifier {
        from: ParsedCombo<KeyCode>,
        to: ParsedCombo<KeyCode>,
        fire: ParsedCombo<KeyCode>,
        fire_repeat: bool,
    },
    DoublePressModifier {
        from: KeyCode,
        to: KeyCode,
        fire: ParsedCombo<KeyCode>,
    },
    ModifierHoldingKeyToKey {
        from: ParsedCombo<KeyCode>,
        to: KeyCode,
    },
    HoldingKeyToKey {
        from: ParsedCombo<KeyCode>,
        normal: ParsedCombo<KeyCode>,
        holding: ParsedCombo<KeyCode>,
    },
    IgnoreMultipleSameKeyPress {
        from: ParsedCombo<KeyCode>,
    },
}

impl RuleDef {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDef::KeyToKey { .. } => RuleKind::KeyToKey,
            RuleDef::ConsumerToConsumer { .. } => RuleKind::ConsumerToConsumer,
            RuleDef::KeyToConsumer { .. } => RuleKind::KeyToConsumer,
            RuleDef::ConsumerToKey { .. } => RuleKind::ConsumerToKey,
            RuleDef::PointingButtonToPointingButton { .. } => {
                RuleKind::PointingButtonToPointingButton
            }
            RuleDef::KeyToPointingButton { .. } => RuleKind::KeyToPointingButton,
            RuleDef::PointingButtonToKey { .. } => RuleKind::PointingButtonToKey,
            RuleDef::PointingRelativeToScroll { .. } => RuleKind::PointingRelativeToScroll,
            RuleDef::KeyOverlaidModifier { .. } => RuleKind::KeyOverlaidModifier,
            RuleDef::DoublePressModifier { .. } => RuleKind::DoublePressModifier,
            RuleDef::ModifierHoldingKeyToKey { .. } => RuleKind::ModifierHoldingKeyToKey,
            RuleDef::HoldingKeyToKey { .. } => RuleKind::HoldingKeyToKey,
            RuleDef::IgnoreMultipleSameKeyPress { .. } => RuleKind::IgnoreMultipleSameKeyPress,
        }
    }
}

/// A named entry of the rule chain
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    pub name: String,
    pub enabled: bool,
    pub def: RuleDef,
}

/// Main configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global remap toggles
    pub general: GeneralConfig,
    /// Timing parameters handed to the engine
    pub parameters: Parameters,
    /// Rules in chain order
    pub rules: Vec<RuleConfig>,
    /// Device name/path filter (empty = autodetect keyboards)
    pub device_filter: Vec<String>,
    /// Device names treated as internal keyboards
    pub internal_devices: Vec<String>,
    /// Device names treated as first-party keyboards
    pub vendor_devices: Vec<String>,
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// Get the default config path (~/.config/hidremap/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hidremap").join("config.toml"))
    }

    /// Rules that take part in the chain
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RuleConfig> {
        self.rules.iter().filter(|r| r.enabled)
    }
}

impl ConfigToml {
    /// Convert parsed TOML to internal Config structure
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(general) = self.general {
            config.general = general;
        }

        let p = &mut config.parameters;
        if let Some(repeat) = &self.repeat {
            override_with(&mut p.repeat_initial_wait_ms, repeat.initial_wait_ms);
            override_with(&mut p.repeat_wait_ms, repeat.wait_ms);
            override_with(&mut p.consumer_repeat_initial_wait_ms, repeat.consumer_initial_wait_ms);
            override_with(&mut p.consumer_repeat_wait_ms, repeat.consumer_wait_ms);
        }
        if let Some(params) = &self.parameters {
            override_with(&mut p.holding_key_to_key_wait_ms, params.holding_key_to_key_wait_ms);
            override_with(&mut p.double_press_threshold_ms, params.double_press_threshold_ms);
            override_with(
                &mut p.key_overlaid_modifier_timeout_ms,
                params.key_overlaid_modifier_timeout_ms,
            );
            override_with(
                &mut p.modifier_holding_key_to_key_wait_ms,
                params.modifier_holding_key_to_key_wait_ms,
            );
            override_with(
                &mut p.pointing_button_click_max_distance,
                params.pointing_button_click_max_distance,
            );
            override_with(
                &mut p.pointing_button_click_timeout_ms,
                params.pointing_button_click_timeout_ms,
            );
        }

        for (index, rule) in self.rules.iter().enumerate() {
            let name = rule
                .name
                .clone()
                .unwrap_or_else(|| format!("{}#{}", rule.kind, index));
            let def = rule.to_def(&name)?;
            log::debug!("Rule '{}' ({}) enabled={}", name, rule.kind, rule.enabled);
            config.rules.push(RuleConfig {
                name,
                enabled: rule.enabled,
                def,
            });
        }

        if let Some(devices) = &self.devices {
            config.device_filter = devices.only.clone();
            config.internal_devices = devices.internal.clone();
            config.vendor_devices = devices.vendor.clone();
        }

        Ok(config)
    }
}

fn override_with<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

impl RuleToml {
    fn to_def(&self, name: &str) -> Result<RuleDef, ConfigError> {
        let def = match self.kind {
            RuleKind::KeyToKey => RuleDef::KeyToKey {
                from: parse_combo_string(self.field(name, "from", &self.from)?)?,
                to: parse_combo_string(self.field(name, "to", &self.to)?)?,
            },
            RuleKind::ConsumerToConsumer => RuleDef::ConsumerToConsumer {
                from: parse_consumer_combo(self.field(name, "from", &self.from)?)?,
                to: parse_consumer_combo(self.field(name, "to", &self.to)?)?,
            },
            RuleKind::KeyToConsumer => RuleDef::KeyToConsumer {
                from: parse_combo_string(self.field(name, "from", &self.from)?)?,
                to: parse_consumer_combo(self.field(name, "to", &self.to)?)?,
            },
            RuleKind::ConsumerToKey => RuleDef::ConsumerToKey {
                from: parse_consumer_combo(self.field(name, "from", &self.from)?)?,
                to: parse_combo_string(self.field(name, "to", &self.to)?)?,
            },
            RuleKind::PointingButtonToPointingButton => RuleDef::PointingButtonToPointingButton {
                from: parse_button_combo(self.field(name, "from", &self.from)?)?,
                to: parse_button_combo(self.field(name, "to", &self.to)?)?,
            },
            RuleKind::KeyToPointingButton => RuleDef::KeyToPointingButton {
                from: parse_combo_string(self.field(name, "from", &self.from)?)?,
                to: parse_button_combo(self.field(name, "to", &self.to)?)?.key,
            },
            RuleKind::PointingButtonToKey => RuleDef::PointingButtonToKey {
                from: parse_button_combo(self.field(name, "from", &self.from)?)?,
                to: parse_combo_string(self.field(name, "to", &self.to)?)?,
            },
            RuleKind::PointingRelativeToScroll => {
                let trigger = match &self.trigger {
                    Some(t) => parse_button_combo(t)?.key,
                    None => PointingButton::NONE,
                };
                let flags = parse_flags(self.flags.as_deref().unwrap_or(""))?;
                if trigger.is_none() && flags.stripped().is_empty() {
                    return Err(invalid(name, "needs a trigger button or modifier flags"));
                }
                RuleDef::PointingRelativeToScroll { trigger, flags }
            }
            RuleKind::KeyOverlaidModifier => RuleDef::KeyOverlaidModifier {
                from: parse_combo_string(self.field(name, "from", &self.from)?)?,
                to: parse_combo_string(self.field(name, "to", &self.to)?)?,
                fire: parse_combo_string(self.field(name, "fire", &self.fire)?)?,
                fire_repeat: self.fire_repeat,
            },
            RuleKind::DoublePressModifier => RuleDef::DoublePressModifier {
                from: plain_key(name, "from", self.field(name, "from", &self.from)?)?,
                to: plain_key(name, "to", self.field(name, "to", &self.to)?)?,
                fire: parse_combo_string(self.field(name, "fire", &self.fire)?)?,
            },
            RuleKind::ModifierHoldingKeyToKey => {
                let from = parse_combo_string(self.field(name, "from", &self.from)?)?;
                if from.flags.stripped().is_empty() {
                    return Err(invalid(name, "needs at least one modifier in 'from'"));
                }
                RuleDef::ModifierHoldingKeyToKey {
                    from,
                    to: plain_key(name, "to", self.field(name, "to", &self.to)?)?,
                }
            }
            RuleKind::HoldingKeyToKey => RuleDef::HoldingKeyToKey {
                from: parse_combo_string(self.field(name, "from", &self.from)?)?,
                normal: parse_combo_string(self.field(name, "normal", &self.normal)?)?,
                holding: parse_combo_string(self.field(name, "holding", &self.holding)?)?,
            },
            RuleKind::IgnoreMultipleSameKeyPress => RuleDef::IgnoreMultipleSameKeyPress {
                from: parse_combo_string(self.field(name, "from", &self.from)?)?,
            },
        };
        Ok(def)
    }

    fn field<'a>(&self, name: &str, field: &str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
        value
            .as_deref()
            .ok_or_else(|| invalid(name, &format!("{} requires '{}'", self.kind, field)))
    }
}

/// A key without modifiers
fn plain_key(name: &str, field: &str, value: &str) -> Result<KeyCode, ConfigError> {
    let parsed = parse_combo_string(value)?;
    if !parsed.flags.is_empty() {
        return Err(invalid(name, &format!("'{}' takes a key without modifiers", field)));
    }
    Ok(parsed.key)
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidRule {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_simple_toml() {
        let toml = r#"
            [general]
            dont_remap_internal = true

            [repeat]
            initial_wait_ms = 400
            wait_ms = 30

            [[rules]]
            name = "caps-to-ctrl"
            type = "key_to_key"
            from = "CapsLock"
            to = "Ctrl_L"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert!(config.general.dont_remap_internal);
        assert!(!config.general.dont_remap_external);
        assert_eq!(config.general.keyboard_type, None);
        assert_eq!(config.parameters.repeat_initial_wait_ms, 400);
        assert_eq!(config.parameters.repeat_wait_ms, 30);
        assert_eq!(config.parameters.holding_key_to_key_wait_ms, 200);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].name, "caps-to-ctrl");
        assert_eq!(
            config.rules[0].def,
            RuleDef::KeyToKey {
                from: ParsedCombo { flags: Flags::empty(), key: KeyCode(58) },
                to: ParsedCombo { flags: Flags::empty(), key: KeyCode(29) },
            }
        );
    }

    #[test]
    fn test_config_every_rule_kind() {
        let toml = r#"
            [[rules]]
            type = "consumer_to_consumer"
            from = "VolumeUp"
            to = "VolumeDown"

            [[rules]]
            type = "key_to_consumer"
            from = "Fn-F12"
            to = "VolumeUp"

            [[rules]]
            type = "consumer_to_key"
            from = "Mute"
            to = "F10"

            [[rules]]
            type = "pointing_button_to_pointing_button"
            from = "Left"
            to = "Right"

            [[rules]]
            type = "key_to_pointing_button"
            from = "Ctrl_R"
            to = "Middle"

            [[rules]]
            type = "pointing_button_to_key"
            from = "Button4"
            to = "Alt_L-Left"

            [[rules]]
            type = "pointing_relative_to_scroll"
            trigger = "Middle"

            [[rules]]
            type = "key_overlaid_modifier"
            from = "Space"
            to = "Shift_L"
            fire = "Space"
            fire_repeat = true

            [[rules]]
            type = "double_press_modifier"
            from = "Shift_L"
            to = "Shift_L"
            fire = "CapsLock"

            [[rules]]
            type = "modifier_holding_key_to_key"
            from = "Meta_L-Space"
            to = "Escape"

            [[rules]]
            type = "holding_key_to_key"
            from = "Escape"
            normal = "Escape"
            holding = "Ctrl_L"

            [[rules]]
            type = "ignore_multiple_same_key_press"
            from = "Katakana"
            enabled = false
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.rules.len(), 12);
        assert_eq!(config.enabled_rules().count(), 11);
        assert_eq!(config.rules[0].name, "consumer_to_consumer#0");
        assert_eq!(config.rules[11].def.kind(), RuleKind::IgnoreMultipleSameKeyPress);
        match &config.rules[6].def {
            RuleDef::PointingRelativeToScroll { trigger, flags } => {
                assert_eq!(*trigger, PointingButton::MIDDLE);
                assert!(flags.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            config.rules[7].def,
            RuleDef::KeyOverlaidModifier { fire_repeat: true, .. }
        ));
    }

    #[test]
    fn test_config_missing_field() {
        let toml = r#"
            [[rules]]
            name = "broken"
            type = "holding_key_to_key"
            from = "Escape"
            normal = "Escape"
        "#;
        match Config::from_toml(toml) {
            Err(ConfigError::InvalidRule { name, reason }) => {
                assert_eq!(name, "broken");
                assert!(reason.contains("holding"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_config_invalid_key() {
        let toml = r#"
            [[rules]]
            type = "key_to_key"
            from = "NotAKey"
            to = "A"
        "#;
        assert!(matches!(Config::from_toml(toml), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn test_config_unknown_field_rejected() {
        let toml = r#"
            [general]
            remap_everything = true
        "#;
        assert!(matches!(Config::from_toml(toml), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_config_devices() {
        let toml = r#"
            [devices]
            only = ["/dev/input/event3"]
            internal = ["AT Translated Set 2 keyboard"]
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.device_filter, vec!["/dev/input/event3".to_string()]);
        assert_eq!(config.internal_devices.len(), 1);
        assert!(config.vendor_devices.is_empty());
    }

    #[test]
    fn test_zero_timing_is_legal() {
        let toml = r#"
            [parameters]
            holding_key_to_key_wait_ms = 0
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.parameters.holding_key_to_key_wait_ms, 0);
    }
}

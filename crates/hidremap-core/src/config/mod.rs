// hidremap Config API
// TOML configuration and combo string parsing

pub mod combo_parser;
pub mod parser;

pub use combo_parser::{
    parse_button_combo, parse_combo_string, parse_consumer_combo, parse_flags, ComboParseError,
    ParsedCombo,
};
pub use parser::{Config, ConfigError, GeneralConfig, RuleConfig, RuleDef, RuleKind};

// hidremap Key Codes
// Physical keys, consumer keys and keyboard type identifiers

use std::fmt;
use std::str::FromStr;

use crate::modifier::{Flags, ModifierFlag};

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

impl KeyCode {
    /// No key. Rules and the repeat queue treat it as "nothing to do".
    pub const NONE: KeyCode = KeyCode(0);

    /// Target used by rules that claim an event without emitting a key.
    pub const PSEUDO: KeyCode = KeyCode(0xffff);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// The modifier flag driven by this key, if it is a modifier key
    pub fn modifier_flag(self) -> Option<ModifierFlag> {
        ModifierFlag::from_key(self)
    }

    /// Check if this key is a modifier key
    pub fn is_modifier(self) -> bool {
        self.modifier_flag().is_some()
    }

    /// The flag bits of this key (empty for non-modifier keys)
    pub fn modifier_flags(self) -> Flags {
        self.modifier_flag()
            .map(ModifierFlag::flag)
            .unwrap_or_else(Flags::empty)
    }
}

impl ConsumerKeyCode {
    pub const NONE: ConsumerKeyCode = ConsumerKeyCode(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Whether holding this key should auto-repeat.
    ///
    /// Level-style keys (volume, brightness, illumination, seeking) repeat;
    /// toggles such as play/pause, mute and eject fire once.
    pub fn is_repeatable(self) -> bool {
        matches!(
            self.0,
            114 | 115 | 168 | 208 | 224 | 225 | 229 | 230
        )
    }

    /// Classify a raw key code as a consumer key
    pub fn from_key_code(code: u16) -> Option<Self> {
        CONSUMER_KEY_NAMES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(_, c)| ConsumerKeyCode(*c))
    }
}

/// Identifies the physical keyboard layout that produced an event.
///
/// Opaque to the engine; it is carried from input to output unchanged
/// unless a rule supplies an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyboardType(pub u32);

impl KeyboardType {
    pub const NONE: KeyboardType = KeyboardType(0);
}

impl From<u32> for KeyboardType {
    fn from(id: u32) -> Self {
        KeyboardType(id)
    }
}

impl fmt::Display for KeyboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kbd#{}", self.0)
    }
}

/// Canonical names first; later entries for the same code are aliases
const KEY_NAMES: &[(&str, u16)] = &[
    ("NONE", 0),
    ("ESC", 1),
    ("1", 2),
    ("2", 3),
    ("3", 4),
    ("4", 5),
    ("5", 6),
    ("6", 7),
    ("7", 8),
    ("8", 9),
    ("9", 10),
    ("0", 11),
    ("MINUS", 12),
    ("EQUAL", 13),
    ("BACKSPACE", 14),
    ("TAB", 15),
    ("Q", 16),
    ("W", 17),
    ("E", 18),
    ("R", 19),
    ("T", 20),
    ("Y", 21),
    ("U", 22),
    ("I", 23),
    ("O", 24),
    ("P", 25),
    ("LEFT_BRACE", 26),
    ("RIGHT_BRACE", 27),
    ("ENTER", 28),
    ("LEFT_CTRL", 29),
    ("A", 30),
    ("S", 31),
    ("D", 32),
    ("F", 33),
    ("G", 34),
    ("H", 35),
    ("J", 36),
    ("K", 37),
    ("L", 38),
    ("SEMICOLON", 39),
    ("APOSTROPHE", 40),
    ("GRAVE", 41),
    ("LEFT_SHIFT", 42),
    ("BACKSLASH", 43),
    ("Z", 44),
    ("X", 45),
    ("C", 46),
    ("V", 47),
    ("B", 48),
    ("N", 49),
    ("M", 50),
    ("COMMA", 51),
    ("DOT", 52),
    ("SLASH", 53),
    ("RIGHT_SHIFT", 54),
    ("KPASTERISK", 55),
    ("LEFT_ALT", 56),
    ("SPACE", 57),
    ("CAPSLOCK", 58),
    ("F1", 59),
    ("F2", 60),
    ("F3", 61),
    ("F4", 62),
    ("F5", 63),
    ("F6", 64),
    ("F7", 65),
    ("F8", 66),
    ("F9", 67),
    ("F10", 68),
    ("NUMLOCK", 69),
    ("SCROLLLOCK", 70),
    ("KP7", 71),
    ("KP8", 72),
    ("KP9", 73),
    ("KPMINUS", 74),
    ("KP4", 75),
    ("KP5", 76),
    ("KP6", 77),
    ("KPPLUS", 78),
    ("KP1", 79),
    ("KP2", 80),
    ("KP3", 81),
    ("KP0", 82),
    ("KPDOT", 83),
    ("ZENKAKUHANKAKU", 85),
    ("KEY_102ND", 86),
    ("F11", 87),
    ("F12", 88),
    ("RO", 89),
    ("KATAKANA", 90),
    ("HIRAGANA", 91),
    ("HENKAN", 92),
    ("KATAKANAHIRAGANA", 93),
    ("MUHENKAN", 94),
    ("KPENTER", 96),
    ("RIGHT_CTRL", 97),
    ("KPSLASH", 98),
    ("SYSRQ", 99),
    ("RIGHT_ALT", 100),
    ("HOME", 102),
    ("UP", 103),
    ("PAGE_UP", 104),
    ("LEFT", 105),
    ("RIGHT", 106),
    ("END", 107),
    ("DOWN", 108),
    ("PAGE_DOWN", 109),
    ("INSERT", 110),
    ("DELETE", 111),
    ("PAUSE", 119),
    ("HANGEUL", 122),
    ("HANJA", 123),
    ("YEN", 124),
    ("LEFT_META", 125),
    ("RIGHT_META", 126),
    ("COMPOSE", 127),
    ("MENU", 139),
    ("F13", 183),
    ("F14", 184),
    ("F15", 185),
    ("F16", 186),
    ("F17", 187),
    ("F18", 188),
    ("F19", 189),
    ("F20", 190),
    ("F21", 191),
    ("F22", 192),
    ("F23", 193),
    ("F24", 194),
    ("FN", 0x1d0),
    // aliases
    ("ESCAPE", 1),
    ("RETURN", 28),
    ("LCTRL", 29),
    ("CONTROL_L", 29),
    ("CTRL_L", 29),
    ("LSHIFT", 42),
    ("SHIFT_L", 42),
    ("RSHIFT", 54),
    ("SHIFT_R", 54),
    ("LALT", 56),
    ("ALT_L", 56),
    ("OPTION_L", 56),
    ("RCTRL", 97),
    ("CONTROL_R", 97),
    ("CTRL_R", 97),
    ("RALT", 100),
    ("ALT_R", 100),
    ("OPTION_R", 100),
    ("LMETA", 125),
    ("META_L", 125),
    ("COMMAND_L", 125),
    ("RMETA", 126),
    ("META_R", 126),
    ("COMMAND_R", 126),
    ("PRINT", 99),
    ("PGUP", 104),
    ("PGDN", 109),
    ("EISU", 94),
    ("KANA", 92),
];

const CONSUMER_KEY_NAMES: &[(&str, u16)] = &[
    ("NONE", 0),
    ("MUTE", 113),
    ("VOLUMEDOWN", 114),
    ("VOLUMEUP", 115),
    ("POWER", 116),
    ("EJECTCD", 161),
    ("NEXTSONG", 163),
    ("PLAYPAUSE", 164),
    ("PREVIOUSSONG", 165),
    ("STOPCD", 166),
    ("REWIND", 168),
    ("FASTFORWARD", 208),
    ("BRIGHTNESSDOWN", 224),
    ("BRIGHTNESSUP", 225),
    ("KBDILLUMTOGGLE", 228),
    ("KBDILLUMDOWN", 229),
    ("KBDILLUMUP", 230),
    // aliases
    ("VOLUME_DOWN", 114),
    ("VOLUME_UP", 115),
    ("EJECT", 161),
    ("MUSIC_NEXT", 163),
    ("MUSIC_PLAY", 164),
    ("MUSIC_PREV", 165),
    ("BRIGHTNESS_DOWN", 224),
    ("BRIGHTNESS_UP", 225),
    ("KEYBOARDLIGHT_LOW", 229),
    ("KEYBOARDLIGHT_HIGH", 230),
];

fn lookup_name(table: &'static [(&'static str, u16)], code: u16) -> &'static str {
    table
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(n, _)| *n)
        .unwrap_or("UNKNOWN")
}

fn lookup_code(table: &[(&str, u16)], name: &str) -> Option<u16> {
    let upper = name.trim().to_uppercase();
    let bare = upper.strip_prefix("KEY_").unwrap_or(&upper);
    table
        .iter()
        .find(|(n, _)| *n == upper || *n == bare)
        .map(|(_, c)| *c)
}

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    if code == KeyCode::PSEUDO.0 {
        return "PSEUDO";
    }
    lookup_name(KEY_NAMES, code)
}

/// Resolve a key name (case-insensitive, optional `KEY_` prefix)
pub fn key_from_name(name: &str) -> Option<KeyCode> {
    lookup_code(KEY_NAMES, name).map(KeyCode)
}

/// Display name for a consumer key code
pub fn consumer_key_name(code: u16) -> &'static str {
    lookup_name(CONSUMER_KEY_NAMES, code)
}

/// Resolve a consumer key name (case-insensitive)
pub fn consumer_key_from_name(name: &str) -> Option<ConsumerKeyCode> {
    lookup_code(CONSUMER_KEY_NAMES, name).map(ConsumerKeyCode)
}

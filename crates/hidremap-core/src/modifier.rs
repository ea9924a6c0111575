// hidremap Modifier Flags
// Modifier flag bitset and the modifier keys that drive each flag

use std::fmt;

use bitflags::bitflags;
use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumIter, EnumString};

use crate::KeyCode;

bitflags! {
    /// Set of modifier flags held at the time of an event.
    ///
    /// `EXACT` is only meaningful inside a match pattern: it turns the
    /// "pattern flags are held" test into "exactly the pattern flags are held".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        const SHIFT_L = 1 << 0;
        const SHIFT_R = 1 << 1;
        const CONTROL_L = 1 << 2;
        const CONTROL_R = 1 << 3;
        const ALT_L = 1 << 4;
        const ALT_R = 1 << 5;
        const META_L = 1 << 6;
        const META_R = 1 << 7;
        const FN = 1 << 8;

        const EXACT = 1 << 31;
    }
}

impl Flags {
    /// Test these held flags against a match pattern
    pub fn is_on(self, pattern: Flags) -> bool {
        let wanted = pattern.stripped();
        let held = self.stripped();
        if pattern.contains(Flags::EXACT) {
            held == wanted
        } else {
            held.contains(wanted)
        }
    }

    /// The flags without the pattern marker
    pub fn stripped(self) -> Flags {
        self.difference(Flags::EXACT)
    }

    /// Iterate over the individual modifiers in this set
    pub fn modifiers(self) -> impl Iterator<Item = ModifierFlag> {
        ModifierFlag::iter().filter(move |m| self.contains(m.flag()))
    }

    /// Build a flag set from individual modifiers
    pub fn from_modifiers(modifiers: impl IntoIterator<Item = ModifierFlag>) -> Flags {
        modifiers
            .into_iter()
            .fold(Flags::empty(), |acc, m| acc | m.flag())
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stripped().is_empty() {
            return write!(f, "0");
        }
        let names: Vec<String> = self.modifiers().map(|m| m.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// One modifier flag and the key that produces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, EnumCount, strum_macros::Display)]
#[strum(ascii_case_insensitive)]
pub enum ModifierFlag {
    #[strum(to_string = "SHIFT_L", serialize = "LShift", serialize = "Shift")]
    ShiftL,
    #[strum(to_string = "SHIFT_R", serialize = "RShift")]
    ShiftR,
    #[strum(to_string = "CONTROL_L", serialize = "LCtrl", serialize = "Ctrl_L", serialize = "Ctrl", serialize = "C")]
    ControlL,
    #[strum(to_string = "CONTROL_R", serialize = "RCtrl", serialize = "Ctrl_R")]
    ControlR,
    #[strum(to_string = "ALT_L", serialize = "LAlt", serialize = "Alt", serialize = "OPTION_L", serialize = "Opt")]
    AltL,
    #[strum(to_string = "ALT_R", serialize = "RAlt", serialize = "OPTION_R")]
    AltR,
    #[strum(to_string = "META_L", serialize = "LMeta", serialize = "Meta", serialize = "COMMAND_L", serialize = "Cmd", serialize = "Super")]
    MetaL,
    #[strum(to_string = "META_R", serialize = "RMeta", serialize = "COMMAND_R", serialize = "RCmd")]
    MetaR,
    #[strum(to_string = "FN", serialize = "Fn")]
    Fn,
}

/// Static table for lock-free modifier key lookup
const MODIFIER_KEYS: &[(ModifierFlag, u16)] = &[
    (ModifierFlag::ShiftL, 42),
    (ModifierFlag::ShiftR, 54),
    (ModifierFlag::ControlL, 29),
    (ModifierFlag::ControlR, 97),
    (ModifierFlag::AltL, 56),
    (ModifierFlag::AltR, 100),
    (ModifierFlag::MetaL, 125),
    (ModifierFlag::MetaR, 126),
    (ModifierFlag::Fn, 0x1d0),
];

impl ModifierFlag {
    /// The flag bit for this modifier
    pub fn flag(self) -> Flags {
        match self {
            ModifierFlag::ShiftL => Flags::SHIFT_L,
            ModifierFlag::ShiftR => Flags::SHIFT_R,
            ModifierFlag::ControlL => Flags::CONTROL_L,
            ModifierFlag::ControlR => Flags::CONTROL_R,
            ModifierFlag::AltL => Flags::ALT_L,
            ModifierFlag::AltR => Flags::ALT_R,
            ModifierFlag::MetaL => Flags::META_L,
            ModifierFlag::MetaR => Flags::META_R,
            ModifierFlag::Fn => Flags::FN,
        }
    }

    /// The key that drives this modifier
    pub fn key(self) -> KeyCode {
        MODIFIER_KEYS
            .iter()
            .find(|(m, _)| *m == self)
            .map(|(_, code)| KeyCode(*code))
            .unwrap_or(KeyCode::NONE)
    }

    /// Get the modifier driven by a key
    pub fn from_key(key: KeyCode) -> Option<ModifierFlag> {
        MODIFIER_KEYS
            .iter()
            .find(|(_, code)| *code == key.code())
            .map(|(m, _)| *m)
    }

    /// Dense index, used by per-modifier counters
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Check if a key code is a modifier using the static table
#[inline]
pub const fn is_key_modifier_code(code: u16) -> bool {
    let mut i = 0;
    while i < MODIFIER_KEYS.len() {
        if MODIFIER_KEYS[i].1 == code {
            return true;
        }
        i += 1;
    }
    false
}

// hidremap Output State
// Pressed keys and last delivered flags/buttons of an output device

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::{Buttons, Flags, KeyCode, PointingButton};

/// A press (`true`) or release (`false`) the sink must synthesise
pub type Transition<T> = (T, bool);

/// Tracks what an output device currently holds down
#[derive(Debug, Clone, Default)]
pub struct PressedKeyState {
    pressed: HashSet<KeyCode>,
    last_flags: Flags,
    last_buttons: Buttons,
}

impl PressedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn remove(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Pressed non-modifier keys first, then modifiers
    pub fn release_order(&self) -> Vec<KeyCode> {
        let mut keys: Vec<KeyCode> = self.pressed.iter().copied().collect();
        keys.sort_by_key(|k| (k.is_modifier(), k.code()));
        keys
    }

    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
        self.last_flags = Flags::empty();
        self.last_buttons = Buttons::empty();
    }

    /// Modifier key presses/releases that move the device to `to` flags.
    ///
    /// Releases come before presses so a swap never shows both at once.
    pub fn update_flags(&mut self, to: Flags) -> SmallVec<[Transition<KeyCode>; 4]> {
        let to = to.stripped();
        let mut out = SmallVec::new();
        for m in self.last_flags.difference(to).modifiers() {
            out.push((m.key(), false));
        }
        for m in to.difference(self.last_flags).modifiers() {
            out.push((m.key(), true));
        }
        self.last_flags = to;
        out
    }

    /// Button presses/releases that move the device to `to` buttons
    pub fn update_buttons(&mut self, to: Buttons) -> SmallVec<[Transition<PointingButton>; 4]> {
        let mut out = SmallVec::new();
        let released = self.last_buttons.difference(to);
        let pressed = to.difference(self.last_buttons);
        for i in 0..u32::BITS as usize {
            let Some(button) = PointingButton::from_index(i) else {
                break;
            };
            if released.contains(button.buttons()) {
                out.push((button, false));
            }
        }
        for i in 0..u32::BITS as usize {
            let Some(button) = PointingButton::from_index(i) else {
                break;
            };
            if pressed.contains(button.buttons()) {
                out.push((button, true));
            }
        }
        self.last_buttons = to;
        out
    }

    pub fn last_flags(&self) -> Flags {
        self.last_flags
    }

    pub fn last_buttons(&self) -> Buttons {
        self.last_buttons
    }
}

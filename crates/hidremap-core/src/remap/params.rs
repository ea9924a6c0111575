// hidremap Remap Parameters
// Per-call parameters handed to translators, and the from-key pairing check

use crate::{ConsumerEvent, Flags, KeyboardEvent, KeyboardType, PointingButton, RelativePointerEvent};

/// One key event on its way through the rule chain
#[derive(Debug, Clone, Copy)]
pub struct RemapParams {
    pub event: KeyboardEvent,
    /// Keyboard type to stamp on emitted events
    pub keyboard_type: KeyboardType,
    remapped: bool,
}

impl RemapParams {
    pub fn new(event: KeyboardEvent) -> Self {
        Self {
            event,
            keyboard_type: event.keyboard_type,
            remapped: false,
        }
    }

    /// Override the keyboard type for this call
    pub fn with_keyboard_type(mut self, keyboard_type: KeyboardType) -> Self {
        self.keyboard_type = keyboard_type;
        self
    }

    pub fn is_key_down(&self) -> bool {
        self.event.is_key_down()
    }

    pub fn is_remapped(&self) -> bool {
        self.remapped
    }

    pub fn set_remapped(&mut self) {
        self.remapped = true;
    }
}

/// One consumer key event on its way through the rule chain
#[derive(Debug, Clone, Copy)]
pub struct RemapConsumerParams {
    pub event: ConsumerEvent,
    remapped: bool,
}

impl RemapConsumerParams {
    pub fn new(event: ConsumerEvent) -> Self {
        Self {
            event,
            remapped: false,
        }
    }

    pub fn is_key_down(&self) -> bool {
        self.event.is_key_down()
    }

    pub fn is_remapped(&self) -> bool {
        self.remapped
    }

    pub fn set_remapped(&mut self) {
        self.remapped = true;
    }
}

/// One pointer change on its way through the rule chain.
///
/// A raw report is split into one call per button edge (with no motion)
/// followed by one motion-only call with `button == NONE`.
#[derive(Debug, Clone, Copy)]
pub struct RemapPointerParams {
    pub event: RelativePointerEvent,
    pub button: PointingButton,
    pub is_button_down: bool,
    remapped: bool,
}

impl RemapPointerParams {
    pub fn button_edge(event: RelativePointerEvent, button: PointingButton, is_button_down: bool) -> Self {
        Self {
            event: RelativePointerEvent { dx: 0, dy: 0, ..event },
            button,
            is_button_down,
            remapped: false,
        }
    }

    pub fn motion(event: RelativePointerEvent) -> Self {
        Self {
            event,
            button: PointingButton::NONE,
            is_button_down: false,
            remapped: false,
        }
    }

    pub fn is_motion(&self) -> bool {
        self.button.is_none()
    }

    pub fn is_remapped(&self) -> bool {
        self.remapped
    }

    pub fn set_remapped(&mut self) {
        self.remapped = true;
    }
}

/// Pairs a release with the press that started a remap.
///
/// A press matches on key and flags; a release matches only if the same
/// checker accepted the press, so no stray release is ever emitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromKeyChecker {
    active: bool,
}

impl FromKeyChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check<K: PartialEq>(
        &mut self,
        is_down: bool,
        key: K,
        current_flags: Flags,
        from_key: K,
        from_flags: Flags,
    ) -> bool {
        if key != from_key {
            return false;
        }
        if is_down {
            if !current_flags.is_on(from_flags) {
                return false;
            }
            self.active = true;
            true
        } else if self.active {
            self.active = false;
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

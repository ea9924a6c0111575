// hidremap Events
// Keyboard, consumer and relative pointer events flowing through the engine

use std::fmt;

use crate::{Buttons, ConsumerKeyCode, EventType, Flags, KeyCode, KeyboardType};

/// A physical key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub event_type: EventType,
    pub flags: Flags,
    pub key: KeyCode,
    pub keyboard_type: KeyboardType,
    pub char_code: u32,
    pub char_set: u32,
    pub orig_char_code: u32,
    pub orig_char_set: u32,
    /// On input: hardware auto-repeat. On output: repeat re-fire.
    pub repeat: bool,
}

impl KeyboardEvent {
    pub fn new(
        event_type: EventType,
        flags: Flags,
        key: KeyCode,
        keyboard_type: KeyboardType,
        repeat: bool,
    ) -> Self {
        Self {
            event_type,
            flags,
            key,
            keyboard_type,
            char_code: 0,
            char_set: 0,
            orig_char_code: 0,
            orig_char_set: 0,
            repeat,
        }
    }

    /// Attach the character information some drivers report with a key
    pub fn with_chars(
        mut self,
        char_code: u32,
        char_set: u32,
        orig_char_code: u32,
        orig_char_set: u32,
    ) -> Self {
        self.char_code = char_code;
        self.char_set = char_set;
        self.orig_char_code = orig_char_code;
        self.orig_char_set = orig_char_set;
        self
    }

    /// DOWN, or a MODIFY whose flags contain the key's own modifier
    pub fn is_key_down(&self) -> bool {
        match self.event_type {
            EventType::Down => true,
            EventType::Up => false,
            EventType::Modify => self.flags.contains(self.key.modifier_flags())
                && !self.key.modifier_flags().is_empty(),
        }
    }

    /// False for repeat re-fires
    pub fn is_first_press(&self) -> bool {
        !self.repeat
    }
}

impl fmt::Display for KeyboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key {} {} flags={}{}",
            self.key,
            self.event_type,
            self.flags,
            if self.repeat { " (repeat)" } else { "" }
        )
    }
}

/// A consumer (media) key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerEvent {
    pub event_type: EventType,
    pub flags: Flags,
    pub key: ConsumerKeyCode,
    pub repeat: bool,
}

impl ConsumerEvent {
    pub fn new(event_type: EventType, flags: Flags, key: ConsumerKeyCode, repeat: bool) -> Self {
        Self {
            event_type,
            flags,
            key,
            repeat,
        }
    }

    pub fn is_key_down(&self) -> bool {
        self.event_type.is_down()
    }

    pub fn is_first_press(&self) -> bool {
        !self.repeat
    }
}

impl fmt::Display for ConsumerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "consumer {} {} flags={}{}",
            self.key,
            self.event_type,
            self.flags,
            if self.repeat { " (repeat)" } else { "" }
        )
    }
}

/// A relative pointer report: full button state plus motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelativePointerEvent {
    pub buttons: Buttons,
    pub dx: i32,
    pub dy: i32,
}

impl RelativePointerEvent {
    pub fn new(buttons: Buttons, dx: i32, dy: i32) -> Self {
        Self { buttons, dx, dy }
    }
}

impl fmt::Display for RelativePointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pointer buttons={:#x} dx={} dy={}",
            self.buttons.bits(),
            self.dx,
            self.dy
        )
    }
}

/// A synthetic scroll wheel event
///
/// `delta_axis*` are whole lines, `fixed_delta*` are 16.16 fixed point
/// lines and `point_delta*` are pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollWheelEvent {
    pub delta_axis1: i32,
    pub delta_axis2: i32,
    pub fixed_delta1: i32,
    pub fixed_delta2: i32,
    pub point_delta1: i32,
    pub point_delta2: i32,
}

impl fmt::Display for ScrollWheelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scroll vertical={} horizontal={}",
            self.delta_axis1, self.delta_axis2
        )
    }
}

/// A raw event delivered by the device hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyboardEvent),
    Consumer(ConsumerEvent),
    RelativePointer(RelativePointerEvent),
    /// Wheel motion from a hooked pointer; never remapped
    ScrollWheel(ScrollWheelEvent),
}

impl From<KeyboardEvent> for InputEvent {
    fn from(event: KeyboardEvent) -> Self {
        InputEvent::Key(event)
    }
}

impl From<ConsumerEvent> for InputEvent {
    fn from(event: ConsumerEvent) -> Self {
        InputEvent::Consumer(event)
    }
}

impl From<RelativePointerEvent> for InputEvent {
    fn from(event: RelativePointerEvent) -> Self {
        InputEvent::RelativePointer(event)
    }
}

impl From<ScrollWheelEvent> for InputEvent {
    fn from(event: ScrollWheelEvent) -> Self {
        InputEvent::ScrollWheel(event)
    }
}

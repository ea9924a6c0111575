// hidremap Device Decoder
// Turns raw evdev (type, code, value) triples into engine input events

use smallvec::SmallVec;

use crate::remap::{POINTING_FIXED_SCALE, POINTING_POINT_SCALE};
use crate::{
    Buttons, ConsumerEvent, ConsumerKeyCode, EventType, Flags, InputEvent, KeyCode, KeyboardEvent,
    KeyboardType, PointingButton, RelativePointerEvent, ScrollWheelEvent,
};

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;

pub const SYN_REPORT: u16 = 0x00;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

/// First mouse button code (BTN_LEFT); the next seven follow in order
pub const BTN_LEFT: u16 = 0x110;
const BTN_MOUSE_COUNT: u16 = 8;

/// Codes between the keyboard and the extended key ranges are buttons of
/// joysticks, tablets and the like
const BTN_MISC: u16 = 0x100;
const KEY_OK: u16 = 0x160;

/// Decoded events of a single raw event
pub type Decoded = SmallVec<[InputEvent; 2]>;

/// Per-device decoder state.
///
/// Key events are delivered as soon as they arrive. Pointer buttons,
/// motion and wheel are collected until the SYN_REPORT that closes the
/// frame, so one frame becomes at most one pointer event and one wheel
/// event.
#[derive(Debug, Clone, Default)]
pub struct InputDecoder {
    keyboard_type: KeyboardType,
    buttons: Buttons,
    dx: i32,
    dy: i32,
    wheel_vertical: i32,
    wheel_horizontal: i32,
    pointer_dirty: bool,
}

impl InputDecoder {
    pub fn new(keyboard_type: KeyboardType) -> Self {
        Self {
            keyboard_type,
            ..Self::default()
        }
    }

    /// Buttons held as of the last decoded frame
    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    pub fn feed(&mut self, ev_type: u16, code: u16, value: i32) -> Decoded {
        let mut out = Decoded::new();
        match ev_type {
            EV_KEY => self.feed_key(code, value, &mut out),
            EV_REL => self.feed_rel(code, value),
            EV_SYN if code == SYN_REPORT => self.flush(&mut out),
            _ => {}
        }
        out
    }

    fn feed_key(&mut self, code: u16, value: i32, out: &mut Decoded) {
        let (event_type, repeat) = match value {
            0 => (EventType::Up, false),
            1 => (EventType::Down, false),
            2 => (EventType::Down, true),
            _ => return,
        };

        if (BTN_LEFT..BTN_LEFT + BTN_MOUSE_COUNT).contains(&code) {
            // Held buttons do not auto-repeat
            if repeat {
                return;
            }
            if let Some(button) = PointingButton::from_index(usize::from(code - BTN_LEFT)) {
                self.buttons.set(button.buttons(), event_type == EventType::Down);
                self.pointer_dirty = true;
            }
            return;
        }

        if let Some(key) = ConsumerKeyCode::from_key_code(code) {
            out.push(ConsumerEvent::new(event_type, Flags::empty(), key, repeat).into());
            return;
        }

        if (BTN_MISC..KEY_OK).contains(&code) {
            return;
        }

        out.push(
            KeyboardEvent::new(event_type, Flags::empty(), KeyCode(code), self.keyboard_type, repeat)
                .into(),
        );
    }

    fn feed_rel(&mut self, code: u16, value: i32) {
        match code {
            REL_X => {
                self.dx += value;
                self.pointer_dirty = true;
            }
            REL_Y => {
                self.dy += value;
                self.pointer_dirty = true;
            }
            REL_WHEEL => self.wheel_vertical += value,
            REL_HWHEEL => self.wheel_horizontal += value,
            _ => {}
        }
    }

    fn flush(&mut self, out: &mut Decoded) {
        if self.pointer_dirty {
            out.push(RelativePointerEvent::new(self.buttons, self.dx, self.dy).into());
        }
        if self.wheel_vertical != 0 || self.wheel_horizontal != 0 {
            out.push(
                ScrollWheelEvent {
                    delta_axis1: self.wheel_vertical,
                    delta_axis2: self.wheel_horizontal,
                    fixed_delta1: self.wheel_vertical * POINTING_FIXED_SCALE,
                    fixed_delta2: self.wheel_horizontal * POINTING_FIXED_SCALE,
                    point_delta1: self.wheel_vertical * POINTING_POINT_SCALE,
                    point_delta2: self.wheel_horizontal * POINTING_POINT_SCALE,
                }
                .into(),
            );
        }
        self.dx = 0;
        self.dy = 0;
        self.wheel_vertical = 0;
        self.wheel_horizontal = 0;
        self.pointer_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_events_are_immediate() {
        let mut decoder = InputDecoder::new(KeyboardType(3));
        let out = decoder.feed(EV_KEY, 30, 1);
        assert_eq!(out.len(), 1);
        match out[0] {
            InputEvent::Key(e) => {
                assert_eq!((e.event_type, e.key, e.keyboard_type, e.repeat), (EventType::Down, KeyCode(30), KeyboardType(3), false));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let out = decoder.feed(EV_KEY, 30, 2);
        assert!(matches!(out[0], InputEvent::Key(e) if e.repeat));
        assert!(decoder.feed(EV_SYN, SYN_REPORT, 0).is_empty());
    }

    #[test]
    fn test_consumer_key_classified() {
        let mut decoder = InputDecoder::default();
        let out = decoder.feed(EV_KEY, 115, 1);
        assert!(matches!(out[0], InputEvent::Consumer(e) if e.key == ConsumerKeyCode(115)));
    }

    #[test]
    fn test_pointer_frame() {
        let mut decoder = InputDecoder::default();
        assert!(decoder.feed(EV_KEY, BTN_LEFT, 1).is_empty());
        assert!(decoder.feed(EV_REL, REL_X, 3).is_empty());
        assert!(decoder.feed(EV_REL, REL_X, 2).is_empty());
        assert!(decoder.feed(EV_REL, REL_Y, -1).is_empty());
        let out = decoder.feed(EV_SYN, SYN_REPORT, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0],
            InputEvent::RelativePointer(RelativePointerEvent::new(Buttons::LEFT, 5, -1))
        );

        decoder.feed(EV_KEY, BTN_LEFT, 0);
        let out = decoder.feed(EV_SYN, SYN_REPORT, 0);
        assert_eq!(
            out[0],
            InputEvent::RelativePointer(RelativePointerEvent::new(Buttons::empty(), 0, 0))
        );
    }

    #[test]
    fn test_wheel_frame() {
        let mut decoder = InputDecoder::default();
        decoder.feed(EV_REL, REL_WHEEL, -1);
        let out = decoder.feed(EV_SYN, SYN_REPORT, 0);
        assert_eq!(out.len(), 1);
        match out[0] {
            InputEvent::ScrollWheel(e) => {
                assert_eq!(e.delta_axis1, -1);
                assert_eq!(e.fixed_delta1, -POINTING_FIXED_SCALE);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_misc_buttons_ignored() {
        let mut decoder = InputDecoder::default();
        assert!(decoder.feed(EV_KEY, 0x130, 1).is_empty());
    }
}

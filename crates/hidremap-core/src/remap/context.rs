// hidremap Remap Context
// Shared state every translator reads and mutates during one dispatch

use std::time::Instant;

use super::holding::HoldingState;
use crate::output::EventOutput;
use crate::repeat::KeyboardRepeat;
use crate::status::{ButtonStatus, EventWatcher, FlagStatus};
use crate::{
    Buttons, ConsumerEvent, ConsumerKeyCode, EventType, Flags, KeyCode, KeyboardEvent,
    KeyboardType, RelativePointerEvent, ScrollWheelEvent,
};

/// Timing parameters consumed by the translators and the repeat queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    /// Delay until a held key starts repeating
    pub repeat_initial_wait_ms: u64,
    /// Interval between repeats
    pub repeat_wait_ms: u64,
    pub consumer_repeat_initial_wait_ms: u64,
    pub consumer_repeat_wait_ms: u64,
    /// Hold threshold of HoldingKeyToKey
    pub holding_key_to_key_wait_ms: u64,
    /// Window of DoublePressModifier
    pub double_press_threshold_ms: u64,
    /// Longest hold that still counts as a tap for KeyOverlaidModifier (0 = no limit)
    pub key_overlaid_modifier_timeout_ms: u64,
    /// How long the modifier must be held for ModifierHoldingKeyToKey
    pub modifier_holding_key_to_key_wait_ms: u64,
    /// Farthest a scroll trigger button may travel and still click
    pub pointing_button_click_max_distance: u32,
    /// Longest press of a scroll trigger button that still clicks
    pub pointing_button_click_timeout_ms: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            repeat_initial_wait_ms: 500,
            repeat_wait_ms: 83,
            consumer_repeat_initial_wait_ms: 500,
            consumer_repeat_wait_ms: 83,
            holding_key_to_key_wait_ms: 200,
            double_press_threshold_ms: 300,
            key_overlaid_modifier_timeout_ms: 0,
            modifier_holding_key_to_key_wait_ms: 200,
            pointing_button_click_max_distance: 4,
            pointing_button_click_timeout_ms: 300,
        }
    }
}

/// The single dispatch context.
///
/// Raw events and timer fires are both delivered through it, one at a
/// time; `now` is the instant of the delivery in progress.
pub struct RemapContext {
    pub flag_status: FlagStatus,
    pub button_status: ButtonStatus,
    pub keyboard_repeat: KeyboardRepeat,
    pub holding: HoldingState,
    pub event_watcher: EventWatcher,
    pub parameters: Parameters,
    pub now: Instant,
    output: Box<dyn EventOutput + Send>,
}

impl RemapContext {
    pub fn new(output: Box<dyn EventOutput + Send>, parameters: Parameters, now: Instant) -> Self {
        Self {
            flag_status: FlagStatus::new(),
            button_status: ButtonStatus::new(),
            keyboard_repeat: KeyboardRepeat::new(),
            holding: HoldingState::new(),
            event_watcher: EventWatcher::new(),
            parameters,
            now,
            output,
        }
    }

    /// Emit one key event; `NONE` and `PSEUDO` keys emit nothing
    pub fn fire_key(
        &mut self,
        event_type: EventType,
        flags: Flags,
        key: KeyCode,
        keyboard_type: KeyboardType,
    ) {
        if key.is_none() || key == KeyCode::PSEUDO {
            return;
        }
        let event = KeyboardEvent::new(event_type, flags, key, keyboard_type, false);
        log::trace!("fire {}", event);
        self.output.fire_key(&event);
    }

    /// Emit a press and release of `key` with `flags` held.
    ///
    /// A modifier key is expressed as its flag going on and off.
    pub fn fire_key_downup(&mut self, flags: Flags, key: KeyCode, keyboard_type: KeyboardType) {
        let own = key.modifier_flags();
        if own.is_empty() {
            self.fire_key(EventType::Down, flags, key, keyboard_type);
            self.fire_key(EventType::Up, flags, key, keyboard_type);
        } else {
            self.fire_key(EventType::Modify, flags | own, key, keyboard_type);
            self.fire_key(EventType::Modify, flags.difference(own), key, keyboard_type);
        }
    }

    pub fn fire_consumer(&mut self, event_type: EventType, flags: Flags, key: ConsumerKeyCode) {
        if key.is_none() {
            return;
        }
        let event = ConsumerEvent::new(event_type, flags, key, false);
        log::trace!("fire {}", event);
        self.output.fire_consumer(&event);
    }

    pub fn fire_relative_pointer(&mut self, buttons: Buttons, dx: i32, dy: i32) {
        let event = RelativePointerEvent::new(buttons, dx, dy);
        log::trace!("fire {}", event);
        self.output.fire_relative_pointer(&event);
    }

    pub fn fire_scroll_wheel(&mut self, event: &ScrollWheelEvent) {
        log::trace!("fire {}", event);
        self.output.fire_scroll_wheel(event);
    }

    /// Feed an emitted key event to the repeat queue
    pub fn set_key_repeat(
        &mut self,
        event_type: EventType,
        flags: Flags,
        key: KeyCode,
        keyboard_type: KeyboardType,
    ) {
        let delay = self.parameters.repeat_initial_wait_ms;
        let interval = self.parameters.repeat_wait_ms;
        self.keyboard_repeat
            .set(self.now, event_type, flags, key, keyboard_type, delay, interval);
    }

    /// Feed an emitted consumer event to the repeat queue
    pub fn set_consumer_repeat(&mut self, event_type: EventType, flags: Flags, key: ConsumerKeyCode) {
        let delay = self.parameters.consumer_repeat_initial_wait_ms;
        let interval = self.parameters.consumer_repeat_wait_ms;
        self.keyboard_repeat
            .set_consumer(self.now, event_type, flags, key, delay, interval);
    }

    pub fn cancel_repeat(&mut self) {
        self.keyboard_repeat.cancel();
    }

    /// Fire the repeat queue if it is due
    pub fn dispatch_repeat(&mut self) -> bool {
        self.keyboard_repeat.dispatch(self.now, self.output.as_mut())
    }

    /// Forget every held flag, button and pending sequence
    pub fn reset(&mut self) {
        self.keyboard_repeat.cancel();
        self.holding.reset();
        self.flag_status.reset();
        self.button_status.reset();
        self.event_watcher.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOutput;

    fn context() -> (RemapContext, RecordingOutput) {
        let out = RecordingOutput::new();
        let ctx = RemapContext::new(Box::new(out.clone()), Parameters::default(), Instant::now());
        (ctx, out)
    }

    #[test]
    fn test_fire_key_skips_sentinels() {
        let (mut ctx, out) = context();
        ctx.fire_key(EventType::Down, Flags::empty(), KeyCode::NONE, KeyboardType::NONE);
        ctx.fire_key(EventType::Down, Flags::empty(), KeyCode::PSEUDO, KeyboardType::NONE);
        assert!(out.is_empty());
    }

    #[test]
    fn test_fire_key_downup_plain() {
        let (mut ctx, out) = context();
        ctx.fire_key_downup(Flags::SHIFT_L, KeyCode(30), KeyboardType::NONE);
        let keys = out.take_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].event_type, EventType::Down);
        assert_eq!(keys[1].event_type, EventType::Up);
        assert!(keys.iter().all(|k| k.flags == Flags::SHIFT_L));
    }

    #[test]
    fn test_fire_key_downup_modifier() {
        let (mut ctx, out) = context();
        ctx.fire_key_downup(Flags::empty(), KeyCode(29), KeyboardType::NONE);
        let keys = out.take_keys();
        assert_eq!(keys[0].event_type, EventType::Modify);
        assert_eq!(keys[0].flags, Flags::CONTROL_L);
        assert_eq!(keys[1].flags, Flags::empty());
    }

    #[test]
    fn test_default_parameters() {
        let p = Parameters::default();
        assert_eq!(p.repeat_initial_wait_ms, 500);
        assert_eq!(p.repeat_wait_ms, 83);
        assert_eq!(p.key_overlaid_modifier_timeout_ms, 0);
    }
}

// hidremap Keyboard Repeat
// Synthetic auto-repeat queue re-firing the most recently remapped event

use std::time::Instant;

use smallvec::SmallVec;

use crate::output::EventOutput;
use crate::timer::Timer;
use crate::{
    Buttons, ConsumerEvent, ConsumerKeyCode, EventType, Flags, KeyCode, KeyboardEvent,
    KeyboardType, RelativePointerEvent, ScrollWheelEvent,
};

/// One queued event. Only the first three kinds are re-fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatItem {
    Key(KeyboardEvent),
    Consumer(ConsumerEvent),
    RelativePointer(RelativePointerEvent),
    FlagUpdate(Flags),
    ScrollWheel(ScrollWheelEvent),
    Wait(u32),
}

/// What `set` should do with the current sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetDecision {
    Cancel,
    StartNew,
    Ignore,
}

/// The auto-repeat queue.
///
/// At most one sequence is armed at a time. The first fire happens
/// `delay_until_repeat` ms after [`KeyboardRepeat::primitive_start`] and
/// every following fire `key_repeat` ms after the previous one, until
/// [`KeyboardRepeat::cancel`].
#[derive(Debug, Clone)]
pub struct KeyboardRepeat {
    queue: SmallVec<[RepeatItem; 2]>,
    timer: Timer,
    id: u64,
    key_repeat_ms: u64,
}

impl Default for KeyboardRepeat {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardRepeat {
    pub fn new() -> Self {
        Self {
            queue: SmallVec::new(),
            timer: Timer::new("keyboard_repeat"),
            id: 0,
            key_repeat_ms: 0,
        }
    }

    /// Bind the fire timer to the dispatch context
    pub fn initialize(&mut self) {
        self.timer.bind();
    }

    /// Release the fire timer and drop every queued item
    pub fn terminate(&mut self) {
        self.timer.unbind();
        self.queue.clear();
    }

    /// Disarm, empty the queue and bump the generation id
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.queue.clear();
        self.succ_id();
        log::debug!("KeyboardRepeat::cancel id:{}", self.id);
    }

    /// Queue a key event. `KeyCode::NONE` is not added.
    pub fn primitive_add_key(
        &mut self,
        event_type: EventType,
        flags: Flags,
        key: KeyCode,
        keyboard_type: KeyboardType,
    ) -> bool {
        if key.is_none() {
            return false;
        }
        let event = KeyboardEvent::new(event_type, flags, key, keyboard_type, true);
        self.primitive_add(RepeatItem::Key(event))
    }

    /// Queue a consumer event. `ConsumerKeyCode::NONE` is not added.
    pub fn primitive_add_consumer(
        &mut self,
        event_type: EventType,
        flags: Flags,
        key: ConsumerKeyCode,
    ) -> bool {
        if key.is_none() {
            return false;
        }
        let event = ConsumerEvent::new(event_type, flags, key, true);
        self.primitive_add(RepeatItem::Consumer(event))
    }

    /// Queue a motionless pointer report with `buttons` held
    pub fn primitive_add_relative_pointer(&mut self, buttons: Buttons) -> bool {
        self.primitive_add(RepeatItem::RelativePointer(RelativePointerEvent::new(buttons, 0, 0)))
    }

    /// Queue any item, in emission order
    pub fn primitive_add(&mut self, item: RepeatItem) -> bool {
        self.queue.push(item);
        true
    }

    /// Arm the first fire and remember the steady interval.
    ///
    /// Returns the new generation id.
    pub fn primitive_start(&mut self, now: Instant, delay_until_repeat: u64, key_repeat: u64) -> u64 {
        self.key_repeat_ms = key_repeat;
        self.timer.set_timeout_ms(now, delay_until_repeat);
        self.succ_id()
    }

    /// Track one translated key event.
    ///
    /// DOWN starts a fresh sequence. UP stops it only when the queue holds
    /// exactly that one key; with several items queued an UP leaves the
    /// queue alone. Anything else cancels.
    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        now: Instant,
        event_type: EventType,
        flags: Flags,
        key: KeyCode,
        keyboard_type: KeyboardType,
        delay_until_repeat: u64,
        key_repeat: u64,
    ) {
        if key.is_none() {
            return;
        }

        let decision = match event_type {
            EventType::Down => SetDecision::StartNew,
            EventType::Up => self.decide_up(key),
            EventType::Modify => SetDecision::Cancel,
        };

        match decision {
            SetDecision::Ignore => {}
            SetDecision::Cancel => self.cancel(),
            SetDecision::StartNew => {
                self.cancel();
                self.primitive_add_key(event_type, flags, key, keyboard_type);
                self.primitive_start(now, delay_until_repeat, key_repeat);
                log::debug!("KeyboardRepeat::set key:{} flags:{}", key, flags);
            }
        }
    }

    /// Track one translated consumer event.
    ///
    /// Only repeatable consumer keys (volume, brightness, ...) start a
    /// sequence; everything else cancels.
    pub fn set_consumer(
        &mut self,
        now: Instant,
        event_type: EventType,
        flags: Flags,
        key: ConsumerKeyCode,
        delay_until_repeat: u64,
        key_repeat: u64,
    ) {
        if key.is_none() {
            return;
        }

        let decision = match event_type {
            EventType::Down if key.is_repeatable() => SetDecision::StartNew,
            _ => SetDecision::Cancel,
        };

        match decision {
            SetDecision::Ignore => {}
            SetDecision::Cancel => self.cancel(),
            SetDecision::StartNew => {
                self.cancel();
                self.primitive_add_consumer(event_type, flags, key);
                self.primitive_start(now, delay_until_repeat, key_repeat);
                log::debug!("KeyboardRepeat::set consumer key:{} flags:{}", key, flags);
            }
        }
    }

    fn decide_up(&self, key: KeyCode) -> SetDecision {
        match self.queue.as_slice() {
            [RepeatItem::Key(queued)] if queued.key == key => SetDecision::Cancel,
            _ => SetDecision::Ignore,
        }
    }

    /// Fire the queue if its timer is due. Returns true when it fired.
    pub fn dispatch(&mut self, now: Instant, output: &mut dyn EventOutput) -> bool {
        if !self.timer.take_if_due(now) {
            return false;
        }
        self.fire(now, output);
        true
    }

    /// Re-emit every repeatable item and rearm for the steady interval
    pub fn fire(&mut self, now: Instant, output: &mut dyn EventOutput) {
        log::debug!("KeyboardRepeat::fire queue.len = {}", self.queue.len());

        let single = self.queue.len() == 1;
        for item in &self.queue {
            match item {
                RepeatItem::Key(event) => {
                    output.fire_key(&KeyboardEvent { repeat: single, ..*event });
                }
                RepeatItem::Consumer(event) => {
                    output.fire_consumer(&ConsumerEvent { repeat: single, ..*event });
                }
                RepeatItem::RelativePointer(event) => output.fire_relative_pointer(event),
                RepeatItem::FlagUpdate(_) | RepeatItem::ScrollWheel(_) | RepeatItem::Wait(_) => {}
            }
        }

        self.timer.set_timeout_ms(now, self.key_repeat_ms);
    }

    /// Current generation id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn items(&self) -> &[RepeatItem] {
        &self.queue
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    fn succ_id(&mut self) -> u64 {
        self.id += 1;
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Clock, ManualClock};
    use crate::output::RecordingOutput;

    const A: KeyCode = KeyCode(30);
    const B: KeyCode = KeyCode(48);

    fn setup() -> (KeyboardRepeat, ManualClock, RecordingOutput) {
        let mut repeat = KeyboardRepeat::new();
        repeat.initialize();
        (repeat, ManualClock::new(), RecordingOutput::new())
    }

    #[test]
    fn test_none_key_is_not_added() {
        let (mut repeat, _, _) = setup();
        assert!(!repeat.primitive_add_key(EventType::Down, Flags::empty(), KeyCode::NONE, KeyboardType::NONE));
        assert!(!repeat.primitive_add_consumer(EventType::Down, Flags::empty(), ConsumerKeyCode::NONE));
        assert!(repeat.is_empty());
    }

    #[test]
    fn test_set_none_key_keeps_sequence() {
        let (mut repeat, clock, _) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 500, 83);
        let id = repeat.id();
        repeat.set(clock.now(), EventType::Modify, Flags::empty(), KeyCode::NONE, KeyboardType::NONE, 500, 83);
        assert_eq!(repeat.id(), id);
        assert!(repeat.is_armed());
    }

    #[test]
    fn test_down_twice_supersedes() {
        let (mut repeat, clock, mut out) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 500, 83);
        repeat.set(clock.now(), EventType::Down, Flags::empty(), B, KeyboardType::NONE, 500, 83);
        assert_eq!(repeat.len(), 1);

        clock.advance_ms(500);
        assert!(repeat.dispatch(clock.now(), &mut out));
        let keys = out.take_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key, B);
    }

    #[test]
    fn test_up_cancels_singleton() {
        let (mut repeat, clock, _) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 500, 83);
        repeat.set(clock.now(), EventType::Up, Flags::empty(), B, KeyboardType::NONE, 500, 83);
        assert!(repeat.is_armed());
        repeat.set(clock.now(), EventType::Up, Flags::empty(), A, KeyboardType::NONE, 500, 83);
        assert!(!repeat.is_armed());
        assert!(repeat.is_empty());
    }

    #[test]
    fn test_up_with_plural_queue_is_ignored() {
        let (mut repeat, clock, _) = setup();
        repeat.primitive_add_key(EventType::Down, Flags::empty(), A, KeyboardType::NONE);
        repeat.primitive_add_key(EventType::Up, Flags::empty(), A, KeyboardType::NONE);
        let id = repeat.primitive_start(clock.now(), 500, 83);

        repeat.set(clock.now(), EventType::Up, Flags::empty(), A, KeyboardType::NONE, 500, 83);
        assert_eq!(repeat.len(), 2);
        assert_eq!(repeat.id(), id);
        assert!(repeat.is_armed());
    }

    #[test]
    fn test_modify_cancels() {
        let (mut repeat, clock, _) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 500, 83);
        repeat.set(clock.now(), EventType::Modify, Flags::SHIFT_L, KeyCode(42), KeyboardType::NONE, 500, 83);
        assert!(!repeat.is_armed());
    }

    #[test]
    fn test_cadence() {
        let (mut repeat, clock, mut out) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 500, 83);

        clock.advance_ms(499);
        assert!(!repeat.dispatch(clock.now(), &mut out));
        clock.advance_ms(1);
        assert!(repeat.dispatch(clock.now(), &mut out));

        for _ in 0..3 {
            clock.advance_ms(82);
            assert!(!repeat.dispatch(clock.now(), &mut out));
            clock.advance_ms(1);
            assert!(repeat.dispatch(clock.now(), &mut out));
        }
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_fire_marks_singleton() {
        let (mut repeat, clock, mut out) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::SHIFT_L, A, KeyboardType(3), 0, 83);
        assert!(repeat.dispatch(clock.now(), &mut out));
        let keys = out.take_keys();
        assert_eq!(keys[0].flags, Flags::SHIFT_L);
        assert_eq!(keys[0].keyboard_type, KeyboardType(3));
        assert!(keys[0].repeat);
    }

    #[test]
    fn test_fire_skips_placeholders() {
        let (mut repeat, clock, mut out) = setup();
        repeat.primitive_add(RepeatItem::FlagUpdate(Flags::SHIFT_L));
        repeat.primitive_add_key(EventType::Down, Flags::empty(), A, KeyboardType::NONE);
        repeat.primitive_add(RepeatItem::Wait(10));
        repeat.primitive_add(RepeatItem::ScrollWheel(ScrollWheelEvent::default()));
        repeat.primitive_add_relative_pointer(Buttons::LEFT);
        repeat.primitive_start(clock.now(), 0, 83);

        assert!(repeat.dispatch(clock.now(), &mut out));
        let events = out.take();
        assert_eq!(events.len(), 2);
        assert!(!events[0].as_key().unwrap().repeat);
        assert_eq!(events[1].as_relative_pointer().unwrap().buttons, Buttons::LEFT);
    }

    #[test]
    fn test_cancel_stops_fires() {
        let (mut repeat, clock, mut out) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 10, 10);
        clock.advance_ms(10);
        assert!(repeat.dispatch(clock.now(), &mut out));
        repeat.cancel();
        for _ in 0..10 {
            clock.advance_ms(10);
            assert!(!repeat.dispatch(clock.now(), &mut out));
        }
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_id_strictly_increases() {
        let (mut repeat, clock, _) = setup();
        let mut last = repeat.id();
        for _ in 0..5 {
            repeat.cancel();
            assert!(repeat.id() > last);
            last = repeat.id();
            let started = repeat.primitive_start(clock.now(), 10, 10);
            assert!(started > last);
            last = started;
        }
    }

    #[test]
    fn test_consumer_repeatability() {
        let (mut repeat, clock, _) = setup();
        let volume_up = ConsumerKeyCode(115);
        let play = ConsumerKeyCode(164);

        repeat.set_consumer(clock.now(), EventType::Down, Flags::empty(), volume_up, 500, 83);
        assert!(repeat.is_armed());
        repeat.set_consumer(clock.now(), EventType::Down, Flags::empty(), play, 500, 83);
        assert!(!repeat.is_armed());

        repeat.set_consumer(clock.now(), EventType::Down, Flags::empty(), volume_up, 500, 83);
        repeat.set_consumer(clock.now(), EventType::Up, Flags::empty(), volume_up, 500, 83);
        assert!(!repeat.is_armed());
    }

    #[test]
    fn test_uninitialized_does_not_arm() {
        let mut repeat = KeyboardRepeat::new();
        let clock = ManualClock::new();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 0, 0);
        assert!(!repeat.is_armed());
    }

    #[test]
    fn test_terminate_clears() {
        let (mut repeat, clock, mut out) = setup();
        repeat.set(clock.now(), EventType::Down, Flags::empty(), A, KeyboardType::NONE, 0, 0);
        repeat.terminate();
        repeat.terminate();
        assert!(repeat.is_empty());
        assert!(!repeat.dispatch(clock.now(), &mut out));
    }
}

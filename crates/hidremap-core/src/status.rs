// hidremap Status Trackers
// Held modifier flags, held pointer buttons and the raw event watcher

use std::time::Instant;

use strum::{EnumCount, IntoEnumIterator};

use crate::interval::IntervalChecker;
use crate::{Buttons, ConsumerKeyCode, Flags, KeyCode, KeyboardEvent, ModifierFlag, PointingButton};

const BUTTON_SLOTS: usize = 8;

/// Per-modifier hold counters.
///
/// Raw modifier events and translators both move the counters: a remap of
/// `Shift_L -> Ctrl_L` decreases SHIFT_L and increases CONTROL_L, so the
/// flags made from the counters describe what was last emitted, not what
/// is physically held. Each flag also remembers when its counter last
/// became positive.
#[derive(Debug, Clone, Default)]
pub struct FlagStatus {
    counts: [i32; ModifierFlag::COUNT],
    since: [Option<Instant>; ModifierFlag::COUNT],
}

impl FlagStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a raw keyboard event before any translator sees it
    pub fn set(&mut self, event: &KeyboardEvent, now: Instant) {
        let Some(modifier) = event.key.modifier_flag() else {
            return;
        };
        let index = modifier.index();
        if event.is_key_down() {
            self.counts[index] += 1;
            self.since[index] = Some(now);
        } else {
            self.counts[index] -= 1;
            if self.counts[index] <= 0 {
                self.since[index] = None;
            }
        }
    }

    /// Count every flag in `flags` as held once more
    pub fn increase(&mut self, flags: Flags, now: Instant) {
        for m in flags.modifiers() {
            let index = m.index();
            self.counts[index] += 1;
            if self.counts[index] == 1 {
                self.since[index] = Some(now);
            }
        }
    }

    /// Count every flag in `flags` as held once less
    pub fn decrease(&mut self, flags: Flags) {
        for m in flags.modifiers() {
            let index = m.index();
            self.counts[index] -= 1;
            if self.counts[index] <= 0 {
                self.since[index] = None;
            }
        }
    }

    /// Take `flags` out of the current flags while a translator owns the
    /// key that carries them. Hold times are kept.
    pub fn consume(&mut self, flags: Flags) {
        for m in flags.modifiers() {
            self.counts[m.index()] -= 1;
        }
    }

    /// Undo a [`consume`](Self::consume)
    pub fn restore(&mut self, flags: Flags) {
        for m in flags.modifiers() {
            self.counts[m.index()] += 1;
        }
    }

    /// Flags whose counter is positive
    pub fn make_flags(&self) -> Flags {
        ModifierFlag::iter()
            .filter(|m| self.counts[m.index()] > 0)
            .fold(Flags::empty(), |acc, m| acc | m.flag())
    }

    /// How long every modifier in `pattern` has been held, whether by a
    /// raw press or through a translator.
    ///
    /// The stopwatch starts at the most recent start among them; `None`
    /// when any of them is not currently held.
    pub fn held_since(&self, pattern: Flags) -> Option<IntervalChecker> {
        let mut latest: Option<Instant> = None;
        for m in pattern.stripped().modifiers() {
            let index = m.index();
            if self.counts[index] <= 0 {
                return None;
            }
            let since = self.since[index]?;
            latest = Some(latest.map_or(since, |l| l.max(since)));
        }
        latest.map(IntervalChecker::started_at)
    }

    pub fn count(&self, modifier: ModifierFlag) -> i32 {
        self.counts[modifier.index()]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-button hold counters, the pointer analogue of [`FlagStatus`]
#[derive(Debug, Clone, Default)]
pub struct ButtonStatus {
    counts: [i32; BUTTON_SLOTS],
    last_raw: Buttons,
}

impl ButtonStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a raw pointer report.
    ///
    /// Returns the buttons that went down and the buttons that went up
    /// since the previous report.
    pub fn set(&mut self, raw: Buttons) -> (Buttons, Buttons) {
        let pressed = raw.difference(self.last_raw);
        let released = self.last_raw.difference(raw);
        self.increase(pressed);
        self.decrease(released);
        self.last_raw = raw;
        (pressed, released)
    }

    pub fn increase(&mut self, buttons: Buttons) {
        for i in Self::indices(buttons) {
            self.counts[i] += 1;
        }
    }

    pub fn decrease(&mut self, buttons: Buttons) {
        for i in Self::indices(buttons) {
            self.counts[i] -= 1;
        }
    }

    /// Buttons whose counter is positive
    pub fn make_buttons(&self) -> Buttons {
        (0..BUTTON_SLOTS)
            .filter(|i| self.counts[*i] > 0)
            .filter_map(PointingButton::from_index)
            .fold(Buttons::empty(), |acc, b| acc | b.buttons())
    }

    /// Buttons physically held at the last raw report
    pub fn raw(&self) -> Buttons {
        self.last_raw
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn indices(buttons: Buttons) -> impl Iterator<Item = usize> {
        (0..BUTTON_SLOTS).filter(move |i| buttons.bits() & (1 << i) != 0)
    }
}

/// A raw press seen by the [`EventWatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedInput {
    Key(KeyCode),
    Consumer(ConsumerKeyCode),
    Button(PointingButton),
}

/// Counts raw presses of any kind.
///
/// Translators that need to know "did anything else happen while I was
/// held" compare the count at their own press with the current count.
#[derive(Debug, Clone, Default)]
pub struct EventWatcher {
    count: u64,
    last: Option<WatchedInput>,
    previous: Option<WatchedInput>,
}

impl EventWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one raw press
    pub fn countup(&mut self, input: WatchedInput) {
        self.count += 1;
        self.previous = self.last;
        self.last = Some(input);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// The most recent raw press
    pub fn last(&self) -> Option<WatchedInput> {
        self.last
    }

    /// The raw press before the most recent one
    pub fn previous(&self) -> Option<WatchedInput> {
        self.previous
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

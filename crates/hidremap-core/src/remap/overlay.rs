// hidremap Overlay Translators
// Keys acting as modifiers when held and as keys when tapped

use super::context::RemapContext;
use super::key_to_key::KeyToKey;
use super::params::RemapParams;
use crate::interval::IntervalChecker;
use crate::{EventType, Flags, KeyCode};

/// A key that is a modifier while held and a key when tapped alone
/// (Space held is Shift, Space tapped is Space).
#[derive(Debug, Clone)]
pub struct KeyOverlaidModifier {
    key_to_key: KeyToKey,
    fire_key: KeyCode,
    fire_flags: Flags,
    is_fire_repeat: bool,

    saved_flags: Flags,
    watcher_count: u64,
    ic: IntervalChecker,
    repeat_id: Option<u64>,
}

impl KeyOverlaidModifier {
    pub fn new(
        from_key: KeyCode,
        from_flags: Flags,
        to_key: KeyCode,
        to_flags: Flags,
        fire_key: KeyCode,
        fire_flags: Flags,
    ) -> Self {
        Self {
            key_to_key: KeyToKey::new(from_key, from_flags, to_key, to_flags).without_repeat(),
            fire_key,
            fire_flags,
            is_fire_repeat: false,
            saved_flags: Flags::empty(),
            watcher_count: 0,
            ic: IntervalChecker::new(),
            repeat_id: None,
        }
    }

    /// Auto-repeat the tap key while the overlay key is held alone
    pub fn with_fire_repeat(mut self) -> Self {
        self.is_fire_repeat = true;
        self
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        let saved_flags = ctx.flag_status.make_flags();
        if !self.key_to_key.remap(ctx, params) {
            return false;
        }

        let keyboard_type = params.keyboard_type;
        if params.is_key_down() {
            self.saved_flags = saved_flags;
            self.watcher_count = ctx.event_watcher.count();
            self.ic.begin(ctx.now);

            if self.is_fire_repeat {
                let fire_flags = self.saved_flags | self.fire_flags;
                ctx.keyboard_repeat.cancel();
                ctx.keyboard_repeat
                    .primitive_add_key(EventType::Down, fire_flags, self.fire_key, keyboard_type);
                ctx.keyboard_repeat
                    .primitive_add_key(EventType::Up, fire_flags, self.fire_key, keyboard_type);
                let delay = ctx.parameters.repeat_initial_wait_ms;
                let interval = ctx.parameters.repeat_wait_ms;
                self.repeat_id = Some(ctx.keyboard_repeat.primitive_start(ctx.now, delay, interval));
            }
            return true;
        }

        // Stop our own repeat, but not one some other key started since
        if let Some(id) = self.repeat_id.take() {
            if ctx.keyboard_repeat.id() == id {
                ctx.keyboard_repeat.cancel();
            }
        }

        let any_event_happened = ctx.event_watcher.count() != self.watcher_count;
        let timeout = ctx.parameters.key_overlaid_modifier_timeout_ms;
        let within_timeout = timeout == 0 || !self.ic.check_threshold(ctx.now, timeout);
        if !any_event_happened && within_timeout {
            log::debug!("KeyOverlaidModifier tap {}", self.fire_key);
            ctx.fire_key_downup(self.saved_flags | self.fire_flags, self.fire_key, keyboard_type);
        }
        true
    }
}

/// A key that fires a different key when pressed twice in quick succession
#[derive(Debug, Clone)]
pub struct DoublePressModifier {
    from_key: KeyCode,
    key_to_key: KeyToKey,
    fire_pair: KeyToKey,
    fire_key: KeyCode,
    fire_flags: Flags,
    press_count: u32,
    watcher_count: u64,
    ic: IntervalChecker,
}

impl DoublePressModifier {
    pub fn new(from_key: KeyCode, to_key: KeyCode, fire_key: KeyCode, fire_flags: Flags) -> Self {
        Self {
            from_key,
            key_to_key: KeyToKey::new(from_key, Flags::empty(), to_key, Flags::empty()),
            fire_pair: KeyToKey::pseudo(from_key, Flags::empty()),
            fire_key,
            fire_flags,
            press_count: 0,
            watcher_count: 0,
            ic: IntervalChecker::new(),
        }
    }

    pub fn press_count(&self) -> u32 {
        self.press_count
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if params.is_remapped() {
            return false;
        }

        let is_down = params.is_key_down();
        if params.event.key != self.from_key {
            if is_down {
                self.press_count = 0;
            }
            return false;
        }

        if !is_down {
            // whichever half claimed the press claims its release
            return self.key_to_key.remap(ctx, params) || self.fire_pair.remap(ctx, params);
        }

        let now = ctx.now;
        let threshold = ctx.parameters.double_press_threshold_ms;
        // any press in between, even one claimed further up the chain, breaks the pair
        let watcher_count = ctx.event_watcher.count();
        let interrupted = watcher_count != self.watcher_count + 1;
        if self.press_count > 0 && (interrupted || self.ic.check_threshold(now, threshold)) {
            self.press_count = 0;
        }
        self.press_count += 1;
        self.watcher_count = watcher_count;
        self.ic.begin(now);

        if self.press_count < 2 {
            return self.key_to_key.remap(ctx, params);
        }

        self.press_count = 0;
        self.ic.reset();
        if !self.fire_pair.remap(ctx, params) {
            return false;
        }
        log::debug!("DoublePressModifier fire {}", self.fire_key);
        let flags = ctx.flag_status.make_flags() | self.fire_flags;
        ctx.fire_key_downup(flags, self.fire_key, params.keyboard_type);
        true
    }
}

/// Substitute a key only after a modifier has been held for a while
#[derive(Debug, Clone)]
pub struct ModifierHoldingKeyToKey {
    from_key: KeyCode,
    from_flags: Flags,
    key_to_key: KeyToKey,
}

impl ModifierHoldingKeyToKey {
    pub fn new(from_key: KeyCode, from_flags: Flags, to_key: KeyCode) -> Self {
        Self {
            from_key,
            from_flags,
            key_to_key: KeyToKey::new(from_key, from_flags, to_key, Flags::empty()),
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if params.is_remapped() || params.event.key != self.from_key {
            return false;
        }
        if params.is_key_down() {
            let wait = ctx.parameters.modifier_holding_key_to_key_wait_ms;
            let held_long_enough = ctx
                .flag_status
                .held_since(self.from_flags)
                .is_some_and(|ic| ic.check_threshold(ctx.now, wait));
            if !held_long_enough {
                return false;
            }
        }
        self.key_to_key.remap(ctx, params)
    }
}

// hidremap Key Substitution
// KeyToKey and its consumer-key analogues

use super::context::RemapContext;
use super::params::{FromKeyChecker, RemapConsumerParams, RemapParams};
use crate::{ConsumerKeyCode, EventType, Flags, KeyCode, KeyboardType};

/// Flags a key contributes on its side of a substitution
fn side_flags(key: KeyCode, flags: Flags) -> Flags {
    flags.stripped() | key.modifier_flags()
}

/// Match pattern for a from-key: its own modifier flag is part of it
fn from_pattern(key: KeyCode, flags: Flags) -> Flags {
    flags | key.modifier_flags()
}

/// Emit the "to" half of a key substitution.
///
/// Moves the to-side flag counters, emits the key with the resulting
/// flags (MODIFY for modifier keys) and feeds or cancels the repeat queue.
pub(crate) fn fire_substitute_key(
    ctx: &mut RemapContext,
    is_down: bool,
    to_key: KeyCode,
    to_flags: Flags,
    keyboard_type: KeyboardType,
    is_set_key_repeat: bool,
) {
    let to_side = side_flags(to_key, to_flags);
    if is_down {
        ctx.flag_status.increase(to_side, ctx.now);
    } else {
        ctx.flag_status.decrease(to_side);
    }

    let event_type = if to_key.is_modifier() {
        EventType::Modify
    } else {
        EventType::from_pressed(is_down)
    };
    let flags = ctx.flag_status.make_flags();

    if to_key.is_none() || to_key == KeyCode::PSEUDO {
        if is_down {
            ctx.cancel_repeat();
        }
        return;
    }

    ctx.fire_key(event_type, flags, to_key, keyboard_type);
    if is_set_key_repeat {
        ctx.set_key_repeat(event_type, flags, to_key, keyboard_type);
    } else if is_down {
        ctx.cancel_repeat();
    }
}

/// Substitute one key (plus flags) for another
#[derive(Debug, Clone)]
pub struct KeyToKey {
    from_key: KeyCode,
    from_flags: Flags,
    to_key: KeyCode,
    to_flags: Flags,
    is_set_key_repeat: bool,
    checker: FromKeyChecker,
}

impl KeyToKey {
    pub fn new(from_key: KeyCode, from_flags: Flags, to_key: KeyCode, to_flags: Flags) -> Self {
        Self {
            from_key,
            from_flags,
            to_key,
            to_flags,
            is_set_key_repeat: true,
            checker: FromKeyChecker::new(),
        }
    }

    /// Claim the from-key without emitting anything for it
    pub fn pseudo(from_key: KeyCode, from_flags: Flags) -> Self {
        Self::new(from_key, from_flags, KeyCode::PSEUDO, Flags::empty())
    }

    /// Do not auto-repeat the substitute
    pub fn without_repeat(mut self) -> Self {
        self.is_set_key_repeat = false;
        self
    }

    pub fn from_key(&self) -> KeyCode {
        self.from_key
    }

    pub fn is_active(&self) -> bool {
        self.checker.is_active()
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if params.is_remapped() {
            return false;
        }
        let is_down = params.is_key_down();
        let current = ctx.flag_status.make_flags();
        if !self.checker.check(
            is_down,
            params.event.key,
            current,
            self.from_key,
            from_pattern(self.from_key, self.from_flags),
        ) {
            return false;
        }
        params.set_remapped();

        let from_side = side_flags(self.from_key, self.from_flags);
        if is_down {
            ctx.flag_status.consume(from_side);
        } else {
            ctx.flag_status.restore(from_side);
        }

        log::trace!("KeyToKey {} -> {} ({})", self.from_key, self.to_key, params.event.event_type);
        fire_substitute_key(
            ctx,
            is_down,
            self.to_key,
            self.to_flags,
            params.keyboard_type,
            self.is_set_key_repeat,
        );
        true
    }
}

/// Substitute one consumer key for another
#[derive(Debug, Clone)]
pub struct ConsumerToConsumer {
    from_key: ConsumerKeyCode,
    from_flags: Flags,
    to_key: ConsumerKeyCode,
    to_flags: Flags,
    checker: FromKeyChecker,
}

impl ConsumerToConsumer {
    pub fn new(
        from_key: ConsumerKeyCode,
        from_flags: Flags,
        to_key: ConsumerKeyCode,
        to_flags: Flags,
    ) -> Self {
        Self {
            from_key,
            from_flags,
            to_key,
            to_flags,
            checker: FromKeyChecker::new(),
        }
    }

    /// Match and move the from-side flags, without emitting
    fn claim(&mut self, ctx: &mut RemapContext, params: &mut RemapConsumerParams) -> bool {
        if params.is_remapped() {
            return false;
        }
        let is_down = params.is_key_down();
        let current = ctx.flag_status.make_flags();
        if !self
            .checker
            .check(is_down, params.event.key, current, self.from_key, self.from_flags)
        {
            return false;
        }
        params.set_remapped();

        if is_down {
            ctx.flag_status.consume(self.from_flags.stripped());
        } else {
            ctx.flag_status.restore(self.from_flags.stripped());
        }
        true
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapConsumerParams) -> bool {
        if !self.claim(ctx, params) {
            return false;
        }
        fire_substitute_consumer(ctx, params.is_key_down(), self.to_key, self.to_flags);
        true
    }
}

/// Emit the "to" half of a consumer substitution
fn fire_substitute_consumer(ctx: &mut RemapContext, is_down: bool, to_key: ConsumerKeyCode, to_flags: Flags) {
    let to_side = to_flags.stripped();
    if is_down {
        ctx.flag_status.increase(to_side, ctx.now);
    } else {
        ctx.flag_status.decrease(to_side);
    }
    let event_type = EventType::from_pressed(is_down);
    let flags = ctx.flag_status.make_flags();

    if to_key.is_none() {
        ctx.cancel_repeat();
        return;
    }
    ctx.fire_consumer(event_type, flags, to_key);
    ctx.set_consumer_repeat(event_type, flags, to_key);
}

/// Turn a physical key into a consumer key
#[derive(Debug, Clone)]
pub struct KeyToConsumer {
    key_to_key: KeyToKey,
    to_key: ConsumerKeyCode,
    to_flags: Flags,
}

impl KeyToConsumer {
    pub fn new(from_key: KeyCode, from_flags: Flags, to_key: ConsumerKeyCode, to_flags: Flags) -> Self {
        Self {
            key_to_key: KeyToKey::pseudo(from_key, from_flags),
            to_key,
            to_flags,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if !self.key_to_key.remap(ctx, params) {
            return false;
        }
        fire_substitute_consumer(ctx, params.is_key_down(), self.to_key, self.to_flags);
        true
    }
}

/// Turn a consumer key into a physical key
#[derive(Debug, Clone)]
pub struct ConsumerToKey {
    consumer_to_consumer: ConsumerToConsumer,
    to_key: KeyCode,
    to_flags: Flags,
}

impl ConsumerToKey {
    pub fn new(from_key: ConsumerKeyCode, from_flags: Flags, to_key: KeyCode, to_flags: Flags) -> Self {
        Self {
            consumer_to_consumer: ConsumerToConsumer::new(
                from_key,
                from_flags,
                ConsumerKeyCode::NONE,
                Flags::empty(),
            ),
            to_key,
            to_flags,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapConsumerParams) -> bool {
        if !self.consumer_to_consumer.claim(ctx, params) {
            return false;
        }
        fire_substitute_key(
            ctx,
            params.is_key_down(),
            self.to_key,
            self.to_flags,
            KeyboardType::NONE,
            true,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputEvent, RecordingOutput};
    use crate::remap::context::Parameters;
    use crate::{ConsumerEvent, KeyboardEvent};
    use std::time::Instant;

    const A: KeyCode = KeyCode(30);
    const B: KeyCode = KeyCode(48);
    const SHIFT_L: KeyCode = KeyCode(42);
    const CTRL_L: KeyCode = KeyCode(29);

    fn context() -> (RemapContext, RecordingOutput) {
        let out = RecordingOutput::new();
        let mut ctx = RemapContext::new(Box::new(out.clone()), Parameters::default(), Instant::now());
        ctx.keyboard_repeat.initialize();
        (ctx, out)
    }

    fn key(event_type: EventType, key: KeyCode) -> RemapParams {
        let flags = if event_type == EventType::Modify { key.modifier_flags() } else { Flags::empty() };
        RemapParams::new(KeyboardEvent::new(event_type, flags, key, KeyboardType::NONE, false))
    }

    fn modifier_up(key: KeyCode) -> RemapParams {
        RemapParams::new(KeyboardEvent::new(EventType::Modify, Flags::empty(), key, KeyboardType::NONE, false))
    }

    #[test]
    fn test_key_to_key_down_up() {
        let (mut ctx, out) = context();
        let mut rule = KeyToKey::new(A, Flags::empty(), B, Flags::empty());

        assert!(rule.remap(&mut ctx, &mut key(EventType::Down, A)));
        assert!(ctx.keyboard_repeat.is_armed());
        assert!(rule.remap(&mut ctx, &mut key(EventType::Up, A)));
        assert!(!ctx.keyboard_repeat.is_armed());

        let keys = out.take_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!((keys[0].event_type, keys[0].key), (EventType::Down, B));
        assert_eq!((keys[1].event_type, keys[1].key), (EventType::Up, B));
    }

    #[test]
    fn test_key_to_key_ignores_other_keys() {
        let (mut ctx, out) = context();
        let mut rule = KeyToKey::new(A, Flags::empty(), B, Flags::empty());
        let mut params = key(EventType::Down, B);
        assert!(!rule.remap(&mut ctx, &mut params));
        assert!(!params.is_remapped());
        assert!(out.is_empty());
    }

    #[test]
    fn test_key_to_key_stray_up_not_claimed() {
        let (mut ctx, out) = context();
        let mut rule = KeyToKey::new(A, Flags::empty(), B, Flags::empty());
        assert!(!rule.remap(&mut ctx, &mut key(EventType::Up, A)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_key_to_key_from_flags_consumed() {
        let (mut ctx, out) = context();
        ctx.flag_status.increase(Flags::CONTROL_L, ctx.now);
        let mut rule = KeyToKey::new(A, Flags::CONTROL_L, B, Flags::SHIFT_L);

        assert!(rule.remap(&mut ctx, &mut key(EventType::Down, A)));
        let keys = out.take_keys();
        assert_eq!(keys[0].flags, Flags::SHIFT_L);

        assert!(rule.remap(&mut ctx, &mut key(EventType::Up, A)));
        assert_eq!(ctx.flag_status.make_flags(), Flags::CONTROL_L);
    }

    #[test]
    fn test_key_to_key_exact_flags() {
        let (mut ctx, out) = context();
        ctx.flag_status.increase(Flags::SHIFT_L | Flags::CONTROL_L, ctx.now);
        let mut rule = KeyToKey::new(A, Flags::SHIFT_L | Flags::EXACT, B, Flags::empty());
        assert!(!rule.remap(&mut ctx, &mut key(EventType::Down, A)));
        assert!(out.is_empty());

        ctx.flag_status.decrease(Flags::CONTROL_L);
        assert!(rule.remap(&mut ctx, &mut key(EventType::Down, A)));
    }

    #[test]
    fn test_modifier_to_modifier() {
        let (mut ctx, out) = context();
        let mut rule = KeyToKey::new(SHIFT_L, Flags::empty(), CTRL_L, Flags::empty());

        // raw tracking happens before the chain
        ctx.flag_status.increase(Flags::SHIFT_L, ctx.now);
        assert!(rule.remap(&mut ctx, &mut key(EventType::Modify, SHIFT_L)));
        ctx.flag_status.decrease(Flags::SHIFT_L);
        assert!(rule.remap(&mut ctx, &mut modifier_up(SHIFT_L)));

        let keys = out.take_keys();
        assert_eq!((keys[0].event_type, keys[0].key, keys[0].flags), (EventType::Modify, CTRL_L, Flags::CONTROL_L));
        assert_eq!((keys[1].event_type, keys[1].flags), (EventType::Modify, Flags::empty()));
        assert_eq!(ctx.flag_status.make_flags(), Flags::empty());
    }

    #[test]
    fn test_modifier_to_plain_key() {
        let (mut ctx, out) = context();
        let mut rule = KeyToKey::new(SHIFT_L, Flags::empty(), A, Flags::empty());

        ctx.flag_status.increase(Flags::SHIFT_L, ctx.now);
        assert!(rule.remap(&mut ctx, &mut key(EventType::Modify, SHIFT_L)));
        let keys = out.take_keys();
        assert_eq!((keys[0].event_type, keys[0].flags), (EventType::Down, Flags::empty()));
    }

    #[test]
    fn test_without_repeat_cancels() {
        let (mut ctx, _out) = context();
        ctx.keyboard_repeat.set(ctx.now, EventType::Down, Flags::empty(), B, KeyboardType::NONE, 500, 83);
        let mut rule = KeyToKey::new(A, Flags::empty(), B, Flags::empty()).without_repeat();
        assert!(rule.remap(&mut ctx, &mut key(EventType::Down, A)));
        assert!(!ctx.keyboard_repeat.is_armed());
    }

    #[test]
    fn test_already_remapped_is_skipped() {
        let (mut ctx, out) = context();
        let mut rule = KeyToKey::new(A, Flags::empty(), B, Flags::empty());
        let mut params = key(EventType::Down, A);
        params.set_remapped();
        assert!(!rule.remap(&mut ctx, &mut params));
        assert!(out.is_empty());
    }

    #[test]
    fn test_key_to_consumer() {
        let (mut ctx, out) = context();
        let volume_up = ConsumerKeyCode(115);
        let mut rule = KeyToConsumer::new(KeyCode(68), Flags::empty(), volume_up, Flags::empty());

        assert!(rule.remap(&mut ctx, &mut key(EventType::Down, KeyCode(68))));
        assert!(ctx.keyboard_repeat.is_armed());
        assert!(rule.remap(&mut ctx, &mut key(EventType::Up, KeyCode(68))));

        let events = out.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], OutputEvent::Consumer(c) if c.key == volume_up && c.event_type == EventType::Down));
        assert!(matches!(events[1], OutputEvent::Consumer(c) if c.event_type == EventType::Up));
        assert!(!ctx.keyboard_repeat.is_armed());
    }

    #[test]
    fn test_consumer_to_key() {
        let (mut ctx, out) = context();
        let mut rule = ConsumerToKey::new(ConsumerKeyCode(113), Flags::empty(), A, Flags::CONTROL_L);
        let down = ConsumerEvent::new(EventType::Down, Flags::empty(), ConsumerKeyCode(113), false);
        let up = ConsumerEvent { event_type: EventType::Up, ..down };

        assert!(rule.remap(&mut ctx, &mut RemapConsumerParams::new(down)));
        assert!(rule.remap(&mut ctx, &mut RemapConsumerParams::new(up)));

        let keys = out.take_keys();
        assert_eq!((keys[0].key, keys[0].flags), (A, Flags::CONTROL_L));
        assert_eq!((keys[1].event_type, keys[1].flags), (EventType::Up, Flags::empty()));
    }

    #[test]
    fn test_consumer_to_consumer() {
        let (mut ctx, out) = context();
        let mut rule = ConsumerToConsumer::new(
            ConsumerKeyCode(114),
            Flags::empty(),
            ConsumerKeyCode(115),
            Flags::empty(),
        );
        let down = ConsumerEvent::new(EventType::Down, Flags::empty(), ConsumerKeyCode(114), false);
        assert!(rule.remap(&mut ctx, &mut RemapConsumerParams::new(down)));
        assert_eq!(out.take()[0].as_consumer().map(|c| c.key), Some(ConsumerKeyCode(115)));

        let other = ConsumerEvent { key: ConsumerKeyCode(113), ..down };
        assert!(!rule.remap(&mut ctx, &mut RemapConsumerParams::new(other)));
    }
}

// hidremap Remap Engine
// Rule chain, pass-through, timer dispatch and lifecycle

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, RuleDef};
use crate::event::InputEvent;
use crate::interval::Clock;
use crate::output::EventOutput;
use crate::remap::{
    ConsumerToConsumer, ConsumerToKey, DoublePressModifier, HoldingKeyToKey,
    IgnoreMultipleSameKeyPress, KeyOverlaidModifier, KeyToConsumer, KeyToKey, KeyToPointingButton,
    ModifierHoldingKeyToKey, Parameters, PointingButtonToKey, PointingButtonToPointingButton,
    PointingRelativeToScroll, RemapConsumerParams, RemapContext, RemapParams, RemapPointerParams,
};
use crate::status::WatchedInput;
use crate::timer::earliest;
use crate::{
    Buttons, ConsumerEvent, EventType, KeyboardEvent, KeyboardType, PointingButton, RelativePointerEvent,
};

/// One translator instance of the rule chain
#[derive(Debug, Clone)]
pub enum RemapRule {
    KeyToKey(KeyToKey),
    ConsumerToConsumer(ConsumerToConsumer),
    KeyToConsumer(KeyToConsumer),
    ConsumerToKey(ConsumerToKey),
    PointingButtonToPointingButton(PointingButtonToPointingButton),
    KeyToPointingButton(KeyToPointingButton),
    PointingButtonToKey(PointingButtonToKey),
    PointingRelativeToScroll(PointingRelativeToScroll),
    KeyOverlaidModifier(KeyOverlaidModifier),
    DoublePressModifier(DoublePressModifier),
    ModifierHoldingKeyToKey(ModifierHoldingKeyToKey),
    HoldingKeyToKey(HoldingKeyToKey),
    IgnoreMultipleSameKeyPress(IgnoreMultipleSameKeyPress),
}

impl RemapRule {
    /// Build a fresh translator, with no state carried over
    pub fn from_def(def: &RuleDef) -> Self {
        match *def {
            RuleDef::KeyToKey { from, to } => {
                RemapRule::KeyToKey(KeyToKey::new(from.key, from.flags, to.key, to.flags))
            }
            RuleDef::ConsumerToConsumer { from, to } => RemapRule::ConsumerToConsumer(
                ConsumerToConsumer::new(from.key, from.flags, to.key, to.flags),
            ),
            RuleDef::KeyToConsumer { from, to } => {
                RemapRule::KeyToConsumer(KeyToConsumer::new(from.key, from.flags, to.key, to.flags))
            }
            RuleDef::ConsumerToKey { from, to } => {
                RemapRule::ConsumerToKey(ConsumerToKey::new(from.key, from.flags, to.key, to.flags))
            }
            RuleDef::PointingButtonToPointingButton { from, to } => {
                RemapRule::PointingButtonToPointingButton(PointingButtonToPointingButton::new(
                    from.key, from.flags, to.key, to.flags,
                ))
            }
            RuleDef::KeyToPointingButton { from, to } => {
                RemapRule::KeyToPointingButton(KeyToPointingButton::new(from.key, from.flags, to))
            }
            RuleDef::PointingButtonToKey { from, to } => RemapRule::PointingButtonToKey(
                PointingButtonToKey::new(from.key, from.flags, to.key, to.flags),
            ),
            RuleDef::PointingRelativeToScroll { trigger, flags } => {
                RemapRule::PointingRelativeToScroll(PointingRelativeToScroll::new(trigger, flags))
            }
            RuleDef::KeyOverlaidModifier { from, to, fire, fire_repeat } => {
                let rule = KeyOverlaidModifier::new(
                    from.key, from.flags, to.key, to.flags, fire.key, fire.flags,
                );
                RemapRule::KeyOverlaidModifier(if fire_repeat { rule.with_fire_repeat() } else { rule })
            }
            RuleDef::DoublePressModifier { from, to, fire } => RemapRule::DoublePressModifier(
                DoublePressModifier::new(from, to, fire.key, fire.flags),
            ),
            RuleDef::ModifierHoldingKeyToKey { from, to } => RemapRule::ModifierHoldingKeyToKey(
                ModifierHoldingKeyToKey::new(from.key, from.flags, to),
            ),
            RuleDef::HoldingKeyToKey { from, normal, holding } => {
                RemapRule::HoldingKeyToKey(HoldingKeyToKey::new(
                    from.key,
                    from.flags,
                    normal.key,
                    normal.flags,
                    holding.key,
                    holding.flags,
                ))
            }
            RuleDef::IgnoreMultipleSameKeyPress { from } => RemapRule::IgnoreMultipleSameKeyPress(
                IgnoreMultipleSameKeyPress::new(from.key, from.flags),
            ),
        }
    }

    /// Offer a key event; rules of other input kinds decline
    pub fn remap_key(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        match self {
            RemapRule::KeyToKey(r) => r.remap(ctx, params),
            RemapRule::KeyToConsumer(r) => r.remap(ctx, params),
            RemapRule::KeyToPointingButton(r) => r.remap(ctx, params),
            RemapRule::KeyOverlaidModifier(r) => r.remap(ctx, params),
            RemapRule::DoublePressModifier(r) => r.remap(ctx, params),
            RemapRule::ModifierHoldingKeyToKey(r) => r.remap(ctx, params),
            RemapRule::HoldingKeyToKey(r) => r.remap(ctx, params),
            RemapRule::IgnoreMultipleSameKeyPress(r) => r.remap(ctx, params),
            _ => false,
        }
    }

    pub fn remap_consumer(&mut self, ctx: &mut RemapContext, params: &mut RemapConsumerParams) -> bool {
        match self {
            RemapRule::ConsumerToConsumer(r) => r.remap(ctx, params),
            RemapRule::ConsumerToKey(r) => r.remap(ctx, params),
            _ => false,
        }
    }

    pub fn remap_pointer(&mut self, ctx: &mut RemapContext, params: &mut RemapPointerParams) -> bool {
        match self {
            RemapRule::PointingButtonToPointingButton(r) => r.remap(ctx, params),
            RemapRule::PointingButtonToKey(r) => r.remap(ctx, params),
            RemapRule::PointingRelativeToScroll(r) => r.remap(ctx, params),
            _ => false,
        }
    }
}

/// A rule plus the name it was configured under
#[derive(Debug, Clone)]
pub struct NamedRule {
    pub name: String,
    pub rule: RemapRule,
}

impl NamedRule {
    pub fn new(name: impl Into<String>, rule: RemapRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Holding,
    Repeat,
}

/// The remapping engine.
///
/// Owns the dispatch context and the rule chain. Raw events and timer
/// fires both go through `&mut self`, so they are serialized by
/// construction. Each engine is independent; tests build as many as they
/// like.
pub struct RemapEngine {
    ctx: RemapContext,
    rules: Vec<NamedRule>,
    clock: Arc<dyn Clock>,
    keyboard_type: Option<KeyboardType>,
    initialized: bool,
}

impl RemapEngine {
    pub fn new(
        rules: Vec<NamedRule>,
        parameters: Parameters,
        output: Box<dyn EventOutput + Send>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            ctx: RemapContext::new(output, parameters, now),
            rules,
            clock,
            keyboard_type: None,
            initialized: false,
        }
    }

    /// Build the enabled rules of `config` into a fresh engine
    pub fn from_config(
        config: &Config,
        output: Box<dyn EventOutput + Send>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rules = config
            .enabled_rules()
            .map(|r| NamedRule::new(r.name.clone(), RemapRule::from_def(&r.def)))
            .collect::<Vec<_>>();
        log::debug!("Engine built with {} rule(s)", rules.len());
        let mut engine = Self::new(rules, config.parameters, output, clock);
        engine.set_keyboard_type(config.general.keyboard_type.map(KeyboardType));
        engine
    }

    /// Stamp `keyboard_type` on translated key events instead of the type
    /// each event arrived with. `None` keeps the device's own.
    pub fn set_keyboard_type(&mut self, keyboard_type: Option<KeyboardType>) {
        self.keyboard_type = keyboard_type;
    }

    /// Bind the timers to this dispatch context. Idempotent.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.ctx.keyboard_repeat.initialize();
        self.ctx.holding.initialize();
        self.initialized = true;
        log::info!("Remap engine initialized with {} rule(s)", self.rules.len());
    }

    /// Cancel every pending sequence, clear the trackers and release the
    /// timers. Idempotent.
    pub fn terminate(&mut self) {
        if !self.initialized {
            return;
        }
        self.ctx.reset();
        self.ctx.keyboard_repeat.terminate();
        self.ctx.holding.terminate();
        self.initialized = false;
        log::info!("Remap engine terminated");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn rules(&self) -> &[NamedRule] {
        &self.rules
    }

    pub fn parameters(&self) -> &Parameters {
        &self.ctx.parameters
    }

    /// Read-only view of the dispatch context
    pub fn context(&self) -> &RemapContext {
        &self.ctx
    }

    /// Deliver one raw event. Returns true if a rule claimed it.
    pub fn handle_event(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Key(e) => self.handle_key(e),
            InputEvent::Consumer(e) => self.handle_consumer(e),
            InputEvent::RelativePointer(e) => self.handle_relative_pointer(e),
            InputEvent::ScrollWheel(e) => {
                self.begin_dispatch();
                self.ctx.fire_scroll_wheel(&e);
                false
            }
        }
    }

    /// Deliver one raw key event
    pub fn handle_key(&mut self, event: KeyboardEvent) -> bool {
        self.begin_dispatch();
        if event.repeat {
            log::trace!("drop hardware repeat {}", event);
            return false;
        }

        let event = self.normalize_key(event);
        self.ctx.flag_status.set(&event, self.ctx.now);
        let event = self.with_current_flags(event);
        if event.is_key_down() {
            self.ctx.event_watcher.countup(WatchedInput::Key(event.key));
        }

        let mut params = RemapParams::new(event);
        if let Some(keyboard_type) = self.keyboard_type {
            params = params.with_keyboard_type(keyboard_type);
        }
        for named in self.rules.iter_mut() {
            if named.rule.remap_key(&mut self.ctx, &mut params) {
                log::trace!("'{}' claimed {}", named.name, event);
                return true;
            }
        }

        log::trace!("pass {}", event);
        let flags = self.ctx.flag_status.make_flags();
        let keyboard_type = params.keyboard_type;
        self.ctx
            .fire_key(event.event_type, flags, event.key, keyboard_type);
        self.ctx
            .set_key_repeat(event.event_type, flags, event.key, keyboard_type);
        false
    }

    /// Deliver one raw consumer key event
    pub fn handle_consumer(&mut self, event: ConsumerEvent) -> bool {
        self.begin_dispatch();
        if event.repeat {
            log::trace!("drop hardware repeat {}", event);
            return false;
        }

        let mut event = event;
        event.flags = self.ctx.flag_status.make_flags();
        if event.is_key_down() {
            self.ctx.event_watcher.countup(WatchedInput::Consumer(event.key));
        }

        let mut params = RemapConsumerParams::new(event);
        for named in self.rules.iter_mut() {
            if named.rule.remap_consumer(&mut self.ctx, &mut params) {
                log::trace!("'{}' claimed {}", named.name, event);
                return true;
            }
        }

        log::trace!("pass {}", event);
        let flags = self.ctx.flag_status.make_flags();
        self.ctx.fire_consumer(event.event_type, flags, event.key);
        self.ctx.set_consumer_repeat(event.event_type, flags, event.key);
        false
    }

    /// Deliver one raw pointer report.
    ///
    /// The report is split into one step per changed button (releases
    /// first) and one motion step, each offered to the chain on its own.
    /// Returns true if any step was claimed.
    pub fn handle_relative_pointer(&mut self, event: RelativePointerEvent) -> bool {
        self.begin_dispatch();
        let (pressed, released) = self.ctx.button_status.set(event.buttons);
        let mut claimed = false;

        for button in single_buttons(released) {
            let params = RemapPointerParams::button_edge(event, button, false);
            claimed |= self.dispatch_pointer(params);
        }
        for button in single_buttons(pressed) {
            self.ctx.event_watcher.countup(WatchedInput::Button(button));
            let params = RemapPointerParams::button_edge(event, button, true);
            claimed |= self.dispatch_pointer(params);
        }
        if event.dx != 0 || event.dy != 0 {
            claimed |= self.dispatch_pointer(RemapPointerParams::motion(event));
        }
        claimed
    }

    fn dispatch_pointer(&mut self, mut params: RemapPointerParams) -> bool {
        for named in self.rules.iter_mut() {
            if named.rule.remap_pointer(&mut self.ctx, &mut params) {
                log::trace!("'{}' claimed pointer {}", named.name, params.event);
                return true;
            }
        }
        let buttons = self.ctx.button_status.make_buttons();
        self.ctx
            .fire_relative_pointer(buttons, params.event.dx, params.event.dy);
        false
    }

    /// Fire every timer that is due at the clock's current time, earliest
    /// deadline first. Each timer fires at most once per call.
    pub fn dispatch_timers(&mut self) -> usize {
        self.ctx.now = self.clock.now();
        self.dispatch_due_timers()
    }

    /// When the event loop should wake up next, if anything is armed
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            self.ctx.keyboard_repeat.next_deadline(),
            self.ctx.holding.next_deadline(),
        )
    }

    fn begin_dispatch(&mut self) {
        self.ctx.now = self.clock.now();
        self.dispatch_due_timers();
    }

    fn dispatch_due_timers(&mut self) -> usize {
        let now = self.ctx.now;
        let mut order = [
            (TimerKind::Holding, self.ctx.holding.next_deadline()),
            (TimerKind::Repeat, self.ctx.keyboard_repeat.next_deadline()),
        ];
        order.sort_by_key(|(_, deadline)| *deadline);

        let mut fired = 0;
        for (kind, _) in order {
            match kind {
                TimerKind::Holding => {
                    if self.ctx.holding.take_if_due(now) {
                        self.ctx.fire_holding();
                        fired += 1;
                    }
                }
                TimerKind::Repeat => {
                    if self.ctx.dispatch_repeat() {
                        fired += 1;
                    }
                }
            }
        }
        fired
    }

    /// Turn a raw modifier press/release into MODIFY carrying the
    /// resulting flags
    fn normalize_key(&self, mut event: KeyboardEvent) -> KeyboardEvent {
        let own = event.key.modifier_flags();
        if own.is_empty() || event.event_type == EventType::Modify {
            return event;
        }
        let held = self.ctx.flag_status.make_flags();
        event.flags = if event.event_type == EventType::Down {
            held | own
        } else {
            held.difference(own)
        };
        event.event_type = EventType::Modify;
        event
    }

    fn with_current_flags(&self, mut event: KeyboardEvent) -> KeyboardEvent {
        let own = event.key.modifier_flags();
        let held = self.ctx.flag_status.make_flags();
        event.flags = if own.is_empty() {
            held
        } else if event.flags.intersects(own) {
            held | own
        } else {
            held.difference(own)
        };
        event
    }
}

impl Drop for RemapEngine {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn single_buttons(buttons: Buttons) -> impl Iterator<Item = PointingButton> {
    (0..8)
        .filter_map(PointingButton::from_index)
        .filter(move |b| buttons.contains(b.buttons()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::ManualClock;
    use crate::output::RecordingOutput;
    use crate::{Flags, KeyCode, KeyboardType};

    const A: KeyCode = KeyCode(30);
    const B: KeyCode = KeyCode(48);
    const SHIFT_L: KeyCode = KeyCode(42);

    fn engine(rules: Vec<NamedRule>) -> (RemapEngine, RecordingOutput, ManualClock) {
        let out = RecordingOutput::new();
        let clock = ManualClock::new();
        let mut engine = RemapEngine::new(
            rules,
            Parameters::default(),
            Box::new(out.clone()),
            Arc::new(clock.clone()),
        );
        engine.initialize();
        (engine, out, clock)
    }

    fn key(event_type: EventType, key: KeyCode) -> KeyboardEvent {
        KeyboardEvent::new(event_type, Flags::empty(), key, KeyboardType::NONE, false)
    }

    #[test]
    fn test_pass_through_with_flags() {
        let (mut engine, out, _clock) = engine(vec![]);
        assert!(!engine.handle_key(key(EventType::Down, SHIFT_L)));
        assert!(!engine.handle_key(key(EventType::Down, A)));
        let keys = out.take_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!((keys[0].event_type, keys[0].flags), (EventType::Modify, Flags::SHIFT_L));
        assert_eq!((keys[1].event_type, keys[1].key, keys[1].flags), (EventType::Down, A, Flags::SHIFT_L));

        engine.handle_key(key(EventType::Up, SHIFT_L));
        let keys = out.take_keys();
        assert_eq!((keys[0].event_type, keys[0].flags), (EventType::Modify, Flags::empty()));
    }

    #[test]
    fn test_hardware_repeat_dropped() {
        let (mut engine, out, _clock) = engine(vec![]);
        let mut event = key(EventType::Down, A);
        event.repeat = true;
        assert!(!engine.handle_key(event));
        assert!(out.is_empty());
    }

    #[test]
    fn test_first_claim_wins() {
        let rules = vec![
            NamedRule::new("a-to-b", RemapRule::KeyToKey(KeyToKey::new(A, Flags::empty(), B, Flags::empty()))),
            NamedRule::new("a-to-shift", RemapRule::KeyToKey(KeyToKey::new(A, Flags::empty(), SHIFT_L, Flags::empty()))),
        ];
        let (mut engine, out, _clock) = engine(rules);
        assert!(engine.handle_key(key(EventType::Down, A)));
        let keys = out.take_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key, B);
    }

    #[test]
    fn test_keyboard_type_override() {
        let rules = vec![NamedRule::new(
            "a-to-b",
            RemapRule::KeyToKey(KeyToKey::new(A, Flags::empty(), B, Flags::empty())),
        )];
        let (mut engine, out, _clock) = engine(rules);
        let mut event = key(EventType::Down, A);
        event.keyboard_type = KeyboardType(40);
        engine.handle_key(event);
        assert_eq!(out.take_keys()[0].keyboard_type, KeyboardType(40));

        engine.set_keyboard_type(Some(KeyboardType(3)));
        engine.handle_key(event);
        let mut passed = key(EventType::Down, SHIFT_L);
        passed.keyboard_type = KeyboardType(40);
        engine.handle_key(passed);
        let keys = out.take_keys();
        assert!(keys.iter().all(|k| k.keyboard_type == KeyboardType(3)));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_pass_through_repeats() {
        let (mut engine, out, clock) = engine(vec![]);
        engine.handle_key(key(EventType::Down, A));
        out.clear();
        clock.advance_ms(500);
        assert_eq!(engine.dispatch_timers(), 1);
        let keys = out.take_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!((keys[0].event_type, keys[0].key), (EventType::Down, A));

        engine.handle_key(key(EventType::Up, A));
        assert!(engine.next_deadline().is_none());
    }

    #[test]
    fn test_lifecycle_idempotent() {
        let (mut engine, _out, _clock) = engine(vec![]);
        engine.initialize();
        assert!(engine.is_initialized());
        engine.handle_key(key(EventType::Down, A));
        assert!(engine.next_deadline().is_some());
        engine.terminate();
        engine.terminate();
        assert!(!engine.is_initialized());
        assert!(engine.next_deadline().is_none());
    }
}

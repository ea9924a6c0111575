// hidremap Pointer Translators
// Button substitution across the pointer and key domains, and motion to scroll

use super::context::RemapContext;
use super::key_to_key::{fire_substitute_key, KeyToKey};
use super::params::{RemapParams, RemapPointerParams};
use crate::interval::IntervalChecker;
use crate::{Flags, KeyCode, PointingButton, ScrollWheelEvent};

/// 16.16 fixed point scale of scroll deltas
pub const POINTING_FIXED_SCALE: i32 = 65536;
/// Pixel scale of scroll deltas
pub const POINTING_POINT_SCALE: i32 = 10;

const PIXELS_PER_LINE: i32 = 4;
const BUFFER_TIMEOUT_MS: u64 = 100;
const GESTURE_GAP_MS: u64 = 300;
const AXIS_DECISION_MS: u64 = 50;

/// Substitute one pointer button for another
#[derive(Debug, Clone)]
pub struct PointingButtonToPointingButton {
    from_button: PointingButton,
    from_flags: Flags,
    to_button: PointingButton,
    to_flags: Flags,
    active: bool,
}

impl PointingButtonToPointingButton {
    pub fn new(
        from_button: PointingButton,
        from_flags: Flags,
        to_button: PointingButton,
        to_flags: Flags,
    ) -> Self {
        Self {
            from_button,
            from_flags,
            to_button,
            to_flags,
            active: false,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapPointerParams) -> bool {
        if params.is_remapped() || params.button != self.from_button || self.from_button.is_none() {
            return false;
        }
        let is_down = params.is_button_down;
        if is_down {
            if !ctx.flag_status.make_flags().is_on(self.from_flags) {
                return false;
            }
            self.active = true;
        } else {
            if !self.active {
                return false;
            }
            self.active = false;
        }
        params.set_remapped();

        let from_flags = self.from_flags.stripped();
        let to_flags = self.to_flags.stripped();
        if is_down {
            ctx.button_status.decrease(self.from_button.buttons());
            ctx.button_status.increase(self.to_button.buttons());
            ctx.flag_status.consume(from_flags);
            ctx.flag_status.increase(to_flags, ctx.now);
        } else {
            ctx.button_status.increase(self.from_button.buttons());
            ctx.button_status.decrease(self.to_button.buttons());
            ctx.flag_status.restore(from_flags);
            ctx.flag_status.decrease(to_flags);
        }

        let buttons = ctx.button_status.make_buttons();
        ctx.fire_relative_pointer(buttons, params.event.dx, params.event.dy);
        true
    }
}

/// Turn a physical key into a pointer button
#[derive(Debug, Clone)]
pub struct KeyToPointingButton {
    key_to_key: KeyToKey,
    to_button: PointingButton,
}

impl KeyToPointingButton {
    pub fn new(from_key: KeyCode, from_flags: Flags, to_button: PointingButton) -> Self {
        Self {
            key_to_key: KeyToKey::pseudo(from_key, from_flags),
            to_button,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if !self.key_to_key.remap(ctx, params) {
            return false;
        }
        if params.is_key_down() {
            ctx.button_status.increase(self.to_button.buttons());
        } else {
            ctx.button_status.decrease(self.to_button.buttons());
        }
        let buttons = ctx.button_status.make_buttons();
        ctx.fire_relative_pointer(buttons, 0, 0);
        true
    }
}

/// Turn a pointer button into a physical key
#[derive(Debug, Clone)]
pub struct PointingButtonToKey {
    button_to_button: PointingButtonToPointingButton,
    to_key: KeyCode,
    to_flags: Flags,
}

impl PointingButtonToKey {
    pub fn new(from_button: PointingButton, from_flags: Flags, to_key: KeyCode, to_flags: Flags) -> Self {
        Self {
            button_to_button: PointingButtonToPointingButton::new(
                from_button,
                from_flags,
                PointingButton::NONE,
                Flags::empty(),
            ),
            to_key,
            to_flags,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapPointerParams) -> bool {
        if !self.button_to_button.remap(ctx, params) {
            return false;
        }
        fire_substitute_key(
            ctx,
            params.is_button_down,
            self.to_key,
            self.to_flags,
            crate::KeyboardType::NONE,
            true,
        );
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollAxis {
    Vertical,
    Horizontal,
}

/// Turn pointer motion into scroll wheel events.
///
/// With a trigger button, motion scrolls while the button is held, and a
/// short, nearly stationary press is delivered as a plain click. Without
/// one, motion scrolls while `from_flags` are held.
#[derive(Debug, Clone)]
pub struct PointingRelativeToScroll {
    trigger: PointingButton,
    from_flags: Flags,
    active: bool,

    absolute_distance: u32,
    begin_ic: IntervalChecker,

    buffered_ic: IntervalChecker,
    buffered_delta1: i32,
    buffered_delta2: i32,

    fixation_ic: IntervalChecker,
    fixation_begin_ic: IntervalChecker,
    fixation_delta1: u32,
    fixation_delta2: u32,
    axis: Option<ScrollAxis>,
}

impl PointingRelativeToScroll {
    pub fn new(trigger: PointingButton, from_flags: Flags) -> Self {
        Self {
            trigger,
            from_flags,
            active: false,
            absolute_distance: 0,
            begin_ic: IntervalChecker::new(),
            buffered_ic: IntervalChecker::new(),
            buffered_delta1: 0,
            buffered_delta2: 0,
            fixation_ic: IntervalChecker::new(),
            fixation_begin_ic: IntervalChecker::new(),
            fixation_delta1: 0,
            fixation_delta2: 0,
            axis: None,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapPointerParams) -> bool {
        if params.is_remapped() {
            return false;
        }

        if self.trigger.is_none() {
            if !params.is_motion() || !ctx.flag_status.make_flags().is_on(self.from_flags) {
                return false;
            }
            params.set_remapped();
            self.to_scroll(ctx, params.event.dx, params.event.dy);
            return true;
        }

        if params.button == self.trigger {
            return self.remap_trigger(ctx, params);
        }

        if self.active && params.is_motion() {
            params.set_remapped();
            self.to_scroll(ctx, params.event.dx, params.event.dy);
            return true;
        }
        false
    }

    fn remap_trigger(&mut self, ctx: &mut RemapContext, params: &mut RemapPointerParams) -> bool {
        let now = ctx.now;
        let trigger = self.trigger.buttons();

        if params.is_button_down {
            if !ctx.flag_status.make_flags().is_on(self.from_flags) {
                return false;
            }
            self.active = true;
            self.absolute_distance = 0;
            self.begin_ic.begin(now);
            ctx.button_status.decrease(trigger);
            params.set_remapped();
            return true;
        }

        if !self.active {
            return false;
        }
        self.active = false;
        ctx.button_status.increase(trigger);
        params.set_remapped();

        let max_distance = ctx.parameters.pointing_button_click_max_distance;
        let timeout = ctx.parameters.pointing_button_click_timeout_ms;
        if self.absolute_distance <= max_distance && !self.begin_ic.check_threshold(now, timeout) {
            log::debug!("PointingRelativeToScroll click {}", self.trigger);
            let held = ctx.button_status.make_buttons();
            ctx.fire_relative_pointer(held | trigger, 0, 0);
            ctx.fire_relative_pointer(held, 0, 0);
        }
        true
    }

    fn to_scroll(&mut self, ctx: &mut RemapContext, dx: i32, dy: i32) {
        let now = ctx.now;
        let mut delta1 = -dy;
        let mut delta2 = -dx;
        self.absolute_distance = self
            .absolute_distance
            .saturating_add(delta1.unsigned_abs())
            .saturating_add(delta2.unsigned_abs());

        // A pause ends the gesture; the next one decides its axis afresh
        if self.fixation_ic.check_threshold(now, GESTURE_GAP_MS) {
            self.fixation_begin_ic.begin(now);
            self.fixation_delta1 = 0;
            self.fixation_delta2 = 0;
            self.axis = None;
        }
        self.fixation_ic.begin(now);

        if self.axis.is_none() {
            self.fixation_delta1 += delta1.unsigned_abs();
            self.fixation_delta2 += delta2.unsigned_abs();
            if self.fixation_begin_ic.check_threshold(now, AXIS_DECISION_MS) {
                self.axis = Some(if self.fixation_delta1 >= self.fixation_delta2 {
                    ScrollAxis::Vertical
                } else {
                    ScrollAxis::Horizontal
                });
            }
        }
        match self.axis {
            Some(ScrollAxis::Vertical) => delta2 = 0,
            Some(ScrollAxis::Horizontal) => delta1 = 0,
            None => {}
        }

        if self.buffered_ic.check_threshold(now, BUFFER_TIMEOUT_MS) {
            self.buffered_delta1 = 0;
            self.buffered_delta2 = 0;
        }
        self.buffered_ic.begin(now);
        self.buffered_delta1 += delta1;
        self.buffered_delta2 += delta2;

        let lines1 = self.buffered_delta1 / PIXELS_PER_LINE;
        let lines2 = self.buffered_delta2 / PIXELS_PER_LINE;
        self.buffered_delta1 -= lines1 * PIXELS_PER_LINE;
        self.buffered_delta2 -= lines2 * PIXELS_PER_LINE;

        if delta1 == 0 && delta2 == 0 {
            return;
        }

        let event = ScrollWheelEvent {
            delta_axis1: lines1,
            delta_axis2: lines2,
            fixed_delta1: delta1.saturating_mul(POINTING_FIXED_SCALE) / PIXELS_PER_LINE,
            fixed_delta2: delta2.saturating_mul(POINTING_FIXED_SCALE) / PIXELS_PER_LINE,
            point_delta1: delta1.saturating_mul(POINTING_POINT_SCALE),
            point_delta2: delta2.saturating_mul(POINTING_POINT_SCALE),
        };
        ctx.fire_scroll_wheel(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputEvent, RecordingOutput};
    use crate::remap::context::Parameters;
    use crate::{Buttons, EventType, KeyboardEvent, KeyboardType, RelativePointerEvent};
    use std::time::{Duration, Instant};

    fn context() -> (RemapContext, RecordingOutput) {
        let out = RecordingOutput::new();
        let mut ctx = RemapContext::new(Box::new(out.clone()), Parameters::default(), Instant::now());
        ctx.keyboard_repeat.initialize();
        (ctx, out)
    }

    fn edge(ctx: &mut RemapContext, raw: Buttons, button: PointingButton, down: bool) -> RemapPointerParams {
        ctx.button_status.set(raw);
        RemapPointerParams::button_edge(RelativePointerEvent::new(raw, 0, 0), button, down)
    }

    fn motion(raw: Buttons, dx: i32, dy: i32) -> RemapPointerParams {
        RemapPointerParams::motion(RelativePointerEvent::new(raw, dx, dy))
    }

    #[test]
    fn test_button_to_button() {
        let (mut ctx, out) = context();
        let mut rule = PointingButtonToPointingButton::new(
            PointingButton::MIDDLE,
            Flags::empty(),
            PointingButton::LEFT,
            Flags::empty(),
        );

        let mut down = edge(&mut ctx, Buttons::MIDDLE, PointingButton::MIDDLE, true);
        assert!(rule.remap(&mut ctx, &mut down));
        let mut up = edge(&mut ctx, Buttons::empty(), PointingButton::MIDDLE, false);
        assert!(rule.remap(&mut ctx, &mut up));

        let events = out.take();
        assert_eq!(events[0].as_relative_pointer().map(|p| p.buttons), Some(Buttons::LEFT));
        assert_eq!(events[1].as_relative_pointer().map(|p| p.buttons), Some(Buttons::empty()));
    }

    #[test]
    fn test_button_to_button_other_button() {
        let (mut ctx, out) = context();
        let mut rule = PointingButtonToPointingButton::new(
            PointingButton::MIDDLE,
            Flags::empty(),
            PointingButton::LEFT,
            Flags::empty(),
        );
        let mut down = edge(&mut ctx, Buttons::RIGHT, PointingButton::RIGHT, true);
        assert!(!rule.remap(&mut ctx, &mut down));
        assert!(!rule.remap(&mut ctx, &mut motion(Buttons::RIGHT, 1, 1)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_key_to_pointing_button() {
        let (mut ctx, out) = context();
        let mut rule = KeyToPointingButton::new(KeyCode(30), Flags::empty(), PointingButton::LEFT);
        let down = KeyboardEvent::new(EventType::Down, Flags::empty(), KeyCode(30), KeyboardType::NONE, false);
        let up = KeyboardEvent { event_type: EventType::Up, ..down };

        assert!(rule.remap(&mut ctx, &mut RemapParams::new(down)));
        assert!(!ctx.keyboard_repeat.is_armed());
        assert!(rule.remap(&mut ctx, &mut RemapParams::new(up)));

        let events = out.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_relative_pointer().map(|p| p.buttons), Some(Buttons::LEFT));
        assert_eq!(events[1].as_relative_pointer().map(|p| p.buttons), Some(Buttons::empty()));
    }

    #[test]
    fn test_pointing_button_to_key() {
        let (mut ctx, out) = context();
        let mut rule = PointingButtonToKey::new(PointingButton::BUTTON4, Flags::empty(), KeyCode(30), Flags::empty());

        let mut down = edge(&mut ctx, Buttons::BUTTON4, PointingButton::BUTTON4, true);
        assert!(rule.remap(&mut ctx, &mut down));
        assert!(ctx.keyboard_repeat.is_armed());
        let mut up = edge(&mut ctx, Buttons::empty(), PointingButton::BUTTON4, false);
        assert!(rule.remap(&mut ctx, &mut up));

        let keys: Vec<_> = out.take().iter().filter_map(|e| e.as_key().copied()).collect();
        assert_eq!(keys.len(), 2);
        assert_eq!((keys[0].event_type, keys[0].key), (EventType::Down, KeyCode(30)));
        assert_eq!(keys[1].event_type, EventType::Up);
        assert_eq!(ctx.button_status.make_buttons(), Buttons::empty());
    }

    #[test]
    fn test_scroll_with_trigger_button() {
        let (mut ctx, out) = context();
        let mut rule = PointingRelativeToScroll::new(PointingButton::MIDDLE, Flags::empty());

        let mut down = edge(&mut ctx, Buttons::MIDDLE, PointingButton::MIDDLE, true);
        assert!(rule.remap(&mut ctx, &mut down));
        assert_eq!(ctx.button_status.make_buttons(), Buttons::empty());

        // moving up scrolls up
        assert!(rule.remap(&mut ctx, &mut motion(Buttons::MIDDLE, 0, -8)));
        let events = out.take();
        let scroll = events[0].as_scroll_wheel().copied().unwrap();
        assert_eq!(scroll.delta_axis1, 2);
        assert_eq!(scroll.point_delta1, 80);
        assert_eq!(scroll.fixed_delta1, 2 * POINTING_FIXED_SCALE);

        ctx.now += Duration::from_millis(500);
        let mut up = edge(&mut ctx, Buttons::empty(), PointingButton::MIDDLE, false);
        assert!(rule.remap(&mut ctx, &mut up));
        // moved too far for a click
        assert!(out.is_empty());
        assert!(!rule.remap(&mut ctx, &mut motion(Buttons::empty(), 0, -8)));
    }

    #[test]
    fn test_scroll_trigger_click() {
        let (mut ctx, out) = context();
        let mut rule = PointingRelativeToScroll::new(PointingButton::MIDDLE, Flags::empty());

        let mut down = edge(&mut ctx, Buttons::MIDDLE, PointingButton::MIDDLE, true);
        assert!(rule.remap(&mut ctx, &mut down));
        ctx.now += Duration::from_millis(100);
        let mut up = edge(&mut ctx, Buttons::empty(), PointingButton::MIDDLE, false);
        assert!(rule.remap(&mut ctx, &mut up));

        let events = out.take();
        assert_eq!(
            events,
            vec![
                OutputEvent::RelativePointer(RelativePointerEvent::new(Buttons::MIDDLE, 0, 0)),
                OutputEvent::RelativePointer(RelativePointerEvent::new(Buttons::empty(), 0, 0)),
            ]
        );
    }

    #[test]
    fn test_scroll_buffers_small_moves() {
        let (mut ctx, out) = context();
        let mut rule = PointingRelativeToScroll::new(PointingButton::NONE, Flags::empty());

        assert!(rule.remap(&mut ctx, &mut motion(Buttons::empty(), 0, -2)));
        assert!(rule.remap(&mut ctx, &mut motion(Buttons::empty(), 0, -2)));
        let lines: Vec<i32> = out
            .take()
            .iter()
            .filter_map(|e| e.as_scroll_wheel().map(|s| s.delta_axis1))
            .collect();
        assert_eq!(lines, vec![0, 1]);
    }

    #[test]
    fn test_scroll_axis_fixation() {
        let (mut ctx, out) = context();
        let mut rule = PointingRelativeToScroll::new(PointingButton::NONE, Flags::empty());

        rule.remap(&mut ctx, &mut motion(Buttons::empty(), 1, -8));
        ctx.now += Duration::from_millis(60);
        rule.remap(&mut ctx, &mut motion(Buttons::empty(), 8, -4));

        let last = out.take().last().and_then(|e| e.as_scroll_wheel().copied()).unwrap();
        // vertical gesture: horizontal motion is dropped
        assert_eq!(last.delta_axis2, 0);
        assert_eq!(last.point_delta2, 0);
        assert_eq!(last.delta_axis1, 1);
    }

    #[test]
    fn test_scroll_flag_mode_requires_flags() {
        let (mut ctx, out) = context();
        let mut rule = PointingRelativeToScroll::new(PointingButton::NONE, Flags::FN);
        assert!(!rule.remap(&mut ctx, &mut motion(Buttons::empty(), 0, 4)));
        ctx.flag_status.increase(Flags::FN, ctx.now);
        assert!(rule.remap(&mut ctx, &mut motion(Buttons::empty(), 0, 4)));
        assert_eq!(out.len(), 1);
    }
}

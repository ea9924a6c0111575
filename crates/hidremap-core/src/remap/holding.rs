// hidremap Holding Key To Key
// Hold-vs-tap disambiguation with one shared timer for all rules

use std::sync::atomic::{AtomicU32, Ordering};

use super::context::RemapContext;
use super::key_to_key::{fire_substitute_key, KeyToKey};
use super::params::RemapParams;
use crate::timer::Timer;
use crate::{Flags, KeyCode, KeyboardType};

static NEXT_OWNER: AtomicU32 = AtomicU32::new(1);

fn next_owner() -> u32 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingPhase {
    /// Pressed, waiting for the hold threshold
    Pending,
    /// Threshold passed, the holding substitute is down
    Holding,
}

/// The one hold-vs-tap sequence in progress
#[derive(Debug, Clone, Copy)]
struct HoldingSequence {
    owner: u32,
    phase: HoldingPhase,
    normal_key: KeyCode,
    normal_flags: Flags,
    holding_key: KeyCode,
    holding_flags: Flags,
    keyboard_type: KeyboardType,
}

/// Timer and sequence shared by every HoldingKeyToKey rule.
///
/// Sequences never overlap: a new press first settles the old one.
#[derive(Debug, Clone)]
pub struct HoldingState {
    timer: Timer,
    active: Option<HoldingSequence>,
}

impl Default for HoldingState {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldingState {
    pub fn new() -> Self {
        Self {
            timer: Timer::new("holding_key_to_key"),
            active: None,
        }
    }

    pub fn initialize(&mut self) {
        self.timer.bind();
    }

    pub fn terminate(&mut self) {
        self.timer.unbind();
        self.active = None;
    }

    /// Drop the sequence without emitting anything
    pub fn reset(&mut self) {
        self.timer.cancel();
        self.active = None;
    }

    pub fn phase(&self) -> Option<HoldingPhase> {
        self.active.map(|s| s.phase)
    }

    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.timer.deadline()
    }

    pub(crate) fn take_if_due(&mut self, now: std::time::Instant) -> bool {
        self.timer.take_if_due(now)
    }
}

impl RemapContext {
    /// Hold threshold reached: press the holding substitute
    pub(crate) fn fire_holding(&mut self) {
        let Some(seq) = self.holding.active.as_mut() else {
            return;
        };
        if seq.phase != HoldingPhase::Pending {
            return;
        }
        seq.phase = HoldingPhase::Holding;
        let seq = *seq;
        log::debug!("HoldingKeyToKey hold {}", seq.holding_key);
        fire_substitute_key(self, true, seq.holding_key, seq.holding_flags, seq.keyboard_type, true);
    }

    /// Settle the sequence in progress, emitting whatever it still owes
    pub(crate) fn cancel_holding(&mut self) {
        self.holding.timer.cancel();
        let Some(seq) = self.holding.active.take() else {
            return;
        };
        match seq.phase {
            HoldingPhase::Pending => self.fire_holding_normal(&seq),
            HoldingPhase::Holding => {
                fire_substitute_key(self, false, seq.holding_key, seq.holding_flags, seq.keyboard_type, true);
            }
        }
    }

    fn fire_holding_normal(&mut self, seq: &HoldingSequence) {
        log::debug!("HoldingKeyToKey tap {}", seq.normal_key);
        let flags = self.flag_status.make_flags() | seq.normal_flags.stripped();
        self.fire_key_downup(flags, seq.normal_key, seq.keyboard_type);
        self.cancel_repeat();
    }
}

/// A key that is one key when tapped and another when held.
///
/// Every instance, clones included, owns its sequences under its own id.
#[derive(Debug)]
pub struct HoldingKeyToKey {
    owner: u32,
    key_to_key: KeyToKey,
    normal_key: KeyCode,
    normal_flags: Flags,
    holding_key: KeyCode,
    holding_flags: Flags,
}

impl HoldingKeyToKey {
    pub fn new(
        from_key: KeyCode,
        from_flags: Flags,
        normal_key: KeyCode,
        normal_flags: Flags,
        holding_key: KeyCode,
        holding_flags: Flags,
    ) -> Self {
        Self {
            owner: next_owner(),
            key_to_key: KeyToKey::pseudo(from_key, from_flags),
            normal_key,
            normal_flags,
            holding_key,
            holding_flags,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if !self.key_to_key.remap(ctx, params) {
            return false;
        }

        if params.is_key_down() {
            ctx.cancel_holding();
            ctx.holding.active = Some(HoldingSequence {
                owner: self.owner,
                phase: HoldingPhase::Pending,
                normal_key: self.normal_key,
                normal_flags: self.normal_flags,
                holding_key: self.holding_key,
                holding_flags: self.holding_flags,
                keyboard_type: params.keyboard_type,
            });
            let wait = ctx.parameters.holding_key_to_key_wait_ms;
            ctx.holding.timer.set_timeout_ms(ctx.now, wait);
            return true;
        }

        // A release settles only our own sequence
        if ctx.holding.active.is_some_and(|s| s.owner == self.owner) {
            ctx.cancel_holding();
        }
        true
    }
}

impl Clone for HoldingKeyToKey {
    fn clone(&self) -> Self {
        Self {
            owner: next_owner(),
            key_to_key: self.key_to_key.clone(),
            normal_key: self.normal_key,
            normal_flags: self.normal_flags,
            holding_key: self.holding_key,
            holding_flags: self.holding_flags,
        }
    }
}

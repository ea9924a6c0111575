// hidremap Ignore Multiple Same Key Press
// Keep only the first of consecutive presses of one key

use super::context::RemapContext;
use super::params::RemapParams;
use crate::status::WatchedInput;
use crate::{Flags, KeyCode};

/// Swallows a press of `from_key` when the raw press right before it was
/// the same key, along with the release that belongs to it.
///
/// Any other press in between re-validates the key. The rule never claims
/// the first press, so later rules still see it.
#[derive(Debug, Clone)]
pub struct IgnoreMultipleSameKeyPress {
    from_key: KeyCode,
    from_flags: Flags,
    ignoring: bool,
}

impl IgnoreMultipleSameKeyPress {
    pub fn new(from_key: KeyCode, from_flags: Flags) -> Self {
        Self {
            from_key,
            from_flags,
            ignoring: false,
        }
    }

    pub fn remap(&mut self, ctx: &mut RemapContext, params: &mut RemapParams) -> bool {
        if params.is_remapped() || params.event.key != self.from_key {
            return false;
        }

        if !params.is_key_down() {
            if !self.ignoring {
                return false;
            }
            self.ignoring = false;
            params.set_remapped();
            return true;
        }

        if !ctx.flag_status.make_flags().is_on(self.from_flags) {
            return false;
        }
        if ctx.event_watcher.previous() != Some(WatchedInput::Key(self.from_key)) {
            return false;
        }

        log::trace!("IgnoreMultipleSameKeyPress drop {}", self.from_key);
        self.ignoring = true;
        params.set_remapped();
        true
    }
}

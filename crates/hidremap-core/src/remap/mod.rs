// hidremap Remap Module
// Translators and the context they share

mod context;
mod holding;
mod ignore;
mod key_to_key;
mod overlay;
mod params;
mod pointing;

pub use context::{Parameters, RemapContext};
pub use holding::{HoldingKeyToKey, HoldingPhase, HoldingState};
pub use ignore::IgnoreMultipleSameKeyPress;
pub use key_to_key::{ConsumerToConsumer, ConsumerToKey, KeyToConsumer, KeyToKey};
pub use overlay::{DoublePressModifier, KeyOverlaidModifier, ModifierHoldingKeyToKey};
pub use params::{FromKeyChecker, RemapConsumerParams, RemapParams, RemapPointerParams};
pub use pointing::{
    KeyToPointingButton, PointingButtonToKey, PointingButtonToPointingButton,
    PointingRelativeToScroll, POINTING_FIXED_SCALE, POINTING_POINT_SCALE,
};

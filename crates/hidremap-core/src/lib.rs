// hidremap Core Library
// Event remapping engine: translators, key repeat, config and device plumbing

pub mod config;
pub mod device;
pub mod engine;
pub mod event;
pub mod event_type;
pub mod interval;
pub mod key;
pub mod modifier;
pub mod output;
pub mod pointing;
pub mod remap;
pub mod repeat;
pub mod status;
pub mod timer;

pub use config::{
    parse_combo_string, ComboParseError, Config, ConfigError, ParsedCombo, RuleConfig, RuleDef,
    RuleKind,
};
pub use device::{DeviceDescriptor, DeviceRole, HookPolicy, InputDecoder};
pub use engine::{NamedRule, RemapEngine, RemapRule};
pub use event::{
    ConsumerEvent, InputEvent, KeyboardEvent, RelativePointerEvent, ScrollWheelEvent,
};
pub use event_type::EventType;
pub use interval::{Clock, IntervalChecker, ManualClock, SystemClock};
pub use key::{ConsumerKeyCode, KeyCode, KeyboardType};
pub use modifier::{Flags, ModifierFlag};
pub use output::{EventOutput, LogOutput, OutputError, OutputEvent, RecordingOutput};
pub use pointing::{Buttons, PointingButton};
pub use remap::{Parameters, RemapContext};
pub use repeat::{KeyboardRepeat, RepeatItem};
pub use timer::Timer;

#[cfg(feature = "linux-evdev")]
pub use device::{EventLoop, EventLoopError};
#[cfg(feature = "linux-evdev")]
pub use output::UInputOutput;

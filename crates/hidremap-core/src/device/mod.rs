// hidremap Device Layer
// Input device hooking, raw event decoding and the evdev event loop

pub mod decode;
pub mod policy;
#[cfg(feature = "linux-evdev")]
pub mod r#loop;

use std::time::Instant;

pub use decode::InputDecoder;
pub use policy::{
    classify_role, is_virtual_device, matches_device_filter, DeviceDescriptor, DeviceRole,
    HookPolicy,
};
#[cfg(feature = "linux-evdev")]
pub use r#loop::EventLoop;

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that can occur in the event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device information for `--list-devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub path: String,
    pub role: DeviceRole,
}

/// Poll timeout in milliseconds for the next engine deadline.
///
/// Nothing armed waits `idle_ms`; a deadline already passed gives 0. The
/// result is rounded up so the loop never wakes just before a deadline.
pub fn poll_timeout_ms(deadline: Option<Instant>, now: Instant, idle_ms: i32) -> i32 {
    let Some(deadline) = deadline else {
        return idle_ms;
    };
    let remaining = deadline.saturating_duration_since(now);
    let ms = remaining.as_micros().div_ceil(1000);
    i32::try_from(ms).unwrap_or(i32::MAX)
}

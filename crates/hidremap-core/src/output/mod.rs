// hidremap Output Layer
// Event output sink boundary and its implementations

mod state;

#[cfg(feature = "linux-evdev")]
mod uinput;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ConsumerEvent, KeyboardEvent, RelativePointerEvent, ScrollWheelEvent};

pub use state::{PressedKeyState, Transition};

/// Name of the virtual output device; the device hook never grabs it
pub const VIRTUAL_DEVICE_NAME: &str = "hidremap (virtual) device";

#[cfg(feature = "linux-evdev")]
pub use uinput::UInputOutput;

/// Error types for output devices
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),
}

/// Where translated events go.
///
/// Delivery is infallible from the engine's point of view: a sink that
/// cannot write logs the failure and drops the event.
pub trait EventOutput {
    fn fire_key(&mut self, event: &KeyboardEvent);
    fn fire_consumer(&mut self, event: &ConsumerEvent);
    fn fire_relative_pointer(&mut self, event: &RelativePointerEvent);
    fn fire_scroll_wheel(&mut self, event: &ScrollWheelEvent);
}

/// One delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    Key(KeyboardEvent),
    Consumer(ConsumerEvent),
    RelativePointer(RelativePointerEvent),
    ScrollWheel(ScrollWheelEvent),
}

impl OutputEvent {
    pub fn as_key(&self) -> Option<&KeyboardEvent> {
        match self {
            OutputEvent::Key(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_consumer(&self) -> Option<&ConsumerEvent> {
        match self {
            OutputEvent::Consumer(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_relative_pointer(&self) -> Option<&RelativePointerEvent> {
        match self {
            OutputEvent::RelativePointer(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_scroll_wheel(&self) -> Option<&ScrollWheelEvent> {
        match self {
            OutputEvent::ScrollWheel(e) => Some(e),
            _ => None,
        }
    }
}

/// Sink that keeps every event it receives.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// engine and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<OutputEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Copy of recorded events
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }

    /// Only the keyboard events, drained
    pub fn take_keys(&self) -> Vec<KeyboardEvent> {
        self.take().iter().filter_map(|e| e.as_key().copied()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: OutputEvent) {
        self.events.lock().push(event);
    }
}

impl EventOutput for RecordingOutput {
    fn fire_key(&mut self, event: &KeyboardEvent) {
        self.push(OutputEvent::Key(*event));
    }

    fn fire_consumer(&mut self, event: &ConsumerEvent) {
        self.push(OutputEvent::Consumer(*event));
    }

    fn fire_relative_pointer(&mut self, event: &RelativePointerEvent) {
        self.push(OutputEvent::RelativePointer(*event));
    }

    fn fire_scroll_wheel(&mut self, event: &ScrollWheelEvent) {
        self.push(OutputEvent::ScrollWheel(*event));
    }
}

/// Sink that only logs, used for dry runs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOutput;

impl EventOutput for LogOutput {
    fn fire_key(&mut self, event: &KeyboardEvent) {
        log::info!("[dry-run] {}", event);
    }

    fn fire_consumer(&mut self, event: &ConsumerEvent) {
        log::info!("[dry-run] {}", event);
    }

    fn fire_relative_pointer(&mut self, event: &RelativePointerEvent) {
        log::info!("[dry-run] {}", event);
    }

    fn fire_scroll_wheel(&mut self, event: &ScrollWheelEvent) {
        log::info!("[dry-run] {}", event);
    }
}

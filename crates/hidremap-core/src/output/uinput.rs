// hidremap uinput Output
// Virtual keyboard/pointer device that delivers translated events

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType as EvType, InputEvent, RelativeAxisType};

use super::state::PressedKeyState;
use super::{EventOutput, OutputError, VIRTUAL_DEVICE_NAME};
use crate::{
    ConsumerEvent, EventType, Flags, KeyCode, KeyboardEvent, PointingButton,
    RelativePointerEvent, ScrollWheelEvent,
};

const BTN_LEFT: u16 = 0x110;
const KEY_RANGE: u16 = 0x2ff;

/// Output sink writing to a uinput virtual device
pub struct UInputOutput {
    device: VirtualDevice,
    state: PressedKeyState,
}

impl UInputOutput {
    /// Create the virtual device
    pub fn new() -> Result<Self, OutputError> {
        let mut keys = AttributeSet::new();
        for code in 1..KEY_RANGE {
            keys.insert(evdev::Key::new(code));
        }

        let mut axes = AttributeSet::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&keys)
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .with_relative_axes(&axes)
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?;

        log::info!("Created virtual device '{}'", VIRTUAL_DEVICE_NAME);
        Ok(Self {
            device,
            state: PressedKeyState::new(),
        })
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<(), OutputError> {
        let mut batch = Vec::with_capacity(events.len() + 1);
        batch.extend_from_slice(events);
        // SYN event is required for the kernel to process the batch
        batch.push(InputEvent::new(EvType::SYNCHRONIZATION, 0, 0));
        self.device
            .emit(&batch)
            .map_err(|e: std::io::Error| OutputError::WriteError(e.to_string()))
    }

    fn write_key(&mut self, key: KeyCode, value: i32) -> Result<(), OutputError> {
        self.emit(&[InputEvent::new(EvType::KEY, key.code(), value)])?;
        match value {
            0 => self.state.remove(key),
            1 => self.state.add(key),
            _ => {}
        }
        Ok(())
    }

    /// Bring the held modifier keys in line with `flags`
    fn fire_modifiers(&mut self, flags: Flags) -> Result<(), OutputError> {
        for (key, pressed) in self.state.update_flags(flags) {
            self.write_key(key, i32::from(pressed))?;
        }
        Ok(())
    }

    fn button_code(button: PointingButton) -> Option<u16> {
        button.index().map(|i| BTN_LEFT + i as u16)
    }

    fn try_fire_key(&mut self, event: &KeyboardEvent) -> Result<(), OutputError> {
        match event.event_type {
            // A modifier key is expressed entirely by the flag change
            EventType::Modify => self.fire_modifiers(event.flags),
            EventType::Down => {
                self.fire_modifiers(event.flags)?;
                let value = if event.repeat && self.state.is_pressed(event.key) { 2 } else { 1 };
                self.write_key(event.key, value)
            }
            EventType::Up => {
                self.write_key(event.key, 0)?;
                self.fire_modifiers(event.flags)
            }
        }
    }

    fn try_fire_pointer(&mut self, event: &RelativePointerEvent) -> Result<(), OutputError> {
        let mut batch = Vec::new();
        for (button, pressed) in self.state.update_buttons(event.buttons) {
            if let Some(code) = Self::button_code(button) {
                batch.push(InputEvent::new(EvType::KEY, code, i32::from(pressed)));
            }
        }
        if event.dx != 0 {
            batch.push(InputEvent::new(EvType::RELATIVE, RelativeAxisType::REL_X.0, event.dx));
        }
        if event.dy != 0 {
            batch.push(InputEvent::new(EvType::RELATIVE, RelativeAxisType::REL_Y.0, event.dy));
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.emit(&batch)
    }

    /// Release everything the device still holds
    pub fn release_all(&mut self) -> Result<(), OutputError> {
        for key in self.state.release_order() {
            self.emit(&[InputEvent::new(EvType::KEY, key.code(), 0)])?;
        }
        let mut batch = Vec::new();
        for (button, pressed) in self.state.update_buttons(Default::default()) {
            if let Some(code) = Self::button_code(button) {
                batch.push(InputEvent::new(EvType::KEY, code, i32::from(pressed)));
            }
        }
        if !batch.is_empty() {
            self.emit(&batch)?;
        }
        self.state.clear();
        Ok(())
    }
}

impl EventOutput for UInputOutput {
    fn fire_key(&mut self, event: &KeyboardEvent) {
        if let Err(e) = self.try_fire_key(event) {
            log::warn!("Dropped {}: {}", event, e);
        }
    }

    fn fire_consumer(&mut self, event: &ConsumerEvent) {
        let value = match event.event_type {
            EventType::Down if event.repeat => 2,
            EventType::Down => 1,
            _ => 0,
        };
        let result = self
            .fire_modifiers(event.flags)
            .and_then(|_| self.emit(&[InputEvent::new(EvType::KEY, event.key.code(), value)]));
        if let Err(e) = result {
            log::warn!("Dropped {}: {}", event, e);
        }
    }

    fn fire_relative_pointer(&mut self, event: &RelativePointerEvent) {
        if let Err(e) = self.try_fire_pointer(event) {
            log::warn!("Dropped {}: {}", event, e);
        }
    }

    fn fire_scroll_wheel(&mut self, event: &ScrollWheelEvent) {
        let mut batch = Vec::new();
        if event.delta_axis1 != 0 {
            batch.push(InputEvent::new(EvType::RELATIVE, RelativeAxisType::REL_WHEEL.0, event.delta_axis1));
        }
        if event.delta_axis2 != 0 {
            batch.push(InputEvent::new(EvType::RELATIVE, RelativeAxisType::REL_HWHEEL.0, event.delta_axis2));
        }
        if batch.is_empty() {
            return;
        }
        if let Err(e) = self.emit(&batch) {
            log::warn!("Dropped {}: {}", event, e);
        }
    }
}

impl Drop for UInputOutput {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            log::warn!("Failed to release keys on shutdown: {}", e);
        }
    }
}

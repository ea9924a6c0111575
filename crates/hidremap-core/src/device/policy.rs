// hidremap Device Policy
// Which input devices get hooked, and in which role

use crate::config::{Config, GeneralConfig};
use crate::output::VIRTUAL_DEVICE_NAME;
use crate::ConsumerKeyCode;

/// Laptop keyboards behind the i8042 controller report this name
const BUILTIN_KEYBOARD_NAMES: &[&str] = &["AT Translated Set 2 keyboard", "AT Raw Set 2 keyboard"];

/// What a device would feed the engine with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    Keyboard,
    /// Media/consumer keys only ("Consumer Control" nodes)
    Consumer,
    Pointer,
    /// Nothing the engine handles
    Other,
}

/// Everything the policy needs to know about one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub path: String,
    pub role: DeviceRole,
}

impl DeviceDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, role: DeviceRole) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            role,
        }
    }
}

/// QWERTY row plus A, Z and SPACE
const KEYBOARD_PROBE_CODES: &[u16] = &[16, 17, 18, 19, 20, 21, 30, 44, 57];
const BTN_LEFT: u16 = 0x110;

/// Work out a device's role from its capabilities.
///
/// `has_key` answers whether the device reports a key code; `has_rel_xy`
/// whether it reports both relative axes.
pub fn classify_role(has_key: impl Fn(u16) -> bool, has_rel_xy: bool) -> DeviceRole {
    if KEYBOARD_PROBE_CODES.iter().all(|code| has_key(*code)) {
        DeviceRole::Keyboard
    } else if has_rel_xy && has_key(BTN_LEFT) {
        DeviceRole::Pointer
    } else if (1..BTN_LEFT).any(|code| ConsumerKeyCode::from_key_code(code).is_some() && has_key(code)) {
        DeviceRole::Consumer
    } else {
        DeviceRole::Other
    }
}

/// Check if a device is our own virtual output device
pub fn is_virtual_device(device_name: &str) -> bool {
    device_name == VIRTUAL_DEVICE_NAME
}

/// Check if a device matches the given filter criteria.
///
/// With an explicit filter only devices named by path or name match,
/// virtual devices included. Without one, virtual devices are excluded and
/// only devices with a role the engine handles match.
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    role: DeviceRole,
    is_virtual: bool,
) -> bool {
    if !filter_names.is_empty() {
        return filter_names
            .iter()
            .any(|match_name| device_path == match_name || device_name == match_name);
    }
    if is_virtual {
        return false;
    }
    role != DeviceRole::Other
}

/// Decides which devices are remapped.
///
/// A keyboard-like device is left alone when no configuration is loaded,
/// when it is third-party and third-party keyboards are excluded, or when
/// it is internal (external) and internal (external) keyboards are
/// excluded. Pointers only go through the device filter.
#[derive(Debug, Clone, Default)]
pub struct HookPolicy {
    config_loaded: bool,
    general: GeneralConfig,
    device_filter: Vec<String>,
    internal_devices: Vec<String>,
    vendor_devices: Vec<String>,
}

impl HookPolicy {
    /// A policy that hooks nothing
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// Policy from a loaded configuration; a non-empty `cli_filter`
    /// replaces the configured device filter
    pub fn from_config(config: &Config, cli_filter: &[String]) -> Self {
        let device_filter = if cli_filter.is_empty() {
            config.device_filter.clone()
        } else {
            cli_filter.to_vec()
        };
        Self {
            config_loaded: true,
            general: config.general,
            device_filter,
            internal_devices: config.internal_devices.clone(),
            vendor_devices: config.vendor_devices.clone(),
        }
    }

    pub fn device_filter(&self) -> &[String] {
        &self.device_filter
    }

    pub fn is_internal(&self, device: &DeviceDescriptor) -> bool {
        self.internal_devices.iter().any(|n| *n == device.name)
            || BUILTIN_KEYBOARD_NAMES.contains(&device.name.as_str())
    }

    /// First-party keyboards: listed as vendor devices, or built in
    pub fn is_first_party(&self, device: &DeviceDescriptor) -> bool {
        self.vendor_devices.iter().any(|n| *n == device.name) || self.is_internal(device)
    }

    pub fn should_hook(&self, device: &DeviceDescriptor) -> bool {
        let hook = self.decide(device);
        log::info!(
            "Device '{}' ({}) {:?}: {}",
            device.name,
            device.path,
            device.role,
            if hook { "hooked" } else { "left alone" }
        );
        hook
    }

    fn decide(&self, device: &DeviceDescriptor) -> bool {
        if !self.config_loaded {
            return false;
        }
        let is_virtual = is_virtual_device(&device.name);
        if is_virtual && self.device_filter.is_empty() {
            return false;
        }
        if !matches_device_filter(&device.name, &device.path, &self.device_filter, device.role, is_virtual) {
            return false;
        }

        match device.role {
            DeviceRole::Keyboard | DeviceRole::Consumer => {
                if !self.is_first_party(device) && self.general.dont_remap_thirdvendor_keyboard {
                    return false;
                }
                if self.is_internal(device) {
                    !self.general.dont_remap_internal
                } else {
                    !self.general.dont_remap_external
                }
            }
            DeviceRole::Pointer => true,
            DeviceRole::Other => !self.device_filter.is_empty(),
        }
    }
}

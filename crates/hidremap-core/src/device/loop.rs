// hidremap Device Event Loop
// Grabs hooked evdev devices and decodes their events for the engine

use std::os::unix::io::AsRawFd;

use evdev::{Device, EventType as EvType, Key, RelativeAxisType};

use super::decode::InputDecoder;
use super::policy::{classify_role, DeviceDescriptor, DeviceRole, HookPolicy};
use super::{DeviceInfo, EventLoopError, EventLoopResult};
use crate::{InputEvent, KeyboardType};

/// One grabbed device with its decoder
struct HookedDevice {
    device: Device,
    descriptor: DeviceDescriptor,
    decoder: InputDecoder,
}

/// Event loop over every hooked device.
///
/// Devices are grabbed exclusively so the raw events only reach the
/// engine. They are released again on drop, including during unwinding.
pub struct EventLoop {
    devices: Vec<HookedDevice>,
    poll_fds: Vec<libc::pollfd>,
    grabbed: bool,
}

impl EventLoop {
    /// Grab every device the policy accepts
    pub fn new_with_grab(policy: &HookPolicy) -> EventLoopResult<Self> {
        Self::open(policy, true)
    }

    /// Open every device the policy accepts; without `grab` the events
    /// still reach other readers as well
    pub fn open(policy: &HookPolicy, grab: bool) -> EventLoopResult<Self> {
        let mut devices = Vec::new();
        for (path, device) in evdev::enumerate() {
            let descriptor = describe(&path.to_string_lossy(), &device);
            if !policy.should_hook(&descriptor) {
                continue;
            }
            let keyboard_type = KeyboardType::from(u32::from(device.input_id().product()));
            devices.push(HookedDevice {
                device,
                descriptor,
                decoder: InputDecoder::new(keyboard_type),
            });
        }

        if devices.is_empty() {
            return Err(EventLoopError::DeviceNotFound(
                "No devices matched the hook policy".to_string(),
            ));
        }

        if grab {
            // A previous instance may have died holding the grab
            for hooked in &mut devices {
                let _ = hooked.device.ungrab();
            }
            for hooked in &mut devices {
                hooked.device.grab()?;
                log::info!(
                    "Grabbed {} ({:?})",
                    hooked.descriptor.path,
                    hooked.descriptor.role
                );
            }
        }

        let poll_fds = devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        Ok(Self {
            devices,
            poll_fds,
            grabbed: grab,
        })
    }

    /// Every input device with its detected role
    pub fn list_devices() -> EventLoopResult<Vec<DeviceInfo>> {
        let infos: Vec<DeviceInfo> = evdev::enumerate()
            .enumerate()
            .map(|(index, (path, device))| {
                let descriptor = describe(&path.to_string_lossy(), &device);
                DeviceInfo {
                    index,
                    name: descriptor.name,
                    path: descriptor.path,
                    role: descriptor.role,
                }
            })
            .collect();

        if infos.is_empty() {
            return Err(EventLoopError::DeviceNotFound(
                "No input devices found".to_string(),
            ));
        }
        Ok(infos)
    }

    /// Wait up to `timeout_ms` (-1 = forever) and decode whatever arrived.
    ///
    /// A timeout or EINTR yields an empty batch; only other I/O errors
    /// are returned.
    pub fn poll_events(&mut self, timeout_ms: i32) -> EventLoopResult<Vec<InputEvent>> {
        let mut events = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(events);
            }
            return Err(EventLoopError::Io(err));
        }
        if poll_result == 0 {
            return Ok(events);
        }

        for (i, hooked) in self.devices.iter_mut().enumerate() {
            if self.poll_fds[i].revents & libc::POLLIN == 0 {
                continue;
            }
            match hooked.device.fetch_events() {
                Ok(raw) => {
                    for ev in raw {
                        events.extend(hooked.decoder.feed(ev.event_type().0, ev.code(), ev.value()));
                    }
                }
                Err(e) => log::warn!("Read from {} failed: {}", hooked.descriptor.path, e),
            }
        }

        Ok(events)
    }

    pub fn ungrab_all(&mut self) {
        if self.grabbed {
            for hooked in &mut self.devices {
                let _ = hooked.device.ungrab();
            }
            self.grabbed = false;
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter().map(|d| &d.descriptor)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.ungrab_all();
    }
}

fn describe(path: &str, device: &Device) -> DeviceDescriptor {
    let name = device.name().unwrap_or("Unknown");
    let role = if device.supported_events().contains(EvType::KEY) {
        let keys = device.supported_keys();
        let has_rel_xy = device.supported_relative_axes().is_some_and(|axes| {
            axes.contains(RelativeAxisType::REL_X) && axes.contains(RelativeAxisType::REL_Y)
        });
        classify_role(
            |code| keys.is_some_and(|k| k.contains(Key::new(code))),
            has_rel_xy,
        )
    } else {
        DeviceRole::Other
    };
    DeviceDescriptor::new(name, path, role)
}

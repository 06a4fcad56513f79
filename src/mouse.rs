use evdev::{Device, RelativeAxisType};
use hidapi::{DeviceInfo, HidApi, HidDevice, HidError};
use std::ffi::CString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::driver::ReportSource;

/// HID usage page / usage pair of a generic-desktop mouse.
const USAGE_PAGE_GENERIC_DESKTOP: u16 = 0x01;
const USAGE_MOUSE: u16 = 0x02;

/// Upper bound on how long a read blocks, and so on cancellation latency.
const READ_TIMEOUT_MS: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub vendor: u16,
    pub product: u16,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.product)
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("Could not access input device: {0}")]
    Io(#[from] io::Error),
}

impl DeviceError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DeviceError::Io(e) => e.raw_os_error().unwrap_or(1),
            DeviceError::Hid(_) => 1,
        }
    }
}

/// A HID interface that looks like a mouse.
#[derive(Debug, Clone)]
pub struct MouseInfo {
    pub id: DeviceId,
    pub name: String,
    path: CString,
}

fn is_mouse(info: &DeviceInfo) -> bool {
    info.usage_page() == USAGE_PAGE_GENERIC_DESKTOP && info.usage() == USAGE_MOUSE
}

/// Find the first HID mouse interface, or the one matching `wanted`.
pub fn find_mouse(api: &HidApi, wanted: Option<DeviceId>) -> Option<MouseInfo> {
    let info = api.device_list().find(|info| {
        is_mouse(info)
            && wanted.map_or(true, |id| {
                info.vendor_id() == id.vendor && info.product_id() == id.product
            })
    })?;

    let mouse = MouseInfo {
        id: DeviceId {
            vendor: info.vendor_id(),
            product: info.product_id(),
        },
        name: info.product_string().unwrap_or("unknown").to_string(),
        path: info.path().to_owned(),
    };
    log::info!(
        "Found mouse: {} [{}] at {}",
        mouse.name,
        mouse.id,
        mouse.path.to_string_lossy()
    );
    Some(mouse)
}

/// Reads raw input reports from the mouse's HID interface.
pub struct MouseReader {
    device: HidDevice,
}

impl MouseReader {
    pub fn open(api: &HidApi, info: &MouseInfo) -> Result<Self, DeviceError> {
        let device = api.open_path(&info.path)?;
        device.set_blocking_mode(true)?;
        log::info!("Opened mouse device: {} ({})", info.name, info.id);
        Ok(Self { device })
    }
}

impl ReportSource for MouseReader {
    fn read_report(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.device
            .read_timeout(buf, READ_TIMEOUT_MS)
            .map_err(hid_to_io)
    }
}

/// Unwrap an OS error from hidapi so its errno reaches the exit code.
fn hid_to_io(error: HidError) -> io::Error {
    match error {
        HidError::IoError { error } => error,
        other => io::Error::other(other),
    }
}

/// Exclusive grab on the kernel's evdev node for the mouse, so the desktop
/// only sees the accelerated virtual device. Released on drop.
pub struct EvdevGrab {
    device: Device,
    path: PathBuf,
}

impl EvdevGrab {
    /// Grab the first evdev node with relative X motion that belongs to `id`.
    /// Returns `Ok(None)` if no such node exists.
    pub fn grab(id: DeviceId) -> Result<Option<Self>, DeviceError> {
        for (path, mut device) in evdev::enumerate() {
            let input_id = device.input_id();
            if input_id.vendor() != id.vendor || input_id.product() != id.product {
                continue;
            }
            let has_rel_x = device
                .supported_relative_axes()
                .is_some_and(|axes| axes.contains(RelativeAxisType::REL_X));
            if !has_rel_x {
                continue;
            }

            device.grab()?;
            log::info!(
                "Grabbed mouse: {} at {}",
                device.name().unwrap_or("unknown"),
                path.display()
            );
            return Ok(Some(Self { device, path }));
        }
        Ok(None)
    }
}

impl Drop for EvdevGrab {
    fn drop(&mut self) {
        match self.device.ungrab() {
            Ok(()) => log::info!("Released mouse at {}", self.path.display()),
            Err(e) => log::warn!("Failed to ungrab mouse at {}: {}", self.path.display(), e),
        }
    }
}

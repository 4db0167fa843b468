//! Input device lookup.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Resolves a device spec: "default", a numeric index, or an exact device name.
///
/// # Errors
/// - If there is no default input device
/// - If the index is out of range or no device has the given name
pub fn find_input_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    if device_spec == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("No audio input device available"));
    }

    if let Ok(index) = device_spec.parse::<usize>() {
        let mut devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();

        let count = devices.len();
        return if index < count {
            Ok(devices.swap_remove(index))
        } else {
            Err(anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        };
    }

    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if device.name().is_ok_and(|name| name == device_spec) {
            return Ok(device);
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'linewave list-devices' to see available devices."
    ))
}

/// Runs `f` with stderr pointed at /dev/null, hiding ALSA's noise on Linux.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    // SAFETY: dup/dup2/close on the process's own stderr and a file we hold open.
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

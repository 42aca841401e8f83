// SPDX-License-Identifier: GPL-3.0-only

//! Torch control via Linux sysfs LEDs
//!
//! Cameras on phones and some laptops expose their flash LED at
//! `/sys/class/leds/*:flash` (or `*:torch`). Writing the `brightness` file
//! keeps the LED lit continuously, which is what a scanner torch needs. The
//! file is usually group-writable by `feedbackd`, so no root is required.

use crate::backends::camera::BackendError;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default sysfs LED directory
pub const LEDS_DIR: &str = "/sys/class/leds";

/// A torch-capable LED discovered via sysfs
#[derive(Debug, Clone)]
pub struct TorchLed {
    /// Sysfs path, e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    max_brightness: u32,
    name: String,
}

impl TorchLed {
    /// Device name (e.g. "white:flash")
    pub fn name(&self) -> &str {
        &self.name
    }

    fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }

    pub fn on(&self) -> io::Result<()> {
        self.set_brightness(self.max_brightness)
    }

    pub fn off(&self) -> io::Result<()> {
        self.set_brightness(0)
    }
}

/// Result of torch hardware detection.
///
/// Keeps "hardware exists" apart from "we can control it" so a failed
/// toggle can tell the user how to fix permissions.
#[derive(Debug, Clone, Default)]
pub struct TorchHardware {
    /// LEDs we can write to
    pub leds: Vec<TorchLed>,
    /// Hint shown when LEDs exist but none is writable
    pub permission_error: Option<String>,
}

impl TorchHardware {
    /// Scan the system LED directory
    pub fn detect() -> Self {
        Self::detect_in(Path::new(LEDS_DIR))
    }

    /// Scan `leds_dir` for `*:flash` and `*:torch` entries
    pub fn detect_in(leds_dir: &Path) -> Self {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            debug!(dir = %leds_dir.display(), "No LED directory, torch unavailable");
            return Self::default();
        };

        let mut leds = Vec::new();
        let mut unwritable: Vec<PathBuf> = Vec::new();

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !(name.ends_with(":flash") || name.ends_with(":torch")) {
                continue;
            }

            let led_path = entry.path();
            let max_brightness_path = led_path.join("max_brightness");
            let max_brightness = match std::fs::read_to_string(&max_brightness_path)
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok())
            {
                Some(v) if v > 0 => v,
                _ => {
                    warn!(path = %max_brightness_path.display(), "Invalid max_brightness value");
                    continue;
                }
            };

            let brightness_path = led_path.join("brightness");
            if std::fs::OpenOptions::new()
                .write(true)
                .open(&brightness_path)
                .is_ok()
            {
                info!(name, max_brightness, "Discovered torch LED");
                leds.push(TorchLed {
                    path: led_path,
                    max_brightness,
                    name: name.to_string(),
                });
            } else {
                warn!(path = %brightness_path.display(), "Torch LED found but not writable");
                unwritable.push(brightness_path);
            }
        }

        leds.sort_by(|a, b| a.name.cmp(&b.name));

        let permission_error = if leds.is_empty() && !unwritable.is_empty() {
            Some(permission_hint(&unwritable[0]))
        } else {
            None
        };

        Self {
            leds,
            permission_error,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.leds.is_empty()
    }

    /// Switch every LED on or off.
    ///
    /// Fails with `Unsupported` when there is nothing to drive or no LED
    /// accepted the write.
    pub fn set(&self, on: bool) -> Result<(), BackendError> {
        if self.leds.is_empty() {
            let reason = self
                .permission_error
                .clone()
                .unwrap_or_else(|| "no torch LED found".to_string());
            return Err(BackendError::Unsupported(reason));
        }

        let mut written = 0;
        for led in &self.leds {
            let result = if on { led.on() } else { led.off() };
            match result {
                Ok(()) => written += 1,
                Err(e) => warn!(led = %led.name, error = %e, on, "Failed to drive torch LED"),
            }
        }

        if written == 0 {
            Err(BackendError::Unsupported(
                "no torch LED accepted the write".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Tell the user which group grants write access to the LED
fn permission_hint(brightness_path: &Path) -> String {
    let username = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
    let group = std::fs::metadata(brightness_path)
        .ok()
        .and_then(|meta| group_name(meta.gid()))
        .unwrap_or_else(|| "feedbackd".to_string());

    format!("torch LED is not writable; run `sudo adduser {username} {group}` and log in again")
}

fn group_name(gid: u32) -> Option<String> {
    let groups = std::fs::read_to_string("/etc/group").ok()?;
    groups.lines().find_map(|line| {
        let parts: Vec<&str> = line.split(':').collect();
        (parts.len() >= 3 && parts[2].parse::<u32>().ok() == Some(gid))
            .then(|| parts[0].to_string())
    })
}

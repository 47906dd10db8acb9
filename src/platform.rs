//! Platform detection and device discovery.
//!
//! The Sense HAT's peripherals surface as ordinary Linux device nodes: the LED matrix as the
//! framebuffer the kernel names `RPiSense FB`, the colour sensor behind one of the `/dev/i2c-*`
//! buses. This module locates them and answers the platform questions the higher-level
//! [`SenseHat`](crate::hat::SenseHat) constructor asks.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use log::debug;
use snafu::{ResultExt, Snafu};

const RPI_ISSUE: &str = "/etc/rpi-issue";
const GRAPHICS_SYSFS: &str = "/sys/class/graphics";
const DEV_DIR: &str = "/dev";
const RASPI_CONFIG: &str = "/usr/bin/raspi-config";

/// The name the kernel driver gives the Sense HAT framebuffer.
const SENSE_HAT_FB_NAME: &str = "RPiSense FB";

/// Returns whether the system is running Raspberry Pi OS.
#[must_use]
pub fn is_raspberry_pi_os() -> bool {
    Path::new(RPI_ISSUE).exists()
}

/// Returns whether the I2C interface is enabled.
///
/// Requires at least one `/dev/i2c-*` node to exist and `raspi-config` to report the interface
/// enabled (`nonint get_i2c` prints `0`).
pub fn i2c_enabled() -> Result<bool, PlatformError> {
    if find_i2c_bus()?.is_none() {
        return Ok(false);
    }

    let output = Command::new(RASPI_CONFIG)
        .args(["nonint", "get_i2c"])
        .output()
        .context(RaspiConfigSnafu)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim() == "0")
}

/// Locates the Sense HAT framebuffer device.
///
/// Scans `/sys/class/graphics/fb*`, reads each device's `name` attribute and returns the
/// `/dev/fbN` node of the first one named `RPiSense FB`, or `None` if the HAT is not present.
pub fn find_framebuffer() -> Result<Option<PathBuf>, PlatformError> {
    let Some(entries) = read_dir_if_present(GRAPHICS_SYSFS)? else {
        return Ok(None);
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        if !file_name.to_string_lossy().starts_with("fb") {
            continue;
        }

        let Ok(name) = fs::read_to_string(entry.path().join("name")) else {
            continue;
        };
        if name.trim() != SENSE_HAT_FB_NAME {
            continue;
        }

        let device = Path::new(DEV_DIR).join(&file_name);
        if device.exists() {
            debug!("found Sense HAT framebuffer at {}", device.display());
            return Ok(Some(device));
        }
    }

    Ok(None)
}

/// Returns the first `/dev/i2c-*` bus node in sorted order, or `None` if the bus is absent.
pub fn find_i2c_bus() -> Result<Option<PathBuf>, PlatformError> {
    let Some(entries) = read_dir_if_present(DEV_DIR)? else {
        return Ok(None);
    };

    let mut buses: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("i2c-"))
        .map(|entry| entry.path())
        .collect();
    buses.sort();

    Ok(buses.into_iter().next())
}

fn read_dir_if_present(dir: &'static str) -> Result<Option<fs::ReadDir>, PlatformError> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(Some(entries)),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PlatformError::Scan { dir, source }),
    }
}

/// Errors that can occur during platform detection.
#[derive(Debug, Snafu)]
pub enum PlatformError {
    /// A device directory could not be scanned.
    #[snafu(display("failed to scan {dir} for device nodes"))]
    Scan {
        /// The directory being scanned.
        dir: &'static str,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// `raspi-config` could not be executed.
    #[snafu(display("failed to run raspi-config"))]
    RaspiConfig {
        /// The underlying I/O error.
        source: io::Error,
    },
}

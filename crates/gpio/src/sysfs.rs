//! Linux sysfs GPIO backend (`/sys/class/gpio`).
//!
//! Relay boards for 24 VAC valves are usually active-low: driving the line
//! low closes the relay. With `active_low` set, "energized" is written as
//! `0` and read back from `0`.
//!
//! Opening the driver exports every pin and configures it as an output that
//! starts de-energized. Any failure there is returned to the caller, which
//! must refuse to start: running with a pin in an unknown state is not an
//! option for a valve controller.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use sprinkler_core::types::PinId;

use crate::driver::{PinDriver, PinError};

/// Default sysfs mount point.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// How many times to look for `gpioN/` after writing to `export`.
const EXPORT_POLL_ATTEMPTS: u32 = 20;

/// Delay between export polls; udev may take a moment to create the node.
const EXPORT_POLL_DELAY: Duration = Duration::from_millis(50);

/// Sysfs-backed pin driver.
#[derive(Debug)]
pub struct SysfsPinDriver {
    value_paths: HashMap<PinId, PathBuf>,
    active_low: bool,
}

impl SysfsPinDriver {
    /// Export and configure `pins` under `root`.
    pub fn open(root: &Path, pins: &[PinId], active_low: bool) -> Result<Self, PinError> {
        let mut value_paths = HashMap::with_capacity(pins.len());

        for &pin in pins {
            let pin_dir = root.join(format!("gpio{pin}"));
            if !pin_dir.exists() {
                write_attr(pin, &root.join("export"), &pin.to_string())?;
                wait_for_export(pin, &pin_dir)?;
            }

            // "high"/"low" set direction and initial level in one write, so
            // the relay never glitches on while the line is configured.
            let initial = if active_low { "high" } else { "low" };
            write_attr(pin, &pin_dir.join("direction"), initial)?;

            tracing::debug!(pin, active_low, "GPIO pin configured as output");
            value_paths.insert(pin, pin_dir.join("value"));
        }

        Ok(Self {
            value_paths,
            active_low,
        })
    }

    fn value_path(&self, pin: PinId) -> Result<&Path, PinError> {
        self.value_paths
            .get(&pin)
            .map(PathBuf::as_path)
            .ok_or(PinError::UnknownPin(pin))
    }
}

impl PinDriver for SysfsPinDriver {
    fn backend(&self) -> &'static str {
        "sysfs"
    }

    fn set_output(&self, pin: PinId, energized: bool) -> Result<(), PinError> {
        let level_high = energized != self.active_low;
        write_attr(pin, self.value_path(pin)?, if level_high { "1" } else { "0" })
    }

    fn read_output(&self, pin: PinId) -> Result<bool, PinError> {
        let path = self.value_path(pin)?;
        let raw = fs::read_to_string(path).map_err(|source| PinError::Io { pin, source })?;
        let level_high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(PinError::BadValue {
                    pin,
                    value: other.to_string(),
                })
            }
        };
        Ok(level_high != self.active_low)
    }
}

fn write_attr(pin: PinId, path: &Path, value: &str) -> Result<(), PinError> {
    fs::write(path, value).map_err(|source| PinError::Io { pin, source })
}

fn wait_for_export(pin: PinId, pin_dir: &Path) -> Result<(), PinError> {
    for _ in 0..EXPORT_POLL_ATTEMPTS {
        if pin_dir.join("value").exists() {
            return Ok(());
        }
        thread::sleep(EXPORT_POLL_DELAY);
    }
    Err(PinError::Io {
        pin,
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} did not appear after export", pin_dir.display()),
        ),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    /// Lay out a fake sysfs tree with pre-exported pins.
    fn fake_root(pins: &[PinId]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for pin in pins {
            let pin_dir = dir.path().join(format!("gpio{pin}"));
            fs::create_dir_all(&pin_dir).unwrap();
            fs::write(pin_dir.join("direction"), "in").unwrap();
            fs::write(pin_dir.join("value"), "0").unwrap();
        }
        dir
    }

    fn read(root: &Path, pin: PinId, attr: &str) -> String {
        fs::read_to_string(root.join(format!("gpio{pin}")).join(attr)).unwrap()
    }

    #[test]
    fn open_configures_active_low_outputs_off() {
        let root = fake_root(&[12, 16]);
        SysfsPinDriver::open(root.path(), &[12, 16], true).unwrap();

        assert_eq!(read(root.path(), 12, "direction"), "high");
        assert_eq!(read(root.path(), 16, "direction"), "high");
    }

    #[test]
    fn active_low_inverts_levels() {
        let root = fake_root(&[12]);
        let driver = SysfsPinDriver::open(root.path(), &[12], true).unwrap();

        driver.set_output(12, true).unwrap();
        assert_eq!(read(root.path(), 12, "value"), "0");
        assert!(driver.read_output(12).unwrap());

        driver.set_output(12, false).unwrap();
        assert_eq!(read(root.path(), 12, "value"), "1");
        assert!(!driver.read_output(12).unwrap());
    }

    #[test]
    fn active_high_writes_levels_directly() {
        let root = fake_root(&[5]);
        let driver = SysfsPinDriver::open(root.path(), &[5], false).unwrap();

        assert_eq!(read(root.path(), 5, "direction"), "low");
        driver.set_output(5, true).unwrap();
        assert_eq!(read(root.path(), 5, "value"), "1");
    }

    #[test]
    fn missing_sysfs_tree_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-gpio-here");

        let result = SysfsPinDriver::open(&missing, &[12], true);
        assert_matches!(result, Err(PinError::Io { pin: 12, .. }));
    }

    #[test]
    fn garbage_value_is_reported() {
        let root = fake_root(&[12]);
        let driver = SysfsPinDriver::open(root.path(), &[12], true).unwrap();
        fs::write(root.path().join("gpio12/value"), "x").unwrap();

        assert_matches!(driver.read_output(12), Err(PinError::BadValue { pin: 12, .. }));
    }

    #[test]
    fn unclaimed_pin_is_rejected() {
        let root = fake_root(&[12]);
        let driver = SysfsPinDriver::open(root.path(), &[12], true).unwrap();
        assert_matches!(driver.set_output(16, true), Err(PinError::UnknownPin(16)));
    }
}

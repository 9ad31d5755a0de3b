//! ==============================================================================
//! sensor.rs - battery level capability provider
//! ==============================================================================
//!
//! purpose:
//!     provides the battery fraction (0.0 - 1.0) the reading workflow submits.
//!     abstracts the difference between a real linux machine (sysfs) and a
//!     development/test setup (fixed value).
//!
//! relationships:
//!     - used by: workflow/reading.rs (called on the blocking pool)
//!     - selected by: config.rs ([sensor] source)
//!
//! ==============================================================================

use std::path::{Path, PathBuf};

use crate::error::SensorError;

/// default root of the linux power-supply class
pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

pub trait BatterySensor: Send + Sync {
    /// current charge as a fraction in [0,1]
    fn read_battery_fraction(&self) -> Result<f64, SensorError>;
}

fn checked(fraction: f64) -> Result<f64, SensorError> {
    if fraction.is_finite() && (0.0..=1.0).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(SensorError::OutOfRange(fraction))
    }
}

// ==============================================================================
// sysfs battery
// ==============================================================================
//
// each entry under /sys/class/power_supply has a `type` file ("Battery",
// "Mains", "USB", ...). batteries expose `capacity` as an integer percent.

pub struct SysfsBattery {
    root: PathBuf,
    device: Option<PathBuf>,
}

impl SysfsBattery {
    /// scan the default power-supply root for the first battery
    pub fn new() -> Self {
        Self::with_root(POWER_SUPPLY_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            device: None,
        }
    }

    /// read a specific device directory (e.g. /sys/class/power_supply/BAT1)
    pub fn with_device(device: impl Into<PathBuf>) -> Self {
        let device = device.into();
        Self {
            root: device.parent().map(Path::to_path_buf).unwrap_or_default(),
            device: Some(device),
        }
    }

    fn find_battery(&self) -> Result<PathBuf, SensorError> {
        if let Some(device) = &self.device {
            return Ok(device.clone());
        }

        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            SensorError::Unavailable(format!("{}: {}", self.root.display(), e))
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                std::fs::read_to_string(path.join("type"))
                    .map(|t| t.trim() == "Battery")
                    .unwrap_or(false)
            })
            .collect();
        // BAT0 before BAT1
        candidates.sort();

        candidates
            .into_iter()
            .next()
            .ok_or_else(|| {
                SensorError::Unavailable(format!("no battery under {}", self.root.display()))
            })
    }
}

impl Default for SysfsBattery {
    fn default() -> Self {
        Self::new()
    }
}

impl BatterySensor for SysfsBattery {
    fn read_battery_fraction(&self) -> Result<f64, SensorError> {
        let device = self.find_battery()?;
        let capacity_path = device.join("capacity");
        let raw = std::fs::read_to_string(&capacity_path).map_err(|e| {
            SensorError::Unavailable(format!("{}: {}", capacity_path.display(), e))
        })?;
        let percent: f64 = raw.trim().parse().map_err(|_| {
            SensorError::Unavailable(format!("unreadable capacity {:?}", raw.trim()))
        })?;

        tracing::debug!(device = %device.display(), percent, "battery capacity read");
        if percent.is_nan() || percent < 0.0 {
            return Err(SensorError::OutOfRange(percent / 100.0));
        }
        // some gauges report above 100 while calibrating
        checked(percent.min(100.0) / 100.0)
    }
}

// ==============================================================================
// fixed battery (no hardware)
// ==============================================================================

pub struct FixedBattery {
    fraction: f64,
}

impl FixedBattery {
    pub fn new(fraction: f64) -> Self {
        tracing::info!("Using FIXED battery sensor (no hardware access)");
        Self { fraction }
    }
}

impl BatterySensor for FixedBattery {
    fn read_battery_fraction(&self) -> Result<f64, SensorError> {
        checked(self.fraction)
    }
}

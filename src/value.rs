//! Measurement value types
//!
//! A [`Measurement`] pairs a decoded physical quantity with its display unit;
//! a [`MeterReading`] is the full snapshot produced by a bulk read of the
//! measurement block. Both are presentation types: all scaling has already
//! happened by the time they are constructed.

use std::fmt;

/// A decoded physical quantity tagged with its display unit.
///
/// Produced fresh on every read; never cached by the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: &'static str,
}

impl Measurement {
    /// Create a new measurement
    pub fn new(value: f64, unit: &'static str) -> Self {
        Self { value, unit }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit)
        }
    }
}

/// Snapshot of every measurement the meter exposes.
///
/// Returned by `MeterDriver::read_all`, which fetches the whole contiguous
/// measurement block in a single exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    /// Line voltage in Volts
    pub voltage: f64,
    /// Load current in Amperes
    pub current: f64,
    /// Active power in Watts
    pub power: f64,
    /// Accumulated energy counter in Watt-hours (unscaled device counter)
    pub energy: u32,
    /// Line frequency in Hertz
    pub frequency: f64,
    /// Power factor (dimensionless)
    pub power_factor: f64,
    /// Power alarm active
    pub alarm: bool,
}

impl fmt::Display for MeterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Voltage:      {:>10.1} V", self.voltage)?;
        writeln!(f, "Current:      {:>10.3} A", self.current)?;
        writeln!(f, "Power:        {:>10.1} W", self.power)?;
        writeln!(f, "Energy:       {:>10} Wh", self.energy)?;
        writeln!(f, "Frequency:    {:>10.1} Hz", self.frequency)?;
        writeln!(f, "Power factor: {:>10.2}", self.power_factor)?;
        write!(f, "Alarm:        {:>10}", if self.alarm { "ACTIVE" } else { "off" })
    }
}

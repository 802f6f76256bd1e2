//! # Voltage PZEM - PZEM-004T-V3 Energy Meter Driver
//!
//! **Author:** Evan Liu <liuyifanz.1996@gmail.com>
//! **License:** MIT
//!
//! A typed Modbus RTU driver for the PZEM-004T-V3 energy meter over an
//! RS-485/serial link. Measurements come back scaled with their physical
//! units; device commands (alarm threshold, address reassignment, energy
//! reset, calibration) are single typed calls.
//!
//! ## Features
//!
//! - **Typed register map**: every measurement and parameter is a named
//!   entry with compile-time address, width, and scale
//! - **Correct composite decoding**: 32-bit quantities split across two
//!   registers are combined through one tested decode rule
//! - **Substitutable transport**: the driver composes a transport capability,
//!   so tests run against a mock and production against the serial port
//! - **Fail loudly**: garbled, truncated, or mismatched replies are errors,
//!   never silently coerced values
//!
//! ## Register Map
//!
//! | Operation | Function | Address | Count | Raw → Value |
//! |-----------|----------|---------|-------|-------------|
//! | `get_voltage` | 0x03 | 0 | 1 | raw/10 (V) |
//! | `get_current` | 0x03 | 1-2 | 2 | (hi<<16\|lo)/1000 (A) |
//! | `get_power` | 0x03 | 3-4 | 2 | (hi<<16\|lo)/10 (W) |
//! | `get_energy` | 0x03 | 5-6 | 2 | hi<<16\|lo (Wh) |
//! | `get_frequency` | 0x03 | 7 | 1 | raw/10 (Hz) |
//! | `get_power_factor` | 0x03 | 8 | 1 | raw/100 |
//! | `get_alarm_status` | 0x03 | 9 | 1 | raw != 0 |
//! | `set_alarm` | 0x06 | 1 | 1 | threshold (W) |
//! | `set_slave_address` | 0x06 | 2 | 1 | address |
//! | `reset_energy` | 0x42 | — | — | empty payload |
//! | `calibrate` | 0x05 | — | — | payload 37 21 |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voltage_pzem::{MeterDriver, MeterResult};
//!
//! #[tokio::main]
//! async fn main() -> MeterResult<()> {
//!     // Meter at slave address 1 on /dev/ttyUSB0 (9600-8-N-1, fixed)
//!     let mut meter = MeterDriver::open("/dev/ttyUSB0", 1)?;
//!
//!     // Individual reads
//!     let voltage = meter.get_voltage().await?;
//!     let current = meter.get_current().await?;
//!     println!("{} V, {} A", voltage, current);
//!
//!     // Or everything in one exchange
//!     let reading = meter.read_all().await?;
//!     println!("{}", reading);
//!
//!     meter.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Protocol and serial-link constants
pub mod constants;

/// Protocol definitions and message handling
pub mod protocol;

/// Modbus RTU frame encoding and decoding
pub mod frame;

/// Device register map and composite decode rule
pub mod registers;

/// Measurement value types
pub mod value;

/// Serial transport layer
pub mod transport;

/// High-level meter driver
pub mod driver;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use voltage_pzem::tokio) ===
pub use tokio;

// === Core driver API ===
pub use driver::MeterDriver;

// === Error handling ===
pub use error::{MeterError, MeterResult};

// === Core types ===
pub use protocol::{MeterException, MeterFunction, MeterRequest, MeterResponse, SlaveId};
pub use registers::{combine_registers, MeterRegister, RegisterAccess};
pub use value::{Measurement, MeterReading};

// === Transport ===
pub use transport::{MeterTransport, RtuTransport, TransportStats};

// === Fixed link parameters ===
pub use constants::{BAUD_RATE, RESPONSE_TIMEOUT, SLAVE_ADDR_MAX, SLAVE_ADDR_MIN};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!(
        "Voltage PZEM v{} - PZEM-004T-V3 energy meter driver by Evan Liu",
        VERSION
    )
}

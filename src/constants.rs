//! Protocol and serial-link constants for the PZEM-004T-V3
//!
//! The serial parameters are fixed by the device and are not user-overridable
//! in this layer. Frame size bounds are derived from the Modbus RTU ADU limit.

use std::time::Duration;

// ============================================================================
// Serial Link Parameters (fixed by the device)
// ============================================================================

/// Baud rate the PZEM-004T-V3 speaks. Not configurable on this device.
pub const BAUD_RATE: u32 = 9600;

/// Response timeout per exchange.
///
/// The device answers within a few character times; 200 ms leaves generous
/// margin at 9600 baud while keeping a dead bus detectable quickly.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(200);

// ============================================================================
// Slave Addressing
// ============================================================================

/// Lowest assignable Modbus slave address
pub const SLAVE_ADDR_MIN: u8 = 1;

/// Highest assignable Modbus slave address
pub const SLAVE_ADDR_MAX: u8 = 247;

// ============================================================================
// Function Codes
// ============================================================================

/// Read Holding Registers (FC03) — all measurements
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Single Register (FC06) — alarm threshold, slave address
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Vendor-specific calibration trigger.
///
/// Collides with the standard Write Single Coil code; this device has no
/// coils and repurposes 0x05 with a fixed opaque payload.
pub const FC_CALIBRATE: u8 = 0x05;

/// Vendor-specific energy counter reset (0x42), empty payload
pub const FC_RESET_ENERGY: u8 = 0x42;

/// Exception responses set the high bit of the echoed function code
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Frame Size Bounds
// ============================================================================

/// Maximum Modbus RTU ADU size: 256 bytes per the serial line spec
pub const MAX_RTU_FRAME_SIZE: usize = 256;

/// Minimum decodable RTU frame: slave (1) + function (1) + CRC (2)
pub const MIN_RTU_FRAME_SIZE: usize = 4;

/// CRC-16 trailer length in bytes
pub const CRC_LEN: usize = 2;

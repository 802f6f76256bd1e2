//! Protocol definitions and message handling
//!
//! Request/response structures for the subset of Modbus RTU the PZEM-004T-V3
//! speaks: Read Holding Registers (0x03), Write Single Register (0x06), and
//! the two vendor-defined command codes (0x42 energy reset, 0x05 calibrate).
//!
//! The vendor commands are not register operations: they carry an opaque
//! payload directly after the function code, with no address or quantity
//! fields on the wire.

use std::fmt;

use crate::constants::{
    FC_CALIBRATE, FC_READ_HOLDING_REGISTERS, FC_RESET_ENERGY, FC_WRITE_SINGLE_REGISTER,
    SLAVE_ADDR_MAX, SLAVE_ADDR_MIN,
};
use crate::error::{MeterError, MeterResult};

/// Modbus slave/unit identifier (1-247)
pub type SlaveId = u8;

/// Function codes understood by the PZEM-004T-V3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MeterFunction {
    /// Read Holding Registers (0x03) — all measurements
    ReadHoldingRegisters = FC_READ_HOLDING_REGISTERS,
    /// Vendor calibration trigger (0x05), opaque fixed payload
    Calibrate = FC_CALIBRATE,
    /// Write Single Register (0x06) — alarm threshold, slave address
    WriteSingleRegister = FC_WRITE_SINGLE_REGISTER,
    /// Vendor energy counter reset (0x42), empty payload
    ResetEnergy = FC_RESET_ENERGY,
}

impl MeterFunction {
    /// Convert from a raw function code
    pub fn from_u8(value: u8) -> MeterResult<Self> {
        match value {
            FC_READ_HOLDING_REGISTERS => Ok(MeterFunction::ReadHoldingRegisters),
            FC_CALIBRATE => Ok(MeterFunction::Calibrate),
            FC_WRITE_SINGLE_REGISTER => Ok(MeterFunction::WriteSingleRegister),
            FC_RESET_ENERGY => Ok(MeterFunction::ResetEnergy),
            _ => Err(MeterError::invalid_function(value)),
        }
    }

    /// Convert to the raw function code
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// True for the register-read function
    pub fn is_read(self) -> bool {
        matches!(self, MeterFunction::ReadHoldingRegisters)
    }

    /// True for the vendor-defined command codes (no address/quantity fields)
    pub fn is_vendor_command(self) -> bool {
        matches!(self, MeterFunction::Calibrate | MeterFunction::ResetEnergy)
    }
}

impl fmt::Display for MeterFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeterFunction::ReadHoldingRegisters => "Read Holding Registers",
            MeterFunction::Calibrate => "Calibrate (vendor)",
            MeterFunction::WriteSingleRegister => "Write Single Register",
            MeterFunction::ResetEnergy => "Reset Energy (vendor)",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

/// Exception codes the device is documented to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MeterException {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    SlaveDeviceFailure = 0x04,
}

impl MeterException {
    /// Convert from a raw exception code
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(MeterException::IllegalFunction),
            0x02 => Some(MeterException::IllegalDataAddress),
            0x03 => Some(MeterException::IllegalDataValue),
            0x04 => Some(MeterException::SlaveDeviceFailure),
            _ => None,
        }
    }

    /// Convert to the raw exception code
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            MeterException::IllegalFunction => "Function code not supported by the device",
            MeterException::IllegalDataAddress => "Register address outside the device map",
            MeterException::IllegalDataValue => "Value not acceptable for the target register",
            MeterException::SlaveDeviceFailure => "Device failed while performing the request",
        }
    }
}

impl fmt::Display for MeterException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}: {}", self.to_u8(), self.description())
    }
}

/// A single request to the meter
#[derive(Debug, Clone, PartialEq)]
pub struct MeterRequest {
    pub slave_id: SlaveId,
    pub function: MeterFunction,
    /// Register address; unused (zero) for vendor commands
    pub address: u16,
    /// Register count; unused (zero) for writes and vendor commands
    pub quantity: u16,
    /// Write value bytes or vendor command payload
    pub data: Vec<u8>,
}

impl MeterRequest {
    /// Read `quantity` holding registers starting at `address`
    pub fn new_read(slave_id: SlaveId, address: u16, quantity: u16) -> Self {
        Self {
            slave_id,
            function: MeterFunction::ReadHoldingRegisters,
            address,
            quantity,
            data: Vec::new(),
        }
    }

    /// Write a single holding register
    pub fn new_write(slave_id: SlaveId, address: u16, value: u16) -> Self {
        Self {
            slave_id,
            function: MeterFunction::WriteSingleRegister,
            address,
            quantity: 1,
            data: value.to_be_bytes().to_vec(),
        }
    }

    /// Issue a vendor command with a raw payload
    pub fn new_command(slave_id: SlaveId, function: MeterFunction, payload: &[u8]) -> Self {
        Self {
            slave_id,
            function,
            address: 0,
            quantity: 0,
            data: payload.to_vec(),
        }
    }

    /// Validate the request before it reaches the wire
    pub fn validate(&self) -> MeterResult<()> {
        if self.slave_id < SLAVE_ADDR_MIN || self.slave_id > SLAVE_ADDR_MAX {
            return Err(MeterError::invalid_argument(format!(
                "Slave address {} outside {}-{}",
                self.slave_id, SLAVE_ADDR_MIN, SLAVE_ADDR_MAX
            )));
        }

        if self.function.is_read() && (self.quantity == 0 || self.quantity > 125) {
            return Err(MeterError::invalid_argument(format!(
                "Invalid register count: {}",
                self.quantity
            )));
        }

        Ok(())
    }
}

/// A decoded reply from the meter
#[derive(Debug, Clone, PartialEq)]
pub struct MeterResponse {
    pub slave_id: SlaveId,
    pub function: MeterFunction,
    /// PDU body after the function code: byte count + register data for
    /// reads, address + value echo for writes, raw bytes for vendor commands
    pub data: Vec<u8>,
    /// Raw exception code, if the device answered with one
    pub exception: Option<u8>,
}

impl MeterResponse {
    /// Create a successful response
    pub fn new_success(slave_id: SlaveId, function: MeterFunction, data: Vec<u8>) -> Self {
        Self {
            slave_id,
            function,
            data,
            exception: None,
        }
    }

    /// Create an exception response
    pub fn new_exception(slave_id: SlaveId, function: MeterFunction, code: u8) -> Self {
        Self {
            slave_id,
            function,
            data: Vec::new(),
            exception: Some(code),
        }
    }

    /// Check if this is an exception response
    pub fn is_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Known exception detail, if the device answered with a documented code
    pub fn exception_detail(&self) -> Option<MeterException> {
        self.exception.and_then(MeterException::from_u8)
    }

    /// Exception error, if the device answered with one
    pub fn get_exception(&self) -> Option<MeterError> {
        self.exception.map(|code| MeterError::Exception {
            function: self.function.to_u8(),
            code,
        })
    }

    /// Parse a Read Holding Registers body into 16-bit register values.
    ///
    /// The body carries a byte-count prefix which must match the remaining
    /// length; anything else is a malformed reply.
    pub fn parse_registers(&self) -> MeterResult<Vec<u16>> {
        if let Some(error) = self.get_exception() {
            return Err(error);
        }

        if self.data.is_empty() {
            return Err(MeterError::protocol("Empty register response"));
        }

        let byte_count = self.data[0] as usize;
        if byte_count % 2 != 0 {
            return Err(MeterError::protocol(format!(
                "Odd register byte count: {}",
                byte_count
            )));
        }
        if self.data.len() < 1 + byte_count {
            return Err(MeterError::protocol(format!(
                "Register data truncated: {} bytes announced, {} present",
                byte_count,
                self.data.len() - 1
            )));
        }

        let registers = self.data[1..1 + byte_count]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Ok(registers)
    }

    /// Parse registers and require exactly `expected` of them.
    ///
    /// A reply whose register count differs from the request is a protocol
    /// violation, never silently coerced into a value.
    pub fn expect_registers(&self, expected: u16) -> MeterResult<Vec<u16>> {
        let registers = self.parse_registers()?;
        if registers.len() != expected as usize {
            return Err(MeterError::protocol(format!(
                "Register count mismatch: requested {}, device returned {}",
                expected,
                registers.len()
            )));
        }
        Ok(registers)
    }
}

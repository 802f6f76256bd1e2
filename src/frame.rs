//! Modbus RTU frame encoding and decoding
//!
//! An RTU frame is `slave_id + function + body + CRC-16` with the CRC
//! transmitted low byte first. The body layout depends on the function:
//! address + quantity for reads, address + value for writes, and the raw
//! payload for the vendor command codes (which carry no address field).

use crc::{Crc, CRC_16_MODBUS};
use tracing::debug;

use crate::constants::{CRC_LEN, EXCEPTION_FLAG, MAX_RTU_FRAME_SIZE, MIN_RTU_FRAME_SIZE};
use crate::error::{MeterError, MeterResult};
use crate::protocol::{MeterFunction, MeterRequest, MeterResponse};

/// CRC calculator for RTU frames
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Calculate the CRC-16/MODBUS checksum of a frame body
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Encode a request into a complete RTU frame, CRC appended.
pub fn encode_request(request: &MeterRequest) -> MeterResult<Vec<u8>> {
    let mut frame = Vec::with_capacity(8);

    frame.push(request.slave_id);
    frame.push(request.function.to_u8());

    match request.function {
        MeterFunction::ReadHoldingRegisters => {
            frame.extend_from_slice(&request.address.to_be_bytes());
            frame.extend_from_slice(&request.quantity.to_be_bytes());
        }
        MeterFunction::WriteSingleRegister => {
            if request.data.len() < 2 {
                return Err(MeterError::frame("Write request missing register value"));
            }
            frame.extend_from_slice(&request.address.to_be_bytes());
            frame.extend_from_slice(&request.data[0..2]);
        }
        // Vendor commands: payload straight after the function code
        MeterFunction::Calibrate | MeterFunction::ResetEnergy => {
            frame.extend_from_slice(&request.data);
        }
    }

    if frame.len() + CRC_LEN > MAX_RTU_FRAME_SIZE {
        return Err(MeterError::frame(format!(
            "Frame too large: {} bytes (max {})",
            frame.len() + CRC_LEN,
            MAX_RTU_FRAME_SIZE
        )));
    }

    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    debug!(
        "Encoded frame: fc=0x{:02X}, len={}",
        request.function.to_u8(),
        frame.len()
    );

    Ok(frame)
}

/// Decode a complete RTU frame into a response.
///
/// Verifies the CRC trailer and detects exception responses (function code
/// with the high bit set). Garbled frames never yield a value.
pub fn decode_response(frame: &[u8]) -> MeterResult<MeterResponse> {
    if frame.len() < MIN_RTU_FRAME_SIZE {
        return Err(MeterError::frame(format!(
            "Frame too short: {} bytes",
            frame.len()
        )));
    }
    if frame.len() > MAX_RTU_FRAME_SIZE {
        return Err(MeterError::frame(format!(
            "Frame too large: {} bytes",
            frame.len()
        )));
    }

    let body_len = frame.len() - CRC_LEN;
    let received_crc = u16::from_le_bytes([frame[body_len], frame[body_len + 1]]);
    let calculated_crc = crc16(&frame[..body_len]);
    if received_crc != calculated_crc {
        return Err(MeterError::frame(format!(
            "CRC mismatch: expected 0x{:04X}, got 0x{:04X}",
            calculated_crc, received_crc
        )));
    }

    let slave_id = frame[0];
    let function_code = frame[1];

    if function_code & EXCEPTION_FLAG != 0 {
        if body_len < 3 {
            return Err(MeterError::frame("Exception frame missing code"));
        }
        let function = MeterFunction::from_u8(function_code & !EXCEPTION_FLAG)?;
        let code = frame[2];
        debug!(
            "Exception frame: fc=0x{:02X}, code=0x{:02X}",
            function_code, code
        );
        return Ok(MeterResponse::new_exception(slave_id, function, code));
    }

    let function = MeterFunction::from_u8(function_code)?;
    let data = frame[2..body_len].to_vec();

    Ok(MeterResponse::new_success(slave_id, function, data))
}

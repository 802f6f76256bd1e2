//! Fuzz the RTU frame decoder with arbitrary byte sequences.
//!
//! The decoder must reject garbage with an error, never panic, and any frame
//! it accepts must carry a valid CRC trailer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use voltage_pzem::frame::{crc16, decode_response};

fuzz_target!(|data: &[u8]| {
    if let Ok(response) = decode_response(data) {
        // Accepted frames carried a valid CRC over the body
        let body_len = data.len() - 2;
        let trailer = u16::from_le_bytes([data[body_len], data[body_len + 1]]);
        assert_eq!(crc16(&data[..body_len]), trailer);

        // And the echoed slave id survives decoding untouched
        assert_eq!(response.slave_id, data[0]);
    }
});

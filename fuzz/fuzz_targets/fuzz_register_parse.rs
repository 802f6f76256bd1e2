//! Fuzz the register-body parser with arbitrary response payloads.
//!
//! `parse_registers` must never panic and must only produce registers when
//! the byte-count prefix is consistent with the body.

#![no_main]

use libfuzzer_sys::fuzz_target;
use voltage_pzem::protocol::{MeterFunction, MeterResponse};

fuzz_target!(|data: &[u8]| {
    let response =
        MeterResponse::new_success(1, MeterFunction::ReadHoldingRegisters, data.to_vec());

    if let Ok(registers) = response.parse_registers() {
        // Announced byte count matched: two bytes per register
        assert_eq!(registers.len() * 2, data[0] as usize);
    }
});

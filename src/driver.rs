//! High-level meter driver
//!
//! [`MeterDriver`] owns the slave address and the register map, and turns
//! named operations (`get_voltage`, `set_alarm`, ...) into single
//! request/response exchanges through a [`MeterTransport`]. All decoding and
//! scaling happens here; the transport only moves validated frames.
//!
//! Every operation takes `&mut self`: the serial link is a half-duplex bus
//! and exchanges must not interleave. The exclusive borrow is the
//! single-caller boundary — callers sharing a driver across tasks must add
//! their own mutual exclusion around each call.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voltage_pzem::{MeterDriver, MeterResult};
//!
//! #[tokio::main]
//! async fn main() -> MeterResult<()> {
//!     let mut meter = MeterDriver::open("/dev/ttyUSB0", 1)?;
//!
//!     let voltage = meter.get_voltage().await?;
//!     let power = meter.get_power().await?;
//!     println!("{} V, {} W", voltage, power);
//!
//!     meter.close().await?;
//!     Ok(())
//! }
//! ```

use tracing::debug;

use crate::constants::{SLAVE_ADDR_MAX, SLAVE_ADDR_MIN};
use crate::error::{MeterError, MeterResult};
use crate::protocol::{MeterFunction, MeterRequest, SlaveId};
use crate::registers::{
    combine_registers, MeterRegister, MEASUREMENT_BLOCK_COUNT, MEASUREMENT_BLOCK_START,
};
use crate::transport::{MeterTransport, RtuTransport, TransportStats};
use crate::value::{Measurement, MeterReading};

/// Calibration command payload.
///
/// Vendor-specified byte sequence with no documented meaning; transmitted
/// verbatim.
const CALIBRATION_PAYLOAD: [u8; 2] = [0x37, 0x21];

/// Check a slave address against the assignable range
fn slave_addr_in_range(addr: SlaveId) -> bool {
    (SLAVE_ADDR_MIN..=SLAVE_ADDR_MAX).contains(&addr)
}

/// Driver for one PZEM-004T-V3 on the bus.
///
/// Generic over the transport so tests can substitute a mock; production
/// code uses [`MeterDriver::open`] which builds the serial [`RtuTransport`].
#[derive(Debug)]
pub struct MeterDriver<T: MeterTransport> {
    transport: T,
    slave_addr: SlaveId,
}

impl MeterDriver<RtuTransport> {
    /// Open the meter on a serial port.
    ///
    /// Configures the port with the device's fixed parameters (9600 baud,
    /// 8 data bits, no parity, 1 stop bit, 200 ms response timeout). No bus
    /// traffic happens here beyond opening the port handle.
    ///
    /// # Errors
    ///
    /// `MeterError::Configuration` if `slave_addr` is outside 1-247,
    /// `MeterError::Connection` if the port cannot be opened.
    pub fn open(port: &str, slave_addr: SlaveId) -> MeterResult<Self> {
        Self::open_with_logging(port, slave_addr, false)
    }

    /// Open the meter with frame-level hex logging enabled or disabled.
    pub fn open_with_logging(port: &str, slave_addr: SlaveId, debug: bool) -> MeterResult<Self> {
        if !slave_addr_in_range(slave_addr) {
            return Err(MeterError::configuration(format!(
                "Slave address {} outside {}-{}",
                slave_addr, SLAVE_ADDR_MIN, SLAVE_ADDR_MAX
            )));
        }
        let transport = RtuTransport::open_with_logging(port, debug)?;
        Ok(Self {
            transport,
            slave_addr,
        })
    }
}

impl<T: MeterTransport> MeterDriver<T> {
    /// Create a driver over an existing transport.
    ///
    /// # Errors
    ///
    /// `MeterError::Configuration` if `slave_addr` is outside 1-247.
    pub fn new(transport: T, slave_addr: SlaveId) -> MeterResult<Self> {
        if !slave_addr_in_range(slave_addr) {
            return Err(MeterError::configuration(format!(
                "Slave address {} outside {}-{}",
                slave_addr, SLAVE_ADDR_MIN, SLAVE_ADDR_MAX
            )));
        }
        Ok(Self {
            transport,
            slave_addr,
        })
    }

    /// The slave address this driver targets
    pub fn slave_address(&self) -> SlaveId {
        self.slave_addr
    }

    /// Retarget this driver at a different slave address.
    ///
    /// Local state only — nothing is written to the device. Use this after a
    /// successful [`set_slave_address`] to keep talking to the renamed
    /// device through the same port handle.
    ///
    /// [`set_slave_address`]: MeterDriver::set_slave_address
    pub fn set_local_slave_address(&mut self, slave_addr: SlaveId) -> MeterResult<()> {
        if !slave_addr_in_range(slave_addr) {
            return Err(MeterError::invalid_argument(format!(
                "Slave address {} outside {}-{}",
                slave_addr, SLAVE_ADDR_MIN, SLAVE_ADDR_MAX
            )));
        }
        self.slave_addr = slave_addr;
        Ok(())
    }

    /// Get a reference to the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Read one map entry and return its raw register words.
    async fn read_raw(&mut self, register: MeterRegister) -> MeterResult<Vec<u16>> {
        let request = MeterRequest::new_read(self.slave_addr, register.address(), register.count());
        let response = self.transport.request(&request).await?;
        response.expect_registers(register.count())
    }

    /// Read a single-register entry, scaled.
    async fn read_scaled(&mut self, register: MeterRegister) -> MeterResult<f64> {
        let registers = self.read_raw(register).await?;
        let raw = u32::from(registers[0]);
        debug!("{:?}: raw={}", register, raw);
        Ok(register.scale(raw))
    }

    /// Read a two-register entry, combined and scaled.
    async fn read_composite(&mut self, register: MeterRegister) -> MeterResult<u32> {
        let registers = self.read_raw(register).await?;
        let raw = combine_registers(registers[0], registers[1]);
        debug!("{:?}: raw={}", register, raw);
        Ok(raw)
    }

    // ===== Measurements =====

    /// Line voltage in Volts (register 0, 0.1 V resolution)
    pub async fn get_voltage(&mut self) -> MeterResult<f64> {
        self.read_scaled(MeterRegister::Voltage).await
    }

    /// Load current in Amperes (registers 1-2, 1 mA resolution)
    pub async fn get_current(&mut self) -> MeterResult<f64> {
        let raw = self.read_composite(MeterRegister::Current).await?;
        Ok(MeterRegister::Current.scale(raw))
    }

    /// Active power in Watts (registers 3-4, 0.1 W resolution)
    pub async fn get_power(&mut self) -> MeterResult<f64> {
        let raw = self.read_composite(MeterRegister::Power).await?;
        Ok(MeterRegister::Power.scale(raw))
    }

    /// Accumulated energy in Watt-hours (registers 5-6, unscaled counter).
    ///
    /// The counter only grows; clear it with [`reset_energy`].
    ///
    /// [`reset_energy`]: MeterDriver::reset_energy
    pub async fn get_energy(&mut self) -> MeterResult<u32> {
        self.read_composite(MeterRegister::Energy).await
    }

    /// Line frequency in Hertz (register 7, 0.1 Hz resolution)
    pub async fn get_frequency(&mut self) -> MeterResult<f64> {
        self.read_scaled(MeterRegister::Frequency).await
    }

    /// Power factor (register 8, 0.01 resolution)
    pub async fn get_power_factor(&mut self) -> MeterResult<f64> {
        self.read_scaled(MeterRegister::PowerFactor).await
    }

    /// Power alarm state (register 9, any nonzero value means active)
    pub async fn get_alarm_status(&mut self) -> MeterResult<bool> {
        let registers = self.read_raw(MeterRegister::AlarmStatus).await?;
        Ok(registers[0] != 0)
    }

    /// Read the whole measurement block (registers 0-9) in one exchange.
    ///
    /// Decodes with the same rules as the individual getters; one bus
    /// round-trip instead of seven for polling loops.
    pub async fn read_all(&mut self) -> MeterResult<MeterReading> {
        let request = MeterRequest::new_read(
            self.slave_addr,
            MEASUREMENT_BLOCK_START,
            MEASUREMENT_BLOCK_COUNT,
        );
        let response = self.transport.request(&request).await?;
        let regs = response.expect_registers(MEASUREMENT_BLOCK_COUNT)?;

        Ok(MeterReading {
            voltage: MeterRegister::Voltage.scale(u32::from(regs[0])),
            current: MeterRegister::Current.scale(combine_registers(regs[1], regs[2])),
            power: MeterRegister::Power.scale(combine_registers(regs[3], regs[4])),
            energy: combine_registers(regs[5], regs[6]),
            frequency: MeterRegister::Frequency.scale(u32::from(regs[7])),
            power_factor: MeterRegister::PowerFactor.scale(u32::from(regs[8])),
            alarm: regs[9] != 0,
        })
    }

    // ===== Unit-wrapped accessors =====

    /// Voltage as a unit-tagged measurement
    pub async fn get_voltage_with_unit(&mut self) -> MeterResult<Measurement> {
        let value = self.get_voltage().await?;
        Ok(Measurement::new(value, MeterRegister::Voltage.unit()))
    }

    /// Current as a unit-tagged measurement
    pub async fn get_current_with_unit(&mut self) -> MeterResult<Measurement> {
        let value = self.get_current().await?;
        Ok(Measurement::new(value, MeterRegister::Current.unit()))
    }

    /// Power as a unit-tagged measurement
    pub async fn get_power_with_unit(&mut self) -> MeterResult<Measurement> {
        let value = self.get_power().await?;
        Ok(Measurement::new(value, MeterRegister::Power.unit()))
    }

    /// Energy as a unit-tagged measurement
    pub async fn get_energy_with_unit(&mut self) -> MeterResult<Measurement> {
        let value = self.get_energy().await?;
        Ok(Measurement::new(f64::from(value), MeterRegister::Energy.unit()))
    }

    /// Frequency as a unit-tagged measurement
    pub async fn get_frequency_with_unit(&mut self) -> MeterResult<Measurement> {
        let value = self.get_frequency().await?;
        Ok(Measurement::new(value, MeterRegister::Frequency.unit()))
    }

    /// Power factor as a unit-tagged measurement (empty unit)
    pub async fn get_power_factor_with_unit(&mut self) -> MeterResult<Measurement> {
        let value = self.get_power_factor().await?;
        Ok(Measurement::new(value, MeterRegister::PowerFactor.unit()))
    }

    // ===== Commands =====

    /// Set the power alarm threshold in Watts.
    ///
    /// The threshold must be greater than zero; the `u16` parameter already
    /// bounds it above. Write-only on this device — there is no read-back.
    ///
    /// # Errors
    ///
    /// `MeterError::InvalidArgument` for a zero threshold, raised before any
    /// bus traffic.
    pub async fn set_alarm(&mut self, threshold: u16) -> MeterResult<()> {
        if threshold == 0 {
            return Err(MeterError::invalid_argument(
                "Alarm threshold must be greater than zero",
            ));
        }

        let request = MeterRequest::new_write(
            self.slave_addr,
            MeterRegister::AlarmThreshold.address(),
            threshold,
        );
        self.transport.request(&request).await?;
        debug!("set_alarm: threshold={} W", threshold);
        Ok(())
    }

    /// Reassign the device to a new slave address (1-247).
    ///
    /// The write is issued against the device's current address. On success
    /// the device answers to `new_addr` from its next frame onward, but this
    /// driver keeps targeting the old address — it cannot tell a genuinely
    /// applied write from one that was acknowledged and then lost. Call
    /// [`set_local_slave_address`] (or rebuild the driver) once you are
    /// certain the device moved.
    ///
    /// # Errors
    ///
    /// `MeterError::InvalidArgument` for an address outside 1-247, raised
    /// before any bus traffic.
    ///
    /// [`set_local_slave_address`]: MeterDriver::set_local_slave_address
    pub async fn set_slave_address(&mut self, new_addr: SlaveId) -> MeterResult<()> {
        if !slave_addr_in_range(new_addr) {
            return Err(MeterError::invalid_argument(format!(
                "Slave address {} outside {}-{}",
                new_addr, SLAVE_ADDR_MIN, SLAVE_ADDR_MAX
            )));
        }

        let request = MeterRequest::new_write(
            self.slave_addr,
            MeterRegister::SlaveAddress.address(),
            u16::from(new_addr),
        );
        self.transport.request(&request).await?;
        debug!(
            "set_slave_address: device {} reassigned to {}",
            self.slave_addr, new_addr
        );
        Ok(())
    }

    /// Zero the device's internal energy counter (registers 5-6).
    ///
    /// Vendor function code 0x42 with an empty payload. The device offers no
    /// application-level confirmation field; success means the exchange
    /// completed with a valid echo.
    pub async fn reset_energy(&mut self) -> MeterResult<()> {
        let request = MeterRequest::new_command(self.slave_addr, MeterFunction::ResetEnergy, &[]);
        self.transport.request(&request).await?;
        debug!("reset_energy: counter cleared");
        Ok(())
    }

    /// Trigger the device's calibration routine.
    ///
    /// Vendor function code 0x05 with the fixed payload `37 21`. Effect
    /// unknown — the byte sequence is vendor-specified and undocumented, and
    /// the device reports nothing back. Transmitted verbatim.
    pub async fn calibrate(&mut self) -> MeterResult<()> {
        let request = MeterRequest::new_command(
            self.slave_addr,
            MeterFunction::Calibrate,
            &CALIBRATION_PAYLOAD,
        );
        self.transport.request(&request).await?;
        debug!("calibrate: vendor command sent");
        Ok(())
    }

    // ===== Channel management =====

    /// Check if the underlying channel is open
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the underlying channel
    pub async fn close(&mut self) -> MeterResult<()> {
        self.transport.close().await
    }

    /// Get transport statistics
    pub fn get_stats(&self) -> TransportStats {
        self.transport.get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MeterResponse;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock transport recording requests and replaying canned responses
    #[derive(Debug)]
    struct MockTransport {
        requests: Mutex<Vec<MeterRequest>>,
        responses: Mutex<VecDeque<MeterResult<MeterResponse>>>,
        connected: Mutex<bool>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
                connected: Mutex::new(true),
            }
        }

        fn add_response(&self, response: MeterResult<MeterResponse>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn get_requests(&self) -> Vec<MeterRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl MeterTransport for MockTransport {
        fn request(
            &mut self,
            request: &MeterRequest,
        ) -> impl std::future::Future<Output = MeterResult<MeterResponse>> + Send {
            self.requests.lock().unwrap().push(request.clone());

            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(MeterError::connection("No response prepared in mock")));

            async move { response }
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        fn close(&mut self) -> impl std::future::Future<Output = MeterResult<()>> + Send {
            *self.connected.lock().unwrap() = false;
            async { Ok(()) }
        }

        fn get_stats(&self) -> TransportStats {
            TransportStats::default()
        }
    }

    /// Build a Read Holding Registers response body (byte count + values)
    fn register_response(slave_id: SlaveId, values: &[u16]) -> MeterResponse {
        let mut data = Vec::with_capacity(1 + values.len() * 2);
        data.push((values.len() * 2) as u8);
        for &value in values {
            data.extend_from_slice(&value.to_be_bytes());
        }
        MeterResponse::new_success(slave_id, MeterFunction::ReadHoldingRegisters, data)
    }

    /// Build a Write Single Register echo response
    fn write_echo(slave_id: SlaveId, address: u16, value: u16) -> MeterResponse {
        let mut data = Vec::with_capacity(4);
        data.extend_from_slice(&address.to_be_bytes());
        data.extend_from_slice(&value.to_be_bytes());
        MeterResponse::new_success(slave_id, MeterFunction::WriteSingleRegister, data)
    }

    fn driver_with_mock() -> MeterDriver<MockTransport> {
        MeterDriver::new(MockTransport::new(), 1).unwrap()
    }

    // ===== Construction =====

    #[test]
    fn test_construction_validates_slave_address() {
        assert!(MeterDriver::new(MockTransport::new(), 0).is_err());
        assert!(MeterDriver::new(MockTransport::new(), 248).is_err());
        assert!(MeterDriver::new(MockTransport::new(), 1).is_ok());
        assert!(MeterDriver::new(MockTransport::new(), 247).is_ok());

        let err = MeterDriver::new(MockTransport::new(), 0).unwrap_err();
        assert!(matches!(err, MeterError::Configuration { .. }));
    }

    // ===== Simple register reads =====

    #[tokio::test]
    async fn test_get_voltage() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(register_response(1, &[2301])));

        let voltage = meter.get_voltage().await.unwrap();
        assert!((voltage - 230.1).abs() < 1e-9);

        let requests = meter.transport().get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].function, MeterFunction::ReadHoldingRegisters);
        assert_eq!(requests[0].address, 0);
        assert_eq!(requests[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_get_frequency() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(register_response(1, &[499])));

        let frequency = meter.get_frequency().await.unwrap();
        assert!((frequency - 49.9).abs() < 1e-9);

        let requests = meter.transport().get_requests();
        assert_eq!(requests[0].address, 7);
        assert_eq!(requests[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_get_power_factor() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(register_response(1, &[1234])));

        let pf = meter.get_power_factor().await.unwrap();
        assert!((pf - 12.34).abs() < 1e-9);

        assert_eq!(meter.transport().get_requests()[0].address, 8);
    }

    #[tokio::test]
    async fn test_get_alarm_status() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(register_response(1, &[0xFFFF])));
        meter.transport().add_response(Ok(register_response(1, &[0])));
        meter.transport().add_response(Ok(register_response(1, &[1])));

        assert!(meter.get_alarm_status().await.unwrap());
        assert!(!meter.get_alarm_status().await.unwrap());
        assert!(meter.get_alarm_status().await.unwrap());

        assert_eq!(meter.transport().get_requests()[0].address, 9);
    }

    // ===== Composite register reads =====

    #[tokio::test]
    async fn test_get_current_combines_low_word_first() {
        let mut meter = driver_with_mock();
        // Low-address register carries the low word
        meter
            .transport()
            .add_response(Ok(register_response(1, &[0x1C20, 0x0001])));

        let current = meter.get_current().await.unwrap();
        assert!((current - 72.736).abs() < 1e-9);

        let requests = meter.transport().get_requests();
        assert_eq!(requests[0].address, 1);
        assert_eq!(requests[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_get_power() {
        let mut meter = driver_with_mock();
        // (1 << 16) | 0x0010 = 65552 -> 6555.2 W
        meter
            .transport()
            .add_response(Ok(register_response(1, &[0x0010, 0x0001])));

        let power = meter.get_power().await.unwrap();
        assert!((power - 6555.2).abs() < 1e-9);

        let requests = meter.transport().get_requests();
        assert_eq!(requests[0].address, 3);
        assert_eq!(requests[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_get_energy_is_unscaled() {
        let mut meter = driver_with_mock();
        meter
            .transport()
            .add_response(Ok(register_response(1, &[0xD903, 0x0001])));

        // (1 << 16) | 0xD903 = 121091 Wh, integer, no scaling
        assert_eq!(meter.get_energy().await.unwrap(), 121_091);

        let requests = meter.transport().get_requests();
        assert_eq!(requests[0].address, 5);
        assert_eq!(requests[0].quantity, 2);
    }

    // ===== Bulk read =====

    #[tokio::test]
    async fn test_read_all_single_exchange() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(register_response(
            1,
            &[
                2301,           // voltage 230.1 V
                0x1C20, 0x0001, // current 72.736 A
                0x0010, 0x0001, // power 6555.2 W
                0xD903, 0x0001, // energy 121091 Wh
                499,            // frequency 49.9 Hz
                87,             // power factor 0.87
                0,              // alarm off
            ],
        )));

        let reading = meter.read_all().await.unwrap();
        assert!((reading.voltage - 230.1).abs() < 1e-9);
        assert!((reading.current - 72.736).abs() < 1e-9);
        assert!((reading.power - 6555.2).abs() < 1e-9);
        assert_eq!(reading.energy, 121_091);
        assert!((reading.frequency - 49.9).abs() < 1e-9);
        assert!((reading.power_factor - 0.87).abs() < 1e-9);
        assert!(!reading.alarm);

        let requests = meter.transport().get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].address, 0);
        assert_eq!(requests[0].quantity, 10);
    }

    // ===== Reply shape and failure propagation =====

    #[tokio::test]
    async fn test_register_count_mismatch_is_protocol_error() {
        let mut meter = driver_with_mock();
        // Asked for 2 registers, device answers with 1
        meter.transport().add_response(Ok(register_response(1, &[0x1C20])));

        let err = meter.get_current().await.unwrap_err();
        assert!(matches!(err, MeterError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_timeout_never_becomes_a_value() {
        let mut meter = driver_with_mock();
        meter
            .transport()
            .add_response(Err(MeterError::timeout("read response", 200)));

        let err = meter.get_voltage().await.unwrap_err();
        assert!(matches!(err, MeterError::Timeout { .. }));
        assert!(err.is_communication());
    }

    #[tokio::test]
    async fn test_crc_failure_propagates() {
        let mut meter = driver_with_mock();
        meter
            .transport()
            .add_response(Err(MeterError::frame("CRC mismatch")));

        let err = meter.get_energy().await.unwrap_err();
        assert!(err.is_communication());
    }

    // ===== Alarm threshold =====

    #[tokio::test]
    async fn test_set_alarm() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(write_echo(1, 1, 5000)));

        meter.set_alarm(5000).await.unwrap();

        let requests = meter.transport().get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].function, MeterFunction::WriteSingleRegister);
        assert_eq!(requests[0].address, 1);
        assert_eq!(requests[0].data, vec![0x13, 0x88]);
    }

    #[tokio::test]
    async fn test_set_alarm_rejects_zero_without_bus_traffic() {
        let mut meter = driver_with_mock();

        let err = meter.set_alarm(0).await.unwrap_err();
        assert!(matches!(err, MeterError::InvalidArgument { .. }));
        assert!(meter.transport().get_requests().is_empty());
    }

    // ===== Slave address change =====

    #[tokio::test]
    async fn test_set_slave_address_uses_old_address() {
        let mut meter = MeterDriver::new(MockTransport::new(), 7).unwrap();
        meter.transport().add_response(Ok(write_echo(7, 2, 42)));

        meter.set_slave_address(42).await.unwrap();

        let requests = meter.transport().get_requests();
        assert_eq!(requests.len(), 1);
        // The reassignment frame targets the device's current address
        assert_eq!(requests[0].slave_id, 7);
        assert_eq!(requests[0].address, 2);
        assert_eq!(requests[0].data, vec![0x00, 42]);

        // The cached address is deliberately untouched
        assert_eq!(meter.slave_address(), 7);
    }

    #[tokio::test]
    async fn test_set_slave_address_rejects_out_of_range() {
        let mut meter = driver_with_mock();

        for bad in [0u8, 248, 255] {
            let err = meter.set_slave_address(bad).await.unwrap_err();
            assert!(matches!(err, MeterError::InvalidArgument { .. }));
        }
        assert!(meter.transport().get_requests().is_empty());
    }

    #[test]
    fn test_set_local_slave_address() {
        let mut meter = driver_with_mock();

        meter.set_local_slave_address(42).unwrap();
        assert_eq!(meter.slave_address(), 42);

        assert!(meter.set_local_slave_address(0).is_err());
        assert_eq!(meter.slave_address(), 42);
    }

    // ===== Vendor commands =====

    #[tokio::test]
    async fn test_reset_energy_single_exchange_empty_payload() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(MeterResponse::new_success(
            1,
            MeterFunction::ResetEnergy,
            vec![],
        )));

        meter.reset_energy().await.unwrap();

        let requests = meter.transport().get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].function, MeterFunction::ResetEnergy);
        assert!(requests[0].data.is_empty());
    }

    #[tokio::test]
    async fn test_calibrate_payload_verbatim() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(MeterResponse::new_success(
            1,
            MeterFunction::Calibrate,
            vec![],
        )));

        meter.calibrate().await.unwrap();

        let requests = meter.transport().get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].function, MeterFunction::Calibrate);
        assert_eq!(requests[0].data, vec![0x37, 0x21]);
    }

    // ===== Unit-wrapped accessors =====

    #[tokio::test]
    async fn test_with_unit_accessors() {
        let mut meter = driver_with_mock();
        meter.transport().add_response(Ok(register_response(1, &[2301])));
        meter
            .transport()
            .add_response(Ok(register_response(1, &[0x1C20, 0x0001])));
        meter.transport().add_response(Ok(register_response(1, &[87])));

        let voltage = meter.get_voltage_with_unit().await.unwrap();
        assert_eq!(voltage.unit, "V");
        assert!((voltage.value - 230.1).abs() < 1e-9);

        let current = meter.get_current_with_unit().await.unwrap();
        assert_eq!(current.unit, "A");

        let pf = meter.get_power_factor_with_unit().await.unwrap();
        assert_eq!(pf.unit, "");
        assert_eq!(pf.to_string(), "0.87");
    }

    // ===== Channel management =====

    #[tokio::test]
    async fn test_close_releases_channel() {
        let mut meter = driver_with_mock();
        assert!(meter.is_connected());

        meter.close().await.unwrap();
        assert!(!meter.is_connected());
    }
}

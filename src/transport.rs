//! Serial transport layer
//!
//! [`MeterTransport`] is the boundary the driver talks through: one blocking
//! request/response exchange per call. The production implementation is
//! [`RtuTransport`] over a serial port; tests substitute a mock that records
//! requests and replays canned responses.
//!
//! The serial parameters are fixed (9600-8-N-1, 200 ms response timeout) —
//! the device supports nothing else, so they are not part of the public
//! surface.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::constants::{BAUD_RATE, MAX_RTU_FRAME_SIZE, RESPONSE_TIMEOUT};
use crate::error::{MeterError, MeterResult};
use crate::frame::{decode_response, encode_request};
use crate::protocol::{MeterRequest, MeterResponse};

/// Format raw bytes as a hex string for packet logging
fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log a frame with its direction
fn log_packet(direction: &str, slave_id: u8, data: &[u8]) {
    info!(
        "[PZEM-RTU] {} slave:{} {}",
        direction,
        slave_id,
        format_hex_packet(data)
    );
}

/// Transport capability the driver composes.
///
/// Implementations own the physical channel and perform the complete
/// request/response cycle: frame encoding, transmission, response reception,
/// decoding, and integrity checks. The driver never touches raw bytes.
pub trait MeterTransport: Send + Sync {
    /// Perform one request/response exchange.
    ///
    /// # Errors
    ///
    /// - `MeterError::Timeout` — no complete response in the window
    /// - `MeterError::Frame` — CRC mismatch or malformed frame
    /// - `MeterError::Connection` / `MeterError::Io` — channel failure
    /// - `MeterError::Exception` — device answered with a Modbus exception
    /// - `MeterError::Protocol` — reply does not match the request
    fn request(
        &mut self,
        request: &MeterRequest,
    ) -> impl std::future::Future<Output = MeterResult<MeterResponse>> + Send;

    /// Check if the channel is open
    fn is_connected(&self) -> bool;

    /// Close the channel and release the port handle
    fn close(&mut self) -> impl std::future::Future<Output = MeterResult<()>> + Send;

    /// Get communication statistics
    fn get_stats(&self) -> TransportStats;
}

/// Transport layer statistics
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Modbus RTU transport over a serial port.
///
/// Opens the port at construction with the fixed device parameters and keeps
/// it for the transport's lifetime; the handle is released on [`close`] or
/// drop, on success and error paths alike.
///
/// [`close`]: MeterTransport::close
pub struct RtuTransport {
    /// Serial port handle; `None` once closed
    port: Option<tokio_serial::SerialStream>,
    /// Port name/path, kept for diagnostics
    port_name: String,
    /// Per-exchange response timeout
    timeout: Duration,
    /// Minimum quiet time between frames (3.5 character times)
    frame_gap: Duration,
    /// Transport statistics
    stats: TransportStats,
    /// Hex-dump every frame at info level
    packet_logging: bool,
}

impl RtuTransport {
    /// Open the serial port with the device's fixed parameters.
    pub fn open(port: &str) -> MeterResult<Self> {
        Self::open_with_logging(port, false)
    }

    /// Open the serial port with packet logging enabled or disabled.
    pub fn open_with_logging(port: &str, packet_logging: bool) -> MeterResult<Self> {
        // 3.5 character times at 11 bits per character
        let char_time_us = u64::from(11_000_000 / BAUD_RATE);
        let frame_gap = Duration::from_micros(char_time_us * 35 / 10);

        let mut transport = Self {
            port: None,
            port_name: port.to_string(),
            timeout: RESPONSE_TIMEOUT,
            frame_gap,
            stats: TransportStats::default(),
            packet_logging,
        };

        transport.connect()?;

        Ok(transport)
    }

    /// Port name this transport was opened on
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Enable or disable packet logging
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.packet_logging = enabled;
    }

    /// Open the serial port handle
    fn connect(&mut self) -> MeterResult<()> {
        let builder = tokio_serial::new(&self.port_name, BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(self.timeout);

        let port = tokio_serial::SerialStream::open(&builder).map_err(|e| {
            MeterError::connection(format!(
                "Failed to open serial port {}: {}",
                self.port_name, e
            ))
        })?;

        self.port = Some(port);

        Ok(())
    }

    /// Read one RTU frame: bytes arrive back to back, a gap of 3.5 character
    /// times ends the frame. The caller bounds the whole read with the
    /// response timeout.
    async fn read_frame(&mut self) -> MeterResult<Vec<u8>> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| MeterError::connection("Serial port not open"))?;

        let mut frame = Vec::new();
        let mut buffer = [0u8; 1];

        loop {
            match timeout(self.frame_gap, port.read_exact(&mut buffer)).await {
                Ok(Ok(_)) => {
                    frame.push(buffer[0]);

                    if frame.len() > MAX_RTU_FRAME_SIZE {
                        return Err(MeterError::frame("RTU frame too large"));
                    }
                }
                Ok(Err(e)) => {
                    return Err(MeterError::io(format!("Serial read error: {}", e)));
                }
                Err(_) => {
                    // Gap elapsed: end of frame if we have data, else keep
                    // waiting for the first byte (outer timeout bounds us)
                    if !frame.is_empty() {
                        break;
                    }
                }
            }
        }

        Ok(frame)
    }
}

impl MeterTransport for RtuTransport {
    async fn request(&mut self, request: &MeterRequest) -> MeterResult<MeterResponse> {
        request.validate()?;

        if self.port.is_none() {
            self.connect()?;
        }

        // Quiet time before transmitting on the shared half-duplex bus
        tokio::time::sleep(self.frame_gap).await;

        let frame = encode_request(request)?;
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;

        if self.packet_logging {
            log_packet("send", request.slave_id, &frame);
        }

        let port = self
            .port
            .as_mut()
            .ok_or_else(|| MeterError::connection("Serial port not open"))?;

        match timeout(self.timeout, port.write_all(&frame)).await {
            Ok(Ok(_)) => {
                let _ = timeout(self.timeout, port.flush()).await;
            }
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(MeterError::io(format!("Failed to send frame: {}", e)));
            }
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(MeterError::timeout(
                    "send request",
                    self.timeout.as_millis() as u64,
                ));
            }
        }

        let response_frame = match timeout(self.timeout, self.read_frame()).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(e);
            }
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(MeterError::timeout(
                    "read response",
                    self.timeout.as_millis() as u64,
                ));
            }
        };

        self.stats.responses_received += 1;
        self.stats.bytes_received += response_frame.len() as u64;

        if self.packet_logging {
            log_packet("receive", request.slave_id, &response_frame);
        }

        let response = decode_response(&response_frame)?;

        if response.slave_id != request.slave_id {
            self.stats.errors += 1;
            return Err(MeterError::protocol(format!(
                "Response slave address mismatch: expected {}, got {}",
                request.slave_id, response.slave_id
            )));
        }

        if let Some(error) = response.get_exception() {
            self.stats.errors += 1;
            if let Some(detail) = response.exception_detail() {
                debug!("Device exception: {}", detail);
            }
            return Err(error);
        }

        Ok(response)
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn close(&mut self) -> MeterResult<()> {
        // Dropping the SerialStream releases the port handle
        self.port.take();
        Ok(())
    }

    fn get_stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

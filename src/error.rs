//! Core error types and result handling
//!
//! Every fallible operation in this crate returns [`MeterResult`]. The error
//! taxonomy separates caller mistakes (configuration, arguments) from bus
//! failures (timeout, CRC, I/O) and from malformed or unexpected device
//! replies (protocol, exception), so callers can decide what is retryable.

use thiserror::Error;

/// Result type alias for meter operations
pub type MeterResult<T> = Result<T, MeterError>;

/// Error type covering driver construction, command validation, and the
/// complete request/response exchange.
#[derive(Error, Debug)]
pub enum MeterError {
    /// Invalid construction arguments (slave address range, serial port)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Out-of-range command input, rejected before any bus traffic
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Serial port could not be opened or is no longer available
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// I/O failure while reading or writing the serial port
    #[error("I/O error: {message}")]
    Io { message: String },

    /// No complete response within the configured window
    #[error("Timeout during {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Frame-level failure: CRC mismatch, truncated or oversized frame
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Structurally valid reply that does not match the request
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Device answered with a Modbus exception response
    #[error("Device exception 0x{code:02X} for function 0x{function:02X}")]
    Exception { function: u8, code: u8 },

    /// Function code not known to this device
    #[error("Invalid function code: 0x{code:02X}")]
    InvalidFunction { code: u8 },
}

impl MeterError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a timeout error for the named operation
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a frame error
    pub fn frame<S: Into<String>>(message: S) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// True for errors raised by the transport exchange itself
    /// (timeout, framing/CRC, connection loss, raw I/O).
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Io { .. } | Self::Timeout { .. } | Self::Frame { .. }
        )
    }
}

//! # Ultramat Error Handling
//!
//! This module defines the UltramatError enum, which represents the different error
//! types that can occur in the ultramat-rs crate, and the DecodeError enum for
//! field-level decoding faults.

use std::time::Duration;
use thiserror::Error;

/// Field-level decoding faults.
///
/// These never abort a frame on their own: the decoder keeps what it already
/// decoded and the classifier reports them so the caller can log and continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A field contained characters that are not ASCII hex digits.
    #[error("Invalid hex field at offset {offset}: {text:?}")]
    InvalidHex { offset: usize, text: String },

    /// A field offset points past the end of the frame.
    #[error("Field at offset {offset} exceeds frame length {len}")]
    OutOfBounds { offset: usize, len: usize },

    /// The processing mode code is not part of the variant's mode scheme.
    #[error("Unknown processing mode code: 0x{0:02X}")]
    UnknownMode(u8),

    /// The sub-type index does not exist in the lookup table of the mode.
    #[error("Unknown sub-type {index} for mode {mode}")]
    UnknownSubtype { mode: String, index: u8 },
}

/// Represents the different error types that can occur in the Ultramat crate.
#[derive(Debug, Error)]
pub enum UltramatError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Start or end sentinel not found where the frame layout expects it.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Indicates a checksum mismatch.
    #[error("Invalid checksum: expected {expected:04X}, calculated {calculated:04X}")]
    Checksum { expected: u16, calculated: u16 },

    /// No data arrived within the read deadline.
    #[error("Timeout after {waited_ms} ms waiting for device data")]
    Timeout { waited_ms: u64 },

    /// A field could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The device reports a different model than the configured one.
    #[error("Protocol mismatch: expected {expected}, device reports {found}")]
    ProtocolMismatch { expected: String, found: String },

    /// Framing or checksum failures kept recurring beyond the retry bound.
    #[error("I/O error: no valid frame after {attempts} attempts ({reason})")]
    RetriesExhausted { attempts: u32, reason: String },

    /// The transport is not open.
    #[error("Transport not connected")]
    NotConnected,

    /// The device answered a configuration write with NAK.
    #[error("Configuration write rejected by device: {0}")]
    ConfigWriteRejected(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl UltramatError {
    /// Builds a timeout error for the given deadline.
    pub fn timeout(waited: Duration) -> Self {
        UltramatError::Timeout {
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// True for read deadlines that expired without data.
    pub fn is_timeout(&self) -> bool {
        matches!(self, UltramatError::Timeout { .. })
    }

    /// Framing, checksum and decode faults are retried or recovered locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UltramatError::Framing(_) | UltramatError::Checksum { .. } | UltramatError::Decode(_)
        )
    }

    /// Errors that stop the gatherer loop.
    pub fn is_fatal(&self) -> bool {
        !self.is_timeout() && !self.is_recoverable()
    }
}

impl From<std::io::Error> for UltramatError {
    fn from(err: std::io::Error) -> Self {
        UltramatError::SerialPortError(err.to_string())
    }
}

impl From<tokio_serial::Error> for UltramatError {
    fn from(err: tokio_serial::Error) -> Self {
        UltramatError::SerialPortError(err.to_string())
    }
}

impl From<serde_json::Error> for UltramatError {
    fn from(err: serde_json::Error) -> Self {
        UltramatError::Config(err.to_string())
    }
}

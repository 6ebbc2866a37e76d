//! Error types for the meter emulation session

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Why a registry entry was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntry {
    /// Device number (position in the registry)
    pub index: usize,
    /// Serial number as configured
    pub serial_number: String,
    /// Human-readable problem
    pub reason: &'static str,
}

impl fmt::Display for InvalidEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} ({:?}): {}",
            self.index, self.serial_number, self.reason
        )
    }
}

/// Errors from validating the configured device list
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// One or more serial numbers are not exactly eight ASCII digits
    #[error("invalid serial numbers: {}", format_entries(.entries))]
    InvalidSerialNumbers { entries: Vec<InvalidEntry> },
}

fn format_entries(entries: &[InvalidEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A transmission timing value the session cannot work with
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimingError {
    /// Divisor or slack factor is zero, negative or not a number
    #[error("{name} must be a positive number, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    /// Turnaround at or beyond what the master waits for an answer
    #[error("turnaround of {turnaround:?} is not below the {limit:?} limit")]
    TurnaroundTooLong { turnaround: Duration, limit: Duration },

    #[error("chunk threshold must be at least one byte")]
    ZeroChunkThreshold,
}

/// Errors that end the current exchange
///
/// None of these stop the session; the next frame is read as usual.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Handshake addressed a serial number that is not configured
    #[error("unknown device: {0:?}")]
    UnknownDevice(String),

    /// Read, write or speed change failed on the serial line
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Readout trigger did not start with ACK or '.', the link or master is
    /// not behaving
    #[error("protocol violation: readout trigger starts with 0x{leading_byte:02X}")]
    ProtocolViolation { leading_byte: u8 },
}

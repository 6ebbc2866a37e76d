//! Error types for IEC 62056-21 encoding helpers

use thiserror::Error;

/// Errors raised while mapping protocol parameters
///
/// Frame classification itself never fails; these only come from the
/// conversions between configuration values and wire codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Baud rate has no IEC 62056-21 baud code
    #[error("unsupported baud rate: {0} (expected 300, 600, 1200, 2400, 4800 or 9600)")]
    UnsupportedBaudRate(u32),

    /// Character is not a mode C baud code
    #[error("unknown baud code: {0:?}")]
    UnknownBaudCode(char),
}

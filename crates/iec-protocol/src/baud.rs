//! IEC 62056-21 mode C baud rate codes
//!
//! The identification message and the option-select message carry the
//! transmission speed as a single digit `0`..`5`.

use crate::error::ProtocolError;

/// Baud rates that have a mode C code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaudRate {
    /// 300 baud, code `0` (the mandatory start speed)
    B300,
    /// 600 baud, code `1`
    B600,
    /// 1200 baud, code `2`
    B1200,
    /// 2400 baud, code `3`
    B2400,
    /// 4800 baud, code `4`
    B4800,
    /// 9600 baud, code `5`
    B9600,
}

impl BaudRate {
    /// All rates in code order
    pub const ALL: [BaudRate; 6] = [
        BaudRate::B300,
        BaudRate::B600,
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
    ];

    /// Bits per second
    pub fn bps(&self) -> u32 {
        match self {
            BaudRate::B300 => 300,
            BaudRate::B600 => 600,
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
        }
    }

    /// Numeric code `0..=5`
    pub fn code(&self) -> u8 {
        match self {
            BaudRate::B300 => 0,
            BaudRate::B600 => 1,
            BaudRate::B1200 => 2,
            BaudRate::B2400 => 3,
            BaudRate::B4800 => 4,
            BaudRate::B9600 => 5,
        }
    }

    /// Code as it appears on the wire
    pub fn code_char(&self) -> char {
        char::from(b'0' + self.code())
    }

    /// Map bits per second to a rate
    pub fn from_bps(bps: u32) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.bps() == bps)
            .ok_or(ProtocolError::UnsupportedBaudRate(bps))
    }

    /// Map a wire code digit to a rate
    pub fn from_code_char(code: char) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.code_char() == code)
            .ok_or(ProtocolError::UnknownBaudCode(code))
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} baud", self.bps())
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ProtocolError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bps(bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(BaudRate::from_bps(300).unwrap().code(), 0);
        assert_eq!(BaudRate::from_bps(9600).unwrap().code(), 5);
        assert_eq!(BaudRate::from_code_char('3').unwrap(), BaudRate::B2400);
    }

    #[test]
    fn test_every_rate_maps_back() {
        for rate in BaudRate::ALL {
            assert_eq!(BaudRate::from_bps(rate.bps()), Ok(rate));
            assert_eq!(BaudRate::from_code_char(rate.code_char()), Ok(rate));
        }
    }

    #[test]
    fn test_unsupported_rates() {
        assert_eq!(
            BaudRate::from_bps(19200),
            Err(ProtocolError::UnsupportedBaudRate(19200))
        );
        assert_eq!(
            BaudRate::from_code_char('6'),
            Err(ProtocolError::UnknownBaudCode('6'))
        );
    }
}

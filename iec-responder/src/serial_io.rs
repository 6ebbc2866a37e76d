//! Serial port setup

use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use crate::settings::{ParitySetting, ResponderSettings};

pub fn data_bits(bits: u8) -> Option<DataBits> {
    match bits {
        5 => Some(DataBits::Five),
        6 => Some(DataBits::Six),
        7 => Some(DataBits::Seven),
        8 => Some(DataBits::Eight),
        _ => None,
    }
}

pub fn stop_bits(bits: u8) -> Option<StopBits> {
    match bits {
        1 => Some(StopBits::One),
        2 => Some(StopBits::Two),
        _ => None,
    }
}

impl From<ParitySetting> for Parity {
    fn from(parity: ParitySetting) -> Self {
        match parity {
            ParitySetting::None => Parity::None,
            ParitySetting::Odd => Parity::Odd,
            ParitySetting::Even => Parity::Even,
        }
    }
}

/// Open the configured port at the sign-on speed
///
/// Settings must have been validated; an out-of-range line format falls back
/// to 7E1, the IEC 62056-21 default.
pub fn open_line(settings: &ResponderSettings) -> Result<SerialStream, tokio_serial::Error> {
    info!(
        "Opening {} at {} baud ({} data bits, {:?} parity, {} stop bits)",
        settings.port,
        settings.baud_rate_start,
        settings.data_bits,
        settings.parity,
        settings.stop_bits
    );
    tokio_serial::new(&settings.port, settings.baud_rate_start)
        .data_bits(data_bits(settings.data_bits).unwrap_or(DataBits::Seven))
        .parity(settings.parity.into())
        .stop_bits(stop_bits(settings.stop_bits).unwrap_or(StopBits::One))
        .open_native_async()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format_mapping() {
        assert_eq!(data_bits(7), Some(DataBits::Seven));
        assert_eq!(data_bits(9), None);
        assert_eq!(stop_bits(2), Some(StopBits::Two));
        assert_eq!(stop_bits(0), None);
        assert_eq!(Parity::from(ParitySetting::Even), Parity::Even);
    }
}

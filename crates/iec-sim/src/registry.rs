//! Configured devices
//!
//! The registry is an ordered list; a device's position is its device
//! number. It is built once from configuration and only read afterwards, so
//! it can be shared behind an `Arc` with anything that wants to report on it.

use iec_protocol::Brand;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{InvalidEntry, RegistryError, SessionError};

/// Length of a meter serial number
pub const SERIAL_NUMBER_LEN: usize = 8;

/// One emulated meter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Eight digit serial number the master addresses
    pub serial_number: String,
    /// Brand to emulate
    #[serde(default)]
    pub brand: Brand,
    /// Disabled devices still answer the handshake but read out the generic block
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DeviceEntry {
    /// Create an enabled device entry
    pub fn new(serial_number: impl Into<String>, brand: Brand) -> Self {
        Self {
            serial_number: serial_number.into(),
            brand,
            enabled: true,
        }
    }

    /// Check the serial number shape
    fn serial_problem(&self) -> Option<&'static str> {
        if self.serial_number.len() != SERIAL_NUMBER_LEN {
            Some("serial number must be exactly 8 digits")
        } else if !self.serial_number.bytes().all(|b| b.is_ascii_digit()) {
            Some("serial number must only contain digits")
        } else {
            None
        }
    }
}

/// Ordered, read-only list of emulated meters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    devices: Vec<DeviceEntry>,
}

impl DeviceRegistry {
    /// Create a registry from configured entries
    pub fn new(devices: Vec<DeviceEntry>) -> Self {
        Self { devices }
    }

    /// Check every serial number
    ///
    /// All offending entries are logged and returned together; a single bad
    /// entry makes the whole registry invalid.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let entries: Vec<InvalidEntry> = self
            .devices
            .iter()
            .enumerate()
            .filter_map(|(index, device)| {
                device.serial_problem().map(|reason| InvalidEntry {
                    index,
                    serial_number: device.serial_number.clone(),
                    reason,
                })
            })
            .collect();

        if entries.is_empty() {
            return Ok(());
        }
        for entry in &entries {
            error!("Invalid device configuration: {}", entry);
        }
        Err(RegistryError::InvalidSerialNumbers { entries })
    }

    /// Find the device number for a serial number (exact match)
    pub fn find_by_serial(&self, serial_number: &str) -> Option<usize> {
        self.devices
            .iter()
            .position(|device| device.serial_number == serial_number)
    }

    /// Resolve the address from a sign-on request
    ///
    /// An empty address is a broadcast and is accepted without picking a
    /// device (`Ok(None)`). A non-empty address must be configured.
    pub fn resolve(&self, address: &str) -> Result<Option<usize>, SessionError> {
        if address.is_empty() {
            debug!("Sign-on without address, accepting as broadcast");
            return Ok(None);
        }
        match self.find_by_serial(address) {
            Some(index) => {
                debug!("Serial number {} is device {}", address, index);
                Ok(Some(index))
            }
            None => Err(SessionError::UnknownDevice(address.to_string())),
        }
    }

    /// Get a device by number
    pub fn get(&self, index: usize) -> Option<&DeviceEntry> {
        self.devices.get(index)
    }

    /// Number of configured devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if no devices are configured
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterate over devices in device-number order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.devices.iter()
    }
}

impl FromIterator<DeviceEntry> for DeviceRegistry {
    fn from_iter<I: IntoIterator<Item = DeviceEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

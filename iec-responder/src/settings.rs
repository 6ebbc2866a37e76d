//! Responder settings
//!
//! Loaded once from a JSON file before the serial port is opened. Anything
//! invalid stops the responder before it answers a single frame.

use std::path::{Path, PathBuf};
use std::time::Duration;

use iec_protocol::{BaudRate, ProtocolError};
use iec_sim::{
    DeviceEntry, DeviceRegistry, RegistryError, SessionConfig, TimingError, TransmissionTiming,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::serial_io;

/// Settings file used when none is given on the command line
pub const DEFAULT_SETTINGS_FILE: &str = "iec-responder.json";

/// Errors from loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid baud rate setting: {0}")]
    Baud(#[from] ProtocolError),

    #[error("invalid timing: {0}")]
    Timing(#[from] TimingError),

    #[error("invalid line format: {0}")]
    LineFormat(String),

    #[error("no serial port configured")]
    MissingPort,
}

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParitySetting {
    None,
    Odd,
    #[default]
    Even,
}

/// Line timing, in plain numbers for the settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Turnaround before the readout, in milliseconds
    pub turnaround_ms: u64,
    /// Pause after each chunk, in milliseconds
    pub inter_chunk_pause_ms: u64,
    /// Payloads longer than this are chunked
    pub chunk_threshold: usize,
    pub chars_per_baud_divisor: f64,
    pub write_slack_factor: f64,
    /// Wait after answering a sign-on request, in milliseconds
    pub handshake_settle_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        TransmissionTiming::default().into()
    }
}

impl From<TransmissionTiming> for TimingSettings {
    fn from(timing: TransmissionTiming) -> Self {
        Self {
            turnaround_ms: timing.turnaround.as_millis() as u64,
            inter_chunk_pause_ms: timing.inter_chunk_pause.as_millis() as u64,
            chunk_threshold: timing.chunk_threshold,
            chars_per_baud_divisor: timing.chars_per_baud_divisor,
            write_slack_factor: timing.write_slack_factor,
            handshake_settle_ms: timing.handshake_settle.as_millis() as u64,
        }
    }
}

impl From<&TimingSettings> for TransmissionTiming {
    fn from(settings: &TimingSettings) -> Self {
        Self {
            turnaround: Duration::from_millis(settings.turnaround_ms),
            inter_chunk_pause: Duration::from_millis(settings.inter_chunk_pause_ms),
            chunk_threshold: settings.chunk_threshold,
            chars_per_baud_divisor: settings.chars_per_baud_divisor,
            write_slack_factor: settings.write_slack_factor,
            handshake_settle: Duration::from_millis(settings.handshake_settle_ms),
        }
    }
}

/// Everything the responder needs to start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderSettings {
    /// Serial port path
    pub port: String,
    /// Sign-on speed
    pub baud_rate_start: u32,
    /// Readout speed
    pub baud_rate_runtime: u32,
    pub data_bits: u8,
    pub parity: ParitySetting,
    pub stop_bits: u8,
    /// Emulated meters, in device-number order
    pub devices: Vec<DeviceEntry>,
    pub timing: TimingSettings,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate_start: 300,
            baud_rate_runtime: 9600,
            data_bits: 7,
            parity: ParitySetting::Even,
            stop_bits: 1,
            devices: Vec::new(),
            timing: TimingSettings::default(),
        }
    }
}

impl ResponderSettings {
    /// Load and validate settings
    ///
    /// `port_override` replaces the port from the file before validation.
    pub fn load(path: &Path, port_override: Option<String>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Self =
            serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(port) = port_override {
            settings.port = port;
        }
        settings.validate()?;

        info!(
            "Loaded {} with {} devices",
            path.display(),
            settings.devices.len()
        );
        Ok(settings)
    }

    /// Check settings before anything is opened
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.registry().validate()?;
        BaudRate::from_bps(self.baud_rate_start)?;
        BaudRate::from_bps(self.baud_rate_runtime)?;
        TransmissionTiming::from(&self.timing).validate()?;
        if serial_io::data_bits(self.data_bits).is_none() {
            return Err(SettingsError::LineFormat(format!(
                "{} data bits",
                self.data_bits
            )));
        }
        if serial_io::stop_bits(self.stop_bits).is_none() {
            return Err(SettingsError::LineFormat(format!(
                "{} stop bits",
                self.stop_bits
            )));
        }
        if self.port.trim().is_empty() {
            return Err(SettingsError::MissingPort);
        }
        Ok(())
    }

    /// Registry built from the configured devices
    pub fn registry(&self) -> DeviceRegistry {
        DeviceRegistry::new(self.devices.clone())
    }

    pub fn session_config(&self) -> Result<SessionConfig, SettingsError> {
        Ok(SessionConfig {
            start_baud: BaudRate::from_bps(self.baud_rate_start)?,
            runtime_baud: BaudRate::from_bps(self.baud_rate_runtime)?,
            timing: TransmissionTiming::from(&self.timing),
        })
    }
}

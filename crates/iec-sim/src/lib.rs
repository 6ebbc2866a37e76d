//! IEC 62056-21 Meter Emulation
//!
//! This crate answers a meter-reading master over a serial line as if one of
//! a configured set of meters were attached:
//!
//! - **DeviceRegistry**: the configured meters, validated once at startup
//! - **FrameTransport**: CRLF frame reads and raw writes over a [`SerialLine`]
//! - **TransmissionScheduler**: baud switching, turnaround and drain waits
//! - **ProtocolSession**: the state machine tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use iec_protocol::Brand;
//! use iec_sim::{CannedReadouts, DeviceEntry, DeviceRegistry, ProtocolSession, SessionConfig, SimulatedLine};
//!
//! # async fn example() -> Result<(), iec_sim::SessionError> {
//! let registry = DeviceRegistry::new(vec![DeviceEntry::new("00000001", Brand::Luna)]);
//! let (_master, line) = tokio::io::duplex(4096);
//!
//! let mut session = ProtocolSession::new(
//!     Arc::new(registry),
//!     SimulatedLine::new(line),
//!     CannedReadouts,
//!     SessionConfig::default(),
//! );
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod readouts;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use error::{InvalidEntry, RegistryError, SessionError, TimingError};
pub use events::{EventSink, SessionEvent};
pub use readouts::{CannedReadouts, ReadoutSource};
pub use registry::{DeviceEntry, DeviceRegistry};
pub use scheduler::{ReadoutReport, TransmissionScheduler, TransmissionTiming, MAX_TURNAROUND};
pub use session::{ProtocolSession, SessionConfig, SessionState, READ_ERROR_BACKOFF};
pub use transport::{FrameTransport, SerialLine, SimulatedLine};

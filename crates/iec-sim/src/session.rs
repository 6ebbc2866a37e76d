//! Protocol session state machine
//!
//! One session owns the serial line and answers one master at a time. Each
//! frame is read, classified and fully answered (including every timed wait)
//! before the next frame is read.
//!
//! ```text
//!            /?addr! (known or broadcast)
//!   START  <------------------------------  any
//!     |
//!     | <ACK>0Z0
//!     v
//!   READOUT   (device cleared, line back at start speed)
//!
//!   NAK        -> state unchanged
//!   unknown    -> START, no answer, earlier device kept
//!   noise      -> ERROR (advisory, reading continues)
//!   I/O error  -> ERROR, device cleared, line back at start speed
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use iec_protocol::control::ACK;
use iec_protocol::{classify, frame_readout, identification_message, BaudRate, Brand, FrameKind};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::events::{EventSink, SessionEvent};
use crate::readouts::ReadoutSource;
use crate::registry::DeviceRegistry;
use crate::scheduler::{TransmissionScheduler, TransmissionTiming};
use crate::transport::{FrameTransport, SerialLine};

/// Pause before reading again after a failed read
pub const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Session state
///
/// `Repeat` exists for completeness of the state codes; a repeat request
/// resolves to the previous state within the same step, so the session never
/// rests in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Error,
    Start,
    Readout,
    Repeat,
}

impl SessionState {
    /// Numeric state code (-1, 0, 1, 2)
    pub fn code(&self) -> i8 {
        match self {
            SessionState::Error => -1,
            SessionState::Start => 0,
            SessionState::Readout => 1,
            SessionState::Repeat => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Error => "error",
            SessionState::Start => "start",
            SessionState::Readout => "readout",
            SessionState::Repeat => "repeat",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Line speeds and timing for a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Speed for sign-on (the line is expected to already run at it)
    pub start_baud: BaudRate,
    /// Speed for the data readout
    pub runtime_baud: BaudRate,
    pub timing: TransmissionTiming,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_baud: BaudRate::B300,
            runtime_baud: BaudRate::B9600,
            timing: TransmissionTiming::default(),
        }
    }
}

/// Meter responder session
pub struct ProtocolSession<L, R> {
    registry: Arc<DeviceRegistry>,
    transport: FrameTransport<L>,
    readouts: R,
    scheduler: TransmissionScheduler,
    runtime_baud: BaudRate,
    state: SessionState,
    addressed_device: Option<usize>,
    requested_serial: String,
    negotiated_baud: u32,
    events: EventSink,
}

impl<L, R> ProtocolSession<L, R>
where
    L: SerialLine,
    R: ReadoutSource,
{
    pub fn new(registry: Arc<DeviceRegistry>, line: L, readouts: R, config: SessionConfig) -> Self {
        let start = config.start_baud.bps();
        Self {
            registry,
            transport: FrameTransport::new(line, start),
            readouts,
            scheduler: TransmissionScheduler::new(config.timing, start, config.runtime_baud.bps()),
            runtime_baud: config.runtime_baud,
            state: SessionState::Start,
            addressed_device: None,
            requested_serial: String::new(),
            negotiated_baud: start,
            events: EventSink::disabled(),
        }
    }

    /// Publish session events on `tx`
    pub fn with_event_sender(mut self, tx: broadcast::Sender<SessionEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Device number of the device currently signed on
    pub fn addressed_device(&self) -> Option<usize> {
        self.addressed_device
    }

    /// Address from the last sign-on request
    pub fn requested_serial(&self) -> &str {
        &self.requested_serial
    }

    pub fn negotiated_baud(&self) -> u32 {
        self.negotiated_baud
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn transport(&self) -> &FrameTransport<L> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut FrameTransport<L> {
        &mut self.transport
    }

    pub fn into_transport(self) -> FrameTransport<L> {
        self.transport
    }

    /// Serve frames until the line closes
    ///
    /// Exchange failures are handled inside [`handle_frame`](Self::handle_frame)
    /// and never stop the loop. A read error abandons the exchange like a
    /// write error and reading resumes after [`READ_ERROR_BACKOFF`]. Only
    /// losing the line ends the loop.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        info!(
            "Responder ready: {} devices, {} / {} baud",
            self.registry.len(),
            self.scheduler.start_baud(),
            self.scheduler.runtime_baud()
        );

        loop {
            let frame = match self.transport.read_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Serial line closed");
                    return Ok(());
                }
                Err(e) if is_disconnect(&e) => {
                    error!("Serial line lost: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Read failed: {}", e);
                    self.abandon_exchange(&SessionError::Transport(e));
                    sleep(READ_ERROR_BACKOFF).await;
                    continue;
                }
            };

            // already logged and applied to state
            let _ = self.handle_frame(&frame).await;
        }
    }

    /// Classify and answer one frame
    ///
    /// Returns the state after the frame. On error the exchange is abandoned
    /// and the state adjusted before the error is returned.
    pub async fn handle_frame(&mut self, frame: &[u8]) -> Result<SessionState, SessionError> {
        debug!(
            "Frame {:02X?} ({:?})",
            frame,
            String::from_utf8_lossy(frame)
        );
        let kind = classify(frame);
        self.events
            .emit(SessionEvent::FrameClassified { kind: kind.clone() });

        let result = match kind {
            FrameKind::StartHandshake { address } => self.start_handshake(address).await,
            FrameKind::Readout { proposed_baud } => self.readout(frame, proposed_baud).await,
            FrameKind::Repeat => {
                debug!("Repeat requested, staying in {}", self.state);
                Ok(self.state)
            }
            FrameKind::Unrecognized => {
                warn!("Unrecognized frame: {:?}", String::from_utf8_lossy(frame));
                Ok(SessionState::Error)
            }
        };

        match result {
            Ok(next) => {
                self.set_state(next);
                Ok(next)
            }
            Err(e) => {
                self.abandon_exchange(&e);
                Err(e)
            }
        }
    }

    async fn start_handshake(&mut self, address: String) -> Result<SessionState, SessionError> {
        self.requested_serial = address;
        let device = self.registry.resolve(&self.requested_serial)?;

        let (brand, serial) = match device.and_then(|index| self.registry.get(index)) {
            Some(entry) => (entry.brand, entry.serial_number.clone()),
            None => (Brand::None, String::new()),
        };
        self.addressed_device = device;

        let response = identification_message(brand, &serial, self.runtime_baud);
        info!(
            "Sign-on {:?}: device {:?}, answering as {}",
            self.requested_serial, device, brand
        );
        self.scheduler
            .send_handshake(&mut self.transport, response.as_bytes())
            .await?;

        self.events.emit(SessionEvent::HandshakeAccepted {
            address: self.requested_serial.clone(),
            device,
            brand,
        });
        Ok(SessionState::Start)
    }

    async fn readout(
        &mut self,
        frame: &[u8],
        proposed_baud: BaudRate,
    ) -> Result<SessionState, SessionError> {
        match frame.first() {
            Some(&ACK) | Some(&b'.') => {}
            other => {
                return Err(SessionError::ProtocolViolation {
                    leading_byte: other.copied().unwrap_or_default(),
                })
            }
        }
        debug!(
            "Master proposes {}, answering at {}",
            proposed_baud, self.runtime_baud
        );

        let brand = match self.addressed_device.and_then(|index| self.registry.get(index)) {
            Some(entry) if entry.enabled => entry.brand,
            Some(entry) => {
                warn!(
                    "Device {} is disabled, sending default readout",
                    entry.serial_number
                );
                Brand::None
            }
            None => {
                warn!("No device addressed, sending default readout");
                Brand::None
            }
        };

        let payload = frame_readout(brand, &self.readouts.readout_block(brand));
        info!("Sending {} readout ({} bytes)", brand, payload.len());

        self.negotiated_baud = self.scheduler.runtime_baud();
        let report = self
            .scheduler
            .send_readout(&mut self.transport, &payload, &self.events)
            .await?;

        info!("Readout finished after {:?} drain wait", report.drain_wait);
        self.events.emit(SessionEvent::ReadoutSent {
            brand,
            bytes: report.bytes,
            drain_wait: report.drain_wait,
        });
        self.negotiated_baud = self.scheduler.start_baud();
        self.addressed_device = None;
        Ok(SessionState::Readout)
    }

    fn abandon_exchange(&mut self, err: &SessionError) {
        let next = match err {
            SessionError::UnknownDevice(address) => {
                // a device signed on earlier stays addressed
                warn!("Unknown device {:?}, no answer sent", address);
                self.events.emit(SessionEvent::DeviceUnknown {
                    address: address.clone(),
                });
                self.set_state(SessionState::Start);
                return;
            }
            SessionError::Transport(e) => {
                error!("Exchange aborted: {}", e);
                self.restore_start_baud();
                SessionState::Error
            }
            SessionError::ProtocolViolation { .. } => {
                error!("Exchange abandoned: {}", err);
                SessionState::Error
            }
        };

        self.addressed_device = None;
        self.events.emit(SessionEvent::ExchangeFailed {
            reason: err.to_string(),
        });
        self.set_state(next);
    }

    /// Put the line back to sign-on speed after an aborted exchange
    ///
    /// The master retries from sign-on, which it sends at the start speed.
    fn restore_start_baud(&mut self) {
        let start = self.scheduler.start_baud();
        if self.transport.baud() != start {
            match self.transport.set_baud(start) {
                Ok(()) => {
                    info!("Switched back to {} baud after failed exchange", start);
                    self.events.emit(SessionEvent::BaudChanged { baud: start });
                }
                Err(e) => error!("Failed to switch back to {} baud: {}", start, e),
            }
        }
        self.negotiated_baud = self.transport.baud();
    }

    fn set_state(&mut self, next: SessionState) {
        if next != self.state {
            debug!("State {} -> {}", self.state, next);
            self.events.emit(SessionEvent::StateChanged {
                from: self.state,
                to: next,
            });
            self.state = next;
        }
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceEntry;
    use crate::transport::SimulatedLine;
    use iec_protocol::control::NAK;
    use tokio::io::DuplexStream;

    type TestSession = ProtocolSession<SimulatedLine<DuplexStream>, fn(Brand) -> Vec<u8>>;

    fn block(brand: Brand) -> Vec<u8> {
        format!("{}\n!", brand.name()).into_bytes()
    }

    fn session(devices: Vec<DeviceEntry>) -> (DuplexStream, TestSession) {
        let (master, line) = tokio::io::duplex(64 * 1024);
        let session = ProtocolSession::new(
            Arc::new(DeviceRegistry::new(devices)),
            SimulatedLine::new(line),
            block as fn(Brand) -> Vec<u8>,
            SessionConfig::default(),
        );
        (master, session)
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(SessionState::Error.code(), -1);
        assert_eq!(SessionState::Start.code(), 0);
        assert_eq!(SessionState::Readout.code(), 1);
        assert_eq!(SessionState::Repeat.code(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state() {
        let (_master, session) = session(vec![]);
        assert_eq!(session.state(), SessionState::Start);
        assert_eq!(session.addressed_device(), None);
        assert_eq!(session.negotiated_baud(), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_sets_error() {
        let (_master, mut session) = session(vec![]);
        let state = session.handle_frame(b"hello\r\n").await.unwrap();
        assert_eq!(state, SessionState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_keeps_state() {
        let (_master, mut session) = session(vec![]);
        session.handle_frame(b"garbage\r\n").await.unwrap();
        let state = session.handle_frame(&[NAK, b'\r', b'\n']).await.unwrap();
        assert_eq!(state, SessionState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_addresses_device() {
        let (_master, mut session) =
            session(vec![DeviceEntry::new("00000001", Brand::Luna)]);
        let state = session.handle_frame(b"/?00000001!\r\n").await.unwrap();
        assert_eq!(state, SessionState::Start);
        assert_eq!(session.addressed_device(), Some(0));
        assert_eq!(session.requested_serial(), "00000001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_protocol_violation() {
        let (_master, mut session) =
            session(vec![DeviceEntry::new("00000001", Brand::Luna)]);
        session.handle_frame(b"/?00000001!\r\n").await.unwrap();

        let err = session.handle_frame(b"X050\r\n").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::ProtocolViolation { leading_byte: b'X' }
        ));
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.addressed_device(), None);
        assert!(session.transport().line().baud_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dot_leader_is_accepted() {
        let (_master, mut session) = session(vec![]);
        let state = session.handle_frame(b".000\r\n").await.unwrap();
        assert_eq!(state, SessionState::Readout);
    }

    #[test]
    fn test_disconnect_kinds() {
        assert!(is_disconnect(&io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::TimedOut)));
    }
}

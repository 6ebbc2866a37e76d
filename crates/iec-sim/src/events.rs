//! Session events for monitoring
//!
//! The session reports what it does on a broadcast channel so a reporting
//! context can follow along without touching session state.

use std::time::Duration;

use iec_protocol::{Brand, FrameKind};
use tokio::sync::broadcast;

use crate::session::SessionState;

/// Something observable happened in the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A frame was read and classified
    FrameClassified { kind: FrameKind },
    /// A sign-on request was answered
    HandshakeAccepted {
        /// Address as received (empty for broadcast)
        address: String,
        /// Device number, if one was addressed
        device: Option<usize>,
        /// Brand used for the identification message
        brand: Brand,
    },
    /// A sign-on request named a serial number that is not configured
    DeviceUnknown { address: String },
    /// Line speed changed
    BaudChanged { baud: u32 },
    /// A readout block went out and the line drained
    ReadoutSent {
        brand: Brand,
        bytes: usize,
        drain_wait: Duration,
    },
    /// The exchange in flight was abandoned
    ExchangeFailed { reason: String },
    /// State machine moved
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
}

/// Optional event publisher
///
/// Sending never blocks, and having no subscriber is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<broadcast::Sender<SessionEvent>>,
}

impl EventSink {
    /// Sink that drops everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Sink publishing on the given channel
    pub fn new(tx: broadcast::Sender<SessionEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Publish an event if a channel is attached
    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscriber() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        EventSink::new(tx).emit(SessionEvent::BaudChanged { baud: 9600 });
        EventSink::disabled().emit(SessionEvent::BaudChanged { baud: 300 });
    }

    #[test]
    fn test_emit_reaches_subscriber() {
        let (tx, mut rx) = broadcast::channel(4);
        let sink = EventSink::new(tx);
        sink.emit(SessionEvent::DeviceUnknown {
            address: "99999999".into(),
        });
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::DeviceUnknown {
                address: "99999999".into()
            }
        );
    }
}

//! Timed transmission
//!
//! The master expects data within a turnaround window after its option-select
//! message, and a write call returns long before the UART has clocked the
//! bytes out. Everything that touches line timing lives here.
//!
//! A readout exchange runs these steps in order:
//!
//! 1. drain our side of the line
//! 2. switch to the runtime speed (skipped if already there)
//! 3. wait the turnaround delay
//! 4. write the payload, line by line or in chunks
//! 5. wait for the wire to drain at the current speed
//! 6. switch back to the start speed if step 2 switched
//!
//! Any transport error aborts the remaining steps.

use std::io;
use std::time::Duration;

use iec_protocol::transmit::{
    DEFAULT_CHARS_PER_BAUD_DIVISOR, DEFAULT_CHUNK_THRESHOLD, DEFAULT_WRITE_SLACK_FACTOR,
};
use iec_protocol::{line_to_wire, post_write_delay, split_chunks, split_lines};
use tokio::time::sleep;
use tracing::{debug, info};

/// Turnarounds must stay below this, the master gives up after 1.5 s
pub const MAX_TURNAROUND: Duration = Duration::from_millis(1500);

use crate::error::TimingError;
use crate::events::{EventSink, SessionEvent};
use crate::transport::{FrameTransport, SerialLine};

/// Timing knobs for the line
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionTiming {
    /// Wait between the switch to runtime speed and the first data byte
    pub turnaround: Duration,
    /// Pause after each chunk of a large payload
    pub inter_chunk_pause: Duration,
    /// Payloads longer than this are chunked
    pub chunk_threshold: usize,
    /// Divisor in the drain estimate (`baud / divisor` bytes per second)
    pub chars_per_baud_divisor: f64,
    /// Multiplier on the drain estimate
    pub write_slack_factor: f64,
    /// Wait after answering a sign-on request
    pub handshake_settle: Duration,
}

impl Default for TransmissionTiming {
    fn default() -> Self {
        Self {
            turnaround: Duration::from_millis(1100),
            inter_chunk_pause: Duration::from_millis(100),
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            chars_per_baud_divisor: DEFAULT_CHARS_PER_BAUD_DIVISOR,
            write_slack_factor: DEFAULT_WRITE_SLACK_FACTOR,
            handshake_settle: Duration::from_millis(10),
        }
    }
}

impl TransmissionTiming {
    /// Reject values that would break the exchange timing
    pub fn validate(&self) -> Result<(), TimingError> {
        for (name, value) in [
            ("chars_per_baud_divisor", self.chars_per_baud_divisor),
            ("write_slack_factor", self.write_slack_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TimingError::NotPositive { name, value });
            }
        }
        if self.turnaround >= MAX_TURNAROUND {
            return Err(TimingError::TurnaroundTooLong {
                turnaround: self.turnaround,
                limit: MAX_TURNAROUND,
            });
        }
        if self.chunk_threshold == 0 {
            return Err(TimingError::ZeroChunkThreshold);
        }
        Ok(())
    }

    /// Time the line needs to send `len` bytes at `baud`
    pub fn post_write_delay(&self, len: usize, baud: u32) -> Duration {
        post_write_delay(
            len,
            baud,
            self.chars_per_baud_divisor,
            self.write_slack_factor,
        )
    }
}

/// Outcome of a completed readout transmission
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutReport {
    /// Payload length in bytes
    pub bytes: usize,
    /// Speed the payload went out at
    pub baud: u32,
    /// Time waited for the wire to drain
    pub drain_wait: Duration,
    /// Whether the speed was switched (and switched back)
    pub switched: bool,
}

/// Writes responses with the timing the protocol requires
#[derive(Debug, Clone)]
pub struct TransmissionScheduler {
    timing: TransmissionTiming,
    start_baud: u32,
    runtime_baud: u32,
}

impl TransmissionScheduler {
    pub fn new(timing: TransmissionTiming, start_baud: u32, runtime_baud: u32) -> Self {
        Self {
            timing,
            start_baud,
            runtime_baud,
        }
    }

    pub fn timing(&self) -> &TransmissionTiming {
        &self.timing
    }

    pub fn start_baud(&self) -> u32 {
        self.start_baud
    }

    pub fn runtime_baud(&self) -> u32 {
        self.runtime_baud
    }

    /// Answer a sign-on request and give the master time to react
    pub async fn send_handshake<L: SerialLine>(
        &self,
        transport: &mut FrameTransport<L>,
        response: &[u8],
    ) -> io::Result<()> {
        self.write_payload(transport, response).await?;
        transport.flush().await?;
        sleep(self.timing.handshake_settle).await;
        Ok(())
    }

    /// Send a readout block at runtime speed and return to start speed
    pub async fn send_readout<L: SerialLine>(
        &self,
        transport: &mut FrameTransport<L>,
        payload: &[u8],
        events: &EventSink,
    ) -> io::Result<ReadoutReport> {
        transport.flush().await?;

        let switched = transport.baud() != self.runtime_baud;
        if switched {
            transport.set_baud(self.runtime_baud)?;
            info!("Switched to {} baud for readout", self.runtime_baud);
            events.emit(SessionEvent::BaudChanged {
                baud: self.runtime_baud,
            });
        }

        sleep(self.timing.turnaround).await;

        self.write_payload(transport, payload).await?;

        let baud = transport.baud();
        let drain_wait = self.timing.post_write_delay(payload.len(), baud);
        debug!(
            "Waiting {:?} for {} bytes to drain at {} baud",
            drain_wait,
            payload.len(),
            baud
        );
        sleep(drain_wait).await;

        if switched {
            transport.set_baud(self.start_baud)?;
            info!("Switched back to {} baud", self.start_baud);
            events.emit(SessionEvent::BaudChanged {
                baud: self.start_baud,
            });
        }

        Ok(ReadoutReport {
            bytes: payload.len(),
            baud,
            drain_wait,
            switched,
        })
    }

    /// Write a payload, choosing line or chunk mode by size
    pub async fn write_payload<L: SerialLine>(
        &self,
        transport: &mut FrameTransport<L>,
        payload: &[u8],
    ) -> io::Result<()> {
        if payload.len() <= self.timing.chunk_threshold {
            for line in split_lines(payload) {
                transport.write_bytes(&line_to_wire(line)).await?;
            }
            return Ok(());
        }

        let chunks = split_chunks(payload, self.timing.chunk_threshold);
        debug!("Sending {} bytes in {} chunks", payload.len(), chunks.len());
        for chunk in chunks {
            transport.write_bytes(chunk).await?;
            sleep(self.timing.inter_chunk_pause).await;
        }
        Ok(())
    }
}

//! Frame classification
//!
//! Every line received from the master is sorted into exactly one
//! [`FrameKind`]. The checks run in a fixed order and the first match wins:
//!
//! 1. a readout trigger token (`000`, `010`, ... `050`) anywhere outside the
//!    handshake address
//! 2. a handshake, i.e. both `/?` and `!` present
//! 3. a leading NAK byte (repeat request)
//! 4. anything else is unrecognized
//!
//! The address between `/?` and `!` is masked before looking for triggers,
//! since an eight digit serial number like `00000001` contains `000`.

use tracing::trace;

use crate::baud::BaudRate;
use crate::control::NAK;

/// Opens the sign-on message
pub const START_MARKER: &str = "/?";
/// Closes the sign-on message
pub const END_MARKER: &str = "!";
/// Manufacturer prefix some masters put in front of the address (`/?MSY12345678!`)
pub const MANUFACTURER_MARKER: &str = "MSY";

/// Option-select tokens that request a data readout, indexed by baud code
pub const READOUT_TRIGGERS: [&str; 6] = ["000", "010", "020", "030", "040", "050"];

/// Classification of one received frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// Option-select message asking for the data readout
    Readout {
        /// Speed the master proposes for the data phase
        proposed_baud: BaudRate,
    },
    /// Sign-on request `/?address!`; an empty address is a broadcast
    StartHandshake { address: String },
    /// NAK: the master wants the previous step again
    Repeat,
    /// Noise or a message we do not handle
    Unrecognized,
}

impl FrameKind {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::Readout { .. } => "readout",
            FrameKind::StartHandshake { .. } => "start-handshake",
            FrameKind::Repeat => "repeat",
            FrameKind::Unrecognized => "unrecognized",
        }
    }
}

/// Classify a raw frame, with or without its CRLF terminator
pub fn classify(frame: &[u8]) -> FrameKind {
    let text = String::from_utf8_lossy(strip_terminator(frame));

    let kind = if let Some(proposed_baud) = find_trigger(&mask_address(&text)) {
        FrameKind::Readout { proposed_baud }
    } else if text.contains(START_MARKER) && text.contains(END_MARKER) {
        FrameKind::StartHandshake {
            address: extract_address(&text),
        }
    } else if frame.first() == Some(&NAK) {
        FrameKind::Repeat
    } else {
        FrameKind::Unrecognized
    };

    trace!("Classified {:02X?} as {}", frame, kind.name());
    kind
}

/// Extract the device address from a sign-on message
///
/// `/?MSY12345678!` and `/?12345678!` both yield `12345678`. A missing
/// closing `!` yields an empty address.
pub fn extract_address(text: &str) -> String {
    let text = text.trim_end_matches(&['\r', '\n'][..]);
    let marker = if text.contains(MANUFACTURER_MARKER) {
        MANUFACTURER_MARKER
    } else {
        START_MARKER
    };
    slice_between(text, marker, END_MARKER)
        .unwrap_or_default()
        .to_string()
}

/// Drop a trailing CRLF (or lone LF/CR) as delivered by the line reader
fn strip_terminator(frame: &[u8]) -> &[u8] {
    let mut end = frame.len();
    while end > 0 && matches!(frame[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &frame[..end]
}

fn slice_between<'a>(text: &'a str, first: &str, last: &str) -> Option<&'a str> {
    let start = text.find(first)? + first.len();
    let end = text[start..].find(last)? + start;
    Some(&text[start..end])
}

/// Blank out the address part of a sign-on message
fn mask_address(text: &str) -> String {
    let Some(start) = text.find(START_MARKER).map(|i| i + START_MARKER.len()) else {
        return text.to_string();
    };
    match text[start..].find(END_MARKER) {
        Some(len) => format!("{}{}", &text[..start], &text[start + len..]),
        None => text.to_string(),
    }
}

fn find_trigger(text: &str) -> Option<BaudRate> {
    READOUT_TRIGGERS
        .into_iter()
        .zip(BaudRate::ALL)
        .find(|(token, _)| text.contains(token))
        .map(|(_, rate)| rate)
}

//! Transmission helpers
//!
//! Pure functions used by the scheduler to turn a response into write calls:
//!
//! - short payloads go out line by line, CRLF-terminated except for bare
//!   control bytes and the `ETX BCC` trailer
//! - long payloads are cut into chunks of at most the threshold, preferably
//!   at whitespace
//! - [`post_write_delay`] estimates how long the UART needs to clock the bytes
//!   out, since a write call may return long before that

use std::borrow::Cow;
use std::time::Duration;

use crate::control::{is_control_byte, CRLF, ETX};

/// Payloads longer than this are sent in chunks
pub const DEFAULT_CHUNK_THRESHOLD: usize = 2000;

/// Characters per baud divisor for the drain estimate (start, data, parity
/// and stop bits plus margin, tuned on real links)
pub const DEFAULT_CHARS_PER_BAUD_DIVISOR: f64 = 7.0;

/// Slack factor applied on top of the drain estimate
pub const DEFAULT_WRITE_SLACK_FACTOR: f64 = 1.5;

/// Split a payload into lines
///
/// Accepts `\n`, `\r\n` and `\r` as terminators. A terminator at the very end
/// does not produce an empty last line.
pub fn split_lines(payload: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < payload.len() {
        match payload[i] {
            b'\n' => {
                lines.push(&payload[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&payload[start..i]);
                if payload.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if start < payload.len() {
        lines.push(&payload[start..]);
    }
    lines
}

/// Bytes to write for one line
///
/// A single control byte and an `ETX <bcc>` pair are written as they are;
/// every other line gets CRLF appended.
pub fn line_to_wire(line: &[u8]) -> Cow<'_, [u8]> {
    match line {
        [byte] if is_control_byte(*byte) => Cow::Borrowed(line),
        [ETX, _] => Cow::Borrowed(line),
        _ => {
            let mut out = Vec::with_capacity(line.len() + CRLF.len());
            out.extend_from_slice(line);
            out.extend_from_slice(CRLF);
            Cow::Owned(out)
        }
    }
}

/// Split a payload into chunks of at most `threshold` bytes
///
/// Each cut is placed at the last whitespace byte inside the window, which
/// then starts the next chunk. Without whitespace the window is cut hard at
/// the threshold. Concatenating the chunks gives back the payload.
pub fn split_chunks(payload: &[u8], threshold: usize) -> Vec<&[u8]> {
    let threshold = threshold.max(1);
    let mut chunks = Vec::new();
    let mut rest = payload;

    while rest.len() > threshold {
        let cut = rest[1..=threshold]
            .iter()
            .rposition(u8::is_ascii_whitespace)
            .map(|i| i + 1)
            .unwrap_or(threshold);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Time the line needs to physically send `len` bytes at `baud`
///
/// `len / (baud / divisor) * slack_factor` seconds. Returns zero for a zero
/// baud rate or a divisor or slack factor that is not a positive number, and
/// saturates at [`Duration::MAX`].
pub fn post_write_delay(len: usize, baud: u32, divisor: f64, slack_factor: f64) -> Duration {
    let usable = |x: f64| x.is_finite() && x > 0.0;
    if baud == 0 || !usable(divisor) || !usable(slack_factor) {
        return Duration::ZERO;
    }
    let bytes_per_sec = f64::from(baud) / divisor;
    let secs = len as f64 / bytes_per_sec * slack_factor;
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

//! Wire-exact control bytes

/// Start of frame
pub const STX: u8 = 0x02;
/// End of frame
pub const ETX: u8 = 0x03;
/// Acknowledge, leads the readout option-select message
pub const ACK: u8 = 0x06;
/// Negative acknowledge: the master asks for a repeat
pub const NAK: u8 = 0x20;
/// Block check character placeholder sent after ETX
pub const BCC: u8 = 0x08;

/// Every control byte the responder knows about
pub const CONTROL_BYTES: [u8; 5] = [STX, ETX, ACK, NAK, BCC];

/// CRLF line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Check whether a byte is one of the protocol control bytes
pub fn is_control_byte(byte: u8) -> bool {
    CONTROL_BYTES.contains(&byte)
}

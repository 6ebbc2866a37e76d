//! Readout block framing
//!
//! Brand data blocks captured from real meters already carry whatever
//! termination the meter used, so they go out untouched. The generic block
//! used when no brand applies gets the mode C frame around it:
//! `STX <data> ETX BCC`, with a fixed BCC placeholder.

use crate::control::{BCC, ETX, STX};
use crate::Brand;

/// Frame a readout data block for transmission
pub fn frame_readout(brand: Brand, block: &[u8]) -> Vec<u8> {
    match brand {
        Brand::Luna | Brand::Kohler | Brand::Makel | Brand::Viko => block.to_vec(),
        Brand::None => {
            let mut framed = Vec::with_capacity(block.len() + 3);
            framed.push(STX);
            framed.extend_from_slice(block);
            framed.push(ETX);
            framed.push(BCC);
            framed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branded_block_passes_through() {
        let block = b"0.0.0(70000130)\n!";
        assert_eq!(frame_readout(Brand::Luna, block), block.to_vec());
        assert_eq!(frame_readout(Brand::Viko, block), block.to_vec());
    }

    #[test]
    fn test_generic_block_is_framed() {
        let framed = frame_readout(Brand::None, b"F.F(00)\n!\n");
        assert_eq!(framed[0], STX);
        assert_eq!(&framed[framed.len() - 2..], &[ETX, BCC]);
        assert_eq!(&framed[1..framed.len() - 2], b"F.F(00)\n!\n");
    }
}

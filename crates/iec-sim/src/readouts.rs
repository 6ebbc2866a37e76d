//! Readout data blocks
//!
//! The session treats the data block as opaque; it only asks a
//! [`ReadoutSource`] for the block belonging to a brand.

use iec_protocol::Brand;

/// Supplies the data block sent during readout
pub trait ReadoutSource {
    fn readout_block(&self, brand: Brand) -> Vec<u8>;
}

impl<F> ReadoutSource for F
where
    F: Fn(Brand) -> Vec<u8>,
{
    fn readout_block(&self, brand: Brand) -> Vec<u8> {
        self(brand)
    }
}

const LUNA: &[u8] = include_bytes!("../data/luna.txt");
const KOHLER: &[u8] = include_bytes!("../data/kohler.txt");
const MAKEL: &[u8] = include_bytes!("../data/makel.txt");
const VIKO: &[u8] = include_bytes!("../data/viko.txt");
const GENERIC: &[u8] = include_bytes!("../data/generic.txt");

/// Blocks captured from real meters, one per brand
///
/// [`Brand::None`] gets a short generic block, unframed; framing happens in
/// [`iec_protocol::frame_readout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedReadouts;

impl CannedReadouts {
    /// Captured block for a brand, before framing
    pub fn block(brand: Brand) -> &'static [u8] {
        match brand {
            Brand::Luna => LUNA,
            Brand::Kohler => KOHLER,
            Brand::Makel => MAKEL,
            Brand::Viko => VIKO,
            Brand::None => GENERIC,
        }
    }
}

impl ReadoutSource for CannedReadouts {
    fn readout_block(&self, brand: Brand) -> Vec<u8> {
        Self::block(brand).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_brand_has_a_block() {
        for brand in Brand::ALL {
            assert!(!CannedReadouts.readout_block(brand).is_empty(), "{}", brand);
        }
    }

    #[test]
    fn test_blocks_end_with_data_terminator() {
        for brand in [Brand::Luna, Brand::Makel, Brand::Viko, Brand::None] {
            let block = CannedReadouts::block(brand);
            assert!(block.contains(&b'!'), "{}", brand);
        }
    }

    #[test]
    fn test_kohler_needs_chunking() {
        assert!(CannedReadouts::block(Brand::Kohler).len() > 2000);
        assert!(CannedReadouts::block(Brand::Luna).len() <= 2000);
    }

    #[test]
    fn test_closure_source() {
        let source = |brand: Brand| format!("{}\n!", brand.name()).into_bytes();
        assert_eq!(source.readout_block(Brand::Viko), b"VIKO\n!");
    }
}

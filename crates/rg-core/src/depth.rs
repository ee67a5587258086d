//! Supported pixel / sample depths.

use crate::error::{RasterError, RasterResult};

/// Bits-per-sample values the sample-packing primitives and the chunky
/// device family support. Any other value is a range error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Depth {
    D1 = 1,
    D2 = 2,
    D4 = 4,
    D8 = 8,
    D12 = 12,
    D16 = 16,
    D24 = 24,
    D32 = 32,
    D40 = 40,
    D48 = 48,
    D56 = 56,
    D64 = 64,
}

impl Depth {
    pub const ALL: [Depth; 12] = [
        Depth::D1,
        Depth::D2,
        Depth::D4,
        Depth::D8,
        Depth::D12,
        Depth::D16,
        Depth::D24,
        Depth::D32,
        Depth::D40,
        Depth::D48,
        Depth::D56,
        Depth::D64,
    ];

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn from_bits(bits: u32) -> RasterResult<Depth> {
        Self::ALL
            .into_iter()
            .find(|d| d.bits() == bits)
            .ok_or_else(|| RasterError::Range(format!("unsupported depth {bits}")))
    }

    /// True for the depths the chunky device family gives a specialized
    /// byte/word inner loop.
    pub fn has_chunky_fast_path(self) -> bool {
        matches!(self, Depth::D1 | Depth::D8 | Depth::D16 | Depth::D24 | Depth::D32)
    }

    /// Bytes needed to hold one sample of this depth, rounded up.
    pub fn bytes(self) -> usize {
        (self.bits() as usize).div_ceil(8)
    }
}

/// Row-stride alignment modulus, in bytes. A row's byte length is always
/// rounded up to a multiple of this modulus, one of {1,2,4,8,16,32}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Align(u32);

impl Align {
    pub const ONE: Align = Align(1);
    pub const WORD: Align = Align(4);

    pub fn new(modulus: u32) -> RasterResult<Align> {
        if [1, 2, 4, 8, 16, 32].contains(&modulus) {
            Ok(Align(modulus))
        } else {
            Err(RasterError::Range(format!(
                "unsupported raster alignment modulus {modulus}"
            )))
        }
    }

    pub fn modulus(self) -> u32 {
        self.0
    }

    /// `bitmap_raster`: bytes needed for `width_bits`, rounded up to this
    /// alignment.
    pub fn raster_for_bits(self, width_bits: usize) -> usize {
        let bytes = width_bits.div_ceil(8);
        let m = self.0 as usize;
        bytes.div_ceil(m) * m
    }
}

//! The raster buffer backing store.
//!
//! Rust ownership makes an owned-vs-externally-supplied backing-store split
//! largely moot: a `RasterBuffer` always owns its `Vec<u8>`, and "external"
//! storage is modeled by the caller constructing that `Vec` (e.g. from a
//! memory-mapped copy) and moving it in. See `DESIGN.md` for this decision.
//!
//! A historical word-oriented (byte-swapped) buffer layout exists only to
//! match legacy in-memory conventions; here we keep a single
//! big-endian-on-disk layout and expose [`swap_row_words`] purely as a
//! testable bit-twiddling primitive, without wiring automatic pre/post-swap
//! wrappers into drawing primitives.

use crate::depth::Align;
use crate::error::{RasterError, RasterResult};

#[derive(Debug, Clone)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub depth_bits: u32,
    pub raster: usize,
    data: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(width: u32, height: u32, depth_bits: u32, align: Align) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Ok(Self {
                width,
                height,
                depth_bits,
                raster: 0,
                data: Vec::new(),
            });
        }
        let raster = align.raster_for_bits(width as usize * depth_bits as usize);
        let len = raster
            .checked_mul(height as usize)
            .ok_or_else(|| RasterError::Memory("raster buffer size overflow".into()))?;
        Ok(Self {
            width,
            height,
            depth_bits,
            raster,
            data: vec![0u8; len],
        })
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.raster;
        &self.data[start..start + self.raster]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.raster;
        &mut self.data[start..start + self.raster]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Reverses byte order within each `word_bytes`-byte group of `row`. A pure
/// bit-twiddling primitive; see module docs for why it is not wired into
/// the default drawing path.
pub fn swap_row_words(row: &mut [u8], word_bytes: usize) {
    if word_bytes <= 1 {
        return;
    }
    for chunk in row.chunks_mut(word_bytes) {
        chunk.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_buffer_is_zeroed() {
        let buf = RasterBuffer::new(16, 4, 1, Align::ONE).unwrap();
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(buf.raster, 2);
    }

    #[test]
    fn zero_dims_yield_empty_buffer() {
        let buf = RasterBuffer::new(0, 10, 8, Align::ONE).unwrap();
        assert_eq!(buf.as_bytes().len(), 0);
    }

    #[test]
    fn swap_is_involution() {
        let mut row = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let original = row.clone();
        swap_row_words(&mut row, 4);
        assert_ne!(row, original);
        swap_row_words(&mut row, 4);
        assert_eq!(row, original);
    }
}

//! Row-level splitting of a combined mask+image source into independent
//! mask and image sample streams, and the dimension contract the three
//! interleave modes share.

use rg_core::depth::Align;
use rg_core::sample::{load_next, store_flush, store_next, Carry, Cursor};
use rg_core::{Depth, RasterError, RasterResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterleaveMode {
    Chunky,
    SeparateSource,
    ScanLines,
}

/// Checks the width/height contract between a mask and the image it
/// opacity-masks: equal in chunky mode, and a divides-or-is-divided-by
/// relationship otherwise.
pub fn validate_dimensions(
    mode: InterleaveMode,
    mask_width: u32,
    mask_height: u32,
    image_width: u32,
    image_height: u32,
) -> RasterResult<()> {
    let divides_or_is_divided = |a: u32, b: u32| a != 0 && b != 0 && (a % b == 0 || b % a == 0);
    match mode {
        InterleaveMode::Chunky => {
            if mask_width != image_width || mask_height != image_height {
                return Err(RasterError::Range(format!(
                    "chunky-mode mask {mask_width}x{mask_height} must equal image {image_width}x{image_height}"
                )));
            }
        }
        InterleaveMode::SeparateSource | InterleaveMode::ScanLines => {
            if !divides_or_is_divided(mask_width, image_width) || !divides_or_is_divided(mask_height, image_height) {
                return Err(RasterError::Range(format!(
                    "mask {mask_width}x{mask_height} must divide or be divided by image {image_width}x{image_height}"
                )));
            }
        }
    }
    Ok(())
}

/// Splits one chunky row of `N+1` interleaved `bpc`-bit samples (mask
/// sample first, then `image_components` image samples) into a packed
/// 1-bit mask row and a packed `bpc`-bit image row. Only the top bit of
/// each mask sample is observed, per the chunky-mode BitsPerComponent
/// contract.
pub fn split_chunky_row(
    row: &[u8],
    width: u32,
    image_components: u32,
    bpc: u32,
) -> RasterResult<(Vec<u8>, Vec<u8>)> {
    let depth = Depth::from_bits(bpc)?;
    let mask_raster = Align::ONE.raster_for_bits(width as usize);
    let image_raster = Align::WORD.raster_for_bits(width as usize * image_components as usize * bpc as usize);
    let mut mask_out = vec![0u8; mask_raster];
    let mut image_out = vec![0u8; image_raster];

    let mut src_cursor = Cursor::default();
    let mut mask_cursor = Cursor::default();
    let mut mask_carry = Carry::default();
    let mut image_cursor = Cursor::default();
    let mut image_carry = Carry::default();

    for _ in 0..width {
        let (mask_sample, next) = load_next(row, src_cursor, depth)?;
        src_cursor = next;
        let top_bit = (mask_sample >> (bpc - 1)) & 1;
        mask_cursor = store_next(&mut mask_out, mask_cursor, Depth::D1, top_bit, &mut mask_carry)?;

        for _ in 0..image_components {
            let (sample, next) = load_next(row, src_cursor, depth)?;
            src_cursor = next;
            image_cursor = store_next(&mut image_out, image_cursor, depth, sample, &mut image_carry)?;
        }
    }
    store_flush(&mut mask_out, mask_cursor, &mut mask_carry)?;
    store_flush(&mut image_out, image_cursor, &mut image_carry)?;

    Ok((mask_out, image_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunky_mode_requires_equal_dimensions() {
        assert!(validate_dimensions(InterleaveMode::Chunky, 4, 4, 4, 4).is_ok());
        assert!(validate_dimensions(InterleaveMode::Chunky, 4, 4, 8, 8).is_err());
    }

    #[test]
    fn scan_lines_accepts_integer_ratio_either_direction() {
        assert!(validate_dimensions(InterleaveMode::ScanLines, 2, 2, 8, 8).is_ok());
        assert!(validate_dimensions(InterleaveMode::ScanLines, 8, 8, 2, 2).is_ok());
        assert!(validate_dimensions(InterleaveMode::ScanLines, 3, 3, 8, 8).is_err());
    }

    #[test]
    fn split_two_pixel_8bpc_row_with_one_image_component() {
        // pixels: (mask=0xFF, image=0x11), (mask=0x00, image=0x22)
        let row = [0xFFu8, 0x11, 0x00, 0x22];
        let (mask, image) = split_chunky_row(&row, 2, 1, 8).unwrap();
        assert_eq!(mask[0] & 0b1100_0000, 0b1000_0000);
        assert_eq!(image, vec![0x11, 0x22, 0, 0]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// At 8 bits per component every sample is byte-aligned, so the
            /// split image bytes must echo the interleaved input verbatim
            /// and the mask's top bit must match each mask byte's own top
            /// bit.
            #[test]
            fn byte_aligned_split_matches_naive_deinterleave(
                pixels in prop::collection::vec((any::<u8>(), any::<u8>()), 1..8)
            ) {
                let width = pixels.len() as u32;
                let mut row = Vec::new();
                for &(m, im) in &pixels {
                    row.push(m);
                    row.push(im);
                }
                let (mask, image) = split_chunky_row(&row, width, 1, 8).unwrap();
                for (i, &(m, im)) in pixels.iter().enumerate() {
                    let byte = mask[i / 8];
                    let bit = (byte >> (7 - (i % 8))) & 1;
                    prop_assert_eq!(bit, (m >> 7) & 1);
                    prop_assert_eq!(image[i], im);
                }
            }
        }
    }
}

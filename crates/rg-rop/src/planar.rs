//! `strip_copy_rop` on planar devices: per-plane recursion into the
//! chunky engine for 1- and 3-plane devices, and a dedicated routine for
//! 4-plane 1-bit CMYK that collapses shared C/M/Y coverage into K.

use tracing::trace;

use rg_core::{ColorIndex, Depth, PlaneDescriptor, PlanarDevice, RasterDevice, RasterError, RasterResult, Rect};

use crate::engine::{resolve_planar_source, sample_source, sample_texture, strip_copy_rop, SourceOperand, TextureOperand};
use crate::sanitize::sanitize_lop;
use crate::usage::eval_bit;

fn mask_for(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn constant_bit(color: ColorIndex) -> bool {
    color.0 & 1 != 0
}

fn project_color(color: ColorIndex, shift: u32, depth: u32) -> ColorIndex {
    if color.is_no_color() {
        color
    } else {
        ColorIndex((color.0 >> shift) & mask_for(depth))
    }
}

/// Projects a texture operand to one plane's depth. `Tile`/`Constant`
/// colors differ in kind: a tile's two colors are literal output colors
/// and get shifted down like any other color index, but a bare
/// `Constant` is the rop's own monobit T operand (read through its LSB
/// everywhere, per `constant_bit`) and must pass through unprojected.
fn project_texture<'a>(texture: &TextureOperand<'a>, shift: u32, depth: u32) -> TextureOperand<'a> {
    match *texture {
        TextureOperand::Tile { tile, phase_x, phase_y, color0, color1 } => TextureOperand::Tile {
            tile,
            phase_x,
            phase_y,
            color0: project_color(color0, shift, depth),
            color1: project_color(color1, shift, depth),
        },
        TextureOperand::Constant(c) => TextureOperand::Constant(c),
    }
}

/// Combines Destination, Source, and Texture over `rect` under `lop` for a
/// planar device: per-plane dispatch for 1 or 3 planes, a dedicated
/// collapse routine for 4-plane 1-bit CMYK.
pub fn strip_copy_rop_planar(
    dest: &mut PlanarDevice,
    source: Option<SourceOperand>,
    texture: Option<TextureOperand>,
    rect: Rect,
    lop: u8,
) -> RasterResult<()> {
    trace!(?rect, lop, planes = dest.plane_count(), "strip_copy_rop_planar");
    let rect = rect.clip_to(dest.width() as i32, dest.height() as i32);
    if rect.is_empty() {
        return Ok(());
    }
    let mut planar_scratch = None;
    let source = resolve_planar_source(source, rect, &mut planar_scratch)?;

    if dest.plane_count() == 4 && dest.descriptors().iter().all(|d| d.depth == 1) {
        return dispatch_cmyk_collapse(dest, source, texture, rect, lop);
    }
    if dest.plane_count() == 1 || dest.plane_count() == 3 {
        return dispatch_per_plane(dest, source, texture, rect, lop);
    }
    Err(RasterError::Fatal(format!(
        "strip_copy_rop_planar: no per-plane or collapse fast path for a {}-plane device",
        dest.plane_count()
    )))
}

/// Projects Source/Texture to each plane's own depth and recurses into
/// the chunky engine once per plane. A raw sample `Buffer` source has to
/// be deinterleaved into a per-plane scratch buffer first; `Mono`,
/// `Constant`, and tile textures are two-color and project by shifting
/// the color index alone.
fn dispatch_per_plane(
    dest: &mut PlanarDevice,
    source: Option<SourceOperand>,
    texture: Option<TextureOperand>,
    rect: Rect,
    lop: u8,
) -> RasterResult<()> {
    let original_depth = Depth::from_bits(dest.depth())?;
    let descriptors: Vec<PlaneDescriptor> = dest.descriptors().to_vec();
    for (i, desc) in descriptors.into_iter().enumerate() {
        let projected_texture = texture.as_ref().map(|t| project_texture(t, desc.shift, desc.depth));
        match &source {
            None => {
                strip_copy_rop(dest.plane_mut(i), None, projected_texture, rect, lop)?;
            }
            Some(SourceOperand::Constant(c)) => {
                // A bare Constant is the rop's own monobit S operand (its
                // LSB, per `constant_bit`), not a literal color, so every
                // plane reads the same unprojected flag.
                strip_copy_rop(dest.plane_mut(i), Some(SourceOperand::Constant(*c)), projected_texture, rect, lop)?;
            }
            Some(SourceOperand::Mono { data, x, raster, color0, color1 }) => {
                let projected = SourceOperand::Mono {
                    data,
                    x: *x,
                    raster: *raster,
                    color0: project_color(*color0, desc.shift, desc.depth),
                    color1: project_color(*color1, desc.shift, desc.depth),
                };
                strip_copy_rop(dest.plane_mut(i), Some(projected), projected_texture, rect, lop)?;
            }
            Some(op @ SourceOperand::Buffer { .. }) => {
                let plane_depth = Depth::from_bits(desc.depth)?;
                let raster = rg_core::depth::Align::WORD.raster_for_bits(rect.w as usize * desc.depth as usize);
                let mut scratch = vec![0u8; raster * rect.h as usize];
                for row in 0..rect.h as u32 {
                    let row_buf = &mut scratch[row as usize * raster..(row as usize + 1) * raster];
                    let mut cursor = rg_core::sample::Cursor::default();
                    let mut carry = rg_core::sample::Carry::default();
                    for col in 0..rect.w as u32 {
                        let native = sample_source(op, original_depth, col, row)?;
                        let projected = (native >> desc.shift) & mask_for(desc.depth);
                        cursor = rg_core::sample::store_next(row_buf, cursor, plane_depth, projected, &mut carry)?;
                    }
                    rg_core::sample::store_flush(row_buf, cursor, &mut carry)?;
                }
                let projected = SourceOperand::Buffer { data: &scratch, x: 0, raster };
                strip_copy_rop(dest.plane_mut(i), Some(projected), projected_texture, rect, lop)?;
            }
            Some(SourceOperand::Planar { .. }) => {
                return Err(RasterError::Fatal(
                    "dispatch_per_plane: planar source operand escaped resolution".into(),
                ));
            }
        }
    }
    Ok(())
}

/// The dedicated 4-plane 1-bit CMYK fast routine: applies the rop to each
/// plane independently (with K folded into C/M/Y's destination bit to
/// represent "ink present"), then collapses shared coverage into K:
/// `k' = c'∧m'∧y'; c' <- c'∧¬k', m' <- m'∧¬k', y' <- y'∧¬k'`.
fn dispatch_cmyk_collapse(
    dest: &mut PlanarDevice,
    source: Option<SourceOperand>,
    texture: Option<TextureOperand>,
    rect: Rect,
    lop: u8,
) -> RasterResult<()> {
    let descriptors: Vec<PlaneDescriptor> = dest.descriptors().to_vec();
    let idx_of = |component: usize| {
        descriptors
            .iter()
            .position(|d| d.component == component)
            .ok_or_else(|| RasterError::Fatal(format!("cmyk collapse: no plane for component {component}")))
    };
    let c_idx = idx_of(0)?;
    let m_idx = idx_of(1)?;
    let y_idx = idx_of(2)?;
    let k_idx = idx_of(3)?;
    let shifts = [descriptors[c_idx].shift, descriptors[m_idx].shift, descriptors[y_idx].shift, descriptors[k_idx].shift];

    let s_bit = match &source {
        None => Some(false),
        Some(SourceOperand::Constant(c)) => Some(constant_bit(*c)),
        Some(_) => None,
    };
    let t_bit = match &texture {
        None => Some(false),
        Some(TextureOperand::Constant(c)) => Some(constant_bit(*c)),
        Some(_) => None,
    };
    let code = sanitize_lop(lop, s_bit, t_bit);
    let original_depth = Depth::from_bits(dest.depth())?;

    for row in 0..rect.h as u32 {
        for col in 0..rect.w as u32 {
            let x = rect.x as u32 + col;
            let y = rect.y as u32 + row;

            let mut d = [0u8; 4];
            let mut s = [0u8; 4];
            let mut t = [0u8; 4];
            for (slot, &plane_idx) in [c_idx, m_idx, y_idx, k_idx].iter().enumerate() {
                d[slot] = (dest.plane(plane_idx).get_pixel(x, y)? & 1) as u8;
                // A bare Constant operand is the rop's own monobit flag
                // (read via its LSB, same as `constant_bit`), shared by
                // every plane; any other operand carries a literal
                // multi-bit value that still needs this plane's shift.
                s[slot] = match &source {
                    None => 0,
                    Some(SourceOperand::Constant(c)) => constant_bit(*c) as u8,
                    Some(op) => ((sample_source(op, original_depth, col, row)? >> shifts[slot]) & 1) as u8,
                };
                t[slot] = match &texture {
                    None => 0,
                    Some(TextureOperand::Constant(c)) => constant_bit(*c) as u8,
                    Some(op) => ((sample_texture(op, x as i64, y as i64) >> shifts[slot]) & 1) as u8,
                };
            }
            let kd = d[3];
            let cd = d[0] | kd;
            let md = d[1] | kd;
            let yd = d[2] | kd;

            let c_bit = eval_bit(code, cd, s[0], t[0]);
            let m_bit = eval_bit(code, md, s[1], t[1]);
            let y_bit = eval_bit(code, yd, s[2], t[2]);
            let k_bit = c_bit & m_bit & y_bit;
            let not_k = !k_bit & 1;

            dest.plane_mut(c_idx).set_pixel(x, y, (c_bit & not_k) as u64)?;
            dest.plane_mut(m_idx).set_pixel(x, y, (m_bit & not_k) as u64)?;
            dest.plane_mut(y_idx).set_pixel(x, y, (y_bit & not_k) as u64)?;
            dest.plane_mut(k_idx).set_pixel(x, y, k_bit as u64)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::{ChunkyDevice, PlaneDescriptor};

    fn rgb_planes() -> Vec<PlaneDescriptor> {
        vec![PlaneDescriptor::new(8, 16, 0), PlaneDescriptor::new(8, 8, 1), PlaneDescriptor::new(8, 0, 2)]
    }

    fn cmyk_planes() -> Vec<PlaneDescriptor> {
        vec![
            PlaneDescriptor::new(1, 3, 0), // C
            PlaneDescriptor::new(1, 2, 1), // M
            PlaneDescriptor::new(1, 1, 2), // Y
            PlaneDescriptor::new(1, 0, 3), // K
        ]
    }

    #[test]
    fn per_plane_constant_source_broadcasts_its_bit_to_every_plane() {
        // A bare Constant source is the rop's monobit S operand (its LSB),
        // not a literal color: a pure-copy rop from it fills every plane
        // entirely with 0s or entirely with 1s, regardless of which
        // nonzero value the flag is packed into.
        let mut ones = PlanarDevice::new(4, 1, rgb_planes(), 24).unwrap();
        strip_copy_rop_planar(&mut ones, Some(SourceOperand::Constant(ColorIndex(0x112233))), None, Rect::new(0, 0, 4, 1), 0xCC).unwrap();
        assert!(ones.plane(0).as_bytes().iter().all(|&b| b == 0xFF));
        assert!(ones.plane(1).as_bytes().iter().all(|&b| b == 0xFF));
        assert!(ones.plane(2).as_bytes().iter().all(|&b| b == 0xFF));

        let mut zeros = PlanarDevice::new(4, 1, rgb_planes(), 24).unwrap();
        strip_copy_rop_planar(&mut zeros, Some(SourceOperand::Constant(ColorIndex(0x112200))), None, Rect::new(0, 0, 4, 1), 0xCC).unwrap();
        assert!(zeros.plane(0).as_bytes().iter().all(|&b| b == 0x00));
        assert!(zeros.plane(2).as_bytes().iter().all(|&b| b == 0x00));
    }

    #[test]
    fn per_plane_buffer_copy_matches_plain_copy_color() {
        let mut rop_dev = PlanarDevice::new(2, 1, rgb_planes(), 24).unwrap();
        let mut copy_dev = PlanarDevice::new(2, 1, rgb_planes(), 24).unwrap();
        let src = [0x10u8, 0x20, 0x30, 0x40, 0x50, 0x60];
        strip_copy_rop_planar(&mut rop_dev, Some(SourceOperand::Buffer { data: &src, x: 0, raster: 6 }), None, Rect::new(0, 0, 2, 1), 0xCC).unwrap();
        copy_dev.copy_color(&src, 0, 6, Rect::new(0, 0, 2, 1)).unwrap();
        assert_eq!(rop_dev.plane(0).as_bytes(), copy_dev.plane(0).as_bytes());
        assert_eq!(rop_dev.plane(1).as_bytes(), copy_dev.plane(1).as_bytes());
        assert_eq!(rop_dev.plane(2).as_bytes(), copy_dev.plane(2).as_bytes());
    }

    #[test]
    fn cmyk_collapse_folds_shared_coverage_into_k() {
        // pure source copy (0xCC): destination is irrelevant, S passes
        // through untouched, so with C=M=Y=1 set directly as source bits
        // the collapse should fold them into K and clear C/M/Y.
        let mut dev = PlanarDevice::new(1, 1, cmyk_planes(), 4).unwrap();
        // 4-bit nibble C=1,M=1,Y=1,K=0 => shifts 3,2,1,0 => 0b1110 => 0xE,
        // placed in the high nibble of a single source byte.
        let src = [0xE0u8];
        strip_copy_rop_planar(&mut dev, Some(SourceOperand::Buffer { data: &src, x: 0, raster: 1 }), None, Rect::new(0, 0, 1, 1), 0xCC).unwrap();
        assert_eq!(dev.plane(0).get_pixel(0, 0).unwrap(), 0); // C cleared
        assert_eq!(dev.plane(1).get_pixel(0, 0).unwrap(), 0); // M cleared
        assert_eq!(dev.plane(2).get_pixel(0, 0).unwrap(), 0); // Y cleared
        assert_eq!(dev.plane(3).get_pixel(0, 0).unwrap(), 1); // K set
    }

    #[test]
    fn cmyk_collapse_leaves_single_channel_ink_alone() {
        let mut dev = PlanarDevice::new(1, 1, cmyk_planes(), 4).unwrap();
        // C=1 only => nibble 0b1000 = 0x8, high nibble of the source byte.
        let src = [0x80u8];
        strip_copy_rop_planar(&mut dev, Some(SourceOperand::Buffer { data: &src, x: 0, raster: 1 }), None, Rect::new(0, 0, 1, 1), 0xCC).unwrap();
        assert_eq!(dev.plane(0).get_pixel(0, 0).unwrap(), 1); // C untouched
        assert_eq!(dev.plane(3).get_pixel(0, 0).unwrap(), 0); // K stays clear
    }

    #[test]
    fn planar_source_interleaves_before_dispatch() {
        let mut src_dev = PlanarDevice::new(2, 1, rgb_planes(), 24).unwrap();
        src_dev.fill_rectangle(Rect::new(0, 0, 2, 1), ColorIndex(0xAABBCC)).unwrap();
        let mut dest = ChunkyDevice::new(2, 1, Depth::D24).unwrap();
        strip_copy_rop(
            &mut dest,
            Some(SourceOperand::Planar { device: &src_dev, x: 0, y: 0 }),
            None,
            Rect::new(0, 0, 2, 1),
            0xCC,
        )
        .unwrap();
        assert_eq!(dest.get_pixel(0, 0).unwrap(), 0xAABBCC);
        assert_eq!(dest.get_pixel(1, 0).unwrap(), 0xAABBCC);
    }
}

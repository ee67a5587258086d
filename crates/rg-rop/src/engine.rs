//! `strip_copy_rop`: combines Destination, Source, and Texture under an
//! 8-bit Boolean rop code, with fast dispatches for the operand-usage
//! classes a sanitized code can fall into.

use tracing::trace;

use rg_core::{ChunkyDevice, ColorIndex, Depth, PlanarDevice, RasterDevice, RasterError, RasterResult, Rect, StripBitmap};

use crate::sanitize::sanitize_lop;
use crate::usage::{eval_bit, rop_usage, RopUsage};

/// The source operand of a rop. `Mono` expands a 1-bit source through two
/// colors exactly like `copy_mono`; `Buffer` reads native-depth samples
/// directly; `Constant` supplies a fixed value with no backing buffer;
/// `Planar` reads native-depth samples out of a planar device's own
/// planes, resolved to a `Buffer` by interleaving before dispatch.
pub enum SourceOperand<'a> {
    Buffer { data: &'a [u8], x: u32, raster: usize },
    Mono { data: &'a [u8], x: u32, raster: usize, color0: ColorIndex, color1: ColorIndex },
    Constant(ColorIndex),
    Planar { device: &'a PlanarDevice, x: u32, y: u32 },
}

/// The texture operand: a replicated tile sampled through two colors, or a
/// fixed value.
pub enum TextureOperand<'a> {
    Tile { tile: &'a StripBitmap, phase_x: i32, phase_y: i32, color0: ColorIndex, color1: ColorIndex },
    Constant(ColorIndex),
}

fn constant_bit(color: ColorIndex) -> bool {
    color.0 & 1 != 0
}

fn mask_for(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

pub(crate) fn sample_source(op: &SourceOperand, dest_depth: Depth, col: u32, row: u32) -> RasterResult<u64> {
    match op {
        SourceOperand::Buffer { data, x, raster } => {
            let cursor = rg_core::sample::Cursor::new(row as usize * raster, 0)
                .advance_bits((*x + col) as usize * dest_depth.bits() as usize);
            let (v, _) = rg_core::sample::load_next(data, cursor, dest_depth)?;
            Ok(v)
        }
        SourceOperand::Mono { data, x, raster, color0, color1 } => {
            let sx = x + col;
            let byte = row as usize * raster + (sx / 8) as usize;
            let bit = (data[byte] >> (7 - sx % 8)) & 1;
            Ok(if bit == 1 { color1.0 } else { color0.0 })
        }
        SourceOperand::Constant(c) => Ok(c.0),
        SourceOperand::Planar { .. } => Err(RasterError::Fatal(
            "sample_source: planar source operand must be interleaved before dispatch".into(),
        )),
    }
}

/// Deinterleaves `rect.w x rect.h` native-depth samples out of a planar
/// device's planes, starting at `(x, y)`, into a freshly packed chunky
/// buffer a `Buffer` operand can address.
pub(crate) fn interleave_planar_source(
    device: &PlanarDevice,
    x: u32,
    y: u32,
    rect: Rect,
) -> RasterResult<(Vec<u8>, usize)> {
    let depth = Depth::from_bits(device.depth())?;
    let raster = rg_core::depth::Align::WORD.raster_for_bits(rect.w as usize * depth.bits() as usize);
    let mut data = vec![0u8; raster * rect.h as usize];
    for row in 0..rect.h as u32 {
        let row_buf = &mut data[row as usize * raster..(row as usize + 1) * raster];
        let mut cursor = rg_core::sample::Cursor::default();
        let mut carry = rg_core::sample::Carry::default();
        for col in 0..rect.w as u32 {
            let mut native = 0u64;
            for (i, desc) in device.descriptors().iter().enumerate() {
                let bit = device.plane(i).get_pixel(x + col, y + row)?;
                native |= bit << desc.shift;
            }
            cursor = rg_core::sample::store_next(row_buf, cursor, depth, native, &mut carry)?;
        }
        rg_core::sample::store_flush(row_buf, cursor, &mut carry)?;
    }
    Ok((data, raster))
}

/// Resolves a `Planar` source operand into a `Buffer` over a freshly
/// interleaved scratch slice owned by `scratch`, per the "S or T planar"
/// handling: allocate, interleave, then proceed as an ordinary buffer.
/// Any other operand passes through unchanged.
pub(crate) fn resolve_planar_source<'a>(
    source: Option<SourceOperand<'a>>,
    rect: Rect,
    scratch: &'a mut Option<Vec<u8>>,
) -> RasterResult<Option<SourceOperand<'a>>> {
    match source {
        Some(SourceOperand::Planar { device, x, y }) => {
            let (data, raster) = interleave_planar_source(device, x, y, rect)?;
            *scratch = Some(data);
            Ok(Some(SourceOperand::Buffer { data: scratch.as_ref().unwrap(), x: 0, raster }))
        }
        other => Ok(other),
    }
}

pub(crate) fn sample_texture(op: &TextureOperand, x: i64, y: i64) -> u64 {
    match op {
        TextureOperand::Tile { tile, phase_x, phase_y, color0, color1 } => {
            let bit = tile.bit_at(x + *phase_x as i64, y + *phase_y as i64);
            if bit {
                color1.0
            } else {
                color0.0
            }
        }
        TextureOperand::Constant(c) => c.0,
    }
}

/// Applies `code` bitwise across all `bits` bit-positions of `d`, `s`, `t`,
/// assembling the result as a same-width value.
fn apply_rop_value(code: u8, d: u64, s: u64, t: u64, bits: u32) -> u64 {
    let mut out = 0u64;
    for i in 0..bits {
        let di = ((d >> i) & 1) as u8;
        let si = ((s >> i) & 1) as u8;
        let ti = ((t >> i) & 1) as u8;
        out |= (eval_bit(code, di, si, ti) as u64) << i;
    }
    out
}

/// Combines Destination, Source, and Texture over `rect` under `lop`,
/// dispatching to a fast path when the sanitized code doesn't need all
/// three operands.
pub fn strip_copy_rop(
    dest: &mut ChunkyDevice,
    source: Option<SourceOperand>,
    texture: Option<TextureOperand>,
    rect: Rect,
    lop: u8,
) -> RasterResult<()> {
    trace!(?rect, lop, "strip_copy_rop");
    let rect = rect.clip_to(dest.width() as i32, dest.height() as i32);
    if rect.is_empty() {
        return Ok(());
    }
    let mut planar_scratch = None;
    let source = resolve_planar_source(source, rect, &mut planar_scratch)?;

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
    let usage = rop_usage(code);

    match usage {
        RopUsage::None => {
            let bit = eval_bit(code, 0, 0, 0);
            let max = mask_for(dest.depth());
            let color = if bit == 1 { ColorIndex(max) } else { ColorIndex(0) };
            dest.fill_rectangle(rect, color)
        }
        RopUsage::D => {
            let identity = eval_bit(code, 1, 0, 0) == 1 && eval_bit(code, 0, 0, 0) == 0;
            if identity {
                return Ok(());
            }
            let mask = mask_for(dest.depth());
            for y in rect.y..rect.y + rect.h {
                for x in rect.x..rect.x + rect.w {
                    let d = dest.get_pixel(x as u32, y as u32)?;
                    dest.set_pixel(x as u32, y as u32, !d & mask)?;
                }
            }
            Ok(())
        }
        RopUsage::S if matches!(source, Some(_)) => {
            dispatch_source_only(dest, source.as_ref().unwrap(), rect, code)
        }
        RopUsage::T if matches!(texture, Some(_)) => {
            dispatch_texture_only(dest, texture.as_ref().unwrap(), rect, code)
        }
        _ => rolling_loop(dest, &source, &texture, rect, code),
    }
}

fn dispatch_source_only(
    dest: &mut ChunkyDevice,
    source: &SourceOperand,
    rect: Rect,
    code: u8,
) -> RasterResult<()> {
    let pure = code == 0xCC;
    let inverted = code == 0x33;
    match source {
        SourceOperand::Mono { data, x, raster, color0, color1 } if pure => {
            dest.copy_mono(data, *x, *raster, rect, *color0, *color1)
        }
        SourceOperand::Mono { data, x, raster, color0, color1 } if inverted => {
            dest.copy_mono(data, *x, *raster, rect, *color1, *color0)
        }
        SourceOperand::Buffer { data, x, raster } if pure => dest.copy_color(data, *x, *raster, rect),
        SourceOperand::Buffer { data, x, raster } if inverted => {
            let complemented: Vec<u8> = data.iter().map(|b| !b).collect();
            dest.copy_color(&complemented, *x, *raster, rect)
        }
        _ => rolling_loop(dest, &Some(clone_source(source)), &None, rect, code),
    }
}

fn clone_source<'a>(source: &SourceOperand<'a>) -> SourceOperand<'a> {
    match *source {
        SourceOperand::Buffer { data, x, raster } => SourceOperand::Buffer { data, x, raster },
        SourceOperand::Mono { data, x, raster, color0, color1 } => {
            SourceOperand::Mono { data, x, raster, color0, color1 }
        }
        SourceOperand::Constant(c) => SourceOperand::Constant(c),
        SourceOperand::Planar { device, x, y } => SourceOperand::Planar { device, x, y },
    }
}

fn dispatch_texture_only(
    dest: &mut ChunkyDevice,
    texture: &TextureOperand,
    rect: Rect,
    code: u8,
) -> RasterResult<()> {
    let pure = code == 0xF0;
    match texture {
        TextureOperand::Tile { tile, phase_x, phase_y, color0, color1 } => {
            let (c0, c1) = if pure { (*color0, *color1) } else { (*color1, *color0) };
            for row in 0..rect.h as u32 {
                for col in 0..rect.w as u32 {
                    let x = rect.x + col as i32;
                    let y = rect.y + row as i32;
                    let bit = tile.bit_at(x as i64 + *phase_x as i64, y as i64 + *phase_y as i64);
                    let color = if bit { c1 } else { c0 };
                    dest.set_pixel(x as u32, y as u32, color.0)?;
                }
            }
            Ok(())
        }
        TextureOperand::Constant(_) => Err(RasterError::Fatal(
            "dispatch_texture_only called with a constant texture".into(),
        )),
    }
}

fn rolling_loop(
    dest: &mut ChunkyDevice,
    source: &Option<SourceOperand>,
    texture: &Option<TextureOperand>,
    rect: Rect,
    code: u8,
) -> RasterResult<()> {
    let depth = Depth::from_bits(dest.depth())?;
    let default_source = SourceOperand::Constant(ColorIndex(0));
    let default_texture = TextureOperand::Constant(ColorIndex(0));
    let source = source.as_ref().unwrap_or(&default_source);
    let texture = texture.as_ref().unwrap_or(&default_texture);
    for row in 0..rect.h as u32 {
        for col in 0..rect.w as u32 {
            let x = rect.x as u32 + col;
            let y = rect.y as u32 + row;
            let d = dest.get_pixel(x, y)?;
            let s = sample_source(source, depth, col, row)?;
            let t = sample_texture(texture, x as i64, y as i64);
            let result = apply_rop_value(code, d, s, t, depth.bits());
            dest.set_pixel(x, y, result)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::Rect;

    #[test]
    fn identity_rop_is_noop_on_destination() {
        let mut dest = ChunkyDevice::new(4, 4, Depth::D8).unwrap();
        dest.fill_rectangle(Rect::new(0, 0, 4, 4), ColorIndex(0x5A)).unwrap();
        let before = dest.as_bytes().to_vec();
        strip_copy_rop(&mut dest, None, None, Rect::new(0, 0, 4, 4), 0xAA).unwrap();
        assert_eq!(dest.as_bytes().to_vec(), before);
    }

    #[test]
    fn pure_source_copy_matches_copy_color() {
        let mut a = ChunkyDevice::new(8, 1, Depth::D8).unwrap();
        let mut b = ChunkyDevice::new(8, 1, Depth::D8).unwrap();
        let src = [0x01u8, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];
        a.copy_color(&src, 0, 8, Rect::new(0, 0, 8, 1)).unwrap();
        strip_copy_rop(
            &mut b,
            Some(SourceOperand::Buffer { data: &src, x: 0, raster: 8 }),
            None,
            Rect::new(0, 0, 8, 1),
            0xCC,
        )
        .unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn xor_rop_matches_scenario_four() {
        let mut dest = ChunkyDevice::new(8, 1, Depth::D8).unwrap();
        let d = [0x80u8, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01];
        for (i, &v) in d.iter().enumerate() {
            dest.set_pixel(i as u32, 0, v as u64).unwrap();
        }
        let s = [0x01u8, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];
        strip_copy_rop(
            &mut dest,
            Some(SourceOperand::Buffer { data: &s, x: 0, raster: 8 }),
            None,
            Rect::new(0, 0, 8, 1),
            0x66,
        )
        .unwrap();
        let expected = [0x81u8, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x81];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(dest.get_pixel(i as u32, 0).unwrap() as u8, e);
        }
    }

    #[test]
    fn tile_texture_copy_matches_strip_tile() {
        let tile = StripBitmap::new_mono(2, 2, 0, 1, vec![0b0100_0000, 0b1000_0000]);
        let mut dest = ChunkyDevice::new_monobit(4, 4, false).unwrap();
        strip_copy_rop(
            &mut dest,
            None,
            Some(TextureOperand::Tile {
                tile: &tile,
                phase_x: 0,
                phase_y: 0,
                color0: ColorIndex(0),
                color1: ColorIndex(1),
            }),
            Rect::new(0, 0, 4, 4),
            0xF0,
        )
        .unwrap();
        assert_eq!(dest.row(0), &[0b0101_0000]);
        assert_eq!(dest.row(1), &[0b1010_0000]);
    }
}

//! The chunky raster device: all components of a pixel packed into
//! adjacent bits.

use tracing::trace;

use crate::color::{Cmyk, ColorIndex, DevnColor, Palette, Rgb};
use crate::depth::{Align, Depth};
use crate::device::{GetBitsOptions, GetBitsParams, RasterDevice};
use crate::error::{RasterError, RasterResult};
use crate::rect::Rect;
use crate::sample::{load_next, store_flush, store_next, Carry, Cursor};

/// A chunky pixel buffer with a depth-specialized fast path for fills and
/// byte-aligned depths, falling back to the generic sample-pack primitives
/// everywhere else.
#[derive(Debug, Clone)]
pub struct ChunkyDevice {
    width: u32,
    height: u32,
    depth: Depth,
    inverted: bool,
    palette: Option<Palette>,
    raster: usize,
    data: Vec<u8>,
}

impl ChunkyDevice {
    pub fn new(width: u32, height: u32, depth: Depth) -> RasterResult<Self> {
        let raster = Align::WORD.raster_for_bits(width as usize * depth.bits() as usize);
        let len = raster
            .checked_mul(height as usize)
            .ok_or_else(|| RasterError::Memory("chunky device buffer size overflow".into()))?;
        Ok(Self {
            width,
            height,
            depth,
            inverted: false,
            palette: None,
            raster,
            data: vec![0u8; len],
        })
    }

    /// A 1-bpp device with the standard {black,white} (or inverted) palette.
    pub fn new_monobit(width: u32, height: u32, inverted: bool) -> RasterResult<Self> {
        let mut dev = Self::new(width, height, Depth::D1)?;
        dev.inverted = inverted;
        dev.palette = Some(Palette::monobit(inverted));
        Ok(dev)
    }

    pub fn with_palette(width: u32, height: u32, depth: Depth, palette: Palette) -> RasterResult<Self> {
        let mut dev = Self::new(width, height, depth)?;
        dev.palette = Some(palette);
        Ok(dev)
    }

    pub fn depth_bits(&self) -> u32 {
        self.depth.bits()
    }

    pub fn raster(&self) -> usize {
        self.raster
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

    /// Resolves a negative-dimension rectangle into a clipped, in-bounds
    /// rectangle, or an empty no-op rectangle, or a range error if exactly
    /// one dimension is negative.
    fn clip_or_reject(&self, rect: Rect) -> RasterResult<Rect> {
        let one_negative = (rect.w < 0) ^ (rect.h < 0);
        if one_negative {
            return Err(RasterError::Range(format!(
                "exactly one of width/height is negative: {rect:?}"
            )));
        }
        Ok(rect.clip_to(self.width as i32, self.height as i32))
    }

    fn pixel_cursor(&self, x: u32, y: u32) -> Cursor {
        Cursor::new(y as usize * self.raster, 0).advance_bits(x as usize * self.depth.bits() as usize)
    }

    /// Reads the native-depth value of the pixel at `(x, y)`.
    pub fn get_pixel(&self, x: u32, y: u32) -> RasterResult<u64> {
        let cursor = self.pixel_cursor(x, y);
        let (v, _) = load_next(&self.data, cursor, self.depth)?;
        Ok(v)
    }

    /// Writes the native-depth value of the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u64) -> RasterResult<()> {
        let cursor = self.pixel_cursor(x, y);
        let mut carry = Carry::default();
        let next = store_next(&mut self.data, cursor, self.depth, value, &mut carry)?;
        store_flush(&mut self.data, next, &mut carry)?;
        Ok(())
    }

    /// Depth-1 `memset`-style fill respecting left/right partial bytes.
    fn fill_monobit(&mut self, rect: Rect, bit: bool) {
        let fill_byte = if bit { 0xFFu8 } else { 0x00u8 };
        let x0 = rect.x as u32;
        let x1 = (rect.x + rect.w) as u32;
        for row in rect.y..rect.y + rect.h {
            let r = self.row_mut(row as u32);
            let byte0 = (x0 / 8) as usize;
            let byte1 = ((x1 + 7) / 8) as usize;
            if byte1 <= byte0 {
                continue;
            }
            if byte1 - byte0 <= 1 {
                for bit_x in x0..x1 {
                    let byte = (bit_x / 8) as usize;
                    let mask = 0x80u8 >> (bit_x % 8);
                    if bit {
                        r[byte] |= mask;
                    } else {
                        r[byte] &= !mask;
                    }
                }
                continue;
            }
            let left_partial = x0 % 8 != 0;
            let right_partial = x1 % 8 != 0;
            let mid_start = if left_partial { byte0 + 1 } else { byte0 };
            let mid_end = if right_partial { byte1 - 1 } else { byte1 };
            if left_partial {
                for bit_x in x0..((byte0 as u32 + 1) * 8) {
                    let mask = 0x80u8 >> (bit_x % 8);
                    if bit {
                        r[byte0] |= mask;
                    } else {
                        r[byte0] &= !mask;
                    }
                }
            }
            if mid_end > mid_start {
                r[mid_start..mid_end].fill(fill_byte);
            }
            if right_partial {
                let last = byte1 - 1;
                for bit_x in (last as u32 * 8)..x1 {
                    let mask = 0x80u8 >> (bit_x % 8);
                    if bit {
                        r[last] |= mask;
                    } else {
                        r[last] &= !mask;
                    }
                }
            }
        }
    }
}

impl RasterDevice for ChunkyDevice {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        self.depth.bits()
    }

    fn fill_rectangle(&mut self, rect: Rect, color: ColorIndex) -> RasterResult<()> {
        trace!(?rect, depth = self.depth.bits(), "fill_rectangle");
        let rect = self.clip_or_reject(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        if self.depth == Depth::D1 {
            self.fill_monobit(rect, color.0 != 0);
            return Ok(());
        }
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                self.set_pixel(x as u32, y as u32, color.0)?;
            }
        }
        Ok(())
    }

    fn copy_mono(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        color0: ColorIndex,
        color1: ColorIndex,
    ) -> RasterResult<()> {
        trace!(?rect, "copy_mono");
        if color0.is_no_color() && color1.is_no_color() {
            return Err(RasterError::Undefined(
                "copy_mono: both colors are no-color".into(),
            ));
        }
        let rect = self.clip_or_reject(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        for row in 0..rect.h as u32 {
            for col in 0..rect.w as u32 {
                let sx = src_x + col;
                let byte = row as usize * src_raster + (sx / 8) as usize;
                let bit = (src[byte] >> (7 - sx % 8)) & 1;
                let color = if bit == 1 { color1 } else { color0 };
                if color.is_no_color() {
                    continue;
                }
                self.set_pixel(rect.x as u32 + col, rect.y as u32 + row, color.0)?;
            }
        }
        Ok(())
    }

    fn copy_color(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
    ) -> RasterResult<()> {
        trace!(?rect, "copy_color");
        let rect = self.clip_or_reject(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        let bits = self.depth.bits() as usize;
        for row in 0..rect.h as u32 {
            let mut cursor = Cursor::new(row as usize * src_raster, 0)
                .advance_bits(src_x as usize * bits);
            for col in 0..rect.w as u32 {
                let (value, next) = load_next(src, cursor, self.depth)?;
                cursor = next;
                self.set_pixel(rect.x as u32 + col, rect.y as u32 + row, value)?;
            }
        }
        Ok(())
    }

    fn copy_alpha(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        color: ColorIndex,
        alpha_depth: u32,
    ) -> RasterResult<()> {
        trace!(?rect, alpha_depth, "copy_alpha");
        let rect = self.clip_or_reject(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        let alpha_depth = Depth::from_bits(alpha_depth)?;
        let max_alpha = (1u64 << alpha_depth.bits()) - 1;
        let color_rgb = self.map_color_rgb(color);
        for row in 0..rect.h as u32 {
            let mut cursor = Cursor::new(row as usize * src_raster, 0)
                .advance_bits(src_x as usize * alpha_depth.bits() as usize);
            for col in 0..rect.w as u32 {
                let (a, next) = load_next(src, cursor, alpha_depth)?;
                cursor = next;
                let x = rect.x as u32 + col;
                let y = rect.y as u32 + row;
                if a == 0 {
                    continue;
                }
                if a == max_alpha {
                    self.set_pixel(x, y, color.0)?;
                    continue;
                }
                let dest_rgb = self.map_color_rgb(ColorIndex(self.get_pixel(x, y)?));
                let blend = |s: u8, d: u8| -> u8 {
                    ((u32::from(s) * a as u32 + u32::from(d) * (max_alpha as u32 - a as u32))
                        / max_alpha as u32) as u8
                };
                let mixed = Rgb::new(
                    blend(color_rgb.r, dest_rgb.r),
                    blend(color_rgb.g, dest_rgb.g),
                    blend(color_rgb.b, dest_rgb.b),
                );
                let mapped = self.map_rgb_color(mixed);
                self.set_pixel(x, y, mapped.0)?;
            }
        }
        Ok(())
    }

    fn copy_planes(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        plane_height: u32,
    ) -> RasterResult<()> {
        trace!(?rect, plane_height, "copy_planes");
        let rect = self.clip_or_reject(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        // Planes are 1-bit each, `depth` planes stacked, `plane_height` rows
        // per plane, composed MSB-first into the chunky pixel.
        let planes = self.depth.bits();
        for row in 0..rect.h as u32 {
            for col in 0..rect.w as u32 {
                let mut value: u64 = 0;
                for plane in 0..planes {
                    let plane_row = plane * plane_height + row;
                    let sx = src_x + col;
                    let byte = plane_row as usize * src_raster + (sx / 8) as usize;
                    let bit = (src[byte] >> (7 - sx % 8)) & 1;
                    value = (value << 1) | bit as u64;
                }
                self.set_pixel(rect.x as u32 + col, rect.y as u32 + row, value)?;
            }
        }
        Ok(())
    }

    fn get_bits_rectangle(
        &self,
        rect: Rect,
        options: GetBitsOptions,
        params: &mut GetBitsParams,
    ) -> RasterResult<()> {
        let rect = rect.clip_to(self.width as i32, self.height as i32);
        if !options.contains(GetBitsOptions::PACKING_CHUNKY) {
            return Err(RasterError::Range(
                "get_bits_rectangle: only chunky packing is supported by ChunkyDevice".into(),
            ));
        }
        if !(options.contains(GetBitsOptions::RETURN_COPY)
            || options.contains(GetBitsOptions::RETURN_POINTER))
        {
            return Err(RasterError::Range(
                "get_bits_rectangle: no supported return mode requested".into(),
            ));
        }
        let out_depth = if options.contains(GetBitsOptions::COLORS_RGB)
            || options.contains(GetBitsOptions::COLORS_CMYK)
            || options.contains(GetBitsOptions::COLORS_GRAY)
        {
            Depth::D8
        } else {
            self.depth
        };
        let components = if options.contains(GetBitsOptions::COLORS_RGB) {
            3
        } else if options.contains(GetBitsOptions::COLORS_CMYK) {
            4
        } else {
            1
        };
        let raster = if options.contains(GetBitsOptions::RASTER_SPECIFIED) {
            params.raster
        } else {
            Align::WORD.raster_for_bits(rect.w as usize * out_depth.bits() as usize * components)
        };
        let x_offset = if options.contains(GetBitsOptions::OFFSET_SPECIFIED) {
            params.x_offset
        } else {
            0
        };
        let mut out = vec![0u8; raster * rect.h as usize];
        for row in 0..rect.h as u32 {
            let mut cursor = Cursor::new(row as usize * raster, 0).advance_bits(x_offset * 8);
            for col in 0..rect.w as u32 {
                let native = self.get_pixel(rect.x as u32 + col, rect.y as u32 + row)?;
                if options.contains(GetBitsOptions::COLORS_RGB) {
                    let rgb = self.map_color_rgb(ColorIndex(native));
                    for byte in [rgb.r, rgb.g, rgb.b] {
                        let mut carry = Carry::default();
                        cursor = store_next(&mut out, cursor, Depth::D8, byte as u64, &mut carry)?;
                        cursor = store_flush(&mut out, cursor, &mut carry)?;
                    }
                } else if options.contains(GetBitsOptions::COLORS_CMYK) {
                    let rgb = self.map_color_rgb(ColorIndex(native));
                    let cmyk = rgb_to_cmyk(rgb);
                    for byte in [cmyk.c, cmyk.m, cmyk.y, cmyk.k] {
                        let mut carry = Carry::default();
                        cursor = store_next(&mut out, cursor, Depth::D8, byte as u64, &mut carry)?;
                        cursor = store_flush(&mut out, cursor, &mut carry)?;
                    }
                } else {
                    let mut carry = Carry::default();
                    let next = store_next(&mut out, cursor, out_depth, native, &mut carry)?;
                    cursor = store_flush(&mut out, next, &mut carry)?;
                }
            }
        }
        params.raster = raster;
        params.x_offset = x_offset;
        params.data = out;
        Ok(())
    }

    fn map_rgb_color(&self, rgb: Rgb) -> ColorIndex {
        match self.depth {
            Depth::D1 => {
                let white = rgb.luma() >= 128;
                let bit = white ^ self.inverted;
                ColorIndex(bit as u64)
            }
            Depth::D2 | Depth::D4 | Depth::D8 if self.palette.is_some() => {
                let p = self.palette.as_ref().unwrap();
                ColorIndex(p.nearest(rgb) as u64)
            }
            Depth::D16 => {
                let r5 = (rgb.r as u32 * 31 / 255) as u64;
                let g6 = (rgb.g as u32 * 63 / 255) as u64;
                let b5 = (rgb.b as u32 * 31 / 255) as u64;
                ColorIndex((r5 << 11) | (g6 << 5) | b5)
            }
            Depth::D24 | Depth::D8 => {
                ColorIndex(((rgb.r as u64) << 16) | ((rgb.g as u64) << 8) | rgb.b as u64)
            }
            _ => ColorIndex(((rgb.r as u64) << 16) | ((rgb.g as u64) << 8) | rgb.b as u64),
        }
    }

    fn map_color_rgb(&self, color: ColorIndex) -> Rgb {
        match self.depth {
            Depth::D1 => {
                let bit = (color.0 & 1) != 0;
                let white = bit ^ self.inverted;
                if white {
                    Rgb::new(255, 255, 255)
                } else {
                    Rgb::new(0, 0, 0)
                }
            }
            Depth::D2 | Depth::D4 | Depth::D8 if self.palette.is_some() => self
                .palette
                .as_ref()
                .unwrap()
                .get(color.0 as usize)
                .unwrap_or_default(),
            Depth::D16 => {
                let r5 = (color.0 >> 11) & 0x1F;
                let g6 = (color.0 >> 5) & 0x3F;
                let b5 = color.0 & 0x1F;
                Rgb::new((r5 * 255 / 31) as u8, (g6 * 255 / 63) as u8, (b5 * 255 / 31) as u8)
            }
            _ => Rgb::new(
                (color.0 >> 16) as u8,
                (color.0 >> 8) as u8,
                color.0 as u8,
            ),
        }
    }

    fn map_cmyk_color(&self, cmyk: Cmyk) -> ColorIndex {
        if self.depth == Depth::D32 {
            return ColorIndex(
                ((cmyk.c as u64) << 24)
                    | ((cmyk.m as u64) << 16)
                    | ((cmyk.y as u64) << 8)
                    | cmyk.k as u64,
            );
        }
        if self.depth.bits() == 4 {
            let bit = |v: u8| if v != 0 { 1u64 } else { 0u64 };
            let code = (bit(cmyk.c) << 3) | (bit(cmyk.m) << 2) | (bit(cmyk.y) << 1) | bit(cmyk.k);
            return ColorIndex(code);
        }
        self.map_rgb_color(cmyk.to_rgb_binary())
    }

    fn fill_rectangle_hl_color(&mut self, rect: Rect, devn: &DevnColor) -> RasterResult<()> {
        let scaled = devn
            .components
            .first()
            .copied()
            .unwrap_or(0) as u64;
        let bits = self.depth.bits();
        let max_in = u16::MAX as u64;
        let max_out = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        let value = scaled as u64 * max_out / max_in.max(1);
        self.fill_rectangle(rect, ColorIndex(value))
    }
}

fn rgb_to_cmyk(rgb: Rgb) -> Cmyk {
    let c = 255 - rgb.r;
    let m = 255 - rgb.g;
    let y = 255 - rgb.b;
    let k = c.min(m).min(y);
    if k == 255 {
        return Cmyk::new(0, 0, 0, 255);
    }
    let scale = |v: u8| (((v - k) as u32 * 255) / (255 - k) as u32) as u8;
    Cmyk::new(scale(c), scale(m), scale(y), k)
}

//! The alpha buffer: an oversampled monobit scanline band that compresses
//! itself into alpha samples and forwards them downstream.

use tracing::trace;

use rg_core::depth::Align;
use rg_core::sample::{store_flush, store_next, Carry, Cursor};
use rg_core::{ChunkyDevice, Cmyk, ColorIndex, Depth, DevnColor, GetBitsOptions, GetBitsParams, RasterDevice, RasterError, RasterResult, Rect, Rgb};

use crate::target::{AlphaTarget, SpecOp};

/// Rounds `count` covered sub-pixels out of `cell_area` total to the
/// nearest alpha sample in `0..=max_alpha`, rounding halves up.
fn round_coverage(count: u64, max_alpha: u64, cell_area: u64) -> u64 {
    (count * max_alpha + cell_area / 2) / cell_area
}

/// The color currently being accumulated. Surfaced as an explicit variant
/// rather than a nullable devn field, so "which mode is active" is a type
/// rather than an invariant a reader has to infer.
#[derive(Debug, Clone, PartialEq)]
pub enum AlphaColor {
    Pure(ColorIndex),
    Devn(DevnColor),
}

/// The scalar configuration and sliding-window bookkeeping of an alpha
/// buffer, independent of the band's pixel storage.
#[derive(Debug, Clone)]
pub struct AlphaBufferState {
    log2_x_scale: u32,
    log2_y_scale: u32,
    log2_alpha_bits: u32,
    mapped_y: Option<i32>,
    mapped_height: u32,
    mapped_start: u32,
    last_color: Option<AlphaColor>,
}

impl AlphaBufferState {
    fn block_height(&self) -> u32 {
        1 << self.log2_y_scale
    }

    fn cell_width(&self) -> u32 {
        1 << self.log2_x_scale
    }

    fn alpha_bits(&self) -> u32 {
        1 << self.log2_alpha_bits
    }

    fn max_alpha(&self) -> u64 {
        (1u64 << self.alpha_bits()) - 1
    }

    fn alpha_depth(&self) -> RasterResult<Depth> {
        Depth::from_bits(self.alpha_bits())
    }
}

/// A monobit raster device that accumulates an oversampled shape across a
/// limited Y band, compressing each block of `2^y_scale` rows into one row
/// of `2^log2_alpha_bits`-bit alpha samples forwarded to `target`.
pub struct AlphaBufferDevice<'a> {
    state: AlphaBufferState,
    band: ChunkyDevice,
    band_height: u32,
    output_width: u32,
    output_height: u32,
    target: &'a mut dyn AlphaTarget,
}

impl<'a> AlphaBufferDevice<'a> {
    pub fn new(
        output_width: u32,
        output_height: u32,
        log2_x_scale: u32,
        log2_y_scale: u32,
        log2_alpha_bits: u32,
        band_height_scaled_rows: u32,
        target: &'a mut dyn AlphaTarget,
    ) -> RasterResult<Self> {
        if log2_alpha_bits > 2 {
            return Err(RasterError::Range(format!(
                "log2_alpha_bits must be 0, 1, or 2, got {log2_alpha_bits}"
            )));
        }
        let block = 1u32 << log2_y_scale;
        if band_height_scaled_rows % block != 0 || band_height_scaled_rows < 2 * block {
            return Err(RasterError::Range(format!(
                "band height {band_height_scaled_rows} must be a multiple of the y-scale block {block} and at least {}",
                2 * block
            )));
        }
        let band_width = output_width << log2_x_scale;
        let band = ChunkyDevice::new_monobit(band_width, band_height_scaled_rows, false)?;
        Ok(Self {
            state: AlphaBufferState {
                log2_x_scale,
                log2_y_scale,
                log2_alpha_bits,
                mapped_y: None,
                mapped_height: 0,
                mapped_start: 0,
                last_color: None,
            },
            band,
            band_height: band_height_scaled_rows,
            output_width,
            output_height,
            target,
        })
    }

    /// Declares the paint color. If it differs from the color the band is
    /// currently accumulating, the band is flushed first — callers promise
    /// to paint only one color per band.
    pub fn set_color(&mut self, color: AlphaColor) -> RasterResult<()> {
        if self.state.last_color.as_ref() != Some(&color) {
            self.flush()?;
            self.state.last_color = Some(color);
        }
        Ok(())
    }

    fn ensure_mapped(&mut self, y0: i32, h: u32) -> RasterResult<()> {
        let block = self.state.block_height() as i32;
        if let Some(my) = self.state.mapped_y {
            let mapped_end = my + self.state.mapped_height as i32;
            if y0 < my || y0 > mapped_end {
                self.flush()?;
            }
        }
        if self.state.mapped_y.is_none() {
            let aligned = y0 - y0.rem_euclid(block);
            self.state.mapped_y = Some(aligned);
            self.state.mapped_height = 0;
            self.state.mapped_start = 0;
        }
        let target_end = y0 + h as i32;
        let block_u = block as u32;
        while self.state.mapped_y.unwrap() + (self.state.mapped_height as i32) < target_end {
            if self.state.mapped_height + block_u > self.band_height {
                self.flush_oldest_block()?;
            }
            self.state.mapped_height += block_u;
        }
        Ok(())
    }

    fn physical_row(&self, y: i32) -> u32 {
        let my = self.state.mapped_y.expect("row requested before ensure_mapped");
        let offset = (y - my) as u32;
        (self.state.mapped_start + offset) % self.band_height
    }

    /// Flushes every block currently held in the band, resetting it to
    /// empty.
    pub fn flush(&mut self) -> RasterResult<()> {
        while self.state.mapped_height > 0 {
            self.flush_oldest_block()?;
        }
        self.state.mapped_y = None;
        self.state.mapped_start = 0;
        Ok(())
    }

    fn flush_oldest_block(&mut self) -> RasterResult<()> {
        let my = match self.state.mapped_y {
            Some(v) => v,
            None => return Ok(()),
        };
        if self.state.mapped_height == 0 {
            return Ok(());
        }
        let block = self.state.block_height();
        let output_row = my >> self.state.log2_y_scale;
        let physical_start = self.state.mapped_start;
        let compressed = self.compress_block(physical_start, block)?;

        if let Some((data, raster, x0, len)) = compressed {
            trace!(output_row, x0, len, "alpha buffer flushing block");
            let rect = Rect::new(x0, output_row, len, 1);
            let alpha_bits = self.state.alpha_bits();
            match self.state.last_color.clone() {
                Some(AlphaColor::Pure(c)) => {
                    self.target.copy_alpha(&data, 0, raster, rect, c, alpha_bits)?;
                }
                Some(AlphaColor::Devn(d)) => {
                    self.target.copy_alpha_hl_color(&data, 0, raster, rect, &d, alpha_bits)?;
                }
                None => {}
            }
        }

        for r in 0..block {
            let row = (physical_start + r) % self.band_height;
            self.band.row_mut(row).fill(0);
        }
        self.state.mapped_start = (physical_start + block) % self.band_height;
        self.state.mapped_y = Some(my + block as i32);
        self.state.mapped_height -= block;
        Ok(())
    }

    /// Compresses `block` physical band rows starting at `physical_start`
    /// into one alpha row, narrowed to the X bounding box of set bits
    /// (expanded to output-pixel cell boundaries). Returns `None` if the
    /// block has no coverage at all.
    fn compress_block(&self, physical_start: u32, block: u32) -> RasterResult<Option<(Vec<u8>, usize, i32, i32)>> {
        let width = self.band.width();
        let mut min_x: Option<u32> = None;
        let mut max_x: Option<u32> = None;
        for r in 0..block {
            let row = (physical_start + r) % self.band_height;
            for x in 0..width {
                if self.band.get_pixel(x, row)? != 0 {
                    min_x = Some(min_x.map_or(x, |m| m.min(x)));
                    max_x = Some(max_x.map_or(x, |m| m.max(x)));
                }
            }
        }
        let (min_x, max_x) = match (min_x, max_x) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(None),
        };
        let cell_w = self.state.cell_width();
        let ox0 = min_x / cell_w;
        let ox1 = max_x / cell_w + 1;
        let max_alpha = self.state.max_alpha();
        let cell_area = (cell_w * block) as u64;
        let alpha_depth = self.state.alpha_depth()?;
        let out_cols = ox1 - ox0;

        let raster = Align::WORD.raster_for_bits(out_cols as usize * alpha_depth.bits() as usize);
        let mut out = vec![0u8; raster];
        let mut cursor = Cursor::default();
        let mut carry = Carry::default();
        for ox in ox0..ox1 {
            let mut count: u64 = 0;
            for r in 0..block {
                let row = (physical_start + r) % self.band_height;
                for x in (ox * cell_w)..((ox + 1) * cell_w) {
                    if self.band.get_pixel(x, row)? != 0 {
                        count += 1;
                    }
                }
            }
            let alpha = round_coverage(count, max_alpha, cell_area);
            cursor = store_next(&mut out, cursor, alpha_depth, alpha, &mut carry)?;
        }
        store_flush(&mut out, cursor, &mut carry)?;
        Ok(Some((out, raster, ox0 as i32, out_cols as i32)))
    }

    /// Runs `paint`, bracketed by `PreFill`/`Cleanup` `dev_spec_op`
    /// notifications to the target. `Cleanup` is emitted even when `paint`
    /// fails.
    pub fn with_fill(&mut self, paint: impl FnOnce(&mut Self) -> RasterResult<()>) -> RasterResult<()> {
        self.target.dev_spec_op(SpecOp::PreFill)?;
        let paint_result = paint(self);
        let cleanup_result = self.target.dev_spec_op(SpecOp::Cleanup);
        paint_result?;
        cleanup_result
    }

    /// Runs `paint` bracketed by `PreStroke`/`PostStroke`. `swap_colors` is
    /// applied before `PreStroke` and, if `PreStroke` fails, reapplied to
    /// undo it before returning the error.
    pub fn with_stroke(
        &mut self,
        mut swap_colors: impl FnMut(&mut Self),
        paint: impl FnOnce(&mut Self) -> RasterResult<()>,
    ) -> RasterResult<()> {
        swap_colors(self);
        if let Err(e) = self.target.dev_spec_op(SpecOp::PreStroke) {
            swap_colors(self);
            return Err(e);
        }
        let paint_result = paint(self);
        self.target.dev_spec_op(SpecOp::PostStroke)?;
        paint_result
    }
}

impl RasterDevice for AlphaBufferDevice<'_> {
    fn width(&self) -> u32 {
        self.band.width()
    }

    fn height(&self) -> u32 {
        self.output_height << self.state.log2_y_scale
    }

    fn depth(&self) -> u32 {
        1
    }

    fn fill_rectangle(&mut self, rect: Rect, color: ColorIndex) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for y in rect.y..rect.y + rect.h {
            self.ensure_mapped(y, 1)?;
            let row = self.physical_row(y) as i32;
            self.band.fill_rectangle(Rect::new(rect.x, row, rect.w, 1), color)?;
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
        if rect.is_empty() {
            return Ok(());
        }
        for (i, y) in (rect.y..rect.y + rect.h).enumerate() {
            self.ensure_mapped(y, 1)?;
            let row = self.physical_row(y) as i32;
            self.band.copy_mono(
                &src[i * src_raster..],
                src_x,
                src_raster,
                Rect::new(rect.x, row, rect.w, 1),
                color0,
                color1,
            )?;
        }
        Ok(())
    }

    fn copy_color(&mut self, src: &[u8], src_x: u32, src_raster: usize, rect: Rect) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for (i, y) in (rect.y..rect.y + rect.h).enumerate() {
            self.ensure_mapped(y, 1)?;
            let row = self.physical_row(y) as i32;
            self.band.copy_color(&src[i * src_raster..], src_x, src_raster, Rect::new(rect.x, row, rect.w, 1))?;
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
        if rect.is_empty() {
            return Ok(());
        }
        for (i, y) in (rect.y..rect.y + rect.h).enumerate() {
            self.ensure_mapped(y, 1)?;
            let row = self.physical_row(y) as i32;
            self.band.copy_alpha(
                &src[i * src_raster..],
                src_x,
                src_raster,
                Rect::new(rect.x, row, rect.w, 1),
                color,
                alpha_depth,
            )?;
        }
        Ok(())
    }

    fn copy_planes(&mut self, src: &[u8], src_x: u32, src_raster: usize, rect: Rect, plane_height: u32) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for (i, y) in (rect.y..rect.y + rect.h).enumerate() {
            self.ensure_mapped(y, 1)?;
            let row = self.physical_row(y) as i32;
            self.band.copy_planes(&src[i * src_raster..], src_x, src_raster, Rect::new(rect.x, row, rect.w, 1), plane_height)?;
        }
        Ok(())
    }

    fn get_bits_rectangle(&self, rect: Rect, options: GetBitsOptions, params: &mut GetBitsParams) -> RasterResult<()> {
        if rect.h != 1 {
            return Err(RasterError::Range(
                "alpha buffer get_bits_rectangle only supports single-row reads".into(),
            ));
        }
        let row = self.physical_row(rect.y) as i32;
        self.band.get_bits_rectangle(Rect::new(rect.x, row, rect.w, 1), options, params)
    }

    fn map_rgb_color(&self, rgb: Rgb) -> ColorIndex {
        self.band.map_rgb_color(rgb)
    }

    fn map_color_rgb(&self, color: ColorIndex) -> Rgb {
        self.band.map_color_rgb(color)
    }

    fn map_cmyk_color(&self, cmyk: Cmyk) -> ColorIndex {
        self.band.map_cmyk_color(cmyk)
    }

    fn fill_rectangle_hl_color(&mut self, rect: Rect, devn: &DevnColor) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for y in rect.y..rect.y + rect.h {
            self.ensure_mapped(y, 1)?;
            let row = self.physical_row(y) as i32;
            self.band.fill_rectangle_hl_color(Rect::new(rect.x, row, rect.w, 1), devn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::Depth as RgDepth;

    struct RecordingTarget {
        device: ChunkyDevice,
        calls: Vec<(Rect, u32)>,
    }

    impl RasterDevice for RecordingTarget {
        fn width(&self) -> u32 {
            self.device.width()
        }
        fn height(&self) -> u32 {
            self.device.height()
        }
        fn depth(&self) -> u32 {
            self.device.depth()
        }
        fn fill_rectangle(&mut self, rect: Rect, color: ColorIndex) -> RasterResult<()> {
            self.device.fill_rectangle(rect, color)
        }
        fn copy_mono(&mut self, s: &[u8], sx: u32, sr: usize, r: Rect, c0: ColorIndex, c1: ColorIndex) -> RasterResult<()> {
            self.device.copy_mono(s, sx, sr, r, c0, c1)
        }
        fn copy_color(&mut self, s: &[u8], sx: u32, sr: usize, r: Rect) -> RasterResult<()> {
            self.device.copy_color(s, sx, sr, r)
        }
        fn copy_alpha(&mut self, s: &[u8], sx: u32, sr: usize, r: Rect, c: ColorIndex, a: u32) -> RasterResult<()> {
            self.calls.push((r, a));
            self.device.copy_alpha(s, sx, sr, r, c, a)
        }
        fn copy_planes(&mut self, s: &[u8], sx: u32, sr: usize, r: Rect, ph: u32) -> RasterResult<()> {
            self.device.copy_planes(s, sx, sr, r, ph)
        }
        fn get_bits_rectangle(&self, r: Rect, o: GetBitsOptions, p: &mut GetBitsParams) -> RasterResult<()> {
            self.device.get_bits_rectangle(r, o, p)
        }
        fn map_rgb_color(&self, rgb: Rgb) -> ColorIndex {
            self.device.map_rgb_color(rgb)
        }
        fn map_color_rgb(&self, c: ColorIndex) -> Rgb {
            self.device.map_color_rgb(c)
        }
        fn map_cmyk_color(&self, c: Cmyk) -> ColorIndex {
            self.device.map_cmyk_color(c)
        }
        fn fill_rectangle_hl_color(&mut self, r: Rect, d: &DevnColor) -> RasterResult<()> {
            self.device.fill_rectangle_hl_color(r, d)
        }
    }

    #[test]
    fn full_coverage_block_compresses_to_max_alpha() {
        let mut target = RecordingTarget { device: ChunkyDevice::new(2, 1, RgDepth::D8).unwrap(), calls: Vec::new() };
        let mut alpha = AlphaBufferDevice::new(2, 1, 2, 2, 1, 8, &mut target).unwrap();
        alpha.set_color(AlphaColor::Pure(ColorIndex(0xFF))).unwrap();
        alpha.fill_rectangle(Rect::new(0, 0, 8, 4), ColorIndex(1)).unwrap();
        alpha.flush().unwrap();
        assert_eq!(target.calls.len(), 1);
        let (rect, alpha_depth) = target.calls[0];
        assert_eq!(rect, Rect::new(0, 0, 2, 1));
        assert_eq!(alpha_depth, 2);
        let mut params = GetBitsParams::default();
        target
            .device
            .get_bits_rectangle(Rect::new(0, 0, 2, 1), GetBitsOptions::standard_copy(), &mut params)
            .unwrap();
        assert_eq!(target.device.row(0), &[0xFF, 0xFF]);
    }

    #[test]
    fn empty_block_emits_no_call() {
        let mut target = RecordingTarget { device: ChunkyDevice::new(2, 1, RgDepth::D8).unwrap(), calls: Vec::new() };
        let mut alpha = AlphaBufferDevice::new(2, 1, 2, 2, 1, 8, &mut target).unwrap();
        alpha.set_color(AlphaColor::Pure(ColorIndex(1))).unwrap();
        alpha.ensure_mapped(0, 1).unwrap();
        alpha.flush().unwrap();
        assert!(target.calls.is_empty());
    }

    #[test]
    fn mismatched_band_height_is_rejected() {
        let mut target = RecordingTarget { device: ChunkyDevice::new(2, 1, RgDepth::D8).unwrap(), calls: Vec::new() };
        assert!(AlphaBufferDevice::new(2, 1, 0, 2, 0, 5, &mut target).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// `round_coverage` always lands in `0..=max_alpha`, hits both
            /// ends at zero and full coverage, and never decreases as
            /// coverage grows for a fixed cell size.
            #[test]
            fn round_coverage_is_bounded_and_monotonic(cell_area in 1u64..64, max_alpha in 1u64..16, count in 0u64..64) {
                let count = count.min(cell_area);
                let alpha = round_coverage(count, max_alpha, cell_area);
                prop_assert!(alpha <= max_alpha);
                if count == 0 {
                    prop_assert_eq!(alpha, 0);
                }
                if count == cell_area {
                    prop_assert_eq!(alpha, max_alpha);
                }
                let next = round_coverage((count + 1).min(cell_area), max_alpha, cell_area);
                prop_assert!(next >= alpha);
            }
        }
    }
}

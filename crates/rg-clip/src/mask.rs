//! Forwarding device that restricts drawing to where a 1-bit mask is set.

use tracing::trace;

use rg_core::{ChunkyDevice, Cmyk, ColorIndex, DevnColor, GetBitsOptions, GetBitsParams, RasterDevice, RasterResult, Rect, Rgb};

use crate::runs::mask_row_runs;

/// Bytes of mask row data above which the clipper falls back to a
/// per-pixel bit test instead of the byte-run table. Chosen so the
/// mask's own backing store — which the clipper borrows rather than
/// copies — stays within the "fits in ~32 KiB" sizing the run table is
/// meant for.
const SCRATCH_ROW_CAP_BYTES: usize = 32 * 1024;

/// Clips every drawing operation to pixels where `mask` is set, forwarding
/// the restricted work to `target`. `phase_x`/`phase_y` place the mask's
/// origin in the target's coordinate space.
pub struct MaskClipDevice<'a> {
    mask: &'a ChunkyDevice,
    target: &'a mut dyn RasterDevice,
    phase_x: i32,
    phase_y: i32,
}

impl<'a> MaskClipDevice<'a> {
    pub fn new(mask: &'a ChunkyDevice, target: &'a mut dyn RasterDevice, phase_x: i32, phase_y: i32) -> Self {
        Self { mask, target, phase_x, phase_y }
    }

    fn mask_bit_at(&self, mx: i32, my: i32) -> bool {
        if mx < 0 || my < 0 || mx as u32 >= self.mask.width() || my as u32 >= self.mask.height() {
            return false;
        }
        self.mask.get_pixel(mx as u32, my as u32).map(|v| v != 0).unwrap_or(false)
    }

    /// Runs, in target coordinates, where the mask is set within row `y`
    /// and column span `[x0, x1)`.
    fn runs(&self, y: i32, x0: i32, x1: i32) -> Vec<(i32, i32)> {
        let my = y - self.phase_y;
        if my < 0 || my as u32 >= self.mask.height() {
            return Vec::new();
        }
        let mx0 = (x0 - self.phase_x).max(0);
        let mx1 = (x1 - self.phase_x).min(self.mask.width() as i32);
        if mx1 <= mx0 {
            return Vec::new();
        }
        let raster = self.mask.raster();
        let mask_runs = if raster > SCRATCH_ROW_CAP_BYTES {
            trace!(raster, "mask clipper falling back to per-pixel run scan");
            let mut runs = Vec::new();
            let mut x = mx0;
            while x < mx1 {
                if self.mask_bit_at(x, my) {
                    let start = x;
                    while x < mx1 && self.mask_bit_at(x, my) {
                        x += 1;
                    }
                    runs.push((start, x));
                } else {
                    x += 1;
                }
            }
            runs
        } else {
            mask_row_runs(self.mask.row(my as u32), mx0, mx1)
        };
        mask_runs.into_iter().map(|(s, e)| (s + self.phase_x, e + self.phase_x)).collect()
    }
}

impl RasterDevice for MaskClipDevice<'_> {
    fn width(&self) -> u32 {
        self.target.width()
    }

    fn height(&self) -> u32 {
        self.target.height()
    }

    fn depth(&self) -> u32 {
        self.target.depth()
    }

    fn fill_rectangle(&mut self, rect: Rect, color: ColorIndex) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for y in rect.y..rect.y + rect.h {
            for (x0, x1) in self.runs(y, rect.x, rect.x + rect.w) {
                self.target.fill_rectangle(Rect::new(x0, y, x1 - x0, 1), color)?;
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
        if rect.is_empty() {
            return Ok(());
        }
        for row in 0..rect.h {
            let y = rect.y + row;
            for (x0, x1) in self.runs(y, rect.x, rect.x + rect.w) {
                let offset = (x0 - rect.x) as u32;
                self.target.copy_mono(
                    &src[row as usize * src_raster..],
                    src_x + offset,
                    src_raster,
                    Rect::new(x0, y, x1 - x0, 1),
                    color0,
                    color1,
                )?;
            }
        }
        Ok(())
    }

    fn copy_color(&mut self, src: &[u8], src_x: u32, src_raster: usize, rect: Rect) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for row in 0..rect.h {
            let y = rect.y + row;
            for (x0, x1) in self.runs(y, rect.x, rect.x + rect.w) {
                let offset = (x0 - rect.x) as u32;
                self.target.copy_color(
                    &src[row as usize * src_raster..],
                    src_x + offset,
                    src_raster,
                    Rect::new(x0, y, x1 - x0, 1),
                )?;
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
        if rect.is_empty() {
            return Ok(());
        }
        for row in 0..rect.h {
            let y = rect.y + row;
            for (x0, x1) in self.runs(y, rect.x, rect.x + rect.w) {
                let offset = (x0 - rect.x) as u32;
                self.target.copy_alpha(
                    &src[row as usize * src_raster..],
                    src_x + offset,
                    src_raster,
                    Rect::new(x0, y, x1 - x0, 1),
                    color,
                    alpha_depth,
                )?;
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
        if rect.is_empty() {
            return Ok(());
        }
        let planes = self.target.depth();
        for row in 0..rect.h {
            let y = rect.y + row;
            let row_runs = self.runs(y, rect.x, rect.x + rect.w);
            if row_runs.is_empty() {
                continue;
            }
            // copy_planes addresses source rows as `plane * plane_height +
            // row`; forwarding a single row means re-stacking that one row
            // from each plane into a fresh 1-row-per-plane buffer.
            let mut single_row = vec![0u8; src_raster * planes as usize];
            for plane in 0..planes {
                let src_row = (plane * plane_height) as i32 + row;
                let src_off = src_row as usize * src_raster;
                let dst_off = plane as usize * src_raster;
                single_row[dst_off..dst_off + src_raster].copy_from_slice(&src[src_off..src_off + src_raster]);
            }
            for (x0, x1) in row_runs {
                let offset = (x0 - rect.x) as u32;
                self.target.copy_planes(
                    &single_row,
                    src_x + offset,
                    src_raster,
                    Rect::new(x0, y, x1 - x0, 1),
                    1,
                )?;
            }
        }
        Ok(())
    }

    fn get_bits_rectangle(&self, rect: Rect, options: GetBitsOptions, params: &mut GetBitsParams) -> RasterResult<()> {
        self.target.get_bits_rectangle(rect, options, params)
    }

    fn map_rgb_color(&self, rgb: Rgb) -> ColorIndex {
        self.target.map_rgb_color(rgb)
    }

    fn map_color_rgb(&self, color: ColorIndex) -> Rgb {
        self.target.map_color_rgb(color)
    }

    fn map_cmyk_color(&self, cmyk: Cmyk) -> ColorIndex {
        self.target.map_cmyk_color(cmyk)
    }

    fn fill_rectangle_hl_color(&mut self, rect: Rect, devn: &DevnColor) -> RasterResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        for y in rect.y..rect.y + rect.h {
            for (x0, x1) in self.runs(y, rect.x, rect.x + rect.w) {
                self.target.fill_rectangle_hl_color(Rect::new(x0, y, x1 - x0, 1), devn)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::Depth;

    #[test]
    fn fill_restricted_to_mask_runs() {
        let mut mask = ChunkyDevice::new_monobit(8, 1, false).unwrap();
        mask.fill_rectangle(Rect::new(2, 0, 3, 1), ColorIndex(1)).unwrap();
        let mut target = ChunkyDevice::new(8, 1, Depth::D8).unwrap();
        {
            let mut clip = MaskClipDevice::new(&mask, &mut target, 0, 0);
            clip.fill_rectangle(Rect::new(0, 0, 8, 1), ColorIndex(0xFF)).unwrap();
        }
        let expected: Vec<u8> = (0..8).map(|x| if (2..5).contains(&x) { 0xFF } else { 0 }).collect();
        assert_eq!(target.row(0), expected.as_slice());
    }

    #[test]
    fn phase_shifts_mask_into_target_space() {
        let mut mask = ChunkyDevice::new_monobit(4, 1, false).unwrap();
        mask.fill_rectangle(Rect::new(0, 0, 1, 1), ColorIndex(1)).unwrap();
        let mut target = ChunkyDevice::new(8, 1, Depth::D8).unwrap();
        {
            let mut clip = MaskClipDevice::new(&mask, &mut target, 3, 0);
            clip.fill_rectangle(Rect::new(0, 0, 8, 1), ColorIndex(7)).unwrap();
        }
        let expected: Vec<u8> = (0..8).map(|x| if x == 3 { 7 } else { 0 }).collect();
        assert_eq!(target.row(0), expected.as_slice());
    }

    #[test]
    fn empty_mask_row_is_a_noop() {
        let mask = ChunkyDevice::new_monobit(8, 1, false).unwrap();
        let mut target = ChunkyDevice::new(8, 1, Depth::D8).unwrap();
        {
            let mut clip = MaskClipDevice::new(&mask, &mut target, 0, 0);
            clip.fill_rectangle(Rect::new(0, 0, 8, 1), ColorIndex(9)).unwrap();
        }
        assert!(target.as_bytes().iter().all(|&b| b == 0));
    }
}

//! Forwarding device that restricts drawing to a replicated tile mask.

use rg_core::{Cmyk, ColorIndex, DevnColor, GetBitsOptions, GetBitsParams, RasterDevice, RasterResult, Rect, Rgb, StripBitmap};

use crate::runs::runs_in_span;

/// Clips drawing to the 1-bits of a replicated [`StripBitmap`], forwarding
/// restricted work to `target`. Unlike [`crate::MaskClipDevice`] the mask
/// has no edge — it tiles infinitely, so runs are computed directly from
/// `tile.bit_at` rather than a stored byte buffer.
pub struct TileClipDevice<'a> {
    tile: &'a StripBitmap,
    target: &'a mut dyn RasterDevice,
    phase_x: i32,
    phase_y: i32,
}

impl<'a> TileClipDevice<'a> {
    pub fn new(tile: &'a StripBitmap, target: &'a mut dyn RasterDevice, phase_x: i32, phase_y: i32) -> Self {
        Self { tile, target, phase_x, phase_y }
    }

    /// Repositions the tile's origin. O(1): the mask itself is never
    /// rebuilt, only the phase offset applied when sampling it.
    pub fn set_phase(&mut self, phase_x: i32, phase_y: i32) {
        self.phase_x = phase_x;
        self.phase_y = phase_y;
    }

    fn runs(&self, y: i32, x0: i32, x1: i32) -> Vec<(i32, i32)> {
        let ty = y as i64 - self.phase_y as i64;
        let tile = self.tile;
        let px = self.phase_x as i64;
        runs_in_span(|x| tile.bit_at(x as i64 - px, ty), x0, x1)
    }
}

impl RasterDevice for TileClipDevice<'_> {
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
    use rg_core::{ChunkyDevice, Depth};

    #[test]
    fn fill_follows_replicated_tile_pattern() {
        // 2x2 tile `01 / 10`, phase (0,0), fill a 4x4 depth-8 target.
        let tile = StripBitmap::new_mono(2, 2, 0, 1, vec![0b0100_0000, 0b1000_0000]);
        let mut target = ChunkyDevice::new(4, 4, Depth::D8).unwrap();
        {
            let mut clip = TileClipDevice::new(&tile, &mut target, 0, 0);
            clip.fill_rectangle(Rect::new(0, 0, 4, 4), ColorIndex(9)).unwrap();
        }
        let expected_row0: Vec<u8> = [0, 9, 0, 9].to_vec();
        let expected_row1: Vec<u8> = [9, 0, 9, 0].to_vec();
        assert_eq!(target.row(0), expected_row0.as_slice());
        assert_eq!(target.row(1), expected_row1.as_slice());
    }

    #[test]
    fn phase_update_is_immediate() {
        let tile = StripBitmap::new_mono(2, 2, 0, 1, vec![0b0100_0000, 0b1000_0000]);
        let mut target = ChunkyDevice::new(4, 1, Depth::D8).unwrap();
        {
            let mut clip = TileClipDevice::new(&tile, &mut target, 0, 0);
            clip.set_phase(1, 0);
            clip.fill_rectangle(Rect::new(0, 0, 4, 1), ColorIndex(5)).unwrap();
        }
        assert_eq!(target.row(0), &[5u8, 0, 5, 0]);
    }
}

//! The raster device contract and the `get_bits_rectangle` option set.

use bitflags::bitflags;

use crate::color::{Cmyk, ColorIndex, DevnColor, Rgb};
use crate::error::RasterResult;
use crate::rect::Rect;

bitflags! {
    /// `get_bits_rectangle` option bits, grouped by concern: Return, Align,
    /// Offset, Raster, Packing, Colors, Alpha, Depth.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GetBitsOptions: u32 {
        const RETURN_POINTER   = 1 << 0;
        const RETURN_COPY      = 1 << 1;

        const ALIGN_STANDARD   = 1 << 2;
        const ALIGN_ANY        = 1 << 3;

        const OFFSET_0         = 1 << 4;
        const OFFSET_SPECIFIED = 1 << 5;
        const OFFSET_ANY       = 1 << 6;

        const RASTER_STANDARD  = 1 << 7;
        const RASTER_SPECIFIED = 1 << 8;
        const RASTER_ANY       = 1 << 9;

        const PACKING_CHUNKY      = 1 << 10;
        const PACKING_PLANAR      = 1 << 11;
        const SELECT_PLANES       = 1 << 12;
        const PACKING_BIT_PLANAR  = 1 << 13;

        const COLORS_NATIVE = 1 << 14;
        const COLORS_RGB    = 1 << 15;
        const COLORS_CMYK   = 1 << 16;
        const COLORS_GRAY   = 1 << 17;

        const ALPHA_NONE  = 1 << 18;
        const ALPHA_FIRST = 1 << 19;
        const ALPHA_LAST  = 1 << 20;

        const DEPTH_8   = 1 << 21;
        const DEPTH_ALL = 1 << 22;
    }
}

impl GetBitsOptions {
    /// A reasonable "just give me the pixels" default: copy, standard
    /// alignment/offset/raster, chunky, native colors, no alpha.
    pub fn standard_copy() -> Self {
        Self::RETURN_COPY
            | Self::ALIGN_STANDARD
            | Self::OFFSET_0
            | Self::RASTER_STANDARD
            | Self::PACKING_CHUNKY
            | Self::COLORS_NATIVE
            | Self::ALPHA_NONE
    }
}

/// Negotiated parameters and output of `get_bits_rectangle`. `x_offset` and
/// `raster` are read when `OFFSET_SPECIFIED` / `RASTER_SPECIFIED` are set
/// and written back with the values actually used otherwise.
#[derive(Debug, Clone, Default)]
pub struct GetBitsParams {
    pub x_offset: usize,
    pub raster: usize,
    pub planes: Vec<bool>,
    pub data: Vec<u8>,
}

/// The full drawing contract shared by chunky and planar devices, and by
/// every forwarding device (clip, alpha-buffer, trap).
pub trait RasterDevice {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Total bits per pixel (chunky depth, or sum of plane depths).
    fn depth(&self) -> u32;

    fn fill_rectangle(&mut self, rect: Rect, color: ColorIndex) -> RasterResult<()>;

    fn copy_mono(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        color0: ColorIndex,
        color1: ColorIndex,
    ) -> RasterResult<()>;

    fn copy_color(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
    ) -> RasterResult<()>;

    fn copy_alpha(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        color: ColorIndex,
        alpha_depth: u32,
    ) -> RasterResult<()>;

    fn copy_planes(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        plane_height: u32,
    ) -> RasterResult<()>;

    fn get_bits_rectangle(
        &self,
        rect: Rect,
        options: GetBitsOptions,
        params: &mut GetBitsParams,
    ) -> RasterResult<()>;

    fn map_rgb_color(&self, rgb: Rgb) -> ColorIndex;
    fn map_color_rgb(&self, color: ColorIndex) -> Rgb;
    fn map_cmyk_color(&self, cmyk: Cmyk) -> ColorIndex;

    fn fill_rectangle_hl_color(&mut self, rect: Rect, devn: &DevnColor) -> RasterResult<()>;
}

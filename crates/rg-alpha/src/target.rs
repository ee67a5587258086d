//! Extension of [`RasterDevice`] letting a downstream device opt into
//! devn-aware alpha compositing and overprint-stack notifications.

use rg_core::{ColorIndex, DevnColor, RasterDevice, RasterResult, Rect};

/// The four transitions the alpha buffer reports around a fill/stroke pair
/// so a downstream overprint or transparency stack can reconfigure itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecOp {
    PreFill,
    PreStroke,
    Cleanup,
    PostStroke,
}

/// A [`RasterDevice`] that can additionally receive alpha-compressed rows
/// under a devn color and `dev_spec_op` lifecycle notifications. Every
/// `RasterDevice` gets a usable default for both: `copy_alpha_hl_color`
/// falls back to `copy_alpha` with an approximated pure color, and
/// `dev_spec_op` is a no-op. A device that participates in an overprint or
/// transparency stack overrides one or both.
pub trait AlphaTarget: RasterDevice {
    fn copy_alpha_hl_color(
        &mut self,
        src: &[u8],
        src_x: u32,
        src_raster: usize,
        rect: Rect,
        devn: &DevnColor,
        alpha_depth: u32,
    ) -> RasterResult<()> {
        let approx = ColorIndex(devn.components.first().copied().unwrap_or(0) as u64);
        self.copy_alpha(src, src_x, src_raster, rect, approx, alpha_depth)
    }

    fn dev_spec_op(&mut self, _op: SpecOp) -> RasterResult<()> {
        Ok(())
    }
}

impl<T: RasterDevice + ?Sized> AlphaTarget for T {}

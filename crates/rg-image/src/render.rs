//! Ties the pieces together: build a monobit mask device over the image's
//! device-space bounding box, let an external collaborator paint it, then
//! render the opaque image through a mask-clipped view of the real
//! destination.

use tracing::trace;

use rg_clip::MaskClipDevice;
use rg_core::{ChunkyDevice, RasterDevice, RasterResult, Rect};

/// Paints the opacity mask into a freshly allocated monobit device. An
/// "ordinary image rendering" collaborator external to this crate.
pub trait MaskRenderer {
    fn render_mask(&mut self, mask: &mut ChunkyDevice) -> RasterResult<()>;
}

/// Paints the opaque image through the mask-clipped destination.
pub trait ImageRenderer {
    fn render_image(&mut self, clipped: &mut dyn RasterDevice) -> RasterResult<()>;
}

/// Renders a type-3 (mask + opaque image) composite: allocate the mask
/// device over `bounds`, paint it, then paint the image through a
/// mask-clip layered at `bounds`'s origin over `dest`.
pub fn render_type3_image(
    dest: &mut dyn RasterDevice,
    bounds: Rect,
    mask_renderer: &mut dyn MaskRenderer,
    image_renderer: &mut dyn ImageRenderer,
) -> RasterResult<()> {
    trace!(?bounds, "type-3 image: building mask device");
    let mut mask = ChunkyDevice::new_monobit(bounds.w as u32, bounds.h as u32, false)?;
    mask_renderer.render_mask(&mut mask)?;

    let mut clip = MaskClipDevice::new(&mask, dest, bounds.x, bounds.y);
    image_renderer.render_image(&mut clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::{ColorIndex, Depth};

    struct FullMask;
    impl MaskRenderer for FullMask {
        fn render_mask(&mut self, mask: &mut ChunkyDevice) -> RasterResult<()> {
            let rect = Rect::new(0, 0, mask.width() as i32, mask.height() as i32);
            mask.fill_rectangle(rect, ColorIndex(1))
        }
    }

    struct SolidImage(ColorIndex);
    impl ImageRenderer for SolidImage {
        fn render_image(&mut self, clipped: &mut dyn RasterDevice) -> RasterResult<()> {
            clipped.fill_rectangle(Rect::new(0, 0, 4, 4), self.0)
        }
    }

    #[test]
    fn full_mask_lets_the_whole_image_through() {
        let mut dest = ChunkyDevice::new(4, 4, Depth::D8).unwrap();
        render_type3_image(&mut dest, Rect::new(0, 0, 4, 4), &mut FullMask, &mut SolidImage(ColorIndex(9))).unwrap();
        for y in 0..4 {
            assert_eq!(dest.row(y), &[9, 9, 9, 9]);
        }
    }

    struct HalfMask;
    impl MaskRenderer for HalfMask {
        fn render_mask(&mut self, mask: &mut ChunkyDevice) -> RasterResult<()> {
            let h = mask.height() as i32;
            mask.fill_rectangle(Rect::new(0, 0, 2, h), ColorIndex(1))
        }
    }

    #[test]
    fn partial_mask_clips_the_image_to_its_coverage() {
        let mut dest = ChunkyDevice::new(4, 4, Depth::D8).unwrap();
        render_type3_image(&mut dest, Rect::new(0, 0, 4, 4), &mut HalfMask, &mut SolidImage(ColorIndex(9))).unwrap();
        assert_eq!(dest.row(0), &[9, 9, 0, 0]);
    }
}

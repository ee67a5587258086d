//! Demo scene assembly and PPM output, factored out of `main` so it can be
//! exercised directly from tests.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use rg_alpha::{AlphaBufferDevice, AlphaColor};
use rg_core::{ChunkyDevice, ColorIndex, Depth, PlaneDescriptor, PlanarDevice, RasterDevice, Rect, Rgb, StripBitmap};
use rg_image::{render_type3_image, ImageRenderer, MaskRenderer};
use rg_rop::{strip_copy_rop, strip_copy_rop_planar, SourceOperand, TextureOperand};
use rg_trap::{ChunkyLineSource, ChunkyTrapProcessor, TrapConfig};

/// Builds the demo canvas: a background fill, a tiled band composited with
/// a rop, an anti-aliased disc rendered through the alpha buffer, and a
/// soft-edged badge rendered through the type-3 image splitter. Touches
/// every library crate in the workspace so the demo doubles as a smoke
/// test of the whole pipeline.
pub fn render_demo_scene(width: u32, height: u32) -> Result<ChunkyDevice> {
    let mut dest = ChunkyDevice::new(width, height, Depth::D24).context("allocate canvas")?;
    let background = dest.map_rgb_color(Rgb::new(20, 24, 35));
    dest.fill_rectangle(Rect::new(0, 0, width as i32, height as i32), background)?;

    paint_tiled_band(&mut dest)?;
    paint_rop_strip(&mut dest)?;
    run_trap_demo()?;
    run_planar_cmyk_demo()?;
    paint_alpha_disc(&mut dest)?;
    paint_badge(&mut dest)?;

    Ok(dest)
}

fn paint_tiled_band(dest: &mut ChunkyDevice) -> Result<()> {
    let tile = StripBitmap::new_mono(2, 2, 0, 1, vec![0b0100_0000, 0b1000_0000]);
    let band = Rect::new(0, 0, dest.width() as i32, 8.min(dest.height() as i32));
    let light = dest.map_rgb_color(Rgb::new(200, 200, 210));
    {
        let mut clip = rg_clip::TileClipDevice::new(&tile, dest, 0, 0);
        clip.fill_rectangle(band, light)?;
    }
    info!("painted tiled band");
    Ok(())
}

fn paint_rop_strip(dest: &mut ChunkyDevice) -> Result<()> {
    if dest.width() < 8 || dest.height() < 10 {
        return Ok(());
    }
    let mono_bits: Vec<u8> = vec![0b1010_1010];
    let rect = Rect::new(0, 9, 8, 1);
    let color0 = dest.map_rgb_color(Rgb::new(0, 0, 0));
    let color1 = dest.map_rgb_color(Rgb::new(255, 220, 0));
    strip_copy_rop(
        dest,
        Some(SourceOperand::Mono { data: &mono_bits, x: 0, raster: mono_bits.len(), color0, color1 }),
        None,
        rect,
        0x66,
    )?;
    info!("painted rop strip");
    Ok(())
}

struct FlatTrapBand {
    rows: Vec<Vec<u8>>,
}

impl ChunkyLineSource for FlatTrapBand {
    fn get_line(&mut self, y: u32, out: &mut [u8]) -> rg_core::RasterResult<()> {
        out.copy_from_slice(&self.rows[y as usize]);
        Ok(())
    }
}

/// Runs the trap processor over a tiny synthetic band purely to exercise
/// it end to end; the demo doesn't have a real separation pipeline to
/// trap, so the result is only logged.
fn run_trap_demo() -> Result<()> {
    let rows = vec![
        vec![255, 0, 255, 0, 255, 0],
        vec![255, 0, 20, 0, 255, 0],
        vec![255, 0, 255, 0, 255, 0],
    ];
    let config = TrapConfig::new(3, 3, vec![0, 1], 1, 1)?;
    let mut proc = ChunkyTrapProcessor::new(config, FlatTrapBand { rows });
    for _ in 0..3 {
        let row = proc.next_row()?;
        info!(?row, "trap demo row");
    }
    Ok(())
}

/// Exercises the planar rop path end to end: a 4-plane 1-bit CMYK device
/// gets a source row with overlapping C/M/Y ink, which the collapse
/// routine should fold into K, and a 3-plane 8-bit RGB device gets the
/// same source copied through the per-plane dispatch. No real separation
/// pipeline feeds this demo either, so both results are only logged.
fn run_planar_cmyk_demo() -> Result<()> {
    let cmyk_descriptors =
        vec![PlaneDescriptor::new(1, 3, 0), PlaneDescriptor::new(1, 2, 1), PlaneDescriptor::new(1, 1, 2), PlaneDescriptor::new(1, 0, 3)];
    let mut cmyk = PlanarDevice::new(4, 1, cmyk_descriptors, 4).context("allocate cmyk planes")?;
    let cmyk_source = [0xE0u8, 0x80, 0x00, 0xF0];
    strip_copy_rop_planar(
        &mut cmyk,
        Some(SourceOperand::Buffer { data: &cmyk_source, x: 0, raster: 4 }),
        None,
        Rect::new(0, 0, 4, 1),
        0xCC,
    )?;
    info!(
        c = ?cmyk.plane(0).as_bytes(),
        m = ?cmyk.plane(1).as_bytes(),
        y = ?cmyk.plane(2).as_bytes(),
        k = ?cmyk.plane(3).as_bytes(),
        "planar cmyk collapse demo"
    );

    let rgb_descriptors =
        vec![PlaneDescriptor::new(8, 16, 0), PlaneDescriptor::new(8, 8, 1), PlaneDescriptor::new(8, 0, 2)];
    let mut rgb = PlanarDevice::new(2, 1, rgb_descriptors, 24).context("allocate rgb planes")?;
    let rgb_source = [0x10u8, 0x20, 0x30, 0x40, 0x50, 0x60];
    strip_copy_rop_planar(
        &mut rgb,
        Some(SourceOperand::Buffer { data: &rgb_source, x: 0, raster: 6 }),
        None,
        Rect::new(0, 0, 2, 1),
        0xCC,
    )?;
    info!(r = ?rgb.plane(0).as_bytes(), g = ?rgb.plane(1).as_bytes(), b = ?rgb.plane(2).as_bytes(), "planar per-plane copy demo");
    Ok(())
}

fn paint_alpha_disc(dest: &mut ChunkyDevice) -> Result<()> {
    let w = dest.width();
    let h = dest.height();
    if w < 16 || h < 16 {
        return Ok(());
    }
    let band_rows = h.min(16);
    let mut alpha = AlphaBufferDevice::new(w, band_rows, 2, 2, 1, 16, dest)
        .context("allocate alpha buffer")?;
    alpha.set_color(AlphaColor::Pure(ColorIndex(0xFF_C0_40)))?;
    let scaled_rect = Rect::new((w as i32 / 2 - 4) << 2, 2 << 2, 8 << 2, 8 << 2);
    alpha.fill_rectangle(scaled_rect, ColorIndex(1))?;
    alpha.flush()?;
    info!("painted alpha disc");
    Ok(())
}

struct RectMask {
    rect: Rect,
}

impl MaskRenderer for RectMask {
    fn render_mask(&mut self, mask: &mut ChunkyDevice) -> rg_core::RasterResult<()> {
        mask.fill_rectangle(self.rect, ColorIndex(1))
    }
}

struct SolidBadge {
    color: ColorIndex,
}

impl ImageRenderer for SolidBadge {
    fn render_image(&mut self, clipped: &mut dyn RasterDevice) -> rg_core::RasterResult<()> {
        let rect = Rect::new(0, 0, clipped.width() as i32, clipped.height() as i32);
        clipped.fill_rectangle(rect, self.color)
    }
}

fn paint_badge(dest: &mut ChunkyDevice) -> Result<()> {
    let w = dest.width() as i32;
    let h = dest.height() as i32;
    if w < 12 || h < 12 {
        return Ok(());
    }
    let bounds = Rect::new(w - 10, h - 10, 8, 8);
    let badge_color = dest.map_rgb_color(Rgb::new(235, 70, 90));
    render_type3_image(
        dest,
        bounds,
        &mut RectMask { rect: Rect::new(1, 1, 6, 6) },
        &mut SolidBadge { color: badge_color },
    )?;
    info!("painted badge");
    Ok(())
}

/// Writes `device` as a binary PPM (P6), trimming each row to its visible
/// width before emitting it, since raster rows pad to the device's
/// alignment modulus.
pub fn write_ppm(path: impl AsRef<Path>, device: &ChunkyDevice) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    write!(file, "P6\n{} {}\n255\n", device.width(), device.height())?;
    let row_bytes = device.width() as usize * 3;
    for y in 0..device.height() {
        file.write_all(&device.row(y)[..row_bytes])?;
    }
    Ok(())
}

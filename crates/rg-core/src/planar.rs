//! The planar raster device: each color component stored in its own
//! contiguous plane, sharing height with its siblings.

use std::rc::Rc;

use tracing::trace;

use crate::chunky::ChunkyDevice;
use crate::color::{Cmyk, ColorIndex, DevnColor, Rgb};
use crate::depth::Depth;
use crate::device::{GetBitsOptions, GetBitsParams, RasterDevice};
use crate::error::{RasterError, RasterResult};
use crate::plane::{validate_planes, PlaneDescriptor};
use crate::rect::Rect;

/// A source byte packs two 4-bit CMYK nibbles; the table maps it straight
/// to the two-pixel bit pair each plane contributes, keyed by that plane's
/// shift within the nibble.
type CmykNibbleTable = [[u8; 4]; 256];

fn build_cmyk_nibble_table(descriptors: &[PlaneDescriptor]) -> Rc<CmykNibbleTable> {
    let mut table = Box::new([[0u8; 4]; 256]);
    for (byte, entry) in table.iter_mut().enumerate() {
        let hi = (byte as u64 >> 4) & 0xF;
        let lo = byte as u64 & 0xF;
        for (p, desc) in descriptors.iter().enumerate() {
            let hi_bit = (hi >> desc.shift) & 1;
            let lo_bit = (lo >> desc.shift) & 1;
            entry[p] = ((hi_bit << 1) | lo_bit) as u8;
        }
    }
    Rc::from(table)
}

/// Which specialized accelerator, if any, this plane configuration
/// qualifies for.
#[derive(Debug, Clone)]
enum Accelerator {
    None,
    Rgb8x3,
    Cmyk1x4(Rc<CmykNibbleTable>),
}

pub struct PlanarDevice {
    width: u32,
    height: u32,
    total_depth: u32,
    descriptors: Vec<PlaneDescriptor>,
    planes: Vec<ChunkyDevice>,
    accel: Accelerator,
}

impl PlanarDevice {
    pub fn new(width: u32, height: u32, descriptors: Vec<PlaneDescriptor>, total_depth: u32) -> RasterResult<Self> {
        validate_planes(&descriptors, total_depth)?;
        let mut planes = Vec::with_capacity(descriptors.len());
        for d in &descriptors {
            let depth = Depth::from_bits(d.depth)?;
            planes.push(ChunkyDevice::new(width, height, depth)?);
        }
        let accel = detect_accelerator(&descriptors, total_depth);
        Ok(Self {
            width,
            height,
            total_depth,
            descriptors,
            planes,
            accel,
        })
    }

    pub fn plane(&self, index: usize) -> &ChunkyDevice {
        &self.planes[index]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut ChunkyDevice {
        &mut self.planes[index]
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn descriptors(&self) -> &[PlaneDescriptor] {
        &self.descriptors
    }

    fn component_value(&self, color: u64, desc: &PlaneDescriptor) -> u64 {
        let mask = if desc.depth >= 64 { u64::MAX } else { (1u64 << desc.depth) - 1 };
        (color >> desc.shift) & mask
    }
}

fn detect_accelerator(descriptors: &[PlaneDescriptor], total_depth: u32) -> Accelerator {
    if total_depth == 24
        && descriptors.len() == 3
        && descriptors.iter().all(|d| d.depth == 8)
    {
        let mut shifts: Vec<u32> = descriptors.iter().map(|d| d.shift).collect();
        shifts.sort_unstable();
        if shifts == [0, 8, 16] {
            return Accelerator::Rgb8x3;
        }
    }
    if total_depth == 4 && descriptors.len() == 4 && descriptors.iter().all(|d| d.depth == 1) {
        return Accelerator::Cmyk1x4(build_cmyk_nibble_table(descriptors));
    }
    Accelerator::None
}

impl RasterDevice for PlanarDevice {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        self.total_depth
    }

    fn fill_rectangle(&mut self, rect: Rect, color: ColorIndex) -> RasterResult<()> {
        for (desc, plane) in self.descriptors.iter().zip(self.planes.iter_mut()) {
            let v = (color.0 >> desc.shift) & mask_for(desc.depth);
            plane.fill_rectangle(rect, ColorIndex(v))?;
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
        for (i, desc) in self.descriptors.clone().into_iter().enumerate() {
            let c0 = if color0.is_no_color() {
                ColorIndex::NO_COLOR
            } else {
                ColorIndex((color0.0 >> desc.shift) & mask_for(desc.depth))
            };
            let c1 = if color1.is_no_color() {
                ColorIndex::NO_COLOR
            } else {
                ColorIndex((color1.0 >> desc.shift) & mask_for(desc.depth))
            };
            self.planes[i].copy_mono(src, src_x, src_raster, rect, c0, c1)?;
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
        trace!(?rect, accel = ?self.accel, "planar copy_color");
        let rect = rect.clip_to(self.width as i32, self.height as i32);
        if rect.is_empty() {
            return Ok(());
        }
        let accel = self.accel.clone();
        match accel {
            Accelerator::Rgb8x3 => {
                for (i, desc) in self.descriptors.clone().into_iter().enumerate() {
                    // Component 0/1/2 addresses the R/G/B byte of each
                    // source triplet regardless of this plane's array slot.
                    let byte_offset = desc.component.min(2);
                    for row in 0..rect.h as u32 {
                        let plane = &mut self.planes[i];
                        for col in 0..rect.w as u32 {
                            let sx = (src_x + col) as usize;
                            let byte = row as usize * src_raster + sx * 3 + byte_offset;
                            let v = src[byte];
                            plane.set_pixel(rect.x as u32 + col, rect.y as u32 + row, v as u64)?;
                        }
                    }
                }
                Ok(())
            }
            Accelerator::Cmyk1x4(table) => {
                for row in 0..rect.h as u32 {
                    let mut col = 0u32;
                    while col < rect.w as u32 {
                        let sx = (src_x + col) as usize;
                        let bit_pos = row as usize * src_raster * 8 + sx * 4;
                        if bit_pos % 8 == 0 && col + 1 < rect.w as u32 {
                            let byte = src[bit_pos / 8];
                            let entry = &table[byte as usize];
                            for (i, &bits) in entry.iter().enumerate() {
                                self.planes[i].set_pixel(rect.x as u32 + col, rect.y as u32 + row, (bits >> 1) as u64 & 1)?;
                                self.planes[i].set_pixel(rect.x as u32 + col + 1, rect.y as u32 + row, bits as u64 & 1)?;
                            }
                            col += 2;
                        } else {
                            let native = read_bits(src, bit_pos, 4);
                            for (i, desc) in self.descriptors.clone().into_iter().enumerate() {
                                let v = self.component_value(native, &desc);
                                self.planes[i].set_pixel(rect.x as u32 + col, rect.y as u32 + row, v)?;
                            }
                            col += 1;
                        }
                    }
                }
                Ok(())
            }
            Accelerator::None => {
                for row in 0..rect.h as u32 {
                    for col in 0..rect.w as u32 {
                        let sx = (src_x + col) as usize;
                        let byte_bits = self.total_depth as usize;
                        let bit_pos = row as usize * src_raster * 8 + sx * byte_bits;
                        let native = read_bits(src, bit_pos, byte_bits);
                        for (i, desc) in self.descriptors.clone().into_iter().enumerate() {
                            let v = self.component_value(native, &desc);
                            self.planes[i]
                                .set_pixel(rect.x as u32 + col, rect.y as u32 + row, v)?;
                        }
                    }
                }
                Ok(())
            }
        }
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
        for (i, desc) in self.descriptors.clone().into_iter().enumerate() {
            let component_color = ColorIndex((color.0 >> desc.shift) & mask_for(desc.depth));
            self.planes[i].copy_alpha(src, src_x, src_raster, rect, component_color, alpha_depth)?;
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
        for plane in &mut self.planes {
            plane.copy_planes(src, src_x, src_raster, rect, plane_height)?;
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
        if options.contains(GetBitsOptions::SELECT_PLANES) {
            if params.planes.len() != self.planes.len() {
                return Err(RasterError::Range(
                    "get_bits_rectangle: SELECT_PLANES plane mask length mismatch".into(),
                ));
            }
            let index = params
                .planes
                .iter()
                .position(|&wanted| wanted)
                .ok_or_else(|| RasterError::Range("get_bits_rectangle: no plane selected".into()))?;
            return self.planes[index].get_bits_rectangle(rect, options, params);
        }
        if !options.contains(GetBitsOptions::PACKING_PLANAR) {
            return Err(RasterError::Range(
                "get_bits_rectangle: PlanarDevice requires PACKING_PLANAR or SELECT_PLANES".into(),
            ));
        }
        let mut combined = Vec::new();
        for plane in &self.planes {
            let mut sub = GetBitsParams::default();
            plane.get_bits_rectangle(rect, GetBitsOptions::standard_copy(), &mut sub)?;
            combined.push(sub.data);
        }
        params.data = combined.concat();
        Ok(())
    }

    fn map_rgb_color(&self, rgb: Rgb) -> ColorIndex {
        self.planes[0].map_rgb_color(rgb)
    }

    fn map_color_rgb(&self, color: ColorIndex) -> Rgb {
        self.planes[0].map_color_rgb(color)
    }

    fn map_cmyk_color(&self, cmyk: Cmyk) -> ColorIndex {
        self.planes[0].map_cmyk_color(cmyk)
    }

    fn fill_rectangle_hl_color(&mut self, rect: Rect, devn: &DevnColor) -> RasterResult<()> {
        for (i, desc) in self.descriptors.clone().into_iter().enumerate() {
            let component = devn.components.get(desc.component).copied().unwrap_or(0) as u64;
            let max_out = mask_for(desc.depth);
            let value = component * max_out / u16::MAX as u64;
            self.planes[i].fill_rectangle(rect, ColorIndex(value))?;
        }
        Ok(())
    }
}

fn mask_for(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn read_bits(buf: &[u8], bit_pos: usize, bits: usize) -> u64 {
    let mut acc = 0u64;
    for i in 0..bits {
        let p = bit_pos + i;
        let byte = buf[p / 8];
        let bit = (byte >> (7 - p % 8)) & 1;
        acc = (acc << 1) | bit as u64;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_planes() -> Vec<PlaneDescriptor> {
        vec![
            PlaneDescriptor::new(8, 16, 0),
            PlaneDescriptor::new(8, 8, 1),
            PlaneDescriptor::new(8, 0, 2),
        ]
    }

    #[test]
    fn rgb_deinterleave_matches_scenario() {
        let mut dev = PlanarDevice::new(4, 1, rgb_planes(), 24).unwrap();
        let src = [0xFF, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x00];
        dev.copy_color(&src, 0, 12, Rect::new(0, 0, 4, 1)).unwrap();
        assert_eq!(dev.plane(0).as_bytes(), &[0xFF, 0x00, 0x00, 0xFF]);
        assert_eq!(dev.plane(1).as_bytes(), &[0x00, 0xFF, 0x00, 0xFF]);
        assert_eq!(dev.plane(2).as_bytes(), &[0x00, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn fill_rectangle_splits_color_per_plane() {
        let mut dev = PlanarDevice::new(2, 2, rgb_planes(), 24).unwrap();
        dev.fill_rectangle(Rect::new(0, 0, 2, 2), ColorIndex(0x112233)).unwrap();
        assert!(dev.plane(0).as_bytes().iter().all(|&b| b == 0x11));
        assert!(dev.plane(1).as_bytes().iter().all(|&b| b == 0x22));
        assert!(dev.plane(2).as_bytes().iter().all(|&b| b == 0x33));
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
    fn cmyk_nibble_table_is_selected_for_four_one_bit_planes() {
        let dev = PlanarDevice::new(2, 1, cmyk_planes(), 4).unwrap();
        assert!(matches!(dev.accel, Accelerator::Cmyk1x4(_)));
    }

    #[test]
    fn cmyk_nibble_expansion_matches_generic_deinterleave() {
        // byte 0xA5: high nibble 0xA = 1010 (C=1,M=0,Y=1,K=0), low nibble
        // 0x5 = 0101 (C=0,M=1,Y=0,K=1).
        let mut dev = PlanarDevice::new(2, 1, cmyk_planes(), 4).unwrap();
        dev.copy_color(&[0xA5], 0, 1, Rect::new(0, 0, 2, 1)).unwrap();
        assert_eq!(dev.plane(0).as_bytes(), &[0b1000_0000]); // C
        assert_eq!(dev.plane(1).as_bytes(), &[0b0100_0000]); // M
        assert_eq!(dev.plane(2).as_bytes(), &[0b1000_0000]); // Y
        assert_eq!(dev.plane(3).as_bytes(), &[0b0100_0000]); // K
    }

    #[test]
    fn cmyk_nibble_expansion_handles_odd_width_tail_pixel() {
        let mut dev = PlanarDevice::new(3, 1, cmyk_planes(), 4).unwrap();
        // third pixel lives alone in the high nibble of a second byte.
        dev.copy_color(&[0xA5, 0xF0], 0, 2, Rect::new(0, 0, 3, 1)).unwrap();
        assert_eq!(dev.plane(0).as_bytes(), &[0b1010_0000]); // C: 1,0,1
        assert_eq!(dev.plane(3).as_bytes(), &[0b0110_0000]); // K: 0,1,1
    }
}

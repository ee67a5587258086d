//! Plane descriptors for planar buffers.

use crate::error::{RasterError, RasterResult};

/// One plane of a planar raster buffer: its own depth, its bit-shift
/// within the logical chunky pixel, and which color component it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneDescriptor {
    pub depth: u32,
    pub shift: u32,
    pub component: usize,
}

impl PlaneDescriptor {
    pub fn new(depth: u32, shift: u32, component: usize) -> Self {
        Self { depth, shift, component }
    }

    fn bit_range(self) -> (u32, u32) {
        (self.shift, self.shift + self.depth)
    }
}

/// Validates that `sum(depth) <= total_depth` and that no two planes'
/// `(shift, depth)` bit ranges overlap.
pub fn validate_planes(planes: &[PlaneDescriptor], total_depth: u32) -> RasterResult<()> {
    let sum: u32 = planes.iter().map(|p| p.depth).sum();
    if sum > total_depth {
        return Err(RasterError::Range(format!(
            "planar config sum of depths {sum} exceeds total depth {total_depth}"
        )));
    }
    for (i, a) in planes.iter().enumerate() {
        for b in &planes[i + 1..] {
            let (a0, a1) = a.bit_range();
            let (b0, b1) = b.bit_range();
            if a0 < b1 && b0 < a1 {
                return Err(RasterError::Range(format!(
                    "overlapping plane bit ranges: [{a0},{a1}) and [{b0},{b1})"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overflowing_sum() {
        let planes = [
            PlaneDescriptor::new(8, 0, 0),
            PlaneDescriptor::new(8, 8, 1),
            PlaneDescriptor::new(8, 16, 2),
            PlaneDescriptor::new(8, 24, 3),
        ];
        assert!(validate_planes(&planes, 24).is_err());
    }

    #[test]
    fn rejects_overlap() {
        let planes = [PlaneDescriptor::new(8, 0, 0), PlaneDescriptor::new(8, 4, 1)];
        assert!(validate_planes(&planes, 32).is_err());
    }

    #[test]
    fn accepts_disjoint_rgb_planes() {
        let planes = [
            PlaneDescriptor::new(8, 0, 0),
            PlaneDescriptor::new(8, 8, 1),
            PlaneDescriptor::new(8, 16, 2),
        ];
        assert!(validate_planes(&planes, 24).is_ok());
    }
}

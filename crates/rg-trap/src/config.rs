//! Static configuration for a trap processor: geometry and the
//! component-order permutation deciding which planes are "upper"/"lower".

use rg_core::{RasterError, RasterResult};

#[derive(Debug, Clone)]
pub struct TrapConfig {
    pub width: u32,
    pub height: u32,
    pub comp_order: Vec<usize>,
    pub max_x_offset: u32,
    pub max_y_offset: u32,
}

impl TrapConfig {
    pub fn new(
        width: u32,
        height: u32,
        comp_order: Vec<usize>,
        max_x_offset: u32,
        max_y_offset: u32,
    ) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::Range("trap config needs nonzero width and height".into()));
        }
        if comp_order.is_empty() {
            return Err(RasterError::Range("trap config needs at least one component".into()));
        }
        let c = comp_order.len();
        for &comp in &comp_order {
            if comp >= c {
                return Err(RasterError::Range(format!(
                    "comp_order entry {comp} out of range for {c} components"
                )));
            }
        }
        Ok(Self { width, height, comp_order, max_x_offset, max_y_offset })
    }

    pub fn component_count(&self) -> usize {
        self.comp_order.len()
    }

    pub fn ring_depth(&self) -> u32 {
        2 * self.max_y_offset + 1
    }
}

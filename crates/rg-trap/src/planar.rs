//! Planar trap processor: the source delivers one buffer per component per
//! scanline instead of interleaved bytes. Shares the process map and
//! decision predicates in [`crate::engine`] with the chunky variant,
//! differing only in how a pixel's component value is addressed.

use tracing::trace;

use rg_core::RasterResult;

use crate::config::TrapConfig;
use crate::engine::{process_row, RowWindow};

/// Supplies raw scanlines as one plane buffer per component.
pub trait PlanarLineSource {
    /// Fills `out` (one `width`-byte buffer per component, in component
    /// index order) with row `y`.
    fn get_line_planes(&mut self, y: u32, out: &mut [Vec<u8>]) -> RasterResult<()>;
}

struct PlanarRing<'a> {
    rows: &'a [Vec<Vec<u8>>],
    config: &'a TrapConfig,
}

impl RowWindow for PlanarRing<'_> {
    fn width(&self) -> u32 {
        self.config.width
    }

    fn height(&self) -> u32 {
        self.config.height
    }

    fn sample(&self, y: i32, x: i32, comp: usize) -> u8 {
        let depth = self.rows.len();
        self.rows[(y as usize) % depth][comp][x as usize]
    }
}

pub struct PlanarTrapProcessor<S: PlanarLineSource> {
    config: TrapConfig,
    source: S,
    ring: Vec<Vec<Vec<u8>>>,
    lines_read: u32,
    y: u32,
}

impl<S: PlanarLineSource> PlanarTrapProcessor<S> {
    pub fn new(config: TrapConfig, source: S) -> Self {
        let depth = config.ring_depth() as usize;
        let comps = config.component_count();
        let width = config.width as usize;
        let ring = vec![vec![vec![0u8; width]; comps]; depth];
        Self { config, source, ring, lines_read: 0, y: 0 }
    }

    fn refill(&mut self, y: u32) -> RasterResult<()> {
        let bound = (y + self.config.max_y_offset).min(self.config.height - 1);
        while self.lines_read <= bound {
            let depth = self.ring.len();
            let slot = (self.lines_read as usize) % depth;
            let lines_read = self.lines_read;
            self.source.get_line_planes(lines_read, &mut self.ring[slot])?;
            self.lines_read += 1;
        }
        Ok(())
    }

    /// Produces the trapped output row's planes at the processor's current
    /// `y`, advancing `y` afterward (wrapping as in
    /// [`ChunkyTrapProcessor::next_row`](crate::ChunkyTrapProcessor::next_row)).
    pub fn next_row(&mut self) -> RasterResult<Vec<Vec<u8>>> {
        let y = self.y;
        self.refill(y)?;

        let width = self.config.width as usize;
        let comps = self.config.component_count();
        let mut out = vec![vec![0u8; width]; comps];
        {
            let window = PlanarRing { rows: &self.ring, config: &self.config };
            process_row(&window, &self.config, y as i32, |x, comp, value| {
                out[comp][x as usize] = value;
            });
        }
        trace!(y, "planar trap processor emitted row");

        self.y += 1;
        if self.y == self.config.height {
            self.y = 0;
            self.lines_read = 0;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlaneSource {
        rows: Vec<Vec<Vec<u8>>>,
    }

    impl PlanarLineSource for PlaneSource {
        fn get_line_planes(&mut self, y: u32, out: &mut [Vec<u8>]) -> RasterResult<()> {
            for (comp, plane) in out.iter_mut().enumerate() {
                plane.copy_from_slice(&self.rows[y as usize][comp]);
            }
            Ok(())
        }
    }

    #[test]
    fn matches_chunky_result_on_same_data() {
        let rows = vec![
            vec![vec![255, 255, 255, 255, 255], vec![0, 0, 0, 0, 0]],
            vec![vec![255, 255, 20, 255, 255], vec![0, 0, 0, 0, 0]],
            vec![vec![255, 255, 255, 255, 255], vec![0, 0, 0, 0, 0]],
        ];
        let config = TrapConfig::new(5, 3, vec![0, 1], 1, 1).unwrap();
        let mut proc = PlanarTrapProcessor::new(config, PlaneSource { rows: rows.clone() });

        for expected in &rows {
            let out = proc.next_row().unwrap();
            assert_eq!(&out, expected);
        }
    }
}

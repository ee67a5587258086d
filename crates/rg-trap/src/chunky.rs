//! Component-interleaved trap processor: the source yields one byte buffer
//! per scanline, components adjacent within each pixel.

use tracing::trace;

use rg_core::RasterResult;

use crate::config::TrapConfig;
use crate::engine::{process_row, RowWindow};

/// Supplies raw, untrapped scanlines on demand, row by row.
pub trait ChunkyLineSource {
    /// Fills `out` (exactly `width * component_count` bytes) with row `y`.
    fn get_line(&mut self, y: u32, out: &mut [u8]) -> RasterResult<()>;
}

struct ChunkyRing<'a> {
    rows: &'a [Vec<u8>],
    config: &'a TrapConfig,
}

impl RowWindow for ChunkyRing<'_> {
    fn width(&self) -> u32 {
        self.config.width
    }

    fn height(&self) -> u32 {
        self.config.height
    }

    fn sample(&self, y: i32, x: i32, comp: usize) -> u8 {
        let depth = self.rows.len();
        let row = &self.rows[(y as usize) % depth];
        row[x as usize * self.config.component_count() + comp]
    }
}

/// Rolling trap processor over component-interleaved scanlines.
pub struct ChunkyTrapProcessor<S: ChunkyLineSource> {
    config: TrapConfig,
    source: S,
    ring: Vec<Vec<u8>>,
    lines_read: u32,
    y: u32,
}

impl<S: ChunkyLineSource> ChunkyTrapProcessor<S> {
    pub fn new(config: TrapConfig, source: S) -> Self {
        let depth = config.ring_depth() as usize;
        let row_bytes = config.width as usize * config.component_count();
        let ring = vec![vec![0u8; row_bytes]; depth];
        Self { config, source, ring, lines_read: 0, y: 0 }
    }

    fn refill(&mut self, y: u32) -> RasterResult<()> {
        let bound = (y + self.config.max_y_offset).min(self.config.height - 1);
        while self.lines_read <= bound {
            let depth = self.ring.len();
            let slot = (self.lines_read as usize) % depth;
            let lines_read = self.lines_read;
            self.source.get_line(lines_read, &mut self.ring[slot])?;
            self.lines_read += 1;
        }
        Ok(())
    }

    /// Produces the trapped output row at the processor's current `y`,
    /// advancing `y` afterward (wrapping to 0 and resetting the read
    /// cursor once it reaches `height`). On error, `y` does not advance.
    pub fn next_row(&mut self) -> RasterResult<Vec<u8>> {
        let y = self.y;
        self.refill(y)?;

        let row_bytes = self.config.width as usize * self.config.component_count();
        let mut out = vec![0u8; row_bytes];
        let comps = self.config.component_count();
        {
            let window = ChunkyRing { rows: &self.ring, config: &self.config };
            process_row(&window, &self.config, y as i32, |x, comp, value| {
                out[x as usize * comps + comp] = value;
            });
        }
        trace!(y, "trap processor emitted row");

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
    use rg_core::RasterError;

    struct VecSource {
        rows: Vec<Vec<u8>>,
    }

    impl ChunkyLineSource for VecSource {
        fn get_line(&mut self, y: u32, out: &mut [u8]) -> RasterResult<()> {
            out.copy_from_slice(&self.rows[y as usize]);
            Ok(())
        }
    }

    fn pack(pairs: &[(u8, u8)]) -> Vec<u8> {
        pairs.iter().flat_map(|&(a, b)| [a, b]).collect()
    }

    #[test]
    fn two_component_band_matches_worked_example() {
        let rows = vec![
            pack(&[(255, 0), (255, 0), (255, 0), (255, 0), (255, 0)]),
            pack(&[(255, 0), (255, 0), (20, 0), (255, 0), (255, 0)]),
            pack(&[(255, 0), (255, 0), (255, 0), (255, 0), (255, 0)]),
        ];
        let config = TrapConfig::new(5, 3, vec![0, 1], 1, 1).unwrap();
        let mut proc = ChunkyTrapProcessor::new(config, VecSource { rows: rows.clone() });

        let row0 = proc.next_row().unwrap();
        assert_eq!(row0, rows[0]);

        let row1 = proc.next_row().unwrap();
        assert_eq!(row1, rows[1]);

        let row2 = proc.next_row().unwrap();
        assert_eq!(row2, rows[2]);
    }

    #[test]
    fn flat_input_is_idempotent() {
        let rows = vec![pack(&[(100, 50), (100, 50), (100, 50)]); 4];
        let config = TrapConfig::new(3, 4, vec![0, 1], 1, 1).unwrap();
        let mut proc = ChunkyTrapProcessor::new(config, VecSource { rows: rows.clone() });
        for expected in &rows {
            let out = proc.next_row().unwrap();
            assert_eq!(&out, expected);
        }
    }

    #[test]
    fn get_line_error_does_not_advance_y() {
        struct FailingSource;
        impl ChunkyLineSource for FailingSource {
            fn get_line(&mut self, _y: u32, _out: &mut [u8]) -> RasterResult<()> {
                Err(RasterError::Fatal("boom".into()))
            }
        }
        let config = TrapConfig::new(2, 2, vec![0], 0, 0).unwrap();
        let mut proc = ChunkyTrapProcessor::new(config, FailingSource);
        assert!(proc.next_row().is_err());
        assert_eq!(proc.y, 0);
    }

    #[test]
    fn wraps_to_top_after_final_row() {
        let rows = vec![pack(&[(1, 1)]), pack(&[(1, 1)])];
        let config = TrapConfig::new(1, 2, vec![0, 1], 0, 0).unwrap();
        let mut proc = ChunkyTrapProcessor::new(config, VecSource { rows });
        proc.next_row().unwrap();
        proc.next_row().unwrap();
        assert_eq!(proc.y, 0);
        assert_eq!(proc.lines_read, 0);
    }
}

use proptest::prelude::*;
use rg_core::RasterResult;
use rg_trap::{ChunkyLineSource, ChunkyTrapProcessor, TrapConfig};

struct FlatSource {
    width: u32,
    values: Vec<u8>,
}

impl ChunkyLineSource for FlatSource {
    fn get_line(&mut self, _y: u32, out: &mut [u8]) -> RasterResult<()> {
        for x in 0..self.width as usize {
            out[x * self.values.len()..(x + 1) * self.values.len()].copy_from_slice(&self.values);
        }
        Ok(())
    }
}

proptest! {
    #[test]
    fn flat_band_is_always_idempotent(
        width in 2u32..6,
        height in 2u32..6,
        max_x_offset in 0u32..3,
        max_y_offset in 0u32..3,
        a in 0u8..=255,
        b in 0u8..=255,
    ) {
        let values = vec![a, b];
        let config = TrapConfig::new(width, height, vec![0, 1], max_x_offset, max_y_offset).unwrap();
        let mut proc = ChunkyTrapProcessor::new(config, FlatSource { width, values: values.clone() });
        for _ in 0..height {
            let row = proc.next_row().unwrap();
            for px in row.chunks_exact(2) {
                prop_assert_eq!(px, &values[..]);
            }
        }
    }
}

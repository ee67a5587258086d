use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rg_core::RasterResult;
use rg_trap::{ChunkyLineSource, ChunkyTrapProcessor, TrapConfig};

struct StripedSource {
    row_bytes: usize,
}

impl ChunkyLineSource for StripedSource {
    fn get_line(&mut self, y: u32, out: &mut [u8]) -> RasterResult<()> {
        let v = if y % 7 == 3 { 20 } else { 255 };
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = if i % 2 == 0 { v } else { 0 };
        }
        Ok(())
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let widths = [64u32, 256, 1024];

    let mut group = c.benchmark_group("chunky_trap_next_row");
    for &width in &widths {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_function(BenchmarkId::new("two_component", width), move |b| {
            let row_bytes = width as usize * 2;
            let config = TrapConfig::new(width, 64, vec![0, 1], 1, 1).unwrap();
            let mut proc = ChunkyTrapProcessor::new(config, StripedSource { row_bytes });

            b.iter(|| {
                black_box(proc.next_row().unwrap());
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

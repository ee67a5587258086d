use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rg_core::{ChunkyDevice, Depth, Rect, RasterDevice};
use rg_rop::{strip_copy_rop, SourceOperand};

fn criterion_benchmark(c: &mut Criterion) {
    let widths = [64u32, 256, 1024];

    let mut group = c.benchmark_group("strip_copy_rop");
    for &width in &widths {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_function(BenchmarkId::new("mono_over_chunky", width), move |b| {
            let mut dest = ChunkyDevice::new(width, 32, Depth::D24).unwrap();
            let color0 = dest.map_rgb_color(rg_core::Rgb::new(0, 0, 0));
            let color1 = dest.map_rgb_color(rg_core::Rgb::new(255, 255, 255));
            let mono_bytes = ((width as usize) + 7) / 8;
            let mono_bits = vec![0xAAu8; mono_bytes];
            let rect = Rect::new(0, 0, width as i32, 32);

            b.iter(|| {
                strip_copy_rop(
                    black_box(&mut dest),
                    Some(SourceOperand::Mono {
                        data: &mono_bits,
                        x: 0,
                        raster: mono_bytes,
                        color0,
                        color1,
                    }),
                    None,
                    rect,
                    0x66,
                )
                .unwrap();
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

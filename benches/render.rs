//! Benchmarks for Voronoi rendering and scoring.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use rand::SeedableRng;
use rand::rngs::StdRng;

use voronoi_painter::compute::{Painting, Partition, ClipRect, TargetImage};

fn target(size: u32) -> Arc<TargetImage> {
    let img = RgbaImage::from_fn(size, size, |x, y| Rgba([x as u8, y as u8, 100, 255]));
    Arc::new(TargetImage::new(img))
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for points in [50, 250, 500, 1000] {
        let mut rng = StdRng::seed_from_u64(1);
        let painting = Painting::new(&mut rng, points, target(256), [128, 128, 128]);
        let sites: Vec<(i32, i32)> = painting.points().iter().map(|p| p.position).collect();

        group.bench_with_input(BenchmarkId::from_parameter(points), &sites, |b, sites| {
            b.iter(|| Partition::compute(black_box(sites), ClipRect::canvas(256, 256)));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for size in [64, 128, 256] {
        let mut rng = StdRng::seed_from_u64(2);
        let painting = Painting::new(&mut rng, 250, target(size), [128, 128, 128]);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &painting,
            |b, painting| {
                b.iter(|| black_box(painting.render(1)));
            },
        );
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let painting = Painting::new(&mut rng, 250, target(256), [128, 128, 128]);

    c.bench_function("score_256x256_250_points", |b| {
        b.iter(|| black_box(painting.score()));
    });
}

criterion_group!(benches, bench_partition, bench_render, bench_score);
criterion_main!(benches);

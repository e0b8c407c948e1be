use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use image::RgbaImage;
use rand::{Rng, SeedableRng};
use spritebox_core::prelude::*;
use std::hint::black_box;

fn generate_sizes(count: usize, min_size: u32, max_size: u32) -> Vec<(u32, u32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|_| {
            (
                rng.gen_range(min_size..=max_size),
                rng.gen_range(min_size..=max_size),
            )
        })
        .collect()
}

fn bench_heuristics(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_rects");

    for count in [50, 100, 200] {
        let sizes = generate_sizes(count, 8, 64);
        group.throughput(Throughput::Elements(count as u64));

        for h in MaxRectsHeuristic::ALL {
            group.bench_with_input(
                BenchmarkId::new(h.short_name(), count),
                &sizes,
                |b, sizes| {
                    let cfg = PackerConfig::builder()
                        .with_dimensions(1024, 1024)
                        .heuristic(h)
                        .build();
                    b.iter(|| black_box(pack_rects(sizes, &cfg)));
                },
            );
        }
    }

    group.finish();
}

fn bench_project_repack(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_repack");

    for count in [50, 200] {
        let mut project = Project::new();
        project.set_canvas_size(2048, 2048);
        project.set_padding(1);
        for (i, (w, h)) in generate_sizes(count, 8, 64).into_iter().enumerate() {
            project.add_image(&format!("sprite_{i}"), RgbaImage::new(w, h));
        }
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| black_box(project.repack()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_heuristics, bench_project_repack);
criterion_main!(benches);

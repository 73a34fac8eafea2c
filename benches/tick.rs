//! Benchmarks for the CPU simulation loop.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ipre::prelude::*;
use ipre::spatial::SpatialGrid;

fn tile_engine(grid: u32, collisions: bool) -> Engine {
    let mut settings = Settings::default();
    settings.generation.mode = AnimationMode::TileGrid;
    settings.generation.grid_size = grid;
    settings.collisions.enabled = collisions;
    settings.performance.enabled = false;
    Engine::new(800, 600)
        .with_settings(settings)
        .with_image(SourceImage::noise(400, 300, 11), None)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for grid in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::new("tiles", grid), &grid, |b, &grid| {
            let mut engine = tile_engine(grid, false);
            engine.enqueue_pulse(ForcePulse::new(PulseKind::Swirl(RadialParams::default())).continuous());
            b.iter(|| engine.tick(black_box(16.0)))
        });
    }

    for grid in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::new("tiles_collisions", grid), &grid, |b, &grid| {
            let mut engine = tile_engine(grid, true);
            engine.enqueue_pulse(ForcePulse::new(PulseKind::Jitter(ChaosParams::default())).continuous());
            b.iter(|| engine.tick(black_box(16.0)))
        });
    }

    group.bench_function("pixels_2000", |b| {
        let mut settings = Settings::default();
        settings.generation.particle_density = 2000;
        settings.performance.enabled = false;
        let mut engine = Engine::new(800, 600).with_settings(settings);
        engine.enqueue_pulse(ForcePulse::burst(Vec2::splat(0.5), 1.0).continuous());
        b.iter(|| engine.tick(black_box(16.0)))
    });

    group.finish();
}

fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    let positions: Vec<(u32, Vec2)> = (0..4096u32)
        .map(|i| (i, Vec2::new((i % 64) as f32 * 12.5, (i / 64) as f32 * 9.4)))
        .collect();

    group.bench_function("rebuild_4096", |b| {
        let mut grid = SpatialGrid::new();
        b.iter(|| grid.rebuild(Vec2::new(800.0, 600.0), 25.0, black_box(positions.iter().copied())))
    });

    group.bench_function("candidate_pairs_4096", |b| {
        let mut grid = SpatialGrid::new();
        grid.rebuild(Vec2::new(800.0, 600.0), 25.0, positions.iter().copied());
        let mut pairs = Vec::new();
        b.iter(|| {
            pairs.clear();
            grid.candidate_pairs(&mut pairs);
            black_box(pairs.len())
        })
    });

    group.finish();
}

fn bench_draw(c: &mut Criterion) {
    let engine = tile_engine(32, false);
    let mut surface = match RasterSurface::new(400, 300) {
        Ok(surface) => surface,
        Err(err) => panic!("surface: {err}"),
    };
    c.bench_function("draw_tiles_32", |b| b.iter(|| engine.draw(&mut surface)));
}

criterion_group!(benches, bench_tick, bench_spatial_grid, bench_draw);
criterion_main!(benches);

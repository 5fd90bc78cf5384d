#![feature(portable_simd)]

use std::hint::black_box;
use std::simd::{f32x16, f32x4, f32x8};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_widephysics::physics::trees::Tree;
use rust_widephysics::utilities::{BoundingBox, ThreadDispatcher, WideF32};

const LEAF_COUNTS: [usize; 3] = [256, 1024, 4096];

fn random_boxes(count: usize) -> Vec<BoundingBox> {
    let mut rng = StdRng::seed_from_u64(7);
    // Keep density roughly constant as the scene grows.
    let extent = (count as f32).cbrt() * 2.0;
    (0..count)
        .map(|_| {
            let center = Vec3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            );
            BoundingBox::from_center(center, Vec3::splat(rng.gen_range(0.1..0.8)))
        })
        .collect()
}

fn build_tree<V: WideF32>(boxes: &[BoundingBox]) -> Tree<V> {
    let mut tree = Tree::new(boxes.len());
    for bounds in boxes {
        tree.add(bounds);
    }
    tree
}

fn bench_self_overlaps_for<V: WideF32>(c: &mut Criterion, name: &str) {
    let mut group = c.benchmark_group(format!("self_overlaps/{}", name));
    for &n in &LEAF_COUNTS {
        let tree = build_tree::<V>(&random_boxes(n));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &tree, |b, tree| {
            let mut pairs: Vec<(i32, i32)> = Vec::with_capacity(n * 4);
            b.iter(|| {
                pairs.clear();
                tree.get_self_overlaps(&mut pairs);
                black_box(pairs.len())
            })
        });
    }
    group.finish();
}

fn bench_self_overlaps(c: &mut Criterion) {
    bench_self_overlaps_for::<f32x4>(c, "w4");
    bench_self_overlaps_for::<f32x8>(c, "w8");
    bench_self_overlaps_for::<f32x16>(c, "w16");
}

fn bench_self_overlaps_multithreaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("self_overlaps_mt/w8");
    let dispatcher = ThreadDispatcher::new(4);
    for &n in &LEAF_COUNTS {
        let tree = build_tree::<f32x8>(&random_boxes(n));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &tree, |b, tree| {
            b.iter(|| black_box(tree.get_self_overlaps_multithreaded(&dispatcher).len()))
        });
    }
    group.finish();
}

fn bench_ray_casts(c: &mut Criterion) {
    let mut group = c.benchmark_group("ray_cast/w8");
    let mut rng = StdRng::seed_from_u64(11);
    let rays: Vec<(Vec3, Vec3)> = (0..256)
        .map(|_| {
            let origin = Vec3::new(
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
            );
            let target = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            (origin, target - origin)
        })
        .collect();
    for &n in &LEAF_COUNTS {
        let tree = build_tree::<f32x8>(&random_boxes(n));
        group.throughput(Throughput::Elements(rays.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &tree, |b, tree| {
            let mut hits: Vec<i32> = Vec::with_capacity(n);
            b.iter(|| {
                hits.clear();
                for &(origin, direction) in &rays {
                    let mut maximum_t = 1.0;
                    tree.ray_cast(origin, direction, &mut maximum_t, &mut hits);
                }
                black_box(hits.len())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_self_overlaps,
    bench_self_overlaps_multithreaded,
    bench_ray_casts
);
criterion_main!(benches);

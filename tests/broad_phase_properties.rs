#![feature(portable_simd)]

use std::collections::BTreeSet;
use std::simd::{f32x4, f32x8};

use glam::Vec3;
use proptest::prelude::*;
use rust_widephysics::physics::handles::BodyHandle;
use rust_widephysics::physics::trees::{Tree, TreeRay};
use rust_widephysics::physics::{BroadPhase, BroadPhaseSettings};
use rust_widephysics::utilities::{BoundingBox, SimdBackend, ThreadDispatcher};

fn bounding_box() -> impl Strategy<Value = BoundingBox> {
    (
        -20.0f32..20.0,
        -20.0f32..20.0,
        -20.0f32..20.0,
        0.0f32..4.0,
        0.0f32..4.0,
        0.0f32..4.0,
    )
        .prop_map(|(x, y, z, hx, hy, hz)| {
            BoundingBox::from_center(Vec3::new(x, y, z), Vec3::new(hx, hy, hz))
        })
}

fn backend() -> impl Strategy<Value = SimdBackend> {
    prop_oneof![
        Just(SimdBackend::Sse),
        Just(SimdBackend::Avx),
        Just(SimdBackend::Avx512),
    ]
}

fn brute_force_pairs(boxes: &[BoundingBox]) -> BTreeSet<(i32, i32)> {
    let mut pairs = BTreeSet::new();
    for i in 0..boxes.len() {
        for j in i + 1..boxes.len() {
            if BoundingBox::intersects(&boxes[i], &boxes[j]) {
                pairs.insert((i as i32, j as i32));
            }
        }
    }
    pairs
}

fn normalized(pairs: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut normalized: Vec<(i32, i32)> = pairs
        .iter()
        .map(|&(a, b)| if a < b { (a, b) } else { (b, a) })
        .collect();
    normalized.sort_unstable();
    normalized
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn intersection_is_symmetric(a in bounding_box(), b in bounding_box()) {
        prop_assert_eq!(BoundingBox::intersects(&a, &b), BoundingBox::intersects(&b, &a));
        prop_assert!(BoundingBox::intersects(&a, &a));
    }

    #[test]
    fn candidate_pairs_match_brute_force(
        boxes in prop::collection::vec(bounding_box(), 0..120),
        backend in backend(),
    ) {
        let mut broad_phase =
            BroadPhase::new(&BroadPhaseSettings::default().with_backend(backend)).unwrap();
        for (i, bounds) in boxes.iter().enumerate() {
            broad_phase.add(BodyHandle(i as i32), bounds);
        }
        broad_phase.validate();
        let pairs = broad_phase.find_candidate_pairs();
        let found: Vec<(i32, i32)> = pairs.iter().map(|pair| (pair.leaf_a, pair.leaf_b)).collect();
        let unique: BTreeSet<(i32, i32)> = found.iter().copied().collect();
        prop_assert_eq!(unique.len(), found.len(), "duplicate pairs reported");
        prop_assert!(found.iter().all(|&(a, b)| a != b), "self pair reported");
        prop_assert_eq!(unique, brute_force_pairs(&boxes));
        for pair in &pairs {
            prop_assert_eq!(pair.body_a, BodyHandle(pair.leaf_a));
        }
    }

    #[test]
    fn multithreaded_self_overlaps_match_single_threaded(
        boxes in prop::collection::vec(bounding_box(), 0..200),
    ) {
        let mut tree = Tree::<f32x4>::new(16);
        for bounds in &boxes {
            tree.add(bounds);
        }
        let mut single: Vec<(i32, i32)> = Vec::new();
        tree.get_self_overlaps(&mut single);
        let multi = tree.get_self_overlaps_multithreaded(&ThreadDispatcher::new(4));
        prop_assert_eq!(normalized(&single), normalized(&multi));
    }

    #[test]
    fn ray_cast_visits_exactly_the_hit_leaves(
        boxes in prop::collection::vec(bounding_box(), 1..100),
        origin in (-30.0f32..30.0, -30.0f32..30.0, -30.0f32..30.0),
        direction in (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0),
        maximum_t in 0.0f32..80.0,
    ) {
        let origin = Vec3::new(origin.0, origin.1, origin.2);
        let direction = Vec3::new(direction.0, direction.1, direction.2);
        let mut tree = Tree::<f32x8>::new(boxes.len());
        for bounds in &boxes {
            tree.add(bounds);
        }
        let mut hits: Vec<i32> = Vec::new();
        let mut final_t = maximum_t;
        tree.ray_cast(origin, direction, &mut final_t, &mut hits);
        prop_assert_eq!(final_t, maximum_t);
        hits.sort_unstable();
        let expected: Vec<i32> = (0..boxes.len() as i32)
            .filter(|&i| {
                TreeRay::new(origin, direction, maximum_t)
                    .intersects(&boxes[i as usize])
                    .is_some()
            })
            .collect();
        prop_assert_eq!(hits, expected);
    }

    #[test]
    fn inserted_leaves_are_tightly_bounded(
        boxes in prop::collection::vec(bounding_box(), 1..150),
    ) {
        let mut tree = Tree::<f32x8>::new(0);
        for bounds in &boxes {
            tree.add(bounds);
        }
        tree.validate();
        prop_assert_eq!(tree.leaf_count() as usize, boxes.len());
        let union = boxes
            .iter()
            .fold(BoundingBox::EMPTY, |merged, bounds| BoundingBox::create_merged(&merged, bounds));
        prop_assert_eq!(tree.root_bounds(), union);
        for (i, bounds) in boxes.iter().enumerate() {
            prop_assert_eq!(tree.get_bounds(i as i32), *bounds);
        }
    }

    #[test]
    fn removal_preserves_structure_and_overlaps(
        boxes in prop::collection::vec(bounding_box(), 2..100),
        removals in prop::collection::vec(any::<prop::sample::Index>(), 1..50),
    ) {
        let mut tree = Tree::<f32x4>::new(boxes.len());
        let mut mirror = boxes.clone();
        for bounds in &boxes {
            tree.add(bounds);
        }
        for removal in removals {
            if mirror.is_empty() {
                break;
            }
            let leaf = removal.index(mirror.len());
            let moved = tree.remove_at(leaf as i32);
            mirror.swap_remove(leaf);
            prop_assert_eq!(moved.is_some(), leaf < mirror.len());
            tree.validate();
        }
        prop_assert_eq!(tree.leaf_count() as usize, mirror.len());
        let mut found: Vec<(i32, i32)> = Vec::new();
        tree.get_self_overlaps(&mut found);
        let found: BTreeSet<(i32, i32)> = normalized(&found).into_iter().collect();
        prop_assert_eq!(found, brute_force_pairs(&mirror));
    }
}

#[test]
fn empty_and_single_leaf_trees_report_nothing() {
    let mut tree = Tree::<f32x4>::new(4);
    let mut pairs: Vec<(i32, i32)> = Vec::new();
    tree.get_self_overlaps(&mut pairs);
    let mut hits: Vec<i32> = Vec::new();
    let mut maximum_t = 10.0;
    tree.ray_cast(Vec3::ZERO, Vec3::X, &mut maximum_t, &mut hits);
    assert!(pairs.is_empty() && hits.is_empty());

    tree.add(&BoundingBox::new(Vec3::ZERO, Vec3::ONE));
    tree.get_self_overlaps(&mut pairs);
    assert!(pairs.is_empty());
    tree.ray_cast(Vec3::new(-1.0, 0.5, 0.5), Vec3::X, &mut maximum_t, &mut hits);
    assert_eq!(hits, vec![0]);
}

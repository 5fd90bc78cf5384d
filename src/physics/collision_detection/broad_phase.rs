use std::simd::{f32x16, f32x4, f32x8};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{PhysicsError, PhysicsResult};
use crate::physics::handles::BodyHandle;
use crate::physics::trees::{BreakableForEach, SweepLeafTester, Tree};
use crate::utilities::arch::SimdBackend;
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::thread_dispatcher::ThreadDispatcher;

/// Configuration of a [`BroadPhase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadPhaseSettings {
    /// Number of leaves the tree can hold before its arrays grow.
    pub initial_leaf_capacity: usize,
    /// Forces a lane width instead of detecting the widest one the CPU supports.
    pub backend: Option<SimdBackend>,
    /// Workers used by the self-overlap query. One keeps the query on the calling thread.
    pub thread_count: usize,
}

impl Default for BroadPhaseSettings {
    fn default() -> Self {
        Self {
            initial_leaf_capacity: 1024,
            backend: None,
            thread_count: 1,
        }
    }
}

impl BroadPhaseSettings {
    pub fn with_backend(mut self, backend: SimdBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_initial_leaf_capacity(mut self, initial_leaf_capacity: usize) -> Self {
        self.initial_leaf_capacity = initial_leaf_capacity;
        self
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if self.thread_count == 0 {
            return Err(PhysicsError::invalid_setting(
                "thread_count",
                "at least one worker is required",
            ));
        }
        if self.initial_leaf_capacity > i32::MAX as usize / 2 {
            return Err(PhysicsError::invalid_setting(
                "initial_leaf_capacity",
                format!("{} leaves can't be addressed", self.initial_leaf_capacity),
            ));
        }
        Ok(())
    }
}

/// Pair of leaves whose bounds overlap, along with the bodies that own them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidatePair {
    pub leaf_a: i32,
    pub leaf_b: i32,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
}

/// Tree instantiated at the lane width picked when the broad phase was created.
#[derive(Debug, Clone)]
enum WideTree {
    W4(Tree<f32x4>),
    W8(Tree<f32x8>),
    W16(Tree<f32x16>),
}

macro_rules! with_tree {
    ($tree:expr, $name:ident => $body:expr) => {
        match $tree {
            WideTree::W4($name) => $body,
            WideTree::W8($name) => $body,
            WideTree::W16($name) => $body,
        }
    };
}

/// Spatial index over the bounding boxes of bodies, producing the candidate pairs handed to the narrow phase.
///
/// Each body owns one leaf. Leaf indices are dense, so removing a leaf moves the last leaf into the freed index; the
/// leaf to body mapping follows that move.
#[derive(Debug, Clone)]
pub struct BroadPhase {
    backend: SimdBackend,
    tree: WideTree,
    leaf_bodies: Vec<BodyHandle>,
    dispatcher: ThreadDispatcher,
    frame_index: u64,
}

impl BroadPhase {
    pub fn new(settings: &BroadPhaseSettings) -> PhysicsResult<Self> {
        settings.validate()?;
        let backend = settings.backend.unwrap_or_else(SimdBackend::detect);
        let capacity = settings.initial_leaf_capacity;
        let tree = match backend.lane_count() {
            16 => WideTree::W16(Tree::new(capacity)),
            8 => WideTree::W8(Tree::new(capacity)),
            _ => WideTree::W4(Tree::new(capacity)),
        };
        info!(%backend, initial_leaf_capacity = capacity, "created broad phase");
        Ok(Self {
            backend,
            tree,
            leaf_bodies: Vec::with_capacity(capacity),
            dispatcher: ThreadDispatcher::new(settings.thread_count),
            frame_index: 0,
        })
    }

    /// Backend whose lane width the tree uses.
    #[inline(always)]
    pub fn backend(&self) -> SimdBackend {
        self.backend
    }

    #[inline(always)]
    pub fn lane_count(&self) -> usize {
        self.backend.lane_count()
    }

    #[inline(always)]
    pub fn leaf_count(&self) -> usize {
        self.leaf_bodies.len()
    }

    /// Body that owns a leaf.
    #[inline(always)]
    pub fn body(&self, leaf_index: i32) -> BodyHandle {
        self.leaf_bodies[leaf_index as usize]
    }

    /// Adds a leaf for `body` and returns its index.
    pub fn add(&mut self, body: BodyHandle, bounds: &BoundingBox) -> i32 {
        let leaf_index = with_tree!(&mut self.tree, tree => tree.add(bounds));
        debug_assert!(leaf_index as usize == self.leaf_bodies.len());
        self.leaf_bodies.push(body);
        leaf_index
    }

    /// Replaces a leaf's bounds and refits its ancestors.
    pub fn update_bounds(&mut self, leaf_index: i32, bounds: &BoundingBox) {
        with_tree!(&mut self.tree, tree => tree.update_bounds(leaf_index, bounds));
    }

    /// Writes a leaf's bounds without refitting its ancestors. The tree is only valid again after [`update`](Self::update).
    pub fn set_bounds_without_refit(&mut self, leaf_index: i32, bounds: &BoundingBox) {
        with_tree!(&mut self.tree, tree => tree.set_leaf_bounds_without_refit(leaf_index, bounds));
    }

    /// Refits the whole tree and refines a slice of it. Call once per frame after writing leaf bounds.
    ///
    /// Returns the number of treelets that were rebuilt.
    pub fn update(&mut self) -> usize {
        let frame_index = self.frame_index;
        self.frame_index = self.frame_index.wrapping_add(1);
        let rebuilt = with_tree!(&mut self.tree, tree => tree.refit_and_refine(frame_index));
        debug!(frame_index, rebuilt, leaf_count = self.leaf_bodies.len(), "updated broad phase");
        rebuilt
    }

    /// Summed child volume of the tree relative to its root volume. Lower means tighter.
    pub fn measure_volume_metric(&self) -> f32 {
        with_tree!(&self.tree, tree => tree.measure_volume_metric())
    }

    pub fn get_bounds(&self, leaf_index: i32) -> BoundingBox {
        with_tree!(&self.tree, tree => tree.get_bounds(leaf_index))
    }

    /// Removes a leaf. If another leaf was moved into the freed index, returns the body that owns it now.
    pub fn remove_at(&mut self, leaf_index: i32) -> Option<BodyHandle> {
        let moved = with_tree!(&mut self.tree, tree => tree.remove_at(leaf_index));
        self.leaf_bodies.swap_remove(leaf_index as usize);
        debug_assert!(moved.is_some() == ((leaf_index as usize) < self.leaf_bodies.len()));
        moved.map(|_| self.leaf_bodies[leaf_index as usize])
    }

    /// Finds every pair of leaves whose bounds overlap. Each unordered pair is reported once, with `leaf_a < leaf_b`.
    pub fn find_candidate_pairs(&self) -> Vec<CandidatePair> {
        let overlaps = if self.dispatcher.thread_count() > 1 {
            with_tree!(&self.tree, tree => tree.get_self_overlaps_multithreaded(&self.dispatcher))
        } else {
            let mut overlaps: Vec<(i32, i32)> = Vec::new();
            with_tree!(&self.tree, tree => tree.get_self_overlaps(&mut overlaps));
            overlaps
        };
        let pairs: Vec<CandidatePair> = overlaps
            .into_iter()
            .map(|(a, b)| {
                let (leaf_a, leaf_b) = if a < b { (a, b) } else { (b, a) };
                CandidatePair {
                    leaf_a,
                    leaf_b,
                    body_a: self.body(leaf_a),
                    body_b: self.body(leaf_b),
                }
            })
            .collect();
        debug!(
            leaf_count = self.leaf_count(),
            pair_count = pairs.len(),
            "found broad phase candidate pairs"
        );
        pairs
    }

    /// Casts a ray and reports every leaf whose bounds it hits within `[0, maximum_t]`. Returns the final
    /// `maximum_t`, which the tester may have lowered.
    pub fn ray_cast<T: SweepLeafTester + ?Sized>(
        &self,
        origin: Vec3,
        direction: Vec3,
        maximum_t: f32,
        tester: &mut T,
    ) -> f32 {
        let mut maximum_t = maximum_t;
        with_tree!(&self.tree, tree => tree.ray_cast(origin, direction, &mut maximum_t, tester));
        maximum_t
    }

    /// Sweeps a box along `direction` and reports every leaf it may touch within `[0, maximum_t]`.
    pub fn sweep<T: SweepLeafTester + ?Sized>(
        &self,
        bounds: &BoundingBox,
        direction: Vec3,
        maximum_t: f32,
        tester: &mut T,
    ) {
        with_tree!(&self.tree, tree => tree.sweep_bounds(bounds, direction, maximum_t, tester));
    }

    /// Reports every leaf whose bounds overlap `bounds`.
    pub fn query<E: BreakableForEach + ?Sized>(&self, bounds: &BoundingBox, enumerator: &mut E) {
        with_tree!(&self.tree, tree => tree.get_overlaps(bounds, enumerator));
    }

    /// Checks the tree's structural invariants and the leaf map. Panics on violation.
    pub fn validate(&self) {
        let tree_leaf_count = with_tree!(&self.tree, tree => {
            tree.validate();
            tree.leaf_count()
        });
        assert_eq!(tree_leaf_count as usize, self.leaf_bodies.len());
    }

    /// Removes every leaf.
    pub fn clear(&mut self) {
        with_tree!(&mut self.tree, tree => tree.clear());
        self.leaf_bodies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f32) -> BoundingBox {
        BoundingBox::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn forced_backend_picks_the_tree_width() {
        for (backend, lanes) in [(SimdBackend::Sse, 4), (SimdBackend::Avx, 8), (SimdBackend::Avx512, 16)] {
            let broad_phase = BroadPhase::new(&BroadPhaseSettings::default().with_backend(backend)).unwrap();
            assert_eq!(broad_phase.lane_count(), lanes);
            assert_eq!(broad_phase.leaf_count(), 0);
            assert!(broad_phase.find_candidate_pairs().is_empty());
        }
        assert!(BroadPhase::new(&BroadPhaseSettings::default().with_thread_count(0)).is_err());
    }

    #[test]
    fn overlapping_neighbours_become_candidates() {
        let mut broad_phase =
            BroadPhase::new(&BroadPhaseSettings::default().with_backend(SimdBackend::Avx)).unwrap();
        // Boxes at x = 0, 0.75, 1.5, ... overlap their immediate neighbours only.
        for i in 0..20 {
            broad_phase.add(BodyHandle(100 + i), &unit_box(i as f32 * 0.75));
        }
        broad_phase.validate();
        let mut pairs = broad_phase.find_candidate_pairs();
        pairs.sort();
        assert_eq!(pairs.len(), 19);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!((pair.leaf_a, pair.leaf_b), (i as i32, i as i32 + 1));
            assert_eq!(pair.body_a, BodyHandle(100 + i as i32));
        }
    }

    #[test]
    fn removal_keeps_the_body_map_consistent() {
        let mut broad_phase =
            BroadPhase::new(&BroadPhaseSettings::default().with_backend(SimdBackend::Sse)).unwrap();
        for i in 0..10 {
            broad_phase.add(BodyHandle(i), &unit_box(i as f32 * 3.0));
        }
        assert_eq!(broad_phase.remove_at(2), Some(BodyHandle(9)));
        assert_eq!(broad_phase.body(2), BodyHandle(9));
        assert_eq!(broad_phase.get_bounds(2), unit_box(27.0));
        assert_eq!(broad_phase.remove_at(8), None);
        broad_phase.validate();

        broad_phase.update_bounds(2, &unit_box(3.5));
        let pairs = broad_phase.find_candidate_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].body_a, pairs[0].body_b), (BodyHandle(1), BodyHandle(9)));
    }

    #[test]
    fn updates_keep_pairs_and_tighten_the_tree() {
        let mut broad_phase =
            BroadPhase::new(&BroadPhaseSettings::default().with_backend(SimdBackend::Sse)).unwrap();
        // A 12 x 12 sheet of overlapping boxes added in a scrambled order.
        for i in 0..144 {
            let cell = i * 89 % 144;
            let min = Vec3::new((cell % 12) as f32 * 1.5, (cell / 12) as f32 * 1.5, 0.0);
            broad_phase.add(BodyHandle(i), &BoundingBox::new(min, min + Vec3::splat(2.0)));
        }
        let mut expected = broad_phase.find_candidate_pairs();
        expected.sort();
        let initial_metric = broad_phase.measure_volume_metric();
        for _ in 0..32 {
            broad_phase.update();
            broad_phase.validate();
        }
        assert!(broad_phase.measure_volume_metric() <= initial_metric * (1.0 + 1e-5));
        let mut pairs = broad_phase.find_candidate_pairs();
        pairs.sort();
        assert_eq!(pairs, expected);

        // Moving leaves without refitting is repaired by the next update.
        for leaf in 0..144 {
            let bounds = broad_phase.get_bounds(leaf);
            let shifted = BoundingBox::new(bounds.min + Vec3::Z * 10.0, bounds.max + Vec3::Z * 10.0);
            broad_phase.set_bounds_without_refit(leaf, &shifted);
        }
        broad_phase.update();
        broad_phase.validate();
        let mut shifted_pairs = broad_phase.find_candidate_pairs();
        shifted_pairs.sort();
        assert_eq!(shifted_pairs, expected);
    }

    #[test]
    fn ray_and_volume_queries_report_leaves() {
        let mut broad_phase =
            BroadPhase::new(&BroadPhaseSettings::default().with_backend(SimdBackend::Avx512)).unwrap();
        for i in 0..40 {
            broad_phase.add(BodyHandle(i), &unit_box(i as f32 * 2.0));
        }
        let mut hits: Vec<i32> = Vec::new();
        let maximum_t = broad_phase.ray_cast(Vec3::new(-1.0, 0.5, 0.5), Vec3::X, 10.0, &mut hits);
        assert_eq!(maximum_t, 10.0);
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1, 2, 3, 4]);

        let mut found: Vec<i32> = Vec::new();
        broad_phase.query(
            &BoundingBox::new(Vec3::new(8.5, 0.0, 0.0), Vec3::new(12.5, 1.0, 1.0)),
            &mut found,
        );
        found.sort_unstable();
        assert_eq!(found, vec![4, 5, 6]);

        let mut swept: Vec<i32> = Vec::new();
        broad_phase.sweep(
            &BoundingBox::new(Vec3::new(0.2, 2.0, 0.2), Vec3::new(0.8, 2.5, 0.8)),
            -Vec3::Y,
            10.0,
            &mut swept,
        );
        assert_eq!(swept, vec![0]);
    }
}

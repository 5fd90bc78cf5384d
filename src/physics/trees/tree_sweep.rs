use glam::Vec3;

use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::vector::{for_each_lane, WideF32};
use crate::utilities::vector3_wide::Vector3Wide;

use super::tree::Tree;
use super::tree_ray_cast::{TreeRay, TreeRayWide};

/// Initial capacity of the explicit traversal stack. The stack grows if a tree is deeper than this.
pub const TRAVERSAL_STACK_CAPACITY: usize = 256;

/// Trait for testing sweep and ray intersections against leaves in the tree.
pub trait SweepLeafTester {
    /// Called for every leaf whose (expanded) bounds the query hits. Lowering `maximum_t` culls later candidates.
    fn test_leaf(&mut self, leaf_index: i32, maximum_t: &mut f32);
}

impl SweepLeafTester for Vec<i32> {
    #[inline(always)]
    fn test_leaf(&mut self, leaf_index: i32, _maximum_t: &mut f32) {
        self.push(leaf_index);
    }
}

impl<V: WideF32> Tree<V> {
    /// Depth first traversal driven by an explicit stack.
    ///
    /// At every node the hit children are ordered by entry time: the nearest is visited next and the rest are pushed
    /// so that the nearer ones pop first.
    pub(crate) fn sweep_internal<T: SweepLeafTester + ?Sized>(
        &self,
        expansion: Vec3,
        tree_ray: &mut TreeRay,
        leaf_tester: &mut T,
    ) {
        if self.leaf_count() == 0 {
            return;
        }
        let expansion = Vector3Wide::<V>::broadcast(expansion);
        let wide_ray = TreeRayWide::<V>::broadcast(tree_ray);
        let mut stack: Vec<i32> = Vec::with_capacity(TRAVERSAL_STACK_CAPACITY);
        let mut hits = [(0.0f32, 0i32); 16];
        let mut node_index = 0;
        loop {
            if node_index < 0 {
                leaf_tester.test_leaf(Self::encode(node_index), &mut tree_ray.maximum_t);
                // Leaves have no children; pull from the stack.
                match stack.pop() {
                    Some(next) => node_index = next,
                    None => return,
                }
                continue;
            }

            let node = self.node(node_index);
            let (mask, t) = wide_ray.intersects(&node.bounds.expand(&expansion), tree_ray.maximum_t);
            let mask = mask & node.occupied_mask();
            match mask.count_ones() {
                0 => match stack.pop() {
                    Some(next) => node_index = next,
                    None => return,
                },
                1 => node_index = node.child(mask.trailing_zeros() as usize),
                _ => {
                    let mut hit_count = 0;
                    for_each_lane(mask, |slot| {
                        hits[hit_count] = (t.lane(slot), node.child(slot));
                        hit_count += 1;
                    });
                    // Farthest first.
                    hits[..hit_count].sort_unstable_by(|a, b| b.0.total_cmp(&a.0));
                    stack.extend(hits[..hit_count - 1].iter().map(|&(_, child)| child));
                    node_index = hits[hit_count - 1].1;
                }
            }
        }
    }

    /// Converts a bounding box to a centroid + half-extent representation.
    #[inline(always)]
    pub fn convert_box_to_centroid_with_extent(bounds: &BoundingBox) -> (Vec3, Vec3) {
        let half_min = 0.5 * bounds.min;
        let half_max = 0.5 * bounds.max;
        (half_max + half_min, half_max - half_min)
    }

    /// Sweeps a box with the given half extents from `origin` along `direction` against the tree.
    ///
    /// Every node box is expanded by `expansion` before the ray test, so a leaf is reported whenever the swept box
    /// touches its bounds within `[0, maximum_t]`.
    pub fn sweep<T: SweepLeafTester + ?Sized>(
        &self,
        origin: Vec3,
        direction: Vec3,
        maximum_t: f32,
        expansion: Vec3,
        sweep_tester: &mut T,
    ) {
        let mut tree_ray = TreeRay::new(origin, direction, maximum_t);
        self.sweep_internal(expansion, &mut tree_ray, sweep_tester);
    }

    /// Performs a swept bounding box test against the tree.
    pub fn sweep_bounds<T: SweepLeafTester + ?Sized>(
        &self,
        bounds: &BoundingBox,
        direction: Vec3,
        maximum_t: f32,
        sweep_tester: &mut T,
    ) {
        let (origin, expansion) = Self::convert_box_to_centroid_with_extent(bounds);
        self.sweep(origin, direction, maximum_t, expansion, sweep_tester);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::simd::f32x4;

    fn row_of_boxes(count: i32) -> Tree<f32x4> {
        let mut tree = Tree::new(count as usize);
        for i in 0..count {
            let min = Vec3::new(i as f32 * 2.0, 0.0, 0.0);
            tree.add(&BoundingBox::new(min, min + Vec3::ONE));
        }
        tree
    }

    #[test]
    fn ray_visits_leaves_front_to_back() {
        let tree = row_of_boxes(20);
        let mut visited: Vec<i32> = Vec::new();
        let mut maximum_t = 1000.0;
        tree.ray_cast(Vec3::new(-1.0, 0.5, 0.5), Vec3::X, &mut maximum_t, &mut visited);
        assert_eq!(visited, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn tester_can_stop_the_ray_early() {
        let tree = row_of_boxes(20);
        struct FirstHit(Vec<i32>);
        impl SweepLeafTester for FirstHit {
            fn test_leaf(&mut self, leaf_index: i32, maximum_t: &mut f32) {
                self.0.push(leaf_index);
                *maximum_t = 0.0;
            }
        }
        let mut first_hit = FirstHit(Vec::new());
        let mut maximum_t = 1000.0;
        tree.ray_cast(Vec3::new(-1.0, 0.5, 0.5), Vec3::X, &mut maximum_t, &mut first_hit);
        assert_eq!(maximum_t, 0.0);
        assert_eq!(first_hit.0[0], 0);
        // Candidates already on the stack are still reported; nothing deeper is.
        assert!(first_hit.0.len() < 20);
    }

    #[test]
    fn expansion_widens_the_sweep() {
        let tree = row_of_boxes(4);
        let mut thin: Vec<i32> = Vec::new();
        tree.sweep(Vec3::new(-1.0, 1.5, 0.5), Vec3::X, 100.0, Vec3::ZERO, &mut thin);
        assert!(thin.is_empty());
        let mut thick: Vec<i32> = Vec::new();
        tree.sweep_bounds(
            &BoundingBox::new(Vec3::new(-2.0, 0.5, 0.0), Vec3::new(0.0, 2.5, 1.0)),
            Vec3::X,
            100.0,
            &mut thick,
        );
        thick.sort_unstable();
        assert_eq!(thick, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_tree_reports_nothing() {
        let tree = Tree::<f32x4>::new(0);
        let mut visited: Vec<i32> = Vec::new();
        tree.sweep(Vec3::ZERO, Vec3::Y, 10.0, Vec3::ONE, &mut visited);
        assert!(visited.is_empty());
    }
}

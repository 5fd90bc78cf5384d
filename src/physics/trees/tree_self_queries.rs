use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::bounding_box_wide::BoundingBoxWide;
use crate::utilities::vector::{for_each_lane, WideF32};

use super::tree::Tree;

/// Overlap callback for tree overlap queries.
pub trait OverlapHandler {
    /// Handles an overlap between leaves.
    fn handle(&mut self, index_a: i32, index_b: i32);
}

impl OverlapHandler for Vec<(i32, i32)> {
    #[inline(always)]
    fn handle(&mut self, index_a: i32, index_b: i32) {
        self.push((index_a, index_b));
    }
}

/// Slots of a node after `slot` that are occupied.
#[inline(always)]
pub(crate) fn occupied_after(slot: usize, child_count: i32) -> u32 {
    ((1u32 << child_count) - 1) & !((2u32 << slot) - 1)
}

impl<V: WideF32> Tree<V> {
    /// Dispatches a pair of intersecting child references by kind.
    #[inline(always)]
    pub(crate) fn dispatch_test_for_nodes<H: OverlapHandler>(
        &self,
        a: i32,
        a_bounds: &BoundingBox,
        b: i32,
        b_bounds: &BoundingBox,
        results: &mut H,
    ) {
        if a >= 0 {
            if b >= 0 {
                self.get_overlaps_between_different_nodes(a, b, results);
            } else {
                // leaf B versus node A.
                self.test_leaf_against_node(Self::encode(b), b_bounds, a, results);
            }
        } else if b >= 0 {
            // leaf A versus node B.
            self.test_leaf_against_node(Self::encode(a), a_bounds, b, results);
        } else {
            // Two leaves.
            results.handle(Self::encode(a), Self::encode(b));
        }
    }

    pub(crate) fn test_leaf_against_node<H: OverlapHandler>(
        &self,
        leaf_index: i32,
        leaf_bounds: &BoundingBox,
        node_index: i32,
        results: &mut H,
    ) {
        let node = self.node(node_index);
        let mask = BoundingBoxWide::intersects(&BoundingBoxWide::broadcast(leaf_bounds), &node.bounds)
            & node.occupied_mask();
        for_each_lane(mask, |slot| {
            let child = node.child(slot);
            if child < 0 {
                results.handle(leaf_index, Self::encode(child));
            } else {
                self.test_leaf_against_node(leaf_index, leaf_bounds, child, results);
            }
        });
    }

    pub(crate) fn get_overlaps_between_different_nodes<H: OverlapHandler>(
        &self,
        a_index: i32,
        b_index: i32,
        results: &mut H,
    ) {
        // There are no shared children, so test them all.
        let a = self.node(a_index);
        let b = self.node(b_index);
        let b_occupied = b.occupied_mask();
        for slot_a in 0..a.child_count as usize {
            let a_bounds = a.bounds.get(slot_a);
            let mask = BoundingBoxWide::intersects(&BoundingBoxWide::broadcast(&a_bounds), &b.bounds)
                & b_occupied;
            for_each_lane(mask, |slot_b| {
                let b_bounds = b.bounds.get(slot_b);
                self.dispatch_test_for_nodes(
                    a.child(slot_a),
                    &a_bounds,
                    b.child(slot_b),
                    &b_bounds,
                    results,
                );
            });
        }
    }

    /// Tests every pair of distinct children within one node, without descending into the children's own subtrees.
    pub(crate) fn get_overlaps_between_children<H: OverlapHandler>(
        &self,
        node_index: i32,
        results: &mut H,
    ) {
        let node = self.node(node_index);
        for slot_a in 0..(node.child_count as usize).saturating_sub(1) {
            let a_bounds = node.bounds.get(slot_a);
            let mask = BoundingBoxWide::intersects(&BoundingBoxWide::broadcast(&a_bounds), &node.bounds)
                & occupied_after(slot_a, node.child_count);
            for_each_lane(mask, |slot_b| {
                let b_bounds = node.bounds.get(slot_b);
                self.dispatch_test_for_nodes(
                    node.child(slot_a),
                    &a_bounds,
                    node.child(slot_b),
                    &b_bounds,
                    results,
                );
            });
        }
    }

    pub(crate) fn get_overlaps_in_node<H: OverlapHandler>(&self, node_index: i32, results: &mut H) {
        let node = self.node(node_index);
        for slot in 0..node.child_count as usize {
            let child = node.child(slot);
            if child >= 0 {
                self.get_overlaps_in_node(child, results);
            }
        }
        self.get_overlaps_between_children(node_index, results);
    }

    /// Gets pairs of leaf indices with bounding boxes which overlap within this tree.
    ///
    /// Every overlapping pair is reported exactly once, in no particular order, and a leaf is never paired with itself.
    pub fn get_self_overlaps<H: OverlapHandler>(&self, results: &mut H) {
        // If there are less than two leaves, there can't be any overlap.
        if self.leaf_count() < 2 {
            return;
        }
        self.get_overlaps_in_node(0, results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::collections::HashSet;
    use std::simd::f32x4;

    fn normalized(pairs: &[(i32, i32)]) -> HashSet<(i32, i32)> {
        pairs.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect()
    }

    #[test]
    fn occupied_after_excludes_the_slot_and_below() {
        assert_eq!(occupied_after(0, 4), 0b1110);
        assert_eq!(occupied_after(2, 4), 0b1000);
        assert_eq!(occupied_after(3, 4), 0);
        assert_eq!(occupied_after(1, 16), 0xFFFC);
    }

    #[test]
    fn chain_of_touching_boxes() {
        let mut tree = Tree::<f32x4>::new(16);
        let count = 12;
        for i in 0..count {
            let min = Vec3::new(i as f32, 0.0, 0.0);
            tree.add(&BoundingBox::new(min, min + Vec3::ONE));
        }
        let mut pairs: Vec<(i32, i32)> = Vec::new();
        tree.get_self_overlaps(&mut pairs);
        let found = normalized(&pairs);
        assert_eq!(found.len(), pairs.len(), "duplicate pairs reported");
        let expected: HashSet<_> = (0..count - 1).map(|i| (i, i + 1)).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn fewer_than_two_leaves_produce_nothing() {
        let mut tree = Tree::<f32x4>::new(1);
        let mut pairs: Vec<(i32, i32)> = Vec::new();
        tree.get_self_overlaps(&mut pairs);
        tree.add(&BoundingBox::new(Vec3::ZERO, Vec3::ONE));
        tree.get_self_overlaps(&mut pairs);
        assert!(pairs.is_empty());
    }
}

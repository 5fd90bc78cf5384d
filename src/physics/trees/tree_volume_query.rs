use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::bounding_box_wide::BoundingBoxWide;
use crate::utilities::vector::{for_each_lane, WideF32};

use super::tree::Tree;
use super::tree_sweep::TRAVERSAL_STACK_CAPACITY;

/// Receives the leaves found by a volume query. Returning `false` ends the query early.
pub trait BreakableForEach {
    fn loop_body(&mut self, leaf_index: i32) -> bool;
}

impl BreakableForEach for Vec<i32> {
    #[inline(always)]
    fn loop_body(&mut self, leaf_index: i32) -> bool {
        self.push(leaf_index);
        true
    }
}

impl<V: WideF32> Tree<V> {
    /// Gets all leaf indices whose bounding boxes overlap the given bounding box.
    pub fn get_overlaps<E: BreakableForEach + ?Sized>(
        &self,
        bounding_box: &BoundingBox,
        leaf_enumerator: &mut E,
    ) {
        // If the leaf count is zero, there's nothing to test against.
        if self.leaf_count() == 0 {
            return;
        }
        let query = BoundingBoxWide::<V>::broadcast(bounding_box);
        let mut stack: Vec<i32> = Vec::with_capacity(TRAVERSAL_STACK_CAPACITY);
        stack.push(0);
        while let Some(node_index) = stack.pop() {
            let node = self.node(node_index);
            let mask = BoundingBoxWide::intersects(&query, &node.bounds) & node.occupied_mask();
            let mut keep_going = true;
            for_each_lane(mask, |slot| {
                if !keep_going {
                    return;
                }
                let child = node.child(slot);
                if child >= 0 {
                    stack.push(child);
                } else {
                    keep_going = leaf_enumerator.loop_body(Self::encode(child));
                }
            });
            if !keep_going {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::simd::f32x4;

    struct FirstOnly(Option<i32>);

    impl BreakableForEach for FirstOnly {
        fn loop_body(&mut self, leaf_index: i32) -> bool {
            self.0 = Some(leaf_index);
            false
        }
    }

    #[test]
    fn volume_query_matches_brute_force() {
        let mut tree = Tree::<f32x4>::new(64);
        let boxes: Vec<BoundingBox> = (0..64)
            .map(|i| {
                let min = Vec3::new((i % 8) as f32 * 1.5, (i / 8) as f32 * 1.5, 0.0);
                BoundingBox::new(min, min + Vec3::ONE)
            })
            .collect();
        for b in &boxes {
            tree.add(b);
        }
        let query = BoundingBox::new(Vec3::new(2.0, 2.0, -1.0), Vec3::new(6.0, 4.0, 1.0));
        let mut found: Vec<i32> = Vec::new();
        tree.get_overlaps(&query, &mut found);
        found.sort_unstable();
        let expected: Vec<i32> = (0..64)
            .filter(|&i| BoundingBox::intersects(&boxes[i as usize], &query))
            .collect();
        assert_eq!(found, expected);

        let mut first = FirstOnly(None);
        tree.get_overlaps(&query, &mut first);
        assert!(first.0.is_some_and(|leaf| expected.contains(&leaf)));
    }
}

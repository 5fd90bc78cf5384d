use crate::utilities::bounding_box::{Bounded, BoundingBox};
use crate::utilities::bounding_box_wide::BoundingBoxWide;
use crate::utilities::vector::{for_each_lane, WideF32};

use super::tree::Tree;

impl<V: WideF32> Tree<V> {
    /// Adds a leaf to the tree with the bounding box of `item` and returns the index of the added leaf.
    #[inline]
    pub fn insert<T: Bounded + ?Sized>(&mut self, item: &T) -> i32 {
        self.add(&item.bounding_box())
    }

    /// Adds a leaf to the tree with the given bounding box and returns the index of the added leaf.
    ///
    /// Descends from the root, merging the new bounds into the chosen child at every level so that the path's
    /// boxes stay the tight union of their contents. A node with a free slot takes the leaf directly. A full node
    /// sends it into the child whose volume grows least, preferring the child with fewer leaves on ties.
    /// Landing on a leaf slot splits it into a new two-child node.
    pub fn add(&mut self, bounds: &BoundingBox) -> i32 {
        debug_assert!(
            !bounds.is_empty(),
            "Leaf bounds must satisfy min <= max: {bounds}"
        );
        let mut node_index = 0;
        loop {
            let node = self.node_mut(node_index);
            if (node.child_count as usize) < V::LANES {
                let slot = node.child_count;
                let leaf_index = self.leaf_count();
                let node = self.node_mut(node_index);
                node.bounds.set(slot as usize, bounds);
                node.set_child(slot as usize, Self::encode(leaf_index), 1);
                node.child_count += 1;
                return self.add_leaf(node_index, slot);
            }

            let slot = Self::choose_insertion_slot(&node.bounds, &node.leaf_counts, bounds);
            let existing_bounds = node.bounds.get(slot);
            let child = node.child(slot);
            let child_leaf_count = node.leaf_counts.as_ref()[slot];
            node.bounds
                .set(slot, &BoundingBox::create_merged(&existing_bounds, bounds));
            node.leaf_counts.as_mut()[slot] = child_leaf_count + 1;

            if child >= 0 {
                node_index = child;
                continue;
            }

            // The merge target is a leaf. Replace it with a node holding the old leaf and the new one.
            let existing_leaf = Self::encode(child);
            let new_node_index = self.allocate_node(node_index, slot as i32);
            let new_leaf_index = self.leaf_count();
            let new_node = self.node_mut(new_node_index);
            new_node.bounds.set(0, &existing_bounds);
            new_node.set_child(0, child, 1);
            new_node.bounds.set(1, bounds);
            new_node.set_child(1, Self::encode(new_leaf_index), 1);
            new_node.child_count = 2;
            self.node_mut(node_index).children.as_mut()[slot] = new_node_index;
            self.set_leaf(existing_leaf, new_node_index, 0);
            return self.add_leaf(new_node_index, 1);
        }
    }

    /// Picks the slot of a full node whose bounds grow least when merged with `bounds`.
    fn choose_insertion_slot(
        children: &BoundingBoxWide<V>,
        leaf_counts: &V::Indices,
        bounds: &BoundingBox,
    ) -> usize {
        let merged = BoundingBoxWide::merge(children, &BoundingBoxWide::broadcast(bounds));
        let increase = merged.compute_volume() - children.compute_volume();
        let leaf_counts = leaf_counts.as_ref();
        let mut best_slot = 0;
        let mut best_increase = increase.lane(0);
        for_each_lane(V::full_mask() & !1, |slot| {
            let candidate = increase.lane(slot);
            if candidate < best_increase
                || (candidate == best_increase && leaf_counts[slot] < leaf_counts[best_slot])
            {
                best_slot = slot;
                best_increase = candidate;
            }
        });
        best_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::simd::{f32x4, f32x8};

    struct Sphere {
        center: Vec3,
        radius: f32,
    }

    impl Bounded for Sphere {
        fn bounding_box(&self) -> BoundingBox {
            BoundingBox::from_center(self.center, Vec3::splat(self.radius))
        }
    }

    #[test]
    fn first_leaves_fill_the_root() {
        let mut tree = Tree::<f32x4>::new(8);
        for i in 0..4 {
            let leaf = tree.insert(&Sphere {
                center: Vec3::new(i as f32 * 3.0, 0.0, 0.0),
                radius: 1.0,
            });
            assert_eq!(leaf, i);
        }
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.nodes()[0].child_count, 4);
        tree.validate();
    }

    #[test]
    fn overflowing_a_full_node_splits_the_cheapest_leaf() {
        let mut tree = Tree::<f32x4>::new(8);
        for i in 0..4 {
            let min = Vec3::new(i as f32 * 10.0, 0.0, 0.0);
            tree.add(&BoundingBox::new(min, min + Vec3::ONE));
        }
        // Right next to leaf 2.
        let near_two = BoundingBox::new(Vec3::new(21.0, 0.0, 0.0), Vec3::new(22.0, 1.0, 1.0));
        let leaf = tree.add(&near_two);
        assert_eq!(leaf, 4);
        assert_eq!(tree.node_count(), 2);
        let split = tree.leaf(2);
        assert_eq!(split.node_index(), 1);
        assert_eq!(tree.leaf(4).node_index(), 1);
        assert_eq!(tree.nodes()[0].child(2), 1);
        tree.validate();
    }

    #[test]
    fn many_insertions_keep_the_tree_valid_and_grow_storage() {
        let mut tree = Tree::<f32x8>::new(1);
        for i in 0..500 {
            let t = i as f32;
            let center = Vec3::new((t * 0.37).sin() * 50.0, (t * 0.11).cos() * 50.0, t * 0.1);
            tree.insert(&Sphere {
                center,
                radius: 0.5 + (i % 3) as f32,
            });
        }
        assert_eq!(tree.leaf_count(), 500);
        tree.validate();
        assert!(tree.compute_max_depth() >= 2);
    }
}

use crate::utilities::vector::WideF32;

use super::node::Node;
use super::tree::Tree;

impl<V: WideF32> Tree<V> {
    /// Points whatever a node slot references back at that slot.
    pub(super) fn relink_child(&mut self, node_index: i32, slot: usize) {
        let child = self.node(node_index).child(slot);
        if child >= 0 {
            let metanode = self.metanode_mut(child);
            metanode.parent = node_index;
            metanode.index_in_parent = slot as i32;
        } else {
            self.set_leaf(Self::encode(child), node_index, slot as i32);
        }
    }

    pub(super) fn remove_node_at(&mut self, node_index: i32) {
        // Note that this function is a cache scrambling influence.
        debug_assert!(node_index > 0 && node_index < self.node_count());
        let last = self.node_count() - 1;
        self.nodes.swap_remove(node_index as usize);
        self.metanodes.swap_remove(node_index as usize);
        // If the node wasn't the last node in the list, it was replaced by the last node.
        if node_index < last {
            let moved = self.metanode(node_index);
            self.node_mut(moved.parent).children.as_mut()[moved.index_in_parent as usize] =
                node_index;
            for slot in 0..self.node(node_index).child_count as usize {
                self.relink_child(node_index, slot);
            }
        }
    }

    /// Removes a slot from a node, moving the node's last occupied slot into the hole.
    fn remove_child_slot(&mut self, node_index: i32, slot: usize) {
        let node = self.node_mut(node_index);
        let last = node.child_count as usize - 1;
        if slot < last {
            let bounds = node.bounds.get(last);
            let child = node.child(last);
            let leaf_count = node.leaf_counts.as_ref()[last];
            node.bounds.set(slot, &bounds);
            node.set_child(slot, child, leaf_count);
        }
        node.clear_slot(last);
        node.child_count -= 1;
        if slot < last {
            self.relink_child(node_index, slot);
        }
    }

    fn refit_for_removal(&mut self, node_index: i32) {
        let mut node_index = node_index;
        loop {
            let metanode = self.metanode(node_index);
            if metanode.parent < 0 {
                break;
            }
            let merged = self.node(node_index).bounds.compute_merged();
            let parent = self.node_mut(metanode.parent);
            let slot = metanode.index_in_parent as usize;
            parent.bounds.set(slot, &merged);
            parent.leaf_counts.as_mut()[slot] -= 1;
            node_index = metanode.parent;
        }
    }

    /// Replaces a node's slot in its parent with the node's only remaining child.
    fn collapse_into_parent(&mut self, node_index: i32) {
        let metanode = self.metanode(node_index);
        let node = self.node(node_index);
        debug_assert_eq!(node.child_count, 1);
        let bounds = node.bounds.get(0);
        let child = node.child(0);
        let leaf_count = node.leaf_counts.as_ref()[0];
        let slot = metanode.index_in_parent as usize;
        let parent = self.node_mut(metanode.parent);
        parent.bounds.set(slot, &bounds);
        parent.set_child(slot, child, leaf_count);
        self.relink_child(metanode.parent, slot);
        self.remove_node_at(node_index);
    }

    /// Pulls the root's only child up into the root if that child is an internal node.
    fn pull_up_root_child(&mut self) {
        let root = self.node(0);
        if root.child_count != 1 || root.child(0) < 0 {
            return;
        }
        let pulled = root.child(0);
        let replacement: Node<V> = *self.node(pulled);
        *self.node_mut(0) = replacement;
        for slot in 0..replacement.child_count as usize {
            self.relink_child(0, slot);
        }
        self.remove_node_at(pulled);
    }

    /// Removes a leaf at an index. If the index is not at the end of the leaf list,
    /// the last leaf is swapped into the removed location.
    ///
    /// Returns the former index of the leaf that was moved into the removed leaf's slot, if any.
    pub fn remove_at(&mut self, leaf_index: i32) -> Option<i32> {
        debug_assert!(
            leaf_index >= 0 && leaf_index < self.leaf_count(),
            "Leaf index must be a valid index in the tree's leaf array."
        );

        let leaf = self.leaf(leaf_index);
        let last_leaf_index = self.leaf_count() - 1;
        self.leaves.swap_remove(leaf_index as usize);
        let moved_leaf = if leaf_index < last_leaf_index {
            // The removed leaf was not the last leaf, so the last leaf now lives in its slot.
            let moved = self.leaf(leaf_index);
            self.node_mut(moved.node_index()).children.as_mut()[moved.child_index() as usize] =
                Self::encode(leaf_index);
            Some(last_leaf_index)
        } else {
            None
        };

        let node_index = leaf.node_index();
        self.remove_child_slot(node_index, leaf.child_index() as usize);
        self.refit_for_removal(node_index);

        if node_index > 0 {
            // Non-root nodes keep at least two children.
            if self.node(node_index).child_count == 1 {
                self.collapse_into_parent(node_index);
            }
        } else {
            self.pull_up_root_child();
        }
        moved_leaf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::bounding_box::BoundingBox;
    use glam::Vec3;
    use std::simd::{f32x4, f32x8};

    fn lattice_box(i: i32) -> BoundingBox {
        let min = Vec3::new((i % 7) as f32 * 2.0, (i / 7 % 7) as f32 * 2.0, (i / 49) as f32 * 2.0);
        BoundingBox::new(min, min + Vec3::splat(1.5))
    }

    #[test]
    fn removing_the_last_leaf_moves_nothing() {
        let mut tree = Tree::<f32x4>::new(4);
        tree.add(&lattice_box(0));
        tree.add(&lattice_box(1));
        assert_eq!(tree.remove_at(1), None);
        assert_eq!(tree.remove_at(0), None);
        assert_eq!(tree.leaf_count(), 0);
        assert!(tree.root_bounds().is_empty());
        tree.validate();
    }

    #[test]
    fn removal_swaps_the_last_leaf_in() {
        let mut tree = Tree::<f32x4>::new(16);
        for i in 0..16 {
            tree.add(&lattice_box(i));
        }
        let last_bounds = tree.get_bounds(15);
        assert_eq!(tree.remove_at(3), Some(15));
        assert_eq!(tree.get_bounds(3), last_bounds);
        tree.validate();
    }

    #[test]
    fn draining_a_tree_keeps_it_valid() {
        let mut tree = Tree::<f32x8>::new(8);
        let mut expected: Vec<BoundingBox> = (0..200).map(lattice_box).collect();
        for bounds in &expected {
            tree.add(bounds);
        }
        let mut step = 0;
        while tree.leaf_count() > 0 {
            let victim = (step * 31) % tree.leaf_count();
            if let Some(moved) = tree.remove_at(victim) {
                assert_eq!(moved, expected.len() as i32 - 1);
            }
            expected.swap_remove(victim as usize);
            step += 1;
            if step % 10 == 0 {
                tree.validate();
                for (leaf, bounds) in expected.iter().enumerate() {
                    assert_eq!(tree.get_bounds(leaf as i32), *bounds);
                }
            }
        }
        assert_eq!(tree.node_count(), 1);
        tree.validate();
    }
}

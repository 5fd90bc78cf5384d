use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::vector::WideF32;

use super::tree::Tree;

impl<V: WideF32> Tree<V> {
    /// Refits the bounding box of every parent of the node recursively to the root.
    pub fn refit_for_node_bounds_change(&mut self, node_index: i32) {
        // The root has no parent slot to update.
        let mut node_index = node_index;
        loop {
            let metanode = self.metanode(node_index);
            if metanode.parent < 0 {
                break;
            }
            let merged = self.node(node_index).bounds.compute_merged();
            self.node_mut(metanode.parent)
                .bounds
                .set(metanode.index_in_parent as usize, &merged);
            node_index = metanode.parent;
        }
    }

    fn refit_recursive(&mut self, node_index: i32) -> BoundingBox {
        let child_count = self.node(node_index).child_count as usize;
        for slot in 0..child_count {
            let child = self.node(node_index).child(slot);
            if child >= 0 {
                let merged = self.refit_recursive(child);
                self.node_mut(node_index).bounds.set(slot, &merged);
            }
        }
        self.node(node_index).bounds.compute_merged()
    }

    /// Updates the bounding boxes of all internal nodes in the tree.
    ///
    /// Leaf bounds are taken as they are; use this after writing many leaf bounds without refitting.
    pub fn refit(&mut self) -> BoundingBox {
        // No point in refitting a tree with no internal nodes!
        if self.node_count() == 1 {
            return self.root_bounds();
        }
        self.refit_recursive(0)
    }

    /// Overwrites a leaf's bounds without touching its ancestors. Follow up with [`refit`](Self::refit).
    pub fn set_leaf_bounds_without_refit(&mut self, leaf_index: i32, bounds: &BoundingBox) {
        let leaf = self.leaf(leaf_index);
        self.node_mut(leaf.node_index())
            .bounds
            .set(leaf.child_index() as usize, bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::simd::f32x4;

    #[test]
    fn refit_restores_tightness_after_bulk_updates() {
        let mut tree = Tree::<f32x4>::new(32);
        for i in 0..32 {
            let min = Vec3::new(i as f32, (i % 5) as f32, 0.0);
            tree.add(&BoundingBox::new(min, min + Vec3::ONE));
        }
        for i in 0..32 {
            let min = Vec3::new(-(i as f32), 0.0, (i % 7) as f32);
            tree.set_leaf_bounds_without_refit(i, &BoundingBox::new(min, min + Vec3::splat(0.5)));
        }
        let root = tree.refit();
        assert_eq!(root.min, Vec3::new(-31.0, 0.0, 0.0));
        assert_eq!(root.max, Vec3::new(0.5, 0.5, 6.5));
        tree.validate();
    }
}

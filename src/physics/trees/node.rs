use crate::utilities::bounding_box_wide::BoundingBoxWide;
use crate::utilities::vector::WideF32;

/// Reference value stored in a child slot that holds nothing.
pub const EMPTY_CHILD: i32 = -1;

/// `V::LANES`-wide tree node.
///
/// Child slot `i` is described by lane `i` of `bounds` and by `children[i]`:
/// a nonnegative reference points at another node, [`EMPTY_CHILD`] marks an unused slot
/// and anything below that is an encoded leaf (see [`Tree::encode`](super::tree::Tree::encode)).
/// Occupied slots always form the prefix `0..child_count`; unused lanes hold the empty bounding box.
///
/// Note that the format of this node implies that we don't explicitly test against the root bounding box during normal execution.
/// For almost all broad phase use cases, queries will be inside the root bounding box anyway.
#[derive(Clone, Copy, Debug)]
pub struct Node<V: WideF32> {
    /// Bounds of every child, one per lane.
    pub bounds: BoundingBoxWide<V>,
    /// Encoded reference of every child.
    pub children: V::Indices,
    /// Number of leaves beneath every child.
    pub leaf_counts: V::Indices,
    /// Number of occupied slots.
    pub child_count: i32,
}

impl<V: WideF32> Default for Node<V> {
    fn default() -> Self {
        Self {
            bounds: BoundingBoxWide::empty(),
            children: V::splat_indices(EMPTY_CHILD),
            leaf_counts: V::splat_indices(0),
            child_count: 0,
        }
    }
}

impl<V: WideF32> Node<V> {
    /// Reference held by a child slot.
    #[inline(always)]
    pub fn child(&self, slot: usize) -> i32 {
        self.children.as_ref()[slot]
    }

    /// Bitmask of the occupied slots.
    #[inline(always)]
    pub fn occupied_mask(&self) -> u32 {
        (1u32 << self.child_count) - 1
    }

    #[inline(always)]
    pub(crate) fn set_child(&mut self, slot: usize, reference: i32, leaf_count: i32) {
        self.children.as_mut()[slot] = reference;
        self.leaf_counts.as_mut()[slot] = leaf_count;
    }

    /// Empties a slot. Does not touch `child_count`.
    #[inline(always)]
    pub(crate) fn clear_slot(&mut self, slot: usize) {
        self.bounds.clear(slot);
        self.set_child(slot, EMPTY_CHILD, 0);
    }

    /// Total number of leaves beneath this node.
    pub fn total_leaf_count(&self) -> i32 {
        self.leaf_counts.as_ref()[..self.child_count as usize]
            .iter()
            .sum()
    }
}

/// Metadata associated with a tree node.
///
/// Node metadata isn't required or used during collision testing, so it is stored separately.
/// This keeps the nodes themselves dense during traversals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metanode {
    /// Index of the parent node, or -1 for the root.
    pub parent: i32,
    /// Slot within the parent that points at this node, or -1 for the root.
    pub index_in_parent: i32,
}

impl Metanode {
    pub const ROOT: Self = Self {
        parent: -1,
        index_in_parent: -1,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::simd::{f32x16, f32x4};

    #[test]
    fn default_node_is_empty() {
        let node = Node::<f32x4>::default();
        assert_eq!(node.children, [EMPTY_CHILD; 4]);
        assert_eq!(node.occupied_mask(), 0);
        assert!(node.bounds.compute_merged().is_empty());
        assert_eq!(node.total_leaf_count(), 0);
    }

    #[test]
    fn occupied_mask_covers_prefix() {
        let mut node = Node::<f32x16>::default();
        node.set_child(0, -2, 1);
        node.set_child(1, 3, 7);
        node.child_count = 2;
        assert_eq!(node.occupied_mask(), 0b11);
        assert_eq!(node.total_leaf_count(), 8);
        node.child_count = 16;
        assert_eq!(node.occupied_mask(), 0xFFFF);
    }
}

use tracing::debug;

use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::vector::WideF32;

use super::leaf::Leaf;
use super::node::{Metanode, Node};

/// A `V::LANES`-ary bounding volume hierarchy.
///
/// The struct is defined here and extended with `impl Tree` blocks in sibling modules.
///
/// Nodes live in one contiguous array with the root at index 0. The root always exists, even when the tree is empty.
/// Every non-root node has at least two children. Leaf indices are dense in `[0, leaf_count)`; removing a leaf moves
/// the last leaf into the hole.
///
/// Index and encoding invariants are checked with `debug_assert!` only. Release builds skip the checks and an
/// out-of-range leaf or node index is undefined behavior from the tree's point of view (it will panic on the
/// bounds-checked array access or silently corrupt the hierarchy).
#[derive(Clone, Debug)]
pub struct Tree<V: WideF32> {
    /// Nodes in the tree.
    pub(crate) nodes: Vec<Node<V>>,
    /// Metanodes in the tree, parallel to `nodes`. Metanodes contain metadata that aren't read during most
    /// query operations but are useful for bookkeeping.
    pub(crate) metanodes: Vec<Metanode>,
    /// Location of every leaf in the tree.
    pub(crate) leaves: Vec<Leaf>,
}

impl<V: WideF32> Default for Tree<V> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<V: WideF32> Tree<V> {
    /// Number of lanes, and so the maximum number of children, in every node.
    pub const WIDTH: usize = V::LANES;

    /// Encodes a leaf index into the negative-index form used by the tree, or decodes it back.
    ///
    /// Leaf `i` is stored as `-2 - i`, leaving -1 free for empty slots.
    #[inline(always)]
    pub const fn encode(index: i32) -> i32 {
        -2 - index
    }

    /// Constructs an empty tree with room for `initial_leaf_capacity` leaves before any reallocation.
    pub fn new(initial_leaf_capacity: usize) -> Self {
        let node_capacity = Self::node_capacity_for(initial_leaf_capacity);
        let mut nodes = Vec::with_capacity(node_capacity);
        let mut metanodes = Vec::with_capacity(node_capacity);
        nodes.push(Node::default());
        metanodes.push(Metanode::ROOT);
        Self {
            nodes,
            metanodes,
            leaves: Vec::with_capacity(initial_leaf_capacity),
        }
    }

    /// Upper bound on node count for a given leaf count. Every non-root node has at least two children.
    fn node_capacity_for(leaf_capacity: usize) -> usize {
        leaf_capacity.max(2) - 1
    }

    /// Number of nodes in the tree, including the root.
    #[inline(always)]
    pub fn node_count(&self) -> i32 {
        self.nodes.len() as i32
    }

    /// Number of leaves in the tree.
    #[inline(always)]
    pub fn leaf_count(&self) -> i32 {
        self.leaves.len() as i32
    }

    /// Read-only view of the node array.
    #[inline(always)]
    pub fn nodes(&self) -> &[Node<V>] {
        &self.nodes
    }

    #[inline(always)]
    pub fn leaf(&self, leaf_index: i32) -> Leaf {
        debug_assert!(leaf_index >= 0 && leaf_index < self.leaf_count());
        self.leaves[leaf_index as usize]
    }

    #[inline(always)]
    pub(crate) fn node(&self, node_index: i32) -> &Node<V> {
        debug_assert!(node_index >= 0 && node_index < self.node_count());
        &self.nodes[node_index as usize]
    }

    #[inline(always)]
    pub(crate) fn node_mut(&mut self, node_index: i32) -> &mut Node<V> {
        debug_assert!(node_index >= 0 && node_index < self.node_count());
        &mut self.nodes[node_index as usize]
    }

    #[inline(always)]
    pub(crate) fn metanode(&self, node_index: i32) -> Metanode {
        self.metanodes[node_index as usize]
    }

    #[inline(always)]
    pub(crate) fn metanode_mut(&mut self, node_index: i32) -> &mut Metanode {
        &mut self.metanodes[node_index as usize]
    }

    /// Appends a node with no children and returns its index, growing the node array if it is full.
    pub(crate) fn allocate_node(&mut self, parent: i32, index_in_parent: i32) -> i32 {
        if self.nodes.len() == self.nodes.capacity() {
            let new_capacity = (self.nodes.capacity() * 2).max(Self::node_capacity_for(self.leaves.len() + 1));
            debug!(
                old_capacity = self.nodes.capacity(),
                new_capacity,
                width = V::LANES,
                "growing tree node array"
            );
            self.nodes.reserve_exact(new_capacity - self.nodes.len());
            self.metanodes.reserve_exact(new_capacity - self.metanodes.len());
        }
        let index = self.node_count();
        self.nodes.push(Node::default());
        self.metanodes.push(Metanode {
            parent,
            index_in_parent,
        });
        index
    }

    /// Appends a leaf location and returns the new leaf's index, growing the leaf array if it is full.
    pub(crate) fn add_leaf(&mut self, node_index: i32, child_index: i32) -> i32 {
        if self.leaves.len() == self.leaves.capacity() {
            let new_capacity = (self.leaves.capacity() * 2).max(4);
            debug!(
                old_capacity = self.leaves.capacity(),
                new_capacity,
                "growing tree leaf array"
            );
            self.leaves.reserve_exact(new_capacity - self.leaves.len());
        }
        let index = self.leaf_count();
        self.leaves.push(Leaf::new(node_index, child_index));
        index
    }

    /// Points an existing leaf at a new location.
    #[inline(always)]
    pub(crate) fn set_leaf(&mut self, leaf_index: i32, node_index: i32, child_index: i32) {
        self.leaves[leaf_index as usize] = Leaf::new(node_index, child_index);
    }

    /// Gets the bounding box currently stored for a leaf.
    #[inline(always)]
    pub fn get_bounds(&self, leaf_index: i32) -> BoundingBox {
        let leaf = self.leaf(leaf_index);
        self.node(leaf.node_index())
            .bounds
            .get(leaf.child_index() as usize)
    }

    /// Applies updated bounds to the given leaf index in the tree, refitting the tree to match.
    pub fn update_bounds(&mut self, leaf_index: i32, bounds: &BoundingBox) {
        let leaf = self.leaf(leaf_index);
        self.node_mut(leaf.node_index())
            .bounds
            .set(leaf.child_index() as usize, bounds);
        self.refit_for_node_bounds_change(leaf.node_index());
    }

    /// Bounds of everything in the tree. Empty if the tree has no leaves.
    pub fn root_bounds(&self) -> BoundingBox {
        self.nodes[0].bounds.compute_merged()
    }

    /// Removes every leaf, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.metanodes.truncate(1);
        self.nodes[0] = Node::default();
        self.metanodes[0] = Metanode::ROOT;
        self.leaves.clear();
    }
}

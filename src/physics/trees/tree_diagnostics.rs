use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::vector::WideF32;

use super::node::EMPTY_CHILD;
use super::tree::Tree;

impl<V: WideF32> Tree<V> {
    /// Measures the summed volume of every child box relative to the root volume. Lower is better.
    ///
    /// Volume is used instead of surface area to match the insertion heuristic. Returns 0 for trees whose root
    /// volume is zero.
    pub fn measure_volume_metric(&self) -> f32 {
        let root_volume = self.root_bounds().compute_volume();
        if self.leaf_count() == 0 || root_volume <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0f32;
        for node in &self.nodes {
            let volumes = node.bounds.compute_volume();
            for slot in 0..node.child_count as usize {
                total += volumes.lane(slot);
            }
        }
        total / root_volume
    }

    fn validate_node(
        &self,
        node_index: i32,
        expected_parent_index: i32,
        expected_index_in_parent: i32,
        expected_bounds: &BoundingBox,
    ) -> i32 {
        let node = self.node(node_index);
        let metanode = self.metanode(node_index);

        assert_eq!(
            metanode.parent, expected_parent_index,
            "Bad parent index on node {node_index}"
        );
        assert_eq!(
            metanode.index_in_parent, expected_index_in_parent,
            "Bad index in parent on node {node_index}"
        );
        assert!(
            node.child_count >= 0 && node.child_count as usize <= V::LANES,
            "Node {node_index} has an invalid child count {}.",
            node.child_count
        );
        if node_index > 0 {
            assert!(
                node.child_count >= 2,
                "Non-root node {node_index} has only {} children.",
                node.child_count
            );
        }

        let mut found_leaf_count = 0i32;
        for slot in node.child_count as usize..V::LANES {
            assert_eq!(
                node.child(slot),
                EMPTY_CHILD,
                "Node {node_index} slot {slot} lies past the child count but is not empty."
            );
            assert!(
                node.bounds.get(slot) == BoundingBox::EMPTY,
                "Node {node_index} slot {slot} is unoccupied but has bounds."
            );
        }

        for slot in 0..node.child_count as usize {
            let child = node.child(slot);
            let child_bounds = node.bounds.get(slot);
            let child_leaf_count = node.leaf_counts.as_ref()[slot];
            assert!(
                !child_bounds.is_empty(),
                "Node {node_index} child {slot} has a bad bounding box."
            );
            assert_ne!(child, EMPTY_CHILD, "Node {node_index} child {slot} is empty inside the occupied prefix.");
            if child >= 0 {
                assert!(
                    child < self.node_count(),
                    "Implied existence of node {child} is outside of count {}.",
                    self.node_count(),
                );
                let child_found_leaf_count =
                    self.validate_node(child, node_index, slot as i32, &child_bounds);
                assert_eq!(
                    child_found_leaf_count, child_leaf_count,
                    "Bad leaf count for child {slot} of node {node_index}."
                );
                found_leaf_count += child_found_leaf_count;
            } else {
                found_leaf_count += 1;
                assert_eq!(
                    child_leaf_count, 1,
                    "Bad leaf count on node {node_index} child {slot}, it's a leaf but leaf_count is {child_leaf_count}."
                );
                let leaf_index = Self::encode(child);
                assert!(
                    leaf_index >= 0 && leaf_index < self.leaf_count(),
                    "Bad node-contained leaf index {leaf_index}."
                );
                let leaf = self.leaf(leaf_index);
                assert!(
                    leaf.node_index() == node_index && leaf.child_index() == slot as i32,
                    "Mismatch between node-held leaf pointer and leaf's pointers."
                );
            }
        }

        if expected_parent_index >= 0 {
            let merged = node.bounds.compute_merged();
            assert!(
                merged == *expected_bounds,
                "Node {node_index} bounds {merged}, expected {expected_bounds}."
            );
        }
        found_leaf_count
    }

    fn validate_leaves(&self) {
        for (i, leaf) in self.leaves.iter().enumerate() {
            assert!(
                leaf.node_index() < self.node_count(),
                "Leaf {i} points to a node outside the node set, {} >= {}.",
                leaf.node_index(),
                self.node_count()
            );
            let child = self.node(leaf.node_index()).child(leaf.child_index() as usize);
            assert_eq!(
                Self::encode(child),
                i as i32,
                "Leaf {i} data does not agree with node about parenthood."
            );
        }
    }

    /// Validates the tree structure, panicking on any inconsistency.
    ///
    /// Checks the leaf encoding, parent links, leaf locations, leaf counts and that every stored child box is
    /// exactly the union of what lies beneath it.
    pub fn validate(&self) {
        assert_eq!(
            self.nodes.len(),
            self.metanodes.len(),
            "Node and metanode arrays disagree."
        );
        assert!(self.node_count() >= 1, "The root node must always exist.");
        let root_meta = self.metanode(0);
        assert!(
            root_meta.parent == -1 && root_meta.index_in_parent == -1,
            "Invalid parent pointers on root."
        );
        let found_leaf_count = self.validate_node(0, -1, -1, &BoundingBox::EMPTY);
        assert_eq!(
            found_leaf_count,
            self.leaf_count(),
            "{found_leaf_count} leaves found in tree, expected {}.",
            self.leaf_count()
        );
        self.validate_leaves();
    }

    fn compute_max_depth_recursive(&self, node_index: i32, current_depth: i32) -> i32 {
        let node = self.node(node_index);
        let mut maximum = current_depth;
        for slot in 0..node.child_count as usize {
            let child = node.child(slot);
            if child >= 0 {
                maximum = maximum.max(self.compute_max_depth_recursive(child, current_depth + 1));
            }
        }
        maximum
    }

    /// Computes the maximum depth of the tree's internal nodes. The root alone has depth 0.
    pub fn compute_max_depth(&self) -> i32 {
        self.compute_max_depth_recursive(0, 0)
    }
}

use std::ops::Range;

use glam::Vec3;
use tracing::trace;

use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::vector::WideF32;

use super::node::Node;
use super::tree::Tree;

/// Each refinement pass visits roughly `1 / REFINEMENT_PERIOD` of the internal nodes.
const REFINEMENT_PERIOD: usize = 16;

/// A treelet rebuild must shave at least this fraction off the treelet's cost to be committed.
const MINIMUM_RELATIVE_IMPROVEMENT: f32 = 1e-4;

/// Part of a treelet that is moved around as a unit: a leaf or an internal node the treelet didn't expand.
#[derive(Clone, Copy, Debug)]
struct Subtree {
    reference: i32,
    bounds: BoundingBox,
    leaf_count: i32,
}

impl Subtree {
    #[inline(always)]
    fn centroid(&self) -> Vec3 {
        (self.bounds.min + self.bounds.max) * 0.5
    }
}

#[derive(Clone, Copy, Debug)]
enum PlannedReference {
    Existing(i32),
    Planned(usize),
}

#[derive(Clone, Copy, Debug)]
struct PlannedChild {
    reference: PlannedReference,
    bounds: BoundingBox,
    leaf_count: i32,
}

/// Node layout of a rebuilt treelet, held aside until it is known to be an improvement.
/// Planned node 0 takes the place of the treelet root.
#[derive(Debug, Default)]
struct TreeletPlan {
    nodes: Vec<Vec<PlannedChild>>,
    /// Summed volume of every planned child slot.
    cost: f32,
}

impl<V: WideF32> Tree<V> {
    fn push_children(&self, node_index: i32, subtrees: &mut Vec<Subtree>) {
        let node = self.node(node_index);
        for slot in 0..node.child_count as usize {
            subtrees.push(Subtree {
                reference: node.child(slot),
                bounds: node.bounds.get(slot),
                leaf_count: node.leaf_counts.as_ref()[slot],
            });
        }
    }

    /// Gathers the subtrees beneath `root`, expanding the largest internal nodes first until another expansion
    /// would exceed `maximum_subtrees`. Returns the subtrees and the internal nodes that were opened, root first.
    fn collect_treelet(&self, root: i32, maximum_subtrees: usize) -> (Vec<Subtree>, Vec<i32>) {
        let mut subtrees = Vec::with_capacity(maximum_subtrees);
        let mut internal_nodes = vec![root];
        self.push_children(root, &mut subtrees);
        loop {
            let largest = subtrees
                .iter()
                .enumerate()
                .filter(|(_, subtree)| subtree.reference >= 0)
                .max_by(|(_, a), (_, b)| a.bounds.compute_volume().total_cmp(&b.bounds.compute_volume()))
                .map(|(position, subtree)| (position, *subtree));
            let Some((position, subtree)) = largest else {
                break;
            };
            let child_count = self.node(subtree.reference).child_count as usize;
            if subtrees.len() - 1 + child_count > maximum_subtrees {
                break;
            }
            subtrees.swap_remove(position);
            internal_nodes.push(subtree.reference);
            self.push_children(subtree.reference, &mut subtrees);
        }
        (subtrees, internal_nodes)
    }

    fn treelet_cost(&self, internal_nodes: &[i32]) -> f32 {
        internal_nodes
            .iter()
            .map(|&node_index| {
                let node = self.node(node_index);
                (0..node.child_count as usize)
                    .map(|slot| node.bounds.get(slot).compute_volume())
                    .sum::<f32>()
            })
            .sum()
    }

    /// Splits subtrees into at most `V::LANES` groups by repeatedly halving the most populated group at the median
    /// centroid along its widest axis. Groups are contiguous ranges of the reordered slice.
    fn partition(subtrees: &mut [Subtree]) -> Vec<Range<usize>> {
        let mut groups = vec![0..subtrees.len()];
        while groups.len() < V::LANES {
            let widest = groups
                .iter()
                .enumerate()
                .filter(|(_, group)| group.len() >= 2)
                .max_by_key(|(_, group)| group.len())
                .map(|(position, group)| (position, group.clone()));
            let Some((position, group)) = widest else {
                break;
            };
            let members = &mut subtrees[group.clone()];
            let (mut min, mut max) = (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN));
            for subtree in members.iter() {
                min = min.min(subtree.centroid());
                max = max.max(subtree.centroid());
            }
            let span = max - min;
            let axis = if span.x >= span.y && span.x >= span.z {
                0
            } else if span.y >= span.z {
                1
            } else {
                2
            };
            members.sort_unstable_by(|a, b| a.centroid()[axis].total_cmp(&b.centroid()[axis]));
            let middle = group.start + group.len() / 2;
            groups[position] = group.start..middle;
            groups.insert(position + 1, middle..group.end);
        }
        groups
    }

    fn plan_node(subtrees: &mut [Subtree], plan: &mut TreeletPlan) -> usize {
        let planned_index = plan.nodes.len();
        plan.nodes.push(Vec::new());
        let mut children = Vec::with_capacity(V::LANES);
        for group in Self::partition(subtrees) {
            let members = &mut subtrees[group];
            let child = if members.len() == 1 {
                let single = members[0];
                PlannedChild {
                    reference: PlannedReference::Existing(single.reference),
                    bounds: single.bounds,
                    leaf_count: single.leaf_count,
                }
            } else {
                let bounds = members
                    .iter()
                    .fold(BoundingBox::EMPTY, |merged, subtree| BoundingBox::create_merged(&merged, &subtree.bounds));
                let leaf_count = members.iter().map(|subtree| subtree.leaf_count).sum();
                PlannedChild {
                    reference: PlannedReference::Planned(Self::plan_node(members, plan)),
                    bounds,
                    leaf_count,
                }
            };
            plan.cost += child.bounds.compute_volume();
            children.push(child);
        }
        plan.nodes[planned_index] = children;
        planned_index
    }

    /// Writes a plan over the treelet rooted at `root`, reusing the treelet's other internal nodes and allocating
    /// more if the plan needs them. Leftover nodes are released.
    fn commit_plan(&mut self, root: i32, plan: &TreeletPlan, mut reusable: Vec<i32>) {
        let node_indices: Vec<i32> = (0..plan.nodes.len())
            .map(|planned_index| {
                if planned_index == 0 {
                    root
                } else {
                    reusable.pop().unwrap_or_else(|| self.allocate_node(-1, -1))
                }
            })
            .collect();
        for (planned_index, children) in plan.nodes.iter().enumerate() {
            let node_index = node_indices[planned_index];
            let mut node = Node::<V>::default();
            for (slot, child) in children.iter().enumerate() {
                let reference = match child.reference {
                    PlannedReference::Existing(reference) => reference,
                    PlannedReference::Planned(planned) => node_indices[planned],
                };
                node.bounds.set(slot, &child.bounds);
                node.set_child(slot, reference, child.leaf_count);
            }
            node.child_count = children.len() as i32;
            *self.node_mut(node_index) = node;
            for slot in 0..children.len() {
                self.relink_child(node_index, slot);
            }
        }
        // Highest index first, so the node swapped into each hole is always a linked one.
        reusable.sort_unstable_by(|a, b| b.cmp(a));
        for node_index in reusable {
            self.remove_node_at(node_index);
        }
    }

    /// Rebuilds the treelet rooted at `root` top-down with median splits if that lowers the summed volume of its
    /// child slots. The treelet spans at most `maximum_subtrees` subtrees. Returns whether the tree changed.
    ///
    /// The treelet's bounds are unchanged, so nothing above `root` needs a refit.
    pub fn refine_treelet(&mut self, root: i32, maximum_subtrees: usize) -> bool {
        if self.node(root).child_count < 2 {
            return false;
        }
        let (mut subtrees, internal_nodes) = self.collect_treelet(root, maximum_subtrees.max(V::LANES));
        if internal_nodes.len() == 1 {
            return false;
        }
        let original_cost = self.treelet_cost(&internal_nodes);
        let mut plan = TreeletPlan::default();
        Self::plan_node(&mut subtrees, &mut plan);
        if !(plan.cost < original_cost * (1.0 - MINIMUM_RELATIVE_IMPROVEMENT)) {
            return false;
        }
        self.commit_plan(root, &plan, internal_nodes[1..].to_vec());
        true
    }

    /// Refits every internal node, then refines the root treelet and a window of other treelets chosen by
    /// `frame_index`. Calling this once per frame with an increasing frame index sweeps the whole tree every
    /// `REFINEMENT_PERIOD` frames, undoing the quality lost to incremental insertion and moving leaves.
    ///
    /// Returns the number of treelets that were rebuilt.
    pub fn refit_and_refine(&mut self, frame_index: u64) -> usize {
        self.refit();
        if self.leaf_count() <= 2 {
            return 0;
        }
        let maximum_subtrees = V::LANES * 4;
        let mut rebuilt = usize::from(self.refine_treelet(0, maximum_subtrees));
        let window = self.nodes.len().div_ceil(REFINEMENT_PERIOD);
        let start = (frame_index % REFINEMENT_PERIOD as u64) as usize * window;
        for node_index in start..start + window {
            // Rebuilds move nodes around, so the array can shrink under the window.
            if node_index == 0 || node_index >= self.nodes.len() {
                continue;
            }
            rebuilt += usize::from(self.refine_treelet(node_index as i32, maximum_subtrees));
        }
        trace!(
            frame_index,
            rebuilt,
            node_count = self.nodes.len(),
            "refined tree"
        );
        rebuilt
    }
}

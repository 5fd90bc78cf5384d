use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::bounding_box_wide::BoundingBoxWide;
use crate::utilities::thread_dispatcher::ThreadDispatcher;
use crate::utilities::vector::{for_each_lane, WideF32};

use super::tree::Tree;
use super::tree_self_queries::{occupied_after, OverlapHandler};

/// Independent piece of a self test. Jobs share no pairs, so workers can run them in any order.
#[derive(Clone, Copy, Debug)]
enum Job {
    /// All overlaps within one subtree.
    InNode(i32),
    /// All overlaps between two disjoint subtrees.
    BetweenNodes(i32, i32),
    /// All overlaps between one leaf and a subtree it is not part of.
    LeafAgainstNode {
        leaf_index: i32,
        leaf_bounds: BoundingBox,
        node_index: i32,
    },
}

/// Collects the jobs of a multithreaded self test. Subtrees holding more than `leaf_threshold` leaves are split
/// further; anything smaller becomes a single job.
struct JobCollector<'a, V: WideF32> {
    tree: &'a Tree<V>,
    leaf_threshold: i32,
    jobs: Vec<Job>,
    /// Leaf-leaf pairs found while collecting. These are cheaper to emit than to schedule.
    direct_pairs: Vec<(i32, i32)>,
}

impl<'a, V: WideF32> JobCollector<'a, V> {
    fn dispatch_test_for_nodes(
        &mut self,
        a: i32,
        a_bounds: &BoundingBox,
        a_leaf_count: i32,
        b: i32,
        b_bounds: &BoundingBox,
        b_leaf_count: i32,
    ) {
        if a >= 0 {
            if b >= 0 {
                if a_leaf_count + b_leaf_count <= self.leaf_threshold {
                    self.jobs.push(Job::BetweenNodes(a, b));
                } else {
                    self.collect_jobs_between_different_nodes(a, b);
                }
            } else {
                self.jobs.push(Job::LeafAgainstNode {
                    leaf_index: Tree::<V>::encode(b),
                    leaf_bounds: *b_bounds,
                    node_index: a,
                });
            }
        } else if b >= 0 {
            self.jobs.push(Job::LeafAgainstNode {
                leaf_index: Tree::<V>::encode(a),
                leaf_bounds: *a_bounds,
                node_index: b,
            });
        } else {
            self.direct_pairs
                .handle(Tree::<V>::encode(a), Tree::<V>::encode(b));
        }
    }

    fn collect_jobs_between_different_nodes(&mut self, a_index: i32, b_index: i32) {
        let tree = self.tree;
        let a = tree.node(a_index);
        let b = tree.node(b_index);
        for slot_a in 0..a.child_count as usize {
            let a_bounds = a.bounds.get(slot_a);
            let mask = BoundingBoxWide::intersects(&BoundingBoxWide::broadcast(&a_bounds), &b.bounds)
                & b.occupied_mask();
            for_each_lane(mask, |slot_b| {
                self.dispatch_test_for_nodes(
                    a.child(slot_a),
                    &a_bounds,
                    a.leaf_counts.as_ref()[slot_a],
                    b.child(slot_b),
                    &b.bounds.get(slot_b),
                    b.leaf_counts.as_ref()[slot_b],
                );
            });
        }
    }

    fn collect_jobs_in_node(&mut self, node_index: i32, leaf_count: i32) {
        if leaf_count <= self.leaf_threshold {
            self.jobs.push(Job::InNode(node_index));
            return;
        }
        let tree = self.tree;
        let node = tree.node(node_index);
        for slot in 0..node.child_count as usize {
            let child = node.child(slot);
            if child >= 0 {
                self.collect_jobs_in_node(child, node.leaf_counts.as_ref()[slot]);
            }
        }
        for slot_a in 0..(node.child_count as usize).saturating_sub(1) {
            let a_bounds = node.bounds.get(slot_a);
            let mask = BoundingBoxWide::intersects(&BoundingBoxWide::broadcast(&a_bounds), &node.bounds)
                & occupied_after(slot_a, node.child_count);
            for_each_lane(mask, |slot_b| {
                self.dispatch_test_for_nodes(
                    node.child(slot_a),
                    &a_bounds,
                    node.leaf_counts.as_ref()[slot_a],
                    node.child(slot_b),
                    &node.bounds.get(slot_b),
                    node.leaf_counts.as_ref()[slot_b],
                );
            });
        }
    }
}

impl<V: WideF32> Tree<V> {
    fn execute_job<H: OverlapHandler>(&self, job: Job, results: &mut H) {
        match job {
            Job::InNode(node_index) => self.get_overlaps_in_node(node_index, results),
            Job::BetweenNodes(a, b) => self.get_overlaps_between_different_nodes(a, b, results),
            Job::LeafAgainstNode {
                leaf_index,
                leaf_bounds,
                node_index,
            } => self.test_leaf_against_node(leaf_index, &leaf_bounds, node_index, results),
        }
    }

    /// Gets pairs of leaf indices with bounding boxes which overlap within this tree, splitting the work across
    /// the dispatcher's workers.
    ///
    /// Reports the same pair set as [`get_self_overlaps`](Self::get_self_overlaps). The tree must not be mutated
    /// during the call, which the shared borrow guarantees.
    pub fn get_self_overlaps_multithreaded(&self, dispatcher: &ThreadDispatcher) -> Vec<(i32, i32)> {
        if self.leaf_count() < 2 {
            return Vec::new();
        }
        const JOB_MULTIPLIER: f32 = 8.0;
        let target_job_count = (JOB_MULTIPLIER * dispatcher.thread_count() as f32).max(1.0);
        let mut collector = JobCollector {
            tree: self,
            leaf_threshold: (self.leaf_count() as f32 / target_job_count) as i32,
            jobs: Vec::with_capacity(target_job_count as usize * 2),
            direct_pairs: Vec::new(),
        };
        collector.collect_jobs_in_node(0, self.leaf_count());
        let JobCollector {
            jobs,
            direct_pairs: mut results,
            ..
        } = collector;
        trace!(
            job_count = jobs.len(),
            workers = dispatcher.thread_count(),
            "dispatching self overlap jobs"
        );

        let next_job = AtomicUsize::new(0);
        let worker_results = dispatcher.map_workers(
            |_worker_index| {
                let mut worker_pairs: Vec<(i32, i32)> = Vec::new();
                loop {
                    let job_index = next_job.fetch_add(1, Ordering::Relaxed);
                    let Some(job) = jobs.get(job_index) else {
                        break;
                    };
                    self.execute_job(*job, &mut worker_pairs);
                }
                worker_pairs
            },
            jobs.len(),
        );
        for pairs in worker_results {
            results.extend(pairs);
        }
        results
    }
}

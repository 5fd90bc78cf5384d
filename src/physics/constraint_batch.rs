use tracing::debug;

use crate::errors::{PhysicsError, PhysicsResult};
use crate::physics::bodies::Bodies;
use crate::physics::body_properties::BodyInertia;
use crate::physics::constraints::contact::penetration_limit::ContactConstraint;

/// Bitset of the dynamic bodies referenced by a batch.
#[derive(Debug, Clone, Default)]
struct ReferencedBodies {
    words: Vec<u64>,
}

impl ReferencedBodies {
    #[inline(always)]
    fn contains(&self, index: usize) -> bool {
        self.words
            .get(index >> 6)
            .is_some_and(|word| word & (1u64 << (index & 63)) != 0)
    }

    #[inline(always)]
    fn add(&mut self, index: usize) {
        let word = index >> 6;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index & 63);
    }
}

/// Contains a set of contact constraints that share no dynamic body.
///
/// Kinematic bodies may appear in any number of constraints of the same batch since the solver never writes their
/// velocities. Batches are solved in order; constraints inside one batch can be solved in any order or in parallel.
#[derive(Debug, Clone, Default)]
pub struct ConstraintBatch {
    constraints: Vec<ContactConstraint>,
}

impl ConstraintBatch {
    /// Wraps constraints that the caller's scheduler already made conflict free.
    ///
    /// Nothing is checked here. [`Solver::solve`](crate::physics::solver::Solver::solve) runs
    /// [`validate`](Self::validate) before it splits a batch across workers, so a batch that shares a dynamic body
    /// is rejected rather than raced on.
    pub fn from_constraints(constraints: Vec<ContactConstraint>) -> Self {
        Self { constraints }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    #[inline(always)]
    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    #[inline(always)]
    pub fn constraints_mut(&mut self) -> &mut [ContactConstraint] {
        &mut self.constraints
    }

    /// Checks that every referenced body exists and that no dynamic body is referenced by more than one constraint.
    pub fn validate(&self, inertias: &[BodyInertia]) -> PhysicsResult<()> {
        let mut referenced = ReferencedBodies::default();
        for (index, constraint) in self.constraints.iter().enumerate() {
            for handle in [constraint.body_a(), constraint.body_b()] {
                let inertia = usize::try_from(handle.0)
                    .ok()
                    .and_then(|body| inertias.get(body))
                    .ok_or(PhysicsError::UnknownBody(handle.0))?;
                if inertia.is_kinematic() {
                    continue;
                }
                let body = handle.index();
                if referenced.contains(body) {
                    return Err(PhysicsError::ConflictingBatch {
                        constraint: index,
                        body: handle.0,
                    });
                }
                referenced.add(body);
            }
        }
        Ok(())
    }
}

/// Reference scheduler that groups constraints into conflict-free batches.
pub struct ConstraintBatcher;

impl ConstraintBatcher {
    /// First-fit coloring: every constraint goes into the first batch that doesn't reference either of its dynamic
    /// bodies yet. Constraint order within each batch follows input order.
    pub fn greedy(
        constraints: impl IntoIterator<Item = ContactConstraint>,
        bodies: &Bodies,
    ) -> PhysicsResult<Vec<ConstraintBatch>> {
        let mut batches: Vec<ConstraintBatch> = Vec::new();
        let mut referenced: Vec<ReferencedBodies> = Vec::new();
        let mut constraint_count = 0usize;
        for constraint in constraints {
            let a = bodies.validate_existing_handle(constraint.body_a())?.index();
            let b = bodies.validate_existing_handle(constraint.body_b())?.index();
            let dynamic_a = !bodies.inertias()[a].is_kinematic();
            let dynamic_b = !bodies.inertias()[b].is_kinematic();
            let target = referenced
                .iter()
                .position(|set| !(dynamic_a && set.contains(a)) && !(dynamic_b && set.contains(b)));
            let target = match target {
                Some(target) => target,
                None => {
                    batches.push(ConstraintBatch::default());
                    referenced.push(ReferencedBodies::default());
                    batches.len() - 1
                }
            };
            if dynamic_a {
                referenced[target].add(a);
            }
            if dynamic_b {
                referenced[target].add(b);
            }
            batches[target].constraints.push(constraint);
            constraint_count += 1;
        }
        debug!(
            constraint_count,
            batch_count = batches.len(),
            "batched contact constraints"
        );
        Ok(batches)
    }
}

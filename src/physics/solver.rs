use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::errors::{PhysicsError, PhysicsResult};
use crate::physics::bodies::Bodies;
use crate::physics::body_properties::{BodyInertia, BodyVelocity};
use crate::physics::constraint_batch::ConstraintBatch;
use crate::physics::constraints::contact::penetration_limit::ContactConstraint;
use crate::physics::constraints::contact::penetration_limit_wide::ContactConstraintBundle;
use crate::physics::solve_description::SolveDescription;
use crate::utilities::thread_dispatcher::ThreadDispatcher;
use crate::utilities::vector::WideF32;

/// Velocity array shared between the workers solving one batch.
///
/// No locking is involved. Soundness rests on the batching invariant: within a batch, every dynamic body is referenced
/// by at most one constraint, and kinematic bodies are only ever read.
#[derive(Clone, Copy)]
struct SharedVelocities<'a> {
    pointer: *mut BodyVelocity,
    count: usize,
    _marker: PhantomData<&'a mut [BodyVelocity]>,
}

unsafe impl Send for SharedVelocities<'_> {}
unsafe impl Sync for SharedVelocities<'_> {}

impl<'a> SharedVelocities<'a> {
    fn new(velocities: &'a mut [BodyVelocity]) -> Self {
        Self {
            pointer: velocities.as_mut_ptr(),
            count: velocities.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// No other worker may be writing `index` concurrently.
    #[inline(always)]
    unsafe fn read(self, index: usize) -> BodyVelocity {
        debug_assert!(index < self.count);
        *self.pointer.add(index)
    }

    /// # Safety
    /// No other worker may be reading or writing `index` concurrently.
    #[inline(always)]
    unsafe fn write(self, index: usize, velocity: BodyVelocity) {
        debug_assert!(index < self.count);
        *self.pointer.add(index) = velocity;
    }
}

/// Solves contact constraints with warm-started projected Gauss-Seidel iterations.
///
/// Batches are visited in order, so a later batch sees the velocities an earlier batch produced. Constraints inside a
/// batch are independent and may be spread across workers.
#[derive(Debug, Clone)]
pub struct Solver {
    description: SolveDescription,
    dispatcher: ThreadDispatcher,
}

impl Solver {
    pub fn new(description: SolveDescription) -> PhysicsResult<Self> {
        description.validate()?;
        let dispatcher = ThreadDispatcher::new(description.thread_count);
        Ok(Self {
            description,
            dispatcher,
        })
    }

    #[inline(always)]
    pub fn description(&self) -> &SolveDescription {
        &self.description
    }

    /// Checks the step's inputs before any velocity is touched.
    fn validate_inputs(
        &self,
        bodies: &Bodies,
        batches: &[ConstraintBatch],
        dt: f32,
    ) -> PhysicsResult<f32> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PhysicsError::invalid_setting(
                "dt",
                format!("time step must be positive and finite, got {}", dt),
            ));
        }
        for batch in batches {
            for constraint in batch.constraints() {
                bodies.validate_existing_handle(constraint.body_a())?;
                bodies.validate_existing_handle(constraint.body_b())?;
            }
            // Workers write through a shared velocity view, so a conflicting batch must never reach them.
            if cfg!(debug_assertions) || self.dispatcher.thread_count() > 1 {
                batch.validate(bodies.inertias())?;
            }
        }
        Ok(1.0 / dt)
    }

    /// Runs `body` over every item, splitting the items across workers when there are enough of them.
    fn for_each_parallel<T: Send>(
        &self,
        items: &mut [T],
        minimum_per_worker: usize,
        body: impl Fn(&mut T) + Sync,
    ) {
        let worker_count = (items.len() / minimum_per_worker.max(1)).clamp(1, self.dispatcher.thread_count());
        if worker_count == 1 {
            items.iter_mut().for_each(body);
            return;
        }
        let chunk_size = items.len().div_ceil(worker_count);
        self.dispatcher
            .for_each_chunk(items, chunk_size, |chunk| chunk.iter_mut().for_each(&body));
    }

    /// Runs prestep, warm start and `iteration_count` solve iterations over the batches, writing the resulting
    /// velocities of dynamic bodies back into `bodies`.
    ///
    /// Accumulated impulses are left in the constraints so the caller can carry them into the next step. With warm
    /// starting disabled they are reset to zero first.
    pub fn solve(&self, bodies: &mut Bodies, batches: &mut [ConstraintBatch], dt: f32) -> PhysicsResult<()> {
        let inverse_dt = self.validate_inputs(bodies, batches, dt)?;
        let constraint_count: usize = batches.iter().map(ConstraintBatch::len).sum();
        debug!(
            batch_count = batches.len(),
            constraint_count,
            iteration_count = self.description.iteration_count,
            thread_count = self.dispatcher.thread_count(),
            "solving contact constraints"
        );
        let description = &self.description;
        let minimum_per_worker = description.minimum_constraints_per_worker;
        let (inertias, velocities) = bodies.solver_views();
        let velocities = SharedVelocities::new(velocities);

        for batch in batches.iter_mut() {
            self.for_each_parallel(batch.constraints_mut(), minimum_per_worker, |constraint| {
                if !description.warm_start {
                    constraint.accumulated_impulse = 0.0;
                }
                Self::prestep(constraint, inertias, description, inverse_dt);
            });
        }
        if description.warm_start {
            for batch in batches.iter_mut() {
                self.for_each_parallel(batch.constraints_mut(), minimum_per_worker, |constraint| {
                    // SAFETY: the batch references each dynamic body at most once.
                    unsafe { Self::warm_start(constraint, velocities) }
                });
            }
        }
        for _ in 0..description.iteration_count {
            for batch in batches.iter_mut() {
                self.for_each_parallel(batch.constraints_mut(), minimum_per_worker, |constraint| {
                    // SAFETY: the batch references each dynamic body at most once.
                    unsafe { Self::solve_iteration(constraint, velocities) }
                });
            }
        }
        trace!(
            total_impulse = batches
                .iter()
                .flat_map(|batch| batch.constraints())
                .map(|constraint| constraint.accumulated_impulse)
                .sum::<f32>(),
            "contact solve finished"
        );
        Ok(())
    }

    #[inline(always)]
    fn prestep(
        constraint: &mut ContactConstraint,
        inertias: &[BodyInertia],
        description: &SolveDescription,
        inverse_dt: f32,
    ) {
        let inertia_a = &inertias[constraint.body_a().index()];
        let inertia_b = &inertias[constraint.body_b().index()];
        constraint.prestep(inertia_a, inertia_b, description, inverse_dt);
    }

    #[inline(always)]
    unsafe fn write_back(
        constraint: &ContactConstraint,
        velocities: SharedVelocities,
        velocity_a: BodyVelocity,
        velocity_b: BodyVelocity,
    ) {
        if constraint.is_dynamic_a() {
            velocities.write(constraint.body_a().index(), velocity_a);
        }
        if constraint.is_dynamic_b() {
            velocities.write(constraint.body_b().index(), velocity_b);
        }
    }

    #[inline(always)]
    unsafe fn warm_start(constraint: &mut ContactConstraint, velocities: SharedVelocities) {
        let mut velocity_a = velocities.read(constraint.body_a().index());
        let mut velocity_b = velocities.read(constraint.body_b().index());
        constraint.warm_start(&mut velocity_a, &mut velocity_b);
        Self::write_back(constraint, velocities, velocity_a, velocity_b);
    }

    #[inline(always)]
    unsafe fn solve_iteration(constraint: &mut ContactConstraint, velocities: SharedVelocities) {
        let mut velocity_a = velocities.read(constraint.body_a().index());
        let mut velocity_b = velocities.read(constraint.body_b().index());
        constraint.solve_iteration(&mut velocity_a, &mut velocity_b);
        Self::write_back(constraint, velocities, velocity_a, velocity_b);
    }

    /// Same as [`solve`](Self::solve), but packs each batch into bundles of `V::LANES` constraints and solves the
    /// lanes together.
    ///
    /// Only the accumulated impulses are written back into the constraints; their scalar prestep data is left as is.
    pub fn solve_wide<V: WideF32>(
        &self,
        bodies: &mut Bodies,
        batches: &mut [ConstraintBatch],
        dt: f32,
    ) -> PhysicsResult<()> {
        let inverse_dt = self.validate_inputs(bodies, batches, dt)?;
        let description = &self.description;
        let minimum_per_worker = description.minimum_constraints_per_worker.div_ceil(V::LANES);
        let (inertias, velocities) = bodies.solver_views();
        let velocities = SharedVelocities::new(velocities);

        let mut bundled: Vec<Vec<ContactConstraintBundle<V>>> = batches
            .iter_mut()
            .map(|batch| {
                if !description.warm_start {
                    for constraint in batch.constraints_mut() {
                        constraint.accumulated_impulse = 0.0;
                    }
                }
                batch
                    .constraints()
                    .chunks(V::LANES)
                    .map(ContactConstraintBundle::gather)
                    .collect()
            })
            .collect();
        debug!(
            batch_count = bundled.len(),
            bundle_count = bundled.iter().map(Vec::len).sum::<usize>(),
            lanes = V::LANES,
            iteration_count = description.iteration_count,
            "solving contact bundles"
        );

        for bundles in bundled.iter_mut() {
            self.for_each_parallel(bundles, minimum_per_worker, |bundle| {
                bundle.prestep(inertias, description, inverse_dt);
            });
        }
        if description.warm_start {
            for bundles in bundled.iter_mut() {
                self.for_each_parallel(bundles, minimum_per_worker, |bundle| {
                    // SAFETY: the batch references each dynamic body at most once.
                    let (mut velocity_a, mut velocity_b) =
                        bundle.gather_velocities(|index| unsafe { velocities.read(index) });
                    bundle.warm_start(&mut velocity_a, &mut velocity_b);
                    bundle.scatter_velocities(&velocity_a, &velocity_b, |index, velocity| unsafe {
                        velocities.write(index, velocity)
                    });
                });
            }
        }
        for _ in 0..description.iteration_count {
            for bundles in bundled.iter_mut() {
                self.for_each_parallel(bundles, minimum_per_worker, |bundle| {
                    // SAFETY: the batch references each dynamic body at most once.
                    let (mut velocity_a, mut velocity_b) =
                        bundle.gather_velocities(|index| unsafe { velocities.read(index) });
                    bundle.solve_iteration(&mut velocity_a, &mut velocity_b);
                    bundle.scatter_velocities(&velocity_a, &velocity_b, |index, velocity| unsafe {
                        velocities.write(index, velocity)
                    });
                });
            }
        }

        for (batch, bundles) in batches.iter_mut().zip(&bundled) {
            for (constraints, bundle) in batch.constraints_mut().chunks_mut(V::LANES).zip(bundles) {
                bundle.scatter_accumulated_impulses(constraints);
            }
        }
        Ok(())
    }
}

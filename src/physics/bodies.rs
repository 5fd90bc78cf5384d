use glam::Vec3;
use tracing::trace;

use crate::errors::{PhysicsError, PhysicsResult};
use crate::physics::body_description::BodyDescription;
use crate::physics::body_properties::{BodyInertia, BodyVelocity, RigidPose};
use crate::physics::handles::BodyHandle;
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Collection of allocated bodies, stored as parallel arrays.
///
/// Handles are indices into the arrays and stay valid for the lifetime of the store; bodies are never removed.
/// The solver writes velocities in place and an external integrator owns the poses.
#[derive(Debug, Default, Clone)]
pub struct Bodies {
    poses: Vec<RigidPose>,
    velocities: Vec<BodyVelocity>,
    inertias: Vec<BodyInertia>,
}

impl Bodies {
    /// Creates an empty store with room for `initial_capacity` bodies.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            poses: Vec::with_capacity(initial_capacity),
            velocities: Vec::with_capacity(initial_capacity),
            inertias: Vec::with_capacity(initial_capacity),
        }
    }

    /// Adds a new body and returns its handle.
    pub fn add(&mut self, description: &BodyDescription) -> BodyHandle {
        let handle = BodyHandle(self.count() as i32);
        self.poses.push(description.pose);
        self.velocities.push(description.velocity);
        self.inertias.push(description.inertia);
        handle
    }

    /// Number of bodies in the store.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.poses.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Checks whether a handle refers to a body in this store.
    #[inline(always)]
    pub fn body_exists(&self, handle: BodyHandle) -> bool {
        handle.0 >= 0 && (handle.0 as usize) < self.count()
    }

    /// Returns the handle unchanged if it refers to a body, or an error naming it.
    pub fn validate_existing_handle(&self, handle: BodyHandle) -> PhysicsResult<BodyHandle> {
        if self.body_exists(handle) {
            Ok(handle)
        } else {
            Err(PhysicsError::UnknownBody(handle.0))
        }
    }

    /// Gets a copy of a body's current state.
    pub fn get_description(&self, handle: BodyHandle) -> PhysicsResult<BodyDescription> {
        let index = self.validate_existing_handle(handle)?.index();
        Ok(BodyDescription {
            pose: self.poses[index],
            velocity: self.velocities[index],
            inertia: self.inertias[index],
        })
    }

    /// Overwrites a body's state.
    pub fn apply_description(
        &mut self,
        handle: BodyHandle,
        description: &BodyDescription,
    ) -> PhysicsResult<()> {
        let index = self.validate_existing_handle(handle)?.index();
        self.poses[index] = description.pose;
        self.velocities[index] = description.velocity;
        self.inertias[index] = description.inertia;
        Ok(())
    }

    #[inline(always)]
    pub fn pose(&self, handle: BodyHandle) -> &RigidPose {
        &self.poses[handle.index()]
    }

    #[inline(always)]
    pub fn pose_mut(&mut self, handle: BodyHandle) -> &mut RigidPose {
        &mut self.poses[handle.index()]
    }

    #[inline(always)]
    pub fn velocity(&self, handle: BodyHandle) -> &BodyVelocity {
        &self.velocities[handle.index()]
    }

    #[inline(always)]
    pub fn velocity_mut(&mut self, handle: BodyHandle) -> &mut BodyVelocity {
        &mut self.velocities[handle.index()]
    }

    #[inline(always)]
    pub fn inertia(&self, handle: BodyHandle) -> &BodyInertia {
        &self.inertias[handle.index()]
    }

    /// Sets a body's inertia.
    pub fn set_inertia(&mut self, handle: BodyHandle, inertia: BodyInertia) -> PhysicsResult<()> {
        let index = self.validate_existing_handle(handle)?.index();
        self.inertias[index] = inertia;
        Ok(())
    }

    /// Every body's velocity. The solver mutates these in place.
    #[inline(always)]
    pub fn velocities(&self) -> &[BodyVelocity] {
        &self.velocities
    }

    #[inline(always)]
    pub fn velocities_mut(&mut self) -> &mut [BodyVelocity] {
        &mut self.velocities
    }

    #[inline(always)]
    pub fn inertias(&self) -> &[BodyInertia] {
        &self.inertias
    }

    #[inline(always)]
    pub fn poses(&self) -> &[RigidPose] {
        &self.poses
    }

    /// Splits the store into the read-only inertias and the mutable velocities used by the solver.
    #[inline(always)]
    pub(crate) fn solver_views(&mut self) -> (&[BodyInertia], &mut [BodyVelocity]) {
        (&self.inertias, &mut self.velocities)
    }

    /// Applies an impulse at an offset from a body's center of mass.
    pub fn apply_impulse(
        &mut self,
        handle: BodyHandle,
        impulse: Vec3,
        impulse_offset: Vec3,
    ) -> PhysicsResult<()> {
        let index = self.validate_existing_handle(handle)?.index();
        let inertia = &self.inertias[index];
        let velocity = &mut self.velocities[index];
        velocity.linear += impulse * inertia.inverse_mass;
        velocity.angular += Symmetric3x3::transform(
            impulse_offset.cross(impulse),
            &inertia.inverse_inertia_tensor,
        );
        Ok(())
    }

    /// Applies an impulse through a body's center of mass.
    pub fn apply_linear_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> PhysicsResult<()> {
        let index = self.validate_existing_handle(handle)?.index();
        let inverse_mass = self.inertias[index].inverse_mass;
        self.velocities[index].linear += impulse * inverse_mass;
        Ok(())
    }

    /// Adds `gravity * dt` to the linear velocity of every body with finite mass.
    ///
    /// This is the velocity half of integration only; poses are left to the caller's integrator.
    pub fn integrate_velocities(&mut self, gravity: Vec3, dt: f32) {
        let gravity_dt = gravity * dt;
        let mut integrated = 0usize;
        for (velocity, inertia) in self.velocities.iter_mut().zip(&self.inertias) {
            if inertia.inverse_mass > 0.0 {
                velocity.linear += gravity_dt;
                integrated += 1;
            }
        }
        trace!(integrated, dt, "integrated body velocities");
    }

    /// Removes every body.
    pub fn clear(&mut self) {
        self.poses.clear();
        self.velocities.clear();
        self.inertias.clear();
    }
}

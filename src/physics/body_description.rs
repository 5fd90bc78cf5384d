use glam::Vec3;

use crate::physics::body_properties::{BodyInertia, BodyVelocity, RigidPose};

/// Describes a body's state.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyDescription {
    /// Position and orientation of the body.
    pub pose: RigidPose,
    /// Linear and angular velocity of the body.
    pub velocity: BodyVelocity,
    /// Inverse mass and inverse inertia tensor of the body.
    pub inertia: BodyInertia,
}

impl BodyDescription {
    /// Creates a dynamic body description.
    #[inline(always)]
    pub fn create_dynamic(pose: RigidPose, velocity: BodyVelocity, inertia: BodyInertia) -> Self {
        Self {
            pose,
            velocity,
            inertia,
        }
    }

    /// Creates a dynamic body description with zero initial velocity.
    #[inline(always)]
    pub fn create_dynamic_at_rest(position: Vec3, inertia: BodyInertia) -> Self {
        Self::create_dynamic(RigidPose::from_position(position), BodyVelocity::default(), inertia)
    }

    /// Creates a kinematic body description. Kinematic bodies have infinite mass and inertia; impulses never
    /// change their velocity.
    #[inline(always)]
    pub fn create_kinematic(pose: RigidPose, velocity: BodyVelocity) -> Self {
        Self::create_dynamic(pose, velocity, BodyInertia::KINEMATIC)
    }

    /// Creates a motionless kinematic body, the usual stand-in for static geometry.
    #[inline(always)]
    pub fn create_static(position: Vec3) -> Self {
        Self::create_kinematic(RigidPose::from_position(position), BodyVelocity::default())
    }
}

use glam::{Quat, Vec3};
use std::fmt;

use crate::utilities::symmetric3x3::Symmetric3x3;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::WideF32;
use crate::utilities::vector3_wide::Vector3Wide;

/// Represents a rigid transformation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    /// Orientation of the pose.
    pub orientation: Quat,
    /// Position of the pose.
    pub position: Vec3,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Linear and angular velocity for a body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyVelocity {
    /// Linear velocity associated with the body.
    pub linear: Vec3,
    /// Angular velocity associated with the body.
    pub angular: Vec3,
}

impl BodyVelocity {
    /// Creates a new set of body velocities. Angular velocity is set to zero.
    #[inline(always)]
    pub fn from_linear(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }

    /// Creates a new set of body velocities.
    #[inline(always)]
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

impl From<Vec3> for BodyVelocity {
    fn from(linear: Vec3) -> Self {
        Self::from_linear(linear)
    }
}

impl fmt::Display for BodyVelocity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.linear, self.angular)
    }
}

/// Stores the inertia for a body.
///
/// This representation stores the inverse mass and inverse inertia tensor.
/// Most of the high frequency use cases in the engine naturally use the inverse.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyInertia {
    /// Inverse of the body's world space inertia tensor. Zero for bodies that cannot rotate.
    pub inverse_inertia_tensor: Symmetric3x3,
    /// Inverse of the body's mass. Zero for static or kinematic bodies.
    pub inverse_mass: f32,
}

impl BodyInertia {
    /// Inertia of a body that no impulse can move.
    pub const KINEMATIC: Self = Self {
        inverse_inertia_tensor: Symmetric3x3::ZERO,
        inverse_mass: 0.0,
    };

    /// Inertia of a solid sphere.
    pub fn sphere(mass: f32, radius: f32) -> Self {
        debug_assert!(mass > 0.0 && radius > 0.0);
        let inverse_moment = 1.0 / (0.4 * mass * radius * radius);
        Self {
            inverse_inertia_tensor: Symmetric3x3::from_diagonal(Vec3::splat(inverse_moment)),
            inverse_mass: 1.0 / mass,
        }
    }

    /// Inertia of a solid box with the given half extents.
    pub fn cuboid(mass: f32, half_extents: Vec3) -> Self {
        debug_assert!(mass > 0.0 && half_extents.cmpgt(Vec3::ZERO).all());
        let squared = half_extents * half_extents;
        let moments = Vec3::new(
            squared.y + squared.z,
            squared.x + squared.z,
            squared.x + squared.y,
        ) * (mass / 3.0);
        Self {
            inverse_inertia_tensor: Symmetric3x3::from_diagonal(moments.recip()),
            inverse_mass: 1.0 / mass,
        }
    }

    /// Inertia of a body with mass but locked rotation.
    pub fn point_mass(mass: f32) -> Self {
        debug_assert!(mass > 0.0);
        Self {
            inverse_inertia_tensor: Symmetric3x3::ZERO,
            inverse_mass: 1.0 / mass,
        }
    }

    /// Whether no impulse can change this body's velocity.
    #[inline(always)]
    pub fn is_kinematic(&self) -> bool {
        self.inverse_mass == 0.0 && self.inverse_inertia_tensor == Symmetric3x3::ZERO
    }
}

impl fmt::Display for BodyInertia {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {:?}", self.inverse_mass, self.inverse_inertia_tensor)
    }
}

// --- Wide types ---

/// Velocities of one body per lane.
#[derive(Clone, Copy, Debug, Default)]
pub struct BodyVelocityWide<V: WideF32> {
    pub linear: Vector3Wide<V>,
    pub angular: Vector3Wide<V>,
}

impl<V: WideF32> BodyVelocityWide<V> {
    #[inline(always)]
    pub fn write_slot(&mut self, slot: usize, velocity: &BodyVelocity) {
        self.linear.write_slot(slot, velocity.linear);
        self.angular.write_slot(slot, velocity.angular);
    }

    #[inline(always)]
    pub fn read_slot(&self, slot: usize) -> BodyVelocity {
        BodyVelocity::new(self.linear.read_slot(slot), self.angular.read_slot(slot))
    }
}

/// Inertias of one body per lane.
#[derive(Clone, Copy, Debug, Default)]
pub struct BodyInertiaWide<V: WideF32> {
    pub inverse_inertia_tensor: Symmetric3x3Wide<V>,
    pub inverse_mass: V,
}

impl<V: WideF32> BodyInertiaWide<V> {
    #[inline(always)]
    pub fn write_slot(&mut self, slot: usize, inertia: &BodyInertia) {
        self.inverse_inertia_tensor
            .write_slot(slot, &inertia.inverse_inertia_tensor);
        self.inverse_mass.set_lane(slot, inertia.inverse_mass);
    }
}

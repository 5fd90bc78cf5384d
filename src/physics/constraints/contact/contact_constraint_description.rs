use glam::Vec3;

use crate::physics::handles::BodyHandle;

/// One contact between two bodies as reported by the narrow phase.
///
/// The normal points from B to A. Offsets run from each body's center of mass to the contact point. Positive depth
/// means the bodies overlap; negative depth marks a speculative contact that has not been reached yet.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactData {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub normal: Vec3,
    pub offset_a: Vec3,
    pub offset_b: Vec3,
    pub penetration_depth: f32,
}

impl ContactData {
    /// Creates contact data. The normal must already be unit length.
    #[inline(always)]
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        normal: Vec3,
        offset_a: Vec3,
        offset_b: Vec3,
        penetration_depth: f32,
    ) -> Self {
        debug_assert!(
            (normal.length_squared() - 1.0).abs() < 1e-3,
            "Contact normals must be unit length."
        );
        Self {
            body_a,
            body_b,
            normal,
            offset_a,
            offset_b,
            penetration_depth,
        }
    }

    /// Builds the contact between two spheres from their centers and radii, with the contact point midway through
    /// the overlap. Returns `None` if the centers coincide.
    pub fn between_spheres(
        body_a: BodyHandle,
        position_a: Vec3,
        radius_a: f32,
        body_b: BodyHandle,
        position_b: Vec3,
        radius_b: f32,
    ) -> Option<Self> {
        let offset = position_a - position_b;
        let distance = offset.length();
        if distance <= 1e-7 {
            return None;
        }
        let normal = offset / distance;
        let depth = radius_a + radius_b - distance;
        let contact = position_b + normal * (radius_b - depth * 0.5);
        Some(Self::new(
            body_a,
            body_b,
            normal,
            contact - position_a,
            contact - position_b,
            depth,
        ))
    }
}

use glam::Vec3;

use crate::physics::body_properties::{BodyInertia, BodyVelocity};
use crate::physics::constraints::contact::contact_constraint_description::ContactData;
use crate::physics::constraints::inequality_helpers::InequalityHelpers;
use crate::physics::handles::BodyHandle;
use crate::physics::solve_description::SolveDescription;
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Unilateral non-penetration constraint for a single contact.
///
/// The velocity constraint is `dot(N, vA) + dot(rA x N, wA) - dot(N, vB) + dot(N x rB, wB) >= 0` with `N` pointing
/// from B to A. The accumulated impulse is clamped at zero, so bodies can be pushed apart but never pulled together.
///
/// Lifecycle within a step: [`prestep`](Self::prestep) once, [`warm_start`](Self::warm_start) once, then any number of
/// [`solve_iteration`](Self::solve_iteration)s. Only the accumulated impulse is meant to be carried into the next step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactConstraint {
    pub contact: ContactData,
    /// Total impulse applied along the normal so far. Never negative.
    pub accumulated_impulse: f32,
    pub(crate) angular_a: Vec3,
    pub(crate) angular_b: Vec3,
    pub(crate) inverse_mass_a: f32,
    pub(crate) inverse_mass_b: f32,
    pub(crate) angular_impulse_to_velocity_a: Vec3,
    pub(crate) angular_impulse_to_velocity_b: Vec3,
    pub(crate) bias_velocity: f32,
    pub(crate) softness: f32,
    pub(crate) effective_mass: f32,
    pub(crate) dynamic_a: bool,
    pub(crate) dynamic_b: bool,
}

impl ContactConstraint {
    /// Creates a constraint with no accumulated impulse.
    pub fn new(contact: ContactData) -> Self {
        Self::with_accumulated_impulse(contact, 0.0)
    }

    /// Creates a constraint that resumes from an impulse found for the same contact in a previous step.
    pub fn with_accumulated_impulse(contact: ContactData, accumulated_impulse: f32) -> Self {
        debug_assert!(
            contact.body_a != contact.body_b,
            "A contact constraint can't connect a body to itself."
        );
        Self {
            contact,
            accumulated_impulse: accumulated_impulse.max(0.0),
            angular_a: contact.offset_a.cross(contact.normal),
            angular_b: contact.normal.cross(contact.offset_b),
            inverse_mass_a: 0.0,
            inverse_mass_b: 0.0,
            angular_impulse_to_velocity_a: Vec3::ZERO,
            angular_impulse_to_velocity_b: Vec3::ZERO,
            bias_velocity: 0.0,
            softness: 0.0,
            effective_mass: 0.0,
            dynamic_a: false,
            dynamic_b: false,
        }
    }

    #[inline(always)]
    pub fn body_a(&self) -> BodyHandle {
        self.contact.body_a
    }

    #[inline(always)]
    pub fn body_b(&self) -> BodyHandle {
        self.contact.body_b
    }

    /// Whether the solver may write body A's velocity. Valid after the prestep.
    #[inline(always)]
    pub fn is_dynamic_a(&self) -> bool {
        self.dynamic_a
    }

    /// Whether the solver may write body B's velocity. Valid after the prestep.
    #[inline(always)]
    pub fn is_dynamic_b(&self) -> bool {
        self.dynamic_b
    }

    #[inline(always)]
    pub fn effective_mass(&self) -> f32 {
        self.effective_mass
    }

    #[inline(always)]
    pub fn bias_velocity(&self) -> f32 {
        self.bias_velocity
    }

    /// Computes the bias, softness and effective mass for this step and caches the inverse-mass-scaled Jacobians.
    pub fn prestep(
        &mut self,
        inertia_a: &BodyInertia,
        inertia_b: &BodyInertia,
        description: &SolveDescription,
        inverse_dt: f32,
    ) {
        self.inverse_mass_a = inertia_a.inverse_mass;
        self.inverse_mass_b = inertia_b.inverse_mass;
        self.angular_impulse_to_velocity_a =
            Symmetric3x3::transform(self.angular_a, &inertia_a.inverse_inertia_tensor);
        self.angular_impulse_to_velocity_b =
            Symmetric3x3::transform(self.angular_b, &inertia_b.inverse_inertia_tensor);
        self.dynamic_a = !inertia_a.is_kinematic();
        self.dynamic_b = !inertia_b.is_kinematic();

        let inverse_effective_mass = (self.inverse_mass_a
            + self.inverse_mass_b
            + Symmetric3x3::vector_sandwich(self.angular_a, &inertia_a.inverse_inertia_tensor)
            + Symmetric3x3::vector_sandwich(self.angular_b, &inertia_b.inverse_inertia_tensor))
        .max(InequalityHelpers::MINIMUM_INVERSE_EFFECTIVE_MASS);
        self.softness = description.softness_factor * inverse_effective_mass * inverse_dt;
        self.effective_mass = 1.0 / (inverse_effective_mass + self.softness);
        self.bias_velocity = InequalityHelpers::compute_bias_velocity(
            self.contact.penetration_depth,
            inverse_dt,
            description.correction_fraction,
            description.maximum_recovery_velocity,
        );
    }

    /// Velocity of A relative to B along the constraint's Jacobians. Positive values separate the bodies.
    #[inline(always)]
    pub fn constraint_velocity(&self, velocity_a: &BodyVelocity, velocity_b: &BodyVelocity) -> f32 {
        velocity_a.linear.dot(self.contact.normal) + velocity_a.angular.dot(self.angular_a)
            - velocity_b.linear.dot(self.contact.normal)
            + velocity_b.angular.dot(self.angular_b)
    }

    #[inline(always)]
    fn apply_impulse(&self, impulse: f32, velocity_a: &mut BodyVelocity, velocity_b: &mut BodyVelocity) {
        velocity_a.linear += self.contact.normal * (impulse * self.inverse_mass_a);
        velocity_a.angular += self.angular_impulse_to_velocity_a * impulse;
        //Note subtract; normal = -jacobianLinearB
        velocity_b.linear -= self.contact.normal * (impulse * self.inverse_mass_b);
        velocity_b.angular += self.angular_impulse_to_velocity_b * impulse;
    }

    /// Reapplies the accumulated impulse to the bodies.
    #[inline(always)]
    pub fn warm_start(&self, velocity_a: &mut BodyVelocity, velocity_b: &mut BodyVelocity) {
        self.apply_impulse(self.accumulated_impulse, velocity_a, velocity_b);
    }

    #[inline(always)]
    fn compute_corrective_impulse(&self, velocity_a: &BodyVelocity, velocity_b: &BodyVelocity) -> f32 {
        let constraint_velocity = self.constraint_velocity(velocity_a, velocity_b);
        self.effective_mass
            * (self.bias_velocity - constraint_velocity - self.accumulated_impulse * self.softness)
    }

    /// Performs one projected Gauss-Seidel step, applying only the change in the clamped accumulated impulse.
    #[inline(always)]
    pub fn solve_iteration(&mut self, velocity_a: &mut BodyVelocity, velocity_b: &mut BodyVelocity) {
        let impulse = self.compute_corrective_impulse(velocity_a, velocity_b);
        let applied = InequalityHelpers::clamp_positive(&mut self.accumulated_impulse, impulse);
        self.apply_impulse(applied, velocity_a, velocity_b);
    }

    /// Constraint-space velocity the next iteration would remove, in the same units as
    /// [`constraint_velocity`](Self::constraint_velocity). Zero once the constraint has converged.
    pub fn velocity_error(&self, velocity_a: &BodyVelocity, velocity_b: &BodyVelocity) -> f32 {
        let impulse = self.compute_corrective_impulse(velocity_a, velocity_b);
        let projected = (self.accumulated_impulse + impulse).max(0.0) - self.accumulated_impulse;
        projected.abs() / self.effective_mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_balls(depth: f32) -> ContactConstraint {
        ContactConstraint::new(ContactData::new(
            BodyHandle(0),
            BodyHandle(1),
            Vec3::Y,
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
            depth,
        ))
    }

    #[test]
    fn head_on_contact_has_no_angular_terms() {
        let mut constraint = two_balls(0.0);
        let inertia = BodyInertia::sphere(1.0, 0.5);
        constraint.prestep(&inertia, &inertia, &SolveDescription::default(), 60.0);
        assert_eq!(constraint.angular_a, Vec3::ZERO);
        assert_eq!(constraint.angular_b, Vec3::ZERO);
        // 1 / (2 + 2e-4 * 2 * 60)
        assert!((constraint.effective_mass() - 1.0 / 2.024).abs() < 1e-5);
        assert_eq!(constraint.bias_velocity(), 0.0);
        assert!(constraint.is_dynamic_a() && constraint.is_dynamic_b());
    }

    #[test]
    fn separating_bodies_receive_no_impulse() {
        let mut constraint = two_balls(0.0);
        let inertia = BodyInertia::sphere(1.0, 0.5);
        constraint.prestep(&inertia, &inertia, &SolveDescription::default(), 60.0);
        let mut a = BodyVelocity::from_linear(Vec3::Y);
        let mut b = BodyVelocity::default();
        constraint.solve_iteration(&mut a, &mut b);
        assert_eq!(constraint.accumulated_impulse, 0.0);
        assert_eq!(a.linear, Vec3::Y);
        assert_eq!(constraint.velocity_error(&a, &b), 0.0);
    }

    #[test]
    fn approaching_bodies_are_stopped_against_static_ground() {
        let mut constraint = two_balls(0.0);
        constraint.prestep(
            &BodyInertia::sphere(2.0, 0.5),
            &BodyInertia::KINEMATIC,
            &SolveDescription::default().with_softness_factor(0.0),
            60.0,
        );
        assert!(!constraint.is_dynamic_b());
        let mut a = BodyVelocity::from_linear(Vec3::new(0.0, -3.0, 0.0));
        let mut b = BodyVelocity::default();
        constraint.solve_iteration(&mut a, &mut b);
        assert!(constraint.constraint_velocity(&a, &b).abs() < 1e-5);
        assert!((constraint.accumulated_impulse - 6.0).abs() < 1e-4);
        assert_eq!(b, BodyVelocity::default());
    }

    #[test]
    fn penetration_produces_a_capped_separating_bias() {
        let mut constraint = two_balls(0.5);
        let inertia = BodyInertia::sphere(1.0, 0.5);
        constraint.prestep(&inertia, &inertia, &SolveDescription::default(), 60.0);
        assert_eq!(constraint.bias_velocity(), 2.0);
        let mut a = BodyVelocity::default();
        let mut b = BodyVelocity::default();
        for _ in 0..10 {
            constraint.solve_iteration(&mut a, &mut b);
        }
        assert!(constraint.constraint_velocity(&a, &b) > 1.9);
        assert!(constraint.constraint_velocity(&a, &b) <= 2.0 + 1e-5);
    }

    #[test]
    fn off_center_contact_spins_the_bodies() {
        let mut constraint = ContactConstraint::new(ContactData::new(
            BodyHandle(0),
            BodyHandle(1),
            Vec3::Y,
            Vec3::new(0.3, -0.5, 0.0),
            Vec3::new(0.3, 0.5, 0.0),
            0.0,
        ));
        let inertia = BodyInertia::cuboid(1.0, Vec3::splat(0.5));
        constraint.prestep(&inertia, &inertia, &SolveDescription::default(), 60.0);
        let mut a = BodyVelocity::from_linear(Vec3::new(0.0, -1.0, 0.0));
        let mut b = BodyVelocity::default();
        for _ in 0..4 {
            constraint.solve_iteration(&mut a, &mut b);
        }
        assert!(a.angular.z.abs() > 0.0);
        assert!(b.angular.z.abs() > 0.0);
        assert!(constraint.constraint_velocity(&a, &b) > -0.02);
    }
}

use crate::physics::body_properties::{BodyInertia, BodyInertiaWide, BodyVelocity, BodyVelocityWide};
use crate::physics::constraints::contact::penetration_limit::ContactConstraint;
use crate::physics::constraints::inequality_helpers::InequalityHelpers;
use crate::physics::solve_description::SolveDescription;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::{for_each_lane, WideF32};
use crate::utilities::vector3_wide::Vector3Wide;

/// Up to `V::LANES` contact constraints from one conflict-free batch, solved together.
///
/// Each lane runs the same arithmetic as [`ContactConstraint`]. Unused lanes hold zeroed data, which makes them
/// produce zero impulses.
#[derive(Clone, Copy, Debug)]
pub struct ContactConstraintBundle<V: WideF32> {
    count: usize,
    body_a: V::Indices,
    body_b: V::Indices,
    dynamic_a: u32,
    dynamic_b: u32,
    normal: Vector3Wide<V>,
    penetration_depth: V,
    angular_a: Vector3Wide<V>,
    angular_b: Vector3Wide<V>,
    inverse_mass_a: V,
    inverse_mass_b: V,
    angular_impulse_to_velocity_a: Vector3Wide<V>,
    angular_impulse_to_velocity_b: Vector3Wide<V>,
    bias_velocity: V,
    softness: V,
    effective_mass: V,
    /// Accumulated impulse per lane. Never negative.
    pub accumulated_impulse: V,
}

impl<V: WideF32> ContactConstraintBundle<V> {
    /// Packs the contact data and accumulated impulses of up to `V::LANES` constraints.
    pub fn gather(constraints: &[ContactConstraint]) -> Self {
        debug_assert!(
            !constraints.is_empty() && constraints.len() <= V::LANES,
            "A bundle holds between one and LANES constraints."
        );
        let mut bundle = Self {
            count: constraints.len(),
            body_a: V::splat_indices(-1),
            body_b: V::splat_indices(-1),
            dynamic_a: 0,
            dynamic_b: 0,
            normal: Vector3Wide::default(),
            penetration_depth: V::default(),
            angular_a: Vector3Wide::default(),
            angular_b: Vector3Wide::default(),
            inverse_mass_a: V::default(),
            inverse_mass_b: V::default(),
            angular_impulse_to_velocity_a: Vector3Wide::default(),
            angular_impulse_to_velocity_b: Vector3Wide::default(),
            bias_velocity: V::default(),
            softness: V::default(),
            effective_mass: V::default(),
            accumulated_impulse: V::default(),
        };
        let mut offset_a = Vector3Wide::<V>::default();
        let mut offset_b = Vector3Wide::<V>::default();
        for (slot, constraint) in constraints.iter().enumerate() {
            let contact = &constraint.contact;
            bundle.body_a.as_mut()[slot] = contact.body_a.0;
            bundle.body_b.as_mut()[slot] = contact.body_b.0;
            bundle.normal.write_slot(slot, contact.normal);
            bundle.penetration_depth.set_lane(slot, contact.penetration_depth);
            bundle
                .accumulated_impulse
                .set_lane(slot, constraint.accumulated_impulse);
            offset_a.write_slot(slot, contact.offset_a);
            offset_b.write_slot(slot, contact.offset_b);
        }
        bundle.angular_a = Vector3Wide::cross(&offset_a, &bundle.normal);
        bundle.angular_b = Vector3Wide::cross(&bundle.normal, &offset_b);
        bundle
    }

    /// Number of occupied lanes.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Body index of lane `slot`'s first body.
    #[inline(always)]
    pub fn body_a(&self, slot: usize) -> i32 {
        self.body_a.as_ref()[slot]
    }

    #[inline(always)]
    pub fn body_b(&self, slot: usize) -> i32 {
        self.body_b.as_ref()[slot]
    }

    /// Wide counterpart of [`ContactConstraint::prestep`].
    pub fn prestep(&mut self, inertias: &[BodyInertia], description: &SolveDescription, inverse_dt: f32) {
        let mut inertia_a = BodyInertiaWide::<V>::default();
        let mut inertia_b = BodyInertiaWide::<V>::default();
        self.dynamic_a = 0;
        self.dynamic_b = 0;
        for slot in 0..self.count {
            let a = &inertias[self.body_a(slot) as usize];
            let b = &inertias[self.body_b(slot) as usize];
            inertia_a.write_slot(slot, a);
            inertia_b.write_slot(slot, b);
            if !a.is_kinematic() {
                self.dynamic_a |= 1 << slot;
            }
            if !b.is_kinematic() {
                self.dynamic_b |= 1 << slot;
            }
        }
        self.inverse_mass_a = inertia_a.inverse_mass;
        self.inverse_mass_b = inertia_b.inverse_mass;
        self.angular_impulse_to_velocity_a =
            Symmetric3x3Wide::transform_without_overlap(&self.angular_a, &inertia_a.inverse_inertia_tensor);
        self.angular_impulse_to_velocity_b =
            Symmetric3x3Wide::transform_without_overlap(&self.angular_b, &inertia_b.inverse_inertia_tensor);

        let inverse_effective_mass = (self.inverse_mass_a
            + self.inverse_mass_b
            + Symmetric3x3Wide::vector_sandwich(&self.angular_a, &inertia_a.inverse_inertia_tensor)
            + Symmetric3x3Wide::vector_sandwich(&self.angular_b, &inertia_b.inverse_inertia_tensor))
        .max(V::splat(InequalityHelpers::MINIMUM_INVERSE_EFFECTIVE_MASS));
        let inverse_dt_wide = V::splat(inverse_dt);
        self.softness = V::splat(description.softness_factor) * inverse_effective_mass * inverse_dt_wide;
        self.effective_mass = V::splat(1.0) / (inverse_effective_mass + self.softness);
        self.bias_velocity = InequalityHelpers::compute_bias_velocity_wide(
            self.penetration_depth,
            inverse_dt_wide,
            V::splat(description.correction_fraction),
            V::splat(description.maximum_recovery_velocity),
        );
    }

    /// Loads the velocities of every lane's bodies. Unused lanes are zero.
    pub fn gather_velocities(
        &self,
        mut read: impl FnMut(usize) -> BodyVelocity,
    ) -> (BodyVelocityWide<V>, BodyVelocityWide<V>) {
        let mut velocity_a = BodyVelocityWide::default();
        let mut velocity_b = BodyVelocityWide::default();
        for slot in 0..self.count {
            velocity_a.write_slot(slot, &read(self.body_a(slot) as usize));
            velocity_b.write_slot(slot, &read(self.body_b(slot) as usize));
        }
        (velocity_a, velocity_b)
    }

    /// Writes back the velocities of every dynamic body in the bundle. Kinematic bodies are never written.
    pub fn scatter_velocities(
        &self,
        velocity_a: &BodyVelocityWide<V>,
        velocity_b: &BodyVelocityWide<V>,
        mut write: impl FnMut(usize, BodyVelocity),
    ) {
        for_each_lane(self.dynamic_a, |slot| {
            write(self.body_a(slot) as usize, velocity_a.read_slot(slot));
        });
        for_each_lane(self.dynamic_b, |slot| {
            write(self.body_b(slot) as usize, velocity_b.read_slot(slot));
        });
    }

    #[inline(always)]
    fn constraint_velocity(&self, velocity_a: &BodyVelocityWide<V>, velocity_b: &BodyVelocityWide<V>) -> V {
        Vector3Wide::dot(&velocity_a.linear, &self.normal) + Vector3Wide::dot(&velocity_a.angular, &self.angular_a)
            - Vector3Wide::dot(&velocity_b.linear, &self.normal)
            + Vector3Wide::dot(&velocity_b.angular, &self.angular_b)
    }

    #[inline(always)]
    fn apply_impulse(&self, impulse: V, velocity_a: &mut BodyVelocityWide<V>, velocity_b: &mut BodyVelocityWide<V>) {
        velocity_a.linear = velocity_a.linear + self.normal * (impulse * self.inverse_mass_a);
        velocity_a.angular = velocity_a.angular + self.angular_impulse_to_velocity_a * impulse;
        velocity_b.linear = velocity_b.linear - self.normal * (impulse * self.inverse_mass_b);
        velocity_b.angular = velocity_b.angular + self.angular_impulse_to_velocity_b * impulse;
    }

    /// Reapplies every lane's accumulated impulse.
    #[inline(always)]
    pub fn warm_start(&self, velocity_a: &mut BodyVelocityWide<V>, velocity_b: &mut BodyVelocityWide<V>) {
        self.apply_impulse(self.accumulated_impulse, velocity_a, velocity_b);
    }

    /// One projected Gauss-Seidel step for every lane at once.
    #[inline(always)]
    pub fn solve_iteration(&mut self, velocity_a: &mut BodyVelocityWide<V>, velocity_b: &mut BodyVelocityWide<V>) {
        let constraint_velocity = self.constraint_velocity(velocity_a, velocity_b);
        let impulse = self.effective_mass
            * (self.bias_velocity - constraint_velocity - self.accumulated_impulse * self.softness);
        let applied = InequalityHelpers::clamp_positive_wide(&mut self.accumulated_impulse, impulse);
        self.apply_impulse(applied, velocity_a, velocity_b);
    }

    /// Copies the accumulated impulses back into the constraints the bundle was gathered from.
    pub fn scatter_accumulated_impulses(&self, constraints: &mut [ContactConstraint]) {
        debug_assert!(constraints.len() == self.count);
        for (slot, constraint) in constraints.iter_mut().enumerate() {
            constraint.accumulated_impulse = self.accumulated_impulse.lane(slot);
        }
    }
}

use crate::utilities::vector::WideF32;

/// Helpers for inequality constraint clamping.
pub struct InequalityHelpers;

impl InequalityHelpers {
    /// Smallest inverse effective mass the solver divides by.
    pub const MINIMUM_INVERSE_EFFECTIVE_MASS: f32 = 1e-12;

    /// Converts a position error into the velocity used to push it back out.
    ///
    /// The full `error * inverse_dt` is scaled down by `correction_fraction` and capped at `maximum_recovery_velocity`.
    /// Negative errors (speculative contacts) keep the unscaled value so bodies may approach right up to contact.
    #[inline(always)]
    pub fn compute_bias_velocity(
        error: f32,
        inverse_dt: f32,
        correction_fraction: f32,
        maximum_recovery_velocity: f32,
    ) -> f32 {
        let full = error * inverse_dt;
        full.min((full * correction_fraction).min(maximum_recovery_velocity))
    }

    #[inline(always)]
    pub fn compute_bias_velocity_wide<V: WideF32>(
        error: V,
        inverse_dt: V,
        correction_fraction: V,
        maximum_recovery_velocity: V,
    ) -> V {
        let full = error * inverse_dt;
        full.min((full * correction_fraction).min(maximum_recovery_velocity))
    }

    /// Adds `impulse` to the accumulated impulse, clamps the sum at zero and returns the change that survived.
    #[inline(always)]
    pub fn clamp_positive(accumulated_impulse: &mut f32, impulse: f32) -> f32 {
        let previous = *accumulated_impulse;
        *accumulated_impulse = (previous + impulse).max(0.0);
        *accumulated_impulse - previous
    }

    #[inline(always)]
    pub fn clamp_positive_wide<V: WideF32>(accumulated_impulse: &mut V, impulse: V) -> V {
        let previous = *accumulated_impulse;
        *accumulated_impulse = (previous + impulse).max(V::splat(0.0));
        *accumulated_impulse - previous
    }
}

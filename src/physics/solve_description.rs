use serde::{Deserialize, Serialize};

use crate::errors::{PhysicsError, PhysicsResult};

/// Describes how the solver should iterate over contact constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveDescription {
    /// Number of velocity iterations per solve.
    pub iteration_count: u32,
    /// Fraction of the penetration depth to correct per second, relative to the full `depth / dt` velocity.
    pub correction_fraction: f32,
    /// Upper bound on the separating velocity used to push overlapping bodies apart.
    pub maximum_recovery_velocity: f32,
    /// Scales the constraint-force-mixing term. Zero makes contacts perfectly rigid.
    pub softness_factor: f32,
    /// Number of worker threads used inside each constraint batch.
    pub thread_count: usize,
    /// Batches with fewer constraints than this per worker are solved on fewer workers.
    pub minimum_constraints_per_worker: usize,
    /// Whether accumulated impulses from the previous solve are reapplied before iterating.
    pub warm_start: bool,
}

impl Default for SolveDescription {
    fn default() -> Self {
        Self {
            iteration_count: Self::DEFAULT_ITERATION_COUNT,
            correction_fraction: 0.2,
            maximum_recovery_velocity: 2.0,
            softness_factor: 2e-4,
            thread_count: 1,
            minimum_constraints_per_worker: 64,
            warm_start: true,
        }
    }
}

impl SolveDescription {
    /// Default number of velocity iterations.
    pub const DEFAULT_ITERATION_COUNT: u32 = 10;

    /// Runs `iteration_count` velocity iterations per solve.
    pub fn with_iteration_count(mut self, iteration_count: u32) -> Self {
        self.iteration_count = iteration_count;
        self
    }

    /// Uses `thread_count` workers per batch.
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Enables or disables warm starting.
    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    /// Sets the softness factor.
    pub fn with_softness_factor(mut self, softness_factor: f32) -> Self {
        self.softness_factor = softness_factor;
        self
    }

    /// Sets the penetration recovery parameters.
    pub fn with_recovery(mut self, correction_fraction: f32, maximum_recovery_velocity: f32) -> Self {
        self.correction_fraction = correction_fraction;
        self.maximum_recovery_velocity = maximum_recovery_velocity;
        self
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> PhysicsResult<()> {
        if self.iteration_count == 0 {
            return Err(PhysicsError::invalid_setting(
                "iteration_count",
                "velocity iteration count must be positive",
            ));
        }
        if !(self.correction_fraction > 0.0 && self.correction_fraction <= 1.0) {
            return Err(PhysicsError::invalid_setting(
                "correction_fraction",
                format!("must be in (0, 1], got {}", self.correction_fraction),
            ));
        }
        if !(self.maximum_recovery_velocity >= 0.0) {
            return Err(PhysicsError::invalid_setting(
                "maximum_recovery_velocity",
                format!("must be nonnegative, got {}", self.maximum_recovery_velocity),
            ));
        }
        if !(self.softness_factor >= 0.0 && self.softness_factor.is_finite()) {
            return Err(PhysicsError::invalid_setting(
                "softness_factor",
                format!("must be finite and nonnegative, got {}", self.softness_factor),
            ));
        }
        if self.thread_count == 0 {
            return Err(PhysicsError::invalid_setting(
                "thread_count",
                "at least one worker is required",
            ));
        }
        if self.minimum_constraints_per_worker == 0 {
            return Err(PhysicsError::invalid_setting(
                "minimum_constraints_per_worker",
                "must be positive",
            ));
        }
        Ok(())
    }
}

//! Error types for the engine core.
//!
//! Only configuration validation and body handle lookups are fallible. Broken tree or batch invariants are
//! caught by `debug_assert!`s in development builds and are undefined behavior in release builds.

use thiserror::Error;

/// Unified error type for the engine core.
#[derive(Debug, Error, PartialEq)]
pub enum PhysicsError {
    /// A configuration value is outside of its valid range.
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Name of the offending field.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A body handle does not refer to a body in the store.
    #[error("unknown body handle {0}")]
    UnknownBody(i32),

    /// Two constraints of one batch write the same dynamic body.
    #[error("constraint {constraint} references dynamic body {body} which is already used in its batch")]
    ConflictingBatch {
        /// Position of the offending constraint inside its batch.
        constraint: usize,
        /// The shared body.
        body: i32,
    },
}

/// Convenience alias for `Result<T, PhysicsError>`.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl PhysicsError {
    pub(crate) fn invalid_setting(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }
}

//! Broad phase and contact solver core of a SIMD rigid body engine.
//!
//! The broad phase is a wide bounding volume hierarchy whose nodes store one child per SIMD lane. The lane width is
//! chosen at startup from the CPU's features. The solver resolves contact constraints with warm-started sequential
//! impulses, spreading each conflict-free batch across worker threads.
//!
//! Tree and batch invariants are checked with `debug_assert!` only. Breaking them in a release build (a stale leaf
//! index, a batch that references a dynamic body twice) is undefined behavior.

#![feature(portable_simd)]

pub mod errors;
pub mod physics;
pub mod utilities;

pub use crate::errors::{PhysicsError, PhysicsResult};

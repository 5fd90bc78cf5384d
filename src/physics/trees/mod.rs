//! Wide bounding volume hierarchy.
//!
//! Every node holds one child per SIMD lane, so a single wide comparison tests a box against all of a node's
//! children. Child references are plain `i32`s: nonnegative values index the node array, -1 marks an empty slot and
//! leaves are stored as `-2 - leaf_index`.

pub mod leaf;
pub mod node;
pub mod tree;
mod tree_add;
mod tree_diagnostics;
pub mod tree_ray_cast;
mod tree_refine;
mod tree_refit;
mod tree_remove;
pub mod tree_self_queries;
mod tree_self_queries_mt;
pub mod tree_sweep;
pub mod tree_volume_query;

pub use self::leaf::Leaf;
pub use self::node::{Metanode, Node, EMPTY_CHILD};
pub use self::tree::Tree;
pub use self::tree_ray_cast::{TreeRay, TreeRayWide};
pub use self::tree_self_queries::OverlapHandler;
pub use self::tree_sweep::SweepLeafTester;
pub use self::tree_volume_query::BreakableForEach;

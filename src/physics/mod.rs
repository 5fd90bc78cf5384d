pub mod bodies;
pub mod body_description;
pub mod body_properties;
pub mod collision_detection;
pub mod constraint_batch;
pub mod constraints;
pub mod handles;
pub mod solve_description;
pub mod solver;
pub mod trees;

pub use self::bodies::Bodies;
pub use self::body_description::BodyDescription;
pub use self::body_properties::{BodyInertia, BodyVelocity, RigidPose};
pub use self::collision_detection::{BroadPhase, BroadPhaseSettings, CandidatePair};
pub use self::constraint_batch::{ConstraintBatch, ConstraintBatcher};
pub use self::constraints::{ContactConstraint, ContactConstraintBundle, ContactData};
pub use self::handles::BodyHandle;
pub use self::solve_description::SolveDescription;
pub use self::solver::Solver;

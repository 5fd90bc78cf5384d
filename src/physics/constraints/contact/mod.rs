//! Non-penetration contact constraints, in scalar and lane-parallel form.

pub mod contact_constraint_description;
pub mod penetration_limit;
pub mod penetration_limit_wide;

pub use self::contact_constraint_description::ContactData;
pub use self::penetration_limit::ContactConstraint;
pub use self::penetration_limit_wide::ContactConstraintBundle;

pub mod contact;
pub mod inequality_helpers;

pub use self::contact::{ContactConstraint, ContactConstraintBundle, ContactData};
pub use self::inequality_helpers::InequalityHelpers;

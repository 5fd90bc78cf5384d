pub mod arch;
pub mod bounding_box;
pub mod bounding_box_wide;
pub mod symmetric3x3;
pub mod symmetric3x3_wide;
pub mod thread_dispatcher;
pub mod vector;
pub mod vector3_wide;

pub use self::arch::SimdBackend;
pub use self::bounding_box::{Bounded, BoundingBox};
pub use self::bounding_box_wide::BoundingBoxWide;
pub use self::thread_dispatcher::ThreadDispatcher;
pub use self::vector::WideF32;
pub use self::vector3_wide::Vector3Wide;

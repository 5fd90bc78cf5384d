/// Stable reference to a body in [`Bodies`](crate::physics::bodies::Bodies).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub i32);

impl BodyHandle {
    /// Index of the body in the store's arrays.
    #[inline(always)]
    pub fn index(self) -> usize {
        debug_assert!(self.0 >= 0, "Body handles must be nonnegative.");
        self.0 as usize
    }
}

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BodyHandle<{}>", self.0)
    }
}

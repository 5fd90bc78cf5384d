/// Pointer to a leaf's tree location.
///
/// The identity of a leaf is implicit in its position within the leaf array.
/// The owning node index lives in the low 28 bits and the child slot in the high 4, enough for 16-wide nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leaf {
    packed: u32,
}

const NODE_MASK: u32 = 0x0FFF_FFFF;
const CHILD_SHIFT: u32 = 28;

impl Leaf {
    /// Gets the index of the node that the leaf is directly held by.
    #[inline(always)]
    pub fn node_index(&self) -> i32 {
        (self.packed & NODE_MASK) as i32
    }

    /// Gets which child within the owning node the leaf is in.
    #[inline(always)]
    pub fn child_index(&self) -> i32 {
        (self.packed >> CHILD_SHIFT) as i32
    }

    /// Creates a new leaf with the given node index and child index.
    #[inline(always)]
    pub fn new(node_index: i32, child_index: i32) -> Self {
        debug_assert!(
            (0..16).contains(&child_index),
            "Nodes can't have children in slots beyond 15!"
        );
        debug_assert!(node_index >= 0 && node_index as u32 <= NODE_MASK);
        Self {
            packed: (node_index as u32 & NODE_MASK) | ((child_index as u32) << CHILD_SHIFT),
        }
    }
}

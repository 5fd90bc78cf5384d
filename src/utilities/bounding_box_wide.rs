use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::vector::WideF32;
use crate::utilities::vector3_wide::Vector3Wide;

/// Structure-of-arrays packing of `V::LANES` axis-aligned bounding boxes.
///
/// Unused lanes hold [`BoundingBox::EMPTY`], which never intersects anything and is the identity for merges,
/// so horizontal reductions over a node's lanes give the union of the occupied children directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundingBoxWide<V: WideF32> {
    /// Lower corners of the boxes.
    pub min: Vector3Wide<V>,
    /// Upper corners of the boxes.
    pub max: Vector3Wide<V>,
}

impl<V: WideF32> BoundingBoxWide<V> {
    /// All lanes empty.
    #[inline(always)]
    pub fn empty() -> Self {
        Self::broadcast(&BoundingBox::EMPTY)
    }

    /// Copies the same box into every lane.
    #[inline(always)]
    pub fn broadcast(bounds: &BoundingBox) -> Self {
        Self {
            min: Vector3Wide::broadcast(bounds.min),
            max: Vector3Wide::broadcast(bounds.max),
        }
    }

    /// Reads the box stored in a lane.
    #[inline(always)]
    pub fn get(&self, slot: usize) -> BoundingBox {
        BoundingBox {
            min: self.min.read_slot(slot),
            max: self.max.read_slot(slot),
        }
    }

    /// Writes a box into a lane.
    #[inline(always)]
    pub fn set(&mut self, slot: usize, bounds: &BoundingBox) {
        self.min.write_slot(slot, bounds.min);
        self.max.write_slot(slot, bounds.max);
    }

    /// Resets a lane to the empty box.
    #[inline(always)]
    pub fn clear(&mut self, slot: usize) {
        self.set(slot, &BoundingBox::EMPTY);
    }

    /// Tests every lane of `a` against the matching lane of `b`. Bit `i` of the result is set if lane `i` intersects.
    #[inline(always)]
    pub fn intersects(a: &Self, b: &Self) -> u32 {
        let separated = a.max.x.lt_mask(b.min.x)
            | a.max.y.lt_mask(b.min.y)
            | a.max.z.lt_mask(b.min.z)
            | b.max.x.lt_mask(a.min.x)
            | b.max.y.lt_mask(a.min.y)
            | b.max.z.lt_mask(a.min.z);
        !separated & V::full_mask()
    }

    /// Lane-wise merge of two sets of boxes.
    #[inline(always)]
    pub fn merge(a: &Self, b: &Self) -> Self {
        Self {
            min: Vector3Wide::min(&a.min, &b.min),
            max: Vector3Wide::max(&a.max, &b.max),
        }
    }

    /// Volume of every lane's box. Empty lanes produce garbage and must be masked out by the caller.
    #[inline(always)]
    pub fn compute_volume(&self) -> V {
        let diagonal = self.max - self.min;
        diagonal.x * diagonal.y * diagonal.z
    }

    /// Expands every box by `expansion` on each side.
    #[inline(always)]
    pub fn expand(&self, expansion: &Vector3Wide<V>) -> Self {
        Self {
            min: self.min - *expansion,
            max: self.max + *expansion,
        }
    }

    /// Union of all lanes. Relies on unoccupied lanes holding the empty box.
    #[inline(always)]
    pub fn compute_merged(&self) -> BoundingBox {
        BoundingBox {
            min: glam::Vec3::new(
                self.min.x.reduce_min(),
                self.min.y.reduce_min(),
                self.min.z.reduce_min(),
            ),
            max: glam::Vec3::new(
                self.max.x.reduce_max(),
                self.max.y.reduce_max(),
                self.max.z.reduce_max(),
            ),
        }
    }
}

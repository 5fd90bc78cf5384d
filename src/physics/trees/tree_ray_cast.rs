use glam::Vec3;

use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::bounding_box_wide::BoundingBoxWide;
use crate::utilities::vector::WideF32;
use crate::utilities::vector3_wide::Vector3Wide;

use super::tree::Tree;
use super::tree_sweep::SweepLeafTester;

/// Ray representation designed for quicker intersection against axis aligned bounding boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeRay {
    pub origin_over_direction: Vec3,
    pub maximum_t: f32,
    pub inverse_direction: Vec3,
}

impl TreeRay {
    /// Smallest direction magnitude used when inverting a ray direction.
    pub const MINIMUM_DIRECTION_MAGNITUDE: f32 = 1e-15;

    #[inline(always)]
    pub fn new(origin: Vec3, direction: Vec3, maximum_t: f32) -> Self {
        // Near zero direction components are clamped to a tiny nonzero magnitude and the sign is put back in the
        // numerator. Intervals computed from such an inverse are enormous; a parallel ray never reaches them.
        let sign = Vec3::new(
            if direction.x < 0.0 { -1.0 } else { 1.0 },
            if direction.y < 0.0 { -1.0 } else { 1.0 },
            if direction.z < 0.0 { -1.0 } else { 1.0 },
        );
        let inverse_direction =
            sign / Vec3::max(Vec3::splat(Self::MINIMUM_DIRECTION_MAGNITUDE), direction.abs());
        Self {
            origin_over_direction: origin * inverse_direction,
            maximum_t,
            inverse_direction,
        }
    }

    /// Slab test of the ray against one box.
    /// Returns the entry time if the ray hits the box within `[0, maximum_t]`.
    #[inline(always)]
    pub fn intersects(&self, bounds: &BoundingBox) -> Option<f32> {
        let t0 = bounds.min * self.inverse_direction - self.origin_over_direction;
        let t1 = bounds.max * self.inverse_direction - self.origin_over_direction;
        let t_exit = t0.max(t1);
        let t_entry = t0.min(t1);
        let earliest_exit = self.maximum_t.min(t_exit.x).min(t_exit.y).min(t_exit.z);
        let t = t_entry.x.max(0.0).max(t_entry.y).max(t_entry.z);
        (t <= earliest_exit).then_some(t)
    }
}

/// A [`TreeRay`] broadcast across every lane.
#[derive(Clone, Copy, Debug)]
pub struct TreeRayWide<V: WideF32> {
    pub origin_over_direction: Vector3Wide<V>,
    pub inverse_direction: Vector3Wide<V>,
}

impl<V: WideF32> TreeRayWide<V> {
    #[inline(always)]
    pub fn broadcast(ray: &TreeRay) -> Self {
        Self {
            origin_over_direction: Vector3Wide::broadcast(ray.origin_over_direction),
            inverse_direction: Vector3Wide::broadcast(ray.inverse_direction),
        }
    }

    /// Slab test against every lane of `bounds`, using the same arithmetic as [`TreeRay::intersects`].
    /// Returns the mask of hit lanes and the entry time of every lane.
    #[inline(always)]
    pub fn intersects(&self, bounds: &BoundingBoxWide<V>, maximum_t: f32) -> (u32, V) {
        let inverse = &self.inverse_direction;
        let offset = &self.origin_over_direction;
        let t0x = bounds.min.x * inverse.x - offset.x;
        let t0y = bounds.min.y * inverse.y - offset.y;
        let t0z = bounds.min.z * inverse.z - offset.z;
        let t1x = bounds.max.x * inverse.x - offset.x;
        let t1y = bounds.max.y * inverse.y - offset.y;
        let t1z = bounds.max.z * inverse.z - offset.z;
        let earliest_exit = V::splat(maximum_t)
            .min(t0x.max(t1x))
            .min(t0y.max(t1y))
            .min(t0z.max(t1z));
        let t = t0x
            .min(t1x)
            .max(V::splat(0.0))
            .max(t0y.min(t1y))
            .max(t0z.min(t1z));
        (t.le_mask(earliest_exit), t)
    }
}

impl<V: WideF32> Tree<V> {
    /// Casts a ray against the tree and reports every leaf whose bounds the ray hits to the tester.
    ///
    /// The tester may shrink `maximum_t` to cull later candidates; the final value is written back.
    pub fn ray_cast<T: SweepLeafTester + ?Sized>(
        &self,
        origin: Vec3,
        direction: Vec3,
        maximum_t: &mut f32,
        leaf_tester: &mut T,
    ) {
        let mut tree_ray = TreeRay::new(origin, direction, *maximum_t);
        self.sweep_internal(Vec3::ZERO, &mut tree_ray, leaf_tester);
        // The maximum t could have been mutated by the leaf tester. Propagate that change.
        *maximum_t = tree_ray.maximum_t;
    }
}

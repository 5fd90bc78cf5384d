use crate::utilities::symmetric3x3::Symmetric3x3;
use crate::utilities::vector::WideF32;
use crate::utilities::vector3_wide::Vector3Wide;

/// Lower triangle of a symmetric 3x3 matrix per lane.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Symmetric3x3Wide<V: WideF32> {
    pub xx: V,
    pub yx: V,
    pub yy: V,
    pub zx: V,
    pub zy: V,
    pub zz: V,
}

impl<V: WideF32> Symmetric3x3Wide<V> {
    #[inline(always)]
    pub fn write_slot(&mut self, slot: usize, source: &Symmetric3x3) {
        self.xx.set_lane(slot, source.xx);
        self.yx.set_lane(slot, source.yx);
        self.yy.set_lane(slot, source.yy);
        self.zx.set_lane(slot, source.zx);
        self.zy.set_lane(slot, source.zy);
        self.zz.set_lane(slot, source.zz);
    }

    #[inline(always)]
    pub fn transform_without_overlap(v: &Vector3Wide<V>, m: &Self) -> Vector3Wide<V> {
        Vector3Wide {
            x: v.x * m.xx + v.y * m.yx + v.z * m.zx,
            y: v.x * m.yx + v.y * m.yy + v.z * m.zy,
            z: v.x * m.zx + v.y * m.zy + v.z * m.zz,
        }
    }

    /// Computes v * m * transpose(v) for a row vector v.
    #[inline(always)]
    pub fn vector_sandwich(v: &Vector3Wide<V>, m: &Self) -> V {
        let transformed = Self::transform_without_overlap(v, m);
        Vector3Wide::dot(v, &transformed)
    }
}

use crate::utilities::vector::WideF32;
use glam::Vec3;
use std::ops::{Add, Mul, Neg, Sub};

/// Three dimensional vector with SIMD lanes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Vector3Wide<V: WideF32> {
    /// First component of the vector.
    pub x: V,
    /// Second component of the vector.
    pub y: V,
    /// Third component of the vector.
    pub z: V,
}

impl<V: WideF32> Vector3Wide<V> {
    /// Creates a vector with every component of every lane set to `value`.
    #[inline(always)]
    pub fn splat(value: f32) -> Self {
        let s = V::splat(value);
        Self { x: s, y: s, z: s }
    }

    /// Copies a scalar vector into every lane.
    #[inline(always)]
    pub fn broadcast(source: Vec3) -> Self {
        Self {
            x: V::splat(source.x),
            y: V::splat(source.y),
            z: V::splat(source.z),
        }
    }

    /// Reads the vector stored in one lane.
    #[inline(always)]
    pub fn read_slot(&self, slot: usize) -> Vec3 {
        Vec3::new(self.x.lane(slot), self.y.lane(slot), self.z.lane(slot))
    }

    /// Writes a scalar vector into one lane.
    #[inline(always)]
    pub fn write_slot(&mut self, slot: usize, source: Vec3) {
        self.x.set_lane(slot, source.x);
        self.y.set_lane(slot, source.y);
        self.z.set_lane(slot, source.z);
    }

    /// Computes the inner product between two vectors.
    #[inline(always)]
    pub fn dot(a: &Self, b: &Self) -> V {
        a.x * b.x + a.y * b.y + a.z * b.z
    }

    /// Computes the cross product between two vectors.
    #[inline(always)]
    pub fn cross(a: &Self, b: &Self) -> Self {
        Self {
            x: a.y * b.z - a.z * b.y,
            y: a.z * b.x - a.x * b.z,
            z: a.x * b.y - a.y * b.x,
        }
    }

    /// Scales every component of the vector by the lanes of `scale`.
    #[inline(always)]
    pub fn scale(v: &Self, scale: V) -> Self {
        Self {
            x: v.x * scale,
            y: v.y * scale,
            z: v.z * scale,
        }
    }

    /// Computes the per-component minimum of two vectors.
    #[inline(always)]
    pub fn min(a: &Self, b: &Self) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            z: a.z.min(b.z),
        }
    }

    /// Computes the per-component maximum of two vectors.
    #[inline(always)]
    pub fn max(a: &Self, b: &Self) -> Self {
        Self {
            x: a.x.max(b.x),
            y: a.y.max(b.y),
            z: a.z.max(b.z),
        }
    }
}

impl<V: WideF32> Add for Vector3Wide<V> {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl<V: WideF32> Sub for Vector3Wide<V> {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl<V: WideF32> Mul<V> for Vector3Wide<V> {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: V) -> Self {
        Self::scale(&self, rhs)
    }
}

impl<V: WideF32> Neg for Vector3Wide<V> {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

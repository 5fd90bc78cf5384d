use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::simd::cmp::SimdPartialOrd;
use std::simd::num::SimdFloat;
use std::simd::{f32x16, f32x4, f32x8};

/// Fixed-width float vector used by every lane-parallel type in the crate.
///
/// Tree nodes, wide bounding boxes and contact bundles are all generic over this trait, so a single
/// algorithm serves every instruction set. Which implementation runs is decided once at startup by
/// [`SimdBackend::detect`](crate::utilities::arch::SimdBackend::detect).
pub trait WideF32:
    Copy
    + Default
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Number of lanes in the vector.
    const LANES: usize;

    /// Fixed-size array holding one `i32` per lane.
    type Indices: Copy + Debug + Send + Sync + AsRef<[i32]> + AsMut<[i32]>;

    /// Creates a vector with every lane set to `value`.
    fn splat(value: f32) -> Self;

    /// Creates an index array with every lane set to `value`.
    fn splat_indices(value: i32) -> Self::Indices;

    /// Reads a single lane.
    fn lane(self, index: usize) -> f32;

    /// Writes a single lane.
    fn set_lane(&mut self, index: usize, value: f32);

    /// Lane-wise minimum.
    fn min(self, other: Self) -> Self;

    /// Lane-wise maximum.
    fn max(self, other: Self) -> Self;

    /// Minimum across all lanes.
    fn reduce_min(self) -> f32;

    /// Maximum across all lanes.
    fn reduce_max(self) -> f32;

    /// Bitmask with bit `i` set where `self[i] < other[i]`.
    fn lt_mask(self, other: Self) -> u32;

    /// Bitmask with bit `i` set where `self[i] <= other[i]`.
    fn le_mask(self, other: Self) -> u32;

    /// Bitmask with one bit set for every lane.
    #[inline(always)]
    fn full_mask() -> u32 {
        if Self::LANES >= 32 {
            u32::MAX
        } else {
            (1u32 << Self::LANES) - 1
        }
    }

    /// Creates a vector from a per-lane generator.
    #[inline(always)]
    fn from_fn(mut f: impl FnMut(usize) -> f32) -> Self {
        let mut result = Self::splat(0.0);
        for i in 0..Self::LANES {
            result.set_lane(i, f(i));
        }
        result
    }
}

macro_rules! impl_wide_f32 {
    ($vector:ty, $lanes:literal) => {
        impl WideF32 for $vector {
            const LANES: usize = $lanes;
            type Indices = [i32; $lanes];

            #[inline(always)]
            fn splat(value: f32) -> Self {
                <$vector>::splat(value)
            }

            #[inline(always)]
            fn splat_indices(value: i32) -> Self::Indices {
                [value; $lanes]
            }

            #[inline(always)]
            fn lane(self, index: usize) -> f32 {
                self[index]
            }

            #[inline(always)]
            fn set_lane(&mut self, index: usize, value: f32) {
                self[index] = value;
            }

            #[inline(always)]
            fn min(self, other: Self) -> Self {
                SimdFloat::simd_min(self, other)
            }

            #[inline(always)]
            fn max(self, other: Self) -> Self {
                SimdFloat::simd_max(self, other)
            }

            #[inline(always)]
            fn reduce_min(self) -> f32 {
                SimdFloat::reduce_min(self)
            }

            #[inline(always)]
            fn reduce_max(self) -> f32 {
                SimdFloat::reduce_max(self)
            }

            #[inline(always)]
            fn lt_mask(self, other: Self) -> u32 {
                self.simd_lt(other).to_bitmask() as u32
            }

            #[inline(always)]
            fn le_mask(self, other: Self) -> u32 {
                self.simd_le(other).to_bitmask() as u32
            }
        }
    };
}

impl_wide_f32!(f32x4, 4);
impl_wide_f32!(f32x8, 8);
impl_wide_f32!(f32x16, 16);

/// Iterates over the indices of the set bits of a lane mask, lowest first.
#[inline(always)]
pub fn for_each_lane(mut mask: u32, mut f: impl FnMut(usize)) {
    while mask != 0 {
        let lane = mask.trailing_zeros() as usize;
        f(lane);
        mask &= mask - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_masks<V: WideF32>() {
        let a = V::from_fn(|i| i as f32);
        let b = V::splat(2.0);
        let lt = a.lt_mask(b);
        let le = a.le_mask(b);
        assert_eq!(lt, 0b11);
        assert_eq!(le, 0b111);
        assert_eq!(V::full_mask().count_ones() as usize, V::LANES);
        assert_eq!(a.reduce_max(), (V::LANES - 1) as f32);
        assert_eq!(a.reduce_min(), 0.0);
    }

    #[test]
    fn masks_match_lane_comparisons() {
        check_masks::<f32x4>();
        check_masks::<f32x8>();
        check_masks::<f32x16>();
    }

    #[test]
    fn lane_iteration_visits_set_bits() {
        let mut visited = Vec::new();
        for_each_lane(0b1010_0101, |lane| visited.push(lane));
        assert_eq!(visited, vec![0, 2, 5, 7]);
    }
}

use glam::Vec3;
use std::fmt;

/// Anything that can be stored as a leaf of a bounding volume hierarchy.
pub trait Bounded {
    /// Computes the current axis-aligned bounding box of the object.
    fn bounding_box(&self) -> BoundingBox;
}

/// Provides simple axis-aligned bounding box functionality.
///
/// `min <= max` must hold componentwise; point boxes (`min == max`) are legal.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl BoundingBox {
    /// Box used for empty node slots. Intersects nothing and is the identity for merging.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(
            min.cmple(max).all(),
            "Bounding box minimum must not exceed its maximum: {min} > {max}"
        );
        Self { min, max }
    }

    /// Creates a box centered on `center` with the given half extents.
    #[inline]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Determines if a bounding box intersects another bounding box. Touching boxes intersect.
    #[inline]
    pub fn intersects(a: &Self, b: &Self) -> bool {
        Self::intersects_bounds(a.min, a.max, b.min, b.max)
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects_bounds(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> bool {
        let no_intersection_on_axes = max_a.cmplt(min_b) | max_b.cmplt(min_a);
        !no_intersection_on_axes.any()
    }

    /// Computes the volume of the bounding box.
    #[inline]
    pub fn compute_volume(&self) -> f32 {
        let diagonal = self.max - self.min;
        diagonal.x * diagonal.y * diagonal.z
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged(a: &Self, b: &Self) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Checks whether `other` lies entirely within this box.
    #[inline]
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Creates the smallest possible bounding box that contains a list of points.
    /// Returns [`BoundingBox::EMPTY`] for an empty list.
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |merged, point| Self {
            min: merged.min.min(*point),
            max: merged.max.max(*point),
        })
    }

    /// Whether this is the empty sentinel (or otherwise inverted) box.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }
}

impl Bounded for BoundingBox {
    #[inline]
    fn bounding_box(&self) -> BoundingBox {
        *self
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_boxes_intersect() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = BoundingBox::new(Vec3::new(1.01, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(BoundingBox::intersects(&a, &b));
        assert!(!BoundingBox::intersects(&a, &c));
    }

    #[test]
    fn empty_box_is_merge_identity() {
        let a = BoundingBox::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(3.0, 4.0, 0.5));
        assert_eq!(BoundingBox::create_merged(&BoundingBox::EMPTY, &a), a);
        assert!(!BoundingBox::intersects(&BoundingBox::EMPTY, &a));
        assert!(BoundingBox::EMPTY.is_empty());
        assert_eq!(a.compute_volume(), 0.0);
    }

    #[test]
    fn from_points_is_tight() {
        let points = [Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 5.0, 0.0)];
        let bounds = BoundingBox::from_points(&points);
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 5.0, 3.0));
        assert!(bounds.contains(&BoundingBox::new(Vec3::ZERO, Vec3::ONE)));
    }
}

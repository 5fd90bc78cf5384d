use glam::Vec3;

/// Lower left triangle (including diagonal) of a symmetric 3x3 matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Symmetric3x3 {
    /// First row, first column of the matrix.
    pub xx: f32,
    /// Second row, first column of the matrix.
    pub yx: f32,
    /// Second row, second column of the matrix.
    pub yy: f32,
    /// Third row, first column of the matrix.
    pub zx: f32,
    /// Third row, second column of the matrix.
    pub zy: f32,
    /// Third row, third column of the matrix.
    pub zz: f32,
}

impl Symmetric3x3 {
    /// The all-zero matrix, used for bodies which cannot rotate.
    pub const ZERO: Self = Self {
        xx: 0.0,
        yx: 0.0,
        yy: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 0.0,
    };

    /// Creates a diagonal matrix.
    #[inline(always)]
    pub fn from_diagonal(diagonal: Vec3) -> Self {
        Self {
            xx: diagonal.x,
            yy: diagonal.y,
            zz: diagonal.z,
            ..Self::ZERO
        }
    }

    /// Transforms a vector by a symmetric matrix.
    #[inline(always)]
    pub fn transform(v: Vec3, m: &Self) -> Vec3 {
        Vec3::new(
            v.x * m.xx + v.y * m.yx + v.z * m.zx,
            v.x * m.yx + v.y * m.yy + v.z * m.zy,
            v.x * m.zx + v.y * m.zy + v.z * m.zz,
        )
    }

    /// Computes v * m * transpose(v) for a row vector v.
    #[inline(always)]
    pub fn vector_sandwich(v: Vec3, m: &Self) -> f32 {
        v.dot(Self::transform(v, m))
    }
}

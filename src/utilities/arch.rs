use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction set family used to pick the lane width of wide structures.
///
/// The width is a property of the data layout (a tree node stores one child per lane), so it is chosen
/// once when a structure is created and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimdBackend {
    /// No vector unit worth targeting; the 4-wide layout is still used and lowered to scalar code.
    Scalar,
    /// x86 SSE2 through SSE4.2, 128-bit registers.
    Sse,
    /// x86 AVX/AVX2, 256-bit registers.
    Avx,
    /// x86 AVX-512F, 512-bit registers.
    Avx512,
    /// ARM NEON, 128-bit registers.
    Neon,
}

impl SimdBackend {
    /// Detects the widest usable backend on the executing CPU.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        {
            if std::is_x86_feature_detected!("avx512f") {
                return SimdBackend::Avx512;
            }
            if std::is_x86_feature_detected!("avx") {
                return SimdBackend::Avx;
            }
            if std::is_x86_feature_detected!("sse2") {
                return SimdBackend::Sse;
            }
            SimdBackend::Scalar
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return SimdBackend::Neon;
            }
            SimdBackend::Scalar
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64")))]
        {
            SimdBackend::Scalar
        }
    }

    /// Number of `f32` lanes a structure should use for this backend.
    #[inline]
    pub const fn lane_count(self) -> usize {
        match self {
            SimdBackend::Avx512 => 16,
            SimdBackend::Avx => 8,
            SimdBackend::Sse | SimdBackend::Neon | SimdBackend::Scalar => 4,
        }
    }
}

impl fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimdBackend::Scalar => "scalar",
            SimdBackend::Sse => "sse",
            SimdBackend::Avx => "avx",
            SimdBackend::Avx512 => "avx512",
            SimdBackend::Neon => "neon",
        };
        write!(f, "{name} ({} lanes)", self.lane_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detected_backend_maps_to_supported_width() {
        let backend = SimdBackend::detect();
        assert!(matches!(backend.lane_count(), 4 | 8 | 16));
    }
}

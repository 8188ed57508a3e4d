//! Chebyshev (L∞) distance with SIMD optimization
//!
//! The AVX2 reduction is a lane-wise max followed by a horizontal max;
//! the scalar tail is folded into the result afterwards.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Compute Chebyshev distance (maximum coordinate difference) between two
/// f32 vectors.
///
/// Vectors must have equal length; checked in debug builds only.
#[inline]
pub fn chebyshev_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        unsafe { chebyshev_avx2(a, b) }
    }

    #[cfg(all(target_arch = "x86_64", not(target_feature = "avx2")))]
    {
        if is_x86_feature_detected!("avx2") && a.len() >= 8 {
            unsafe { chebyshev_avx2(a, b) }
        } else {
            chebyshev_scalar(a, b)
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        chebyshev_scalar(a, b)
    }
}

/// AVX2 lane-wise max of |x - y|, 8 lanes per iteration
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn chebyshev_avx2(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len();
    let chunks = n / 8;

    let abs_mask = _mm256_castsi256_ps(_mm256_set1_epi32(0x7FFF_FFFF));
    let mut max_vec = _mm256_setzero_ps();

    for i in 0..chunks {
        let offset = i * 8;
        let a_vec = _mm256_loadu_ps(a.as_ptr().add(offset));
        let b_vec = _mm256_loadu_ps(b.as_ptr().add(offset));

        let diff = _mm256_and_ps(_mm256_sub_ps(a_vec, b_vec), abs_mask);
        max_vec = _mm256_max_ps(max_vec, diff);
    }

    let mut lanes = [0.0f32; 8];
    _mm256_storeu_ps(lanes.as_mut_ptr(), max_vec);
    let mut max_distance = lanes[0];
    for &lane in &lanes[1..] {
        max_distance = max_distance.max(lane);
    }

    for i in (chunks * 8)..n {
        max_distance = max_distance.max((a[i] - b[i]).abs());
    }

    max_distance
}

/// Scalar reference version
pub(crate) fn chebyshev_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut max_distance = 0.0f32;
    for i in 0..a.len() {
        let diff = (a[i] - b[i]).abs();
        if diff > max_distance {
            max_distance = diff;
        }
    }
    max_distance
}

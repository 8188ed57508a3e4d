//! Manhattan (L1) distance with SIMD optimization
//!
//! Absolute values are taken by masking the sign bit, so the AVX2 path
//! never pays for a compare-and-select per lane.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Compute Manhattan distance between two f32 vectors.
///
/// Vectors must have equal length; checked in debug builds only.
#[inline]
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        unsafe { manhattan_avx2(a, b) }
    }

    #[cfg(all(target_arch = "x86_64", not(target_feature = "avx2")))]
    {
        if is_x86_feature_detected!("avx2") && a.len() >= 8 {
            unsafe { manhattan_avx2(a, b) }
        } else {
            manhattan_scalar(a, b)
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        manhattan_scalar(a, b)
    }
}

/// AVX2 sum of |x - y|, 8 lanes per iteration
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn manhattan_avx2(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len();
    let chunks = n / 8;

    // clearing the sign bit yields the absolute value
    let abs_mask = _mm256_castsi256_ps(_mm256_set1_epi32(0x7FFF_FFFF));
    let mut sum_vec = _mm256_setzero_ps();

    for i in 0..chunks {
        let offset = i * 8;
        let a_vec = _mm256_loadu_ps(a.as_ptr().add(offset));
        let b_vec = _mm256_loadu_ps(b.as_ptr().add(offset));

        let diff = _mm256_sub_ps(a_vec, b_vec);
        sum_vec = _mm256_add_ps(sum_vec, _mm256_and_ps(diff, abs_mask));
    }

    let mut lanes = [0.0f32; 8];
    _mm256_storeu_ps(lanes.as_mut_ptr(), sum_vec);
    let mut total = lanes.iter().sum::<f32>();

    for i in (chunks * 8)..n {
        total += (a[i] - b[i]).abs();
    }

    total
}

/// Scalar reference version
pub(crate) fn manhattan_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut total = 0.0f32;
    for i in 0..a.len() {
        total += (a[i] - b[i]).abs();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_known_distance() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![4.0f32, 0.0, 3.5];
        assert!((manhattan_distance(&a, &b) - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_symmetry() {
        let a = vec![0.2f32, -1.0, 4.5, 0.0, 3.25];
        let b = vec![-0.5f32, 2.0, 4.5, 1.0, -3.0];
        assert_eq!(manhattan_distance(&a, &b), manhattan_distance(&b, &a));
    }

    #[test]
    fn test_simd_matches_scalar() {
        let mut rng = StdRng::seed_from_u64(19);
        for dim in 1..=67 {
            let a: Vec<f32> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let b: Vec<f32> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let fast = manhattan_distance(&a, &b);
            let reference = manhattan_scalar(&a, &b);
            let tolerance = 1e-5 * reference.max(1.0);
            assert!(
                (fast - reference).abs() <= tolerance,
                "dim {}: {} vs {}",
                dim,
                fast,
                reference
            );
        }
    }
}

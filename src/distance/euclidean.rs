//! Euclidean (L2) distance with SIMD optimization
//!
//! Single-precision and double-precision kernels. The AVX2 paths process
//! 8 floats (or 4 doubles) per iteration; remainders fall through to a
//! narrower SSE block or a scalar loop.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Compute Euclidean distance between two f32 vectors.
///
/// Vectors must have equal length; this is a caller-enforced precondition
/// and is only checked in debug builds.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        unsafe { euclidean_avx2(a, b) }
    }

    #[cfg(all(target_arch = "x86_64", not(target_feature = "avx2")))]
    {
        if is_x86_feature_detected!("avx2") && a.len() >= 8 {
            unsafe { euclidean_avx2(a, b) }
        } else if is_x86_feature_detected!("sse") && a.len() >= 4 {
            unsafe { euclidean_sse(a, b) }
        } else {
            euclidean_scalar(a, b)
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        euclidean_scalar(a, b)
    }
}

/// Compute Euclidean distance between two f64 vectors.
#[inline]
pub fn euclidean_distance_f64(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        unsafe { euclidean_f64_avx2(a, b) }
    }

    #[cfg(all(target_arch = "x86_64", not(target_feature = "avx2")))]
    {
        if is_x86_feature_detected!("avx2") && a.len() >= 4 {
            unsafe { euclidean_f64_avx2(a, b) }
        } else if is_x86_feature_detected!("sse2") && a.len() >= 2 {
            unsafe { euclidean_f64_sse2(a, b) }
        } else {
            euclidean_f64_scalar(a, b)
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        euclidean_f64_scalar(a, b)
    }
}

/// AVX2 squared-sum core, 8 lanes per iteration
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn euclidean_avx2(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len();
    let chunks = n / 8;

    let mut sum_vec = _mm256_setzero_ps();

    for i in 0..chunks {
        let offset = i * 8;
        let a_vec = _mm256_loadu_ps(a.as_ptr().add(offset));
        let b_vec = _mm256_loadu_ps(b.as_ptr().add(offset));

        let diff = _mm256_sub_ps(a_vec, b_vec);
        sum_vec = _mm256_add_ps(sum_vec, _mm256_mul_ps(diff, diff));
    }

    let mut sum_squared = horizontal_sum_avx2(sum_vec);

    for i in (chunks * 8)..n {
        let diff = a[i] - b[i];
        sum_squared += diff * diff;
    }

    sum_squared.sqrt()
}

/// SSE squared-sum core, 4 lanes per iteration
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse")]
unsafe fn euclidean_sse(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len();
    let chunks = n / 4;

    let mut sum_vec = _mm_setzero_ps();

    for i in 0..chunks {
        let offset = i * 4;
        let a_vec = _mm_loadu_ps(a.as_ptr().add(offset));
        let b_vec = _mm_loadu_ps(b.as_ptr().add(offset));

        let diff = _mm_sub_ps(a_vec, b_vec);
        sum_vec = _mm_add_ps(sum_vec, _mm_mul_ps(diff, diff));
    }

    let mut sum_squared = horizontal_sum_sse(sum_vec);

    for i in (chunks * 4)..n {
        let diff = a[i] - b[i];
        sum_squared += diff * diff;
    }

    sum_squared.sqrt()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn euclidean_f64_avx2(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    let chunks = n / 4;

    let mut sum_vec = _mm256_setzero_pd();

    for i in 0..chunks {
        let offset = i * 4;
        let a_vec = _mm256_loadu_pd(a.as_ptr().add(offset));
        let b_vec = _mm256_loadu_pd(b.as_ptr().add(offset));

        let diff = _mm256_sub_pd(a_vec, b_vec);
        sum_vec = _mm256_add_pd(sum_vec, _mm256_mul_pd(diff, diff));
    }

    let mut sum_squared = horizontal_sum_f64_avx2(sum_vec);

    for i in (chunks * 4)..n {
        let diff = a[i] - b[i];
        sum_squared += diff * diff;
    }

    sum_squared.sqrt()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn euclidean_f64_sse2(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    let chunks = n / 2;

    let mut sum_vec = _mm_setzero_pd();

    for i in 0..chunks {
        let offset = i * 2;
        let a_vec = _mm_loadu_pd(a.as_ptr().add(offset));
        let b_vec = _mm_loadu_pd(b.as_ptr().add(offset));

        let diff = _mm_sub_pd(a_vec, b_vec);
        sum_vec = _mm_add_pd(sum_vec, _mm_mul_pd(diff, diff));
    }

    let high = _mm_unpackhi_pd(sum_vec, sum_vec);
    let mut sum_squared = _mm_cvtsd_f64(_mm_add_sd(sum_vec, high));

    if n % 2 == 1 {
        let diff = a[n - 1] - b[n - 1];
        sum_squared += diff * diff;
    }

    sum_squared.sqrt()
}

/// Scalar reference version
pub(crate) fn euclidean_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut sum_squared = 0.0f32;
    for i in 0..a.len() {
        let diff = a[i] - b[i];
        sum_squared += diff * diff;
    }
    sum_squared.sqrt()
}

/// Scalar reference version (f64)
pub(crate) fn euclidean_f64_scalar(a: &[f64], b: &[f64]) -> f64 {
    let mut sum_squared = 0.0f64;
    for i in 0..a.len() {
        let diff = a[i] - b[i];
        sum_squared += diff * diff;
    }
    sum_squared.sqrt()
}

/// Reduce an AVX2 register to the sum of its 8 lanes
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn horizontal_sum_avx2(v: __m256) -> f32 {
    let high = _mm256_extractf128_ps(v, 1);
    let low = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(high, low);

    let shuf = _mm_movehdup_ps(sum128);
    let sum64 = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(shuf, sum64);
    let sum32 = _mm_add_ss(sum64, shuf2);

    _mm_cvtss_f32(sum32)
}

/// Reduce an SSE register to the sum of its 4 lanes
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse")]
#[inline]
unsafe fn horizontal_sum_sse(v: __m128) -> f32 {
    let shuf = _mm_movehdup_ps(v);
    let sum64 = _mm_add_ps(v, shuf);
    let shuf2 = _mm_movehl_ps(shuf, sum64);
    let sum32 = _mm_add_ss(sum64, shuf2);

    _mm_cvtss_f32(sum32)
}

/// Reduce an AVX2 double register to the sum of its 4 lanes
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn horizontal_sum_f64_avx2(v: __m256d) -> f64 {
    let low = _mm256_castpd256_pd128(v);
    let high = _mm256_extractf128_pd(v, 1);
    let sum128 = _mm_add_pd(low, high);

    let high64 = _mm_unpackhi_pd(sum128, sum128);
    _mm_cvtsd_f64(_mm_add_sd(sum128, high64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_known_distance() {
        let a = vec![0.0f32, 0.0, 0.0];
        let b = vec![3.0f32, 4.0, 0.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_and_symmetry() {
        let a = vec![1.5f32, -2.0, 0.25, 7.0];
        let b = vec![0.5f32, 3.0, -1.25, 2.0];
        assert_eq!(euclidean_distance(&a, &a), 0.0);
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn test_simd_matches_scalar_f32() {
        let mut rng = StdRng::seed_from_u64(7);
        // cover vector tails of every length mod 8
        for dim in 1..=67 {
            let a: Vec<f32> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let b: Vec<f32> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let fast = euclidean_distance(&a, &b);
            let reference = euclidean_scalar(&a, &b);
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

    #[test]
    fn test_simd_matches_scalar_f64() {
        let mut rng = StdRng::seed_from_u64(11);
        for dim in 1..=35 {
            let a: Vec<f64> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let b: Vec<f64> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let fast = euclidean_distance_f64(&a, &b);
            let reference = euclidean_f64_scalar(&a, &b);
            let tolerance = 1e-12 * reference.max(1.0);
            assert!(
                (fast - reference).abs() <= tolerance,
                "dim {}: {} vs {}",
                dim,
                fast,
                reference
            );
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_explicit_simd_paths() {
        let mut rng = StdRng::seed_from_u64(13);
        let a: Vec<f32> = (0..29).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let b: Vec<f32> = (0..29).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let reference = euclidean_scalar(&a, &b);
        if is_x86_feature_detected!("avx2") {
            let fast = unsafe { euclidean_avx2(&a, &b) };
            assert!((fast - reference).abs() <= 1e-5 * reference.max(1.0));
        }
        if is_x86_feature_detected!("sse") {
            let fast = unsafe { euclidean_sse(&a, &b) };
            assert!((fast - reference).abs() <= 1e-5 * reference.max(1.0));
        }
    }
}

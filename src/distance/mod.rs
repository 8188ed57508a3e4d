//! Distance metrics for nearest-neighbor search
//!
//! Each metric is a unit struct implementing [`VectorMetric`], so indexes
//! monomorphize over the metric and the kernel call inlines into the hot
//! path. Float metrics come in scalar and SIMD variants (see the kernel
//! modules); Hamming metrics are popcount-based and signed, as required
//! by BK-tree pruning arithmetic.

pub mod chebyshev;
pub mod euclidean;
pub mod hamming;
pub mod manhattan;

pub use chebyshev::chebyshev_distance;
pub use euclidean::{euclidean_distance, euclidean_distance_f64};
pub use hamming::{
    hamming_128, hamming_256, hamming_512, hamming_64, hamming_distance,
    hamming_distance_bounded,
};
pub use manhattan::manhattan_distance;

/// Distance value produced by a metric.
///
/// `to_radius`/`from_radius` define the f32 encoding used by the persisted
/// partition format, which stores every radius as a 32-bit float. All
/// distance types used here round-trip losslessly for the values they can
/// take as a partition radius (Hamming distances never exceed the key
/// width in bits).
pub trait Distance:
    Copy + PartialOrd + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Self> + 'static
{
    const ZERO: Self;
    const MAX: Self;

    fn to_radius(self) -> f32;
    fn from_radius(radius: f32) -> Self;
}

impl Distance for f32 {
    const ZERO: Self = 0.0;
    const MAX: Self = f32::MAX;

    #[inline]
    fn to_radius(self) -> f32 {
        self
    }

    #[inline]
    fn from_radius(radius: f32) -> Self {
        radius
    }
}

impl Distance for f64 {
    const ZERO: Self = 0.0;
    const MAX: Self = f64::MAX;

    #[inline]
    fn to_radius(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_radius(radius: f32) -> Self {
        radius as f64
    }
}

impl Distance for i64 {
    const ZERO: Self = 0;
    const MAX: Self = i64::MAX;

    #[inline]
    fn to_radius(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_radius(radius: f32) -> Self {
        radius as i64
    }
}

/// A metric over fixed-dimension vectors of element type `T`.
///
/// Implementors are zero-sized marker types; indexes take the metric as a
/// type parameter and call through `M::distance`, which monomorphizes to a
/// direct kernel call. Equal lengths are a caller-enforced precondition.
pub trait VectorMetric<T>: Send + Sync + 'static {
    type Dist: Distance;

    /// Key width in elements for metrics that only accept one
    /// (e.g. Hamming-256 keys are exactly 32 bytes). `None` means any
    /// uniform dimension is accepted.
    const FIXED_DIMENSION: Option<usize> = None;

    fn distance(a: &[T], b: &[T]) -> Self::Dist;
}

/// A signed integral metric usable by BK-tree threshold search.
///
/// `threshold_distance` may give up early: once a partial accumulation
/// exceeds `cutoff` the exact value can no longer matter, and the metric
/// is allowed to return `None` instead of finishing the computation.
pub trait ThresholdMetric<T>: VectorMetric<T, Dist = i64> {
    #[inline]
    fn threshold_distance(a: &[T], b: &[T], cutoff: i64) -> Option<i64> {
        let _ = cutoff;
        Some(Self::distance(a, b))
    }
}

/// Euclidean (L2) metric over f32 vectors
#[derive(Debug, Clone, Copy)]
pub struct Euclidean;

impl VectorMetric<f32> for Euclidean {
    type Dist = f32;

    #[inline]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        euclidean_distance(a, b)
    }
}

/// Euclidean (L2) metric over f64 vectors
#[derive(Debug, Clone, Copy)]
pub struct EuclideanF64;

impl VectorMetric<f64> for EuclideanF64 {
    type Dist = f64;

    #[inline]
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        euclidean_distance_f64(a, b)
    }
}

/// Manhattan (L1) metric over f32 vectors
#[derive(Debug, Clone, Copy)]
pub struct Manhattan;

impl VectorMetric<f32> for Manhattan {
    type Dist = f32;

    #[inline]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        manhattan_distance(a, b)
    }
}

/// Chebyshev (L∞) metric over f32 vectors
#[derive(Debug, Clone, Copy)]
pub struct Chebyshev;

impl VectorMetric<f32> for Chebyshev {
    type Dist = f32;

    #[inline]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        chebyshev_distance(a, b)
    }
}

/// Hamming metric over 64-bit (8-byte) keys
#[derive(Debug, Clone, Copy)]
pub struct Hamming64;

impl VectorMetric<u8> for Hamming64 {
    type Dist = i64;
    const FIXED_DIMENSION: Option<usize> = Some(8);

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> i64 {
        hamming_64(a, b)
    }
}

impl ThresholdMetric<u8> for Hamming64 {}

/// Hamming metric over 128-bit (16-byte) keys
#[derive(Debug, Clone, Copy)]
pub struct Hamming128;

impl VectorMetric<u8> for Hamming128 {
    type Dist = i64;
    const FIXED_DIMENSION: Option<usize> = Some(16);

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> i64 {
        hamming_128(a, b)
    }
}

impl ThresholdMetric<u8> for Hamming128 {}

/// Hamming metric over 256-bit (32-byte) keys
#[derive(Debug, Clone, Copy)]
pub struct Hamming256;

impl VectorMetric<u8> for Hamming256 {
    type Dist = i64;
    const FIXED_DIMENSION: Option<usize> = Some(32);

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> i64 {
        hamming_256(a, b)
    }
}

impl ThresholdMetric<u8> for Hamming256 {}

/// Hamming metric over 512-bit (64-byte) keys
#[derive(Debug, Clone, Copy)]
pub struct Hamming512;

impl VectorMetric<u8> for Hamming512 {
    type Dist = i64;
    const FIXED_DIMENSION: Option<usize> = Some(64);

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> i64 {
        hamming_512(a, b)
    }
}

impl ThresholdMetric<u8> for Hamming512 {}

/// Hamming metric over keys of any uniform byte length
#[derive(Debug, Clone, Copy)]
pub struct Hamming;

impl VectorMetric<u8> for Hamming {
    type Dist = i64;

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> i64 {
        hamming_distance(a, b)
    }
}

impl ThresholdMetric<u8> for Hamming {
    #[inline]
    fn threshold_distance(a: &[u8], b: &[u8], cutoff: i64) -> Option<i64> {
        hamming_distance_bounded(a, b, cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_metric() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![4.0f32, 5.0, 6.0];
        let dist = Euclidean::distance(&a, &b);
        assert!((dist - 5.196152).abs() < 0.001);
    }

    #[test]
    fn test_manhattan_metric() {
        let a = vec![1.0f32, 2.0];
        let b = vec![2.0f32, 0.0];
        assert!((Manhattan::distance(&a, &b) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_chebyshev_metric() {
        let a = vec![1.0f32, 2.0];
        let b = vec![2.0f32, 0.0];
        assert!((Chebyshev::distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_hamming_metric_triangle_inequality() {
        let a: Vec<u8> = (0..32).map(|i| i as u8).collect();
        let b: Vec<u8> = (0..32).map(|i| (i * 3) as u8).collect();
        let c: Vec<u8> = (0..32).map(|i| (255 - i) as u8).collect();
        let ab = Hamming256::distance(&a, &b);
        let bc = Hamming256::distance(&b, &c);
        let ac = Hamming256::distance(&a, &c);
        assert!(ac <= ab + bc);
    }

    #[test]
    fn test_threshold_metric_default_ignores_cutoff() {
        let a = vec![255u8; 32];
        let b = vec![0u8; 32];
        // fixed-width metrics always compute the exact distance
        assert_eq!(Hamming256::threshold_distance(&a, &b, 1), Some(256));
        // the generic metric bails out early
        assert_eq!(Hamming::threshold_distance(&a, &b, 1), None);
    }

    #[test]
    fn test_radius_round_trip() {
        assert_eq!(<i64 as Distance>::from_radius(512f32.to_radius()), 512);
        let r: f32 = 1.25;
        assert_eq!(f32::from_radius(r.to_radius()), 1.25);
        let d: f64 = 2.5;
        assert_eq!(f64::from_radius(Distance::to_radius(d)), 2.5);
    }
}

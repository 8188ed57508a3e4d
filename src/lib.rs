//! neartree — exact metric nearest-neighbor indexes
//!
//! In-memory indexes that accelerate nearest-neighbor queries over large
//! batches of fixed-dimension vectors:
//!
//! - **VP tree** ([`VpTree`]): binary space partitioning over an
//!   arbitrary metric; batch kNN and optimized 1NN. Immutable once built.
//! - **BK tree** ([`BkTree`], [`IndexedBkTree`]): distance-keyed tree
//!   over a signed integral metric (typically Hamming); threshold
//!   queries with triangle-inequality pruning. Mutable.
//!
//! Distance kernels (L2 f32/f64, L1, Chebyshev, popcount Hamming) carry
//! scalar references plus SSE/AVX2 variants selected at build or run
//! time. Batch queries fan out one rayon task per query; results stay
//! positionally aligned with the input batch.
//!
//! ## Persisted format
//!
//! A VP tree serializes to a little-endian blob sealed by a CRC32
//! checksum, transported as a `(Vec<u8>, u32)` pair:
//!
//! ```text
//! [examples: u64 count | u64 dimension | count * dimension * T]
//! [indices:  u64 count | count * i64]
//! [partitions, pre-order: repeat { f32 radius | i64 start | i64 end }]
//! ```
//!
//! An absent child is the sentinel `(0.0, -1, -1)`; an empty index is an
//! empty blob. Builds are deterministic for a fixed seed, so the same
//! data always produces a bit-identical blob.
//!
//! ## Example
//!
//! ```
//! use neartree::{VpTreeL2Index, Result};
//!
//! fn main() -> Result<()> {
//!     let mut index = VpTreeL2Index::new();
//!     index.set(&[
//!         vec![0.0, 0.0],
//!         vec![1.0, 0.0],
//!         vec![0.0, 3.0],
//!     ])?;
//!
//!     let (indices, distances) = index.search_1nn(&[vec![0.9, 0.1]])?;
//!     assert_eq!(indices, vec![1]);
//!     assert!(distances[0] < 0.2);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod distance;
pub mod index;
pub mod state;

mod error;

pub use error::{IndexError, Result};

pub use index::{
    BkTree, BkTreeBinaryIndex, BkTreeBinaryIndex128, BkTreeBinaryIndex256, BkTreeBinaryIndex512,
    BkTreeBinaryIndex64, IndexedBkTree, IndexedBkTreeBinaryIndex, IndexedBkTreeBinaryIndex128,
    IndexedBkTreeBinaryIndex256, IndexedBkTreeBinaryIndex512, IndexedBkTreeBinaryIndex64,
    IndexedThresholdMatches, KnnResult, ThresholdMatches, VpTree, VpTreeBinaryIndex,
    VpTreeBinaryIndex128, VpTreeBinaryIndex256, VpTreeBinaryIndex512, VpTreeBinaryIndex64,
    VpTreeChebyshevIndex, VpTreeL1Index, VpTreeL2Index, VpTreeL2IndexF64, VpTreeStats,
    DEFAULT_BUILD_SEED,
};

pub use state::SerializedState;

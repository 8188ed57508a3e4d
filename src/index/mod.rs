//! Index layer implementation
//!
//! Two index families over batches of fixed-dimension vectors:
//! vantage-point trees (arbitrary metric, kNN / 1NN) and
//! Burkhard–Keller trees (discrete metric, threshold search). Concrete
//! variants pair an element type with a metric; the named aliases below
//! cover the supported combinations.

pub mod bktree;
pub mod partition;
pub mod vptree;

pub use bktree::{BkTree, IndexedBkTree, IndexedThresholdMatches, ThresholdMatches};
pub use partition::VpPartition;
pub use vptree::{VpTree, VpTreeStats, DEFAULT_BUILD_SEED};

use crate::distance::{
    Chebyshev, Euclidean, EuclideanF64, Hamming, Hamming128, Hamming256, Hamming512, Hamming64,
    Manhattan,
};

/// One query's k-nearest-neighbor hits, as parallel arrays.
///
/// Entries arrive in max-heap pop order (largest distance first); sort by
/// distance if you need ascending order.
#[derive(Debug, Clone)]
pub struct KnnResult<D> {
    pub indices: Vec<i64>,
    pub distances: Vec<D>,
}

impl<D> KnnResult<D> {
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            distances: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// VP tree variants over float vectors
pub type VpTreeL2Index = VpTree<f32, Euclidean>;
pub type VpTreeL2IndexF64 = VpTree<f64, EuclideanF64>;
pub type VpTreeL1Index = VpTree<f32, Manhattan>;
pub type VpTreeChebyshevIndex = VpTree<f32, Chebyshev>;

// VP tree variants over fixed-width binary keys
pub type VpTreeBinaryIndex64 = VpTree<u8, Hamming64>;
pub type VpTreeBinaryIndex128 = VpTree<u8, Hamming128>;
pub type VpTreeBinaryIndex256 = VpTree<u8, Hamming256>;
pub type VpTreeBinaryIndex512 = VpTree<u8, Hamming512>;
/// Arbitrary-width binary fallback.
pub type VpTreeBinaryIndex = VpTree<u8, Hamming>;

// BK tree variants (deduplicating)
pub type BkTreeBinaryIndex64 = BkTree<u8, Hamming64>;
pub type BkTreeBinaryIndex128 = BkTree<u8, Hamming128>;
pub type BkTreeBinaryIndex256 = BkTree<u8, Hamming256>;
pub type BkTreeBinaryIndex512 = BkTree<u8, Hamming512>;
pub type BkTreeBinaryIndex = BkTree<u8, Hamming>;

// BK tree variants (every insertion indexed)
pub type IndexedBkTreeBinaryIndex64 = IndexedBkTree<u8, Hamming64>;
pub type IndexedBkTreeBinaryIndex128 = IndexedBkTree<u8, Hamming128>;
pub type IndexedBkTreeBinaryIndex256 = IndexedBkTree<u8, Hamming256>;
pub type IndexedBkTreeBinaryIndex512 = IndexedBkTree<u8, Hamming512>;
pub type IndexedBkTreeBinaryIndex = IndexedBkTree<u8, Hamming>;

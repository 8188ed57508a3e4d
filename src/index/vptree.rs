//! Vantage-point tree index
//!
//! Exact metric nearest-neighbor index over a batch of fixed-dimension
//! vectors. The build reorders an index permutation (never the examples
//! themselves) with an iterative median split: each partition picks a
//! random vantage point, quickselects the median distance to it, and
//! recurses into the inside/outside halves. Searches walk the tree
//! depth-first with an explicit stack, recording the distance to a
//! partition border at push time and re-checking it against the current
//! search radius at pop time, so a partition scheduled early can still be
//! rejected after the radius has tightened.
//!
//! The index is immutable once built. Batch queries fan out one rayon
//! task per query; results stay positionally aligned with the input.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::distance::{Distance, VectorMetric};
use crate::error::{IndexError, Result};
use crate::state::{vectors, Scalar, SerializedState, StateReader, StateWriter};

use super::partition::VpPartition;
use super::KnnResult;

/// Build seed used by [`VpTree::new`]. Identical data always builds an
/// identical tree; pass a different seed through [`VpTree::with_seed`] to
/// vary vantage-point selection.
pub const DEFAULT_BUILD_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Structural statistics of a built index.
#[derive(Debug, Clone, Serialize)]
pub struct VpTreeStats {
    pub num_points: usize,
    pub dimension: usize,
    pub height: usize,
    pub num_partitions: usize,
    /// Approximate resident bytes: examples, indices and partition nodes.
    pub memory_bytes: usize,
}

/// Vantage-point tree over vectors of `T`, parameterized by the metric.
pub struct VpTree<T: Scalar, M: VectorMetric<T>> {
    examples: Vec<Vec<T>>,
    indices: Vec<i64>,
    root: Option<Box<VpPartition<M::Dist>>>,
    dimension: usize,
    seed: u64,
    _metric: PhantomData<M>,
}

/// Bounded max-heap entry for kNN; the largest distance sits on top.
struct HeapItem<D> {
    index: i64,
    dist: D,
}

impl<D: Distance> PartialEq for HeapItem<D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: Distance> Eq for HeapItem<D> {}

impl<D: Distance> PartialOrd for HeapItem<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Distance> Ord for HeapItem<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl<T: Scalar, M: VectorMetric<T>> VpTree<T, M> {
    /// Create an empty index with the default build seed.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_BUILD_SEED)
    }

    /// Create an empty index with an explicit build seed. The seed only
    /// affects vantage-point selection; any seed yields a correct tree.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            examples: Vec::new(),
            indices: Vec::new(),
            root: None,
            dimension: 0,
            seed,
            _metric: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Dimension of the indexed vectors, if any are present.
    pub fn dimension(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.dimension)
        }
    }

    /// Drop the tree and the stored examples.
    pub fn clear(&mut self) {
        self.examples = Vec::new();
        self.indices = Vec::new();
        self.root = None;
        self.dimension = 0;
    }

    /// Replace the index contents with a new batch.
    ///
    /// The batch is validated and built into a staging tree first, so on
    /// error the index is left exactly as it was. An empty batch clears
    /// the index.
    pub fn set(&mut self, batch: &[Vec<T>]) -> Result<()> {
        if batch.is_empty() {
            self.clear();
            return Ok(());
        }

        let dimension = batch[0].len();
        if let Some(required) = M::FIXED_DIMENSION {
            if dimension != required {
                return Err(IndexError::DimensionMismatch {
                    expected: required,
                    got: dimension,
                });
            }
        }
        for row in batch {
            if row.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    got: row.len(),
                });
            }
        }

        let examples = batch.to_vec();
        let mut indices: Vec<i64> = (0..examples.len() as i64).collect();
        let root = Self::build(&examples, &mut indices, self.seed);

        self.examples = examples;
        self.indices = indices;
        self.root = root;
        self.dimension = dimension;
        Ok(())
    }

    /// Search the k nearest neighbors of every query.
    ///
    /// Each result carries exactly `min(k, len)` entries in max-heap pop
    /// order (largest distance first); sort if you need ascending.
    pub fn search_knn(&self, queries: &[Vec<T>], k: usize) -> Result<Vec<KnnResult<M::Dist>>> {
        let root = self.root.as_deref().ok_or(IndexError::NotInitialized)?;
        self.check_query_dimensions(queries)?;

        if k == 0 {
            return Ok(queries.iter().map(|_| KnnResult::empty()).collect());
        }

        Ok(queries
            .par_iter()
            .map(|query| self.knn_single(root, query, k))
            .collect())
    }

    /// Optimized batch 1NN: per query, the single nearest `(index,
    /// distance)` pair, positionally aligned with the batch.
    pub fn search_1nn(&self, queries: &[Vec<T>]) -> Result<(Vec<i64>, Vec<M::Dist>)> {
        let root = self.root.as_deref().ok_or(IndexError::NotInitialized)?;
        self.check_query_dimensions(queries)?;

        Ok(queries
            .par_iter()
            .map(|query| self.nn_single(root, query))
            .unzip())
    }

    /// Structural statistics of the built tree.
    pub fn stats(&self) -> VpTreeStats {
        let num_partitions = self.root.as_ref().map_or(0, |root| root.num_subnodes());
        VpTreeStats {
            num_points: self.examples.len(),
            dimension: self.dimension,
            height: self.root.as_ref().map_or(0, |root| root.height()),
            num_partitions,
            memory_bytes: self.examples.len() * self.dimension * std::mem::size_of::<T>()
                + self.indices.len() * std::mem::size_of::<i64>()
                + num_partitions * std::mem::size_of::<VpPartition<M::Dist>>(),
        }
    }

    /// Serialize the full index. An empty index produces an empty blob.
    pub fn serialize(&self) -> SerializedState {
        let mut state = SerializedState::new();
        if let Some(root) = &self.root {
            let mut writer = StateWriter::new(&mut state);
            vectors::write_ndarray(&mut writer, &self.examples);
            vectors::write_flat(&mut writer, &self.indices);
            root.write_preorder(&mut writer);
            writer.finish();
        }
        state
    }

    /// Rebuild an index from a serialized blob.
    ///
    /// The checksum is validated before anything is decoded; a mismatch
    /// is [`IndexError::Corrupt`]. Structural damage that survives the
    /// checksum (out-of-range indices) indicates a writer bug and
    /// panics.
    pub fn deserialize(state: &SerializedState) -> Result<Self> {
        if !state.is_valid() {
            return Err(IndexError::Corrupt(format!(
                "checksum mismatch: blob stamped {:#010x}",
                state.checksum()
            )));
        }
        if state.is_empty() {
            return Ok(Self::new());
        }

        let mut reader = StateReader::new(state);
        let examples: Vec<Vec<T>> = vectors::read_ndarray(&mut reader)?;
        let indices: Vec<i64> = vectors::read_flat(&mut reader)?;
        let root = VpPartition::read_preorder(&mut reader)?;
        if !reader.is_empty() {
            return Err(IndexError::Malformed(format!(
                "{} trailing bytes after the partition tree",
                reader.remaining()
            )));
        }

        let root = match root {
            Some(root) => root,
            None => {
                return Err(IndexError::Corrupt(
                    "non-empty blob carries no root partition".into(),
                ))
            }
        };

        let n = examples.len();
        assert_eq!(
            indices.len(),
            n,
            "serialized index permutation does not cover the example list"
        );
        for &index in &indices {
            assert!(
                index >= 0 && (index as usize) < n,
                "serialized index {} out of range for {} examples",
                index,
                n
            );
        }

        let dimension = examples[0].len();
        Ok(Self {
            examples,
            indices,
            root: Some(root),
            dimension,
            seed: DEFAULT_BUILD_SEED,
            _metric: PhantomData,
        })
    }

    fn check_query_dimensions(&self, queries: &[Vec<T>]) -> Result<()> {
        for query in queries {
            if query.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    got: query.len(),
                });
            }
        }
        Ok(())
    }

    /// Iterative median-split build. Only `indices` is reordered; the
    /// example list keeps its original order so results can report the
    /// caller's indices.
    fn build(
        examples: &[Vec<T>],
        indices: &mut [i64],
        seed: u64,
    ) -> Option<Box<VpPartition<M::Dist>>> {
        if examples.is_empty() {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut root: Option<Box<VpPartition<M::Dist>>> = None;
        let end = examples.len() as i64 - 1;

        let mut to_split: Vec<(i64, i64, &mut Option<Box<VpPartition<M::Dist>>>)> =
            vec![(0, end, &mut root)];

        while let Some((start, end, slot)) = to_split.pop() {
            let node = slot.insert(Box::new(VpPartition::new(M::Dist::ZERO, start, end)));
            if start == end {
                // single point, nothing left to divide
                continue;
            }

            let vantage_at = rng.gen_range(start..=end);
            indices.swap(vantage_at as usize, start as usize);

            let median = (start + end) / 2;

            // Quickselect the median distance to the vantage point within
            // (start, end]; smaller distances end up left of the median
            // slot, larger ones right of it. A two-point partition has its
            // median on the vantage point itself and nothing to reorder.
            let vantage = &examples[indices[start as usize] as usize];
            if median > start {
                let nth = (median - start - 1) as usize;
                indices[(start + 1) as usize..=end as usize].select_nth_unstable_by(
                    nth,
                    |&a, &b| {
                        let da = M::distance(vantage, &examples[a as usize]);
                        let db = M::distance(vantage, &examples[b as usize]);
                        da.partial_cmp(&db).unwrap_or(Ordering::Equal)
                    },
                );
            }

            let radius = M::distance(vantage, &examples[indices[median as usize] as usize]);
            node.set_radius(radius);

            let (left_slot, right_slot) = node.child_slots();
            if median + 1 <= end {
                to_split.push((median + 1, end, right_slot));
            }
            if start + 1 <= median {
                to_split.push((start + 1, median, left_slot));
            }
        }

        root
    }

    fn knn_single(
        &self,
        root: &VpPartition<M::Dist>,
        query: &[T],
        k: usize,
    ) -> KnnResult<M::Dist> {
        let mut heap: BinaryHeap<HeapItem<M::Dist>> = BinaryHeap::with_capacity(k + 1);
        let mut tau = M::Dist::MAX;

        // Pushed entries remember the distance to their partition border.
        // τ keeps shrinking during the DFS, so the recorded distance is
        // checked again at pop time; a partition scheduled earlier may
        // not be worth entering anymore. `None` marks partitions that
        // must be searched regardless.
        let mut to_search: Vec<(Option<M::Dist>, &VpPartition<M::Dist>)> = vec![(None, root)];

        while let Some((border, current)) = to_search.pop() {
            let vantage_index = self.indices[current.start() as usize];
            let dist = M::distance(query, &self.examples[vantage_index as usize]);

            if dist < tau || heap.len() < k {
                if heap.len() == k {
                    heap.pop();
                }
                heap.push(HeapItem {
                    index: vantage_index,
                    dist,
                });
                if let Some(top) = heap.peek() {
                    tau = top.dist;
                }
            }

            if let Some(border) = border {
                if border > tau {
                    // τ tightened since this partition was scheduled
                    continue;
                }
            }

            let neighbors_so_far = heap.len();
            if dist > current.radius() {
                // query is outside: the right (outside) child is searched
                // for sure, the left one only if it can still matter
                if let Some(left) = current.left() {
                    let outside_size = current.right().map_or(0, |r| r.size()) as usize;
                    let not_enough_outside = outside_size < k.saturating_sub(neighbors_so_far);
                    let to_border = dist - current.radius();

                    if not_enough_outside {
                        to_search.push((None, left));
                    } else if to_border <= tau {
                        to_search.push((Some(to_border), left));
                    }
                }
                if let Some(right) = current.right() {
                    to_search.push((None, right));
                }
            } else {
                // query is inside: mirror image of the outside case
                if let Some(right) = current.right() {
                    let inside_size = current.left().map_or(0, |l| l.size()) as usize;
                    let not_enough_inside = inside_size < k.saturating_sub(neighbors_so_far);
                    let to_border = current.radius() - dist;

                    if not_enough_inside {
                        to_search.push((None, right));
                    } else if to_border <= tau {
                        to_search.push((Some(to_border), right));
                    }
                }
                if let Some(left) = current.left() {
                    to_search.push((None, left));
                }
            }
        }

        let mut indices = Vec::with_capacity(heap.len());
        let mut distances = Vec::with_capacity(heap.len());
        while let Some(item) = heap.pop() {
            indices.push(item.index);
            distances.push(item.dist);
        }
        KnnResult { indices, distances }
    }

    fn nn_single(&self, root: &VpPartition<M::Dist>, query: &[T]) -> (i64, M::Dist) {
        let mut best_dist = M::Dist::MAX;
        let mut best_index = -1i64;

        let mut to_search: Vec<(Option<M::Dist>, &VpPartition<M::Dist>)> = vec![(None, root)];

        while let Some((border, current)) = to_search.pop() {
            let vantage_index = self.indices[current.start() as usize];
            let dist = M::distance(query, &self.examples[vantage_index as usize]);
            if dist < best_dist {
                best_dist = dist;
                best_index = vantage_index;
            }

            if let Some(border) = border {
                if border > best_dist {
                    continue;
                }
            }

            if dist > current.radius() {
                let to_border = dist - current.radius();
                if let Some(left) = current.left() {
                    if to_border < best_dist {
                        to_search.push((Some(to_border), left));
                    }
                }
                if let Some(right) = current.right() {
                    to_search.push((None, right));
                }
            } else {
                let to_border = current.radius() - dist;
                if let Some(right) = current.right() {
                    if to_border < best_dist {
                        to_search.push((Some(to_border), right));
                    }
                }
                if let Some(left) = current.left() {
                    to_search.push((None, left));
                }
            }
        }

        (best_index, best_dist)
    }
}

impl<T: Scalar, M: VectorMetric<T>> Default for VpTree<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, M: VectorMetric<T>> Clone for VpTree<T, M> {
    fn clone(&self) -> Self {
        Self {
            examples: self.examples.clone(),
            indices: self.indices.clone(),
            root: self.root.clone(),
            dimension: self.dimension,
            seed: self.seed,
            _metric: PhantomData,
        }
    }
}

impl<T: Scalar, M: VectorMetric<T>> fmt::Display for VpTree<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[VpTree]")?;
        writeln!(f, "num points: {}", self.examples.len())?;
        match &self.root {
            Some(root) => {
                writeln!(f, "dimension: {}", self.dimension)?;
                writeln!(f, "height: {}", root.height())?;
                writeln!(f, "num partitions: {}", root.num_subnodes())?;
                fmt_partition(f, root, 0)
            }
            None => writeln!(f, "<empty>"),
        }
    }
}

fn fmt_partition<D: Distance>(
    f: &mut fmt::Formatter<'_>,
    node: &VpPartition<D>,
    level: usize,
) -> fmt::Result {
    for _ in 0..level {
        write!(f, "....")?;
    }
    writeln!(
        f,
        "[{}, {}] radius {:?}",
        node.start(),
        node.end(),
        node.radius()
    )?;
    if let Some(left) = node.left() {
        fmt_partition(f, left, level + 1)?;
    }
    if let Some(right) = node.right() {
        fmt_partition(f, right, level + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Euclidean, Hamming256, Manhattan};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(rng: &mut StdRng, count: usize, dimension: usize) -> Vec<Vec<f32>> {
        (0..count)
            .map(|_| (0..dimension).map(|_| rng.gen_range(-10.0..10.0)).collect())
            .collect()
    }

    fn brute_force_knn(points: &[Vec<f32>], query: &[f32], k: usize) -> Vec<(i64, f32)> {
        let mut pairs: Vec<(i64, f32)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as i64, Euclidean::distance(p, query)))
            .collect();
        pairs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
        pairs.truncate(k);
        pairs
    }

    fn sorted_pairs(result: &KnnResult<f32>) -> Vec<(i64, f32)> {
        let mut pairs: Vec<(i64, f32)> = result
            .indices
            .iter()
            .copied()
            .zip(result.distances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
        pairs
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let points = random_points(&mut rng, 150, 4);
        let queries = random_points(&mut rng, 20, 4);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        for k in [1, 3, 10, 150] {
            let results = tree.search_knn(&queries, k).unwrap();
            for (query, result) in queries.iter().zip(&results) {
                assert_eq!(result.indices.len(), k.min(points.len()));
                assert_eq!(sorted_pairs(result), brute_force_knn(&points, query, k));
            }
        }
    }

    #[test]
    fn test_knn_k_larger_than_dataset() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = random_points(&mut rng, 7, 3);
        let queries = random_points(&mut rng, 4, 3);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let results = tree.search_knn(&queries, 50).unwrap();
        for result in &results {
            assert_eq!(result.indices.len(), 7);
        }
    }

    #[test]
    fn test_1nn_matches_knn_with_k_one() {
        let mut rng = StdRng::seed_from_u64(5);
        let points = random_points(&mut rng, 200, 6);
        let queries = random_points(&mut rng, 30, 6);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let (indices, distances) = tree.search_1nn(&queries).unwrap();
        let knn = tree.search_knn(&queries, 1).unwrap();

        for i in 0..queries.len() {
            assert_eq!(indices[i], knn[i].indices[0]);
            assert_eq!(distances[i], knn[i].distances[0]);
        }
    }

    #[test]
    fn test_batch_matches_single_queries() {
        let mut rng = StdRng::seed_from_u64(9);
        let points = random_points(&mut rng, 80, 5);
        let queries = random_points(&mut rng, 10, 5);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let batch = tree.search_knn(&queries, 5).unwrap();
        for (i, query) in queries.iter().enumerate() {
            let single = tree.search_knn(std::slice::from_ref(query), 5).unwrap();
            assert_eq!(sorted_pairs(&batch[i]), sorted_pairs(&single[0]));
        }
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let mut rng = StdRng::seed_from_u64(77);
        let points = random_points(&mut rng, 60, 4);
        let queries = random_points(&mut rng, 6, 4);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let first = tree.search_knn(&queries, 4).unwrap();
        let second = tree.search_knn(&queries, 4).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.indices, b.indices);
            assert_eq!(a.distances, b.distances);
        }
    }

    fn eight_dim_fixture() -> (Vec<Vec<f32>>, Vec<f32>) {
        let points = vec![
            vec![0.247, 0.110, 0.044, 0.376, 0.777, 0.384, 0.279, 0.444],
            vec![0.409, 0.072, 0.765, 0.105, 0.481, 0.790, 0.933, 0.583],
            vec![0.346, 0.511, 0.695, 0.242, 0.143, 0.495, 0.820, 0.832],
            vec![0.409, 0.907, 0.048, 0.421, 0.988, 0.621, 0.291, 0.298],
            vec![0.732, 0.720, 0.160, 0.691, 0.825, 0.208, 0.903, 0.029],
        ];
        let query = vec![0.530, 0.686, 0.427, 0.695, 0.469, 0.098, 0.852, 0.258];
        (points, query)
    }

    fn ascending_top3<M: VectorMetric<f32, Dist = f32>>(
        tree: &VpTree<f32, M>,
        query: &[f32],
    ) -> Vec<(i64, f32)> {
        let results = tree
            .search_knn(std::slice::from_ref(&query.to_vec()), 3)
            .unwrap();
        let mut pairs: Vec<(i64, f32)> = results[0]
            .indices
            .iter()
            .copied()
            .zip(results[0].distances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        pairs
    }

    #[test]
    fn test_manhattan_top3_scenario() {
        let (points, query) = eight_dim_fixture();
        let mut tree: VpTree<f32, Manhattan> = VpTree::new();
        tree.set(&points).unwrap();

        let pairs = ascending_top3(&tree, &query);
        assert_eq!(pairs.iter().map(|p| p.0).collect::<Vec<_>>(), vec![4, 2, 3]);
        let expected = [1.253, 2.409, 2.638];
        for (pair, want) in pairs.iter().zip(expected) {
            assert!(
                (pair.1 - want).abs() < 1e-2,
                "distance {} differs from {}",
                pair.1,
                want
            );
        }
    }

    #[test]
    fn test_euclidean_top3_scenario() {
        let (points, query) = eight_dim_fixture();
        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let pairs = ascending_top3(&tree, &query);
        assert_eq!(pairs.iter().map(|p| p.0).collect::<Vec<_>>(), vec![4, 2, 3]);
        let expected = [0.555, 0.967, 1.069];
        for (pair, want) in pairs.iter().zip(expected) {
            assert!(
                (pair.1 - want).abs() < 1e-2,
                "distance {} differs from {}",
                pair.1,
                want
            );
        }
    }

    #[test]
    fn test_empty_index_is_not_initialized() {
        let tree: VpTree<f32, Euclidean> = VpTree::new();
        let queries = vec![vec![0.0f32, 0.0, 0.0]];

        assert!(matches!(
            tree.search_1nn(&queries),
            Err(IndexError::NotInitialized)
        ));
        assert!(matches!(
            tree.search_knn(&queries, 3),
            Err(IndexError::NotInitialized)
        ));

        let mut cleared: VpTree<f32, Euclidean> = VpTree::new();
        cleared.set(&queries).unwrap();
        cleared.clear();
        assert!(matches!(
            cleared.search_knn(&queries, 1),
            Err(IndexError::NotInitialized)
        ));
    }

    #[test]
    fn test_set_rejects_ragged_batch() {
        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        let batch = vec![vec![1.0f32, 2.0], vec![3.0f32]];
        assert!(matches!(
            tree.set(&batch),
            Err(IndexError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = random_points(&mut rng, 10, 4);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let bad = vec![vec![0.0f32; 5]];
        assert!(matches!(
            tree.search_knn(&bad, 2),
            Err(IndexError::DimensionMismatch { expected: 4, got: 5 })
        ));
    }

    #[test]
    fn test_fixed_width_metric_rejects_other_widths() {
        let mut tree: VpTree<u8, Hamming256> = VpTree::new();
        let batch = vec![vec![0u8; 16]];
        assert!(matches!(
            tree.set(&batch),
            Err(IndexError::DimensionMismatch { expected: 32, got: 16 })
        ));
    }

    #[test]
    fn test_serialize_round_trip_answers_identically() {
        let mut rng = StdRng::seed_from_u64(1234);
        let points = random_points(&mut rng, 14001, 3);
        let queries = random_points(&mut rng, 100, 3);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let state = tree.serialize();
        assert!(state.is_valid());

        let restored = VpTree::<f32, Euclidean>::deserialize(&state).unwrap();

        let (indices_a, distances_a) = tree.search_1nn(&queries).unwrap();
        let (indices_b, distances_b) = restored.search_1nn(&queries).unwrap();
        assert_eq!(indices_a, indices_b);
        assert_eq!(distances_a, distances_b);
    }

    #[test]
    fn test_deserialize_rejects_bit_flip() {
        let mut rng = StdRng::seed_from_u64(8);
        let points = random_points(&mut rng, 50, 3);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let (mut data, checksum) = tree.serialize().into_parts();
        data[17] ^= 0x40;
        let tampered = SerializedState::from_parts(data, checksum);

        assert!(matches!(
            VpTree::<f32, Euclidean>::deserialize(&tampered),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn test_empty_round_trip() {
        let tree: VpTree<f32, Euclidean> = VpTree::new();
        let state = tree.serialize();
        assert!(state.is_empty());

        let restored = VpTree::<f32, Euclidean>::deserialize(&state).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_fixed_seed_builds_identical_blobs() {
        let mut rng = StdRng::seed_from_u64(31);
        let points = random_points(&mut rng, 500, 4);

        let mut first: VpTree<f32, Euclidean> = VpTree::with_seed(99);
        first.set(&points).unwrap();
        let mut second: VpTree<f32, Euclidean> = VpTree::with_seed(99);
        second.set(&points).unwrap();

        assert_eq!(first.serialize().into_parts(), second.serialize().into_parts());
    }

    #[test]
    fn test_clone_answers_identically() {
        let mut rng = StdRng::seed_from_u64(55);
        let points = random_points(&mut rng, 120, 3);
        let queries = random_points(&mut rng, 15, 3);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();
        let copy = tree.clone();

        let (indices_a, distances_a) = tree.search_1nn(&queries).unwrap();
        let (indices_b, distances_b) = copy.search_1nn(&queries).unwrap();
        assert_eq!(indices_a, indices_b);
        assert_eq!(distances_a, distances_b);
    }

    #[test]
    fn test_single_point_tree() {
        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&[vec![1.0f32, 2.0]]).unwrap();

        let (indices, distances) = tree.search_1nn(&[vec![0.0f32, 0.0]]).unwrap();
        assert_eq!(indices, vec![0]);
        assert!((distances[0] - 5.0f32.sqrt()).abs() < 1e-6);

        let results = tree.search_knn(&[vec![0.0f32, 0.0]], 3).unwrap();
        assert_eq!(results[0].indices, vec![0]);
    }

    #[test]
    fn test_duplicate_points_fill_k() {
        let points = vec![vec![1.0f32, 1.0]; 6];
        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let results = tree.search_knn(&[vec![1.0f32, 1.0]], 4).unwrap();
        assert_eq!(results[0].indices.len(), 4);
        for &dist in &results[0].distances {
            assert_eq!(dist, 0.0);
        }
    }

    #[test]
    fn test_k_zero_returns_empty_results() {
        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&[vec![0.0f32], vec![1.0f32]]).unwrap();

        let results = tree.search_knn(&[vec![0.5f32]], 0).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].indices.is_empty());
    }

    #[test]
    fn test_stats_and_display() {
        let mut rng = StdRng::seed_from_u64(2);
        let points = random_points(&mut rng, 33, 4);

        let mut tree: VpTree<f32, Euclidean> = VpTree::new();
        tree.set(&points).unwrap();

        let stats = tree.stats();
        assert_eq!(stats.num_points, 33);
        assert_eq!(stats.dimension, 4);
        assert_eq!(stats.num_partitions, 33);
        assert!(stats.height >= 6 && stats.height <= 33);
        assert!(stats.memory_bytes > 0);

        let dump = tree.to_string();
        assert!(dump.contains("num points: 33"));

        let empty: VpTree<f32, Euclidean> = VpTree::new();
        assert!(empty.to_string().contains("<empty>"));
    }
}

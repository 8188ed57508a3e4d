//! Burkhard–Keller tree index
//!
//! A BK tree keys its edges by discrete distance: every child of a node
//! sits at an exact metric distance from that node's key, so a threshold
//! query only needs to descend edges inside `[d - t, d + t]` (triangle
//! inequality). The metric must be signed integral — the lower band edge
//! goes negative for small `d`.
//!
//! Two concrete trees share one node structure:
//!
//! - [`BkTree`] deduplicates: inserting a key that is already stored is a
//!   no-op and `add` reports whether the key was new.
//! - [`IndexedBkTree`] stores every insertion and tags it with a
//!   monotonically assigned `i64` index, which `find` reports alongside
//!   each hit. Duplicate keys attach zero-distance children, so every
//!   insertion stays addressable by its own index.
//!
//! Unlike the VP tree, a BK tree is mutable; `&mut self` on the mutating
//! operations statically rules out a concurrent `find`.

use std::collections::VecDeque;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use rayon::prelude::*;

use crate::distance::ThresholdMetric;
use crate::error::{IndexError, Result};
use crate::state::Scalar;

struct BkNode<T> {
    key: Vec<T>,
    index: i64,
    children: BTreeMap<i64, BkNode<T>>,
    max_child_distance: Option<i64>,
}

impl<T: Scalar> BkNode<T> {
    fn new(key: Vec<T>, index: i64) -> Self {
        Self {
            key,
            index,
            children: BTreeMap::new(),
            max_child_distance: None,
        }
    }

    fn add_child(&mut self, distance: i64, key: Vec<T>, index: i64) {
        self.children.insert(distance, BkNode::new(key, index));
        self.max_child_distance =
            Some(self.max_child_distance.map_or(distance, |max| max.max(distance)));
    }
}

/// Hits of a deduplicating threshold search, as parallel arrays.
#[derive(Debug, Clone)]
pub struct ThresholdMatches<T> {
    pub distances: Vec<i64>,
    pub keys: Vec<Vec<T>>,
}

impl<T> Default for ThresholdMatches<T> {
    fn default() -> Self {
        Self {
            distances: Vec::new(),
            keys: Vec::new(),
        }
    }
}

/// Hits of an indexed threshold search, as parallel arrays.
#[derive(Debug, Clone)]
pub struct IndexedThresholdMatches<T> {
    pub indices: Vec<i64>,
    pub distances: Vec<i64>,
    pub keys: Vec<Vec<T>>,
}

impl<T> Default for IndexedThresholdMatches<T> {
    fn default() -> Self {
        Self {
            indices: Vec::new(),
            distances: Vec::new(),
            keys: Vec::new(),
        }
    }
}

/// Walk candidates from the root, pruning by the triangle inequality.
///
/// `cutoff` hands the metric permission to stop early: a candidate whose
/// distance provably exceeds `max_child_distance + threshold` can emit
/// nothing and none of its children can be in band, so the exact value no
/// longer matters.
fn find_candidates<T, M, F>(root: Option<&BkNode<T>>, query: &[T], threshold: i64, mut emit: F)
where
    T: Scalar,
    M: ThresholdMetric<T>,
    F: FnMut(&BkNode<T>, i64),
{
    let root = match root {
        Some(root) => root,
        None => return,
    };

    let mut candidates: VecDeque<&BkNode<T>> = VecDeque::from([root]);
    while let Some(candidate) = candidates.pop_front() {
        let cutoff = candidate.max_child_distance.unwrap_or(0) + threshold;
        let dist = match M::threshold_distance(query, &candidate.key, cutoff) {
            Some(dist) => dist,
            None => continue,
        };

        if dist <= threshold {
            emit(candidate, dist);
        }

        // only children keyed within the band can contain a hit
        let lower = dist - threshold;
        let upper = dist + threshold;
        for child in candidate.children.range(lower..=upper).map(|(_, c)| c) {
            candidates.push_back(child);
        }
    }
}

fn collect_values<T: Scalar>(node: &BkNode<T>, out: &mut Vec<Vec<T>>) {
    out.push(node.key.clone());
    for child in node.children.values() {
        collect_values(child, out);
    }
}

fn check_key_dimension<T: Scalar>(root: &BkNode<T>, key: &[T]) -> Result<()> {
    if key.len() != root.key.len() {
        return Err(IndexError::DimensionMismatch {
            expected: root.key.len(),
            got: key.len(),
        });
    }
    Ok(())
}

fn check_threshold(threshold: i64) -> Result<()> {
    if threshold < 0 {
        return Err(IndexError::InvalidThreshold(threshold));
    }
    Ok(())
}

fn check_fixed_dimension<T: Scalar, M: ThresholdMetric<T>>(key: &[T]) -> Result<()> {
    if let Some(required) = M::FIXED_DIMENSION {
        if key.len() != required {
            return Err(IndexError::DimensionMismatch {
                expected: required,
                got: key.len(),
            });
        }
    }
    Ok(())
}

/// Deduplicating BK tree: each distinct key is stored once.
pub struct BkTree<T: Scalar, M: ThresholdMetric<T>> {
    root: Option<Box<BkNode<T>>>,
    size: usize,
    _metric: PhantomData<M>,
}

impl<T: Scalar, M: ThresholdMetric<T>> BkTree<T, M> {
    pub fn new() -> Self {
        Self {
            root: None,
            size: 0,
            _metric: PhantomData,
        }
    }

    /// Number of distinct keys stored.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
    }

    /// Insert a key; returns `true` iff the key was not already stored.
    pub fn add(&mut self, key: Vec<T>) -> Result<bool> {
        check_fixed_dimension::<T, M>(&key)?;
        let next_index = self.size as i64;

        match self.root {
            None => {
                self.root = Some(Box::new(BkNode::new(key, 0)));
                self.size = 1;
                Ok(true)
            }
            Some(ref mut root) => {
                check_key_dimension(root, &key)?;

                let mut node: &mut BkNode<T> = root;
                loop {
                    let dist = M::distance(&node.key, &key);
                    if dist == 0 {
                        // exact duplicate collapses onto the existing node
                        return Ok(false);
                    }
                    if !node.children.contains_key(&dist) {
                        node.add_child(dist, key, next_index);
                        break;
                    }
                    node = node
                        .children
                        .get_mut(&dist)
                        .expect("child edge checked above");
                }

                self.size += 1;
                Ok(true)
            }
        }
    }

    /// Bulk insertion; duplicates are silently skipped.
    pub fn update(&mut self, keys: &[Vec<T>]) -> Result<()> {
        for key in keys {
            self.add(key.clone())?;
        }
        Ok(())
    }

    /// All keys within `threshold` of `query`. An empty tree yields an
    /// empty match set.
    pub fn find(&self, query: &[T], threshold: i64) -> Result<ThresholdMatches<T>> {
        check_threshold(threshold)?;
        if let Some(root) = self.root.as_deref() {
            check_key_dimension(root, query)?;
        }

        let mut matches = ThresholdMatches::default();
        find_candidates::<T, M, _>(self.root.as_deref(), query, threshold, |node, dist| {
            matches.distances.push(dist);
            matches.keys.push(node.key.clone());
        });
        Ok(matches)
    }

    /// Threshold search over a query batch, one rayon task per query.
    pub fn find_batch(&self, queries: &[Vec<T>], threshold: i64) -> Result<Vec<ThresholdMatches<T>>> {
        check_threshold(threshold)?;
        queries
            .par_iter()
            .map(|query| self.find(query, threshold))
            .collect()
    }

    /// All stored keys in pre-order.
    pub fn values(&self) -> Vec<Vec<T>> {
        let mut out = Vec::with_capacity(self.size);
        if let Some(root) = self.root.as_deref() {
            collect_values(root, &mut out);
        }
        out
    }
}

impl<T: Scalar, M: ThresholdMetric<T>> Default for BkTree<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// BK tree that stores every insertion under a monotonic `i64` index.
pub struct IndexedBkTree<T: Scalar, M: ThresholdMetric<T>> {
    root: Option<Box<BkNode<T>>>,
    next_index: i64,
    _metric: PhantomData<M>,
}

impl<T: Scalar, M: ThresholdMetric<T>> IndexedBkTree<T, M> {
    pub fn new() -> Self {
        Self {
            root: None,
            next_index: 0,
            _metric: PhantomData,
        }
    }

    /// Number of insertions, duplicates included.
    pub fn size(&self) -> usize {
        self.next_index as usize
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.next_index = 0;
    }

    /// Insert a key under the next insertion index. Duplicate keys attach
    /// zero-distance children, so every insertion remains addressable.
    pub fn add(&mut self, key: Vec<T>) -> Result<()> {
        check_fixed_dimension::<T, M>(&key)?;
        let index = self.next_index;

        match self.root {
            None => {
                self.root = Some(Box::new(BkNode::new(key, index)));
            }
            Some(ref mut root) => {
                check_key_dimension(root, &key)?;

                let mut node: &mut BkNode<T> = root;
                loop {
                    let dist = M::distance(&node.key, &key);
                    if !node.children.contains_key(&dist) {
                        node.add_child(dist, key, index);
                        break;
                    }
                    node = node
                        .children
                        .get_mut(&dist)
                        .expect("child edge checked above");
                }
            }
        }

        self.next_index += 1;
        Ok(())
    }

    pub fn update(&mut self, keys: &[Vec<T>]) -> Result<()> {
        for key in keys {
            self.add(key.clone())?;
        }
        Ok(())
    }

    /// All insertions within `threshold` of `query`, with their indices.
    pub fn find(&self, query: &[T], threshold: i64) -> Result<IndexedThresholdMatches<T>> {
        check_threshold(threshold)?;
        if let Some(root) = self.root.as_deref() {
            check_key_dimension(root, query)?;
        }

        let mut matches = IndexedThresholdMatches::default();
        find_candidates::<T, M, _>(self.root.as_deref(), query, threshold, |node, dist| {
            matches.indices.push(node.index);
            matches.distances.push(dist);
            matches.keys.push(node.key.clone());
        });
        Ok(matches)
    }

    pub fn find_batch(
        &self,
        queries: &[Vec<T>],
        threshold: i64,
    ) -> Result<Vec<IndexedThresholdMatches<T>>> {
        check_threshold(threshold)?;
        queries
            .par_iter()
            .map(|query| self.find(query, threshold))
            .collect()
    }

    /// All stored keys in pre-order.
    pub fn values(&self) -> Vec<Vec<T>> {
        let mut out = Vec::with_capacity(self.size());
        if let Some(root) = self.root.as_deref() {
            collect_values(root, &mut out);
        }
        out
    }
}

impl<T: Scalar, M: ThresholdMetric<T>> Default for IndexedBkTree<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

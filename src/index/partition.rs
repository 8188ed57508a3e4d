//! VP tree level partition
//!
//! A partition is a non-owning view of a contiguous `[start, end]` slice
//! of the tree's reordered index array. Its vantage point sits at
//! `start`; `radius` is the median distance from the vantage point to the
//! rest of the slice. Children split the slice at the median: left covers
//! `[start+1, m]` (inside the radius), right covers `[m+1, end]`
//! (outside).
//!
//! Serialized form is a pre-order walk of `(radius: f32, start: i64,
//! end: i64)` records; an absent child is the sentinel `(0.0, -1, -1)`.
//! Because the build always splits at the median, tree height is
//! O(log N) and the recursive walks here are stack-safe for any tree the
//! build can produce.

use crate::distance::Distance;
use crate::error::{IndexError, Result};
use crate::state::{StateReader, StateWriter};

/// Serialized record of an absent child.
const NIL_RANGE: i64 = -1;

#[derive(Debug, Clone)]
pub struct VpPartition<D: Distance> {
    radius: D,
    start: i64,
    end: i64,
    left: Option<Box<VpPartition<D>>>,
    right: Option<Box<VpPartition<D>>>,
}

impl<D: Distance> VpPartition<D> {
    pub(crate) fn new(radius: D, start: i64, end: i64) -> Self {
        Self {
            radius,
            start,
            end,
            left: None,
            right: None,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Number of points covered by this partition.
    pub fn size(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn radius(&self) -> D {
        self.radius
    }

    pub(crate) fn set_radius(&mut self, radius: D) {
        self.radius = radius;
    }

    pub fn left(&self) -> Option<&VpPartition<D>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&VpPartition<D>> {
        self.right.as_deref()
    }

    pub(crate) fn set_children(
        &mut self,
        left: Option<Box<VpPartition<D>>>,
        right: Option<Box<VpPartition<D>>>,
    ) {
        self.left = left;
        self.right = right;
    }

    /// Mutable handles to both child slots, for the iterative build.
    pub(crate) fn child_slots(
        &mut self,
    ) -> (
        &mut Option<Box<VpPartition<D>>>,
        &mut Option<Box<VpPartition<D>>>,
    ) {
        (&mut self.left, &mut self.right)
    }

    /// Height of this subtree (a single node has height 1). O(subtree).
    pub fn height(&self) -> usize {
        let left = self.left().map_or(0, VpPartition::height);
        let right = self.right().map_or(0, VpPartition::height);
        1 + left.max(right)
    }

    /// Number of nodes in this subtree, counting this one. O(subtree).
    pub fn num_subnodes(&self) -> usize {
        let left = self.left().map_or(0, VpPartition::num_subnodes);
        let right = self.right().map_or(0, VpPartition::num_subnodes);
        1 + left + right
    }

    /// Emit this subtree in pre-order, sentinel-terminating absent
    /// children.
    pub(crate) fn write_preorder(&self, writer: &mut StateWriter<'_>) {
        writer.write(self.radius.to_radius());
        writer.write(self.start);
        writer.write(self.end);
        Self::write_child(&self.left, writer);
        Self::write_child(&self.right, writer);
    }

    fn write_child(child: &Option<Box<VpPartition<D>>>, writer: &mut StateWriter<'_>) {
        match child {
            Some(node) => node.write_preorder(writer),
            None => {
                writer.write(0.0f32);
                writer.write(NIL_RANGE);
                writer.write(NIL_RANGE);
            }
        }
    }

    /// Rebuild a subtree from the same pre-order. Underrunning the buffer
    /// mid-tree means the blob was truncated and is reported as corrupt.
    pub(crate) fn read_preorder(reader: &mut StateReader<'_>) -> Result<Option<Box<VpPartition<D>>>> {
        let radius = Self::read_field::<f32>(reader)?;
        let start = Self::read_field::<i64>(reader)?;
        let end = Self::read_field::<i64>(reader)?;

        if start == NIL_RANGE {
            return Ok(None);
        }
        if start < 0 || end < start {
            return Err(IndexError::Corrupt(format!(
                "partition range [{}, {}] is not a valid slice",
                start, end
            )));
        }

        let mut node = Box::new(VpPartition::new(D::from_radius(radius), start, end));
        node.left = Self::read_preorder(reader)?;
        node.right = Self::read_preorder(reader)?;
        Ok(Some(node))
    }

    fn read_field<T: crate::state::Scalar>(reader: &mut StateReader<'_>) -> Result<T> {
        reader.read::<T>().map_err(|_| {
            IndexError::Corrupt("partition pre-order underruns the buffer".into())
        })
    }
}

//! Append-only state buffer with typed cursors and CRC32 seal

use crate::error::{IndexError, Result};

use super::Scalar;

/// An opaque serialized-state blob plus its CRC32 checksum.
///
/// The checksum is stamped by [`StateWriter::finish`] and re-verified by
/// [`SerializedState::is_valid`]. `from_parts`/`into_parts` form the
/// persistence boundary: callers transport `(Vec<u8>, u32)` and rebuild
/// an equivalent state on the other side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedState {
    data: Vec<u8>,
    checksum: u32,
}

impl SerializedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(data: Vec<u8>, checksum: u32) -> Self {
        Self { data, checksum }
    }

    pub fn into_parts(self) -> (Vec<u8>, u32) {
        (self.data, self.checksum)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Recompute the CRC32 over the payload and compare with the stamp.
    pub fn is_valid(&self) -> bool {
        self.checksum == compute_crc32(&self.data)
    }

    fn update_checksum(&mut self) {
        self.checksum = compute_crc32(&self.data);
    }
}

fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Typed append cursor over a [`SerializedState`].
///
/// Values are appended in native field order with no padding; readers
/// must consume them in the same order they were written. Call
/// [`finish`](Self::finish) when done to stamp the checksum.
pub struct StateWriter<'a> {
    state: &'a mut SerializedState,
}

impl<'a> StateWriter<'a> {
    pub fn new(state: &'a mut SerializedState) -> Self {
        Self { state }
    }

    /// Append one fixed-width value.
    pub fn write<T: Scalar>(&mut self, value: T) {
        value.write_le(&mut self.state.data);
    }

    /// Append raw bytes.
    pub fn write_blob(&mut self, bytes: &[u8]) {
        self.state.data.extend_from_slice(bytes);
    }

    /// Append a vector of custom user type `T`, delegating the framing to
    /// a caller-supplied serializer that appends to the byte buffer.
    pub fn write_user_vector<T, F>(&mut self, values: &[T], serializer: F)
    where
        F: FnOnce(&[T], &mut Vec<u8>),
    {
        serializer(values, &mut self.state.data);
    }

    /// Stamp the CRC32 over everything written so far.
    pub fn finish(self) {
        self.state.update_checksum();
    }
}

/// Typed front cursor over a [`SerializedState`].
///
/// Reads pop from the front in write order. Reading past the end fails
/// with [`IndexError::Exhausted`]; the cursor is not advanced by a failed
/// read.
pub struct StateReader<'a> {
    data: &'a [u8],
}

impl<'a> StateReader<'a> {
    pub fn new(state: &'a SerializedState) -> Self {
        Self { data: &state.data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pop one fixed-width value.
    pub fn read<T: Scalar>(&mut self) -> Result<T> {
        let bytes = self.take(T::WIDTH)?;
        Ok(T::read_le(bytes))
    }

    /// Pop `len` raw bytes.
    pub fn read_blob(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Pop a vector of custom user type `T`. The deserializer receives the
    /// remaining buffer and returns the decoded vector together with the
    /// number of bytes it consumed.
    pub fn read_user_vector<T, F>(&mut self, deserializer: F) -> Result<Vec<T>>
    where
        F: FnOnce(&'a [u8]) -> Result<(Vec<T>, usize)>,
    {
        if self.data.is_empty() {
            return Err(IndexError::Exhausted {
                requested: 1,
                remaining: 0,
            });
        }
        let (values, consumed) = deserializer(self.data)?;
        if consumed > self.data.len() {
            return Err(IndexError::Malformed(format!(
                "deserializer reported {} bytes consumed with {} available",
                consumed,
                self.data.len()
            )));
        }
        self.data = &self.data[consumed..];
        Ok(values)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(IndexError::Exhausted {
                requested: len,
                remaining: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }
}

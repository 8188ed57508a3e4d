//! Built-in vector serializers
//!
//! Two framings are used by the indexes:
//!
//! ```text
//! ndarray (vector of equal-length rows):
//!   [count: u64][dimension: u64][count * dimension * T]
//!
//! flat vector:
//!   [count: u64][count * T]
//! ```
//!
//! An empty ndarray writes nothing at all; readers never see the framing
//! for an empty index because an empty index serializes to an empty blob.

use crate::error::{IndexError, Result};

use super::{Scalar, StateReader, StateWriter};

/// Serialize a vector of equal-length rows. Empty input writes nothing.
pub fn write_ndarray<T: Scalar>(writer: &mut StateWriter<'_>, rows: &[Vec<T>]) {
    if rows.is_empty() {
        return;
    }

    let dimension = rows[0].len();
    writer.write(rows.len() as u64);
    writer.write(dimension as u64);
    for row in rows {
        debug_assert_eq!(row.len(), dimension);
        for &value in row {
            writer.write(value);
        }
    }
}

/// Deserialize a vector of equal-length rows written by [`write_ndarray`].
pub fn read_ndarray<T: Scalar>(reader: &mut StateReader<'_>) -> Result<Vec<Vec<T>>> {
    let count = reader.read::<u64>()? as usize;
    let dimension = reader.read::<u64>()? as usize;

    let row_bytes = dimension
        .checked_mul(T::WIDTH)
        .ok_or_else(|| IndexError::Malformed("ndarray dimension overflows".into()))?;
    let total_bytes = count
        .checked_mul(row_bytes)
        .ok_or_else(|| IndexError::Malformed("ndarray size overflows".into()))?;
    if total_bytes > reader.remaining() {
        return Err(IndexError::Malformed(format!(
            "ndarray declares {} bytes with {} remaining",
            total_bytes,
            reader.remaining()
        )));
    }

    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = reader.read_blob(row_bytes)?;
        let row = bytes.chunks_exact(T::WIDTH).map(T::read_le).collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Serialize a flat vector of fixed-width values.
pub fn write_flat<T: Scalar>(writer: &mut StateWriter<'_>, values: &[T]) {
    writer.write(values.len() as u64);
    for &value in values {
        writer.write(value);
    }
}

/// Deserialize a flat vector written by [`write_flat`].
pub fn read_flat<T: Scalar>(reader: &mut StateReader<'_>) -> Result<Vec<T>> {
    let count = reader.read::<u64>()? as usize;

    let total_bytes = count
        .checked_mul(T::WIDTH)
        .ok_or_else(|| IndexError::Malformed("flat vector size overflows".into()))?;
    if total_bytes > reader.remaining() {
        return Err(IndexError::Malformed(format!(
            "flat vector declares {} bytes with {} remaining",
            total_bytes,
            reader.remaining()
        )));
    }

    let bytes = reader.read_blob(total_bytes)?;
    Ok(bytes.chunks_exact(T::WIDTH).map(T::read_le).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SerializedState;

    #[test]
    fn test_ndarray_round_trip() {
        let rows = vec![vec![1.0f32, 2.0, 3.0], vec![4.0, 5.0, 6.0]];

        let mut state = SerializedState::new();
        let mut writer = StateWriter::new(&mut state);
        write_ndarray(&mut writer, &rows);
        writer.finish();

        // [count][dimension] + 6 floats
        assert_eq!(state.len(), 16 + 24);

        let mut reader = StateReader::new(&state);
        let decoded: Vec<Vec<f32>> = read_ndarray(&mut reader).unwrap();
        assert_eq!(decoded, rows);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_empty_ndarray_writes_nothing() {
        let rows: Vec<Vec<f32>> = Vec::new();

        let mut state = SerializedState::new();
        let mut writer = StateWriter::new(&mut state);
        write_ndarray(&mut writer, &rows);
        writer.finish();

        assert!(state.is_empty());
    }

    #[test]
    fn test_flat_round_trip() {
        let values = vec![4i64, -1, 0, 2];

        let mut state = SerializedState::new();
        let mut writer = StateWriter::new(&mut state);
        write_flat(&mut writer, &values);
        writer.finish();

        let mut reader = StateReader::new(&state);
        let decoded: Vec<i64> = read_flat(&mut reader).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_oversized_declaration_is_malformed() {
        let mut state = SerializedState::new();
        let mut writer = StateWriter::new(&mut state);
        // claims 1000 rows of 8 floats but carries no data
        writer.write(1000u64);
        writer.write(8u64);
        writer.finish();

        let mut reader = StateReader::new(&state);
        let result = read_ndarray::<f32>(&mut reader);
        assert!(matches!(result, Err(IndexError::Malformed(_))));
    }

    #[test]
    fn test_truncated_flat_vector_is_malformed() {
        let mut state = SerializedState::new();
        let mut writer = StateWriter::new(&mut state);
        writer.write(4u64);
        writer.write(1i64);
        writer.finish();

        let mut reader = StateReader::new(&state);
        let result = read_flat::<i64>(&mut reader);
        assert!(matches!(result, Err(IndexError::Malformed(_))));
    }
}

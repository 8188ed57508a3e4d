//! Boundary adapters for external callers
//!
//! External batch producers hand over either a vector of equal-length
//! rows or one contiguous row-major buffer plus its shape. The adapters
//! copy into owned storage — the index never aliases caller memory past
//! the `set` call. The persistence boundary is the `(Vec<u8>, u32)` pair
//! exposed by [`SerializedState::into_parts`](crate::state::SerializedState::into_parts)
//! and rebuilt with `from_parts`.

use crate::error::{IndexError, Result};
use crate::state::Scalar;

/// Copy a row-major buffer of shape `count x dimension` into owned rows.
pub fn rows_from_flat<T: Scalar>(data: &[T], count: usize, dimension: usize) -> Result<Vec<Vec<T>>> {
    let expected = count
        .checked_mul(dimension)
        .ok_or_else(|| IndexError::Malformed("row-major shape overflows".into()))?;
    if data.len() != expected {
        return Err(IndexError::Malformed(format!(
            "row-major buffer holds {} values, shape {}x{} needs {}",
            data.len(),
            count,
            dimension,
            expected
        )));
    }
    if dimension == 0 {
        return Ok(vec![Vec::new(); count]);
    }

    Ok(data.chunks_exact(dimension).map(|row| row.to_vec()).collect())
}

/// Flatten equal-length rows into a row-major buffer; returns the buffer
/// with its `(count, dimension)` shape.
pub fn flat_from_rows<T: Scalar>(rows: &[Vec<T>]) -> Result<(Vec<T>, usize, usize)> {
    let Some(first) = rows.first() else {
        return Ok((Vec::new(), 0, 0));
    };

    let dimension = first.len();
    let mut data = Vec::with_capacity(rows.len() * dimension);
    for row in rows {
        if row.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                got: row.len(),
            });
        }
        data.extend_from_slice(row);
    }
    Ok((data, rows.len(), dimension))
}

//! Serialized index state
//!
//! An index persists itself into a [`SerializedState`]: an append-only
//! byte buffer with typed little-endian read/write cursors and a CRC32
//! integrity seal. Data is read back in exactly the order it was written,
//! like a file stream. The byte layout is fixed (see the crate docs for
//! the persisted format), so blobs are portable across hosts.

mod buffer;
pub mod vectors;

pub use buffer::{SerializedState, StateReader, StateWriter};

/// A plain fixed-width value with a defined little-endian wire encoding.
///
/// This is both the element type of serializable vectors (`f32`, `f64`,
/// `u8`) and the type of primitive fields in the persisted format
/// (`u64` counts, `i64` index ranges, `f32` radii).
pub trait Scalar: Copy + Send + Sync + 'static {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from `bytes[..WIDTH]`. Callers guarantee at least `WIDTH`
    /// bytes are present.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_scalar!(u8, u32, u64, i64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let mut out = Vec::new();
        42u8.write_le(&mut out);
        0xDEAD_BEEFu32.write_le(&mut out);
        (-7i64).write_le(&mut out);
        1.5f32.write_le(&mut out);
        assert_eq!(out.len(), 1 + 4 + 8 + 4);

        assert_eq!(u8::read_le(&out[0..]), 42);
        assert_eq!(u32::read_le(&out[1..]), 0xDEAD_BEEF);
        assert_eq!(i64::read_le(&out[5..]), -7);
        assert_eq!(f32::read_le(&out[13..]), 1.5);
    }

    #[test]
    fn test_scalar_encoding_is_little_endian() {
        let mut out = Vec::new();
        0x0102_0304u32.write_le(&mut out);
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01]);
    }
}

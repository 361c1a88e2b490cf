//! Byte order aware reading utilities for PE and metadata parsing.
//!
//! This module provides the [`LeIO`] trait for safe, endian-aware reading of
//! primitive types from byte slices, together with the free functions used by
//! the stream and table readers. Metadata table columns change width with the
//! size of the table they index, which is what [`read_le_at_dyn`] is for.

use crate::{Error::OutOfBounds, Result};

/// Trait for type specific safe readers.
///
/// Implemented for the integer types that appear in PE headers and ECMA-335
/// metadata structures.
pub trait LeIO: Sized {
    #[allow(missing_docs)]
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read `Self` from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_le_io {
    ($($ty:ty => $len:literal),+ $(,)?) => {
        $(
            impl LeIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )+
    };
}

impl_le_io!(
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
);

impl LeIO for f32 {
    type Bytes = [u8; 4];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        f32::from_le_bytes(bytes)
    }
}

impl LeIO for f64 {
    type Bytes = [u8; 8];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        f64::from_le_bytes(bytes)
    }
}

/// Safely read a `T` in little-endian from the start of `data`.
///
/// # Errors
/// Returns [`OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: LeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely read a `T` in little-endian from `offset`, advancing it.
///
/// ## Arguments
/// * 'data'    - The data buffer to read from
/// * 'offset'  - Offset to read at, advanced by the amount of bytes read
///
/// # Errors
/// Returns [`OutOfBounds`] if the read would exceed the data length.
pub fn read_le_at<T: LeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if type_len + *offset > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(bytes) = T::Bytes::try_from(&data[*offset..*offset + type_len]) else {
        return Err(OutOfBounds);
    };

    *offset += type_len;
    Ok(T::from_le_bytes(bytes))
}

/// Read a table column that is 2 or 4 bytes wide depending on the size of the
/// heap or table it indexes, widening the result to `u32`.
///
/// ## Arguments
/// * 'data'        - The data buffer to read from
/// * 'offset'      - Offset to read at, advanced by the amount of bytes read
/// * '`is_large`'  - True reads 4 bytes, false reads 2
///
/// # Errors
/// Returns [`OutOfBounds`] if the read would exceed the data length.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_fixed() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x04030201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807060504030201);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 0;
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0201);
        assert_eq!(offset, 2);
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_at_dyn_widths() {
        let mut offset = 0;
        assert_eq!(
            read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(),
            0x04030201
        );
        assert_eq!(offset, 4);

        let mut offset = 0;
        assert_eq!(
            read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(),
            0x0201
        );
        assert_eq!(offset, 2);
    }

    #[test]
    fn read_le_out_of_bounds() {
        let short = [0x01_u8];
        assert!(matches!(read_le::<u32>(&short), Err(OutOfBounds)));

        let mut offset = 7;
        assert!(matches!(
            read_le_at::<u16>(&TEST_BUFFER, &mut offset),
            Err(OutOfBounds)
        ));
    }

    #[test]
    fn read_le_floats() {
        let data = 1.5_f32.to_le_bytes();
        assert_eq!(read_le::<f32>(&data).unwrap(), 1.5);

        let data = (-2.25_f64).to_le_bytes();
        assert_eq!(read_le::<f64>(&data).unwrap(), -2.25);
    }
}

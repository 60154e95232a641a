//! LEB128 variable-length integer coding used throughout the container and
//! index blobs.

use std::io::{Read, Write};

use geodex_common::{Result, error::Error, verify_data};

/// Writes an unsigned 64-bit integer in LEB128 form, 7 bits per byte,
/// low-order group first.
pub fn write_u64<W: Write>(writer: &mut W, mut value: u64) -> Result<()> {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer
            .write_all(&[byte])
            .map_err(|e| Error::io("varint write", e))?;
        if value == 0 {
            return Ok(());
        }
    }
}

/// Reads a LEB128-encoded unsigned 64-bit integer.
///
/// Fails with an `InvalidFormat` error when the encoding exceeds the ten
/// bytes a u64 can legally occupy, which indicates a corrupted stream.
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        reader
            .read_exact(&mut byte)
            .map_err(|e| Error::io("varint read", e))?;
        verify_data!(varint, shift < 64);
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Maps a signed integer onto the unsigned space so that values of small
/// magnitude, of either sign, get short LEB128 encodings.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Writes a signed integer as a zigzag-mapped LEB128 varint.
pub fn write_i64<W: Write>(writer: &mut W, value: i64) -> Result<()> {
    write_u64(writer, zigzag_encode(value))
}

/// Reads a zigzag-mapped LEB128 varint as a signed integer.
pub fn read_i64<R: Read>(reader: &mut R) -> Result<i64> {
    Ok(zigzag_decode(read_u64(reader)?))
}

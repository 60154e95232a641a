//! Reader-to-writer transfer operations used when committing build artifacts
//! into a container.

use std::io::{Read, Write};

use geodex_common::{Result, error::Error};

/// Copies everything from `reader` to `writer` with the byte order reversed.
///
/// This is the container's commit contract for staged artifacts: the final
/// section bytes are the byte reverse of the temporary build output. Returns
/// the number of bytes written.
pub fn write_reversed<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<u64> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io("reverse copy read", e))?;
    bytes.reverse();
    writer
        .write_all(&bytes)
        .map_err(|e| Error::io("reverse copy write", e))?;
    Ok(bytes.len() as u64)
}

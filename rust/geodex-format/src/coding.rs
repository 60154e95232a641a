//! Coordinate coding parameters shared between the feature container and the
//! search index blob.
//!
//! Points live in a canonical unsigned 32-bit-per-axis coordinate space.
//! `CodingParams` describes at which bit precision a particular blob stores
//! them and against which base point deltas are taken. The feature container
//! carries its own params; the search index re-derives a copy at a fixed
//! 20-bit precision before serializing any embedded centers.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use geodex_common::{Result, error::Error, verify_arg};

use crate::varint;

/// Bit precision used for point coordinates embedded in the search index.
pub const POINT_CODING_BITS: u8 = 20;

/// A point in the canonical 32-bit-per-axis coordinate space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct PointU {
    pub x: u32,
    pub y: u32,
}

impl PointU {
    pub fn new(x: u32, y: u32) -> PointU {
        PointU { x, y }
    }
}

/// Coordinate quantization settings: bit precision per axis plus the base
/// point deltas are coded against. Immutable once derived for a build.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CodingParams {
    bits: u8,
    base: PointU,
}

impl CodingParams {
    /// Creates coding params with the given per-axis precision and base point.
    ///
    /// The base point is snapped to the requested precision so that encoding
    /// and decoding agree on the delta origin.
    pub fn new(bits: u8, base: PointU) -> Result<CodingParams> {
        verify_arg!(bits, bits >= 1 && bits <= 32);
        let mut params = CodingParams { bits, base };
        params.base = PointU::new(
            params.dequantize(params.quantize(base.x)),
            params.dequantize(params.quantize(base.y)),
        );
        Ok(params)
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn base(&self) -> PointU {
        self.base
    }

    fn quantize(&self, coord: u32) -> u32 {
        coord >> (32 - self.bits as u32)
    }

    fn dequantize(&self, q: u32) -> u32 {
        q << (32 - self.bits as u32)
    }

    /// Encodes a point as zigzag varint deltas from the base point at this
    /// precision. Lossy below the configured bit precision, deterministic.
    pub fn encode_point<W: Write>(&self, writer: &mut W, point: PointU) -> Result<()> {
        let dx = i64::from(self.quantize(point.x)) - i64::from(self.quantize(self.base.x));
        let dy = i64::from(self.quantize(point.y)) - i64::from(self.quantize(self.base.y));
        varint::write_i64(writer, dx)?;
        varint::write_i64(writer, dy)
    }

    /// Decodes a point previously written by [`encode_point`].
    ///
    /// [`encode_point`]: CodingParams::encode_point
    pub fn decode_point<R: Read>(&self, reader: &mut R) -> Result<PointU> {
        let dx = varint::read_i64(reader)?;
        let dy = varint::read_i64(reader)?;
        let qx = i64::from(self.quantize(self.base.x)) + dx;
        let qy = i64::from(self.quantize(self.base.y)) + dy;
        let max = (1i64 << self.bits) - 1;
        if qx < 0 || qx > max || qy < 0 || qy > max {
            return Err(Error::invalid_format(
                "point",
                "decoded coordinate out of range for coding precision",
            ));
        }
        Ok(PointU::new(
            self.dequantize(qx as u32),
            self.dequantize(qy as u32),
        ))
    }

    /// Snaps a point to this precision, the identity for already-encoded data.
    pub fn snap(&self, point: PointU) -> PointU {
        PointU::new(
            self.dequantize(self.quantize(point.x)),
            self.dequantize(self.quantize(point.y)),
        )
    }

    /// Writes the params as a fixed-width header field.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u8(self.bits)
            .and_then(|_| writer.write_u32::<LittleEndian>(self.base.x))
            .and_then(|_| writer.write_u32::<LittleEndian>(self.base.y))
            .map_err(|e| Error::io("coding params write", e))
    }

    /// Reads params previously written by [`write`].
    ///
    /// [`write`]: CodingParams::write
    pub fn read<R: Read>(reader: &mut R) -> Result<CodingParams> {
        let bits = reader.read_u8().map_err(|e| Error::io("coding params", e))?;
        let x = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::io("coding params", e))?;
        let y = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::io("coding params", e))?;
        CodingParams::new(bits, PointU::new(x, y))
    }
}

/// Derives the params used for point fields embedded in the search index:
/// same base point as the feature source, fixed [`POINT_CODING_BITS`]
/// precision.
pub fn index_coding_params(source: &CodingParams) -> CodingParams {
    CodingParams::new(POINT_CODING_BITS, source.base())
        .unwrap_or_else(|_| unreachable!("POINT_CODING_BITS is a valid precision"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_precision_rejected() {
        assert!(CodingParams::new(0, PointU::default()).is_err());
        assert!(CodingParams::new(33, PointU::default()).is_err());
        assert!(CodingParams::new(32, PointU::default()).is_ok());
    }

    #[test]
    fn test_point_round_trip() {
        let params = CodingParams::new(20, PointU::new(1 << 30, 1 << 29)).unwrap();
        let points = [
            PointU::new(0, 0),
            PointU::new(1 << 30, 1 << 29),
            PointU::new(u32::MAX, u32::MAX),
            PointU::new(123 << 12, 456 << 12),
        ];
        for &pt in &points {
            let mut buf = Vec::new();
            params.encode_point(&mut buf, pt).unwrap();
            let decoded = params.decode_point(&mut &buf[..]).unwrap();
            assert_eq!(decoded, params.snap(pt));
        }
    }

    #[test]
    fn test_points_near_base_are_compact() {
        let base = PointU::new(1 << 31, 1 << 31);
        let params = CodingParams::new(20, base).unwrap();
        let mut near = Vec::new();
        params.encode_point(&mut near, base).unwrap();
        let mut far = Vec::new();
        params.encode_point(&mut far, PointU::new(0, 0)).unwrap();
        assert!(near.len() < far.len());
        assert_eq!(near.len(), 2);
    }

    #[test]
    fn test_index_coding_params() {
        let source = CodingParams::new(32, PointU::new(77 << 20, 11 << 20)).unwrap();
        let derived = index_coding_params(&source);
        assert_eq!(derived.bits(), POINT_CODING_BITS);
        assert_eq!(derived.base(), derived.snap(source.base()));
    }

    #[test]
    fn test_params_header_round_trip() {
        let params = CodingParams::new(24, PointU::new(42 << 8, 7 << 8)).unwrap();
        let mut buf = Vec::new();
        params.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 9);
        let read_back = CodingParams::read(&mut &buf[..]).unwrap();
        assert_eq!(read_back, params);
    }
}

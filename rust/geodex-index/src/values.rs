//! Feature value records stored in trie value lists, and their serializer.
//!
//! One of two fixed value shapes is chosen per build, never per feature:
//! a bare feature reference, or a reference enriched with a search rank and
//! a drawable center point. The serializer is parameterized by the build's
//! coding params and is a pure function of its inputs.

use std::io::{Read, Write};

use geodex_common::{Result, error::Error};
use geodex_format::coding::{CodingParams, PointU};
use geodex_format::varint;

use crate::source::FeatureRef;

/// Build-wide choice between the two value layouts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueShape {
    /// Values carry only the feature index.
    Index,
    /// Values carry the feature index, a search rank and the feature center.
    RankAndCenter,
}

impl ValueShape {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ValueShape::Index => 0,
            ValueShape::RankAndCenter => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Result<ValueShape> {
        match value {
            0 => Ok(ValueShape::Index),
            1 => Ok(ValueShape::RankAndCenter),
            other => Err(Error::invalid_format(
                "index header",
                format!("unknown value shape {other}"),
            )),
        }
    }
}

/// A record identifying one feature in a trie value list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Index {
        feature_id: u32,
    },
    RankAndCenter {
        feature_id: u32,
        rank: u8,
        center: PointU,
    },
}

impl IndexValue {
    pub fn feature_id(&self) -> u32 {
        match *self {
            IndexValue::Index { feature_id } => feature_id,
            IndexValue::RankAndCenter { feature_id, .. } => feature_id,
        }
    }
}

/// Maps a population count onto a compact search rank.
pub fn population_to_rank(population: u64) -> u8 {
    if population == 0 {
        0
    } else {
        population.ilog2().min(255) as u8
    }
}

/// Builds the per-feature value under the build's chosen shape.
#[derive(Debug, Copy, Clone)]
pub struct ValueBuilder {
    shape: ValueShape,
    coding: CodingParams,
}

impl ValueBuilder {
    pub fn new(shape: ValueShape, coding: CodingParams) -> ValueBuilder {
        ValueBuilder { shape, coding }
    }

    pub fn shape(&self) -> ValueShape {
        self.shape
    }

    pub fn make_value(&self, feature: &FeatureRef<'_>) -> IndexValue {
        match self.shape {
            ValueShape::Index => IndexValue::Index {
                feature_id: feature.index,
            },
            ValueShape::RankAndCenter => IndexValue::RankAndCenter {
                feature_id: feature.index,
                rank: population_to_rank(feature.population),
                // Snapped up front so the value compares equal to what a
                // reader will decode.
                center: self.coding.snap(feature.center),
            },
        }
    }
}

/// Serializes values of one shape with one set of coding params.
#[derive(Debug, Copy, Clone)]
pub struct ValueSerializer {
    shape: ValueShape,
    coding: CodingParams,
}

impl ValueSerializer {
    pub fn new(shape: ValueShape, coding: CodingParams) -> ValueSerializer {
        ValueSerializer { shape, coding }
    }

    pub fn shape(&self) -> ValueShape {
        self.shape
    }

    pub fn coding(&self) -> CodingParams {
        self.coding
    }

    pub fn write_value<W: Write>(&self, writer: &mut W, value: &IndexValue) -> Result<()> {
        match (*value, self.shape) {
            (IndexValue::Index { feature_id }, ValueShape::Index) => {
                varint::write_u64(writer, u64::from(feature_id))
            }
            (
                IndexValue::RankAndCenter {
                    feature_id,
                    rank,
                    center,
                },
                ValueShape::RankAndCenter,
            ) => {
                varint::write_u64(writer, u64::from(feature_id))?;
                writer
                    .write_all(&[rank])
                    .map_err(|e| Error::io("value rank", e))?;
                self.coding.encode_point(writer, center)
            }
            _ => Err(Error::invalid_arg(
                "value",
                "value shape does not match the build's configured shape",
            )),
        }
    }

    pub fn read_value<R: Read>(&self, reader: &mut R) -> Result<IndexValue> {
        let feature_id = varint::read_u64(reader)?;
        let feature_id = u32::try_from(feature_id)
            .map_err(|_| Error::invalid_format("value", "feature id exceeds 32 bits"))?;
        match self.shape {
            ValueShape::Index => Ok(IndexValue::Index { feature_id }),
            ValueShape::RankAndCenter => {
                let mut rank = [0u8; 1];
                reader
                    .read_exact(&mut rank)
                    .map_err(|e| Error::io("value rank", e))?;
                let center = self.coding.decode_point(reader)?;
                Ok(IndexValue::RankAndCenter {
                    feature_id,
                    rank: rank[0],
                    center,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coding() -> CodingParams {
        CodingParams::new(20, PointU::new(1 << 30, 1 << 30)).unwrap()
    }

    #[test]
    fn test_population_to_rank() {
        assert_eq!(population_to_rank(0), 0);
        assert_eq!(population_to_rank(1), 0);
        assert_eq!(population_to_rank(2), 1);
        assert_eq!(population_to_rank(1024), 10);
        assert_eq!(population_to_rank(8_000_000), 22);
        assert_eq!(population_to_rank(u64::MAX), 63);
    }

    #[test]
    fn test_index_shape_round_trip() {
        let serializer = ValueSerializer::new(ValueShape::Index, coding());
        let value = IndexValue::Index { feature_id: 12345 };
        let mut buf = Vec::new();
        serializer.write_value(&mut buf, &value).unwrap();
        assert_eq!(serializer.read_value(&mut &buf[..]).unwrap(), value);
    }

    #[test]
    fn test_rank_and_center_round_trip() {
        let params = coding();
        let serializer = ValueSerializer::new(ValueShape::RankAndCenter, params);
        let value = IndexValue::RankAndCenter {
            feature_id: 7,
            rank: 14,
            center: params.snap(PointU::new(123 << 13, 99 << 13)),
        };
        let mut buf = Vec::new();
        serializer.write_value(&mut buf, &value).unwrap();
        assert_eq!(serializer.read_value(&mut &buf[..]).unwrap(), value);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let serializer = ValueSerializer::new(ValueShape::RankAndCenter, coding());
        let value = IndexValue::Index { feature_id: 1 };
        let mut buf = Vec::new();
        assert!(serializer.write_value(&mut buf, &value).is_err());
    }
}

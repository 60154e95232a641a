//! Serialized feature-collection codec: the read-only collection of
//! geographic features the index builder iterates over.
//!
//! The collection is stored as one container section: a header carrying
//! {scope, coordinate coding params, target scale range} followed by one
//! record per feature. Feature indices are implicit: the N-th record has
//! index N, stable for the lifetime of the container.
//!
//! Category type codes are carried as opaque `u32` values; their hierarchical
//! structure belongs to the categories catalog, not to this format.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use geodex_common::{Result, error::Error};

use crate::coding::{CodingParams, PointU};
use crate::varint;

const FEATURES_MAGIC: &[u8; 4] = b"GDXF";
const FEATURES_VERSION: u8 = 1;

/// Scale value meaning "no defined scale".
pub const SCALE_UNDEFINED: i32 = -1;

/// Inclusive zoom-level interval.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScaleRange {
    pub min: i32,
    pub max: i32,
}

impl ScaleRange {
    pub fn new(min: i32, max: i32) -> ScaleRange {
        ScaleRange { min, max }
    }

    /// A range is usable when its minimum is a defined scale and does not
    /// exceed its maximum. Catalog data violating this is corrupt.
    pub fn is_valid(&self) -> bool {
        self.min != SCALE_UNDEFINED && self.min <= self.max
    }

    /// Inclusive interval intersection test.
    pub fn intersects(&self, other: &ScaleRange) -> bool {
        self.max >= other.min && self.min <= other.max
    }
}

/// Coverage scope of a feature collection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Planet-wide collection of coarse features (countries, states, capitals).
    World,
    /// A single regional extract.
    Region,
}

impl Scope {
    fn as_u8(self) -> u8 {
        match self {
            Scope::World => 0,
            Scope::Region => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Scope> {
        match value {
            0 => Ok(Scope::World),
            1 => Ok(Scope::Region),
            other => Err(Error::invalid_format(
                "feature header",
                format!("unknown scope code {other}"),
            )),
        }
    }
}

/// Header of a serialized feature collection.
#[derive(Debug, Copy, Clone)]
pub struct SourceHeader {
    pub scope: Scope,
    pub coding: CodingParams,
    pub scale_range: ScaleRange,
}

/// One geographic feature as stored in the collection.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Category type codes, opaque at this layer.
    pub type_codes: Vec<u32>,
    /// (language tag, raw name text) pairs.
    pub names: Vec<(i8, String)>,
    pub population: u64,
    pub center: PointU,
}

/// An in-memory feature collection with its header, readable and writable as
/// one container section body.
#[derive(Debug, Clone)]
pub struct FeatureCollection {
    header: SourceHeader,
    features: Vec<FeatureRecord>,
}

impl FeatureCollection {
    pub fn new(header: SourceHeader, features: Vec<FeatureRecord>) -> FeatureCollection {
        FeatureCollection { header, features }
    }

    pub fn header(&self) -> &SourceHeader {
        &self.header
    }

    /// Features in stable index order: the N-th entry has feature index N.
    pub fn features(&self) -> &[FeatureRecord] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(FEATURES_MAGIC)
            .and_then(|_| writer.write_u8(FEATURES_VERSION))
            .and_then(|_| writer.write_u8(self.header.scope.as_u8()))
            .map_err(|e| Error::io("feature header", e))?;
        self.header.coding.write(writer)?;
        varint::write_i64(writer, i64::from(self.header.scale_range.min))?;
        varint::write_i64(writer, i64::from(self.header.scale_range.max))?;

        varint::write_u64(writer, self.features.len() as u64)?;
        for feature in &self.features {
            varint::write_u64(writer, feature.type_codes.len() as u64)?;
            for &code in &feature.type_codes {
                varint::write_u64(writer, u64::from(code))?;
            }
            varint::write_u64(writer, feature.names.len() as u64)?;
            for (lang, name) in &feature.names {
                writer
                    .write_i8(*lang)
                    .map_err(|e| Error::io("feature name", e))?;
                varint::write_u64(writer, name.len() as u64)?;
                writer
                    .write_all(name.as_bytes())
                    .map_err(|e| Error::io("feature name", e))?;
            }
            varint::write_u64(writer, feature.population)?;
            writer
                .write_u32::<LittleEndian>(feature.center.x)
                .and_then(|_| writer.write_u32::<LittleEndian>(feature.center.y))
                .map_err(|e| Error::io("feature center", e))?;
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<FeatureCollection> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| Error::io("feature header", e))?;
        if &magic != FEATURES_MAGIC {
            return Err(Error::invalid_format(
                "feature collection",
                "bad magic bytes",
            ));
        }
        let version = reader.read_u8().map_err(|e| Error::io("feature header", e))?;
        if version != FEATURES_VERSION {
            return Err(Error::invalid_format(
                "feature collection",
                format!("unsupported version {version}"),
            ));
        }
        let scope = Scope::from_u8(reader.read_u8().map_err(|e| Error::io("feature header", e))?)?;
        let coding = CodingParams::read(reader)?;
        let min = read_scale(reader)?;
        let max = read_scale(reader)?;
        let header = SourceHeader {
            scope,
            coding,
            scale_range: ScaleRange::new(min, max),
        };

        let count = varint::read_u64(reader)?;
        let mut features = Vec::with_capacity(count.min(1 << 20) as usize);
        for _ in 0..count {
            let type_count = varint::read_u64(reader)?;
            let mut type_codes = Vec::with_capacity(type_count.min(64) as usize);
            for _ in 0..type_count {
                let code = varint::read_u64(reader)?;
                let code = u32::try_from(code).map_err(|_| {
                    Error::invalid_format("feature", "type code exceeds 32 bits")
                })?;
                type_codes.push(code);
            }
            let name_count = varint::read_u64(reader)?;
            let mut names = Vec::with_capacity(name_count.min(64) as usize);
            for _ in 0..name_count {
                let lang = reader.read_i8().map_err(|e| Error::io("feature name", e))?;
                let len = varint::read_u64(reader)?;
                // len is untrusted; never allocate it up front.
                let mut bytes = Vec::with_capacity(len.min(1 << 16) as usize);
                reader
                    .by_ref()
                    .take(len)
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::io("feature name", e))?;
                if bytes.len() as u64 != len {
                    return Err(Error::invalid_format("feature", "name text truncated"));
                }
                let name = String::from_utf8(bytes).map_err(|_| {
                    Error::invalid_format("feature", "name text is not UTF-8")
                })?;
                names.push((lang, name));
            }
            let population = varint::read_u64(reader)?;
            let x = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| Error::io("feature center", e))?;
            let y = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| Error::io("feature center", e))?;
            features.push(FeatureRecord {
                type_codes,
                names,
                population,
                center: PointU::new(x, y),
            });
        }
        Ok(FeatureCollection { header, features })
    }
}

fn read_scale<R: Read>(reader: &mut R) -> Result<i32> {
    let value = varint::read_i64(reader)?;
    i32::try_from(value)
        .map_err(|_| Error::invalid_format("feature header", "scale out of i32 range"))
}

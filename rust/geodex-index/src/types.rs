//! Category type codes and the per-build type filter.
//!
//! A `TypeCode` is a hierarchical path of up to four 8-bit components packed
//! most-significant-first into a `u32` (for example `place.city.capital` is
//! three levels). Truncation to a coarser level zeroes the deeper components,
//! collapsing fine subtype distinctions.

use geodex_common::{Result, error::Error};

/// Packed hierarchical category code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode(u32);

impl TypeCode {
    pub const MAX_LEVEL: u8 = 4;

    /// Builds a code from its component path. Components must be non-zero and
    /// at most [`MAX_LEVEL`] deep.
    ///
    /// [`MAX_LEVEL`]: TypeCode::MAX_LEVEL
    pub fn from_path(path: &[u8]) -> Result<TypeCode> {
        if path.is_empty() || path.len() > Self::MAX_LEVEL as usize {
            return Err(Error::invalid_arg(
                "path",
                format!("type path depth {} out of range 1..=4", path.len()),
            ));
        }
        let mut raw = 0u32;
        for (i, &component) in path.iter().enumerate() {
            if component == 0 {
                return Err(Error::invalid_arg("path", "type path component is zero"));
            }
            raw |= u32::from(component) << (24 - 8 * i);
        }
        Ok(TypeCode(raw))
    }

    /// Reconstructs a code from its packed representation, as stored in a
    /// feature record. Components must be contiguous from the top.
    pub fn from_raw(raw: u32) -> TypeCode {
        TypeCode(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Number of defined components.
    pub fn level(self) -> u8 {
        for level in 0..Self::MAX_LEVEL {
            if (self.0 >> (24 - 8 * u32::from(level))) & 0xff == 0 {
                return level;
            }
        }
        Self::MAX_LEVEL
    }

    /// Zeroes every component deeper than `level`.
    pub fn truncate(self, level: u8) -> TypeCode {
        let level = level.min(Self::MAX_LEVEL);
        if level == 0 {
            return TypeCode(0);
        }
        let keep_bits = 8 * u32::from(level);
        let mask = !((1u64 << (32 - keep_bits)) - 1) as u32;
        TypeCode(self.0 & mask)
    }
}

/// A feature's mutable working set of category codes. Codes are removed by
/// the type filter during per-feature processing; a holder is never shared
/// across features.
#[derive(Debug, Clone)]
pub struct TypesHolder {
    codes: Vec<TypeCode>,
}

impl TypesHolder {
    pub fn from_raw(raw_codes: &[u32]) -> TypesHolder {
        TypesHolder {
            codes: raw_codes.iter().map(|&c| TypeCode::from_raw(c)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeCode> + '_ {
        self.codes.iter().copied()
    }

    fn retain<F: FnMut(TypeCode) -> bool>(&mut self, mut keep: F) {
        self.codes.retain(|&c| keep(c));
    }
}

/// Code lists a [`TypeFilter`] is built from. Each entry matches any
/// candidate code that equals it after truncation to the entry's own level,
/// so a one-level entry covers a whole subtree.
#[derive(Debug, Clone, Default)]
pub struct FilterLists {
    /// Codes that never contribute to the index.
    pub skip: Vec<TypeCode>,
    /// Codes removed only when the feature produced no name tokens.
    pub skip_if_unnamed: Vec<TypeCode>,
    /// Codes marking country/state-like features, gating synonym lookup.
    pub administrative: Vec<TypeCode>,
}

/// Build-scoped classifier of category codes. Constructed once per build and
/// threaded explicitly through the pipeline; holds no global state.
#[derive(Debug, Clone)]
pub struct TypeFilter {
    lists: FilterLists,
}

impl TypeFilter {
    pub fn new(lists: FilterLists) -> TypeFilter {
        TypeFilter { lists }
    }

    fn matches(list: &[TypeCode], code: TypeCode) -> bool {
        list.iter().any(|&e| code.truncate(e.level()) == e)
    }

    /// Removes codes that never contribute to the index.
    pub fn skip_types(&self, types: &mut TypesHolder) {
        types.retain(|c| !Self::matches(&self.lists.skip, c));
    }

    /// Removes codes that only matter for named features. Called after name
    /// processing, for features that produced zero name tokens.
    pub fn skip_unnamed_types(&self, types: &mut TypesHolder) {
        types.retain(|c| !Self::matches(&self.lists.skip_if_unnamed, c));
    }

    /// Whether any remaining code classifies the feature as administrative
    /// (country/state-like).
    pub fn is_administrative(&self, types: &TypesHolder) -> bool {
        types
            .iter()
            .any(|c| Self::matches(&self.lists.administrative, c))
    }
}

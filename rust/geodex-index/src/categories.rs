//! The categories catalog interface consumed by the index builder, plus a
//! simple in-memory implementation.
//!
//! The catalog owns the category data model: which (truncated) type codes
//! are cataloged, their drawable scale ranges, and the canonical numeric
//! identifier each code is rendered as in category pseudo-tokens. The
//! builder only ever consumes this narrow surface.

use ahash::AHashMap;

pub use geodex_format::features::{SCALE_UNDEFINED, ScaleRange};

use crate::types::TypeCode;

/// Read-only catalog of indexable categories.
pub trait CategoriesCatalog {
    /// Whether the code is cataloged at all.
    fn contains(&self, code: TypeCode) -> bool;

    /// The scale interval over which the category is drawable. `None` for
    /// codes not in the catalog.
    fn drawable_scale_range(&self, code: TypeCode) -> Option<ScaleRange>;

    /// Canonical numeric identifier for the code, rendered as the category
    /// pseudo-token text. `None` for codes not in the catalog.
    fn canonical_id(&self, code: TypeCode) -> Option<u32>;

    /// Collapses a code to a coarser granularity.
    fn truncate(&self, code: TypeCode, level: u8) -> TypeCode {
        code.truncate(level)
    }
}

/// Catalog backed by a fixed entry list; the canonical identifier of a code
/// is its position in that list.
pub struct StaticCatalog {
    entries: Vec<(TypeCode, ScaleRange)>,
    by_code: AHashMap<TypeCode, u32>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<(TypeCode, ScaleRange)>) -> StaticCatalog {
        let by_code = entries
            .iter()
            .enumerate()
            .map(|(i, &(code, _))| (code, i as u32))
            .collect();
        StaticCatalog { entries, by_code }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CategoriesCatalog for StaticCatalog {
    fn contains(&self, code: TypeCode) -> bool {
        self.by_code.contains_key(&code)
    }

    fn drawable_scale_range(&self, code: TypeCode) -> Option<ScaleRange> {
        self.by_code
            .get(&code)
            .map(|&i| self.entries[i as usize].1)
    }

    fn canonical_id(&self, code: TypeCode) -> Option<u32> {
        self.by_code.get(&code).copied()
    }
}

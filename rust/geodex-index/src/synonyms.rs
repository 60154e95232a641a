//! Synonyms dictionary for administrative feature names.
//!
//! Loaded once per build from a line-oriented UTF-8 resource with entries of
//! the form `canonical:syn1,syn2,...`. Lookup is an exact match on the raw
//! (un-normalized) canonical text. The table is only consulted for features
//! classified as administrative, to bound index growth.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ahash::AHashMap;
use geodex_common::{Result, error::Error};

/// Immutable multimap from a raw canonical name to its alternate spellings.
pub struct SynonymsTable {
    map: AHashMap<String, Vec<String>>,
    len: usize,
}

impl SynonymsTable {
    /// Loads the table from a reader over the flat text dictionary.
    ///
    /// Blank lines and lines without a `:` separator are skipped. Fields are
    /// trimmed. A synonym field containing internal whitespace is a data
    /// error in the dictionary; it is logged and dropped rather than allowed
    /// to reach lookup, since such an entry could never match a single
    /// normalized token.
    pub fn load<R: Read>(mut reader: R) -> Result<SynonymsTable> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::io("synonyms resource", e))?;

        let mut map: AHashMap<String, Vec<String>> = AHashMap::new();
        let mut len = 0usize;
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let Some((canonical, rest)) = line.split_once(':') else {
                continue;
            };
            let canonical = canonical.trim();
            if canonical.is_empty() {
                continue;
            }
            let alternates = map.entry(canonical.to_string()).or_default();
            for field in rest.split(',') {
                let synonym = field.trim();
                if synonym.is_empty() {
                    continue;
                }
                if synonym.chars().any(char::is_whitespace) {
                    log::warn!("synonym '{synonym}' for '{canonical}' contains whitespace, dropped");
                    continue;
                }
                alternates.push(synonym.to_string());
                len += 1;
            }
        }
        Ok(SynonymsTable { map, len })
    }

    /// Loads the table from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<SynonymsTable> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::io(format!("open synonyms {}", path.display()), e))?;
        SynonymsTable::load(file)
    }

    /// Invokes `f` for every alternate registered for the exact raw name.
    pub fn for_each<F: FnMut(&str)>(&self, name: &str, mut f: F) {
        if let Some(alternates) = self.map.get(name) {
            for synonym in alternates {
                f(synonym);
            }
        }
    }

    /// Total number of synonym entries across all canonical names.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

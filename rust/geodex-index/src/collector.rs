//! Key/value pair collection: the per-feature pass that turns names into
//! token keys, appends synonym tokens for administrative features, and
//! injects category pseudo-tokens for scale-eligible types.
//!
//! Pairs are append-only and unsorted here; deduplication is never performed
//! (the same key may legitimately carry the same feature twice through a
//! synonym collision). The orchestrator owns the global sort.

use geodex_common::{Result, error::Error};
use geodex_format::features::ScaleRange;

use crate::categories::CategoriesCatalog;
use crate::source::FeatureRef;
use crate::synonyms::SynonymsTable;
use crate::tokenize;
use crate::types::{TypeFilter, TypesHolder};
use crate::values::{IndexValue, ValueBuilder};

/// Reserved language sentinel under which category pseudo-tokens are keyed.
pub const CATEGORIES_LANG: i8 = -128;

/// Default cap on the number of tokens a single name may produce.
pub const MAX_NAME_TOKENS: usize = 32;

/// Granularity category codes are collapsed to before catalog checks, so
/// that fine subtype distinctions all land on one cataloged entry.
const CATEGORY_TRUNC_LEVEL: u8 = 2;

/// One collected (key, value) pair. The key is the language byte followed by
/// the normalized token's UTF-8 bytes; keys compare lexicographically as
/// byte sequences.
pub type KeyValuePair = (Vec<u8>, IndexValue);

/// Builds the byte key for a (language, normalized token) pair.
pub fn key_bytes(lang: i8, token: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(token.len() + 1);
    key.push(lang as u8);
    key.extend_from_slice(token.as_bytes());
    key
}

/// Emits token keys for one feature's names into the shared pair sequence.
struct NameInserter<'a> {
    synonyms: Option<&'a SynonymsTable>,
    pairs: &'a mut Vec<KeyValuePair>,
    value: IndexValue,
    max_tokens: usize,
}

impl NameInserter<'_> {
    fn add_token(&mut self, lang: i8, token: &str) {
        self.pairs.push((key_bytes(lang, token), self.value));
    }

    /// Tokenizes one raw name and emits a key per retained token. Returns the
    /// number of tokens emitted.
    fn process_name(&mut self, lang: i8, name: &str) -> usize {
        let normalized = tokenize::normalize(name);
        let mut tokens: Vec<&str> = tokenize::tokens(&normalized).collect();

        // Synonyms are registered against the raw name and enter as whole
        // tokens; the load-time whitespace invariant guarantees each one is
        // a single token.
        let mut synonym_tokens: Vec<String> = Vec::new();
        if let Some(synonyms) = self.synonyms {
            synonyms.for_each(name, |s| synonym_tokens.push(tokenize::normalize(s)));
        }
        tokens.extend(synonym_tokens.iter().map(String::as_str));

        let max = self.max_tokens - 1;
        if tokens.len() > max {
            log::warn!("name has too many tokens, truncating: {name}");
            tokens.truncate(max);
        }

        for token in &tokens {
            self.add_token(lang, token);
        }
        tokens.len()
    }
}

/// Per-build feature pass: filters types, emits name and synonym tokens, and
/// injects category pseudo-tokens. Owns the collected pair sequence for the
/// duration of the build.
pub struct FeatureIndexer<'a> {
    synonyms: Option<&'a SynonymsTable>,
    filter: &'a TypeFilter,
    catalog: &'a dyn CategoriesCatalog,
    scales: ScaleRange,
    value_builder: ValueBuilder,
    max_tokens: usize,
    pairs: Vec<KeyValuePair>,
}

impl<'a> FeatureIndexer<'a> {
    pub fn new(
        synonyms: Option<&'a SynonymsTable>,
        filter: &'a TypeFilter,
        catalog: &'a dyn CategoriesCatalog,
        scales: ScaleRange,
        value_builder: ValueBuilder,
        max_tokens: usize,
    ) -> FeatureIndexer<'a> {
        FeatureIndexer {
            synonyms,
            filter,
            catalog,
            scales,
            value_builder,
            max_tokens,
            pairs: Vec::new(),
        }
    }

    /// Processes one feature, appending its pairs to the collected sequence.
    pub fn process_feature(&mut self, feature: &FeatureRef<'_>) -> Result<()> {
        let mut types = TypesHolder::from_raw(feature.type_codes);
        self.filter.skip_types(&mut types);
        if types.is_empty() {
            return Ok(());
        }

        let value = self.value_builder.make_value(feature);

        // Synonyms only for countries and states, to bound index growth.
        let synonyms = if self.filter.is_administrative(&types) {
            self.synonyms
        } else {
            None
        };

        let mut inserter = NameInserter {
            synonyms,
            pairs: &mut self.pairs,
            value,
            max_tokens: self.max_tokens,
        };
        let mut token_count = 0usize;
        feature.for_each_name(|lang, name| {
            token_count += inserter.process_name(lang, name);
            true
        });

        if token_count == 0 {
            self.filter.skip_unnamed_types(&mut types);
        }
        if types.is_empty() {
            return Ok(());
        }

        for code in types.iter() {
            let truncated = self.catalog.truncate(code, CATEGORY_TRUNC_LEVEL);
            if !self.catalog.contains(truncated) {
                continue;
            }
            let range = self
                .catalog
                .drawable_scale_range(truncated)
                .filter(ScaleRange::is_valid)
                .ok_or_else(|| {
                    // A cataloged code with a broken range is corrupt catalog
                    // data, not a per-feature condition: fail the build.
                    Error::invalid_format(
                        "categories catalog",
                        format!(
                            "invalid drawable scale range for cataloged type {:#010x}",
                            truncated.raw()
                        ),
                    )
                })?;
            if range.intersects(&self.scales) {
                let id = self.catalog.canonical_id(truncated).ok_or_else(|| {
                    Error::invalid_format(
                        "categories catalog",
                        format!("no canonical id for cataloged type {:#010x}", truncated.raw()),
                    )
                })?;
                self.pairs
                    .push((key_bytes(CATEGORIES_LANG, &id.to_string()), value));
            }
        }
        Ok(())
    }

    /// Number of pairs collected so far.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Hands the collected sequence to the orchestrator.
    pub fn into_pairs(self) -> Vec<KeyValuePair> {
        self.pairs
    }
}

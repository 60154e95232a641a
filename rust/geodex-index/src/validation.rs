//! Diagnostic coverage report over a finished index.
//!
//! Walks the feature source a second time and checks that every token a
//! named feature would emit resolves back to that feature through the trie.
//! Purely observational: logs a match rate and returns the counters, never
//! feeds the serialized index.

use geodex_common::{Result, verify_arg};

use crate::read::trie::TrieReader;
use crate::source::FeatureSource;
use crate::tokenize;
use crate::values::IndexValue;

/// Counters produced by [`report_name_coverage`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Features that produced at least one name token.
    pub named_features: u64,
    /// Named features all of whose tokens resolve back to them.
    pub covered_features: u64,
}

impl CoverageReport {
    pub fn coverage(&self) -> f64 {
        if self.named_features == 0 {
            1.0
        } else {
            self.covered_features as f64 / self.named_features as f64
        }
    }
}

/// Checks, for every feature with at least one name, that each of its name
/// tokens maps to a value list containing the feature's reference.
///
/// Features whose types were filtered out of the index entirely show up as
/// uncovered; with an empty filter configuration the expected coverage is
/// 1.0.
pub fn report_name_coverage(
    source: &dyn FeatureSource,
    reader: &TrieReader,
    max_name_tokens: usize,
) -> Result<CoverageReport> {
    verify_arg!(max_name_tokens, max_name_tokens >= 2);

    let mut report = CoverageReport::default();
    source.for_each_feature(&mut |feature| {
        let mut token_keys: Vec<(i8, String)> = Vec::new();
        feature.for_each_name(|lang, name| {
            let normalized = tokenize::normalize(name);
            for token in tokenize::tokens(&normalized).take(max_name_tokens - 1) {
                token_keys.push((lang, token.to_string()));
            }
            true
        });
        if token_keys.is_empty() {
            return Ok(());
        }
        report.named_features += 1;
        let covered = token_keys.iter().all(|(lang, token)| {
            reader
                .values_for_token(*lang, token)
                .iter()
                .map(IndexValue::feature_id)
                .any(|id| id == feature.index)
        });
        if covered {
            report.covered_features += 1;
        }
        Ok(())
    })?;

    log::info!(
        "name coverage: {}/{} named features fully resolvable ({:.1}%)",
        report.covered_features,
        report.named_features,
        100.0 * report.coverage()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodex_format::coding::{CodingParams, PointU};
    use geodex_format::features::{
        FeatureCollection, FeatureRecord, ScaleRange, Scope, SourceHeader,
    };

    use crate::build::{BuildConfig, build_search_index};
    use crate::categories::StaticCatalog;
    use crate::collector::MAX_NAME_TOKENS;
    use crate::types::TypeCode;

    fn collection(records: Vec<FeatureRecord>) -> FeatureCollection {
        FeatureCollection::new(
            SourceHeader {
                scope: Scope::Region,
                coding: CodingParams::new(32, PointU::default()).unwrap(),
                scale_range: ScaleRange::new(0, 17),
            },
            records,
        )
    }

    fn record(name: &str) -> FeatureRecord {
        FeatureRecord {
            type_codes: vec![TypeCode::from_path(&[1, 6]).unwrap().raw()],
            names: vec![(1, name.to_string())],
            population: 0,
            center: PointU::default(),
        }
    }

    #[test]
    fn test_full_coverage_after_build() {
        let source = collection(vec![record("Dover Castle"), record("Exeter")]);
        let catalog = StaticCatalog::new(vec![]);
        let config = BuildConfig::default();
        let mut blob = Vec::new();
        build_search_index(&source, &catalog, &config, &mut blob).unwrap();
        let reader = TrieReader::read(&mut &blob[..]).unwrap();

        let report = report_name_coverage(&source, &reader, MAX_NAME_TOKENS).unwrap();
        assert_eq!(report.named_features, 2);
        assert_eq!(report.covered_features, 2);
        assert_eq!(report.coverage(), 1.0);
    }

    #[test]
    fn test_unindexed_feature_is_uncovered() {
        let indexed = collection(vec![record("Dover")]);
        let catalog = StaticCatalog::new(vec![]);
        let config = BuildConfig::default();
        let mut blob = Vec::new();
        build_search_index(&indexed, &catalog, &config, &mut blob).unwrap();
        let reader = TrieReader::read(&mut &blob[..]).unwrap();

        // Validate against a source holding a feature the index never saw.
        let other = collection(vec![record("Plymouth")]);
        let report = report_name_coverage(&other, &reader, MAX_NAME_TOKENS).unwrap();
        assert_eq!(report.named_features, 1);
        assert_eq!(report.covered_features, 0);
    }

    #[test]
    fn test_token_cap_below_minimum_rejected() {
        let source = collection(vec![record("Dover")]);
        let catalog = StaticCatalog::new(vec![]);
        let mut blob = Vec::new();
        build_search_index(&source, &catalog, &BuildConfig::default(), &mut blob).unwrap();
        let reader = TrieReader::read(&mut &blob[..]).unwrap();
        assert!(report_name_coverage(&source, &reader, 0).is_err());
        assert!(report_name_coverage(&source, &reader, 1).is_err());
    }

    #[test]
    fn test_empty_source() {
        let source = collection(vec![]);
        let catalog = StaticCatalog::new(vec![]);
        let mut blob = Vec::new();
        build_search_index(&source, &catalog, &BuildConfig::default(), &mut blob).unwrap();
        let reader = TrieReader::read(&mut &blob[..]).unwrap();
        let report = report_name_coverage(&source, &reader, MAX_NAME_TOKENS).unwrap();
        assert_eq!(report.named_features, 0);
        assert_eq!(report.coverage(), 1.0);
    }
}

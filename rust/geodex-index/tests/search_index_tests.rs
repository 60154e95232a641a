use std::io::Write;
use std::path::Path;

use geodex_format::coding::{CodingParams, PointU};
use geodex_format::container::{Container, FEATURES_TAG, SEARCH_INDEX_TAG};
use geodex_format::features::{
    FeatureCollection, FeatureRecord, ScaleRange, Scope, SourceHeader,
};
use geodex_format::rw_ops;
use geodex_index::CATEGORIES_LANG;
use geodex_index::build::{BuildConfig, build_search_index, build_search_index_file};
use geodex_index::categories::StaticCatalog;
use geodex_index::read::trie::TrieReader;
use geodex_index::types::{FilterLists, TypeCode};
use geodex_index::values::{IndexValue, ValueShape};
use tempfile::TempDir;

const LANG_EN: i8 = 1;
const LANG_FR: i8 = 2;

fn type_code(path: &[u8]) -> TypeCode {
    TypeCode::from_path(path).expect("valid type path")
}

fn town_code() -> TypeCode {
    type_code(&[1, 6])
}

fn header() -> SourceHeader {
    SourceHeader {
        scope: Scope::Region,
        coding: CodingParams::new(32, PointU::new(1 << 30, 1 << 30)).expect("valid params"),
        scale_range: ScaleRange::new(10, 17),
    }
}

fn plain_feature(name: &str) -> FeatureRecord {
    FeatureRecord {
        type_codes: vec![town_code().raw()],
        names: vec![(LANG_EN, name.to_string())],
        population: 1_000,
        center: PointU::new(1 << 30, 1 << 30),
    }
}

fn town_catalog() -> StaticCatalog {
    StaticCatalog::new(vec![(town_code(), ScaleRange::new(10, 17))])
}

fn build_blob(
    source: &FeatureCollection,
    catalog: &StaticCatalog,
    config: &BuildConfig,
) -> Vec<u8> {
    let mut blob = Vec::new();
    build_search_index(source, catalog, config, &mut blob).expect("build should succeed");
    blob
}

fn feature_ids(values: &[IndexValue]) -> Vec<u32> {
    values.iter().map(IndexValue::feature_id).collect()
}

fn write_container(path: &Path, source: &FeatureCollection) {
    let mut body = Vec::new();
    source.write(&mut body).expect("serialize features");
    let mut container = Container::create(path).expect("create container");
    container
        .append_section(FEATURES_TAG, &body)
        .expect("write features section");
}

fn read_index_from_container(path: &Path) -> TrieReader {
    let container = Container::open(path).expect("open container");
    let reversed = container
        .read_section(SEARCH_INDEX_TAG)
        .expect("index section present");
    let mut blob = Vec::new();
    rw_ops::write_reversed(&mut &reversed[..], &mut blob).expect("un-reverse index");
    TrieReader::read(&mut &blob[..]).expect("parse index")
}

/// Scenario from the design review: feature #7 carries an English and a
/// French name plus a town category whose scale range intersects the build
/// range, and no synonym entry.
#[test]
fn test_dover_castle_scenario() {
    let mut records: Vec<FeatureRecord> = (0..7)
        .map(|i| plain_feature(&format!("filler{i}")))
        .collect();
    records.push(FeatureRecord {
        type_codes: vec![town_code().raw()],
        names: vec![
            (LANG_EN, "Dover Castle".to_string()),
            (LANG_FR, "Château de Douvres".to_string()),
        ],
        population: 31_000,
        center: PointU::new(1 << 30, 1 << 30),
    });
    let source = FeatureCollection::new(header(), records);
    let catalog = town_catalog();

    let blob = build_blob(&source, &catalog, &BuildConfig::default());
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    for (lang, token) in [
        (LANG_EN, "dover"),
        (LANG_EN, "castle"),
        (LANG_FR, "chateau"),
        (LANG_FR, "de"),
        (LANG_FR, "douvres"),
    ] {
        assert!(
            feature_ids(reader.values_for_token(lang, token)).contains(&7),
            "token ({lang}, {token:?}) should resolve to feature 7"
        );
    }

    // The town category pseudo-token, keyed under the reserved sentinel with
    // the catalog index rendered in decimal.
    let ids = feature_ids(reader.values_for_token(CATEGORIES_LANG, "0"));
    assert!(ids.contains(&7));

    // Diacritic-folded lookup only: the raw accented token is not a key.
    assert!(reader.values_for_token(LANG_FR, "château").is_empty());
}

#[test]
fn test_every_named_feature_is_reachable() {
    let records = vec![
        plain_feature("Exeter"),
        plain_feature("Dover Priory"),
        plain_feature("Dovercourt"),
    ];
    let source = FeatureCollection::new(header(), records);
    let blob = build_blob(&source, &town_catalog(), &BuildConfig::default());
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    assert_eq!(feature_ids(reader.values_for_token(LANG_EN, "exeter")), vec![0]);
    assert_eq!(feature_ids(reader.values_for_token(LANG_EN, "priory")), vec![1]);
    assert_eq!(
        feature_ids(reader.values_for_token(LANG_EN, "dovercourt")),
        vec![2]
    );

    // Prefix walk across shared key prefixes.
    let mut seen = Vec::new();
    let mut prefix = vec![LANG_EN as u8];
    prefix.extend_from_slice(b"dover");
    reader.for_each_with_prefix(&prefix, |v| seen.push(v.feature_id()));
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn test_case_and_diacritic_variants_share_keys() {
    let records = vec![plain_feature("ZÜRICH"), plain_feature("zurich")];
    let source = FeatureCollection::new(header(), records);
    let blob = build_blob(&source, &town_catalog(), &BuildConfig::default());
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    assert_eq!(
        feature_ids(reader.values_for_token(LANG_EN, "zurich")),
        vec![0, 1]
    );
}

#[test]
fn test_synonyms_gated_by_administrative_class() {
    let dir = TempDir::new().expect("temp dir");
    let synonyms_path = dir.path().join("synonyms.txt");
    std::fs::write(
        &synonyms_path,
        "onlyonefield\nUnited Kingdom:UK,Great Britain\n",
    )
    .expect("write synonyms");

    let country = type_code(&[1, 1]);
    let records = vec![
        FeatureRecord {
            type_codes: vec![country.raw()],
            names: vec![(LANG_EN, "United Kingdom".to_string())],
            population: 67_000_000,
            center: PointU::new(1 << 30, 1 << 30),
        },
        FeatureRecord {
            // A town by the same name never triggers synonym lookup.
            type_codes: vec![town_code().raw()],
            names: vec![(LANG_EN, "United Kingdom".to_string())],
            population: 100,
            center: PointU::new(1 << 30, 1 << 30),
        },
    ];
    let source = FeatureCollection::new(header(), records);

    let config = BuildConfig {
        load_synonyms: true,
        synonyms_path: Some(synonyms_path),
        filter: FilterLists {
            administrative: vec![country],
            ..Default::default()
        },
        ..Default::default()
    };
    let blob = build_blob(&source, &town_catalog(), &config);
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    // The malformed separator-less line was skipped, the valid entry loaded,
    // and the whitespace-carrying "Great Britain" synonym dropped.
    assert_eq!(feature_ids(reader.values_for_token(LANG_EN, "uk")), vec![0]);
    assert!(reader.values_for_token(LANG_EN, "great").is_empty());
    assert_eq!(
        feature_ids(reader.values_for_token(LANG_EN, "kingdom")),
        vec![0, 1]
    );
}

#[test]
fn test_token_overflow_truncates_and_build_succeeds() {
    let long_name = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let records = vec![plain_feature(&long_name)];
    let source = FeatureCollection::new(header(), records);

    let config = BuildConfig {
        max_name_tokens: 8,
        ..Default::default()
    };
    let blob = build_blob(&source, &town_catalog(), &config);
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    // The leading (max - 1) = 7 tokens survive, the rest are dropped.
    for i in 0..7 {
        assert!(
            !reader
                .values_for_token(LANG_EN, &format!("w{i}"))
                .is_empty(),
            "token w{i} should be indexed"
        );
    }
    assert!(reader.values_for_token(LANG_EN, "w7").is_empty());
}

#[test]
fn test_non_intersecting_scale_range_emits_no_category_token() {
    let viewpoint = type_code(&[5, 2]);
    // Drawable well outside the build range [10, 17].
    let catalog = StaticCatalog::new(vec![(viewpoint, ScaleRange::new(0, 5))]);
    let records = vec![FeatureRecord {
        type_codes: vec![viewpoint.raw()],
        names: vec![(LANG_EN, "Summit".to_string())],
        population: 0,
        center: PointU::new(1 << 30, 1 << 30),
    }];
    let source = FeatureCollection::new(header(), records);
    let blob = build_blob(&source, &catalog, &BuildConfig::default());
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    assert!(reader.values_for_token(CATEGORIES_LANG, "0").is_empty());
    assert_eq!(feature_ids(reader.values_for_token(LANG_EN, "summit")), vec![0]);
}

#[test]
fn test_invalid_catalog_scale_range_fails_build() {
    let catalog = StaticCatalog::new(vec![(town_code(), ScaleRange::new(14, 3))]);
    let source = FeatureCollection::new(header(), vec![plain_feature("Dover")]);
    let mut blob = Vec::new();
    assert!(build_search_index(&source, &catalog, &BuildConfig::default(), &mut blob).is_err());
}

#[test]
fn test_determinism_byte_identical_builds() {
    let records = vec![
        plain_feature("Dover Castle"),
        plain_feature("Dovercourt"),
        plain_feature("Exeter"),
    ];
    let source = FeatureCollection::new(header(), records);
    let config = BuildConfig {
        value_shape: ValueShape::RankAndCenter,
        ..Default::default()
    };
    let first = build_blob(&source, &town_catalog(), &config);
    let second = build_blob(&source, &town_catalog(), &config);
    assert_eq!(first, second);
}

#[test]
fn test_file_build_idempotent_without_force() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("region.gdx");
    let source = FeatureCollection::new(header(), vec![plain_feature("Dover")]);
    write_container(&path, &source);

    let catalog = town_catalog();
    let config = BuildConfig::default();

    build_search_index_file(&path, &catalog, &config, false).expect("first build");
    let len_after_first = std::fs::metadata(&path).expect("metadata").len();

    // Second call short-circuits: success, container untouched.
    build_search_index_file(&path, &catalog, &config, false).expect("second build");
    let len_after_second = std::fs::metadata(&path).expect("metadata").len();
    assert_eq!(len_after_first, len_after_second);

    // Forcing appends a replacement section.
    build_search_index_file(&path, &catalog, &config, true).expect("forced rebuild");
    assert!(std::fs::metadata(&path).expect("metadata").len() > len_after_second);

    let reader = read_index_from_container(&path);
    assert_eq!(feature_ids(reader.values_for_token(LANG_EN, "dover")), vec![0]);

    // No stray temporary files remain next to the container.
    let leftovers = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter(|e| e.as_ref().expect("entry").path() != path)
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_failed_build_leaves_container_untouched() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("region.gdx");
    let source = FeatureCollection::new(header(), vec![plain_feature("Dover")]);
    write_container(&path, &source);
    let len_before = std::fs::metadata(&path).expect("metadata").len();

    // Corrupt catalog: the build must fail before committing anything.
    let catalog = StaticCatalog::new(vec![(town_code(), ScaleRange::new(9, 2))]);
    assert!(build_search_index_file(&path, &catalog, &BuildConfig::default(), false).is_err());

    let container = Container::open(&path).expect("container still readable");
    assert!(!container.section_exists(SEARCH_INDEX_TAG));
    assert_eq!(std::fs::metadata(&path).expect("metadata").len(), len_before);

    // Temporary build file was cleaned up on the failure path too.
    let leftovers = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter(|e| e.as_ref().expect("entry").path() != path)
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_rank_and_center_values_round_trip_through_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("region.gdx");
    let source = FeatureCollection::new(header(), vec![plain_feature("Dover")]);
    write_container(&path, &source);

    let config = BuildConfig {
        value_shape: ValueShape::RankAndCenter,
        ..Default::default()
    };
    build_search_index_file(&path, &town_catalog(), &config, false).expect("build");

    let reader = read_index_from_container(&path);
    assert_eq!(reader.shape(), ValueShape::RankAndCenter);
    let values = reader.values_for_token(LANG_EN, "dover");
    assert_eq!(values.len(), 1);
    match values[0] {
        IndexValue::RankAndCenter { feature_id, rank, center } => {
            assert_eq!(feature_id, 0);
            assert!(rank > 0);
            assert_eq!(center, reader.coding().snap(PointU::new(1 << 30, 1 << 30)));
        }
        IndexValue::Index { .. } => panic!("expected enriched value shape"),
    }
}

#[test]
fn test_randomized_source_is_always_fully_covered() {
    fastrand::seed(7);
    let words = [
        "dover", "castle", "exeter", "plymouth", "harbor", "green", "north", "upper",
    ];
    let records: Vec<FeatureRecord> = (0..200)
        .map(|_| {
            let count = 1 + fastrand::usize(..3);
            let name = (0..count)
                .map(|_| words[fastrand::usize(..words.len())])
                .collect::<Vec<_>>()
                .join(" ");
            plain_feature(&name)
        })
        .collect();
    let source = FeatureCollection::new(header(), records);
    let blob = build_blob(&source, &town_catalog(), &BuildConfig::default());
    let reader = TrieReader::read(&mut &blob[..]).expect("parse index");

    for (index, record) in source.features().iter().enumerate() {
        let name = &record.names[0].1;
        for token in name.split(' ') {
            assert!(
                feature_ids(reader.values_for_token(LANG_EN, token)).contains(&(index as u32)),
                "feature {index} not found under token {token:?}"
            );
        }
    }
}

#[test]
fn test_core_call_writes_through_any_writer() {
    // The core entry point takes an arbitrary writer; a file works as well
    // as a Vec.
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("raw.idx");
    let source = FeatureCollection::new(header(), vec![plain_feature("Dover")]);
    {
        let mut file = std::fs::File::create(&path).expect("create");
        build_search_index(&source, &town_catalog(), &BuildConfig::default(), &mut file)
            .expect("build");
        file.flush().expect("flush");
    }
    let bytes = std::fs::read(&path).expect("read back");
    let reader = TrieReader::read(&mut &bytes[..]).expect("parse index");
    assert_eq!(feature_ids(reader.values_for_token(LANG_EN, "dover")), vec![0]);
}

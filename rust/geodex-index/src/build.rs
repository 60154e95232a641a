//! Build orchestration: drives synonym load, per-feature processing,
//! collection, the global sort, and trie serialization; the file-based entry
//! point adds the already-built short-circuit and the atomic temp-file
//! commit into the container.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use geodex_common::{Result, error::Error, verify_arg};
use geodex_format::coding::index_coding_params;
use geodex_format::container::{Container, FEATURES_TAG, SEARCH_INDEX_TAG};
use geodex_format::features::FeatureCollection;
use geodex_format::rw_ops;

use crate::categories::CategoriesCatalog;
use crate::collector::{FeatureIndexer, MAX_NAME_TOKENS};
use crate::source::FeatureSource;
use crate::synonyms::SynonymsTable;
use crate::types::{FilterLists, TypeFilter};
use crate::values::{ValueBuilder, ValueSerializer, ValueShape};
use crate::write::trie::write_search_index;

/// Build-time configuration. All decisions that the pipeline must not infer
/// from the data are explicit here: the value shape is chosen once for the
/// whole build, and synonym loading is an explicit flag rather than being
/// derived from the container's scope.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub value_shape: ValueShape,
    /// Load and apply the synonyms dictionary. Typically enabled for
    /// world-scope containers only.
    pub load_synonyms: bool,
    /// Path of the synonyms resource; required when `load_synonyms` is set.
    pub synonyms_path: Option<PathBuf>,
    /// Cap on tokens per name; names exceeding it are truncated to one less.
    pub max_name_tokens: usize,
    pub filter: FilterLists,
}

impl Default for BuildConfig {
    fn default() -> BuildConfig {
        BuildConfig {
            value_shape: ValueShape::Index,
            load_synonyms: false,
            synonyms_path: None,
            max_name_tokens: MAX_NAME_TOKENS,
            filter: FilterLists::default(),
        }
    }
}

/// Runs the whole pipeline from a feature source into `writer`.
///
/// This is the core call with no file management: collect (key, value) pairs
/// across all features in source order, sort them into one global byte order,
/// and serialize the trie. Any failure leaves `writer` in an unspecified
/// state; callers that need atomicity stage into a temporary target, as
/// [`build_search_index_file`] does.
pub fn build_search_index<W: Write>(
    source: &dyn FeatureSource,
    catalog: &dyn CategoriesCatalog,
    config: &BuildConfig,
    writer: &mut W,
) -> Result<()> {
    verify_arg!(max_name_tokens, config.max_name_tokens >= 2);

    let started = Instant::now();
    let header = *source.header();
    log::info!(
        "building search index over {} features, scale range [{}, {}]",
        source.feature_count(),
        header.scale_range.min,
        header.scale_range.max
    );

    let synonyms = if config.load_synonyms {
        let path = config.synonyms_path.as_ref().ok_or_else(|| {
            Error::invalid_arg("synonyms_path", "required when load_synonyms is set")
        })?;
        let table = SynonymsTable::from_file(path)?;
        log::info!("loaded {} synonyms from {}", table.len(), path.display());
        Some(table)
    } else {
        None
    };

    let coding = index_coding_params(&header.coding);
    let value_builder = ValueBuilder::new(config.value_shape, coding);
    let serializer = ValueSerializer::new(config.value_shape, coding);
    let filter = TypeFilter::new(config.filter.clone());

    let mut indexer = FeatureIndexer::new(
        synonyms.as_ref(),
        &filter,
        catalog,
        header.scale_range,
        value_builder,
        config.max_name_tokens,
    );
    source.for_each_feature(&mut |feature| indexer.process_feature(&feature))?;

    let mut pairs = indexer.into_pairs();
    pairs.sort_unstable_by(|(ka, va), (kb, vb)| {
        ka.cmp(kb).then_with(|| va.feature_id().cmp(&vb.feature_id()))
    });
    log::info!(
        "collected and sorted {} key/value pairs in {:.3}s",
        pairs.len(),
        started.elapsed().as_secs_f64()
    );

    write_search_index(writer, &pairs, &serializer)?;
    log::info!(
        "search index built in {:.3}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// File-based entry point.
///
/// Returns immediately with success when the container already carries a
/// built index section and `force_rebuild` is unset. Otherwise the index is
/// built into a temporary file alongside the container and committed into
/// the permanent section only on full success, through the container's
/// byte-reversal contract. The temporary file is removed on every exit path.
pub fn build_search_index_file(
    container_path: &Path,
    catalog: &dyn CategoriesCatalog,
    config: &BuildConfig,
    force_rebuild: bool,
) -> Result<()> {
    let mut container = Container::open(container_path)?;
    if container.section_exists(SEARCH_INDEX_TAG) && !force_rebuild {
        log::info!(
            "search index already present in {}, skipping build",
            container_path.display()
        );
        return Ok(());
    }

    let features_blob = container.read_section(FEATURES_TAG)?;
    let source = FeatureCollection::read(&mut &features_blob[..])?;

    let dir = container_path.parent().unwrap_or_else(|| Path::new("."));
    // Dropped on every exit path below, which deletes the file.
    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::io("create temporary index file", e))?;

    build_search_index(&source, catalog, config, staged.as_file_mut())?;

    let index_bytes =
        std::fs::read(staged.path()).map_err(|e| Error::io("read temporary index file", e))?;
    let mut reversed = Vec::with_capacity(index_bytes.len());
    rw_ops::write_reversed(&mut &index_bytes[..], &mut reversed)?;
    container.append_section(SEARCH_INDEX_TAG, &reversed)?;
    log::info!(
        "committed search index section ({} bytes) to {}",
        reversed.len(),
        container_path.display()
    );
    Ok(())
}

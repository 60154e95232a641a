//! Offline construction of a prefix-searchable token index over an immutable
//! collection of geographic features.
//!
//! The pipeline turns every feature's names into normalized token keys,
//! expands synonyms for administrative features, injects category
//! pseudo-tokens for scale-eligible types, collects (key, value) pairs over
//! the whole collection, sorts them into one global order, and serializes a
//! radix trie mapping each complete key to its list of feature values.
//!
//! # Quick start
//!
//! ```no_run
//! use geodex_index::build::{BuildConfig, build_search_index_file};
//! use geodex_index::categories::StaticCatalog;
//!
//! let catalog = StaticCatalog::new(vec![]);
//! let config = BuildConfig::default();
//! build_search_index_file("planet.gdx".as_ref(), &catalog, &config, false).unwrap();
//! ```
//!
//! The core entry point without any file management is
//! [`build::build_search_index`], which drives the whole pipeline from a
//! [`source::FeatureSource`] into any writer.

pub mod build;
pub mod categories;
pub mod collector;
pub mod read;
pub mod source;
pub mod synonyms;
pub mod tokenize;
pub mod types;
pub mod validation;
pub mod values;
pub mod write;

pub use collector::CATEGORIES_LANG;

//! Deserialization side of the search index.

pub mod trie;

//! Reader for the serialized search index: the matching counterpart of
//! [`crate::write::trie`], used by the validation report and by anything
//! that needs to resolve token keys back to feature values.

use std::io::Read;

use geodex_common::{Result, error::Error};
use geodex_format::coding::CodingParams;
use geodex_format::varint;

use crate::collector::key_bytes;
use crate::values::{IndexValue, ValueSerializer, ValueShape};
use crate::write::trie::{INDEX_MAGIC, INDEX_VERSION};

#[derive(Debug)]
struct Node {
    values: Vec<IndexValue>,
    children: Vec<(Vec<u8>, Node)>,
}

/// A parsed search index supporting exact-key and prefix resolution.
pub struct TrieReader {
    serializer: ValueSerializer,
    root: Node,
}

impl TrieReader {
    /// Parses a serialized index blob.
    pub fn read<R: Read>(reader: &mut R) -> Result<TrieReader> {
        let mut header = [0u8; 6];
        reader
            .read_exact(&mut header)
            .map_err(|e| Error::io("index header", e))?;
        if &header[..4] != INDEX_MAGIC {
            return Err(Error::invalid_format("search index", "bad magic bytes"));
        }
        if header[4] != INDEX_VERSION {
            return Err(Error::invalid_format(
                "search index",
                format!("unsupported version {}", header[4]),
            ));
        }
        let shape = ValueShape::from_u8(header[5])?;
        let coding = CodingParams::read(reader)?;
        let serializer = ValueSerializer::new(shape, coding);
        let root = read_node(reader, &serializer)?;
        Ok(TrieReader { serializer, root })
    }

    pub fn shape(&self) -> ValueShape {
        self.serializer.shape()
    }

    pub fn coding(&self) -> CodingParams {
        self.serializer.coding()
    }

    /// Values stored under the exact key, empty when absent.
    pub fn values_for(&self, key: &[u8]) -> &[IndexValue] {
        let mut node = &self.root;
        let mut remaining = key;
        while !remaining.is_empty() {
            let Some((label, child)) = node
                .children
                .iter()
                .find(|(label, _)| remaining.starts_with(label))
            else {
                return &[];
            };
            remaining = &remaining[label.len()..];
            node = child;
        }
        &node.values
    }

    /// Values stored under a (language, normalized token) key.
    pub fn values_for_token(&self, lang: i8, token: &str) -> &[IndexValue] {
        self.values_for(&key_bytes(lang, token))
    }

    /// Invokes `f` for every value whose key starts with `prefix`.
    pub fn for_each_with_prefix<F: FnMut(&IndexValue)>(&self, prefix: &[u8], mut f: F) {
        let mut node = &self.root;
        let mut remaining = prefix;
        while !remaining.is_empty() {
            let candidate = node.children.iter().find(|(label, _)| {
                let n = label.len().min(remaining.len());
                label[..n] == remaining[..n]
            });
            let Some((label, child)) = candidate else {
                return;
            };
            if remaining.len() <= label.len() {
                // Prefix ends inside this edge: the whole subtree matches.
                collect_subtree(child, &mut f);
                return;
            }
            remaining = &remaining[label.len()..];
            node = child;
        }
        collect_subtree(node, &mut f);
    }
}

fn collect_subtree<F: FnMut(&IndexValue)>(node: &Node, f: &mut F) {
    for value in &node.values {
        f(value);
    }
    for (_, child) in &node.children {
        collect_subtree(child, f);
    }
}

fn read_node<R: Read>(reader: &mut R, serializer: &ValueSerializer) -> Result<Node> {
    let value_count = varint::read_u64(reader)?;
    let mut values = Vec::with_capacity(value_count.min(1 << 16) as usize);
    for _ in 0..value_count {
        values.push(serializer.read_value(reader)?);
    }
    let child_count = varint::read_u64(reader)?;
    let mut children = Vec::with_capacity(child_count.min(256) as usize);
    let mut prev_first: Option<u8> = None;
    for _ in 0..child_count {
        let label_len = varint::read_u64(reader)? as usize;
        if label_len == 0 {
            return Err(Error::invalid_format("search index", "empty trie edge label"));
        }
        let mut label = vec![0u8; label_len];
        reader
            .read_exact(&mut label)
            .map_err(|e| Error::io("trie edge label", e))?;
        if let Some(prev) = prev_first {
            if label[0] <= prev {
                return Err(Error::invalid_format(
                    "search index",
                    "trie children out of order",
                ));
            }
        }
        prev_first = Some(label[0]);
        let child = read_node(reader, serializer)?;
        children.push((label, child));
    }
    Ok(Node { values, children })
}

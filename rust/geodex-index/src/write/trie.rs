//! Trie construction over the globally sorted pair sequence, and its
//! serialization.
//!
//! The builder consumes the sorted sequence in one pass. Because keys arrive
//! in ascending byte order, a new key can only share a prefix with the
//! rightmost path of the trie built so far, so insertion never touches
//! completed subtrees and child lists come out sorted by first label byte.
//!
//! Serialization is pre-order with varint framing and is a pure function of
//! (sorted pair sequence, coding params): identical inputs produce
//! byte-identical output.

use std::io::Write;

use geodex_common::{Result, error::Error};
use geodex_format::varint;

use crate::collector::KeyValuePair;
use crate::values::{IndexValue, ValueSerializer};

pub(crate) const INDEX_MAGIC: &[u8; 4] = b"GDXT";
pub(crate) const INDEX_VERSION: u8 = 1;

/// In-memory radix trie node. Edge labels live on the parent's child list.
#[derive(Debug, Default)]
pub struct TrieNode {
    values: Vec<IndexValue>,
    children: Vec<(Vec<u8>, TrieNode)>,
}

impl TrieNode {
    fn with_value(value: IndexValue) -> TrieNode {
        TrieNode {
            values: vec![value],
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, root included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|(_, c)| c.node_count())
            .sum::<usize>()
    }

    fn insert(&mut self, key: &[u8], value: IndexValue) {
        if key.is_empty() {
            self.values.push(value);
            return;
        }
        if let Some((label, child)) = self.children.last_mut() {
            let common = common_prefix_len(label, key);
            if common == label.len() {
                child.insert(&key[common..], value);
                return;
            }
            if common > 0 {
                let label_tail = label.split_off(common);
                let old_child = std::mem::take(child);
                let mut mid = TrieNode::default();
                mid.children.push((label_tail, old_child));
                if common == key.len() {
                    mid.values.push(value);
                } else {
                    mid.children
                        .push((key[common..].to_vec(), TrieNode::with_value(value)));
                }
                *child = mid;
                return;
            }
        }
        self.children.push((key.to_vec(), TrieNode::with_value(value)));
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Builds the radix trie from an ascending-sorted pair sequence.
pub fn build_trie(pairs: &[KeyValuePair]) -> Result<TrieNode> {
    let mut root = TrieNode::default();
    let mut prev: Option<&[u8]> = None;
    for (key, value) in pairs {
        if let Some(prev) = prev {
            if prev > key.as_slice() {
                return Err(Error::invalid_arg(
                    "pairs",
                    "pair sequence is not sorted by key bytes",
                ));
            }
        }
        root.insert(key, *value);
        prev = Some(key);
    }
    Ok(root)
}

/// Builds the trie from the sorted pair sequence and serializes it, header
/// included, into `writer`.
pub fn write_search_index<W: Write>(
    writer: &mut W,
    pairs: &[KeyValuePair],
    serializer: &ValueSerializer,
) -> Result<()> {
    let root = build_trie(pairs)?;
    writer
        .write_all(INDEX_MAGIC)
        .and_then(|_| writer.write_all(&[INDEX_VERSION, serializer.shape().as_u8()]))
        .map_err(|e| Error::io("index header", e))?;
    serializer.coding().write(writer)?;
    write_node(writer, &root, serializer)
}

fn write_node<W: Write>(
    writer: &mut W,
    node: &TrieNode,
    serializer: &ValueSerializer,
) -> Result<()> {
    varint::write_u64(writer, node.values.len() as u64)?;
    for value in &node.values {
        serializer.write_value(writer, value)?;
    }
    varint::write_u64(writer, node.children.len() as u64)?;
    for (label, child) in &node.children {
        varint::write_u64(writer, label.len() as u64)?;
        writer
            .write_all(label)
            .map_err(|e| Error::io("trie edge label", e))?;
        write_node(writer, child, serializer)?;
    }
    Ok(())
}

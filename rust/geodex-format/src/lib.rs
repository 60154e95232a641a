//! Storage-format layer for the geodex pipeline: the tagged-section feature
//! container, the serialized feature-collection codec, and the low-level
//! varint/point coding primitives shared between the container and the
//! search index blob.
//!
//! The index-construction pipeline in `geodex-index` consumes this crate
//! through narrow interfaces (section existence checks, sequential feature
//! iteration, coding params) and never depends on the framing details.

pub mod coding;
pub mod container;
pub mod features;
pub mod rw_ops;
pub mod varint;

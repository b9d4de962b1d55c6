//! Typed views of the extraction backend's intermediate JSON.
//!
//! The reclassification pipeline edits the raw `serde_json::Value` tree so
//! that auxiliary fields round-trip byte-for-byte; the stitching pipeline
//! deserializes each (already repaired) page record into the types here.

mod block;
mod page;

pub use block::{spans_text, Block, BlockType, Line, Span, SpanKind};
pub use page::PageRecord;

//! Page-level types.

use super::Block;
use serde::Deserialize;

/// One page record from the backend's `pdf_info` array.
///
/// Only the fields the stitching pipeline reads are modeled here; the many
/// auxiliary fields (`preproc_blocks`, `layout_bboxes`, images, tables, …)
/// stay in the raw JSON tree and round-trip untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRecord {
    /// 0-based page index.
    #[serde(default)]
    pub page_idx: usize,

    /// `[width, height]` in points.
    #[serde(default)]
    pub page_size: Vec<f64>,

    /// Accepted content blocks, in reading order.
    #[serde(default)]
    pub para_blocks: Vec<Block>,

    /// Blocks the backend rejected (headers, footers, stray marks).
    #[serde(default)]
    pub discarded_blocks: Vec<Block>,
}

impl PageRecord {
    /// Page height, if `page_size` carries a usable pair.
    pub fn height(&self) -> Option<f64> {
        match self.page_size.as_slice() {
            [_, height, ..] if *height > 0.0 => Some(*height),
            _ => None,
        }
    }
}

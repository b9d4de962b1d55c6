//! Moving bottom-of-page discarded blocks back into the main flow.
//!
//! The extraction backend routinely files footnotes as "discarded" because
//! they sit in the footer band. Reclassification walks every page, and any
//! discarded block whose top edge falls inside the configured bottom region
//! is converted to the canonical paragraph-block shape and appended to
//! `para_blocks`. Blocks that fail the geometry test or cannot be converted
//! stay in `discarded_blocks` untouched; a block is never silently lost.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::repair;

/// Default bottom-region threshold: the bottom 20% of the page.
pub const DEFAULT_BOTTOM_PERCENT: f64 = 20.0;

/// Span `type` tags the backend recognizes; anything else is coerced to
/// `text` during conversion.
const SPAN_TYPES: [&str; 5] = [
    "text",
    "inline_equation",
    "interline_equation",
    "image",
    "table",
];

/// Flat text-like fields probed, in order, when lifting a lines-less block.
const FLAT_TEXT_FIELDS: [&str; 4] = ["text", "content", "caption", "description"];

/// Options for reclassification.
#[derive(Debug, Clone)]
pub struct ReclassifyOptions {
    /// Percentage of the page height, measured from the bottom, inside
    /// which a discarded block is considered main content. In `(0, 100]`.
    pub bottom_percent: f64,
}

impl ReclassifyOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self {
            bottom_percent: DEFAULT_BOTTOM_PERCENT,
        }
    }

    /// Set the bottom-region percentage.
    pub fn with_bottom_percent(mut self, percent: f64) -> Self {
        self.bottom_percent = percent;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.bottom_percent > 0.0 && self.bottom_percent <= 100.0 {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "bottom percent must be in (0, 100], got {}",
                self.bottom_percent
            )))
        }
    }
}

impl Default for ReclassifyOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters accumulated over one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclassifyStats {
    /// Pages processed.
    pub pages: usize,
    /// Pages whose schema needed repair.
    pub repaired_pages: usize,
    /// Blocks moved from `discarded_blocks` to `para_blocks`.
    pub moved_blocks: usize,
    /// Pages skipped because their record was unusable.
    pub skipped_pages: usize,
}

/// Outcome of canonical block conversion.
enum Conversion {
    Converted(Value),
    Unconvertible,
}

/// Reclassify every page of a parsed `middle.json` document.
///
/// The input tree is not modified; all work happens on a deep copy, which is
/// returned together with the statistics. Fails fast when `pdf_info` is
/// missing or not an array; everything below that degrades per page or per
/// block.
pub fn reclassify_document(
    doc: &Value,
    options: &ReclassifyOptions,
) -> Result<(Value, ReclassifyStats)> {
    options.validate()?;

    let mut out = doc.clone();
    let pages = out
        .get_mut("pdf_info")
        .ok_or(Error::MissingKey("pdf_info"))?
        .as_array_mut()
        .ok_or_else(|| Error::InvalidStructure("`pdf_info` is not an array".to_string()))?;

    let threshold_ratio = 1.0 - options.bottom_percent / 100.0;
    let mut stats = ReclassifyStats::default();

    for (idx, page) in pages.iter_mut().enumerate() {
        let Some(record) = page.as_object_mut() else {
            log::warn!("page {idx}: record is not an object, skipping");
            stats.skipped_pages += 1;
            continue;
        };
        if repair::repair_page(record, idx) {
            stats.repaired_pages += 1;
        }
        stats.pages += 1;
        stats.moved_blocks += reclassify_page(record, idx, threshold_ratio);
    }

    Ok((out, stats))
}

/// Move qualifying discarded blocks on one (already repaired) page.
/// Returns the number of blocks moved.
fn reclassify_page(page: &mut Map<String, Value>, page_idx: usize, threshold_ratio: f64) -> usize {
    let Some(height) = page_height(page) else {
        log::warn!("page {page_idx}: no usable page_size, skipping");
        return 0;
    };
    let y_threshold = height * threshold_ratio;

    let discarded = match page.get_mut("discarded_blocks") {
        Some(slot @ Value::Array(_)) => {
            let Value::Array(blocks) = std::mem::replace(slot, Value::Array(Vec::new())) else {
                return 0;
            };
            blocks
        }
        _ => {
            log::warn!("page {page_idx}: `discarded_blocks` is not an array, skipping");
            return 0;
        }
    };

    if !matches!(page.get("para_blocks"), Some(Value::Array(_))) {
        page.insert("para_blocks".to_string(), Value::Array(Vec::new()));
    }

    let mut remaining = Vec::with_capacity(discarded.len());
    let mut moved = Vec::new();
    for block in discarded {
        if in_bottom_region(&block, y_threshold) {
            match convert_to_para_block(&block) {
                Conversion::Converted(converted) => {
                    moved.push(converted);
                    continue;
                }
                Conversion::Unconvertible => {
                    log::debug!("page {page_idx}: block in bottom region not convertible, keeping");
                }
            }
        }
        remaining.push(block);
    }

    let count = moved.len();
    if count > 0 {
        log::debug!("page {page_idx}: moved {count} discarded block(s) into para_blocks");
    }
    if let Some(Value::Array(para)) = page.get_mut("para_blocks") {
        para.extend(moved);
    }
    if let Some(slot) = page.get_mut("discarded_blocks") {
        *slot = Value::Array(remaining);
    }
    count
}

fn page_height(page: &Map<String, Value>) -> Option<f64> {
    let size = page.get("page_size")?.as_array()?;
    let height = size.get(1)?.as_f64()?;
    (height > 0.0).then_some(height)
}

/// Whether the block has a well-formed bbox whose top edge sits at or below
/// the threshold. y grows downward, so a larger `y0` is closer to the page
/// bottom.
fn in_bottom_region(block: &Value, y_threshold: f64) -> bool {
    let Some(bbox) = block.get("bbox").and_then(Value::as_array) else {
        return false;
    };
    if bbox.len() != 4 || !bbox.iter().all(|v| v.as_f64().is_some()) {
        return false;
    }
    bbox[1].as_f64().is_some_and(|y0| y0 >= y_threshold)
}

/// Map an arbitrary discarded block into the canonical paragraph-block
/// shape.
///
/// Blocks that already carry `lines` keep their structure with the `type`
/// forced to `text` and every span normalized; lines-less blocks get one
/// synthesized line/span holding the first populated flat text field. A
/// block without a bbox, or with a shape that cannot be walked, is
/// unconvertible.
fn convert_to_para_block(block: &Value) -> Conversion {
    let Some(record) = block.as_object() else {
        return Conversion::Unconvertible;
    };
    let Some(bbox) = record.get("bbox") else {
        return Conversion::Unconvertible;
    };

    if let Some(lines) = record.get("lines") {
        if !lines.is_array() {
            return Conversion::Unconvertible;
        }
        let mut converted = record.clone();
        converted.insert("type".to_string(), json!("text"));
        if let Some(Value::Array(lines)) = converted.get_mut("lines") {
            for line in lines {
                if !normalize_line(line) {
                    return Conversion::Unconvertible;
                }
            }
        }
        return Conversion::Converted(Value::Object(converted));
    }

    let text = FLAT_TEXT_FIELDS
        .iter()
        .find_map(|field| {
            record
                .get(*field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("");

    Conversion::Converted(json!({
        "type": "text",
        "bbox": bbox,
        "lines": [{
            "bbox": bbox,
            "spans": [{
                "bbox": bbox,
                "type": "text",
                "content": text,
            }],
        }],
    }))
}

/// Normalize one line in place. Returns false when the line cannot be
/// walked at all.
fn normalize_line(line: &mut Value) -> bool {
    let Some(record) = line.as_object_mut() else {
        return false;
    };
    match record.get_mut("spans") {
        Some(Value::Array(spans)) => {
            for span in spans {
                if !normalize_span(span) {
                    return false;
                }
            }
        }
        _ => {
            record.insert("spans".to_string(), Value::Array(Vec::new()));
        }
    }
    true
}

/// Normalize one span in place: a missing `type` becomes `text` (with
/// `content` defaulted alongside it), an unrecognized `type` is coerced to
/// `text`.
fn normalize_span(span: &mut Value) -> bool {
    let Some(record) = span.as_object_mut() else {
        return false;
    };
    match record.get("type") {
        None => {
            record.insert("type".to_string(), json!("text"));
            record
                .entry("content")
                .or_insert_with(|| json!(""));
        }
        Some(tag) => {
            let known = tag.as_str().is_some_and(|t| SPAN_TYPES.contains(&t));
            if !known {
                record.insert("type".to_string(), json!("text"));
            }
        }
    }
    true
}

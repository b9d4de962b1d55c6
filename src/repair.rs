//! Page-record schema repair.
//!
//! The extraction backend occasionally emits page records with missing or
//! truncated fields. Every pipeline in this crate runs repair first so that
//! downstream geometry code can rely on `page_size` and the block containers
//! being present. Missing or malformed data is never an error here: it is
//! made well-formed by substituting documented defaults.

use serde_json::{json, Map, Value};

/// Default page size in points (US Letter), used when a record carries no
/// usable `page_size`.
pub const DEFAULT_PAGE_SIZE: [f64; 2] = [612.0, 792.0];

/// Height appended when `page_size` holds only a width.
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Fields that must exist on every page record with an array default.
const LIST_FIELDS: [&str; 8] = [
    "preproc_blocks",
    "layout_bboxes",
    "_layout_tree",
    "images",
    "tables",
    "interline_equations",
    "discarded_blocks",
    "para_blocks",
];

/// Ensure a page record carries every required field.
///
/// Collection fields default to empty arrays, `page_idx` to the record's
/// position in `pdf_info`, `page_size` to [`DEFAULT_PAGE_SIZE`]. A
/// single-element `page_size` gets [`DEFAULT_PAGE_HEIGHT`] appended; one
/// that still is not a pair of positive numbers afterwards is replaced
/// outright. Returns whether anything was filled in or coerced.
pub fn repair_page(page: &mut Map<String, Value>, page_idx: usize) -> bool {
    let mut fixed = false;

    for field in LIST_FIELDS {
        if !page.contains_key(field) {
            page.insert(field.to_string(), Value::Array(Vec::new()));
            fixed = true;
        }
    }

    if !page.contains_key("page_idx") {
        page.insert("page_idx".to_string(), json!(page_idx));
        fixed = true;
    }

    if !page.contains_key("page_size") {
        page.insert("page_size".to_string(), json!(DEFAULT_PAGE_SIZE));
        fixed = true;
    }

    if let Some(Value::Array(size)) = page.get_mut("page_size") {
        if size.len() == 1 {
            // width-only records show up on scanned input
            size.push(json!(DEFAULT_PAGE_HEIGHT));
            fixed = true;
        } else if size.is_empty() {
            *size = vec![json!(DEFAULT_PAGE_SIZE[0]), json!(DEFAULT_PAGE_SIZE[1])];
            fixed = true;
        } else if size.len() > 2 {
            size.truncate(2);
            fixed = true;
        }
    }

    if !page_size_is_valid(page.get("page_size")) {
        page.insert("page_size".to_string(), json!(DEFAULT_PAGE_SIZE));
        fixed = true;
    }

    if !page.contains_key("need_drop") {
        page.insert("need_drop".to_string(), Value::Bool(false));
        fixed = true;
    }
    if !page.contains_key("drop_reason") {
        page.insert("drop_reason".to_string(), Value::Array(Vec::new()));
        fixed = true;
    }

    fixed
}

/// Repair every object in a `pdf_info` array. Returns how many pages were
/// modified. Non-object entries are left alone (and logged); the callers
/// skip them later with a diagnostic of their own.
pub fn repair_document(pages: &mut [Value]) -> usize {
    let mut repaired = 0;
    for (idx, page) in pages.iter_mut().enumerate() {
        match page.as_object_mut() {
            Some(obj) => {
                if repair_page(obj, idx) {
                    repaired += 1;
                }
            }
            None => log::warn!("page {idx}: record is not an object, leaving as-is"),
        }
    }
    repaired
}

fn page_size_is_valid(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Array(size))
        if size.len() == 2
            && size
                .iter()
                .all(|v| v.as_f64().is_some_and(|n| n > 0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_fills_all_missing_fields() {
        let mut record = page(json!({}));
        assert!(repair_page(&mut record, 7));

        for field in LIST_FIELDS {
            assert!(record.get(field).unwrap().is_array(), "{field} missing");
        }
        assert_eq!(record["page_idx"], json!(7));
        assert_eq!(record["page_size"], json!([612.0, 792.0]));
        assert_eq!(record["need_drop"], json!(false));
        assert_eq!(record["drop_reason"], json!([]));
    }

    #[test]
    fn test_complete_record_untouched() {
        let mut record = page(json!({
            "preproc_blocks": [], "layout_bboxes": [], "_layout_tree": [],
            "images": [], "tables": [], "interline_equations": [],
            "discarded_blocks": [], "para_blocks": [],
            "page_idx": 0, "page_size": [595.0, 842.0],
            "need_drop": false, "drop_reason": [],
        }));
        let before = record.clone();
        assert!(!repair_page(&mut record, 0));
        assert_eq!(record, before);
    }

    #[test]
    fn test_single_element_page_size_gets_height() {
        let mut record = page(json!({ "page_size": [595.0] }));
        assert!(repair_page(&mut record, 0));
        assert_eq!(record["page_size"], json!([595.0, 792.0]));
    }

    #[test]
    fn test_empty_page_size_replaced() {
        let mut record = page(json!({ "page_size": [] }));
        repair_page(&mut record, 0);
        assert_eq!(record["page_size"], json!([612.0, 792.0]));
    }

    #[test]
    fn test_non_array_page_size_replaced() {
        let mut record = page(json!({ "page_size": "A4" }));
        repair_page(&mut record, 0);
        assert_eq!(record["page_size"], json!([612.0, 792.0]));
    }

    #[test]
    fn test_non_numeric_page_size_replaced() {
        let mut record = page(json!({ "page_size": ["612", "792"] }));
        repair_page(&mut record, 0);
        assert_eq!(record["page_size"], json!([612.0, 792.0]));
    }

    #[test]
    fn test_oversized_page_size_truncated() {
        let mut record = page(json!({ "page_size": [612.0, 792.0, 0.0] }));
        assert!(repair_page(&mut record, 0));
        assert_eq!(record["page_size"], json!([612.0, 792.0]));
    }

    #[test]
    fn test_existing_page_idx_kept() {
        let mut record = page(json!({ "page_idx": 42 }));
        repair_page(&mut record, 3);
        assert_eq!(record["page_idx"], json!(42));
    }

    #[test]
    fn test_repair_document_counts_pages() {
        let mut pages = vec![json!({}), json!({ "page_size": [612.0, 792.0] }), json!(null)];
        // page 0 needs everything, page 1 needs the rest, page 2 is skipped
        let repaired = repair_document(&mut pages);
        assert_eq!(repaired, 2);
        assert_eq!(pages[1]["page_idx"], json!(1));
        assert!(pages[2].is_null());
    }
}

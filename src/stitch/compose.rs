//! Splicing insertion fragments into a document.

/// One pending insertion: a fragment destined for a byte offset in the
/// original document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Byte offset into the original (pre-insertion) document.
    pub offset: usize,
    /// Text to splice in at that offset.
    pub fragment: String,
}

/// Splice every fragment into `doc` at its offset.
///
/// Insertions are applied from the highest offset down, so lower offsets are
/// never shifted by fragments already spliced in and no offset bookkeeping
/// is needed. The sort is stable: fragments sharing an offset keep their
/// input order relative to each other (the one appearing later in the input
/// ends up earlier in the document, since it is spliced in front of the
/// fragment already sitting at that offset).
pub fn splice(doc: &str, mut insertions: Vec<Insertion>) -> String {
    insertions.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut out = doc.to_string();
    for insertion in insertions {
        let at = floor_boundary(doc, insertion.offset);
        out.insert_str(at, &insertion.fragment);
    }
    out
}

/// Clamp `offset` into `doc` and snap it down to a char boundary.
pub(crate) fn floor_boundary(doc: &str, offset: usize) -> usize {
    let mut at = offset.min(doc.len());
    while !doc.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// Clamp `offset` into `doc` and snap it up to a char boundary.
pub(crate) fn ceil_boundary(doc: &str, offset: usize) -> usize {
    let mut at = offset.min(doc.len());
    while at < doc.len() && !doc.is_char_boundary(at) {
        at += 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(offset: usize, fragment: &str) -> Insertion {
        Insertion {
            offset,
            fragment: fragment.to_string(),
        }
    }

    #[test]
    fn test_single_insertion() {
        assert_eq!(splice("hello world", vec![ins(5, ",")]), "hello, world");
    }

    #[test]
    fn test_multiple_insertions_keep_offsets_valid() {
        let result = splice("abcdef", vec![ins(1, "X"), ins(3, "Y"), ins(5, "Z")]);
        assert_eq!(result, "aXbcYdeZf");
    }

    #[test]
    fn test_input_order_does_not_matter_for_distinct_offsets() {
        let forward = splice("abcdef", vec![ins(1, "X"), ins(5, "Z")]);
        let backward = splice("abcdef", vec![ins(5, "Z"), ins(1, "X")]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_shared_offset_keeps_input_order_semantics() {
        // the later input fragment is spliced in front of the earlier one
        let result = splice("abc", vec![ins(1, "1"), ins(1, "2")]);
        assert_eq!(result, "a21bc");
    }

    #[test]
    fn test_insert_at_ends() {
        assert_eq!(splice("abc", vec![ins(0, "<"), ins(3, ">")]), "<abc>");
    }

    #[test]
    fn test_remove_fragments_reconstructs_original() {
        let doc = "The quick brown fox jumps over the lazy dog.";
        let insertions = vec![ins(4, "[1]"), ins(16, "[2]"), ins(44, "[3]")];
        let spliced = splice(doc, insertions);

        let reconstructed = spliced.replace("[1]", "").replace("[2]", "").replace("[3]", "");
        assert_eq!(reconstructed, doc);
    }

    #[test]
    fn test_offset_clamped_to_document_length() {
        assert_eq!(splice("abc", vec![ins(100, "!")]), "abc!");
    }

    #[test]
    fn test_mid_char_offset_snaps_down() {
        // 每 is 3 bytes; offset 1 is inside it
        assert_eq!(splice("每天", vec![ins(1, "|")]), "|每天");
    }

    #[test]
    fn test_boundary_helpers() {
        let doc = "a每b";
        assert_eq!(floor_boundary(doc, 2), 1);
        assert_eq!(ceil_boundary(doc, 2), 4);
        assert_eq!(floor_boundary(doc, 99), doc.len());
        assert_eq!(ceil_boundary(doc, 99), doc.len());
    }
}

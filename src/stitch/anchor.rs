//! Fuzzy text anchoring against a rendered Markdown document.
//!
//! Extracted block text and the externally rendered Markdown never agree on
//! whitespace, so all matching happens on whitespace-stripped text and the
//! resulting position is mapped back to a byte offset in the original
//! document. The stripped copy and its back-mapping table are built once per
//! document ([`AnchorIndex`]) because locating runs for every page and, in
//! keyword mode, for every footnote.

/// Result of an anchoring attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Matched; byte offset into the original haystack, always on a char
    /// boundary.
    Found(usize),
    /// Every strategy failed; the caller should place the fragment at the
    /// end of the document.
    DocumentEnd,
    /// The target was empty after stripping whitespace.
    Empty,
}

/// Minimum length (in chars) for a sentence segment to be worth searching.
const MIN_SEGMENT_CHARS: usize = 10;

/// Minimum length (in chars) for a keyword token.
const MIN_KEYWORD_CHARS: usize = 2;

/// How many keyword tokens to try, longest first.
const MAX_KEYWORDS: usize = 3;

/// Sentence-ending glyph used to split targets into segments.
const SEGMENT_SPLIT: char = '。';

/// Whitespace-insensitive position index over a haystack document.
#[derive(Debug)]
pub struct AnchorIndex {
    /// The haystack with all whitespace removed.
    stripped: String,
    /// Byte offset in `stripped` where the k-th kept char starts.
    starts: Vec<usize>,
    /// Byte offset in the original just past the k-th kept char.
    ends: Vec<usize>,
}

impl AnchorIndex {
    /// Build the index for one document.
    pub fn new(haystack: &str) -> Self {
        let mut stripped = String::with_capacity(haystack.len());
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for (pos, ch) in haystack.char_indices() {
            if !ch.is_whitespace() {
                starts.push(stripped.len());
                stripped.push(ch);
                ends.push(pos + ch.len_utf8());
            }
        }
        Self {
            stripped,
            starts,
            ends,
        }
    }

    /// Find the best-guess offset for `target` in the indexed haystack.
    ///
    /// Strategies, first success wins:
    /// 1. whitespace-insensitive exact substring search;
    /// 2. the same search over the longest sentence segment of the target;
    /// 3. the leftmost match among the target's longest keyword tokens —
    ///    a footnote's context should anchor no later than where the
    ///    referencing text begins.
    pub fn locate(&self, target: &str) -> Anchor {
        let stripped_target = strip_whitespace(target);
        if stripped_target.is_empty() {
            return Anchor::Empty;
        }

        if let Some(offset) = self.find_stripped(&stripped_target) {
            return Anchor::Found(offset);
        }

        if let Some(segment) = longest_segment(&stripped_target) {
            if let Some(offset) = self.find_stripped(segment) {
                return Anchor::Found(offset);
            }
        }

        let leftmost = keywords(target)
            .into_iter()
            .filter_map(|word| self.find_stripped(word))
            .min();
        if let Some(offset) = leftmost {
            return Anchor::Found(offset);
        }

        Anchor::DocumentEnd
    }

    /// Search the stripped haystack and map a hit back to the original.
    fn find_stripped(&self, stripped_target: &str) -> Option<usize> {
        self.stripped
            .find(stripped_target)
            .map(|pos| self.map_back(pos))
    }

    /// Map a byte offset in the stripped haystack to the first original
    /// offset `i` such that `haystack[..i]` contains exactly the same
    /// number of non-whitespace chars as `stripped[..pos]`.
    fn map_back(&self, pos: usize) -> usize {
        let ordinal = match self.starts.binary_search(&pos) {
            Ok(k) => k,
            // `pos` comes from a substring match, so it always lands on a
            // char start; tolerate anything else by snapping left
            Err(k) => k.saturating_sub(1),
        };
        if ordinal == 0 {
            0
        } else {
            self.ends[ordinal - 1]
        }
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The longest sentence segment of a (stripped) target that is long enough
/// to be distinctive. None when the target has no segment boundary or no
/// segment qualifies.
fn longest_segment(stripped_target: &str) -> Option<&str> {
    if !stripped_target.contains(SEGMENT_SPLIT) {
        return None;
    }
    stripped_target
        .split(SEGMENT_SPLIT)
        .filter(|s| s.chars().count() > MIN_SEGMENT_CHARS)
        .max_by_key(|s| s.chars().count())
}

/// Up to [`MAX_KEYWORDS`] longest whitespace-delimited tokens of the
/// original target.
fn keywords(target: &str) -> Vec<&str> {
    let mut words: Vec<&str> = target
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_CHARS)
        .collect();
    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    words.truncate(MAX_KEYWORDS);
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let index = AnchorIndex::new("ABCDEF");
        assert_eq!(index.locate("CDE"), Anchor::Found(2));
    }

    #[test]
    fn test_no_match_falls_back_to_document_end() {
        let index = AnchorIndex::new("ABCDEF");
        assert_eq!(index.locate("XYZ"), Anchor::DocumentEnd);
    }

    #[test]
    fn test_empty_target() {
        let index = AnchorIndex::new("ABCDEF");
        assert_eq!(index.locate(""), Anchor::Empty);
        assert_eq!(index.locate(" \n\t "), Anchor::Empty);
    }

    #[test]
    fn test_whitespace_insensitive_match() {
        let haystack = "first paragraph.\n\nsecond paragraph here.";
        let index = AnchorIndex::new(haystack);
        // target has different spacing than the haystack
        let Anchor::Found(offset) = index.locate("second  paragraph") else {
            panic!("expected a match");
        };
        // the offset lands right after the last non-whitespace char that
        // precedes the match
        assert!(haystack[offset..].trim_start().starts_with("second paragraph"));
        assert_eq!(offset, haystack.find("\n\nsecond").unwrap());
    }

    #[test]
    fn test_offset_counts_preceding_non_whitespace() {
        let haystack = "A B C D";
        let index = AnchorIndex::new(haystack);
        // stripped offset of "C" is 2; the first original offset preceded
        // by exactly 2 non-whitespace chars is 3 (right after "B")
        assert_eq!(index.locate("CD"), Anchor::Found(3));
    }

    #[test]
    fn test_match_at_start() {
        let index = AnchorIndex::new("  hello world");
        assert_eq!(index.locate("hello"), Anchor::Found(0));
    }

    #[test]
    fn test_multibyte_offsets_are_char_boundaries() {
        let haystack = "前言 正文开始 这里是第二段。";
        let index = AnchorIndex::new(haystack);
        let Anchor::Found(offset) = index.locate("这里是") else {
            panic!("expected a match");
        };
        assert!(haystack.is_char_boundary(offset));
        assert!(haystack[offset..].trim_start().starts_with("这里是"));
    }

    #[test]
    fn test_segment_match() {
        let haystack = "开头的内容在这里。这一段话足够长可以用来做锚点定位。结尾。";
        let index = AnchorIndex::new(haystack);
        // exact match fails (extra prefix), segment search finds the long
        // middle sentence
        let target = "不存在的前缀。这一段话足够长可以用来做锚点定位。";
        let Anchor::Found(offset) = index.locate(target) else {
            panic!("expected segment match");
        };
        assert!(haystack[offset..].starts_with("这一段话"));
    }

    #[test]
    fn test_short_segments_ignored() {
        let haystack = "abcdef";
        let index = AnchorIndex::new(haystack);
        // both segments are under the minimum length, keywords too short
        assert_eq!(index.locate("xx。yy"), Anchor::DocumentEnd);
    }

    #[test]
    fn test_keyword_match_prefers_leftmost() {
        let haystack = "zzz omega zzz alphabet zzz";
        let index = AnchorIndex::new(haystack);
        // neither full text nor a segment matches; both keywords do, and
        // the leftmost hit ("omega") wins even though "alphabet" is longer
        let Anchor::Found(offset) = index.locate("alphabet missing omega") else {
            panic!("expected keyword match");
        };
        assert!(haystack[offset..].trim_start().starts_with("omega"));
    }

    #[test]
    fn test_keywords_skip_short_tokens() {
        assert_eq!(keywords("of in the longest word is"), vec!["longest", "word", "the"]);
    }

    #[test]
    fn test_index_reuse_across_targets() {
        let haystack = "one two three four";
        let index = AnchorIndex::new(haystack);
        assert!(matches!(index.locate("three"), Anchor::Found(_)));
        assert!(matches!(index.locate("four"), Anchor::Found(_)));
        assert_eq!(index.locate("five"), Anchor::DocumentEnd);
    }
}

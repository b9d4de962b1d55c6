//! Rule-based exclusion of noise from footnote candidates.

use regex::Regex;

/// Separator glyph wrapping decorative page numbers (`·418·`).
const SEPARATOR: char = '·';

/// Spam keywords whose presence disqualifies a candidate outright. These
/// show up in scanned books that carry reseller watermarks.
const DENY_KEYWORDS: [&str; 2] = ["解密", "加微"];

/// Classifier that decides whether a candidate footnote text is noise
/// (page numbers, ad text, decorative markers) rather than a real footnote.
///
/// The denylist and marker patterns are fixed configuration constants;
/// comparisons operate on the Unicode text exactly as extracted.
pub struct FootnoteFilter {
    marker_patterns: Vec<Regex>,
}

impl FootnoteFilter {
    /// Compile the marker patterns once.
    pub fn new() -> Self {
        Self {
            marker_patterns: vec![
                Regex::new(r"^·\d+·$").unwrap(),
                Regex::new(r"^·\d+N·$").unwrap(),
                Regex::new(r"^·\d+[A-Z]$").unwrap(),
                Regex::new(r"^·\d+$").unwrap(),
            ],
        }
    }

    /// Returns true when the text should be excluded.
    pub fn should_exclude(&self, text: &str) -> bool {
        let text = text.trim();

        // pure digits, optionally interspersed with the separator glyph
        let digits: String = text.chars().filter(|&c| c != SEPARATOR).collect();
        if !digits.is_empty() && digits.chars().all(char::is_numeric) {
            return true;
        }

        if DENY_KEYWORDS.iter().any(|k| text.contains(k)) {
            return true;
        }

        self.marker_patterns.iter().any(|p| p.is_match(text))
    }
}

impl Default for FootnoteFilter {
    fn default() -> Self {
        Self::new()
    }
}

//! Fenced marker blocks: rendering, recognition and post-formatting.
//!
//! Page and footnote markers travel as plain triple-backtick fenced blocks
//! whose info-string is the marker tag. The post-formatting passes here run
//! after splicing: stripping page fences, merging runs of adjacent footnote
//! fences, and optionally rewriting footnote fences as blockquotes.

use regex::Regex;

/// Info-string of a page marker fence.
pub const PAGE_TAG: &str = "page";

/// Info-string of a footnote fence.
pub const FOOTNOTE_TAG: &str = "footnote";

/// How many blank lines may separate two footnote fences that still get
/// merged into one.
const MAX_MERGE_GAP: usize = 4;

/// The localized body line of a page marker, e.g. `第3页` for page 3
/// (1-based).
pub fn page_label(page_no: usize) -> String {
    format!("第{page_no}页")
}

/// Parse a page-marker body line back into its 1-based page number.
pub fn parse_page_label(line: &str) -> Option<usize> {
    // compiled per call; label parsing is far off the hot path
    let re = Regex::new(r"^第(\d+)页").unwrap();
    re.captures(line.trim())?.get(1)?.as_str().parse().ok()
}

/// Insertion fragment carrying a page marker, padded so it lands on its own
/// paragraph.
pub fn page_fragment(page_no: usize) -> String {
    format!("\n\n```{PAGE_TAG}\n{}\n```\n\n", page_label(page_no))
}

/// Insertion fragment carrying one footnote.
pub fn footnote_fragment(text: &str) -> String {
    format!("\n```{FOOTNOTE_TAG}\n{text}\n```\n")
}

/// Remove every page fence (opening line, body, closing line) from the
/// text. Used when the caller wants footnotes anchored but no page markers
/// in the final output.
pub fn strip_page_fences(text: &str) -> String {
    let mut result = Vec::new();
    let mut in_page = false;
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed == "```page" {
            in_page = true;
        } else if in_page {
            if trimmed == "```" {
                in_page = false;
            }
        } else {
            result.push(line);
        }
    }
    result.join("\n")
}

/// Merge runs of consecutive footnote fences into a single fence.
///
/// Two footnote fences separated by at most [`MAX_MERGE_GAP`] blank lines
/// collapse into one; a page fence between them stops the merge. Blank
/// lines inside fences are dropped.
pub fn merge_footnote_fences(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut result: Vec<&str> = Vec::with_capacity(lines.len());
    let mut current: Vec<&str> = Vec::new();
    let mut in_block = false;
    let mut is_footnote = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed == "```footnote" || trimmed == "```page" {
            is_footnote = trimmed == "```footnote";
            if !in_block {
                in_block = true;
                current.push(line);
            }
            // an opener while already inside a block is a continuation
        } else if trimmed == "```" {
            if in_block {
                if is_footnote {
                    if let Some(next) = following_footnote_fence(&lines, i) {
                        // swallow the closing fence and blank gap, resume
                        // collecting inside the merged block
                        i = next;
                    } else {
                        current.push(line);
                        result.append(&mut current);
                        in_block = false;
                    }
                } else {
                    current.push(line);
                    result.append(&mut current);
                    in_block = false;
                }
            } else {
                result.push(line);
            }
        } else if in_block {
            if !trimmed.is_empty() {
                current.push(line);
            }
        } else {
            result.push(line);
        }
        i += 1;
    }

    result.append(&mut current);
    result.join("\n")
}

/// Index of the next footnote-fence opener reachable from the closing fence
/// at `close` across at most [`MAX_MERGE_GAP`] blank lines, if any.
fn following_footnote_fence(lines: &[&str], close: usize) -> Option<usize> {
    let mut blanks = 0;
    let mut j = close + 1;
    while j < lines.len() && j <= close + MAX_MERGE_GAP + 1 {
        let trimmed = lines[j].trim();
        if trimmed == "```footnote" {
            return (blanks <= MAX_MERGE_GAP).then_some(j);
        }
        if !trimmed.is_empty() {
            // content or a page fence: never merge across it
            return None;
        }
        blanks += 1;
        j += 1;
    }
    None
}

/// Rewrite footnote fences as blockquotes (`> ---` rule, then `> * ` per
/// body line); page fences pass through untouched. Consecutive quoted
/// footnotes get a blank line between them, and trailing blank lines are
/// trimmed.
pub fn quote_footnotes(text: &str) -> String {
    let mut result: Vec<String> = Vec::new();
    let mut in_block = false;
    let mut is_footnote = false;
    let mut last_was_footnote = false;

    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed == "```footnote" || trimmed == "```page" {
            is_footnote = trimmed == "```footnote";
            in_block = true;
            if is_footnote {
                if last_was_footnote && result.last().is_some_and(|l| !l.trim().is_empty()) {
                    result.push(String::new());
                }
                result.push("> ---".to_string());
                result.push(">".to_string());
            } else {
                result.push(line.to_string());
            }
        } else if trimmed == "```" && in_block {
            if is_footnote {
                result.push(String::new());
            } else {
                result.push(line.to_string());
            }
            in_block = false;
            last_was_footnote = is_footnote;
        } else if in_block {
            if !trimmed.is_empty() {
                if is_footnote {
                    result.push(format!("> * {trimmed}"));
                } else {
                    result.push(line.to_string());
                }
            }
        } else {
            result.push(line.to_string());
        }
    }

    while result.last().is_some_and(|l| l.trim().is_empty()) {
        result.pop();
    }
    result.join("\n")
}

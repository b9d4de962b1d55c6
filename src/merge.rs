//! Merging two fenced Markdown documents page by page.
//!
//! The page-marker tool and the footnote-export tool each produce a
//! document of `page` fences (optionally followed by content and `footnote`
//! fences). Merging pairs them up by page number: content comes from the
//! first document, footnotes are concatenated first-then-second, and the
//! result covers the union of page numbers in ascending order.

use std::collections::BTreeMap;

use crate::format;

/// One page's worth of a fenced document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBlock {
    /// 1-based page number, as written in the page fence.
    pub page: usize,
    /// Free content between this page fence and the next.
    pub content: String,
    /// Bodies of the footnote fences in this page's section.
    pub footnotes: Vec<String>,
}

/// Parse a fenced document into page blocks.
///
/// A section starts at a `page` fence whose body parses as a page label;
/// `footnote` fences and free lines are attributed to the current section.
/// Anything before the first recognizable page fence is dropped.
pub fn parse_page_blocks(text: &str) -> Vec<PageBlock> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut blocks = Vec::new();
    let mut current: Option<PageBlock> = None;

    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed == "```page" {
            i += 1;
            let page = lines.get(i).and_then(|l| format::parse_page_label(l));
            if let Some(page) = page {
                if let Some(done) = current.take() {
                    blocks.push(done);
                }
                current = Some(PageBlock {
                    page,
                    content: String::new(),
                    footnotes: Vec::new(),
                });
            }
            // skip the rest of the fence
            while i < lines.len() && lines[i].trim() != "```" {
                i += 1;
            }
            i += 1;
        } else if trimmed == "```footnote" {
            i += 1;
            let mut body = Vec::new();
            while i < lines.len() && lines[i].trim() != "```" {
                body.push(lines[i]);
                i += 1;
            }
            if !body.is_empty() {
                if let Some(block) = current.as_mut() {
                    block.footnotes.push(body.join("\n"));
                }
            }
            i += 1;
        } else {
            if let Some(block) = current.as_mut() {
                if !block.content.is_empty() {
                    block.content.push('\n');
                }
                block.content.push_str(lines[i]);
            }
            i += 1;
        }
    }

    if let Some(done) = current {
        blocks.push(done);
    }
    blocks
}

/// Merge two parsed documents page by page.
pub fn merge_page_blocks(first: Vec<PageBlock>, second: Vec<PageBlock>) -> Vec<PageBlock> {
    let mut by_page: BTreeMap<usize, PageBlock> =
        first.into_iter().map(|b| (b.page, b)).collect();

    for block in second {
        match by_page.get_mut(&block.page) {
            Some(existing) => existing.footnotes.extend(block.footnotes),
            None => {
                by_page.insert(block.page, block);
            }
        }
    }

    by_page.into_values().collect()
}

/// Rebuild a fenced document from merged page blocks.
pub fn render_page_blocks(blocks: &[PageBlock]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for block in blocks {
        lines.push(format!("```{}", format::PAGE_TAG));
        lines.push(format::page_label(block.page));
        lines.push("```".to_string());

        if !block.content.trim().is_empty() {
            lines.push(block.content.clone());
        }

        for footnote in &block.footnotes {
            lines.push(format!("```{}", format::FOOTNOTE_TAG));
            lines.push(footnote.clone());
            lines.push("```".to_string());
        }

        lines.push(String::new());
    }
    lines.join("\n")
}

/// Parse, merge and rebuild in one step.
pub fn merge_documents(first: &str, second: &str) -> String {
    render_page_blocks(&merge_page_blocks(
        parse_page_blocks(first),
        parse_page_blocks(second),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_DOC: &str = "```page\n第1页\n```\npage one body\n```page\n第2页\n```\npage two body\n";
    const NOTES_DOC: &str =
        "```page\n第1页\n```\n```footnote\nnote one\n```\n\n```page\n第3页\n```\n```footnote\nnote three\n```\n";

    #[test]
    fn test_parse_page_blocks() {
        let blocks = parse_page_blocks(PAGE_DOC);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].page, 1);
        assert_eq!(blocks[0].content.trim(), "page one body");
        assert!(blocks[0].footnotes.is_empty());
        assert_eq!(blocks[1].page, 2);
    }

    #[test]
    fn test_parse_collects_footnotes() {
        let blocks = parse_page_blocks(NOTES_DOC);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].footnotes, vec!["note one".to_string()]);
        assert_eq!(blocks[1].page, 3);
        assert_eq!(blocks[1].footnotes, vec!["note three".to_string()]);
    }

    #[test]
    fn test_parse_ignores_leading_noise() {
        let blocks = parse_page_blocks("stray line\n```page\n第5页\n```\nbody");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].page, 5);
        assert_eq!(blocks[0].content, "body");
    }

    #[test]
    fn test_parse_multiline_footnote() {
        let text = "```page\n第1页\n```\n```footnote\nline a\nline b\n```";
        let blocks = parse_page_blocks(text);
        assert_eq!(blocks[0].footnotes, vec!["line a\nline b".to_string()]);
    }

    #[test]
    fn test_merge_combines_footnotes_and_unions_pages() {
        let merged = merge_page_blocks(parse_page_blocks(PAGE_DOC), parse_page_blocks(NOTES_DOC));
        assert_eq!(merged.len(), 3);

        assert_eq!(merged[0].page, 1);
        assert_eq!(merged[0].content.trim(), "page one body");
        assert_eq!(merged[0].footnotes, vec!["note one".to_string()]);

        assert_eq!(merged[1].page, 2);
        assert!(merged[1].footnotes.is_empty());

        // page 3 exists only in the footnote document
        assert_eq!(merged[2].page, 3);
        assert_eq!(merged[2].footnotes, vec!["note three".to_string()]);
    }

    #[test]
    fn test_merge_documents_roundtrip() {
        let merged = merge_documents(PAGE_DOC, NOTES_DOC);
        let reparsed = parse_page_blocks(&merged);
        assert_eq!(reparsed.len(), 3);
        assert_eq!(reparsed[0].footnotes, vec!["note one".to_string()]);
        assert_eq!(reparsed[0].content.trim(), "page one body");
    }

    #[test]
    fn test_render_skips_blank_content() {
        let blocks = vec![PageBlock {
            page: 1,
            content: "  \n ".to_string(),
            footnotes: vec!["n".to_string()],
        }];
        let rendered = render_page_blocks(&blocks);
        assert_eq!(rendered, "```page\n第1页\n```\n```footnote\nn\n```\n");
    }
}

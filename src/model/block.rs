//! Block, line and span types.

use serde::Deserialize;

/// Layout region kinds emitted by the extraction backend.
///
/// Anything outside the set the pipeline cares about collapses into
/// [`BlockType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Text,
    TableBody,
    TableCaption,
    TableFootnote,
    Image,
    InterlineEquation,
    #[default]
    #[serde(other)]
    Other,
}

/// Span content kinds. A missing `type` tag means plain text; an
/// unrecognized tag contributes nothing to extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    #[default]
    Text,
    InlineEquation,
    InterlineEquation,
    Image,
    Table,
    #[serde(other)]
    Other,
}

/// Leaf text-bearing unit of a line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Span {
    #[serde(rename = "type", default)]
    pub kind: SpanKind,

    /// Text payload; empty for image/table spans.
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub bbox: Vec<f64>,
}

/// One visual line: an ordered run of spans.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub bbox: Vec<f64>,

    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Line {
    /// Plain text of this line, per [`spans_text`].
    pub fn text(&self) -> String {
        spans_text(&self.spans)
    }
}

/// One layout region on a page.
///
/// Coordinates follow the backend's convention: `bbox` is
/// `[x0, y0, x1, y1]` with y growing downward, so `y0` is the top edge and
/// a larger `y0` sits closer to the page bottom.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(rename = "type", default)]
    pub kind: BlockType,

    #[serde(default)]
    pub bbox: Vec<f64>,

    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Block {
    /// Whether this block's text participates in page anchoring.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self.kind,
            BlockType::Text
                | BlockType::TableBody
                | BlockType::TableCaption
                | BlockType::TableFootnote
        )
    }

    /// Top edge of the bounding box, if it is well-formed.
    pub fn y0(&self) -> Option<f64> {
        (self.bbox.len() == 4).then(|| self.bbox[1])
    }

    /// Bottom edge of the bounding box, if it is well-formed.
    pub fn y1(&self) -> Option<f64> {
        (self.bbox.len() == 4).then(|| self.bbox[3])
    }

    /// Flatten the block's lines into plain text, one extracted line per row.
    /// Lines without spans are skipped.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .filter(|line| !line.spans.is_empty())
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Concatenate span contents in order.
///
/// Plain-text spans contribute their content verbatim, inline equations are
/// wrapped as `$content$`, everything else contributes nothing. Total and
/// deterministic.
pub fn spans_text(spans: &[Span]) -> String {
    let mut text = String::new();
    for span in spans {
        match span.kind {
            SpanKind::Text => text.push_str(&span.content),
            SpanKind::InlineEquation => {
                text.push('$');
                text.push_str(&span.content);
                text.push('$');
            }
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn span(kind: SpanKind, content: &str) -> Span {
        Span {
            kind,
            content: content.to_string(),
            bbox: Vec::new(),
        }
    }

    #[test]
    fn test_spans_text_plain_and_equation() {
        let spans = vec![
            span(SpanKind::Text, "energy is "),
            span(SpanKind::InlineEquation, "E=mc^2"),
            span(SpanKind::Text, ", roughly"),
        ];
        assert_eq!(spans_text(&spans), "energy is $E=mc^2$, roughly");
    }

    #[test]
    fn test_spans_text_skips_non_text_kinds() {
        let spans = vec![
            span(SpanKind::Image, "ignored"),
            span(SpanKind::Table, "ignored"),
            span(SpanKind::InterlineEquation, "ignored"),
            span(SpanKind::Other, "ignored"),
            span(SpanKind::Text, "kept"),
        ];
        assert_eq!(spans_text(&spans), "kept");
    }

    #[test]
    fn test_span_missing_type_defaults_to_text() {
        let span: Span = serde_json::from_value(json!({ "content": "hello" })).unwrap();
        assert_eq!(span.kind, SpanKind::Text);
        assert_eq!(span.content, "hello");
    }

    #[test]
    fn test_span_unknown_type_is_other() {
        let span: Span =
            serde_json::from_value(json!({ "type": "footnote_mark", "content": "1" })).unwrap();
        assert_eq!(span.kind, SpanKind::Other);
    }

    #[test]
    fn test_block_text_joins_lines() {
        let block: Block = serde_json::from_value(json!({
            "type": "text",
            "bbox": [0.0, 0.0, 10.0, 10.0],
            "lines": [
                { "spans": [{ "type": "text", "content": "first" }] },
                { "spans": [] },
                { "spans": [{ "type": "text", "content": "second" }] },
            ]
        }))
        .unwrap();
        assert_eq!(block.text(), "first\nsecond");
    }

    #[test]
    fn test_block_edges_require_four_entries() {
        let block = Block {
            bbox: vec![1.0, 2.0, 3.0],
            ..Block::default()
        };
        assert_eq!(block.y0(), None);
        assert_eq!(block.y1(), None);

        let block = Block {
            bbox: vec![1.0, 2.0, 3.0, 4.0],
            ..Block::default()
        };
        assert_eq!(block.y0(), Some(2.0));
        assert_eq!(block.y1(), Some(4.0));
    }

    #[test]
    fn test_text_bearing_kinds() {
        for kind in [
            BlockType::Text,
            BlockType::TableBody,
            BlockType::TableCaption,
            BlockType::TableFootnote,
        ] {
            assert!(Block { kind, ..Block::default() }.is_text_bearing());
        }
        assert!(!Block { kind: BlockType::Image, ..Block::default() }.is_text_bearing());
        assert!(!Block { kind: BlockType::Other, ..Block::default() }.is_text_bearing());
    }
}

//! Stitching footnotes and page markers into a rendered Markdown document.
//!
//! The extraction backend renders a document's text to Markdown but drops
//! everything it classified as discarded, footnotes included. This module
//! re-derives the footnotes from the structured page data and splices them,
//! together with page boundary markers, back into that Markdown rendition.
//!
//! The pipeline is a fixed sequence of phases, each consuming the previous
//! phase's output:
//!
//! 1. **preprocess** — repair page records and build per-page summaries,
//!    including the candidate anchor texts (text-bearing blocks, bottom-most
//!    first).
//! 2. **collect** — gather footnote candidates from the discarded blocks in
//!    each page's bottom region, filter noise, and pair each survivor with
//!    the nearest paragraph above it as context.
//! 3. **locate** — anchor each page's text in the Markdown document.
//! 4. **resolve** — place pages that could not be anchored relative to their
//!    matched neighbors; every page ends up with some ordered position.
//! 5. **compose + finish** — render insertion fragments, splice them in and
//!    run the fence post-formatting passes.
//!
//! Absence of an anchor is never fatal, and malformed page records degrade
//! to per-page skips. Only a missing/mistyped `pdf_info` aborts the run.

mod anchor;
mod compose;
mod filter;

pub use anchor::{Anchor, AnchorIndex};
pub use compose::{splice, Insertion};
pub use filter::FootnoteFilter;

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::format;
use crate::model::{Block, BlockType, Line, PageRecord};
use crate::repair;

/// Fraction of the page height above which (in y-down coordinates) a
/// discarded block is considered footnote-like.
pub const FOOTNOTE_REGION_RATIO: f64 = 0.7;

/// Default text-similarity threshold.
pub const DEFAULT_SIMILARITY: f64 = 0.6;

/// How footnotes are placed into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertStrategy {
    /// Bundle each page's footnotes in front of that page's marker.
    #[default]
    PerPage,
    /// Anchor each footnote independently by its own context text, falling
    /// back to the page marker when its anchor fails.
    Keyword,
    /// Insert page markers only; footnotes are collected for statistics but
    /// not spliced in.
    MarkersOnly,
}

/// Options for the stitching pipeline.
#[derive(Debug, Clone)]
pub struct StitchOptions {
    /// Placement strategy.
    pub strategy: InsertStrategy,

    /// Keep page marker fences in the final output. When false the markers
    /// still order the insertions internally and are stripped at the end.
    pub keep_page_markers: bool,

    /// Rewrite footnote fences as blockquotes in the final output.
    pub quote_footnotes: bool,

    /// Similarity threshold in `[0, 1]`, validated and threaded through for
    /// interface parity with the extraction backend's tools.
    // TODO: use this to score competing keyword anchors instead of always
    // taking the leftmost hit
    pub similarity: f64,

    /// Extract and filter footnote candidates on a worker pool.
    pub parallel: bool,
}

impl StitchOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self {
            strategy: InsertStrategy::PerPage,
            keep_page_markers: false,
            quote_footnotes: true,
            similarity: DEFAULT_SIMILARITY,
            parallel: true,
        }
    }

    /// Set the placement strategy.
    pub fn with_strategy(mut self, strategy: InsertStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Keep page markers in the final output.
    pub fn with_page_markers(mut self, keep: bool) -> Self {
        self.keep_page_markers = keep;
        self
    }

    /// Enable or disable blockquote rewriting of footnotes.
    pub fn with_quote_footnotes(mut self, quote: bool) -> Self {
        self.quote_footnotes = quote;
        self
    }

    /// Set the similarity threshold.
    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = similarity;
        self
    }

    /// Disable the worker pool.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn validate(&self) -> Result<()> {
        if (0.0..=1.0).contains(&self.similarity) {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "similarity threshold must be in [0, 1], got {}",
                self.similarity
            )))
        }
    }
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters accumulated over one stitching run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StitchStats {
    /// Pages in the document.
    pub pages: usize,
    /// Pages whose records were repaired during preprocessing.
    pub repaired_pages: usize,
    /// Pages skipped because their record was unusable.
    pub skipped_pages: usize,
    /// Candidate lines considered in the footnote region.
    pub candidate_lines: usize,
    /// Candidate lines rejected by the filter (or empty).
    pub excluded: usize,
    /// Footnote candidates that survived filtering.
    pub footnotes: usize,
    /// Footnotes actually spliced into the document.
    pub inserted_footnotes: usize,
    /// Pages anchored by their own text.
    pub matched_pages: usize,
    /// Pages placed by the neighbor-interpolation fallback.
    pub unmatched_pages: usize,
}

/// One footnote candidate derived from a discarded block line.
#[derive(Debug, Clone)]
pub struct FootnoteCandidate {
    /// Extracted text.
    pub text: String,
    /// Owning page (0-based).
    pub page: usize,
    /// Top edge of the source block; orders footnotes within a page.
    pub position: f64,
    /// Text of the nearest paragraph block above the source block, empty
    /// when the page has none.
    pub context: String,
}

/// Result of a stitching run.
#[derive(Debug)]
pub struct StitchOutcome {
    /// The composed Markdown document.
    pub document: String,
    /// Run statistics.
    pub stats: StitchStats,
    /// The collected candidates, in `(page, position)` order.
    pub footnotes: Vec<FootnoteCandidate>,
}

/// Per-page summary built during preprocessing.
#[derive(Debug)]
struct PageSummary {
    height: f64,
    para_blocks: Vec<Block>,
    discarded_blocks: Vec<Block>,
    /// Candidate anchor texts paired with their bottom edge, bottom-most
    /// first.
    anchor_texts: Vec<(String, f64)>,
}

/// Orchestrates one stitching run over one document.
#[derive(Debug)]
pub struct Stitcher<'a> {
    haystack: &'a str,
    index: AnchorIndex,
    options: StitchOptions,
    pages: Vec<Option<PageSummary>>,
    footnotes: Vec<FootnoteCandidate>,
    stats: StitchStats,
}

impl<'a> Stitcher<'a> {
    /// Preprocess the parsed `middle.json` tree against the rendered
    /// Markdown `haystack`.
    ///
    /// Fails only on invalid configuration or a missing/mistyped
    /// `pdf_info`; malformed pages are skipped with a diagnostic and
    /// counted.
    pub fn new(doc: &Value, haystack: &'a str, options: StitchOptions) -> Result<Self> {
        options.validate()?;
        let mut stats = StitchStats::default();
        let pages = preprocess(doc, &mut stats)?;
        Ok(Self {
            haystack,
            index: AnchorIndex::new(haystack),
            options,
            pages,
            footnotes: Vec::new(),
            stats,
        })
    }

    /// Run all phases and build the final document.
    pub fn run(mut self) -> StitchOutcome {
        self.footnotes = collect(&self.pages, self.options.parallel, &mut self.stats);

        let (mut positions, unmatched) = self.locate_pages();
        self.resolve_unmatched(&mut positions, &unmatched);

        let insertions = self.compose(&positions);
        let document = self.finish(insertions);

        StitchOutcome {
            document,
            stats: self.stats,
            footnotes: self.footnotes,
        }
    }

    /// Phase 3: anchor each page via its text blocks, bottom-most first.
    /// Only a real match counts; the document-end fallback leaves the page
    /// unmatched so the resolution phase can interpolate a better spot.
    fn locate_pages(&mut self) -> (BTreeMap<usize, usize>, Vec<usize>) {
        let mut positions = BTreeMap::new();
        let mut unmatched = Vec::new();

        for (page_idx, summary) in self.pages.iter().enumerate() {
            let texts = summary
                .as_ref()
                .map(|s| s.anchor_texts.as_slice())
                .unwrap_or(&[]);
            let found = texts.iter().find_map(|(text, _)| match self.index.locate(text) {
                Anchor::Found(offset) => Some(offset),
                _ => None,
            });
            match found {
                Some(offset) => {
                    log::debug!("page {}: anchored at byte {offset}", page_idx + 1);
                    positions.insert(page_idx, offset);
                }
                None => {
                    log::debug!("page {}: no anchor, deferring placement", page_idx + 1);
                    unmatched.push(page_idx);
                }
            }
        }

        self.stats.matched_pages = positions.len();
        self.stats.unmatched_pages = unmatched.len();
        (positions, unmatched)
    }

    /// Phase 4: place unmatched pages relative to their nearest matched
    /// neighbors, highest page first so lower pages can position themselves
    /// against pages resolved in this very pass.
    fn resolve_unmatched(&self, positions: &mut BTreeMap<usize, usize>, unmatched: &[usize]) {
        let doc = self.haystack;
        for &page_idx in unmatched.iter().rev() {
            let prev = positions.range(..page_idx).next_back().map(|(_, &o)| o);
            let next = positions.range(page_idx + 1..).next().map(|(_, &o)| o);

            let offset = match (prev, next) {
                (Some(p), Some(n)) => {
                    let (lo, hi) = if p <= n { (p, n) } else { (n, p) };
                    compose::floor_boundary(doc, lo + (hi - lo) / 2)
                }
                (Some(p), None) => compose::ceil_boundary(doc, p + 1),
                (None, Some(n)) => compose::floor_boundary(doc, n.saturating_sub(1)),
                (None, None) => doc.len(),
            };
            log::debug!(
                "page {}: placed at byte {offset} between neighbors",
                page_idx + 1
            );
            positions.insert(page_idx, offset);
        }
    }

    /// Phase 5a: render one insertion fragment per page (footnotes bundled
    /// in front of the marker in per-page mode), plus independently
    /// anchored footnotes in keyword mode.
    fn compose(&mut self, positions: &BTreeMap<usize, usize>) -> Vec<Insertion> {
        let mut insertions = Vec::new();

        for (&page_idx, &offset) in positions {
            let mut fragment = String::new();
            if self.options.strategy == InsertStrategy::PerPage {
                for candidate in self.footnotes.iter().filter(|f| f.page == page_idx) {
                    fragment.push_str(&format::footnote_fragment(&candidate.text));
                    self.stats.inserted_footnotes += 1;
                }
            }
            fragment.push_str(&format::page_fragment(page_idx + 1));
            insertions.push(Insertion { offset, fragment });
        }

        if self.options.strategy == InsertStrategy::Keyword {
            self.compose_keyword(positions, &mut insertions);
        }

        insertions
    }

    /// Keyword mode: anchor each footnote by its own context. A footnote
    /// whose anchor fails falls back to its page's marker offset, then to
    /// the document end; duplicates (same text on the same page) are
    /// inserted once.
    fn compose_keyword(
        &mut self,
        positions: &BTreeMap<usize, usize>,
        insertions: &mut Vec<Insertion>,
    ) {
        let mut seen: HashSet<(usize, &str)> = HashSet::new();
        for candidate in &self.footnotes {
            if !seen.insert((candidate.page, candidate.text.as_str())) {
                log::debug!(
                    "page {}: skipping duplicate footnote {:?}",
                    candidate.page + 1,
                    preview(&candidate.text)
                );
                continue;
            }
            let offset = match self.index.locate(&candidate.context) {
                Anchor::Found(offset) => offset,
                Anchor::DocumentEnd | Anchor::Empty => {
                    let fallback = positions
                        .get(&candidate.page)
                        .copied()
                        .unwrap_or(self.haystack.len());
                    log::debug!(
                        "page {}: footnote anchor failed, using page marker offset",
                        candidate.page + 1
                    );
                    fallback
                }
            };
            insertions.push(Insertion {
                offset,
                fragment: format::footnote_fragment(&candidate.text),
            });
            self.stats.inserted_footnotes += 1;
        }
    }

    /// Phase 5b: splice and run the fence post-formatting passes.
    fn finish(&self, insertions: Vec<Insertion>) -> String {
        let mut text = splice(self.haystack, insertions);
        if !self.options.keep_page_markers {
            text = format::strip_page_fences(&text);
        }
        text = format::merge_footnote_fences(&text);
        if self.options.quote_footnotes {
            text = format::quote_footnotes(&text);
        }
        text
    }
}

/// Phase 1: repair a deep copy of the document and summarize each page.
fn preprocess(doc: &Value, stats: &mut StitchStats) -> Result<Vec<Option<PageSummary>>> {
    let mut repaired = doc.clone();
    let raw_pages = repaired
        .get_mut("pdf_info")
        .ok_or(Error::MissingKey("pdf_info"))?
        .as_array_mut()
        .ok_or_else(|| Error::InvalidStructure("`pdf_info` is not an array".to_string()))?;

    stats.pages = raw_pages.len();
    stats.repaired_pages = repair::repair_document(raw_pages);

    let mut pages = Vec::with_capacity(raw_pages.len());
    for (idx, raw) in raw_pages.iter().enumerate() {
        let summary = summarize_page(raw, idx);
        if summary.is_none() {
            stats.skipped_pages += 1;
        }
        pages.push(summary);
    }
    Ok(pages)
}

fn summarize_page(raw: &Value, idx: usize) -> Option<PageSummary> {
    let record: PageRecord = match serde_json::from_value(raw.clone()) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("page {idx}: malformed record, skipping: {e}");
            return None;
        }
    };
    let Some(height) = record.height() else {
        log::warn!("page {idx}: no usable page_size, skipping");
        return None;
    };

    let mut anchor_texts: Vec<(String, f64)> = record
        .para_blocks
        .iter()
        .filter(|block| block.is_text_bearing())
        .filter_map(|block| {
            let y1 = block.y1()?;
            let text = block.text();
            (!text.trim().is_empty()).then_some((text, y1))
        })
        .collect();
    // bottom-most first: the last block on a page anchors it best
    anchor_texts.sort_by(|a, b| b.1.total_cmp(&a.1));

    Some(PageSummary {
        height,
        para_blocks: record.para_blocks,
        discarded_blocks: record.discarded_blocks,
        anchor_texts,
    })
}

/// A unit of footnote extraction work: one discarded block in the footnote
/// region.
struct FootnoteTask<'p> {
    page: usize,
    y0: f64,
    lines: &'p [Line],
}

/// Immutable result of one extraction task, folded into the candidate list
/// and statistics after the parallel pass.
struct TaskResult {
    page: usize,
    y0: f64,
    lines_seen: usize,
    kept: Vec<String>,
}

/// Phase 2: extract and filter footnote candidates.
///
/// Each task reads a disjoint subtree, so tasks run side-effect-free on the
/// worker pool; rayon preserves input order, and the final sort makes the
/// result independent of completion order either way.
fn collect(
    pages: &[Option<PageSummary>],
    parallel: bool,
    stats: &mut StitchStats,
) -> Vec<FootnoteCandidate> {
    let filter = FootnoteFilter::new();

    let mut tasks = Vec::new();
    for (page_idx, summary) in pages.iter().enumerate() {
        let Some(summary) = summary else { continue };
        let threshold = summary.height * FOOTNOTE_REGION_RATIO;
        for block in &summary.discarded_blocks {
            if block.lines.is_empty() {
                continue;
            }
            let Some(y0) = block.y0() else { continue };
            if y0 > threshold {
                tasks.push(FootnoteTask {
                    page: page_idx,
                    y0,
                    lines: &block.lines,
                });
            }
        }
    }

    let results: Vec<TaskResult> = if parallel {
        tasks.par_iter().map(|t| extract_task(t, &filter)).collect()
    } else {
        tasks.iter().map(|t| extract_task(t, &filter)).collect()
    };

    let mut footnotes = Vec::new();
    for result in results {
        stats.candidate_lines += result.lines_seen;
        stats.excluded += result.lines_seen - result.kept.len();
        let context = nearest_context(pages, result.page, result.y0);
        for text in result.kept {
            log::debug!("page {}: footnote candidate {:?}", result.page + 1, preview(&text));
            footnotes.push(FootnoteCandidate {
                text,
                page: result.page,
                position: result.y0,
                context: context.clone(),
            });
        }
    }

    footnotes.sort_by(|a, b| a.page.cmp(&b.page).then(a.position.total_cmp(&b.position)));
    stats.footnotes = footnotes.len();
    footnotes
}

fn extract_task(task: &FootnoteTask, filter: &FootnoteFilter) -> TaskResult {
    let mut kept = Vec::new();
    for line in task.lines {
        let text = line.text();
        if !text.trim().is_empty() && !filter.should_exclude(&text) {
            kept.push(text);
        }
    }
    TaskResult {
        page: task.page,
        y0: task.y0,
        lines_seen: task.lines.len(),
        kept,
    }
}

/// Text of the nearest paragraph block strictly above `y0` on the page.
fn nearest_context(pages: &[Option<PageSummary>], page: usize, y0: f64) -> String {
    let Some(Some(summary)) = pages.get(page) else {
        return String::new();
    };
    let mut best: Option<(f64, &Block)> = None;
    for block in &summary.para_blocks {
        if block.kind != BlockType::Text {
            continue;
        }
        let Some(y1) = block.y1() else { continue };
        if y1 < y0 {
            let distance = y0 - y1;
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, block));
            }
        }
    }
    best.map(|(_, block)| block.text()).unwrap_or_default()
}

/// Collect footnote candidates and render them as a standalone Markdown
/// document of page/footnote fences, without anchoring against a rendition.
pub fn export_footnotes(doc: &Value, parallel: bool) -> Result<(String, StitchStats)> {
    let mut stats = StitchStats::default();
    let pages = preprocess(doc, &mut stats)?;
    let footnotes = collect(&pages, parallel, &mut stats);
    Ok((render_footnote_document(&footnotes), stats))
}

/// Render candidates grouped by page, in page order.
pub fn render_footnote_document(footnotes: &[FootnoteCandidate]) -> String {
    let mut by_page: BTreeMap<usize, Vec<&FootnoteCandidate>> = BTreeMap::new();
    for footnote in footnotes {
        by_page.entry(footnote.page).or_default().push(footnote);
    }

    let mut out = String::new();
    for (page, notes) in by_page {
        out.push_str(&format!(
            "```{}\n{}\n```\n",
            format::PAGE_TAG,
            format::page_label(page + 1)
        ));
        for note in notes {
            out.push_str(&format!("```{}\n{}\n```\n", format::FOOTNOTE_TAG, note.text));
        }
        out.push('\n');
    }
    out
}

/// First few chars of a text, for log lines.
fn preview(text: &str) -> String {
    const MAX: usize = 50;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

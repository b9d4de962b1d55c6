//! # restitch
//!
//! Post-processing for the intermediate JSON artifacts of a PDF-to-Markdown
//! extraction backend.
//!
//! Extraction pipelines classify page regions into accepted content and
//! "discarded" blocks (headers, footers, stray marks) — and routinely file
//! real footnotes under discarded. This library repairs the per-page
//! records, moves bottom-of-page discarded blocks back into the main
//! content flow, and stitches extracted footnotes and page markers into a
//! separately rendered Markdown document using fuzzy text anchoring.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restitch::{ReclassifyOptions, StitchOptions, Stitcher};
//!
//! fn main() -> restitch::Result<()> {
//!     // Move bottom-region discarded blocks back into para_blocks
//!     let doc = restitch::io::read_json("book_middle.json".as_ref())?;
//!     let (processed, stats) = restitch::reclassify_document(&doc, &ReclassifyOptions::new())?;
//!     println!("moved {} blocks", stats.moved_blocks);
//!     restitch::io::write_json("book_processed.json".as_ref(), &processed)?;
//!
//!     // Stitch footnotes and page markers into the rendered Markdown
//!     let markdown = restitch::io::read_to_string("book.md".as_ref())?;
//!     let outcome = Stitcher::new(&processed, &markdown, StitchOptions::new())?.run();
//!     restitch::io::write_atomic("book_footnotes.md".as_ref(), &outcome.document)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Schema repair** ([`repair`]): make every page record well-formed
//!   before geometry code touches it.
//! - **Reclassification** ([`reclassify`]): move discarded blocks whose top
//!   edge falls in the configured bottom region into `para_blocks`,
//!   converted to the canonical paragraph-block shape.
//! - **Stitching** ([`stitch`]): collect footnote candidates, anchor each
//!   page's text in the rendered Markdown, and splice footnotes and page
//!   markers in as fenced blocks.
//! - **Merging** ([`merge`]): combine a page-marker document with a
//!   footnote document page by page.

pub mod error;
pub mod format;
pub mod io;
pub mod merge;
pub mod model;
pub mod reclassify;
pub mod repair;
pub mod stitch;

pub use error::{Error, Result};
pub use reclassify::{reclassify_document, ReclassifyOptions, ReclassifyStats};
pub use stitch::{
    export_footnotes, Anchor, AnchorIndex, FootnoteCandidate, InsertStrategy, StitchOptions,
    StitchOutcome, StitchStats, Stitcher,
};

use std::path::Path;

/// Reclassify a `middle.json` file and write the result.
///
/// Reads `input`, repairs and reclassifies every page, and writes the
/// modified document to `output` (atomically, pretty-printed, UTF-8 with
/// non-ASCII intact and key order preserved).
pub fn reclassify_file(
    input: &Path,
    output: &Path,
    options: &ReclassifyOptions,
) -> Result<ReclassifyStats> {
    let doc = io::read_json(input)?;
    let (processed, stats) = reclassify_document(&doc, options)?;
    io::write_json(output, &processed)?;
    Ok(stats)
}

/// Stitch footnotes/page markers from a `middle.json` file into a rendered
/// Markdown file, writing the composed document to `output`.
pub fn stitch_files(
    input: &Path,
    markdown: &Path,
    output: &Path,
    options: StitchOptions,
) -> Result<StitchStats> {
    let doc = io::read_json(input)?;
    let haystack = io::read_to_string(markdown)?;
    let outcome = Stitcher::new(&doc, &haystack, options)?.run();
    io::write_atomic(output, &outcome.document)?;
    Ok(outcome.stats)
}

/// Export the footnote candidates of a `middle.json` file as a standalone
/// fenced Markdown document.
pub fn export_footnotes_file(input: &Path, output: &Path) -> Result<StitchStats> {
    let doc = io::read_json(input)?;
    let (document, stats) = export_footnotes(&doc, true)?;
    io::write_atomic(output, &document)?;
    Ok(stats)
}

/// Merge a page-marker Markdown file with a footnote Markdown file.
pub fn merge_files(pages: &Path, footnotes: &Path, output: &Path) -> Result<()> {
    let first = io::read_to_string(pages)?;
    let second = io::read_to_string(footnotes)?;
    io::write_atomic(output, &merge::merge_documents(&first, &second))
}

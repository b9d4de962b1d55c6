//! restitch CLI - post-process PDF-extraction artifacts

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use restitch::{
    InsertStrategy, ReclassifyOptions, StitchOptions, StitchStats, Stitcher,
};

#[derive(Parser)]
#[command(name = "restitch")]
#[command(version)]
#[command(about = "Reclassify extraction blocks and stitch footnotes into Markdown", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move bottom-of-page discarded blocks back into the main flow
    Reclassify {
        /// Input middle.json file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <stem>_processed.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Bottom region as a percentage of page height, in (0, 100]
        #[arg(long, default_value = "20")]
        bottom_percent: f64,
    },

    /// Stitch footnotes and page markers into a rendered Markdown document
    Stitch {
        /// Input middle.json file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Rendered Markdown document to anchor against
        #[arg(value_name = "MARKDOWN")]
        markdown: PathBuf,

        /// Output file (defaults to <markdown stem>_footnotes.md)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Footnote placement strategy
        #[arg(long, value_enum, default_value = "per-page")]
        strategy: Strategy,

        /// Keep page marker fences in the final output
        #[arg(long)]
        keep_page_markers: bool,

        /// Leave footnotes as fenced blocks instead of blockquotes
        #[arg(long)]
        no_quote: bool,

        /// Text-similarity threshold in [0, 1]
        #[arg(long, default_value = "0.6")]
        similarity: f64,

        /// Disable the extraction worker pool
        #[arg(long)]
        sequential: bool,
    },

    /// Export footnote candidates as a standalone fenced Markdown document
    Footnotes {
        /// Input middle.json file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <stem>_footnotes.md)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Merge a page-marker document with a footnote document
    Merge {
        /// Markdown document with page fences
        #[arg(value_name = "PAGES")]
        pages: PathBuf,

        /// Markdown document with footnote fences
        #[arg(value_name = "FOOTNOTES")]
        footnotes: PathBuf,

        /// Output file (defaults to <pages stem>_merged.md)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show page and block statistics for a middle.json file
    Info {
        /// Input middle.json file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Bundle each page's footnotes in front of its page marker
    PerPage,
    /// Anchor each footnote independently by its own context text
    Keyword,
    /// Insert page markers only
    MarkersOnly,
}

impl From<Strategy> for InsertStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::PerPage => InsertStrategy::PerPage,
            Strategy::Keyword => InsertStrategy::Keyword,
            Strategy::MarkersOnly => InsertStrategy::MarkersOnly,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Reclassify {
            input,
            output,
            bottom_percent,
        } => cmd_reclassify(&input, output.as_deref(), bottom_percent),
        Commands::Stitch {
            input,
            markdown,
            output,
            strategy,
            keep_page_markers,
            no_quote,
            similarity,
            sequential,
        } => cmd_stitch(
            &input,
            &markdown,
            output.as_deref(),
            strategy,
            keep_page_markers,
            no_quote,
            similarity,
            sequential,
        ),
        Commands::Footnotes { input, output } => cmd_footnotes(&input, output.as_deref()),
        Commands::Merge {
            pages,
            footnotes,
            output,
        } => cmd_merge(&pages, &footnotes, output.as_deref()),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_reclassify(
    input: &Path,
    output: Option<&Path>,
    bottom_percent: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_path(input, "_processed", "json"));

    if output == input {
        return Err("output file must differ from the input file".into());
    }

    let options = ReclassifyOptions::new().with_bottom_percent(bottom_percent);
    let stats = restitch::reclassify_file(input, &output, &options)?;

    println!("{}", "Reclassification complete".green().bold());
    println!("{}: {}", "Pages".bold(), stats.pages);
    println!("{}: {}", "Repaired records".bold(), stats.repaired_pages);
    println!("{}: {}", "Moved blocks".bold(), stats.moved_blocks);
    if stats.skipped_pages > 0 {
        println!(
            "{}: {}",
            "Skipped pages".bold(),
            stats.skipped_pages.to_string().yellow()
        );
    }
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_stitch(
    input: &Path,
    markdown: &Path,
    output: Option<&Path>,
    strategy: Strategy,
    keep_page_markers: bool,
    no_quote: bool,
    similarity: f64,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_path(markdown, "_footnotes", "md"));

    let mut options = StitchOptions::new()
        .with_strategy(strategy.into())
        .with_page_markers(keep_page_markers)
        .with_quote_footnotes(!no_quote)
        .with_similarity(similarity);
    if sequential {
        options = options.sequential();
    }

    let pb = ProgressBar::new(4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    pb.set_message("Reading input files...");
    let doc = restitch::io::read_json(input)?;
    let haystack = restitch::io::read_to_string(markdown)?;
    pb.inc(1);

    pb.set_message("Collecting and anchoring...");
    let stitcher = Stitcher::new(&doc, &haystack, options)?;
    pb.inc(1);

    pb.set_message("Composing document...");
    let outcome = stitcher.run();
    pb.inc(1);

    pb.set_message("Writing output...");
    restitch::io::write_atomic(&output, &outcome.document)?;
    pb.inc(1);
    pb.finish_with_message("Done!");

    print_stitch_stats(&outcome.stats);
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_footnotes(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_path(input, "_footnotes", "md"));

    let stats = restitch::export_footnotes_file(input, &output)?;

    print_stitch_stats(&stats);
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_merge(
    pages: &Path,
    footnotes: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_path(pages, "_merged", "md"));

    restitch::merge_files(pages, footnotes, &output)?;

    println!("{}", "Merge complete".green().bold());
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = restitch::io::read_json(input)?;
    let (_, stats) = restitch::export_footnotes(&doc, true)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), stats.pages);
    println!("{}: {}", "Repaired records".bold(), stats.repaired_pages);
    println!("{}: {}", "Skipped pages".bold(), stats.skipped_pages);

    println!();
    println!("{}", "Footnote Candidates".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Candidate lines".bold(), stats.candidate_lines);
    println!("{}: {}", "Filtered out".bold(), stats.excluded);
    println!("{}: {}", "Surviving footnotes".bold(), stats.footnotes);

    Ok(())
}

fn print_stitch_stats(stats: &StitchStats) {
    println!("{}", "Stitching statistics".green().bold());
    println!("{}: {}", "Pages".bold(), stats.pages);
    println!(
        "{}: {} matched, {} placed by neighbors",
        "Anchoring".bold(),
        stats.matched_pages,
        stats.unmatched_pages
    );
    println!(
        "{}: {} lines, {} filtered out, {} kept",
        "Footnotes".bold(),
        stats.candidate_lines,
        stats.excluded,
        stats.footnotes
    );
    if stats.inserted_footnotes > 0 {
        println!("{}: {}", "Inserted".bold(), stats.inserted_footnotes);
    }
    if stats.skipped_pages > 0 {
        println!(
            "{}: {}",
            "Skipped pages".bold(),
            stats.skipped_pages.to_string().yellow()
        );
    }
}

/// `book_middle.json` -> `book_middle_processed.json` (etc.), next to the
/// input file.
fn derived_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{suffix}.{extension}"))
}

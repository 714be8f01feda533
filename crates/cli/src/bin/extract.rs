//! Scan the slide library and write a JSON report of every hymn found.

use anyhow::{Context, Result};
use clap::Parser;
use hymn_core::report::{compendium_rows, HymnReport, ReportRow};
use hymn_core::{CompendiumSegmenter, Config, PresentationLoader, RunSegmenter};
use hymn_pptx::PptxParser;
use std::path::{Path, PathBuf};

/// Report which hymns the slide library holds, by number and by service date.
#[derive(Parser, Debug)]
#[command(name = "hymn-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: $HYMNAL_CONFIG, then ./hymnal.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Library directory, replacing the configured ones
    #[arg(short, long)]
    library: Vec<PathBuf>,

    /// Script profile (default: the configured language)
    #[arg(long)]
    language: Option<String>,

    /// Report file (default: hymn_report.json in the output directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report to stdout instead of writing a file
    #[arg(short, long)]
    print: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let mut config = Config::resolve(args.config.as_deref())?;
    if !args.library.is_empty() {
        config.library_dirs = args.library.clone();
    }

    let library = config.library();
    let parser = PptxParser::new();
    let segmenter = RunSegmenter::new(config.profile(args.language.as_deref()));
    let compendium = CompendiumSegmenter::new(config.compendium_titles());

    let mut rows: Vec<ReportRow> = Vec::new();
    let mut analyzed = 0;

    for path in &library.service_files {
        match parser.load(path) {
            Ok(presentation) => {
                let runs = segmenter.extract_hymns(&presentation);
                log::info!("{}: {} hymns", display_name(path), runs.len());
                rows.extend(runs.iter().map(ReportRow::from_run));
                analyzed += 1;
            }
            Err(e) => log::warn!("Could not open {}: {}", path.display(), e),
        }
    }

    // The curated table is more complete than anything read off the slides.
    let titles = compendium.titles();
    for path in &library.compendiums {
        if !titles.is_empty() {
            rows.extend(compendium_rows(titles, &display_name(path)));
            analyzed += 1;
            continue;
        }
        match parser.load(path) {
            Ok(presentation) => {
                let runs = compendium.segment(&presentation);
                log::info!("{}: {} hymns", display_name(path), runs.len());
                rows.extend(runs.iter().map(ReportRow::from_run));
                analyzed += 1;
            }
            Err(e) => log::warn!("Could not open {}: {}", path.display(), e),
        }
    }
    if library.compendiums.is_empty() && !titles.is_empty() {
        let source = config
            .compendium_titles
            .as_deref()
            .map(display_name)
            .unwrap_or_default();
        rows.extend(compendium_rows(titles, &source));
    }

    let report = HymnReport::build(rows, analyzed);
    let json = report.to_json()?;

    if args.print {
        println!("{}", json);
    } else {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| config.output_dir.join("hymn_report.json"));
        std::fs::write(&output, &json).with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Report saved to {}", output.display());
    }

    println!("Files analyzed: {}", report.files_analyzed);
    println!("Hymn entries: {} ({} unique numbers)", report.total_entries, report.unique_numbers);
    if let Some((low, high)) = report.number_range {
        println!("Hymn numbers: {} - {}", low, high);
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

//! Generate a Holy Communion service deck from a plan file.

use anyhow::{bail, Context, Result};
use clap::Parser;
use hymn_core::config::{HOLY_COMMUNION_IMAGE, QR_CODE_IMAGE, TITLE_BACKGROUND_IMAGE};
use hymn_core::{
    assemble, CompendiumSegmenter, Config, DeckWriter, GenerationSession, OutlineFormatter, RunSegmenter, ServicePlan,
};
use hymn_pptx::{DeckImages, PptxDeckWriter, PptxParser};
use std::path::{Path, PathBuf};

/// Build a service deck by copying each planned hymn out of past service decks.
#[derive(Parser, Debug)]
#[command(name = "hcs-generate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plan file, one request per line
    #[arg(long, value_name = "PLAN")]
    batch: PathBuf,

    /// Output file name (default: "<today> - Generated <language> HCS.pptx")
    output: Option<PathBuf>,

    /// Config file (default: $HYMNAL_CONFIG, then ./hymnal.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Library directory, replacing the configured ones
    #[arg(short, long)]
    library: Vec<PathBuf>,

    /// Base template deck
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Also print a text outline of the deck
    #[arg(long)]
    outline: bool,

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
    if let Some(template) = &args.template {
        config.template = template.clone();
    }

    // Without a template nothing can be written; fail before any searching.
    let writer = PptxDeckWriter::from_template(config.template_path()?)?.with_images(DeckImages {
        communion: config.image(HOLY_COMMUNION_IMAGE),
        qr_code: config.image(QR_CODE_IMAGE),
        title_background: config.image(TITLE_BACKGROUND_IMAGE),
    });

    let plan = ServicePlan::load(&args.batch)
        .with_context(|| format!("Failed to read plan {}", args.batch.display()))?;
    if plan.is_empty() {
        bail!("No songs found in {}", args.batch.display());
    }

    let library = config.library();
    log::info!("Found {} source presentations", library.len());

    let profile = config.profile(plan.language.as_deref());
    let loader = PptxParser::new();
    let mut session = GenerationSession::new(
        &loader,
        &library,
        RunSegmenter::new(profile),
        CompendiumSegmenter::new(config.compendium_titles()),
    );
    let deck = assemble(&plan, &mut session, &config.assembly_options(None));

    let output = output_path(&config.output_dir, args.output.as_deref(), profile.name);
    let count = writer
        .write(&deck, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if args.outline {
        print!("{}", OutlineFormatter::new().with_slide_numbers(true).format_with_newline(&deck));
        println!();
    }

    println!("Created {} ({} slides)", output.display(), count);
    if !deck.unresolved.is_empty() {
        println!("Not found ({}):", deck.unresolved.len());
        for request in &deck.unresolved {
            println!("  - {}", request);
        }
    }

    Ok(())
}

/// Where the deck goes. Bare names land in `output_dir`; the default name
/// carries the plan's language.
fn output_path(output_dir: &Path, name: Option<&Path>, language: &str) -> PathBuf {
    let name = match name {
        Some(name) if name.extension().is_some() => name.to_path_buf(),
        Some(name) => name.with_extension("pptx"),
        None => PathBuf::from(format!(
            "{} - Generated {language} HCS.pptx",
            chrono::Local::now().format("%d %b %Y")
        )),
    };
    output_dir.join(name)
}

//! repaper CLI - PDF layout extraction and in-place reconstruction

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use repaper::{
    BuildOptions, DocumentLayout, ExtractOptions, MathConfig, PdfBuilder, Repaper, Rewrites,
};

#[derive(Parser)]
#[command(name = "repaper")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Extract PDF block layouts and rebuild PDFs with rewritten text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the block layout of a PDF as JSON
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Fail on the first page that cannot be read
        #[arg(long)]
        strict: bool,

        /// Keep formula-like blocks
        #[arg(long)]
        no_math: bool,
    },

    /// Build a PDF from a layout JSON file
    Build {
        /// Layout JSON file
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,

        /// Source PDF painted as page backgrounds
        #[arg(short, long, value_name = "PDF")]
        source: Option<PathBuf>,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Redraw blocks that have no rewritten text
        #[arg(long)]
        redraw_original: bool,
    },

    /// Extract, apply rewrites and rebuild in one step
    Reconstruct {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Rewrites JSON file (block id -> text)
        #[arg(short, long, value_name = "FILE")]
        rewrites: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Redraw blocks that have no rewritten text
        #[arg(long)]
        redraw_original: bool,

        /// Fail on the first page that cannot be read
        #[arg(long)]
        strict: bool,
    },

    /// Show page, block and zone counts
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            compact,
            strict,
            no_math,
        } => cmd_extract(&input, output.as_deref(), compact, strict, no_math),
        Commands::Build {
            layout,
            source,
            output,
            redraw_original,
        } => cmd_build(&layout, source.as_deref(), &output, redraw_original),
        Commands::Reconstruct {
            input,
            rewrites,
            output,
            redraw_original,
            strict,
        } => cmd_reconstruct(&input, &rewrites, output.as_deref(), redraw_original, strict),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn extract_options(strict: bool, no_math: bool) -> ExtractOptions {
    let mut options = ExtractOptions::new();
    if strict {
        options = options.strict();
    }
    if no_math {
        options = options.with_math(MathConfig::disabled());
    }
    options
}

/// `<stem><suffix>` next to the input.
fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}{}", stem, suffix))
}

fn load_layout(path: &Path) -> Result<DocumentLayout, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)?;
    Ok(DocumentLayout::from_json(&json)?)
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    strict: bool,
    no_math: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = Repaper::new()
        .with_extract_options(extract_options(strict, no_math))
        .extract_file(input)?;

    let json = if compact {
        serde_json::to_string(&layout)?
    } else {
        layout.to_json()?
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!(
            "{} {} ({} blocks)",
            "Saved to".green(),
            path.display(),
            layout.block_count()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_build(
    layout_path: &Path,
    source: Option<&Path>,
    output: &Path,
    redraw_original: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut layout = load_layout(layout_path)?;
    let options = BuildOptions::new().redraw_original(redraw_original);
    let pdf = build_layout(&mut layout, source, options)?;

    fs::write(output, pdf)?;
    println!(
        "{} {} ({} pages)",
        "Saved to".green(),
        output.display(),
        layout.page_count()
    );
    Ok(())
}

/// Attach the source PDF when given, then rebuild.
fn build_layout(
    layout: &mut DocumentLayout,
    source: Option<&Path>,
    options: BuildOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match source {
        Some(source) => layout.set_source(repaper::LopdfBackend::load_file(source)?.shared_doc()),
        None => log::warn!("No source PDF given; pages without a raster get a blank background"),
    }
    Ok(PdfBuilder::new(options).build(layout)?)
}

fn cmd_reconstruct(
    input: &Path,
    rewrites_path: &Path,
    output: Option<&Path>,
    redraw_original: bool,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, ".rewritten.pdf"));

    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    let repaper = Repaper::new()
        .with_extract_options(extract_options(strict, false))
        .with_build_options(BuildOptions::new().redraw_original(redraw_original));

    pb.set_message("Extracting layout...");
    let mut layout = repaper.extract_file(input)?;
    pb.inc(1);

    pb.set_message("Applying rewrites...");
    let rewrites = Rewrites::from_json(&fs::read_to_string(rewrites_path)?)?;
    let applied = layout.apply_rewrites(&rewrites);
    pb.inc(1);

    pb.set_message("Building PDF...");
    let pdf = repaper.build(&layout)?;
    fs::write(&output, pdf)?;
    pb.inc(1);

    pb.finish_with_message("Done!");

    println!(
        "\n{} {} of {} blocks rewritten",
        "Rewrites:".green().bold(),
        applied,
        layout.block_count()
    );
    println!("  {} {}", "└─".dimmed(), output.display());

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let format = repaper::detect_format_from_bytes(&data)?;
    let layout = Repaper::new().extract(&data)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    println!("{}: {}", "Pages".bold(), layout.page_count());
    println!("{}: {}", "Blocks".bold(), layout.block_count());
    println!("{}: {}", "Zones".bold(), layout.zone_count());
    println!("{}: {}", "Links".bold(), layout.link_count());

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for page in &layout.pages {
        let headings = page.blocks.iter().filter(|b| b.style.is_heading()).count();
        println!(
            "{:>4}  {:.0}x{:.0}pt  {} blocks ({} headings)  {} links  {}",
            page.page_index + 1,
            page.width,
            page.height,
            page.blocks.len(),
            headings,
            page.links.len(),
            page.background.kind().dimmed()
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "repaper".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF layout extraction and in-place reconstruction");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/repaper".dimmed());
    println!("License: MIT");
}

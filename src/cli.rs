use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing::info;

use crate::core::embed::Embedder;
use crate::core::pipeline::Deduplicator;
use crate::infra::config::{self, PipelineConfig};
use crate::infra::records;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "qsift")]
#[command(about = "Three-stage (exact, fuzzy, semantic) question deduplication for large datasets")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Validate configuration and input, print the plan, write nothing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deduplicate a CSV of questions
    Run(RunArgs),

    /// Initialize a qsift.toml config file
    Init(InitArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output CSV path (default: `<input stem>_deduplicated.csv` beside the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Question column name (overrides config)
    #[arg(long)]
    pub column: Option<String>,

    /// Path to configuration file (default: qsift.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write a plain-text report next to the output
    #[arg(long)]
    pub report: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory for the config file
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Run the full deduplication pipeline over a CSV
pub fn run(args: RunArgs, ctx: &AppContext) -> Result<()> {
    let mut cfg = config::load_config(args.config.as_deref())?;
    if let Some(column) = args.column {
        cfg.input.question_column = column;
    }
    cfg.validate()?;

    let table = records::read_csv(&args.input, &cfg.input.question_column)?;

    let output = args.output.unwrap_or_else(|| default_output(&args.input));

    info!(
        input = %args.input.display(),
        output = %output.display(),
        column = %cfg.input.question_column,
        rows = table.records.len(),
        "starting deduplication"
    );

    if ctx.dry_run {
        println!("Would deduplicate {} rows from {}", table.records.len(), args.input.display());
        println!(
            "  stages: exact={} fuzzy={} ({}) semantic={}",
            cfg.exact.enabled, cfg.fuzzy.enabled, cfg.fuzzy.algorithm, cfg.semantic.enabled
        );
        println!("  output: {}", output.display());
        return Ok(());
    }

    let embedder = build_embedder(&cfg)?;
    let result = Deduplicator::new(cfg, embedder)
        .with_progress(!ctx.quiet)
        .run(table.records)?;

    records::write_csv(&output, &table.headers, &result.kept)?;

    if args.report {
        let report_path = output.with_extension("report.txt");
        std::fs::write(&report_path, result.report.render())
            .with_context(|| format!("failed to write report to {}", report_path.display()))?;
        if !ctx.quiet {
            println!("Report written to {}", report_path.display());
        }
    }

    if !ctx.quiet {
        print!("{}", result.report.render());
        let headline = format!(
            "Kept {} of {} records ({:.2}% reduction)",
            result.report.final_count,
            result.report.original_count,
            result.report.reduction_percentage
        );
        if ctx.no_color {
            println!("{headline}");
        } else {
            println!("{}", headline.green().bold());
        }
    }

    Ok(())
}

/// Write a default qsift.toml
pub fn init(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let path = config::write_default(&args.path, args.force)?;
    if !ctx.quiet {
        println!("Created config file at {}", path.display());
    }
    Ok(())
}

fn default_output(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_deduplicated.csv"))
}

#[cfg(feature = "fastembed")]
fn build_embedder(cfg: &PipelineConfig) -> Result<Option<Box<dyn Embedder>>> {
    if !cfg.semantic.enabled {
        return Ok(None);
    }
    let backend = crate::core::embed::FastEmbedder::new(&cfg.semantic.embedding)?;
    Ok(Some(Box::new(backend)))
}

#[cfg(not(feature = "fastembed"))]
fn build_embedder(cfg: &PipelineConfig) -> Result<Option<Box<dyn Embedder>>> {
    if !cfg.semantic.enabled {
        return Ok(None);
    }
    Err(crate::error::QsiftError::DependencyUnavailable(
        "semantic stage is enabled but this binary was built without the `fastembed` feature; \
         rebuild with `--features fastembed` or disable the semantic stage"
            .to_string(),
    )
    .into())
}

//! litscreen - bibliographic screening pipeline
//!
//! Screens a folder of citation-database exports (RIS / BibTeX), removes
//! duplicate titles, classifies papers and writes a paper table plus
//! statistics.
//!
//! ## Usage
//!
//! ```bash
//! litscreen screen ./all-zot-items --output ./statistics
//! litscreen enrich ./statistics/screened_papers.csv --sort-by f1_score
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use litscreen::enrichment::{self, EnrichConfig};
use litscreen::{pipeline, report, DuplicatePolicy, RuleSetName, ScreenConfig};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Bibliographic screening pipeline
#[derive(Parser)]
#[command(name = "litscreen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Write the log to this file instead of stderr
    #[arg(long, global = true)]
    trace_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate, classify and tally every export in a folder
    Screen {
        /// Folder holding .ris / .bib exports
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Signal rule set
        #[arg(long, value_enum, default_value_t = RuleSetName::Screening)]
        rules: RuleSetName,

        /// Whether duplicates are classified before the ledger decision
        #[arg(long, value_enum, default_value_t = DuplicatePolicy::CheckFirst)]
        duplicates: DuplicatePolicy,

        /// Skip entries without an abstract
        #[arg(long)]
        require_abstract: bool,

        /// Write into a fresh <timestamp>_<input-name> subfolder
        #[arg(long)]
        timestamped: bool,
    },

    /// Mine screened papers' PDFs for model names and metric values
    Enrich {
        /// Screened paper table (CSV with title and url columns)
        papers: PathBuf,

        /// Output CSV
        #[arg(short, long, default_value = "./output/model_performance.csv")]
        output: PathBuf,

        /// Metric to sort by (descending)
        #[arg(long, default_value = "f1_score")]
        sort_by: String,

        /// Only process the first N papers with a URL
        #[arg(long)]
        limit: Option<usize>,

        /// Concurrent downloads
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Pages of each PDF to read
        #[arg(long, default_value_t = 50)]
        max_pages: usize,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.trace_log.as_deref())?;

    match cli.command {
        Commands::Screen {
            input,
            output,
            rules,
            duplicates,
            require_abstract,
            timestamped,
        } => {
            let config = ScreenConfig {
                rule_set: rules,
                duplicate_policy: duplicates,
                require_abstract,
            };
            run_screen(&input, &output, config, timestamped)
        }
        Commands::Enrich {
            papers,
            output,
            sort_by,
            limit,
            concurrency,
            max_pages,
        } => {
            let config = EnrichConfig {
                concurrency,
                max_pages,
                limit,
            };
            run_enrich(&papers, &output, &sort_by, &config).await
        }
    }
}

fn init_logging(debug: bool, trace_log: Option<&Path>) -> Result<()> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    match trace_log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .init();
        }
    }
    Ok(())
}

// ============================================================================
// Screening
// ============================================================================

fn run_screen(input: &Path, output: &Path, config: ScreenConfig, timestamped: bool) -> Result<()> {
    let output_folder = if timestamped {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let input_name = input_folder_name(input);
        output.join(format!("{}_{}", timestamp, input_name))
    } else {
        output.to_path_buf()
    };

    let run = pipeline::screen_directory(input, config)
        .with_context(|| format!("Screening failed for {}", input.display()))?;

    let statistics = report::write_report(&output_folder, &run)
        .with_context(|| format!("Failed to write report to {}", output_folder.display()))?;

    println!("{}", statistics);
    println!(
        "Detailed paper information saved to {}",
        output_folder.join(report::PAPERS_FILE).display()
    );
    println!(
        "Statistics saved to {}",
        output_folder.join(report::STATISTICS_FILE).display()
    );
    Ok(())
}

fn input_folder_name(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

// ============================================================================
// Enrichment
// ============================================================================

async fn run_enrich(papers: &Path, output: &Path, sort_by: &str, config: &EnrichConfig) -> Result<()> {
    let links = enrichment::read_paper_links(papers)
        .with_context(|| format!("Failed to read {}", papers.display()))?;
    info!(rows = links.len(), "Loaded screened papers");

    let mut results = enrichment::enrich_papers(config, &links).await?;
    enrichment::sort_by_metric(&mut results, sort_by);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    enrichment::write_performance_csv(output, &results)?;

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    println!(
        "Enriched {} papers ({} failed). Results saved to {}",
        results.len() - failed,
        failed,
        output.display()
    );
    Ok(())
}

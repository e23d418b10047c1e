//! scopus-report - author publication report from Scopus
//!
//! ## Usage
//!
//! ```bash
//! scopus-report run --config conf.json --output result.json
//! scopus-report author --config conf.json
//! scopus-report show result.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scopus_report::config::{Config, FailurePolicy};
use scopus_report::scopus::ScopusClient;
use scopus_report::{pipeline, report};
use std::path::{Path, PathBuf};
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Scopus author report - profile, metrics and publications as JSON
#[derive(Parser)]
#[command(name = "scopus-report")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch everything and write the report
    Run {
        /// Configuration file (api_key, author_id)
        #[arg(short, long, default_value = "conf.json")]
        config: PathBuf,

        /// Report output path
        #[arg(short, long, default_value = "result.json")]
        output: PathBuf,

        /// Also write the documents as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Follow search pages instead of stopping at the page size
        #[arg(long)]
        paginate: bool,

        /// Documents requested per search page
        #[arg(long)]
        page_size: Option<u32>,

        /// Leave out documents that fail instead of aborting the run
        #[arg(long)]
        skip_failed: bool,

        /// Maximum concurrent document fetches
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Fetch and print the author profile and metrics only
    Author {
        /// Configuration file (api_key, author_id)
        #[arg(short, long, default_value = "conf.json")]
        config: PathBuf,
    },

    /// Print a summary of a previously written report
    Show {
        /// Report file
        report: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let result = match cli.command {
        Commands::Run {
            config,
            output,
            csv,
            paginate,
            page_size,
            skip_failed,
            concurrency,
        } => {
            let overrides = RunOverrides {
                paginate,
                page_size,
                skip_failed,
                concurrency,
            };
            run_report(&config, &output, csv.as_deref(), overrides).await
        }
        Commands::Author { config } => show_author(&config).await,
        Commands::Show { report } => show_report(&report),
    };

    if let Err(ref e) = result {
        error!(error = %e, "Run failed");
    }
    result
}

// ============================================================================
// Commands
// ============================================================================

/// Command-line values that take precedence over the configuration file
struct RunOverrides {
    paginate: bool,
    page_size: Option<u32>,
    skip_failed: bool,
    concurrency: Option<usize>,
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn run_report(
    config_path: &Path,
    output: &Path,
    csv_path: Option<&Path>,
    overrides: RunOverrides,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if overrides.paginate {
        config.paginate = true;
    }
    if let Some(page_size) = overrides.page_size {
        config.page_size = page_size;
    }
    if overrides.skip_failed {
        config.failure_policy = FailurePolicy::Skip;
    }
    if let Some(concurrency) = overrides.concurrency {
        config.concurrency = concurrency;
    }
    let config = config.validated().context("Invalid command-line options")?;

    println!("Author: {}", config.author_id);

    let report = pipeline::run(&config, output).await.context("Pipeline failed")?;

    if let Some(csv_path) = csv_path {
        report::export_documents_csv(csv_path, &report.documents)
            .context("Failed to write CSV")?;
        println!("Saved: {:?}", csv_path);
    }

    println!("Saved: {:?}", output);
    print_summary(&report);
    if report.truncated {
        println!("Note: document list truncated at {} entries; rerun with --paginate to fetch all.", config.page_size);
    }
    Ok(())
}

async fn show_author(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let client = ScopusClient::new(&config)?;
    let (author, metrics) = pipeline::fetch_author_summary(&client, &config).await?;

    let combined = serde_json::json!({ "author": author, "metrics": metrics });
    println!("{}", serde_json::to_string_pretty(&combined)?);
    Ok(())
}

fn show_report(path: &Path) -> Result<()> {
    let report = report::read_report(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &report::AggregateReport) {
    let author = &report.author;
    println!();
    println!("{} (Scopus {})", author.author_name, author.scopus_id);
    if let Some(orcid) = &author.orcid {
        println!("  ORCID:       {}", orcid);
    }
    if let Some(affiliation) = &author.current_affiliation {
        let parts: Vec<&str> = [&affiliation.institute, &affiliation.city, &affiliation.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        println!("  Affiliation: {}", parts.join(", "));
    }
    let count = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |n| n.to_string());
    println!("  h-index:     {}", count(report.metrics.h_index));
    println!("  Cited by:    {}", count(report.metrics.cited_by_count));
    println!("  Citations:   {}", count(report.metrics.citation_count));
    println!(
        "  Documents:   {} in report ({} upstream), {} open access, {} citations",
        report.documents.len(),
        count(report.metrics.document_count),
        report.open_access_count(),
        report.total_citations()
    );
    println!("  Generated:   {}", report.generated_at);
}

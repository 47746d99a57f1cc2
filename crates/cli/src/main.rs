//! regcheck CLI - Main Entry Point
//!
//! Runs the registration test catalog against a simulated validator, a live
//! HTTP endpoint or a real browser, and summarizes stored reports.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use regcheck_cli::commands::{catalog, dashboard, run};
use regcheck_cli::output::{self, print_error};
use regcheck_common::HarnessConfig;

/// regcheck - registration form test harness
#[derive(Parser)]
#[command(name = "regcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults are used when it does not exist)
    #[arg(long, default_value_os_t = regcheck_common::default_config_path(), global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Defaults to a simulated run of the full catalog
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the catalog and write a report
    Run(run::RunArgs),

    /// List catalog cases
    Catalog(catalog::CatalogArgs),

    /// Summarize the latest (or a given) report
    Dashboard(dashboard::DashboardArgs),
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = HarnessConfig::load(&cli.config)?;

    match cli.command.unwrap_or_else(|| Commands::Run(run::RunArgs::default())) {
        Commands::Run(args) => run::execute(args, config, cli.format).await,
        Commands::Catalog(args) => catalog::execute(args, cli.format),
        Commands::Dashboard(args) => dashboard::execute(args, &config, cli.format),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; the progress bar and report own the terminal by default
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

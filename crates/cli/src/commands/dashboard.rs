//! Dashboard Command

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use regcheck_common::HarnessConfig;
use regcheck_e2e::DashboardSummary;

use crate::output::{render_structured, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct DashboardArgs {
    /// Directory searched for the latest report (defaults to report.output_dir)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Explicit report file
    #[arg(long, conflicts_with = "dir")]
    pub report: Option<PathBuf>,
}

pub fn execute(args: DashboardArgs, config: &HarnessConfig, format: OutputFormat) -> Result<()> {
    let summary = match &args.report {
        Some(path) => DashboardSummary::load(path)?,
        None => {
            let dir = args.dir.as_ref().unwrap_or(&config.report.output_dir);
            DashboardSummary::load_latest(dir)?
        }
    };

    if format.is_structured() {
        println!("{}", render_structured(&summary.to_document(), format)?);
    } else {
        println!("{}", summary.render_text());
    }
    Ok(())
}

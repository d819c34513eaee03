//! CLI entry-point for pulling tracked inputs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    pipeline::{self, RunReport},
    shell::SystemRunner,
};

/// Args for the `sync` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Paths that must exist locally (defaults to the raw data directory).
    pub paths: Vec<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let paths = if args.paths.is_empty() {
        vec![settings.raw_data_dir.clone()]
    } else {
        args.paths
    };
    let runner = SystemRunner::new();
    let mut report = RunReport::default();
    pipeline::sync_paths(&settings, &runner, &paths, &mut report)?;
    let present = paths.iter().filter(|p| p.exists()).count();
    info!(present, required = paths.len(), "sync finished");
    report.log_summary();
    Ok(())
}

//! CLI entry-point for feature generation.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{cli::RunArgs, config::Settings, pipeline, shell::SystemRunner};

#[instrument(skip(settings))]
pub async fn run(args: RunArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);
    let runner = SystemRunner::new();
    let report = pipeline::generate_features(&settings, &runner).context("generating features")?;
    if report.is_clean() {
        info!("all feature datasets are tracked and pushed");
    }
    Ok(())
}

//! CLI entry-point for cleaning raw datasets.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{cli::RunArgs, config::Settings, pipeline, shell::SystemRunner};

#[instrument(skip(settings))]
pub async fn run(args: RunArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);
    let runner = SystemRunner::new();
    let report = pipeline::preprocess(&settings, &runner).context("preprocessing datasets")?;
    if report.is_clean() {
        info!("all processed datasets are tracked and pushed");
    }
    Ok(())
}

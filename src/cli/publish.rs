//! CLI entry-point for resuming interrupted publishes.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::{cli::RunArgs, config::Settings, pipeline, shell::SystemRunner};

#[instrument(skip(settings))]
pub async fn run(args: RunArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);
    let runner = SystemRunner::new();
    pipeline::publish_pending(&settings, &runner).context("resuming publish")?;
    Ok(())
}

//! CLI entry-point for fitting the inference model.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::features::FEATURE_FILE,
    model::train::{train_from_csv, DEFAULT_TARGET},
};

/// Args for the `train` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Training CSV (defaults to the generated feature matrix).
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Binary label column.
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,
    /// Optimiser iteration cap.
    #[arg(long, default_value_t = 150)]
    pub max_iterations: u64,
    /// Where to write the model (defaults to MODEL_PATH).
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let input = args
        .input
        .unwrap_or_else(|| settings.features_dir.join(FEATURE_FILE));
    let output = args.output.unwrap_or(settings.model_path);
    let model = train_from_csv(&input, &args.target, args.max_iterations)
        .with_context(|| format!("training on {}", input.display()))?;
    model
        .save(&output)
        .with_context(|| format!("saving model to {}", output.display()))?;
    info!(path = %output.display(), features = model.feature_names.len(), "model saved");
    Ok(())
}

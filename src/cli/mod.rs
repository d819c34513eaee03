//! Command-line interface wiring for the dataset pipeline.

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::{config::Settings, pipeline::ErrorPolicy, versioning::publish::PublishMode};

pub mod features;
pub mod preprocess;
pub mod publish;
pub mod serve;
pub mod sync;
pub mod train;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Versioned dataset preparation and model serving", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Sync(args) => sync::run(args, settings).await,
            Commands::Preprocess(args) => preprocess::run(args, settings).await,
            Commands::Publish(args) => publish::run(args, settings).await,
            Commands::Features(args) => features::run(args, settings).await,
            Commands::Train(args) => train::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pull tracked inputs from the DVC remote if they are missing locally.
    Sync(sync::Args),
    /// Clean raw CSVs and publish the processed outputs.
    Preprocess(RunArgs),
    /// Resume publishing artifacts that did not reach the remote.
    Publish(RunArgs),
    /// Generate calendar features over the processed transaction tables.
    Features(RunArgs),
    /// Fit a logistic classifier on a feature CSV.
    Train(train::Args),
    /// Serve the prediction API.
    Serve(serve::Args),
}

/// Overrides shared by commands that run the pipeline.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct RunArgs {
    /// Continue past failures or stop at the first one.
    #[arg(long, value_enum)]
    pub error_policy: Option<ErrorPolicy>,
    /// Publish one file at a time or as a single batch.
    #[arg(long, value_enum)]
    pub publish_mode: Option<PublishMode>,
}

impl RunArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(policy) = self.error_policy {
            settings.error_policy = policy;
        }
        if let Some(mode) = self.publish_mode {
            settings.publish_mode = mode;
        }
    }
}

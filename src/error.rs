//! Typed failures surfaced by pipeline stages.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::{shell::CommandFailure, versioning::state::ArtifactState};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Command(#[from] CommandFailure),

    #[error("required path is missing after sync: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{} is empty; a header row is required", .0.display())]
    EmptyInput(PathBuf),

    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("failed to clean {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("publishing {} stopped at {reached}: {failure}", path.display())]
    Publish {
        path: PathBuf,
        reached: ArtifactState,
        failure: CommandFailure,
    },

    #[error("publish state file {}: {message}", path.display())]
    State { path: PathBuf, message: String },

    #[error("feature synthesis failed: {0}")]
    Features(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

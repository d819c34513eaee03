//! Register, commit and push output files through the versioned store.
//!
//! Publishing is not transactional. Each transition is persisted as soon as
//! its command succeeds, so an artifact can be committed without having been
//! pushed. Nothing is rolled back; a later run resumes from the stored state.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::PipelineError,
    shell::{CommandFailure, CommandRunner},
    versioning::{
        pointer_path,
        state::{ArtifactState, StateStore},
        Toolchain,
    },
};

/// How commit and push are grouped across artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    /// Register, commit and push one file at a time.
    PerFile,
    /// Register each file, then one commit and one push for the batch.
    #[default]
    Bulk,
}

/// Where one artifact ended up after a publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub path: PathBuf,
    pub reached: ArtifactState,
    pub failure: Option<CommandFailure>,
}

impl PublishOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.reached.is_terminal()
    }

    pub fn to_error(&self) -> Option<PipelineError> {
        self.failure.as_ref().map(|failure| PipelineError::Publish {
            path: self.path.clone(),
            reached: self.reached,
            failure: failure.clone(),
        })
    }
}

/// Stored artifacts short of `Pushed` whose files still exist.
pub fn pending_on_disk(store: &StateStore) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (path, state) in store.pending() {
        if path.exists() {
            info!(path = %path.display(), %state, "resuming publish");
            paths.push(path);
        } else {
            warn!(path = %path.display(), %state, "pending artifact no longer on disk");
        }
    }
    paths
}

pub struct Publisher<'a, R> {
    runner: &'a R,
    tools: &'a Toolchain,
    store: &'a mut StateStore,
    message: String,
}

impl<'a, R: CommandRunner> Publisher<'a, R> {
    pub fn new(
        runner: &'a R,
        tools: &'a Toolchain,
        store: &'a mut StateStore,
        message: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            tools,
            store,
            message: message.into(),
        }
    }

    /// Drive one artifact from its stored state towards `Pushed`.
    ///
    /// Command failures are reported in the outcome; only state-file errors
    /// are returned as `Err`.
    pub fn publish(&mut self, path: &Path) -> Result<PublishOutcome, PipelineError> {
        let mut reached = self.store.state_of(path);
        while let Some(next) = reached.next() {
            if let Err(failure) = self.step(path, next) {
                return self.freeze(path, failure);
            }
            self.store.advance(path, next)?;
            reached = next;
        }
        info!(path = %path.display(), "artifact published");
        Ok(PublishOutcome {
            path: path.to_path_buf(),
            reached,
            failure: None,
        })
    }

    /// Publish a set of artifacts in the given mode, in the order given.
    pub fn publish_all(
        &mut self,
        paths: &[PathBuf],
        mode: PublishMode,
    ) -> Result<Vec<PublishOutcome>, PipelineError> {
        match mode {
            PublishMode::PerFile => paths.iter().map(|path| self.publish(path)).collect(),
            PublishMode::Bulk => self.publish_bulk(paths),
        }
    }

    /// Resume every stored artifact that has not reached `Pushed`.
    pub fn resume_pending(&mut self, mode: PublishMode) -> Result<Vec<PublishOutcome>, PipelineError> {
        let paths = pending_on_disk(self.store);
        self.publish_all(&paths, mode)
    }


    fn step(&self, path: &Path, target: ArtifactState) -> Result<(), CommandFailure> {
        match target {
            ArtifactState::Written => Ok(()),
            ArtifactState::Registered => self.runner.run(&self.tools.register(path)).map(drop),
            ArtifactState::Committed => self.commit_pointers(&[pointer_path(path)]),
            ArtifactState::Pushed => self
                .runner
                .run(&self.tools.push(&[path.to_path_buf()]))
                .map(drop),
        }
    }

    /// Stage `pointers` and commit them. When the index holds no change for
    /// them (the pointers were committed by an earlier run), the commit is
    /// skipped and the step still counts as done.
    fn commit_pointers(&self, pointers: &[PathBuf]) -> Result<(), CommandFailure> {
        self.runner.run(&self.tools.stage(pointers))?;
        let staged = self.runner.run(&self.tools.staged(pointers))?;
        if staged.trim().is_empty() {
            info!(pointers = pointers.len(), "pointer files already committed");
            return Ok(());
        }
        self.runner.run(&self.tools.commit(&self.message)).map(drop)
    }

    fn freeze(
        &mut self,
        path: &Path,
        failure: CommandFailure,
    ) -> Result<PublishOutcome, PipelineError> {
        let reached = self.store.state_of(path);
        warn!(path = %path.display(), %reached, error = %failure, "publish stopped");
        self.store.record_failure(path, &failure.to_string())?;
        Ok(PublishOutcome {
            path: path.to_path_buf(),
            reached,
            failure: Some(failure),
        })
    }

    fn publish_bulk(&mut self, paths: &[PathBuf]) -> Result<Vec<PublishOutcome>, PipelineError> {
        let mut failures: Vec<Option<CommandFailure>> = vec![None; paths.len()];

        for (idx, path) in paths.iter().enumerate() {
            if self.store.state_of(path) >= ArtifactState::Registered {
                continue;
            }
            match self.runner.run(&self.tools.register(path)) {
                Ok(_) => self.store.advance(path, ArtifactState::Registered)?,
                Err(failure) => {
                    self.store.record_failure(path, &failure.to_string())?;
                    failures[idx] = Some(failure);
                }
            }
        }

        let staged = self.batch_at(paths, ArtifactState::Registered);
        if !staged.is_empty() {
            let pointers: Vec<PathBuf> = staged.iter().map(|&i| pointer_path(&paths[i])).collect();
            let result = self.commit_pointers(&pointers);
            self.settle(paths, &staged, result, ArtifactState::Committed, &mut failures)?;
        }

        let committed = self.batch_at(paths, ArtifactState::Committed);
        if !committed.is_empty() {
            let targets: Vec<PathBuf> = committed.iter().map(|&i| paths[i].clone()).collect();
            let result = self.runner.run(&self.tools.push(&targets)).map(drop);
            self.settle(paths, &committed, result, ArtifactState::Pushed, &mut failures)?;
        }

        let outcomes: Vec<PublishOutcome> = paths
            .iter()
            .zip(failures)
            .map(|(path, failure)| PublishOutcome {
                path: path.clone(),
                reached: self.store.state_of(path),
                failure,
            })
            .collect();
        let pushed = outcomes.iter().filter(|o| o.is_complete()).count();
        info!(pushed, total = outcomes.len(), "bulk publish finished");
        Ok(outcomes)
    }

    fn batch_at(&self, paths: &[PathBuf], state: ArtifactState) -> Vec<usize> {
        (0..paths.len())
            .filter(|&i| self.store.state_of(&paths[i]) == state)
            .collect()
    }

    fn settle(
        &mut self,
        paths: &[PathBuf],
        batch: &[usize],
        result: Result<(), CommandFailure>,
        target: ArtifactState,
        failures: &mut [Option<CommandFailure>],
    ) -> Result<(), PipelineError> {
        match result {
            Ok(_) => {
                for &i in batch {
                    self.store.advance(&paths[i], target)?;
                }
            }
            Err(failure) => {
                warn!(%target, error = %failure, artifacts = batch.len(), "batch step failed");
                for &i in batch {
                    self.store.record_failure(&paths[i], &failure.to_string())?;
                    failures[i] = Some(failure.clone());
                }
            }
        }
        Ok(())
    }
}

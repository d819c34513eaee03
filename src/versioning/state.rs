//! Persisted per-artifact publish progress.
//!
//! Each output moves `Written -> Registered -> Committed -> Pushed`. A failed
//! external step leaves the artifact at the last state it reached; the next
//! run resumes from there.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Written,
    Registered,
    Committed,
    Pushed,
}

impl ArtifactState {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Written => Some(Self::Registered),
            Self::Registered => Some(Self::Committed),
            Self::Committed => Some(Self::Pushed),
            Self::Pushed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Pushed
    }
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Written => "written",
            Self::Registered => "registered",
            Self::Committed => "committed",
            Self::Pushed => "pushed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub state: ArtifactState,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    artifacts: BTreeMap<String, ArtifactRecord>,
}

/// JSON-backed map from artifact path to its publish record.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    artifacts: BTreeMap<String, ArtifactRecord>,
}

impl StateStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let artifacts = match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: StateFile =
                    serde_json::from_str(&raw).map_err(|e| PipelineError::State {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                file.artifacts
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no publish state yet");
                BTreeMap::new()
            }
            Err(err) => return Err(PipelineError::io(&path, err)),
        };
        Ok(Self { path, artifacts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, artifact: &Path) -> Option<&ArtifactRecord> {
        self.artifacts.get(&key(artifact))
    }

    /// Current state, treating unknown artifacts as freshly written.
    pub fn state_of(&self, artifact: &Path) -> ArtifactState {
        self.get(artifact)
            .map_or(ArtifactState::Written, |record| record.state)
    }

    /// Supersede any previous record for `artifact` with a new `Written` one.
    pub fn mark_written(&mut self, artifact: &Path) -> Result<(), PipelineError> {
        self.set(artifact, ArtifactState::Written, None)
    }

    /// Record that `artifact` reached `state`, clearing any stored error.
    pub fn advance(&mut self, artifact: &Path, state: ArtifactState) -> Result<(), PipelineError> {
        self.set(artifact, state, None)
    }

    /// Keep the current state but remember why the next step failed.
    pub fn record_failure(&mut self, artifact: &Path, error: &str) -> Result<(), PipelineError> {
        let state = self.state_of(artifact);
        self.set(artifact, state, Some(error.to_string()))
    }

    /// Artifacts that have not reached `Pushed`, in path order.
    pub fn pending(&self) -> Vec<(PathBuf, ArtifactState)> {
        self.artifacts
            .iter()
            .filter(|(_, record)| !record.state.is_terminal())
            .map(|(path, record)| (PathBuf::from(path), record.state))
            .collect()
    }

    fn set(
        &mut self,
        artifact: &Path,
        state: ArtifactState,
        last_error: Option<String>,
    ) -> Result<(), PipelineError> {
        self.artifacts.insert(
            key(artifact),
            ArtifactRecord {
                state,
                updated_at: Utc::now(),
                last_error,
            },
        );
        self.save()
    }

    /// Persist via a sibling temp file and rename.
    pub fn save(&self) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        let file = StateFile {
            artifacts: self.artifacts.clone(),
        };
        let body = serde_json::to_string_pretty(&file).map_err(|e| PipelineError::State {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| PipelineError::io(&tmp, e))?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            warn!(path = %self.path.display(), error = %err, "state rename failed");
            return Err(PipelineError::io(&self.path, err));
        }
        Ok(())
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_along_the_publish_path() {
        assert!(ArtifactState::Written < ArtifactState::Registered);
        assert!(ArtifactState::Registered < ArtifactState::Committed);
        assert!(ArtifactState::Committed < ArtifactState::Pushed);
        assert_eq!(ArtifactState::Pushed.next(), None);
    }

    #[test]
    fn store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state/publish_state.json");
        let artifact = Path::new("data/processed/a_processed.csv");

        let mut store = StateStore::open(&state_path).unwrap();
        store.advance(artifact, ArtifactState::Committed).unwrap();
        store.record_failure(artifact, "push refused").unwrap();

        let reopened = StateStore::open(&state_path).unwrap();
        let record = reopened.get(artifact).unwrap();
        assert_eq!(record.state, ArtifactState::Committed);
        assert_eq!(record.last_error.as_deref(), Some("push refused"));
        assert_eq!(reopened.pending().len(), 1);
    }

    #[test]
    fn mark_written_supersedes_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::open(dir.path().join("s.json")).unwrap();
        let artifact = Path::new("out.csv");
        store.advance(artifact, ArtifactState::Pushed).unwrap();
        store.mark_written(artifact).unwrap();
        assert_eq!(store.state_of(artifact), ArtifactState::Written);
    }

    #[test]
    fn corrupt_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            StateStore::open(&path),
            Err(PipelineError::State { .. })
        ));
    }
}

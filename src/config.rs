//! Runtime configuration utilities for the dataset pipeline.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Deserialize;

use crate::{
    pipeline::ErrorPolicy,
    versioning::{publish::PublishMode, Toolchain},
};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Track all processed datasets with DVC";
pub const FEATURES_COMMIT_MESSAGE: &str = "Track all generated feature datasets with DVC";

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Folder holding raw CSV inputs tracked by DVC.
    pub raw_data_dir: PathBuf,
    /// Folder receiving cleaned `<stem><suffix>.csv` outputs.
    pub processed_data_dir: PathBuf,
    /// Folder receiving generated feature matrices.
    pub features_dir: PathBuf,
    /// JSON file recording per-artifact publish progress.
    pub state_file: PathBuf,
    /// Serialized classifier loaded by `serve` and written by `train`.
    pub model_path: PathBuf,
    /// Suffix appended to an input stem to name its cleaned output.
    pub processed_suffix: String,
    pub dvc_bin: String,
    pub git_bin: String,
    /// Pull each missing path individually instead of the whole tracked set.
    pub scoped_pull: bool,
    pub error_policy: ErrorPolicy,
    pub publish_mode: PublishMode,
    /// Ignore inputs whose stem already carries `processed_suffix`.
    pub skip_processed_inputs: bool,
    /// Day that `TransactionDT` offsets are counted from.
    pub feature_reference_date: NaiveDate,
    pub commit_message: String,
}

impl Settings {
    /// Defaults laid out under `root`, matching the project's `data/` layout.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let processed_data_dir = root.join("data/processed");
        Self {
            raw_data_dir: root.join("data/raw"),
            features_dir: processed_data_dir.join("features"),
            processed_data_dir,
            state_file: root.join(".pipeline/publish_state.json"),
            model_path: root.join("models/fraud_model.json"),
            processed_suffix: "_processed".to_string(),
            dvc_bin: "dvc".to_string(),
            git_bin: "git".to_string(),
            scoped_pull: true,
            error_policy: ErrorPolicy::default(),
            publish_mode: PublishMode::default(),
            skip_processed_inputs: true,
            feature_reference_date: NaiveDate::from_ymd_opt(2017, 12, 1)
                .unwrap_or(NaiveDate::MIN),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut settings = Self::rooted_at(".");

        if let Some(v) = env_path("RAW_DATA_DIR") {
            settings.raw_data_dir = v;
        }
        if let Some(v) = env_path("PROCESSED_DATA_DIR") {
            settings.features_dir = v.join("features");
            settings.processed_data_dir = v;
        }
        if let Some(v) = env_path("FEATURES_DIR") {
            settings.features_dir = v;
        }
        if let Some(v) = env_path("PUBLISH_STATE_FILE") {
            settings.state_file = v;
        }
        if let Some(v) = env_path("MODEL_PATH") {
            settings.model_path = v;
        }
        if let Ok(v) = env::var("PROCESSED_SUFFIX") {
            settings.processed_suffix = v;
        }
        if let Ok(v) = env::var("DVC_BIN") {
            settings.dvc_bin = v;
        }
        if let Ok(v) = env::var("GIT_BIN") {
            settings.git_bin = v;
        }
        if let Ok(v) = env::var("COMMIT_MESSAGE") {
            settings.commit_message = v;
        }
        settings.scoped_pull = env_flag("DVC_SCOPED_PULL", settings.scoped_pull);
        settings.skip_processed_inputs =
            env_flag("SKIP_PROCESSED_INPUTS", settings.skip_processed_inputs);
        if let Ok(v) = env::var("ERROR_POLICY") {
            settings.error_policy = parse_enum(&v).context("parsing ERROR_POLICY")?;
        }
        if let Ok(v) = env::var("PUBLISH_MODE") {
            settings.publish_mode = parse_enum(&v).context("parsing PUBLISH_MODE")?;
        }
        if let Ok(v) = env::var("FEATURE_REFERENCE_DATE") {
            settings.feature_reference_date = NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .with_context(|| format!("parsing FEATURE_REFERENCE_DATE={v}"))?;
        }

        Ok(settings)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            dvc: self.dvc_bin.clone(),
            git: self.git_bin.clone(),
        }
    }

    /// Output location for a raw input file: `<processed>/<stem><suffix>.csv`.
    pub fn processed_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.processed_data_dir
            .join(format!("{stem}{}.csv", self.processed_suffix))
    }

    /// Whether `input` already looks like a cleaned output.
    pub fn is_processed_name(&self, input: &Path) -> bool {
        !self.processed_suffix.is_empty()
            && input
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.ends_with(&self.processed_suffix))
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn parse_enum<T: ValueEnum>(raw: &str) -> anyhow::Result<T> {
    T::from_str(raw.trim(), true).map_err(|e| anyhow!(e))
}

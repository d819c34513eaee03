//! Linear run orchestration: sync, clean each input, publish outputs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    config::{Settings, FEATURES_COMMIT_MESSAGE},
    data::{
        clean::clean,
        features,
        table::{read_csv, to_csv_bytes, write_bytes},
    },
    error::PipelineError,
    shell::CommandRunner,
    versioning::{
        publish::{pending_on_disk, PublishOutcome, Publisher},
        state::StateStore,
        sync::ensure_local,
        Toolchain,
    },
};

/// What to do when a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Log, collect and keep going; failures are surfaced in the report.
    #[default]
    ContinueOnError,
    /// Stop at the first failure and return it.
    FailFast,
}

/// Everything one run did, including failures it tolerated.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Output files produced (or confirmed unchanged) this run.
    pub processed: Vec<PathBuf>,
    /// Inputs deliberately not processed.
    pub skipped: Vec<PathBuf>,
    pub artifacts: Vec<PublishOutcome>,
    pub failures: Vec<PipelineError>,
}

impl RunReport {
    /// Apply `policy` to `err`: collect it, or hand it back to stop the run.
    pub fn record(&mut self, policy: ErrorPolicy, err: PipelineError) -> Result<(), PipelineError> {
        match policy {
            ErrorPolicy::FailFast => Err(err),
            ErrorPolicy::ContinueOnError => {
                error!(error = %err, "step failed; continuing");
                self.failures.push(err);
                Ok(())
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log_summary(&self) {
        let pushed = self.artifacts.iter().filter(|a| a.is_complete()).count();
        if self.is_clean() {
            info!(
                processed = self.processed.len(),
                skipped = self.skipped.len(),
                pushed,
                "run finished"
            );
        } else {
            warn!(
                processed = self.processed.len(),
                skipped = self.skipped.len(),
                pushed,
                failures = self.failures.len(),
                "run finished with failures"
            );
            for failure in &self.failures {
                warn!(error = %failure, "failure");
            }
        }
    }
}

/// Pull `paths` if missing, applying the configured error policy to pull failures.
pub fn sync_paths<R: CommandRunner>(
    settings: &Settings,
    runner: &R,
    paths: &[PathBuf],
    report: &mut RunReport,
) -> Result<(), PipelineError> {
    let sync = ensure_local(runner, &settings.toolchain(), paths, settings.scoped_pull);
    for failure in sync.failures {
        report.record(settings.error_policy, failure.into())?;
    }
    Ok(())
}

/// Clean every raw CSV into the processed directory and publish the results.
///
/// Only a raw directory that is still absent after syncing aborts the run
/// regardless of policy.
pub fn preprocess<R: CommandRunner>(
    settings: &Settings,
    runner: &R,
) -> Result<RunReport, PipelineError> {
    let policy = settings.error_policy;
    let mut report = RunReport::default();

    sync_paths(settings, runner, &[settings.raw_data_dir.clone()], &mut report)?;
    if !settings.raw_data_dir.is_dir() {
        error!(path = %settings.raw_data_dir.display(), "raw data directory does not exist");
        return Err(PipelineError::MissingInput(settings.raw_data_dir.clone()));
    }
    fs::create_dir_all(&settings.processed_data_dir)
        .map_err(|e| PipelineError::io(&settings.processed_data_dir, e))?;

    let mut store = StateStore::open(&settings.state_file)?;
    let mut outputs = Vec::new();
    for input in list_csv(&settings.raw_data_dir)? {
        if settings.skip_processed_inputs && settings.is_processed_name(&input) {
            warn!(file = %input.display(), "input already carries the processed suffix; skipping");
            report.skipped.push(input);
            continue;
        }
        match process_file(settings, &mut store, &input) {
            Ok(output) => outputs.push(output),
            Err(err) => report.record(policy, err)?,
        }
    }
    report.processed = outputs.clone();

    publish_outputs(
        settings,
        runner,
        &mut store,
        &outputs,
        &settings.commit_message,
        &mut report,
    )?;
    report.log_summary();
    Ok(report)
}

/// Load, clean and write one input. Returns the output path.
///
/// An output whose bytes are unchanged keeps its publish record so a rerun
/// resumes instead of re-publishing.
pub fn process_file(
    settings: &Settings,
    store: &mut StateStore,
    input: &Path,
) -> Result<PathBuf, PipelineError> {
    info!(file = %input.display(), "processing");
    let raw = read_csv(input)?;
    let mut cleaned = clean(&raw).map_err(|source| PipelineError::Clean {
        path: input.to_path_buf(),
        source,
    })?;
    let output = settings.processed_path_for(input);
    let bytes = to_csv_bytes(&mut cleaned).map_err(|source| PipelineError::Write {
        path: output.clone(),
        source,
    })?;

    let unchanged = fs::read(&output).is_ok_and(|existing| existing == bytes);
    if unchanged && store.get(&output).is_some() {
        info!(path = %output.display(), state = %store.state_of(&output), "output unchanged");
    } else {
        write_bytes(&output, &bytes)?;
        store.mark_written(&output)?;
        info!(
            path = %output.display(),
            rows_in = raw.height(),
            rows_out = cleaned.height(),
            "processed file saved"
        );
    }
    Ok(output)
}

/// Resume every artifact whose publish did not reach the remote. Feature
/// matrices are committed with their own message.
pub fn publish_pending<R: CommandRunner>(
    settings: &Settings,
    runner: &R,
) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::default();
    let tools = settings.toolchain();
    let mut store = StateStore::open(&settings.state_file)?;
    let (feature_outputs, processed): (Vec<PathBuf>, Vec<PathBuf>) =
        pending_on_disk(&store)
            .into_iter()
            .partition(|path| path.starts_with(&settings.features_dir));

    for (paths, message) in [
        (processed, settings.commit_message.as_str()),
        (feature_outputs, FEATURES_COMMIT_MESSAGE),
    ] {
        if paths.is_empty() {
            continue;
        }
        let outcomes = Publisher::new(runner, &tools, &mut store, message)
            .publish_all(&paths, settings.publish_mode)?;
        collect_outcomes(settings.error_policy, outcomes, &mut report)?;
    }
    report.log_summary();
    Ok(report)
}

/// Build the feature matrix from processed tables and publish it.
pub fn generate_features<R: CommandRunner>(
    settings: &Settings,
    runner: &R,
) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::default();
    sync_paths(
        settings,
        runner,
        &[settings.processed_data_dir.clone()],
        &mut report,
    )?;
    if !settings.processed_data_dir.is_dir() {
        error!(path = %settings.processed_data_dir.display(), "processed data directory does not exist");
        return Err(PipelineError::MissingInput(settings.processed_data_dir.clone()));
    }

    let mut store = StateStore::open(&settings.state_file)?;
    let output = match features::build_feature_matrix(settings) {
        Ok(output) => output,
        Err(err) => {
            report.record(settings.error_policy, err)?;
            report.log_summary();
            return Ok(report);
        }
    };
    store.mark_written(&output)?;
    report.processed.push(output.clone());

    publish_outputs(
        settings,
        runner,
        &mut store,
        &[output],
        FEATURES_COMMIT_MESSAGE,
        &mut report,
    )?;
    report.log_summary();
    Ok(report)
}

fn publish_outputs<R: CommandRunner>(
    settings: &Settings,
    runner: &R,
    store: &mut StateStore,
    outputs: &[PathBuf],
    message: &str,
    report: &mut RunReport,
) -> Result<(), PipelineError> {
    if outputs.is_empty() {
        info!("nothing to publish");
        return Ok(());
    }
    let tools: Toolchain = settings.toolchain();
    let outcomes =
        Publisher::new(runner, &tools, store, message).publish_all(outputs, settings.publish_mode)?;
    collect_outcomes(settings.error_policy, outcomes, report)
}

fn collect_outcomes(
    policy: ErrorPolicy,
    outcomes: Vec<PublishOutcome>,
    report: &mut RunReport,
) -> Result<(), PipelineError> {
    let errors: Vec<PipelineError> = outcomes.iter().filter_map(PublishOutcome::to_error).collect();
    report.artifacts.extend(outcomes);
    for err in errors {
        report.record(policy, err)?;
    }
    Ok(())
}

/// `*.csv` files directly under `dir`, in lexicographic order.
pub fn list_csv(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

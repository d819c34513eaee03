mod common;

use std::{fs, path::Path};

use common::FakeRunner;
use ml_platform_comparison::{
    config::Settings,
    pipeline::{self, ErrorPolicy},
    versioning::{
        publish::PublishMode,
        state::{ArtifactState, StateStore},
    },
    PipelineError,
};

const TRANSACTIONS: &str = "TransactionID,card,amount\n1,visa,5\n1,visa,5\n2,,7\n";

fn settings_in(root: &Path) -> Settings {
    Settings::rooted_at(root)
}

fn write_raw(settings: &Settings, name: &str, body: &str) {
    fs::create_dir_all(&settings.raw_data_dir).unwrap();
    fs::write(settings.raw_data_dir.join(name), body).unwrap();
}

#[test]
fn cleans_writes_and_publishes_each_input() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);

    let runner = FakeRunner::new();
    let report = pipeline::preprocess(&settings, &runner).unwrap();

    let out = settings
        .processed_data_dir
        .join("train_transaction_processed.csv");
    assert_eq!(report.processed, vec![out.clone()]);
    assert!(report.is_clean());

    let written = fs::read_to_string(&out).unwrap();
    insta::assert_snapshot!(written.trim_end(), @r"
    TransactionID,card,amount
    1,visa,5
    2,visa,7
    ");

    assert_eq!(
        runner.commands(),
        vec![
            format!("dvc add {}", out.display()),
            format!("git add {}.dvc", out.display()),
            format!("git diff --cached --name-only -- {}.dvc", out.display()),
            "git commit -m 'Track all processed datasets with DVC'".to_string(),
            format!("dvc push {}", out.display()),
        ]
    );
    let store = StateStore::open(&settings.state_file).unwrap();
    assert_eq!(store.state_of(&out), ArtifactState::Pushed);
}

#[test]
fn rerun_with_unchanged_output_issues_no_commands() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);
    pipeline::preprocess(&settings, &FakeRunner::new()).unwrap();

    let runner = FakeRunner::new();
    let report = pipeline::preprocess(&settings, &runner).unwrap();

    assert!(runner.commands().is_empty());
    assert!(report.artifacts.iter().all(|a| a.is_complete()));
}

#[test]
fn changed_output_supersedes_previous_record() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);
    pipeline::preprocess(&settings, &FakeRunner::new()).unwrap();

    write_raw(&settings, "train_transaction.csv", "TransactionID,card,amount\n3,amex,1\n");
    let runner = FakeRunner::new();
    pipeline::preprocess(&settings, &runner).unwrap();

    assert_eq!(runner.commands().len(), 5);
}

#[test]
fn interrupted_publish_resumes_from_committed() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.publish_mode = PublishMode::PerFile;
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);

    let report = pipeline::preprocess(&settings, &FakeRunner::failing_on("dvc push")).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        PipelineError::Publish {
            reached: ArtifactState::Committed,
            ..
        }
    ));

    let runner = FakeRunner::new();
    let resumed = pipeline::publish_pending(&settings, &runner).unwrap();
    let out = settings
        .processed_data_dir
        .join("train_transaction_processed.csv");
    assert_eq!(runner.commands(), vec![format!("dvc push {}", out.display())]);
    assert!(resumed.is_clean());
}

#[test]
fn unparsable_file_is_skipped_and_batch_continues() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "bad.csv", "a,b\n1,2,3\n");
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);

    let report = pipeline::preprocess(&settings, &FakeRunner::new()).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], PipelineError::Load { .. }));
    assert_eq!(report.processed.len(), 1);
}

#[test]
fn zero_byte_input_fails_and_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "empty.csv", "");

    let runner = FakeRunner::new();
    let report = pipeline::preprocess(&settings, &runner).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], PipelineError::EmptyInput(_)));
    assert!(report.processed.is_empty());
    assert!(!settings.processed_data_dir.join("empty_processed.csv").exists());
    assert!(runner.commands().is_empty());
}

#[test]
fn lost_state_file_does_not_block_publishing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);
    pipeline::preprocess(&settings, &FakeRunner::new()).unwrap();
    fs::remove_file(&settings.state_file).unwrap();

    let runner = FakeRunner::new().with_clean_index();
    let report = pipeline::preprocess(&settings, &runner).unwrap();

    assert!(report.is_clean());
    assert!(report.artifacts.iter().all(|a| a.is_complete()));
    assert!(!runner.commands().iter().any(|c| c.starts_with("git commit")));
    let out = settings
        .processed_data_dir
        .join("train_transaction_processed.csv");
    let store = StateStore::open(&settings.state_file).unwrap();
    assert_eq!(store.state_of(&out), ArtifactState::Pushed);
}

#[test]
fn fail_fast_stops_at_first_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.error_policy = ErrorPolicy::FailFast;
    write_raw(&settings, "bad.csv", "a,b\n1,2,3\n");
    write_raw(&settings, "train_transaction.csv", TRANSACTIONS);

    let err = pipeline::preprocess(&settings, &FakeRunner::new()).unwrap_err();

    assert!(matches!(err, PipelineError::Load { .. }));
    assert!(!settings
        .processed_data_dir
        .join("train_transaction_processed.csv")
        .exists());
}

#[test]
fn inputs_with_processed_suffix_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    write_raw(&settings, "train_transaction_processed.csv", TRANSACTIONS);

    let report = pipeline::preprocess(&settings, &FakeRunner::new()).unwrap();

    assert!(report.processed.is_empty());
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn missing_raw_dir_after_pull_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());

    let runner = FakeRunner::new();
    let err = pipeline::preprocess(&settings, &runner).unwrap_err();

    assert!(matches!(err, PipelineError::MissingInput(_)));
    assert_eq!(
        runner.commands(),
        vec![format!("dvc pull {}", settings.raw_data_dir.display())]
    );
}

#[test]
fn pulled_raw_dir_lets_the_run_continue() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());

    let runner = FakeRunner::pull_creates(&settings.raw_data_dir);
    let report = pipeline::preprocess(&settings, &runner).unwrap();

    assert!(report.processed.is_empty());
    assert!(report.is_clean());
}

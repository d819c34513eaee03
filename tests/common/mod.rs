#![allow(dead_code)]

use std::{cell::RefCell, fs, path::PathBuf};

use ml_platform_comparison::shell::{CommandFailure, CommandLine, CommandRunner, FailureReason};

/// Records every command and fails the ones matching a prefix.
#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<CommandLine>>,
    fail_prefixes: Vec<String>,
    pull_creates: Vec<PathBuf>,
    clean_index: bool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(prefix: impl Into<String>) -> Self {
        Self {
            fail_prefixes: vec![prefix.into()],
            ..Self::default()
        }
    }

    /// Create `dir` whenever a `dvc pull` runs, like a successful pull would.
    pub fn pull_creates(dir: impl Into<PathBuf>) -> Self {
        Self {
            pull_creates: vec![dir.into()],
            ..Self::default()
        }
    }

    /// Report nothing staged, as when the pointer files are already committed.
    pub fn with_clean_index(mut self) -> Self {
        self.clean_index = true;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &CommandLine) -> Result<String, CommandFailure> {
        self.calls.borrow_mut().push(command.clone());
        let rendered = command.to_string();
        if self.fail_prefixes.iter().any(|p| rendered.starts_with(p)) {
            return Err(CommandFailure::new(
                command,
                FailureReason::Exit {
                    code: Some(1),
                    stderr: "simulated failure".to_string(),
                },
            ));
        }
        if rendered.starts_with("dvc pull") {
            for dir in &self.pull_creates {
                fs::create_dir_all(dir).expect("create pulled dir");
            }
        }
        if rendered.starts_with("git diff --cached") && !self.clean_index {
            let staged = command.args.iter().skip_while(|a| *a != "--").skip(1);
            return Ok(staged.cloned().collect::<Vec<_>>().join("\n"));
        }
        Ok(String::new())
    }
}

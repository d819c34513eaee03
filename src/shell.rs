//! External command execution with captured output.

use std::{fmt, process::Command};

use thiserror::Error;
use tracing::{debug, error, info};

/// A program plus its argument vector. Never interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Why a command did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The process ran and exited unsuccessfully. `code` is `None` when killed by a signal.
    Exit { code: Option<i32>, stderr: String },
    /// The process could not be started at all.
    Spawn { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit {
                code: Some(code),
                stderr,
            } => write!(f, "exit status {code}: {}", stderr.trim()),
            Self::Exit { code: None, stderr } => {
                write!(f, "terminated by signal: {}", stderr.trim())
            }
            Self::Spawn { message } => write!(f, "could not spawn: {message}"),
        }
    }
}

/// A failed external invocation, carried as a value rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command `{command}` failed ({reason})")]
pub struct CommandFailure {
    pub command: String,
    pub reason: FailureReason,
}

impl CommandFailure {
    pub fn new(command: &CommandLine, reason: FailureReason) -> Self {
        Self {
            command: command.to_string(),
            reason,
        }
    }
}

/// Seam over process spawning so pipeline stages can run against fakes.
pub trait CommandRunner {
    /// Run `command` to completion, returning captured stdout on success.
    fn run(&self, command: &CommandLine) -> Result<String, CommandFailure>;
}

/// Runs commands as child processes in the current directory with the
/// inherited environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<String, CommandFailure> {
        info!(%command, "executing command");
        let output = match Command::new(&command.program).args(&command.args).output() {
            Ok(output) => output,
            Err(err) => {
                let failure = CommandFailure::new(
                    command,
                    FailureReason::Spawn {
                        message: err.to_string(),
                    },
                );
                error!(%command, error = %err, "command could not be started");
                return Err(failure);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            debug!(%command, %stdout, "command succeeded");
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        error!(%command, code = ?output.status.code(), %stderr, "command failed");
        Err(CommandFailure::new(
            command,
            FailureReason::Exit {
                code: output.status.code(),
                stderr,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let cmd = CommandLine::new("git")
            .arg("commit")
            .arg("-m")
            .arg("Track all processed datasets with DVC");
        assert_eq!(
            cmd.to_string(),
            "git commit -m 'Track all processed datasets with DVC'"
        );
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let runner = SystemRunner::new();
        let cmd = CommandLine::new("definitely-not-a-real-binary-7f3a");
        let failure = runner.run(&cmd).unwrap_err();
        assert!(matches!(failure.reason, FailureReason::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_captures_stderr() {
        let runner = SystemRunner::new();
        let cmd = CommandLine::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let failure = runner.run(&cmd).unwrap_err();
        match failure.reason {
            FailureReason::Exit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected reason {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn success_returns_stdout() {
        let runner = SystemRunner::new();
        let cmd = CommandLine::new("sh").args(["-c", "echo hello"]);
        assert_eq!(runner.run(&cmd).unwrap().trim(), "hello");
    }
}

//! Data-versioning (DVC) and code-history (git) integration.

pub mod publish;
pub mod state;
pub mod sync;

use std::path::{Path, PathBuf};

use crate::shell::CommandLine;

/// Executables used for the versioned store and the code-history system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub dvc: String,
    pub git: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            dvc: "dvc".to_string(),
            git: "git".to_string(),
        }
    }
}

impl Toolchain {
    /// `dvc pull [path]`
    pub fn pull(&self, target: Option<&Path>) -> CommandLine {
        let cmd = CommandLine::new(&self.dvc).arg("pull");
        match target {
            Some(path) => cmd.arg(path_arg(path)),
            None => cmd,
        }
    }

    /// `dvc add <path>`
    pub fn register(&self, path: &Path) -> CommandLine {
        CommandLine::new(&self.dvc).arg("add").arg(path_arg(path))
    }

    /// `dvc push [paths..]`
    pub fn push(&self, targets: &[PathBuf]) -> CommandLine {
        CommandLine::new(&self.dvc)
            .arg("push")
            .args(targets.iter().map(|p| path_arg(p)))
    }

    /// `git add <pointer files..>`
    pub fn stage(&self, pointers: &[PathBuf]) -> CommandLine {
        CommandLine::new(&self.git)
            .arg("add")
            .args(pointers.iter().map(|p| path_arg(p)))
    }

    /// `git diff --cached --name-only -- <pointer files..>`
    pub fn staged(&self, pointers: &[PathBuf]) -> CommandLine {
        CommandLine::new(&self.git)
            .args(["diff", "--cached", "--name-only", "--"])
            .args(pointers.iter().map(|p| path_arg(p)))
    }

    /// `git commit -m <message>`
    pub fn commit(&self, message: &str) -> CommandLine {
        CommandLine::new(&self.git).args(["commit", "-m", message])
    }
}

/// Pointer file DVC writes next to a tracked output.
pub fn pointer_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".dvc");
    PathBuf::from(name)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

//! Make sure tracked inputs exist locally before anything reads them.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::{
    shell::{CommandFailure, CommandRunner},
    versioning::Toolchain,
};

#[derive(Debug, Default)]
pub struct SyncReport {
    /// Paths a pull was issued for.
    pub pulled: Vec<PathBuf>,
    /// Paths still absent after pulling.
    pub still_missing: Vec<PathBuf>,
    pub failures: Vec<CommandFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.still_missing.is_empty()
    }
}

/// Pull every missing path from the remote.
///
/// With `scoped` each missing path gets its own `dvc pull <path>`; otherwise a
/// single `dvc pull` covers the whole tracked set. Failures are logged and
/// collected, never raised: callers decide whether a still-missing path is
/// fatal for their own work.
pub fn ensure_local<R: CommandRunner>(
    runner: &R,
    tools: &Toolchain,
    required: &[PathBuf],
    scoped: bool,
) -> SyncReport {
    let mut report = SyncReport::default();
    let missing: Vec<&PathBuf> = required.iter().filter(|p| !p.exists()).collect();
    if missing.is_empty() {
        info!(paths = required.len(), "all required paths present; skipping pull");
        return report;
    }

    if scoped {
        for path in missing {
            info!(path = %path.display(), "pulling missing path");
            report.pulled.push(path.clone());
            if let Err(failure) = runner.run(&tools.pull(Some(path.as_path()))) {
                report.failures.push(failure);
            }
        }
    } else {
        info!(missing = missing.len(), "pulling tracked data");
        report.pulled.extend(missing.into_iter().cloned());
        if let Err(failure) = runner.run(&tools.pull(None)) {
            report.failures.push(failure);
        }
    }

    report.still_missing = required
        .iter()
        .filter(|p| !p.exists())
        .cloned()
        .collect();
    for path in &report.still_missing {
        warn!(path = %path.display(), "required path still missing after pull");
    }
    report
}

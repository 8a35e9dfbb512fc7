//! Git adapter used to name the checked-out branch.
//!
//! Only one question is ever asked of git, so this stays a small, explicit
//! wrapper around `git` subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Source of the current branch name for a working directory.
pub trait BranchSource {
    fn current_branch(&self, workdir: &Path) -> Result<String>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD (no branch name to add)"));
        }
        if name.is_empty() {
            return Err(anyhow!("git returned an empty branch name"));
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

/// Resolves branches by running `git` in the requested directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl BranchSource for SystemGit {
    fn current_branch(&self, workdir: &Path) -> Result<String> {
        Git::new(workdir).current_branch()
    }
}

/// A branch named up front (`--branch`), no git lookup.
#[derive(Debug, Clone)]
pub struct FixedBranch(pub String);

impl BranchSource for FixedBranch {
    fn current_branch(&self, _workdir: &Path) -> Result<String> {
        let name = self.0.trim();
        if name.is_empty() {
            return Err(anyhow!("branch override is empty"));
        }
        Ok(name.to_string())
    }
}

//! Test-only collaborators and fixtures.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::io::container::{ContainerOutput, ContainerRequest, ContainerRunner};
use crate::io::git::BranchSource;

/// Branch source with a fixed answer that counts lookups.
pub struct ScriptedBranch {
    answer: std::result::Result<String, String>,
    calls: Cell<usize>,
}

impl ScriptedBranch {
    pub fn named(name: &str) -> Self {
        Self {
            answer: Ok(name.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl BranchSource for ScriptedBranch {
    fn current_branch(&self, _workdir: &Path) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        match &self.answer {
            Ok(name) => Ok(name.clone()),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }
}

/// Container runner that records requests instead of starting containers.
///
/// The mounted releaserc (the read-only mount) is read at call time, since
/// its temp file is gone once the release returns.
pub struct RecordingRunner {
    output: ContainerOutput,
    pub requests: RefCell<Vec<ContainerRequest>>,
    pub mounted_configs: RefCell<Vec<String>>,
}

impl RecordingRunner {
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            output: ContainerOutput {
                exit_code: Some(exit_code),
                stdout: format!("semantic-release exited {exit_code}\n"),
                stderr: String::new(),
                timed_out: false,
            },
            requests: RefCell::new(Vec::new()),
            mounted_configs: RefCell::new(Vec::new()),
        }
    }

    pub fn timing_out() -> Self {
        let mut runner = Self::exiting(0);
        runner.output.exit_code = None;
        runner.output.timed_out = true;
        runner
    }

    pub fn last_request(&self) -> ContainerRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("no container request recorded")
    }
}

impl ContainerRunner for RecordingRunner {
    fn run(&self, request: &ContainerRequest) -> Result<ContainerOutput> {
        if let Some(mount) = request.mounts.iter().find(|mount| mount.read_only) {
            self.mounted_configs
                .borrow_mut()
                .push(fs::read_to_string(&mount.host)?);
        }
        self.requests.borrow_mut().push(request.clone());
        Ok(self.output.clone())
    }
}

/// Write `.releaserc.json` into `dir` and return its path.
pub fn write_releaserc_fixture(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join(".releaserc.json");
    fs::write(&path, contents).expect("write releaserc fixture");
    path
}

/// A typical GitHub release config.
pub const GITHUB_RELEASERC: &str = r#"{
  "branches": ["main", {"name": "next", "channel": "next", "prerelease": false}],
  "plugins": [
    "@semantic-release/commit-analyzer",
    "@semantic-release/release-notes-generator",
    ["@semantic-release/npm", {"npmPublish": false}],
    "@semantic-release/github"
  ],
  "tagFormat": "v${version}"
}
"#;

//! Container runner abstraction for the release tool.
//!
//! The [`ContainerRunner`] trait decouples release orchestration from the
//! container engine. Tests use recording runners that return predetermined
//! outputs without spawning processes.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::process::run_command_with_timeout;

/// A credential passed to the container. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Host path bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Parameters for one container invocation.
#[derive(Debug, Clone)]
pub struct ContainerRequest {
    pub image: String,
    /// Working directory inside the container.
    pub workdir: String,
    /// Plain environment variables, in order.
    pub env: Vec<(String, String)>,
    /// Credential variables; values travel through the child environment only.
    pub secrets: Vec<(String, Secret)>,
    pub mounts: Vec<Mount>,
    /// Command to run; the first element replaces the image entrypoint.
    pub command: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Result of a finished container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ContainerOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Abstraction over container engines.
pub trait ContainerRunner {
    fn run(&self, request: &ContainerRequest) -> Result<ContainerOutput>;
}

/// How long `<cli> kill` may take after a run timed out.
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Runner that shells out to a docker-compatible CLI.
///
/// `cli` is a command prefix such as `["docker"]` or `["sudo", "podman"]`;
/// the `run ...` arguments are appended to it. Each run gets a unique
/// container name; on timeout the container is killed by name, since killing
/// the CLI client leaves the container running.
#[derive(Debug, Clone)]
pub struct CliContainerRunner {
    cli: Vec<String>,
}

impl CliContainerRunner {
    pub fn new(cli: Vec<String>) -> Self {
        Self { cli }
    }

    fn program(&self) -> String {
        self.cli.join(" ")
    }

    fn command(&self, args: &[String]) -> Result<Command> {
        let (program, prefix) = self
            .cli
            .split_first()
            .ok_or_else(|| anyhow!("container cli is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(prefix).args(args);
        Ok(cmd)
    }

    /// Best effort: a failure is logged, the timeout is reported either way.
    fn stop_container(&self, name: &str) {
        let args = ["kill".to_string(), name.to_string()];
        let result = self
            .command(&args)
            .and_then(|cmd| run_command_with_timeout(cmd, STOP_TIMEOUT, 64 * 1024, || {}));
        match result {
            Ok(out) if out.status.success() => {
                info!(container = name, "killed timed-out release container");
            }
            Ok(out) => warn!(
                container = name,
                exit_code = ?out.status.code(),
                stderr = %out.stderr_lossy().trim(),
                "failed to kill release container"
            ),
            Err(err) => warn!(
                container = name,
                error = %format!("{err:#}"),
                "failed to kill release container"
            ),
        }
    }
}

impl ContainerRunner for CliContainerRunner {
    #[instrument(skip_all, fields(cli = %self.program(), image = %request.image))]
    fn run(&self, request: &ContainerRequest) -> Result<ContainerOutput> {
        let name = container_name();
        let args = run_args(request, &name)?;
        info!(args = %args.join(" "), "starting release container");

        let mut cmd = self.command(&args)?;
        for (key, secret) in &request.secrets {
            cmd.env(key, secret.expose());
        }

        let output = run_command_with_timeout(
            cmd,
            request.timeout,
            request.output_limit_bytes,
            || self.stop_container(&name),
        )
        .with_context(|| format!("run {} container", self.program()))?;

        if output.timed_out {
            warn!(
                timeout_secs = request.timeout.as_secs(),
                "release container timed out"
            );
        } else {
            debug!(exit_code = ?output.status.code(), "release container finished");
        }
        Ok(ContainerOutput {
            exit_code: output.status.code(),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            timed_out: output.timed_out,
        })
    }
}

fn container_name() -> String {
    format!(
        "semrel-{}-{}",
        std::process::id(),
        chrono::Utc::now().format("%Y%m%d%H%M%S%3f")
    )
}

/// Arguments for `<cli> run ...`.
///
/// Secrets are listed by name only (`--env GH_TOKEN`) so the CLI reads the
/// value from its own environment.
pub fn run_args(request: &ContainerRequest, name: &str) -> Result<Vec<String>> {
    let (entrypoint, rest) = request
        .command
        .split_first()
        .ok_or_else(|| anyhow!("container command is empty"))?;

    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        name.to_string(),
        "--workdir".to_string(),
        request.workdir.clone(),
    ];
    for (key, value) in &request.env {
        args.push("--env".to_string());
        args.push(format!("{key}={value}"));
    }
    for (key, _) in &request.secrets {
        args.push("--env".to_string());
        args.push(key.clone());
    }
    for mount in &request.mounts {
        args.push("--mount".to_string());
        args.push(mount_arg(mount));
    }
    args.push("--entrypoint".to_string());
    args.push(entrypoint.clone());
    args.push(request.image.clone());
    args.extend(rest.iter().cloned());
    Ok(args)
}

/// `--mount` value. The CLI splits it as CSV, so fields holding `,` or `"`
/// are quoted; `:` needs no escaping here, unlike `--volume`.
fn mount_arg(mount: &Mount) -> String {
    let mut fields = vec![
        "type=bind".to_string(),
        csv_field(&format!("source={}", mount.host.display())),
        csv_field(&format!("target={}", mount.target)),
    ];
    if mount.read_only {
        fields.push("readonly".to_string());
    }
    fields.join(",")
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

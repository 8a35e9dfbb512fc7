//! Orchestration for `semrel configure` and `semrel release`.
//!
//! Loads the releaserc, reconciles it with the current branch and the plugin
//! exclusions, builds the `semantic-release` command and hands everything to
//! the container runner.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::command::{build_command, render_command};
use crate::core::reconcile::{
    ReconcilePlan, git_provider_plugins, reconcile, render_release_config,
};
use crate::core::types::{Provider, ReleaseConfig, ReleaseOptions};
use crate::error::ReleaseError;
use crate::io::config::SemrelConfig;
use crate::io::container::{ContainerOutput, ContainerRequest, ContainerRunner, Mount, Secret};
use crate::io::git::BranchSource;
use crate::io::releaserc::{load_releaserc, write_releaserc, write_temp_releaserc};

/// Source tree location inside the release container.
pub const CONTAINER_WORKDIR: &str = "/src";
/// Mount point for a releaserc that lives outside the working directory.
pub const CONTAINER_RELEASERC: &str = "/src/.releaserc.json";

/// Config files semantic-release looks for, highest priority first.
const CONFIG_SEARCH_ORDER: [&str; 8] = [
    ".releaserc",
    ".releaserc.json",
    ".releaserc.yaml",
    ".releaserc.yml",
    ".releaserc.js",
    ".releaserc.cjs",
    "release.config.js",
    "release.config.cjs",
];

/// Ask the branch source for the current branch.
///
/// Any failure, or an empty answer, becomes [`ReleaseError::BranchResolution`].
pub fn resolve_current_branch<B: BranchSource + ?Sized>(
    source: &B,
    workdir: &Path,
) -> Result<String, ReleaseError> {
    let name = source
        .current_branch(workdir)
        .map_err(|source| ReleaseError::BranchResolution { source })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ReleaseError::BranchResolution {
            source: anyhow::anyhow!("branch source returned an empty name"),
        });
    }
    Ok(name.to_string())
}

/// Built-in provider plugins plus any configured extras.
pub fn excluded_plugins(extra: &[String]) -> BTreeSet<String> {
    let mut excluded = git_provider_plugins();
    excluded.extend(extra.iter().cloned());
    excluded
}

/// Reconcile an already parsed config.
///
/// The branch is resolved before anything is changed, so a lookup failure
/// leaves `config` as it was.
pub fn reconcile_config<B: BranchSource + ?Sized>(
    config: ReleaseConfig,
    workdir: &Path,
    options: &ReleaseOptions,
    branch_source: &B,
    extra_excluded: &[String],
) -> Result<ReleaseConfig, ReleaseError> {
    let current_branch = if options.add_current_branch {
        debug!("resolving current branch");
        Some(resolve_current_branch(branch_source, workdir)?)
    } else {
        None
    };
    let excluded = options
        .remove_git_provider
        .then(|| excluded_plugins(extra_excluded));

    let plan = ReconcilePlan {
        current_branch: current_branch.as_deref(),
        excluded_plugins: excluded.as_ref(),
    };
    Ok(reconcile(config, &plan))
}

/// Inputs shared by `configure` and `release`.
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    /// Repository checkout the release runs against.
    pub workdir: PathBuf,
    /// Releaserc to read.
    pub releaserc: PathBuf,
    pub options: ReleaseOptions,
}

/// Load the releaserc and reconcile it.
#[instrument(skip_all, fields(releaserc = %request.releaserc.display()))]
pub fn prepare_config<B: BranchSource + ?Sized>(
    request: &ConfigureRequest,
    settings: &SemrelConfig,
    branch_source: &B,
) -> Result<ReleaseConfig> {
    let config = load_releaserc(&request.releaserc)?;
    debug!(
        branches = config.branches.len(),
        plugins = config.plugins.len(),
        "loaded releaserc"
    );
    let config = reconcile_config(
        config,
        &request.workdir,
        &request.options,
        branch_source,
        &settings.excluded_plugins,
    )
    .context("reconcile releaserc")?;
    Ok(config)
}

/// Reconcile the releaserc and write it to `output` (in place when `None`).
///
/// Returns the path that was written.
pub fn configure<B: BranchSource + ?Sized>(
    request: &ConfigureRequest,
    settings: &SemrelConfig,
    branch_source: &B,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let config = prepare_config(request, settings, branch_source)?;
    let target = output.unwrap_or(request.releaserc.as_path());
    write_releaserc(target, &config)?;
    info!(path = %target.display(), "wrote releaserc");
    Ok(target.to_path_buf())
}

/// Result of a release container run.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    /// Arguments given to the release tool.
    pub command: Vec<String>,
    /// The config the release tool saw.
    pub config: ReleaseConfig,
    pub output: ContainerOutput,
}

/// Reconcile the releaserc and run `semantic-release` in a container.
///
/// The working-tree releaserc is left untouched: the reconciled copy is
/// mounted over it inside the container (see [`releaserc_mount_target`]).
/// A non-zero exit of the release tool
/// is reported through [`ReleaseOutcome::output`], not as an error.
#[instrument(skip_all, fields(provider = %provider))]
pub fn run_release<B: BranchSource + ?Sized, R: ContainerRunner>(
    request: &ConfigureRequest,
    provider: Provider,
    token: Secret,
    settings: &SemrelConfig,
    branch_source: &B,
    runner: &R,
) -> Result<ReleaseOutcome> {
    let config = prepare_config(request, settings, branch_source)?;
    let command = build_command(request.options.dry_run, request.options.check_if_ci);
    info!(
        command = %render_command(&command),
        dry_run = request.options.dry_run,
        check_if_ci = request.options.check_if_ci,
        "prepared release command"
    );
    info!(config = %render_release_config(&config)?, "effective releaserc");

    let workdir = fs::canonicalize(&request.workdir)
        .with_context(|| format!("resolve working directory {}", request.workdir.display()))?;
    let target = releaserc_mount_target(&workdir, &request.releaserc)?;
    let mounted = write_temp_releaserc(&config)?;

    let container_request = ContainerRequest {
        image: settings.image.clone(),
        workdir: CONTAINER_WORKDIR.to_string(),
        env: vec![
            ("BUST_CACHE".to_string(), bust_cache_stamp()),
            ("SEMREL_COMMAND".to_string(), render_command(&command)),
        ],
        secrets: vec![(provider.token_env_var().to_string(), token)],
        mounts: vec![
            Mount {
                host: workdir,
                target: CONTAINER_WORKDIR.to_string(),
                read_only: false,
            },
            Mount {
                host: mounted.path().to_path_buf(),
                target,
                read_only: true,
            },
        ],
        command: command.clone(),
        timeout: Duration::from_secs(settings.timeout_secs),
        output_limit_bytes: settings.output_limit_bytes,
    };

    let output = runner
        .run(&container_request)
        .context("run release container")?;
    info!(
        exit_code = ?output.exit_code,
        timed_out = output.timed_out,
        "release container finished"
    );
    drop(mounted);

    Ok(ReleaseOutcome {
        command,
        config,
        output,
    })
}

/// Container path the reconciled config is mounted at.
///
/// A releaserc directly in `workdir` is shadowed under its own name, so the
/// file semantic-release finds is the reconciled one. Anything else goes to
/// [`CONTAINER_RELEASERC`]. Logs a warning when a file semantic-release
/// prefers over the target already exists in `workdir`.
pub fn releaserc_mount_target(workdir: &Path, releaserc: &Path) -> Result<String> {
    let releaserc = fs::canonicalize(releaserc)
        .with_context(|| format!("resolve releaserc {}", releaserc.display()))?;
    let file_name = releaserc
        .file_name()
        .filter(|_| releaserc.parent() == Some(workdir))
        .map(|name| name.to_string_lossy().into_owned());

    let target_name = match &file_name {
        Some(name) => name.as_str(),
        None => ".releaserc.json",
    };
    let preferred = CONFIG_SEARCH_ORDER
        .iter()
        .take_while(|candidate| **candidate != target_name)
        .find(|candidate| workdir.join(candidate).exists());
    if let Some(preferred) = preferred {
        warn!(
            preferred = %preferred,
            mounted = %target_name,
            "semantic-release may load an existing config instead of the reconciled one"
        );
    }

    Ok(format!("{CONTAINER_WORKDIR}/{target_name}"))
}

/// Changes on every run so container layer caches never serve a stale release.
fn bust_cache_stamp() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Branch;
    use crate::test_support::ScriptedBranch;

    fn options(add_current_branch: bool, remove_git_provider: bool) -> ReleaseOptions {
        ReleaseOptions {
            add_current_branch,
            remove_git_provider,
            ..ReleaseOptions::default()
        }
    }

    #[test]
    fn branch_failure_is_reported_as_resolution_error() {
        let config = ReleaseConfig {
            branches: vec![Branch::new("main")],
            ..ReleaseConfig::default()
        };
        let source = ScriptedBranch::failing("fatal: not a git repository");
        let err = reconcile_config(
            config,
            Path::new("."),
            &options(true, true),
            &source,
            &[],
        )
        .unwrap_err();
        assert_eq!(source.calls(), 1);
        match err {
            ReleaseError::BranchResolution { source } => {
                assert!(source.to_string().contains("not a git repository"));
            }
            other => panic!("expected branch resolution error, got {other:?}"),
        }
    }

    #[test]
    fn empty_branch_name_is_a_resolution_error() {
        let source = ScriptedBranch::named("  \n");
        let err = resolve_current_branch(&source, Path::new(".")).unwrap_err();
        assert!(matches!(err, ReleaseError::BranchResolution { .. }));
    }

    #[test]
    fn branch_lookup_skipped_when_not_requested() {
        let source = ScriptedBranch::failing("should not be asked");
        let config = reconcile_config(
            ReleaseConfig::default(),
            Path::new("."),
            &options(false, false),
            &source,
            &[],
        )
        .expect("reconcile");
        assert_eq!(source.calls(), 0);
        assert!(config.branches.is_empty());
    }

    #[test]
    fn extra_exclusions_join_provider_plugins() {
        let excluded = excluded_plugins(&["@semantic-release/npm".to_string()]);
        assert!(excluded.contains("@semantic-release/github"));
        assert!(excluded.contains("@semantic-release/gitlab"));
        assert!(excluded.contains("@semantic-release/npm"));
    }

    #[test]
    fn mount_target_follows_releaserc_name_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workdir = fs::canonicalize(temp.path()).expect("canonicalize");
        let releaserc = workdir.join(".releaserc");
        fs::write(&releaserc, "{}").expect("write");

        let target = releaserc_mount_target(&workdir, &releaserc).expect("target");
        assert_eq!(target, "/src/.releaserc");
    }

    #[test]
    fn mount_target_defaults_outside_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workdir = temp.path().join("repo");
        fs::create_dir_all(workdir.join("ci")).expect("mkdir");
        let workdir = fs::canonicalize(workdir).expect("canonicalize");
        let nested = workdir.join("ci").join("release.json");
        fs::write(&nested, "{}").expect("write nested");
        let outside = temp.path().join("shared.json");
        fs::write(&outside, "{}").expect("write outside");

        for releaserc in [nested, outside] {
            let target = releaserc_mount_target(&workdir, &releaserc).expect("target");
            assert_eq!(target, CONTAINER_RELEASERC);
        }
    }

    #[test]
    fn mount_target_requires_existing_releaserc() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = releaserc_mount_target(temp.path(), &temp.path().join("missing.json"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("resolve releaserc"));
    }

    #[test]
    fn bust_cache_stamp_is_not_empty() {
        assert!(!bust_cache_stamp().is_empty());
    }
}

//! Configurable semantic-release runner.
//!
//! Patches `.releaserc.json` on demand (current branch, provider plugins) and
//! runs `semantic-release` in a container with a GitHub or GitLab token.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use semrel::core::command::{build_command, render_command};
use semrel::core::types::{Provider, ReleaseOptions};
use semrel::exit_codes;
use semrel::io::config::{SETTINGS_FILE, SemrelConfig, load_config};
use semrel::io::container::{CliContainerRunner, Secret};
use semrel::io::git::{BranchSource, FixedBranch, SystemGit};
use semrel::logging;
use semrel::release::{ConfigureRequest, configure, run_release};

#[derive(Parser)]
#[command(
    name = "semrel",
    version,
    about = "Configurable semantic-release runner"
)]
struct Cli {
    /// Settings file (defaults to `<dir>/.semrel.toml`).
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite the releaserc with the requested changes.
    Configure {
        #[command(flatten)]
        config: ConfigArgs,
        /// Write the result here instead of rewriting the releaserc in place.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Print the `semantic-release` command line for the given flags.
    #[command(name = "command")]
    PrintCommand {
        #[command(flatten)]
        flags: CommandFlags,
    },
    /// Reconcile the releaserc and run semantic-release in a container.
    Release {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        flags: CommandFlags,
        /// Git provider: `Github` (GH_TOKEN) or `Gitlab` (GL_TOKEN).
        #[arg(long, default_value = "Github")]
        provider: Provider,
        /// Personal access token for the provider.
        #[arg(long, env = "SEMREL_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Repository checkout the release runs against.
    #[arg(long, default_value = ".", value_name = "DIR")]
    dir: PathBuf,
    /// Releaserc to read (defaults to `<dir>/.releaserc.json`).
    #[arg(long, value_name = "PATH")]
    releaserc: Option<PathBuf>,
    /// Add the checked-out branch to `branches`.
    #[arg(long)]
    add_current_branch: bool,
    /// Branch to add instead of asking git (implies `--add-current-branch`).
    #[arg(long, value_name = "NAME")]
    branch: Option<String>,
    /// Remove @semantic-release/github and @semantic-release/gitlab from `plugins`.
    #[arg(long)]
    remove_git_provider: bool,
}

#[derive(Args, Debug, Clone, Copy, Default)]
struct CommandFlags {
    /// Publish for real (omit `--dry-run`).
    #[arg(long)]
    no_dry_run: bool,
    /// Keep semantic-release's CI detection (omit `--no-ci`).
    #[arg(long)]
    check_if_ci: bool,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            err.print().context("print usage error")?;
            return Ok(exit_codes::INVALID);
        }
        Err(err) => err.exit(),
    };
    match cli.command {
        Command::Configure { config, output } => {
            cmd_configure(cli.settings.as_deref(), &config, output.as_deref())
        }
        Command::PrintCommand { flags } => cmd_command(flags),
        Command::Release {
            config,
            flags,
            provider,
            token,
        } => cmd_release(cli.settings.as_deref(), &config, flags, provider, token),
    }
}

fn cmd_configure(
    settings: Option<&Path>,
    args: &ConfigArgs,
    output: Option<&Path>,
) -> Result<i32> {
    let settings = load_settings(settings, &args.dir)?;
    let request = configure_request(args, &settings, CommandFlags::default());
    let source = branch_source(args);
    configure(&request, &settings, &*source, output)?;
    Ok(exit_codes::OK)
}

fn cmd_command(flags: CommandFlags) -> Result<i32> {
    let cmd = build_command(!flags.no_dry_run, flags.check_if_ci);
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", render_command(&cmd)).context("write command")?;
    Ok(exit_codes::OK)
}

fn cmd_release(
    settings: Option<&Path>,
    args: &ConfigArgs,
    flags: CommandFlags,
    provider: Provider,
    token: String,
) -> Result<i32> {
    let settings = load_settings(settings, &args.dir)?;
    let request = configure_request(args, &settings, flags);
    let source = branch_source(args);
    let runner = CliContainerRunner::new(settings.container_cli.clone());
    if token.trim().is_empty() {
        warn!(provider = %provider, "empty provider token");
    }

    let outcome = run_release(
        &request,
        provider,
        Secret::new(token),
        &settings,
        &*source,
        &runner,
    )?;

    print!("{}", outcome.output.stdout);
    eprint!("{}", outcome.output.stderr);
    if outcome.output.timed_out {
        eprintln!("semantic-release timed out after {}s", settings.timeout_secs);
        return Ok(exit_codes::TIMED_OUT);
    }
    if !outcome.output.success() {
        eprintln!(
            "semantic-release failed with status {:?}",
            outcome.output.exit_code
        );
        return Ok(exit_codes::RELEASE_FAILED);
    }
    Ok(exit_codes::OK)
}

fn load_settings(explicit: Option<&Path>, dir: &Path) -> Result<SemrelConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => dir.join(SETTINGS_FILE),
    };
    load_config(&path)
}

fn configure_request(
    args: &ConfigArgs,
    settings: &SemrelConfig,
    flags: CommandFlags,
) -> ConfigureRequest {
    let releaserc = args
        .releaserc
        .clone()
        .unwrap_or_else(|| args.dir.join(&settings.releaserc));
    ConfigureRequest {
        workdir: args.dir.clone(),
        releaserc,
        options: ReleaseOptions {
            add_current_branch: args.add_current_branch || args.branch.is_some(),
            remove_git_provider: args.remove_git_provider,
            dry_run: !flags.no_dry_run,
            check_if_ci: flags.check_if_ci,
        },
    }
}

fn branch_source(args: &ConfigArgs) -> Box<dyn BranchSource> {
    match &args.branch {
        Some(name) => Box::new(FixedBranch(name.clone())),
        None => Box::new(SystemGit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_defaults_to_local_dry_run() {
        let cli = Cli::parse_from(["semrel", "command"]);
        let Command::PrintCommand { flags } = cli.command else {
            panic!("expected command subcommand");
        };
        assert!(!flags.no_dry_run);
        assert!(!flags.check_if_ci);
    }

    #[test]
    fn parse_release_provider_is_case_sensitive() {
        let cli = Cli::parse_from([
            "semrel",
            "release",
            "--provider",
            "Gitlab",
            "--token",
            "t",
        ]);
        let Command::Release { provider, .. } = cli.command else {
            panic!("expected release subcommand");
        };
        assert_eq!(provider, Provider::Gitlab);

        let err = Cli::try_parse_from([
            "semrel",
            "release",
            "--provider",
            "gitlab",
            "--token",
            "t",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn branch_override_implies_add_current_branch() {
        let cli = Cli::parse_from(["semrel", "configure", "--branch", "feature/x"]);
        let Command::Configure { config, .. } = cli.command else {
            panic!("expected configure subcommand");
        };
        let request = configure_request(
            &config,
            &SemrelConfig::default(),
            CommandFlags::default(),
        );
        assert!(request.options.add_current_branch);
        assert_eq!(request.releaserc, PathBuf::from("./.releaserc.json"));
    }

    #[test]
    fn release_flags_map_to_options() {
        let cli = Cli::parse_from([
            "semrel",
            "release",
            "--token",
            "t",
            "--no-dry-run",
            "--check-if-ci",
            "--remove-git-provider",
        ]);
        let Command::Release { config, flags, .. } = cli.command else {
            panic!("expected release subcommand");
        };
        let request = configure_request(&config, &SemrelConfig::default(), flags);
        assert!(!request.options.dry_run);
        assert!(request.options.check_if_ci);
        assert!(request.options.remove_git_provider);
        assert!(!request.options.add_current_branch);
    }
}

//! Argument list for the release tool.

use tracing::debug;

/// Base invocation token.
pub const RELEASE_TOOL: &str = "semantic-release";

/// Build the ordered argument list for `semantic-release`.
///
/// `check_if_ci` has inverted polarity: `--no-ci` is emitted when the tool's
/// CI detection should be skipped.
pub fn build_command(dry_run: bool, check_if_ci: bool) -> Vec<String> {
    let mut cmd = vec![RELEASE_TOOL.to_string()];
    if dry_run {
        cmd.push("--dry-run".to_string());
    }
    if !check_if_ci {
        cmd.push("--no-ci".to_string());
    }
    debug!(command = %render_command(&cmd), "built release command");
    cmd
}

/// Space-joined form, exported to the container as `SEMREL_COMMAND`.
pub fn render_command(cmd: &[String]) -> String {
    cmd.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_dry_run() {
        assert_eq!(
            build_command(true, false),
            vec!["semantic-release", "--dry-run", "--no-ci"]
        );
    }

    #[test]
    fn ci_release() {
        assert_eq!(build_command(false, true), vec!["semantic-release"]);
    }

    #[test]
    fn local_release() {
        assert_eq!(
            build_command(false, false),
            vec!["semantic-release", "--no-ci"]
        );
    }

    #[test]
    fn ci_dry_run() {
        assert_eq!(
            build_command(true, true),
            vec!["semantic-release", "--dry-run"]
        );
    }

    #[test]
    fn rendered_command_is_space_joined() {
        assert_eq!(
            render_command(&build_command(true, false)),
            "semantic-release --dry-run --no-ci"
        );
    }
}

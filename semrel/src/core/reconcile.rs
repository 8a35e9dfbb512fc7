//! Release-configuration reconciliation.
//!
//! Decides the final `branches` and `plugins` lists before the config is
//! written back. Everything here is pure; branch lookup happens in the
//! caller, which passes the resolved name in.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::core::types::{Branch, PluginEntry, ReleaseConfig};
use crate::error::{ReleaseError, Result};

/// Publishing plugins that need a GitHub/GitLab token.
pub const GIT_PROVIDER_PLUGINS: [&str; 2] =
    ["@semantic-release/github", "@semantic-release/gitlab"];

/// The default exclusion set used by `--remove-git-provider`.
pub fn git_provider_plugins() -> BTreeSet<String> {
    GIT_PROVIDER_PLUGINS.iter().map(|name| name.to_string()).collect()
}

/// Parse releaserc text.
pub fn parse_release_config(raw: &str) -> Result<ReleaseConfig> {
    serde_json::from_str(raw).map_err(|source| ReleaseError::ConfigParse { source })
}

/// Serialize to pretty-printed JSON with trailing newline.
pub fn render_release_config(config: &ReleaseConfig) -> Result<String> {
    let mut payload = serde_json::to_string_pretty(config)
        .map_err(|source| ReleaseError::Serialization { source })?;
    payload.push('\n');
    Ok(payload)
}

/// Return `branches` with `current` appended unless a branch of that exact
/// name is already listed.
pub fn ensure_current_branch(branches: &[Branch], current: &str) -> Vec<Branch> {
    for branch in branches {
        info!(branch = %branch.name, "branch found in config");
    }

    if branches.iter().any(|branch| branch.name == current) {
        info!(branch = %current, "current branch already in config");
        return branches.to_vec();
    }

    info!(branch = %current, "adding current branch to config");
    let mut updated = Vec::with_capacity(branches.len() + 1);
    updated.extend_from_slice(branches);
    updated.push(Branch::new(current));
    updated
}

/// Return every plugin whose name is not in `excluded`, in original order.
pub fn filter_plugins(plugins: &[PluginEntry], excluded: &BTreeSet<String>) -> Vec<PluginEntry> {
    plugins
        .iter()
        .filter(|plugin| {
            let drop = excluded.contains(plugin.name());
            if drop {
                info!(plugin = plugin.name(), "removing plugin from config");
            }
            !drop
        })
        .cloned()
        .collect()
}

/// Inputs already resolved by the caller.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan<'a> {
    /// Branch to ensure is listed; `None` leaves `branches` alone.
    pub current_branch: Option<&'a str>,
    /// Plugins to strip; `None` leaves `plugins` alone.
    pub excluded_plugins: Option<&'a BTreeSet<String>>,
}

/// Apply a plan to a parsed config.
pub fn reconcile(mut config: ReleaseConfig, plan: &ReconcilePlan<'_>) -> ReleaseConfig {
    if let Some(current) = plan.current_branch {
        config.branches = ensure_current_branch(&config.branches, current);
    }
    if let Some(excluded) = plan.excluded_plugins {
        let before = config.plugins.len();
        config.plugins = filter_plugins(&config.plugins, excluded);
        debug!(
            removed = before - config.plugins.len(),
            remaining = config.plugins.len(),
            "filtered plugins"
        );
    }
    config
}

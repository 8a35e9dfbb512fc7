//! Wrapper settings stored in `.semrel.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// Default settings file name, looked up inside the working directory.
pub const SETTINGS_FILE: &str = ".semrel.toml";

/// semantic-release image, pinned by digest.
pub const SEMREL_IMAGE: &str = "hoppr/semantic-release@sha256:64cb33458281ab15a9249747c74d498b54d2ea125047c4fd1f24b3f04b28bf00";

/// Wrapper settings (TOML).
///
/// Missing fields default to the values the wrapper ships with, so an absent
/// or empty file is valid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SemrelConfig {
    /// Image that provides `semantic-release`.
    pub image: String,

    /// Container CLI used to start the image (e.g. `["docker"]`, `["sudo","podman"]`).
    pub container_cli: Vec<String>,

    /// Releaserc path, relative to the working directory.
    pub releaserc: String,

    /// Wall-clock budget for the release container in seconds.
    pub timeout_secs: u64,

    /// Truncate captured container stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Extra plugin names removed by `--remove-git-provider`.
    pub excluded_plugins: Vec<String>,
}

impl Default for SemrelConfig {
    fn default() -> Self {
        Self {
            image: SEMREL_IMAGE.to_string(),
            container_cli: vec!["docker".to_string()],
            releaserc: ".releaserc.json".to_string(),
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
            excluded_plugins: Vec::new(),
        }
    }
}

impl SemrelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(anyhow!("image must be non-empty"));
        }
        if self.container_cli.is_empty() || self.container_cli[0].trim().is_empty() {
            return Err(anyhow!("container_cli must be a non-empty array"));
        }
        if self.releaserc.trim().is_empty() {
            return Err(anyhow!("releaserc must be non-empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `SemrelConfig::default()`.
pub fn load_config(path: &Path) -> Result<SemrelConfig> {
    if !path.exists() {
        let cfg = SemrelConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SemrelConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid settings {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, SemrelConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            "container_cli = [\"podman\"]\nexcluded_plugins = [\"@semantic-release/npm\"]\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.container_cli, vec!["podman"]);
        assert_eq!(cfg.excluded_plugins, vec!["@semantic-release/npm"]);
        assert_eq!(cfg.image, SEMREL_IMAGE);
        assert_eq!(cfg.timeout_secs, 1800);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(&path, "timeout_secs = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("timeout_secs must be > 0"));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(&path, "image = [").expect("write");
        assert!(load_config(&path).is_err());
    }
}

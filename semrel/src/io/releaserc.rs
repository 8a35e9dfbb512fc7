//! Releaserc load/save helpers.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::core::reconcile::{parse_release_config, render_release_config};
use crate::core::types::ReleaseConfig;

/// Read and parse a releaserc file.
pub fn load_releaserc(path: &Path) -> Result<ReleaseConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read releaserc {}", path.display()))?;
    let config = parse_release_config(&contents)
        .with_context(|| format!("parse releaserc {}", path.display()))?;
    Ok(config)
}

/// Atomically write the config to `path` (temp file + rename).
///
/// An existing file keeps its permissions; a new file gets the usual
/// `0644` instead of the temp file's private mode.
pub fn write_releaserc(path: &Path, config: &ReleaseConfig) -> Result<()> {
    let payload = render_release_config(config)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp releaserc in {}", parent.display()))?;
    tmp.write_all(payload.as_bytes())
        .context("write temp releaserc")?;
    let permissions = match fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(_) => new_file_permissions(tmp.as_file())?,
    };
    tmp.as_file()
        .set_permissions(permissions)
        .with_context(|| format!("set permissions for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replace releaserc {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions(_file: &fs::File) -> Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions(file: &fs::File) -> Result<fs::Permissions> {
    Ok(file.metadata().context("stat temp releaserc")?.permissions())
}

/// Write the config to a fresh temp file, removed when the handle drops.
///
/// Used to mount the reconciled config into the release container without
/// touching the file in the working tree.
pub fn write_temp_releaserc(config: &ReleaseConfig) -> Result<NamedTempFile> {
    let payload = render_release_config(config)?;
    let mut tmp = tempfile::Builder::new()
        .prefix("semrel-")
        .suffix(".releaserc.json")
        .tempfile()
        .context("create temp releaserc")?;
    tmp.write_all(payload.as_bytes())
        .context("write temp releaserc")?;
    tmp.flush().context("flush temp releaserc")?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Branch;
    use serde_json::{Value, json};

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".releaserc.json");
        fs::write(
            &path,
            r#"{"branches": ["main"], "plugins": ["@semantic-release/npm"], "dryRun": false}"#,
        )
        .expect("write");

        let mut config = load_releaserc(&path).expect("load");
        config.branches.push(Branch::new("feature/x"));
        write_releaserc(&path, &config).expect("write releaserc");

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(
            written,
            json!({
                "branches": ["main", {"name": "feature/x"}],
                "plugins": ["@semantic-release/npm"],
                "dryRun": false
            })
        );
        let leftovers = fs::read_dir(temp.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let shared = temp.path().join(".releaserc.json");
        fs::write(&shared, r#"{"branches": ["main"]}"#).expect("write");
        fs::set_permissions(&shared, fs::Permissions::from_mode(0o664)).expect("chmod");

        let config = load_releaserc(&shared).expect("load");
        write_releaserc(&shared, &config).expect("rewrite");
        let mode = fs::metadata(&shared).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode, 0o664);

        let fresh = temp.path().join("out").join("releaserc.json");
        write_releaserc(&fresh, &config).expect("write new");
        let mode = fs::metadata(&fresh).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn load_reports_path_on_parse_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".releaserc.json");
        fs::write(&path, r#"{"plugins": [true]}"#).expect("write");
        let err = load_releaserc(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("parse releaserc"), "{message}");
        assert!(message.contains("plugin entry"), "{message}");
    }

    #[test]
    fn load_missing_file_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_releaserc(&temp.path().join("absent.json")).unwrap_err();
        assert!(format!("{err:#}").contains("read releaserc"));
    }

    #[test]
    fn temp_releaserc_holds_rendered_config() {
        let config = ReleaseConfig {
            branches: vec![Branch::new("main")],
            ..ReleaseConfig::default()
        };
        let tmp = write_temp_releaserc(&config).expect("temp");
        let written: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path()).expect("read")).expect("json");
        assert_eq!(written, json!({"branches": [{"name": "main"}], "plugins": []}));
    }
}

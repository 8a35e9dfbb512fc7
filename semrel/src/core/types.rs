//! Shared deterministic types for the release configuration.
//!
//! These types mirror the `.releaserc.json` document consumed by
//! semantic-release. Keys the reconciler does not touch are carried through
//! verbatim so a parse → render cycle only changes what was reconciled.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReleaseError;

/// Top-level release configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Release branches, in the order semantic-release matches them.
    #[serde(default)]
    pub branches: Vec<Branch>,
    /// Plugin pipeline, in execution order.
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
    /// Every other top-level key (`tagFormat`, `repositoryUrl`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A release branch.
///
/// semantic-release accepts either a bare branch name or an object. Both
/// shapes round-trip: a branch parsed from `"main"` is written back as
/// `"main"` as long as nothing was added to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub name: String,
    /// `None` when the key was absent (treated as `false`).
    pub prerelease: Option<Prerelease>,
    /// `None` when the key was absent (treated as empty).
    pub channel: Option<Channel>,
    /// Remaining branch keys, e.g. `range`.
    pub extra: Map<String, Value>,
    shorthand: bool,
}

impl Branch {
    /// Branch with default fields: not a prerelease, default channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prerelease: None,
            channel: None,
            extra: Map::new(),
            shorthand: false,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        match &self.prerelease {
            None | Some(Prerelease::Flag(false)) => false,
            Some(Prerelease::Flag(true)) | Some(Prerelease::Identifier(_)) => true,
        }
    }

    /// Distribution channel name; empty for the default channel or `false`.
    pub fn channel(&self) -> &str {
        match &self.channel {
            Some(Channel::Name(name)) => name,
            None | Some(Channel::Flag(_)) => "",
        }
    }

    fn is_plain(&self) -> bool {
        self.prerelease.is_none() && self.channel.is_none() && self.extra.is_empty()
    }
}

/// `prerelease` is either a flag or a prerelease identifier such as `"beta"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prerelease {
    Flag(bool),
    Identifier(String),
}

/// `channel` is a channel name, or `false` to publish without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Channel {
    Name(String),
    Flag(bool),
}

#[derive(Serialize)]
struct BranchObjectRef<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prerelease: Option<&'a Prerelease>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a Channel>,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl<'de> Deserialize<'de> for Branch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let branch = match value {
            Value::String(name) => Branch {
                shorthand: true,
                ..Branch::new(name)
            },
            Value::Object(mut object) => {
                let name = match object.remove("name") {
                    Some(Value::String(name)) => name,
                    Some(other) => {
                        return Err(de::Error::custom(format!(
                            "branch name must be a string, got {}",
                            json_kind(&other)
                        )));
                    }
                    None => return Err(de::Error::custom("branch object is missing `name`")),
                };
                let prerelease = take_branch_field::<_, D::Error>(&mut object, "prerelease")?;
                let channel = take_branch_field::<_, D::Error>(&mut object, "channel")?;
                Branch {
                    name,
                    prerelease,
                    channel,
                    extra: object,
                    shorthand: false,
                }
            }
            other => {
                return Err(de::Error::custom(format!(
                    "branch entry must be a string or an object, got {}",
                    json_kind(&other)
                )));
            }
        };
        if branch.name.is_empty() {
            return Err(de::Error::custom("branch name must not be empty"));
        }
        Ok(branch)
    }
}

/// Move a modelled key out of `object`. A `null` value stays in `object` so
/// it is written back unchanged.
fn take_branch_field<T, E>(object: &mut Map<String, Value>, key: &str) -> Result<Option<T>, E>
where
    T: de::DeserializeOwned,
    E: de::Error,
{
    match object.remove(key) {
        None => Ok(None),
        Some(Value::Null) => {
            object.insert(key.to_string(), Value::Null);
            Ok(None)
        }
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| E::custom(format!("branch `{key}`: {err}"))),
    }
}

impl Serialize for Branch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.shorthand && self.is_plain() {
            return serializer.serialize_str(&self.name);
        }
        BranchObjectRef {
            name: &self.name,
            prerelease: self.prerelease.as_ref(),
            channel: self.channel.as_ref(),
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

/// One step of the release pipeline.
///
/// Written either as `"name"` or as `["name", { ...options }]`.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginEntry {
    Bare(String),
    Configured {
        name: String,
        options: Map<String, Value>,
    },
}

impl PluginEntry {
    pub fn name(&self) -> &str {
        match self {
            PluginEntry::Bare(name) => name,
            PluginEntry::Configured { name, .. } => name,
        }
    }
}

impl<'de> Deserialize<'de> for PluginEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(name) => Ok(PluginEntry::Bare(name)),
            Value::Array(items) => {
                let mut items = items.into_iter();
                match (items.next(), items.next(), items.next()) {
                    (Some(Value::String(name)), Some(Value::Object(options)), None) => {
                        Ok(PluginEntry::Configured { name, options })
                    }
                    _ => Err(de::Error::custom(
                        "plugin entry array must be exactly [name, options]",
                    )),
                }
            }
            other => Err(de::Error::custom(format!(
                "plugin entry must be a string or a [name, options] pair, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl Serialize for PluginEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PluginEntry::Bare(name) => serializer.serialize_str(name),
            PluginEntry::Configured { name, options } => (name, options).serialize(serializer),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Git hosting provider; selects which token variable semantic-release reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Github,
    Gitlab,
}

impl Provider {
    /// Environment variable the release tool reads the token from.
    pub fn token_env_var(self) -> &'static str {
        match self {
            Provider::Github => "GH_TOKEN",
            Provider::Gitlab => "GL_TOKEN",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Github => "Github",
            Provider::Gitlab => "Gitlab",
        }
    }
}

impl FromStr for Provider {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Github" => Ok(Provider::Github),
            "Gitlab" => Ok(Provider::Gitlab),
            other => Err(ReleaseError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Toggles accepted by the configure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Append the checked-out branch to `branches` when missing.
    pub add_current_branch: bool,
    /// Drop the GitHub/GitLab publishing plugins (no token available).
    pub remove_git_provider: bool,
    /// Pass `--dry-run` to the release tool.
    pub dry_run: bool,
    /// Keep the release tool's CI detection (omit `--no-ci`).
    pub check_if_ci: bool,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            add_current_branch: false,
            remove_git_provider: false,
            dry_run: true,
            check_if_ci: false,
        }
    }
}

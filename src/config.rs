//! Configuration document types describing teams and their upstream sources.
//!
//! The types in this module mirror the structure of the YAML document consumed
//! by the CLI. Each team lists the forge organisations, scraped project groups
//! and self-hosted forge organisations whose repositories it owns. The forge
//! token is deliberately absent: it is supplied through the environment and
//! injected into the forge client only.

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf}
};

use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

/// File name looked up in each default configuration directory.
pub const CONFIG_FILE_NAME: &str = "releasegen.yaml";

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use releasegen::Config;
///
/// let yaml = r#"
/// teams:
///   - name: Platform
///     github:
///       - org: example
///         teams: [platform]
/// "#;
/// let config: Config = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(config.teams.len(), 1);
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Teams to report on, in output order.
    #[serde(default)]
    pub teams: Vec<TeamConfig>
}

/// A real-life team and the sources its repositories live in.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct TeamConfig {
    /// Display name of the team.
    pub name: String,

    /// Forge organisations, scoped to team slugs.
    #[serde(default, alias = "forge")]
    pub github: Vec<ForgeOrgConfig>,

    /// Project groups on the scraped VCS host.
    #[serde(default, alias = "scraped")]
    pub launchpad: Option<ScrapedGroupConfig>,

    /// Organisations on self-hosted forges.
    #[serde(default, alias = "self-hosted")]
    pub gitea: Vec<SelfHostedOrgConfig>
}

/// Forge organisation entry.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ForgeOrgConfig {
    /// Organisation that owns the repositories.
    pub org: String,

    /// Team slugs whose repositories are reported, in lookup order.
    #[serde(default)]
    pub teams: Vec<String>,

    /// Repository names excluded from the report.
    #[serde(default, alias = "ignored-repos")]
    pub ignores: Vec<String>
}

/// Scraped VCS entry listing project groups.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ScrapedGroupConfig {
    /// Project groups whose Git projects are reported.
    #[serde(default, rename = "project-groups", alias = "project_groups")]
    pub project_groups: Vec<String>,

    /// Project names excluded from the report.
    #[serde(default, alias = "ignored-repos")]
    pub ignores: Vec<String>
}

/// Self-hosted forge organisation entry.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct SelfHostedOrgConfig {
    /// Organisation (or user) that owns the repositories.
    pub org: String,

    /// Web root of the forge, for example `https://opendev.org`.
    pub url: String,

    /// Explicit repositories to report. When non-empty, discovery is skipped.
    #[serde(default)]
    pub includes: BTreeMap<String, IncludeConfig>,

    /// Repository names excluded from the report.
    #[serde(default, alias = "ignored-repos")]
    pub ignores: Vec<String>
}

/// Per-repository options for an explicitly included repository.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct IncludeConfig {
    /// Folders whose immediate children are reported as separate repositories.
    #[serde(default, rename = "monorepo-folders", alias = "monorepo_folders")]
    pub monorepo_folders: Vec<String>
}

impl Config {
    /// Checks the invariants the report builder relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violation found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.teams.is_empty() {
            return Err(Error::validation("configuration must include at least one team"));
        }

        for team in &self.teams {
            if team.name.trim().is_empty() {
                return Err(Error::validation("team names cannot be empty strings"));
            }

            for org in &team.github {
                if org.org.trim().is_empty() {
                    return Err(Error::validation(format!(
                        "team '{}' has a github entry without an org",
                        team.name
                    )));
                }
                if org.teams.is_empty() {
                    return Err(Error::validation(format!(
                        "github org '{}' in team '{}' must list at least one team slug",
                        org.org, team.name
                    )));
                }
            }

            for org in &team.gitea {
                if org.org.trim().is_empty() {
                    return Err(Error::validation(format!(
                        "team '{}' has a gitea entry without an org",
                        team.name
                    )));
                }
                let parsed = url::Url::parse(&org.url).map_err(|error| {
                    Error::validation(format!("gitea org '{}' has an invalid url: {error}", org.org))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(Error::validation(format!(
                        "gitea org '{}' url must use http or https",
                        org.org
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Loads and validates the configuration at `path`.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the document fails validation.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    let contents = fs::read_to_string(path).map_err(|source| error::io_error(path, source))?;
    parse_config(&contents)
}

/// Parses and validates a configuration document.
///
/// # Errors
///
/// Propagates [`Error::Parse`] when the YAML cannot be decoded and
/// [`Error::Validation`] when invariants are violated.
pub fn parse_config(contents: &str) -> Result<Config, Error> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Resolves which configuration file to load.
///
/// An explicit path wins. Otherwise `./releasegen.yaml`,
/// `$HOME/.config/releasegen.yaml` and `/etc/releasegen/releasegen.yaml` are
/// tried in order.
///
/// # Errors
///
/// Returns [`Error::Validation`] when no candidate exists.
pub fn locate_config(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let home = env::var_os("HOME").map(PathBuf::from);
    let candidates = default_locations(home.as_deref());

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            Error::validation("no config file found, see 'releasegen --help' for details")
        })
}

fn default_locations(home: Option<&Path>) -> Vec<PathBuf> {
    let mut locations = Vec::with_capacity(3);
    locations.push(PathBuf::from(CONFIG_FILE_NAME));
    if let Some(home) = home {
        locations.push(home.join(".config").join(CONFIG_FILE_NAME));
    }
    locations.push(Path::new("/etc/releasegen").join(CONFIG_FILE_NAME));
    locations
}

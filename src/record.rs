// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Backend-agnostic report entities.
//!
//! Every adapter normalizes its upstream payloads into these types. Field
//! order here is the field order of the emitted JSON.

use serde::Serialize;

/// Normalized repository entry in a team report.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    /// Repository name, unique within one team report.
    pub name:                           String,
    /// Web URL of the repository or monorepo sub-folder.
    pub url:                            String,
    /// Default branch, empty when it could not be discovered.
    pub default_branch:                 String,
    /// Commits on the default branch since the latest release.
    pub new_commits_since_last_release: u64,
    /// Releases, newest first.
    pub releases:                       Vec<Release>,
    /// Latest commits, only populated when there are no releases.
    pub commits:                        Vec<Commit>,
    /// CI workflow URLs found in the README.
    pub ci_actions:                     Vec<String>,
    /// Charm linked from the README.
    pub charm:                          Option<Artifact>,
    /// Snap linked from the README.
    pub snap:                           Option<Artifact>
}

impl RepositoryRecord {
    /// Creates an empty record for the named repository.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Whether the repository has any release or commit activity to report.
    pub fn is_active(&self) -> bool {
        !self.releases.is_empty() || !self.commits.is_empty()
    }

    /// Timestamp of the most recent release.
    pub fn latest_release_timestamp(&self) -> Option<i64> {
        self.releases.first().map(|release| release.timestamp)
    }
}

/// A published release or tag.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Backend identifier, or the tag timestamp where none exists.
    pub id:          i64,
    /// Tag name.
    pub version:     String,
    /// Publish or tag time in unix seconds.
    pub timestamp:   i64,
    pub title:       String,
    /// Release notes rendered as HTML.
    pub body:        String,
    pub url:         String,
    /// Diff between this release and the default branch.
    pub compare_url: String
}

/// Fallback activity entry for repositories without releases.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Commit {
    pub sha:       String,
    /// Author name, empty when the backend omits it.
    pub author:    String,
    pub timestamp: i64,
    /// Commit message rendered as HTML.
    pub message:   String,
    pub url:       String
}

/// A snap or charm resolved from the package store.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Artifact {
    pub name:     String,
    /// Store page of the artifact.
    pub url:      String,
    pub releases: Vec<ArtifactRelease>,
    /// Distinct channels across `releases`, in first-seen order.
    pub channels: Vec<String>,
    /// Distinct tracks across `releases`, in first-seen order.
    pub tracks:   Vec<String>
}

impl Artifact {
    /// Builds an artifact, deriving `channels` and `tracks` from `releases`.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        releases: Vec<ArtifactRelease>
    ) -> Self {
        let mut channels: Vec<String> = Vec::new();
        let mut tracks: Vec<String> = Vec::new();

        for release in &releases {
            if !tracks.contains(&release.track) {
                tracks.push(release.track.clone());
            }
            if !channels.contains(&release.channel) {
                channels.push(release.channel.clone());
            }
        }

        Self {
            name: name.into(),
            url: url.into(),
            releases,
            channels,
            tracks
        }
    }
}

/// Revision live on one track/channel pair.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ArtifactRelease {
    pub track:     String,
    pub channel:   String,
    pub revision:  i64,
    pub timestamp: i64
}

/// Repositories owned by one team.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TeamReport {
    /// Team name from the configuration.
    pub name:  String,
    /// Repositories, most recently released first.
    pub repos: Vec<RepositoryRecord>
}

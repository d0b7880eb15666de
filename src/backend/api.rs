// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! REST payloads shared by the forge and self-hosted forge adapters.
//!
//! Both APIs use the same field names for repositories, releases, commits and
//! comparisons. Fields only one of them sends are optional.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::RELEASES_PER_REPO;
use crate::{
    markdown,
    record::{Commit, Release}
};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRepository {
    pub name:           String,
    #[serde(default)]
    pub private:        bool,
    #[serde(default)]
    pub archived:       bool,
    #[serde(default)]
    pub html_url:       String,
    #[serde(default)]
    pub default_branch: String
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRelease {
    pub id:           i64,
    pub tag_name:     String,
    #[serde(default)]
    pub name:         Option<String>,
    #[serde(default)]
    pub body:         Option<String>,
    #[serde(default)]
    pub html_url:     String,
    #[serde(default)]
    pub draft:        bool,
    #[serde(default)]
    pub prerelease:   bool,
    #[serde(default)]
    pub created_at:   Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>
}

impl ApiRelease {
    /// Publish time, falling back to creation time.
    fn timestamp(&self) -> i64 {
        self.published_at
            .or(self.created_at)
            .map_or(0, |time| time.timestamp())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiComparison {
    #[serde(default)]
    pub total_commits: u64
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommit {
    pub sha:      String,
    #[serde(default)]
    pub html_url: String,
    pub commit:   ApiCommitDetail,
    /// Forge account linked to the commit, absent for unknown authors.
    #[serde(default)]
    pub author:   Option<ApiUser>,
    /// Commit time as reported by the self-hosted forge.
    #[serde(default)]
    pub created:  Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author:  Option<ApiSignature>
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiSignature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    #[serde(default)]
    pub full_name: Option<String>
}

/// Whose name is reported as a commit's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthorSource {
    /// Name recorded in the git signature.
    Signature,
    /// Full name of the linked forge account, empty when there is none.
    Account
}

impl ApiCommit {
    pub fn into_commit(self, author_source: AuthorSource) -> Commit {
        let signature_time = self.commit.author.as_ref().and_then(|author| author.date);
        let author = match author_source {
            AuthorSource::Signature => self
                .commit
                .author
                .map(|author| author.name)
                .unwrap_or_default(),
            AuthorSource::Account => self
                .author
                .and_then(|user| user.full_name)
                .unwrap_or_default()
        };

        Commit {
            sha: self.sha,
            author,
            timestamp: signature_time
                .or(self.created)
                .map_or(0, |time| time.timestamp()),
            message: markdown::render(&self.commit.message),
            url: self.html_url
        }
    }
}

/// Keeps published releases, newest first as returned, capped per repository.
pub(crate) fn published(releases: Vec<ApiRelease>) -> Vec<ApiRelease> {
    releases
        .into_iter()
        .filter(|release| !release.draft && !release.prerelease)
        .take(RELEASES_PER_REPO)
        .collect()
}

/// Normalizes a release, linking its diff against the default branch.
pub(crate) fn into_release(release: ApiRelease, compare_base: &str, branch: &str) -> Release {
    let timestamp = release.timestamp();
    Release {
        id: release.id,
        compare_url: format!("{compare_base}/compare/{}...{branch}", release.tag_name),
        title: release.name.unwrap_or_default(),
        body: markdown::render(release.body.as_deref().unwrap_or_default()),
        url: release.html_url,
        version: release.tag_name,
        timestamp
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ApiCommit, ApiRelease, AuthorSource, into_release, published};

    fn release(id: i64, draft: bool, prerelease: bool) -> ApiRelease {
        serde_json::from_value(json!({
            "id": id,
            "tag_name": format!("v{id}"),
            "draft": draft,
            "prerelease": prerelease,
            "published_at": "1970-01-01T00:16:40Z"
        }))
        .expect("release payload")
    }

    #[test]
    fn drafts_and_prereleases_are_excluded_and_capped() {
        let releases = vec![
            release(1, true, false),
            release(2, false, true),
            release(3, false, false),
            release(4, false, false),
            release(5, false, false),
            release(6, false, false),
        ];
        let ids: Vec<i64> = published(releases).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn release_links_compare_against_default_branch() {
        let normalized = into_release(release(7, false, false), "https://forge.test/o/r", "main");
        assert_eq!(normalized.version, "v7");
        assert_eq!(normalized.timestamp, 1000);
        assert_eq!(normalized.compare_url, "https://forge.test/o/r/compare/v7...main");
        assert_eq!(normalized.title, "");
    }

    #[test]
    fn account_author_is_empty_without_linked_user() {
        let commit: ApiCommit = serde_json::from_value(json!({
            "sha": "abc",
            "html_url": "https://forge.test/o/r/commit/abc",
            "commit": {"message": "Fix", "author": {"name": "Dev", "date": "1970-01-01T00:00:10Z"}},
            "author": null
        }))
        .expect("commit payload");

        let normalized = commit.clone().into_commit(AuthorSource::Account);
        assert_eq!(normalized.author, "");
        assert_eq!(normalized.timestamp, 10);

        let normalized = commit.into_commit(AuthorSource::Signature);
        assert_eq!(normalized.author, "Dev");
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Backend adapters that enumerate repositories and normalize their activity.
//!
//! Every adapter implements [`Backend`]. The aggregator only ever sees
//! [`RepoRef`] values and finished [`RepositoryRecord`]s, never the
//! backend-specific payloads.

mod api;
pub mod cgit;
pub mod forge;
pub mod scraped;
pub mod selfhosted;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

pub use self::{forge::ForgeBackend, scraped::ScrapedBackend, selfhosted::SelfHostedBackend};
use crate::{
    artifact::{ArtifactKind, ArtifactResolver},
    error::Error,
    readme::ReadmeAnalyzer,
    record::RepositoryRecord
};

/// Number of releases (or fallback commits) reported per repository.
pub const RELEASES_PER_REPO: usize = 3;

/// A repository discovered by a backend, not yet processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Reported name. For a monorepo sub-folder this is the child folder name.
    pub name:           String,
    /// Organisation, user or project group owning the repository.
    pub owner:          String,
    /// Upstream repository holding the data. Differs from `name` for
    /// monorepo sub-folders.
    pub repository:     String,
    /// Path of the sub-folder inside `repository`, for monorepo entries.
    pub folder:         Option<String>,
    /// Web URL reported for this entry.
    pub url:            String,
    /// Web URL of `repository`.
    pub repository_url: String,
    /// Default branch when known at discovery time.
    pub default_branch: String
}

impl RepoRef {
    /// Reference to a plain, non-monorepo repository.
    pub fn plain(
        owner: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        default_branch: impl Into<String>
    ) -> Self {
        let name = name.into();
        let url = url.into();
        Self {
            repository: name.clone(),
            repository_url: url.clone(),
            name,
            owner: owner.into(),
            folder: None,
            url,
            default_branch: default_branch.into()
        }
    }

    /// Empty record carrying this reference's identity.
    pub fn record(&self) -> RepositoryRecord {
        let mut record = RepositoryRecord::new(&self.name, &self.url);
        record.default_branch = self.default_branch.clone();
        record
    }
}

/// A source of repositories: one forge organisation, scraped project group
/// or self-hosted forge organisation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short label used in logs, e.g. `github org example`.
    fn describe(&self) -> String;

    /// Lists candidate repositories.
    ///
    /// # Errors
    ///
    /// Failing discovery skips the whole source.
    async fn discover(&self) -> Result<Vec<RepoRef>, Error>;

    /// Fetches releases or commits and README metadata for one repository.
    ///
    /// # Errors
    ///
    /// A failure drops the repository from the report.
    async fn process(&self, repo: &RepoRef) -> Result<RepositoryRecord, Error>;
}

/// Applies README-derived metadata to records.
#[derive(Debug, Clone)]
pub struct Enricher {
    analyzer: Arc<ReadmeAnalyzer>,
    resolver: ArtifactResolver
}

impl Enricher {
    pub fn new(analyzer: ReadmeAnalyzer, resolver: ArtifactResolver) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            resolver
        }
    }

    /// Fills CI actions and linked artifacts from the README.
    ///
    /// A missing README or a failed store lookup only leaves the affected
    /// fields empty; the record keeps its releases and commits.
    pub async fn apply(&self, record: &mut RepositoryRecord, readme: Result<String, Error>) {
        let text = match readme {
            Ok(text) => text,
            Err(error) => {
                warn!(repository = %record.name, %error, "README unavailable");
                return;
            }
        };

        let analysis = self.analyzer.analyze(&text);
        record.ci_actions = analysis.ci_actions;

        if let Some(name) = analysis.linked_snap {
            match self.resolver.fetch(ArtifactKind::Snap, &name).await {
                Ok(artifact) => record.snap = Some(artifact),
                Err(error) => warn!(repository = %record.name, %error, "failed to resolve snap")
            }
        }
        if let Some(name) = analysis.linked_charm {
            match self.resolver.fetch(ArtifactKind::Charm, &name).await {
                Ok(artifact) => record.charm = Some(artifact),
                Err(error) => warn!(repository = %record.name, %error, "failed to resolve charm")
            }
        }
    }
}

/// Percent-encodes a value for use in a query string or path segment.
pub(crate) fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::{RepoRef, encode};

    #[test]
    fn plain_reference_points_at_itself() {
        let repo = RepoRef::plain("example", "widget", "https://forge.test/example/widget", "main");
        assert_eq!(repo.repository, "widget");
        assert_eq!(repo.repository_url, repo.url);
        assert!(repo.folder.is_none());

        let record = repo.record();
        assert_eq!(record.name, "widget");
        assert_eq!(record.default_branch, "main");
        assert!(!record.is_active());
    }

    #[test]
    fn encode_escapes_reserved_characters() {
        assert_eq!(encode("release/1.0"), "release%2F1.0");
        assert_eq!(encode("v1.0"), "v1.0");
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Self-hosted forge adapter with monorepo splitting.
//!
//! Release and commit queries for a monorepo sub-folder run against the
//! parent repository. Only the identity, URL and README path of the entry
//! come from the sub-folder.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    Backend, Enricher, RELEASES_PER_REPO, RepoRef,
    api::{ApiComparison, ApiCommit, ApiRelease, ApiRepository, AuthorSource, into_release, published},
    encode
};
use crate::{client::Clients, config::IncludeConfig, error::Error, record::RepositoryRecord};

/// Page size for repository listings.
const PAGE_SIZE: usize = 10;

/// Some servers keep reporting a next page forever; stop here regardless.
const MAX_PAGES: usize = 100;

const README_CANDIDATES: [&str; 2] = ["README.md", "README.rst"];

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree:      Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool
}

#[derive(Debug, Clone, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type", default)]
    kind: String
}

/// Repositories of one organisation on a self-hosted forge.
#[derive(Debug, Clone)]
pub struct SelfHostedBackend {
    clients:  Clients,
    enricher: Enricher,
    org:      String,
    web_root: String,
    includes: BTreeMap<String, IncludeConfig>
}

impl SelfHostedBackend {
    pub fn new(
        clients: Clients,
        enricher: Enricher,
        org: String,
        web_root: &str,
        includes: BTreeMap<String, IncludeConfig>
    ) -> Self {
        Self {
            clients,
            enricher,
            org,
            web_root: web_root.trim_end_matches('/').to_owned(),
            includes
        }
    }

    fn api(&self) -> String {
        format!("{}/api/v1", self.web_root)
    }

    fn repo_api(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.api(), repo.owner, repo.repository)
    }

    async fn list_repositories(&self) -> Result<Vec<RepoRef>, Error> {
        let mut repos = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!("{}/users/{}/repos?page={page}&limit={PAGE_SIZE}", self.api(), self.org);
            let listed: Vec<ApiRepository> = self.clients.get_json(&url).await?;
            debug!(org = %self.org, page, count = listed.len(), "listed repositories");

            let exhausted = listed.len() < PAGE_SIZE;
            repos.extend(
                listed
                    .into_iter()
                    .filter(|repo| !repo.private && !repo.archived)
                    .map(|repo| RepoRef::plain(&self.org, repo.name, repo.html_url, repo.default_branch))
            );
            if exhausted {
                break;
            }
        }
        Ok(repos)
    }

    async fn included_repository(&self, name: &str, include: &IncludeConfig) -> Result<Vec<RepoRef>, Error> {
        let url = format!("{}/repos/{}/{name}", self.api(), self.org);
        let details: ApiRepository = self.clients.get_json(&url).await?;
        if details.archived {
            debug!(org = %self.org, repository = name, "skipping archived repository");
            return Ok(Vec::new());
        }

        let parent = RepoRef::plain(&self.org, details.name, details.html_url, details.default_branch);
        if include.monorepo_folders.is_empty() {
            return Ok(vec![parent]);
        }

        let paths = self.tree(&parent).await?;
        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for folder in &include.monorepo_folders {
            for child in monorepo_children(&paths, folder) {
                if !seen.insert(child.clone()) {
                    continue;
                }
                children.push(RepoRef {
                    url: format!(
                        "{}/src/branch/{}/{folder}/{child}",
                        parent.url, parent.default_branch
                    ),
                    folder: Some(format!("{folder}/{child}")),
                    name: child,
                    ..parent.clone()
                });
            }
        }
        Ok(children)
    }

    /// Full recursive tree of the default branch. There is no sub-tree API.
    async fn tree(&self, repo: &RepoRef) -> Result<Vec<TreeEntry>, Error> {
        let mut entries = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/git/trees/{}?recursive=true&page={page}",
                self.repo_api(repo),
                encode(&repo.default_branch)
            );
            let response: TreeResponse = self.clients.get_json(&url).await?;
            let empty = response.tree.is_empty();
            entries.extend(response.tree);
            if !response.truncated || empty {
                break;
            }
        }
        Ok(entries)
    }

    async fn readme(&self, repo: &RepoRef, branch: &str) -> Result<String, Error> {
        let prefix = repo
            .folder
            .as_deref()
            .map(|folder| format!("{folder}/"))
            .unwrap_or_default();

        for candidate in README_CANDIDATES {
            let url = format!(
                "{}/raw/{prefix}{candidate}?ref={}",
                self.repo_api(repo),
                encode(branch)
            );
            match self.clients.get_text(&url).await {
                Ok(text) => return Ok(text),
                Err(error) => debug!(repository = %repo.name, candidate, %error, "README candidate missing")
            }
        }

        Err(Error::ReadmeUnavailable {
            repository: repo.name.clone()
        })
    }
}

#[async_trait]
impl Backend for SelfHostedBackend {
    fn describe(&self) -> String {
        format!("gitea org {} at {}", self.org, self.web_root)
    }

    async fn discover(&self) -> Result<Vec<RepoRef>, Error> {
        if self.includes.is_empty() {
            return self.list_repositories().await;
        }

        let mut repos = Vec::new();
        for (name, include) in &self.includes {
            match self.included_repository(name, include).await {
                Ok(found) => repos.extend(found),
                Err(error) => warn!(org = %self.org, repository = %name, %error, "failed to load included repository")
            }
        }
        Ok(repos)
    }

    async fn process(&self, repo: &RepoRef) -> Result<RepositoryRecord, Error> {
        info!("processing gitea repo: {}/{}", repo.owner, repo.name);

        let mut record = repo.record();
        let branch = repo.default_branch.clone();
        let api = self.repo_api(repo);

        let releases: Vec<ApiRelease> = self
            .clients
            .get_json(&format!(
                "{api}/releases?draft=false&pre-release=false&limit={RELEASES_PER_REPO}"
            ))
            .await?;
        let releases = published(releases);

        let latest_tag = releases.first().map(|release| release.tag_name.clone());
        if let Some(tag) = latest_tag {
            let comparison: ApiComparison = self
                .clients
                .get_json(&format!("{api}/compare/{}...{}", encode(&tag), encode(&branch)))
                .await?;
            record.new_commits_since_last_release = comparison.total_commits;
            record.releases = releases
                .into_iter()
                .map(|release| into_release(release, &repo.repository_url, &branch))
                .collect();
        } else {
            let commits: Vec<ApiCommit> = self
                .clients
                .get_json(&format!("{api}/commits?sha={}&limit={RELEASES_PER_REPO}", encode(&branch)))
                .await?;
            record.commits = commits
                .into_iter()
                .take(RELEASES_PER_REPO)
                .map(|commit| commit.into_commit(AuthorSource::Account))
                .collect();
        }

        if record.is_active() {
            let readme = self.readme(repo, &branch).await;
            self.enricher.apply(&mut record, readme).await;
        }
        Ok(record)
    }
}

/// Immediate child folders of `folder`, deduplicated in tree order.
///
/// `folder` may be nested, e.g. `ops/charms`.
fn monorepo_children(entries: &[TreeEntry], folder: &str) -> Vec<String> {
    let folder = folder.trim_matches('/');
    let mut children: Vec<String> = Vec::new();

    for entry in entries {
        let Some(rest) = entry
            .path
            .strip_prefix(folder)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            continue;
        };
        let (child, nested) = match rest.split_once('/') {
            Some((child, _)) => (child, true),
            None => (rest, false)
        };
        // Files directly inside the folder are not sub-projects.
        if child.is_empty() || (!nested && entry.kind != "tree") {
            continue;
        }

        if !children.iter().any(|known| known == child) {
            children.push(child.to_owned());
        }
    }

    children
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Forge adapter: repositories of an organisation, scoped to team slugs.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    Backend, Enricher, RELEASES_PER_REPO, RepoRef,
    api::{ApiComparison, ApiCommit, ApiRelease, ApiRepository, AuthorSource, into_release, published},
    encode
};
use crate::{client::Clients, error::Error, record::RepositoryRecord};

const README_CANDIDATES: [&str; 3] = ["README.md", "README.rst", "README"];

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    content:  String,
    #[serde(default)]
    encoding: String
}

/// Repositories visible to a set of teams in one forge organisation.
#[derive(Debug, Clone)]
pub struct ForgeBackend {
    clients:  Clients,
    enricher: Enricher,
    org:      String,
    teams:    Vec<String>
}

impl ForgeBackend {
    pub fn new(clients: Clients, enricher: Enricher, org: String, teams: Vec<String>) -> Self {
        Self {
            clients,
            enricher,
            org,
            teams
        }
    }

    async fn releases(&self, repo: &RepoRef) -> Result<Vec<ApiRelease>, Error> {
        let route = format!(
            "/repos/{}/{}/releases?per_page={RELEASES_PER_REPO}",
            repo.owner, repo.repository
        );
        let releases: Vec<ApiRelease> = self.clients.forge_get(&route).await?;
        Ok(published(releases))
    }

    async fn commits_since(&self, repo: &RepoRef, tag: &str, branch: &str) -> Result<u64, Error> {
        let route = format!(
            "/repos/{}/{}/compare/{}...{}",
            repo.owner,
            repo.repository,
            encode(tag),
            encode(branch)
        );
        let comparison: ApiComparison = self.clients.forge_get(&route).await?;
        Ok(comparison.total_commits)
    }

    async fn latest_commits(&self, repo: &RepoRef, branch: &str) -> Result<Vec<ApiCommit>, Error> {
        let route = format!(
            "/repos/{}/{}/commits?sha={}&per_page={RELEASES_PER_REPO}",
            repo.owner,
            repo.repository,
            encode(branch)
        );
        self.clients.forge_get(&route).await
    }

    async fn readme(&self, repo: &RepoRef, branch: &str) -> Result<String, Error> {
        for candidate in README_CANDIDATES {
            let route = format!(
                "/repos/{}/{}/contents/{candidate}?ref={}",
                repo.owner,
                repo.repository,
                encode(branch)
            );
            match self.clients.forge_get::<ApiContent>(&route).await {
                Ok(content) => return decode_content(&content),
                Err(error) => debug!(repository = %repo.name, candidate, %error, "README candidate missing")
            }
        }

        Err(Error::ReadmeUnavailable {
            repository: repo.name.clone()
        })
    }
}

#[async_trait]
impl Backend for ForgeBackend {
    fn describe(&self) -> String {
        format!("github org {}", self.org)
    }

    async fn discover(&self) -> Result<Vec<RepoRef>, Error> {
        let mut repos = Vec::new();
        for team in &self.teams {
            let route = format!("/orgs/{}/teams/{}/repos?per_page=100", self.org, team);
            let listed: Vec<ApiRepository> = self.clients.forge_list(&route).await?;
            debug!(org = %self.org, team = %team, count = listed.len(), "listed team repositories");

            repos.extend(listed.into_iter().filter(|repo| !repo.private).map(|repo| {
                RepoRef::plain(&self.org, repo.name, repo.html_url, repo.default_branch)
            }));
        }
        Ok(repos)
    }

    async fn process(&self, repo: &RepoRef) -> Result<RepositoryRecord, Error> {
        info!("processing github repo: {}/{}", repo.owner, repo.name);

        let route = format!("/repos/{}/{}", repo.owner, repo.repository);
        let details: ApiRepository = self.clients.forge_get(&route).await?;
        if details.archived {
            return Err(Error::Skipped {
                repository: repo.name.clone(),
                reason:     "archived"
            });
        }

        let mut record = repo.record();
        if !details.default_branch.is_empty() {
            record.default_branch = details.default_branch;
        }
        if !details.html_url.is_empty() {
            record.url = details.html_url;
        }
        let branch = record.default_branch.clone();

        let releases = self.releases(repo).await?;
        let latest_tag = releases.first().map(|release| release.tag_name.clone());
        if let Some(tag) = latest_tag {
            record.new_commits_since_last_release = self.commits_since(repo, &tag, &branch).await?;
            record.releases = releases
                .into_iter()
                .map(|release| into_release(release, &record.url, &branch))
                .collect();
        } else {
            record.commits = self
                .latest_commits(repo, &branch)
                .await?
                .into_iter()
                .take(RELEASES_PER_REPO)
                .map(|commit| commit.into_commit(AuthorSource::Signature))
                .collect();
        }

        if record.is_active() {
            let readme = self.readme(repo, &branch).await;
            self.enricher.apply(&mut record, readme).await;
        }
        Ok(record)
    }
}

fn decode_content(content: &ApiContent) -> Result<String, Error> {
    if !content.encoding.is_empty() && content.encoding != "base64" {
        return Err(Error::decode(
            "README",
            format!("unsupported encoding '{}'", content.encoding)
        ));
    }

    let compact: String = content
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|error| Error::decode("README", error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| Error::decode("README", error.to_string()))
}

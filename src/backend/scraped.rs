// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Scraped VCS adapter: Git projects of a project group, read from cgit pages.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Backend, Enricher, RELEASES_PER_REPO, RepoRef, cgit, encode};
use crate::{
    client::Clients,
    error::Error,
    record::{Release, RepositoryRecord}
};

/// Upper bound on project listing pages followed for one group.
const MAX_LISTING_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct ProjectListing {
    #[serde(default)]
    entries:              Vec<ProjectEntry>,
    #[serde(default)]
    next_collection_link: Option<String>
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    name: String,
    #[serde(default)]
    vcs:  Option<String>
}

/// Git projects belonging to one project group.
#[derive(Debug, Clone)]
pub struct ScrapedBackend {
    clients:  Clients,
    enricher: Enricher,
    group:    String
}

impl ScrapedBackend {
    pub fn new(clients: Clients, enricher: Enricher, group: String) -> Self {
        Self {
            clients,
            enricher,
            group
        }
    }

    fn repository_url(&self, project: &str) -> String {
        format!("{}/{project}", self.clients.endpoints().scraped_web)
    }

    async fn listing(&self, url: &str) -> Result<ProjectListing, Error> {
        let body = self.clients.scrape(url).await?;
        serde_json::from_str(&body).map_err(|error| Error::decode("project listing", error.to_string()))
    }

    /// Releases for up to three `rev*` tags listed on the landing page.
    async fn releases(&self, repo: &RepoRef, landing: &str, branch: &str) -> Vec<Release> {
        let mut releases = Vec::new();
        for tag in cgit::tag_names(landing, RELEASES_PER_REPO) {
            let url = format!("{}/commit/?h={}", repo.url, encode(&tag));
            let commit = match self.clients.scrape(&url).await {
                Ok(page) => cgit::tag_commit(&page),
                Err(error) => Err(error)
            };

            match commit {
                Ok(commit) => releases.push(Release {
                    id:          commit.timestamp,
                    compare_url: format!(
                        "{}/diff/?id={}&id2={}",
                        repo.url,
                        commit.commit,
                        encode(branch)
                    ),
                    url:         format!("{}/tag/?h={}", repo.url, encode(&tag)),
                    title:       tag.clone(),
                    body:        String::new(),
                    timestamp:   commit.timestamp,
                    version:     tag
                }),
                Err(error) => warn!(repository = %repo.name, tag = %tag, %error, "skipping tag")
            }
        }
        releases
    }
}

#[async_trait]
impl Backend for ScrapedBackend {
    fn describe(&self) -> String {
        format!("launchpad project group {}", self.group)
    }

    async fn discover(&self) -> Result<Vec<RepoRef>, Error> {
        let mut url = format!("{}/{}/projects", self.clients.endpoints().scraped_api, self.group);
        let mut repos = Vec::new();

        for _ in 0..MAX_LISTING_PAGES {
            let listing = self.listing(&url).await?;
            repos.extend(
                listing
                    .entries
                    .into_iter()
                    .filter(|entry| entry.vcs.as_deref() == Some("Git"))
                    .map(|entry| {
                        let url = self.repository_url(&entry.name);
                        RepoRef::plain(&self.group, entry.name, url, "")
                    })
            );

            match listing.next_collection_link {
                Some(next) if !next.is_empty() => url = next,
                _ => break
            }
        }

        debug!(group = %self.group, count = repos.len(), "listed git projects");
        Ok(repos)
    }

    async fn process(&self, repo: &RepoRef) -> Result<RepositoryRecord, Error> {
        info!("processing launchpad repo: {}/{}", repo.owner, repo.name);

        // Serves both the branch selector and the tag list.
        let landing = self.clients.scrape(&repo.url).await?;
        let branch = cgit::default_branch(&landing).ok_or_else(|| Error::DefaultBranchParse {
            repository: repo.name.clone()
        })?;

        let mut record = repo.record();
        record.default_branch = branch.clone();
        record.releases = self.releases(repo, &landing, &branch).await;

        if record.releases.is_empty() {
            return Ok(record);
        }

        let log = self.clients.scrape(&format!("{}/log", repo.url)).await;
        match log.and_then(|page| cgit::new_commits(&page)) {
            Ok(count) => record.new_commits_since_last_release = count,
            Err(error) => warn!(repository = %repo.name, %error, "failed to count new commits")
        }

        let readme = self
            .clients
            .scrape(&format!("{}/plain/README.md", repo.url))
            .await;
        self.enricher.apply(&mut record, readme).await;
        Ok(record)
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-team aggregation across every configured source.
//!
//! Sources run one after another in configuration order. Inside a source the
//! repositories are processed concurrently, bounded by
//! [`Aggregator::concurrency`], and joined before the next source starts. A
//! name is claimed in the shared [`SeenRepos`] set exactly once per team, so
//! the first source to report a repository owns it.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError}
};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    backend::{Backend, RepoRef},
    error::Error,
    record::{RepositoryRecord, TeamReport}
};

/// Default number of repositories processed at once per source.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// One configured source of a team together with its ignore list.
#[derive(Clone)]
pub struct Source {
    backend: Arc<dyn Backend>,
    ignores: Vec<String>
}

impl Source {
    pub fn new(backend: Arc<dyn Backend>, ignores: Vec<String>) -> Self {
        Self {
            backend,
            ignores
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignores.iter().any(|ignored| ignored == name)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("backend", &self.backend.describe())
            .field("ignores", &self.ignores)
            .finish()
    }
}

/// Repository names already reported for a team.
#[derive(Debug, Clone, Default)]
pub struct SeenRepos(Arc<Mutex<HashSet<String>>>);

impl SeenRepos {
    pub fn contains(&self, name: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Records `name`, returning `false` if it was already claimed.
    pub fn claim(&self, name: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned())
    }
}

/// Runs sources and merges their records into team reports.
#[derive(Debug, Clone)]
pub struct Aggregator {
    concurrency: usize
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl Aggregator {
    /// Creates an aggregator processing up to `concurrency` repositories at
    /// once. Zero is treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1)
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Collects, deduplicates and sorts the repositories of one team.
    pub async fn aggregate(&self, team: &str, sources: &[Source]) -> TeamReport {
        info!("processing team: {team}");

        let seen = SeenRepos::default();
        let mut repos = Vec::new();
        for source in sources {
            repos.extend(self.collect(source, &seen).await);
        }
        sort_by_latest_release(&mut repos);

        TeamReport {
            name: team.to_owned(),
            repos
        }
    }

    /// Processes every new repository of one source.
    ///
    /// Discovery failures are logged and yield nothing.
    pub async fn collect(&self, source: &Source, seen: &SeenRepos) -> Vec<RepositoryRecord> {
        let label = source.backend.describe();
        let discovered = match source.backend.discover().await {
            Ok(discovered) => discovered,
            Err(error) => {
                warn!(source = %label, %error, "skipping source after failed discovery");
                return Vec::new();
            }
        };

        let candidates = candidates(source, seen, discovered);
        debug!(source = %label, count = candidates.len(), "processing repositories");

        stream::iter(candidates)
            .map(|repo| process_one(source.backend.as_ref(), seen, repo))
            .buffered(self.concurrency)
            .filter_map(|record| async move { record })
            .collect()
            .await
    }
}

/// Drops ignored names, names other sources already reported and repeats
/// within this batch. The first occurrence wins.
fn candidates(source: &Source, seen: &SeenRepos, discovered: Vec<RepoRef>) -> Vec<RepoRef> {
    let mut batch = HashSet::new();
    discovered
        .into_iter()
        .filter(|repo| {
            !source.is_ignored(&repo.name) && !seen.contains(&repo.name) && batch.insert(repo.name.clone())
        })
        .collect()
}

async fn process_one(backend: &dyn Backend, seen: &SeenRepos, repo: RepoRef) -> Option<RepositoryRecord> {
    match backend.process(&repo).await {
        Ok(record) if !record.is_active() => {
            debug!(repository = %repo.name, "dropping repository without releases or commits");
            None
        }
        Ok(record) => {
            if seen.claim(&record.name) {
                Some(record)
            } else {
                debug!(repository = %record.name, "repository already reported");
                None
            }
        }
        Err(error @ Error::Skipped { .. }) => {
            debug!(%error);
            None
        }
        Err(error) => {
            warn!(repository = %repo.name, %error, "error populating repository");
            None
        }
    }
}

/// Orders records by latest release, newest first. Records without releases
/// go last. The sort is stable.
pub fn sort_by_latest_release(repos: &mut [RepositoryRecord]) {
    repos.sort_by(|a, b| {
        match (a.latest_release_timestamp(), b.latest_release_timestamp()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal
        }
    });
}

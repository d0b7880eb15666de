// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Release aggregation across several code hosts.
//!
//! Teams are configured in a YAML document listing forge organizations,
//! scraped project groups and self-hosted forge organizations. For each team
//! the library discovers repositories, collects their latest releases and
//! recent commits, enriches them with README badge metadata and package store
//! artifacts, and produces a report sorted by the most recent release.

pub mod aggregate;
pub mod artifact;
pub mod backend;
pub mod client;
mod config;
mod error;
pub mod markdown;
pub mod readme;
pub mod record;
pub mod report;
pub mod retry;

pub use aggregate::{Aggregator, DEFAULT_CONCURRENCY, Source, sort_by_latest_release};
pub use client::{ClientOptions, Clients, Endpoints};
pub use config::{
    CONFIG_FILE_NAME, Config, ForgeOrgConfig, IncludeConfig, ScrapedGroupConfig,
    SelfHostedOrgConfig, TeamConfig, load_config, locate_config, parse_config
};
pub use error::{Error, io_error};
pub use readme::{BadgeHosts, ReadmeAnalysis, ReadmeAnalyzer};
pub use record::{Artifact, ArtifactRelease, Commit, Release, RepositoryRecord, TeamReport};
pub use report::{ReportBuilder, to_json, write_report};

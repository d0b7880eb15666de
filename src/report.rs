// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Builds the per-team report and serializes it as JSON.

use std::{io::Write, sync::Arc};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::{
    aggregate::{Aggregator, Source},
    artifact::ArtifactResolver,
    backend::{Enricher, ForgeBackend, ScrapedBackend, SelfHostedBackend},
    client::Clients,
    config::{Config, TeamConfig},
    error::Error,
    readme::ReadmeAnalyzer,
    record::TeamReport
};

/// Indentation of the emitted JSON.
const INDENT: &[u8] = b"   ";

/// Turns a [`Config`] into team reports.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    clients:    Clients,
    enricher:   Enricher,
    aggregator: Aggregator
}

impl ReportBuilder {
    /// Creates a builder using the default badge hosts.
    pub fn new(clients: Clients, aggregator: Aggregator) -> Self {
        Self::with_analyzer(clients, aggregator, ReadmeAnalyzer::standard().clone())
    }

    /// Creates a builder with a custom README analyzer.
    pub fn with_analyzer(clients: Clients, aggregator: Aggregator, analyzer: ReadmeAnalyzer) -> Self {
        let enricher = Enricher::new(analyzer, ArtifactResolver::new(clients.clone()));
        Self {
            clients,
            enricher,
            aggregator
        }
    }

    /// Reports every team, in configuration order.
    pub async fn build(&self, config: &Config) -> Vec<TeamReport> {
        let mut reports = Vec::with_capacity(config.teams.len());
        for team in &config.teams {
            let sources = self.sources(team);
            reports.push(self.aggregator.aggregate(&team.name, &sources).await);
        }
        reports
    }

    /// Sources of a team: forge orgs, then scraped project groups, then
    /// self-hosted orgs.
    pub fn sources(&self, team: &TeamConfig) -> Vec<Source> {
        let mut sources = Vec::new();

        for org in &team.github {
            let backend = ForgeBackend::new(
                self.clients.clone(),
                self.enricher.clone(),
                org.org.clone(),
                org.teams.clone()
            );
            sources.push(Source::new(Arc::new(backend), org.ignores.clone()));
        }

        if let Some(scraped) = &team.launchpad {
            for group in &scraped.project_groups {
                let backend =
                    ScrapedBackend::new(self.clients.clone(), self.enricher.clone(), group.clone());
                sources.push(Source::new(Arc::new(backend), scraped.ignores.clone()));
            }
        }

        for org in &team.gitea {
            let backend = SelfHostedBackend::new(
                self.clients.clone(),
                self.enricher.clone(),
                org.org.clone(),
                &org.url,
                org.includes.clone()
            );
            sources.push(Source::new(Arc::new(backend), org.ignores.clone()));
        }

        sources
    }
}

/// Writes reports as pretty-printed JSON followed by a newline.
///
/// HTML in release bodies is written verbatim.
///
/// # Errors
///
/// Returns [`Error::Serialize`] when serialization or writing fails.
pub fn write_report<W>(reports: &[TeamReport], mut writer: W) -> Result<(), Error>
where
    W: Write
{
    let mut serializer = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
    reports.serialize(&mut serializer)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    Ok(())
}

/// Renders reports into a JSON string.
///
/// # Errors
///
/// See [`write_report`].
pub fn to_json(reports: &[TeamReport]) -> Result<String, Error> {
    let mut buffer = Vec::new();
    write_report(reports, &mut buffer)?;
    String::from_utf8(buffer).map_err(|error| Error::decode("report", error.to_string()))
}

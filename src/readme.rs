// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Extracts CI workflows and store artifacts linked from README badges.
//!
//! Analysis is pure: it only reports names. Resolving a snap or charm name
//! into store details happens in the caller.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static DEFAULT_ANALYZER: LazyLock<ReadmeAnalyzer> = LazyLock::new(|| {
    ReadmeAnalyzer::new(&BadgeHosts::default()).expect("default badge hosts produce valid patterns")
});

/// Hosts whose badge URLs are recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeHosts {
    /// Host serving CI workflow badges, e.g. `github.com`.
    pub ci:    String,
    /// Host (and optional path prefix) serving snap badges.
    pub snap:  String,
    /// Host (and optional path prefix) serving charm badges.
    pub charm: String
}

impl Default for BadgeHosts {
    fn default() -> Self {
        Self {
            ci:    "github.com".to_owned(),
            snap:  "snapcraft.io".to_owned(),
            charm: "charmhub.io".to_owned()
        }
    }
}

/// Result of analyzing a README.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadmeAnalysis {
    /// Badge targets of CI workflows, deduplicated in first-seen order.
    pub ci_actions:   Vec<String>,
    /// Snap linked through a store badge.
    pub linked_snap:  Option<String>,
    /// Charm linked through a store badge.
    pub linked_charm: Option<String>
}

/// Compiled badge patterns for one set of [`BadgeHosts`].
#[derive(Debug, Clone)]
pub struct ReadmeAnalyzer {
    ci:    Regex,
    snap:  Regex,
    charm: Regex
}

impl ReadmeAnalyzer {
    /// Compiles badge patterns for the given hosts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a pattern cannot be compiled.
    pub fn new(hosts: &BadgeHosts) -> Result<Self, Error> {
        let ci = compile(&format!(
            r"(?P<action>https://{}/[\w\-./]+)/badge\.svg",
            regex::escape(&hosts.ci)
        ))?;
        let snap = compile(&store_badge_pattern(&hosts.snap))?;
        let charm = compile(&store_badge_pattern(&hosts.charm))?;

        Ok(Self {
            ci,
            snap,
            charm
        })
    }

    /// Analyzer for the default production hosts.
    pub fn standard() -> &'static Self {
        &DEFAULT_ANALYZER
    }

    /// Extracts CI actions and linked artifact names from README text.
    ///
    /// # Examples
    ///
    /// ```
    /// use releasegen::ReadmeAnalyzer;
    ///
    /// let analysis = ReadmeAnalyzer::standard()
    ///     .analyze("[![widget](https://snapcraft.io/widget/badge.svg)](https://snapcraft.io/widget)");
    /// assert_eq!(analysis.linked_snap.as_deref(), Some("widget"));
    /// assert!(analysis.linked_charm.is_none());
    /// ```
    pub fn analyze(&self, text: &str) -> ReadmeAnalysis {
        let mut ci_actions: Vec<String> = Vec::new();
        for captures in self.ci.captures_iter(text) {
            let action = &captures["action"];
            if !ci_actions.iter().any(|known| known == action) {
                ci_actions.push(action.to_owned());
            }
        }

        ReadmeAnalysis {
            ci_actions,
            linked_snap: first_name(&self.snap, text),
            linked_charm: first_name(&self.charm, text)
        }
    }
}

fn store_badge_pattern(host: &str) -> String {
    format!(r"https://{}/(?P<name>[\w-]+)/badge\.svg", regex::escape(host))
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|error| Error::validation(format!("invalid badge pattern: {error}")))
}

fn first_name(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .map(|captures| captures["name"].to_owned())
}

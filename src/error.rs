#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the releasegen crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Only configuration variants are fatal. Everything raised while talking to
//! a backend is recovered at the repository, artifact or source that owns it.

use std::path::{Path, PathBuf};

/// Unified error type returned by the configuration loader, the backend
/// adapters and the report writer.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps serialization errors when writing the report.
    #[error("failed to serialize report: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// Transport failure talking to an HTTP endpoint.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Requested URL.
        url:    String,
        /// Underlying reqwest error.
        source: reqwest::Error
    },
    /// The endpoint answered with a non-success status code.
    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        /// Requested URL.
        url:    String,
        /// Status code returned by the server.
        status: u16
    },
    /// Failure reported by the forge API client.
    #[error("forge API call '{operation}' failed: {source}")]
    Forge {
        /// Short description of the API call.
        operation: String,
        /// Underlying octocrab error.
        source:    octocrab::Error
    },
    /// An outbound call exceeded its time budget.
    #[error("request to {target} timed out")]
    Timeout {
        /// URL or API operation that timed out.
        target: String
    },
    /// A scraped page did not have the expected structure.
    #[error("failed to parse page: {message}")]
    HtmlParse {
        /// Human readable message describing the parse failure.
        message: String
    },
    /// The branch selector of a scraped repository page has no selected entry.
    #[error("error parsing default branch for repository '{repository}'")]
    DefaultBranchParse {
        /// Repository whose landing page was scraped.
        repository: String
    },
    /// A timestamp could not be parsed.
    #[error("failed to parse timestamp '{value}': {source}")]
    Timestamp {
        /// Raw timestamp text.
        value:  String,
        /// Underlying chrono error.
        source: chrono::ParseError
    },
    /// A payload could not be decoded into the expected shape.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// Payload being decoded.
        what:    String,
        /// Human readable message describing the decode failure.
        message: String
    },
    /// Resolving a snap or charm from the package store failed.
    #[error("failed to fetch {kind} '{name}' from the store: {message}")]
    ArtifactFetch {
        /// Artifact kind (`snap` or `charm`).
        kind:    &'static str,
        /// Artifact name.
        name:    String,
        /// Human readable cause.
        message: String
    },
    /// None of the README candidates could be fetched.
    #[error("error getting README for repository '{repository}'")]
    ReadmeUnavailable {
        /// Repository whose README was requested.
        repository: String
    },
    /// The repository is deliberately left out of the report.
    #[error("skipping repository '{repository}': {reason}")]
    Skipped {
        /// Repository name.
        repository: String,
        /// Why it was skipped.
        reason:     &'static str
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs an HTML parse error.
    pub fn parse_html<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::HtmlParse {
            message: message.into()
        }
    }

    /// Constructs a decode error for the named payload.
    pub fn decode<W, M>(what: W, message: M) -> Self
    where
        W: Into<String>,
        M: Into<String>
    {
        Self::Decode {
            what:    what.into(),
            message: message.into()
        }
    }

    /// Returns `true` when retrying the same request may succeed.
    ///
    /// Transport failures, timeouts and server-side (5xx) statuses are
    /// transient; client errors such as 404 are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http {
                source, ..
            } => !source.is_status() && !source.is_decode(),
            Self::Timeout {
                ..
            } => true,
            Self::Status {
                status, ..
            } => *status >= 500,
            Self::Forge {
                source, ..
            } => match source {
                octocrab::Error::GitHub {
                    source, ..
                } => source.status_code.is_server_error(),
                octocrab::Error::Hyper {
                    ..
                }
                | octocrab::Error::Service {
                    ..
                } => true,
                _ => false
            },
            _ => false
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// This method is primarily intended for CLI contexts where the variant
    /// name does not add value to end users. The returned string matches the
    /// [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

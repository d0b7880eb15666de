// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Resolves snaps and charms against the package store.
//!
//! The store returns a channel map: one entry per (track, risk) pair with the
//! revision live on it and when it was released. Entries are mapped
//! positionally onto [`ArtifactRelease`] values.

use std::fmt;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::{
    client::Clients,
    error::Error,
    record::{Artifact, ArtifactRelease}
};

/// Kind of store artifact linked from a README.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash,)]
pub enum ArtifactKind
{
    /// Snap package, resolved against the snap store.
    Snap,
    /// Charm, resolved against the charm store.
    Charm,
}

impl ArtifactKind
{
    /// Lower-case name used in logs and errors.
    pub const fn as_str(self,) -> &'static str
    {
        match self {
            Self::Snap => "snap",
            Self::Charm => "charm",
        }
    }

    fn fallback_url(self, name: &str,) -> String
    {
        match self {
            Self::Snap => format!("https://snapcraft.io/{name}"),
            Self::Charm => format!("https://charmhub.io/{name}"),
        }
    }
}

impl fmt::Display for ArtifactKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.as_str(),)
    }
}

#[derive(Debug, Deserialize,)]
struct StoreInfo
{
    #[serde(rename = "channel-map", default)]
    channel_map: Vec<ChannelMapEntry,>,
    #[serde(default)]
    snap:        Option<StoreLink,>,
    #[serde(default)]
    result:      Option<StoreLink,>,
}

#[derive(Debug, Deserialize,)]
struct StoreLink
{
    #[serde(rename = "store-url", default)]
    store_url: Option<String,>,
}

#[derive(Debug, Deserialize,)]
struct ChannelMapEntry
{
    channel:  Channel,
    revision: Revision,
}

#[derive(Debug, Deserialize,)]
struct Channel
{
    #[serde(default)]
    track:       String,
    #[serde(default)]
    risk:        String,
    #[serde(rename = "released-at", default)]
    released_at: Option<String,>,
}

/// Snaps report a bare revision number, charms nest it in an object.
#[derive(Debug, Deserialize,)]
#[serde(untagged)]
enum Revision
{
    Number(i64,),
    Nested
    {
        revision: i64,
    },
}

impl Revision
{
    fn value(&self,) -> i64
    {
        match self {
            Self::Number(revision,) => *revision,
            Self::Nested {
                revision,
            } => *revision,
        }
    }
}

/// Fetches artifact details from the snap and charm stores.
#[derive(Debug, Clone,)]
pub struct ArtifactResolver
{
    clients: Clients,
}

impl ArtifactResolver
{
    /// Creates a resolver that talks to the stores configured in `clients`.
    pub fn new(clients: Clients,) -> Self
    {
        Self {
            clients,
        }
    }

    /// Fetches the channel map of `name` and normalizes it into an
    /// [`Artifact`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactFetch`] on transport failures, non-success
    /// statuses and undecodable payloads.
    pub async fn fetch(&self, kind: ArtifactKind, name: &str,) -> Result<Artifact, Error,>
    {
        let endpoints = self.clients.endpoints();
        let info: Result<StoreInfo, Error,> = match kind {
            ArtifactKind::Snap => {
                let url = format!(
                    "{}/v2/snaps/info/{name}?fields=channel-map,revision,store-url",
                    endpoints.snap_store
                );
                // The store rejects requests without a device series.
                self.clients.get_json_with_headers(&url, &[("Snap-Device-Series", "16",)],).await
            }
            ArtifactKind::Charm => {
                let url = format!(
                    "{}/v2/charms/info/{name}?fields=channel-map,result.store-url",
                    endpoints.charm_store
                );
                self.clients.get_json(&url,).await
            }
        };

        let info = info.map_err(|error| Error::ArtifactFetch {
            kind:    kind.as_str(),
            name:    name.to_owned(),
            message: error.to_string(),
        },)?;

        debug!(kind = kind.as_str(), name, entries = info.channel_map.len(), "resolved artifact");
        Ok(into_artifact(kind, name, info,),)
    }
}

fn into_artifact(kind: ArtifactKind, name: &str, info: StoreInfo,) -> Artifact
{
    let store_url = match kind {
        ArtifactKind::Snap => info.snap.and_then(|link| link.store_url,),
        ArtifactKind::Charm => info.result.and_then(|link| link.store_url,),
    }
    .filter(|url| !url.is_empty(),)
    .unwrap_or_else(|| kind.fallback_url(name,),);

    let releases = info
        .channel_map
        .into_iter()
        .map(|entry| ArtifactRelease {
            timestamp: entry.channel.released_at.as_deref().map_or(0, release_timestamp,),
            track:     entry.channel.track,
            channel:   entry.channel.risk,
            revision:  entry.revision.value(),
        },)
        .collect();

    Artifact::new(name, store_url, releases,)
}

/// Unix seconds of an RFC 3339 release time, 0 when unparseable.
fn release_timestamp(value: &str,) -> i64
{
    DateTime::parse_from_rfc3339(value,).map_or(0, |parsed| parsed.timestamp(),)
}

#[cfg(test)]
mod tests
{
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    use super::*;
    use crate::{
        client::{ClientOptions, Endpoints},
        retry::RetryConfig,
    };

    fn resolver(server: &MockServer,) -> ArtifactResolver
    {
        let options = ClientOptions {
            retry: RetryConfig::none(), ..ClientOptions::default()
        };
        let clients = Clients::new("token", Endpoints::single_host(&server.uri(),), options,)
            .expect("clients should build",);
        ArtifactResolver::new(clients,)
    }

    #[tokio::test]
    async fn zips_channel_map_columns_into_releases()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/v2/snaps/info/widget",),)
            .and(query_param("fields", "channel-map,revision,store-url",),)
            .and(header("Snap-Device-Series", "16",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(json!({
                "channel-map": [
                    {
                        "channel": {"track": "latest", "risk": "stable", "released-at": "2024-01-02T03:04:05+00:00"},
                        "revision": 5
                    },
                    {
                        "channel": {"track": "1.0", "risk": "edge", "released-at": "2024-02-03T04:05:06.5+00:00"},
                        "revision": 9
                    }
                ],
                "snap": {"store-url": "https://snapcraft.io/widget"}
            }),),)
            .mount(&server,)
            .await;

        let artifact =
            resolver(&server,).fetch(ArtifactKind::Snap, "widget",).await.expect("artifact",);

        assert_eq!(artifact.releases.len(), 2);
        assert_eq!(artifact.releases[0], ArtifactRelease {
            track:     "latest".to_owned(),
            channel:   "stable".to_owned(),
            revision:  5,
            timestamp: 1_704_164_645,
        });
        assert_eq!(artifact.releases[1].revision, 9);
        assert_eq!(artifact.releases[1].timestamp, 1_706_933_106);
        assert_eq!(artifact.tracks, vec!["latest", "1.0"]);
        assert_eq!(artifact.channels, vec!["stable", "edge"]);
        assert_eq!(artifact.url, "https://snapcraft.io/widget");
    }

    #[tokio::test]
    async fn charm_revisions_are_nested_and_store_url_falls_back()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/v2/charms/info/gadget",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(json!({
                "channel-map": [
                    {
                        "channel": {"track": "latest", "risk": "stable", "released-at": "not a date"},
                        "revision": {"revision": 12}
                    }
                ],
                "result": {}
            }),),)
            .mount(&server,)
            .await;

        let artifact =
            resolver(&server,).fetch(ArtifactKind::Charm, "gadget",).await.expect("artifact",);

        assert_eq!(artifact.releases[0].revision, 12);
        assert_eq!(artifact.releases[0].timestamp, 0);
        assert_eq!(artifact.url, "https://charmhub.io/gadget");
    }

    #[tokio::test]
    async fn non_success_status_is_an_artifact_fetch_error()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/v2/charms/info/missing",),)
            .respond_with(ResponseTemplate::new(404,),)
            .mount(&server,)
            .await;

        let error = resolver(&server,)
            .fetch(ArtifactKind::Charm, "missing",)
            .await
            .expect_err("404 should fail",);

        match error {
            Error::ArtifactFetch {
                kind,
                name,
                ..
            } => {
                assert_eq!(kind, "charm");
                assert_eq!(name, "missing");
            }
            other => panic!("expected artifact fetch error, got {other:?}"),
        }
    }

    #[test]
    fn release_timestamp_handles_fractional_seconds()
    {
        assert_eq!(release_timestamp("1970-01-01T00:01:00.25+00:00",), 60);
        assert_eq!(release_timestamp("",), 0);
    }
}

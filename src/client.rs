// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Upstream endpoints and the HTTP clients shared by every backend adapter.
//!
//! [`Clients`] is built once per run and handed to each adapter. Every call
//! made through it carries a timeout and is retried according to the
//! configured [`RetryConfig`].

use std::{future::Future, time::Duration};

use octocrab::{FromResponse, Octocrab, Page};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::Error,
    retry::{RetryConfig, retry_with_backoff}
};

/// Hard per-request budget for scraped VCS pages.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-request budget for API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on pages followed for a single paginated forge listing.
const MAX_FORGE_PAGES: usize = 50;

const USER_AGENT: &str = concat!("releasegen/", env!("CARGO_PKG_VERSION"));

/// Base URLs of every upstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// REST API root of the forge.
    pub forge_api:   String,
    /// JSON API root of the scraped VCS host (project-group listings).
    pub scraped_api: String,
    /// Web root serving the scraped repository pages.
    pub scraped_web: String,
    /// Snap store API root.
    pub snap_store:  String,
    /// Charm store API root.
    pub charm_store: String
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forge_api:   "https://api.github.com".to_owned(),
            scraped_api: "https://api.launchpad.net/devel".to_owned(),
            scraped_web: "https://git.launchpad.net".to_owned(),
            snap_store:  "https://api.snapcraft.io".to_owned(),
            charm_store: "https://api.charmhub.io".to_owned()
        }
    }
}

impl Endpoints {
    /// Points every endpoint at one base URL. Used with mock servers.
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            forge_api:   base.to_owned(),
            scraped_api: format!("{base}/scraped-api"),
            scraped_web: format!("{base}/scraped"),
            snap_store:  base.to_owned(),
            charm_store: base.to_owned()
        }
    }
}

/// Tunables for [`Clients::new`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout applied to forge, self-hosted forge and store requests.
    pub request_timeout: Duration,
    /// Retry policy for idempotent requests.
    pub retry:           RetryConfig
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry:           RetryConfig::default()
        }
    }
}

/// Clients scoped to one run.
#[derive(Debug, Clone)]
pub struct Clients {
    forge:           Octocrab,
    http:            reqwest::Client,
    scraper:         reqwest::Client,
    endpoints:       Endpoints,
    request_timeout: Duration,
    retry:           RetryConfig
}

impl Clients {
    /// Builds the forge, API and scraping clients.
    ///
    /// The token is only handed to the forge client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a client cannot be constructed, for
    /// example because the forge base URL is not a valid URI.
    pub fn new(token: &str, endpoints: Endpoints, options: ClientOptions) -> Result<Self, Error> {
        let forge = Octocrab::builder()
            .base_uri(endpoints.forge_api.as_str())
            .map_err(|e| Error::validation(format!("invalid forge API url: {e}")))?
            .personal_token(token.to_owned())
            .build()
            .map_err(|e| Error::validation(format!("failed to initialize forge client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| Error::validation(format!("failed to initialize HTTP client: {e}")))?;

        let scraper = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(SCRAPE_TIMEOUT)
            .build()
            .map_err(|e| Error::validation(format!("failed to initialize scraping client: {e}")))?;

        Ok(Self {
            forge,
            http,
            scraper,
            endpoints,
            request_timeout: options.request_timeout,
            retry: options.retry
        })
    }

    /// Configured upstream endpoints.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GETs `url` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] for non-success responses and
    /// [`Error::Http`] for transport or decode failures.
    pub async fn get_json<T>(&self, url: &str) -> Result<T, Error>
    where
        T: DeserializeOwned
    {
        self.get_json_with_headers(url, &[]).await
    }

    /// GETs `url` with extra request headers and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// See [`Clients::get_json`].
    pub async fn get_json_with_headers<T>(
        &self,
        url: &str,
        headers: &[(&str, &str)]
    ) -> Result<T, Error>
    where
        T: DeserializeOwned
    {
        let response = self.send(&self.http, url, headers).await?;
        response.json::<T>().await.map_err(|source| Error::Http {
            url: url.to_owned(),
            source
        })
    }

    /// GETs `url` from an API endpoint and returns the body as text.
    ///
    /// # Errors
    ///
    /// See [`Clients::get_json`].
    pub async fn get_text(&self, url: &str) -> Result<String, Error> {
        let response = self.send(&self.http, url, &[]).await?;
        read_text(url, response).await
    }

    /// GETs a scraped VCS page with the 5 second budget.
    ///
    /// # Errors
    ///
    /// See [`Clients::get_json`].
    pub async fn scrape(&self, url: &str) -> Result<String, Error> {
        let response = self.send(&self.scraper, url, &[]).await?;
        read_text(url, response).await
    }

    /// GETs a forge API route and decodes the response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forge`] when the API call fails and
    /// [`Error::Timeout`] when it exceeds the request timeout.
    pub async fn forge_get<T>(&self, route: &str) -> Result<T, Error>
    where
        T: FromResponse
    {
        let forge = &self.forge;
        self.with_forge_budget(route, move || async move {
            forge.get::<T, _, ()>(route, None).await
        })
        .await
    }

    /// GETs a paginated forge API route and follows `next` links until the
    /// listing is exhausted.
    ///
    /// # Errors
    ///
    /// See [`Clients::forge_get`].
    pub async fn forge_list<T>(&self, route: &str) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned
    {
        let mut page: Page<T> = self.forge_get(route).await?;
        let mut items = std::mem::take(&mut page.items);

        for _ in 1..MAX_FORGE_PAGES {
            let Some(next) = page.next.take() else {
                break;
            };
            debug!(route, next = %next, "following forge pagination");

            let forge = &self.forge;
            let next = Some(next);
            let fetched: Option<Page<T>> = self
                .with_forge_budget(route, || {
                    let next = next.clone();
                    async move { forge.get_page::<T>(&next).await }
                })
                .await?;

            match fetched {
                Some(mut fetched) => {
                    items.append(&mut fetched.items);
                    page = fetched;
                }
                None => break
            }
        }

        Ok(items)
    }

    async fn with_forge_budget<T, F, Fut>(&self, route: &str, mut call: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, octocrab::Error>>
    {
        let timeout = self.request_timeout;
        retry_with_backoff(&self.retry, route, || {
            let pending = call();
            async move {
                match tokio::time::timeout(timeout, pending).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(source)) => Err(Error::Forge {
                        operation: route.to_owned(),
                        source
                    }),
                    Err(_) => Err(Error::Timeout {
                        target: route.to_owned()
                    })
                }
            }
        })
        .await
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        url: &str,
        headers: &[(&str, &str)]
    ) -> Result<reqwest::Response, Error> {
        retry_with_backoff(&self.retry, url, move || async move {
            let mut request = client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let response = request.send().await.map_err(|source| {
                if source.is_timeout() {
                    Error::Timeout {
                        target: url.to_owned()
                    }
                } else {
                    Error::Http {
                        url: url.to_owned(),
                        source
                    }
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    url:    url.to_owned(),
                    status: status.as_u16()
                });
            }
            Ok(response)
        })
        .await
    }
}

async fn read_text(url: &str, response: reqwest::Response) -> Result<String, Error> {
    response.text().await.map_err(|source| Error::Http {
        url: url.to_owned(),
        source
    })
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Retry utilities with exponential backoff for upstream API calls.
//!
//! Only failures classified as transient by [`Error::is_transient`] are
//! retried. A 404 or a malformed payload fails on the first attempt.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Error;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone,)]
pub struct RetryConfig
{
    /// Maximum number of attempts, including the first one (default: 3).
    pub max_attempts:     u32,
    /// Initial delay between retries in milliseconds (default: 1000).
    pub initial_delay_ms: u64,
    /// Multiplier for exponential backoff (default: 2.0).
    pub backoff_factor:   f64,
}

impl Default for RetryConfig
{
    fn default() -> Self
    {
        Self {
            max_attempts: 3, initial_delay_ms: 1000, backoff_factor: 2.0,
        }
    }
}

impl RetryConfig
{
    /// Single attempt, no retries. Used by tests against mock servers.
    pub fn none() -> Self
    {
        Self {
            max_attempts: 1, initial_delay_ms: 0, backoff_factor: 1.0,
        }
    }
}

/// Executes an async operation, retrying transient failures with
/// exponential backoff.
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient error once
/// every attempt has been used.
///
/// # Example
///
/// ```no_run
/// use releasegen::{Error, retry::{RetryConfig, retry_with_backoff}};
///
/// # async fn example() -> Result<(), Error> {
/// let config = RetryConfig::default();
/// let value = retry_with_backoff(&config, "fetch data", || async {
///     Ok::<_, Error,>(42,)
/// },)
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T,>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, Error,>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error,>,>,
{
    let attempts = config.max_attempts.max(1,);
    let mut delay_ms = config.initial_delay_ms;
    let mut attempt = 1;

    loop {
        let error = match f().await {
            Ok(value,) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "request recovered");
                }
                return Ok(value,);
            }
            Err(error,) if !error.is_transient() || attempt >= attempts => return Err(error,),
            Err(error,) => error,
        };

        warn!(
            operation = operation_name,
            attempt,
            attempts,
            %error,
            retry_in_ms = delay_ms,
            "transient failure, retrying"
        );
        sleep(Duration::from_millis(delay_ms,),).await;
        delay_ms = (delay_ms as f64 * config.backoff_factor) as u64;
        attempt += 1;
    }
}

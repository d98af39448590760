//! HTTP access to the upstream data providers.

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::{FailureKind, FetchError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Builds the shared client used by every source.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;

    Ok(client)
}

/// Fetches the body at `url`, returning `None` when the server answers 404.
///
/// Transient failures are retried according to `policy`; anything else is
/// returned on first sight.
pub async fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    policy: RetryPolicy,
) -> Result<Option<String>, FetchError> {
    let mut attempt = 0;

    loop {
        match get_once(client, url, query).await {
            Err(e) if e.kind() == FailureKind::Transient && attempt < policy.retries => {
                let delay = policy.delay(attempt);
                warn!(url, attempt, ?delay, "Transient failure, retrying: {}", e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

async fn get_once(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<Option<String>, FetchError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    debug!(url, %status, "GET");

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }

    Ok(Some(response.text().await?))
}

// -- Tests -------------------------------------------------------------------

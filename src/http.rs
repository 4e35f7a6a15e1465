//! JSON-over-HTTP plumbing shared by the embedding and generation providers.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! With `max_retries = 0` (the default) every failure is terminal.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;
use tracing::warn;

/// Build a client with a per-request timeout.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Strip a trailing slash so paths can be appended with `format!`.
pub fn base_url(configured: Option<&str>, default: &str) -> String {
    configured.unwrap_or(default).trim_end_matches('/').to_string()
}

/// POST `body` as JSON and return the parsed JSON response.
///
/// `request` builds a fresh request for each attempt (headers, query
/// parameters, URL); `service` names the remote for error messages.
pub async fn post_json<F>(
    service: &str,
    max_retries: u32,
    body: &serde_json::Value,
    request: F,
) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            warn!(
                service,
                attempt,
                delay_secs = delay.as_secs(),
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }

        let resp = request()
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| anyhow!("{} returned invalid JSON: {}", service, e))?;
                    return Ok(json);
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = anyhow!("{} API error {}: {}", service, status, body_text.trim());

                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) if e.is_timeout() => {
                last_err = Some(anyhow!("{} request timed out", service));
            }
            Err(e) => {
                last_err = Some(anyhow!("{} connection error: {}", service, e));
            }
        }
    }

    match last_err {
        Some(e) => Err(e),
        None => bail!("{} request failed after retries", service),
    }
}

/// Read a JSON array of numbers as `Vec<f32>`.
pub fn parse_vector(value: &serde_json::Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

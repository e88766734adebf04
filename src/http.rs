//! JSON-over-HTTP calls with retry for the model providers.
//!
//! Retry strategy, shared by the embedding and generation backends:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Build a client with the given request timeout.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// POST `body` to `url` and return the decoded JSON response.
///
/// `service` names the backend in error messages (e.g. `"Ollama"`).
/// `bearer` adds an `Authorization: Bearer` header when set.
pub async fn post_json_with_retry(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            debug!(service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    warn!(service, %status, "transient API error");
                    last_err = Some(anyhow!("{} API error {}: {}", service, status, body_text));
                    continue;
                }

                bail!("{} API error {}: {}", service, status, body_text);
            }
            Err(e) => {
                warn!(service, error = %e, "connection error");
                last_err = Some(anyhow!(
                    "{} connection error (is it running at {}?): {}",
                    service,
                    url,
                    e
                ));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", service)))
}

/// Read a JSON array of numbers as an `f32` vector.
pub fn parse_vector(value: &serde_json::Value, what: &str) -> Result<Vec<f32>> {
    Ok(value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid {} response: embedding is not an array", what))?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

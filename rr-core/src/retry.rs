//! Bounded retry with exponential backoff for the ingestion fetchers.

use serde::Deserialize;

#[cfg(feature = "api")]
use crate::error::RiverError;
#[cfg(feature = "api")]
use log::{info, warn};
#[cfg(feature = "api")]
use reqwest::{Client, StatusCode};

/// How many times to try a request and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_tries: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Milliseconds to sleep after the failed `attempt` (1-based); doubles
    /// each time.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let doublings = attempt.saturating_sub(1).min(20);
        self.initial_backoff_ms.saturating_mul(1u64 << doublings)
    }
}

/// GET `url` with `query` and return the body, retrying on transport
/// errors, non-200 statuses and empty bodies.
///
/// Gives up with [`RiverError::RetriesExhausted`] after `policy.max_tries`
/// attempts.
#[cfg(feature = "api")]
pub async fn get_text_with_retry(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
    label: &str,
) -> Result<String, RiverError> {
    let max_tries = policy.max_tries.max(1);

    for attempt in 1..=max_tries {
        match client.get(url).query(query).send().await {
            Ok(response) => {
                if response.status() != StatusCode::OK {
                    warn!(
                        "Attempt {}/{}: Bad response status for {}: {}",
                        attempt,
                        max_tries,
                        label,
                        response.status()
                    );
                } else {
                    match response.text().await {
                        Ok(body) if body.trim().len() > 2 => return Ok(body),
                        Ok(_) => {
                            warn!("Attempt {}/{}: Empty response for {}", attempt, max_tries, label);
                        }
                        Err(e) => {
                            warn!(
                                "Attempt {}/{}: Failed to read response body for {}: {}",
                                attempt, max_tries, label, e
                            );
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Attempt {}/{}: Request failed for {}: {}", attempt, max_tries, label, e);
            }
        }

        if attempt < max_tries {
            let sleep_millis = policy.backoff_ms(attempt);
            info!("Sleeping for {} milliseconds before retry for {}", sleep_millis, label);
            tokio::time::sleep(std::time::Duration::from_millis(sleep_millis)).await;
        }
    }

    warn!("All attempts failed for {}", label);
    Err(RiverError::RetriesExhausted {
        target: label.to_string(),
        attempts: max_tries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ms(1), 1000);
        assert_eq!(policy.backoff_ms(2), 2000);
        assert_eq!(policy.backoff_ms(3), 4000);
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy {
            max_tries: 100,
            initial_backoff_ms: u64::MAX / 2,
        };
        assert_eq!(policy.backoff_ms(50), u64::MAX);
    }

    #[cfg(feature = "api")]
    #[tokio::test]
    async fn test_unreachable_host_exhausts_retries() {
        let client = Client::new();
        let policy = RetryPolicy {
            max_tries: 2,
            initial_backoff_ms: 1,
        };
        let result = get_text_with_retry(&client, "http://127.0.0.1:9/", &[], &policy, "discard").await;
        match result {
            Err(RiverError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }
}

//! Blocking HTTP client with retry and error classification.

use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::FetchError;
use crate::extract::parse_json_body;

pub const USER_AGENT: &str = concat!("policyfeed/", env!("CARGO_PKG_VERSION"));

/// Fixed-backoff retry. `attempts` counts the first try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(400),
        }
    }
}

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// - 4xx other than 429: fail immediately, retrying cannot help.
/// - 429, 5xx, network/timeout, unreadable or non-JSON body: retry.
pub struct HttpFetcher {
    http: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { http, retry })
    }

    /// GET `url` and parse the body as JSON, retrying per the policy.
    pub fn get_json(&self, source_id: &str, url: &Url) -> Result<Value, FetchError> {
        let attempts = self.retry.attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.try_once(source_id, url, attempts) {
                Ok(body) => return Ok(body),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    if attempt < attempts {
                        warn!(
                            source_id,
                            attempt,
                            max_attempts = attempts,
                            error = %e,
                            "retrying request"
                        );
                        thread::sleep(self.retry.backoff);
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Network {
            source_id: source_id.to_string(),
            attempts,
            message: "no attempt made".into(),
        }))
    }

    fn try_once(&self, source_id: &str, url: &Url, attempts: u32) -> Result<Value, Attempt> {
        let resp = self.http.get(url.as_str()).send().map_err(|e| {
            Attempt::Retry(FetchError::Network {
                source_id: source_id.to_string(),
                attempts,
                message: e.to_string(),
            })
        })?;

        let status = resp.status().as_u16();
        if (400..500).contains(&status) && status != 429 {
            return Err(Attempt::Fatal(FetchError::Rejected {
                source_id: source_id.to_string(),
                status,
            }));
        }
        if status == 429 || status >= 500 {
            return Err(Attempt::Retry(FetchError::Upstream {
                source_id: source_id.to_string(),
                status,
                attempts,
            }));
        }

        let text = resp.text().map_err(|e| {
            Attempt::Retry(FetchError::Network {
                source_id: source_id.to_string(),
                attempts,
                message: format!("failed to read response body: {e}"),
            })
        })?;

        parse_json_body(&text).map_err(|e| {
            let trimmed = text.trim_start_matches('\u{feff}');
            let preview: String = trimmed.chars().take(200).collect();
            Attempt::Retry(FetchError::Parse {
                source_id: source_id.to_string(),
                message: format!("{e} (body: {preview})"),
            })
        })
    }
}

enum Attempt {
    Retry(FetchError),
    Fatal(FetchError),
}

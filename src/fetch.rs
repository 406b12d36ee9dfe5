//! Schema retrieval transport.
//!
//! Loaders build URLs; a [`SchemaFetcher`] turns a URL into text. The default
//! fetcher is a blocking HTTP client with a bounded per-request timeout, so a
//! stuck fetch blocks at most that long per attempt.

use crate::config::Config;
use crate::error::FetchError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Timeout applied to each HTTP attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Branches tried, in order, for GitHub raw-content URLs.
pub const GITHUB_BRANCHES: [&str; 2] = ["main", "master"];

/// Fetches the body of a URL. Anything but a successful response is an error.
pub trait SchemaFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Raw-content URL for a file in a GitHub repository.
pub fn github_raw_url(user: &str, repo: &str, branch: &str, path: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{}",
        user,
        repo,
        branch,
        path.trim_start_matches('/')
    )
}

/// The configured fetcher, or the HTTP fetcher when none is configured.
pub fn resolve_fetcher(config: &Config) -> Result<Arc<dyn SchemaFetcher>, FetchError> {
    if let Some(fetcher) = &config.fetcher {
        return Ok(Arc::clone(fetcher));
    }
    default_fetcher()
}

#[cfg(feature = "http-fetch")]
fn default_fetcher() -> Result<Arc<dyn SchemaFetcher>, FetchError> {
    Ok(Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT)?))
}

#[cfg(not(feature = "http-fetch"))]
fn default_fetcher() -> Result<Arc<dyn SchemaFetcher>, FetchError> {
    Err(FetchError::Unavailable(
        "built without the http-fetch feature and no fetcher configured".to_string(),
    ))
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

/// Blocking HTTP fetcher.
#[cfg(feature = "http-fetch")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http-fetch")]
impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpFetcher { client })
    }
}

#[cfg(feature = "http-fetch")]
impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url, "fetching schema");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(|e| FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

// ─── In-memory ───────────────────────────────────────────────────────────────

/// Serves fixed bodies by exact URL and records every request.
///
/// Useful for offline schema mirrors and for tests.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        StaticFetcher::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SchemaFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

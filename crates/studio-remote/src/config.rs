//! Backend connection settings.

use log::warn;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3002";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the Layer Studio backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL without the `/api/v1` suffix or a trailing slash.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RemoteConfig {
    /// Load from the process environment after reading a `.env` file, if
    /// one exists.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `STUDIO_API_URL`          | `http://localhost:3002` |
    /// | `STUDIO_API_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("STUDIO_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup("STUDIO_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("STUDIO_API_TIMEOUT_SECS={raw:?} is not a number; using {DEFAULT_TIMEOUT_SECS}");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

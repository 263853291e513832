//! Portal connection settings, read from the environment.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::sync::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://web.spaggiari.eu/rest/v1";
pub const DEFAULT_API_KEY: &str = "Tg1NWEwNGIgIC0K";
pub const DEFAULT_USER_AGENT: &str = "CVVS/std/4.2.3 Android/12";

#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl PortalConfig {
    /// Reads overrides from the process environment.
    ///
    /// | Variable                      | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `CLASSEVIVA_BASE_URL`         | Spaggiari REST v1       |
    /// | `CLASSEVIVA_API_KEY`          | public app key          |
    /// | `CLASSEVIVA_USER_AGENT`       | Android app UA          |
    /// | `CLASSEVIVA_TIMEOUT_SECS`     | 30                      |
    /// | `CLASSEVIVA_RETRY_ATTEMPTS`   | 3                       |
    /// | `CLASSEVIVA_RETRY_BACKOFF_MS` | 500                     |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("CLASSEVIVA_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("CLASSEVIVA_API_KEY") {
            config.api_key = key;
        }
        if let Some(ua) = lookup("CLASSEVIVA_USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(secs) = lookup("CLASSEVIVA_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("CLASSEVIVA_TIMEOUT_SECS is not a number: '{secs}'"))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = lookup("CLASSEVIVA_RETRY_ATTEMPTS") {
            let attempts: u32 = attempts.parse().with_context(|| {
                format!("CLASSEVIVA_RETRY_ATTEMPTS is not a number: '{attempts}'")
            })?;
            anyhow::ensure!(attempts > 0, "CLASSEVIVA_RETRY_ATTEMPTS must be at least 1");
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = lookup("CLASSEVIVA_RETRY_BACKOFF_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("CLASSEVIVA_RETRY_BACKOFF_MS is not a number: '{ms}'"))?;
            config.retry.backoff = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

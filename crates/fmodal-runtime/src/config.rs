#![forbid(unsafe_code)]

//! Registry configuration.
//!
//! The only tunable is the grace delay between a modal's logical close and
//! its eviction from the registry. The value is not a contract: it exists to
//! let an exit animation finish before the content is dropped.

use std::env;
use web_time::Duration;

/// Environment variable overriding the grace delay, in milliseconds.
pub const GRACE_DELAY_ENV: &str = "FMODAL_GRACE_DELAY_MS";

/// Default grace delay.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_millis(500);

/// Configuration for a modal registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Wait between `is_open` becoming false and the record being evicted.
    pub grace_delay: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            grace_delay: DEFAULT_GRACE_DELAY,
        }
    }
}

impl RegistryConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with environment overrides applied.
    ///
    /// Honors [`GRACE_DELAY_ENV`]; blank or unparsable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let raw = env::var(GRACE_DELAY_ENV).ok();
        Self::default().with_env_grace_delay(raw.as_deref())
    }

    /// Set the grace delay.
    #[must_use]
    pub fn grace_delay(mut self, delay: Duration) -> Self {
        self.grace_delay = delay;
        self
    }

    fn with_env_grace_delay(mut self, raw: Option<&str>) -> Self {
        if let Some(delay) = raw.and_then(parse_grace_delay) {
            self.grace_delay = delay;
        } else if let Some(raw) = raw.filter(|r| !r.trim().is_empty()) {
            tracing::warn!(
                var = GRACE_DELAY_ENV,
                value = raw,
                "ignoring invalid grace delay override"
            );
        }
        self
    }
}

fn parse_grace_delay(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<u64>().ok().map(Duration::from_millis)
}

//! Session-wide tunables for the bundled HTTP backend.
//!
//! The resolver algorithm itself (`channel-resolver`) has no configuration
//! surface — arbitration is deterministic. These knobs only affect how the
//! concrete `channel-maven` backend talks to repositories.

use std::time::Duration;

/// Network and concurrency tunables, overridable via environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of artifact/metadata requests in flight at once.
    pub max_concurrent_fetches: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Number of retry attempts for transient network failures.
    pub retry_attempts: u32,
    /// Base delay between retries; attempt `n` waits `base * n`.
    pub retry_base_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            request_timeout: Duration::from_secs(120),
            retry_attempts: 3,
            retry_base_delay: Duration::from_secs(2),
        }
    }
}

impl ResolverConfig {
    /// Build a config from defaults, overridden by `KARGO_CHANNEL_*` env vars.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_usize("KARGO_CHANNEL_MAX_CONCURRENT_FETCHES") {
            config.max_concurrent_fetches = v;
        }
        if let Some(v) = env_u64("KARGO_CHANNEL_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u32("KARGO_CHANNEL_RETRY_ATTEMPTS") {
            config.retry_attempts = v;
        }

        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        std::env::remove_var("KARGO_CHANNEL_MAX_CONCURRENT_FETCHES");
        let config = ResolverConfig::from_env();
        assert_eq!(config.max_concurrent_fetches, 8);
    }
}

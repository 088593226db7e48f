//! Control-plane configuration
//!
//! Loaded from `FEDERATION_*` environment variables by the binary; tests
//! construct it directly.

use std::env;
use std::time::Duration;

/// Configuration recognised by the control plane.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// This cluster's own domain name.
    pub cluster_name: String,
    /// Skip TLS verification on the validation RPC client. A prominent
    /// warning is logged on every call made in this mode.
    pub insecure_dev_mode: bool,
    /// Cipher suites enforced on the RPC client's TLS configuration;
    /// empty means the platform defaults.
    pub cipher_suites: Vec<String>,
    /// URL path prefix of the validation endpoint.
    pub api_version: String,
    /// Grace window before a persistent orphan-authority suspect is
    /// deleted. Should span a descriptor edit plus an ensure cycle.
    pub orphan_after: Duration,
    /// Cadence of the periodic ensure/collect cycle.
    pub ensure_interval: Duration,
    /// Together with `keep_alive_interval`, defines the remote-cluster
    /// offline threshold.
    pub keep_alive_count_max: u32,
    pub keep_alive_interval: Duration,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            cluster_name: String::new(),
            insecure_dev_mode: false,
            cipher_suites: Vec::new(),
            api_version: "v1".into(),
            orphan_after: Duration::from_secs(600),
            ensure_interval: Duration::from_secs(180),
            keep_alive_count_max: 3,
            keep_alive_interval: Duration::from_secs(300),
        }
    }
}

impl TrustConfig {
    /// Build configuration from `FEDERATION_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env(cluster_name: String) -> Self {
        let defaults = Self::default();

        let secs = |var: &str, fallback: Duration| {
            env::var(var)
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            cluster_name,
            insecure_dev_mode: env::var("FEDERATION_INSECURE_DEV_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cipher_suites: env::var("FEDERATION_CIPHER_SUITES")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            api_version: env::var("FEDERATION_API_VERSION")
                .unwrap_or_else(|_| defaults.api_version.clone()),
            orphan_after: secs("FEDERATION_ORPHAN_AFTER_SECS", defaults.orphan_after),
            ensure_interval: secs("FEDERATION_ENSURE_INTERVAL_SECS", defaults.ensure_interval),
            keep_alive_count_max: env::var("FEDERATION_KEEP_ALIVE_COUNT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.keep_alive_count_max),
            keep_alive_interval: secs(
                "FEDERATION_KEEP_ALIVE_INTERVAL_SECS",
                defaults.keep_alive_interval,
            ),
        }
    }

    /// The offline threshold for remote-cluster status: a connection whose
    /// last heartbeat is older than this is considered offline.
    pub fn offline_threshold(&self) -> Duration {
        self.keep_alive_interval * self.keep_alive_count_max
    }
}

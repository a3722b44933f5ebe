//! Configuration Module - TOML-based Catcher Configuration
//!
//! Loads and validates configuration from `config.toml`. Contract
//! addresses and network endpoints live here; secrets (the signer's
//! private key) come only from the environment.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::usecases::{CatchSettings, RetryPolicy};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppSection,
    /// RPC endpoint and expected chain.
    pub network: NetworkConfig,
    /// Deployed contract addresses.
    pub contracts: ContractConfig,
    /// Catch workflow deadlines and polling budget.
    #[serde(default)]
    pub catch: CatchConfig,
}

/// Application identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// Human-readable name for logs.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, colored.
    Pretty,
}

/// Network configuration.
///
/// `rpc_url` may be omitted for networks with a built-in default
/// endpoint (`amoy`, `sepolia`). The `RPC_URL` environment variable
/// overrides either.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Network name (amoy, sepolia, localhost, ...).
    pub name: String,
    /// JSON-RPC endpoint (http(s) or ws(s)).
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Expected chain id, checked at startup when set.
    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl NetworkConfig {
    /// Configured endpoint, falling back to the network's public default.
    pub fn resolved_rpc_url(&self) -> Option<String> {
        self
            .rpc_url
            .clone()
            .or_else(|| default_rpc_url(&self.name).map(str::to_string))
    }
}

/// Public endpoints for known networks.
pub fn default_rpc_url(network: &str) -> Option<&'static str> {
    match network {
        "amoy" => Some("https://rpc-amoy.polygon.technology"),
        "sepolia" => Some("https://gateway.tenderly.co/public/sepolia"),
        "localhost" => Some("http://127.0.0.1:8545"),
        _ => None,
    }
}

/// Deployed contract addresses.
///
/// Contract addresses are ALWAYS in config - never hardcoded.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// `BugMinter` proxy address.
    pub bug_minter: String,
    /// `TheBugs` proxy address; resolved via `BugMinter.theBugs()` if absent.
    #[serde(default)]
    pub the_bugs: Option<String>,
}

/// Catch workflow timing.
#[derive(Debug, Clone, Deserialize)]
pub struct CatchConfig {
    /// Max wait for a transaction receipt (seconds).
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
    /// Max wait for `CatchInitiated` (seconds).
    #[serde(default = "default_event_timeout")]
    pub initiation_timeout_secs: u64,
    /// Max wait for the mint `Transfer` (seconds).
    #[serde(default = "default_event_timeout")]
    pub completion_timeout_secs: u64,
    /// Reads of the in-flight token id before giving up.
    #[serde(default = "default_identifier_attempts")]
    pub identifier_max_attempts: u32,
    /// Delay between in-flight token id reads (milliseconds).
    #[serde(default = "default_identifier_interval")]
    pub identifier_poll_interval_ms: u64,
    /// Delay growth factor (1.0 = fixed interval).
    #[serde(default = "default_backoff_factor")]
    pub identifier_backoff_factor: f64,
}

impl Default for CatchConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_secs: default_receipt_timeout(),
            initiation_timeout_secs: default_event_timeout(),
            completion_timeout_secs: default_event_timeout(),
            identifier_max_attempts: default_identifier_attempts(),
            identifier_poll_interval_ms: default_identifier_interval(),
            identifier_backoff_factor: default_backoff_factor(),
        }
    }
}

impl CatchConfig {
    /// Convert into orchestrator settings.
    pub fn to_settings(&self) -> CatchSettings {
        let interval = Duration::from_millis(self.identifier_poll_interval_ms);
        #[allow(clippy::float_cmp)]
        let identifier_policy = if self.identifier_backoff_factor == 1.0 {
            RetryPolicy::fixed(self.identifier_max_attempts, interval)
        } else {
            RetryPolicy::exponential(
                self.identifier_max_attempts,
                interval,
                self.identifier_backoff_factor,
                Duration::from_secs(MAX_POLL_INTERVAL_SECS),
            )
        };

        CatchSettings {
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
            initiation_timeout: Duration::from_secs(self.initiation_timeout_secs),
            completion_timeout: Duration::from_secs(self.completion_timeout_secs),
            identifier_policy,
        }
    }
}

/// Upper bound on a single backoff delay.
const MAX_POLL_INTERVAL_SECS: u64 = 10;

// Default value functions for serde

fn default_app_name() -> String {
    "bug-catcher".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_receipt_timeout() -> u64 {
    120
}

fn default_event_timeout() -> u64 {
    60
}

fn default_identifier_attempts() -> u32 {
    20
}

fn default_identifier_interval() -> u64 {
    500
}

fn default_backoff_factor() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::Backoff;

    #[test]
    fn test_default_catch_config_matches_settings() {
        assert_eq!(CatchConfig::default().to_settings(), CatchSettings::default());
    }

    #[test]
    fn test_backoff_factor_selects_exponential() {
        let config = CatchConfig {
            identifier_backoff_factor: 2.0,
            ..CatchConfig::default()
        };
        let policy = config.to_settings().identifier_policy;

        assert_eq!(
            policy.backoff,
            Backoff::Exponential {
                factor: 2.0,
                max_interval: Duration::from_secs(MAX_POLL_INTERVAL_SECS),
            }
        );
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_secs(2));
    }

    #[test]
    fn test_rpc_url_fallback() {
        let mut network = NetworkConfig {
            name: "sepolia".into(),
            rpc_url: None,
            chain_id: None,
        };
        assert_eq!(
            network.resolved_rpc_url().as_deref(),
            Some("https://gateway.tenderly.co/public/sepolia")
        );

        network.rpc_url = Some("http://10.0.0.5:8545".into());
        assert_eq!(network.resolved_rpc_url().as_deref(), Some("http://10.0.0.5:8545"));

        network.name = "mainnet".into();
        network.rpc_url = None;
        assert_eq!(network.resolved_rpc_url(), None);
    }
}

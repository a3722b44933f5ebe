//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages for
//! misconfiguration.

use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable overriding `network.rpc_url`.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    if let Ok(url) = std::env::var(RPC_URL_ENV) {
        if !url.trim().is_empty() {
            config.network.rpc_url = Some(url);
        }
    }

    validate_config(&config)?;

    info!(
        network = %config.network.name,
        bug_minter = %config.contracts.bug_minter,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Parse TOML without environment overrides or validation.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A resolvable RPC endpoint
/// - Well-formed, non-zero contract addresses
/// - Positive deadlines and polling budget
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Network validation
    anyhow::ensure!(
        !config.network.name.is_empty(),
        "network.name must not be empty"
    );
    anyhow::ensure!(
        config.network.resolved_rpc_url().is_some(),
        "network.rpc_url must be set for network '{}' (or export {RPC_URL_ENV})",
        config.network.name
    );

    // Contract validation
    check_address("contracts.bug_minter", &config.contracts.bug_minter)?;
    if let Some(the_bugs) = &config.contracts.the_bugs {
        check_address("contracts.the_bugs", the_bugs)?;
    }

    // Catch timing validation
    let c = &config.catch;
    anyhow::ensure!(
        c.receipt_timeout_secs > 0,
        "catch.receipt_timeout_secs must be positive"
    );
    anyhow::ensure!(
        c.initiation_timeout_secs > 0 && c.completion_timeout_secs > 0,
        "catch event timeouts must be positive"
    );
    anyhow::ensure!(
        c.identifier_max_attempts > 0,
        "catch.identifier_max_attempts must be positive"
    );
    anyhow::ensure!(
        c.identifier_backoff_factor >= 1.0 && c.identifier_backoff_factor.is_finite(),
        "catch.identifier_backoff_factor must be >= 1.0, got {}",
        c.identifier_backoff_factor
    );

    Ok(())
}

fn check_address(field: &str, value: &str) -> Result<Address> {
    let address: Address = value
        .parse()
        .with_context(|| format!("{field} is not a valid address: {value}"))?;
    anyhow::ensure!(!address.is_zero(), "{field} must not be the zero address");
    Ok(address)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::LogFormat;
    use crate::usecases::Backoff;

    const MINIMAL: &str = r#"
        [network]
        name = "amoy"

        [contracts]
        bug_minter = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
    "#;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        validate_config(&config).unwrap();

        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.app.log_format, LogFormat::Json);
        assert_eq!(
            config.network.resolved_rpc_url().as_deref(),
            Some("https://rpc-amoy.polygon.technology")
        );

        let settings = config.catch.to_settings();
        assert_eq!(settings.identifier_policy.max_attempts, 20);
        assert_eq!(settings.identifier_policy.interval, Duration::from_millis(500));
        assert_eq!(settings.identifier_policy.backoff, Backoff::Fixed);
    }

    #[test]
    fn test_unknown_network_requires_rpc_url() {
        let config = parse_config(&MINIMAL.replace("amoy", "mainnet")).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_minter_rejected() {
        let config = parse_config(
            r#"
                [network]
                name = "localhost"
                [contracts]
                bug_minter = "0x0000000000000000000000000000000000000000"
            "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_backoff_factor_builds_exponential_policy() {
        let config = parse_config(&format!(
            "{MINIMAL}\n[catch]\nidentifier_backoff_factor = 2.0\nidentifier_max_attempts = 4\n"
        ))
        .unwrap();
        validate_config(&config).unwrap();

        let policy = config.catch.to_settings().identifier_policy;
        assert_eq!(policy.max_attempts, 4);
        assert!(matches!(policy.backoff, Backoff::Exponential { factor, .. } if factor == 2.0));
    }
}

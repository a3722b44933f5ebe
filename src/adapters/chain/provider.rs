//! RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Builds a signing provider for the configured network, validates the
//! chain id at startup, and exposes a shared type-erased provider for
//! all contract reads, submissions and log filters.
//!
//! `on_builtin` picks the transport from the URL scheme (http, ws,
//! ipc) and yields a `BoxTransport`, so the filler stack can be stored
//! as `dyn Provider`.

use std::str::FromStr;
use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::NetworkConfig;

/// Environment variable holding the signer's hex private key.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Load the catching account's signer from `PRIVATE_KEY`.
///
/// The key is never read from config files and never logged.
pub fn signer_from_env() -> Result<PrivateKeySigner> {
    let key = std::env::var(PRIVATE_KEY_ENV)
        .with_context(|| format!("{PRIVATE_KEY_ENV} not set"))?;
    PrivateKeySigner::from_str(key.trim())
        .with_context(|| format!("Invalid {PRIVATE_KEY_ENV}"))
}

/// Shared signing RPC provider backed by alloy-rs 0.9.
pub struct ChainProvider {
    /// Filler stack (nonce, gas, chain id, wallet) over the RPC transport.
    provider: Arc<dyn Provider + Send + Sync>,
    /// Address of the signing account.
    signer: Address,
    /// Chain id reported by the node.
    chain_id: u64,
}

impl ChainProvider {
    /// Connect to the configured network with `signer` as sender.
    ///
    /// Fails if no RPC URL resolves, the node is unreachable, or the
    /// chain id differs from `network.chain_id` when that is set.
    #[instrument(skip_all, fields(network = %network.name))]
    pub async fn connect(network: &NetworkConfig, signer: PrivateKeySigner) -> Result<Self> {
        let rpc_url = network
            .resolved_rpc_url()
            .with_context(|| format!("No RPC URL for network '{}'", network.name))?;
        let address = signer.address();

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_builtin(&rpc_url)
            .await
            .context("Failed to connect to RPC endpoint")?;

        // Wrap in Arc<dyn Provider> for type erasure
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if let Some(expected) = network.chain_id {
            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected} for network '{}', got {chain_id}",
                network.name
            );
        }

        info!(chain_id, signer = %address, "Connected to RPC");

        Ok(Self {
            provider,
            signer: address,
            chain_id,
        })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider + Send + Sync> {
        Arc::clone(&self.provider)
    }

    /// Address transactions are sent from.
    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}

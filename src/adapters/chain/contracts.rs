//! Catch Contract Bindings - BugMinter and TheBugs
//!
//! `sol!` bindings for the two upgradeable proxies the catch workflow
//! talks to, plus startup resolution and validation of their addresses.
//! The NFT address may be omitted from config; it is then read from
//! `BugMinter.theBugs()`.
//!
//! Calls are ABI-encoded from the generated `*Call` structs and sent as
//! raw `eth_call` / `eth_sendTransaction` requests through the shared
//! `dyn Provider`; returns are decoded with `abi_decode_returns`.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use crate::config::ContractConfig;

sol! {
    /// Catch minter: cooldown bookkeeping and the two-phase catch.
    contract BugMinter {
        /// No catch is in flight for `catcher` (or not readable yet).
        error NoCatchInProgress(address catcher);

        event CatchInitiated(address indexed catcher, uint256 blockNumber);

        function theBugs() external view returns (address);
        function catchCooldown() external view returns (uint256);
        function lastCatchTimestamp(address catcher) external view returns (uint256);
        function inFlightTokenId(address catcher) external view returns (uint256);
        function initiateCatch() external;
        function completeCatch(string calldata name) external;
    }

    /// ERC-721 collection of caught bugs.
    contract TheBugs {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function tokenURI(uint256 tokenId) external view returns (string memory);
    }
}

/// Resolved contract addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchContracts {
    /// `BugMinter` proxy.
    pub bug_minter: Address,
    /// `TheBugs` proxy.
    pub the_bugs: Address,
}

impl CatchContracts {
    /// Parse configured addresses, resolve `TheBugs` if absent, and
    /// validate that both carry deployed code.
    ///
    /// This prevents misconfiguration from silently failing at runtime.
    #[instrument(skip_all)]
    pub async fn resolve(
        provider: Arc<dyn Provider + Send + Sync>,
        config: &ContractConfig,
    ) -> Result<Self> {
        let bug_minter: Address = config
            .bug_minter
            .parse()
            .context("Invalid contracts.bug_minter")?;
        ensure_code(provider.as_ref(), "BugMinter", bug_minter).await?;

        let the_bugs = match &config.the_bugs {
            Some(addr) => addr.parse().context("Invalid contracts.the_bugs")?,
            None => {
                let raw = provider
                    .call(&call_request(bug_minter, &BugMinter::theBugsCall {}))
                    .await
                    .context("BugMinter.theBugs() failed")?;
                let resolved = BugMinter::theBugsCall::abi_decode_returns(&raw, true)
                    .context("BugMinter.theBugs() returned malformed data")?
                    ._0;
                info!(the_bugs = %resolved, "Resolved TheBugs from minter");
                resolved
            }
        };
        ensure_code(provider.as_ref(), "TheBugs", the_bugs).await?;

        Ok(Self {
            bug_minter,
            the_bugs,
        })
    }
}

/// Transaction request carrying `call` to `to`.
pub fn call_request<C: SolCall>(to: Address, call: &C) -> TransactionRequest {
    TransactionRequest::default()
        .to(to)
        .input(Bytes::from(call.abi_encode()).into())
}

async fn ensure_code(
    provider: &(dyn Provider + Send + Sync),
    name: &str,
    address: Address,
) -> Result<()> {
    let code = provider
        .get_code_at(address)
        .await
        .with_context(|| format!("Failed to query code for {name}"))?;

    if code.is_empty() {
        bail!("Contract {name} at {address} has no deployed code (check config.toml)");
    }

    info!(contract = name, address = %address, "Validated on-chain");
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;

    #[test]
    fn test_call_request_encodes_selector_and_args() {
        let minter = Address::repeat_byte(0x11);
        let catcher = Address::repeat_byte(0xaa);
        let tx = call_request(minter, &BugMinter::inFlightTokenIdCall { catcher });

        let input = tx.input.input().unwrap();
        assert_eq!(&input[..4], BugMinter::inFlightTokenIdCall::SELECTOR.as_slice());
        assert_eq!(&input[16..36], catcher.as_slice());
        assert_eq!(tx.to, Some(minter.into()));
    }

    #[test]
    fn test_decode_uint_return() {
        let raw = U256::from(42).to_be_bytes::<32>();
        let decoded = BugMinter::inFlightTokenIdCall::abi_decode_returns(&raw, true).unwrap();
        assert_eq!(decoded._0, U256::from(42));
    }
}

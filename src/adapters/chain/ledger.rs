//! Alloy Ledger - `Ledger` Port over the Catch Contracts
//!
//! Implements reads, submissions and subscriptions against the
//! `BugMinter` / `TheBugs` proxies via alloy-rs 0.9. Calls are raw
//! `eth_call` / `eth_sendTransaction` requests built from the `sol!` call
//! structs. RPC errors are classified into `LedgerError`:
//! - revert data decoding to `NoCatchInProgress` → `NotFound`
//! - a data-less revert of `inFlightTokenId` → `NotFound`
//! - any other revert (simulation or mined with status 0) → `Reverted`
//! - transport failures → `Unavailable` on reads, `Rejected` on submits
//! - a failed receipt wait after broadcast → `Unconfirmed`

use std::sync::Arc;

use alloy::network::ReceiptResponse as _;
use alloy::primitives::{Address, Bytes, U256, hex};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolError};
use alloy::transports::TransportError;
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::domain::catch::{Actor, TokenId};
use crate::domain::event::EventFilter;
use crate::ports::ledger::{
    CatchCall, Ledger, LedgerError, Receipt, Subscription, SubscriptionId, TxRequest,
};

use super::contracts::{BugMinter, CatchContracts, TheBugs, call_request};
use super::provider::ChainProvider;
use super::subscriptions::SubscriptionRegistry;

/// Catch contracts reached through a signing alloy provider.
pub struct AlloyLedger {
    /// Shared provider (type-erased filler stack).
    provider: Arc<dyn Provider + Send + Sync>,
    /// Sender of every submitted transaction.
    signer: Address,
    /// Resolved proxy addresses.
    contracts: CatchContracts,
    /// Live log subscriptions.
    subscriptions: SubscriptionRegistry,
}

impl AlloyLedger {
    /// Bind to already-resolved contracts.
    pub fn new(chain: &ChainProvider, contracts: CatchContracts) -> Self {
        Self {
            provider: chain.inner(),
            signer: chain.signer(),
            contracts,
            subscriptions: SubscriptionRegistry::new(),
        }
    }

    /// Address of the signing account (the only actor this ledger can act for).
    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn contracts(&self) -> CatchContracts {
        self.contracts
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.active()
    }

    /// `eth_call` `call` on `to` and decode its single return value.
    async fn read<C: SolCall>(
        &self,
        to: Address,
        call: C,
        bare_revert: BareRevert,
    ) -> Result<C::Return, LedgerError> {
        let raw = self
            .provider
            .call(&call_request(to, &call))
            .await
            .map_err(|e| classify_read(&e, C::SIGNATURE, bare_revert))?;
        C::abi_decode_returns(&raw, true)
            .map_err(|e| LedgerError::Invalid(format!("{}: malformed return: {e}", C::SIGNATURE)))
    }
}

#[async_trait]
impl Ledger for AlloyLedger {
    #[instrument(skip(self))]
    async fn last_catch_time(&self, actor: Actor) -> Result<u64, LedgerError> {
        let call = BugMinter::lastCatchTimestampCall { catcher: actor };
        let ts = self.read(self.contracts.bug_minter, call, BareRevert::Reverted).await?._0;
        to_u64(ts, "lastCatchTimestamp")
    }

    #[instrument(skip(self))]
    async fn cooldown_duration(&self) -> Result<u64, LedgerError> {
        let call = BugMinter::catchCooldownCall {};
        let cooldown = self.read(self.contracts.bug_minter, call, BareRevert::Reverted).await?._0;
        to_u64(cooldown, "catchCooldown")
    }

    #[instrument(skip(self))]
    async fn balance(&self, actor: Actor) -> Result<U256, LedgerError> {
        self.provider
            .get_balance(actor)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("eth_getBalance: {e}")))
    }

    #[instrument(skip(self, request), fields(call = %request.call))]
    async fn submit(&self, request: &TxRequest) -> Result<Receipt, LedgerError> {
        if request.actor != self.signer {
            return Err(LedgerError::Invalid(format!(
                "actor {} is not the configured signer {}",
                request.actor, self.signer
            )));
        }

        let input = match &request.call {
            CatchCall::Initiate => BugMinter::initiateCatchCall {}.abi_encode(),
            CatchCall::Complete { name } => {
                BugMinter::completeCatchCall { name: name.clone() }.abi_encode()
            }
        };
        let tx = TransactionRequest::default()
            .from(self.signer)
            .to(self.contracts.bug_minter)
            .input(Bytes::from(input).into());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_submit(&e, &request.call))?;
        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "Transaction sent, awaiting receipt");

        let receipt = pending.get_receipt().await.map_err(|e| {
            warn!(tx_hash = %tx_hash, error = %e, "Receipt wait failed after broadcast");
            LedgerError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            }
        })?;

        if !receipt.status() {
            warn!(tx_hash = %tx_hash, "Transaction mined but reverted");
            return Err(LedgerError::Reverted(format!(
                "{} ({tx_hash}) mined with status 0",
                request.call
            )));
        }

        Ok(Receipt {
            tx_hash,
            block_number: receipt.block_number().unwrap_or_default(),
            gas_used: receipt.gas_used(),
        })
    }

    async fn subscribe(&self, filter: &EventFilter) -> Result<Subscription, LedgerError> {
        self.subscriptions
            .open(Arc::clone(&self.provider), self.contracts, filter)
            .await
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.close(id);
    }

    #[instrument(skip(self))]
    async fn in_flight_token_id(&self, actor: Actor) -> Result<TokenId, LedgerError> {
        let call = BugMinter::inFlightTokenIdCall { catcher: actor };
        let token_id = self.read(self.contracts.bug_minter, call, BareRevert::Absent).await?._0;
        debug!(token_id = %token_id, "In-flight token id read");
        Ok(token_id)
    }

    #[instrument(skip(self))]
    async fn token_uri(&self, token_id: TokenId) -> Result<String, LedgerError> {
        let call = TheBugs::tokenURICall { tokenId: token_id };
        Ok(self.read(self.contracts.the_bugs, call, BareRevert::Reverted).await?._0)
    }
}

fn to_u64(value: U256, what: &str) -> Result<u64, LedgerError> {
    u64::try_from(value).map_err(|_| LedgerError::Invalid(format!("{what} out of range: {value}")))
}

/// How a read treats a revert that carries no decodable data.
///
/// Some nodes strip custom-error data from `eth_call` failures. For
/// `inFlightTokenId` the only revert the minter raises is
/// `NoCatchInProgress`, so a bare revert there means "not yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BareRevert {
    Absent,
    Reverted,
}

#[derive(Debug, PartialEq, Eq)]
enum Revert {
    NoCatchInProgress,
    Data(Bytes),
    Bare(String),
}

/// Revert carried by a JSON-RPC error response, if any.
fn revert_of(err: &TransportError) -> Option<Revert> {
    let payload = err.as_error_resp()?;

    if let Some(data) = payload.as_revert_data().filter(|d| !d.is_empty()) {
        if BugMinter::NoCatchInProgress::abi_decode(&data, true).is_ok() {
            return Some(Revert::NoCatchInProgress);
        }
        return Some(Revert::Data(data));
    }

    payload
        .message
        .to_ascii_lowercase()
        .contains("revert")
        .then(|| Revert::Bare(payload.message.to_string()))
}

fn classify_read(err: &TransportError, what: &str, bare_revert: BareRevert) -> LedgerError {
    match revert_of(err) {
        Some(Revert::NoCatchInProgress) => LedgerError::NotFound(format!("{what}: no catch in progress")),
        Some(Revert::Data(data)) => LedgerError::Reverted(format!("{what}: revert data 0x{}", hex::encode(&data))),
        Some(Revert::Bare(message)) => match bare_revert {
            BareRevert::Absent => LedgerError::NotFound(format!("{what}: {message}")),
            BareRevert::Reverted => LedgerError::Reverted(format!("{what}: {message}")),
        },
        None => LedgerError::Unavailable(format!("{what}: {err}")),
    }
}

fn classify_submit(err: &TransportError, call: &CatchCall) -> LedgerError {
    match revert_of(err) {
        Some(Revert::NoCatchInProgress) => LedgerError::Reverted(format!("{call}: no catch in progress")),
        Some(Revert::Data(data)) => LedgerError::Reverted(format!("{call}: revert data 0x{}", hex::encode(&data))),
        Some(Revert::Bare(message)) => LedgerError::Reverted(format!("{call}: {message}")),
        None => LedgerError::Rejected(format!("{call}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use alloy::transports::{RpcError, TransportErrorKind};

    use super::*;

    const IN_FLIGHT: &str = "inFlightTokenId(address)";

    /// JSON-RPC error response as a node would return it.
    fn rpc_error(code: i64, message: &str, data: Option<String>) -> TransportError {
        let data = data.map(|d| format!(r#","data":"{d}""#)).unwrap_or_default();
        let json = format!(r#"{{"code":{code},"message":"{message}"{data}}}"#);
        RpcError::err_resp(serde_json::from_str(&json).unwrap())
    }

    fn no_catch_in_progress(catcher: Address) -> String {
        format!("0x{}", hex::encode(BugMinter::NoCatchInProgress { catcher }.abi_encode()))
    }

    #[test]
    fn test_no_catch_in_progress_selector_is_not_found() {
        let err = rpc_error(3, "execution reverted", Some(no_catch_in_progress(Address::repeat_byte(0xaa))));

        assert_eq!(revert_of(&err), Some(Revert::NoCatchInProgress));
        let classified = classify_read(&err, IN_FLIGHT, BareRevert::Absent);
        assert!(classified.is_not_found(), "got {classified:?}");
        // Same selector on another read is still "not there".
        assert!(classify_read(&err, "tokenURI(uint256)", BareRevert::Reverted).is_not_found());
    }

    #[test]
    fn test_other_revert_data_is_reverted() {
        let err = rpc_error(3, "execution reverted", Some("0xdeadbeef".into()));

        assert_eq!(revert_of(&err), Some(Revert::Data(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))));
        match classify_read(&err, IN_FLIGHT, BareRevert::Absent) {
            LedgerError::Reverted(msg) => assert!(msg.contains("0xdeadbeef"), "{msg}"),
            other => panic!("expected Reverted, got {other:?}"),
        }
    }

    #[test]
    fn test_dataless_revert_of_in_flight_read_is_not_found() {
        let err = rpc_error(-32000, "execution reverted", None);

        assert_eq!(revert_of(&err), Some(Revert::Bare("execution reverted".into())));
        assert!(classify_read(&err, IN_FLIGHT, BareRevert::Absent).is_not_found());
    }

    #[test]
    fn test_dataless_revert_of_other_read_is_reverted() {
        let err = rpc_error(-32000, "execution reverted", Some("0x".into()));

        assert!(matches!(
            classify_read(&err, "lastCatchTimestamp(address)", BareRevert::Reverted),
            LedgerError::Reverted(_)
        ));
    }

    #[test]
    fn test_non_revert_error_is_unavailable_on_read() {
        let err = rpc_error(-32005, "limit exceeded", None);

        assert_eq!(revert_of(&err), None);
        assert!(matches!(
            classify_read(&err, IN_FLIGHT, BareRevert::Absent),
            LedgerError::Unavailable(_)
        ));
    }

    #[test]
    fn test_transport_failure_is_unavailable_on_read() {
        let err = TransportErrorKind::backend_gone();

        assert_eq!(revert_of(&err), None);
        assert!(matches!(
            classify_read(&err, IN_FLIGHT, BareRevert::Absent),
            LedgerError::Unavailable(_)
        ));
    }

    #[test]
    fn test_submit_classification() {
        let initiate = CatchCall::Initiate;

        let refused = rpc_error(-32000, "nonce too low", None);
        assert!(matches!(classify_submit(&refused, &initiate), LedgerError::Rejected(_)));

        let cooling = rpc_error(3, "execution reverted", Some("0x12345678".into()));
        assert!(matches!(classify_submit(&cooling, &initiate), LedgerError::Reverted(_)));

        let complete = CatchCall::Complete { name: "x".into() };
        let nothing = rpc_error(3, "execution reverted", Some(no_catch_in_progress(Address::ZERO)));
        assert_eq!(
            classify_submit(&nothing, &complete),
            LedgerError::Reverted("completeCatch: no catch in progress".into())
        );
    }

    #[test]
    fn test_to_u64_out_of_range() {
        assert_eq!(to_u64(U256::from(7), "x"), Ok(7));
        assert!(matches!(to_u64(U256::MAX, "x"), Err(LedgerError::Invalid(_))));
    }
}

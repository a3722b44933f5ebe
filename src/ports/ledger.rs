//! Ledger Port - Narrow Interface to the Catch Contracts
//!
//! Defines the only operations the catch workflow needs from the
//! blockchain: a handful of reads, transaction submission with receipt
//! wait, and filtered event subscriptions. Adapters (alloy-rs, test
//! fakes) implement this trait.

use std::fmt;
use std::pin::Pin;

use alloy::primitives::{TxHash, U256};
use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use crate::domain::catch::{Actor, TokenId};
use crate::domain::event::{EventFilter, LedgerEvent};

/// Failure reported by a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The queried value does not exist (yet).
    #[error("not found: {0}")]
    NotFound(String),
    /// Refused before inclusion (nonce, signature, funds, RPC refusal).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Included or simulated, but execution reverted.
    #[error("reverted: {0}")]
    Reverted(String),
    /// Transport or node failure.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    /// Broadcast, but its receipt could not be obtained. The transaction
    /// may still be mined.
    #[error("unconfirmed: {tx_hash} broadcast but receipt unavailable: {reason}")]
    Unconfirmed { tx_hash: TxHash, reason: String },
    /// Malformed request (e.g. actor does not match the signer).
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl LedgerError {
    /// Whether the failure means "not there yet" rather than "broken".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// State-changing call on the minter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchCall {
    /// `BugMinter.initiateCatch()`
    Initiate,
    /// `BugMinter.completeCatch(name)`
    Complete { name: String },
}

impl fmt::Display for CatchCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiate => write!(f, "initiateCatch"),
            Self::Complete { .. } => write!(f, "completeCatch"),
        }
    }
}

/// Request descriptor handed to [`Ledger::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Account the transaction is sent from.
    pub actor: Actor,
    /// Remote operation and its arguments.
    pub call: CatchCall,
}

impl TxRequest {
    pub fn initiate(actor: Actor) -> Self {
        Self {
            actor,
            call: CatchCall::Initiate,
        }
    }

    pub fn complete(actor: Actor, name: impl Into<String>) -> Self {
        Self {
            actor,
            call: CatchCall::Complete { name: name.into() },
        }
    }
}

/// Inclusion proof for a submitted transaction.
///
/// Says nothing about business-level success beyond "did not revert".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Identifier of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Boxed event stream yielded by a subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = LedgerEvent> + Send>>;

/// A registered event subscription.
///
/// The ledger keeps resources alive until [`Ledger::unsubscribe`] is
/// called with `id`.
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: EventStream,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Trait for the catch contracts' ledger.
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
    /// `lastCatchTimestamp(actor)` in unix seconds (0 if never caught).
    async fn last_catch_time(&self, actor: Actor) -> Result<u64, LedgerError>;

    /// Cooldown between catch initiations, in seconds.
    async fn cooldown_duration(&self) -> Result<u64, LedgerError>;

    /// Native balance of `actor` in wei.
    async fn balance(&self, actor: Actor) -> Result<U256, LedgerError>;

    /// Send `request` and wait until it is mined.
    ///
    /// # Errors
    /// `Rejected` if refused before inclusion, `Reverted` if execution
    /// failed, `Unconfirmed` if broadcast but the receipt wait failed.
    async fn submit(&self, request: &TxRequest) -> Result<Receipt, LedgerError>;

    /// Register a subscription for events matching `filter`.
    async fn subscribe(&self, filter: &EventFilter) -> Result<Subscription, LedgerError>;

    /// Release a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Token id of the actor's in-flight catch.
    ///
    /// `NotFound` while no catch is in flight or before the id is
    /// queryable.
    async fn in_flight_token_id(&self, actor: Actor) -> Result<TokenId, LedgerError>;

    /// `tokenURI(token_id)` on the NFT contract.
    async fn token_uri(&self, token_id: TokenId) -> Result<String, LedgerError>;
}

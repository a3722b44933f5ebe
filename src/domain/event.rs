//! Ledger events and exact-match filters.
//!
//! The ledger may redeliver an event, so consumers key on content:
//! a filter matches an event by name and indexed fields, never by
//! delivery count.

use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::catch::{Actor, TokenId};

/// Events the catch workflow listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// `BugMinter.CatchInitiated(address indexed catcher, uint256 blockNumber)`
    CatchInitiated,
    /// `TheBugs.Transfer(address indexed from, address indexed to, uint256 indexed tokenId)`
    Transfer,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatchInitiated => write!(f, "CatchInitiated"),
            Self::Transfer => write!(f, "Transfer"),
        }
    }
}

/// Decoded ledger notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    CatchInitiated {
        catcher: Actor,
        block_number: u64,
    },
    Transfer {
        from: Address,
        to: Address,
        token_id: TokenId,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CatchInitiated { .. } => EventKind::CatchInitiated,
            Self::Transfer { .. } => EventKind::Transfer,
        }
    }
}

/// Exact-match filter over an event's indexed fields.
///
/// `None` fields are wildcards. `catcher` applies to `CatchInitiated`;
/// `from`, `to` and `token_id` apply to `Transfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: EventKind,
    pub catcher: Option<Actor>,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub token_id: Option<TokenId>,
    /// First block to include; earlier history is not replayed.
    pub from_block: Option<u64>,
}

impl EventFilter {
    /// `CatchInitiated` for one catcher.
    pub fn catch_initiated(catcher: Actor) -> Self {
        Self {
            kind: EventKind::CatchInitiated,
            catcher: Some(catcher),
            from: None,
            to: None,
            token_id: None,
            from_block: None,
        }
    }

    /// Mint `Transfer(zero, to, token_id)`.
    pub fn mint(to: Address, token_id: TokenId) -> Self {
        Self {
            kind: EventKind::Transfer,
            catcher: None,
            from: Some(Address::ZERO),
            to: Some(to),
            token_id: Some(token_id),
            from_block: None,
        }
    }

    /// Replay history starting at `block`.
    pub fn since_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    /// Whether `event` satisfies every constrained field.
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        fn field<T: PartialEq>(want: Option<T>, got: T) -> bool {
            want.is_none_or(|w| w == got)
        }

        match *event {
            LedgerEvent::CatchInitiated { catcher, .. } => {
                self.kind == EventKind::CatchInitiated && field(self.catcher, catcher)
            }
            LedgerEvent::Transfer { from, to, token_id } => {
                self.kind == EventKind::Transfer
                    && field(self.from, from)
                    && field(self.to, to)
                    && field(self.token_id, token_id)
            }
        }
    }
}

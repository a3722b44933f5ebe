//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `Ledger`: Catch contract reads, submissions and event subscriptions

pub mod ledger;

pub use ledger::{
    CatchCall, EventStream, Ledger, LedgerError, Receipt, Subscription, SubscriptionId, TxRequest,
};

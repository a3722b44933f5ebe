//! Chain Adapters - Blockchain Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management with signer and chain id validation
//! - `sol!` bindings for the catch contracts and address resolution
//! - The `Ledger` port implementation
//! - Filtered log subscriptions with explicit teardown

pub mod contracts;
pub mod ledger;
pub mod provider;
pub mod subscriptions;

pub use contracts::CatchContracts;
pub use ledger::AlloyLedger;
pub use provider::{ChainProvider, signer_from_env};
pub use subscriptions::SubscriptionRegistry;

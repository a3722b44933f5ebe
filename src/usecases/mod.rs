//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with the ledger port to implement the
//! catch workflow. Each component is usable on its own.
//!
//! Use cases:
//! - `CooldownGate`: Seconds until an actor may catch again
//! - `FundsPrecheck`: Advisory balance read before paying fees
//! - `TransactionSubmitter`: Submit and wait for inclusion
//! - `EventWaiter`: One-shot filtered event wait with scoped cleanup
//! - `IdentifierPoller`: Bounded polling for the in-flight token id
//! - `CatchOrchestrator`: The full two-phase catch
//! - `retry`: Bounded retry combinator shared by the pollers

pub mod catch_orchestrator;
pub mod cooldown_gate;
pub mod event_waiter;
pub mod funds_precheck;
pub mod identifier_poller;
pub mod retry;
pub mod submitter;

pub use catch_orchestrator::{CatchOrchestrator, CatchSettings, CatchStatus};
pub use cooldown_gate::{Clock, CooldownGate, SystemClock};
pub use event_waiter::{EventWaiter, ScopedSubscription};
pub use funds_precheck::{FundsPrecheck, FundsStatus};
pub use identifier_poller::IdentifierPoller;
pub use retry::{Backoff, RetryError, RetryPolicy, retry_when};
pub use submitter::TransactionSubmitter;

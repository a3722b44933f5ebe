//! Domain layer - Catch workflow types and pure logic.
//!
//! No I/O here (hexagonal architecture inner ring). Everything in this
//! module is testable in isolation.

pub mod catch;
pub mod cooldown;
pub mod error;
pub mod event;

// Re-export core types for convenience
pub use catch::{
    Actor, CatchAttempt, CatchFailure, CatchPhase, CatchResult, PhaseError, TokenId,
};
pub use error::CatchError;
pub use event::{EventFilter, EventKind, LedgerEvent};

//! Catch attempt domain types.
//!
//! A `CatchAttempt` is the only in-memory entity of the catch workflow.
//! It lives for one orchestration run and mirrors what the ledger has
//! confirmed so far. Durable truth lives on-chain; nothing here is
//! persisted.

use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::error::CatchError;

// ────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────

/// Account that initiates catches.
pub type Actor = Address;

/// NFT token identifier minted by a completed catch.
pub type TokenId = U256;

// ────────────────────────────────────────────
// Phases
// ────────────────────────────────────────────

/// Phase reached by a catch attempt.
///
/// Phases only move forward along the canonical order
/// `NotStarted → Initiated → IdentifierKnown → Completed`.
/// `Failed` can be entered from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatchPhase {
    /// Nothing submitted yet.
    NotStarted,
    /// `CatchInitiated` observed for this actor.
    Initiated,
    /// In-flight token id resolved from ledger state.
    IdentifierKnown,
    /// Mint `Transfer` for the token observed.
    Completed,
    /// Terminal failure; carries a reason on the attempt.
    Failed,
}

impl CatchPhase {
    /// Canonical success path, in order.
    pub const CANONICAL: [Self; 4] = [
        Self::NotStarted,
        Self::Initiated,
        Self::IdentifierKnown,
        Self::Completed,
    ];

    /// Position on the canonical path (`None` for `Failed`).
    pub fn rank(self) -> Option<usize> {
        Self::CANONICAL.iter().position(|p| *p == self)
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The single phase that may follow this one on success.
    pub fn next(self) -> Option<Self> {
        self.rank()
            .and_then(|r| Self::CANONICAL.get(r + 1))
            .copied()
    }
}

impl fmt::Display for CatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Initiated => write!(f, "initiated"),
            Self::IdentifierKnown => write!(f, "identifier-known"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Rejected phase or identifier mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("illegal phase transition {from} -> {to}")]
    IllegalTransition { from: CatchPhase, to: CatchPhase },
    #[error("token id already assigned ({existing})")]
    TokenAlreadyAssigned { existing: TokenId },
    #[error("token id can only be assigned while initiated, phase is {phase}")]
    TokenOutOfPhase { phase: CatchPhase },
}

// ────────────────────────────────────────────
// Attempt
// ────────────────────────────────────────────

/// One orchestration run's view of a catch.
#[derive(Debug, Clone)]
pub struct CatchAttempt {
    /// Local id for log correlation.
    pub id: Uuid,
    /// Catching account.
    pub actor: Actor,
    phase: CatchPhase,
    token_id: Option<TokenId>,
    error_reason: Option<CatchError>,
    /// Every phase entered, starting with `NotStarted`.
    history: Vec<CatchPhase>,
    /// Non-fatal findings (e.g. an empty balance before submission).
    advisories: Vec<CatchError>,
    /// Hashes of transactions mined so far, in submission order.
    receipts: Vec<TxHash>,
}

impl CatchAttempt {
    /// Start a fresh attempt for `actor`.
    pub fn new(actor: Actor) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            phase: CatchPhase::NotStarted,
            token_id: None,
            error_reason: None,
            history: vec![CatchPhase::NotStarted],
            advisories: Vec::new(),
            receipts: Vec::new(),
        }
    }

    pub fn phase(&self) -> CatchPhase {
        self.phase
    }

    pub fn token_id(&self) -> Option<TokenId> {
        self.token_id
    }

    pub fn error_reason(&self) -> Option<&CatchError> {
        self.error_reason.as_ref()
    }

    pub fn history(&self) -> &[CatchPhase] {
        &self.history
    }

    pub fn advisories(&self) -> &[CatchError] {
        &self.advisories
    }

    pub fn receipts(&self) -> &[TxHash] {
        &self.receipts
    }

    /// Record a mined transaction. Mined transactions stay on-chain
    /// whatever happens to the attempt afterwards.
    pub fn record_receipt(&mut self, tx_hash: TxHash) {
        self.receipts.push(tx_hash);
    }

    /// Record a non-fatal finding.
    pub fn advise(&mut self, advisory: CatchError) {
        self.advisories.push(advisory);
    }

    /// Move to the next canonical phase.
    ///
    /// `IdentifierKnown` is only reachable through [`Self::assign_token`].
    pub fn advance(&mut self, to: CatchPhase) -> Result<(), PhaseError> {
        let allowed = self.phase.next() == Some(to) && to != CatchPhase::IdentifierKnown;
        if !allowed {
            return Err(PhaseError::IllegalTransition {
                from: self.phase,
                to,
            });
        }
        self.enter(to);
        Ok(())
    }

    /// Assign the discovered token id and move to `IdentifierKnown`.
    ///
    /// Succeeds exactly once per attempt.
    pub fn assign_token(&mut self, token_id: TokenId) -> Result<(), PhaseError> {
        if let Some(existing) = self.token_id {
            return Err(PhaseError::TokenAlreadyAssigned { existing });
        }
        if self.phase != CatchPhase::Initiated {
            return Err(PhaseError::TokenOutOfPhase { phase: self.phase });
        }
        self.token_id = Some(token_id);
        self.enter(CatchPhase::IdentifierKnown);
        Ok(())
    }

    /// Terminate the attempt with `reason`.
    pub fn fail(&mut self, reason: CatchError) -> Result<(), PhaseError> {
        if self.phase.is_terminal() {
            return Err(PhaseError::IllegalTransition {
                from: self.phase,
                to: CatchPhase::Failed,
            });
        }
        self.error_reason = Some(reason);
        self.enter(CatchPhase::Failed);
        Ok(())
    }

    fn enter(&mut self, phase: CatchPhase) {
        self.phase = phase;
        self.history.push(phase);
    }
}

// ────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────

/// Successful catch.
#[derive(Debug, Clone)]
pub struct CatchResult {
    /// Local attempt id.
    pub attempt_id: Uuid,
    /// Catching account.
    pub actor: Actor,
    /// Minted token id (equals the one indexed in the mint `Transfer`).
    pub token_id: TokenId,
    /// Token metadata URI, if readable after completion.
    pub metadata_uri: Option<String>,
    /// Block that included the initiating transaction.
    pub initiated_block: u64,
    /// Transaction hashes: initiate, then complete.
    pub receipts: Vec<TxHash>,
    /// Phases traversed, in order.
    pub phases: Vec<CatchPhase>,
    /// Non-fatal findings collected during the run.
    pub advisories: Vec<CatchError>,
}

/// Aborted catch with the context reached.
#[derive(Debug, Clone, Error)]
#[error("catch for {actor} stopped at phase {phase}: {reason}")]
pub struct CatchFailure {
    /// Catching account.
    pub actor: Actor,
    /// Last phase reached before stopping.
    pub phase: CatchPhase,
    /// Tagged reason.
    #[source]
    pub reason: CatchError,
    /// Phases traversed, in order.
    pub phases: Vec<CatchPhase>,
    /// Transactions mined before stopping: initiate, then complete.
    pub receipts: Vec<TxHash>,
}

impl CatchFailure {
    /// Whether the caller should treat this as an error.
    pub fn is_fatal(&self) -> bool {
        self.reason.is_fatal()
    }

    /// Whether `initiateCatch` was mined, leaving a catch in flight
    /// on-chain even though the local phase may still be `NotStarted`.
    pub fn initiate_mined(&self) -> bool {
        !self.receipts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Address::repeat_byte(0xab)
    }

    #[test]
    fn test_canonical_path() {
        let mut attempt = CatchAttempt::new(actor());
        attempt.advance(CatchPhase::Initiated).unwrap();
        attempt.assign_token(U256::from(42)).unwrap();
        attempt.advance(CatchPhase::Completed).unwrap();

        assert_eq!(attempt.history(), &CatchPhase::CANONICAL);
        assert_eq!(attempt.token_id(), Some(U256::from(42)));
    }

    #[test]
    fn test_skipping_phase_rejected() {
        let mut attempt = CatchAttempt::new(actor());
        let err = attempt.advance(CatchPhase::Completed).unwrap_err();
        assert_eq!(
            err,
            PhaseError::IllegalTransition {
                from: CatchPhase::NotStarted,
                to: CatchPhase::Completed,
            }
        );
        assert_eq!(attempt.phase(), CatchPhase::NotStarted);
    }

    #[test]
    fn test_identifier_known_requires_token() {
        let mut attempt = CatchAttempt::new(actor());
        attempt.advance(CatchPhase::Initiated).unwrap();
        assert!(attempt.advance(CatchPhase::IdentifierKnown).is_err());
    }

    #[test]
    fn test_token_assigned_once() {
        let mut attempt = CatchAttempt::new(actor());
        attempt.advance(CatchPhase::Initiated).unwrap();
        attempt.assign_token(U256::from(7)).unwrap();
        let err = attempt.assign_token(U256::from(8)).unwrap_err();
        assert_eq!(
            err,
            PhaseError::TokenAlreadyAssigned {
                existing: U256::from(7)
            }
        );
        assert_eq!(attempt.token_id(), Some(U256::from(7)));
    }

    #[test]
    fn test_failed_never_resumes() {
        let mut attempt = CatchAttempt::new(actor());
        attempt.advance(CatchPhase::Initiated).unwrap();
        attempt
            .fail(CatchError::IdentifierUnavailable { attempts: 3 })
            .unwrap();

        assert_eq!(attempt.phase(), CatchPhase::Failed);
        assert!(attempt.advance(CatchPhase::IdentifierKnown).is_err());
        assert!(attempt.assign_token(U256::from(1)).is_err());
        assert!(attempt.fail(CatchError::ReadFailure("x".into())).is_err());
        assert!(matches!(
            attempt.error_reason(),
            Some(CatchError::IdentifierUnavailable { attempts: 3 })
        ));
    }

    #[test]
    fn test_completed_cannot_regress() {
        let mut attempt = CatchAttempt::new(actor());
        attempt.advance(CatchPhase::Initiated).unwrap();
        attempt.assign_token(U256::from(1)).unwrap();
        attempt.advance(CatchPhase::Completed).unwrap();
        assert!(attempt.advance(CatchPhase::Initiated).is_err());
        assert!(attempt.fail(CatchError::ReadFailure("late".into())).is_err());
    }

    #[test]
    fn test_phase_next() {
        assert_eq!(CatchPhase::NotStarted.next(), Some(CatchPhase::Initiated));
        assert_eq!(CatchPhase::Completed.next(), None);
        assert_eq!(CatchPhase::Failed.next(), None);
    }

    #[test]
    fn test_receipts_survive_failure() {
        let mut attempt = CatchAttempt::new(actor());
        let initiate = TxHash::repeat_byte(0x01);
        attempt.record_receipt(initiate);
        attempt.fail(CatchError::ReadFailure("event lost".into())).unwrap();

        assert_eq!(attempt.receipts(), &[initiate]);
        assert_eq!(attempt.history(), &[CatchPhase::NotStarted, CatchPhase::Failed]);
    }
}

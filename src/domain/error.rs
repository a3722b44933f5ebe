//! Catch error taxonomy.
//!
//! Every condition that stops or annotates a catch run maps to exactly
//! one of these tags. Only `CooldownActive` and `InsufficientFunds` are
//! non-fatal; everything else aborts the current run. Nothing here is
//! retried automatically: a blind retry after a rejected or reverted
//! submission could double-submit a paid operation.

use std::time::Duration;

use thiserror::Error;

/// Tagged catch condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatchError {
    /// The actor's cooldown has not elapsed yet.
    #[error("cooldown active, {seconds_remaining}s remaining")]
    CooldownActive { seconds_remaining: i64 },

    /// Balance read as zero before submitting (advisory only).
    #[error("actor has no spendable balance")]
    InsufficientFunds,

    /// The ledger refused the transaction before inclusion.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// The transaction was included but its execution reverted.
    #[error("execution reverted: {0}")]
    ExecutionReverted(String),

    /// A suspension point exceeded its deadline.
    #[error("timed out after {waited:?} waiting for {what}")]
    WaitTimeout { what: String, waited: Duration },

    /// The in-flight token id never became readable.
    #[error("in-flight token id unavailable after {attempts} attempts")]
    IdentifierUnavailable { attempts: u32 },

    /// A ledger read failed.
    #[error("ledger read failed: {0}")]
    ReadFailure(String),
}

impl CatchError {
    /// Whether this condition aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CooldownActive { .. } | Self::InsufficientFunds)
    }

    /// Stable tag for logs and exit reporting.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CooldownActive { .. } => "CooldownActive",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::SubmissionRejected(_) => "SubmissionRejected",
            Self::ExecutionReverted(_) => "ExecutionReverted",
            Self::WaitTimeout { .. } => "WaitTimeout",
            Self::IdentifierUnavailable { .. } => "IdentifierUnavailable",
            Self::ReadFailure(_) => "ReadFailure",
        }
    }
}

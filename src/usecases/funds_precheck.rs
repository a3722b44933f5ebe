//! Funds Precheck - Advisory Balance Check Before Paying Fees
//!
//! A zero balance is reported, not enforced: the balance can change
//! between this read and the submission, and the ledger rejects an
//! underfunded transaction on its own.

use std::sync::Arc;

use alloy::primitives::U256;
use tracing::{instrument, warn};

use crate::domain::catch::Actor;
use crate::domain::error::CatchError;
use crate::ports::ledger::Ledger;

/// Outcome of a balance read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsStatus {
    /// Non-zero balance in wei.
    Funded(U256),
    /// Zero balance.
    Empty,
}

impl FundsStatus {
    pub fn has_funds(self) -> bool {
        matches!(self, Self::Funded(_))
    }
}

/// Reads the actor's spendable balance.
pub struct FundsPrecheck<L: Ledger> {
    ledger: Arc<L>,
}

impl<L: Ledger> FundsPrecheck<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Single balance read.
    ///
    /// # Errors
    /// `ReadFailure` if the balance cannot be read.
    #[instrument(skip(self))]
    pub async fn check(&self, actor: Actor) -> Result<FundsStatus, CatchError> {
        let balance = self
            .ledger
            .balance(actor)
            .await
            .map_err(|e| CatchError::ReadFailure(format!("balance: {e}")))?;

        if balance.is_zero() {
            warn!("Actor has zero balance, submission will likely be rejected");
            Ok(FundsStatus::Empty)
        } else {
            Ok(FundsStatus::Funded(balance))
        }
    }

    /// Boolean form of [`Self::check`].
    pub async fn has_funds(&self, actor: Actor) -> Result<bool, CatchError> {
        Ok(self.check(actor).await?.has_funds())
    }
}

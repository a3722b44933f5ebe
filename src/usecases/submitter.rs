//! Transaction Submitter - Send and Wait for Inclusion
//!
//! Wraps `Ledger::submit` with an inclusion deadline and maps ledger
//! failures onto the catch taxonomy. A receipt only proves inclusion;
//! business-level confirmation comes from events.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};

use crate::domain::error::CatchError;
use crate::ports::ledger::{Ledger, LedgerError, Receipt, TxRequest};

/// Submits catch transactions one at a time.
pub struct TransactionSubmitter<L: Ledger> {
    ledger: Arc<L>,
    inclusion_timeout: Duration,
}

impl<L: Ledger> TransactionSubmitter<L> {
    pub fn new(ledger: Arc<L>, inclusion_timeout: Duration) -> Self {
        Self {
            ledger,
            inclusion_timeout,
        }
    }

    /// Send `request` and wait until mined.
    ///
    /// # Errors
    /// `SubmissionRejected`, `ExecutionReverted`, `WaitTimeout` if the
    /// receipt does not arrive within the inclusion timeout, or
    /// `ReadFailure` naming the hash when the transaction went out but its
    /// receipt could not be read. Never retried.
    #[instrument(skip(self, request), fields(actor = %request.actor, call = %request.call))]
    pub async fn submit(&self, request: &TxRequest) -> Result<Receipt, CatchError> {
        let outcome = tokio::time::timeout(self.inclusion_timeout, self.ledger.submit(request)).await;

        let receipt = match outcome {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                let err = map_submit_error(e);
                error!(tag = err.tag(), error = %err, "Submission failed");
                return Err(err);
            }
            Err(_) => {
                error!(timeout_ms = self.inclusion_timeout.as_millis(), "No receipt before deadline");
                return Err(CatchError::WaitTimeout {
                    what: format!("{} receipt", request.call),
                    waited: self.inclusion_timeout,
                });
            }
        };

        info!(
            tx_hash = %receipt.tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction mined"
        );
        Ok(receipt)
    }
}

fn map_submit_error(e: LedgerError) -> CatchError {
    match e {
        LedgerError::Reverted(msg) => CatchError::ExecutionReverted(msg),
        LedgerError::Unconfirmed { tx_hash, reason } => {
            CatchError::ReadFailure(format!("receipt for broadcast tx {tx_hash}: {reason}"))
        }
        other => CatchError::SubmissionRejected(other.to_string()),
    }
}

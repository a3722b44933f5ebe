//! Identifier Poller - Wait for the In-flight Token Id to Be Readable
//!
//! Right after `initiateCatch` is mined the minter may still report no
//! catch in progress. The poller re-reads on every not-found failure
//! and surfaces any other failure untouched on the first occurrence.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::catch::{Actor, TokenId};
use crate::domain::error::CatchError;
use crate::ports::ledger::{Ledger, LedgerError};

use super::retry::{RetryError, RetryPolicy, retry_when};

/// Polls `Ledger::in_flight_token_id` under a retry policy.
pub struct IdentifierPoller<L: Ledger> {
    ledger: Arc<L>,
    policy: RetryPolicy,
}

impl<L: Ledger> IdentifierPoller<L> {
    pub fn new(ledger: Arc<L>, policy: RetryPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Raw poll: retries on `NotFound` only.
    pub async fn poll_raw(&self, actor: Actor) -> Result<TokenId, RetryError<LedgerError>> {
        retry_when(self.policy, LedgerError::is_not_found, |attempt| {
            let ledger = Arc::clone(&self.ledger);
            async move {
                let result = ledger.in_flight_token_id(actor).await;
                if let Err(ref e) = result {
                    if e.is_not_found() {
                        warn!(attempt, "In-flight token id not readable yet");
                    }
                }
                result
            }
        })
        .await
    }

    /// Resolve the actor's in-flight token id.
    ///
    /// # Errors
    /// `IdentifierUnavailable` once the attempt budget is spent;
    /// `ReadFailure` carrying the unmodified ledger error otherwise.
    #[instrument(skip(self))]
    pub async fn poll_for_identifier(&self, actor: Actor) -> Result<TokenId, CatchError> {
        match self.poll_raw(actor).await {
            Ok(token_id) => {
                info!(token_id = %token_id, "In-flight token id resolved");
                Ok(token_id)
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                Err(CatchError::IdentifierUnavailable { attempts })
            }
            Err(RetryError::Aborted(e)) => Err(CatchError::ReadFailure(e.to_string())),
        }
    }
}

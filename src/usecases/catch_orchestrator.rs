//! Catch Orchestrator - Two-phase Catch Workflow
//!
//! Drives one full catch against the minter:
//! 1. Check the actor's cooldown (abort early if still active)
//! 2. Advisory balance check
//! 3. Submit `initiateCatch` and wait for its receipt
//! 4. Wait for `CatchInitiated` for this actor
//! 5. Poll the in-flight token id until readable
//! 6. Submit `completeCatch(name)` and wait for its receipt
//! 7. Wait for the mint `Transfer` of exactly that token to the actor
//! 8. Read the token URI for reporting
//!
//! Event waits replay from the block that included the corresponding
//! transaction, so a confirmation emitted before the subscription is
//! registered is still observed. The orchestrator holds no state beyond
//! one `CatchAttempt` per call; concurrent calls for different actors
//! share nothing but the ledger handle.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tracing::{Instrument, error, info, info_span, instrument, warn};

use crate::domain::catch::{Actor, CatchAttempt, CatchFailure, CatchPhase, CatchResult, TokenId};
use crate::domain::cooldown;
use crate::domain::error::CatchError;
use crate::domain::event::{EventFilter, LedgerEvent};
use crate::ports::ledger::{Ledger, TxRequest};

use super::cooldown_gate::{Clock, CooldownGate, SystemClock};
use super::event_waiter::EventWaiter;
use super::funds_precheck::{FundsPrecheck, FundsStatus};
use super::identifier_poller::IdentifierPoller;
use super::retry::RetryPolicy;
use super::submitter::TransactionSubmitter;

/// Deadlines and polling budget for one catch run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchSettings {
    /// Max wait for each transaction receipt.
    pub receipt_timeout: Duration,
    /// Max wait for `CatchInitiated` after the first receipt.
    pub initiation_timeout: Duration,
    /// Max wait for the mint `Transfer` after the second receipt.
    pub completion_timeout: Duration,
    /// Budget for reading the in-flight token id.
    pub identifier_policy: RetryPolicy,
}

impl Default for CatchSettings {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(120),
            initiation_timeout: Duration::from_secs(60),
            completion_timeout: Duration::from_secs(60),
            identifier_policy: RetryPolicy::fixed(20, Duration::from_millis(500)),
        }
    }
}

/// Read-only snapshot of an actor's catch readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchStatus {
    pub actor: Actor,
    /// `<= 0` means a catch may start now.
    pub seconds_until_available: i64,
    /// Native balance in wei.
    pub balance: U256,
    /// Token id of a catch already in flight, if any.
    pub in_flight_token: Option<TokenId>,
}

impl CatchStatus {
    pub fn can_catch(&self) -> bool {
        cooldown::is_available(self.seconds_until_available)
    }
}

/// Composes the catch components into the full sequence.
pub struct CatchOrchestrator<L: Ledger> {
    ledger: Arc<L>,
    settings: CatchSettings,
    gate: CooldownGate<L>,
    funds: FundsPrecheck<L>,
    submitter: TransactionSubmitter<L>,
    waiter: EventWaiter<L>,
    poller: IdentifierPoller<L>,
}

impl<L: Ledger> CatchOrchestrator<L> {
    /// Create an orchestrator using the system clock.
    pub fn new(ledger: Arc<L>, settings: CatchSettings) -> Self {
        Self::with_clock(ledger, settings, Arc::new(SystemClock))
    }

    /// Create with a custom clock for cooldown evaluation.
    pub fn with_clock(ledger: Arc<L>, settings: CatchSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate: CooldownGate::new(Arc::clone(&ledger), clock),
            funds: FundsPrecheck::new(Arc::clone(&ledger)),
            submitter: TransactionSubmitter::new(Arc::clone(&ledger), settings.receipt_timeout),
            waiter: EventWaiter::new(Arc::clone(&ledger)),
            poller: IdentifierPoller::new(Arc::clone(&ledger), settings.identifier_policy),
            ledger,
            settings,
        }
    }

    pub fn settings(&self) -> &CatchSettings {
        &self.settings
    }

    /// Run a full catch for `actor`, naming the caught bug `desired_name`.
    ///
    /// # Errors
    /// `CatchFailure` tagged `CooldownActive` (non-fatal, nothing
    /// submitted) or with a fatal reason and the phase reached.
    pub async fn catch_full(
        &self,
        actor: Actor,
        desired_name: &str,
    ) -> Result<CatchResult, CatchFailure> {
        let mut attempt = CatchAttempt::new(actor);
        let span = info_span!("catch_full", attempt_id = %attempt.id, actor = %actor);

        match self.run(&mut attempt, desired_name).instrument(span.clone()).await {
            Ok(result) => Ok(result),
            Err(reason) => Err(span.in_scope(|| abort(&mut attempt, reason))),
        }
    }

    async fn run(
        &self,
        attempt: &mut CatchAttempt,
        desired_name: &str,
    ) -> Result<CatchResult, CatchError> {
        let actor = attempt.actor;

        // ── NotStarted: cooldown gate ───────────────────────────
        let remaining = self.gate.seconds_until_available(actor).await?;
        if !cooldown::is_available(remaining) {
            return Err(CatchError::CooldownActive {
                seconds_remaining: remaining,
            });
        }

        if self.funds.check(actor).await? == FundsStatus::Empty {
            attempt.advise(CatchError::InsufficientFunds);
        }

        // ── Initiating ──────────────────────────────────────────
        let initiate = self.submitter.submit(&TxRequest::initiate(actor)).await?;
        attempt.record_receipt(initiate.tx_hash);
        info!(tx_hash = %initiate.tx_hash, "Catch initiation mined");

        // ── WaitingInitiationEvent ──────────────────────────────
        let initiated = self
            .waiter
            .wait_for(
                &EventFilter::catch_initiated(actor).since_block(initiate.block_number),
                Some(self.settings.initiation_timeout),
            )
            .await?;
        let initiated_block = match initiated {
            LedgerEvent::CatchInitiated { block_number, .. } => block_number,
            LedgerEvent::Transfer { .. } => initiate.block_number,
        };
        advance(attempt, CatchPhase::Initiated)?;
        info!(initiated_block, "Catch initiated");

        // ── Initiated: discover token id ────────────────────────
        let token_id = self.poller.poll_for_identifier(actor).await?;
        attempt
            .assign_token(token_id)
            .map_err(|e| CatchError::ReadFailure(e.to_string()))?;

        // ── IdentifierKnown: complete ───────────────────────────
        let complete = self
            .submitter
            .submit(&TxRequest::complete(actor, desired_name))
            .await?;
        attempt.record_receipt(complete.tx_hash);

        // ── WaitingCompletionEvent ──────────────────────────────
        let minted = self
            .waiter
            .wait_for(
                &EventFilter::mint(actor, token_id).since_block(complete.block_number),
                Some(self.settings.completion_timeout),
            )
            .await?;
        debug_assert!(matches!(
            minted,
            LedgerEvent::Transfer { token_id: t, .. } if t == token_id
        ));
        advance(attempt, CatchPhase::Completed)?;
        info!(token_id = %token_id, name = desired_name, "Catch completed");

        let metadata_uri = match self.ledger.token_uri(token_id).await {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!(token_id = %token_id, error = %e, "Token URI unreadable after catch");
                None
            }
        };

        Ok(CatchResult {
            attempt_id: attempt.id,
            actor,
            token_id,
            metadata_uri,
            initiated_block,
            receipts: attempt.receipts().to_vec(),
            phases: attempt.history().to_vec(),
            advisories: attempt.advisories().to_vec(),
        })
    }

    /// Read-only readiness report for `actor`.
    #[instrument(skip(self))]
    pub async fn status(&self, actor: Actor) -> Result<CatchStatus, CatchError> {
        let seconds_until_available = self.gate.seconds_until_available(actor).await?;
        let balance = match self.funds.check(actor).await? {
            FundsStatus::Funded(amount) => amount,
            FundsStatus::Empty => U256::ZERO,
        };
        let in_flight_token = match self.ledger.in_flight_token_id(actor).await {
            Ok(id) => Some(id),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(CatchError::ReadFailure(e.to_string())),
        };

        Ok(CatchStatus {
            actor,
            seconds_until_available,
            balance,
            in_flight_token,
        })
    }

    /// `tokenURI(token_id)`.
    #[instrument(skip(self))]
    pub async fn token_uri(&self, token_id: TokenId) -> Result<String, CatchError> {
        self
            .ledger
            .token_uri(token_id)
            .await
            .map_err(|e| CatchError::ReadFailure(e.to_string()))
    }
}

fn advance(attempt: &mut CatchAttempt, to: CatchPhase) -> Result<(), CatchError> {
    attempt
        .advance(to)
        .map_err(|e| CatchError::ReadFailure(e.to_string()))
}

/// Close out a failed run with the phase it reached.
fn abort(attempt: &mut CatchAttempt, reason: CatchError) -> CatchFailure {
    let reached = attempt.phase();

    if reason.is_fatal() {
        error!(tag = reason.tag(), phase = %reached, error = %reason, "Catch failed");
        // a terminal attempt cannot fail again; the reason is still reported
        let _ = attempt.fail(reason.clone());
    } else {
        warn!(tag = reason.tag(), phase = %reached, error = %reason, "Catch not started");
    }

    for tx_hash in attempt.receipts() {
        warn!(tx_hash = %tx_hash, "Mined before the failure; stays on-chain");
    }

    CatchFailure {
        actor: attempt.actor,
        phase: reached,
        reason,
        phases: attempt.history().to_vec(),
        receipts: attempt.receipts().to_vec(),
    }
}

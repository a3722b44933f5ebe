//! Cooldown Gate - May This Actor Start a Catch Now?
//!
//! Reads the actor's last catch time and the minter's cooldown, then
//! compares against the current time. Never suspends beyond the two
//! reads and has no side effects.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::domain::catch::Actor;
use crate::domain::cooldown;
use crate::domain::error::CatchError;
use crate::ports::ledger::Ledger;

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync + 'static {
    fn now_unix(&self) -> i64;
}

/// Wall clock via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

impl<F> Clock for F
where
    F: Fn() -> i64 + Send + Sync + 'static,
{
    fn now_unix(&self) -> i64 {
        self()
    }
}

/// Computes how long an actor must still wait before catching.
pub struct CooldownGate<L: Ledger> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
}

impl<L: Ledger> CooldownGate<L> {
    pub fn new(ledger: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// `lastCatchTimestamp + cooldown - now`; `<= 0` means clear.
    ///
    /// # Errors
    /// `ReadFailure` if either ledger read fails. Not retried here.
    #[instrument(skip(self))]
    pub async fn seconds_until_available(&self, actor: Actor) -> Result<i64, CatchError> {
        let (last_catch, cooldown) = tokio::try_join!(
            self.ledger.last_catch_time(actor),
            self.ledger.cooldown_duration(),
        )
        .map_err(|e| CatchError::ReadFailure(format!("cooldown state: {e}")))?;

        let now = self.clock.now_unix();
        let remaining = cooldown::seconds_until_available(last_catch, cooldown, now);

        debug!(last_catch, cooldown, now, remaining, "Cooldown evaluated");
        Ok(remaining)
    }
}

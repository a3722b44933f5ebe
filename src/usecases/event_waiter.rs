//! Event Waiter - One-shot Filtered Event Subscriptions
//!
//! Registers a subscription, suspends until the first event matching
//! the filter arrives, and releases the subscription on every exit
//! path: match, timeout, error, or the caller dropping the future.
//! Matching is done here on event content as well, so duplicate or
//! over-broad delivery from the source cannot resolve a wait twice or
//! for the wrong actor/token.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, instrument, trace};

use crate::domain::error::CatchError;
use crate::domain::event::{EventFilter, LedgerEvent};
use crate::ports::ledger::{EventStream, Ledger, Subscription, SubscriptionId};

/// Subscription released on drop.
pub struct ScopedSubscription<L: Ledger> {
    ledger: Arc<L>,
    id: SubscriptionId,
    events: EventStream,
}

impl<L: Ledger> ScopedSubscription<L> {
    pub fn new(ledger: Arc<L>, subscription: Subscription) -> Self {
        Self {
            ledger,
            id: subscription.id,
            events: subscription.events,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event from the source, matching or not.
    pub async fn next_event(&mut self) -> Option<LedgerEvent> {
        self.events.next().await
    }
}

impl<L: Ledger> Drop for ScopedSubscription<L> {
    fn drop(&mut self) {
        self.ledger.unsubscribe(self.id);
        debug!(subscription = %self.id, "Subscription released");
    }
}

/// Waits for single ledger events.
pub struct EventWaiter<L: Ledger> {
    ledger: Arc<L>,
}

impl<L: Ledger> EventWaiter<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Suspend until the first event matching `filter`.
    ///
    /// # Errors
    /// `WaitTimeout` if `deadline` elapses first; `ReadFailure` if the
    /// subscription cannot be created or the source closes without a
    /// match.
    #[instrument(skip(self), fields(event = %filter.kind))]
    pub async fn wait_for(
        &self,
        filter: &EventFilter,
        deadline: Option<Duration>,
    ) -> Result<LedgerEvent, CatchError> {
        let wait = self.first_match(filter);

        let found = match deadline {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| CatchError::WaitTimeout {
                    what: filter.kind.to_string(),
                    waited: limit,
                })??,
            None => wait.await?,
        };

        debug!(event = ?found, "Matching event received");
        Ok(found)
    }

    async fn first_match(&self, filter: &EventFilter) -> Result<LedgerEvent, CatchError> {
        let subscription = self
            .ledger
            .subscribe(filter)
            .await
            .map_err(|e| CatchError::ReadFailure(format!("subscribe {}: {e}", filter.kind)))?;
        let mut scoped = ScopedSubscription::new(Arc::clone(&self.ledger), subscription);
        trace!(subscription = %scoped.id(), "Subscribed");

        while let Some(event) = scoped.next_event().await {
            if filter.matches(&event) {
                return Ok(event);
            }
            trace!(event = ?event, "Ignoring non-matching event");
        }

        Err(CatchError::ReadFailure(format!(
            "{} event stream closed before a match",
            filter.kind
        )))
    }
}

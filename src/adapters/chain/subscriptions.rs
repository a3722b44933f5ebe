//! Log Subscriptions - Filtered Event Feeds over eth_newFilter
//!
//! Each subscription installs a node-side log filter first, then
//! replays history from the requested block with `eth_getLogs`, then
//! forwards live filter changes. Installing the filter before the
//! replay leaves no gap; the overlap may duplicate an event, which
//! consumers tolerate by matching on content.
//!
//! Forwarding runs in a spawned task registered under its
//! `SubscriptionId`. `unsubscribe` aborts the task; dropping the
//! receiving stream ends it on the next send.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, B256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::domain::event::{EventFilter, EventKind, LedgerEvent};
use crate::ports::ledger::{LedgerError, Subscription, SubscriptionId};

use super::contracts::{BugMinter, CatchContracts, TheBugs};

/// Buffered events per subscription before the forwarder waits.
const CHANNEL_CAPACITY: usize = 64;

/// Live forwarding tasks keyed by subscription.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a filter and start forwarding matching logs.
    pub async fn open(
        &self,
        provider: Arc<dyn Provider + Send + Sync>,
        contracts: CatchContracts,
        filter: &EventFilter,
    ) -> Result<Subscription, LedgerError> {
        let log_filter = to_log_filter(&contracts, filter);
        let kind = filter.kind;

        let poller = provider
            .watch_logs(&log_filter)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("install {kind} filter: {e}")))?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

        let handle = tokio::spawn(async move {
            if filter_has_history(&log_filter) {
                match provider.get_logs(&log_filter).await {
                    Ok(logs) => {
                        for log in &logs {
                            if !forward(&tx, kind, log).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(subscription = %id, error = %e, "History replay failed");
                        return;
                    }
                }
            }

            let mut live = poller.into_stream();
            while let Some(batch) = live.next().await {
                for log in &batch {
                    if !forward(&tx, kind, log).await {
                        return;
                    }
                }
            }
            debug!(subscription = %id, "Live log stream ended");
        });

        self.lock().insert(id, handle);
        debug!(subscription = %id, event = %kind, "Subscription opened");

        let events = futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx));
        Ok(Subscription {
            id,
            events: Box::pin(events),
        })
    }

    /// Abort the forwarding task for `id`, if still registered.
    pub fn close(&self, id: SubscriptionId) {
        if let Some(handle) = self.lock().remove(&id) {
            handle.abort();
            debug!(subscription = %id, "Subscription closed");
        }
    }

    /// Number of registered subscriptions.
    pub fn active(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        for (_, handle) in self.lock().drain() {
            handle.abort();
        }
    }
}

/// Send one decoded log; `false` once the consumer is gone.
async fn forward(tx: &mpsc::Sender<LedgerEvent>, kind: EventKind, log: &Log) -> bool {
    match decode_log(kind, log) {
        Some(event) => tx.send(event).await.is_ok(),
        None => {
            trace!(tx = ?log.transaction_hash, "Skipping undecodable log");
            true
        }
    }
}

fn filter_has_history(filter: &Filter) -> bool {
    filter.get_from_block().is_some()
}

/// Translate a domain filter into a node-side log filter.
pub fn to_log_filter(contracts: &CatchContracts, filter: &EventFilter) -> Filter {
    let mut log_filter = match filter.kind {
        EventKind::CatchInitiated => {
            let mut f = Filter::new()
                .address(contracts.bug_minter)
                .event_signature(BugMinter::CatchInitiated::SIGNATURE_HASH);
            if let Some(catcher) = filter.catcher {
                f = f.topic1(catcher.into_word());
            }
            f
        }
        EventKind::Transfer => {
            let mut f = Filter::new()
                .address(contracts.the_bugs)
                .event_signature(TheBugs::Transfer::SIGNATURE_HASH);
            if let Some(from) = filter.from {
                f = f.topic1(address_topic(from));
            }
            if let Some(to) = filter.to {
                f = f.topic2(address_topic(to));
            }
            if let Some(token_id) = filter.token_id {
                f = f.topic3(B256::from(token_id));
            }
            f
        }
    };

    if let Some(block) = filter.from_block {
        log_filter = log_filter.from_block(block);
    }
    log_filter
}

fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// Decode a raw log into the domain event of `kind`.
pub fn decode_log(kind: EventKind, log: &Log) -> Option<LedgerEvent> {
    match kind {
        EventKind::CatchInitiated => {
            let decoded = log.log_decode::<BugMinter::CatchInitiated>().ok()?;
            let data = decoded.inner.data;
            let block_number = u64::try_from(data.blockNumber)
                .ok()
                .or(log.block_number)
                .unwrap_or_default();
            Some(LedgerEvent::CatchInitiated {
                catcher: data.catcher,
                block_number,
            })
        }
        EventKind::Transfer => {
            let decoded = log.log_decode::<TheBugs::Transfer>().ok()?;
            let data = decoded.inner.data;
            Some(LedgerEvent::Transfer {
                from: data.from,
                to: data.to,
                token_id: data.tokenId,
            })
        }
    }
}

//! In-memory ledger for end-to-end catch tests.
//!
//! Mimics the minter closely enough to drive the whole workflow:
//! `initiateCatch` mines a block, assigns the next token id to the actor
//! and emits `CatchInitiated`; `completeCatch` mines a block and emits
//! the mint `Transfer`. Events are logged with their block so late
//! subscribers get them replayed, like the chain adapter does.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tokio::sync::mpsc;

use bug_catcher::domain::catch::{Actor, TokenId};
use bug_catcher::domain::event::{EventFilter, LedgerEvent};
use bug_catcher::ports::ledger::{
    CatchCall, Ledger, LedgerError, Receipt, Subscription, SubscriptionId, TxRequest,
};

/// Fixed "now" handed to the cooldown gate in tests.
pub const NOW: i64 = 1_700_000_000;

pub fn actor(byte: u8) -> Actor {
    Address::repeat_byte(byte)
}

pub fn uri_for(token_id: TokenId) -> String {
    format!("ipfs://bugs/{token_id}")
}

struct Subscriber {
    filter: EventFilter,
    tx: mpsc::UnboundedSender<LedgerEvent>,
}

struct State {
    block: u64,
    next_token: u64,
    last_catch: HashMap<Actor, u64>,
    in_flight: HashMap<Actor, TokenId>,
    in_flight_script: VecDeque<Result<TokenId, LedgerError>>,
    in_flight_reads: u32,
    submissions: Vec<TxRequest>,
    log: Vec<(u64, LedgerEvent)>,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_subscription: u64,
    created: Vec<EventFilter>,
}

pub struct FakeLedger {
    cooldown: u64,
    balance: U256,
    assign_tokens: bool,
    emit_initiated: bool,
    emit_mint: bool,
    duplicate_events: bool,
    initiate_error: Option<LedgerError>,
    complete_error: Option<LedgerError>,
    receipt_delay: Option<Duration>,
    uri_error: Option<LedgerError>,
    state: Mutex<State>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            cooldown: 300,
            balance: U256::from(10u64).pow(U256::from(18)),
            assign_tokens: true,
            emit_initiated: true,
            emit_mint: true,
            duplicate_events: false,
            initiate_error: None,
            complete_error: None,
            receipt_delay: None,
            uri_error: None,
            state: Mutex::new(State {
                block: 100,
                next_token: 42,
                last_catch: HashMap::new(),
                in_flight: HashMap::new(),
                in_flight_script: VecDeque::new(),
                in_flight_reads: 0,
                submissions: Vec::new(),
                log: Vec::new(),
                subscribers: HashMap::new(),
                next_subscription: 0,
                created: Vec::new(),
            }),
        }
    }

    // ── Builders ────────────────────────────────────────────

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown = seconds;
        self
    }

    pub fn with_last_catch(self, actor: Actor, timestamp: u64) -> Self {
        self.state().last_catch.insert(actor, timestamp);
        self
    }

    pub fn with_balance(mut self, wei: U256) -> Self {
        self.balance = wei;
        self
    }

    /// Results returned by the next in-flight reads, before falling
    /// back to the assigned token.
    pub fn with_in_flight_script(self, script: Vec<Result<TokenId, LedgerError>>) -> Self {
        self.state().in_flight_script = script.into();
        self
    }

    /// In-flight reads never find a token.
    pub fn without_token_assignment(mut self) -> Self {
        self.assign_tokens = false;
        self
    }

    pub fn without_initiation_event(mut self) -> Self {
        self.emit_initiated = false;
        self
    }

    pub fn without_mint_event(mut self) -> Self {
        self.emit_mint = false;
        self
    }

    /// Deliver every event twice.
    pub fn with_duplicate_events(mut self) -> Self {
        self.duplicate_events = true;
        self
    }

    pub fn failing_initiate(mut self, err: LedgerError) -> Self {
        self.initiate_error = Some(err);
        self
    }

    pub fn failing_complete(mut self, err: LedgerError) -> Self {
        self.complete_error = Some(err);
        self
    }

    pub fn with_receipt_delay(mut self, delay: Duration) -> Self {
        self.receipt_delay = Some(delay);
        self
    }

    pub fn failing_token_uri(mut self, err: LedgerError) -> Self {
        self.uri_error = Some(err);
        self
    }

    // ── Inspection ──────────────────────────────────────────

    pub fn submissions(&self) -> Vec<TxRequest> {
        self.state().submissions.clone()
    }

    pub fn completions(&self) -> usize {
        self.submissions()
            .iter()
            .filter(|r| matches!(r.call, CatchCall::Complete { .. }))
            .count()
    }

    /// Filters of every subscription ever created, in order.
    pub fn subscriptions_created(&self) -> Vec<EventFilter> {
        self.state().created.clone()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state().subscribers.len()
    }

    pub fn in_flight_reads(&self) -> u32 {
        self.state().in_flight_reads
    }

    // ── Event source ────────────────────────────────────────

    /// Record `event` in the current block and push it to live
    /// subscribers of its kind.
    pub fn emit(&self, event: LedgerEvent) {
        let copies = if self.duplicate_events { 2 } else { 1 };
        let mut state = self.state();
        let block = state.block;
        for _ in 0..copies {
            state.log.push((block, event.clone()));
            for sub in state.subscribers.values() {
                if sub.filter.kind == event.kind() {
                    let _ = sub.tx.send(event.clone());
                }
            }
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn mine(&self, request: &TxRequest) -> Receipt {
        let mut state = self.state();
        state.block += 1;
        state.submissions.push(request.clone());
        let n = state.submissions.len() as u64;
        Receipt {
            tx_hash: B256::from(U256::from(n)),
            block_number: state.block,
            gas_used: 21_000,
        }
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn last_catch_time(&self, actor: Actor) -> Result<u64, LedgerError> {
        Ok(self.state().last_catch.get(&actor).copied().unwrap_or(0))
    }

    async fn cooldown_duration(&self) -> Result<u64, LedgerError> {
        Ok(self.cooldown)
    }

    async fn balance(&self, _actor: Actor) -> Result<U256, LedgerError> {
        Ok(self.balance)
    }

    async fn submit(&self, request: &TxRequest) -> Result<Receipt, LedgerError> {
        if let Some(delay) = self.receipt_delay {
            tokio::time::sleep(delay).await;
        }

        match &request.call {
            CatchCall::Initiate => {
                if let Some(err) = &self.initiate_error {
                    return Err(err.clone());
                }
                let receipt = self.mine(request);
                {
                    let mut state = self.state();
                    state.last_catch.insert(request.actor, NOW as u64);
                    if self.assign_tokens {
                        let token = U256::from(state.next_token);
                        state.next_token += 1;
                        state.in_flight.insert(request.actor, token);
                    }
                }
                if self.emit_initiated {
                    self.emit(LedgerEvent::CatchInitiated {
                        catcher: request.actor,
                        block_number: receipt.block_number,
                    });
                }
                Ok(receipt)
            }
            CatchCall::Complete { .. } => {
                if let Some(err) = &self.complete_error {
                    return Err(err.clone());
                }
                let token = self
                    .state()
                    .in_flight
                    .remove(&request.actor)
                    .ok_or_else(|| LedgerError::Reverted("NoCatchInProgress".into()))?;
                let receipt = self.mine(request);
                if self.emit_mint {
                    self.emit(LedgerEvent::Transfer {
                        from: Address::ZERO,
                        to: request.actor,
                        token_id: token,
                    });
                }
                Ok(receipt)
            }
        }
    }

    async fn subscribe(&self, filter: &EventFilter) -> Result<Subscription, LedgerError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = self.state();

        let from_block = filter.from_block.unwrap_or(u64::MAX);
        for (block, event) in &state.log {
            if *block >= from_block && event.kind() == filter.kind {
                let _ = tx.send(event.clone());
            }
        }

        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.created.push(*filter);
        state.subscribers.insert(
            id,
            Subscriber {
                filter: *filter,
                tx,
            },
        );

        let events = futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx));
        Ok(Subscription {
            id,
            events: Box::pin(events),
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state().subscribers.remove(&id);
    }

    async fn in_flight_token_id(&self, actor: Actor) -> Result<TokenId, LedgerError> {
        let mut state = self.state();
        state.in_flight_reads += 1;
        if let Some(scripted) = state.in_flight_script.pop_front() {
            return scripted;
        }
        state
            .in_flight
            .get(&actor)
            .copied()
            .ok_or_else(|| LedgerError::NotFound("no catch in progress".into()))
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<String, LedgerError> {
        match &self.uri_error {
            Some(err) => Err(err.clone()),
            None => Ok(uri_for(token_id)),
        }
    }
}

//! Occurrence sources
//!
//! A rate table and an account each own an event manager and feed the
//! shared queue from whatever thread reports an update.

pub mod feed;

use crate::bridge::EventQueue;
use crate::events::{AccountEventInfo, Domain, EventInfo, EventManager, RateEventInfo};
use crate::fx::{Pair, Tick, Transaction};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Latest quotes per pair, with rate events
#[derive(Debug)]
pub struct RateTable {
    queue: Arc<EventQueue>,
    manager: EventManager,
    rates: RwLock<HashMap<Pair, Tick>>,
}

impl RateTable {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self {
            queue,
            manager: EventManager::new(Domain::Rate),
            rates: RwLock::new(HashMap::new()),
        }
    }

    pub fn event_manager(&self) -> EventManager {
        self.manager.clone()
    }

    /// Record a new quote and queue it for the matching rate events.
    ///
    /// Returns the number of occurrences queued.
    pub fn update(&self, pair: Pair, tick: Tick) -> usize {
        self.rates.write().insert(pair.clone(), tick);
        let info = EventInfo::Rate(RateEventInfo::new(pair, tick));
        self.manager.route(&self.queue, &info)
    }

    /// Latest quote for a pair
    pub fn latest(&self, pair: &Pair) -> Option<Tick> {
        self.rates.read().get(pair).copied()
    }

    pub fn pairs(&self) -> Vec<Pair> {
        let mut pairs: Vec<Pair> = self.rates.read().keys().cloned().collect();
        pairs.sort();
        pairs
    }
}

/// A trading account, with account events
#[derive(Debug)]
pub struct Account {
    id: u64,
    queue: Arc<EventQueue>,
    manager: EventManager,
    transactions: RwLock<Vec<Transaction>>,
}

impl Account {
    pub fn new(id: u64, queue: Arc<EventQueue>) -> Self {
        Self {
            id,
            queue,
            manager: EventManager::new(Domain::Account),
            transactions: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event_manager(&self) -> EventManager {
        self.manager.clone()
    }

    /// Post a transaction and queue it for the matching account events.
    ///
    /// Returns the number of occurrences queued.
    pub fn record(&self, transaction: Transaction) -> usize {
        self.transactions.write().push(transaction.clone());
        let info = EventInfo::Account(AccountEventInfo::new(transaction));
        self.manager.route(&self.queue, &info)
    }

    /// Balance after the latest transaction
    pub fn balance(&self) -> Decimal {
        self.transactions
            .read()
            .last()
            .map_or(Decimal::ZERO, |t| t.balance)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().clone()
    }
}

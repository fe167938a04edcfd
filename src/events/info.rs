//! Event info snapshots
//!
//! An info value is captured when an occurrence is observed and is never
//! mutated afterwards, so it can cross threads freely.

use crate::fx::{Pair, Tick, Transaction, TransactionType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two event domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Rate table updates
    Rate,
    /// Account transactions
    Account,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate => f.write_str("rate"),
            Self::Account => f.write_str("account"),
        }
    }
}

/// Info payload whose key an event can be bound to
pub trait KeyedInfo {
    type Key: PartialEq;

    fn key(&self) -> &Self::Key;
}

/// A rate update for one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEventInfo {
    pair: Pair,
    tick: Tick,
    timestamp: i64,
}

impl RateEventInfo {
    pub fn new(pair: Pair, tick: Tick) -> Self {
        Self {
            timestamp: tick.timestamp,
            pair,
            tick,
        }
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    pub fn tick(&self) -> &Tick {
        &self.tick
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Strict ordering by timestamp, then pair, then prices
    pub fn compare_less(&self, other: &Self) -> bool {
        (self.timestamp, &self.pair, self.tick.bid, self.tick.ask)
            < (other.timestamp, &other.pair, other.tick.bid, other.tick.ask)
    }
}

impl KeyedInfo for RateEventInfo {
    type Key = Pair;

    fn key(&self) -> &Pair {
        &self.pair
    }
}

impl fmt::Display for RateEventInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pair, self.tick)
    }
}

/// A transaction posted to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEventInfo {
    transaction: Transaction,
    timestamp: i64,
}

impl AccountEventInfo {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            timestamp: transaction.timestamp,
            transaction,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Strict ordering by timestamp, then transaction number
    pub fn compare_less(&self, other: &Self) -> bool {
        (self.timestamp, self.transaction.number) < (other.timestamp, other.transaction.number)
    }
}

impl KeyedInfo for AccountEventInfo {
    type Key = TransactionType;

    fn key(&self) -> &TransactionType {
        &self.transaction.kind
    }
}

impl fmt::Display for AccountEventInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.transaction)
    }
}

/// Snapshot of one occurrence, tagged by domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventInfo {
    Rate(RateEventInfo),
    Account(AccountEventInfo),
}

impl EventInfo {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Rate(_) => Domain::Rate,
            Self::Account(_) => Domain::Account,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Rate(info) => info.timestamp(),
            Self::Account(info) => info.timestamp(),
        }
    }
}

impl From<RateEventInfo> for EventInfo {
    fn from(info: RateEventInfo) -> Self {
        Self::Rate(info)
    }
}

impl From<AccountEventInfo> for EventInfo {
    fn from(info: AccountEventInfo) -> Self {
        Self::Account(info)
    }
}

impl fmt::Display for EventInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate(info) => info.fmt(f),
            Self::Account(info) => info.fmt(f),
        }
    }
}

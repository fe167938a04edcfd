//! Event subscriptions
//!
//! An event is a filter plus a reaction bound to one domain. Events are
//! shared through [`Event`], whose `Arc` handles are the ownership tokens
//! held by registries and by queued occurrences.

use super::info::{AccountEventInfo, Domain, KeyedInfo, RateEventInfo};
use super::manager::ManagerHandle;
use crate::error::ReactionError;
use crate::fx::{Pair, TransactionType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Drain-time filter
pub type Filter<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// User reaction run in the dispatching context
pub type Reaction<I> = Arc<dyn Fn(&I, &ManagerHandle) -> Result<(), ReactionError> + Send + Sync>;

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique event identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    fn next() -> Self {
        Self(NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A subscription to occurrences of one domain
pub struct DomainEvent<K, I> {
    id: EventId,
    key: Option<K>,
    transient: AtomicBool,
    filter: RwLock<Option<Filter<I>>>,
    reaction: RwLock<Option<Reaction<I>>>,
}

/// Subscription to rate updates, optionally bound to one pair
pub type RateEvent = DomainEvent<Pair, RateEventInfo>;

/// Subscription to account transactions, optionally bound to one transaction type
pub type AccountEvent = DomainEvent<TransactionType, AccountEventInfo>;

impl<K, I> DomainEvent<K, I>
where
    I: KeyedInfo<Key = K>,
    K: PartialEq,
{
    /// Create an event that sees every occurrence of its domain
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an event bound to a single key
    pub fn with_key(key: K) -> Self {
        Self::build(Some(key))
    }

    fn build(key: Option<K>) -> Self {
        Self {
            id: EventId::next(),
            key,
            transient: AtomicBool::new(false),
            filter: RwLock::new(None),
            reaction: RwLock::new(None),
        }
    }

    /// Set the reaction (builder form)
    pub fn on_event<F>(self, reaction: F) -> Self
    where
        F: Fn(&I, &ManagerHandle) -> Result<(), ReactionError> + Send + Sync + 'static,
    {
        self.set_reaction(reaction);
        self
    }

    /// Set the filter (builder form)
    pub fn filtered<F>(self, filter: F) -> Self
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.set_filter(filter);
        self
    }

    /// Mark as transient (builder form)
    pub fn transient(self) -> Self {
        self.set_transient(true);
        self
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn is_transient(&self) -> bool {
        self.transient.load(Ordering::Acquire)
    }

    /// A transient event is dropped from its manager once an occurrence is captured for it
    pub fn set_transient(&self, transient: bool) {
        self.transient.store(transient, Ordering::Release);
    }

    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Arc::new(filter));
    }

    pub fn clear_filter(&self) {
        *self.filter.write() = None;
    }

    pub fn set_reaction<F>(&self, reaction: F)
    where
        F: Fn(&I, &ManagerHandle) -> Result<(), ReactionError> + Send + Sync + 'static,
    {
        *self.reaction.write() = Some(Arc::new(reaction));
    }

    pub fn has_reaction(&self) -> bool {
        self.reaction.read().is_some()
    }

    /// Key check, applied when an occurrence is captured
    pub fn key_matches(&self, info: &I) -> bool {
        self.key.as_ref().map_or(true, |key| key == info.key())
    }

    /// Key and filter check, applied when a queued occurrence is dispatched
    pub fn matches(&self, info: &I) -> bool {
        if !self.key_matches(info) {
            return false;
        }
        // Clone out so the filter runs without the lock held.
        let filter = self.filter.read().clone();
        filter.map_or(true, |filter| filter(info))
    }

    pub(crate) fn reaction(&self) -> Option<Reaction<I>> {
        self.reaction.read().clone()
    }
}

impl<K, I> Default for DomainEvent<K, I>
where
    I: KeyedInfo<Key = K>,
    K: PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, I> fmt::Debug for DomainEvent<K, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainEvent")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("transient", &self.transient.load(Ordering::Relaxed))
            .field("filtered", &self.filter.read().is_some())
            .field("handled", &self.reaction.read().is_some())
            .finish()
    }
}

/// Shared handle to a registered event of either domain
#[derive(Debug, Clone)]
pub enum Event {
    Rate(Arc<RateEvent>),
    Account(Arc<AccountEvent>),
}

impl Event {
    pub fn id(&self) -> EventId {
        match self {
            Self::Rate(event) => event.id(),
            Self::Account(event) => event.id(),
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Self::Rate(_) => Domain::Rate,
            Self::Account(_) => Domain::Account,
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rate(event) => event.is_transient(),
            Self::Account(event) => event.is_transient(),
        }
    }

    pub fn as_rate(&self) -> Option<&Arc<RateEvent>> {
        match self {
            Self::Rate(event) => Some(event),
            Self::Account(_) => None,
        }
    }

    pub fn as_account(&self) -> Option<&Arc<AccountEvent>> {
        match self {
            Self::Account(event) => Some(event),
            Self::Rate(_) => None,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Event {}

impl From<Arc<RateEvent>> for Event {
    fn from(event: Arc<RateEvent>) -> Self {
        Self::Rate(event)
    }
}

impl From<Arc<AccountEvent>> for Event {
    fn from(event: Arc<AccountEvent>) -> Self {
        Self::Account(event)
    }
}

impl From<RateEvent> for Event {
    fn from(event: RateEvent) -> Self {
        Self::Rate(Arc::new(event))
    }
}

impl From<AccountEvent> for Event {
    fn from(event: AccountEvent) -> Self {
        Self::Account(Arc::new(event))
    }
}

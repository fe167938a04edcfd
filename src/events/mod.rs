//! Event model
//!
//! Rate and account occurrences are observed by sources on their own
//! threads. Each source owns an [`EventManager`] holding the [`Event`]s
//! registered on it; an occurrence is snapshotted into an [`EventInfo`] and
//! queued once per matching event, to be dispatched later by the
//! [`Dispatcher`](crate::bridge::Dispatcher).
//!
//! # Types
//! - `EventInfo`: immutable snapshot of a rate update or account transaction
//! - `RateEvent` / `AccountEvent`: filter plus reaction for one domain
//! - `Event`: shared handle to either kind
//! - `EventManager`: domain-tagged registry of events
//! - `ManagerHandle`: what a reaction may do to the manager it came from

mod event;
mod info;
mod manager;

pub use event::{AccountEvent, DomainEvent, Event, EventId, Filter, RateEvent, Reaction};
pub use info::{AccountEventInfo, Domain, EventInfo, KeyedInfo, RateEventInfo};
pub use manager::{EventManager, ManagerHandle};

#[cfg(test)]
mod tests;

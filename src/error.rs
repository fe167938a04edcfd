//! Error types for the event bridge

use crate::events::{Domain, EventId};
use thiserror::Error;

/// Error returned by a user reaction.
pub type ReactionError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Domain mismatch: {found} event cannot be registered on a {expected} event manager")]
    DomainMismatch { expected: Domain, found: Domain },

    #[error("Unhandled event: event {id} matched but has no reaction")]
    UnhandledEvent { id: EventId },

    #[error("Invalid event info type for the queued event")]
    InvalidEventInfoType,

    #[error("Concurrent loop: an event loop is already dispatching")]
    ConcurrentLoop,

    #[error("Reaction failed: {0}")]
    Reaction(#[source] ReactionError),

    #[error("Interrupted after dispatching {dispatched} events")]
    Interrupted { dispatched: usize },

    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    #[error("Signal handler error: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

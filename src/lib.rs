//! FX Event Bridge
//!
//! Carries rate and account updates, reported on producer threads, to
//! reactions that run one at a time in a single dispatching context.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fx;
pub mod source;


pub use bridge::{Dispatcher, EventQueue};
pub use error::{BridgeError, Result};

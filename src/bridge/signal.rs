//! Interrupt integration
//!
//! A dispatch loop blocked with no timeout would otherwise ignore ctrl-c.
//! The handler stops the loop and makes it report `Interrupted` to whoever
//! drives it. `ctrlc` runs the handler on its own thread rather than in
//! signal context, so it may take the queue lock.

use super::Dispatcher;
use crate::error::Result;

/// Install the process-wide SIGINT handler for `dispatcher`.
///
/// Can only succeed once per process.
pub fn install_interrupt_handler(dispatcher: Dispatcher) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::warn!("Interrupt received, stopping event loop");
        dispatcher.interrupt();
    })?;
    tracing::debug!("Interrupt handler installed");
    Ok(())
}

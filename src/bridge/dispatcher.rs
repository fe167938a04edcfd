//! Consumer side of the event bridge

use super::{EventQueue, QueueState, QueueStats, QueuedEvent};
use crate::error::{BridgeError, Result};
use crate::events::{Event, EventInfo, ManagerHandle};
use parking_lot::MutexGuard;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::{fs::File, os::fd::OwnedFd};

/// Drains the event queue and runs reactions in the calling context
///
/// Cheap to clone; every clone drives the same queue, so a clone can be
/// handed to another thread or to a signal handler to stop a running loop.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    queue: Arc<EventQueue>,
}

impl Dispatcher {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Dispatch what is already queued without blocking.
    ///
    /// Dispatches at most `max_events` occurrences (`None` or `Some(0)` for
    /// all of them) and returns how many were dequeued, including those
    /// whose event filter rejected them. A reaction may call this
    /// recursively.
    pub fn process_pending(&self, max_events: Option<usize>) -> Result<usize> {
        let mut state = self.queue.state.lock();
        self.drain(&mut state, max_events.filter(|&n| n > 0))
    }

    /// Block and dispatch occurrences as they arrive.
    ///
    /// Returns once `max_events` occurrences have been dequeued, once
    /// `timeout` has elapsed, or once [`stop_loop`](Self::stop_loop) is
    /// called. A zero timeout or zero limit means none. Only one loop may
    /// run at a time.
    pub fn process_loop(&self, timeout: Option<Duration>, max_events: Option<usize>) -> Result<usize> {
        let deadline = timeout.filter(|t| !t.is_zero()).map(|t| Instant::now() + t);
        let limit = max_events.filter(|&n| n > 0);

        let mut state = self.queue.state.lock();
        if self.queue.active.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::ConcurrentLoop);
        }
        let active = ActiveLoop(&self.queue);
        self.queue.stop_requested.store(false, Ordering::SeqCst);
        self.queue.interrupted.store(false, Ordering::SeqCst);
        tracing::info!("Event loop started (timeout: {:?}, max events: {:?})", timeout, limit);

        let mut dispatched = 0;
        let result = loop {
            if self.queue.stop_requested.load(Ordering::SeqCst) {
                break Ok(dispatched);
            }

            match self.drain(&mut state, limit.map(|n| n - dispatched)) {
                Ok(n) => dispatched += n,
                Err(e) => break Err(e),
            }

            if limit.is_some_and(|n| dispatched >= n) {
                break Ok(dispatched);
            }
            // A reaction may have stopped the loop while the lock was released.
            if self.queue.stop_requested.load(Ordering::SeqCst) {
                break Ok(dispatched);
            }

            match deadline {
                None => self.queue.arrivals.wait(&mut state),
                Some(deadline) => {
                    if self.queue.arrivals.wait_until(&mut state, deadline).timed_out() {
                        tracing::debug!("Event loop timed out after {} events", dispatched);
                        break Ok(dispatched);
                    }
                }
            }
        };

        let interrupted = self.queue.interrupted.swap(false, Ordering::SeqCst);
        drop(active);
        drop(state);

        if interrupted && result.is_ok() {
            tracing::info!("Event loop interrupted after {} events", dispatched);
            return Err(BridgeError::Interrupted { dispatched });
        }
        match &result {
            Ok(n) => tracing::info!("Event loop finished after {} events", n),
            Err(e) => tracing::warn!("Event loop aborted: {}", e),
        }
        result
    }

    /// Block until one occurrence has been dispatched or `timeout` elapses
    pub fn process_one(&self, timeout: Option<Duration>) -> Result<()> {
        self.process_loop(timeout, Some(1)).map(|_| ())
    }

    /// Make a running loop return. Harmless when no loop is running.
    pub fn stop_loop(&self) {
        self.queue.stop_requested.store(true, Ordering::SeqCst);
        // Taking the lock orders the notify after the loop's last flag check.
        let _state = self.queue.state.lock();
        self.queue.arrivals.notify_all();
    }

    /// Stop a running loop and have it report [`BridgeError::Interrupted`]
    pub fn interrupt(&self) {
        if self.queue.active.load(Ordering::SeqCst) {
            self.queue.interrupted.store(true, Ordering::SeqCst);
        }
        self.stop_loop();
    }

    pub fn is_dispatching(&self) -> bool {
        self.queue.active.load(Ordering::SeqCst)
    }

    /// Register the descriptor written to on every capture, or clear it.
    ///
    /// One byte is written per captured occurrence so that a readiness loop
    /// (`select`, `epoll`, an async reactor) polling the other end can call
    /// [`process_pending`](Self::process_pending). The descriptor should be
    /// non-blocking; write failures are ignored.
    #[cfg(unix)]
    pub fn set_waker_fd(&self, fd: Option<OwnedFd>) {
        tracing::debug!("Waker {}", if fd.is_some() { "registered" } else { "cleared" });
        self.queue.set_waker(fd.map(File::from));
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Human-readable queue status
    pub fn dump_events(&self) -> String {
        self.queue.dump()
    }

    fn drain(&self, state: &mut MutexGuard<'_, QueueState>, limit: Option<usize>) -> Result<usize> {
        let mut processed = 0;
        while limit.map_or(true, |n| processed < n) {
            let Some(queued) = state.pending.pop_front() else {
                break;
            };
            state.dispatched += 1;
            processed += 1;

            // Reactions run without the queue lock so producers never wait on them.
            MutexGuard::unlocked(state, || dispatch(queued))?;
        }
        Ok(processed)
    }
}

/// Marks the loop inactive when it leaves scope, including on unwind
struct ActiveLoop<'a>(&'a EventQueue);

impl Drop for ActiveLoop<'_> {
    fn drop(&mut self) {
        self.0.active.store(false, Ordering::SeqCst);
    }
}

/// Run one queued occurrence through its event
fn dispatch(queued: QueuedEvent) -> Result<()> {
    let QueuedEvent { seq, event, info, manager } = queued;
    match (&event, &info) {
        (Event::Rate(event), EventInfo::Rate(info)) => {
            if !event.matches(info) {
                tracing::debug!("Occurrence #{} filtered out by event {}", seq, event.id());
                return Ok(());
            }
            let reaction = event
                .reaction()
                .ok_or(BridgeError::UnhandledEvent { id: event.id() })?;
            tracing::debug!("Dispatching rate occurrence #{} to event {}", seq, event.id());
            reaction(info, &ManagerHandle::new(manager)).map_err(BridgeError::Reaction)
        }
        (Event::Account(event), EventInfo::Account(info)) => {
            if !event.matches(info) {
                tracing::debug!("Occurrence #{} filtered out by event {}", seq, event.id());
                return Ok(());
            }
            let reaction = event
                .reaction()
                .ok_or(BridgeError::UnhandledEvent { id: event.id() })?;
            tracing::debug!("Dispatching account occurrence #{} to event {}", seq, event.id());
            reaction(info, &ManagerHandle::new(manager)).map_err(BridgeError::Reaction)
        }
        _ => Err(BridgeError::InvalidEventInfoType),
    }
}

//! Event bridge
//!
//! Sources observe occurrences on threads the consumer does not control.
//! Reactions must instead run one at a time in a single dispatching
//! context, so occurrences are captured into a shared FIFO and drained by
//! the [`Dispatcher`].
//!
//! ```text
//! producer threads                       consumer context
//!   source -> EventManager::route          Dispatcher::process_loop
//!                 |                                ^
//!                 v                                |
//!            EventQueue::capture ---> [ FIFO ] ----+
//!                 |
//!                 +--> waker fd (optional, for readiness loops)
//! ```

mod dispatcher;
pub mod signal;

pub use dispatcher::Dispatcher;

use crate::events::{Event, EventInfo, EventManager};
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::sync::atomic::AtomicBool;

/// A captured occurrence awaiting dispatch
///
/// Holds strong handles to the event and its source manager, so the event
/// stays alive until its occurrence has been dispatched even if it is
/// unregistered in the meantime.
#[derive(Debug)]
pub struct QueuedEvent {
    seq: u64,
    event: Event,
    info: EventInfo,
    manager: EventManager,
}

impl QueuedEvent {
    /// Capture sequence number
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn info(&self) -> &EventInfo {
        &self.info
    }

    pub fn manager(&self) -> &EventManager {
        &self.manager
    }
}

/// State guarded by the queue lock
#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedEvent>,
    /// Logical timestamp of the last captured occurrence
    last_timestamp: Option<i64>,
    /// Wall-clock time of the last capture
    last_realtime: Option<DateTime<Utc>>,
    captured: u64,
    dispatched: u64,
    waker: Option<File>,
}

/// Queue diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Occurrences waiting to be dispatched
    pub pending: usize,
    pub last_timestamp: Option<i64>,
    pub last_realtime: Option<DateTime<Utc>>,
    /// Occurrences captured since creation
    pub captured: u64,
    /// Occurrences dequeued since creation
    pub dispatched: u64,
    /// Whether a dispatch loop is running
    pub dispatching: bool,
    pub waker_registered: bool,
}

/// Shared FIFO between producer threads and the dispatcher
///
/// Lives for as long as any source or dispatcher holds it; producers and the
/// dispatcher share it through an `Arc`.
pub struct EventQueue {
    state: Mutex<QueueState>,
    arrivals: Condvar,
    /// Owned by the running loop; set and cleared only by `process_loop`
    active: AtomicBool,
    stop_requested: AtomicBool,
    interrupted: AtomicBool,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            arrivals: Condvar::new(),
            active: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
        }
    }

    /// Capture one occurrence for `event`, observed by `manager`'s source.
    ///
    /// Safe to call from any thread, concurrently with other captures and
    /// with dispatching. Returns the capture sequence number.
    ///
    /// # Panics
    ///
    /// Panics if the event and the info belong to different domains; sources
    /// only route infos of their own domain.
    pub fn capture(&self, event: &Event, info: &EventInfo, manager: &EventManager) -> u64 {
        assert_eq!(
            event.domain(),
            info.domain(),
            "captured {} info for {} event {}",
            info.domain(),
            event.domain(),
            event.id()
        );

        let seq = {
            let mut state = self.state.lock();
            let seq = state.captured;
            state.captured += 1;
            state.pending.push_back(QueuedEvent {
                seq,
                event: event.clone(),
                info: info.clone(),
                manager: manager.clone(),
            });

            state.last_timestamp = Some(info.timestamp());
            state.last_realtime = Some(Utc::now());

            if let Some(waker) = state.waker.as_mut() {
                if let Err(e) = waker.write(b"@") {
                    tracing::trace!("Waker write ignored: {}", e);
                }
            }
            seq
        };
        self.arrivals.notify_one();

        tracing::trace!("Captured {} occurrence #{} for event {}", info.domain(), seq, event.id());
        seq
    }

    /// Number of occurrences waiting to be dispatched
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            pending: state.pending.len(),
            last_timestamp: state.last_timestamp,
            last_realtime: state.last_realtime,
            captured: state.captured,
            dispatched: state.dispatched,
            dispatching: self.active.load(std::sync::atomic::Ordering::SeqCst),
            waker_registered: state.waker.is_some(),
        }
    }

    /// Human-readable queue status
    pub fn dump(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "last timestamp: {}",
            stats.last_timestamp.map_or_else(|| "-".to_string(), |t| t.to_string())
        );
        let _ = writeln!(
            out,
            "last realtime: {}",
            stats.last_realtime.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
        );
        let _ = writeln!(out, "pending events: {}", stats.pending);
        let _ = writeln!(out, "captured: {} dispatched: {}", stats.captured, stats.dispatched);
        let _ = writeln!(out, "dispatching: {}", stats.dispatching);
        out
    }

    fn set_waker(&self, waker: Option<File>) {
        self.state.lock().waker = waker;
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue").field("stats", &self.stats()).finish()
    }
}

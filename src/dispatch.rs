//! Dispatch strategies
//!
//! Three ways of driving the dispatcher from an application:
//! - `Blocking`: run the loop in the calling thread
//! - `Thread`: run the loop on a dedicated thread, stopped from a timer
//! - `Readiness`: integrate with an async reactor through the waker descriptor

use crate::bridge::Dispatcher;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How events are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMethod {
    /// Block the calling thread in the event loop
    #[default]
    Blocking,
    /// Run the event loop on a separate thread
    Thread,
    /// Wake an async reactor through the waker descriptor
    Readiness,
}

/// Dispatch events with `method` for `duration` (forever when `None`),
/// or until `max_events` have been dispatched.
///
/// An interrupt ends the run normally. Returns the number of events
/// dispatched.
pub fn run(
    method: DispatchMethod,
    dispatcher: &Dispatcher,
    duration: Option<Duration>,
    max_events: Option<usize>,
) -> Result<usize> {
    tracing::info!("Dispatching events ({:?}, duration: {:?})", method, duration);
    let outcome = match method {
        DispatchMethod::Blocking => dispatcher.process_loop(duration, max_events),
        DispatchMethod::Thread => run_thread(dispatcher, duration, max_events),
        DispatchMethod::Readiness => run_readiness(dispatcher, duration, max_events),
    };
    match outcome {
        Err(BridgeError::Interrupted { dispatched }) => Ok(dispatched),
        other => other,
    }
}

fn run_thread(dispatcher: &Dispatcher, duration: Option<Duration>, max_events: Option<usize>) -> Result<usize> {
    let runner = dispatcher.clone();
    let worker = thread::spawn(move || runner.process_loop(None, max_events));

    let done = Arc::new(AtomicBool::new(false));
    if let Some(duration) = duration {
        let stopper = dispatcher.clone();
        let done = done.clone();
        thread::spawn(move || {
            thread::sleep(duration);
            // Keep stopping until the worker is gone; it may not have entered the loop yet.
            while !done.load(Ordering::SeqCst) {
                stopper.stop_loop();
                thread::sleep(Duration::from_millis(10));
            }
        });
    }

    let outcome = worker.join();
    done.store(true, Ordering::SeqCst);
    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(unix)]
fn run_readiness(dispatcher: &Dispatcher, duration: Option<Duration>, max_events: Option<usize>) -> Result<usize> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(readiness_loop(dispatcher, duration, max_events))
}

#[cfg(not(unix))]
fn run_readiness(_dispatcher: &Dispatcher, _duration: Option<Duration>, _max_events: Option<usize>) -> Result<usize> {
    Err(BridgeError::Config("readiness dispatch needs Unix descriptors".to_string()))
}

/// Dispatch from an async reactor woken by the waker descriptor.
///
/// Registers one end of a socket pair as the waker for the duration of the
/// call and processes pending events whenever the other end becomes
/// readable. Returns after `duration`, once `max_events` have been
/// dispatched, or on ctrl-c.
#[cfg(unix)]
pub async fn readiness_loop(
    dispatcher: &Dispatcher,
    duration: Option<Duration>,
    max_events: Option<usize>,
) -> Result<usize> {
    use std::os::fd::OwnedFd;

    let (reader, writer) = std::os::unix::net::UnixStream::pair()?;
    reader.set_nonblocking(true)?;
    writer.set_nonblocking(true)?;
    let reader = tokio::net::UnixStream::from_std(reader)?;

    dispatcher.set_waker_fd(Some(OwnedFd::from(writer)));
    let outcome = wake_loop(dispatcher, &reader, duration, max_events.filter(|&n| n > 0)).await;
    dispatcher.set_waker_fd(None);
    outcome
}

#[cfg(unix)]
async fn wake_loop(
    dispatcher: &Dispatcher,
    reader: &tokio::net::UnixStream,
    duration: Option<Duration>,
    limit: Option<usize>,
) -> Result<usize> {
    // Anything captured before the waker was registered.
    let mut total = dispatcher.process_pending(limit)?;
    if limit.is_some_and(|n| total >= n) {
        return Ok(total);
    }

    let stop = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(stop);

    let mut buf = [0u8; 256];
    loop {
        tokio::select! {
            ready = reader.readable() => {
                ready?;
                loop {
                    match reader.try_read(&mut buf) {
                        Ok(0) => return Ok(total),
                        Ok(_) => continue,
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                        Err(e) => return Err(e.into()),
                    }
                }
                total += dispatcher.process_pending(limit.map(|n| n - total))?;
                if limit.is_some_and(|n| total >= n) {
                    return Ok(total);
                }
            }
            _ = &mut stop => return Ok(total),
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupt received, leaving readiness loop");
                return Ok(total);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventQueue;
    use crate::fx::{Pair, Tick};
    use crate::events::RateEvent;
    use crate::source::RateTable;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn counting_table() -> (Arc<RateTable>, Dispatcher, Arc<AtomicUsize>) {
        let queue = Arc::new(EventQueue::new());
        let table = Arc::new(RateTable::new(queue.clone()));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        table
            .event_manager()
            .add(RateEvent::new().on_event(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        (table, Dispatcher::new(queue), count)
    }

    fn produce(table: Arc<RateTable>, n: i64) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            for ts in 0..n {
                thread::sleep(Duration::from_millis(10));
                table.update(Pair::new("EUR", "USD"), Tick::new(ts, dec!(1.1000), dec!(1.1002)));
            }
        })
    }

    #[test]
    fn test_method_parses_from_config_names() {
        let method: DispatchMethod = serde_json::from_str("\"readiness\"").unwrap();
        assert_eq!(method, DispatchMethod::Readiness);
        assert_eq!(DispatchMethod::default(), DispatchMethod::Blocking);
    }

    #[test]
    fn test_blocking_dispatch() {
        let (table, dispatcher, count) = counting_table();
        let producer = produce(table, 5);

        let dispatched = run(DispatchMethod::Blocking, &dispatcher, Some(Duration::from_millis(500)), None).unwrap();
        producer.join().unwrap();

        assert_eq!(dispatched, 5);
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_thread_dispatch_stops_after_duration() {
        let (table, dispatcher, count) = counting_table();
        let producer = produce(table, 5);

        let start = Instant::now();
        let dispatched = run(DispatchMethod::Thread, &dispatcher, Some(Duration::from_millis(500)), None).unwrap();
        producer.join().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(dispatched, 5);
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert!(!dispatcher.is_dispatching());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_readiness_dispatch() {
        let (table, dispatcher, count) = counting_table();
        table.update(Pair::new("EUR", "USD"), Tick::new(0, dec!(1.1), dec!(1.2)));
        let producer = produce(table, 5);

        let dispatched = readiness_loop(&dispatcher, Some(Duration::from_millis(500)), None).await.unwrap();
        producer.join().unwrap();

        assert_eq!(dispatched, 6);
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert!(!dispatcher.stats().waker_registered);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_readiness_dispatch_stops_at_max_events() {
        let (table, dispatcher, count) = counting_table();
        let producer = produce(table, 5);

        let dispatched = readiness_loop(&dispatcher, Some(Duration::from_secs(10)), Some(3)).await.unwrap();
        producer.join().unwrap();

        assert_eq!(dispatched, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.stats().pending, 2);
    }
}

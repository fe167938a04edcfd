//! Simulated market feed
//!
//! Background threads that push random-walk quotes into a rate table and
//! random fills into accounts, the way a vendor client library reports
//! updates from its own worker threads.

use super::{Account, RateTable};
use crate::fx::{Pair, Tick, Transaction, TransactionType};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Half spread applied around the simulated mid, in price units
const HALF_SPREAD: Decimal = dec!(0.0001);

/// Feed settings
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub pairs: Vec<Pair>,
    pub tick_interval: Duration,
    pub account_interval: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            pairs: vec![Pair::new("EUR", "USD"), Pair::new("USD", "JPY")],
            tick_interval: Duration::from_millis(250),
            account_interval: Duration::from_secs(2),
        }
    }
}

/// Running producer threads; stopped on drop
pub struct SimulatedFeed {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl SimulatedFeed {
    /// Start one rate thread and one thread per account
    pub fn start(table: Arc<RateTable>, accounts: Vec<Arc<Account>>, settings: FeedSettings) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let mut handles = Vec::with_capacity(accounts.len() + 1);

        {
            let running = running.clone();
            let settings = settings.clone();
            handles.push(thread::spawn(move || run_rates(&table, &settings, &running)));
        }
        for account in accounts {
            let running = running.clone();
            let interval = settings.account_interval;
            let pair = settings.pairs.first().cloned().unwrap_or_else(|| Pair::new("EUR", "USD"));
            handles.push(thread::spawn(move || run_account(&account, &pair, interval, &running)));
        }

        tracing::info!("Simulated feed started ({} producer threads)", handles.len());
        Self { running, handles }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop and join the producer threads
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Feed producer thread panicked");
            }
        }
    }
}

impl Drop for SimulatedFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_rates(table: &RateTable, settings: &FeedSettings, running: &AtomicBool) {
    let mut rng = rand::rng();
    while running.load(Ordering::SeqCst) {
        let now = Utc::now().timestamp();
        for pair in &settings.pairs {
            let mid = table.latest(pair).map_or(Decimal::ONE, |t| t.mid());
            let step = Decimal::new(rng.random_range(-5i64..=5), 4);
            let mid = (mid + step).max(dec!(0.0010));
            table.update(pair.clone(), Tick::new(now, mid - HALF_SPREAD, mid + HALF_SPREAD));
        }
        thread::sleep(settings.tick_interval);
    }
}

fn run_account(account: &Account, pair: &Pair, interval: Duration, running: &AtomicBool) {
    let mut rng = rand::rng();
    let mut number = account.transactions().len() as i64;
    let mut balance = account.balance().max(dec!(10000));
    while running.load(Ordering::SeqCst) {
        thread::sleep(interval);
        if !running.load(Ordering::SeqCst) {
            break;
        }

        number += 1;
        let units = rng.random_range(1i64..=10) * 1000;
        let (kind, units) = if rng.random_bool(0.5) {
            ("Buy Market", units)
        } else {
            ("Sell Market", -units)
        };
        let price = Decimal::ONE + Decimal::new(rng.random_range(-100i64..=100), 4);
        balance += Decimal::new(rng.random_range(-500i64..=500), 2);

        let transaction = Transaction::new(number, TransactionType::new(kind), Utc::now().timestamp(), pair.clone())
            .with_fill(units, price)
            .with_balance(balance);
        account.record(transaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Dispatcher, EventQueue};
    use crate::events::{AccountEvent, RateEvent};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_feed_produces_and_stops() {
        let queue = Arc::new(EventQueue::new());
        let table = Arc::new(RateTable::new(queue.clone()));
        let account = Arc::new(Account::new(1, queue.clone()));

        let ticks = Arc::new(AtomicUsize::new(0));
        let fills = Arc::new(AtomicUsize::new(0));
        let tick_counter = ticks.clone();
        let fill_counter = fills.clone();
        table
            .event_manager()
            .add(RateEvent::new().on_event(move |info, _| {
                assert!(info.tick().ask > info.tick().bid);
                tick_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        account
            .event_manager()
            .add(AccountEvent::new().on_event(move |info, _| {
                assert_ne!(info.transaction().units, 0);
                fill_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        let settings = FeedSettings {
            pairs: vec![Pair::new("EUR", "USD")],
            tick_interval: Duration::from_millis(10),
            account_interval: Duration::from_millis(20),
        };
        let mut feed = SimulatedFeed::start(table.clone(), vec![account.clone()], settings);
        assert!(feed.is_running());

        let dispatcher = Dispatcher::new(queue.clone());
        dispatcher.process_loop(Some(Duration::from_millis(300)), None).unwrap();
        feed.stop();
        assert!(!feed.is_running());
        dispatcher.process_pending(None).unwrap();

        assert!(ticks.load(Ordering::SeqCst) > 0);
        assert!(fills.load(Ordering::SeqCst) > 0);
        assert!(table.latest(&Pair::new("EUR", "USD")).is_some());
        assert!(queue.is_empty());
    }
}

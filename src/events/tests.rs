//! Tests for the event model and registries

use super::*;
use crate::bridge::EventQueue;
use crate::error::BridgeError;
use crate::fx::{Pair, Tick, Transaction, TransactionType};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn eur_usd() -> Pair {
    Pair::new("EUR", "USD")
}

fn rate_info(pair: Pair, timestamp: i64) -> RateEventInfo {
    RateEventInfo::new(pair, Tick::new(timestamp, dec!(1.1000), dec!(1.1002)))
}

fn account_info(number: i64, kind: &str, timestamp: i64) -> AccountEventInfo {
    AccountEventInfo::new(Transaction::new(number, kind.into(), timestamp, eur_usd()))
}

#[test]
fn test_rate_info_fields() {
    let info = rate_info(Pair::new("EUR", "JPY"), 400);

    assert_eq!(info.pair(), &Pair::new("EUR", "JPY"));
    assert_eq!(info.tick().bid, dec!(1.1000));
    assert_eq!(info.timestamp(), 400);
    assert_eq!(EventInfo::from(info).domain(), Domain::Rate);
}

#[test]
fn test_rate_info_compare_less() {
    let a = rate_info(eur_usd(), 400);
    let b = rate_info(eur_usd(), 401);

    assert!(a.compare_less(&b));
    assert!(!b.compare_less(&a));
    assert!(!a.compare_less(&a.clone()));
}

#[test]
fn test_account_info_compare_less() {
    let a = account_info(1, "Buy Market", 10);
    let b = account_info(2, "Buy Market", 10);
    let c = account_info(0, "Buy Market", 11);

    assert!(a.compare_less(&b));
    assert!(b.compare_less(&c));
    assert!(!a.compare_less(&a.clone()));
    assert_eq!(EventInfo::from(c).timestamp(), 11);
}

#[test]
fn test_event_ids_unique() {
    let a = RateEvent::new();
    let b = RateEvent::new();
    let c = AccountEvent::new();

    assert_ne!(a.id(), b.id());
    assert_ne!(b.id(), c.id());
}

#[test]
fn test_unfiltered_event_matches_everything() {
    let event = RateEvent::new();

    assert!(event.matches(&rate_info(eur_usd(), 1)));
    assert!(event.matches(&rate_info(Pair::new("USD", "JPY"), 2)));
}

#[test]
fn test_keyed_event_matches_its_pair_only() {
    let event = RateEvent::with_key(eur_usd());

    assert!(event.key_matches(&rate_info(eur_usd(), 1)));
    assert!(!event.key_matches(&rate_info(Pair::new("USD", "JPY"), 1)));
    assert!(!event.matches(&rate_info(Pair::new("USD", "JPY"), 1)));
}

#[test]
fn test_account_event_keyed_by_transaction_type() {
    let event = AccountEvent::with_key(TransactionType::new("Order Cancelled"));

    assert!(event.matches(&account_info(1, "Order Cancelled", 5)));
    assert!(!event.matches(&account_info(2, "Buy Market", 5)));
}

#[test]
fn test_filter_is_applied_and_replaceable() {
    let event = RateEvent::new().filtered(|info: &RateEventInfo| info.timestamp() > 100);

    assert!(!event.matches(&rate_info(eur_usd(), 50)));
    assert!(event.matches(&rate_info(eur_usd(), 150)));

    event.set_filter(|_: &RateEventInfo| false);
    assert!(!event.matches(&rate_info(eur_usd(), 150)));

    event.clear_filter();
    assert!(event.matches(&rate_info(eur_usd(), 50)));
}

#[test]
fn test_transient_flag() {
    let event = AccountEvent::new();
    assert!(!event.is_transient());

    event.set_transient(true);
    assert!(event.is_transient());
    event.set_transient(false);
    assert!(!event.is_transient());

    assert!(AccountEvent::new().transient().is_transient());
}

#[test]
fn test_event_equality_is_identity() {
    let shared = Arc::new(RateEvent::new());
    let a = Event::from(shared.clone());
    let b = Event::from(shared);
    let c = Event::from(RateEvent::new());

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.as_rate().is_some());
    assert!(a.as_account().is_none());
}

#[test]
fn test_manager_add_remove_events() {
    for (event, manager) in [
        (Event::from(RateEvent::new()), EventManager::new(Domain::Rate)),
        (Event::from(AccountEvent::new()), EventManager::new(Domain::Account)),
    ] {
        assert!(manager.events().is_empty());

        manager.add(event.clone()).unwrap();
        let events = manager.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], event);
        assert_eq!(events[0].domain(), manager.domain());

        manager.remove(event).unwrap();
        assert!(manager.is_empty());
    }
}

#[test]
fn test_manager_add_twice_keeps_one() {
    let manager = EventManager::new(Domain::Rate);
    let event = Arc::new(RateEvent::new());

    manager.add(event.clone()).unwrap();
    manager.add(event).unwrap();

    assert_eq!(manager.len(), 1);
}

#[test]
fn test_manager_remove_absent_is_noop() {
    let manager = EventManager::new(Domain::Account);

    manager.remove(AccountEvent::new()).unwrap();
    assert!(manager.is_empty());
}

#[test]
fn test_manager_rejects_wrong_domain() {
    let accounts = EventManager::new(Domain::Account);
    let rates = EventManager::new(Domain::Rate);

    let err = accounts.add(RateEvent::new()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::DomainMismatch {
            expected: Domain::Account,
            found: Domain::Rate
        }
    ));
    assert!(accounts.is_empty());

    assert!(rates.add(AccountEvent::new()).is_err());
    assert!(rates.remove(AccountEvent::new()).is_err());
    assert!(rates.is_empty());
}

#[test]
fn test_manager_clones_share_registry() {
    let manager = EventManager::new(Domain::Rate);
    let other = manager.clone();

    other.add(RateEvent::new()).unwrap();

    assert_eq!(manager.len(), 1);
    assert!(manager.same_registry(&other));
    assert!(!manager.same_registry(&EventManager::new(Domain::Rate)));
}

#[test]
fn test_route_captures_key_matches() {
    let queue = EventQueue::new();
    let manager = EventManager::new(Domain::Rate);
    let any = Arc::new(RateEvent::new());
    let eur = Arc::new(RateEvent::with_key(eur_usd()));
    let jpy = Arc::new(RateEvent::with_key(Pair::new("USD", "JPY")));
    manager.add(any).unwrap();
    manager.add(eur).unwrap();
    manager.add(jpy).unwrap();

    let captured = manager.route(&queue, &rate_info(eur_usd(), 10).into());

    assert_eq!(captured, 2);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_route_unregisters_transient_events() {
    let queue = EventQueue::new();
    let manager = EventManager::new(Domain::Account);
    let once = Arc::new(AccountEvent::new().transient());
    let always = Arc::new(AccountEvent::new());
    manager.add(once.clone()).unwrap();
    manager.add(always.clone()).unwrap();

    manager.route(&queue, &account_info(1, "Buy Market", 1).into());
    manager.route(&queue, &account_info(2, "Buy Market", 2).into());

    assert_eq!(queue.len(), 3);
    assert!(!manager.contains(once.id()));
    assert!(manager.contains(always.id()));
}

#[test]
fn test_concurrent_routes_capture_transient_event_once() {
    let queue = Arc::new(EventQueue::new());
    let manager = EventManager::new(Domain::Rate);
    manager.add(RateEvent::new().transient().on_event(|_, _| Ok(()))).unwrap();
    manager.add(RateEvent::new().on_event(|_, _| Ok(()))).unwrap();

    let barrier = Arc::new(std::sync::Barrier::new(8));
    let producers: Vec<_> = (0..8i64)
        .map(|t| {
            let queue = queue.clone();
            let manager = manager.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                manager.route(&queue, &EventInfo::Rate(rate_info(eur_usd(), t)))
            })
        })
        .collect();
    let captured: usize = producers.into_iter().map(|p| p.join().unwrap()).sum();

    // Eight for the persistent event, one for the transient event.
    assert_eq!(captured, 9);
    assert_eq!(queue.len(), 9);
    assert_eq!(manager.len(), 1);
}

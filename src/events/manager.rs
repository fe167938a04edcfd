//! Per-source event registries

use super::event::{Event, EventId};
use super::info::{Domain, EventInfo};
use crate::bridge::EventQueue;
use crate::error::{BridgeError, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

struct Registry {
    domain: Domain,
    events: Mutex<BTreeMap<EventId, Event>>,
}

/// Registry of the events attached to one rate table or account
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct EventManager {
    registry: Arc<Registry>,
}

impl EventManager {
    pub fn new(domain: Domain) -> Self {
        Self {
            registry: Arc::new(Registry {
                domain,
                events: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn domain(&self) -> Domain {
        self.registry.domain
    }

    /// Register an event. Adding an event that is already present does nothing.
    pub fn add(&self, event: impl Into<Event>) -> Result<()> {
        let event = event.into();
        self.check_domain(&event)?;
        let id = event.id();
        self.registry.events.lock().insert(id, event);
        tracing::debug!("Registered {} event {}", self.domain(), id);
        Ok(())
    }

    /// Unregister an event. Removing an absent event does nothing.
    pub fn remove(&self, event: impl Into<Event>) -> Result<()> {
        let event = event.into();
        self.check_domain(&event)?;
        if self.registry.events.lock().remove(&event.id()).is_some() {
            tracing::debug!("Removed {} event {}", self.domain(), event.id());
        }
        Ok(())
    }

    /// Snapshot of the registered events, ordered by id
    pub fn events(&self) -> Vec<Event> {
        self.registry.events.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.registry.events.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.registry.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.events.lock().is_empty()
    }

    /// Whether both handles point at the same registry
    pub fn same_registry(&self, other: &EventManager) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry)
    }

    /// Route an occurrence observed by this manager's source into `queue`.
    ///
    /// Every registered event whose key matches gets one queued occurrence.
    /// Transient events are unregistered in the same critical section that
    /// selects them, so concurrent routes capture each at most once.
    /// Returns the number of occurrences captured.
    pub fn route(&self, queue: &EventQueue, info: &EventInfo) -> usize {
        debug_assert_eq!(info.domain(), self.domain());

        let targets: Vec<Event> = {
            let mut events = self.registry.events.lock();
            let targets: Vec<Event> = events
                .values()
                .filter(|event| match (event, info) {
                    (Event::Rate(event), EventInfo::Rate(info)) => event.key_matches(info),
                    (Event::Account(event), EventInfo::Account(info)) => event.key_matches(info),
                    _ => false,
                })
                .cloned()
                .collect();
            for event in targets.iter().filter(|event| event.is_transient()) {
                events.remove(&event.id());
                tracing::debug!("Transient {} event {} unregistered", self.domain(), event.id());
            }
            targets
        };

        for event in &targets {
            queue.capture(event, info, self);
        }
        targets.len()
    }

    fn check_domain(&self, event: &Event) -> Result<()> {
        if event.domain() != self.domain() {
            return Err(BridgeError::DomainMismatch {
                expected: self.domain(),
                found: event.domain(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("domain", &self.domain())
            .field("events", &self.len())
            .finish()
    }
}

/// The manager capability handed to a reaction
///
/// Bound to the manager that captured the occurrence being dispatched; it can
/// register, unregister and list events on that manager and nothing else.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    manager: EventManager,
}

impl ManagerHandle {
    pub(crate) fn new(manager: EventManager) -> Self {
        Self { manager }
    }

    pub fn domain(&self) -> Domain {
        self.manager.domain()
    }

    pub fn add(&self, event: impl Into<Event>) -> Result<()> {
        self.manager.add(event)
    }

    pub fn remove(&self, event: impl Into<Event>) -> Result<()> {
        self.manager.remove(event)
    }

    pub fn events(&self) -> Vec<Event> {
        self.manager.events()
    }
}

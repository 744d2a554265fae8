//! Per-host event bus.
//!
//! Dispatch is synchronous and single-threaded. Every trigger works on its
//! own snapshot of the listener list, and no internal borrow is held while a
//! listener runs, so listeners may freely subscribe, unsubscribe or trigger
//! again (on this bus or any other) from inside a callback.

use crate::error::EventError;
use crate::types::{ObjectId, SubscriptionId, UserInfo};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace};

/// Listener callback. Returning `Err` marks the invocation as failed; the
/// bus logs it and moves on to the next listener.
pub type Callback = Rc<dyn Fn(Option<&UserInfo>) -> Result<(), EventError>>;

struct Subscription {
    id: SubscriptionId,
    owner: ObjectId,
    once: bool,
    callback: Callback,
}

/// Dispatch counters for one bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    pub events_triggered: u64,
    pub listeners_invoked: u64,
    pub listener_failures: u64,
    pub active_listeners: usize,
}

struct BusInner {
    host_id: ObjectId,
    scope: String,
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<String, Vec<Subscription>>>,
    /// subscription id -> event name, for point removal and liveness checks
    index: RefCell<HashMap<SubscriptionId, String>>,
    stats: RefCell<BusStats>,
}

/// Ordered publish/subscribe registry owned by a single host.
///
/// `EventBus` is a cheap reference-counted handle; clones share the same
/// listeners. Other objects should keep a [`WeakEventBus`] so they never
/// extend the host's lifetime.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

/// Non-owning handle to an [`EventBus`].
#[derive(Clone)]
pub struct WeakEventBus {
    inner: Weak<BusInner>,
}

impl WeakEventBus {
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl EventBus {
    /// Create a bus for the host identified by `host_id`. `scope` is the
    /// label used in diagnostics (e.g. "Core", "Container").
    pub fn new(host_id: ObjectId, scope: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(BusInner {
                host_id,
                scope: scope.into(),
                next_id: Cell::new(1),
                listeners: RefCell::new(HashMap::new()),
                index: RefCell::new(HashMap::new()),
                stats: RefCell::new(BusStats::default()),
            }),
        }
    }

    pub fn host_id(&self) -> ObjectId {
        self.inner.host_id
    }

    pub fn scope(&self) -> &str {
        &self.inner.scope
    }

    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True when both handles point at the same bus.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a persistent listener.
    pub fn on<F>(&self, event_name: impl AsRef<str>, owner: ObjectId, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + 'static,
    {
        self.subscribe(event_name.as_ref(), owner, false, Rc::new(callback))
    }

    /// Register a listener that is removed right before its first invocation.
    pub fn once<F>(&self, event_name: impl AsRef<str>, owner: ObjectId, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + 'static,
    {
        self.subscribe(event_name.as_ref(), owner, true, Rc::new(callback))
    }

    fn subscribe(&self, event_name: &str, owner: ObjectId, once: bool, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        self.inner
            .listeners
            .borrow_mut()
            .entry(event_name.to_string())
            .or_default()
            .push(Subscription {
                id,
                owner,
                once,
                callback,
            });
        self.inner
            .index
            .borrow_mut()
            .insert(id, event_name.to_string());

        debug!(
            scope = %self.inner.scope,
            subscription = %id,
            once,
            "📝 Registered listener for {}",
            event_name
        );
        id
    }

    /// Remove a single subscription. Unknown or already removed ids are a no-op.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let Some(event_name) = self.inner.index.borrow_mut().remove(&id) else {
            return false;
        };

        let mut listeners = self.inner.listeners.borrow_mut();
        if let Some(list) = listeners.get_mut(&event_name) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                listeners.remove(&event_name);
            }
        }
        true
    }

    /// Remove every subscription registered by `owner` on this bus.
    pub fn off_owner(&self, owner: ObjectId) -> usize {
        let mut removed = Vec::new();
        {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners.retain(|_, list| {
                list.retain(|s| {
                    if s.owner == owner {
                        removed.push(s.id);
                        false
                    } else {
                        true
                    }
                });
                !list.is_empty()
            });
        }

        let mut index = self.inner.index.borrow_mut();
        for id in &removed {
            index.remove(id);
        }
        removed.len()
    }

    /// Remove every subscription for `event_name`.
    pub fn off_event(&self, event_name: impl AsRef<str>) -> usize {
        let Some(list) = self.inner.listeners.borrow_mut().remove(event_name.as_ref()) else {
            return 0;
        };

        let mut index = self.inner.index.borrow_mut();
        for s in &list {
            index.remove(&s.id);
        }
        list.len()
    }

    /// Whether `id` is still registered on this bus.
    pub fn is_registered(&self, id: SubscriptionId) -> bool {
        self.inner.index.borrow().contains_key(&id)
    }

    pub fn trigger(&self, event_name: impl AsRef<str>) {
        self.trigger_with(event_name, None);
    }

    /// Invoke, in registration order, every listener registered for
    /// `event_name` at the moment this call begins.
    pub fn trigger_with(&self, event_name: impl AsRef<str>, user_info: Option<&UserInfo>) {
        let event_name = event_name.as_ref();

        let snapshot: Vec<(SubscriptionId, bool, Callback)> = self
            .inner
            .listeners
            .borrow()
            .get(event_name)
            .map(|list| {
                list.iter()
                    .map(|s| (s.id, s.once, s.callback.clone()))
                    .collect()
            })
            .unwrap_or_default();

        self.inner.stats.borrow_mut().events_triggered += 1;

        if snapshot.is_empty() {
            trace!(scope = %self.inner.scope, "No listeners for {}", event_name);
            return;
        }

        trace!(
            scope = %self.inner.scope,
            "📤 Triggering {} to {} listeners",
            event_name,
            snapshot.len()
        );

        for (id, once, callback) in snapshot {
            // removed by an earlier listener in this pass or by a nested trigger
            if !self.is_registered(id) {
                continue;
            }
            if once {
                self.off(id);
            }

            let result = catch_unwind(AssertUnwindSafe(|| callback(user_info)))
                .unwrap_or_else(|panic_info| Err(EventError::from_panic(panic_info)));

            let mut stats = self.inner.stats.borrow_mut();
            stats.listeners_invoked += 1;
            if let Err(e) = result {
                stats.listener_failures += 1;
                drop(stats);
                error!(
                    scope = %self.inner.scope,
                    host = %self.inner.host_id,
                    subscription = %id,
                    "❌ Listener for {} failed: {}",
                    event_name,
                    e
                );
            }
        }
    }

    pub fn listener_count(&self, event_name: impl AsRef<str>) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(event_name.as_ref())
            .map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, event_name: impl AsRef<str>) -> bool {
        self.listener_count(event_name) > 0
    }

    pub fn stats(&self) -> BusStats {
        let mut stats = self.inner.stats.borrow().clone();
        stats.active_listeners = self.inner.index.borrow().len();
        stats
    }

    /// Event names with at least one listener.
    pub fn registered_events(&self) -> Vec<String> {
        self.inner.listeners.borrow().keys().cloned().collect()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("scope", &self.inner.scope)
            .field("host_id", &self.inner.host_id)
            .field("active_listeners", &self.inner.index.borrow().len())
            .finish()
    }
}

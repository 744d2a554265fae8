//! Cross-bus listener ownership.
//!
//! An object that subscribes to other objects' buses records each
//! subscription here, so a single `stop_listening` during its teardown removes
//! everything it ever registered, wherever it lives.

use crate::bus::{EventBus, WeakEventBus};
use crate::error::EventError;
use crate::types::{ObjectId, SubscriptionId, UserInfo};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

struct TrackedListener {
    bus: WeakEventBus,
    id: SubscriptionId,
}

impl TrackedListener {
    fn is_live(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.is_registered(self.id))
    }
}

/// Records which owner is responsible for which subscription on which bus.
///
/// Only weak bus handles and owner ids are stored; the tracker never extends
/// the lifetime of either.
#[derive(Clone, Default)]
pub struct ListenerTracker {
    entries: Rc<RefCell<HashMap<ObjectId, Vec<TrackedListener>>>>,
}

impl ListenerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `owner` is responsible for subscription `id` on `bus`.
    pub fn track(&self, bus: &EventBus, id: SubscriptionId, owner: ObjectId) {
        let mut entries = self.entries.borrow_mut();
        let list = entries.entry(owner).or_default();
        // fired once-listeners and dropped buses
        list.retain(TrackedListener::is_live);
        list.push(TrackedListener {
            bus: bus.downgrade(),
            id,
        });
    }

    /// Subscribe `owner` to `event_name` on `bus` and track the subscription.
    pub fn listen_to<F>(
        &self,
        bus: &EventBus,
        owner: ObjectId,
        event_name: impl AsRef<str>,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + 'static,
    {
        let id = bus.on(event_name, owner, callback);
        self.track(bus, id, owner);
        id
    }

    /// One-shot variant of [`listen_to`](Self::listen_to).
    pub fn listen_to_once<F>(
        &self,
        bus: &EventBus,
        owner: ObjectId,
        event_name: impl AsRef<str>,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + 'static,
    {
        let id = bus.once(event_name, owner, callback);
        self.track(bus, id, owner);
        id
    }

    /// Remove every subscription attributed to `owner` from every bus it
    /// subscribed through. Returns how many live subscriptions were removed.
    pub fn stop_listening(&self, owner: ObjectId) -> usize {
        let Some(tracked) = self.entries.borrow_mut().remove(&owner) else {
            return 0;
        };

        let removed = tracked
            .into_iter()
            .filter_map(|entry| entry.bus.upgrade().map(|bus| bus.off(entry.id)))
            .filter(|removed| *removed)
            .count();

        debug!(owner = %owner, "Stopped listening ({} subscriptions removed)", removed);
        removed
    }

    /// Live subscriptions currently attributed to `owner`.
    pub fn tracked_count(&self, owner: ObjectId) -> usize {
        self.entries
            .borrow()
            .get(&owner)
            .map_or(0, |list| list.iter().filter(|e| e.is_live()).count())
    }

    /// Drop bookkeeping for subscriptions that can no longer be reached.
    pub fn prune(&self) {
        self.entries.borrow_mut().retain(|_, list| {
            list.retain(TrackedListener::is_live);
            !list.is_empty()
        });
    }

    /// Number of owners with tracked entries (live or not yet pruned).
    pub fn owner_count(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn stop_listening_removes_subscriptions_on_every_bus() {
        let tracker = ListenerTracker::new();
        let core = EventBus::new(ObjectId::new(), "Core");
        let playback = EventBus::new(ObjectId::new(), "Playback");
        let plugin = ObjectId::new();
        let calls = Rc::new(Cell::new(0));

        for bus in [&core, &playback] {
            let calls = calls.clone();
            tracker.listen_to(bus, plugin, "didPause", move |_| {
                calls.set(calls.get() + 1);
                Ok(())
            });
        }
        assert_eq!(tracker.tracked_count(plugin), 2);

        assert_eq!(tracker.stop_listening(plugin), 2);
        core.trigger("didPause");
        playback.trigger("didPause");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn stop_listening_is_idempotent_and_safe_without_subscriptions() {
        let tracker = ListenerTracker::new();
        let bus = EventBus::new(ObjectId::new(), "Core");
        let owner = ObjectId::new();

        assert_eq!(tracker.stop_listening(owner), 0);
        tracker.listen_to(&bus, owner, "ready", |_| Ok(()));
        assert_eq!(tracker.stop_listening(owner), 1);
        assert_eq!(tracker.stop_listening(owner), 0);
    }

    #[test]
    fn other_owners_keep_their_subscriptions() {
        let tracker = ListenerTracker::new();
        let bus = EventBus::new(ObjectId::new(), "Core");
        let leaving = ObjectId::new();
        let staying = ObjectId::new();

        tracker.listen_to(&bus, leaving, "ready", |_| Ok(()));
        let kept = tracker.listen_to(&bus, staying, "ready", |_| Ok(()));

        tracker.stop_listening(leaving);
        assert!(bus.is_registered(kept));
        assert_eq!(bus.listener_count("ready"), 1);
    }

    #[test]
    fn dropped_bus_leaves_only_unreachable_entries() {
        let tracker = ListenerTracker::new();
        let owner = ObjectId::new();
        {
            let bus = EventBus::new(ObjectId::new(), "Container");
            tracker.listen_to(&bus, owner, "ready", |_| Ok(()));
        }

        assert_eq!(tracker.tracked_count(owner), 0);
        assert_eq!(tracker.stop_listening(owner), 0);
    }

    #[test]
    fn fired_once_listeners_are_pruned() {
        let tracker = ListenerTracker::new();
        let bus = EventBus::new(ObjectId::new(), "Playback");
        let owner = ObjectId::new();

        tracker.listen_to_once(&bus, owner, "playing", |_| Ok(()));
        bus.trigger("playing");
        assert_eq!(tracker.tracked_count(owner), 0);

        tracker.prune();
        assert_eq!(tracker.owner_count(), 0);
    }

    #[test]
    fn tracker_does_not_extend_bus_lifetime() {
        let tracker = ListenerTracker::new();
        let bus = EventBus::new(ObjectId::new(), "Core");
        let weak = bus.downgrade();
        tracker.listen_to(&bus, ObjectId::new(), "ready", |_| Ok(()));

        drop(bus);
        assert!(weak.upgrade().is_none());
    }
}

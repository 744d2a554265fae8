//! Host objects plugins are attached to, and the context handed to plugins.

use crate::error::PluginError;
use crate::plugin::{Plugin, PluginCategory, PluginState};
use player_events::{
    Event, EventBus, EventError, ListenerTracker, ObjectId, Options, SubscriptionId, UserInfo,
};
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Core,
    Container,
    Overlay,
    Playback,
}

impl HostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Core => "Core",
            HostKind::Container => "Container",
            HostKind::Overlay => "Overlay",
            HostKind::Playback => "Playback",
        }
    }
}

/// Playback state as observed from a playback host's own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Error,
}

/// A plugin instance owned by a host, together with its lifecycle state.
pub struct AttachedPlugin {
    name: String,
    id: ObjectId,
    category: PluginCategory,
    state: Cell<PluginState>,
    pub(crate) plugin: RefCell<Box<dyn Plugin>>,
}

impl AttachedPlugin {
    pub(crate) fn new(
        name: String,
        id: ObjectId,
        category: PluginCategory,
        state: PluginState,
        plugin: Box<dyn Plugin>,
    ) -> Self {
        Self {
            name,
            id,
            category,
            state: Cell::new(state),
            plugin: RefCell::new(plugin),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn category(&self) -> PluginCategory {
        self.category
    }

    pub fn state(&self) -> PluginState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: PluginState) {
        self.state.set(state);
    }
}

/// A host object (core, container, overlay or playback) that owns a bus,
/// options and the plugins attached to it.
pub struct Host {
    id: ObjectId,
    kind: HostKind,
    bus: EventBus,
    options: RefCell<Options>,
    plugins: RefCell<Vec<Rc<AttachedPlugin>>>,
    active_container: RefCell<Weak<Host>>,
    active_playback: RefCell<Weak<Host>>,
    playback_state: Rc<Cell<PlaybackState>>,
    destroyed: Cell<bool>,
}

impl Host {
    pub fn new(kind: HostKind, options: Options) -> Rc<Self> {
        let id = ObjectId::new();
        let bus = EventBus::new(id, kind.as_str());
        let playback_state = Rc::new(Cell::new(PlaybackState::Idle));

        if kind == HostKind::Playback {
            for (event, state) in [
                (Event::Playing, PlaybackState::Playing),
                (Event::DidPause, PlaybackState::Paused),
                (Event::DidStop, PlaybackState::Idle),
                (Event::DidComplete, PlaybackState::Idle),
                (Event::Error, PlaybackState::Error),
            ] {
                let playback_state = playback_state.clone();
                bus.on(event, id, move |_| {
                    playback_state.set(state);
                    Ok(())
                });
            }
        }

        debug!(host = %id, "Creating {} with {} options", kind.as_str(), options.len());

        Rc::new(Self {
            id,
            kind,
            bus,
            options: RefCell::new(options),
            plugins: RefCell::new(Vec::new()),
            active_container: RefCell::new(Weak::new()),
            active_playback: RefCell::new(Weak::new()),
            playback_state,
            destroyed: Cell::new(false),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn trigger(&self, event_name: impl AsRef<str>) {
        self.bus.trigger(event_name);
    }

    pub fn trigger_with(&self, event_name: impl AsRef<str>, user_info: &UserInfo) {
        self.bus.trigger_with(event_name, Some(user_info));
    }

    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    /// Replace the options and notify listeners with `didUpdateOptions`.
    pub fn set_options(&self, options: Options) {
        *self.options.borrow_mut() = options;
        self.bus.trigger(Event::DidUpdateOptions);
    }

    pub fn active_container(&self) -> Option<Rc<Host>> {
        self.active_container.borrow().upgrade()
    }

    pub fn set_active_container(&self, container: &Rc<Host>) {
        *self.active_container.borrow_mut() = Rc::downgrade(container);
        self.bus.trigger(Event::DidChangeActiveContainer);
    }

    /// The playback of this host, or of its active container for a core.
    pub fn active_playback(&self) -> Option<Rc<Host>> {
        if let Some(playback) = self.active_playback.borrow().upgrade() {
            return Some(playback);
        }
        if self.kind == HostKind::Core {
            return self.active_container().and_then(|c| c.active_playback());
        }
        None
    }

    pub fn set_active_playback(&self, playback: &Rc<Host>) {
        *self.active_playback.borrow_mut() = Rc::downgrade(playback);
        self.bus.trigger(Event::DidChangeActivePlayback);
    }

    /// Meaningful for playback hosts; `Idle` for everything else.
    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Returns `true` the first time it is called.
    pub(crate) fn mark_destroyed(&self) -> bool {
        !self.destroyed.replace(true)
    }

    pub fn plugins(&self) -> Ref<'_, Vec<Rc<AttachedPlugin>>> {
        self.plugins.borrow()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.borrow().iter().map(|p| p.name.clone()).collect()
    }

    pub fn plugin(&self, name: &str) -> Option<Rc<AttachedPlugin>> {
        self.plugins.borrow().iter().find(|p| p.name == name).cloned()
    }

    /// Run `f` against the named plugin. `None` if it is not attached or is
    /// currently inside one of its own lifecycle steps.
    pub fn with_plugin<R>(&self, name: &str, f: impl FnOnce(&dyn Plugin) -> R) -> Option<R> {
        let attached = self.plugin(name)?;
        let plugin = attached.plugin.try_borrow().ok()?;
        Some(f(&**plugin))
    }

    /// Names of attached media control plugins that hide while seeking.
    pub fn hidable_plugin_names(&self) -> Vec<String> {
        self.plugins
            .borrow()
            .iter()
            .filter(|p| p.category == PluginCategory::MediaControl)
            .filter(|p| p.plugin.try_borrow().is_ok_and(|plugin| plugin.hides_during_seek()))
            .map(|p| p.name.clone())
            .collect()
    }

    pub(crate) fn push_plugin(&self, plugin: AttachedPlugin) {
        self.plugins.borrow_mut().push(Rc::new(plugin));
    }

    pub(crate) fn take_plugins(&self) -> Vec<Rc<AttachedPlugin>> {
        std::mem::take(&mut *self.plugins.borrow_mut())
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("plugins", &self.plugin_names())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

/// Everything a plugin instance gets from the manager at construction.
///
/// The host reference is weak: a plugin never keeps its context alive.
#[derive(Clone)]
pub struct PluginContext {
    plugin_id: ObjectId,
    plugin_name: String,
    host: Weak<Host>,
    tracker: ListenerTracker,
}

impl PluginContext {
    pub fn new(
        plugin_id: ObjectId,
        plugin_name: impl Into<String>,
        host: Weak<Host>,
        tracker: ListenerTracker,
    ) -> Self {
        Self {
            plugin_id,
            plugin_name: plugin_name.into(),
            host,
            tracker,
        }
    }

    /// Identity used as the owner of every subscription made through this context.
    pub fn id(&self) -> ObjectId {
        self.plugin_id
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn host(&self) -> Result<Rc<Host>, PluginError> {
        self.host.upgrade().ok_or(PluginError::ContextGone)
    }

    pub fn weak_host(&self) -> Weak<Host> {
        self.host.clone()
    }

    pub fn options(&self) -> Options {
        self.host.upgrade().map(|h| h.options()).unwrap_or_default()
    }

    pub fn tracker(&self) -> &ListenerTracker {
        &self.tracker
    }

    pub fn listen_to<F>(&self, bus: &EventBus, event_name: impl AsRef<str>, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + 'static,
    {
        self.tracker.listen_to(bus, self.plugin_id, event_name, callback)
    }

    pub fn listen_to_once<F>(&self, bus: &EventBus, event_name: impl AsRef<str>, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + 'static,
    {
        self.tracker.listen_to_once(bus, self.plugin_id, event_name, callback)
    }

    pub fn stop_listening(&self) -> usize {
        self.tracker.stop_listening(self.plugin_id)
    }
}

//! Plugin lifecycle: attach, render and deterministic teardown.
//!
//! Plugin faults are isolated per plugin. A plugin that fails or panics
//! while binding is excluded from every later step; one that fails while
//! rendering is logged, marked [`PluginState::Faulted`] and the remaining
//! plugins still render. Faulted plugins are still destroyed on teardown.

use crate::context::{AttachedPlugin, Host, PluginContext};
use crate::error::PluginError;
use crate::ordering::order_by_hint;
use crate::plugin::{PluginCategory, PluginState};
use crate::registry::PluginRegistry;
use player_events::{options, Event, ListenerTracker, ObjectId};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Outcome of one `attach_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachReport {
    pub bound: Vec<String>,
    /// plugin name and the reason it was excluded
    pub faulted: Vec<(String, String)>,
}

/// Outcome of one render pass, in render order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub bound: u64,
    pub bind_failures: u64,
    pub rendered: u64,
    pub render_failures: u64,
    pub destroyed: u64,
}

/// Instantiates plugins from the registry against host contexts and tears
/// them down again.
pub struct PluginLifecycleManager {
    registry: PluginRegistry,
    tracker: ListenerTracker,
    stats: RefCell<LifecycleStats>,
}

impl PluginLifecycleManager {
    pub fn new(registry: PluginRegistry, tracker: ListenerTracker) -> Self {
        Self {
            registry,
            tracker,
            stats: RefCell::new(LifecycleStats::default()),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ListenerTracker {
        &self.tracker
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats.borrow().clone()
    }

    /// Instantiate and bind every `category` plugin against `context`, and
    /// attach the ones that bound successfully to `context`.
    ///
    /// Descriptors are read from the registry once, so registrations made
    /// while attaching only affect later calls. A plugin whose factory or
    /// `bind` fails or panics is not attached, and any subscriptions it made
    /// before failing are removed.
    ///
    /// # Arguments
    ///
    /// * `context` - The host the plugins bind against and are attached to
    /// * `category` - Which registered plugins to instantiate
    ///
    /// # Returns
    ///
    /// An `AttachReport` listing the bound plugins in attachment order and
    /// the faulted ones with their error. Both lists are empty when the host
    /// is already destroyed.
    pub fn attach_all(&self, context: &Rc<Host>, category: PluginCategory) -> AttachReport {
        self.attach_all_into(context, context, category)
    }

    /// Like [`attach_all`](Self::attach_all), but the plugins are owned by
    /// `owner` while being bound against `context` (overlay plugins are owned
    /// by the overlay yet listen to the core).
    pub fn attach_all_into(&self, owner: &Host, context: &Rc<Host>, category: PluginCategory) -> AttachReport {
        let mut report = AttachReport::default();

        if owner.is_destroyed() || context.is_destroyed() {
            warn!(
                "Not attaching {} plugins to destroyed {}",
                category,
                owner.kind().as_str()
            );
            return report;
        }

        let descriptors = self.registry.descriptors_for(category);
        debug!(
            "Attaching {} {} plugins to {}",
            descriptors.len(),
            category,
            owner.kind().as_str()
        );

        for descriptor in descriptors {
            let name = descriptor.name().to_string();
            let plugin_id = ObjectId::new();
            let plugin_context = PluginContext::new(
                plugin_id,
                name.clone(),
                Rc::downgrade(context),
                self.tracker.clone(),
            );

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let mut plugin = descriptor.create(plugin_context);
                plugin.bind().map(|()| plugin)
            }))
            .unwrap_or_else(|panic_info| Err(PluginError::from_panic(panic_info)));

            match outcome {
                Ok(plugin) => {
                    owner.push_plugin(AttachedPlugin::new(
                        name.clone(),
                        plugin_id,
                        category,
                        PluginState::Bound,
                        plugin,
                    ));
                    self.stats.borrow_mut().bound += 1;
                    report.bound.push(name);
                }
                Err(e) => {
                    error!(
                        scope = owner.kind().as_str(),
                        "❌ {} crashed during bind ({})", name, e
                    );
                    // drop whatever it managed to subscribe before failing
                    self.tracker.stop_listening(plugin_id);
                    context.bus().off_owner(plugin_id);
                    self.stats.borrow_mut().bind_failures += 1;
                    report.faulted.push((name, e.to_string()));
                }
            }
        }

        report
    }

    /// Render every attached plugin. When the host options carry a
    /// `mediaControlPluginsOrder` hint the named plugins render first.
    pub fn render_all(&self, context: &Host) -> RenderReport {
        let hint = context
            .options()
            .string_list(options::MEDIA_CONTROL_PLUGINS_ORDER)
            .unwrap_or_default();
        self.render_ordered(context, &hint)
    }

    pub fn render_ordered(&self, context: &Host, hint: &[String]) -> RenderReport {
        let mut report = RenderReport::default();
        let plugins: Vec<Rc<AttachedPlugin>> = context.plugins().clone();
        let plugins = order_by_hint(plugins, hint, |p| p.name());

        for attached in plugins {
            if attached.state() != PluginState::Bound {
                continue;
            }

            let result = match attached.plugin.try_borrow_mut() {
                Ok(mut plugin) => catch_unwind(AssertUnwindSafe(|| plugin.render()))
                    .unwrap_or_else(|panic_info| Err(PluginError::from_panic(panic_info))),
                Err(_) => Err(PluginError::Busy(attached.name().to_string())),
            };

            // a render that tore its own host down leaves the plugin destroyed
            let torn_down = context.is_destroyed() || attached.state() == PluginState::Destroyed;

            match result {
                Ok(()) => {
                    if !torn_down {
                        attached.set_state(PluginState::Rendered);
                    }
                    self.stats.borrow_mut().rendered += 1;
                    report.rendered.push(attached.name().to_string());
                }
                Err(e) => {
                    error!(
                        scope = context.kind().as_str(),
                        "❌ {} crashed during render ({})",
                        attached.name(),
                        e
                    );
                    if !torn_down && !matches!(e, PluginError::Busy(_)) {
                        attached.set_state(PluginState::Faulted);
                    }
                    self.stats.borrow_mut().render_failures += 1;
                    report.failed.push((attached.name().to_string(), e.to_string()));
                }
            }
        }

        report
    }

    /// Tear `context` down: announce `didDestroy`, remove every listener the
    /// host and its plugins registered, destroy the plugins and release them.
    ///
    /// Plugins receive `didDestroy` while their subscriptions are still in
    /// place. Plugins in any state are destroyed, including faulted ones.
    ///
    /// # Arguments
    ///
    /// * `context` - The host being torn down
    ///
    /// Calling it again on the same host is a no-op.
    pub fn detach_all(&self, context: &Host) {
        if !context.mark_destroyed() {
            debug!("{} already destroyed", context.kind().as_str());
            return;
        }

        debug!(host = %context.id(), "destroying {}", context.kind().as_str());
        context.bus().trigger(Event::DidDestroy);

        debug!("destroying listeners");
        self.tracker.stop_listening(context.id());
        context.bus().off_owner(context.id());

        let plugins = context.take_plugins();
        for attached in &plugins {
            self.tracker.stop_listening(attached.id());
            context.bus().off_owner(attached.id());

            let result = match attached.plugin.try_borrow_mut() {
                Ok(mut plugin) => catch_unwind(AssertUnwindSafe(|| plugin.destroy()))
                    .map_err(PluginError::from_panic),
                Err(_) => Err(PluginError::Busy(attached.name().to_string())),
            };
            if let Err(e) = result {
                error!("❌ {} crashed during destroy ({})", attached.name(), e);
            }

            attached.set_state(PluginState::Destroyed);
            self.stats.borrow_mut().destroyed += 1;
        }
        drop(plugins);

        info!("{} destroyed", context.kind().as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HostKind;
    use crate::plugin::Plugin;
    use crate::registry::PluginDescriptor;
    use player_events::Options;
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Normal,
        FailBind,
        PanicBind,
        FailRender,
        PanicRender,
        TearDownOnRender,
    }

    struct Recorder {
        name: &'static str,
        context: PluginContext,
        behavior: Behavior,
        journal: Journal,
    }

    impl Recorder {
        fn record(&self, line: String) {
            self.journal.lock().unwrap().push(line);
        }
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn bind(&mut self) -> Result<(), PluginError> {
            let host = self.context.host()?;
            for event in ["ping", Event::DidDestroy.as_str()] {
                let journal = self.journal.clone();
                let line = format!("{} saw {}", self.name, event);
                self.context.listen_to(host.bus(), event, move |_| {
                    journal.lock().unwrap().push(line.clone());
                    Ok(())
                });
            }

            match self.behavior {
                Behavior::FailBind => Err(PluginError::BindFailed("no stream".to_string())),
                Behavior::PanicBind => panic!("bind exploded"),
                _ => Ok(()),
            }
        }

        fn render(&mut self) -> Result<(), PluginError> {
            match self.behavior {
                Behavior::FailRender => Err(PluginError::RenderFailed("no surface".to_string())),
                Behavior::PanicRender => panic!("render exploded"),
                Behavior::TearDownOnRender => {
                    self.context.host()?.trigger("teardown");
                    Ok(())
                }
                _ => {
                    self.record(format!("{} rendered", self.name));
                    Ok(())
                }
            }
        }

        fn destroy(&mut self) {
            self.record(format!("{} destroyed", self.name));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn recorder(
        name: &'static str,
        category: PluginCategory,
        behavior: Behavior,
        journal: &Journal,
    ) -> PluginDescriptor {
        let journal = journal.clone();
        PluginDescriptor::new(name, category, move |context| {
            Box::new(Recorder {
                name,
                context,
                behavior,
                journal: journal.clone(),
            }) as Box<dyn Plugin>
        })
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    fn manager_with(plugins: &[(&'static str, Behavior)], journal: &Journal) -> PluginLifecycleManager {
        let registry = PluginRegistry::new();
        for (name, behavior) in plugins {
            registry.register(recorder(*name, PluginCategory::Container, *behavior, journal));
        }
        PluginLifecycleManager::new(registry, ListenerTracker::new())
    }

    #[test]
    fn bind_failure_excludes_plugin_from_later_steps() {
        let journal = Journal::default();
        let manager = manager_with(
            &[("A", Behavior::Normal), ("B", Behavior::FailBind), ("C", Behavior::Normal)],
            &journal,
        );
        let container = Host::new(HostKind::Container, Options::new());

        let report = manager.attach_all(&container, PluginCategory::Container);
        assert_eq!(report.bound, vec!["A", "C"]);
        assert_eq!(report.faulted.len(), 1);
        assert_eq!(report.faulted[0].0, "B");
        assert_eq!(container.plugin_names(), vec!["A", "C"]);

        // B's partial subscriptions were removed
        assert_eq!(container.bus().listener_count("ping"), 2);
        container.trigger("ping");
        assert_eq!(entries(&journal), vec!["A saw ping", "C saw ping"]);

        let render = manager.render_all(&container);
        assert_eq!(render.rendered, vec!["A", "C"]);

        journal.lock().unwrap().clear();
        manager.detach_all(&container);
        let lines = entries(&journal);
        assert!(lines.iter().all(|line| !line.starts_with('B')));
        assert!(lines.contains(&"A destroyed".to_string()));
        assert!(lines.contains(&"C destroyed".to_string()));

        let stats = manager.stats();
        assert_eq!(stats.bound, 2);
        assert_eq!(stats.bind_failures, 1);
        assert_eq!(stats.destroyed, 2);
    }

    #[test]
    fn panicking_bind_is_isolated() {
        let journal = Journal::default();
        let manager = manager_with(&[("A", Behavior::PanicBind), ("B", Behavior::Normal)], &journal);
        let container = Host::new(HostKind::Container, Options::new());

        let report = manager.attach_all(&container, PluginCategory::Container);
        assert_eq!(report.bound, vec!["B"]);
        assert!(report.faulted[0].1.contains("bind exploded"));
        assert_eq!(container.bus().listener_count("ping"), 1);
        assert_eq!(manager.tracker().owner_count(), 1);
    }

    #[test]
    fn render_failures_do_not_stop_siblings() {
        let journal = Journal::default();
        let manager = manager_with(
            &[("A", Behavior::FailRender), ("B", Behavior::PanicRender), ("C", Behavior::Normal)],
            &journal,
        );
        let container = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&container, PluginCategory::Container);

        let report = manager.render_all(&container);
        assert_eq!(report.rendered, vec!["C"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(entries(&journal), vec!["C rendered"]);
        assert_eq!(manager.stats().render_failures, 2);
        assert_eq!(container.plugin("A").unwrap().state(), PluginState::Faulted);
        assert_eq!(container.plugin("B").unwrap().state(), PluginState::Faulted);
        assert_eq!(container.plugin("C").unwrap().state(), PluginState::Rendered);

        // faulted plugins are not retried
        let again = manager.render_all(&container);
        assert!(again.failed.is_empty());
        assert_eq!(manager.stats().render_failures, 2);

        // plugins that failed to render are still torn down
        manager.detach_all(&container);
        assert_eq!(manager.stats().destroyed, 3);
    }

    #[test]
    fn render_runs_once_per_plugin() {
        let journal = Journal::default();
        let manager = manager_with(&[("A", Behavior::Normal), ("B", Behavior::Normal)], &journal);
        let container = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&container, PluginCategory::Container);

        let first = manager.render_all(&container);
        let second = manager.render_all(&container);

        assert_eq!(first.rendered, vec!["A", "B"]);
        assert!(second.rendered.is_empty());
        assert!(second.failed.is_empty());
        assert_eq!(entries(&journal), vec!["A rendered", "B rendered"]);
        assert_eq!(manager.stats().rendered, 2);
    }

    #[test]
    fn render_that_tears_down_its_host_leaves_plugins_destroyed() {
        let journal = Journal::default();
        let manager = Rc::new(manager_with(
            &[("A", Behavior::TearDownOnRender), ("B", Behavior::Normal)],
            &journal,
        ));
        let container = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&container, PluginCategory::Container);

        let teardown = manager.clone();
        let weak_container = Rc::downgrade(&container);
        container.bus().on("teardown", ObjectId::new(), move |_| {
            if let Some(host) = weak_container.upgrade() {
                teardown.detach_all(&host);
            }
            Ok(())
        });
        let a = container.plugin("A").unwrap();
        let b = container.plugin("B").unwrap();

        let report = manager.render_all(&container);

        assert!(container.is_destroyed());
        assert_eq!(report.rendered, vec!["A"]);
        assert_eq!(a.state(), PluginState::Destroyed);
        assert_eq!(b.state(), PluginState::Destroyed);
        assert!(!entries(&journal).contains(&"B rendered".to_string()));
        assert_eq!(manager.stats().destroyed, 2);
    }

    #[test]
    fn plugins_observe_did_destroy_before_their_listeners_go() {
        let journal = Journal::default();
        let manager = manager_with(&[("A", Behavior::Normal)], &journal);
        let container = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&container, PluginCategory::Container);
        let plugin = container.plugin("A").unwrap();

        manager.detach_all(&container);

        assert_eq!(entries(&journal), vec!["A saw didDestroy", "A destroyed"]);
        assert_eq!(plugin.state(), PluginState::Destroyed);
        assert!(container.plugins().is_empty());
        assert!(container.is_destroyed());
        assert!(!container.bus().has_listeners("ping"));
        assert!(!container.bus().has_listeners(Event::DidDestroy));
        assert_eq!(manager.tracker().tracked_count(plugin.id()), 0);
    }

    #[test]
    fn detach_twice_is_a_no_op() {
        let journal = Journal::default();
        let manager = manager_with(&[("A", Behavior::Normal)], &journal);
        let container = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&container, PluginCategory::Container);

        let destroyed_events = Arc::new(Mutex::new(0));
        let counter = destroyed_events.clone();
        container.bus().on(Event::DidDestroy, ObjectId::new(), move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        manager.detach_all(&container);
        manager.detach_all(&container);

        assert_eq!(*destroyed_events.lock().unwrap(), 1);
        assert_eq!(manager.stats().destroyed, 1);
    }

    #[test]
    fn late_registration_has_no_retroactive_effect() {
        let journal = Journal::default();
        let manager = manager_with(&[("A", Behavior::Normal)], &journal);
        let first = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&first, PluginCategory::Container);

        manager
            .registry()
            .register(recorder("Late", PluginCategory::Container, Behavior::Normal, &journal));
        assert_eq!(first.plugin_names(), vec!["A"]);

        let second = Host::new(HostKind::Container, Options::new());
        manager.attach_all(&second, PluginCategory::Container);
        assert_eq!(second.plugin_names(), vec!["A", "Late"]);
    }

    #[test]
    fn render_all_follows_the_order_hint() {
        let journal = Journal::default();
        let manager = manager_with(
            &[
                ("A", Behavior::Normal),
                ("B", Behavior::Normal),
                ("C", Behavior::Normal),
                ("D", Behavior::Normal),
            ],
            &journal,
        );
        let options = Options::new().with(
            options::MEDIA_CONTROL_PLUGINS_ORDER,
            serde_json::json!(["D", "B", "Missing"]),
        );
        let container = Host::new(HostKind::Container, options);
        manager.attach_all(&container, PluginCategory::Container);

        let report = manager.render_all(&container);
        assert_eq!(report.rendered, vec!["D", "B", "A", "C"]);
        // attachment order is untouched
        assert_eq!(container.plugin_names(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn attaching_to_a_destroyed_host_does_nothing() {
        let journal = Journal::default();
        let manager = manager_with(&[("A", Behavior::Normal)], &journal);
        let container = Host::new(HostKind::Container, Options::new());
        manager.detach_all(&container);

        let report = manager.attach_all(&container, PluginCategory::Container);
        assert!(report.bound.is_empty());
        assert!(container.plugins().is_empty());
    }

    #[test]
    fn overlay_plugins_listen_to_the_core_and_leave_with_the_overlay() {
        let journal = Journal::default();
        let registry = PluginRegistry::new();
        registry.register(recorder("Drawer", PluginCategory::Overlay, Behavior::Normal, &journal));
        let manager = PluginLifecycleManager::new(registry, ListenerTracker::new());

        let core = Host::new(HostKind::Core, Options::new());
        let overlay = Host::new(HostKind::Overlay, Options::new());
        let report = manager.attach_all_into(&overlay, &core, PluginCategory::Overlay);
        assert_eq!(report.bound, vec!["Drawer"]);
        assert_eq!(overlay.plugin_names(), vec!["Drawer"]);
        assert!(core.plugins().is_empty());
        assert_eq!(core.bus().listener_count("ping"), 1);

        manager.detach_all(&overlay);
        assert!(!core.bus().has_listeners("ping"));
        assert!(!core.is_destroyed());
    }
}

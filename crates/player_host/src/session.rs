//! A scripted player session: one core, its active container and that
//! container's playback, driven by the configured script.

use crate::config::{AppConfig, ScriptStep};
use anyhow::{bail, Result};
use player_events::ListenerTracker;
use player_plugins::builtin::register_builtin;
use player_plugins::{
    AttachReport, Host, HostKind, LifecycleStats, PluginCategory, PluginLifecycleManager,
    PluginRegistry,
};
use std::rc::Rc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct Session {
    manager: PluginLifecycleManager,
    core: Rc<Host>,
    container: Rc<Host>,
    playback: Rc<Host>,
    script: Vec<ScriptStep>,
}

impl Session {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let registry = PluginRegistry::new();
        for name in &config.plugins.enabled {
            if !register_builtin(&registry, name) {
                bail!("Unknown plugin: {}", name);
            }
        }
        let manager = PluginLifecycleManager::new(registry, ListenerTracker::new());

        let options = config.host_options();
        let core = Host::new(HostKind::Core, options.clone());
        let container = Host::new(HostKind::Container, options.clone());
        let playback = Host::new(HostKind::Playback, options);
        container.set_active_playback(&playback);
        core.set_active_container(&container);

        Ok(Self {
            manager,
            core,
            container,
            playback,
            script: config.script.clone(),
        })
    }

    pub fn host(&self, kind: HostKind) -> Option<&Rc<Host>> {
        match kind {
            HostKind::Core => Some(&self.core),
            HostKind::Container => Some(&self.container),
            HostKind::Playback => Some(&self.playback),
            HostKind::Overlay => None,
        }
    }

    /// Attach and render container plugins, then core plugins.
    pub fn start(&self) -> AttachReport {
        let mut report = AttachReport::default();
        for (host, category) in [
            (&self.container, PluginCategory::Container),
            (&self.core, PluginCategory::Core),
        ] {
            let attached = self.manager.attach_all(host, category);
            report.bound.extend(attached.bound);
            report.faulted.extend(attached.faulted);
            self.manager.render_all(host);
        }

        info!("🎬 Session started with core plugins {:?}", self.core.plugin_names());
        report
    }

    /// Replay the script. Returns the number of events triggered.
    pub async fn run_script(&self) -> usize {
        let mut triggered = 0;
        for step in &self.script {
            if step.after_ms > 0 {
                sleep(Duration::from_millis(step.after_ms)).await;
            }

            let Some(host) = step.host_kind().and_then(|kind| self.host(kind)) else {
                warn!("Skipping script step for unknown target {}", step.target);
                continue;
            };

            debug!("▶️ {} {}", step.target, step.event);
            match &step.user_info {
                Some(user_info) => host.trigger_with(&step.event, user_info),
                None => host.trigger(&step.event),
            }
            triggered += 1;
        }
        triggered
    }

    /// Tear every host down, core first.
    pub fn shutdown(&self) {
        for host in [&self.core, &self.container, &self.playback] {
            self.manager.detach_all(host);
        }

        let stats = self.stats();
        let bus = self.core.bus().stats();
        info!(
            "🧹 Session finished: {} bound, {} bind failures, {} render failures, {} destroyed; core bus saw {} events ({} listener failures)",
            stats.bound,
            stats.bind_failures,
            stats.render_failures,
            stats.destroyed,
            bus.events_triggered,
            bus.listener_failures
        );
    }

    pub fn stats(&self) -> LifecycleStats {
        self.manager.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_events::{user_info, Event};
    use player_plugins::builtin::{EventLogger, MediaControl};
    use player_plugins::Plugin;
    use std::cell::Cell;
    use tokio::task::LocalSet;

    #[tokio::test(start_paused = true)]
    async fn test_default_script_runs_to_completion() {
        LocalSet::new()
            .run_until(async {
                let session = Session::new(&AppConfig::default()).unwrap();
                let report = session.start();
                assert_eq!(report.bound, vec!["MediaControl", "EventLogger"]);
                assert!(report.faulted.is_empty());

                let steps = session.run_script().await;
                assert_eq!(steps, 7);

                // auto-hide after resume, then didComplete
                let hides = session
                    .core
                    .with_plugin("MediaControl", |plugin| {
                        plugin.as_any().downcast_ref::<MediaControl>().map(|mc| mc.hide_count())
                    })
                    .flatten();
                assert_eq!(hides, Some(2));

                let seen = session
                    .core
                    .with_plugin("EventLogger", |plugin| {
                        plugin.as_any().downcast_ref::<EventLogger>().map(|logger| logger.seen())
                    })
                    .flatten();
                assert!(seen.is_some_and(|seen| seen > 0));

                session.shutdown();
                assert!(session.core.is_destroyed());
                assert!(!session.container.bus().has_listeners(Event::EnableMediaControl));
                assert_eq!(session.stats().destroyed, 2);
            })
            .await;
    }

    #[test]
    fn test_unknown_plugin_is_rejected() {
        let mut config = AppConfig::default();
        config.plugins.enabled = vec!["Chromecast".to_string()];

        assert!(Session::new(&config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_payload_reaches_listeners() {
        LocalSet::new()
            .run_until(async {
                let mut config = AppConfig::default();
                config.plugins.enabled.clear();
                let mut step = ScriptStep::new("playback", "error", 10);
                step.user_info = Some(user_info([("code", 42)]));
                config.script = vec![step, ScriptStep::new("nowhere", "ready", 0)];

                let session = Session::new(&config).unwrap();
                let code = Rc::new(Cell::new(0));
                let seen = code.clone();
                session.playback.bus().on(Event::Error, session.core.id(), move |info| {
                    let value = info.and_then(|i| i.get("code")).and_then(|v| v.as_u64());
                    seen.set(value.unwrap_or_default());
                    Ok(())
                });

                assert_eq!(session.run_script().await, 1);
                assert_eq!(code.get(), 42);
            })
            .await;
    }
}

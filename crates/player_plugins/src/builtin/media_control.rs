//! Media control visibility.
//!
//! Tracks whether the controls are shown and drives the show/hide
//! notifications on the core bus. Auto-hide goes through a single
//! [`TimerSlot`], so re-arming it never produces a second hide.

use crate::context::{Host, PlaybackState, PluginContext};
use crate::error::PluginError;
use crate::plugin::{Plugin, PluginCategory, PluginType};
use player_events::{options, Event, InternalEvent, Options, TimerSlot, WeakEventBus};
use std::any::Any;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_SHORT_HIDE_DELAY: Duration = Duration::from_millis(400);
pub const DEFAULT_LONG_HIDE_DELAY: Duration = Duration::from_secs(4);

/// Option key overriding the short auto-hide delay, in seconds.
pub const SHORT_HIDE_DELAY_KEY: &str = "mediaControlShortHideDelay";
/// Option key overriding the long auto-hide delay, in seconds.
pub const LONG_HIDE_DELAY_KEY: &str = "mediaControlLongHideDelay";

struct Controls {
    core: Weak<Host>,
    core_bus: WeakEventBus,
    visible: Cell<bool>,
    showing: Cell<bool>,
    hiding: Cell<bool>,
    show_controls: Cell<bool>,
    always_visible: bool,
    plugins_dismissed: Cell<bool>,
    short_delay: Duration,
    long_delay: Duration,
    hide_timer: TimerSlot,
    hides: Cell<u64>,
}

impl Controls {
    fn trigger(&self, event: Event) {
        if let Some(bus) = self.core_bus.upgrade() {
            bus.trigger(event);
        }
    }

    fn show(&self) {
        if self.showing.get() {
            return;
        }
        self.showing.set(true);
        self.hiding.set(false);

        self.trigger(Event::WillShowMediaControl);
        self.visible.set(true);
        self.showing.set(false);
        self.trigger(Event::DidShowMediaControl);
    }

    fn hide(&self) {
        if self.hiding.get() || self.always_visible {
            return;
        }
        self.trigger(Event::WillHideMediaControl);
        self.showing.set(false);
        self.hiding.set(true);

        self.visible.set(false);
        self.hiding.set(false);
        self.hides.set(self.hides.get() + 1);
        self.trigger(Event::DidHideMediaControl);
    }

    fn disappear_after(self: &Rc<Self>, delay: Duration) {
        self.hide_timer
            .schedule_for(delay, self, |controls| controls.hide_and_stop_timer());
    }

    fn keep_visible(&self) {
        self.hide_timer.invalidate();
    }

    fn hide_and_stop_timer(&self) {
        self.hide_timer.invalidate();
        self.hide();
    }

    fn toggle_visibility(self: &Rc<Self>) {
        if self.show_controls.get() {
            self.show();
            self.disappear_after(self.long_delay);
        }
    }

    fn dismiss_plugins(&self) {
        self.plugins_dismissed.set(true);
        if let Some(core) = self.core.upgrade() {
            debug!("Dismissing {:?} while seeking", core.hidable_plugin_names());
        }
    }

    fn show_plugins(&self) {
        self.plugins_dismissed.set(false);
    }

    fn playback_is_playing(&self) -> bool {
        self.core
            .upgrade()
            .and_then(|core| core.active_playback())
            .is_some_and(|playback| playback.playback_state() == PlaybackState::Playing)
    }
}

/// Core plugin owning the media control's visibility state.
pub struct MediaControl {
    context: PluginContext,
    controls: Option<Rc<Controls>>,
}

impl MediaControl {
    pub fn is_visible(&self) -> bool {
        self.controls.as_ref().is_some_and(|c| c.visible.get())
    }

    pub fn is_hide_pending(&self) -> bool {
        self.controls.as_ref().is_some_and(|c| c.hide_timer.is_pending())
    }

    pub fn plugins_dismissed(&self) -> bool {
        self.controls.as_ref().is_some_and(|c| c.plugins_dismissed.get())
    }

    /// Completed hides since the plugin was bound.
    pub fn hide_count(&self) -> u64 {
        self.controls.as_ref().map_or(0, |c| c.hides.get())
    }

    pub fn show(&self) {
        if let Some(controls) = &self.controls {
            controls.show();
        }
    }

    pub fn hide(&self) {
        if let Some(controls) = &self.controls {
            controls.hide();
        }
    }

    /// Schedule a hide after `delay` (the short delay when `None`),
    /// replacing any hide already scheduled.
    pub fn disappear_after(&self, delay: Option<Duration>) {
        if let Some(controls) = &self.controls {
            controls.disappear_after(delay.unwrap_or(controls.short_delay));
        }
    }

    pub fn keep_visible(&self) {
        if let Some(controls) = &self.controls {
            controls.keep_visible();
        }
    }

    /// Same as a tap on the controls themselves.
    pub fn tapped(&self) {
        if let Some(controls) = &self.controls {
            controls.hide_and_stop_timer();
        }
    }

    fn bind_core_events(&self, core: &Host, controls: &Rc<Controls>) {
        let bus = core.bus();

        for event in [Event::DidEnterFullscreen, Event::DidExitFullscreen] {
            let weak = Rc::downgrade(controls);
            self.context.listen_to(bus, event, move |_| {
                if let Some(controls) = weak.upgrade() {
                    if controls.hide_timer.is_pending() {
                        controls.disappear_after(controls.short_delay);
                    }
                }
                Ok(())
            });
        }

        let weak = Rc::downgrade(controls);
        self.context.listen_to(bus, InternalEvent::DidTappedCore, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.toggle_visibility();
            }
            Ok(())
        });

        let weak = Rc::downgrade(controls);
        self.context.listen_to(bus, InternalEvent::WillBeginScrubbing, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.keep_visible();
                controls.dismiss_plugins();
            }
            Ok(())
        });

        let weak = Rc::downgrade(controls);
        self.context.listen_to(bus, InternalEvent::DidFinishScrubbing, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.show_plugins();
                if controls.playback_is_playing() {
                    controls.disappear_after(controls.short_delay);
                }
            }
            Ok(())
        });
    }

    fn bind_container_events(&self, container: &Host, controls: &Rc<Controls>) {
        let weak = Rc::downgrade(controls);
        self.context.listen_to(container.bus(), Event::EnableMediaControl, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.show();
            }
            Ok(())
        });

        let weak = Rc::downgrade(controls);
        self.context.listen_to(container.bus(), Event::DisableMediaControl, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.hide();
            }
            Ok(())
        });
    }

    fn bind_playback_events(&self, playback: &Host, controls: &Rc<Controls>) {
        let bus = playback.bus();

        let weak = Rc::downgrade(controls);
        self.context.listen_to(bus, Event::Ready, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.show_controls.set(true);
            }
            Ok(())
        });

        let weak = Rc::downgrade(controls);
        self.context.listen_to(bus, Event::DidComplete, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.hide();
            }
            Ok(())
        });

        let weak = Rc::downgrade(controls);
        let context = self.context.clone();
        let playback_bus = bus.downgrade();
        self.context.listen_to(bus, Event::DidPause, move |_| {
            let (Some(controls), Some(bus)) = (weak.upgrade(), playback_bus.upgrade()) else {
                return Ok(());
            };
            controls.keep_visible();

            let weak = Rc::downgrade(&controls);
            context.listen_to_once(&bus, Event::Playing, move |_| {
                if let Some(controls) = weak.upgrade() {
                    controls.show();
                    controls.disappear_after(controls.short_delay);
                }
                Ok(())
            });
            Ok(())
        });

        let weak = Rc::downgrade(controls);
        self.context.listen_to(bus, Event::Error, move |_| {
            if let Some(controls) = weak.upgrade() {
                controls.show_controls.set(false);
            }
            Ok(())
        });
    }
}

fn delay_option(options: &Options, key: &str, default: Duration) -> Duration {
    let Some(secs) = options.f64(key) else {
        return default;
    };
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        info!("Invalid {} option {}, using {:?}", key, secs, default);
        default
    })
}

impl PluginType for MediaControl {
    const NAME: &'static str = "MediaControl";
    const CATEGORY: PluginCategory = PluginCategory::Core;

    fn create(context: PluginContext) -> Self {
        Self {
            context,
            controls: None,
        }
    }
}

impl Plugin for MediaControl {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn bind(&mut self) -> Result<(), PluginError> {
        let core = self.context.host()?;
        let options = core.options();

        let controls = Rc::new(Controls {
            core: Rc::downgrade(&core),
            core_bus: core.bus().downgrade(),
            visible: Cell::new(false),
            showing: Cell::new(false),
            hiding: Cell::new(false),
            show_controls: Cell::new(true),
            always_visible: options.bool_or(options::MEDIA_CONTROL_ALWAYS_VISIBLE, false),
            plugins_dismissed: Cell::new(false),
            short_delay: delay_option(&options, SHORT_HIDE_DELAY_KEY, DEFAULT_SHORT_HIDE_DELAY),
            long_delay: delay_option(&options, LONG_HIDE_DELAY_KEY, DEFAULT_LONG_HIDE_DELAY),
            hide_timer: TimerSlot::new("media-control-hide"),
            hides: Cell::new(0),
        });

        self.bind_core_events(&core, &controls);
        if let Some(container) = core.active_container() {
            self.bind_container_events(&container, &controls);
        }
        if let Some(playback) = core.active_playback() {
            self.bind_playback_events(&playback, &controls);
        }

        self.controls = Some(controls);
        Ok(())
    }

    fn render(&mut self) -> Result<(), PluginError> {
        if let Some(controls) = &self.controls {
            if controls.always_visible {
                controls.show();
            }
        }
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(controls) = self.controls.take() {
            controls.keep_visible();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

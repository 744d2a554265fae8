use crate::context::PluginContext;
use crate::error::PluginError;
use crate::plugin::{Plugin, PluginCategory, PluginType};
use player_events::{Event, InternalEvent};
use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

/// Option key listing the core events to log. Defaults to every well-known event.
pub const EVENT_LOGGER_EVENTS_KEY: &str = "eventLoggerEvents";

/// Logs selected core events as they happen.
pub struct EventLogger {
    context: PluginContext,
    seen: Rc<Cell<u64>>,
}

impl EventLogger {
    pub fn default_events() -> Vec<String> {
        let public = [
            Event::DidDestroy,
            Event::DidUpdateOptions,
            Event::DidChangeActiveContainer,
            Event::DidChangeActivePlayback,
            Event::DidEnterFullscreen,
            Event::DidExitFullscreen,
            Event::WillShowMediaControl,
            Event::DidShowMediaControl,
            Event::WillHideMediaControl,
            Event::DidHideMediaControl,
        ]
        .iter()
        .map(|e| e.as_str().to_string());
        let internal = [
            InternalEvent::DidTappedCore,
            InternalEvent::WillBeginScrubbing,
            InternalEvent::DidFinishScrubbing,
        ]
        .iter()
        .map(|e| e.as_str().to_string());
        public.chain(internal).collect()
    }

    /// Events observed since bind.
    pub fn seen(&self) -> u64 {
        self.seen.get()
    }
}

impl PluginType for EventLogger {
    const NAME: &'static str = "EventLogger";
    const CATEGORY: PluginCategory = PluginCategory::Core;

    fn create(context: PluginContext) -> Self {
        Self {
            context,
            seen: Rc::new(Cell::new(0)),
        }
    }
}

impl Plugin for EventLogger {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn bind(&mut self) -> Result<(), PluginError> {
        let core = self.context.host()?;
        let events = core
            .options()
            .string_list(EVENT_LOGGER_EVENTS_KEY)
            .unwrap_or_else(Self::default_events);

        for event in events {
            let seen = self.seen.clone();
            let name = event.clone();
            self.context.listen_to(core.bus(), &event, move |user_info| {
                seen.set(seen.get() + 1);
                match user_info {
                    Some(info) => info!("📨 core event {} {:?}", name, info),
                    None => info!("📨 core event {}", name),
                }
                Ok(())
            });
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

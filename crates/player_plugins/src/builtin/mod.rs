//! Plugins shipped with the core.

pub mod event_logger;
pub mod media_control;

pub use event_logger::EventLogger;
pub use media_control::MediaControl;

use crate::registry::PluginRegistry;

/// Names accepted by [`register_builtin`].
pub const BUILTIN_PLUGINS: [&str; 2] = [
    <MediaControl as crate::plugin::PluginType>::NAME,
    <EventLogger as crate::plugin::PluginType>::NAME,
];

/// Register a built-in plugin by name. Returns `false` for unknown names.
pub fn register_builtin(registry: &PluginRegistry, name: &str) -> bool {
    match name {
        "MediaControl" => {
            registry.register_type::<MediaControl>();
            true
        }
        "EventLogger" => {
            registry.register_type::<EventLogger>();
            true
        }
        _ => false,
    }
}

use player_events::EventError;
use thiserror::Error;

/// Errors raised by plugins and the lifecycle that drives them.
///
/// None of these cross the host boundary: the lifecycle manager logs them
/// with the plugin's name and keeps going.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin could not subscribe to the events it needs
    #[error("Plugin bind failed: {0}")]
    BindFailed(String),
    /// Plugin failed while rendering
    #[error("Plugin render failed: {0}")]
    RenderFailed(String),
    /// Plugin panicked in one of its lifecycle steps
    #[error("Plugin panicked: {0}")]
    Panicked(String),
    /// The host the plugin was created for no longer exists
    #[error("Plugin context is gone")]
    ContextGone,
    /// A lifecycle step was re-entered for a plugin that is already running one
    #[error("Plugin {0} is busy")]
    Busy(String),
    #[error(transparent)]
    Event(#[from] EventError),
}

impl PluginError {
    pub fn from_panic(panic_info: Box<dyn std::any::Any + Send>) -> Self {
        match EventError::from_panic(panic_info) {
            EventError::Panicked(message) => PluginError::Panicked(message),
            other => PluginError::Panicked(other.to_string()),
        }
    }
}

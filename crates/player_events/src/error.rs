use thiserror::Error;

/// Errors produced while dispatching events.
///
/// Listener failures never escape [`EventBus::trigger`](crate::EventBus::trigger);
/// they are logged and counted. The variants exist so listeners have a
/// typed way to report that they could not handle an event.
#[derive(Debug, Error)]
pub enum EventError {
    /// A listener reported that it could not handle the event
    #[error("Handler execution error: {0}")]
    HandlerFailed(String),
    /// A listener panicked while running
    #[error("Handler panicked: {0}")]
    Panicked(String),
    /// The payload did not have the shape the listener expected
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
    /// A required payload key was absent
    #[error("Missing payload key: {0}")]
    MissingKey(String),
}

impl EventError {
    /// Converts a caught panic payload into an error value.
    pub fn from_panic(panic_info: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        EventError::Panicked(message)
    }
}

//! # Player Plugin System
//!
//! Plugin registration and lifecycle for player hosts. Plugins are
//! registered by category in a [`PluginRegistry`], instantiated against a
//! [`Host`] by the [`PluginLifecycleManager`], rendered and finally torn
//! down with every listener they registered.
//!
//! ## Writing a plugin
//!
//! ```rust
//! use player_events::{Event, ListenerTracker, Options};
//! use player_plugins::{
//!     Host, HostKind, Plugin, PluginCategory, PluginContext, PluginError,
//!     PluginLifecycleManager, PluginRegistry, PluginType,
//! };
//! use std::any::Any;
//!
//! struct PauseWatcher {
//!     context: PluginContext,
//! }
//!
//! impl PluginType for PauseWatcher {
//!     const NAME: &'static str = "PauseWatcher";
//!     const CATEGORY: PluginCategory = PluginCategory::Container;
//!
//!     fn create(context: PluginContext) -> Self {
//!         Self { context }
//!     }
//! }
//!
//! impl Plugin for PauseWatcher {
//!     fn name(&self) -> &str {
//!         Self::NAME
//!     }
//!
//!     fn bind(&mut self) -> Result<(), PluginError> {
//!         let host = self.context.host()?;
//!         self.context.listen_to(host.bus(), Event::DidPause, |_| Ok(()));
//!         Ok(())
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let registry = PluginRegistry::new();
//! registry.register_type::<PauseWatcher>();
//!
//! let manager = PluginLifecycleManager::new(registry, ListenerTracker::new());
//! let container = Host::new(HostKind::Container, Options::new());
//! let report = manager.attach_all(&container, PluginCategory::Container);
//! assert_eq!(report.bound, vec!["PauseWatcher".to_string()]);
//!
//! manager.render_all(&container);
//! manager.detach_all(&container);
//! assert!(!container.bus().has_listeners(Event::DidPause));
//! ```

pub mod builtin;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod ordering;
pub mod plugin;
pub mod registry;

pub use context::{AttachedPlugin, Host, HostKind, PlaybackState, PluginContext};
pub use error::PluginError;
pub use lifecycle::{AttachReport, LifecycleStats, PluginLifecycleManager, RenderReport};
pub use ordering::order_by_hint;
pub use plugin::{
    MediaControlPanel, MediaControlPlacement, MediaControlPosition, Plugin, PluginCategory,
    PluginState, PluginType,
};
pub use registry::{PluginDescriptor, PluginFactory, PluginRegistry};

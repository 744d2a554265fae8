//! Plugin trait and capability declarations.
//!
//! A plugin declares the attachment point it targets through
//! [`PluginType::CATEGORY`] rather than by inheriting from a category base
//! type. Media control plugins additionally describe where they sit through
//! [`Plugin::placement`].

use crate::context::PluginContext;
use crate::error::PluginError;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// The attachment point a plugin targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    Container,
    Core,
    Overlay,
    MediaControl,
}

impl PluginCategory {
    pub const ALL: [PluginCategory; 4] = [
        PluginCategory::Container,
        PluginCategory::Core,
        PluginCategory::Overlay,
        PluginCategory::MediaControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginCategory::Container => "container",
            PluginCategory::Core => "core",
            PluginCategory::Overlay => "overlay",
            PluginCategory::MediaControl => "media_control",
        }
    }
}

impl std::fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaControlPanel {
    Top,
    Center,
    Bottom,
    Modal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaControlPosition {
    Left,
    Center,
    Right,
    None,
}

/// Where a media control plugin is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaControlPlacement {
    pub panel: MediaControlPanel,
    pub position: MediaControlPosition,
}

/// Lifecycle position of an attached plugin. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    Bound,
    Rendered,
    /// Render failed; the plugin is not rendered again but is still destroyed
    Faulted,
    Destroyed,
}

/// Object-safe plugin interface driven by the lifecycle manager.
///
/// # Lifecycle
///
/// 1. **Construction**: the factory receives a [`PluginContext`]
/// 2. **Bind**: `bind()` subscribes to events through the context
/// 3. **Render**: `render()` (optional, may never be called)
/// 4. **Destroy**: the manager removes every subscription made through the
///    context, then calls `destroy()`
///
/// Each step runs at most once per instance.
pub trait Plugin: Any {
    /// Returns the name of this plugin
    fn name(&self) -> &str;

    /// Subscribe to the events this plugin reacts to.
    fn bind(&mut self) -> Result<(), PluginError>;

    fn render(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Release plugin-owned resources. Subscriptions are already gone.
    fn destroy(&mut self) {}

    /// Layout for media control plugins; `None` for every other category.
    fn placement(&self) -> Option<MediaControlPlacement> {
        None
    }

    /// Whether the media control should hide this plugin while the user seeks.
    fn hides_during_seek(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Compile-time identity for plugin types that can be registered with
/// [`PluginDescriptor::of`](crate::PluginDescriptor::of).
pub trait PluginType: Plugin + Sized {
    const NAME: &'static str;
    const CATEGORY: PluginCategory;

    fn create(context: PluginContext) -> Self;
}

//! # Player Event System
//!
//! The event dispatch core every player host is built on: a per-host
//! [`EventBus`], a [`ListenerTracker`] that remembers which object registered
//! which listener on which bus, loosely-typed [`Options`], and [`TimerSlot`]
//! for cancel-and-rearm delayed actions.
//!
//! Everything here is single-threaded. Buses and trackers are `Rc`-based
//! handles meant to live on the thread that drives the player.
//!
//! ## Example
//!
//! ```rust
//! use player_events::{EventBus, ListenerTracker, ObjectId};
//!
//! let core = EventBus::new(ObjectId::new(), "Core");
//! let tracker = ListenerTracker::new();
//! let plugin = ObjectId::new();
//!
//! tracker.listen_to(&core, plugin, "didPause", |_| {
//!     println!("paused");
//!     Ok(())
//! });
//! core.trigger("didPause");
//!
//! // teardown
//! tracker.stop_listening(plugin);
//! assert!(!core.has_listeners("didPause"));
//! ```

pub mod bus;
pub mod error;
pub mod events;
pub mod options;
pub mod timer;
pub mod tracker;
pub mod types;

pub use bus::{BusStats, Callback, EventBus, WeakEventBus};
pub use error::EventError;
pub use events::{Event, InternalEvent};
pub use options::Options;
pub use timer::TimerSlot;
pub use tracker::ListenerTracker;
pub use types::{user_info, ObjectId, SubscriptionId, UserInfo};

/// Version of the event core, reported by hosts at startup.
pub const PLAYER_EVENTS_VERSION: &str = env!("CARGO_PKG_VERSION");

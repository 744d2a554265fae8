//! Catalog of plugin types, partitioned by category.
//!
//! The registry is the one structure that may be shared across threads during
//! application setup. Hosts never read it directly: the lifecycle manager
//! takes a snapshot when it attaches plugins, so registering a plugin after a
//! host has been populated has no effect on that host.

use crate::context::PluginContext;
use crate::plugin::{Plugin, PluginCategory, PluginType};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Constructor for a plugin instance bound to the given context.
pub type PluginFactory = Arc<dyn Fn(PluginContext) -> Box<dyn Plugin> + Send + Sync>;

/// A registered plugin type.
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    category: PluginCategory,
    factory: PluginFactory,
}

impl PluginDescriptor {
    pub fn new<F>(name: impl Into<String>, category: PluginCategory, factory: F) -> Self
    where
        F: Fn(PluginContext) -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            category,
            factory: Arc::new(factory),
        }
    }

    /// Descriptor for a plugin type carrying its own name and category.
    pub fn of<T: PluginType>() -> Self {
        Self::new(T::NAME, T::CATEGORY, |context| {
            Box::new(T::create(context)) as Box<dyn Plugin>
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> PluginCategory {
        self.category
    }

    pub fn create(&self, context: PluginContext) -> Box<dyn Plugin> {
        (self.factory)(context)
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

struct RegistryEntry {
    seq: u64,
    descriptor: PluginDescriptor,
}

#[derive(Default)]
struct RegistryInner {
    entries: DashMap<(PluginCategory, String), RegistryEntry>,
    next_seq: AtomicU64,
}

/// Shared handle to the plugin catalog. Clones refer to the same catalog.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    inner: Arc<RegistryInner>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor, or replace the one already registered under the same
    /// name and category.
    ///
    /// A replacement keeps the original slot in the enumeration order, so a
    /// hot override does not change the render order.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The plugin's name, category and factory
    ///
    /// # Returns
    ///
    /// The descriptor that was replaced, or `None` for a new name.
    pub fn register(&self, descriptor: PluginDescriptor) -> Option<PluginDescriptor> {
        let key = (descriptor.category, descriptor.name.clone());
        match self.inner.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                debug!(
                    "🔁 Plugin {} ({}) registered again, replacing previous descriptor",
                    descriptor.name, descriptor.category
                );
                let previous = std::mem::replace(&mut occupied.get_mut().descriptor, descriptor);
                Some(previous)
            }
            Entry::Vacant(vacant) => {
                debug!("📝 Registered plugin {} ({})", descriptor.name, descriptor.category);
                let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
                vacant.insert(RegistryEntry { seq, descriptor });
                None
            }
        }
    }

    pub fn register_type<T: PluginType>(&self) -> Option<PluginDescriptor> {
        self.register(PluginDescriptor::of::<T>())
    }

    /// Snapshot of the descriptors for `category`, in registration order.
    pub fn descriptors_for(&self, category: PluginCategory) -> Vec<PluginDescriptor> {
        let mut entries: Vec<(u64, PluginDescriptor)> = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.key().0 == category)
            .map(|entry| (entry.value().seq, entry.value().descriptor.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, descriptor)| descriptor).collect()
    }

    pub fn names_for(&self, category: PluginCategory) -> Vec<String> {
        self.descriptors_for(category)
            .into_iter()
            .map(|d| d.name)
            .collect()
    }

    pub fn contains(&self, category: PluginCategory, name: &str) -> bool {
        self.inner.entries.contains_key(&(category, name.to_string()))
    }

    pub fn unregister_category(&self, category: PluginCategory) -> usize {
        let before = self.inner.entries.len();
        self.inner.entries.retain(|key, _| key.0 != category);
        let removed = before - self.inner.entries.len();
        info!("Unregistered {} {} plugins", removed, category);
        removed
    }

    pub fn unregister_all(&self) -> usize {
        let removed = self.inner.entries.len();
        self.inner.entries.clear();
        info!("Unregistered all {} plugins", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

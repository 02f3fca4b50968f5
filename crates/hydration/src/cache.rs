//! Metadata Cache - One metadata handle per component, built lazily
//!
//! Handles are fetched from the [`SchemaProvider`] on first reference and
//! kept for the lifetime of the cache. A freshly built handle has automatic
//! relationship loading switched off before anyone else can see it.
//!
//! The cache may be shared between hydrators on different threads. Inserts
//! happen under the map's entry lock, so the provider runs at most once per
//! component; providers must not call back into the cache that owns them.
//!
//! Passes hold loading off through [`MetadataCache::suppress`] and give it
//! back through [`MetadataCache::release`]. Holds are counted per component,
//! so loading comes back on only once the last pass holding it lets go.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::HydrationResult;
use crate::metadata::{MetadataHandle, MetadataSource, SchemaProvider};

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub cached_components: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoizing front of a schema provider
pub struct MetadataCache<R> {
    provider: Arc<dyn SchemaProvider<R>>,
    handles: DashMap<String, MetadataHandle<R>>,
    suppressions: DashMap<String, usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: 'static> MetadataCache<R> {
    pub fn new<P>(provider: P) -> Self
    where
        P: SchemaProvider<R> + 'static,
    {
        Self::from_provider(Arc::new(provider))
    }

    /// Create a cache over an already shared provider
    pub fn from_provider(provider: Arc<dyn SchemaProvider<R>>) -> Self {
        Self {
            provider,
            handles: DashMap::new(),
            suppressions: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<R> MetadataCache<R> {
    /// Get the handle for a component, building it on first reference.
    ///
    /// Provider failures propagate and nothing is cached for that name.
    pub fn get(&self, component: &str) -> HydrationResult<MetadataHandle<R>> {
        if let Some(handle) = self.handles.get(component) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(handle.value()));
        }

        match self.handles.entry(component.to_string()) {
            // Another thread won the race while we waited for the lock
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                let handle = self.provider.metadata_for(component)?;
                handle.set_automatic_relation_loading(false);
                self.misses.fetch_add(1, Ordering::Relaxed);

                tracing::debug!(
                    component = component,
                    resolved = handle.component_name(),
                    "Cached metadata handle"
                );

                entry.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Add one hold on `component`, switching its loading off
    pub fn suppress(&self, component: &str, handle: &MetadataHandle<R>) {
        let mut holds = self.suppressions.entry(component.to_string()).or_insert(0);
        *holds += 1;
        handle.set_automatic_relation_loading(false);
    }

    /// Drop one hold on `component`. Returns true when this was the last
    /// hold and loading was switched back on.
    pub fn release(&self, component: &str, handle: &MetadataHandle<R>) -> bool {
        match self.suppressions.entry(component.to_string()) {
            Entry::Occupied(mut entry) => {
                let remaining = entry.get().saturating_sub(1);
                if remaining > 0 {
                    *entry.get_mut() = remaining;
                    return false;
                }
                // Flag flips under the entry lock so a concurrent suppress can't interleave
                handle.set_automatic_relation_loading(true);
                entry.remove();
                true
            }
            Entry::Vacant(_) => {
                handle.set_automatic_relation_loading(true);
                true
            }
        }
    }

    /// Number of passes currently holding loading off for `component`
    pub fn holds(&self, component: &str) -> usize {
        self.suppressions
            .get(component)
            .map(|holds| *holds.value())
            .unwrap_or(0)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.handles.contains_key(component)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_components: self.handles.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<R> fmt::Debug for MetadataCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<'a, R> MetadataSource<R> for &'a MetadataCache<R> {
    fn metadata(&mut self, component: &str) -> HydrationResult<MetadataHandle<R>> {
        self.get(component)
    }
}

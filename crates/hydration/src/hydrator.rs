//! Hydration Lifecycle - Passes over a result set and their finalization
//!
//! A [`Hydrator`] owns (or shares) a metadata cache. Each result set is
//! hydrated inside a [`HydrationPass`] obtained from [`Hydrator::begin_pass`].
//! The pass holds automatic relationship loading off on every metadata
//! handle it touches, and [`HydrationPass::flush`] snapshots every collection
//! the pass knows about and gives its holds back. Loading comes back on once
//! no pass on the shared cache holds the handle.
//!
//! `begin_pass` borrows the hydrator mutably, so one hydrator can never have
//! two passes in flight. Concurrent passes use separate hydrators over a
//! shared [`MetadataCache`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::MetadataCache;
use crate::collection::{Collection, CollectionRegistry};
use crate::config::HydrationConfig;
use crate::error::HydrationResult;
use crate::materializer::{is_identifiable, materialize_resolved};
use crate::metadata::{MetadataHandle, MetadataSource, SchemaProvider};
use crate::row::Row;
use crate::supplier::RowSupplier;

/// Whether a pass currently holds relationship loading suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// No metadata touched since the pass began or was last flushed
    Idle,
    /// At least one handle has loading suppressed
    Active,
}

/// What a flush did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub collections_snapshotted: usize,
    pub collections_dropped: usize,
    /// Handles this pass let go of
    pub handles_restored: usize,
    /// Released handles that another pass still holds off
    pub handles_still_held: usize,
    pub records_hydrated: usize,
}

/// A relation slot filled during hydration
#[derive(Debug, Clone)]
pub enum Related<R> {
    /// Intentionally absent relation
    Null,
    One(R),
    Many(Collection<R>),
}

impl<R> Related<R> {
    pub fn is_null(&self) -> bool {
        matches!(self, Related::Null)
    }
}

impl<R> Default for Related<R> {
    fn default() -> Self {
        Related::Null
    }
}

/// Entry point of the hydration engine
#[derive(Debug)]
pub struct Hydrator<R> {
    cache: Arc<MetadataCache<R>>,
    config: HydrationConfig,
}

impl<R: 'static> Hydrator<R> {
    /// Create a hydrator with its own cache over `provider`
    pub fn new<P>(provider: P) -> Self
    where
        P: SchemaProvider<R> + 'static,
    {
        Self::with_cache(Arc::new(MetadataCache::new(provider)))
    }

    /// Create a hydrator with a validated configuration
    pub fn with_config<P>(provider: P, config: HydrationConfig) -> HydrationResult<Self>
    where
        P: SchemaProvider<R> + 'static,
    {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(MetadataCache::new(provider)),
            config,
        })
    }
}

impl<R> Hydrator<R> {
    /// Create a hydrator over a cache shared with other hydrators
    pub fn with_cache(cache: Arc<MetadataCache<R>>) -> Self {
        Self {
            cache,
            config: HydrationConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn configure(&mut self, config: HydrationConfig) -> HydrationResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn cache(&self) -> &Arc<MetadataCache<R>> {
        &self.cache
    }

    pub fn config(&self) -> &HydrationConfig {
        &self.config
    }

    /// Start a hydration pass
    pub fn begin_pass(&mut self) -> HydrationPass<'_, R> {
        let hydrator: &Hydrator<R> = self;
        HydrationPass {
            config: &hydrator.config,
            scope: PassScope {
                cache: &hydrator.cache,
                touched: Vec::new(),
                touched_names: HashSet::new(),
            },
            collections: CollectionRegistry::new(),
            records_hydrated: 0,
        }
    }
}

/// Metadata access for one pass, remembering every handle it touched
struct PassScope<'h, R> {
    cache: &'h MetadataCache<R>,
    touched: Vec<(String, MetadataHandle<R>)>,
    touched_names: HashSet<String>,
}

/// Holds a pass gave back
#[derive(Debug, Clone, Copy, Default)]
struct Restored {
    released: usize,
    still_held: usize,
}

impl<'h, R> PassScope<'h, R> {
    fn restore_all(&mut self) -> Restored {
        let mut restored = Restored::default();
        for (component, handle) in self.touched.drain(..) {
            restored.released += 1;
            if !self.cache.release(&component, &handle) {
                restored.still_held += 1;
            }
        }
        self.touched_names.clear();
        restored
    }
}

impl<'h, R> MetadataSource<R> for PassScope<'h, R> {
    fn metadata(&mut self, component: &str) -> HydrationResult<MetadataHandle<R>> {
        let handle = self.cache.get(component)?;
        if self.touched_names.insert(component.to_string()) {
            self.cache.suppress(component, &handle);
            self.touched.push((component.to_string(), Arc::clone(&handle)));
        }
        Ok(handle)
    }
}

/// One hydration pass over a result set
pub struct HydrationPass<'h, R> {
    config: &'h HydrationConfig,
    scope: PassScope<'h, R>,
    collections: CollectionRegistry<R>,
    records_hydrated: usize,
}

impl<'h, R> HydrationPass<'h, R> {
    pub fn state(&self) -> PassState {
        if self.scope.touched.is_empty() {
            PassState::Idle
        } else {
            PassState::Active
        }
    }

    /// Components whose handles this pass has touched since the last flush
    pub fn touched_components(&self) -> Vec<&str> {
        self.scope
            .touched
            .iter()
            .map(|(_, handle)| handle.component_name())
            .collect()
    }

    /// Build one record from a row, resolving its concrete component first
    pub fn get_element(&mut self, row: &Row, component: &str) -> HydrationResult<R> {
        let materialized = materialize_resolved(&mut self.scope, row, component)?;
        self.records_hydrated += 1;

        if self.config.trace_rows {
            tracing::trace!(
                base = component,
                resolved = %materialized.component,
                columns = row.len(),
                "Materialized row"
            );
        }

        Ok(materialized.record)
    }

    /// Create an empty collection for `component`, tracked by this pass
    pub fn get_element_collection(&mut self, component: &str) -> Collection<R> {
        self.collections.create(component, self.config.collection_capacity)
    }

    /// Track a collection supplied by the caller. Returns false if already tracked.
    pub fn register_collection(&mut self, collection: &Collection<R>) -> bool {
        self.collections.register(collection)
    }

    /// Position of the last member of a collection
    pub fn get_last_key(&self, collection: &Collection<R>) -> Option<usize> {
        collection.last_key()
    }

    /// Sentinel for an intentionally absent relation
    pub fn null_pointer(&self) -> Related<R> {
        Related::Null
    }

    /// Whether the row carries every identifier column of its resolved component
    pub fn is_identifiable(&mut self, row: &Row, component: &str) -> HydrationResult<bool> {
        is_identifiable(&mut self.scope, row, component)
    }

    pub fn registered_collections(&self) -> usize {
        self.collections.len()
    }

    pub fn records_hydrated(&self) -> usize {
        self.records_hydrated
    }

    /// Hydrate every row into a fresh collection tracked by this pass
    pub fn hydrate_rows<I>(&mut self, rows: I, component: &str) -> HydrationResult<Collection<R>>
    where
        I: IntoIterator<Item = Row>,
    {
        let collection = self.get_element_collection(component);
        for row in rows {
            let record = self.get_element(&row, component)?;
            collection.append(record);
        }
        Ok(collection)
    }

    /// Hydrate everything a supplier yields into a fresh collection tracked by this pass
    pub async fn hydrate_from<S>(
        &mut self,
        supplier: &mut S,
        component: &str,
    ) -> HydrationResult<Collection<R>>
    where
        S: RowSupplier + ?Sized,
    {
        let collection = self.get_element_collection(component);
        while let Some(row) = supplier.next_row().await? {
            let record = self.get_element(&row, component)?;
            collection.append(record);
        }
        Ok(collection)
    }

    /// Abandon the pass without snapshotting, releasing its holds on loading
    pub fn abort(mut self) -> usize {
        let restored = self.scope.restore_all();
        tracing::debug!(
            handles_restored = restored.released,
            still_held = restored.still_held,
            "Hydration pass aborted"
        );
        restored.released
    }
}

impl<'h, R: Clone> HydrationPass<'h, R> {
    /// Snapshot every tracked collection and release this pass's hold on
    /// every handle touched since the last flush.
    ///
    /// Collections stay tracked, so flushing again re-snapshots them.
    pub fn flush(&mut self) -> FlushReport {
        let summary = self.collections.snapshot_all();
        let restored = self.scope.restore_all();

        let report = FlushReport {
            collections_snapshotted: summary.snapshotted,
            collections_dropped: summary.dropped,
            handles_restored: restored.released,
            handles_still_held: restored.still_held,
            records_hydrated: self.records_hydrated,
        };

        tracing::debug!(
            collections = report.collections_snapshotted,
            dropped = report.collections_dropped,
            handles = report.handles_restored,
            still_held = report.handles_still_held,
            records = report.records_hydrated,
            "Hydration pass flushed"
        );

        report
    }

    /// Flush and end the pass
    pub fn finish(mut self) -> FlushReport {
        self.flush()
    }
}

impl<'h, R> Drop for HydrationPass<'h, R> {
    fn drop(&mut self) {
        if self.state() == PassState::Idle {
            return;
        }

        tracing::warn!(
            components = ?self.touched_components(),
            restoring = self.config.restore_loading_on_drop,
            "Hydration pass dropped without flush"
        );

        if self.config.restore_loading_on_drop {
            self.scope.restore_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HydrationError;
    use crate::schema::{ComponentDefinition, SchemaRegistry};
    use crate::supplier::VecRowSupplier;

    #[derive(Debug, Clone, PartialEq)]
    enum Pet {
        Animal { name: String },
        Dog { name: String },
        Cat { name: String },
    }

    fn pet_registry() -> SchemaRegistry<Pet> {
        let registry = SchemaRegistry::new();
        registry
            .register(
                ComponentDefinition::new("Animal", |row: &Row| {
                    Ok(Pet::Animal {
                        name: row.get_as("name")?,
                    })
                })
                .with_subclasses(["Dog", "Cat"])
                .with_identifier(["id"]),
            )
            .unwrap();
        registry
            .register(
                ComponentDefinition::new("Dog", |row: &Row| {
                    Ok(Pet::Dog {
                        name: row.get_as("name")?,
                    })
                })
                .with_discriminator("type", "dog"),
            )
            .unwrap();
        registry
            .register(
                ComponentDefinition::new("Cat", |row: &Row| {
                    Ok(Pet::Cat {
                        name: row.get_as("name")?,
                    })
                })
                .with_discriminator("type", "cat"),
            )
            .unwrap();
        registry
    }

    fn row(kind: Option<&str>, name: &str) -> Row {
        let row = Row::new().with_column("name", name);
        match kind {
            Some(kind) => row.with_column("type", kind),
            None => row,
        }
    }

    #[test]
    fn test_get_element_resolves_subclasses() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();

        assert_eq!(
            pass.get_element(&row(Some("cat"), "Tom"), "Animal").unwrap(),
            Pet::Cat {
                name: "Tom".to_string()
            }
        );
        assert_eq!(
            pass.get_element(&row(Some("fish"), "Nemo"), "Animal").unwrap(),
            Pet::Animal {
                name: "Nemo".to_string()
            }
        );
        assert_eq!(
            pass.get_element(&row(None, "Rex"), "Animal").unwrap(),
            Pet::Animal {
                name: "Rex".to_string()
            }
        );
        assert_eq!(pass.records_hydrated(), 3);
        pass.finish();
    }

    #[test]
    fn test_loading_suppressed_until_flush() {
        let mut hydrator = Hydrator::new(pet_registry());
        let cache = Arc::clone(hydrator.cache());
        let mut pass = hydrator.begin_pass();
        assert_eq!(pass.state(), PassState::Idle);

        // A cat row walks past Dog before matching Cat, touching all three
        pass.get_element(&row(Some("cat"), "Tom"), "Animal").unwrap();
        assert_eq!(pass.state(), PassState::Active);

        let mut touched = pass.touched_components();
        touched.sort();
        assert_eq!(touched, vec!["Animal", "Cat", "Dog"]);
        for name in ["Animal", "Dog", "Cat"] {
            assert!(!cache.get(name).unwrap().automatic_relation_loading());
        }

        let report = pass.flush();
        assert_eq!(report.handles_restored, 3);
        assert_eq!(pass.state(), PassState::Idle);
        for name in ["Animal", "Dog", "Cat"] {
            assert!(cache.get(name).unwrap().automatic_relation_loading());
        }
    }

    #[test]
    fn test_second_pass_suppresses_cached_handles_again() {
        let mut hydrator = Hydrator::new(pet_registry());
        hydrator
            .begin_pass()
            .get_element(&row(Some("cat"), "Tom"), "Animal")
            .unwrap();

        // The dropped pass restored loading
        let animal = hydrator.cache().get("Animal").unwrap();
        assert!(animal.automatic_relation_loading());

        let mut pass = hydrator.begin_pass();
        pass.get_element(&row(Some("cat"), "Tom"), "Animal").unwrap();
        assert!(!animal.automatic_relation_loading());
        pass.finish();
        assert!(animal.automatic_relation_loading());
    }

    #[test]
    fn test_flush_reports_handles_held_elsewhere() {
        let cache: Arc<MetadataCache<Pet>> = Arc::new(MetadataCache::new(pet_registry()));
        let mut first = Hydrator::with_cache(Arc::clone(&cache));
        let mut second = Hydrator::with_cache(Arc::clone(&cache));

        let mut a = first.begin_pass();
        let mut b = second.begin_pass();
        a.get_element(&row(None, "Rex"), "Animal").unwrap();
        b.get_element(&row(None, "Max"), "Animal").unwrap();
        assert_eq!(cache.holds("Animal"), 2);

        let report = a.finish();
        assert_eq!(report.handles_restored, 3);
        assert_eq!(report.handles_still_held, 3);
        assert!(!cache.get("Animal").unwrap().automatic_relation_loading());

        let report = b.finish();
        assert_eq!(report.handles_still_held, 0);
        assert!(cache.get("Animal").unwrap().automatic_relation_loading());
    }

    #[test]
    fn test_flush_snapshots_every_collection() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();

        let cats = pass.get_element_collection("Animal");
        let outer = Collection::new("Animal");
        assert!(pass.register_collection(&outer));
        assert!(!pass.register_collection(&cats));

        cats.append(pass.get_element(&row(Some("cat"), "Tom"), "Animal").unwrap());
        outer.append(pass.get_element(&row(None, "Rex"), "Animal").unwrap());
        outer.append(pass.get_element(&row(None, "Max"), "Animal").unwrap());
        assert_eq!(pass.get_last_key(&outer), Some(1));

        let report = pass.flush();
        assert_eq!(report.collections_snapshotted, 2);
        assert_eq!(report.records_hydrated, 3);
        assert_eq!(cats.snapshot().unwrap().len(), 1);
        assert_eq!(outer.snapshot().unwrap().len(), 2);

        // Members added after the flush are not in the snapshot
        outer.append(pass.get_element(&row(None, "Bo"), "Animal").unwrap());
        assert_eq!(outer.snapshot().unwrap().len(), 2);
        pass.finish();
        assert_eq!(outer.snapshot().unwrap().len(), 3);
    }

    #[test]
    fn test_flush_without_work_is_noop() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();
        assert_eq!(pass.flush(), FlushReport::default());
        assert_eq!(pass.flush(), FlushReport::default());
    }

    #[test]
    fn test_unknown_component_propagates() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();

        let result = pass.get_element(&row(None, "Twig"), "Plant");
        assert_eq!(
            result,
            Err(HydrationError::UnknownComponent {
                component: "Plant".to_string()
            })
        );
        assert_eq!(pass.records_hydrated(), 0);
    }

    #[test]
    fn test_abort_restores_loading() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();
        let collection = pass.hydrate_rows(vec![row(Some("dog"), "Rex")], "Animal").unwrap();
        // Animal and Dog; Cat was never consulted
        assert_eq!(pass.abort(), 2);

        assert!(!collection.has_snapshot());
        assert!(hydrator
            .cache()
            .get("Dog")
            .unwrap()
            .automatic_relation_loading());
    }

    #[test]
    fn test_drop_without_restore_leaves_loading_disabled() {
        let mut hydrator = Hydrator::with_config(
            pet_registry(),
            HydrationConfig::default().with_restore_loading_on_drop(false),
        )
        .unwrap();

        {
            let mut pass = hydrator.begin_pass();
            pass.get_element(&row(Some("dog"), "Rex"), "Animal").unwrap();
        }

        assert!(!hydrator
            .cache()
            .get("Animal")
            .unwrap()
            .automatic_relation_loading());
    }

    #[test]
    fn test_null_pointer_and_identifiable() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();

        assert!(pass.null_pointer().is_null());
        assert!(!Related::One(Pet::Animal {
            name: "Rex".to_string()
        })
        .is_null());

        let identified = row(None, "Rex").with_column("id", 1);
        assert!(pass.is_identifiable(&identified, "Animal").unwrap());
        assert!(!pass.is_identifiable(&row(None, "Rex"), "Animal").unwrap());
        // Dog declares no identifier columns
        assert!(!pass.is_identifiable(&identified.with_column("type", "dog"), "Animal").unwrap());
        pass.finish();
    }

    #[tokio::test]
    async fn test_hydrate_from_supplier() {
        let mut hydrator = Hydrator::new(pet_registry());
        let mut pass = hydrator.begin_pass();
        let mut supplier = VecRowSupplier::new(vec![
            row(Some("dog"), "Rex"),
            row(Some("cat"), "Tom"),
        ]);

        let collection = pass.hydrate_from(&mut supplier, "Animal").await.unwrap();
        let report = pass.finish();

        assert_eq!(report.collections_snapshotted, 1);
        assert_eq!(
            collection.snapshot().unwrap().records(),
            &[
                Pet::Dog {
                    name: "Rex".to_string()
                },
                Pet::Cat {
                    name: "Tom".to_string()
                }
            ]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = HydrationConfig::default()
            .with_collection_capacity(crate::config::MAX_COLLECTION_CAPACITY + 1);
        assert!(Hydrator::with_config(pet_registry(), config.clone()).is_err());

        let mut hydrator = Hydrator::new(pet_registry());
        assert!(hydrator.configure(config).is_err());
    }
}

//! Schema Registry - Component definitions resolved by name
//!
//! A closed registry mapping component names to record factories and
//! inheritance configuration. It is the stock [`SchemaProvider`]; hosts
//! with their own schema layer can implement the trait directly instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{HydrationError, HydrationResult};
use crate::metadata::{ComponentMetadata, InheritanceMap, MetadataHandle, SchemaProvider};
use crate::row::Row;
use crate::value::ColumnValue;

/// Builds a record of the component from a row
pub type RecordFactory<R> = Arc<dyn Fn(&Row) -> HydrationResult<R> + Send + Sync>;

/// Definition of one component: how to build it and where it sits in its hierarchy
pub struct ComponentDefinition<R> {
    name: String,
    subclasses: Vec<String>,
    inheritance: InheritanceMap,
    identifier: Vec<String>,
    factory: RecordFactory<R>,
}

impl<R> ComponentDefinition<R> {
    /// Create a definition with the factory that builds its records
    pub fn new<F>(name: &str, factory: F) -> Self
    where
        F: Fn(&Row) -> HydrationResult<R> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            subclasses: Vec::new(),
            inheritance: InheritanceMap::new(),
            identifier: Vec::new(),
            factory: Arc::new(factory),
        }
    }

    /// Declare subclasses. Declaration order decides which match wins.
    pub fn with_subclasses<I, S>(mut self, subclasses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subclasses.extend(subclasses.into_iter().map(Into::into));
        self
    }

    /// Add a discriminator pair for this component
    pub fn with_discriminator<V: Into<ColumnValue>>(mut self, column: &str, value: V) -> Self {
        self.inheritance = self.inheritance.with(column, value);
        self
    }

    /// Set the identifier (primary key) columns
    pub fn with_identifier<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifier = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subclasses(&self) -> &[String] {
        &self.subclasses
    }

    /// Validate the definition for consistency
    pub fn validate(&self) -> HydrationResult<()> {
        if self.name.trim().is_empty() {
            return Err(HydrationError::Configuration(
                "Component name must not be empty".to_string(),
            ));
        }

        if self.subclasses.iter().any(|subclass| subclass == &self.name) {
            return Err(HydrationError::Configuration(format!(
                "Component '{}' cannot declare itself as a subclass",
                self.name
            )));
        }

        for (i, subclass) in self.subclasses.iter().enumerate() {
            if self.subclasses[..i].contains(subclass) {
                return Err(HydrationError::Configuration(format!(
                    "Component '{}' declares subclass '{}' more than once",
                    self.name, subclass
                )));
            }
        }

        Ok(())
    }
}

impl<R> Clone for ComponentDefinition<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            subclasses: self.subclasses.clone(),
            inheritance: self.inheritance.clone(),
            identifier: self.identifier.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<R> fmt::Debug for ComponentDefinition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("subclasses", &self.subclasses)
            .field("inheritance", &self.inheritance)
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Metadata handle built from a [`ComponentDefinition`]
pub struct ComponentTable<R> {
    definition: ComponentDefinition<R>,
    load_references: AtomicBool,
}

impl<R> ComponentTable<R> {
    pub fn new(definition: ComponentDefinition<R>) -> Self {
        Self {
            definition,
            load_references: AtomicBool::new(true),
        }
    }
}

impl<R> fmt::Debug for ComponentTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTable")
            .field("definition", &self.definition)
            .field("load_references", &self.load_references.load(Ordering::Acquire))
            .finish()
    }
}

impl<R> ComponentMetadata<R> for ComponentTable<R> {
    fn component_name(&self) -> &str {
        &self.definition.name
    }

    fn subclasses(&self) -> &[String] {
        &self.definition.subclasses
    }

    fn inheritance_map(&self) -> &InheritanceMap {
        &self.definition.inheritance
    }

    fn identifier_columns(&self) -> &[String] {
        &self.definition.identifier
    }

    fn set_automatic_relation_loading(&self, enabled: bool) {
        self.load_references.store(enabled, Ordering::Release);
    }

    fn automatic_relation_loading(&self) -> bool {
        self.load_references.load(Ordering::Acquire)
    }

    fn populate(&self, row: &Row) -> HydrationResult<R> {
        (self.definition.factory)(row)
    }
}

/// Thread-safe registry of component definitions
pub struct SchemaRegistry<R> {
    components: DashMap<String, ComponentDefinition<R>>,
    handles_built: AtomicU64,
}

impl<R> Default for SchemaRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SchemaRegistry<R> {
    pub fn new() -> Self {
        Self {
            components: DashMap::new(),
            handles_built: AtomicU64::new(0),
        }
    }

    /// Register a component definition, replacing any previous one of the same name
    pub fn register(&self, definition: ComponentDefinition<R>) -> HydrationResult<()> {
        definition.validate()?;
        self.components.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Builder-style registration
    pub fn with_component(self, definition: ComponentDefinition<R>) -> HydrationResult<Self> {
        self.register(definition)?;
        Ok(self)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }

    /// Registered component names, sorted
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .components
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of metadata handles this registry has constructed
    pub fn handles_built(&self) -> u64 {
        self.handles_built.load(Ordering::Relaxed)
    }
}

impl<R: 'static> SchemaProvider<R> for SchemaRegistry<R> {
    fn metadata_for(&self, component: &str) -> HydrationResult<MetadataHandle<R>> {
        let definition = self
            .components
            .get(component)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| HydrationError::UnknownComponent {
                component: component.to_string(),
            })?;

        self.handles_built.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(ComponentTable::new(definition)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_factory(row: &Row) -> HydrationResult<String> {
        row.get_as("name")
    }

    #[test]
    fn test_registry_builds_handles() {
        let registry = SchemaRegistry::new()
            .with_component(
                ComponentDefinition::new("Animal", name_factory)
                    .with_subclasses(["Dog", "Cat"])
                    .with_identifier(["id"]),
            )
            .unwrap();

        let handle = registry.metadata_for("Animal").unwrap();
        assert_eq!(handle.component_name(), "Animal");
        assert_eq!(handle.subclasses(), ["Dog".to_string(), "Cat".to_string()]);
        assert_eq!(handle.identifier_columns(), ["id".to_string()]);
        assert!(handle.automatic_relation_loading());
        assert_eq!(registry.handles_built(), 1);

        let record = handle
            .populate(&Row::new().with_column("name", "Tom"))
            .unwrap();
        assert_eq!(record, "Tom");
    }

    #[test]
    fn test_unknown_component() {
        let registry: SchemaRegistry<String> = SchemaRegistry::new();
        let err = registry.metadata_for("Ghost").err().unwrap();
        assert_eq!(
            err,
            HydrationError::UnknownComponent {
                component: "Ghost".to_string()
            }
        );
        assert_eq!(registry.handles_built(), 0);
    }

    #[test]
    fn test_definition_validation() {
        let own_subclass =
            ComponentDefinition::new("Animal", name_factory).with_subclasses(["Animal"]);
        assert!(own_subclass.validate().is_err());

        let duplicate =
            ComponentDefinition::new("Animal", name_factory).with_subclasses(["Dog", "Dog"]);
        assert!(duplicate.validate().is_err());

        let unnamed = ComponentDefinition::new("  ", name_factory);
        assert!(unnamed.validate().is_err());

        let registry = SchemaRegistry::new();
        assert!(registry.register(duplicate).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_loading_flag_toggles() {
        let table = ComponentTable::new(ComponentDefinition::new("Dog", name_factory));
        table.set_automatic_relation_loading(false);
        assert!(!table.automatic_relation_loading());
        table.set_automatic_relation_loading(true);
        assert!(table.automatic_relation_loading());
    }
}

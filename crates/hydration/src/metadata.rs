//! Component Metadata - The contract between the engine and the schema layer
//!
//! The engine never maps columns to fields itself. It asks a
//! [`SchemaProvider`] for a [`ComponentMetadata`] handle per component and
//! lets that handle describe inheritance and build records.

use std::sync::Arc;

use crate::error::HydrationResult;
use crate::row::Row;
use crate::value::ColumnValue;

/// Shared handle to one component's metadata
pub type MetadataHandle<R> = Arc<dyn ComponentMetadata<R>>;

/// Ordered discriminator pairs identifying a subclass.
///
/// Only the first pair takes part in matching. Multi-column discriminators
/// are not supported; extra pairs are kept for introspection only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritanceMap {
    pairs: Vec<(String, ColumnValue)>,
}

impl InheritanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-pair map, the common case
    pub fn single<V: Into<ColumnValue>>(column: &str, value: V) -> Self {
        Self::new().with(column, value)
    }

    pub fn with<V: Into<ColumnValue>>(mut self, column: &str, value: V) -> Self {
        self.pairs.push((column.to_string(), value.into()));
        self
    }

    /// The discriminator pair consulted during resolution
    pub fn discriminator(&self) -> Option<(&str, &ColumnValue)> {
        self.pairs
            .first()
            .map(|(column, value)| (column.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.pairs.iter().map(|(column, value)| (column.as_str(), value))
    }

    /// Check whether a row carries this map's discriminator.
    ///
    /// A missing or NULL column is a non-match, never an error.
    pub fn matches(&self, row: &Row) -> bool {
        let Some((column, expected)) = self.discriminator() else {
            return false;
        };

        row.get_non_null(column)
            .map(|actual| actual.loosely_equals(expected))
            .unwrap_or(false)
    }
}

/// Per-component metadata handle exposed by the schema layer
pub trait ComponentMetadata<R>: Send + Sync {
    /// Concrete component name this handle describes
    fn component_name(&self) -> &str;

    /// Declared subclasses, in declaration order
    fn subclasses(&self) -> &[String];

    /// This component's own discriminator, as seen from its parent
    fn inheritance_map(&self) -> &InheritanceMap;

    /// Columns that make up the record identity
    fn identifier_columns(&self) -> &[String] {
        &[]
    }

    /// Toggle automatic relationship loading for records of this component
    fn set_automatic_relation_loading(&self, enabled: bool);

    fn automatic_relation_loading(&self) -> bool;

    /// Build a record from a row. Column mapping and validation live here.
    fn populate(&self, row: &Row) -> HydrationResult<R>;
}

/// Source of metadata handles, keyed by component name
pub trait SchemaProvider<R>: Send + Sync {
    fn metadata_for(&self, component: &str) -> HydrationResult<MetadataHandle<R>>;
}

impl<R, P> SchemaProvider<R> for Arc<P>
where
    P: SchemaProvider<R> + ?Sized,
{
    fn metadata_for(&self, component: &str) -> HydrationResult<MetadataHandle<R>> {
        (**self).metadata_for(component)
    }
}

/// Anything that hands out metadata handles during hydration.
///
/// Implemented by the shared cache and by the per-pass scope that tracks
/// which handles a pass has touched.
pub trait MetadataSource<R> {
    fn metadata(&mut self, component: &str) -> HydrationResult<MetadataHandle<R>>;
}

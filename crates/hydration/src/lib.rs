//! # elif-hydration: Result Hydration for elif.rs
//!
//! Turns flat query-result rows into typed, inheritance-aware records.
//!
//! - a metadata cache that builds one handle per component on first use
//! - discriminator-based subclass resolution (first declared match wins)
//! - record materialization through the component's own factory
//! - hydration passes that track every collection they create and, on
//!   flush, snapshot them and re-enable automatic relationship loading
//!
//! ```ignore
//! use elif_hydration::{ComponentDefinition, Hydrator, Row, SchemaRegistry};
//!
//! let schema = SchemaRegistry::new()
//!     .with_component(ComponentDefinition::new("Animal", Pet::animal).with_subclasses(["Dog"]))?
//!     .with_component(
//!         ComponentDefinition::new("Dog", Pet::dog).with_discriminator("type", "dog"),
//!     )?;
//!
//! let mut hydrator = Hydrator::new(schema);
//! let mut pass = hydrator.begin_pass();
//! let pets = pass.hydrate_rows(rows, "Animal")?;
//! pass.finish();
//! ```

pub mod cache;
pub mod collection;
pub mod config;
pub mod error;
pub mod hydrator;
pub mod materializer;
pub mod metadata;
pub mod resolver;
pub mod row;
pub mod schema;
pub mod supplier;
pub mod value;

// Re-export core types
pub use cache::{CacheStats, MetadataCache};
pub use collection::{Collection, CollectionRegistry, Snapshot, SnapshotSummary};
pub use config::HydrationConfig;
pub use error::{HydrationError, HydrationResult};
pub use hydrator::{FlushReport, HydrationPass, Hydrator, PassState, Related};
pub use materializer::{is_identifiable, materialize, materialize_resolved, Materialized};
pub use metadata::{
    ComponentMetadata, InheritanceMap, MetadataHandle, MetadataSource, SchemaProvider,
};
pub use resolver::resolve_component;
pub use row::Row;
pub use schema::{ComponentDefinition, ComponentTable, RecordFactory, SchemaRegistry};
pub use supplier::{PgRowSupplier, RowSupplier, VecRowSupplier};
pub use value::ColumnValue;

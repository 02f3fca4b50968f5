//! Record Materialization - Building a record from one row

use crate::error::HydrationResult;
use crate::metadata::MetadataSource;
use crate::resolver::resolve_component;
use crate::row::Row;

/// A record together with the concrete component it was built as
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized<R> {
    pub component: String,
    pub record: R,
}

/// Resolve the concrete component for `row` and let its metadata build the record.
///
/// Row content is not validated here; population errors propagate as-is.
pub fn materialize_resolved<R, S>(
    source: &mut S,
    row: &Row,
    component: &str,
) -> HydrationResult<Materialized<R>>
where
    S: MetadataSource<R> + ?Sized,
{
    let concrete = resolve_component(source, row, component)?;
    let handle = source.metadata(&concrete)?;
    let record = handle.populate(row)?;

    Ok(Materialized {
        component: concrete,
        record,
    })
}

/// Build a record for `row`, discarding the resolved component name
pub fn materialize<R, S>(source: &mut S, row: &Row, component: &str) -> HydrationResult<R>
where
    S: MetadataSource<R> + ?Sized,
{
    materialize_resolved(source, row, component).map(|materialized| materialized.record)
}

/// Whether a row carries a non-null value for every identifier column of
/// the component it resolves to. Components without identifier columns are
/// never identifiable.
pub fn is_identifiable<R, S>(source: &mut S, row: &Row, component: &str) -> HydrationResult<bool>
where
    S: MetadataSource<R> + ?Sized,
{
    let concrete = resolve_component(source, row, component)?;
    let handle = source.metadata(&concrete)?;
    let identifier = handle.identifier_columns();

    Ok(!identifier.is_empty()
        && identifier
            .iter()
            .all(|column| row.get_non_null(column).is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MetadataCache;
    use crate::error::HydrationError;
    use crate::schema::{ComponentDefinition, SchemaRegistry};
    use crate::value::ColumnValue;

    #[derive(Debug, Clone, PartialEq)]
    enum Shape {
        Plain { id: i64 },
        Circle { id: i64, radius: f64 },
    }

    fn shapes() -> MetadataCache<Shape> {
        let registry = SchemaRegistry::new();
        registry
            .register(
                ComponentDefinition::new("Shape", |row: &Row| {
                    Ok(Shape::Plain { id: row.get_as("id")? })
                })
                .with_subclasses(["Circle"])
                .with_identifier(["id"]),
            )
            .unwrap();
        registry
            .register(
                ComponentDefinition::new("Circle", |row: &Row| {
                    Ok(Shape::Circle {
                        id: row.get_as("id")?,
                        radius: row.get_as("radius")?,
                    })
                })
                .with_discriminator("kind", "circle")
                .with_identifier(["id"]),
            )
            .unwrap();
        MetadataCache::new(registry)
    }

    #[test]
    fn test_materializes_resolved_subclass() {
        let cache = shapes();
        let mut source = &cache;
        let row = Row::new()
            .with_column("id", 7)
            .with_column("kind", "circle")
            .with_column("radius", 1.5);

        let materialized = materialize_resolved(&mut source, &row, "Shape").unwrap();
        assert_eq!(materialized.component, "Circle");
        assert_eq!(materialized.record, Shape::Circle { id: 7, radius: 1.5 });
    }

    #[test]
    fn test_materializes_base_when_no_subclass_matches() {
        let cache = shapes();
        let mut source = &cache;
        let row = Row::new().with_column("id", 3).with_column("kind", "square");

        let record = materialize(&mut source, &row, "Shape").unwrap();
        assert_eq!(record, Shape::Plain { id: 3 });
    }

    #[test]
    fn test_population_errors_propagate() {
        let cache = shapes();
        let mut source = &cache;
        let row = Row::new().with_column("id", 3).with_column("kind", "circle");

        let err = materialize(&mut source, &row, "Shape").unwrap_err();
        assert_eq!(
            err,
            HydrationError::ColumnNotFound {
                column: "radius".to_string()
            }
        );
    }

    #[test]
    fn test_identifiable_rows() {
        let cache = shapes();
        let mut source = &cache;

        let with_id = Row::new().with_column("id", 1);
        let null_id = Row::new().with_column("id", ColumnValue::Null);
        let no_id = Row::new().with_column("kind", "circle");

        assert!(is_identifiable(&mut source, &with_id, "Shape").unwrap());
        assert!(!is_identifiable(&mut source, &null_id, "Shape").unwrap());
        assert!(!is_identifiable(&mut source, &no_id, "Shape").unwrap());
    }
}

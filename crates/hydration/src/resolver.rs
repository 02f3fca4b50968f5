//! Class Resolution - Picking the concrete component for a row
//!
//! Subclasses are tried in declaration order and the first one whose
//! discriminator matches the row wins. When nothing matches, the base
//! component is returned unchanged; that is a normal outcome.

use crate::error::HydrationResult;
use crate::metadata::MetadataSource;
use crate::row::Row;

/// Determine the most specific component name to build for a row.
///
/// Only the direct subclasses of `component` are considered, and only the
/// first pair of each subclass's inheritance map is compared.
pub fn resolve_component<R, S>(
    source: &mut S,
    row: &Row,
    component: &str,
) -> HydrationResult<String>
where
    S: MetadataSource<R> + ?Sized,
{
    let handle = source.metadata(component)?;
    let subclasses = handle.subclasses();

    if subclasses.is_empty() {
        return Ok(component.to_string());
    }

    for subclass in subclasses {
        let subclass_handle = source.metadata(subclass)?;
        if subclass_handle.inheritance_map().matches(row) {
            tracing::trace!(
                base = component,
                resolved = subclass_handle.component_name(),
                "Resolved subclass from discriminator"
            );
            return Ok(subclass_handle.component_name().to_string());
        }
    }

    Ok(component.to_string())
}

//! Error types for the hydration engine
//!
//! The failure surface is narrow: missing metadata, bad column content and
//! configuration problems. Discriminator mismatches are never errors.

/// Result type alias for hydration operations
pub type HydrationResult<T> = Result<T, HydrationError>;

/// Error types for hydration operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HydrationError {
    /// The schema provider has no metadata for this component
    #[error("Unknown component '{component}': no metadata available")]
    UnknownComponent { component: String },

    /// A column required by a population routine is not in the row
    #[error("Column '{column}' not found in row")]
    ColumnNotFound { column: String },

    /// A column value could not be converted to the requested type
    #[error("Failed to convert column '{column}': {message}")]
    Conversion { column: String, message: String },

    /// A component's population routine rejected the row
    #[error("Failed to populate '{component}' from row: {message}")]
    Population { component: String, message: String },

    /// Invalid hydration configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error raised by the row supplier's database layer
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HydrationError {
    /// Build a population error for a component
    pub fn population(component: impl Into<String>, message: impl Into<String>) -> Self {
        HydrationError::Population {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error means metadata could not be resolved
    pub fn is_unknown_component(&self) -> bool {
        matches!(self, HydrationError::UnknownComponent { .. })
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for HydrationError {
    fn from(err: sqlx::Error) -> Self {
        HydrationError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for HydrationError {
    fn from(err: serde_json::Error) -> Self {
        HydrationError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HydrationError::UnknownComponent {
            component: "Animal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown component 'Animal': no metadata available"
        );
        assert!(err.is_unknown_component());

        let err = HydrationError::population("Dog", "missing name");
        assert_eq!(
            err.to_string(),
            "Failed to populate 'Dog' from row: missing name"
        );
        assert!(!err.is_unknown_component());
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse: Result<i32, _> = serde_json::from_str("not a number");
        let err: HydrationError = parse.unwrap_err().into();
        assert!(matches!(err, HydrationError::Serialization(_)));
    }
}

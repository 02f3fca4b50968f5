//! Hydration Configuration
//!
//! Plain settings with defaults, builder methods and an environment loader.

use std::env;

use crate::error::{HydrationError, HydrationResult};

/// Upper bound for pre-allocated collection capacity
pub const MAX_COLLECTION_CAPACITY: usize = 1 << 20;

/// Configuration for hydration passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationConfig {
    /// Emit a trace event for every materialized row
    pub trace_rows: bool,
    /// Initial capacity of collections created by a pass
    pub collection_capacity: usize,
    /// Release a pass's loading holds when it is dropped un-flushed.
    /// Without this the holds stay and loading remains off.
    pub restore_loading_on_drop: bool,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            trace_rows: false,
            collection_capacity: 16,
            restore_loading_on_drop: true,
        }
    }
}

impl HydrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_rows(mut self, trace_rows: bool) -> Self {
        self.trace_rows = trace_rows;
        self
    }

    pub fn with_collection_capacity(mut self, capacity: usize) -> Self {
        self.collection_capacity = capacity;
        self
    }

    pub fn with_restore_loading_on_drop(mut self, restore: bool) -> Self {
        self.restore_loading_on_drop = restore;
        self
    }

    /// Load configuration from `ELIF_HYDRATION_*` environment variables
    pub fn from_env() -> HydrationResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = env::var("ELIF_HYDRATION_TRACE_ROWS") {
            config.trace_rows = parse_bool("ELIF_HYDRATION_TRACE_ROWS", &value)?;
        }

        if let Ok(value) = env::var("ELIF_HYDRATION_COLLECTION_CAPACITY") {
            config.collection_capacity = value.trim().parse().map_err(|_| {
                HydrationError::Configuration(format!(
                    "ELIF_HYDRATION_COLLECTION_CAPACITY must be a non-negative integer, got '{}'",
                    value
                ))
            })?;
        }

        if let Ok(value) = env::var("ELIF_HYDRATION_RESTORE_ON_DROP") {
            config.restore_loading_on_drop = parse_bool("ELIF_HYDRATION_RESTORE_ON_DROP", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HydrationResult<()> {
        if self.collection_capacity > MAX_COLLECTION_CAPACITY {
            return Err(HydrationError::Configuration(format!(
                "collection_capacity {} exceeds maximum of {}",
                self.collection_capacity, MAX_COLLECTION_CAPACITY
            )));
        }

        Ok(())
    }
}

fn parse_bool(var: &str, value: &str) -> HydrationResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HydrationError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            var, value
        ))),
    }
}

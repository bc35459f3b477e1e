//! Per-engine knowledge learned while executing a batch

pub mod registry;
pub mod schema_tracker;

pub use registry::IdentifierRegistry;
pub use schema_tracker::{extract_table_name, SchemaTracker};

//! Tool surface: catalog metadata and parameter validation.
//!
//! The catalog advertises the four ledger tools and their input schemas;
//! `params` turns untyped arguments into the typed requests the gateway runs.

pub mod catalog;
pub mod params;

pub use catalog::{EntityInput, ListInput, ToolCatalog, ToolEntry, ToolFamily, ToolName};
pub use params::{
    parse_arguments, validate, validate_entity, validate_list, EntityQuery, ListQuery,
    ToolParameters, ValidatedRequest, ValidationError, Violation, DEFAULT_LIMIT, DEFAULT_OFFSET,
    MAX_LIMIT,
};

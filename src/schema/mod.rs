//! Field type system
//!
//! This module defines how each field of a record is indexed:
//! - Field value types and indexing modes
//! - Immutable per-field configs with defaults fallback
//! - The concurrent registry resolving field names to configs

mod field_config;
mod field_type;
mod registry;

pub use field_config::{FieldConfig, FieldConfigBuilder, FieldDefaults};
pub use field_type::{FieldType, IndexMode, StoreMode, TermVectorMode, UnknownVariant};
pub use registry::{parse_field_configs, TypeRegistry};

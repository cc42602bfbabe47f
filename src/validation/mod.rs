//! Validation of built documents and descriptor files
//!
//! - [`consistency`] runs the staged checks on SBML documents and collects
//!   them in a [`Report`]
//! - [`schema`] checks descriptor JSON against the descriptor schema

pub mod consistency;
pub mod identifiers;
pub mod practice;
pub mod schema;
pub mod structural;
pub mod units;

pub use consistency::{
    check_consistency, Category, Report, Severity, ValidationOptions, ValidationOptionsBuilder,
    ValidationResult,
};
pub use schema::{validate_descriptor_json, SchemaReport, SchemaViolation};

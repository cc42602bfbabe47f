//! JSON schema of model descriptors.
//!
//! Descriptor files are checked against the schema derived from
//! [`ModelDescriptor`] before they are deserialized, so that users get every
//! violation with its JSON path instead of the first serde error.

use std::fmt;

use colored::Colorize;
use jsonschema::validator_for;
use schemars::schema_for;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::ModelDescriptor;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to compile descriptor schema: {0}")]
    Compile(String),
}

/// Result of checking a descriptor against the schema.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub errors: Vec<SchemaViolation>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SchemaViolation {
    /// JSON path of the offending value
    pub location: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = if self.location.is_empty() {
            "/"
        } else {
            self.location.as_str()
        };
        write!(f, "{}\n\t└── {}", location.bold(), self.message.bold().red())
    }
}

/// The JSON schema of a complete model descriptor.
pub fn descriptor_schema() -> Result<Value, SchemaError> {
    Ok(serde_json::to_value(schema_for!(ModelDescriptor))?)
}

/// Checks a descriptor given as JSON text.
///
/// # Arguments
///
/// * `content` - JSON object of a complete model descriptor
///
/// # Returns
///
/// A report listing every schema violation.
pub fn validate_descriptor_json(content: &str) -> Result<SchemaReport, SchemaError> {
    let json: Value = serde_json::from_str(content)?;
    validate_descriptor_value(&json)
}

pub fn validate_descriptor_value(json: &Value) -> Result<SchemaReport, SchemaError> {
    let schema = descriptor_schema()?;
    let validator = validator_for(&schema).map_err(|e| SchemaError::Compile(e.to_string()))?;

    let errors: Vec<SchemaViolation> = validator
        .iter_errors(json)
        .map(|error| SchemaViolation {
            location: error.instance_path.to_string(),
            message: error.to_string().replace('"', "'"),
        })
        .collect();

    Ok(SchemaReport {
        valid: errors.is_empty(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_descriptor() {
        let report = validate_descriptor_json(
            r#"{
                "mid": "minimal",
                "compartments": [{"sid": "c", "value": 2.0, "unit": "litre"}],
                "species": [{"sid": "A1", "compartment": "c", "initial_amount": 1.0,
                             "has_only_substance_units": true}]
            }"#,
        )
        .unwrap();
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_violations_carry_location() {
        let report = validate_descriptor_json(
            r#"{"mid": "broken", "compartments": [{"sid": "c", "constant": "yes"}]}"#,
        )
        .unwrap();
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.location.starts_with("/compartments/0")));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            validate_descriptor_json("{mid"),
            Err(SchemaError::Json(_))
        ));
    }
}

//! XPP ingestion interface
//!
//! XPP `.ode` files are converted into model descriptors by an external
//! ingester. This module only defines the seam: an ingester receives the
//! file content and returns a descriptor built through the public
//! descriptor API, which then goes through the regular build pipeline.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::descriptor::ModelDescriptor;

#[derive(Debug, Error)]
pub enum XppError {
    #[error("Failed to read XPP file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Unsupported XPP construct '{0}'")]
    Unsupported(String),
}

/// Converts XPP ODE sources into model descriptors.
pub trait XppIngester {
    /// Converts the content of an `.ode` file.
    ///
    /// # Arguments
    ///
    /// * `model_id` - Id of the resulting model
    /// * `source` - Content of the `.ode` file
    fn ingest(&self, model_id: &str, source: &str) -> Result<ModelDescriptor, XppError>;

    /// Reads and converts an `.ode` file; the file stem is the model id.
    fn ingest_file(&self, path: &Path) -> Result<ModelDescriptor, XppError> {
        let source = fs::read_to_string(path)?;
        let model_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("xpp_model")
            .replace(|c: char| !c.is_ascii_alphanumeric() && c != '_', "_");
        log::debug!("Ingesting XPP file {}", path.display());
        self.ingest(&model_id, &source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::descriptor::{ModelDescriptorBuilder, Parameter, Rule};
    use std::io::Write;

    /// Understands `par name=value` and `name'=rhs` lines only.
    struct MinimalIngester;

    impl XppIngester for MinimalIngester {
        fn ingest(&self, model_id: &str, source: &str) -> Result<ModelDescriptor, XppError> {
            let mut builder = ModelDescriptorBuilder::default();
            builder.mid(model_id);
            for (index, line) in source.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') || line == "done" {
                    continue;
                }
                if let Some(assignment) = line.strip_prefix("par ") {
                    let (name, value) = assignment.split_once('=').ok_or(XppError::Syntax {
                        line: index + 1,
                        message: "expected name=value".to_string(),
                    })?;
                    let value: f64 = value.trim().parse().map_err(|_| XppError::Syntax {
                        line: index + 1,
                        message: format!("invalid value '{value}'"),
                    })?;
                    builder.to_parameters(Parameter::new(name.trim(), value, None));
                } else if let Some((name, rhs)) = line.split_once("'=") {
                    builder.to_rate_rules(Rule::rate(name.trim(), rhs.trim()));
                } else {
                    return Err(XppError::Unsupported(line.to_string()));
                }
            }
            builder.build().map_err(|e| XppError::Syntax {
                line: 0,
                message: e.to_string(),
            })
        }
    }

    #[test]
    fn test_ingested_descriptor_builds() {
        let mut file = tempfile::Builder::new()
            .prefix("decay")
            .suffix(".ode")
            .tempfile()
            .unwrap();
        writeln!(file, "# decay\npar k=0.5\nx'=-k*x\ndone").unwrap();

        let descriptor = MinimalIngester.ingest_file(file.path()).unwrap();
        assert_eq!(descriptor.parameters.len(), 1);

        let model = build(&descriptor).unwrap().document.model.unwrap();
        assert!(model.parameter("x").is_some_and(|x| !x.constant));
    }

    #[test]
    fn test_unsupported_construct() {
        let result = MinimalIngester.ingest("m", "aux y=x");
        assert!(matches!(result, Err(XppError::Unsupported(_))));
    }
}

//! Hierarchical model composition.
//!
//! Submodels are instantiated into a single flat model by
//! [`flatten_document`]. Every submodel element is namespaced with the
//! submodel id and a double underscore (`sub__S1`), deletions remove
//! elements before merging and replacements redirect references to the
//! replacing element.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sbml::SBMLError;

pub mod flatten;
pub mod namespace;

pub use flatten::{flatten_document, flatten_file};

/// Separator between the submodel id and the original id.
pub const NAMESPACE_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct FlattenOptions {
    /// Directory external model sources are resolved against, defaults to
    /// the working directory
    #[builder(setter(into, strip_option))]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("Document contains no model")]
    NoModel,

    #[error("Submodel '{submodel}' references unknown model '{model_ref}'")]
    MissingModel { submodel: String, model_ref: String },

    #[error("External model '{location}' could not be loaded: {reason}")]
    ExternalModel { location: String, reason: String },

    #[error("Cyclic model reference: {}", .0.join(" -> "))]
    ModelCycle(Vec<String>),

    #[error("Unknown submodel '{0}'")]
    MissingSubmodel(String),

    #[error("Submodel '{submodel}' has no element for {target}")]
    UnresolvedTarget { submodel: String, target: String },

    #[error("Cyclic conversion factors: {}", .0.join(" -> "))]
    ConversionCycle(Vec<String>),

    #[error(transparent)]
    Sbml(#[from] SBMLError),
}

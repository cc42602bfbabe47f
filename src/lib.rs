//! SBML model creator
//!
//! This library builds SBML Level 3 documents from typed model descriptors:
//! - Merging descriptor modules into one model description
//! - Normalizing entities and building the SBML object graph
//! - Parsing reaction equations and infix formulas
//! - Flattening hierarchical (comp) models into a single model
//! - Validating documents for structure, units and modeling practice
//! - Generating interpolation models from tabular data
//!
//! ```no_run
//! use sbmlutils::prelude::*;
//!
//! let descriptor = sbmlutils::models::mass_action();
//! let result = build(&descriptor).unwrap();
//! let xml = write_sbml(&result.document).unwrap();
//! ```

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::builder::*;
    pub use crate::comp::{flatten_document, flatten_file, FlattenOptions};
    pub use crate::descriptor::*;
    pub use crate::error::*;
    pub use crate::io::*;
    pub use crate::preprocess::{merge_modules, DescriptorModule};
    pub use crate::sbml::{read_sbml, read_sbml_file, write_sbml, write_sbml_file, SbmlDocument};
    pub use crate::validation::{check_consistency, Report, ValidationOptions};
}

/// Typed entity records and the model descriptor
pub mod descriptor;

/// Descriptor modules and their merging
pub mod preprocess;

/// Normalization of descriptor records into SBML objects
pub mod factory;

/// Reaction equation parsing and formatting
pub mod equation;

/// Infix formulas, their AST and MathML
pub mod math;

/// Unit kinds, unit strings and derived units
pub mod units;

/// Qualifiers, MIRIAM resources, SBO terms and external annotations
pub mod annotation;

/// SBML object graph, reader and writer
pub mod sbml;

/// Document builder
pub mod builder;

/// Hierarchical model composition
pub mod comp;

/// Validation of documents and descriptor files
pub mod validation;

/// Interpolation models from tabular data
pub mod interpolation;

/// Rendering of built documents
pub mod report;

/// XPP ingestion interface
pub mod xpp;

/// Curated example models
pub mod models;

/// IO functionality
pub mod io;

/// Errors and warnings
pub mod error;

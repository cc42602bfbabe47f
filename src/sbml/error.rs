use thiserror::Error;

use crate::math::MathError;
use crate::sbml::Package;
use crate::units::UnitError;

/// Errors that can occur while reading or serializing SBML documents
#[derive(Debug, Error)]
pub enum SBMLError {
    /// Error when reading an SBML file fails
    #[error("Failed to read SBML file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error raised by the XML reader or writer
    #[error("Malformed XML: {0}")]
    XmlError(String),

    /// Error when the root element is not `<sbml>`
    #[error("Not an SBML document: root element is <{0}>")]
    NotSbml(String),

    /// Error when the SBML document doesn't contain a model
    #[error("SBML document contains no model")]
    MissingModel,

    /// Error when a required attribute is absent
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// Error when an attribute cannot be parsed
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    /// Error when an invalid SBOTerm is encountered
    #[error("Invalid SBOTerm: {0}")]
    InvalidSBOTerm(String),

    /// Error when a unit definition contains an unknown kind
    #[error(transparent)]
    UnitError(#[from] UnitError),

    /// Error when the document uses a package it does not enable
    #[error("The document uses the '{0}' package without enabling it")]
    UndeclaredPackage(Package),

    /// Error when embedded MathML cannot be converted
    #[error(transparent)]
    MathError(#[from] MathError),
}

//! Errors and warnings of the model creator
//!
//! Factory and builder errors are [`BuildError`]s. They abort a build and
//! are surfaced as a single [`BuildFailure`] together with the warnings
//! collected up to that point. A failed flattening also hands back the
//! hierarchical document.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::comp::CompositionError;
use crate::equation::EquationError;
use crate::math::MathError;
use crate::sbml::{Package, SBMLError, SbmlDocument};
use crate::units::UnitError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid {kind} id '{sid}': ids start with a letter or '_' followed by letters, digits or '_'")]
    InvalidId { kind: String, sid: String },

    #[error("'{sid}' is missing the required field '{field}'")]
    MissingField { sid: String, field: String },

    #[error("Species '{sid}': {reason}")]
    SpeciesModeConflict { sid: String, reason: String },

    #[error("'{sid}' references the undeclared {kind} '{reference}'")]
    UnresolvedReference {
        sid: String,
        kind: String,
        reference: String,
    },

    #[error("Reaction '{sid}': {source}")]
    InvalidEquation {
        sid: String,
        #[source]
        source: EquationError,
    },

    #[error("'{sid}': cannot parse formula '{formula}': {source}")]
    MathParseError {
        sid: String,
        formula: String,
        #[source]
        source: MathError,
    },

    #[error("'{sid}': {message}")]
    UnitMismatch { sid: String, message: String },

    #[error("'{sid}': invalid unit: {source}")]
    InvalidUnit {
        sid: String,
        #[source]
        source: UnitError,
    },

    #[error(transparent)]
    CompositionError(#[from] CompositionError),

    #[error("'{sid}': {source}")]
    AnnotationError {
        sid: String,
        #[source]
        source: AnnotationError,
    },

    #[error("Duplicate {namespace} '{sid}'")]
    DuplicateId { sid: String, namespace: String },

    #[error("'{sid}' requires the '{package}' package, which the model does not enable")]
    PackageNotEnabled { sid: String, package: Package },

    #[error("'{sid}': notes are not well-formed XHTML: {reason}")]
    InvalidNotes { sid: String, reason: String },

    #[error("Cyclic dependency between assignments: {}", .cycle.join(" -> "))]
    RuleCycle { cycle: Vec<String> },

    #[error("Recursive function definitions: {}", .cycle.join(" -> "))]
    FunctionCycle { cycle: Vec<String> },

    #[error("'{variable}' is the variable of more than one assignment or rate rule")]
    MultipleRules { variable: String },

    #[error("Reaction '{sid}': invalid gene association '{association}': {reason}")]
    InvalidGeneAssociation {
        sid: String,
        association: String,
        reason: String,
    },

    #[error("'{sid}': {reason}")]
    InvalidValue { sid: String, reason: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error(transparent)]
    Sbml(#[from] SBMLError),
}

impl BuildError {
    pub(crate) fn math(sid: &str, formula: &str, source: MathError) -> Self {
        BuildError::MathParseError {
            sid: sid.to_string(),
            formula: formula.to_string(),
            source,
        }
    }

    pub(crate) fn unresolved(sid: &str, kind: &str, reference: &str) -> Self {
        BuildError::UnresolvedReference {
            sid: sid.to_string(),
            kind: kind.to_string(),
            reference: reference.to_string(),
        }
    }

    pub(crate) fn invalid(sid: &str, reason: impl Into<String>) -> Self {
        BuildError::InvalidValue {
            sid: sid.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnknownKey,
    MissingKey,
    Annotation,
    AutoParameter,
    AutoMetaId,
    AutoGeneProduct,
    UnitMismatch,
    Unsupported,
}

/// A non-fatal condition found while preprocessing or building.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildWarning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub message: String,
}

impl BuildWarning {
    pub fn new(kind: WarningKind, sid: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            sid: sid.map(str::to_string),
            message: message.into(),
        }
    }

    /// Creates the warning and logs it.
    pub(crate) fn log(kind: WarningKind, sid: Option<&str>, message: impl Into<String>) -> Self {
        let warning = Self::new(kind, sid, message);
        log::warn!("{warning}");
        warning
    }
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sid {
            Some(sid) => write!(f, "[{sid}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// The first fatal error of a build plus the warnings collected before it.
#[derive(Debug, Error)]
#[error("Build failed: {cause}")]
pub struct BuildFailure {
    #[source]
    pub cause: BuildError,
    pub warnings: Vec<BuildWarning>,
    /// The unflattened document when flattening failed
    pub document: Option<SbmlDocument>,
}

impl BuildFailure {
    pub fn new(cause: BuildError, warnings: Vec<BuildWarning>) -> Self {
        Self {
            cause,
            warnings,
            document: None,
        }
    }

    /// Keeps the built document available for inspection.
    pub fn with_document(mut self, document: SbmlDocument) -> Self {
        self.document = Some(document);
        self
    }
}

impl From<BuildError> for BuildFailure {
    fn from(cause: BuildError) -> Self {
        Self::new(cause, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_cycle_message() {
        let error = BuildError::RuleCycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            error.to_string(),
            "Cyclic dependency between assignments: a -> b -> a"
        );
    }

    #[test]
    fn test_failure_keeps_warnings() {
        let failure = BuildFailure::new(
            BuildError::MissingField {
                sid: "A1".into(),
                field: "compartment".into(),
            },
            vec![BuildWarning::new(WarningKind::UnknownKey, None, "unknown key 'foo'")],
        );
        assert!(failure.to_string().contains("compartment"));
        assert_eq!(failure.warnings.len(), 1);
    }
}

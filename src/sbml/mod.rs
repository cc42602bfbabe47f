//! SBML object graph and its XML serialization
//!
//! The [`model`] module holds an owned, mutable object graph of an SBML
//! Level 3 document. It is produced by the document builder or by the
//! [`reader`], mutated by the flattener, inspected by the validator and
//! serialized by the [`writer`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

pub mod error;
pub mod model;
pub mod reader;
pub mod writer;
pub mod xml;

pub use error::SBMLError;
pub use model::*;
pub use reader::{read_sbml, read_sbml_file};
pub use writer::{write_sbml, write_sbml_file};

lazy_static! {
    static ref SID_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex");
    static ref METAID_PATTERN: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid regex");
    static ref SBO_PATTERN: Regex = Regex::new(r"^(?:SBO[:_])?(\d{1,7})$").expect("valid regex");
}

/// Whether `sid` follows the SBML SId grammar.
pub fn is_valid_sid(sid: &str) -> bool {
    SID_PATTERN.is_match(sid)
}

/// Whether `metaid` is a valid XML ID (restricted to ASCII names).
pub fn is_valid_metaid(metaid: &str) -> bool {
    METAID_PATTERN.is_match(metaid)
}

/// Normalizes SBO terms to `SBO:0000xxx`. Accepts `SBO:0000290`,
/// `SBO_0000290`, `0000290` and `290`.
pub fn normalize_sbo(term: &str) -> Result<String, SBMLError> {
    let captures = SBO_PATTERN
        .captures(term.trim())
        .ok_or_else(|| SBMLError::InvalidSBOTerm(term.to_string()))?;
    let number: u32 = captures[1]
        .parse()
        .map_err(|_| SBMLError::InvalidSBOTerm(term.to_string()))?;
    Ok(format!("SBO:{number:07}"))
}

pub const SBML_L3V1_NS: &str = "http://www.sbml.org/sbml/level3/version1/core";
pub const SBML_L3V2_NS: &str = "http://www.sbml.org/sbml/level3/version2/core";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// SBML Level 3 packages supported by the builder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Package {
    Comp,
    Fbc,
    Distrib,
    Layout,
}

impl Package {
    pub const ALL: [Package; 4] = [Package::Comp, Package::Fbc, Package::Distrib, Package::Layout];

    pub fn prefix(&self) -> &'static str {
        match self {
            Package::Comp => "comp",
            Package::Fbc => "fbc",
            Package::Distrib => "distrib",
            Package::Layout => "layout",
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            Package::Comp => "http://www.sbml.org/sbml/level3/version1/comp/version1",
            Package::Fbc => "http://www.sbml.org/sbml/level3/version1/fbc/version2",
            Package::Distrib => "http://www.sbml.org/sbml/level3/version1/distrib/version1",
            Package::Layout => "http://www.sbml.org/sbml/level3/version1/layout/version1",
        }
    }

    /// Value of the `required` attribute on the `<sbml>` element.
    pub fn required(&self) -> bool {
        matches!(self, Package::Comp | Package::Distrib)
    }

    pub fn from_namespace(ns: &str) -> Option<Package> {
        Package::ALL.into_iter().find(|p| p.namespace() == ns)
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_grammar() {
        assert!(is_valid_sid("A1"));
        assert!(is_valid_sid("_x"));
        assert!(is_valid_sid("sub__S"));
        assert!(!is_valid_sid("1A"));
        assert!(!is_valid_sid("a-b"));
        assert!(!is_valid_sid(""));
    }

    #[test]
    fn test_normalize_sbo() {
        assert_eq!(normalize_sbo("SBO:0000290").unwrap(), "SBO:0000290");
        assert_eq!(normalize_sbo("SBO_0000599").unwrap(), "SBO:0000599");
        assert_eq!(normalize_sbo("627").unwrap(), "SBO:0000627");
        assert!(normalize_sbo("SBO:abc").is_err());
    }

    #[test]
    fn test_package_namespaces() {
        for package in Package::ALL {
            assert_eq!(Package::from_namespace(package.namespace()), Some(package));
        }
    }
}

//! MIRIAM annotations
//!
//! Annotations are `(qualifier, resource)` pairs attached to model elements
//! as RDF controlled-vocabulary terms. Resources are either identifiers.org
//! URLs, `collection/term` shorthands (expanded to
//! `https://identifiers.org/collection/term`) or arbitrary URLs. Terms of
//! known collections are checked against the registry in [`miriam`].

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sbml::SBase;

pub mod loader;
pub mod miriam;

pub use loader::{annotate_model, read_annotations, AnnotationType, ExternalAnnotation, SbmlType};

pub const IDENTIFIERS_ORG_PREFIX: &str = "https://identifiers.org";
pub const BQBIOL_NS: &str = "http://biomodels.net/biology-qualifiers/";
pub const BQMODEL_NS: &str = "http://biomodels.net/model-qualifiers/";

lazy_static! {
    static ref IDENTIFIERS_ORG_PATTERN: Regex =
        Regex::new(r"^https?://identifiers\.org/(.+?)/(.+)$").expect("valid regex");
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("Qualifier '{0}' is not a BQB_* or BQM_* qualifier")]
    UnknownQualifier(String),

    #[error("Resource '{0}' is neither 'collection/term' nor a URL")]
    MalformedResource(String),

    #[error("MIRIAM collection '{collection}' in '{resource}' does not exist")]
    UnknownCollection { collection: String, resource: String },

    #[error("Term '{term}' does not match pattern '{pattern}' of collection '{collection}'")]
    PatternMismatch {
        collection: String,
        term: String,
        pattern: String,
    },

    #[error("Unsupported sbml_type '{0}'")]
    InvalidSbmlType(String),

    #[error("Unsupported annotation_type '{0}'")]
    InvalidAnnotationType(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Missing column '{0}' in annotation file")]
    MissingColumn(String),

    #[error("{annotation_type} annotations can only be set on species, not '{sid}'")]
    NotASpecies { annotation_type: String, sid: String },

    #[error("Invalid charge '{0}', expected an integer")]
    InvalidCharge(String),

    #[error("{annotation_type} annotation of '{sid}' requires the fbc package")]
    FbcNotEnabled { annotation_type: String, sid: String },

    #[error("Failed to read annotation file: {0}")]
    Read(String),
}

/// MIRIAM biological (`BQB_*`) and model (`BQM_*`) qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[allow(non_camel_case_types)]
pub enum Qualifier {
    BQB_IS,
    BQB_HAS_PART,
    BQB_IS_PART_OF,
    BQB_IS_VERSION_OF,
    BQB_HAS_VERSION,
    BQB_IS_HOMOLOG_TO,
    BQB_IS_DESCRIBED_BY,
    BQB_IS_ENCODED_BY,
    BQB_ENCODES,
    BQB_OCCURS_IN,
    BQB_HAS_PROPERTY,
    BQB_IS_PROPERTY_OF,
    BQB_HAS_TAXON,
    BQM_IS,
    BQM_IS_DESCRIBED_BY,
    BQM_IS_DERIVED_FROM,
    BQM_IS_INSTANCE_OF,
    BQM_HAS_INSTANCE,
}

/// (qualifier, name, RDF element)
const QUALIFIERS: &[(Qualifier, &str, &str)] = &[
    (Qualifier::BQB_IS, "BQB_IS", "bqbiol:is"),
    (Qualifier::BQB_HAS_PART, "BQB_HAS_PART", "bqbiol:hasPart"),
    (Qualifier::BQB_IS_PART_OF, "BQB_IS_PART_OF", "bqbiol:isPartOf"),
    (Qualifier::BQB_IS_VERSION_OF, "BQB_IS_VERSION_OF", "bqbiol:isVersionOf"),
    (Qualifier::BQB_HAS_VERSION, "BQB_HAS_VERSION", "bqbiol:hasVersion"),
    (Qualifier::BQB_IS_HOMOLOG_TO, "BQB_IS_HOMOLOG_TO", "bqbiol:isHomologTo"),
    (Qualifier::BQB_IS_DESCRIBED_BY, "BQB_IS_DESCRIBED_BY", "bqbiol:isDescribedBy"),
    (Qualifier::BQB_IS_ENCODED_BY, "BQB_IS_ENCODED_BY", "bqbiol:isEncodedBy"),
    (Qualifier::BQB_ENCODES, "BQB_ENCODES", "bqbiol:encodes"),
    (Qualifier::BQB_OCCURS_IN, "BQB_OCCURS_IN", "bqbiol:occursIn"),
    (Qualifier::BQB_HAS_PROPERTY, "BQB_HAS_PROPERTY", "bqbiol:hasProperty"),
    (Qualifier::BQB_IS_PROPERTY_OF, "BQB_IS_PROPERTY_OF", "bqbiol:isPropertyOf"),
    (Qualifier::BQB_HAS_TAXON, "BQB_HAS_TAXON", "bqbiol:hasTaxon"),
    (Qualifier::BQM_IS, "BQM_IS", "bqmodel:is"),
    (Qualifier::BQM_IS_DESCRIBED_BY, "BQM_IS_DESCRIBED_BY", "bqmodel:isDescribedBy"),
    (Qualifier::BQM_IS_DERIVED_FROM, "BQM_IS_DERIVED_FROM", "bqmodel:isDerivedFrom"),
    (Qualifier::BQM_IS_INSTANCE_OF, "BQM_IS_INSTANCE_OF", "bqmodel:isInstanceOf"),
    (Qualifier::BQM_HAS_INSTANCE, "BQM_HAS_INSTANCE", "bqmodel:hasInstance"),
];

impl Qualifier {
    pub fn name(&self) -> &'static str {
        QUALIFIERS
            .iter()
            .find(|(q, _, _)| q == self)
            .map(|(_, name, _)| *name)
            .unwrap_or_default()
    }

    /// Qualified RDF element name, e.g. `bqbiol:isPartOf`.
    pub fn rdf_element(&self) -> &'static str {
        QUALIFIERS
            .iter()
            .find(|(q, _, _)| q == self)
            .map(|(_, _, element)| *element)
            .unwrap_or_default()
    }

    /// Resolves an RDF element name, with or without prefix.
    pub fn from_rdf_element(element: &str) -> Option<Qualifier> {
        QUALIFIERS
            .iter()
            .find(|(_, _, e)| *e == element)
            .map(|(q, _, _)| *q)
    }

    pub fn is_biological(&self) -> bool {
        self.name().starts_with("BQB_")
    }
}

impl FromStr for Qualifier {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        QUALIFIERS
            .iter()
            .find(|(_, name, _)| *name == upper)
            .map(|(q, _, _)| *q)
            .ok_or_else(|| AnnotationError::UnknownQualifier(s.to_string()))
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A controlled-vocabulary term: one qualifier with its resources.
#[derive(Debug, Clone, PartialEq)]
pub struct CvTerm {
    pub qualifier: Qualifier,
    pub resources: Vec<String>,
}

/// A parsed `(qualifier, resource)` annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub qualifier: Qualifier,
    pub collection: Option<String>,
    pub term: String,
}

impl Annotation {
    /// Parses a resource given as URL or `collection/term`.
    pub fn new(qualifier: Qualifier, resource: &str) -> Result<Self, AnnotationError> {
        let resource = resource.trim();
        if resource.is_empty() {
            return Err(AnnotationError::MalformedResource(resource.to_string()));
        }

        if resource.starts_with("http") {
            return Ok(match IDENTIFIERS_ORG_PATTERN.captures(resource) {
                Some(captures) => Self {
                    qualifier,
                    collection: Some(captures[1].to_string()),
                    term: captures[2].to_string(),
                },
                None => {
                    log::debug!("{resource} is not an identifiers.org URL");
                    Self {
                        qualifier,
                        collection: None,
                        term: resource.to_string(),
                    }
                }
            });
        }

        match resource.split_once('/') {
            Some((collection, term)) if !collection.is_empty() && !term.is_empty() => Ok(Self {
                qualifier,
                collection: Some(collection.to_string()),
                term: term.to_string(),
            }),
            _ => Err(AnnotationError::MalformedResource(resource.to_string())),
        }
    }

    /// Resource URI written into the RDF.
    pub fn resource(&self) -> String {
        match &self.collection {
            Some(collection) => format!("{IDENTIFIERS_ORG_PREFIX}/{collection}/{}", self.term),
            None => self.term.clone(),
        }
    }

    /// Checks the term against the MIRIAM registry.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        match &self.collection {
            Some(collection) => miriam::check_term(collection, &self.term),
            None => Ok(()),
        }
    }

    /// SBO term carried by `sbo/SBO:xxxxxxx` resources.
    pub fn sbo_term(&self) -> Option<&str> {
        match self.collection.as_deref() {
            Some("sbo") => Some(self.term.as_str()),
            _ => None,
        }
    }
}

/// Adds a CV term for the annotation unless the same pair already exists.
/// Returns whether a term was added.
pub fn add_cv_term(sbase: &mut SBase, annotation: &Annotation) -> bool {
    let resource = annotation.resource();
    let exists = sbase
        .cv_terms
        .iter()
        .any(|cv| cv.qualifier == annotation.qualifier && cv.resources.contains(&resource));
    if exists {
        return false;
    }
    sbase.cv_terms.push(CvTerm {
        qualifier: annotation.qualifier,
        resources: vec![resource],
    });
    true
}

/// Generates `meta_{sid}` (or `meta_{fallback}`) when the element has no
/// meta id yet.
pub fn ensure_metaid(sbase: &mut SBase, fallback: &str) {
    if sbase.metaid.is_some() {
        return;
    }
    let base = sbase.id.as_deref().unwrap_or(fallback);
    let metaid = format!("meta_{base}");
    log::debug!("Generated meta id '{metaid}'");
    sbase.metaid = Some(metaid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collection_term_resource() {
        let annotation = Annotation::new(Qualifier::BQB_IS, "chebi/CHEBI:28061").unwrap();
        assert_eq!(annotation.collection.as_deref(), Some("chebi"));
        assert_eq!(
            annotation.resource(),
            "https://identifiers.org/chebi/CHEBI:28061"
        );
        assert!(annotation.validate().is_ok());
    }

    #[test]
    fn test_identifiers_url_and_plain_url() {
        let annotation =
            Annotation::new(Qualifier::BQB_IS, "http://identifiers.org/taxonomy/9606").unwrap();
        assert_eq!(annotation.collection.as_deref(), Some("taxonomy"));
        assert_eq!(annotation.resource(), "https://identifiers.org/taxonomy/9606");

        let annotation =
            Annotation::new(Qualifier::BQM_IS_DESCRIBED_BY, "https://example.org/x").unwrap();
        assert_eq!(annotation.collection, None);
        assert_eq!(annotation.resource(), "https://example.org/x");
    }

    #[test]
    fn test_malformed_and_mismatch() {
        assert!(matches!(
            Annotation::new(Qualifier::BQB_IS, "CHEBI"),
            Err(AnnotationError::MalformedResource(_))
        ));
        let annotation = Annotation::new(Qualifier::BQB_IS, "chebi/28061").unwrap();
        assert!(matches!(
            annotation.validate(),
            Err(AnnotationError::PatternMismatch { .. })
        ));
        let annotation = Annotation::new(Qualifier::BQB_IS, "nocollection/1").unwrap();
        assert!(matches!(
            annotation.validate(),
            Err(AnnotationError::UnknownCollection { .. })
        ));
    }

    #[test]
    fn test_qualifier_names() {
        assert_eq!("bqb_is_part_of".parse::<Qualifier>(), Ok(Qualifier::BQB_IS_PART_OF));
        assert_eq!(Qualifier::BQB_IS_PART_OF.rdf_element(), "bqbiol:isPartOf");
        assert_eq!(
            Qualifier::from_rdf_element("bqmodel:isDerivedFrom"),
            Some(Qualifier::BQM_IS_DERIVED_FROM)
        );
        assert!("BQX_IS".parse::<Qualifier>().is_err());
    }

    #[test]
    fn test_cv_terms_are_deduplicated() {
        let mut sbase = SBase::with_id("glc");
        let annotation = Annotation::new(Qualifier::BQB_IS, "chebi/CHEBI:4167").unwrap();
        assert!(add_cv_term(&mut sbase, &annotation));
        assert!(!add_cv_term(&mut sbase, &annotation));
        assert_eq!(sbase.cv_terms.len(), 1);

        ensure_metaid(&mut sbase, "unused");
        assert_eq!(sbase.metaid.as_deref(), Some("meta_glc"));
    }
}

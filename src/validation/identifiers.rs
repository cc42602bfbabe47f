//! Identifier consistency: SId and meta id syntax, meta id uniqueness,
//! SBO terms and the qualifiers and resources of CV terms.

use std::collections::HashSet;

use crate::annotation::Annotation;
use crate::sbml::{is_valid_metaid, is_valid_sid, normalize_sbo, ElementKind, Model};
use crate::validation::consistency::{Category, Report, Severity, ValidationResult};
use crate::validation::structural::Duplicate;

pub(crate) fn check_identifiers(model: &Model, report: &mut Report) {
    let mut add = |severity: Severity, sid: &str, message: String| {
        report.add_result(ValidationResult::new(
            severity,
            Category::Identifiers,
            Some(sid),
            message,
        ))
    };

    model.for_each_sbase(&mut |kind, sbase| {
        let sid = sbase.id();
        if let Some(id) = sbase.id.as_deref() {
            if !is_valid_sid(id) {
                add(Severity::Error, sid, format!("Invalid {kind} id '{id}'"));
            }
        }
        if let Some(metaid) = sbase.metaid.as_deref() {
            if !is_valid_metaid(metaid) {
                add(Severity::Error, sid, format!("Invalid meta id '{metaid}'"));
            }
        }
        if let Some(term) = sbase.sbo_term.as_deref() {
            if normalize_sbo(term).ok().as_deref() != Some(term) {
                add(Severity::Error, sid, format!("Invalid SBO term '{term}'"));
            }
        }

        if !sbase.cv_terms.is_empty() && sbase.metaid.is_none() {
            add(
                Severity::Error,
                sid,
                format!("{kind} '{sid}' carries annotations but no meta id"),
            );
        }
        for cv in &sbase.cv_terms {
            if !cv.qualifier.is_biological() && kind != ElementKind::Model {
                add(
                    Severity::Warning,
                    sid,
                    format!("Model qualifier '{}' on {kind} '{sid}'", cv.qualifier),
                );
            }
            for resource in &cv.resources {
                let checked = Annotation::new(cv.qualifier, resource).and_then(|a| a.validate());
                if let Err(e) = checked {
                    add(Severity::Warning, sid, e.to_string());
                }
            }
        }
    });

    for duplicate in duplicate_metaids(model) {
        add(
            Severity::Error,
            &duplicate.sid,
            format!("Duplicate meta id '{}'", duplicate.sid),
        );
    }
}

/// Meta ids used by more than one element.
pub fn duplicate_metaids(model: &Model) -> Vec<Duplicate> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    model.for_each_sbase(&mut |_, sbase| {
        if let Some(metaid) = sbase.metaid.as_deref() {
            if !seen.insert(metaid) {
                duplicates.push(Duplicate {
                    sid: metaid.to_string(),
                    namespace: "meta id".to_string(),
                });
            }
        }
    });
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{CvTerm, Qualifier};
    use crate::sbml::{Parameter, SBase};

    fn parameter(sbase: SBase) -> Parameter {
        Parameter {
            sbase,
            value: None,
            units: None,
            constant: true,
        }
    }

    #[test]
    fn test_invalid_ids_and_duplicate_metaids() {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            ..Default::default()
        };
        let mut first = SBase::with_id("1k");
        first.metaid = Some("meta_k".to_string());
        let mut second = SBase::with_id("k2");
        second.metaid = Some("meta_k".to_string());
        model.parameters = vec![parameter(first), parameter(second)];

        let mut report = Report::new();
        check_identifiers(&model, &mut report);
        assert!(!report.is_valid);
        assert_eq!(report.filter_results("1k").len(), 1);
        assert_eq!(report.filter_results("meta_k").len(), 1);
    }

    #[test]
    fn test_resource_mismatch_is_warning() {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            ..Default::default()
        };
        let mut sbase = SBase::with_id("glc");
        sbase.metaid = Some("meta_glc".to_string());
        sbase.cv_terms.push(CvTerm {
            qualifier: Qualifier::BQB_IS,
            resources: vec!["https://identifiers.org/chebi/glucose".to_string()],
        });
        model.parameters.push(parameter(sbase));

        let mut report = Report::new();
        check_identifiers(&model, &mut report);
        assert!(report.is_valid);
        assert_eq!(report.count(Severity::Warning), 1);
    }
}

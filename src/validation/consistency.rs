//! Consistency checks of SBML documents.
//!
//! The entry point is [`check_consistency`], which runs the enabled stages
//! on a document and collects their findings in a [`Report`]:
//! - structural consistency: reference closure, sid uniqueness, rule cycles
//! - units consistency of every expression
//! - modeling practice heuristics
//! - identifier syntax, meta id uniqueness and annotation resources
//!
//! Checks never modify the document.

use std::collections::BTreeMap;
use std::fmt;

use colored::Colorize;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::sbml::SbmlDocument;
use crate::validation::{identifiers, practice, structural, units};

/// Stages of [`check_consistency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct ValidationOptions {
    pub structural: bool,
    pub units: bool,
    pub practice: bool,
    pub identifiers: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            structural: true,
            units: true,
            practice: true,
            identifiers: true,
        }
    }
}

/// Runs the enabled stages on a document.
///
/// # Arguments
///
/// * `doc` - The document to check, flattened or not
/// * `options` - Stages to run
///
/// # Returns
///
/// Returns a `Report` containing the results of all stages.
pub fn check_consistency(doc: &SbmlDocument, options: &ValidationOptions) -> Report {
    let mut report = Report::new();

    let Some(model) = doc.model.as_ref() else {
        report.add_result(ValidationResult::new(
            Severity::Fatal,
            Category::Structural,
            None,
            "Document contains no model".to_string(),
        ));
        return report;
    };

    if options.structural {
        structural::check_structure(doc, model, &mut report);
    }
    if options.identifiers {
        identifiers::check_identifiers(model, &mut report);
    }
    if options.units {
        units::check_units(model, &mut report);
    }
    if options.practice {
        practice::check_practice(doc, model, &mut report);
    }

    log::debug!("Validation finished: {}", report.summary());
    report
}

/// Results of a validation run.
///
/// The document is valid when no result has `Fatal` or `Error` severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Whether the document is valid overall
    pub is_valid: bool,
    pub results: Vec<ValidationResult>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            results: Vec::new(),
        }
    }

    /// Adds a result; `Fatal` and `Error` results invalidate the report.
    pub fn add_result(&mut self, result: ValidationResult) {
        if matches!(result.severity, Severity::Fatal | Severity::Error) {
            self.is_valid = false;
        }
        self.results.push(result);
    }

    /// Results concerning the element `identifier`.
    pub fn filter_results(&self, identifier: &str) -> Vec<&ValidationResult> {
        self.results
            .iter()
            .filter(|result| result.identifier.as_deref() == Some(identifier))
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.results
            .iter()
            .filter(|result| result.severity == severity)
            .count()
    }

    /// Number of results per severity, including zero counts.
    pub fn counts(&self) -> BTreeMap<Severity, usize> {
        Severity::ALL
            .into_iter()
            .map(|severity| (severity, self.count(severity)))
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|result| matches!(result.severity, Severity::Fatal | Severity::Error))
    }

    pub fn summary(&self) -> String {
        self.counts()
            .into_iter()
            .map(|(severity, count)| format!("{count} {}", severity.to_string().to_lowercase()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "{result}")?;
        }
        let summary = self.summary();
        if self.is_valid {
            write!(f, "{}", summary.bold().green())
        } else {
            write!(f, "{}", summary.bold().red())
        }
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub severity: Severity,
    pub category: Category,
    /// Sid of the offending element, if any
    pub identifier: Option<String>,
    pub message: String,
}

impl ValidationResult {
    pub fn new(
        severity: Severity,
        category: Category,
        identifier: Option<&str>,
        message: String,
    ) -> Self {
        Self {
            severity,
            category,
            identifier: identifier.map(str::to_string),
            message,
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (severity, message) = match self.severity {
            Severity::Fatal => ("Fatal".bold().red(), self.message.bold().red()),
            Severity::Error => ("Error".bold().red(), self.message.bold().red()),
            Severity::Warning => ("Warning".bold().yellow(), self.message.bold().yellow()),
            Severity::Info => ("Info".bold().green(), self.message.bold().green()),
        };
        let location = self.identifier.as_deref().unwrap_or("model");

        write!(
            f,
            "[{}] {} ({}):\n\t└── {}",
            location.bold(),
            severity,
            self.category,
            message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The document cannot be processed further
    Fatal,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Fatal,
        Severity::Error,
        Severity::Warning,
        Severity::Info,
    ];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "Fatal"),
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
            Severity::Info => write!(f, "Info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structural,
    Units,
    ModelingPractice,
    Identifiers,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Structural => write!(f, "structural"),
            Category::Units => write!(f, "units"),
            Category::ModelingPractice => write!(f, "modeling practice"),
            Category::Identifiers => write!(f, "identifiers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_fatal() {
        let report = check_consistency(&SbmlDocument::default(), &ValidationOptions::default());
        assert!(!report.is_valid);
        assert_eq!(report.count(Severity::Fatal), 1);
    }

    #[test]
    fn test_counts_and_filter() {
        let mut report = Report::new();
        report.add_result(ValidationResult::new(
            Severity::Warning,
            Category::ModelingPractice,
            Some("k1"),
            "Parameter 'k1' is not used".to_string(),
        ));
        assert!(report.is_valid);
        report.add_result(ValidationResult::new(
            Severity::Error,
            Category::Units,
            Some("v1"),
            "mismatch".to_string(),
        ));
        assert!(!report.is_valid);
        assert_eq!(report.counts()[&Severity::Warning], 1);
        assert_eq!(report.counts()[&Severity::Info], 0);
        assert_eq!(report.filter_results("k1").len(), 1);
        assert_eq!(report.errors().count(), 1);
    }
}

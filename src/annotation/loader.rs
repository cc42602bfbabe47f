//! External annotation files
//!
//! An annotation file is a table with the columns
//! `pattern, sbml_type, annotation_type, qualifier, resource, name`. Every
//! row selects the elements of one `sbml_type` whose sid matches `pattern`
//! (a regular expression) and applies either an RDF term or, for species,
//! an FBC chemical formula or charge.
//!
//! Supported formats are tab or comma separated text (`.tsv`, `.csv`),
//! Excel worksheets (`.xlsx`) and JSON arrays of records. Lines starting
//! with `#` and empty lines are skipped.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotation::{add_cv_term, ensure_metaid, Annotation, AnnotationError, Qualifier};
use crate::sbml::{normalize_sbo, Model, Package, SBase, SbmlDocument};

const COLUMNS: [&str; 6] = [
    "pattern",
    "sbml_type",
    "annotation_type",
    "qualifier",
    "resource",
    "name",
];

/// Element buckets an annotation row can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SbmlType {
    Document,
    Model,
    Unit,
    Compartment,
    Species,
    Parameter,
    Reaction,
    Transporter,
    Rule,
    Event,
    GeneProduct,
}

impl FromStr for SbmlType {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" => Ok(SbmlType::Document),
            "model" => Ok(SbmlType::Model),
            "unit" => Ok(SbmlType::Unit),
            "compartment" => Ok(SbmlType::Compartment),
            "species" => Ok(SbmlType::Species),
            "parameter" => Ok(SbmlType::Parameter),
            "reaction" => Ok(SbmlType::Reaction),
            "transporter" => Ok(SbmlType::Transporter),
            "rule" => Ok(SbmlType::Rule),
            "event" => Ok(SbmlType::Event),
            "fbc:geneproduct" | "geneproduct" => Ok(SbmlType::GeneProduct),
            other => Err(AnnotationError::InvalidSbmlType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationType {
    Rdf,
    Formula,
    Charge,
}

impl FromStr for AnnotationType {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rdf" => Ok(AnnotationType::Rdf),
            "formula" => Ok(AnnotationType::Formula),
            "charge" => Ok(AnnotationType::Charge),
            other => Err(AnnotationError::InvalidAnnotationType(other.to_string())),
        }
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationType::Rdf => write!(f, "rdf"),
            AnnotationType::Formula => write!(f, "formula"),
            AnnotationType::Charge => write!(f, "charge"),
        }
    }
}

/// One row of an annotation file.
#[derive(Debug, Clone)]
pub struct ExternalAnnotation {
    pub pattern: Regex,
    pub sbml_type: SbmlType,
    pub annotation_type: AnnotationType,
    /// Present for RDF annotations
    pub qualifier: Option<Qualifier>,
    pub resource: String,
    pub name: Option<String>,
}

impl ExternalAnnotation {
    /// Builds an annotation from a record keyed by column name.
    pub fn from_record(record: &HashMap<String, String>) -> Result<Self, AnnotationError> {
        let required = |key: &str| {
            record
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AnnotationError::MissingColumn(key.to_string()))
        };
        let optional = |key: &str| {
            record
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let pattern_str = required("pattern")?;
        // patterns match from the start of the sid
        let pattern = Regex::new(&format!("^(?:{pattern_str})")).map_err(|e| {
            AnnotationError::InvalidPattern {
                pattern: pattern_str.clone(),
                reason: e.to_string(),
            }
        })?;
        let sbml_type: SbmlType = required("sbml_type")?.parse()?;
        let annotation_type: AnnotationType = required("annotation_type")?.parse()?;
        let qualifier = match annotation_type {
            AnnotationType::Rdf => Some(required("qualifier")?.parse::<Qualifier>()?),
            _ => None,
        };

        Ok(Self {
            pattern,
            sbml_type,
            annotation_type,
            qualifier,
            resource: required("resource")?,
            name: optional("name"),
        })
    }
}

/// Reads annotations from a `.tsv`, `.csv`, `.xlsx` or `.json` file.
pub fn read_annotations(path: impl AsRef<Path>) -> Result<Vec<ExternalAnnotation>, AnnotationError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let records = match extension.as_str() {
        "json" => {
            let content =
                std::fs::read_to_string(path).map_err(|e| AnnotationError::Read(e.to_string()))?;
            read_json_records(&content)?
        }
        #[cfg(feature = "tabular")]
        "tsv" | "csv" | "txt" => {
            let content =
                std::fs::read_to_string(path).map_err(|e| AnnotationError::Read(e.to_string()))?;
            read_delimited_records(&content)?
        }
        #[cfg(feature = "tabular")]
        "xlsx" | "xls" | "ods" => read_workbook_records(path)?,
        other => {
            return Err(AnnotationError::Read(format!(
                "unsupported annotation format '{other}' for {}",
                path.display()
            )))
        }
    };

    records.iter().map(ExternalAnnotation::from_record).collect()
}

fn read_json_records(content: &str) -> Result<Vec<HashMap<String, String>>, AnnotationError> {
    let rows: Vec<HashMap<String, serde_json::Value>> =
        serde_json::from_str(content).map_err(|e| AnnotationError::Read(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(key, value)| match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some((key, s)),
                    other => Some((key, other.to_string())),
                })
                .collect()
        })
        .collect())
}

/// Parses delimited text. The separator is a tab unless the header only
/// contains commas.
#[cfg(feature = "tabular")]
pub(crate) fn read_delimited_records(
    content: &str,
) -> Result<Vec<HashMap<String, String>>, AnnotationError> {
    use polars::io::SerReader;
    use polars::prelude::{CsvParseOptions, CsvReadOptions};

    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .collect();
    let Some(header) = lines.first() else {
        return Ok(Vec::new());
    };
    let separator = if !header.contains('\t') && header.contains(',') {
        b','
    } else {
        b'\t'
    };

    let cursor = std::io::Cursor::new(lines.join("\n").into_bytes());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(separator))
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| AnnotationError::Read(e.to_string()))?;

    let mut records = vec![HashMap::new(); df.height()];
    for column in df.get_columns() {
        let key = column.name().trim().to_lowercase();
        if !COLUMNS.contains(&key.as_str()) {
            log::warn!("Ignoring unknown annotation column '{key}'");
            continue;
        }
        let values = column.str().map_err(|e| AnnotationError::Read(e.to_string()))?;
        for (idx, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                records[idx].insert(key.clone(), value.to_string());
            }
        }
    }

    Ok(records
        .into_iter()
        .filter(|record: &HashMap<String, String>| !record.values().all(|v| v.trim().is_empty()))
        .collect())
}

#[cfg(feature = "tabular")]
fn read_workbook_records(path: &Path) -> Result<Vec<HashMap<String, String>>, AnnotationError> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path).map_err(|e| AnnotationError::Read(e.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AnnotationError::Read(format!("no worksheet in {}", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| AnnotationError::Read(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
        .filter(|row| {
            let first = row.first().map(|c| c.trim()).unwrap_or_default();
            !row.iter().all(|c| c.trim().is_empty()) && !first.starts_with('#')
        });

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    Ok(rows
        .map(|row| {
            header
                .iter()
                .cloned()
                .zip(row)
                .filter(|(_, value)| !value.trim().is_empty())
                .collect()
        })
        .collect())
}

/// Applies external annotations to a document.
///
/// Returns the non-fatal problems encountered; each is also logged.
pub fn annotate_model(
    doc: &mut SbmlDocument,
    annotations: &[ExternalAnnotation],
) -> Vec<AnnotationError> {
    let fbc = doc.has_package(Package::Fbc);
    let Some(model) = doc.model.as_mut() else {
        log::warn!("Document has no model to annotate");
        return Vec::new();
    };

    let mut issues = Vec::new();
    for annotation in annotations {
        let ids = matching_ids(model, annotation);
        if ids.is_empty() {
            log::debug!(
                "No {:?} matches annotation pattern '{}'",
                annotation.sbml_type,
                annotation.pattern
            );
        }

        for id in ids {
            if let Err(issue) = apply(model, annotation, &id, fbc) {
                log::warn!("Annotation of '{id}' failed: {issue}");
                issues.push(issue);
            }
        }
    }
    issues
}

fn ids_of<'a, T: 'a>(items: &'a [T], sbase: impl Fn(&'a T) -> &'a SBase) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| sbase(item).id.clone())
        .collect()
}

fn matching_ids(model: &Model, annotation: &ExternalAnnotation) -> Vec<String> {
    let candidates = match annotation.sbml_type {
        SbmlType::Document | SbmlType::Model => model.sbase.id.iter().cloned().collect(),
        SbmlType::Unit => ids_of(&model.unit_definitions, |u| &u.sbase),
        SbmlType::Compartment => ids_of(&model.compartments, |c| &c.sbase),
        SbmlType::Species => ids_of(&model.species, |s| &s.sbase),
        SbmlType::Parameter => ids_of(&model.parameters, |p| &p.sbase),
        SbmlType::Reaction | SbmlType::Transporter => ids_of(&model.reactions, |r| &r.sbase),
        SbmlType::Rule => model.rules.iter().filter_map(|r| r.variable.clone()).collect(),
        SbmlType::Event => ids_of(&model.events, |e| &e.sbase),
        SbmlType::GeneProduct => ids_of(&model.gene_products, |g| &g.sbase),
    };

    candidates
        .into_iter()
        .filter(|id| annotation.pattern.is_match(id))
        .collect()
}

fn target_sbase<'a>(model: &'a mut Model, sbml_type: SbmlType, id: &str) -> Option<&'a mut SBase> {
    fn find<'b, T>(
        items: &'b mut [T],
        id: &str,
        sbase: impl Fn(&mut T) -> &mut SBase,
    ) -> Option<&'b mut SBase> {
        items
            .iter_mut()
            .map(sbase)
            .find(|s| s.id.as_deref() == Some(id))
    }

    match sbml_type {
        SbmlType::Document | SbmlType::Model => Some(&mut model.sbase),
        SbmlType::Unit => find(&mut model.unit_definitions, id, |u| &mut u.sbase),
        SbmlType::Compartment => find(&mut model.compartments, id, |c| &mut c.sbase),
        SbmlType::Species => find(&mut model.species, id, |s| &mut s.sbase),
        SbmlType::Parameter => find(&mut model.parameters, id, |p| &mut p.sbase),
        SbmlType::Reaction | SbmlType::Transporter => {
            find(&mut model.reactions, id, |r| &mut r.sbase)
        }
        SbmlType::Rule => model
            .rules
            .iter_mut()
            .find(|r| r.variable.as_deref() == Some(id))
            .map(|r| &mut r.sbase),
        SbmlType::Event => find(&mut model.events, id, |e| &mut e.sbase),
        SbmlType::GeneProduct => find(&mut model.gene_products, id, |g| &mut g.sbase),
    }
}

fn apply(
    model: &mut Model,
    annotation: &ExternalAnnotation,
    id: &str,
    fbc: bool,
) -> Result<(), AnnotationError> {
    match annotation.annotation_type {
        AnnotationType::Rdf => {
            let qualifier = annotation
                .qualifier
                .ok_or_else(|| AnnotationError::UnknownQualifier(String::new()))?;
            let parsed = Annotation::new(qualifier, &annotation.resource)?;
            let check = parsed.validate();

            let Some(sbase) = target_sbase(model, annotation.sbml_type, id) else {
                return Ok(());
            };
            ensure_metaid(sbase, id);
            add_cv_term(sbase, &parsed);
            if let Some(term) = parsed.sbo_term() {
                if let Ok(term) = normalize_sbo(term) {
                    sbase.sbo_term = Some(term);
                }
            }
            check
        }
        AnnotationType::Formula | AnnotationType::Charge => {
            if annotation.sbml_type != SbmlType::Species {
                return Err(AnnotationError::NotASpecies {
                    annotation_type: annotation.annotation_type.to_string(),
                    sid: id.to_string(),
                });
            }
            if !fbc {
                return Err(AnnotationError::FbcNotEnabled {
                    annotation_type: annotation.annotation_type.to_string(),
                    sid: id.to_string(),
                });
            }
            let Some(species) = model.species.iter_mut().find(|s| s.sbase.id() == id) else {
                return Ok(());
            };
            if annotation.annotation_type == AnnotationType::Formula {
                species.chemical_formula = Some(annotation.resource.clone());
            } else {
                species.charge = Some(parse_charge(&annotation.resource)?);
            }
            Ok(())
        }
    }
}

/// Parses an integral charge; tables may store it as `-1.0`.
fn parse_charge(resource: &str) -> Result<i32, AnnotationError> {
    let invalid = || AnnotationError::InvalidCharge(resource.to_string());
    let trimmed = resource.trim();
    if let Ok(charge) = trimmed.parse::<i32>() {
        return Ok(charge);
    }
    let value = trimmed.parse::<f64>().map_err(|_| invalid())?;
    if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(invalid());
    }
    Ok(value as i32)
}

//! Rendering of built documents
//!
//! Renderers turn a document into a human-readable artifact. They read the
//! model and never mutate it. An HTML renderer lives outside this crate and
//! plugs in through [`ReportRenderer`]; [`SummaryRenderer`] prints entity
//! counts and tables of the model's entities to the terminal.

use std::fs;
use std::path::Path;

use tabled::{builder::Builder, settings::Style};
use thiserror::Error;

use crate::equation::{EquationPart, ReactionEquation, Stoichiometry};
use crate::sbml::{
    Compartment, Model, Parameter, Reaction, Rule, SbmlDocument, Species, SpeciesReference,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Document contains no model")]
    NoModel,

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render report: {0}")]
    Render(String),
}

/// Renders a document into a textual artifact (HTML, plain text, ...).
pub trait ReportRenderer {
    /// File extension of the rendered artifact, without the dot
    fn extension(&self) -> &'static str;

    /// Renders the document.
    ///
    /// # Arguments
    ///
    /// * `doc` - The document to render
    ///
    /// # Returns
    ///
    /// Returns the rendered artifact.
    fn render(&self, doc: &SbmlDocument) -> Result<String, ReportError>;

    /// Renders the document into `dir/{model id}.{extension}` and returns
    /// the written path.
    fn render_to_dir(
        &self,
        doc: &SbmlDocument,
        dir: &Path,
    ) -> Result<std::path::PathBuf, ReportError> {
        let model = doc.model.as_ref().ok_or(ReportError::NoModel)?;
        let path = dir.join(format!("{}.{}", model.sbase.id(), self.extension()));
        fs::write(&path, self.render(doc)?)?;
        log::info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Plain-text summary: entity counts followed by one table per entity kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryRenderer;

impl ReportRenderer for SummaryRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, doc: &SbmlDocument) -> Result<String, ReportError> {
        let model = doc.model.as_ref().ok_or(ReportError::NoModel)?;

        let mut builder = Builder::default();
        builder.push_record(vec![format!(
            "{} (SBML L{}V{})",
            model.sbase.name.as_deref().unwrap_or(model.sbase.id()),
            doc.level,
            doc.version
        )]);
        builder.push_record(vec![counts_table(model)]);

        if !model.compartments.is_empty() {
            builder.push_record(vec!["Compartments".to_string()]);
            builder.push_record(vec![to_table(&model.compartments)]);
        }
        if !model.species.is_empty() {
            builder.push_record(vec!["Species".to_string()]);
            builder.push_record(vec![to_table(&model.species)]);
        }
        if !model.parameters.is_empty() {
            builder.push_record(vec!["Parameters".to_string()]);
            builder.push_record(vec![to_table(&model.parameters)]);
        }
        if !model.rules.is_empty() {
            builder.push_record(vec!["Rules".to_string()]);
            builder.push_record(vec![to_table(&model.rules)]);
        }
        if !model.reactions.is_empty() {
            builder.push_record(vec!["Reactions".to_string()]);
            builder.push_record(vec![to_table(&model.reactions)]);
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        Ok(table.to_string())
    }
}

/// Number of entities per kind, kinds without entities are skipped.
pub fn entity_counts(model: &Model) -> Vec<(&'static str, usize)> {
    [
        ("function definitions", model.function_definitions.len()),
        ("unit definitions", model.unit_definitions.len()),
        ("compartments", model.compartments.len()),
        ("species", model.species.len()),
        ("parameters", model.parameters.len()),
        ("initial assignments", model.initial_assignments.len()),
        ("rules", model.rules.len()),
        ("constraints", model.constraints.len()),
        ("reactions", model.reactions.len()),
        ("events", model.events.len()),
        ("submodels", model.submodels.len()),
        ("ports", model.ports.len()),
        ("objectives", model.objectives.len()),
        ("gene products", model.gene_products.len()),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .collect()
}

fn counts_table(model: &Model) -> String {
    let mut builder = Builder::default();
    builder.push_record(vec!["Entity".to_string(), "Count".to_string()]);
    for (kind, count) in entity_counts(model) {
        builder.push_record(vec![kind.to_string(), count.to_string()]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Row representation of an entity in a summary table.
trait TableRecord {
    fn columns() -> Vec<&'static str>;

    fn to_record(&self) -> Vec<String>;
}

fn to_table<T: TableRecord>(records: &[T]) -> String {
    let mut builder = Builder::default();
    builder.push_record(T::columns());
    for record in records {
        builder.push_record(record.to_record());
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl TableRecord for Compartment {
    fn columns() -> Vec<&'static str> {
        vec!["ID", "Name", "Size", "Units", "Constant"]
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.sbase.id().to_string(),
            optional(self.sbase.name.as_deref()),
            optional(self.size),
            optional(self.units.as_deref()),
            self.constant.to_string(),
        ]
    }
}

impl TableRecord for Species {
    fn columns() -> Vec<&'static str> {
        vec!["ID", "Name", "Compartment", "Initial", "Units", "Boundary", "Constant"]
    }

    fn to_record(&self) -> Vec<String> {
        let initial = match (self.initial_amount, self.initial_concentration) {
            (Some(amount), _) => format!("{amount} (amount)"),
            (None, Some(concentration)) => format!("{concentration} (concentration)"),
            (None, None) => "-".to_string(),
        };
        vec![
            self.sbase.id().to_string(),
            optional(self.sbase.name.as_deref()),
            self.compartment.clone(),
            initial,
            optional(self.substance_units.as_deref()),
            self.boundary_condition.to_string(),
            self.constant.to_string(),
        ]
    }
}

impl TableRecord for Parameter {
    fn columns() -> Vec<&'static str> {
        vec!["ID", "Name", "Value", "Units", "Constant"]
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.sbase.id().to_string(),
            optional(self.sbase.name.as_deref()),
            optional(self.value),
            optional(self.units.as_deref()),
            self.constant.to_string(),
        ]
    }
}

impl TableRecord for Rule {
    fn columns() -> Vec<&'static str> {
        vec!["Type", "Variable", "Math"]
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.kind.element_name().to_string(),
            optional(self.variable.as_deref()),
            self.math.to_string(),
        ]
    }
}

impl TableRecord for Reaction {
    fn columns() -> Vec<&'static str> {
        vec!["ID", "Name", "Equation", "Rate"]
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.sbase.id().to_string(),
            optional(self.sbase.name.as_deref()),
            reaction_equation(self).to_string(),
            optional(self.kinetic_law.as_ref().map(|law| &law.math)),
        ]
    }
}

/// Equation of an emitted reaction. Variable stoichiometries are shown by
/// the id of their species reference.
pub fn reaction_equation(reaction: &Reaction) -> ReactionEquation {
    let parts = |refs: &[SpeciesReference]| {
        refs.iter()
            .map(|sr| {
                let stoichiometry = match (sr.constant, sr.sbase.id.as_deref()) {
                    (false, Some(id)) => Stoichiometry::Symbol(id.to_string()),
                    _ => Stoichiometry::Constant(sr.stoichiometry.unwrap_or(1.0)),
                };
                EquationPart::new(sr.species.clone(), stoichiometry)
            })
            .collect()
    };
    ReactionEquation {
        reactants: parts(&reaction.reactants),
        products: parts(&reaction.products),
        modifiers: reaction.modifiers.iter().map(|m| m.species.clone()).collect(),
        reversible: reaction.reversible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::descriptor::{
        CompartmentBuilder, ModelDescriptorBuilder, ReactionBuilder, SpeciesBuilder,
    };

    fn document() -> SbmlDocument {
        let species = |sid: &str, amount: f64| {
            SpeciesBuilder::default()
                .meta(sid)
                .compartment("c")
                .initial_amount(amount)
                .has_only_substance_units(true)
                .build()
                .unwrap()
        };
        let descriptor = ModelDescriptorBuilder::default()
            .mid("summary")
            .to_compartments(CompartmentBuilder::default().meta("c").value(1.0).build().unwrap())
            .to_species(species("A", 10.0))
            .to_species(species("B", 0.0))
            .to_reactions(
                ReactionBuilder::default()
                    .meta("v1")
                    .equation("A -> 2 B")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        build(&descriptor).unwrap().document
    }

    #[test]
    fn test_summary_lists_entities() {
        let summary = SummaryRenderer.render(&document()).unwrap();
        assert!(summary.contains("SBML L3V1"));
        assert!(summary.contains("Species"));
        assert!(summary.contains("A => 2 B"));
    }

    #[test]
    fn test_counts_skip_empty_kinds() {
        let doc = document();
        let counts = entity_counts(doc.model.as_ref().unwrap());
        assert_eq!(
            counts,
            vec![("compartments", 1), ("species", 2), ("reactions", 1)]
        );
    }

    #[test]
    fn test_render_without_model_fails() {
        let result = SummaryRenderer.render(&SbmlDocument::default());
        assert!(matches!(result, Err(ReportError::NoModel)));
    }

    #[test]
    fn test_render_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = SummaryRenderer.render_to_dir(&document(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "summary.txt");
        assert!(path.exists());
    }
}

//! Document builder
//!
//! Materializes a [`ModelDescriptor`] into an [`SbmlDocument`]. Every record
//! is normalized by the [`factory`](crate::factory); the builder then emits
//! the objects in a fixed order of kinds, keeping declaration order within
//! each kind:
//!
//! 1. packages and model units
//! 2. function definitions, unit definitions, compartments, species, parameters
//! 3. initial assignments, then assignment, rate and algebraic rules
//! 4. constraints, reactions, events
//! 5. composition: external model definitions, submodels with their
//!    deletions, ports, replacements
//! 6. FBC objectives and gene products
//! 7. model history
//!
//! Cross-entity checks (reference closure, unique ids, rule and function
//! cycles) run on the finished model. The first failure aborts the build
//! and is returned with the warnings collected so far.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::annotation::ensure_metaid;
use crate::comp::{flatten_document, FlattenOptions};
use crate::descriptor::{Meta, ModelDescriptor};
use crate::error::{BuildError, BuildFailure, BuildWarning, WarningKind};
use crate::factory::{gene_product_id, DerivedMath, FactoryContext, Normalize, Normalized};
use crate::math::Math;
use crate::preprocess::{merge_modules, DescriptorModule};
use crate::sbml::{
    self, ModelHistory, Package, RefTarget, RuleKind, SBase, SbmlDocument,
};
use crate::units::UnitRef;
use crate::validation::{
    check_consistency, identifiers, structural, Category, Report, ValidationOptions,
};

/// SBO term of ports created with `port: true`.
pub const SBO_PORT: &str = "SBO:0000599";

/// Default timestamp of the model history.
pub const DEFAULT_DATE: &str = "1900-01-01T00:00:00";

/// Options of a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct BuildOptions {
    /// SBML level, only 3 is supported
    pub level: u32,
    /// SBML version, 1 or 2
    pub version: u32,
    /// Run the units stage when validating
    pub units_check: bool,
    /// Treat annotation problems as errors
    pub strict_annotations: bool,
    /// Validate the built document
    pub validate: bool,
    /// Flatten composition before validating
    pub flatten: bool,
    /// Directory external model definitions are resolved against when
    /// flattening, usually the directory of the descriptor files
    #[builder(setter(into, strip_option))]
    pub base_dir: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            level: 3,
            version: 1,
            units_check: true,
            strict_annotations: false,
            validate: true,
            flatten: false,
            base_dir: None,
        }
    }
}

/// A built document with the warnings of the build and its validation.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub document: SbmlDocument,
    pub warnings: Vec<BuildWarning>,
    /// Present when the build ran with `validate`
    pub validation: Option<Report>,
}

/// Merges descriptor modules and builds the resulting descriptor.
///
/// # Arguments
///
/// * `modules` - Descriptor modules in merge order
/// * `options` - Build options
///
/// # Returns
///
/// The built document, or the first fatal error with the warnings of
/// preprocessing and building.
pub fn build_from_modules(
    modules: &[DescriptorModule],
    options: &BuildOptions,
) -> Result<BuildResult, BuildFailure> {
    let preprocessed = merge_modules(modules)?;
    let mut warnings = preprocessed.warnings;

    match build_document(&preprocessed.descriptor, options) {
        Ok(mut result) => {
            warnings.append(&mut result.warnings);
            result.warnings = warnings;
            Ok(result)
        }
        Err(mut failure) => {
            warnings.append(&mut failure.warnings);
            failure.warnings = warnings;
            Err(failure)
        }
    }
}

/// Builds a document from a model descriptor.
///
/// # Arguments
///
/// * `descriptor` - The merged model descriptor
/// * `options` - Build options
///
/// # Returns
///
/// The built (and optionally flattened and validated) document.
pub fn build_document(
    descriptor: &ModelDescriptor,
    options: &BuildOptions,
) -> Result<BuildResult, BuildFailure> {
    log::info!("Building model '{}'", descriptor.model_id());

    let mut builder = DocumentBuilder::new(descriptor, options);
    let document = match builder.build() {
        Ok(document) => document,
        Err(cause) => {
            log::error!("{cause}");
            return Err(BuildFailure::new(cause, builder.ctx.warnings));
        }
    };
    let mut warnings = builder.ctx.warnings;

    let document = if options.flatten && has_composition(&document) {
        let flatten_options = FlattenOptions {
            base_dir: options.base_dir.clone(),
        };
        match flatten_document(&document, &flatten_options) {
            Ok(flat) => flat,
            Err(e) => {
                log::error!("Flattening '{}' failed: {e}", descriptor.model_id());
                return Err(BuildFailure::new(e.into(), warnings).with_document(document));
            }
        }
    } else {
        document
    };

    let validation = options.validate.then(|| {
        let validation_options = ValidationOptions {
            units: options.units_check,
            ..Default::default()
        };
        let report = check_consistency(&document, &validation_options);
        for result in report.errors().filter(|r| r.category == Category::Units) {
            warnings.push(BuildWarning::log(
                WarningKind::UnitMismatch,
                result.identifier.as_deref(),
                result.message.clone(),
            ));
        }
        report
    });

    Ok(BuildResult {
        document,
        warnings,
        validation,
    })
}

fn has_composition(doc: &SbmlDocument) -> bool {
    doc.model.as_ref().is_some_and(|m| !m.submodels.is_empty())
}

fn collect_derived(
    derived: Option<DerivedMath>,
    initial_assignments: &mut Vec<sbml::InitialAssignment>,
    rules: &mut Vec<sbml::Rule>,
) {
    match derived {
        Some(DerivedMath::Initial(ia)) => initial_assignments.push(ia),
        Some(DerivedMath::Rule(rule)) => rules.push(rule),
        None => {}
    }
}

/// Records targeting a symbol through a rule or initial assignment, with
/// the unit used for an auto-created parameter.
struct Target<'a> {
    symbol: &'a str,
    unit: Option<&'a str>,
    constant: bool,
}

struct DocumentBuilder<'a> {
    descriptor: &'a ModelDescriptor,
    options: &'a BuildOptions,
    ctx: FactoryContext,
}

impl<'a> DocumentBuilder<'a> {
    fn new(descriptor: &'a ModelDescriptor, options: &'a BuildOptions) -> Self {
        let mut packages = Vec::new();
        for package in &descriptor.packages {
            if !packages.contains(package) {
                packages.push(*package);
            }
        }
        Self {
            descriptor,
            options,
            ctx: FactoryContext::new(packages, options.strict_annotations),
        }
    }

    fn warn(&mut self, kind: WarningKind, sid: &str, message: String) {
        self.ctx
            .warnings
            .push(BuildWarning::log(kind, Some(sid), message));
    }

    fn build(&mut self) -> Result<SbmlDocument, BuildError> {
        let d = self.descriptor;
        if self.options.level != 3 || !(1..=2).contains(&self.options.version) {
            return Err(BuildError::InvalidDescriptor(format!(
                "SBML L{}V{} is not supported, use L3V1 or L3V2",
                self.options.level, self.options.version
            )));
        }
        if d.mid.trim().is_empty() {
            return Err(BuildError::MissingField {
                sid: "model".to_string(),
                field: "mid".to_string(),
            });
        }

        let mut doc = SbmlDocument {
            level: self.options.level,
            version: self.options.version,
            packages: self.ctx.packages.clone(),
            ..Default::default()
        };

        let model_id = d.model_id();
        let mut model = sbml::Model {
            sbase: self.model_sbase(&model_id)?,
            ..Default::default()
        };
        self.model_units(&model_id, &mut model)?;

        let mut initial_assignments = Vec::new();
        let mut rules = Vec::new();

        for function in &d.functions {
            model.function_definitions.push(function.normalize(&mut self.ctx)?);
        }
        for unit in &d.units {
            model.unit_definitions.push(unit.normalize(&mut self.ctx)?);
        }
        for compartment in &d.compartments {
            let Normalized { element, derived } = compartment.normalize(&mut self.ctx)?;
            model.compartments.push(element);
            collect_derived(derived, &mut initial_assignments, &mut rules);
        }
        for species in &d.species {
            model.species.push(species.normalize(&mut self.ctx)?);
        }
        for parameter in &d.parameters {
            let Normalized { element, derived } = parameter.normalize(&mut self.ctx)?;
            model.parameters.push(element);
            collect_derived(derived, &mut initial_assignments, &mut rules);
        }

        let mut reaction_rules = Vec::new();
        let mut stoichiometries = Vec::new();
        for reaction in &d.reactions {
            let normalized = reaction.normalize(&mut self.ctx)?;
            for Normalized { element, derived } in normalized.parameters {
                model.parameters.push(element);
                collect_derived(derived, &mut initial_assignments, &mut rules);
            }
            reaction_rules.extend(normalized.rules);
            stoichiometries.extend(normalized.stoichiometries);
            model.reactions.push(normalized.reaction);
        }

        for assignment in &d.assignments {
            initial_assignments.push(assignment.normalize(&mut self.ctx)?);
        }
        for rule in &d.rules {
            rules.push(rule.normalize(&mut self.ctx)?);
        }
        for rule in &d.rate_rules {
            let mut rule = rule.normalize(&mut self.ctx)?;
            rule.kind = RuleKind::Rate;
            rules.push(rule);
        }
        rules.extend(reaction_rules);

        self.auto_parameters(&mut model, &initial_assignments, &rules);
        self.bind_stoichiometries(&model, &stoichiometries, &mut initial_assignments, &mut rules)?;

        // assignment, rate, algebraic; stable within each kind
        rules.sort_by_key(|rule| match rule.kind {
            RuleKind::Assignment => 0,
            RuleKind::Rate => 1,
            RuleKind::Algebraic => 2,
        });
        model.initial_assignments = initial_assignments;
        model.rules = rules;

        for constraint in &d.constraints {
            model.constraints.push(constraint.normalize(&mut self.ctx)?);
        }
        for event in &d.events {
            model.events.push(event.normalize(&mut self.ctx)?);
        }

        self.composition(&mut doc, &mut model)?;
        self.objectives(&mut model)?;
        self.gene_products(&mut model)?;
        self.history(&model_id, &mut model);

        doc.model = Some(model);
        self.check(&doc)?;

        log::debug!("Built model '{model_id}'");
        Ok(doc)
    }

    fn model_sbase(&mut self, model_id: &str) -> Result<SBase, BuildError> {
        let d = self.descriptor;
        let meta = Meta {
            sid: model_id.to_string(),
            name: Some(d.name.clone().unwrap_or_else(|| model_id.to_string())),
            notes: d.notes.clone(),
            annotations: d.annotations.clone(),
            ..Default::default()
        };
        crate::factory::normalize_meta(&meta, "model", true, &mut self.ctx)
    }

    fn model_units(&mut self, model_id: &str, model: &mut sbml::Model) -> Result<(), BuildError> {
        let Some(units) = &self.descriptor.model_units else {
            return Ok(());
        };
        let normalize = |unit: &Option<String>| {
            unit.as_deref()
                .map(|u| {
                    UnitRef::normalize(u).map_err(|source| BuildError::InvalidUnit {
                        sid: model_id.to_string(),
                        source,
                    })
                })
                .transpose()
        };

        model.time_units = normalize(&units.time)?;
        model.extent_units = normalize(&units.extent)?;
        model.substance_units = normalize(&units.substance)?;
        model.length_units = normalize(&units.length)?;
        model.area_units = normalize(&units.area)?;
        model.volume_units = normalize(&units.volume)?;
        self.ctx.substance_unit = model.substance_units.clone();
        Ok(())
    }

    /// Declares parameters for undeclared targets of rules and initial
    /// assignments and makes rule targets non-constant.
    fn auto_parameters(
        &mut self,
        model: &mut sbml::Model,
        initial_assignments: &[sbml::InitialAssignment],
        rules: &[sbml::Rule],
    ) {
        let d = self.descriptor;
        let units: HashMap<&str, &str> = d
            .assignments
            .iter()
            .filter_map(|ia| ia.unit.as_deref().map(|u| (ia.meta.sid.as_str(), u)))
            .chain(
                d.rules
                    .iter()
                    .chain(d.rate_rules.iter())
                    .chain(d.reactions.iter().flat_map(|r| r.rules.iter()))
                    .filter_map(|rule| rule.unit.as_deref().map(|u| (rule.meta.sid.as_str(), u))),
            )
            .collect();

        let targets = initial_assignments
            .iter()
            .map(|ia| Target {
                symbol: ia.symbol.as_str(),
                unit: units.get(ia.symbol.as_str()).copied(),
                constant: true,
            })
            .chain(rules.iter().filter_map(|rule| {
                rule.variable.as_deref().map(|variable| Target {
                    symbol: variable,
                    unit: units.get(variable).copied(),
                    constant: false,
                })
            }));

        let mut created: Vec<sbml::Parameter> = Vec::new();
        for target in targets {
            let declared = model.compartment(target.symbol).is_some()
                || model.species(target.symbol).is_some()
                || model.parameter(target.symbol).is_some()
                || model
                    .reactions
                    .iter()
                    .flat_map(|r| r.species_references())
                    .any(|sr| sr.sbase.id.as_deref() == Some(target.symbol));
            if declared {
                continue;
            }
            if let Some(existing) = created.iter_mut().find(|p| p.sbase.id() == target.symbol) {
                existing.constant &= target.constant;
                continue;
            }

            let units = target.unit.and_then(|u| UnitRef::normalize(u).ok());
            self.warn(
                WarningKind::AutoParameter,
                target.symbol,
                format!("Created parameter '{}' for undeclared assignment target", target.symbol),
            );
            created.push(sbml::Parameter {
                sbase: SBase::with_id(target.symbol),
                value: None,
                units,
                constant: target.constant,
            });
        }
        model.parameters.extend(created);

        let rule_targets: HashSet<&str> = rules
            .iter()
            .filter(|r| r.kind != RuleKind::Algebraic)
            .filter_map(|r| r.variable.as_deref())
            .collect();
        for parameter in model.parameters.iter_mut() {
            if parameter.constant && rule_targets.contains(parameter.sbase.id()) {
                log::debug!("Parameter '{}' is a rule target and not constant", parameter.sbase.id());
                parameter.constant = false;
            }
        }
    }

    /// Binds variable stoichiometries to their symbols: constant parameters
    /// through an initial assignment, everything else through an assignment
    /// rule.
    fn bind_stoichiometries(
        &self,
        model: &sbml::Model,
        stoichiometries: &[(String, String)],
        initial_assignments: &mut Vec<sbml::InitialAssignment>,
        rules: &mut Vec<sbml::Rule>,
    ) -> Result<(), BuildError> {
        for (reference, symbol) in stoichiometries {
            let math = Math::ident(symbol.clone());
            let constant = match model.parameter(symbol) {
                Some(parameter) => parameter.constant,
                None if model.species(symbol).is_some() || model.compartment(symbol).is_some() => {
                    false
                }
                None => return Err(BuildError::unresolved(reference, "stoichiometry symbol", symbol)),
            };
            if constant {
                initial_assignments.push(sbml::InitialAssignment {
                    sbase: SBase::default(),
                    symbol: reference.clone(),
                    math,
                });
            } else {
                rules.push(sbml::Rule {
                    sbase: SBase::default(),
                    kind: RuleKind::Assignment,
                    variable: Some(reference.clone()),
                    math,
                });
            }
        }
        Ok(())
    }

    fn composition(
        &mut self,
        doc: &mut SbmlDocument,
        model: &mut sbml::Model,
    ) -> Result<(), BuildError> {
        let d = self.descriptor;

        for external in &d.external_model_definitions {
            doc.external_model_definitions
                .push(external.normalize(&mut self.ctx)?);
        }
        for submodel in &d.submodels {
            model.submodels.push(submodel.normalize(&mut self.ctx)?);
        }
        for deletion in &d.deletions {
            let (submodel_ref, deletion) = deletion.normalize(&mut self.ctx)?;
            let sid = deletion.sbase.id().to_string();
            let submodel = model
                .submodels
                .iter_mut()
                .find(|s| s.sbase.id() == submodel_ref)
                .ok_or_else(|| BuildError::unresolved(&sid, "submodel", &submodel_ref))?;
            submodel.deletions.push(deletion);
        }

        for (sid, target) in self.port_shortcuts() {
            self.ctx.require(Package::Comp, &sid)?;
            let port_id = format!("{sid}_port");
            model.ports.push(sbml::Port {
                sbase: SBase {
                    id: Some(port_id.clone()),
                    name: Some(port_id.clone()),
                    metaid: Some(port_id),
                    sbo_term: Some(SBO_PORT.to_string()),
                    ..Default::default()
                },
                target,
            });
        }
        for port in &d.ports {
            model.ports.push(port.normalize(&mut self.ctx)?);
        }

        for record in &d.replaced_elements {
            let (element_ref, replaced) = record.normalize(&mut self.ctx)?;
            let mut pending = Some(replaced);
            model.for_each_sbase_mut(&mut |_, sbase| {
                if sbase.id.as_deref() == Some(element_ref.as_str()) {
                    if let Some(replaced) = pending.take() {
                        sbase.replaced_elements.push(replaced);
                    }
                }
            });
            if pending.is_some() {
                return Err(BuildError::unresolved(&record.meta.sid, "element", &element_ref));
            }
        }
        for record in &d.replaced_by {
            let (element_ref, replaced_by) = record.normalize(&mut self.ctx)?;
            let mut pending = Some(replaced_by);
            model.for_each_sbase_mut(&mut |_, sbase| {
                if sbase.id.as_deref() == Some(element_ref.as_str()) {
                    if let Some(replaced_by) = pending.take() {
                        sbase.replaced_by = Some(replaced_by);
                    }
                }
            });
            if pending.is_some() {
                return Err(BuildError::unresolved(&record.meta.sid, "element", &element_ref));
            }
        }

        Ok(())
    }

    /// Ports requested with `port: true`, in emission order of their entities.
    fn port_shortcuts(&self) -> Vec<(String, RefTarget)> {
        let d = self.descriptor;
        let mut shortcuts: Vec<(String, RefTarget)> = d
            .units
            .iter()
            .filter(|u| u.meta.port)
            .map(|u| (u.meta.sid.clone(), RefTarget::Unit(u.meta.sid.clone())))
            .collect();

        let entities: Vec<&Meta> = d
            .functions
            .iter()
            .map(|e| &e.meta)
            .chain(d.compartments.iter().map(|e| &e.meta))
            .chain(d.species.iter().map(|e| &e.meta))
            .chain(d.parameters.iter().map(|e| &e.meta))
            .chain(d.reactions.iter().map(|e| &e.meta))
            .chain(d.events.iter().map(|e| &e.meta))
            .collect();
        shortcuts.extend(
            entities
                .into_iter()
                .filter(|meta| meta.port)
                .map(|meta| (meta.sid.clone(), RefTarget::Id(meta.sid.clone()))),
        );
        shortcuts
    }

    fn objectives(&mut self, model: &mut sbml::Model) -> Result<(), BuildError> {
        let mut active = None;
        for objective in &self.descriptor.objectives {
            let (objective, is_active) = objective.normalize(&mut self.ctx)?;
            if is_active && active.is_none() {
                active = Some(objective.sbase.id().to_string());
            }
            model.objectives.push(objective);
        }
        model.active_objective =
            active.or_else(|| model.objectives.first().map(|o| o.sbase.id().to_string()));
        model.fbc_strict = false;
        Ok(())
    }

    /// Declared gene products, then one per undeclared association label.
    fn gene_products(&mut self, model: &mut sbml::Model) -> Result<(), BuildError> {
        for gene_product in &self.descriptor.gene_products {
            model.gene_products.push(gene_product.normalize(&mut self.ctx)?);
        }

        let labels: Vec<(String, String)> = model
            .reactions
            .iter()
            .filter_map(|r| {
                r.gene_product_association
                    .as_ref()
                    .map(|a| (r.sbase.id().to_string(), a))
            })
            .flat_map(|(rid, a)| {
                a.gene_products()
                    .into_iter()
                    .map(move |label| (rid.clone(), label.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut renames: HashMap<String, String> = HashMap::new();
        for (rid, label) in labels {
            if renames.contains_key(&label) {
                continue;
            }
            if model.gene_products.iter().any(|g| g.sbase.id() == label) {
                renames.insert(label.clone(), label);
                continue;
            }
            if let Some(existing) = model.gene_products.iter().find(|g| g.label == label) {
                renames.insert(label, existing.sbase.id().to_string());
                continue;
            }

            let id = gene_product_id(&label);
            self.warn(
                WarningKind::AutoGeneProduct,
                &rid,
                format!("Created gene product '{id}' for label '{label}'"),
            );
            model.gene_products.push(sbml::GeneProduct {
                sbase: SBase::with_id(id.clone()),
                label: label.clone(),
                associated_species: None,
            });
            renames.insert(label, id);
        }

        for reaction in model.reactions.iter_mut() {
            if let Some(association) = reaction.gene_product_association.as_mut() {
                association.rename(&|label| renames.get(label).cloned());
            }
        }
        Ok(())
    }

    fn history(&self, model_id: &str, model: &mut sbml::Model) {
        let d = self.descriptor;
        if d.creators.is_empty() && d.created.is_none() {
            return;
        }
        let created = d.created.clone().unwrap_or_else(|| DEFAULT_DATE.to_string());
        model.history = Some(ModelHistory {
            creators: d.creators.clone(),
            created: created.clone(),
            modified: vec![created],
        });
        ensure_metaid(&mut model.sbase, model_id);
    }

    /// Cross-entity checks on the finished document.
    fn check(&self, doc: &SbmlDocument) -> Result<(), BuildError> {
        let Some(model) = doc.model.as_ref() else {
            return Err(BuildError::InvalidDescriptor("no model was built".to_string()));
        };

        let duplicate = structural::duplicate_ids(model)
            .into_iter()
            .chain(identifiers::duplicate_metaids(model))
            .next();
        if let Some(duplicate) = duplicate {
            return Err(BuildError::DuplicateId {
                sid: duplicate.sid,
                namespace: duplicate.namespace,
            });
        }

        if let Some(cycle) = structural::function_cycle(model) {
            return Err(BuildError::FunctionCycle { cycle });
        }
        if let Some(unresolved) = structural::unresolved_references(doc, model).into_iter().next() {
            return Err(BuildError::unresolved(
                &unresolved.sid,
                unresolved.kind,
                &unresolved.reference,
            ));
        }
        if let Some(variable) = structural::multiple_rules(model).into_iter().next() {
            return Err(BuildError::MultipleRules { variable });
        }
        if let Some(cycle) = structural::assignment_cycle(model) {
            return Err(BuildError::RuleCycle { cycle });
        }
        Ok(())
    }
}

/// Shorthand for building a single descriptor with default options.
pub fn build(descriptor: &ModelDescriptor) -> Result<BuildResult, BuildFailure> {
    build_document(descriptor, &BuildOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Qualifier;
    use crate::descriptor::{
        Compartment, CompartmentBuilder, FluxObjective, Function, InitialAssignment,
        ModelDescriptorBuilder, ModelUnitsBuilder, Objective, Parameter, Reaction,
        ReactionBuilder, Rule, Species, SpeciesBuilder, UnitDefinition,
    };
    use crate::sbml::ObjectiveType;
    use pretty_assertions::assert_eq;

    fn compartment() -> Compartment {
        CompartmentBuilder::default()
            .meta("c")
            .value(2.0)
            .unit("litre")
            .build()
            .unwrap()
    }

    fn species(sid: &str) -> Species {
        SpeciesBuilder::default()
            .meta(sid)
            .compartment("c")
            .initial_amount(1.0)
            .has_only_substance_units(true)
            .build()
            .unwrap()
    }

    fn minimal() -> ModelDescriptorBuilder {
        let mut builder = ModelDescriptorBuilder::default();
        builder
            .mid("minimal")
            .to_compartments(compartment())
            .to_species(species("A1"));
        builder
    }

    #[test]
    fn test_minimal_model() {
        let descriptor = minimal().build().unwrap();
        let result = build(&descriptor).unwrap();

        let model = result.document.model.as_ref().unwrap();
        assert_eq!(model.sbase.id(), "minimal");
        assert_eq!(model.sbase.name.as_deref(), Some("minimal"));
        assert_eq!(model.compartments[0].size, Some(2.0));
        assert_eq!(model.species[0].compartment, "c");
        assert_eq!(model.species[0].initial_amount, Some(1.0));

        let report = result.validation.unwrap();
        assert!(report.is_valid, "{report}");
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn test_unresolved_compartment_fails() {
        let mut species = species("A1");
        species.compartment = "nucleus".to_string();
        let descriptor = ModelDescriptorBuilder::default()
            .mid("broken")
            .to_compartments(compartment())
            .to_species(species)
            .build()
            .unwrap();

        let failure = build(&descriptor).unwrap_err();
        assert!(matches!(
            failure.cause,
            BuildError::UnresolvedReference { ref reference, .. } if reference == "nucleus"
        ));
    }

    #[test]
    fn test_duplicate_sid_fails() {
        let descriptor = minimal()
            .to_parameters(Parameter::new("A1", 1.0, None))
            .build()
            .unwrap();
        let failure = build(&descriptor).unwrap_err();
        assert!(matches!(failure.cause, BuildError::DuplicateId { ref sid, .. } if sid == "A1"));
    }

    #[test]
    fn test_rule_order_and_auto_parameters() {
        let descriptor = minimal()
            .to_rate_rules(Rule::rate("x", "1.0").with_unit("mole"))
            .to_rules(Rule::assignment("y", "2 * A1"))
            .build()
            .unwrap();
        let result = build(&descriptor).unwrap();
        let model = result.document.model.unwrap();

        let kinds: Vec<_> = model.rules.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RuleKind::Assignment, RuleKind::Rate]);

        let x = model.parameter("x").unwrap();
        assert!(!x.constant);
        assert_eq!(x.units.as_deref(), Some("mole"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::AutoParameter && w.sid.as_deref() == Some("y")));
    }

    #[test]
    fn test_rule_cycle_fails() {
        let descriptor = minimal()
            .to_rules(Rule::assignment("a", "b + 1"))
            .to_rules(Rule::assignment("b", "a * 2"))
            .build()
            .unwrap();
        let failure = build(&descriptor).unwrap_err();
        assert!(matches!(failure.cause, BuildError::RuleCycle { .. }));
    }

    #[test]
    fn test_recursive_function_fails() {
        let descriptor = minimal()
            .to_functions(Function {
                meta: "f".into(),
                value: "lambda(x, f(x))".to_string(),
            })
            .to_rules(Rule::assignment("y", "f(1)"))
            .build()
            .unwrap();
        let failure = build(&descriptor).unwrap_err();
        assert!(matches!(
            failure.cause,
            BuildError::FunctionCycle { ref cycle } if cycle == &["f", "f"]
        ));
    }

    #[test]
    fn test_function_calling_later_function_fails() {
        let descriptor = minimal()
            .to_functions(Function {
                meta: "outer".into(),
                value: "lambda(x, inner(x))".to_string(),
            })
            .to_functions(Function {
                meta: "inner".into(),
                value: "lambda(x, 2 * x)".to_string(),
            })
            .build()
            .unwrap();
        let failure = build(&descriptor).unwrap_err();
        assert!(matches!(
            failure.cause,
            BuildError::UnresolvedReference { ref sid, ref reference, .. }
                if sid == "outer" && reference == "inner"
        ));
    }

    #[test]
    fn test_formula_value_becomes_initial_assignment() {
        let descriptor = minimal()
            .to_parameters(Parameter::new("k1", 1.0, None))
            .to_parameters(Parameter {
                value: Some("2 * k1".into()),
                ..Parameter::new("k2", 0.0, None)
            })
            .to_assignments(InitialAssignment {
                meta: "A1".into(),
                value: "k1".into(),
                unit: None,
            })
            .build()
            .unwrap();
        let model = build(&descriptor).unwrap().document.model.unwrap();
        let symbols: Vec<_> = model
            .initial_assignments
            .iter()
            .map(|ia| ia.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["k2", "A1"]);
        assert_eq!(model.parameter("k2").unwrap().value, None);
    }

    #[test]
    fn test_symbolic_stoichiometry_binding() {
        let descriptor = minimal()
            .to_species(species("B1"))
            .to_parameters(Parameter::new("n", 2.0, None))
            .to_reactions(
                ReactionBuilder::default()
                    .meta("R1")
                    .equation("n A1 -> B1")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let model = build(&descriptor).unwrap().document.model.unwrap();
        let reference = &model.reactions[0].reactants[0];
        assert_eq!(reference.sbase.id(), "R1_A1_stoich");
        assert!(!reference.constant);
        assert_eq!(model.initial_assignments[0].symbol, "R1_A1_stoich");
    }

    #[test]
    fn test_port_shortcut() {
        let mut c = compartment();
        c.meta.port = true;
        let descriptor = ModelDescriptorBuilder::default()
            .mid("ported")
            .packages(vec![Package::Comp])
            .to_units(UnitDefinition {
                meta: Meta::new("mM").with_port(),
                units: "mM".into(),
            })
            .to_compartments(c)
            .build()
            .unwrap();
        let model = build(&descriptor).unwrap().document.model.unwrap();
        assert_eq!(model.ports.len(), 2);
        assert_eq!(model.ports[0].target, RefTarget::Unit("mM".to_string()));
        assert_eq!(model.ports[1].sbase.id(), "c_port");
        assert_eq!(model.ports[1].sbase.sbo_term.as_deref(), Some(SBO_PORT));
    }

    #[test]
    fn test_port_shortcut_requires_comp() {
        let mut c = compartment();
        c.meta.port = true;
        let descriptor = ModelDescriptorBuilder::default()
            .mid("ported")
            .to_compartments(c)
            .build()
            .unwrap();
        let failure = build(&descriptor).unwrap_err();
        assert!(matches!(failure.cause, BuildError::PackageNotEnabled { .. }));
    }

    #[test]
    fn test_fbc_objective_and_gene_products() {
        let descriptor = ModelDescriptorBuilder::default()
            .mid("fbc")
            .packages(vec![Package::Fbc])
            .to_compartments(compartment())
            .to_species(species("A1"))
            .to_parameters(Parameter::new("zero", 0.0, None))
            .to_parameters(Parameter::new("inf", f64::INFINITY, None))
            .to_reactions(
                ReactionBuilder::default()
                    .meta("R1")
                    .equation("A1 ->")
                    .lower_flux_bound("zero")
                    .upper_flux_bound("inf")
                    .gene_association("(b0001 and b0002) or b0003")
                    .build()
                    .unwrap(),
            )
            .to_objectives(Objective {
                meta: "obj".into(),
                objective_type: ObjectiveType::Maximize,
                active: true,
                flux_objectives: vec![FluxObjective::new("R1", 1.0)],
            })
            .build()
            .unwrap();

        let result = build_document(
            &descriptor,
            &BuildOptionsBuilder::default().validate(false).build().unwrap(),
        )
        .unwrap();
        let model = result.document.model.unwrap();
        assert_eq!(model.active_objective.as_deref(), Some("obj"));
        assert_eq!(model.gene_products.len(), 3);
        assert_eq!(
            model.reactions[0]
                .gene_product_association
                .as_ref()
                .unwrap()
                .to_string(),
            "(b0001 and b0002) or b0003"
        );
        assert_eq!(
            result
                .warnings
                .iter()
                .filter(|w| w.kind == WarningKind::AutoGeneProduct)
                .count(),
            3
        );
    }

    #[test]
    fn test_model_units_and_history() {
        let descriptor = minimal()
            .model_units(
                ModelUnitsBuilder::default()
                    .time("second")
                    .substance("mole")
                    .volume("liter")
                    .build()
                    .unwrap(),
            )
            .created("2024-01-01T00:00:00")
            .to_annotations((Qualifier::BQB_HAS_TAXON, "taxonomy/9606".to_string()))
            .build()
            .unwrap();
        let model = build(&descriptor).unwrap().document.model.unwrap();
        assert_eq!(model.volume_units.as_deref(), Some("litre"));
        assert_eq!(model.species[0].substance_units.as_deref(), Some("mole"));
        assert_eq!(model.history.as_ref().unwrap().created, "2024-01-01T00:00:00");
        assert_eq!(model.sbase.metaid.as_deref(), Some("meta_minimal"));
    }

    #[test]
    fn test_modules_collect_preprocessing_warnings() {
        let module = DescriptorModule::from_json(
            "base",
            r#"{"mid": "m", "compartments": [{"sid": "c", "value": 1.0}], "colour": "red"}"#,
        )
        .unwrap();
        let result = build_from_modules(&[module], &BuildOptions::default()).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::UnknownKey));
    }

    #[test]
    fn test_exchange_reaction() {
        let descriptor = ModelDescriptorBuilder::default()
            .mid("exchange")
            .packages(vec![Package::Fbc])
            .to_compartments(compartment())
            .to_species(species("glc"))
            .to_parameters(Parameter::new("lb", -10.0, None))
            .to_reactions(Reaction::exchange("glc", Some("lb"), None))
            .build()
            .unwrap();
        let model = build(&descriptor).unwrap().document.model.unwrap();
        let reaction = &model.reactions[0];
        assert_eq!(reaction.sbase.id(), "EX_glc");
        assert!(reaction.reversible);
        assert_eq!(reaction.sbase.sbo_term.as_deref(), Some("SBO:0000627"));
        assert_eq!(reaction.lower_flux_bound.as_deref(), Some("lb"));
    }
}

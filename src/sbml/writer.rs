//! SBML document writer
//!
//! Serializes an [`SbmlDocument`] into SBML Level 3 XML. Elements are
//! emitted in the order of the SBML schema, attributes in a fixed order, so
//! writing the same document twice yields identical bytes.
//!
//! Package constructs are written with their prefix (`comp:`, `fbc:`,
//! `distrib:`). The root declares exactly the packages the document
//! enables; using a package that is not enabled is an error.

use std::path::Path;

use crate::annotation::{CvTerm, BQBIOL_NS, BQMODEL_NS};
use crate::math::mathml::to_mathml;
use crate::math::{format_number, Math};
use crate::sbml::xml::XmlElement;
use crate::sbml::{
    error::SBMLError, Association, Compartment, Constraint, Deletion, Event,
    ExternalModelDefinition, FunctionDefinition, GeneProduct, InitialAssignment, KineticLaw,
    Model, ModelHistory, Objective, Package, Parameter, Port, Reaction, RefTarget, Rule, SBase,
    SbmlDocument, Species, SpeciesReference, Submodel, UncertParameter, UnitDefinition,
    SBML_L3V1_NS, SBML_L3V2_NS, XHTML_NS,
};

pub(crate) const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub(crate) const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub(crate) const VCARD4_NS: &str = "http://www.w3.org/2006/vcard/ns#";

/// Serializes a document to an SBML string.
///
/// # Arguments
/// * `doc` - The document to serialize
///
/// # Returns
/// * `Result<String, SBMLError>` - The XML text including the declaration
pub fn write_sbml(doc: &SbmlDocument) -> Result<String, SBMLError> {
    let context = WriteContext {
        level: doc.level,
        version: doc.version,
    };

    let core_ns = if doc.version >= 2 {
        SBML_L3V2_NS
    } else {
        SBML_L3V1_NS
    };
    let mut root = XmlElement::new("sbml").with_attr("xmlns", core_ns);

    for package in declared_packages(doc)? {
        root.set_attr(format!("xmlns:{}", package.prefix()), package.namespace());
        root.set_attr(
            format!("{}:required", package.prefix()),
            package.required().to_string(),
        );
    }
    root.set_attr("level", doc.level.to_string());
    root.set_attr("version", doc.version.to_string());

    if let Some(model) = &doc.model {
        root.push(map_model("model", model, &context, doc.has_package(Package::Fbc))?);
    }

    root.push_list(
        "comp:listOfExternalModelDefinitions",
        doc.external_model_definitions
            .iter()
            .map(map_external_model_definition)
            .collect(),
    );
    root.push_list(
        "comp:listOfModelDefinitions",
        doc.model_definitions
            .iter()
            .map(|md| map_model("comp:modelDefinition", md, &context, doc.has_package(Package::Fbc)))
            .collect::<Result<Vec<_>, _>>()?,
    );

    root.to_xml_string(true)
}

/// Writes a document to a file.
pub fn write_sbml_file(doc: &SbmlDocument, path: impl AsRef<Path>) -> Result<(), SBMLError> {
    let xml = write_sbml(doc)?;
    std::fs::write(path.as_ref(), xml)?;
    log::debug!("SBML written to {}", path.as_ref().display());
    Ok(())
}

struct WriteContext {
    level: u32,
    version: u32,
}

/// Enabled packages, after checking that every used package is enabled.
fn declared_packages(doc: &SbmlDocument) -> Result<Vec<Package>, SBMLError> {
    let models = || doc.model.iter().chain(doc.model_definitions.iter());

    let mut uses_replacements = false;
    let mut uses_uncertainties = false;
    for model in models() {
        model.for_each_sbase(&mut |_, sbase| {
            uses_replacements |= !sbase.replaced_elements.is_empty() || sbase.replaced_by.is_some();
            uses_uncertainties |= !sbase.uncertainties.is_empty();
        });
    }

    let uses_comp = uses_replacements
        || !doc.model_definitions.is_empty()
        || !doc.external_model_definitions.is_empty()
        || models().any(|m| !m.submodels.is_empty() || !m.ports.is_empty());
    let uses_fbc = models().any(|m| {
        !m.objectives.is_empty()
            || !m.gene_products.is_empty()
            || m.species
                .iter()
                .any(|s| s.charge.is_some() || s.chemical_formula.is_some())
            || m.reactions.iter().any(|r| {
                r.lower_flux_bound.is_some()
                    || r.upper_flux_bound.is_some()
                    || r.gene_product_association.is_some()
            })
    });
    let uses_distrib = uses_uncertainties
        || models().any(|m| {
            let mut found = false;
            m.for_each_math(&mut |_, _, math| found |= math.uses_distributions());
            found
        });

    for (package, used) in [
        (Package::Comp, uses_comp),
        (Package::Fbc, uses_fbc),
        (Package::Distrib, uses_distrib),
    ] {
        if used && !doc.has_package(package) {
            return Err(SBMLError::UndeclaredPackage(package));
        }
    }
    Ok(doc.packages.clone())
}

fn bool_str(value: bool) -> String {
    value.to_string()
}

fn math_element(math: &Math) -> XmlElement {
    to_mathml(math)
}

/// Opens an element with the SBase attributes, notes and annotation.
/// Package elements carry their `id` and `name` with the package prefix.
fn open(name: &str, sbase: &SBase, prefix: Option<&str>) -> XmlElement {
    let qualified = |attr: &str| match prefix {
        Some(prefix) => format!("{prefix}:{attr}"),
        None => attr.to_string(),
    };

    let mut element = XmlElement::new(name)
        .with_opt_attr("metaid", sbase.metaid.as_ref())
        .with_opt_attr("sboTerm", sbase.sbo_term.as_ref());
    if let Some(id) = &sbase.id {
        element.set_attr(qualified("id"), id.as_str());
    }
    if let Some(element_name) = &sbase.name {
        element.set_attr(qualified("name"), element_name.as_str());
    }

    if let Some(notes) = &sbase.notes {
        element.push(notes_element(notes));
    }
    if let Some(annotation) = annotation_element(sbase, None) {
        element.push(annotation);
    }
    element
}

/// Appends the comp and distrib extensions of an element.
fn close(mut element: XmlElement, sbase: &SBase) -> XmlElement {
    element.push_list(
        "comp:listOfReplacedElements",
        sbase
            .replaced_elements
            .iter()
            .map(|re| {
                let target = &re.target;
                XmlElement::new("comp:replacedElement")
                    .with_attr("comp:submodelRef", re.submodel_ref.as_str())
                    .with_attr(format!("comp:{}", target.attribute()), target.value())
                    .with_opt_attr("comp:conversionFactor", re.conversion_factor.as_ref())
            })
            .collect(),
    );
    if let Some(rb) = &sbase.replaced_by {
        element.push(
            XmlElement::new("comp:replacedBy")
                .with_attr("comp:submodelRef", rb.submodel_ref.as_str())
                .with_attr(format!("comp:{}", rb.target.attribute()), rb.target.value()),
        );
    }

    element.push_list(
        "distrib:listOfUncertainties",
        sbase
            .uncertainties
            .iter()
            .map(|uncertainty| {
                let mut entry = open("distrib:uncertainty", &uncertainty.sbase, Some("distrib"));
                for parameter in &uncertainty.parameters {
                    entry.push(map_uncert_parameter(parameter));
                }
                entry
            })
            .collect(),
    );
    element
}

fn notes_element(notes: &XmlElement) -> XmlElement {
    let mut body = notes.clone();
    if body.attr("xmlns").is_none() {
        body.set_attr("xmlns", XHTML_NS);
    }
    XmlElement::new("notes").with_child(body)
}

fn annotation_element(sbase: &SBase, history: Option<&ModelHistory>) -> Option<XmlElement> {
    if sbase.cv_terms.is_empty() && history.is_none() {
        return None;
    }
    let Some(metaid) = &sbase.metaid else {
        log::warn!(
            "Element '{}' has annotations but no meta id; annotations are not written",
            sbase.id()
        );
        return None;
    };

    let mut description =
        XmlElement::new("rdf:Description").with_attr("rdf:about", format!("#{metaid}"));
    if let Some(history) = history {
        write_history(&mut description, history);
    }
    for cv in &sbase.cv_terms {
        description.push(cv_term_element(cv));
    }

    let rdf = XmlElement::new("rdf:RDF")
        .with_attr("xmlns:rdf", RDF_NS)
        .with_attr("xmlns:dcterms", DCTERMS_NS)
        .with_attr("xmlns:vCard4", VCARD4_NS)
        .with_attr("xmlns:bqbiol", BQBIOL_NS)
        .with_attr("xmlns:bqmodel", BQMODEL_NS)
        .with_child(description);
    Some(XmlElement::new("annotation").with_child(rdf))
}

fn cv_term_element(cv: &CvTerm) -> XmlElement {
    let mut bag = XmlElement::new("rdf:Bag");
    for resource in &cv.resources {
        bag.push(XmlElement::new("rdf:li").with_attr("rdf:resource", resource.as_str()));
    }
    XmlElement::new(cv.qualifier.rdf_element()).with_child(bag)
}

fn write_history(description: &mut XmlElement, history: &ModelHistory) {
    if !history.creators.is_empty() {
        let mut bag = XmlElement::new("rdf:Bag");
        for creator in &history.creators {
            let name = XmlElement::new("vCard4:hasName")
                .with_attr("rdf:parseType", "Resource")
                .with_child(XmlElement::new("vCard4:family-name").with_text(&creator.family_name))
                .with_child(XmlElement::new("vCard4:given-name").with_text(&creator.given_name));
            let mut li = XmlElement::new("rdf:li")
                .with_attr("rdf:parseType", "Resource")
                .with_child(name);
            if let Some(email) = &creator.email {
                li.push(XmlElement::new("vCard4:hasEmail").with_text(email));
            }
            if let Some(organization) = &creator.organization {
                li.push(XmlElement::new("vCard4:organization-name").with_text(organization));
            }
            bag.push(li);
        }
        description.push(XmlElement::new("dcterms:creator").with_child(bag));
    }

    let date = |name: &str, value: &str| {
        XmlElement::new(name)
            .with_attr("rdf:parseType", "Resource")
            .with_child(XmlElement::new("dcterms:W3CDTF").with_text(value))
    };
    if !history.created.is_empty() {
        description.push(date("dcterms:created", &history.created));
    }
    for modified in &history.modified {
        description.push(date("dcterms:modified", modified));
    }
}

fn map_model(
    name: &str,
    model: &Model,
    context: &WriteContext,
    fbc: bool,
) -> Result<XmlElement, SBMLError> {
    let mut element = XmlElement::new(name)
        .with_opt_attr("metaid", model.sbase.metaid.as_ref())
        .with_opt_attr("sboTerm", model.sbase.sbo_term.as_ref())
        .with_opt_attr("id", model.sbase.id.as_ref())
        .with_opt_attr("name", model.sbase.name.as_ref())
        .with_opt_attr("substanceUnits", model.substance_units.as_ref())
        .with_opt_attr("timeUnits", model.time_units.as_ref())
        .with_opt_attr("volumeUnits", model.volume_units.as_ref())
        .with_opt_attr("areaUnits", model.area_units.as_ref())
        .with_opt_attr("lengthUnits", model.length_units.as_ref())
        .with_opt_attr("extentUnits", model.extent_units.as_ref())
        .with_opt_attr("conversionFactor", model.conversion_factor.as_ref());
    if fbc {
        element.set_attr("fbc:strict", bool_str(model.fbc_strict));
    }

    if let Some(notes) = &model.sbase.notes {
        element.push(notes_element(notes));
    }
    if let Some(annotation) = annotation_element(&model.sbase, model.history.as_ref()) {
        element.push(annotation);
    }

    element.push_list(
        "listOfFunctionDefinitions",
        model.function_definitions.iter().map(map_function_definition).collect(),
    );
    element.push_list(
        "listOfUnitDefinitions",
        model.unit_definitions.iter().map(map_unit_definition).collect(),
    );
    element.push_list(
        "listOfCompartments",
        model.compartments.iter().map(map_compartment).collect(),
    );
    element.push_list("listOfSpecies", model.species.iter().map(map_species).collect());
    element.push_list(
        "listOfParameters",
        model.parameters.iter().map(map_parameter).collect(),
    );
    element.push_list(
        "listOfInitialAssignments",
        model.initial_assignments.iter().map(map_initial_assignment).collect(),
    );
    element.push_list("listOfRules", model.rules.iter().map(map_rule).collect());
    element.push_list(
        "listOfConstraints",
        model.constraints.iter().map(map_constraint).collect(),
    );
    element.push_list(
        "listOfReactions",
        model
            .reactions
            .iter()
            .map(|r| map_reaction(r, context))
            .collect(),
    );
    element.push_list("listOfEvents", model.events.iter().map(map_event).collect());

    if !model.objectives.is_empty() {
        let mut objectives = XmlElement::new("fbc:listOfObjectives")
            .with_opt_attr("fbc:activeObjective", model.active_objective.as_ref());
        for objective in &model.objectives {
            objectives.push(map_objective(objective));
        }
        element.push(objectives);
    }
    element.push_list(
        "fbc:listOfGeneProducts",
        model.gene_products.iter().map(map_gene_product).collect(),
    );

    element.push_list(
        "comp:listOfSubmodels",
        model.submodels.iter().map(map_submodel).collect(),
    );
    element.push_list("comp:listOfPorts", model.ports.iter().map(map_port).collect());

    Ok(close(element, &model.sbase))
}

fn map_function_definition(fd: &FunctionDefinition) -> XmlElement {
    let element = open("functionDefinition", &fd.sbase, None).with_child(math_element(&fd.math));
    close(element, &fd.sbase)
}

fn map_unit_definition(ud: &UnitDefinition) -> XmlElement {
    let mut element = open("unitDefinition", &ud.sbase, None);
    element.push_list(
        "listOfUnits",
        ud.units
            .iter()
            .map(|unit| {
                XmlElement::new("unit")
                    .with_attr("kind", unit.kind.as_str())
                    .with_attr("exponent", format_number(unit.exponent))
                    .with_attr("scale", unit.scale.to_string())
                    .with_attr("multiplier", format_number(unit.multiplier))
            })
            .collect(),
    );
    close(element, &ud.sbase)
}

fn map_compartment(compartment: &Compartment) -> XmlElement {
    let element = open("compartment", &compartment.sbase, None)
        .with_opt_attr("spatialDimensions", compartment.spatial_dimensions.map(format_number))
        .with_opt_attr("size", compartment.size.map(format_number))
        .with_opt_attr("units", compartment.units.as_ref())
        .with_attr("constant", bool_str(compartment.constant));
    close(element, &compartment.sbase)
}

fn map_species(species: &Species) -> XmlElement {
    let element = open("species", &species.sbase, None)
        .with_attr("compartment", species.compartment.as_str())
        .with_opt_attr("initialAmount", species.initial_amount.map(format_number))
        .with_opt_attr(
            "initialConcentration",
            species.initial_concentration.map(format_number),
        )
        .with_opt_attr("substanceUnits", species.substance_units.as_ref())
        .with_attr(
            "hasOnlySubstanceUnits",
            bool_str(species.has_only_substance_units),
        )
        .with_attr("boundaryCondition", bool_str(species.boundary_condition))
        .with_attr("constant", bool_str(species.constant))
        .with_opt_attr("conversionFactor", species.conversion_factor.as_ref())
        .with_opt_attr("fbc:charge", species.charge)
        .with_opt_attr("fbc:chemicalFormula", species.chemical_formula.as_ref());
    close(element, &species.sbase)
}

fn map_parameter(parameter: &Parameter) -> XmlElement {
    let element = open("parameter", &parameter.sbase, None)
        .with_opt_attr("value", parameter.value.map(format_number))
        .with_opt_attr("units", parameter.units.as_ref())
        .with_attr("constant", bool_str(parameter.constant));
    close(element, &parameter.sbase)
}

fn map_initial_assignment(ia: &InitialAssignment) -> XmlElement {
    let element = open("initialAssignment", &ia.sbase, None)
        .with_attr("symbol", ia.symbol.as_str())
        .with_child(math_element(&ia.math));
    close(element, &ia.sbase)
}

fn map_rule(rule: &Rule) -> XmlElement {
    let element = open(rule.kind.element_name(), &rule.sbase, None)
        .with_opt_attr("variable", rule.variable.as_ref())
        .with_child(math_element(&rule.math));
    close(element, &rule.sbase)
}

fn map_constraint(constraint: &Constraint) -> XmlElement {
    let mut element =
        open("constraint", &constraint.sbase, None).with_child(math_element(&constraint.math));
    if let Some(message) = &constraint.message {
        element.push(
            XmlElement::new("message").with_child(
                XmlElement::new("p")
                    .with_attr("xmlns", XHTML_NS)
                    .with_text(message),
            ),
        );
    }
    close(element, &constraint.sbase)
}

fn map_species_reference(sr: &SpeciesReference) -> XmlElement {
    let element = open("speciesReference", &sr.sbase, None)
        .with_attr("species", sr.species.as_str())
        .with_opt_attr("stoichiometry", sr.stoichiometry.map(format_number))
        .with_attr("constant", bool_str(sr.constant));
    close(element, &sr.sbase)
}

fn map_kinetic_law(law: &KineticLaw) -> XmlElement {
    let mut element = open("kineticLaw", &law.sbase, None).with_child(math_element(&law.math));
    element.push_list(
        "listOfLocalParameters",
        law.local_parameters
            .iter()
            .map(|lp| {
                let lp_element = open("localParameter", &lp.sbase, None)
                    .with_opt_attr("value", lp.value.map(format_number))
                    .with_opt_attr("units", lp.units.as_ref());
                close(lp_element, &lp.sbase)
            })
            .collect(),
    );
    close(element, &law.sbase)
}

fn map_association(association: &Association) -> XmlElement {
    match association {
        Association::GeneProduct(id) => {
            XmlElement::new("fbc:geneProductRef").with_attr("fbc:geneProduct", id.as_str())
        }
        Association::And(items) => items
            .iter()
            .fold(XmlElement::new("fbc:and"), |el, item| el.with_child(map_association(item))),
        Association::Or(items) => items
            .iter()
            .fold(XmlElement::new("fbc:or"), |el, item| el.with_child(map_association(item))),
    }
}

fn map_reaction(reaction: &Reaction, context: &WriteContext) -> XmlElement {
    let mut element = open("reaction", &reaction.sbase, None)
        .with_attr("reversible", bool_str(reaction.reversible));
    if context.level == 3 && context.version == 1 {
        element.set_attr("fast", bool_str(reaction.fast));
    }
    element = element
        .with_opt_attr("compartment", reaction.compartment.as_ref())
        .with_opt_attr("fbc:lowerFluxBound", reaction.lower_flux_bound.as_ref())
        .with_opt_attr("fbc:upperFluxBound", reaction.upper_flux_bound.as_ref());

    element.push_list(
        "listOfReactants",
        reaction.reactants.iter().map(map_species_reference).collect(),
    );
    element.push_list(
        "listOfProducts",
        reaction.products.iter().map(map_species_reference).collect(),
    );
    element.push_list(
        "listOfModifiers",
        reaction
            .modifiers
            .iter()
            .map(|m| {
                let modifier = open("modifierSpeciesReference", &m.sbase, None)
                    .with_attr("species", m.species.as_str());
                close(modifier, &m.sbase)
            })
            .collect(),
    );
    if let Some(law) = &reaction.kinetic_law {
        element.push(map_kinetic_law(law));
    }
    if let Some(association) = &reaction.gene_product_association {
        element.push(
            XmlElement::new("fbc:geneProductAssociation").with_child(map_association(association)),
        );
    }
    close(element, &reaction.sbase)
}

fn map_event(event: &Event) -> XmlElement {
    let mut element = open("event", &event.sbase, None).with_attr(
        "useValuesFromTriggerTime",
        bool_str(event.use_values_from_trigger_time),
    );

    element.push(
        XmlElement::new("trigger")
            .with_attr("initialValue", bool_str(event.trigger.initial_value))
            .with_attr("persistent", bool_str(event.trigger.persistent))
            .with_child(math_element(&event.trigger.math)),
    );
    if let Some(priority) = &event.priority {
        element.push(XmlElement::new("priority").with_child(math_element(priority)));
    }
    if let Some(delay) = &event.delay {
        element.push(XmlElement::new("delay").with_child(math_element(delay)));
    }
    element.push_list(
        "listOfEventAssignments",
        event
            .assignments
            .iter()
            .map(|ea| {
                let assignment = open("eventAssignment", &ea.sbase, None)
                    .with_attr("variable", ea.variable.as_str())
                    .with_child(math_element(&ea.math));
                close(assignment, &ea.sbase)
            })
            .collect(),
    );
    close(element, &event.sbase)
}

fn map_objective(objective: &Objective) -> XmlElement {
    let mut element = open("fbc:objective", &objective.sbase, Some("fbc"))
        .with_attr("fbc:type", objective.objective_type.as_str());
    element.push_list(
        "fbc:listOfFluxObjectives",
        objective
            .flux_objectives
            .iter()
            .map(|fo| {
                open("fbc:fluxObjective", &fo.sbase, Some("fbc"))
                    .with_attr("fbc:reaction", fo.reaction.as_str())
                    .with_attr("fbc:coefficient", format_number(fo.coefficient))
            })
            .collect(),
    );
    element
}

fn map_gene_product(gp: &GeneProduct) -> XmlElement {
    open("fbc:geneProduct", &gp.sbase, Some("fbc"))
        .with_attr("fbc:label", gp.label.as_str())
        .with_opt_attr("fbc:associatedSpecies", gp.associated_species.as_ref())
}

fn target_attr(element: XmlElement, target: &RefTarget) -> XmlElement {
    element.with_attr(format!("comp:{}", target.attribute()), target.value())
}

fn map_deletion(deletion: &Deletion) -> XmlElement {
    target_attr(
        open("comp:deletion", &deletion.sbase, Some("comp")),
        &deletion.target,
    )
}

fn map_submodel(submodel: &Submodel) -> XmlElement {
    let mut element = open("comp:submodel", &submodel.sbase, Some("comp"))
        .with_attr("comp:modelRef", submodel.model_ref.as_str())
        .with_opt_attr(
            "comp:timeConversionFactor",
            submodel.time_conversion_factor.as_ref(),
        )
        .with_opt_attr(
            "comp:extentConversionFactor",
            submodel.extent_conversion_factor.as_ref(),
        );
    element.push_list(
        "comp:listOfDeletions",
        submodel.deletions.iter().map(map_deletion).collect(),
    );
    element
}

fn map_port(port: &Port) -> XmlElement {
    target_attr(open("comp:port", &port.sbase, Some("comp")), &port.target)
}

fn map_external_model_definition(emd: &ExternalModelDefinition) -> XmlElement {
    open("comp:externalModelDefinition", &emd.sbase, Some("comp"))
        .with_attr("comp:source", emd.source.as_str())
        .with_opt_attr("comp:modelRef", emd.model_ref.as_ref())
        .with_opt_attr("comp:md5", emd.md5.as_ref())
}

fn map_uncert_parameter(parameter: &UncertParameter) -> XmlElement {
    match parameter {
        UncertParameter::Point {
            statistic,
            value,
            var,
            units,
        } => XmlElement::new("distrib:uncertParameter")
            .with_attr("distrib:type", statistic.as_str())
            .with_opt_attr("distrib:value", value.map(format_number))
            .with_opt_attr("distrib:var", var.as_ref())
            .with_opt_attr("distrib:units", units.as_ref()),
        UncertParameter::Span {
            statistic,
            value_lower,
            var_lower,
            value_upper,
            var_upper,
            units,
        } => XmlElement::new("distrib:uncertSpan")
            .with_attr("distrib:type", statistic.as_str())
            .with_opt_attr("distrib:valueLower", value_lower.map(format_number))
            .with_opt_attr("distrib:varLower", var_lower.as_ref())
            .with_opt_attr("distrib:valueUpper", value_upper.map(format_number))
            .with_opt_attr("distrib:varUpper", var_upper.as_ref())
            .with_opt_attr("distrib:units", units.as_ref()),
        UncertParameter::Distribution {
            definition_url,
            math,
        } => XmlElement::new("distrib:uncertParameter")
            .with_attr("distrib:type", "distribution")
            .with_attr("distrib:definitionURL", definition_url.as_str())
            .with_child(math_element(math)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Qualifier;
    use crate::sbml::{Creator, ReplacedElement};

    fn minimal_document() -> SbmlDocument {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            ..Default::default()
        };
        model.compartments.push(Compartment {
            sbase: SBase::with_id("c"),
            spatial_dimensions: Some(3.0),
            size: Some(1.0),
            units: Some("litre".into()),
            constant: true,
        });
        model.species.push(Species {
            sbase: SBase::with_id("A"),
            compartment: "c".into(),
            initial_amount: None,
            initial_concentration: Some(10.0),
            substance_units: Some("mole".into()),
            has_only_substance_units: false,
            boundary_condition: false,
            constant: false,
            conversion_factor: None,
            charge: None,
            chemical_formula: None,
        });
        SbmlDocument {
            model: Some(model),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_minimal_document() {
        let xml = write_sbml(&minimal_document()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1">"#));
        assert!(xml.contains(r#"<compartment id="c" spatialDimensions="3" size="1" units="litre" constant="true"/>"#));
        assert!(xml.contains(r#"initialConcentration="10""#));
        assert!(!xml.contains("listOfReactions"));
    }

    #[test]
    fn test_write_is_deterministic() {
        let doc = minimal_document();
        assert_eq!(write_sbml(&doc).unwrap(), write_sbml(&doc).unwrap());
    }

    #[test]
    fn test_enabled_packages_are_declared() {
        let mut doc = minimal_document();
        if let Some(model) = doc.model.as_mut() {
            model.species[0].charge = Some(-1);
            model.species[0].sbase.replaced_elements.push(ReplacedElement {
                submodel_ref: "sub".into(),
                target: RefTarget::Port("A_port".into()),
                conversion_factor: None,
            });
        }
        doc.enable_package(Package::Fbc);
        doc.enable_package(Package::Comp);
        let xml = write_sbml(&doc).unwrap();
        assert!(xml.contains(r#"xmlns:fbc="http://www.sbml.org/sbml/level3/version1/fbc/version2""#));
        assert!(xml.contains(r#"fbc:required="false""#));
        assert!(xml.contains(r#"comp:required="true""#));
        assert!(!xml.contains("xmlns:distrib"));
        assert!(xml.contains(r#"<comp:replacedElement comp:submodelRef="sub" comp:portRef="A_port"/>"#));
    }

    #[test]
    fn test_undeclared_package_use_fails() {
        let mut doc = minimal_document();
        if let Some(model) = doc.model.as_mut() {
            model.initial_assignments.push(InitialAssignment {
                sbase: SBase::default(),
                symbol: "A".into(),
                math: crate::math::parse_formula("normal(0, 1)").unwrap(),
            });
        }
        assert!(matches!(
            write_sbml(&doc),
            Err(SBMLError::UndeclaredPackage(Package::Distrib))
        ));

        doc.enable_package(Package::Distrib);
        let xml = write_sbml(&doc).unwrap();
        assert!(xml.contains("xmlns:distrib"));
    }

    #[test]
    fn test_history_and_cv_terms() {
        let mut doc = minimal_document();
        if let Some(model) = doc.model.as_mut() {
            model.sbase.metaid = Some("meta_m".into());
            model.sbase.cv_terms.push(CvTerm {
                qualifier: Qualifier::BQB_HAS_TAXON,
                resources: vec!["https://identifiers.org/taxonomy/9606".into()],
            });
            model.history = Some(ModelHistory {
                creators: vec![Creator {
                    family_name: "König".into(),
                    given_name: "Matthias".into(),
                    email: Some("mk@example.org".into()),
                    organization: None,
                }],
                created: "2024-01-01T00:00:00Z".into(),
                modified: vec![],
            });
        }
        let xml = write_sbml(&doc).unwrap();
        assert!(xml.contains(r##"<rdf:Description rdf:about="#meta_m">"##));
        assert!(xml.contains("<vCard4:family-name>König</vCard4:family-name>"));
        assert!(xml.contains(r#"<rdf:li rdf:resource="https://identifiers.org/taxonomy/9606"/>"#));
        assert!(xml.contains("<dcterms:W3CDTF>2024-01-01T00:00:00Z</dcterms:W3CDTF>"));
    }

    #[test]
    fn test_fast_only_for_l3v1() {
        let reaction = Reaction {
            sbase: SBase::with_id("R1"),
            reversible: false,
            fast: false,
            compartment: None,
            reactants: vec![],
            products: vec![],
            modifiers: vec![],
            kinetic_law: None,
            lower_flux_bound: None,
            upper_flux_bound: None,
            gene_product_association: None,
        };
        let l3v1 = map_reaction(&reaction, &WriteContext { level: 3, version: 1 });
        let l3v2 = map_reaction(&reaction, &WriteContext { level: 3, version: 2 });
        assert_eq!(l3v1.attr("fast"), Some("false"));
        assert_eq!(l3v2.attr("fast"), None);
    }
}

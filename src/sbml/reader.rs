//! SBML document reader
//!
//! Parses SBML Level 3 documents (core plus the comp, fbc and distrib
//! constructs produced by the writer) into an [`SbmlDocument`]. Unknown
//! elements are skipped; missing required attributes and unparsable values
//! are reported as [`SBMLError`]s.

use std::path::Path;
use std::str::FromStr;

use crate::annotation::CvTerm;
use crate::annotation::Qualifier;
use crate::math::mathml::from_mathml;
use crate::math::Math;
use crate::sbml::xml::XmlElement;
use crate::sbml::{
    error::SBMLError, Association, Compartment, Constraint, Creator, Deletion, Event,
    EventAssignment, ExternalModelDefinition, FluxObjective, FunctionDefinition, GeneProduct,
    InitialAssignment, KineticLaw, LocalParameter, Model, ModelHistory,
    ModifierSpeciesReference, Objective, ObjectiveType, Package, Parameter, PointStatistic, Port,
    Reaction, RefTarget, ReplacedBy, ReplacedElement, Rule, RuleKind, SBase, SbmlDocument,
    SpanStatistic, Species, SpeciesReference, Submodel, Trigger, UncertParameter, Uncertainty,
    UnitDefinition,
};
use crate::units::{Unit, UnitKind};

/// Parses an SBML document from a string.
///
/// # Arguments
/// * `xml` - SBML text
///
/// # Returns
/// * `Result<SbmlDocument, SBMLError>` - The parsed document; its `model`
///   is `None` when the document contains no `<model>` element
pub fn read_sbml(xml: &str) -> Result<SbmlDocument, SBMLError> {
    let root = XmlElement::parse(xml)?;
    if root.local_name() != "sbml" {
        return Err(SBMLError::NotSbml(root.name.clone()));
    }

    let level = parse_attr::<u32>(&root, "level")?.unwrap_or(3);
    let version = parse_attr::<u32>(&root, "version")?.unwrap_or(1);
    if level != 3 {
        return Err(SBMLError::InvalidAttribute {
            element: "sbml".into(),
            attribute: "level".into(),
            value: level.to_string(),
        });
    }

    let packages = root
        .attributes
        .iter()
        .filter(|(key, _)| key.starts_with("xmlns:"))
        .filter_map(|(_, ns)| Package::from_namespace(ns))
        .collect();

    let model = root.child("model").map(map_model).transpose()?;
    let model_definitions = root
        .list("listOfModelDefinitions")
        .into_iter()
        .map(map_model)
        .collect::<Result<Vec<_>, _>>()?;
    let external_model_definitions = root
        .list("listOfExternalModelDefinitions")
        .into_iter()
        .map(map_external_model_definition)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SbmlDocument {
        level,
        version,
        packages,
        model,
        model_definitions,
        external_model_definitions,
    })
}

/// Reads an SBML file.
pub fn read_sbml_file(path: impl AsRef<Path>) -> Result<SbmlDocument, SBMLError> {
    let xml = std::fs::read_to_string(path.as_ref())?;
    read_sbml(&xml)
}

fn required<'a>(element: &'a XmlElement, attribute: &str) -> Result<&'a str, SBMLError> {
    element
        .attr(attribute)
        .ok_or_else(|| SBMLError::MissingAttribute {
            element: element.local_name().to_string(),
            attribute: attribute.to_string(),
        })
}

fn opt_string(element: &XmlElement, attribute: &str) -> Option<String> {
    element.attr(attribute).map(str::to_string)
}

fn parse_attr<T: FromStr>(element: &XmlElement, attribute: &str) -> Result<Option<T>, SBMLError> {
    element
        .attr(attribute)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| SBMLError::InvalidAttribute {
                element: element.local_name().to_string(),
                attribute: attribute.to_string(),
                value: raw.to_string(),
            })
        })
        .transpose()
}

/// SBML doubles, including `INF`, `-INF` and `NaN`.
fn parse_f64(element: &XmlElement, attribute: &str) -> Result<Option<f64>, SBMLError> {
    match element.attr(attribute).map(str::trim) {
        None => Ok(None),
        Some("INF") => Ok(Some(f64::INFINITY)),
        Some("-INF") => Ok(Some(f64::NEG_INFINITY)),
        Some("NaN") => Ok(Some(f64::NAN)),
        Some(_) => parse_attr::<f64>(element, attribute),
    }
}

fn parse_bool(element: &XmlElement, attribute: &str, default: bool) -> Result<bool, SBMLError> {
    match element.attr(attribute).map(str::trim) {
        None => Ok(default),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(SBMLError::InvalidAttribute {
            element: element.local_name().to_string(),
            attribute: attribute.to_string(),
            value: other.to_string(),
        }),
    }
}

fn math_child(element: &XmlElement) -> Result<Math, SBMLError> {
    let math = element
        .child("math")
        .ok_or_else(|| SBMLError::MissingAttribute {
            element: element.local_name().to_string(),
            attribute: "math".to_string(),
        })?;
    Ok(from_mathml(math)?)
}

fn opt_math_child(element: &XmlElement) -> Result<Option<Math>, SBMLError> {
    element
        .child("math")
        .map(|math| from_mathml(math).map_err(SBMLError::from))
        .transpose()
}

/// Reads the attributes, notes, annotation and package extensions shared by
/// all elements.
fn map_sbase(element: &XmlElement) -> Result<SBase, SBMLError> {
    let (cv_terms, _) = read_annotation(element);

    let replaced_elements = element
        .list("listOfReplacedElements")
        .into_iter()
        .map(|re| {
            Ok(ReplacedElement {
                submodel_ref: required(re, "submodelRef")?.to_string(),
                target: map_target(re)?,
                conversion_factor: opt_string(re, "conversionFactor"),
            })
        })
        .collect::<Result<Vec<_>, SBMLError>>()?;

    let replaced_by = element
        .child("replacedBy")
        .map(|rb| {
            Ok::<_, SBMLError>(ReplacedBy {
                submodel_ref: required(rb, "submodelRef")?.to_string(),
                target: map_target(rb)?,
            })
        })
        .transpose()?;

    let uncertainties = element
        .list("listOfUncertainties")
        .into_iter()
        .map(map_uncertainty)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SBase {
        id: opt_string(element, "id"),
        name: opt_string(element, "name"),
        metaid: opt_string(element, "metaid"),
        sbo_term: opt_string(element, "sboTerm"),
        notes: element
            .child("notes")
            .and_then(|notes| notes.elements().next().cloned()),
        cv_terms,
        replaced_elements,
        replaced_by,
        uncertainties,
    })
}

fn map_target(element: &XmlElement) -> Result<RefTarget, SBMLError> {
    let candidates: [(&str, fn(String) -> RefTarget); 4] = [
        ("portRef", RefTarget::Port),
        ("idRef", RefTarget::Id),
        ("unitRef", RefTarget::Unit),
        ("metaIdRef", RefTarget::MetaId),
    ];
    candidates
        .into_iter()
        .find_map(|(attribute, make)| element.attr(attribute).map(|v| make(v.to_string())))
        .ok_or_else(|| SBMLError::MissingAttribute {
            element: element.local_name().to_string(),
            attribute: "portRef|idRef|unitRef|metaIdRef".to_string(),
        })
}

/// CV terms and model history of the element's RDF annotation.
fn read_annotation(element: &XmlElement) -> (Vec<CvTerm>, Option<ModelHistory>) {
    let Some(description) = element
        .child("annotation")
        .and_then(|a| a.child("RDF"))
        .and_then(|rdf| rdf.child("Description"))
    else {
        return (Vec::new(), None);
    };

    let mut cv_terms = Vec::new();
    let mut history = ModelHistory::default();
    let mut has_history = false;

    for entry in description.elements() {
        match entry.local_name() {
            "creator" => {
                has_history = true;
                let items = entry
                    .child("Bag")
                    .map(|bag| bag.elements().collect::<Vec<_>>())
                    .unwrap_or_default();
                for li in items {
                    let name = li.child("hasName");
                    let text = |parent: Option<&XmlElement>, child: &str| {
                        parent.and_then(|p| p.child(child)).map(|c| c.text())
                    };
                    history.creators.push(Creator {
                        family_name: text(name, "family-name").unwrap_or_default(),
                        given_name: text(name, "given-name").unwrap_or_default(),
                        email: text(Some(li), "hasEmail"),
                        organization: text(Some(li), "organization-name"),
                    });
                }
            }
            "created" => {
                has_history = true;
                history.created = entry.text();
            }
            "modified" => {
                has_history = true;
                history.modified.push(entry.text());
            }
            _ => match Qualifier::from_rdf_element(&entry.name) {
                Some(qualifier) => {
                    let resources = entry
                        .child("Bag")
                        .map(|bag| {
                            bag.elements()
                                .filter_map(|li| li.attr("rdf:resource").map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    cv_terms.push(CvTerm {
                        qualifier,
                        resources,
                    });
                }
                None => log::debug!("Skipping RDF element <{}>", entry.name),
            },
        }
    }

    (cv_terms, has_history.then_some(history))
}

fn map_model(element: &XmlElement) -> Result<Model, SBMLError> {
    let (_, history) = read_annotation(element);

    let objectives_list = element.child("listOfObjectives");

    Ok(Model {
        sbase: map_sbase(element)?,
        substance_units: opt_string(element, "substanceUnits"),
        time_units: opt_string(element, "timeUnits"),
        volume_units: opt_string(element, "volumeUnits"),
        area_units: opt_string(element, "areaUnits"),
        length_units: opt_string(element, "lengthUnits"),
        extent_units: opt_string(element, "extentUnits"),
        conversion_factor: opt_string(element, "conversionFactor"),
        history,
        function_definitions: map_list(element, "listOfFunctionDefinitions", |fd| {
            Ok(FunctionDefinition {
                sbase: map_sbase(fd)?,
                math: math_child(fd)?,
            })
        })?,
        unit_definitions: map_list(element, "listOfUnitDefinitions", map_unit_definition)?,
        compartments: map_list(element, "listOfCompartments", map_compartment)?,
        species: map_list(element, "listOfSpecies", map_species)?,
        parameters: map_list(element, "listOfParameters", |p| {
            Ok(Parameter {
                sbase: map_sbase(p)?,
                value: parse_f64(p, "value")?,
                units: opt_string(p, "units"),
                constant: parse_bool(p, "constant", true)?,
            })
        })?,
        initial_assignments: map_list(element, "listOfInitialAssignments", |ia| {
            Ok(InitialAssignment {
                sbase: map_sbase(ia)?,
                symbol: required(ia, "symbol")?.to_string(),
                math: math_child(ia)?,
            })
        })?,
        rules: map_list(element, "listOfRules", map_rule)?,
        constraints: map_list(element, "listOfConstraints", |c| {
            Ok(Constraint {
                sbase: map_sbase(c)?,
                math: math_child(c)?,
                message: c.child("message").map(|m| m.text()),
            })
        })?,
        reactions: map_list(element, "listOfReactions", map_reaction)?,
        events: map_list(element, "listOfEvents", map_event)?,
        submodels: map_list(element, "listOfSubmodels", map_submodel)?,
        ports: map_list(element, "listOfPorts", |p| {
            Ok(Port {
                sbase: map_sbase(p)?,
                target: map_target(p)?,
            })
        })?,
        fbc_strict: parse_bool(element, "strict", false)?,
        objectives: map_list(element, "listOfObjectives", map_objective)?,
        active_objective: objectives_list.and_then(|l| opt_string(l, "activeObjective")),
        gene_products: map_list(element, "listOfGeneProducts", |gp| {
            Ok(GeneProduct {
                sbase: map_sbase(gp)?,
                label: required(gp, "label")?.to_string(),
                associated_species: opt_string(gp, "associatedSpecies"),
            })
        })?,
    })
}

fn map_list<T>(
    element: &XmlElement,
    list: &str,
    map: impl Fn(&XmlElement) -> Result<T, SBMLError>,
) -> Result<Vec<T>, SBMLError> {
    element.list(list).into_iter().map(map).collect()
}

fn map_unit_definition(element: &XmlElement) -> Result<UnitDefinition, SBMLError> {
    let units = map_list(element, "listOfUnits", |unit| {
        let kind = UnitKind::from_str(required(unit, "kind")?)?;
        Ok(Unit::new(
            kind,
            parse_f64(unit, "exponent")?.unwrap_or(1.0),
            parse_attr::<i32>(unit, "scale")?.unwrap_or(0),
            parse_f64(unit, "multiplier")?.unwrap_or(1.0),
        ))
    })?;
    Ok(UnitDefinition {
        sbase: map_sbase(element)?,
        units,
    })
}

fn map_compartment(element: &XmlElement) -> Result<Compartment, SBMLError> {
    Ok(Compartment {
        sbase: map_sbase(element)?,
        spatial_dimensions: parse_f64(element, "spatialDimensions")?,
        size: parse_f64(element, "size")?,
        units: opt_string(element, "units"),
        constant: parse_bool(element, "constant", true)?,
    })
}

fn map_species(element: &XmlElement) -> Result<Species, SBMLError> {
    Ok(Species {
        sbase: map_sbase(element)?,
        compartment: required(element, "compartment")?.to_string(),
        initial_amount: parse_f64(element, "initialAmount")?,
        initial_concentration: parse_f64(element, "initialConcentration")?,
        substance_units: opt_string(element, "substanceUnits"),
        has_only_substance_units: parse_bool(element, "hasOnlySubstanceUnits", false)?,
        boundary_condition: parse_bool(element, "boundaryCondition", false)?,
        constant: parse_bool(element, "constant", false)?,
        conversion_factor: opt_string(element, "conversionFactor"),
        charge: parse_attr::<i32>(element, "charge")?,
        chemical_formula: opt_string(element, "chemicalFormula"),
    })
}

fn map_rule(element: &XmlElement) -> Result<Rule, SBMLError> {
    let kind = match element.local_name() {
        "assignmentRule" => RuleKind::Assignment,
        "rateRule" => RuleKind::Rate,
        "algebraicRule" => RuleKind::Algebraic,
        other => {
            return Err(SBMLError::XmlError(format!(
                "unexpected <{other}> in listOfRules"
            )))
        }
    };
    let variable = match kind {
        RuleKind::Algebraic => None,
        _ => Some(required(element, "variable")?.to_string()),
    };
    Ok(Rule {
        sbase: map_sbase(element)?,
        kind,
        variable,
        math: math_child(element)?,
    })
}

fn map_species_reference(element: &XmlElement) -> Result<SpeciesReference, SBMLError> {
    Ok(SpeciesReference {
        sbase: map_sbase(element)?,
        species: required(element, "species")?.to_string(),
        stoichiometry: parse_f64(element, "stoichiometry")?,
        constant: parse_bool(element, "constant", true)?,
    })
}

fn map_association(element: &XmlElement) -> Result<Association, SBMLError> {
    match element.local_name() {
        "geneProductRef" => Ok(Association::GeneProduct(
            required(element, "geneProduct")?.to_string(),
        )),
        "and" => Ok(Association::And(
            element.elements().map(map_association).collect::<Result<_, _>>()?,
        )),
        "or" => Ok(Association::Or(
            element.elements().map(map_association).collect::<Result<_, _>>()?,
        )),
        other => Err(SBMLError::XmlError(format!(
            "unexpected <{other}> in geneProductAssociation"
        ))),
    }
}

fn map_reaction(element: &XmlElement) -> Result<Reaction, SBMLError> {
    let kinetic_law = element
        .child("kineticLaw")
        .map(|law| {
            Ok::<_, SBMLError>(KineticLaw {
                sbase: map_sbase(law)?,
                math: math_child(law)?,
                local_parameters: map_list(law, "listOfLocalParameters", |lp| {
                    Ok(LocalParameter {
                        sbase: map_sbase(lp)?,
                        value: parse_f64(lp, "value")?,
                        units: opt_string(lp, "units"),
                    })
                })?,
            })
        })
        .transpose()?;

    let gene_product_association = element
        .child("geneProductAssociation")
        .and_then(|gpa| gpa.elements().next())
        .map(map_association)
        .transpose()?;

    Ok(Reaction {
        sbase: map_sbase(element)?,
        reversible: parse_bool(element, "reversible", false)?,
        fast: parse_bool(element, "fast", false)?,
        compartment: opt_string(element, "compartment"),
        reactants: map_list(element, "listOfReactants", map_species_reference)?,
        products: map_list(element, "listOfProducts", map_species_reference)?,
        modifiers: map_list(element, "listOfModifiers", |m| {
            Ok(ModifierSpeciesReference {
                sbase: map_sbase(m)?,
                species: required(m, "species")?.to_string(),
            })
        })?,
        kinetic_law,
        lower_flux_bound: opt_string(element, "lowerFluxBound"),
        upper_flux_bound: opt_string(element, "upperFluxBound"),
        gene_product_association,
    })
}

fn map_event(element: &XmlElement) -> Result<Event, SBMLError> {
    let trigger = element
        .child("trigger")
        .ok_or_else(|| SBMLError::MissingAttribute {
            element: "event".into(),
            attribute: "trigger".into(),
        })?;

    Ok(Event {
        sbase: map_sbase(element)?,
        use_values_from_trigger_time: parse_bool(element, "useValuesFromTriggerTime", true)?,
        trigger: Trigger {
            initial_value: parse_bool(trigger, "initialValue", true)?,
            persistent: parse_bool(trigger, "persistent", true)?,
            math: math_child(trigger)?,
        },
        priority: element.child("priority").map(math_child).transpose()?,
        delay: element.child("delay").map(math_child).transpose()?,
        assignments: map_list(element, "listOfEventAssignments", |ea| {
            Ok(EventAssignment {
                sbase: map_sbase(ea)?,
                variable: required(ea, "variable")?.to_string(),
                math: math_child(ea)?,
            })
        })?,
    })
}

fn map_submodel(element: &XmlElement) -> Result<Submodel, SBMLError> {
    Ok(Submodel {
        sbase: map_sbase(element)?,
        model_ref: required(element, "modelRef")?.to_string(),
        time_conversion_factor: opt_string(element, "timeConversionFactor"),
        extent_conversion_factor: opt_string(element, "extentConversionFactor"),
        deletions: map_list(element, "listOfDeletions", |d| {
            Ok(Deletion {
                sbase: map_sbase(d)?,
                target: map_target(d)?,
            })
        })?,
    })
}

fn map_objective(element: &XmlElement) -> Result<Objective, SBMLError> {
    let objective_type = match required(element, "type")? {
        "maximize" => ObjectiveType::Maximize,
        "minimize" => ObjectiveType::Minimize,
        other => {
            return Err(SBMLError::InvalidAttribute {
                element: "objective".into(),
                attribute: "type".into(),
                value: other.to_string(),
            })
        }
    };
    Ok(Objective {
        sbase: map_sbase(element)?,
        objective_type,
        flux_objectives: map_list(element, "listOfFluxObjectives", |fo| {
            Ok(FluxObjective {
                sbase: map_sbase(fo)?,
                reaction: required(fo, "reaction")?.to_string(),
                coefficient: parse_f64(fo, "coefficient")?.unwrap_or(1.0),
            })
        })?,
    })
}

fn map_external_model_definition(
    element: &XmlElement,
) -> Result<ExternalModelDefinition, SBMLError> {
    Ok(ExternalModelDefinition {
        sbase: map_sbase(element)?,
        source: required(element, "source")?.to_string(),
        model_ref: opt_string(element, "modelRef"),
        md5: opt_string(element, "md5"),
    })
}

fn map_uncertainty(element: &XmlElement) -> Result<Uncertainty, SBMLError> {
    let parameters = element
        .elements()
        .filter(|e| matches!(e.local_name(), "uncertParameter" | "uncertSpan"))
        .map(map_uncert_parameter)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Uncertainty {
        sbase: map_sbase(element)?,
        parameters,
    })
}

fn map_uncert_parameter(element: &XmlElement) -> Result<UncertParameter, SBMLError> {
    let kind = required(element, "type")?;
    let invalid = || SBMLError::InvalidAttribute {
        element: element.local_name().to_string(),
        attribute: "type".into(),
        value: kind.to_string(),
    };

    if element.local_name() == "uncertSpan" {
        return Ok(UncertParameter::Span {
            statistic: SpanStatistic::parse(kind).ok_or_else(invalid)?,
            value_lower: parse_f64(element, "valueLower")?,
            var_lower: opt_string(element, "varLower"),
            value_upper: parse_f64(element, "valueUpper")?,
            var_upper: opt_string(element, "varUpper"),
            units: opt_string(element, "units"),
        });
    }

    if kind == "distribution" {
        let math = opt_math_child(element)?.ok_or_else(|| SBMLError::MissingAttribute {
            element: "uncertParameter".into(),
            attribute: "math".into(),
        })?;
        return Ok(UncertParameter::Distribution {
            definition_url: opt_string(element, "definitionURL").unwrap_or_default(),
            math,
        });
    }

    Ok(UncertParameter::Point {
        statistic: PointStatistic::parse(kind).ok_or_else(invalid)?,
        value: parse_f64(element, "value")?,
        var: opt_string(element, "var"),
        units: opt_string(element, "units"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parse_formula;
    use crate::sbml::write_sbml;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1">
  <model id="m">
    <listOfCompartments>
      <compartment id="c" size="1" constant="true"/>
    </listOfCompartments>
    <listOfSpecies>
      <species id="A" compartment="c" initialConcentration="1.5" hasOnlySubstanceUnits="false" boundaryCondition="false" constant="false"/>
    </listOfSpecies>
    <listOfReactions>
      <reaction id="R1" reversible="false">
        <listOfReactants>
          <speciesReference species="A" stoichiometry="1" constant="true"/>
        </listOfReactants>
        <kineticLaw>
          <math xmlns="http://www.w3.org/1998/Math/MathML">
            <apply><times/><ci> k </ci><ci> A </ci></apply>
          </math>
          <listOfLocalParameters>
            <localParameter id="k" value="0.1"/>
          </listOfLocalParameters>
        </kineticLaw>
      </reaction>
    </listOfReactions>
  </model>
</sbml>"#;

    #[test]
    fn test_read_minimal() {
        let doc = read_sbml(MINIMAL).unwrap();
        let model = doc.model.unwrap();
        assert_eq!(model.sbase.id(), "m");
        assert_eq!(model.species("A").unwrap().initial_concentration, Some(1.5));
        let law = model.reactions[0].kinetic_law.as_ref().unwrap();
        assert_eq!(law.math, parse_formula("k * A").unwrap());
        assert_eq!(law.local_parameters[0].value, Some(0.1));
    }

    #[test]
    fn test_not_sbml() {
        assert!(matches!(
            read_sbml("<html/>"),
            Err(SBMLError::NotSbml(name)) if name == "html"
        ));
    }

    #[test]
    fn test_missing_required_attribute() {
        let xml = MINIMAL.replace(r#"compartment="c" initialConcentration"#, "initialConcentration");
        assert!(matches!(
            read_sbml(&xml),
            Err(SBMLError::MissingAttribute { attribute, .. }) if attribute == "compartment"
        ));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let doc = read_sbml(MINIMAL).unwrap();
        let written = write_sbml(&doc).unwrap();
        let reread = read_sbml(&written).unwrap();
        assert_eq!(reread, doc);
        assert_eq!(write_sbml(&reread).unwrap(), written);
    }
}

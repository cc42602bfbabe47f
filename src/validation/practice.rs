//! Modeling practice heuristics. Findings are warnings or infos and never
//! invalidate a document.

use std::collections::HashSet;

use crate::sbml::{Model, Package, SbmlDocument};
use crate::validation::consistency::{Category, Report, Severity, ValidationResult};

pub(crate) fn check_practice(doc: &SbmlDocument, model: &Model, report: &mut Report) {
    let mut add = |severity: Severity, sid: Option<&str>, message: String| {
        report.add_result(ValidationResult::new(
            severity,
            Category::ModelingPractice,
            sid,
            message,
        ))
    };

    if doc.has_package(Package::Fbc) && !model.reactions.is_empty() {
        if model.objectives.is_empty() {
            add(
                Severity::Warning,
                Some(model.sbase.id()),
                "FBC model without objective".to_string(),
            );
        }
        for objective in &model.objectives {
            if objective.flux_objectives.is_empty() {
                add(
                    Severity::Warning,
                    Some(objective.sbase.id()),
                    format!("Objective '{}' has no flux objectives", objective.sbase.id()),
                );
            }
        }
    }

    let used = used_symbols(model);
    for parameter in &model.parameters {
        let sid = parameter.sbase.id();
        if !used.contains(sid) {
            add(
                Severity::Warning,
                Some(sid),
                format!("Parameter '{sid}' is not used"),
            );
        }
        if parameter.value.is_none() && !model.is_assignment_target(sid) {
            add(
                Severity::Warning,
                Some(sid),
                format!("Parameter '{sid}' has neither a value nor an assignment"),
            );
        }
        if parameter.units.is_none() {
            add(
                Severity::Info,
                Some(sid),
                format!("Parameter '{sid}' has no units"),
            );
        }
    }

    for compartment in &model.compartments {
        let sid = compartment.sbase.id();
        if compartment.size.is_none() && !model.is_assignment_target(sid) {
            add(
                Severity::Warning,
                Some(sid),
                format!("Compartment '{sid}' has neither a size nor an assignment"),
            );
        }
    }

    let reactive: HashSet<&str> = model
        .reactions
        .iter()
        .flat_map(|r| r.species_references())
        .map(|sr| sr.species.as_str())
        .collect();
    for species in &model.species {
        let sid = species.sbase.id();
        if species.constant && !species.boundary_condition && reactive.contains(sid) {
            add(
                Severity::Warning,
                Some(sid),
                format!(
                    "Species '{sid}' is constant and takes part in reactions without a boundary condition"
                ),
            );
        }
        if species.boundary_condition && !reactive.contains(sid) && !model.reactions.is_empty() {
            add(
                Severity::Info,
                Some(sid),
                format!("Boundary species '{sid}' takes part in no reaction"),
            );
        }
        if species.has_only_substance_units && species.initial_concentration.is_some() {
            add(
                Severity::Info,
                Some(sid),
                format!(
                    "Species '{sid}' has only substance units but an initial concentration"
                ),
            );
        }
        if species.initial_amount.is_none()
            && species.initial_concentration.is_none()
            && !model.is_assignment_target(sid)
        {
            add(
                Severity::Warning,
                Some(sid),
                format!("Species '{sid}' has no initial amount or concentration"),
            );
        }
    }

    if !doc.has_package(Package::Fbc) {
        for reaction in &model.reactions {
            if reaction.kinetic_law.is_none() {
                add(
                    Severity::Warning,
                    Some(reaction.sbase.id()),
                    format!("Reaction '{}' has no kinetic law", reaction.sbase.id()),
                );
            }
        }
    }

    if model.time_units.is_none() && (!model.rules.is_empty() || !model.reactions.is_empty()) {
        add(
            Severity::Info,
            Some(model.sbase.id()),
            "Model has no time units".to_string(),
        );
    }
}

/// Symbols referenced anywhere outside their own declaration.
fn used_symbols(model: &Model) -> HashSet<&str> {
    let mut used = HashSet::new();

    model.for_each_math(&mut |_, _, math| {
        math.walk(&mut |node| {
            if let crate::math::Math::Ident(id) = node {
                used.insert(id.as_str());
            }
        });
    });
    for rule in &model.rules {
        used.extend(rule.variable.as_deref());
    }
    used.extend(model.initial_assignments.iter().map(|ia| ia.symbol.as_str()));
    used.extend(model.conversion_factor.as_deref());
    for species in &model.species {
        used.extend(species.conversion_factor.as_deref());
    }
    for reaction in &model.reactions {
        used.extend(reaction.lower_flux_bound.as_deref());
        used.extend(reaction.upper_flux_bound.as_deref());
    }
    for event in &model.events {
        used.extend(event.assignments.iter().map(|ea| ea.variable.as_str()));
    }
    for submodel in &model.submodels {
        used.extend(submodel.time_conversion_factor.as_deref());
        used.extend(submodel.extent_conversion_factor.as_deref());
    }
    model.for_each_sbase(&mut |_, sbase| {
        for replaced in &sbase.replaced_elements {
            used.extend(replaced.conversion_factor.as_deref());
        }
        for uncertainty in &sbase.uncertainties {
            for parameter in &uncertainty.parameters {
                used.extend(parameter.vars());
            }
        }
    });
    for port in &model.ports {
        used.insert(port.target.value());
    }

    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parse_formula;
    use crate::sbml::{KineticLaw, Parameter, Reaction, SBase};

    fn parameter(id: &str) -> Parameter {
        Parameter {
            sbase: SBase::with_id(id),
            value: Some(1.0),
            units: Some("dimensionless".to_string()),
            constant: true,
        }
    }

    #[test]
    fn test_unused_parameter() {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            time_units: Some("second".to_string()),
            ..Default::default()
        };
        model.parameters = vec![parameter("k1"), parameter("k2")];
        model.reactions.push(Reaction {
            sbase: SBase::with_id("v1"),
            reversible: false,
            fast: false,
            compartment: None,
            reactants: Vec::new(),
            products: Vec::new(),
            modifiers: Vec::new(),
            kinetic_law: Some(KineticLaw {
                sbase: SBase::default(),
                math: parse_formula("k1").unwrap(),
                local_parameters: Vec::new(),
            }),
            lower_flux_bound: None,
            upper_flux_bound: None,
            gene_product_association: None,
        });
        let doc = SbmlDocument::default();

        let mut report = Report::new();
        check_practice(&doc, &model, &mut report);
        assert!(report.is_valid);
        assert!(report.filter_results("k1").is_empty());
        assert_eq!(report.filter_results("k2").len(), 1);
    }

    #[test]
    fn test_fbc_model_without_objective() {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            ..Default::default()
        };
        model.reactions.push(Reaction {
            sbase: SBase::with_id("R1"),
            reversible: true,
            fast: false,
            compartment: None,
            reactants: Vec::new(),
            products: Vec::new(),
            modifiers: Vec::new(),
            kinetic_law: None,
            lower_flux_bound: None,
            upper_flux_bound: None,
            gene_product_association: None,
        });
        let mut doc = SbmlDocument::default();
        doc.enable_package(Package::Fbc);

        let mut report = Report::new();
        check_practice(&doc, &model, &mut report);
        let on_model = report.filter_results("m");
        assert!(on_model
            .iter()
            .any(|result| result.message.contains("without objective")));
        assert!(report.filter_results("R1").is_empty());
    }
}

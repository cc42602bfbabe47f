//! Renaming and removal of model elements.

use std::collections::{HashMap, HashSet};

use crate::sbml::{ElementKind, Model, RefTarget, SBase, UncertParameter};

use super::NAMESPACE_SEPARATOR;

/// Id, unit and meta id renames applied to a model.
#[derive(Debug, Clone, Default)]
pub struct Renames {
    pub ids: HashMap<String, String>,
    pub units: HashMap<String, String>,
    pub metaids: HashMap<String, String>,
}

impl Renames {
    /// Renames placing every element of `model` into the namespace of
    /// `prefix`.
    pub fn prefixed(model: &Model, prefix: &str) -> Self {
        let mut renames = Renames::default();
        let namespaced = |id: &str| format!("{prefix}{NAMESPACE_SEPARATOR}{id}");
        model.for_each_sbase(&mut |kind, sbase| {
            if let Some(id) = sbase.id.as_deref() {
                match kind {
                    ElementKind::Model | ElementKind::LocalParameter => {}
                    ElementKind::UnitDefinition => {
                        renames.units.insert(id.to_string(), namespaced(id));
                    }
                    _ => {
                        renames.ids.insert(id.to_string(), namespaced(id));
                    }
                }
            }
            if let Some(metaid) = sbase.metaid.as_deref() {
                if kind != ElementKind::Model {
                    renames.metaids.insert(metaid.to_string(), namespaced(metaid));
                }
            }
        });
        renames
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.units.is_empty() && self.metaids.is_empty()
    }

    fn id(&self, id: &mut String) {
        if let Some(new) = self.ids.get(id.as_str()) {
            *id = new.clone();
        }
    }

    fn opt_id(&self, id: &mut Option<String>) {
        if let Some(id) = id.as_mut() {
            self.id(id);
        }
    }

    fn unit(&self, unit: &mut Option<String>) {
        if let Some(unit) = unit.as_mut() {
            if let Some(new) = self.units.get(unit.as_str()) {
                *unit = new.clone();
            }
        }
    }

    fn target(&self, target: &mut RefTarget) {
        match target {
            RefTarget::Id(id) => self.id(id),
            RefTarget::Unit(unit) => {
                if let Some(new) = self.units.get(unit.as_str()) {
                    *unit = new.clone();
                }
            }
            RefTarget::MetaId(metaid) => {
                if let Some(new) = self.metaids.get(metaid.as_str()) {
                    *metaid = new.clone();
                }
            }
            RefTarget::Port(_) => {}
        }
    }
}

/// Renames the declared ids and meta ids of the model's elements. The model
/// itself keeps its id.
pub fn rename_declarations(model: &mut Model, renames: &Renames) {
    model.for_each_sbase_mut(&mut |kind, sbase| {
        if kind == ElementKind::Model {
            return;
        }
        if let Some(id) = sbase.id.as_mut() {
            let table = match kind {
                ElementKind::LocalParameter => None,
                ElementKind::UnitDefinition => Some(&renames.units),
                _ => Some(&renames.ids),
            };
            if let Some(new) = table.and_then(|t| t.get(id.as_str())) {
                *id = new.clone();
            }
        }
        if let Some(metaid) = sbase.metaid.as_mut() {
            if let Some(new) = renames.metaids.get(metaid.as_str()) {
                *metaid = new.clone();
            }
        }
    });
}

/// Rewrites every reference of the model: attributes, math and comp
/// references. Local parameters shadow renamed ids inside their kinetic law.
pub fn rename_references(model: &mut Model, renames: &Renames) {
    if renames.is_empty() {
        return;
    }

    renames.opt_id(&mut model.conversion_factor);
    for unit in [
        &mut model.substance_units,
        &mut model.time_units,
        &mut model.volume_units,
        &mut model.area_units,
        &mut model.length_units,
        &mut model.extent_units,
    ] {
        renames.unit(unit);
    }

    for compartment in model.compartments.iter_mut() {
        renames.unit(&mut compartment.units);
    }
    for species in model.species.iter_mut() {
        renames.id(&mut species.compartment);
        renames.unit(&mut species.substance_units);
        renames.opt_id(&mut species.conversion_factor);
    }
    for parameter in model.parameters.iter_mut() {
        renames.unit(&mut parameter.units);
    }
    for ia in model.initial_assignments.iter_mut() {
        renames.id(&mut ia.symbol);
    }
    for rule in model.rules.iter_mut() {
        renames.opt_id(&mut rule.variable);
    }
    for event in model.events.iter_mut() {
        for ea in event.assignments.iter_mut() {
            renames.id(&mut ea.variable);
        }
    }

    for reaction in model.reactions.iter_mut() {
        renames.opt_id(&mut reaction.compartment);
        for sr in reaction.reactants.iter_mut().chain(reaction.products.iter_mut()) {
            renames.id(&mut sr.species);
        }
        for modifier in reaction.modifiers.iter_mut() {
            renames.id(&mut modifier.species);
        }
        renames.opt_id(&mut reaction.lower_flux_bound);
        renames.opt_id(&mut reaction.upper_flux_bound);
        if let Some(association) = reaction.gene_product_association.as_mut() {
            association.rename(&|id| renames.ids.get(id).cloned());
        }
        if let Some(law) = reaction.kinetic_law.as_mut() {
            for lp in law.local_parameters.iter_mut() {
                renames.unit(&mut lp.units);
            }
            let locals: HashSet<&str> = law
                .local_parameters
                .iter()
                .filter_map(|lp| lp.sbase.id.as_deref())
                .collect();
            if locals.is_empty() {
                law.math.rename_symbols(&renames.ids);
            } else {
                let visible: HashMap<String, String> = renames
                    .ids
                    .iter()
                    .filter(|(id, _)| !locals.contains(id.as_str()))
                    .map(|(id, new)| (id.clone(), new.clone()))
                    .collect();
                law.math.rename_symbols(&visible);
            }
            law.math.rename_units(&renames.units);
        }
    }

    model.for_each_math_mut(&mut |kind, math| {
        if kind != ElementKind::KineticLaw {
            math.rename_symbols(&renames.ids);
            math.rename_units(&renames.units);
        }
    });

    for submodel in model.submodels.iter_mut() {
        renames.opt_id(&mut submodel.time_conversion_factor);
        renames.opt_id(&mut submodel.extent_conversion_factor);
    }
    for port in model.ports.iter_mut() {
        renames.target(&mut port.target);
    }
    for objective in model.objectives.iter_mut() {
        for flux in objective.flux_objectives.iter_mut() {
            renames.id(&mut flux.reaction);
        }
    }
    renames.opt_id(&mut model.active_objective);
    for gene_product in model.gene_products.iter_mut() {
        renames.opt_id(&mut gene_product.associated_species);
    }

    model.for_each_sbase_mut(&mut |_, sbase| {
        for replaced in sbase.replaced_elements.iter_mut() {
            renames.opt_id(&mut replaced.conversion_factor);
        }
        for uncertainty in sbase.uncertainties.iter_mut() {
            for parameter in uncertainty.parameters.iter_mut() {
                match parameter {
                    UncertParameter::Point { var, units, .. } => {
                        renames.opt_id(var);
                        renames.unit(units);
                    }
                    UncertParameter::Span {
                        var_lower,
                        var_upper,
                        units,
                        ..
                    } => {
                        renames.opt_id(var_lower);
                        renames.opt_id(var_upper);
                        renames.unit(units);
                    }
                    UncertParameter::Distribution { .. } => {}
                }
            }
        }
    });
}

/// Removes every element for which `remove` holds, including nested
/// species references, local parameters and event assignments.
pub fn remove_elements(model: &mut Model, remove: &impl Fn(&SBase) -> bool) {
    macro_rules! retain {
        ($items:expr) => {
            $items.retain(|item| !remove(&item.sbase))
        };
    }

    retain!(model.function_definitions);
    retain!(model.unit_definitions);
    retain!(model.compartments);
    retain!(model.species);
    retain!(model.parameters);
    retain!(model.initial_assignments);
    retain!(model.rules);
    retain!(model.constraints);
    retain!(model.reactions);
    for reaction in model.reactions.iter_mut() {
        retain!(reaction.reactants);
        retain!(reaction.products);
        retain!(reaction.modifiers);
        if let Some(law) = reaction.kinetic_law.as_mut() {
            retain!(law.local_parameters);
        }
    }
    retain!(model.events);
    for event in model.events.iter_mut() {
        retain!(event.assignments);
    }
    retain!(model.ports);
    retain!(model.objectives);
    for objective in model.objectives.iter_mut() {
        retain!(objective.flux_objectives);
    }
    retain!(model.gene_products);
}

/// Removes the rules, initial assignments and event assignments targeting
/// `id` and the species references to it.
pub fn remove_dependents(model: &mut Model, id: &str) {
    model.rules.retain(|r| r.variable.as_deref() != Some(id));
    model.initial_assignments.retain(|ia| ia.symbol != id);
    for event in model.events.iter_mut() {
        event.assignments.retain(|ea| ea.variable != id);
    }
    for reaction in model.reactions.iter_mut() {
        reaction.reactants.retain(|sr| sr.species != id);
        reaction.products.retain(|sr| sr.species != id);
        reaction.modifiers.retain(|m| m.species != id);
    }
    model
        .objectives
        .iter_mut()
        .for_each(|o| o.flux_objectives.retain(|f| f.reaction != id));
}

/// Clears replacement markup from every element.
pub fn strip_replacements(model: &mut Model) {
    model.for_each_sbase_mut(&mut |_, sbase| {
        sbase.replaced_elements.clear();
        sbase.replaced_by = None;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parse_formula;
    use crate::sbml::{KineticLaw, LocalParameter, Parameter, Reaction, SpeciesReference};
    use pretty_assertions::assert_eq;

    fn parameter(id: &str) -> Parameter {
        Parameter {
            sbase: SBase::with_id(id),
            value: Some(1.0),
            units: None,
            constant: true,
        }
    }

    fn model() -> Model {
        let mut model = Model {
            sbase: SBase::with_id("child"),
            parameters: vec![parameter("k"), parameter("S")],
            ..Default::default()
        };
        model.reactions.push(Reaction {
            sbase: SBase::with_id("v"),
            reversible: false,
            fast: false,
            compartment: None,
            reactants: vec![SpeciesReference {
                sbase: SBase::default(),
                species: "S".to_string(),
                stoichiometry: Some(1.0),
                constant: true,
            }],
            products: Vec::new(),
            modifiers: Vec::new(),
            kinetic_law: Some(KineticLaw {
                sbase: SBase::default(),
                math: parse_formula("k * S").unwrap(),
                local_parameters: vec![LocalParameter {
                    sbase: SBase::with_id("k"),
                    value: Some(2.0),
                    units: None,
                }],
            }),
            lower_flux_bound: None,
            upper_flux_bound: None,
            gene_product_association: None,
        });
        model
    }

    #[test]
    fn test_prefix_respects_local_parameters() {
        let mut model = model();
        let renames = Renames::prefixed(&model, "sub");
        rename_declarations(&mut model, &renames);
        rename_references(&mut model, &renames);

        assert_eq!(model.sbase.id(), "child");
        assert_eq!(model.parameters[0].sbase.id(), "sub__k");
        let reaction = &model.reactions[0];
        assert_eq!(reaction.sbase.id(), "sub__v");
        assert_eq!(reaction.reactants[0].species, "sub__S");

        let law = reaction.kinetic_law.as_ref().unwrap();
        assert_eq!(law.local_parameters[0].sbase.id(), "k");
        assert_eq!(law.math.to_string(), "k * sub__S");
    }

    #[test]
    fn test_remove_with_dependents() {
        let mut model = model();
        remove_elements(&mut model, &|sbase| sbase.id.as_deref() == Some("S"));
        remove_dependents(&mut model, "S");
        assert!(model.parameter("S").is_none());
        assert!(model.reactions[0].reactants.is_empty());
    }
}

//! Structural consistency: reference closure, sid uniqueness, rule
//! uniqueness, cycles between assignments and recursive functions.
//!
//! The free functions are shared with the document builder, which turns
//! their findings into build errors instead of report entries.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use itertools::Itertools;

use crate::math::Math;
use crate::sbml::{ElementKind, Model, Package, RefTarget, RuleKind, SbmlDocument};
use crate::units::UnitKind;
use crate::validation::consistency::{Category, Report, Severity, ValidationResult};

/// A reference to an element that is not declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// Sid of the element holding the reference
    pub sid: String,
    /// Kind of the referenced element
    pub kind: &'static str,
    pub reference: String,
}

/// A sid declared more than once within one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub sid: String,
    pub namespace: String,
}

pub(crate) fn check_structure(doc: &SbmlDocument, model: &Model, report: &mut Report) {
    let mut error = |sid: &str, message: String| {
        report.add_result(ValidationResult::new(
            Severity::Error,
            Category::Structural,
            Some(sid),
            message,
        ))
    };

    for unresolved in unresolved_references(doc, model) {
        error(
            &unresolved.sid,
            format!(
                "'{}' references the undeclared {} '{}'",
                unresolved.sid, unresolved.kind, unresolved.reference
            ),
        );
    }
    for duplicate in duplicate_ids(model) {
        error(
            &duplicate.sid,
            format!("Duplicate {} '{}'", duplicate.namespace, duplicate.sid),
        );
    }
    for variable in multiple_rules(model) {
        error(
            &variable,
            format!("'{variable}' is the target of more than one assignment or rate rule"),
        );
    }
    if let Some(cycle) = assignment_cycle(model) {
        error(
            &cycle[0],
            format!("Cyclic dependency between assignments: {}", cycle.join(" -> ")),
        );
    }
    if let Some(cycle) = function_cycle(model) {
        error(
            &cycle[0],
            format!("Recursive function definitions: {}", cycle.join(" -> ")),
        );
    }

    for species in &model.species {
        if species.compartment.is_empty() {
            error(
                species.sbase.id(),
                format!("Species '{}' has no compartment", species.sbase.id()),
            );
        }
    }
    for rule in &model.rules {
        if rule.kind != RuleKind::Algebraic && rule.variable.is_none() {
            error(
                rule.sbase.id(),
                format!("{} without variable", rule.kind.element_name()),
            );
        }
    }

    for (sid, package) in package_usage(model) {
        if !doc.has_package(package) {
            error(
                &sid,
                format!("'{sid}' uses the '{package}' package, which the document does not enable"),
            );
        }
    }
}

/// Elements using package constructs, with the package they need.
fn package_usage(model: &Model) -> Vec<(String, Package)> {
    let mut usage = Vec::new();

    for species in &model.species {
        if species.charge.is_some() || species.chemical_formula.is_some() {
            usage.push((species.sbase.id().to_string(), Package::Fbc));
        }
    }
    for reaction in &model.reactions {
        if reaction.lower_flux_bound.is_some()
            || reaction.upper_flux_bound.is_some()
            || reaction.gene_product_association.is_some()
        {
            usage.push((reaction.sbase.id().to_string(), Package::Fbc));
        }
    }
    for objective in &model.objectives {
        usage.push((objective.sbase.id().to_string(), Package::Fbc));
    }
    for gene_product in &model.gene_products {
        usage.push((gene_product.sbase.id().to_string(), Package::Fbc));
    }
    for submodel in &model.submodels {
        usage.push((submodel.sbase.id().to_string(), Package::Comp));
    }
    for port in &model.ports {
        usage.push((port.sbase.id().to_string(), Package::Comp));
    }
    model.for_each_sbase(&mut |kind, sbase| {
        if !sbase.replaced_elements.is_empty() || sbase.replaced_by.is_some() {
            usage.push((sbase.id().to_string(), Package::Comp));
        }
        if kind != ElementKind::Uncertainty && !sbase.uncertainties.is_empty() {
            usage.push((sbase.id().to_string(), Package::Distrib));
        }
    });
    model.for_each_math(&mut |_, sid, math| {
        if math.uses_distributions() {
            usage.push((sid.to_string(), Package::Distrib));
        }
    });

    usage.into_iter().unique().collect()
}

/// Identifiers declared in the model, grouped by what may reference them.
pub(crate) struct Symbols<'a> {
    pub units: HashSet<&'a str>,
    pub compartments: HashSet<&'a str>,
    pub species: HashSet<&'a str>,
    pub parameters: HashSet<&'a str>,
    pub reactions: HashSet<&'a str>,
    /// Everything usable as a value in math
    pub values: HashSet<&'a str>,
    pub functions: HashSet<&'a str>,
    pub metaids: HashSet<&'a str>,
    pub all_ids: HashSet<&'a str>,
}

impl<'a> Symbols<'a> {
    pub(crate) fn collect(model: &'a Model) -> Self {
        let ids = |items: Vec<&'a str>| items.into_iter().collect::<HashSet<_>>();

        let compartments = ids(model.compartments.iter().map(|c| c.sbase.id()).collect());
        let species = ids(model.species.iter().map(|s| s.sbase.id()).collect());
        let parameters = ids(model.parameters.iter().map(|p| p.sbase.id()).collect());
        let reactions = ids(model.reactions.iter().map(|r| r.sbase.id()).collect());
        let stoichiometries = model
            .reactions
            .iter()
            .flat_map(|r| r.species_references())
            .filter_map(|sr| sr.sbase.id.as_deref());

        let values = compartments
            .iter()
            .chain(species.iter())
            .chain(parameters.iter())
            .chain(reactions.iter())
            .copied()
            .chain(stoichiometries)
            .collect();

        let mut metaids = HashSet::new();
        let mut all_ids = HashSet::new();
        model.for_each_sbase(&mut |_, sbase| {
            if let Some(metaid) = sbase.metaid.as_deref() {
                metaids.insert(metaid);
            }
            if let Some(id) = sbase.id.as_deref() {
                all_ids.insert(id);
            }
        });

        Self {
            units: model
                .unit_definitions
                .iter()
                .map(|u| u.sbase.id())
                .chain(UnitKind::ALL.iter().map(|k| k.as_str()))
                .collect(),
            compartments,
            species,
            parameters,
            reactions,
            values,
            functions: model
                .function_definitions
                .iter()
                .map(|f| f.sbase.id())
                .collect(),
            metaids,
            all_ids,
        }
    }

    /// Whether `id` can be the target of a rule or assignment.
    pub(crate) fn is_assignable(&self, id: &str) -> bool {
        self.values.contains(id) && !self.reactions.contains(id)
    }
}

/// Collects every reference of the model that does not resolve.
///
/// # Arguments
///
/// * `doc` - The document holding model definitions for submodel references
/// * `model` - The model to check
///
/// # Returns
///
/// The unresolved references in document order.
pub fn unresolved_references(doc: &SbmlDocument, model: &Model) -> Vec<Unresolved> {
    let symbols = Symbols::collect(model);
    let mut unresolved = Vec::new();

    let mut check = |sid: &str, kind: &'static str, reference: &str, known: bool| {
        if !known {
            unresolved.push(Unresolved {
                sid: sid.to_string(),
                kind,
                reference: reference.to_string(),
            });
        }
    };

    let model_id = model.sbase.id();
    for unit in [
        &model.substance_units,
        &model.time_units,
        &model.volume_units,
        &model.area_units,
        &model.length_units,
        &model.extent_units,
    ]
    .into_iter()
    .flatten()
    {
        check(model_id, "unit", unit, symbols.units.contains(unit.as_str()));
    }
    if let Some(factor) = &model.conversion_factor {
        check(model_id, "parameter", factor, symbols.parameters.contains(factor.as_str()));
    }

    for compartment in &model.compartments {
        if let Some(unit) = &compartment.units {
            check(compartment.sbase.id(), "unit", unit, symbols.units.contains(unit.as_str()));
        }
    }
    for species in &model.species {
        let sid = species.sbase.id();
        if !species.compartment.is_empty() {
            check(
                sid,
                "compartment",
                &species.compartment,
                symbols.compartments.contains(species.compartment.as_str()),
            );
        }
        if let Some(unit) = &species.substance_units {
            check(sid, "unit", unit, symbols.units.contains(unit.as_str()));
        }
        if let Some(factor) = &species.conversion_factor {
            check(sid, "parameter", factor, symbols.parameters.contains(factor.as_str()));
        }
    }
    for parameter in &model.parameters {
        if let Some(unit) = &parameter.units {
            check(parameter.sbase.id(), "unit", unit, symbols.units.contains(unit.as_str()));
        }
    }

    for ia in &model.initial_assignments {
        check(&ia.symbol, "symbol", &ia.symbol, symbols.is_assignable(&ia.symbol));
    }
    for rule in &model.rules {
        if let Some(variable) = &rule.variable {
            check(variable, "symbol", variable, symbols.is_assignable(variable));
        }
    }

    for reaction in &model.reactions {
        let rid = reaction.sbase.id();
        if let Some(compartment) = &reaction.compartment {
            check(rid, "compartment", compartment, symbols.compartments.contains(compartment.as_str()));
        }
        for sr in reaction.species_references() {
            check(rid, "species", &sr.species, symbols.species.contains(sr.species.as_str()));
        }
        for modifier in &reaction.modifiers {
            check(rid, "species", &modifier.species, symbols.species.contains(modifier.species.as_str()));
        }
        for bound in [&reaction.lower_flux_bound, &reaction.upper_flux_bound]
            .into_iter()
            .flatten()
        {
            check(rid, "parameter", bound, symbols.parameters.contains(bound.as_str()));
        }
        if let Some(association) = &reaction.gene_product_association {
            for gene_product in association.gene_products() {
                let known = model.gene_products.iter().any(|g| g.sbase.id() == gene_product);
                check(rid, "gene product", gene_product, known);
            }
        }
        if let Some(law) = &reaction.kinetic_law {
            for local in &law.local_parameters {
                if let Some(unit) = &local.units {
                    check(local.sbase.id(), "unit", unit, symbols.units.contains(unit.as_str()));
                }
            }
        }
    }

    for event in &model.events {
        for ea in &event.assignments {
            check(event.sbase.id(), "symbol", &ea.variable, symbols.is_assignable(&ea.variable));
        }
    }

    // math: symbols, user functions and literal units
    let locals: HashMap<&str, HashSet<&str>> = model
        .reactions
        .iter()
        .filter_map(|r| {
            r.kinetic_law.as_ref().map(|law| {
                (
                    r.sbase.id(),
                    law.local_parameters.iter().map(|lp| lp.sbase.id()).collect(),
                )
            })
        })
        .collect();
    // functions may only call functions declared before them
    let mut function_order: HashMap<&str, usize> = HashMap::new();
    for (position, function) in model.function_definitions.iter().enumerate() {
        function_order.entry(function.sbase.id()).or_insert(position);
    }
    model.for_each_math(&mut |kind, sid, math| {
        let bound: HashSet<&str> = match (kind, locals.get(sid)) {
            (ElementKind::KineticLaw, Some(locals)) => locals.clone(),
            _ => HashSet::new(),
        };
        // function bodies only see their own parameters
        if kind == ElementKind::FunctionDefinition {
            check_function_body(sid, math, &function_order, &mut check);
            return;
        }
        for ident in math.identifiers() {
            let known = symbols.values.contains(ident.as_str()) || bound.contains(ident.as_str());
            check(sid, "symbol", &ident, known);
        }
        for call in math.function_calls() {
            check(sid, "function", &call, symbols.functions.contains(call.as_str()));
        }
        for unit in math.unit_refs() {
            check(sid, "unit", &unit, symbols.units.contains(unit.as_str()));
        }
    });

    model.for_each_sbase(&mut |_, sbase| {
        for uncertainty in &sbase.uncertainties {
            for parameter in &uncertainty.parameters {
                for var in parameter.vars() {
                    check(sbase.id(), "symbol", var, symbols.values.contains(var));
                }
                if let Some(unit) = parameter.units() {
                    check(sbase.id(), "unit", unit, symbols.units.contains(unit));
                }
            }
        }
    });

    // fbc
    for objective in &model.objectives {
        for flux in &objective.flux_objectives {
            check(
                objective.sbase.id(),
                "reaction",
                &flux.reaction,
                symbols.reactions.contains(flux.reaction.as_str()),
            );
        }
    }
    if let Some(active) = &model.active_objective {
        let known = model.objectives.iter().any(|o| o.sbase.id() == active);
        check(model_id, "objective", active, known);
    }
    for gene_product in &model.gene_products {
        if let Some(species) = &gene_product.associated_species {
            check(
                gene_product.sbase.id(),
                "species",
                species,
                symbols.species.contains(species.as_str()),
            );
        }
    }

    // comp
    for submodel in &model.submodels {
        let sid = submodel.sbase.id();
        let known = doc.model_definitions.iter().any(|m| m.sbase.id() == submodel.model_ref)
            || doc
                .external_model_definitions
                .iter()
                .any(|e| e.sbase.id() == submodel.model_ref);
        check(sid, "model", &submodel.model_ref, known);
        for factor in [&submodel.time_conversion_factor, &submodel.extent_conversion_factor]
            .into_iter()
            .flatten()
        {
            check(sid, "parameter", factor, symbols.parameters.contains(factor.as_str()));
        }
    }
    for port in &model.ports {
        let known = match &port.target {
            RefTarget::Id(id) => symbols.all_ids.contains(id.as_str()),
            RefTarget::Unit(unit) => model.unit_definition(unit).is_some(),
            RefTarget::MetaId(metaid) => symbols.metaids.contains(metaid.as_str()),
            RefTarget::Port(port_ref) => model.port(port_ref).is_some(),
        };
        check(port.sbase.id(), "port target", port.target.value(), known);
    }
    model.for_each_sbase(&mut |_, sbase| {
        let submodel_refs = sbase
            .replaced_elements
            .iter()
            .map(|re| (re.submodel_ref.as_str(), re.conversion_factor.as_deref()))
            .chain(sbase.replaced_by.iter().map(|rb| (rb.submodel_ref.as_str(), None)));
        for (submodel_ref, factor) in submodel_refs {
            check(sbase.id(), "submodel", submodel_ref, model.submodel(submodel_ref).is_some());
            if let Some(factor) = factor {
                check(sbase.id(), "parameter", factor, symbols.parameters.contains(factor));
            }
        }
    });

    unresolved
}

fn check_function_body(
    sid: &str,
    math: &Math,
    function_order: &HashMap<&str, usize>,
    check: &mut impl FnMut(&str, &'static str, &str, bool),
) {
    for ident in math.identifiers() {
        check(sid, "symbol", &ident, false);
    }
    let position = function_order.get(sid);
    for call in math.function_calls() {
        let known = match (function_order.get(call.as_str()), position) {
            (Some(callee), Some(caller)) => callee < caller,
            _ => false,
        };
        check(sid, "function", &call, known);
    }
}

/// Sids declared more than once in the main namespace, among unit
/// definitions or among the local parameters of one reaction.
pub fn duplicate_ids(model: &Model) -> Vec<Duplicate> {
    let mut seen = HashSet::new();
    let mut units = HashSet::new();
    let mut duplicates = Vec::new();

    model.for_each_sbase(&mut |kind, sbase| {
        let Some(id) = sbase.id.as_deref() else {
            return;
        };
        match kind {
            ElementKind::LocalParameter => {}
            ElementKind::UnitDefinition => {
                if !units.insert(id) {
                    duplicates.push(Duplicate {
                        sid: id.to_string(),
                        namespace: "unit definition".to_string(),
                    });
                }
            }
            _ => {
                if !seen.insert(id) {
                    duplicates.push(Duplicate {
                        sid: id.to_string(),
                        namespace: "sid".to_string(),
                    });
                }
            }
        }
    });

    for reaction in &model.reactions {
        let Some(law) = &reaction.kinetic_law else {
            continue;
        };
        let mut locals = HashSet::new();
        for local in &law.local_parameters {
            if !locals.insert(local.sbase.id()) {
                duplicates.push(Duplicate {
                    sid: local.sbase.id().to_string(),
                    namespace: format!("local parameter of '{}'", reaction.sbase.id()),
                });
            }
        }
    }

    duplicates
}

/// Variables targeted by more than one assignment or rate rule, or by both
/// an assignment rule and an initial assignment.
pub fn multiple_rules(model: &Model) -> Vec<String> {
    let mut targets: BTreeMap<&str, usize> = BTreeMap::new();
    let mut order = Vec::new();

    for rule in &model.rules {
        if let Some(variable) = rule.variable.as_deref() {
            let count = targets.entry(variable).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(variable.to_string());
            }
        }
    }

    let assignment_targets: HashSet<&str> = model
        .rules
        .iter()
        .filter(|r| r.kind == RuleKind::Assignment)
        .filter_map(|r| r.variable.as_deref())
        .collect();
    for ia in &model.initial_assignments {
        if assignment_targets.contains(ia.symbol.as_str()) && !order.contains(&ia.symbol) {
            order.push(ia.symbol.clone());
        }
    }

    order
}

/// Finds a cycle in the dependency graph of assignment rules and initial
/// assignments.
///
/// # Returns
///
/// The cycle as a path starting and ending at the same symbol, or `None`.
pub fn assignment_cycle(model: &Model) -> Option<Vec<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let assignments = model
        .rules
        .iter()
        .filter(|r| r.kind == RuleKind::Assignment)
        .filter_map(|r| r.variable.as_ref().map(|v| (v, &r.math)))
        .chain(model.initial_assignments.iter().map(|ia| (&ia.symbol, &ia.math)));
    for (variable, math) in assignments {
        graph
            .entry(variable.clone())
            .or_default()
            .extend(math.identifiers());
    }
    find_cycle(&graph)
}

/// Finds a cycle in the call graph of the function definitions, including
/// functions calling themselves.
pub fn function_cycle(model: &Model) -> Option<Vec<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for function in &model.function_definitions {
        graph
            .entry(function.sbase.id().to_string())
            .or_default()
            .extend(function.math.function_calls());
    }
    find_cycle(&graph)
}

fn find_cycle(graph: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    let mut done = HashSet::new();
    for start in graph.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = visit(start, graph, &mut path, &mut done) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    graph: &'a BTreeMap<String, BTreeSet<String>>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if let Some(position) = path.iter().position(|n| *n == node) {
        let mut cycle: Vec<String> = path[position..].iter().map(|n| n.to_string()).collect();
        cycle.push(node.to_string());
        return Some(cycle);
    }
    if done.contains(node) {
        return None;
    }

    path.push(node);
    if let Some(edges) = graph.get(node) {
        for next in edges {
            if let Some(cycle) = visit(next, graph, path, done) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    done.insert(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parse_formula;
    use crate::sbml::{
        Compartment, FunctionDefinition, InitialAssignment, Parameter, Rule, SBase, Species,
    };
    use pretty_assertions::assert_eq;

    fn parameter(id: &str) -> Parameter {
        Parameter {
            sbase: SBase::with_id(id),
            value: Some(1.0),
            units: None,
            constant: false,
        }
    }

    fn rule(variable: &str, formula: &str) -> Rule {
        Rule {
            sbase: SBase::default(),
            kind: RuleKind::Assignment,
            variable: Some(variable.to_string()),
            math: parse_formula(formula).unwrap(),
        }
    }

    fn model() -> Model {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            ..Default::default()
        };
        model.compartments.push(Compartment {
            sbase: SBase::with_id("c"),
            spatial_dimensions: Some(3.0),
            size: Some(1.0),
            units: Some("litre".to_string()),
            constant: true,
        });
        model.species.push(Species {
            sbase: SBase::with_id("A"),
            compartment: "c".to_string(),
            initial_amount: Some(1.0),
            initial_concentration: None,
            substance_units: Some("mole".to_string()),
            has_only_substance_units: true,
            boundary_condition: false,
            constant: false,
            conversion_factor: None,
            charge: None,
            chemical_formula: None,
        });
        model.parameters.extend([parameter("a"), parameter("b")]);
        model
    }

    #[test]
    fn test_unresolved_references() {
        let mut model = model();
        model.species[0].compartment = "cyto".to_string();
        model.rules.push(rule("a", "b * x"));
        model.parameters[1].units = Some("mM".to_string());

        let doc = SbmlDocument::default();
        let unresolved = unresolved_references(&doc, &model);
        let found: Vec<_> = unresolved
            .iter()
            .map(|u| (u.sid.as_str(), u.kind, u.reference.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("A", "compartment", "cyto"),
                ("b", "unit", "mM"),
                ("a", "symbol", "x"),
            ]
        );
    }

    #[test]
    fn test_closed_model_resolves() {
        let mut model = model();
        model.rules.push(rule("a", "b * A / c"));
        assert!(unresolved_references(&SbmlDocument::default(), &model).is_empty());
    }

    #[test]
    fn test_duplicate_ids() {
        let mut model = model();
        model.parameters.push(parameter("A"));
        let duplicates = duplicate_ids(&model);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].sid, "A");
    }

    #[test]
    fn test_multiple_rules() {
        let mut model = model();
        model.rules.push(rule("a", "1"));
        model.initial_assignments.push(InitialAssignment {
            sbase: SBase::default(),
            symbol: "a".to_string(),
            math: Math::number(2.0),
        });
        assert_eq!(multiple_rules(&model), vec!["a".to_string()]);
    }

    #[test]
    fn test_assignment_cycle() {
        let mut model = model();
        model.rules.push(rule("a", "b + 1"));
        assert_eq!(assignment_cycle(&model), None);

        model.rules.push(rule("b", "2 * a"));
        assert_eq!(
            assignment_cycle(&model),
            Some(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
    }

    fn function(id: &str, formula: &str) -> FunctionDefinition {
        FunctionDefinition {
            sbase: SBase::with_id(id),
            math: parse_formula(formula).unwrap(),
        }
    }

    #[test]
    fn test_recursive_functions() {
        let mut model = model();
        model.function_definitions.push(function("f", "lambda(x, f(x))"));
        assert_eq!(
            function_cycle(&model),
            Some(vec!["f".to_string(), "f".to_string()])
        );
        let unresolved = unresolved_references(&SbmlDocument::default(), &model);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].kind, "function");

        let mut model = self::model();
        model.function_definitions.push(function("g", "lambda(x, h(x) + 1)"));
        model.function_definitions.push(function("h", "lambda(x, 2 * g(x))"));
        assert_eq!(
            function_cycle(&model),
            Some(vec!["g".to_string(), "h".to_string(), "g".to_string()])
        );
    }

    #[test]
    fn test_function_calls_need_earlier_declaration() {
        let mut model = model();
        model.function_definitions.push(function("double", "lambda(x, twice(x))"));
        model.function_definitions.push(function("twice", "lambda(x, 2 * x)"));
        model.function_definitions.push(function("quad", "lambda(x, double(double(x)))"));
        assert_eq!(function_cycle(&model), None);

        let found: Vec<_> = unresolved_references(&SbmlDocument::default(), &model)
            .into_iter()
            .map(|u| (u.sid, u.reference))
            .collect();
        assert_eq!(found, vec![("double".to_string(), "twice".to_string())]);

        let mut doc = SbmlDocument::default();
        doc.model = Some(model.clone());
        let mut report = Report::new();
        check_structure(&doc, &model, &mut report);
        assert_eq!(report.filter_results("double").len(), 1);
    }

    #[test]
    fn test_distribution_math_requires_distrib() {
        let mut model = model();
        model.initial_assignments.push(InitialAssignment {
            sbase: SBase::default(),
            symbol: "a".to_string(),
            math: parse_formula("normal(0, 1)").unwrap(),
        });
        assert_eq!(
            package_usage(&model),
            vec![("a".to_string(), Package::Distrib)]
        );

        let mut doc = SbmlDocument {
            model: Some(model.clone()),
            ..Default::default()
        };
        let mut report = Report::new();
        check_structure(&doc, &model, &mut report);
        assert_eq!(report.filter_results("a").len(), 1);

        doc.enable_package(Package::Distrib);
        let mut report = Report::new();
        check_structure(&doc, &model, &mut report);
        assert!(report.is_valid);
    }

    #[test]
    fn test_package_usage_requires_enabled_package() {
        let mut model = model();
        model.species[0].charge = Some(-1);
        let doc = SbmlDocument {
            model: Some(model.clone()),
            ..Default::default()
        };
        let mut report = Report::new();
        check_structure(&doc, &model, &mut report);
        assert!(!report.is_valid);
        assert_eq!(report.filter_results("A").len(), 1);
    }
}

//! Units consistency.
//!
//! Every expression is reduced to a [`DerivedUnit`] and compared with the
//! unit its construct expects:
//!
//! | construct | expected unit |
//! |---|---|
//! | kinetic law | extent / time |
//! | initial assignment, assignment rule, event assignment | unit of the target |
//! | rate rule | unit of the target / time |
//!
//! Numbers without units and symbols without declared units are unknown.
//! An expression containing unknowns is only checked where the unknown
//! does not matter, so missing declarations never produce errors.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::math::{Math, Operator};
use crate::sbml::{LocalParameter, Model, RuleKind};
use crate::units::{DerivedUnit, UnitKind, UnitRef};
use crate::validation::consistency::{Category, Report, Severity, ValidationResult};

pub(crate) fn check_units(model: &Model, report: &mut Report) {
    let context = UnitContext::new(model);
    for issue in context.issues() {
        report.add_result(ValidationResult::new(
            Severity::Error,
            Category::Units,
            Some(&issue.sid),
            issue.message,
        ));
    }
}

/// A units inconsistency found in the model.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitIssue {
    pub sid: String,
    pub message: String,
}

/// Unit lookup for the symbols of one model.
pub struct UnitContext<'a> {
    model: &'a Model,
    definitions: HashMap<&'a str, DerivedUnit>,
    /// Function definitions whose bodies are being inlined
    expanding: RefCell<Vec<String>>,
}

impl<'a> UnitContext<'a> {
    pub fn new(model: &'a Model) -> Self {
        let definitions = model
            .unit_definitions
            .iter()
            .map(|ud| (ud.sbase.id(), DerivedUnit::from_units(&ud.units)))
            .collect();
        Self {
            model,
            definitions,
            expanding: RefCell::new(Vec::new()),
        }
    }

    /// Resolves a unit reference to its canonical form.
    pub fn resolve(&self, unit: &str) -> Option<DerivedUnit> {
        match UnitRef::parse(unit).ok()? {
            UnitRef::Kind(kind) => Some(DerivedUnit::from_kind(kind)),
            UnitRef::Definition(id) => self.definitions.get(id.as_str()).cloned(),
        }
    }

    fn resolve_opt(&self, unit: Option<&str>) -> Option<DerivedUnit> {
        unit.and_then(|u| self.resolve(u))
    }

    pub fn time(&self) -> Option<DerivedUnit> {
        self.resolve_opt(self.model.time_units.as_deref())
    }

    fn extent_per_time(&self) -> Option<DerivedUnit> {
        let extent = self.resolve_opt(self.model.extent_units.as_deref())?;
        Some(extent.divide(&self.time()?))
    }

    fn compartment_unit(&self, id: &str) -> Option<DerivedUnit> {
        let compartment = self.model.compartment(id)?;
        if let Some(units) = compartment.units.as_deref() {
            return self.resolve(units);
        }
        let dimensions = compartment.spatial_dimensions.unwrap_or(3.0);
        let default = if dimensions == 3.0 {
            self.model.volume_units.as_deref()
        } else if dimensions == 2.0 {
            self.model.area_units.as_deref()
        } else if dimensions == 1.0 {
            self.model.length_units.as_deref()
        } else if dimensions == 0.0 {
            return Some(DerivedUnit::dimensionless());
        } else {
            None
        };
        self.resolve_opt(default)
    }

    /// Unit of a symbol as it appears in math.
    ///
    /// Species evaluate to concentrations unless they have only substance
    /// units.
    pub fn symbol_unit(&self, id: &str, locals: &[LocalParameter]) -> Option<DerivedUnit> {
        if let Some(local) = locals.iter().find(|lp| lp.sbase.id() == id) {
            return self.resolve_opt(local.units.as_deref());
        }
        if let Some(parameter) = self.model.parameter(id) {
            return self.resolve_opt(parameter.units.as_deref());
        }
        if self.model.compartment(id).is_some() {
            return self.compartment_unit(id);
        }
        if let Some(species) = self.model.species(id) {
            let substance = self.resolve_opt(
                species
                    .substance_units
                    .as_deref()
                    .or(self.model.substance_units.as_deref()),
            )?;
            if species.has_only_substance_units {
                return Some(substance);
            }
            let size = self.compartment_unit(&species.compartment)?;
            return Some(substance.divide(&size));
        }
        if self.model.reaction(id).is_some() {
            return self.extent_per_time();
        }
        let is_stoichiometry = self
            .model
            .reactions
            .iter()
            .flat_map(|r| r.species_references())
            .any(|sr| sr.sbase.id.as_deref() == Some(id));
        if is_stoichiometry {
            return Some(DerivedUnit::dimensionless());
        }
        None
    }

    /// Derives the unit of an expression.
    ///
    /// # Arguments
    ///
    /// * `math` - The expression
    /// * `locals` - Local parameters in scope
    /// * `issues` - Collects inconsistencies found inside the expression
    ///
    /// # Returns
    ///
    /// The derived unit or `None` if it is unknown.
    pub fn derive(
        &self,
        math: &Math,
        locals: &[LocalParameter],
        issues: &mut Vec<String>,
    ) -> Option<DerivedUnit> {
        match math {
            Math::Number { units, .. } => self.resolve_opt(units.as_deref()),
            Math::Ident(id) => self.symbol_unit(id, locals),
            Math::Boolean(_) | Math::Constant(_) => Some(DerivedUnit::dimensionless()),
            Math::Time => self.time(),
            Math::Avogadro => {
                Some(DerivedUnit::dimensionless().divide(&DerivedUnit::from_kind(UnitKind::Mole)))
            }
            Math::Apply { op, args } => self.derive_apply(*op, args, locals, issues),
            Math::Call { name, args } => {
                let Math::Lambda { params, body } = &self.model.function_definition(name)?.math
                else {
                    return None;
                };
                // recursive calls have no unit
                if self.expanding.borrow().contains(name) {
                    return None;
                }
                let mut inlined = (**body).clone();
                for (param, arg) in params.iter().zip(args) {
                    inlined.substitute(param, arg);
                }
                self.expanding.borrow_mut().push(name.clone());
                let unit = self.derive(&inlined, locals, issues);
                self.expanding.borrow_mut().pop();
                unit
            }
            Math::Piecewise { pieces, otherwise } => {
                for (_, condition) in pieces {
                    self.derive(condition, locals, issues);
                }
                let values = pieces
                    .iter()
                    .map(|(value, _)| value)
                    .chain(otherwise.as_deref());
                self.consistent(values, "piecewise", locals, issues)
            }
            Math::Lambda { .. } => None,
        }
    }

    fn derive_apply(
        &self,
        op: Operator,
        args: &[Math],
        locals: &[LocalParameter],
        issues: &mut Vec<String>,
    ) -> Option<DerivedUnit> {
        let derive = |math: &Math, issues: &mut Vec<String>| self.derive(math, locals, issues);

        match op {
            Operator::Plus | Operator::Minus | Operator::Min | Operator::Max => {
                self.consistent(args.iter(), op.infix_name(), locals, issues)
            }
            Operator::Times => {
                let units: Vec<_> = args.iter().map(|arg| derive(arg, issues)).collect();
                units
                    .into_iter()
                    .try_fold(DerivedUnit::dimensionless(), |acc, u| Some(acc.multiply(&u?)))
            }
            Operator::Divide | Operator::Quotient => {
                let numerator = derive(args.first()?, issues);
                let denominator = derive(args.get(1)?, issues);
                Some(numerator?.divide(&denominator?))
            }
            Operator::Power => {
                let base = derive(args.first()?, issues);
                let exponent = args.get(1)?;
                derive(exponent, issues);
                let base = base?;
                if base.is_dimensionless() {
                    return Some(base);
                }
                match exponent {
                    Math::Number { value, .. } => Some(base.powf(*value)),
                    _ => None,
                }
            }
            Operator::Root => {
                let base = derive(args.last()?, issues)?;
                match args {
                    [_] => Some(base.powf(0.5)),
                    [Math::Number { value, .. }, _] if *value != 0.0 => {
                        Some(base.powf(1.0 / value))
                    }
                    _ => None,
                }
            }
            Operator::Abs | Operator::Floor | Operator::Ceiling | Operator::Rem => {
                let first = derive(args.first()?, issues);
                args.iter().skip(1).for_each(|arg| {
                    derive(arg, issues);
                });
                first
            }
            Operator::Delay => {
                let first = derive(args.first()?, issues);
                if let Some(delay) = args.get(1) {
                    derive(delay, issues);
                }
                first
            }
            Operator::RateOf => Some(derive(args.first()?, issues)?.divide(&self.time()?)),
            Operator::Distrib(_) => self.consistent(args.iter().take(2), op.infix_name(), locals, issues),
            op if op.is_relational() => {
                self.consistent(args.iter(), op.infix_name(), locals, issues);
                Some(DerivedUnit::dimensionless())
            }
            _ => {
                // logical, exponential and trigonometric operators
                args.iter().for_each(|arg| {
                    derive(arg, issues);
                });
                Some(DerivedUnit::dimensionless())
            }
        }
    }

    /// Derives the common unit of operands that must agree.
    fn consistent<'m>(
        &self,
        operands: impl Iterator<Item = &'m Math>,
        context: &str,
        locals: &[LocalParameter],
        issues: &mut Vec<String>,
    ) -> Option<DerivedUnit> {
        let mut common: Option<(DerivedUnit, &Math)> = None;
        for operand in operands {
            let Some(unit) = self.derive(operand, locals, issues) else {
                continue;
            };
            match &common {
                None => common = Some((unit, operand)),
                Some((expected, first)) => {
                    if !unit.is_equivalent(expected) {
                        issues.push(format!(
                            "Operands of '{context}' have different units: '{first}' is {expected}, '{operand}' is {unit}"
                        ));
                    }
                }
            }
        }
        common.map(|(unit, _)| unit)
    }

    /// Checks one expression against the unit of its construct.
    fn check(
        &self,
        sid: &str,
        construct: &str,
        math: &Math,
        expected: Option<DerivedUnit>,
        locals: &[LocalParameter],
        issues: &mut Vec<UnitIssue>,
    ) {
        let mut inner = Vec::new();
        let derived = self.derive(math, locals, &mut inner);
        issues.extend(inner.into_iter().map(|message| UnitIssue {
            sid: sid.to_string(),
            message,
        }));

        if let (Some(derived), Some(expected)) = (derived, expected) {
            if !derived.is_equivalent(&expected) {
                issues.push(UnitIssue {
                    sid: sid.to_string(),
                    message: format!(
                        "Units of the {construct} of '{sid}' are {derived}, expected {expected}"
                    ),
                });
            }
        }
    }

    /// Checks every expression of the model.
    pub fn issues(&self) -> Vec<UnitIssue> {
        let model = self.model;
        let mut issues = Vec::new();
        let per_time = |unit: Option<DerivedUnit>| Some(unit?.divide(&self.time()?));

        for ia in &model.initial_assignments {
            let expected = self.symbol_unit(&ia.symbol, &[]);
            self.check(&ia.symbol, "initial assignment", &ia.math, expected, &[], &mut issues);
        }
        for rule in &model.rules {
            let variable = rule.variable.as_deref().unwrap_or_else(|| rule.sbase.id());
            let (construct, expected) = match rule.kind {
                RuleKind::Assignment => ("assignment rule", self.symbol_unit(variable, &[])),
                RuleKind::Rate => ("rate rule", per_time(self.symbol_unit(variable, &[]))),
                RuleKind::Algebraic => ("algebraic rule", None),
            };
            self.check(variable, construct, &rule.math, expected, &[], &mut issues);
        }
        for constraint in &model.constraints {
            self.check(
                constraint.sbase.id(),
                "constraint",
                &constraint.math,
                None,
                &[],
                &mut issues,
            );
        }
        for reaction in &model.reactions {
            if let Some(law) = &reaction.kinetic_law {
                self.check(
                    reaction.sbase.id(),
                    "kinetic law",
                    &law.math,
                    self.extent_per_time(),
                    &law.local_parameters,
                    &mut issues,
                );
            }
        }
        for event in &model.events {
            let sid = event.sbase.id();
            self.check(sid, "trigger", &event.trigger.math, None, &[], &mut issues);
            if let Some(delay) = &event.delay {
                self.check(sid, "delay", delay, self.time(), &[], &mut issues);
            }
            for ea in &event.assignments {
                let expected = self.symbol_unit(&ea.variable, &[]);
                self.check(&ea.variable, "event assignment", &ea.math, expected, &[], &mut issues);
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parse_formula;
    use crate::sbml::{
        Compartment, FunctionDefinition, KineticLaw, Parameter, Reaction, Rule, SBase, Species,
        UnitDefinition,
    };
    use crate::units::parse_unit_string;

    fn unit_definition(id: &str, units: &str) -> UnitDefinition {
        UnitDefinition {
            sbase: SBase::with_id(id),
            units: parse_unit_string(units).unwrap(),
        }
    }

    fn parameter(id: &str, units: &str) -> Parameter {
        Parameter {
            sbase: SBase::with_id(id),
            value: Some(1.0),
            units: Some(units.to_string()),
            constant: true,
        }
    }

    fn model() -> Model {
        let mut model = Model {
            sbase: SBase::with_id("m"),
            substance_units: Some("mmole".to_string()),
            extent_units: Some("mmole".to_string()),
            time_units: Some("min".to_string()),
            volume_units: Some("litre".to_string()),
            ..Default::default()
        };
        model.unit_definitions = vec![
            unit_definition("mmole", "mmol"),
            unit_definition("min", "min"),
            unit_definition("mM", "mM"),
            unit_definition("per_min", "1/min"),
            unit_definition("mmole_per_min", "mmol/min"),
        ];
        model.compartments.push(Compartment {
            sbase: SBase::with_id("c"),
            spatial_dimensions: Some(3.0),
            size: Some(1.0),
            units: None,
            constant: true,
        });
        model.species.push(Species {
            sbase: SBase::with_id("S"),
            compartment: "c".to_string(),
            initial_amount: None,
            initial_concentration: Some(1.0),
            substance_units: None,
            has_only_substance_units: false,
            boundary_condition: false,
            constant: false,
            conversion_factor: None,
            charge: None,
            chemical_formula: None,
        });
        model.parameters = vec![
            parameter("k", "per_min"),
            parameter("Km", "mM"),
            parameter("Vmax", "mmole_per_min"),
        ];
        model
    }

    fn reaction(formula: &str) -> Reaction {
        Reaction {
            sbase: SBase::with_id("v1"),
            reversible: false,
            fast: false,
            compartment: None,
            reactants: Vec::new(),
            products: Vec::new(),
            modifiers: Vec::new(),
            kinetic_law: Some(KineticLaw {
                sbase: SBase::default(),
                math: parse_formula(formula).unwrap(),
                local_parameters: Vec::new(),
            }),
            lower_flux_bound: None,
            upper_flux_bound: None,
            gene_product_association: None,
        }
    }

    #[test]
    fn test_species_evaluates_to_concentration() {
        let model = model();
        let context = UnitContext::new(&model);
        let unit = context.symbol_unit("S", &[]).unwrap();
        assert!(unit.is_equivalent(&context.resolve("mM").unwrap()));
    }

    #[test]
    fn test_consistent_kinetic_law() {
        let mut model = model();
        model.reactions.push(reaction("Vmax * S / (Km + S)"));
        model.reactions.push(reaction("k * S * c"));
        assert!(UnitContext::new(&model).issues().is_empty());
    }

    #[test]
    fn test_inconsistent_kinetic_law() {
        let mut model = model();
        model.reactions.push(reaction("k * S"));
        let issues = UnitContext::new(&model).issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].sid, "v1");
        assert!(issues[0].message.contains("kinetic law"));
    }

    #[test]
    fn test_sum_of_different_units() {
        let mut model = model();
        model.rules.push(Rule {
            sbase: SBase::default(),
            kind: RuleKind::Assignment,
            variable: Some("Km".to_string()),
            math: parse_formula("S + k").unwrap(),
        });
        let issues = UnitContext::new(&model).issues();
        assert!(issues
            .iter()
            .any(|issue| issue.message.contains("different units")));
    }

    #[test]
    fn test_numbers_without_units_are_unknown() {
        let mut model = model();
        model.reactions.push(reaction("2.5 * S"));
        model.rules.push(Rule {
            sbase: SBase::default(),
            kind: RuleKind::Rate,
            variable: Some("S".to_string()),
            math: parse_formula("k * S").unwrap(),
        });
        assert!(UnitContext::new(&model).issues().is_empty());
    }

    #[test]
    fn test_recursive_function_has_unknown_unit() {
        let mut model = model();
        model.function_definitions.push(FunctionDefinition {
            sbase: SBase::with_id("f"),
            math: parse_formula("lambda(x, f(x) * k)").unwrap(),
        });
        model.rules.push(Rule {
            sbase: SBase::default(),
            kind: RuleKind::Assignment,
            variable: Some("Km".to_string()),
            math: parse_formula("f(S)").unwrap(),
        });

        let context = UnitContext::new(&model);
        let mut issues = Vec::new();
        let unit = context.derive(&parse_formula("f(S)").unwrap(), &[], &mut issues);
        assert_eq!(unit, None);
        assert!(context.issues().is_empty());
    }
}

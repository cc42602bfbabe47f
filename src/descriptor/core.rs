//! Core SBML entities: units, functions, compartments, species,
//! parameters, assignments, rules, constraints and events.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{default_true, is_false, Meta, Value};
use crate::sbml::RuleKind;
use crate::units::Unit;

fn default_dimensions() -> f64 {
    3.0
}

/// Factors of a unit definition, either spelled out or as a unit string
/// such as `"mmole/min/l"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UnitSpec {
    Formula(String),
    Factors(Vec<Unit>),
}

impl From<&str> for UnitSpec {
    fn from(formula: &str) -> Self {
        UnitSpec::Formula(formula.to_string())
    }
}

impl From<Vec<Unit>> for UnitSpec {
    fn from(units: Vec<Unit>) -> Self {
        UnitSpec::Factors(units)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct UnitDefinition {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub units: UnitSpec,
}

impl UnitDefinition {
    pub fn new(sid: impl Into<String>, units: impl Into<UnitSpec>) -> Self {
        Self {
            meta: Meta::new(sid),
            units: units.into(),
        }
    }
}

/// A function definition given as `lambda(x, y, body)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Function {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Compartment {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    /// Size, or a formula for the size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub value: Option<Value>,

    #[serde(default = "default_dimensions")]
    #[builder(default = "3.0")]
    pub spatial_dimensions: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub unit: Option<String>,

    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub constant: bool,
}

/// A species in amount (`initial_amount`) or concentration
/// (`initial_concentration`) mode; exactly one of both is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Species {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub compartment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub initial_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub initial_concentration: Option<f64>,

    /// Defaults to the model substance unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub substance_unit: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    #[builder(default)]
    pub has_only_substance_units: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    #[builder(default)]
    pub boundary_condition: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    #[builder(default)]
    pub constant: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub conversion_factor: Option<String>,

    /// FBC charge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub charge: Option<i32>,

    /// FBC chemical formula
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub chemical_formula: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Parameter {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub unit: Option<String>,

    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub constant: bool,
}

impl Parameter {
    pub fn new(sid: impl Into<String>, value: impl Into<Value>, unit: Option<&str>) -> Self {
        Self {
            meta: Meta::new(sid),
            value: Some(value.into()),
            unit: unit.map(str::to_string),
            constant: true,
        }
    }
}

/// Initial assignment of the entity `sid`.
///
/// When `sid` is not declared elsewhere a constant parameter with `unit`
/// is created for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct InitialAssignment {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub unit: Option<String>,
}

/// Assignment, rate or algebraic rule.
///
/// For assignment and rate rules `sid` is the variable; undeclared
/// variables get a non-constant parameter with `unit`. Algebraic rules
/// use `sid` as the rule id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Rule {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[serde(default)]
    #[builder(default)]
    pub kind: RuleKind,

    #[builder(setter(into))]
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub unit: Option<String>,
}

impl Rule {
    pub fn assignment(variable: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            meta: Meta::new(variable),
            kind: RuleKind::Assignment,
            value: value.into(),
            unit: None,
        }
    }

    pub fn rate(variable: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind: RuleKind::Rate,
            ..Self::assignment(variable, value)
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// A Boolean condition on the model state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Constraint {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub value: String,

    /// Plain text message shown when the constraint is violated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventAssignment {
    pub variable: String,
    pub value: Value,
}

impl EventAssignment {
    pub fn new(variable: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Event {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    /// Boolean trigger expression
    #[builder(setter(into))]
    pub trigger: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub delay: Option<String>,

    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub persistent: bool,

    #[serde(default)]
    #[builder(default)]
    pub initial_value: bool,

    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub use_values_from_trigger_time: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_assignments")))]
    pub assignments: Vec<EventAssignment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitKind;

    #[test]
    fn test_unit_spec_variants() {
        let from_string: UnitDefinition =
            serde_json::from_value(serde_json::json!({"sid": "mM", "units": "mmole/l"})).unwrap();
        assert_eq!(from_string.units, UnitSpec::Formula("mmole/l".into()));

        let from_factors: UnitDefinition = serde_json::from_value(serde_json::json!({
            "sid": "per_s",
            "units": [{"kind": "second", "exponent": -1.0}]
        }))
        .unwrap();
        assert_eq!(
            from_factors.units,
            UnitSpec::Factors(vec![Unit::new(UnitKind::Second, -1.0, 0, 1.0)])
        );
    }

    #[test]
    fn test_event_defaults() {
        let event = EventBuilder::default()
            .meta("E1")
            .trigger("time >= 10")
            .to_assignments(EventAssignment::new("S", 0.0))
            .build()
            .unwrap();
        assert!(event.persistent);
        assert!(!event.initial_value);
        assert!(event.use_values_from_trigger_time);
        assert_eq!(event.assignments.len(), 1);
    }

    #[test]
    fn test_species_builder() {
        let species = SpeciesBuilder::default()
            .meta("glc")
            .compartment("c")
            .initial_concentration(5.0)
            .build()
            .unwrap();
        assert_eq!(species.initial_amount, None);
        assert!(!species.has_only_substance_units);
    }
}

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{is_false, Meta, Parameter, Rule};

/// SBO term of exchange reactions
pub const SBO_EXCHANGE_REACTION: &str = "SBO:0000627";

/// Kinetic law of a reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Formula {
    pub value: String,

    /// Expected unit of the rate, usually substance per time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Formula {
    pub fn new(value: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            value: value.into(),
            unit: unit.map(str::to_string),
        }
    }
}

impl From<&str> for Formula {
    fn from(value: &str) -> Self {
        Formula::new(value, None)
    }
}

/// Parameter scoped to a kinetic law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LocalParameter {
    pub sid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A reaction written as an equation, e.g. `2 A + B <=> C [E]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Reaction {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub equation: String,

    /// Overrides the reversibility of the equation separator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub reversible: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub compartment: Option<String>,

    /// Only written for SBML L3V1
    #[serde(default, skip_serializing_if = "is_false")]
    #[builder(default)]
    pub fast: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub formula: Option<Formula>,

    /// Global parameters created together with the reaction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_pars")))]
    pub pars: Vec<Parameter>,

    /// Assignment rules created together with the reaction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_rules")))]
    pub rules: Vec<Rule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_local_parameters")))]
    pub local_parameters: Vec<LocalParameter>,

    /// FBC lower bound, a parameter id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub lower_flux_bound: Option<String>,

    /// FBC upper bound, a parameter id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub upper_flux_bound: Option<String>,

    /// Gene association such as `(G1 and G2) or G3`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub gene_association: Option<String>,
}

impl Reaction {
    /// Creates the exchange reaction `EX_{species}` with equation
    /// `{species} ->`.
    ///
    /// # Arguments
    ///
    /// * `species` - Id of the exchanged species
    /// * `lower_flux_bound` - Id of the lower bound parameter
    /// * `upper_flux_bound` - Id of the upper bound parameter
    pub fn exchange(
        species: &str,
        lower_flux_bound: Option<&str>,
        upper_flux_bound: Option<&str>,
    ) -> Self {
        Self {
            meta: Meta::new(format!("EX_{species}")).with_sbo(SBO_EXCHANGE_REACTION),
            equation: format!("{species} ->"),
            reversible: Some(true),
            compartment: None,
            fast: false,
            formula: None,
            pars: Vec::new(),
            rules: Vec::new(),
            local_parameters: Vec::new(),
            lower_flux_bound: lower_flux_bound.map(str::to_string),
            upper_flux_bound: upper_flux_bound.map(str::to_string),
            gene_association: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_reaction() {
        let reaction = Reaction::exchange("glc", Some("lb"), Some("ub"));
        assert_eq!(reaction.meta.sid, "EX_glc");
        assert_eq!(reaction.equation, "glc ->");
        assert_eq!(reaction.meta.sbo.as_deref(), Some(SBO_EXCHANGE_REACTION));
        assert_eq!(reaction.reversible, Some(true));
    }

    #[test]
    fn test_reaction_from_json() {
        let reaction: Reaction = serde_json::from_value(serde_json::json!({
            "sid": "v1",
            "equation": "A + B => C [E]",
            "formula": {"value": "k1 * A * B", "unit": "mmole_per_s"},
            "local_parameters": [{"sid": "k1", "value": 0.1}]
        }))
        .unwrap();
        assert_eq!(reaction.formula.unwrap().unit.as_deref(), Some("mmole_per_s"));
        assert_eq!(reaction.local_parameters[0].value, Some(0.1));
        assert_eq!(reaction.reversible, None);
    }
}

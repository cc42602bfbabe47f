//! Flux balance constraint records.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{default_true, Meta};
use crate::sbml::ObjectiveType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FluxObjective {
    pub reaction: String,
    pub coefficient: f64,
}

impl FluxObjective {
    pub fn new(reaction: impl Into<String>, coefficient: f64) -> Self {
        Self {
            reaction: reaction.into(),
            coefficient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Objective {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[serde(default)]
    #[builder(default)]
    pub objective_type: ObjectiveType,

    /// Marks the objective as the model's active objective
    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_flux_objectives")))]
    pub flux_objectives: Vec<FluxObjective>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct GeneProduct {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub associated_species: Option<String>,
}

//! Model descriptors
//!
//! A [`ModelDescriptor`] is the typed, declarative description of a model:
//! a small header plus ordered lists of entity records. Records are plain
//! data; they are checked and normalized by the [`factory`](crate::factory)
//! and materialized by the [`builder`](crate::builder).
//!
//! Every record embeds a [`Meta`] with the fields shared by all SBML
//! elements. In JSON the meta fields sit next to the entity fields:
//!
//! ```json
//! {"sid": "c", "name": "cytosol", "value": 2.0, "unit": "litre"}
//! ```
//!
//! Records are created either by deserializing descriptor modules or with
//! the generated builders:
//!
//! ```
//! use sbmlutils::descriptor::{CompartmentBuilder, SpeciesBuilder};
//!
//! let c = CompartmentBuilder::default()
//!     .meta("c")
//!     .value(2.0)
//!     .unit("litre")
//!     .build()
//!     .unwrap();
//! let a1 = SpeciesBuilder::default()
//!     .meta("A1")
//!     .compartment("c")
//!     .initial_amount(1.0)
//!     .has_only_substance_units(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(a1.compartment, c.meta.sid);
//! ```

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use variantly::Variantly;

use crate::annotation::Qualifier;
use crate::sbml::{Creator, Package};

mod comp;
mod core;
mod distrib;
mod fbc;
mod reaction;

pub use self::comp::*;
pub use self::core::*;
pub use self::distrib::*;
pub use self::fbc::*;
pub use self::reaction::*;

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn default_true() -> bool {
    true
}

/// Fields shared by every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Meta {
    /// Identifier of the entity, an SBML SId
    #[builder(setter(into))]
    pub sid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub metaid: Option<String>,

    /// SBO term, e.g. `SBO:0000290` or `290`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub sbo: Option<String>,

    /// XHTML notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub notes: Option<String>,

    /// `(qualifier, resource)` pairs; resources are URLs or `collection/term`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_annotations")))]
    pub annotations: Vec<(Qualifier, String)>,

    /// Create a port `{sid}_port` exposing this entity
    #[serde(default, skip_serializing_if = "is_false")]
    #[builder(default)]
    pub port: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_uncertainties")))]
    pub uncertainties: Vec<Uncertainty>,
}

impl Meta {
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sbo(mut self, sbo: impl Into<String>) -> Self {
        self.sbo = Some(sbo.into());
        self
    }

    pub fn with_annotation(mut self, qualifier: Qualifier, resource: impl Into<String>) -> Self {
        self.annotations.push((qualifier, resource.into()));
        self
    }

    pub fn with_port(mut self) -> Self {
        self.port = true;
        self
    }
}

impl From<&str> for Meta {
    fn from(sid: &str) -> Self {
        Meta::new(sid)
    }
}

impl From<String> for Meta {
    fn from(sid: String) -> Self {
        Meta::new(sid)
    }
}

/// Records carrying a [`Meta`].
pub trait Entity {
    fn meta(&self) -> &Meta;

    fn sid(&self) -> &str {
        &self.meta().sid
    }
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn meta(&self) -> &Meta {
                    &self.meta
                }
            }
        )*
    };
}

impl_entity!(
    UnitDefinition,
    Function,
    Compartment,
    Species,
    Parameter,
    InitialAssignment,
    Rule,
    Constraint,
    Event,
    Reaction,
    ExternalModelDefinition,
    Submodel,
    Port,
    ReplacedElement,
    ReplacedBy,
    Deletion,
    Objective,
    GeneProduct,
);

/// A numeric value or a formula.
///
/// Formula values of compartments and parameters become initial
/// assignments (constant entities) or assignment rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Variantly)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Formula(String),
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(formula: &str) -> Self {
        Value::Formula(formula.to_string())
    }
}

impl From<String> for Value {
    fn from(formula: String) -> Self {
        Value::Formula(formula)
    }
}

/// Units of the model-level unit attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
#[builder(default)]
pub struct ModelUnits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option))]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option))]
    pub extent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option))]
    pub substance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option))]
    pub length: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option))]
    pub area: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option))]
    pub volume: Option<String>,
}

/// The merged description of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct ModelDescriptor {
    /// Model identifier
    #[builder(setter(into))]
    pub mid: String,

    /// Version tag appended to the model id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_annotations")))]
    pub annotations: Vec<(Qualifier, String)>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_creators")))]
    pub creators: Vec<Creator>,

    /// Creation timestamp of the model history (W3CDTF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_packages")))]
    pub packages: Vec<Package>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub model_units: Option<ModelUnits>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_units")))]
    pub units: Vec<UnitDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_functions")))]
    pub functions: Vec<Function>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_compartments")))]
    pub compartments: Vec<Compartment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_species")))]
    pub species: Vec<Species>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_parameters")))]
    pub parameters: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_assignments")))]
    pub assignments: Vec<InitialAssignment>,

    /// Assignment and algebraic rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_rules")))]
    pub rules: Vec<Rule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_rate_rules")))]
    pub rate_rules: Vec<Rule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_reactions")))]
    pub reactions: Vec<Reaction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_events")))]
    pub events: Vec<Event>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_constraints")))]
    pub constraints: Vec<Constraint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_external_model_definitions")))]
    pub external_model_definitions: Vec<ExternalModelDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_submodels")))]
    pub submodels: Vec<Submodel>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_ports")))]
    pub ports: Vec<Port>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_replaced_elements")))]
    pub replaced_elements: Vec<ReplacedElement>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_replaced_by")))]
    pub replaced_by: Vec<ReplacedBy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_deletions")))]
    pub deletions: Vec<Deletion>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_objectives")))]
    pub objectives: Vec<Objective>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_gene_products")))]
    pub gene_products: Vec<GeneProduct>,

    /// Layout descriptions are accepted but not rendered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_layouts")))]
    pub layouts: Vec<serde_json::Value>,
}

impl ModelDescriptor {
    /// Id of the model: `{mid}_{version}` when a version is set.
    pub fn model_id(&self) -> String {
        match &self.version {
            Some(version) => format!("{}_{version}", self.mid),
            None => self.mid.clone(),
        }
    }

    pub fn has_package(&self, package: Package) -> bool {
        self.packages.contains(&package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_model_id_with_version() {
        let descriptor = ModelDescriptorBuilder::default()
            .mid("glucose")
            .version("v2")
            .build()
            .unwrap();
        assert_eq!(descriptor.model_id(), "glucose_v2");
    }

    #[test]
    fn test_meta_fields_are_flattened() {
        let json = serde_json::json!({
            "sid": "c",
            "name": "cytosol",
            "sbo": "SBO:0000290",
            "annotations": [["BQB_IS", "go/GO:0005829"]],
            "value": 2.0,
            "unit": "litre"
        });
        let compartment: Compartment = serde_json::from_value(json).unwrap();
        assert_eq!(compartment.meta.sid, "c");
        assert_eq!(compartment.meta.name.as_deref(), Some("cytosol"));
        assert_eq!(
            compartment.meta.annotations,
            vec![(Qualifier::BQB_IS, "go/GO:0005829".to_string())]
        );
        assert_eq!(compartment.value, Some(Value::Number(2.0)));
        assert_eq!(compartment.spatial_dimensions, 3.0);
    }

    #[test]
    fn test_value_formula() {
        let parameter: Parameter =
            serde_json::from_value(serde_json::json!({"sid": "p", "value": "2 * k"})).unwrap();
        assert_eq!(parameter.value, Some(Value::Formula("2 * k".into())));
        assert!(parameter.constant);
    }
}

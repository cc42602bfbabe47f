//! Hierarchical model composition records.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Meta;
use crate::sbml::RefTarget;

/// Reference into a submodel or the containing model. Exactly one of the
/// fields must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComponentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metaid_ref: Option<String>,
}

impl ComponentRef {
    pub fn port(port: impl Into<String>) -> Self {
        Self {
            port_ref: Some(port.into()),
            ..Default::default()
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id_ref: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn unit(unit: impl Into<String>) -> Self {
        Self {
            unit_ref: Some(unit.into()),
            ..Default::default()
        }
    }

    pub fn metaid(metaid: impl Into<String>) -> Self {
        Self {
            metaid_ref: Some(metaid.into()),
            ..Default::default()
        }
    }

    /// The single reference, or `None` when zero or several are set.
    pub fn target(&self) -> Option<RefTarget> {
        let targets = [
            self.port_ref.clone().map(RefTarget::Port),
            self.id_ref.clone().map(RefTarget::Id),
            self.unit_ref.clone().map(RefTarget::Unit),
            self.metaid_ref.clone().map(RefTarget::MetaId),
        ];
        let mut set = targets.into_iter().flatten();
        match (set.next(), set.next()) {
            (Some(target), None) => Some(target),
            _ => None,
        }
    }
}

/// A model stored in another file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct ExternalModelDefinition {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    /// Path or URI, relative to the referencing document
    #[builder(setter(into))]
    pub source: String,

    /// Id of the model inside `source`; the main model when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub model_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub md5: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Submodel {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub model_ref: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub time_conversion_factor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub extent_conversion_factor: Option<String>,
}

/// Port exposing an element of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Port {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[serde(flatten)]
    #[builder(setter(into))]
    pub target: ComponentRef,
}

/// Removes an element of a submodel when flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct Deletion {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub submodel_ref: String,

    #[serde(flatten)]
    #[builder(setter(into))]
    pub target: ComponentRef,
}

/// The local element `element_ref` replaces an element of a submodel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct ReplacedElement {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    /// Id of the replacing element in this model
    #[builder(setter(into))]
    pub element_ref: String,

    #[builder(setter(into))]
    pub submodel_ref: String,

    #[serde(flatten)]
    #[builder(setter(into))]
    pub target: ComponentRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub conversion_factor: Option<String>,
}

/// The local element `element_ref` is replaced by an element of a
/// submodel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Builder)]
pub struct ReplacedBy {
    #[serde(flatten)]
    #[builder(setter(into))]
    pub meta: Meta,

    #[builder(setter(into))]
    pub element_ref: String,

    #[builder(setter(into))]
    pub submodel_ref: String,

    #[serde(flatten)]
    #[builder(setter(into))]
    pub target: ComponentRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ref_exactly_one() {
        assert_eq!(
            ComponentRef::port("ext_port").target(),
            Some(RefTarget::Port("ext_port".into()))
        );
        assert_eq!(ComponentRef::default().target(), None);

        let both = ComponentRef {
            id_ref: Some("a".into()),
            unit_ref: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(both.target(), None);
    }

    #[test]
    fn test_replaced_element_from_json() {
        let replaced: ReplacedElement = serde_json::from_value(serde_json::json!({
            "sid": "c_ext_rep",
            "element_ref": "c",
            "submodel_ref": "sub",
            "port_ref": "ext_port"
        }))
        .unwrap();
        assert_eq!(replaced.target.target(), Some(RefTarget::Port("ext_port".into())));
        assert_eq!(replaced.element_ref, "c");
    }
}

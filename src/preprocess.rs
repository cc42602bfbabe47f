//! Descriptor modules and their merging
//!
//! A [`DescriptorModule`] is an ordered list of `(key, value)` bindings whose
//! keys come from the closed set [`DescriptorKey`]. Modules are loaded from
//! JSON files or created from typed [`ModelDescriptor`]s. [`merge_modules`]
//! consolidates them into a single descriptor:
//!
//! - lists are concatenated in module order
//! - objects are extended recursively, later keys win
//! - scalars are overwritten by later modules
//! - unknown keys are reported and ignored
//!
//! The merge does not resolve references. It only reports keys that are
//! used without the keys they depend on (e.g. species without compartments).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::ModelDescriptor;
use crate::error::{BuildError, BuildWarning, WarningKind};

/// Top-level keys of a descriptor module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKey {
    Mid,
    Version,
    Name,
    Notes,
    Annotations,
    Creators,
    Created,
    Packages,
    ModelUnits,
    Units,
    Functions,
    Compartments,
    Species,
    Parameters,
    Assignments,
    Rules,
    RateRules,
    Reactions,
    Events,
    Constraints,
    ExternalModelDefinitions,
    Submodels,
    Ports,
    ReplacedElements,
    ReplacedBy,
    Deletions,
    Objectives,
    GeneProducts,
    Layouts,
}

impl DescriptorKey {
    pub const ALL: [DescriptorKey; 29] = [
        DescriptorKey::Mid,
        DescriptorKey::Version,
        DescriptorKey::Name,
        DescriptorKey::Notes,
        DescriptorKey::Annotations,
        DescriptorKey::Creators,
        DescriptorKey::Created,
        DescriptorKey::Packages,
        DescriptorKey::ModelUnits,
        DescriptorKey::Units,
        DescriptorKey::Functions,
        DescriptorKey::Compartments,
        DescriptorKey::Species,
        DescriptorKey::Parameters,
        DescriptorKey::Assignments,
        DescriptorKey::Rules,
        DescriptorKey::RateRules,
        DescriptorKey::Reactions,
        DescriptorKey::Events,
        DescriptorKey::Constraints,
        DescriptorKey::ExternalModelDefinitions,
        DescriptorKey::Submodels,
        DescriptorKey::Ports,
        DescriptorKey::ReplacedElements,
        DescriptorKey::ReplacedBy,
        DescriptorKey::Deletions,
        DescriptorKey::Objectives,
        DescriptorKey::GeneProducts,
        DescriptorKey::Layouts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorKey::Mid => "mid",
            DescriptorKey::Version => "version",
            DescriptorKey::Name => "name",
            DescriptorKey::Notes => "notes",
            DescriptorKey::Annotations => "annotations",
            DescriptorKey::Creators => "creators",
            DescriptorKey::Created => "created",
            DescriptorKey::Packages => "packages",
            DescriptorKey::ModelUnits => "model_units",
            DescriptorKey::Units => "units",
            DescriptorKey::Functions => "functions",
            DescriptorKey::Compartments => "compartments",
            DescriptorKey::Species => "species",
            DescriptorKey::Parameters => "parameters",
            DescriptorKey::Assignments => "assignments",
            DescriptorKey::Rules => "rules",
            DescriptorKey::RateRules => "rate_rules",
            DescriptorKey::Reactions => "reactions",
            DescriptorKey::Events => "events",
            DescriptorKey::Constraints => "constraints",
            DescriptorKey::ExternalModelDefinitions => "external_model_definitions",
            DescriptorKey::Submodels => "submodels",
            DescriptorKey::Ports => "ports",
            DescriptorKey::ReplacedElements => "replaced_elements",
            DescriptorKey::ReplacedBy => "replaced_by",
            DescriptorKey::Deletions => "deletions",
            DescriptorKey::Objectives => "objectives",
            DescriptorKey::GeneProducts => "gene_products",
            DescriptorKey::Layouts => "layouts",
        }
    }

    /// Keys whose entities reference entities of another key.
    fn requires(&self) -> &'static [DescriptorKey] {
        match self {
            DescriptorKey::Species => &[DescriptorKey::Compartments],
            DescriptorKey::Reactions => &[DescriptorKey::Species],
            DescriptorKey::ReplacedElements | DescriptorKey::ReplacedBy | DescriptorKey::Deletions => {
                &[DescriptorKey::Submodels]
            }
            DescriptorKey::Objectives => &[DescriptorKey::Reactions],
            _ => &[],
        }
    }
}

impl FromStr for DescriptorKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DescriptorKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered source of top-level descriptor attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorModule {
    pub name: String,
    /// Bindings in declaration order; keys are not validated until merging
    pub bindings: Vec<(String, Value)>,
}

impl DescriptorModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    /// Adds a binding.
    pub fn bind(mut self, key: DescriptorKey, value: Value) -> Self {
        self.bindings.push((key.as_str().to_string(), value));
        self
    }

    /// Reads a module from a JSON object.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the module used in warnings
    /// * `json` - A JSON object whose keys are descriptor keys
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, BuildError> {
        let name = name.into();
        let value: Value = serde_json::from_str(json)
            .map_err(|e| BuildError::InvalidDescriptor(format!("module '{name}': {e}")))?;
        Self::from_value(name, value)
    }

    /// Reads a module from a JSON file; the file stem is the module name.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BuildError::InvalidDescriptor(format!("cannot read '{}': {e}", path.display()))
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module")
            .to_string();
        Self::from_json(name, &json)
    }

    /// Turns a typed descriptor into a module. Empty lists and unset
    /// fields do not produce bindings.
    pub fn from_descriptor(
        name: impl Into<String>,
        descriptor: &ModelDescriptor,
    ) -> Result<Self, BuildError> {
        let value = serde_json::to_value(descriptor)
            .map_err(|e| BuildError::InvalidDescriptor(e.to_string()))?;
        Self::from_value(name.into(), value)
    }

    fn from_value(name: String, value: Value) -> Result<Self, BuildError> {
        let Value::Object(map) = value else {
            return Err(BuildError::InvalidDescriptor(format!(
                "module '{name}' is not a JSON object"
            )));
        };
        Ok(Self {
            name,
            bindings: map.into_iter().collect(),
        })
    }
}

/// Result of merging descriptor modules.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub descriptor: ModelDescriptor,
    pub warnings: Vec<BuildWarning>,
}

/// Merges modules in order into a single model descriptor.
///
/// # Arguments
///
/// * `modules` - Modules in merge order; later modules override or extend earlier ones
///
/// # Returns
///
/// The merged descriptor with the warnings raised while merging, or an
/// error when the merged attributes do not form a valid descriptor.
pub fn merge_modules(modules: &[DescriptorModule]) -> Result<Preprocessed, BuildError> {
    let mut merged = serde_json::Map::new();
    let mut warnings = Vec::new();

    for module in modules {
        log::debug!("Merging descriptor module '{}'", module.name);
        for (key, value) in &module.bindings {
            if DescriptorKey::from_str(key).is_err() {
                warnings.push(BuildWarning::log(
                    WarningKind::UnknownKey,
                    None,
                    format!("Unknown key '{key}' in module '{}' is ignored", module.name),
                ));
                continue;
            }
            match merged.get_mut(key) {
                Some(existing) => merge_value(existing, value.clone()),
                None => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }

    warnings.extend(missing_keys(&merged));

    let descriptor: ModelDescriptor = serde_json::from_value(Value::Object(merged))
        .map_err(|e| BuildError::InvalidDescriptor(e.to_string()))?;

    if !descriptor.layouts.is_empty() {
        warnings.push(BuildWarning::log(
            WarningKind::Unsupported,
            Some(&descriptor.mid),
            "Layouts are not rendered and are ignored",
        ));
    }

    Ok(Preprocessed {
        descriptor,
        warnings,
    })
}

/// Merges `incoming` into `target`.
fn merge_value(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Array(existing), Value::Array(items)) => existing.extend(items),
        (Value::Object(existing), Value::Object(entries)) => {
            for (key, value) in entries {
                match existing.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn is_present(map: &serde_json::Map<String, Value>, key: DescriptorKey) -> bool {
    match map.get(key.as_str()) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn missing_keys(map: &serde_json::Map<String, Value>) -> Vec<BuildWarning> {
    DescriptorKey::ALL
        .iter()
        .filter(|key| is_present(map, **key))
        .flat_map(|key| {
            key.requires()
                .iter()
                .filter(|required| !is_present(map, **required))
                .map(move |required| {
                    BuildWarning::log(
                        WarningKind::MissingKey,
                        None,
                        format!("'{key}' are declared but no '{required}' are"),
                    )
                })
        })
        .collect()
}

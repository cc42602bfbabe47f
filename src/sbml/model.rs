//! Owned SBML object graph
//!
//! Every element embeds an [`SBase`] carrying identity, metadata and the
//! package extensions that may hang off any element (comp replacements,
//! distrib uncertainties). Lists keep declaration order, which is also the
//! emission order of the writer.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::annotation::CvTerm;
use crate::math::Math;
use crate::sbml::xml::XmlElement;
use crate::sbml::Package;
use crate::units::Unit;

/// Attributes and extensions shared by every SBML element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SBase {
    pub id: Option<String>,
    pub name: Option<String>,
    pub metaid: Option<String>,
    pub sbo_term: Option<String>,
    /// XHTML notes, stored as the `<body>` (or other) root element
    pub notes: Option<XmlElement>,
    pub cv_terms: Vec<CvTerm>,
    pub replaced_elements: Vec<ReplacedElement>,
    pub replaced_by: Option<ReplacedBy>,
    pub uncertainties: Vec<Uncertainty>,
}

impl SBase {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

/// Kinds of elements, used for reporting and namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Model,
    FunctionDefinition,
    UnitDefinition,
    Compartment,
    Species,
    Parameter,
    InitialAssignment,
    Rule,
    Constraint,
    Reaction,
    SpeciesReference,
    ModifierSpeciesReference,
    KineticLaw,
    LocalParameter,
    Event,
    EventAssignment,
    Submodel,
    Port,
    Deletion,
    Objective,
    FluxObjective,
    GeneProduct,
    Uncertainty,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Model => "model",
            ElementKind::FunctionDefinition => "function definition",
            ElementKind::UnitDefinition => "unit definition",
            ElementKind::Compartment => "compartment",
            ElementKind::Species => "species",
            ElementKind::Parameter => "parameter",
            ElementKind::InitialAssignment => "initial assignment",
            ElementKind::Rule => "rule",
            ElementKind::Constraint => "constraint",
            ElementKind::Reaction => "reaction",
            ElementKind::SpeciesReference => "species reference",
            ElementKind::ModifierSpeciesReference => "modifier",
            ElementKind::KineticLaw => "kinetic law",
            ElementKind::LocalParameter => "local parameter",
            ElementKind::Event => "event",
            ElementKind::EventAssignment => "event assignment",
            ElementKind::Submodel => "submodel",
            ElementKind::Port => "port",
            ElementKind::Deletion => "deletion",
            ElementKind::Objective => "objective",
            ElementKind::FluxObjective => "flux objective",
            ElementKind::GeneProduct => "gene product",
            ElementKind::Uncertainty => "uncertainty",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SbmlDocument {
    pub level: u32,
    pub version: u32,
    /// Enabled packages in declaration order
    pub packages: Vec<Package>,
    pub model: Option<Model>,
    pub model_definitions: Vec<Model>,
    pub external_model_definitions: Vec<ExternalModelDefinition>,
}

impl Default for SbmlDocument {
    fn default() -> Self {
        Self {
            level: 3,
            version: 1,
            packages: Vec::new(),
            model: None,
            model_definitions: Vec::new(),
            external_model_definitions: Vec::new(),
        }
    }
}

impl SbmlDocument {
    pub fn has_package(&self, package: Package) -> bool {
        self.packages.contains(&package)
    }

    pub fn enable_package(&mut self, package: Package) {
        if !self.has_package(package) {
            self.packages.push(package);
        }
    }

    pub fn disable_package(&mut self, package: Package) {
        self.packages.retain(|p| *p != package);
    }

    /// Finds the main model or a model definition by id.
    pub fn find_model(&self, id: &str) -> Option<&Model> {
        self.model
            .iter()
            .chain(self.model_definitions.iter())
            .find(|m| m.sbase.id() == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Creator {
    pub family_name: String,
    pub given_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelHistory {
    pub creators: Vec<Creator>,
    pub created: String,
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub sbase: SBase,
    pub substance_units: Option<String>,
    pub time_units: Option<String>,
    pub volume_units: Option<String>,
    pub area_units: Option<String>,
    pub length_units: Option<String>,
    pub extent_units: Option<String>,
    pub conversion_factor: Option<String>,
    pub history: Option<ModelHistory>,
    pub function_definitions: Vec<FunctionDefinition>,
    pub unit_definitions: Vec<UnitDefinition>,
    pub compartments: Vec<Compartment>,
    pub species: Vec<Species>,
    pub parameters: Vec<Parameter>,
    pub initial_assignments: Vec<InitialAssignment>,
    pub rules: Vec<Rule>,
    pub constraints: Vec<Constraint>,
    pub reactions: Vec<Reaction>,
    pub events: Vec<Event>,
    pub submodels: Vec<Submodel>,
    pub ports: Vec<Port>,
    pub fbc_strict: bool,
    pub objectives: Vec<Objective>,
    pub active_objective: Option<String>,
    pub gene_products: Vec<GeneProduct>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub sbase: SBase,
    pub math: Math,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitDefinition {
    pub sbase: SBase,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub sbase: SBase,
    pub spatial_dimensions: Option<f64>,
    pub size: Option<f64>,
    pub units: Option<String>,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub sbase: SBase,
    pub compartment: String,
    pub initial_amount: Option<f64>,
    pub initial_concentration: Option<f64>,
    pub substance_units: Option<String>,
    pub has_only_substance_units: bool,
    pub boundary_condition: bool,
    pub constant: bool,
    pub conversion_factor: Option<String>,
    pub charge: Option<i32>,
    pub chemical_formula: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub sbase: SBase,
    pub value: Option<f64>,
    pub units: Option<String>,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialAssignment {
    pub sbase: SBase,
    pub symbol: String,
    pub math: Math,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Assignment,
    Rate,
    Algebraic,
}

impl RuleKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            RuleKind::Assignment => "assignmentRule",
            RuleKind::Rate => "rateRule",
            RuleKind::Algebraic => "algebraicRule",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub sbase: SBase,
    pub kind: RuleKind,
    /// Target of assignment and rate rules; `None` for algebraic rules
    pub variable: Option<String>,
    pub math: Math,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub sbase: SBase,
    pub math: Math,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesReference {
    pub sbase: SBase,
    pub species: String,
    pub stoichiometry: Option<f64>,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModifierSpeciesReference {
    pub sbase: SBase,
    pub species: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalParameter {
    pub sbase: SBase,
    pub value: Option<f64>,
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KineticLaw {
    pub sbase: SBase,
    pub math: Math,
    pub local_parameters: Vec<LocalParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub sbase: SBase,
    pub reversible: bool,
    pub fast: bool,
    pub compartment: Option<String>,
    pub reactants: Vec<SpeciesReference>,
    pub products: Vec<SpeciesReference>,
    pub modifiers: Vec<ModifierSpeciesReference>,
    pub kinetic_law: Option<KineticLaw>,
    pub lower_flux_bound: Option<String>,
    pub upper_flux_bound: Option<String>,
    pub gene_product_association: Option<Association>,
}

impl Reaction {
    pub fn species_references(&self) -> impl Iterator<Item = &SpeciesReference> {
        self.reactants.iter().chain(self.products.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub initial_value: bool,
    pub persistent: bool,
    pub math: Math,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventAssignment {
    pub sbase: SBase,
    pub variable: String,
    pub math: Math,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub sbase: SBase,
    pub use_values_from_trigger_time: bool,
    pub trigger: Trigger,
    pub priority: Option<Math>,
    pub delay: Option<Math>,
    pub assignments: Vec<EventAssignment>,
}

/// Reference of a comp element into a submodel or the containing model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    Port(String),
    Id(String),
    Unit(String),
    MetaId(String),
}

impl RefTarget {
    pub fn attribute(&self) -> &'static str {
        match self {
            RefTarget::Port(_) => "portRef",
            RefTarget::Id(_) => "idRef",
            RefTarget::Unit(_) => "unitRef",
            RefTarget::MetaId(_) => "metaIdRef",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RefTarget::Port(v) | RefTarget::Id(v) | RefTarget::Unit(v) | RefTarget::MetaId(v) => v,
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute(), self.value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalModelDefinition {
    pub sbase: SBase,
    pub source: String,
    pub model_ref: Option<String>,
    pub md5: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submodel {
    pub sbase: SBase,
    pub model_ref: String,
    pub time_conversion_factor: Option<String>,
    pub extent_conversion_factor: Option<String>,
    pub deletions: Vec<Deletion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub sbase: SBase,
    pub target: RefTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub sbase: SBase,
    pub target: RefTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplacedElement {
    pub submodel_ref: String,
    pub target: RefTarget,
    pub conversion_factor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplacedBy {
    pub submodel_ref: String,
    pub target: RefTarget,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveType {
    #[default]
    #[serde(alias = "max")]
    Maximize,
    #[serde(alias = "min")]
    Minimize,
}

impl ObjectiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveType::Maximize => "maximize",
            ObjectiveType::Minimize => "minimize",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxObjective {
    pub sbase: SBase,
    pub reaction: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sbase: SBase,
    pub objective_type: ObjectiveType,
    pub flux_objectives: Vec<FluxObjective>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneProduct {
    pub sbase: SBase,
    pub label: String,
    pub associated_species: Option<String>,
}

/// Boolean gene-product association of a reaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Association {
    GeneProduct(String),
    And(Vec<Association>),
    Or(Vec<Association>),
}

impl Association {
    /// Gene product ids referenced by the association.
    pub fn gene_products(&self) -> Vec<&str> {
        match self {
            Association::GeneProduct(id) => vec![id.as_str()],
            Association::And(items) | Association::Or(items) => {
                items.iter().flat_map(|a| a.gene_products()).collect()
            }
        }
    }

    pub fn rename(&mut self, rename: &impl Fn(&str) -> Option<String>) {
        match self {
            Association::GeneProduct(id) => {
                if let Some(new) = rename(id) {
                    *id = new;
                }
            }
            Association::And(items) | Association::Or(items) => {
                items.iter_mut().for_each(|a| a.rename(rename))
            }
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (items, joiner) = match self {
            Association::GeneProduct(id) => return write!(f, "{id}"),
            Association::And(items) => (items, " and "),
            Association::Or(items) => (items, " or "),
        };
        let parts = items
            .iter()
            .map(|item| match item {
                Association::GeneProduct(id) => id.clone(),
                nested => format!("({nested})"),
            })
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join(joiner))
    }
}

/// Summary statistics carrying a single value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum PointStatistic {
    Mean,
    StandardDeviation,
    Variance,
    CoefficientOfVariation,
    Median,
    Mode,
    SampleSize,
    Skewness,
    StandardError,
    Kurtosis,
}

/// Summary statistics carrying a lower and an upper value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum SpanStatistic {
    Range,
    ConfidenceInterval,
    CredibleInterval,
    InterquartileRange,
}

impl PointStatistic {
    pub const ALL: [PointStatistic; 10] = [
        PointStatistic::Mean,
        PointStatistic::StandardDeviation,
        PointStatistic::Variance,
        PointStatistic::CoefficientOfVariation,
        PointStatistic::Median,
        PointStatistic::Mode,
        PointStatistic::SampleSize,
        PointStatistic::Skewness,
        PointStatistic::StandardError,
        PointStatistic::Kurtosis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PointStatistic::Mean => "mean",
            PointStatistic::StandardDeviation => "standardDeviation",
            PointStatistic::Variance => "variance",
            PointStatistic::CoefficientOfVariation => "coefficientOfVariation",
            PointStatistic::Median => "median",
            PointStatistic::Mode => "mode",
            PointStatistic::SampleSize => "sampleSize",
            PointStatistic::Skewness => "skewness",
            PointStatistic::StandardError => "standardError",
            PointStatistic::Kurtosis => "kurtosis",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl SpanStatistic {
    pub const ALL: [SpanStatistic; 4] = [
        SpanStatistic::Range,
        SpanStatistic::ConfidenceInterval,
        SpanStatistic::CredibleInterval,
        SpanStatistic::InterquartileRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatistic::Range => "range",
            SpanStatistic::ConfidenceInterval => "confidenceInterval",
            SpanStatistic::CredibleInterval => "credibleInterval",
            SpanStatistic::InterquartileRange => "interquartileRange",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Entry of a distrib uncertainty block.
#[derive(Debug, Clone, PartialEq)]
pub enum UncertParameter {
    Point {
        statistic: PointStatistic,
        value: Option<f64>,
        var: Option<String>,
        units: Option<String>,
    },
    Span {
        statistic: SpanStatistic,
        value_lower: Option<f64>,
        var_lower: Option<String>,
        value_upper: Option<f64>,
        var_upper: Option<String>,
        units: Option<String>,
    },
    /// A distribution given as math, e.g. `normal(0, 1)`
    Distribution { definition_url: String, math: Math },
}

impl UncertParameter {
    /// Symbols referenced through `var` attributes.
    pub fn vars(&self) -> Vec<&str> {
        match self {
            UncertParameter::Point { var, .. } => var.iter().map(String::as_str).collect(),
            UncertParameter::Span {
                var_lower,
                var_upper,
                ..
            } => var_lower
                .iter()
                .chain(var_upper.iter())
                .map(String::as_str)
                .collect(),
            UncertParameter::Distribution { .. } => Vec::new(),
        }
    }

    pub fn units(&self) -> Option<&str> {
        match self {
            UncertParameter::Point { units, .. } | UncertParameter::Span { units, .. } => {
                units.as_deref()
            }
            UncertParameter::Distribution { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Uncertainty {
    pub sbase: SBase,
    pub parameters: Vec<UncertParameter>,
}

impl Model {
    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.compartments.iter().find(|c| c.sbase.id() == id)
    }

    pub fn species(&self, id: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.sbase.id() == id)
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.sbase.id() == id)
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.sbase.id() == id)
    }

    pub fn unit_definition(&self, id: &str) -> Option<&UnitDefinition> {
        self.unit_definitions.iter().find(|u| u.sbase.id() == id)
    }

    pub fn function_definition(&self, id: &str) -> Option<&FunctionDefinition> {
        self.function_definitions.iter().find(|f| f.sbase.id() == id)
    }

    pub fn submodel(&self, id: &str) -> Option<&Submodel> {
        self.submodels.iter().find(|s| s.sbase.id() == id)
    }

    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.sbase.id() == id)
    }

    /// Whether a rule, initial assignment or event assignment targets `id`.
    pub fn is_assignment_target(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.variable.as_deref() == Some(id))
            || self.initial_assignments.iter().any(|ia| ia.symbol == id)
    }

    /// Kind of the element owning `id` in the model's main SId namespace.
    pub fn kind_of(&self, id: &str) -> Option<ElementKind> {
        let mut found = None;
        self.for_each_sbase(&mut |kind, sbase| {
            if found.is_none() && kind != ElementKind::LocalParameter && kind != ElementKind::UnitDefinition
                && sbase.id.as_deref() == Some(id)
            {
                found = Some(kind);
            }
        });
        found
    }

    /// Visits every element of the model with its kind, in document order.
    pub fn for_each_sbase<'a>(&'a self, f: &mut impl FnMut(ElementKind, &'a SBase)) {
        f(ElementKind::Model, &self.sbase);
        visit_uncertainties(&self.sbase, f);

        macro_rules! visit {
            ($items:expr, $kind:expr) => {
                for item in $items.iter() {
                    f($kind, &item.sbase);
                    visit_uncertainties(&item.sbase, f);
                }
            };
        }

        visit!(self.function_definitions, ElementKind::FunctionDefinition);
        visit!(self.unit_definitions, ElementKind::UnitDefinition);
        visit!(self.compartments, ElementKind::Compartment);
        visit!(self.species, ElementKind::Species);
        visit!(self.parameters, ElementKind::Parameter);
        visit!(self.initial_assignments, ElementKind::InitialAssignment);
        visit!(self.rules, ElementKind::Rule);
        visit!(self.constraints, ElementKind::Constraint);
        for reaction in &self.reactions {
            f(ElementKind::Reaction, &reaction.sbase);
            visit_uncertainties(&reaction.sbase, f);
            visit!(reaction.reactants, ElementKind::SpeciesReference);
            visit!(reaction.products, ElementKind::SpeciesReference);
            visit!(reaction.modifiers, ElementKind::ModifierSpeciesReference);
            if let Some(law) = &reaction.kinetic_law {
                f(ElementKind::KineticLaw, &law.sbase);
                visit!(law.local_parameters, ElementKind::LocalParameter);
            }
        }
        for event in &self.events {
            f(ElementKind::Event, &event.sbase);
            visit_uncertainties(&event.sbase, f);
            visit!(event.assignments, ElementKind::EventAssignment);
        }
        for submodel in &self.submodels {
            f(ElementKind::Submodel, &submodel.sbase);
            visit!(submodel.deletions, ElementKind::Deletion);
        }
        visit!(self.ports, ElementKind::Port);
        for objective in &self.objectives {
            f(ElementKind::Objective, &objective.sbase);
            visit!(objective.flux_objectives, ElementKind::FluxObjective);
        }
        visit!(self.gene_products, ElementKind::GeneProduct);
    }

    /// Mutable counterpart of [`Model::for_each_sbase`].
    pub fn for_each_sbase_mut(&mut self, f: &mut impl FnMut(ElementKind, &mut SBase)) {
        f(ElementKind::Model, &mut self.sbase);
        visit_uncertainties_mut(&mut self.sbase, f);

        macro_rules! visit {
            ($items:expr, $kind:expr) => {
                for item in $items.iter_mut() {
                    f($kind, &mut item.sbase);
                    visit_uncertainties_mut(&mut item.sbase, f);
                }
            };
        }

        visit!(self.function_definitions, ElementKind::FunctionDefinition);
        visit!(self.unit_definitions, ElementKind::UnitDefinition);
        visit!(self.compartments, ElementKind::Compartment);
        visit!(self.species, ElementKind::Species);
        visit!(self.parameters, ElementKind::Parameter);
        visit!(self.initial_assignments, ElementKind::InitialAssignment);
        visit!(self.rules, ElementKind::Rule);
        visit!(self.constraints, ElementKind::Constraint);
        for reaction in self.reactions.iter_mut() {
            f(ElementKind::Reaction, &mut reaction.sbase);
            visit_uncertainties_mut(&mut reaction.sbase, f);
            visit!(reaction.reactants, ElementKind::SpeciesReference);
            visit!(reaction.products, ElementKind::SpeciesReference);
            visit!(reaction.modifiers, ElementKind::ModifierSpeciesReference);
            if let Some(law) = reaction.kinetic_law.as_mut() {
                f(ElementKind::KineticLaw, &mut law.sbase);
                visit!(law.local_parameters, ElementKind::LocalParameter);
            }
        }
        for event in self.events.iter_mut() {
            f(ElementKind::Event, &mut event.sbase);
            visit_uncertainties_mut(&mut event.sbase, f);
            visit!(event.assignments, ElementKind::EventAssignment);
        }
        for submodel in self.submodels.iter_mut() {
            f(ElementKind::Submodel, &mut submodel.sbase);
            visit!(submodel.deletions, ElementKind::Deletion);
        }
        visit!(self.ports, ElementKind::Port);
        for objective in self.objectives.iter_mut() {
            f(ElementKind::Objective, &mut objective.sbase);
            visit!(objective.flux_objectives, ElementKind::FluxObjective);
        }
        visit!(self.gene_products, ElementKind::GeneProduct);
    }

    /// Visits every math expression of the model with the kind and id of
    /// the element holding it.
    pub fn for_each_math<'a>(&'a self, f: &mut impl FnMut(ElementKind, &'a str, &'a Math)) {
        for fd in &self.function_definitions {
            f(ElementKind::FunctionDefinition, fd.sbase.id(), &fd.math);
        }
        for ia in &self.initial_assignments {
            f(ElementKind::InitialAssignment, &ia.symbol, &ia.math);
        }
        for rule in &self.rules {
            f(ElementKind::Rule, rule.variable.as_deref().unwrap_or_default(), &rule.math);
        }
        for constraint in &self.constraints {
            f(ElementKind::Constraint, constraint.sbase.id(), &constraint.math);
        }
        for reaction in &self.reactions {
            if let Some(law) = &reaction.kinetic_law {
                f(ElementKind::KineticLaw, reaction.sbase.id(), &law.math);
            }
        }
        for event in &self.events {
            let id = event.sbase.id();
            f(ElementKind::Event, id, &event.trigger.math);
            if let Some(priority) = &event.priority {
                f(ElementKind::Event, id, priority);
            }
            if let Some(delay) = &event.delay {
                f(ElementKind::Event, id, delay);
            }
            for ea in &event.assignments {
                f(ElementKind::EventAssignment, &ea.variable, &ea.math);
            }
        }
        self.for_each_sbase(&mut |kind, sbase| {
            for uncertainty in &sbase.uncertainties {
                for parameter in &uncertainty.parameters {
                    if let UncertParameter::Distribution { math, .. } = parameter {
                        f(kind, sbase.id(), math);
                    }
                }
            }
        });
    }

    /// Applies `f` to every math expression of the model.
    pub fn for_each_math_mut(&mut self, f: &mut impl FnMut(ElementKind, &mut Math)) {
        for fd in self.function_definitions.iter_mut() {
            f(ElementKind::FunctionDefinition, &mut fd.math);
        }
        for ia in self.initial_assignments.iter_mut() {
            f(ElementKind::InitialAssignment, &mut ia.math);
        }
        for rule in self.rules.iter_mut() {
            f(ElementKind::Rule, &mut rule.math);
        }
        for constraint in self.constraints.iter_mut() {
            f(ElementKind::Constraint, &mut constraint.math);
        }
        for reaction in self.reactions.iter_mut() {
            if let Some(law) = reaction.kinetic_law.as_mut() {
                f(ElementKind::KineticLaw, &mut law.math);
            }
        }
        for event in self.events.iter_mut() {
            f(ElementKind::Event, &mut event.trigger.math);
            if let Some(priority) = event.priority.as_mut() {
                f(ElementKind::Event, priority);
            }
            if let Some(delay) = event.delay.as_mut() {
                f(ElementKind::Event, delay);
            }
            for ea in event.assignments.iter_mut() {
                f(ElementKind::EventAssignment, &mut ea.math);
            }
        }
        self.for_each_sbase_mut(&mut |kind, sbase| {
            for uncertainty in sbase.uncertainties.iter_mut() {
                for parameter in uncertainty.parameters.iter_mut() {
                    if let UncertParameter::Distribution { math, .. } = parameter {
                        f(kind, math);
                    }
                }
            }
        });
    }
}

fn visit_uncertainties<'a>(sbase: &'a SBase, f: &mut impl FnMut(ElementKind, &'a SBase)) {
    for uncertainty in &sbase.uncertainties {
        f(ElementKind::Uncertainty, &uncertainty.sbase);
    }
}

fn visit_uncertainties_mut(sbase: &mut SBase, f: &mut impl FnMut(ElementKind, &mut SBase)) {
    for uncertainty in sbase.uncertainties.iter_mut() {
        f(ElementKind::Uncertainty, &mut uncertainty.sbase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_display() {
        let association = Association::Or(vec![
            Association::And(vec![
                Association::GeneProduct("G1".into()),
                Association::GeneProduct("G2".into()),
            ]),
            Association::GeneProduct("G3".into()),
        ]);
        assert_eq!(association.to_string(), "(G1 and G2) or G3");
        assert_eq!(association.gene_products(), vec!["G1", "G2", "G3"]);
    }

    #[test]
    fn test_statistic_names() {
        assert_eq!(
            PointStatistic::parse("coefficientOfVariation"),
            Some(PointStatistic::CoefficientOfVariation)
        );
        assert_eq!(SpanStatistic::parse("range"), Some(SpanStatistic::Range));
        assert_eq!(PointStatistic::parse("range"), None);
    }

    #[test]
    fn test_kind_of_ignores_local_parameters() {
        let mut model = Model::default();
        model.parameters.push(Parameter {
            sbase: SBase::with_id("k1"),
            value: Some(1.0),
            units: None,
            constant: true,
        });
        assert_eq!(model.kind_of("k1"), Some(ElementKind::Parameter));
        assert_eq!(model.kind_of("k2"), None);
    }
}

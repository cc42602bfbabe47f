//! Object factory
//!
//! Checks every descriptor record on its own and converts it into the
//! corresponding SBML object. Checks that need other entities (references,
//! duplicate ids, rule cycles) are left to the [`builder`](crate::builder).
//!
//! Unresolved units are tolerated here; only their syntax is checked.

use std::str::FromStr;

use crate::annotation::{add_cv_term, ensure_metaid, Annotation, AnnotationError};
use crate::descriptor::{
    self, ComponentRef, Meta, UncertaintyParameter, UncertaintyType, UnitSpec, Value,
};
use crate::equation::{parse_equation, EquationPart, Stoichiometry};
use crate::error::{BuildError, BuildWarning, WarningKind};
use crate::math::{parse_formula, Math, Operator};
use crate::sbml::{
    self, is_valid_metaid, is_valid_sid, normalize_sbo, xml::XmlElement, Association, Package,
    RefTarget, RuleKind, SBase, UncertParameter, XHTML_NS,
};
use crate::units::{parse_unit_string, UnitRef};

/// State shared by all normalizations of one build.
#[derive(Debug, Clone, Default)]
pub struct FactoryContext {
    /// Packages the model enables
    pub packages: Vec<Package>,
    /// Turns annotation problems into errors
    pub strict_annotations: bool,
    /// Model substance unit, the default of species substance units
    pub substance_unit: Option<String>,
    pub warnings: Vec<BuildWarning>,
}

impl FactoryContext {
    pub fn new(packages: Vec<Package>, strict_annotations: bool) -> Self {
        Self {
            packages,
            strict_annotations,
            ..Default::default()
        }
    }

    pub(crate) fn require(&self, package: Package, sid: &str) -> Result<(), BuildError> {
        if self.packages.contains(&package) {
            Ok(())
        } else {
            Err(BuildError::PackageNotEnabled {
                sid: sid.to_string(),
                package,
            })
        }
    }

    /// Parses a formula of `sid`. Distribution functions need the distrib
    /// package.
    pub(crate) fn math(&self, sid: &str, formula: &str) -> Result<Math, BuildError> {
        let math = parse_math(sid, formula)?;
        if math.uses_distributions() {
            self.require(Package::Distrib, sid)?;
        }
        Ok(math)
    }

    fn value_math(&self, sid: &str, value: &Value) -> Result<Math, BuildError> {
        match value {
            Value::Number(v) => Ok(Math::number(*v)),
            Value::Formula(formula) => self.math(sid, formula),
        }
    }

    fn annotation_issue(&mut self, sid: &str, error: AnnotationError) -> Result<(), BuildError> {
        if self.strict_annotations {
            return Err(BuildError::AnnotationError {
                sid: sid.to_string(),
                source: error,
            });
        }
        self.warnings.push(BuildWarning::log(
            WarningKind::Annotation,
            Some(sid),
            error.to_string(),
        ));
        Ok(())
    }
}

/// Conversion of a descriptor record into its SBML counterpart.
pub trait Normalize {
    type Output;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError>;
}

/// Math derived from formula values of compartments and parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedMath {
    Initial(sbml::InitialAssignment),
    Rule(sbml::Rule),
}

/// An SBML object plus the assignments derived from its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub element: T,
    pub derived: Option<DerivedMath>,
}

/// A reaction with the objects created along with it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReaction {
    pub reaction: sbml::Reaction,
    pub parameters: Vec<Normalized<sbml::Parameter>>,
    pub rules: Vec<sbml::Rule>,
    /// `(species reference id, symbol)` of variable stoichiometries
    pub stoichiometries: Vec<(String, String)>,
}

pub(crate) fn check_sid(kind: &str, sid: &str) -> Result<(), BuildError> {
    if is_valid_sid(sid) {
        Ok(())
    } else {
        Err(BuildError::InvalidId {
            kind: kind.to_string(),
            sid: sid.to_string(),
        })
    }
}

pub(crate) fn parse_math(sid: &str, formula: &str) -> Result<Math, BuildError> {
    parse_formula(formula).map_err(|e| BuildError::math(sid, formula, e))
}

fn normalize_unit(sid: &str, unit: Option<&String>) -> Result<Option<String>, BuildError> {
    unit.map(|u| {
        UnitRef::normalize(u).map_err(|source| BuildError::InvalidUnit {
            sid: sid.to_string(),
            source,
        })
    })
    .transpose()
}

/// Wraps notes into an XHTML `<body>` unless they already are a `<body>` or
/// `<html>` fragment.
pub fn normalize_notes(sid: &str, notes: &str) -> Result<XmlElement, BuildError> {
    let trimmed = notes.trim();
    let source = if trimmed.starts_with("<body") || trimmed.starts_with("<html") {
        trimmed.to_string()
    } else {
        format!("<body xmlns=\"{XHTML_NS}\">{trimmed}</body>")
    };
    XmlElement::parse(&source).map_err(|e| BuildError::InvalidNotes {
        sid: sid.to_string(),
        reason: e.to_string(),
    })
}

/// Converts the shared fields of a record.
///
/// # Arguments
///
/// * `meta` - Shared fields of the record
/// * `kind` - Kind of the record, used in messages
/// * `with_id` - Whether `sid` is the id of the element; assignments and rules use it as target instead
/// * `ctx` - Factory state
pub(crate) fn normalize_meta(
    meta: &Meta,
    kind: &str,
    with_id: bool,
    ctx: &mut FactoryContext,
) -> Result<SBase, BuildError> {
    let sid = meta.sid.as_str();
    check_sid(kind, sid)?;

    let mut sbase = SBase {
        id: with_id.then(|| sid.to_string()),
        name: meta.name.clone(),
        metaid: meta.metaid.clone(),
        ..Default::default()
    };

    if let Some(metaid) = &meta.metaid {
        if !is_valid_metaid(metaid) {
            return Err(BuildError::InvalidId {
                kind: "meta".to_string(),
                sid: metaid.clone(),
            });
        }
    }
    if let Some(sbo) = &meta.sbo {
        sbase.sbo_term = Some(normalize_sbo(sbo)?);
    }
    if let Some(notes) = &meta.notes {
        sbase.notes = Some(normalize_notes(sid, notes)?);
    }

    for (qualifier, resource) in &meta.annotations {
        let annotation = match Annotation::new(*qualifier, resource) {
            Ok(annotation) => annotation,
            Err(error) => {
                ctx.annotation_issue(sid, error)?;
                continue;
            }
        };
        if let Err(error) = annotation.validate() {
            ctx.annotation_issue(sid, error)?;
        }
        if let Some(term) = annotation.sbo_term() {
            if sbase.sbo_term.is_none() {
                sbase.sbo_term = normalize_sbo(term).ok();
            }
        }
        add_cv_term(&mut sbase, &annotation);
    }

    if !sbase.cv_terms.is_empty() && sbase.metaid.is_none() {
        let fallback = if with_id {
            sid.to_string()
        } else {
            format!("{sid}_{}", kind.replace(' ', "_"))
        };
        ensure_metaid(&mut sbase, &fallback);
        ctx.warnings.push(BuildWarning::new(
            WarningKind::AutoMetaId,
            Some(sid),
            format!("Generated meta id for annotated {kind}"),
        ));
    }

    if !meta.uncertainties.is_empty() {
        ctx.require(Package::Distrib, sid)?;
        sbase.uncertainties = meta
            .uncertainties
            .iter()
            .map(|u| normalize_uncertainty(sid, u))
            .collect::<Result<_, _>>()?;
    }

    Ok(sbase)
}

fn normalize_uncertainty(
    sid: &str,
    uncertainty: &descriptor::Uncertainty,
) -> Result<sbml::Uncertainty, BuildError> {
    let mut sbase = SBase::default();
    if let Some(id) = &uncertainty.sid {
        check_sid("uncertainty", id)?;
        sbase.id = Some(id.clone());
    }

    let mut parameters = uncertainty
        .parameters
        .iter()
        .map(|p| normalize_uncert_parameter(sid, p))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(formula) = &uncertainty.formula {
        let math = parse_math(sid, formula)?;
        let Math::Apply {
            op: Operator::Distrib(distribution),
            ..
        } = &math
        else {
            return Err(BuildError::invalid(
                sid,
                format!("uncertainty formula '{formula}' is not a distribution"),
            ));
        };
        parameters.push(UncertParameter::Distribution {
            definition_url: distribution.url(),
            math,
        });
    }

    Ok(sbml::Uncertainty { sbase, parameters })
}

fn normalize_uncert_parameter(
    sid: &str,
    parameter: &UncertaintyParameter,
) -> Result<UncertParameter, BuildError> {
    let units = normalize_unit(sid, parameter.unit.as_ref())?;
    match parameter.kind {
        UncertaintyType::Point(statistic) => {
            if parameter.value.is_none() && parameter.var.is_none() {
                return Err(BuildError::MissingField {
                    sid: sid.to_string(),
                    field: format!("value of {}", statistic.as_str()),
                });
            }
            Ok(UncertParameter::Point {
                statistic,
                value: parameter.value,
                var: parameter.var.clone(),
                units,
            })
        }
        UncertaintyType::Span(statistic) => {
            let has_lower = parameter.lower.is_some() || parameter.var_lower.is_some();
            let has_upper = parameter.upper.is_some() || parameter.var_upper.is_some();
            if !has_lower || !has_upper {
                return Err(BuildError::MissingField {
                    sid: sid.to_string(),
                    field: format!("lower and upper of {}", statistic.as_str()),
                });
            }
            Ok(UncertParameter::Span {
                statistic,
                value_lower: parameter.lower,
                var_lower: parameter.var_lower.clone(),
                value_upper: parameter.upper,
                var_upper: parameter.var_upper.clone(),
                units,
            })
        }
    }
}

/// Splits a value into a numeric value or the math assigned to `sid`.
fn derive_value(
    ctx: &FactoryContext,
    sid: &str,
    value: Option<&Value>,
    constant: bool,
) -> Result<(Option<f64>, Option<DerivedMath>), BuildError> {
    let formula = match value {
        None => return Ok((None, None)),
        Some(Value::Number(v)) => return Ok((Some(*v), None)),
        Some(Value::Formula(formula)) => formula,
    };
    if let Ok(number) = formula.trim().parse::<f64>() {
        return Ok((Some(number), None));
    }

    let math = ctx.math(sid, formula)?;
    let derived = if constant {
        DerivedMath::Initial(sbml::InitialAssignment {
            sbase: SBase::default(),
            symbol: sid.to_string(),
            math,
        })
    } else {
        DerivedMath::Rule(sbml::Rule {
            sbase: SBase::default(),
            kind: RuleKind::Assignment,
            variable: Some(sid.to_string()),
            math,
        })
    };
    Ok((None, Some(derived)))
}

impl Normalize for descriptor::UnitDefinition {
    type Output = sbml::UnitDefinition;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sbase = normalize_meta(&self.meta, "unit definition", true, ctx)?;
        let units = match &self.units {
            UnitSpec::Factors(units) => units.clone(),
            UnitSpec::Formula(formula) => {
                parse_unit_string(formula).map_err(|source| BuildError::InvalidUnit {
                    sid: self.meta.sid.clone(),
                    source,
                })?
            }
        };
        if units.is_empty() {
            return Err(BuildError::MissingField {
                sid: self.meta.sid.clone(),
                field: "units".to_string(),
            });
        }
        Ok(sbml::UnitDefinition { sbase, units })
    }
}

impl Normalize for descriptor::Function {
    type Output = sbml::FunctionDefinition;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sbase = normalize_meta(&self.meta, "function", true, ctx)?;
        let math = ctx.math(&self.meta.sid, &self.value)?;
        if !matches!(math, Math::Lambda { .. }) {
            return Err(BuildError::invalid(
                &self.meta.sid,
                format!("function value '{}' is not a lambda expression", self.value),
            ));
        }
        Ok(sbml::FunctionDefinition { sbase, math })
    }
}

impl Normalize for descriptor::Compartment {
    type Output = Normalized<sbml::Compartment>;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "compartment", true, ctx)?;
        if !(0.0..=3.0).contains(&self.spatial_dimensions) {
            return Err(BuildError::invalid(
                sid,
                format!(
                    "spatial dimensions must be between 0 and 3, found {}",
                    self.spatial_dimensions
                ),
            ));
        }
        let (size, derived) = derive_value(ctx, sid, self.value.as_ref(), self.constant)?;
        Ok(Normalized {
            element: sbml::Compartment {
                sbase,
                spatial_dimensions: Some(self.spatial_dimensions),
                size,
                units: normalize_unit(sid, self.unit.as_ref())?,
                constant: self.constant,
            },
            derived,
        })
    }
}

impl Normalize for descriptor::Species {
    type Output = sbml::Species;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "species", true, ctx)?;

        if self.compartment.trim().is_empty() {
            return Err(BuildError::MissingField {
                sid: sid.to_string(),
                field: "compartment".to_string(),
            });
        }
        match (self.initial_amount, self.initial_concentration) {
            (Some(_), Some(_)) => {
                return Err(BuildError::SpeciesModeConflict {
                    sid: sid.to_string(),
                    reason: "both initial_amount and initial_concentration are set".to_string(),
                })
            }
            (None, None) => {
                return Err(BuildError::SpeciesModeConflict {
                    sid: sid.to_string(),
                    reason: "either initial_amount or initial_concentration is required"
                        .to_string(),
                })
            }
            _ => {}
        }
        if self.charge.is_some() || self.chemical_formula.is_some() {
            ctx.require(Package::Fbc, sid)?;
        }

        let substance_units = match &self.substance_unit {
            Some(unit) => normalize_unit(sid, Some(unit))?,
            None => ctx.substance_unit.clone(),
        };

        Ok(sbml::Species {
            sbase,
            compartment: self.compartment.clone(),
            initial_amount: self.initial_amount,
            initial_concentration: self.initial_concentration,
            substance_units,
            has_only_substance_units: self.has_only_substance_units,
            boundary_condition: self.boundary_condition,
            constant: self.constant,
            conversion_factor: self.conversion_factor.clone(),
            charge: self.charge,
            chemical_formula: self.chemical_formula.clone(),
        })
    }
}

impl Normalize for descriptor::Parameter {
    type Output = Normalized<sbml::Parameter>;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "parameter", true, ctx)?;
        let (value, derived) = derive_value(ctx, sid, self.value.as_ref(), self.constant)?;
        Ok(Normalized {
            element: sbml::Parameter {
                sbase,
                value,
                units: normalize_unit(sid, self.unit.as_ref())?,
                constant: self.constant,
            },
            derived,
        })
    }
}

impl Normalize for descriptor::InitialAssignment {
    type Output = sbml::InitialAssignment;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "initial assignment", false, ctx)?;
        normalize_unit(sid, self.unit.as_ref())?;
        Ok(sbml::InitialAssignment {
            sbase,
            symbol: sid.to_string(),
            math: ctx.value_math(sid, &self.value)?,
        })
    }
}

impl Normalize for descriptor::Rule {
    type Output = sbml::Rule;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let algebraic = self.kind == RuleKind::Algebraic;
        let sbase = normalize_meta(&self.meta, "rule", algebraic, ctx)?;
        normalize_unit(sid, self.unit.as_ref())?;
        Ok(sbml::Rule {
            sbase,
            kind: self.kind,
            variable: (!algebraic).then(|| sid.to_string()),
            math: ctx.value_math(sid, &self.value)?,
        })
    }
}

impl Normalize for descriptor::Constraint {
    type Output = sbml::Constraint;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "constraint", true, ctx)?;
        let math = ctx.math(sid, &self.value)?;
        if math.is_boolean() == Some(false) {
            return Err(BuildError::invalid(
                sid,
                format!("constraint '{}' is not a Boolean expression", self.value),
            ));
        }
        Ok(sbml::Constraint {
            sbase,
            math,
            message: self.message.clone(),
        })
    }
}

impl Normalize for descriptor::Event {
    type Output = sbml::Event;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "event", true, ctx)?;
        let trigger = ctx.math(sid, &self.trigger)?;
        if trigger.is_boolean() == Some(false) {
            return Err(BuildError::invalid(
                sid,
                format!("trigger '{}' is not a Boolean expression", self.trigger),
            ));
        }

        let assignments = self
            .assignments
            .iter()
            .map(|ea| {
                check_sid("event assignment variable", &ea.variable)?;
                Ok(sbml::EventAssignment {
                    sbase: SBase::default(),
                    variable: ea.variable.clone(),
                    math: ctx.value_math(sid, &ea.value)?,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        Ok(sbml::Event {
            sbase,
            use_values_from_trigger_time: self.use_values_from_trigger_time,
            trigger: sbml::Trigger {
                initial_value: self.initial_value,
                persistent: self.persistent,
                math: trigger,
            },
            priority: self
                .priority
                .as_deref()
                .map(|p| ctx.math(sid, p))
                .transpose()?,
            delay: self
                .delay
                .as_deref()
                .map(|d| ctx.math(sid, d))
                .transpose()?,
            assignments,
        })
    }
}

impl Normalize for descriptor::Reaction {
    type Output = NormalizedReaction;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        let sid = self.meta.sid.as_str();
        let sbase = normalize_meta(&self.meta, "reaction", true, ctx)?;
        let equation = parse_equation(&self.equation).map_err(|source| {
            BuildError::InvalidEquation {
                sid: sid.to_string(),
                source,
            }
        })?;

        let mut stoichiometries = Vec::new();
        let mut species_reference = |part: &EquationPart| -> Result<sbml::SpeciesReference, BuildError> {
            check_sid("species", &part.species)?;
            Ok(match &part.stoichiometry {
                Stoichiometry::Constant(value) => sbml::SpeciesReference {
                    sbase: SBase::default(),
                    species: part.species.clone(),
                    stoichiometry: Some(*value),
                    constant: true,
                },
                Stoichiometry::Symbol(symbol) => {
                    let id = format!("{sid}_{}_stoich", part.species);
                    if stoichiometries.iter().any(|(existing, _)| *existing == id) {
                        return Err(BuildError::invalid(
                            sid,
                            format!(
                                "species '{}' appears more than once with a variable stoichiometry",
                                part.species
                            ),
                        ));
                    }
                    stoichiometries.push((id.clone(), symbol.clone()));
                    sbml::SpeciesReference {
                        sbase: SBase::with_id(id),
                        species: part.species.clone(),
                        stoichiometry: None,
                        constant: false,
                    }
                }
            })
        };
        let reactants = equation
            .reactants
            .iter()
            .map(&mut species_reference)
            .collect::<Result<Vec<_>, _>>()?;
        let products = equation
            .products
            .iter()
            .map(&mut species_reference)
            .collect::<Result<Vec<_>, _>>()?;
        let modifiers = equation
            .modifiers
            .iter()
            .map(|m| {
                check_sid("species", m)?;
                Ok(sbml::ModifierSpeciesReference {
                    sbase: SBase::default(),
                    species: m.clone(),
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let kinetic_law = match &self.formula {
            Some(formula) => {
                normalize_unit(sid, formula.unit.as_ref())?;
                let local_parameters = self
                    .local_parameters
                    .iter()
                    .map(|lp| {
                        check_sid("local parameter", &lp.sid)?;
                        Ok(sbml::LocalParameter {
                            sbase: SBase::with_id(lp.sid.clone()),
                            value: lp.value,
                            units: normalize_unit(&lp.sid, lp.unit.as_ref())?,
                        })
                    })
                    .collect::<Result<Vec<_>, BuildError>>()?;
                Some(sbml::KineticLaw {
                    sbase: SBase::default(),
                    math: ctx.math(sid, &formula.value)?,
                    local_parameters,
                })
            }
            None if !self.local_parameters.is_empty() => {
                return Err(BuildError::MissingField {
                    sid: sid.to_string(),
                    field: "formula".to_string(),
                })
            }
            None => None,
        };

        if self.lower_flux_bound.is_some() || self.upper_flux_bound.is_some() {
            ctx.require(Package::Fbc, sid)?;
        }
        let gene_product_association = match &self.gene_association {
            Some(association) if !association.trim().is_empty() => {
                ctx.require(Package::Fbc, sid)?;
                Some(parse_gene_association(association).map_err(|reason| {
                    BuildError::InvalidGeneAssociation {
                        sid: sid.to_string(),
                        association: association.clone(),
                        reason,
                    }
                })?)
            }
            _ => None,
        };

        let parameters = self
            .pars
            .iter()
            .map(|p| p.normalize(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        let rules = self
            .rules
            .iter()
            .map(|r| r.normalize(ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NormalizedReaction {
            reaction: sbml::Reaction {
                sbase,
                reversible: self.reversible.unwrap_or(equation.reversible),
                fast: self.fast,
                compartment: self.compartment.clone(),
                reactants,
                products,
                modifiers,
                kinetic_law,
                lower_flux_bound: self.lower_flux_bound.clone(),
                upper_flux_bound: self.upper_flux_bound.clone(),
                gene_product_association,
            },
            parameters,
            rules,
            stoichiometries,
        })
    }
}

fn component_target(sid: &str, target: &ComponentRef) -> Result<RefTarget, BuildError> {
    target.target().ok_or_else(|| {
        BuildError::invalid(
            sid,
            "exactly one of port_ref, id_ref, unit_ref or metaid_ref is required",
        )
    })
}

impl Normalize for descriptor::ExternalModelDefinition {
    type Output = sbml::ExternalModelDefinition;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Comp, &self.meta.sid)?;
        let sbase = normalize_meta(&self.meta, "external model definition", true, ctx)?;
        if self.source.trim().is_empty() {
            return Err(BuildError::MissingField {
                sid: self.meta.sid.clone(),
                field: "source".to_string(),
            });
        }
        Ok(sbml::ExternalModelDefinition {
            sbase,
            source: self.source.clone(),
            model_ref: self.model_ref.clone(),
            md5: self.md5.clone(),
        })
    }
}

impl Normalize for descriptor::Submodel {
    type Output = sbml::Submodel;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Comp, &self.meta.sid)?;
        let sbase = normalize_meta(&self.meta, "submodel", true, ctx)?;
        check_sid("model", &self.model_ref)?;
        Ok(sbml::Submodel {
            sbase,
            model_ref: self.model_ref.clone(),
            time_conversion_factor: self.time_conversion_factor.clone(),
            extent_conversion_factor: self.extent_conversion_factor.clone(),
            deletions: Vec::new(),
        })
    }
}

impl Normalize for descriptor::Port {
    type Output = sbml::Port;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Comp, &self.meta.sid)?;
        let sbase = normalize_meta(&self.meta, "port", true, ctx)?;
        Ok(sbml::Port {
            sbase,
            target: component_target(&self.meta.sid, &self.target)?,
        })
    }
}

impl Normalize for descriptor::Deletion {
    /// `(submodel, deletion)`
    type Output = (String, sbml::Deletion);

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Comp, &self.meta.sid)?;
        let sbase = normalize_meta(&self.meta, "deletion", true, ctx)?;
        Ok((
            self.submodel_ref.clone(),
            sbml::Deletion {
                sbase,
                target: component_target(&self.meta.sid, &self.target)?,
            },
        ))
    }
}

impl Normalize for descriptor::ReplacedElement {
    /// `(replacing element, replaced element)`
    type Output = (String, sbml::ReplacedElement);

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Comp, &self.meta.sid)?;
        check_sid("replaced element", &self.meta.sid)?;
        check_sid("element", &self.element_ref)?;
        Ok((
            self.element_ref.clone(),
            sbml::ReplacedElement {
                submodel_ref: self.submodel_ref.clone(),
                target: component_target(&self.meta.sid, &self.target)?,
                conversion_factor: self.conversion_factor.clone(),
            },
        ))
    }
}

impl Normalize for descriptor::ReplacedBy {
    /// `(replaced element, replacement)`
    type Output = (String, sbml::ReplacedBy);

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Comp, &self.meta.sid)?;
        check_sid("replaced by", &self.meta.sid)?;
        check_sid("element", &self.element_ref)?;
        Ok((
            self.element_ref.clone(),
            sbml::ReplacedBy {
                submodel_ref: self.submodel_ref.clone(),
                target: component_target(&self.meta.sid, &self.target)?,
            },
        ))
    }
}

impl Normalize for descriptor::Objective {
    /// `(objective, active)`
    type Output = (sbml::Objective, bool);

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Fbc, &self.meta.sid)?;
        let sbase = normalize_meta(&self.meta, "objective", true, ctx)?;
        let flux_objectives = self
            .flux_objectives
            .iter()
            .map(|fo| {
                check_sid("reaction", &fo.reaction)?;
                Ok(sbml::FluxObjective {
                    sbase: SBase::default(),
                    reaction: fo.reaction.clone(),
                    coefficient: fo.coefficient,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;
        Ok((
            sbml::Objective {
                sbase,
                objective_type: self.objective_type,
                flux_objectives,
            },
            self.active,
        ))
    }
}

impl Normalize for descriptor::GeneProduct {
    type Output = sbml::GeneProduct;

    fn normalize(&self, ctx: &mut FactoryContext) -> Result<Self::Output, BuildError> {
        ctx.require(Package::Fbc, &self.meta.sid)?;
        let sbase = normalize_meta(&self.meta, "gene product", true, ctx)?;
        if self.label.trim().is_empty() {
            return Err(BuildError::MissingField {
                sid: self.meta.sid.clone(),
                field: "label".to_string(),
            });
        }
        Ok(sbml::GeneProduct {
            sbase,
            label: self.label.clone(),
            associated_species: self.associated_species.clone(),
        })
    }
}

/// Id of the gene product created for an undeclared label.
pub fn gene_product_id(label: &str) -> String {
    let mut id: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !id.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        id.insert_str(0, "G_");
    }
    id
}

#[derive(Debug, Clone, PartialEq)]
enum GeneToken {
    Label(String),
    And,
    Or,
    Open,
    Close,
}

impl FromStr for Association {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_gene_association(s)
    }
}

/// Parses a gene association such as `(G1 and G2) or G3`. `and` binds
/// tighter than `or`; nested operators of the same kind are merged.
///
/// The association references gene product labels.
pub fn parse_gene_association(input: &str) -> Result<Association, String> {
    let tokens = tokenize_association(input)?;
    let mut parser = AssociationParser { tokens, pos: 0 };
    let association = parser.or_expr()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(association),
        Some(token) => Err(format!("unexpected {token:?}")),
    }
}

fn tokenize_association(input: &str) -> Result<Vec<GeneToken>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(GeneToken::Open);
            }
            ')' => {
                chars.next();
                tokens.push(GeneToken::Close);
            }
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-') => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-') {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.to_lowercase().as_str() {
                    "and" => GeneToken::And,
                    "or" => GeneToken::Or,
                    _ => GeneToken::Label(word),
                });
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    if tokens.is_empty() {
        return Err("empty association".to_string());
    }
    Ok(tokens)
}

struct AssociationParser {
    tokens: Vec<GeneToken>,
    pos: usize,
}

impl AssociationParser {
    fn next(&mut self) -> Option<GeneToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&GeneToken> {
        self.tokens.get(self.pos)
    }

    fn or_expr(&mut self) -> Result<Association, String> {
        let mut items = vec![self.and_expr()?];
        while self.peek() == Some(&GeneToken::Or) {
            self.pos += 1;
            items.push(self.and_expr()?);
        }
        Ok(combine(items, false))
    }

    fn and_expr(&mut self) -> Result<Association, String> {
        let mut items = vec![self.atom()?];
        while self.peek() == Some(&GeneToken::And) {
            self.pos += 1;
            items.push(self.atom()?);
        }
        Ok(combine(items, true))
    }

    fn atom(&mut self) -> Result<Association, String> {
        match self.next() {
            Some(GeneToken::Label(label)) => Ok(Association::GeneProduct(label)),
            Some(GeneToken::Open) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some(GeneToken::Close) => Ok(inner),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of association".to_string()),
        }
    }
}

fn combine(items: Vec<Association>, and: bool) -> Association {
    if items.len() == 1 {
        return items.into_iter().next().unwrap_or(Association::Or(Vec::new()));
    }
    let flattened = items
        .into_iter()
        .flat_map(|item| match item {
            Association::And(inner) if and => inner,
            Association::Or(inner) if !and => inner,
            other => vec![other],
        })
        .collect();
    if and {
        Association::And(flattened)
    } else {
        Association::Or(flattened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Qualifier;
    use crate::descriptor::{
        CompartmentBuilder, EventBuilder, ParameterBuilder, ReactionBuilder, SpeciesBuilder,
        UnitDefinition,
    };
    use pretty_assertions::assert_eq;

    fn ctx() -> FactoryContext {
        FactoryContext::new(vec![Package::Fbc, Package::Comp, Package::Distrib], false)
    }

    #[test]
    fn test_invalid_sid() {
        let compartment = CompartmentBuilder::default().meta("1c").build().unwrap();
        assert!(matches!(
            compartment.normalize(&mut ctx()),
            Err(BuildError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_species_mode_conflict() {
        let species = SpeciesBuilder::default()
            .meta("A")
            .compartment("c")
            .initial_amount(1.0)
            .initial_concentration(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            species.normalize(&mut ctx()),
            Err(BuildError::SpeciesModeConflict { .. })
        ));

        let species = SpeciesBuilder::default()
            .meta("A")
            .compartment("c")
            .build()
            .unwrap();
        assert!(matches!(
            species.normalize(&mut ctx()),
            Err(BuildError::SpeciesModeConflict { .. })
        ));
    }

    #[test]
    fn test_species_default_substance_unit() {
        let mut ctx = ctx();
        ctx.substance_unit = Some("mmole".to_string());
        let species = SpeciesBuilder::default()
            .meta("A")
            .compartment("c")
            .initial_amount(1.0)
            .build()
            .unwrap()
            .normalize(&mut ctx)
            .unwrap();
        assert_eq!(species.substance_units.as_deref(), Some("mmole"));
    }

    #[test]
    fn test_formula_value_becomes_assignment() {
        let parameter = ParameterBuilder::default()
            .meta("p")
            .value("2 * k")
            .build()
            .unwrap()
            .normalize(&mut ctx())
            .unwrap();
        assert_eq!(parameter.element.value, None);
        assert!(matches!(parameter.derived, Some(DerivedMath::Initial(_))));

        let parameter = ParameterBuilder::default()
            .meta("p")
            .value("2 * k")
            .constant(false)
            .build()
            .unwrap()
            .normalize(&mut ctx())
            .unwrap();
        assert!(matches!(parameter.derived, Some(DerivedMath::Rule(_))));
    }

    #[test]
    fn test_annotations_and_metaid() {
        let mut ctx = ctx();
        let compartment = CompartmentBuilder::default()
            .meta(
                Meta::new("c")
                    .with_annotation(Qualifier::BQB_IS, "go/GO:0005829")
                    .with_annotation(Qualifier::BQB_IS, "sbo/SBO:0000290"),
            )
            .build()
            .unwrap()
            .normalize(&mut ctx)
            .unwrap();
        let sbase = compartment.element.sbase;
        assert_eq!(sbase.cv_terms.len(), 2);
        assert_eq!(sbase.metaid.as_deref(), Some("meta_c"));
        assert_eq!(sbase.sbo_term.as_deref(), Some("SBO:0000290"));
    }

    #[test]
    fn test_annotation_mismatch_is_warning_unless_strict() {
        let compartment = CompartmentBuilder::default()
            .meta(Meta::new("c").with_annotation(Qualifier::BQB_IS, "chebi/28061"))
            .build()
            .unwrap();

        let mut lenient = ctx();
        assert!(compartment.normalize(&mut lenient).is_ok());
        assert!(lenient
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::Annotation));

        let mut strict = ctx();
        strict.strict_annotations = true;
        assert!(matches!(
            compartment.normalize(&mut strict),
            Err(BuildError::AnnotationError { .. })
        ));
    }

    #[test]
    fn test_notes_are_wrapped() {
        let notes = normalize_notes("m", "<p>Glucose model</p>").unwrap();
        assert_eq!(notes.local_name(), "body");
        assert_eq!(notes.attr("xmlns"), Some(XHTML_NS));
        assert!(matches!(
            normalize_notes("m", "<p>unclosed"),
            Err(BuildError::InvalidNotes { .. })
        ));
    }

    #[test]
    fn test_unit_string_definition() {
        let unit = UnitDefinition::new("mM", "mmole/l")
            .normalize(&mut ctx())
            .unwrap();
        assert_eq!(unit.units.len(), 2);
    }

    #[test]
    fn test_symbolic_stoichiometry() {
        let reaction = ReactionBuilder::default()
            .meta("v1")
            .equation("n * A => B")
            .build()
            .unwrap()
            .normalize(&mut ctx())
            .unwrap();
        let reactant = &reaction.reaction.reactants[0];
        assert_eq!(reactant.sbase.id.as_deref(), Some("v1_A_stoich"));
        assert!(!reactant.constant);
        assert_eq!(
            reaction.stoichiometries,
            vec![("v1_A_stoich".to_string(), "n".to_string())]
        );
    }

    #[test]
    fn test_repeated_symbolic_stoichiometry() {
        let reaction = ReactionBuilder::default()
            .meta("v1")
            .equation("n * A => m * A + B")
            .build()
            .unwrap();
        let error = reaction.normalize(&mut ctx()).unwrap_err();
        assert!(matches!(error, BuildError::InvalidValue { ref sid, .. } if sid == "v1"));
        assert!(error.to_string().contains("'A'"));

        let reaction = ReactionBuilder::default()
            .meta("v2")
            .equation("n * A => 2 A + B")
            .build()
            .unwrap();
        assert!(reaction.normalize(&mut ctx()).is_ok());
    }

    #[test]
    fn test_flux_bounds_need_fbc() {
        let reaction = ReactionBuilder::default()
            .meta("v1")
            .equation("A => B")
            .upper_flux_bound("ub")
            .build()
            .unwrap();
        let mut ctx = FactoryContext::new(vec![], false);
        assert!(matches!(
            reaction.normalize(&mut ctx),
            Err(BuildError::PackageNotEnabled { package: Package::Fbc, .. })
        ));
    }

    #[test]
    fn test_distribution_math_needs_distrib() {
        let mut plain = FactoryContext::new(vec![], false);
        let rule = descriptor::Rule::assignment("x", "uniform(0, 1)");
        assert!(matches!(
            rule.normalize(&mut plain),
            Err(BuildError::PackageNotEnabled { package: Package::Distrib, .. })
        ));

        let event = EventBuilder::default()
            .meta("e1")
            .trigger("time > 1")
            .delay("exponential(2)")
            .build()
            .unwrap();
        assert!(matches!(
            event.normalize(&mut plain),
            Err(BuildError::PackageNotEnabled { package: Package::Distrib, .. })
        ));

        let reaction = ReactionBuilder::default()
            .meta("v1")
            .equation("A => B")
            .formula(descriptor::Formula::new("normal(1, 0.1) * A", None))
            .build()
            .unwrap();
        assert!(matches!(
            reaction.normalize(&mut plain),
            Err(BuildError::PackageNotEnabled { package: Package::Distrib, .. })
        ));

        assert!(rule.normalize(&mut ctx()).is_ok());
        assert!(event.normalize(&mut ctx()).is_ok());
    }

    #[test]
    fn test_gene_association() {
        let association = parse_gene_association("(G1 and G2) or G3 or (G4)").unwrap();
        assert_eq!(association.to_string(), "(G1 and G2) or G3 or G4");
        assert_eq!(
            parse_gene_association("a and b and (c and d)").unwrap(),
            Association::And(vec![
                Association::GeneProduct("a".into()),
                Association::GeneProduct("b".into()),
                Association::GeneProduct("c".into()),
                Association::GeneProduct("d".into()),
            ])
        );
        assert!(parse_gene_association("G1 and").is_err());
        assert!(parse_gene_association("(G1 or G2").is_err());
        assert_eq!(gene_product_id("b0001.1"), "b0001_1");
        assert_eq!(gene_product_id("1234"), "G_1234");
    }
}

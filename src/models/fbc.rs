use crate::descriptor::{
    Compartment, FluxObjective, Meta, ModelDescriptor, ModelUnits, Objective, Parameter,
    Reaction, Species, UnitDefinition, Value,
};
use crate::sbml::{ObjectiveType, Package};

const SBO_SIMPLE_CHEMICAL: &str = "SBO:0000247";
const SBO_FLUX_BOUND: &str = "SBO:0000625";

fn compartment(sid: &str, name: &str, unit: &str, dimensions: f64) -> Compartment {
    Compartment {
        meta: Meta::new(sid).with_name(name),
        value: Some(Value::from(1.0)),
        spatial_dimensions: dimensions,
        unit: Some(unit.to_string()),
        constant: true,
    }
}

fn species(sid: &str, compartment: &str) -> Species {
    Species {
        meta: Meta::new(sid).with_name(sid).with_sbo(SBO_SIMPLE_CHEMICAL),
        compartment: compartment.to_string(),
        initial_amount: Some(0.0),
        initial_concentration: None,
        substance_unit: Some("itm".to_string()),
        has_only_substance_units: true,
        boundary_condition: false,
        constant: false,
        conversion_factor: None,
        charge: None,
        chemical_formula: None,
    }
}

fn bound(sid: &str, value: f64) -> Parameter {
    Parameter {
        meta: Meta::new(sid).with_sbo(SBO_FLUX_BOUND),
        ..Parameter::new(sid, value, Some("itm_per_s"))
    }
}

fn reaction(sid: &str, name: &str, equation: &str, compartment: &str, upper: &str) -> Reaction {
    Reaction {
        meta: Meta::new(sid).with_name(name),
        equation: equation.to_string(),
        reversible: Some(true),
        compartment: Some(compartment.to_string()),
        fast: false,
        formula: None,
        pars: Vec::new(),
        rules: Vec::new(),
        local_parameters: Vec::new(),
        lower_flux_bound: Some("zero".to_string()),
        upper_flux_bound: Some(upper.to_string()),
        gene_association: None,
    }
}

/// Flux balance model with an import, a conversion and an export
/// reaction between three compartments, plus exchange reactions for the
/// external species. `R3` is maximized.
pub fn fbc_example() -> ModelDescriptor {
    ModelDescriptor {
        mid: "fbc_example".to_string(),
        name: Some("FBC example".to_string()),
        packages: vec![Package::Fbc],
        model_units: Some(ModelUnits {
            time: Some("second".to_string()),
            extent: Some("itm".to_string()),
            substance: Some("itm".to_string()),
            length: Some("metre".to_string()),
            area: Some("m2".to_string()),
            volume: Some("m3".to_string()),
        }),
        units: vec![
            UnitDefinition::new("m2", "m^2"),
            UnitDefinition::new("m3", "m^3"),
            UnitDefinition::new("itm", "item"),
            UnitDefinition::new("itm_per_s", "item/s"),
        ],
        compartments: vec![
            compartment("extern", "external compartment", "m3", 3.0),
            compartment("cell", "cell", "m3", 3.0),
            compartment("membrane", "membrane", "m2", 2.0),
        ],
        species: vec![
            species("A", "extern"),
            species("C", "extern"),
            species("B1", "cell"),
            species("B2", "cell"),
        ],
        parameters: vec![
            bound("ub_R1", 1.0),
            bound("zero", 0.0),
            bound("ub_default", 1000.0),
            bound("lb_exchange", -1000.0),
        ],
        reactions: vec![
            reaction("R1", "A import (R1)", "A <=> B1", "membrane", "ub_R1"),
            reaction("R2", "B1 <=> B2 (R2)", "B1 <=> B2", "cell", "ub_default"),
            reaction("R3", "B2 export (R3)", "B2 <=> C", "membrane", "ub_default"),
            Reaction::exchange("A", Some("lb_exchange"), Some("ub_default")),
            Reaction::exchange("C", Some("lb_exchange"), Some("ub_default")),
        ],
        objectives: vec![Objective {
            meta: Meta::new("R3_maximize"),
            objective_type: ObjectiveType::Maximize,
            active: true,
            flux_objectives: vec![FluxObjective::new("R3", 1.0)],
        }],
        ..Default::default()
    }
}

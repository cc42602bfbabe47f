use crate::descriptor::{
    Compartment, Event, EventAssignment, Formula, Function, Meta, ModelDescriptor, ModelUnits,
    Parameter, Reaction, Rule, Species, UnitDefinition, Value,
};

fn species(sid: &str, amount: Option<f64>, concentration: Option<f64>) -> Species {
    Species {
        meta: Meta::new(sid),
        compartment: "c".to_string(),
        initial_amount: amount,
        initial_concentration: concentration,
        substance_unit: Some("mole".to_string()),
        has_only_substance_units: amount.is_some(),
        boundary_condition: false,
        constant: false,
        conversion_factor: None,
        charge: None,
        chemical_formula: None,
    }
}

fn reaction(meta: Meta, equation: &str, formula: &str) -> Reaction {
    Reaction {
        meta,
        equation: equation.to_string(),
        reversible: None,
        compartment: Some("c".to_string()),
        fast: false,
        formula: Some(Formula::from(formula)),
        pars: Vec::new(),
        rules: Vec::new(),
        local_parameters: Vec::new(),
        lower_flux_bound: None,
        upper_flux_bound: None,
        gene_association: None,
    }
}

/// Model in mole, litre and second with a single cytosol compartment.
fn base(mid: &str, name: &str) -> ModelDescriptor {
    ModelDescriptor {
        mid: mid.to_string(),
        name: Some(name.to_string()),
        model_units: Some(ModelUnits {
            time: Some("second".to_string()),
            extent: Some("mole".to_string()),
            substance: Some("mole".to_string()),
            volume: Some("litre".to_string()),
            ..Default::default()
        }),
        compartments: vec![Compartment {
            meta: Meta::new("c").with_name("cytosol"),
            value: Some(Value::from(1.0)),
            spatial_dimensions: 3.0,
            unit: Some("litre".to_string()),
            constant: true,
        }],
        ..Default::default()
    }
}

/// Reversible conversion `A <=> B` with mass action kinetics, a total
/// amount rule and a dosing event at `t = 10 s`.
pub fn mass_action() -> ModelDescriptor {
    ModelDescriptor {
        units: vec![UnitDefinition::new("per_s", "1/s")],
        species: vec![species("A", Some(10.0), None), species("B", Some(0.0), None)],
        parameters: vec![
            Parameter::new("k1", 0.1, Some("per_s")),
            Parameter::new("k2", 0.05, Some("per_s")),
            Parameter::new("dose", 5.0, Some("mole")),
        ],
        reactions: vec![reaction(
            Meta::new("v1").with_name("A conversion"),
            "A <=> B",
            "k1 * A - k2 * B",
        )],
        rules: vec![Rule::assignment("total", "A + B").with_unit("mole")],
        events: vec![Event {
            meta: Meta::new("dosing"),
            trigger: "time >= 10".to_string(),
            priority: None,
            delay: None,
            persistent: true,
            initial_value: false,
            use_values_from_trigger_time: true,
            assignments: vec![EventAssignment::new("A", "A + dose")],
        }],
        ..base("mass_action", "Reversible mass action")
    }
}

/// Irreversible Michaelis-Menten conversion `S -> P` of concentration
/// species, with the rate law as a function definition.
pub fn michaelis_menten() -> ModelDescriptor {
    ModelDescriptor {
        units: vec![
            UnitDefinition::new("mol_per_l", "mole/l"),
            UnitDefinition::new("mol_per_l_per_s", "mole/l/s"),
        ],
        functions: vec![Function {
            meta: Meta::new("mm"),
            value: "lambda(vmax, s, km, vmax * s / (km + s))".to_string(),
        }],
        species: vec![species("S", None, Some(2.0)), species("P", None, Some(0.0))],
        parameters: vec![
            Parameter::new("Vmax", 1.0, Some("mol_per_l_per_s")),
            Parameter::new("Km", 0.5, Some("mol_per_l")),
        ],
        reactions: vec![reaction(Meta::new("v_mm"), "S -> P", "mm(Vmax, S, Km) * c")],
        ..base("michaelis_menten", "Michaelis-Menten kinetics")
    }
}

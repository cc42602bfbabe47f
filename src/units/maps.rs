use std::collections::HashMap;

use crate::units::UnitKind;

/// A unit symbol expanded into base kinds with exponents plus a multiplier
/// applied to the first kind.
pub(crate) struct KindMapping {
    pub kinds: &'static [(UnitKind, f64)],
    pub multiplier: f64,
}

const fn mapping(kinds: &'static [(UnitKind, f64)], multiplier: f64) -> KindMapping {
    KindMapping { kinds, multiplier }
}

const MOLE: &[(UnitKind, f64)] = &[(UnitKind::Mole, 1.0)];
const LITRE: &[(UnitKind, f64)] = &[(UnitKind::Litre, 1.0)];
const METRE: &[(UnitKind, f64)] = &[(UnitKind::Metre, 1.0)];
const SECOND: &[(UnitKind, f64)] = &[(UnitKind::Second, 1.0)];
const GRAM: &[(UnitKind, f64)] = &[(UnitKind::Gram, 1.0)];
const KELVIN: &[(UnitKind, f64)] = &[(UnitKind::Kelvin, 1.0)];
const ITEM: &[(UnitKind, f64)] = &[(UnitKind::Item, 1.0)];
const DIMENSIONLESS: &[(UnitKind, f64)] = &[(UnitKind::Dimensionless, 1.0)];
const MOLAR: &[(UnitKind, f64)] = &[(UnitKind::Mole, 1.0), (UnitKind::Litre, -1.0)];
const KATAL: &[(UnitKind, f64)] = &[(UnitKind::Katal, 1.0)];
const AMPERE: &[(UnitKind, f64)] = &[(UnitKind::Ampere, 1.0)];

lazy_static::lazy_static! {
    pub(crate) static ref KIND_MAPPINGS: HashMap<&'static str, KindMapping> = {
        let mut m = HashMap::new();
        // Mole
        m.insert("mole", mapping(MOLE, 1.0));
        m.insert("mol", mapping(MOLE, 1.0));

        // Molar
        m.insert("M", mapping(MOLAR, 1.0));
        m.insert("molar", mapping(MOLAR, 1.0));

        // Liter
        m.insert("liter", mapping(LITRE, 1.0));
        m.insert("litre", mapping(LITRE, 1.0));
        m.insert("l", mapping(LITRE, 1.0));
        m.insert("L", mapping(LITRE, 1.0));

        // Metre
        m.insert("metre", mapping(METRE, 1.0));
        m.insert("meter", mapping(METRE, 1.0));
        m.insert("m", mapping(METRE, 1.0));

        // Second
        m.insert("second", mapping(SECOND, 1.0));
        m.insert("s", mapping(SECOND, 1.0));
        m.insert("sec", mapping(SECOND, 1.0));

        // Minute
        m.insert("minute", mapping(SECOND, 60.0));
        m.insert("min", mapping(SECOND, 60.0));
        m.insert("mins", mapping(SECOND, 60.0));
        m.insert("minutes", mapping(SECOND, 60.0));

        // Hour
        m.insert("hour", mapping(SECOND, 3600.0));
        m.insert("hours", mapping(SECOND, 3600.0));
        m.insert("hr", mapping(SECOND, 3600.0));
        m.insert("h", mapping(SECOND, 3600.0));

        // Day
        m.insert("day", mapping(SECOND, 86400.0));
        m.insert("days", mapping(SECOND, 86400.0));
        m.insert("d", mapping(SECOND, 86400.0));

        // Gram
        m.insert("gram", mapping(GRAM, 1.0));
        m.insert("g", mapping(GRAM, 1.0));

        // Dimensionless
        m.insert("dimensionless", mapping(DIMENSIONLESS, 1.0));
        m.insert("-", mapping(DIMENSIONLESS, 1.0));

        // Kelvin
        m.insert("kelvin", mapping(KELVIN, 1.0));
        m.insert("K", mapping(KELVIN, 1.0));

        // Others
        m.insert("item", mapping(ITEM, 1.0));
        m.insert("katal", mapping(KATAL, 1.0));
        m.insert("kat", mapping(KATAL, 1.0));
        m.insert("ampere", mapping(AMPERE, 1.0));
        m.insert("A", mapping(AMPERE, 1.0));

        m
    };

    pub(crate) static ref PREFIX_MAPPING: HashMap<&'static str, i32> = {
        let mut m: HashMap<&str, i32> = HashMap::new();
        m.insert("kilo", 3);
        m.insert("k", 3);
        m.insert("deci", -1);
        m.insert("d", -1);
        m.insert("centi", -2);
        m.insert("c", -2);
        m.insert("milli", -3);
        m.insert("m", -3);
        m.insert("micro", -6);
        m.insert("mu", -6);
        m.insert("u", -6);
        m.insert("nano", -9);
        m.insert("n", -9);
        m.insert("pico", -12);
        m.insert("p", -12);
        m.insert("femto", -15);
        m.insert("f", -15);
        m.insert("atto", -18);
        m.insert("a", -18);
        m
    };
}

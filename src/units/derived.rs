use std::collections::BTreeMap;
use std::fmt;

use crate::units::{Unit, UnitKind};

const AVOGADRO: f64 = 6.022_140_76e23;
const TOLERANCE: f64 = 1e-9;

/// SI base dimensions a derived unit is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Metre,
    Kilogram,
    Second,
    Ampere,
    Kelvin,
    Mole,
    Candela,
    Item,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Metre => "metre",
            Dimension::Kilogram => "kilogram",
            Dimension::Second => "second",
            Dimension::Ampere => "ampere",
            Dimension::Kelvin => "kelvin",
            Dimension::Mole => "mole",
            Dimension::Candela => "candela",
            Dimension::Item => "item",
        };
        write!(f, "{name}")
    }
}

/// A unit reduced to a factor times a product of SI base dimensions.
///
/// Two derived units are equivalent when their dimensions and factors agree,
/// so `mmole/litre` and `mole/metre^3` differ while `mM` and `mmole/litre`
/// are the same unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedUnit {
    pub factor: f64,
    pub dimensions: BTreeMap<Dimension, f64>,
}

impl DerivedUnit {
    pub fn dimensionless() -> Self {
        Self {
            factor: 1.0,
            dimensions: BTreeMap::new(),
        }
    }

    /// Canonical form of a single base kind.
    pub fn from_kind(kind: UnitKind) -> Self {
        use Dimension::*;

        let (factor, dims): (f64, &[(Dimension, f64)]) = match kind {
            UnitKind::Dimensionless | UnitKind::Radian | UnitKind::Steradian => (1.0, &[]),
            UnitKind::Avogadro => (AVOGADRO, &[]),
            UnitKind::Ampere => (1.0, &[(Ampere, 1.0)]),
            UnitKind::Candela | UnitKind::Lumen => (1.0, &[(Candela, 1.0)]),
            UnitKind::Kelvin => (1.0, &[(Kelvin, 1.0)]),
            UnitKind::Kilogram => (1.0, &[(Kilogram, 1.0)]),
            UnitKind::Gram => (1e-3, &[(Kilogram, 1.0)]),
            UnitKind::Metre => (1.0, &[(Metre, 1.0)]),
            UnitKind::Litre => (1e-3, &[(Metre, 3.0)]),
            UnitKind::Mole => (1.0, &[(Mole, 1.0)]),
            UnitKind::Item => (1.0, &[(Item, 1.0)]),
            UnitKind::Second => (1.0, &[(Second, 1.0)]),
            UnitKind::Becquerel | UnitKind::Hertz => (1.0, &[(Second, -1.0)]),
            UnitKind::Coulomb => (1.0, &[(Ampere, 1.0), (Second, 1.0)]),
            UnitKind::Farad => (
                1.0,
                &[(Metre, -2.0), (Kilogram, -1.0), (Second, 4.0), (Ampere, 2.0)],
            ),
            UnitKind::Gray | UnitKind::Sievert => (1.0, &[(Metre, 2.0), (Second, -2.0)]),
            UnitKind::Henry => (
                1.0,
                &[(Metre, 2.0), (Kilogram, 1.0), (Second, -2.0), (Ampere, -2.0)],
            ),
            UnitKind::Joule => (1.0, &[(Metre, 2.0), (Kilogram, 1.0), (Second, -2.0)]),
            UnitKind::Katal => (1.0, &[(Mole, 1.0), (Second, -1.0)]),
            UnitKind::Lux => (1.0, &[(Candela, 1.0), (Metre, -2.0)]),
            UnitKind::Newton => (1.0, &[(Metre, 1.0), (Kilogram, 1.0), (Second, -2.0)]),
            UnitKind::Ohm => (
                1.0,
                &[(Metre, 2.0), (Kilogram, 1.0), (Second, -3.0), (Ampere, -2.0)],
            ),
            UnitKind::Pascal => (1.0, &[(Metre, -1.0), (Kilogram, 1.0), (Second, -2.0)]),
            UnitKind::Siemens => (
                1.0,
                &[(Metre, -2.0), (Kilogram, -1.0), (Second, 3.0), (Ampere, 2.0)],
            ),
            UnitKind::Tesla => (1.0, &[(Kilogram, 1.0), (Second, -2.0), (Ampere, -1.0)]),
            UnitKind::Volt => (
                1.0,
                &[(Metre, 2.0), (Kilogram, 1.0), (Second, -3.0), (Ampere, -1.0)],
            ),
            UnitKind::Watt => (1.0, &[(Metre, 2.0), (Kilogram, 1.0), (Second, -3.0)]),
            UnitKind::Weber => (
                1.0,
                &[(Metre, 2.0), (Kilogram, 1.0), (Second, -2.0), (Ampere, -1.0)],
            ),
        };

        Self {
            factor,
            dimensions: dims.iter().copied().collect(),
        }
    }

    /// Canonical form of a single unit definition factor.
    pub fn from_unit(unit: &Unit) -> Self {
        let base = DerivedUnit::from_kind(unit.kind);
        let scaled = DerivedUnit {
            factor: base.factor * unit.multiplier * 10f64.powi(unit.scale),
            dimensions: base.dimensions,
        };
        scaled.powf(unit.exponent)
    }

    /// Canonical form of a whole unit definition.
    pub fn from_units(units: &[Unit]) -> Self {
        units
            .iter()
            .map(DerivedUnit::from_unit)
            .fold(DerivedUnit::dimensionless(), |acc, u| acc.multiply(&u))
    }

    pub fn multiply(&self, other: &DerivedUnit) -> Self {
        let mut dimensions = self.dimensions.clone();
        for (dim, exp) in &other.dimensions {
            *dimensions.entry(*dim).or_insert(0.0) += exp;
        }
        dimensions.retain(|_, exp| exp.abs() > TOLERANCE);

        Self {
            factor: self.factor * other.factor,
            dimensions,
        }
    }

    pub fn divide(&self, other: &DerivedUnit) -> Self {
        self.multiply(&other.powf(-1.0))
    }

    pub fn powf(&self, exponent: f64) -> Self {
        let mut dimensions: BTreeMap<Dimension, f64> = self
            .dimensions
            .iter()
            .map(|(dim, exp)| (*dim, exp * exponent))
            .collect();
        dimensions.retain(|_, exp| exp.abs() > TOLERANCE);

        Self {
            factor: self.factor.powf(exponent),
            dimensions,
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Whether both units describe the same quantity on the same scale.
    pub fn is_equivalent(&self, other: &DerivedUnit) -> bool {
        if self.dimensions.len() != other.dimensions.len() {
            return false;
        }
        let same_dimensions = self.dimensions.iter().all(|(dim, exp)| {
            other
                .dimensions
                .get(dim)
                .is_some_and(|o| (o - exp).abs() < TOLERANCE)
        });
        let scale = self.factor.abs().max(other.factor.abs()).max(f64::MIN_POSITIVE);
        same_dimensions && (self.factor - other.factor).abs() / scale < TOLERANCE
    }
}

impl fmt::Display for DerivedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .dimensions
            .iter()
            .map(|(dim, exp)| {
                if (exp - 1.0).abs() < TOLERANCE {
                    dim.to_string()
                } else {
                    format!("{dim}^{exp}")
                }
            })
            .collect::<Vec<_>>();

        let body = if dims.is_empty() {
            "dimensionless".to_string()
        } else {
            dims.join(" * ")
        };

        if (self.factor - 1.0).abs() < TOLERANCE {
            write!(f, "{body}")
        } else {
            write!(f, "{:e} {body}", self.factor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::parse_unit_string;

    fn derived(s: &str) -> DerivedUnit {
        DerivedUnit::from_units(&parse_unit_string(s).unwrap())
    }

    #[test]
    fn test_equivalent_spellings() {
        assert!(derived("mM").is_equivalent(&derived("mmol/l")));
        assert!(derived("l").is_equivalent(&derived("dm^3")));
        assert!(!derived("mM").is_equivalent(&derived("M")));
        assert!(!derived("mmol").is_equivalent(&derived("mmol/s")));
    }

    #[test]
    fn test_concentration_times_volume() {
        let amount = derived("mM").multiply(&derived("l"));
        assert!(amount.is_equivalent(&derived("mmol")));
        let rate = amount.divide(&derived("min"));
        assert!(rate.is_equivalent(&derived("mmol/min")));
        assert!(!rate.is_equivalent(&derived("mmol/s")));
    }
}

//! SBML units
//!
//! This module holds everything unit related that the model creator needs:
//! - [`UnitKind`], the closed enumeration of SBML Level 3 base units
//! - [`Unit`], a single `(kind, exponent, scale, multiplier)` factor
//! - [`UnitRef`], a normalized reference from an entity to a unit
//! - unit strings such as `"mmole/min"` expanded into factors ([`parse_unit_string`])
//! - [`DerivedUnit`], the canonical SI form used for units consistency checks

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::units::derived::DerivedUnit;
pub use crate::units::strings::parse_unit_string;

mod derived;
pub(crate) mod maps;
mod strings;

/// Errors raised while normalizing unit references or unit strings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    /// The reference is neither a base kind nor a valid unit definition id
    #[error("Invalid unit reference '{0}'")]
    InvalidReference(String),

    /// A unit string contains a token that is neither a known kind nor prefix + kind
    #[error("Unknown unit '{token}' in unit string '{input}'")]
    UnknownUnit { token: String, input: String },

    /// A unit string is syntactically broken
    #[error("Malformed unit string '{input}': {reason}")]
    Malformed { input: String, reason: String },
}

/// SBML Level 3 base unit kinds.
#[allow(non_camel_case_types)]
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Ampere,
    Avogadro,
    Becquerel,
    Candela,
    Coulomb,
    Dimensionless,
    Farad,
    Gram,
    Gray,
    Henry,
    Hertz,
    Item,
    Joule,
    Katal,
    Kelvin,
    Kilogram,
    Litre,
    Lumen,
    Lux,
    Metre,
    Mole,
    Newton,
    Ohm,
    Pascal,
    Radian,
    Second,
    Siemens,
    Sievert,
    Steradian,
    Tesla,
    Volt,
    Watt,
    Weber,
}

impl UnitKind {
    /// All base kinds in SBML order.
    pub const ALL: [UnitKind; 33] = [
        UnitKind::Ampere,
        UnitKind::Avogadro,
        UnitKind::Becquerel,
        UnitKind::Candela,
        UnitKind::Coulomb,
        UnitKind::Dimensionless,
        UnitKind::Farad,
        UnitKind::Gram,
        UnitKind::Gray,
        UnitKind::Henry,
        UnitKind::Hertz,
        UnitKind::Item,
        UnitKind::Joule,
        UnitKind::Katal,
        UnitKind::Kelvin,
        UnitKind::Kilogram,
        UnitKind::Litre,
        UnitKind::Lumen,
        UnitKind::Lux,
        UnitKind::Metre,
        UnitKind::Mole,
        UnitKind::Newton,
        UnitKind::Ohm,
        UnitKind::Pascal,
        UnitKind::Radian,
        UnitKind::Second,
        UnitKind::Siemens,
        UnitKind::Sievert,
        UnitKind::Steradian,
        UnitKind::Tesla,
        UnitKind::Volt,
        UnitKind::Watt,
        UnitKind::Weber,
    ];

    /// The attribute value used in SBML documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Ampere => "ampere",
            UnitKind::Avogadro => "avogadro",
            UnitKind::Becquerel => "becquerel",
            UnitKind::Candela => "candela",
            UnitKind::Coulomb => "coulomb",
            UnitKind::Dimensionless => "dimensionless",
            UnitKind::Farad => "farad",
            UnitKind::Gram => "gram",
            UnitKind::Gray => "gray",
            UnitKind::Henry => "henry",
            UnitKind::Hertz => "hertz",
            UnitKind::Item => "item",
            UnitKind::Joule => "joule",
            UnitKind::Katal => "katal",
            UnitKind::Kelvin => "kelvin",
            UnitKind::Kilogram => "kilogram",
            UnitKind::Litre => "litre",
            UnitKind::Lumen => "lumen",
            UnitKind::Lux => "lux",
            UnitKind::Metre => "metre",
            UnitKind::Mole => "mole",
            UnitKind::Newton => "newton",
            UnitKind::Ohm => "ohm",
            UnitKind::Pascal => "pascal",
            UnitKind::Radian => "radian",
            UnitKind::Second => "second",
            UnitKind::Siemens => "siemens",
            UnitKind::Sievert => "sievert",
            UnitKind::Steradian => "steradian",
            UnitKind::Tesla => "tesla",
            UnitKind::Volt => "volt",
            UnitKind::Watt => "watt",
            UnitKind::Weber => "weber",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = UnitError;

    /// Parses SBML kind names. The American spellings `liter` and `meter`
    /// are accepted and normalized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = match s {
            "liter" => "litre",
            "meter" => "metre",
            other => other,
        };

        UnitKind::ALL
            .iter()
            .find(|kind| kind.as_str() == normalized)
            .copied()
            .ok_or_else(|| UnitError::InvalidReference(s.to_string()))
    }
}

/// A single factor of a unit definition: `(multiplier * 10^scale * kind)^exponent`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    #[serde(default = "default_one")]
    pub exponent: f64,
    #[serde(default)]
    pub scale: i32,
    #[serde(default = "default_one")]
    pub multiplier: f64,
}

fn default_one() -> f64 {
    1.0
}

impl Unit {
    pub fn new(kind: UnitKind, exponent: f64, scale: i32, multiplier: f64) -> Self {
        Self {
            kind,
            exponent,
            scale,
            multiplier,
        }
    }

    /// A plain factor with exponent 1, scale 0 and multiplier 1.
    pub fn of(kind: UnitKind) -> Self {
        Self::new(kind, 1.0, 0, 1.0)
    }
}

/// A normalized reference from an entity to its unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitRef {
    /// A base unit kind such as `litre`
    Kind(UnitKind),
    /// The id of a unit definition
    Definition(String),
}

impl UnitRef {
    /// Parses a unit reference as written by users.
    ///
    /// `"-"` and the empty string denote `dimensionless`, base kinds are
    /// recognized in both spellings and everything else must be a valid SId.
    pub fn parse(raw: &str) -> Result<Self, UnitError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "-" {
            return Ok(UnitRef::Kind(UnitKind::Dimensionless));
        }
        if let Ok(kind) = UnitKind::from_str(raw) {
            return Ok(UnitRef::Kind(kind));
        }
        if crate::sbml::is_valid_sid(raw) {
            Ok(UnitRef::Definition(raw.to_string()))
        } else {
            Err(UnitError::InvalidReference(raw.to_string()))
        }
    }

    /// Normalizes a unit reference string into its canonical attribute value.
    pub fn normalize(raw: &str) -> Result<String, UnitError> {
        Ok(Self::parse(raw)?.to_string())
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRef::Kind(kind) => write!(f, "{kind}"),
            UnitRef::Definition(sid) => write!(f, "{sid}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_kind_spellings() {
        assert_eq!(UnitKind::from_str("liter").unwrap(), UnitKind::Litre);
        assert_eq!(UnitKind::from_str("metre").unwrap(), UnitKind::Metre);
        assert!(UnitKind::from_str("furlong").is_err());
    }

    #[test]
    fn test_unit_ref_normalization() {
        assert_eq!(UnitRef::normalize("-").unwrap(), "dimensionless");
        assert_eq!(UnitRef::normalize("liter").unwrap(), "litre");
        assert_eq!(UnitRef::normalize("mM").unwrap(), "mM");
        assert_eq!(
            UnitRef::parse("mmole_per_s").unwrap(),
            UnitRef::Definition("mmole_per_s".to_string())
        );
        assert!(UnitRef::parse("1/s").is_err());
    }
}

use itertools::Itertools;

use crate::units::maps::{KindMapping, KIND_MAPPINGS, PREFIX_MAPPING};
use crate::units::{Unit, UnitError, UnitKind};

/// Expands a unit string such as `"mmole/min/l"`, `"mM"`, `"1/s"` or
/// `"m^2"` into unit definition factors.
///
/// Factors are separated by `*` or `/`; everything after a `/` applies to the
/// following factor only. Each factor is an optional SI prefix followed by a
/// unit symbol and an optional `^exponent`.
pub fn parse_unit_string(input: &str) -> Result<Vec<Unit>, UnitError> {
    let malformed = |reason: &str| UnitError::Malformed {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut factors: Vec<(f64, String)> = Vec::new();
    let mut sign = 1.0;
    let mut current = String::new();

    for ch in input.chars() {
        match ch {
            '*' | '/' => {
                if current.is_empty() {
                    return Err(malformed("empty factor"));
                }
                factors.push((sign, std::mem::take(&mut current)));
                sign = if ch == '/' { -1.0 } else { 1.0 };
            }
            c if c.is_whitespace() => continue,
            c => current.push(c),
        }
    }
    if current.is_empty() {
        return Err(malformed("empty factor"));
    }
    factors.push((sign, current));

    let mut units = Vec::new();
    for (sign, token) in factors {
        if token == "1" {
            continue;
        }

        let (symbol, exponent) = match token.split_once('^') {
            Some((symbol, exponent)) => {
                let exponent: f64 = exponent
                    .trim_matches(|c| c == '(' || c == ')')
                    .parse()
                    .map_err(|_| malformed("invalid exponent"))?;
                (symbol.to_string(), exponent)
            }
            None => (token.clone(), 1.0),
        };

        let (scale, mapping) = resolve_symbol(&symbol).ok_or_else(|| UnitError::UnknownUnit {
            token: symbol.clone(),
            input: input.to_string(),
        })?;

        for (idx, (kind, kind_exponent)) in mapping.kinds.iter().enumerate() {
            let first = idx == 0;
            units.push(Unit::new(
                *kind,
                kind_exponent * exponent * sign,
                if first { scale } else { 0 },
                if first { mapping.multiplier } else { 1.0 },
            ));
        }
    }

    if units.iter().any(|u| u.kind != UnitKind::Dimensionless) {
        units.retain(|u| u.kind != UnitKind::Dimensionless);
    }
    if units.is_empty() {
        units.push(Unit::of(UnitKind::Dimensionless));
    }

    Ok(units)
}

/// Resolves a unit symbol into a decimal scale and a kind mapping.
///
/// Whole symbols win over prefixed ones so that `min` is a minute and not
/// a milli-`in`. Longer prefixes are tried first.
fn resolve_symbol(symbol: &str) -> Option<(i32, &'static KindMapping)> {
    if let Some(mapping) = KIND_MAPPINGS.get(symbol) {
        return Some((0, mapping));
    }

    PREFIX_MAPPING
        .iter()
        .sorted_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)))
        .find_map(|(prefix, scale)| {
            symbol
                .strip_prefix(prefix)
                .and_then(|rest| KIND_MAPPINGS.get(rest))
                .map(|mapping| (*scale, mapping))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_with_prefix() {
        let units = parse_unit_string("mmol/l").unwrap();
        assert_eq!(
            units,
            vec![
                Unit::new(UnitKind::Mole, 1.0, -3, 1.0),
                Unit::new(UnitKind::Litre, -1.0, 0, 1.0),
            ]
        );
    }

    #[test]
    fn test_molar_shorthand() {
        let units = parse_unit_string("mM").unwrap();
        assert_eq!(
            units,
            vec![
                Unit::new(UnitKind::Mole, 1.0, -3, 1.0),
                Unit::new(UnitKind::Litre, -1.0, 0, 1.0),
            ]
        );
    }

    #[test]
    fn test_minutes_carry_multiplier() {
        let units = parse_unit_string("mmole/min").unwrap();
        assert_eq!(units[1], Unit::new(UnitKind::Second, -1.0, 0, 60.0));
    }

    #[test]
    fn test_inverse_and_exponent() {
        assert_eq!(
            parse_unit_string("1/s").unwrap(),
            vec![Unit::new(UnitKind::Second, -1.0, 0, 1.0)]
        );
        assert_eq!(
            parse_unit_string("m^2").unwrap(),
            vec![Unit::new(UnitKind::Metre, 2.0, 0, 1.0)]
        );
        assert_eq!(
            parse_unit_string("-").unwrap(),
            vec![Unit::of(UnitKind::Dimensionless)]
        );
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert!(matches!(
            parse_unit_string("mfoo"),
            Err(UnitError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_unit_string("mol//l"),
            Err(UnitError::Malformed { .. })
        ));
    }
}

//! Reaction equations
//!
//! Reactions are declared with a compact equation string:
//!
//! ```text
//! 1.0 S1 + 2 S2 => 2.0 P1 + 2 P2 [M1, M2]
//! ```
//!
//! `<=>` or `<->` separate the sides of reversible reactions, `=>` or `->`
//! those of irreversible ones. Either side may be empty (source and sink
//! reactions). Stoichiometries are numbers or sids (`f * S`, `f S`); a
//! bracketed list of modifiers may follow the products.
//!
//! ```
//! use sbmlutils::equation::ReactionEquation;
//!
//! let eq: ReactionEquation = "2 A + k * B <=> C [E]".parse().unwrap();
//! assert!(eq.reversible);
//! assert_eq!(eq.to_string(), "2 A + k * B <=> C [E]");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::math::format_number;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EquationError {
    #[error("Invalid equation '{equation}': no '<=>', '<->', '=>' or '->' separator")]
    MissingSeparator { equation: String },

    #[error("Invalid equation '{equation}': more than one separator")]
    AmbiguousSeparator { equation: String },

    #[error("Invalid equation '{equation}': unbalanced modifier brackets")]
    UnbalancedBrackets { equation: String },

    #[error("Invalid equation '{equation}': cannot parse '{term}'")]
    InvalidTerm { equation: String, term: String },

    #[error("Invalid equation '{equation}': unexpected character '{ch}'")]
    UnexpectedCharacter { equation: String, ch: char },
}

/// Stoichiometry of a species in an equation.
#[derive(Debug, Clone, PartialEq)]
pub enum Stoichiometry {
    Constant(f64),
    /// Variable stoichiometry bound to a model symbol
    Symbol(String),
}

impl Default for Stoichiometry {
    fn default() -> Self {
        Stoichiometry::Constant(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquationPart {
    pub species: String,
    pub stoichiometry: Stoichiometry,
}

impl EquationPart {
    pub fn new(species: impl Into<String>, stoichiometry: Stoichiometry) -> Self {
        Self {
            species: species.into(),
            stoichiometry,
        }
    }
}

impl fmt::Display for EquationPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stoichiometry {
            Stoichiometry::Constant(value) if (value - 1.0).abs() < 1e-10 => {
                write!(f, "{}", self.species)
            }
            Stoichiometry::Constant(value) => {
                write!(f, "{} {}", format_number(*value), self.species)
            }
            Stoichiometry::Symbol(sid) => write!(f, "{sid} * {}", self.species),
        }
    }
}

/// Parsed reaction equation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReactionEquation {
    pub reactants: Vec<EquationPart>,
    pub products: Vec<EquationPart>,
    pub modifiers: Vec<String>,
    pub reversible: bool,
}

impl ReactionEquation {
    /// Every species referenced by the equation, modifiers included.
    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|p| p.species.as_str())
            .chain(self.modifiers.iter().map(String::as_str))
    }
}

impl FromStr for ReactionEquation {
    type Err = EquationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_equation(s)
    }
}

impl fmt::Display for ReactionEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |parts: &[EquationPart]| {
            parts
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" + ")
        };
        let separator = if self.reversible { "<=>" } else { "=>" };

        let mut tokens = Vec::new();
        let left = side(&self.reactants);
        let right = side(&self.products);
        if !left.is_empty() {
            tokens.push(left);
        }
        tokens.push(separator.to_string());
        if !right.is_empty() {
            tokens.push(right);
        }
        if !self.modifiers.is_empty() {
            tokens.push(format!("[{}]", self.modifiers.join(", ")));
        }
        write!(f, "{}", tokens.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Sid(String),
    Plus,
    Star,
    Separator { reversible: bool },
    Open,
    Close,
    Comma,
}

fn tokenize(equation: &str) -> Result<Vec<Token>, EquationError> {
    let chars: Vec<char> = equation.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    let starts_with = |pos: usize, pattern: &str| {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| chars.get(pos + i) == Some(&c))
    };

    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        if starts_with(pos, "<=>") || starts_with(pos, "<->") {
            tokens.push(Token::Separator { reversible: true });
            pos += 3;
            continue;
        }
        if starts_with(pos, "=>") || starts_with(pos, "->") {
            tokens.push(Token::Separator { reversible: false });
            pos += 2;
            continue;
        }

        let single = match ch {
            '+' => Some(Token::Plus),
            '*' => Some(Token::Star),
            '[' => Some(Token::Open),
            ']' => Some(Token::Close),
            ',' | ';' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            pos += 1;
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
                let mut lookahead = pos + 1;
                if lookahead < chars.len() && (chars[lookahead] == '+' || chars[lookahead] == '-') {
                    lookahead += 1;
                }
                if lookahead < chars.len() && chars[lookahead].is_ascii_digit() {
                    pos = lookahead;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            let raw: String = chars[start..pos].iter().collect();
            let value = raw.parse::<f64>().map_err(|_| EquationError::InvalidTerm {
                equation: equation.to_string(),
                term: raw.clone(),
            })?;
            tokens.push(Token::Number(value));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Sid(chars[start..pos].iter().collect()));
            continue;
        }

        return Err(EquationError::UnexpectedCharacter {
            equation: equation.to_string(),
            ch,
        });
    }

    Ok(tokens)
}

/// Parses a reaction equation string.
///
/// # Arguments
///
/// * `equation` - Equation such as `"A + 2 B => C [E]"`
///
/// # Returns
///
/// The reactants, products and modifiers in declaration order together
/// with the reversibility given by the separator.
pub fn parse_equation(equation: &str) -> Result<ReactionEquation, EquationError> {
    let tokens = tokenize(equation)?;

    let separators: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| matches!(t, Token::Separator { .. }))
        .map(|(idx, _)| idx)
        .collect();
    let split = match separators.as_slice() {
        [] => {
            return Err(EquationError::MissingSeparator {
                equation: equation.to_string(),
            })
        }
        [idx] => *idx,
        _ => {
            return Err(EquationError::AmbiguousSeparator {
                equation: equation.to_string(),
            })
        }
    };
    let reversible = matches!(tokens[split], Token::Separator { reversible: true });

    // modifier brackets may only close the equation
    let opens = tokens.iter().filter(|t| **t == Token::Open).count();
    let closes = tokens.iter().filter(|t| **t == Token::Close).count();
    let unbalanced = || EquationError::UnbalancedBrackets {
        equation: equation.to_string(),
    };
    let (right_end, modifiers) = match (opens, closes) {
        (0, 0) => (tokens.len(), Vec::new()),
        (1, 1) => {
            let open = tokens
                .iter()
                .position(|t| *t == Token::Open)
                .ok_or_else(unbalanced)?;
            if open < split || tokens.last() != Some(&Token::Close) {
                return Err(unbalanced());
            }
            let modifiers = parse_modifiers(equation, &tokens[open + 1..tokens.len() - 1])?;
            (open, modifiers)
        }
        _ => return Err(unbalanced()),
    };

    Ok(ReactionEquation {
        reactants: parse_half(equation, &tokens[..split])?,
        products: parse_half(equation, &tokens[split + 1..right_end])?,
        modifiers,
        reversible,
    })
}

fn describe(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match t {
            Token::Number(v) => format_number(*v),
            Token::Sid(s) => s.clone(),
            Token::Plus => "+".into(),
            Token::Star => "*".into(),
            Token::Separator { reversible: true } => "<=>".into(),
            Token::Separator { reversible: false } => "=>".into(),
            Token::Open => "[".into(),
            Token::Close => "]".into(),
            Token::Comma => ",".into(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_half(equation: &str, tokens: &[Token]) -> Result<Vec<EquationPart>, EquationError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    tokens
        .split(|t| *t == Token::Plus)
        .map(|term| {
            let invalid = || EquationError::InvalidTerm {
                equation: equation.to_string(),
                term: describe(term),
            };
            match term {
                [Token::Sid(species)] => Ok(EquationPart::new(species, Stoichiometry::default())),
                [Token::Number(value), Token::Sid(species)]
                | [Token::Number(value), Token::Star, Token::Sid(species)] => {
                    Ok(EquationPart::new(species, Stoichiometry::Constant(*value)))
                }
                [Token::Sid(sid), Token::Sid(species)]
                | [Token::Sid(sid), Token::Star, Token::Sid(species)] => Ok(EquationPart::new(
                    species,
                    Stoichiometry::Symbol(sid.clone()),
                )),
                _ => Err(invalid()),
            }
        })
        .collect()
}

fn parse_modifiers(equation: &str, tokens: &[Token]) -> Result<Vec<String>, EquationError> {
    tokens
        .split(|t| *t == Token::Comma)
        .filter(|item| !item.is_empty())
        .map(|item| match item {
            [Token::Sid(sid)] => Ok(sid.clone()),
            other => Err(EquationError::InvalidTerm {
                equation: equation.to_string(),
                term: describe(other),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_equation() {
        let eq = parse_equation("1.0 S1 + 2 S2 => 2.0 P1 + 2 P2 [M1, M2]").unwrap();
        assert!(!eq.reversible);
        assert_eq!(
            eq.reactants,
            vec![
                EquationPart::new("S1", Stoichiometry::Constant(1.0)),
                EquationPart::new("S2", Stoichiometry::Constant(2.0)),
            ]
        );
        assert_eq!(
            eq.products,
            vec![
                EquationPart::new("P1", Stoichiometry::Constant(2.0)),
                EquationPart::new("P2", Stoichiometry::Constant(2.0)),
            ]
        );
        assert_eq!(eq.modifiers, vec!["M1".to_string(), "M2".to_string()]);
        assert_eq!(eq.to_string(), "S1 + 2 S2 => 2 P1 + 2 P2 [M1, M2]");
    }

    #[test]
    fn test_separators() {
        assert!(parse_equation("A <-> B").unwrap().reversible);
        assert!(parse_equation("A <=> B").unwrap().reversible);
        assert!(!parse_equation("A -> B").unwrap().reversible);
        assert!(matches!(
            parse_equation("A + B"),
            Err(EquationError::MissingSeparator { .. })
        ));
        assert!(matches!(
            parse_equation("A => B => C"),
            Err(EquationError::AmbiguousSeparator { .. })
        ));
    }

    #[test]
    fn test_source_and_sink() {
        let source = parse_equation("=> cit").unwrap();
        assert!(source.reactants.is_empty());
        assert_eq!(source.to_string(), "=> cit");

        let sink = parse_equation("acoa =>").unwrap();
        assert!(sink.products.is_empty());
        assert_eq!(sink.to_string(), "acoa =>");

        let empty_modifiers = parse_equation("A_ext => A []").unwrap();
        assert!(empty_modifiers.modifiers.is_empty());
        assert_eq!(empty_modifiers.to_string(), "A_ext => A");
    }

    #[test]
    fn test_symbolic_stoichiometry() {
        let eq = parse_equation("f1 c__gal1p => f1 * c__gal + 2 c__phos [c__udp; c__utp]").unwrap();
        assert_eq!(
            eq.reactants[0],
            EquationPart::new("c__gal1p", Stoichiometry::Symbol("f1".into()))
        );
        assert_eq!(eq.modifiers.len(), 2);
        assert_eq!(
            eq.to_string(),
            "f1 * c__gal1p => f1 * c__gal + 2 c__phos [c__udp, c__utp]"
        );
    }

    #[test]
    fn test_invalid_equations() {
        assert!(matches!(
            parse_equation("A => B [M1"),
            Err(EquationError::UnbalancedBrackets { .. })
        ));
        assert!(matches!(
            parse_equation("A [M] => B"),
            Err(EquationError::UnbalancedBrackets { .. })
        ));
        assert!(matches!(
            parse_equation("A + => B"),
            Err(EquationError::InvalidTerm { .. })
        ));
        assert!(matches!(
            parse_equation("2 3 A => B"),
            Err(EquationError::InvalidTerm { .. })
        ));
        assert!(matches!(
            parse_equation("A - B => C"),
            Err(EquationError::UnexpectedCharacter { ch: '-', .. })
        ));
    }

    #[test]
    fn test_format_roundtrip() {
        for s in [
            "3 atp + 2.0 phos + ki <-> 16.98 tet",
            "e__h2oM <-> c__h2oM",
            "=> f * cit",
            "0.5 A => 1e-3 B [E]",
        ] {
            let parsed = parse_equation(s).unwrap();
            assert_eq!(parse_equation(&parsed.to_string()).unwrap(), parsed, "{s}");
        }
    }
}

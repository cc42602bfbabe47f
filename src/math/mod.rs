//! Mathematical expressions
//!
//! SBML stores every formula as MathML. Model descriptors write formulas as
//! infix strings (`"Vmax * S / (Km + S)"`), which are parsed here into a
//! [`Math`] tree. The tree is the exchange format between the builder, the
//! flattener and the validator:
//!
//! - [`parse_formula`] turns an infix formula into a tree
//! - the `Display` impl turns a tree back into an infix formula
//! - [`mathml`] converts trees to and from MathML elements
//! - symbol helpers collect, rename and substitute identifiers

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use crate::math::ops::{Distribution, Operator};
pub use crate::math::parser::parse_formula;

pub mod mathml;
mod ops;
mod parser;

/// Errors raised while parsing infix formulas or MathML.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    #[error("empty formula")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    InvalidCharacter { ch: char, pos: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token '{found}' at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        pos: usize,
        expected: String,
    },

    #[error("unexpected end of formula, expected {0}")]
    UnexpectedEnd(String),

    #[error("'{name}' expects {expected} argument(s), found {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("invalid MathML: {0}")]
    InvalidMathML(String),
}

/// Named constants of MathML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    ExponentialE,
    Infinity,
    NotANumber,
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Math {
    /// A numeric literal, optionally annotated with a unit (`0 mM`)
    Number { value: f64, units: Option<String> },
    /// A reference to a model symbol
    Ident(String),
    Boolean(bool),
    Constant(Constant),
    /// The simulation time csymbol
    Time,
    /// The avogadro constant csymbol
    Avogadro,
    /// A built-in operator or function applied to arguments
    Apply { op: Operator, args: Vec<Math> },
    /// A call of a user function definition
    Call { name: String, args: Vec<Math> },
    Piecewise {
        pieces: Vec<(Math, Math)>,
        otherwise: Option<Box<Math>>,
    },
    Lambda { params: Vec<String>, body: Box<Math> },
}

impl FromStr for Math {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_formula(s)
    }
}

impl Math {
    pub fn number(value: f64) -> Self {
        Math::Number { value, units: None }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Math::Ident(name.into())
    }

    pub fn apply(op: Operator, args: Vec<Math>) -> Self {
        Math::Apply { op, args }
    }

    pub fn times(lhs: Math, rhs: Math) -> Self {
        Math::apply(Operator::Times, vec![lhs, rhs])
    }

    pub fn divide(lhs: Math, rhs: Math) -> Self {
        Math::apply(Operator::Divide, vec![lhs, rhs])
    }

    /// Visits every node in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Math)) {
        visit(self);
        match self {
            Math::Apply { args, .. } | Math::Call { args, .. } => {
                args.iter().for_each(|arg| arg.walk(visit))
            }
            Math::Piecewise { pieces, otherwise } => {
                for (value, condition) in pieces {
                    value.walk(visit);
                    condition.walk(visit);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.walk(visit);
                }
            }
            Math::Lambda { body, .. } => body.walk(visit),
            _ => {}
        }
    }

    /// Identifiers referenced by the expression. Lambda parameters are bound
    /// inside their body and not reported.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        self.collect_identifiers(&mut Vec::new(), &mut ids);
        ids
    }

    fn collect_identifiers(&self, bound: &mut Vec<String>, ids: &mut BTreeSet<String>) {
        match self {
            Math::Ident(name) => {
                if !bound.contains(name) {
                    ids.insert(name.clone());
                }
            }
            Math::Apply { args, .. } | Math::Call { args, .. } => args
                .iter()
                .for_each(|arg| arg.collect_identifiers(bound, ids)),
            Math::Piecewise { pieces, otherwise } => {
                for (value, condition) in pieces {
                    value.collect_identifiers(bound, ids);
                    condition.collect_identifiers(bound, ids);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_identifiers(bound, ids);
                }
            }
            Math::Lambda { params, body } => {
                let depth = bound.len();
                bound.extend(params.iter().cloned());
                body.collect_identifiers(bound, ids);
                bound.truncate(depth);
            }
            _ => {}
        }
    }

    /// Names of user functions called by the expression.
    pub fn function_calls(&self) -> BTreeSet<String> {
        let mut calls = BTreeSet::new();
        self.walk(&mut |node| {
            if let Math::Call { name, .. } = node {
                calls.insert(name.clone());
            }
        });
        calls
    }

    /// Whether the expression applies a distrib distribution function.
    pub fn uses_distributions(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            found |= matches!(
                node,
                Math::Apply {
                    op: Operator::Distrib(_),
                    ..
                }
            );
        });
        found
    }

    /// Unit ids attached to numeric literals.
    pub fn unit_refs(&self) -> BTreeSet<String> {
        let mut units = BTreeSet::new();
        self.walk(&mut |node| {
            if let Math::Number {
                units: Some(unit), ..
            } = node
            {
                units.insert(unit.clone());
            }
        });
        units
    }

    /// Renames identifiers and user function calls. Lambda-bound names are
    /// left untouched.
    pub fn rename_symbols(&mut self, renames: &HashMap<String, String>) {
        self.rename_symbols_scoped(renames, &mut Vec::new());
    }

    fn rename_symbols_scoped(&mut self, renames: &HashMap<String, String>, bound: &mut Vec<String>) {
        match self {
            Math::Ident(name) => {
                if !bound.contains(name) {
                    if let Some(new) = renames.get(name) {
                        *name = new.clone();
                    }
                }
            }
            Math::Call { name, args } => {
                if let Some(new) = renames.get(name) {
                    *name = new.clone();
                }
                args.iter_mut()
                    .for_each(|arg| arg.rename_symbols_scoped(renames, bound));
            }
            Math::Apply { args, .. } => args
                .iter_mut()
                .for_each(|arg| arg.rename_symbols_scoped(renames, bound)),
            Math::Piecewise { pieces, otherwise } => {
                for (value, condition) in pieces.iter_mut() {
                    value.rename_symbols_scoped(renames, bound);
                    condition.rename_symbols_scoped(renames, bound);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.rename_symbols_scoped(renames, bound);
                }
            }
            Math::Lambda { params, body } => {
                let depth = bound.len();
                bound.extend(params.iter().cloned());
                body.rename_symbols_scoped(renames, bound);
                bound.truncate(depth);
            }
            _ => {}
        }
    }

    /// Renames unit ids attached to numeric literals.
    pub fn rename_units(&mut self, renames: &HashMap<String, String>) {
        self.transform(&mut |node| {
            if let Math::Number {
                units: Some(unit), ..
            } = node
            {
                if let Some(new) = renames.get(unit.as_str()) {
                    *unit = new.clone();
                }
            }
        });
    }

    /// Applies `f` to every node, children first.
    fn transform(&mut self, f: &mut impl FnMut(&mut Math)) {
        match self {
            Math::Apply { args, .. } | Math::Call { args, .. } => {
                args.iter_mut().for_each(|arg| arg.transform(f))
            }
            Math::Piecewise { pieces, otherwise } => {
                for (value, condition) in pieces.iter_mut() {
                    value.transform(f);
                    condition.transform(f);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.transform(f);
                }
            }
            Math::Lambda { body, .. } => body.transform(f),
            _ => {}
        }
        f(self);
    }

    /// Replaces every free occurrence of `name` with `replacement`.
    pub fn substitute(&mut self, name: &str, replacement: &Math) {
        if matches!(self, Math::Ident(ident) if ident == name) {
            *self = replacement.clone();
            return;
        }
        match self {
            Math::Apply { args, .. } | Math::Call { args, .. } => args
                .iter_mut()
                .for_each(|arg| arg.substitute(name, replacement)),
            Math::Piecewise { pieces, otherwise } => {
                for (value, condition) in pieces.iter_mut() {
                    value.substitute(name, replacement);
                    condition.substitute(name, replacement);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.substitute(name, replacement);
                }
            }
            Math::Lambda { params, body } => {
                if !params.iter().any(|p| p == name) {
                    body.substitute(name, replacement);
                }
            }
            _ => {}
        }
    }

    /// Replaces every occurrence of the time csymbol with `replacement`.
    pub fn substitute_time(&mut self, replacement: &Math) {
        self.transform(&mut |node| {
            if matches!(node, Math::Time) {
                *node = replacement.clone();
            }
        });
    }

    /// Whether the expression yields a Boolean.
    ///
    /// Returns `None` when this cannot be decided syntactically, e.g. for
    /// user function calls.
    pub fn is_boolean(&self) -> Option<bool> {
        match self {
            Math::Boolean(_) => Some(true),
            Math::Apply { op, .. } if op.is_logical() || op.is_relational() => Some(true),
            Math::Piecewise { pieces, otherwise } => {
                let mut values = pieces.iter().map(|(value, _)| value);
                let first = values.next().or(otherwise.as_deref())?;
                first.is_boolean()
            }
            Math::Call { .. } => None,
            _ => Some(false),
        }
    }

    /// Precedence used when rendering infix strings.
    fn precedence(&self) -> u8 {
        match self {
            Math::Apply { op, args } => match op {
                Operator::Or if args.len() >= 2 => 1,
                Operator::And if args.len() >= 2 => 2,
                op if op.is_relational() && args.len() == 2 => 3,
                Operator::Plus if args.len() >= 2 => 4,
                Operator::Minus if args.len() == 2 => 4,
                Operator::Times if args.len() >= 2 => 5,
                Operator::Divide if args.len() == 2 => 5,
                Operator::Minus | Operator::Not if args.len() == 1 => 6,
                Operator::Power if args.len() == 2 => 7,
                _ => 9,
            },
            Math::Number { value, units } if *value < 0.0 || units.is_some() => 6,
            _ => 9,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// Formats numbers the way they are written in formulas: integers without a
/// fractional part, everything else in Rust's shortest round-trip notation.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "INF".to_string()
        } else {
            "-INF".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:?}")
    }
}

impl fmt::Display for Math {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Math::Number { value, units } => {
                write!(f, "{}", format_number(*value))?;
                if let Some(units) = units {
                    write!(f, " {units}")?;
                }
                Ok(())
            }
            Math::Ident(name) => write!(f, "{name}"),
            Math::Boolean(value) => write!(f, "{value}"),
            Math::Constant(constant) => match constant {
                Constant::Pi => write!(f, "pi"),
                Constant::ExponentialE => write!(f, "exponentiale"),
                Constant::Infinity => write!(f, "INF"),
                Constant::NotANumber => write!(f, "NaN"),
            },
            Math::Time => write!(f, "time"),
            Math::Avogadro => write!(f, "avogadro"),
            Math::Apply { op, args } => fmt_apply(f, self.precedence(), *op, args),
            Math::Call { name, args } => write_call(f, name, args.iter()),
            Math::Piecewise { pieces, otherwise } => {
                let mut items: Vec<&Math> = Vec::new();
                for (value, condition) in pieces {
                    items.push(value);
                    items.push(condition);
                }
                if let Some(otherwise) = otherwise {
                    items.push(otherwise);
                }
                write_call(f, "piecewise", items.into_iter())
            }
            Math::Lambda { params, body } => {
                write!(f, "lambda(")?;
                for param in params {
                    write!(f, "{param}, ")?;
                }
                write!(f, "{body})")
            }
        }
    }
}

fn write_call<'a>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    args: impl Iterator<Item = &'a Math>,
) -> fmt::Result {
    write!(f, "{name}(")?;
    for (idx, arg) in args.enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    write!(f, ")")
}

fn fmt_apply(f: &mut fmt::Formatter<'_>, prec: u8, op: Operator, args: &[Math]) -> fmt::Result {
    let infix = match prec {
        1 => Some(" || "),
        2 => Some(" && "),
        3 => op.infix_symbol(),
        4 if op == Operator::Plus => Some(" + "),
        4 => Some(" - "),
        5 if op == Operator::Times => Some(" * "),
        5 => Some(" / "),
        7 => Some("^"),
        _ => None,
    };

    match (prec, infix) {
        (6, _) => {
            let symbol = if op == Operator::Not { "!" } else { "-" };
            write!(f, "{symbol}")?;
            let arg = &args[0];
            arg.fmt_child(f, arg.precedence() <= 6)
        }
        (7, Some(symbol)) => {
            let (base, exponent) = (&args[0], &args[1]);
            base.fmt_child(f, base.precedence() <= 7)?;
            write!(f, "{symbol}")?;
            exponent.fmt_child(f, exponent.precedence() < 7)
        }
        (_, Some(symbol)) => {
            // left-associative infix operators; right operands of '-', '/' and
            // relations need parentheses at equal precedence
            let strict_right = matches!(op, Operator::Minus | Operator::Divide) || prec == 3;
            for (idx, arg) in args.iter().enumerate() {
                if idx > 0 {
                    write!(f, "{symbol}")?;
                }
                let child = arg.precedence();
                let parens = child < prec || (idx > 0 && strict_right && child == prec);
                arg.fmt_child(f, parens)?;
            }
            Ok(())
        }
        (_, None) => {
            let name = match (op, args.len()) {
                (Operator::Root, 1) => "sqrt",
                (Operator::Log, 1) => "log10",
                _ => op.infix_name(),
            };
            write_call(f, name, args.iter())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(formula: &str) -> String {
        parse_formula(formula).unwrap().to_string()
    }

    #[test]
    fn test_display_precedence() {
        assert_eq!(roundtrip("a + b * c"), "a + b * c");
        assert_eq!(roundtrip("(a + b) * c"), "(a + b) * c");
        assert_eq!(roundtrip("a - (b - c)"), "a - (b - c)");
        assert_eq!(roundtrip("a / (b * c)"), "a / (b * c)");
        assert_eq!(roundtrip("-(a + b)"), "-(a + b)");
        assert_eq!(roundtrip("a^(b + 1)"), "a^(b + 1)");
        assert_eq!(roundtrip("(a^b)^c"), "(a^b)^c");
    }

    #[test]
    fn test_display_functions() {
        assert_eq!(roundtrip("sqrt(x)"), "sqrt(x)");
        assert_eq!(roundtrip("log(x)"), "log10(x)");
        assert_eq!(roundtrip("ln(x)"), "ln(x)");
        assert_eq!(
            roundtrip("piecewise(1, time < 2, 0)"),
            "piecewise(1, time < 2, 0)"
        );
        assert_eq!(roundtrip("normal(0 mM, 1 mM)"), "normal(0 mM, 1 mM)");
        assert_eq!(roundtrip("lambda(x, y, x * y)"), "lambda(x, y, x * y)");
    }

    #[test]
    fn test_identifiers_skip_lambda_parameters() {
        let math = parse_formula("lambda(x, x * k)").unwrap();
        assert_eq!(
            math.identifiers().into_iter().collect::<Vec<_>>(),
            vec!["k".to_string()]
        );
    }

    #[test]
    fn test_rename_and_substitute() {
        let mut math = parse_formula("k1 * S + f(S)").unwrap();
        let renames: HashMap<String, String> = [
            ("S".to_string(), "sub__S".to_string()),
            ("f".to_string(), "sub__f".to_string()),
        ]
        .into_iter()
        .collect();
        math.rename_symbols(&renames);
        assert_eq!(math.to_string(), "k1 * sub__S + sub__f(sub__S)");

        math.substitute("k1", &parse_formula("c / 2").unwrap());
        assert_eq!(math.to_string(), "c / 2 * sub__S + sub__f(sub__S)");
    }

    #[test]
    fn test_boolean_detection() {
        assert_eq!(parse_formula("time > 5").unwrap().is_boolean(), Some(true));
        assert_eq!(
            parse_formula("a > 1 && b < 2").unwrap().is_boolean(),
            Some(true)
        );
        assert_eq!(parse_formula("a + 1").unwrap().is_boolean(), Some(false));
        assert_eq!(parse_formula("f(a)").unwrap().is_boolean(), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1e-20), "1e-20");
        assert_eq!(format_number(f64::INFINITY), "INF");
    }
}

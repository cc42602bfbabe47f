/// Built-in operators and functions of SBML math.
///
/// Each operator knows its infix function name (as used in formulas) and its
/// MathML element name. Operators that MathML expresses as csymbols
/// (`delay`, `rateOf`, distributions) carry a definition URL instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Root,
    Abs,
    Exp,
    Ln,
    Log,
    Floor,
    Ceiling,
    Factorial,
    Eq,
    Neq,
    Gt,
    Lt,
    Geq,
    Leq,
    And,
    Or,
    Xor,
    Not,
    Implies,
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Arcsin,
    Arccos,
    Arctan,
    Arcsec,
    Arccsc,
    Arccot,
    Arcsinh,
    Arccosh,
    Arctanh,
    Arcsech,
    Arccsch,
    Arccoth,
    Min,
    Max,
    Rem,
    Quotient,
    Delay,
    RateOf,
    Distrib(Distribution),
}

/// Distribution functions of the distrib package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    Normal,
    Uniform,
    Bernoulli,
    Binomial,
    Cauchy,
    ChiSquare,
    Exponential,
    Gamma,
    Laplace,
    LogNormal,
    Poisson,
    Rayleigh,
}

const DISTRIB_URL: &str = "http://www.sbml.org/sbml/symbols/distrib/";
const DELAY_URL: &str = "http://www.sbml.org/sbml/symbols/delay";
const RATE_OF_URL: &str = "http://www.sbml.org/sbml/symbols/rateOf";

impl Distribution {
    pub const ALL: [Distribution; 12] = [
        Distribution::Normal,
        Distribution::Uniform,
        Distribution::Bernoulli,
        Distribution::Binomial,
        Distribution::Cauchy,
        Distribution::ChiSquare,
        Distribution::Exponential,
        Distribution::Gamma,
        Distribution::Laplace,
        Distribution::LogNormal,
        Distribution::Poisson,
        Distribution::Rayleigh,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Normal => "normal",
            Distribution::Uniform => "uniform",
            Distribution::Bernoulli => "bernoulli",
            Distribution::Binomial => "binomial",
            Distribution::Cauchy => "cauchy",
            Distribution::ChiSquare => "chisquare",
            Distribution::Exponential => "exponential",
            Distribution::Gamma => "gamma",
            Distribution::Laplace => "laplace",
            Distribution::LogNormal => "lognormal",
            Distribution::Poisson => "poisson",
            Distribution::Rayleigh => "rayleigh",
        }
    }

    /// Accepted argument counts (with and without truncation bounds).
    fn arities(&self) -> &'static [usize] {
        match self {
            Distribution::Normal | Distribution::LogNormal => &[2, 4],
            Distribution::Uniform | Distribution::Binomial | Distribution::Gamma => &[2, 4],
            Distribution::Cauchy | Distribution::Laplace => &[2, 4],
            Distribution::Bernoulli => &[1],
            Distribution::ChiSquare | Distribution::Exponential => &[1, 3],
            Distribution::Poisson | Distribution::Rayleigh => &[1, 3],
        }
    }

    pub fn url(&self) -> String {
        format!("{DISTRIB_URL}{}", self.name())
    }
}

/// Operator table: (operator, infix function name, MathML element).
const TABLE: &[(Operator, &str, &str)] = &[
    (Operator::Plus, "plus", "plus"),
    (Operator::Minus, "minus", "minus"),
    (Operator::Times, "times", "times"),
    (Operator::Divide, "divide", "divide"),
    (Operator::Power, "pow", "power"),
    (Operator::Root, "root", "root"),
    (Operator::Abs, "abs", "abs"),
    (Operator::Exp, "exp", "exp"),
    (Operator::Ln, "ln", "ln"),
    (Operator::Log, "log", "log"),
    (Operator::Floor, "floor", "floor"),
    (Operator::Ceiling, "ceil", "ceiling"),
    (Operator::Factorial, "factorial", "factorial"),
    (Operator::Eq, "eq", "eq"),
    (Operator::Neq, "neq", "neq"),
    (Operator::Gt, "gt", "gt"),
    (Operator::Lt, "lt", "lt"),
    (Operator::Geq, "geq", "geq"),
    (Operator::Leq, "leq", "leq"),
    (Operator::And, "and", "and"),
    (Operator::Or, "or", "or"),
    (Operator::Xor, "xor", "xor"),
    (Operator::Not, "not", "not"),
    (Operator::Implies, "implies", "implies"),
    (Operator::Sin, "sin", "sin"),
    (Operator::Cos, "cos", "cos"),
    (Operator::Tan, "tan", "tan"),
    (Operator::Sec, "sec", "sec"),
    (Operator::Csc, "csc", "csc"),
    (Operator::Cot, "cot", "cot"),
    (Operator::Sinh, "sinh", "sinh"),
    (Operator::Cosh, "cosh", "cosh"),
    (Operator::Tanh, "tanh", "tanh"),
    (Operator::Sech, "sech", "sech"),
    (Operator::Csch, "csch", "csch"),
    (Operator::Coth, "coth", "coth"),
    (Operator::Arcsin, "arcsin", "arcsin"),
    (Operator::Arccos, "arccos", "arccos"),
    (Operator::Arctan, "arctan", "arctan"),
    (Operator::Arcsec, "arcsec", "arcsec"),
    (Operator::Arccsc, "arccsc", "arccsc"),
    (Operator::Arccot, "arccot", "arccot"),
    (Operator::Arcsinh, "arcsinh", "arcsinh"),
    (Operator::Arccosh, "arccosh", "arccosh"),
    (Operator::Arctanh, "arctanh", "arctanh"),
    (Operator::Arcsech, "arcsech", "arcsech"),
    (Operator::Arccsch, "arccsch", "arccsch"),
    (Operator::Arccoth, "arccoth", "arccoth"),
    (Operator::Min, "min", "min"),
    (Operator::Max, "max", "max"),
    (Operator::Rem, "rem", "rem"),
    (Operator::Quotient, "quotient", "quotient"),
    (Operator::Delay, "delay", "delay"),
    (Operator::RateOf, "rateOf", "rateOf"),
];

/// Function names accepted in formulas besides the canonical ones.
const ALIASES: &[(&str, Operator)] = &[
    ("power", Operator::Power),
    ("ceiling", Operator::Ceiling),
    ("sqrt", Operator::Root),
    ("log10", Operator::Log),
    ("asin", Operator::Arcsin),
    ("acos", Operator::Arccos),
    ("atan", Operator::Arctan),
];

impl Operator {
    /// Resolves a function name used in an infix formula.
    pub fn from_function_name(name: &str) -> Option<Operator> {
        TABLE
            .iter()
            .find(|(_, infix, _)| *infix == name)
            .map(|(op, _, _)| *op)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, op)| *op)
            })
            .or_else(|| {
                Distribution::ALL
                    .iter()
                    .find(|d| d.name() == name)
                    .map(|d| Operator::Distrib(*d))
            })
    }

    /// Resolves a MathML operator element name.
    pub fn from_mathml(element: &str) -> Option<Operator> {
        TABLE
            .iter()
            .filter(|(op, _, _)| op.csymbol_url().is_none())
            .find(|(_, _, mathml)| *mathml == element)
            .map(|(op, _, _)| *op)
    }

    /// Resolves a csymbol definition URL.
    pub fn from_csymbol_url(url: &str) -> Option<Operator> {
        match url {
            DELAY_URL => Some(Operator::Delay),
            RATE_OF_URL => Some(Operator::RateOf),
            other => other.strip_prefix(DISTRIB_URL).and_then(|name| {
                Distribution::ALL
                    .iter()
                    .find(|d| d.name() == name)
                    .map(|d| Operator::Distrib(*d))
            }),
        }
    }

    pub fn infix_name(&self) -> &'static str {
        match self {
            Operator::Distrib(d) => d.name(),
            op => TABLE
                .iter()
                .find(|(other, _, _)| other == op)
                .map(|(_, infix, _)| *infix)
                .unwrap_or("unknown"),
        }
    }

    pub fn mathml_name(&self) -> &'static str {
        match self {
            Operator::Distrib(d) => d.name(),
            op => TABLE
                .iter()
                .find(|(other, _, _)| other == op)
                .map(|(_, _, mathml)| *mathml)
                .unwrap_or("unknown"),
        }
    }

    /// Definition URL for operators written as csymbols.
    pub fn csymbol_url(&self) -> Option<String> {
        match self {
            Operator::Delay => Some(DELAY_URL.to_string()),
            Operator::RateOf => Some(RATE_OF_URL.to_string()),
            Operator::Distrib(d) => Some(d.url()),
            _ => None,
        }
    }

    /// Symbol used when the relation is written infix.
    pub fn infix_symbol(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some(" == "),
            Operator::Neq => Some(" != "),
            Operator::Gt => Some(" > "),
            Operator::Lt => Some(" < "),
            Operator::Geq => Some(" >= "),
            Operator::Leq => Some(" <= "),
            _ => None,
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Neq | Operator::Gt | Operator::Lt | Operator::Geq | Operator::Leq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Operator::And | Operator::Or | Operator::Xor | Operator::Not | Operator::Implies
        )
    }

    /// Checks the number of arguments for fixed-arity operators.
    pub fn check_arity(&self, found: usize) -> Result<(), super::MathError> {
        let expected: &[usize] = match self {
            Operator::Plus | Operator::Times | Operator::And | Operator::Or | Operator::Xor => {
                return Ok(())
            }
            Operator::Min | Operator::Max => {
                return if found >= 1 {
                    Ok(())
                } else {
                    Err(arity_error(self, "at least 1", found))
                }
            }
            op if op.is_relational() => {
                return if found >= 2 {
                    Ok(())
                } else {
                    Err(arity_error(self, "at least 2", found))
                }
            }
            Operator::Minus | Operator::Root | Operator::Log => &[1, 2],
            Operator::Divide
            | Operator::Power
            | Operator::Implies
            | Operator::Rem
            | Operator::Quotient
            | Operator::Delay => &[2],
            Operator::Distrib(d) => d.arities(),
            _ => &[1],
        };

        if expected.contains(&found) {
            Ok(())
        } else {
            let expected = expected
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" or ");
            Err(arity_error(self, &expected, found))
        }
    }
}

fn arity_error(op: &Operator, expected: &str, found: usize) -> super::MathError {
    super::MathError::Arity {
        name: op.infix_name().to_string(),
        expected: expected.to_string(),
        found,
    }
}

//! Infix formula parser
//!
//! Recursive descent over the SBML Level 3 formula syntax:
//!
//! ```text
//! expr    := or
//! or      := and ('||' and)*
//! and     := rel ('&&' rel)*
//! rel     := add (('==' | '!=' | '<' | '>' | '<=' | '>=') add)?
//! add     := mul (('+' | '-') mul)*
//! mul     := unary (('*' | '/') unary)*
//! unary   := ('-' | '+' | '!') unary | power
//! power   := primary ('^' unary)?
//! primary := number [unit] | ident | ident '(' args ')' | '(' expr ')'
//! ```

use crate::math::{Constant, Math, MathError, Operator};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64, String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Not,
    EqEq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    And,
    Or,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(_, raw) => raw.clone(),
            Token::Ident(name) => name.clone(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Caret => "^".into(),
            Token::Not => "!".into(),
            Token::EqEq => "==".into(),
            Token::Neq => "!=".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Leq => "<=".into(),
            Token::Geq => ">=".into(),
            Token::And => "&&".into(),
            Token::Or => "||".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, MathError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let start = pos;

        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit())) {
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
            let value = raw
                .parse::<f64>()
                .map_err(|_| MathError::InvalidNumber(raw.clone()))?;
            tokens.push((start, Token::Number(value, raw)));
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push((start, Token::Ident(name)));
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (ch, next) {
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::Neq, 2),
            ('<', Some('=')) => (Token::Leq, 2),
            ('>', Some('=')) => (Token::Geq, 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('^', _) => (Token::Caret, 1),
            ('!', _) => (Token::Not, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            _ => return Err(MathError::InvalidCharacter { ch, pos }),
        };
        tokens.push((start, token));
        pos += width;
    }

    Ok(tokens)
}

/// Parses an infix formula into an expression tree.
pub fn parse_formula(input: &str) -> Result<Math, MathError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(MathError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let math = parser.expr()?;

    match parser.peek() {
        None => Ok(math),
        Some((pos, token)) => Err(MathError::UnexpectedToken {
            found: token.describe(),
            pos: *pos,
            expected: "end of formula".into(),
        }),
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|(_, token)| token)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek_token() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), MathError> {
        match self.next() {
            Some((_, token)) if token == expected => Ok(()),
            Some((pos, token)) => Err(MathError::UnexpectedToken {
                found: token.describe(),
                pos,
                expected: expected.describe(),
            }),
            None => Err(MathError::UnexpectedEnd(expected.describe())),
        }
    }

    fn expr(&mut self) -> Result<Math, MathError> {
        self.or()
    }

    fn or(&mut self) -> Result<Math, MathError> {
        let first = self.and()?;
        let mut args = vec![first];
        while self.eat(&Token::Or) {
            args.push(self.and()?);
        }
        Ok(collapse(Operator::Or, args))
    }

    fn and(&mut self) -> Result<Math, MathError> {
        let first = self.relation()?;
        let mut args = vec![first];
        while self.eat(&Token::And) {
            args.push(self.relation()?);
        }
        Ok(collapse(Operator::And, args))
    }

    fn relation(&mut self) -> Result<Math, MathError> {
        let lhs = self.additive()?;
        let op = match self.peek_token() {
            Some(Token::EqEq) => Operator::Eq,
            Some(Token::Neq) => Operator::Neq,
            Some(Token::Lt) => Operator::Lt,
            Some(Token::Gt) => Operator::Gt,
            Some(Token::Leq) => Operator::Leq,
            Some(Token::Geq) => Operator::Geq,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Math::apply(op, vec![lhs, rhs]))
    }

    fn additive(&mut self) -> Result<Math, MathError> {
        let mut lhs = self.multiplicative()?;
        loop {
            if self.eat(&Token::Plus) {
                let rhs = self.multiplicative()?;
                lhs = extend(Operator::Plus, lhs, rhs);
            } else if self.eat(&Token::Minus) {
                let rhs = self.multiplicative()?;
                lhs = Math::apply(Operator::Minus, vec![lhs, rhs]);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Math, MathError> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                let rhs = self.unary()?;
                lhs = extend(Operator::Times, lhs, rhs);
            } else if self.eat(&Token::Slash) {
                let rhs = self.unary()?;
                lhs = Math::divide(lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Math, MathError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(match operand {
                Math::Number { value, units: None } => Math::number(-value),
                other => Math::apply(Operator::Minus, vec![other]),
            });
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        if self.eat(&Token::Not) {
            let operand = self.unary()?;
            return Ok(Math::apply(Operator::Not, vec![operand]));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Math, MathError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(Math::apply(Operator::Power, vec![base, exponent]));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Math, MathError> {
        match self.next() {
            Some((_, Token::Number(value, _))) => {
                // a number directly followed by a unit id: `0 mM`
                let units = match (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)) {
                    (Some((_, Token::Ident(unit))), next) if next.map(|(_, t)| t) != Some(&Token::LParen) => {
                        let unit = unit.clone();
                        self.pos += 1;
                        Some(unit)
                    }
                    _ => None,
                };
                Ok(Math::Number { value, units })
            }
            Some((_, Token::LParen)) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some((_, Token::Ident(name))) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    function_call(&name, args)
                } else {
                    Ok(symbol(&name))
                }
            }
            Some((pos, token)) => Err(MathError::UnexpectedToken {
                found: token.describe(),
                pos,
                expected: "number, identifier or '('".into(),
            }),
            None => Err(MathError::UnexpectedEnd("number, identifier or '('".into())),
        }
    }

    /// Parses a comma separated argument list after the opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<Math>, MathError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }
}

/// Flattens left-nested chains of n-ary operators: `a + b + c` becomes a
/// single `plus` with three arguments.
fn extend(op: Operator, lhs: Math, rhs: Math) -> Math {
    match lhs {
        Math::Apply { op: lhs_op, mut args } if lhs_op == op && args.len() >= 2 => {
            args.push(rhs);
            Math::Apply { op, args }
        }
        lhs => Math::apply(op, vec![lhs, rhs]),
    }
}

fn collapse(op: Operator, mut args: Vec<Math>) -> Math {
    if args.len() == 1 {
        args.remove(0)
    } else {
        Math::apply(op, args)
    }
}

fn symbol(name: &str) -> Math {
    match name {
        "time" => Math::Time,
        "avogadro" => Math::Avogadro,
        "true" | "True" => Math::Boolean(true),
        "false" | "False" => Math::Boolean(false),
        "pi" => Math::Constant(Constant::Pi),
        "exponentiale" => Math::Constant(Constant::ExponentialE),
        "INF" | "inf" | "infinity" | "Infinity" => Math::Constant(Constant::Infinity),
        "NaN" | "nan" | "notanumber" => Math::Constant(Constant::NotANumber),
        other => Math::Ident(other.to_string()),
    }
}

fn function_call(name: &str, args: Vec<Math>) -> Result<Math, MathError> {
    match name {
        "piecewise" => {
            if args.is_empty() {
                return Err(MathError::Arity {
                    name: name.into(),
                    expected: "at least 1".into(),
                    found: 0,
                });
            }
            let mut iter = args.into_iter();
            let mut pieces = Vec::new();
            let mut otherwise = None;
            while let Some(value) = iter.next() {
                match iter.next() {
                    Some(condition) => pieces.push((value, condition)),
                    None => otherwise = Some(Box::new(value)),
                }
            }
            Ok(Math::Piecewise { pieces, otherwise })
        }
        "lambda" => {
            let found = args.len();
            let mut args = args;
            let body = args.pop().ok_or_else(|| MathError::Arity {
                name: name.into(),
                expected: "at least 1".into(),
                found,
            })?;
            let params = args
                .into_iter()
                .map(|arg| match arg {
                    Math::Ident(param) => Ok(param),
                    other => Err(MathError::UnexpectedToken {
                        found: other.to_string(),
                        pos: 0,
                        expected: "lambda parameter".into(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Math::Lambda {
                params,
                body: Box::new(body),
            })
        }
        _ => match Operator::from_function_name(name) {
            Some(op) => {
                op.check_arity(args.len())?;
                Ok(Math::apply(op, args))
            }
            None => Ok(Math::Call {
                name: name.to_string(),
                args,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_precedence_and_associativity() {
        let math = parse_formula("a + b * c^2").unwrap();
        assert_eq!(
            math,
            Math::apply(
                Operator::Plus,
                vec![
                    Math::ident("a"),
                    Math::times(
                        Math::ident("b"),
                        Math::apply(Operator::Power, vec![Math::ident("c"), Math::number(2.0)])
                    )
                ]
            )
        );
    }

    #[test]
    fn test_nary_plus_is_flattened() {
        let math = parse_formula("a + b + c").unwrap();
        assert!(matches!(math, Math::Apply { op: Operator::Plus, ref args } if args.len() == 3));
    }

    #[test]
    fn test_number_with_units() {
        let math = parse_formula("normal(0 mM, 1 mM)").unwrap();
        match math {
            Math::Apply { op, args } => {
                assert_eq!(op.infix_name(), "normal");
                assert_eq!(
                    args[0],
                    Math::Number {
                        value: 0.0,
                        units: Some("mM".into())
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_scientific_numbers() {
        assert_eq!(parse_formula("1.5e-3").unwrap(), Math::number(1.5e-3));
        assert_eq!(parse_formula("-2").unwrap(), Math::number(-2.0));
        assert_eq!(parse_formula(".5").unwrap(), Math::number(0.5));
    }

    #[test]
    fn test_logical_and_relational() {
        let math = parse_formula("time >= 1 && time < 2 || flag").unwrap();
        assert_eq!(math.to_string(), "time >= 1 && time < 2 || flag");
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_formula("   "), Err(MathError::Empty));
        assert!(matches!(
            parse_formula("a + "),
            Err(MathError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            parse_formula("a $ b"),
            Err(MathError::InvalidCharacter { ch: '$', .. })
        ));
        assert!(matches!(
            parse_formula("(a + b"),
            Err(MathError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            parse_formula("exp(a, b)"),
            Err(MathError::Arity { .. })
        ));
    }

    #[test]
    fn test_user_function_call() {
        let math = parse_formula("f(x, 2)").unwrap();
        assert_eq!(
            math,
            Math::Call {
                name: "f".into(),
                args: vec![Math::ident("x"), Math::number(2.0)]
            }
        );
    }
}

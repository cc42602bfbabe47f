//! Content MathML codec
//!
//! Converts [`Math`] trees to `<math>` elements and back. Only the subset
//! of content MathML used by SBML Level 3 is supported.

use crate::math::{Constant, Math, MathError, Operator};
use crate::sbml::xml::XmlElement;
use crate::sbml::MATHML_NS;

const TIME_URL: &str = "http://www.sbml.org/sbml/symbols/time";
const AVOGADRO_URL: &str = "http://www.sbml.org/sbml/symbols/avogadro";
const SBML_UNITS_NS: &str = "http://www.sbml.org/sbml/level3/version1/core";

/// Wraps an expression into a `<math>` element.
pub fn to_mathml(math: &Math) -> XmlElement {
    let mut root = XmlElement::new("math").with_attr("xmlns", MATHML_NS);
    if !math.unit_refs().is_empty() {
        root.set_attr("xmlns:sbml", SBML_UNITS_NS);
    }
    root.with_child(encode(math))
}

fn csymbol(url: &str, name: &str) -> XmlElement {
    XmlElement::new("csymbol")
        .with_attr("encoding", "text")
        .with_attr("definitionURL", url)
        .with_text(name)
}

fn encode(math: &Math) -> XmlElement {
    match math {
        Math::Number { value, units } => {
            let mut cn = XmlElement::new("cn");
            if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
                cn.set_attr("type", "integer");
            }
            if let Some(units) = units {
                cn.set_attr("sbml:units", units.as_str());
            }
            if value.is_infinite() {
                let infinity = XmlElement::new("infinity");
                return if *value > 0.0 {
                    infinity
                } else {
                    XmlElement::new("apply")
                        .with_child(XmlElement::new("minus"))
                        .with_child(infinity)
                };
            }
            if value.is_nan() {
                return XmlElement::new("notanumber");
            }
            cn.with_text(format!(" {} ", crate::math::format_number(*value)))
        }
        Math::Ident(name) => XmlElement::new("ci").with_text(format!(" {name} ")),
        Math::Boolean(true) => XmlElement::new("true"),
        Math::Boolean(false) => XmlElement::new("false"),
        Math::Constant(constant) => XmlElement::new(match constant {
            Constant::Pi => "pi",
            Constant::ExponentialE => "exponentiale",
            Constant::Infinity => "infinity",
            Constant::NotANumber => "notanumber",
        }),
        Math::Time => csymbol(TIME_URL, "time"),
        Math::Avogadro => csymbol(AVOGADRO_URL, "avogadro"),
        Math::Apply { op, args } => {
            let mut apply = XmlElement::new("apply");
            match op.csymbol_url() {
                Some(url) => apply.push(csymbol(&url, op.infix_name())),
                None => apply.push(XmlElement::new(op.mathml_name())),
            }
            match (op, args.as_slice()) {
                (Operator::Log, [base, x]) => {
                    apply.push(XmlElement::new("logbase").with_child(encode(base)));
                    apply.push(encode(x));
                }
                (Operator::Root, [degree, x]) => {
                    apply.push(XmlElement::new("degree").with_child(encode(degree)));
                    apply.push(encode(x));
                }
                _ => args.iter().for_each(|arg| apply.push(encode(arg))),
            }
            apply
        }
        Math::Call { name, args } => {
            let mut apply = XmlElement::new("apply")
                .with_child(XmlElement::new("ci").with_text(format!(" {name} ")));
            args.iter().for_each(|arg| apply.push(encode(arg)));
            apply
        }
        Math::Piecewise { pieces, otherwise } => {
            let mut piecewise = XmlElement::new("piecewise");
            for (value, condition) in pieces {
                piecewise.push(
                    XmlElement::new("piece")
                        .with_child(encode(value))
                        .with_child(encode(condition)),
                );
            }
            if let Some(otherwise) = otherwise {
                piecewise.push(XmlElement::new("otherwise").with_child(encode(otherwise)));
            }
            piecewise
        }
        Math::Lambda { params, body } => {
            let mut lambda = XmlElement::new("lambda");
            for param in params {
                lambda.push(
                    XmlElement::new("bvar")
                        .with_child(XmlElement::new("ci").with_text(format!(" {param} "))),
                );
            }
            lambda.push(encode(body));
            lambda
        }
    }
}

/// Parses a `<math>` element (or a bare content element).
pub fn from_mathml(element: &XmlElement) -> Result<Math, MathError> {
    if element.local_name() == "math" {
        let mut children = element.elements();
        let first = children
            .next()
            .ok_or_else(|| MathError::InvalidMathML("empty <math> element".into()))?;
        return decode(first);
    }
    decode(element)
}

fn invalid(message: impl Into<String>) -> MathError {
    MathError::InvalidMathML(message.into())
}

fn decode(element: &XmlElement) -> Result<Math, MathError> {
    match element.local_name() {
        "cn" => decode_number(element),
        "ci" => Ok(Math::Ident(element.text())),
        "true" => Ok(Math::Boolean(true)),
        "false" => Ok(Math::Boolean(false)),
        "pi" => Ok(Math::Constant(Constant::Pi)),
        "exponentiale" => Ok(Math::Constant(Constant::ExponentialE)),
        "infinity" => Ok(Math::Constant(Constant::Infinity)),
        "notanumber" => Ok(Math::Constant(Constant::NotANumber)),
        "csymbol" => match element.attr("definitionURL") {
            Some(TIME_URL) => Ok(Math::Time),
            Some(AVOGADRO_URL) => Ok(Math::Avogadro),
            other => Err(invalid(format!("unsupported csymbol {other:?}"))),
        },
        "apply" => decode_apply(element),
        "piecewise" => {
            let mut pieces = Vec::new();
            let mut otherwise = None;
            for child in element.elements() {
                match child.local_name() {
                    "piece" => {
                        let parts: Vec<&XmlElement> = child.elements().collect();
                        let [value, condition] = parts.as_slice() else {
                            return Err(invalid("<piece> needs a value and a condition"));
                        };
                        pieces.push((decode(value)?, decode(condition)?));
                    }
                    "otherwise" => {
                        let value = child
                            .elements()
                            .next()
                            .ok_or_else(|| invalid("empty <otherwise>"))?;
                        otherwise = Some(Box::new(decode(value)?));
                    }
                    other => return Err(invalid(format!("unexpected <{other}> in piecewise"))),
                }
            }
            Ok(Math::Piecewise { pieces, otherwise })
        }
        "lambda" => {
            let mut params = Vec::new();
            let mut body = None;
            for child in element.elements() {
                if child.local_name() == "bvar" {
                    let ci = child.child("ci").ok_or_else(|| invalid("<bvar> without <ci>"))?;
                    params.push(ci.text());
                } else {
                    body = Some(decode(child)?);
                }
            }
            let body = body.ok_or_else(|| invalid("<lambda> without body"))?;
            Ok(Math::Lambda {
                params,
                body: Box::new(body),
            })
        }
        "semantics" => {
            let first = element
                .elements()
                .next()
                .ok_or_else(|| invalid("empty <semantics>"))?;
            decode(first)
        }
        other => Err(invalid(format!("unsupported element <{other}>"))),
    }
}

fn decode_number(element: &XmlElement) -> Result<Math, MathError> {
    let units = element.attr("units").map(str::to_string);
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| MathError::InvalidNumber(s.trim().to_string()))
    };

    let value = match element.attr("type") {
        Some("e-notation") | Some("rational") => {
            let parts: Vec<String> = element
                .children
                .iter()
                .filter_map(|node| match node {
                    crate::sbml::xml::XmlNode::Text(text) => Some(text.trim().to_string()),
                    _ => None,
                })
                .collect();
            let [mantissa, exponent] = parts.as_slice() else {
                return Err(invalid("<cn> with <sep/> needs two parts"));
            };
            let (a, b) = (parse(mantissa.as_str())?, parse(exponent.as_str())?);
            if element.attr("type") == Some("rational") {
                a / b
            } else {
                a * 10f64.powf(b)
            }
        }
        _ => parse(element.text().as_str())?,
    };

    Ok(Math::Number { value, units })
}

fn decode_apply(element: &XmlElement) -> Result<Math, MathError> {
    let mut children = element.elements();
    let head = children
        .next()
        .ok_or_else(|| invalid("empty <apply>"))?;

    let mut args = Vec::new();
    let mut qualifier = None;
    for child in children {
        match child.local_name() {
            "logbase" | "degree" => {
                let inner = child
                    .elements()
                    .next()
                    .ok_or_else(|| invalid(format!("empty <{}>", child.local_name())))?;
                qualifier = Some(decode(inner)?);
            }
            _ => args.push(decode(child)?),
        }
    }

    let op = match head.local_name() {
        "ci" => {
            return Ok(Math::Call {
                name: head.text(),
                args,
            })
        }
        "csymbol" => {
            let url = head.attr("definitionURL").unwrap_or_default();
            Operator::from_csymbol_url(url)
                .ok_or_else(|| invalid(format!("unsupported csymbol '{url}'")))?
        }
        name => Operator::from_mathml(name)
            .ok_or_else(|| invalid(format!("unsupported operator <{name}>")))?,
    };

    if let Some(qualifier) = qualifier {
        args.insert(0, qualifier);
    }

    // `- 5` written as an apply of a negative literal collapses back to a number
    if op == Operator::Minus && args.len() == 1 {
        if let Math::Number { value, units: None } = args[0] {
            return Ok(Math::number(-value));
        }
        if args[0] == Math::Constant(Constant::Infinity) {
            return Ok(Math::number(f64::NEG_INFINITY));
        }
    }

    op.check_arity(args.len())?;
    Ok(Math::apply(op, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parse_formula;
    use pretty_assertions::assert_eq;

    fn roundtrip(formula: &str) -> Math {
        let math = parse_formula(formula).unwrap();
        let xml = to_mathml(&math).to_xml_string(false).unwrap();
        from_mathml(&XmlElement::parse(&xml).unwrap()).unwrap()
    }

    #[test]
    fn test_roundtrip_expressions() {
        for formula in [
            "Vmax * S / (Km + S)",
            "piecewise(1, time < 2, 0)",
            "log(2, x) + sqrt(y) + root(3, z)",
            "delay(S, 2) + rateOf(S)",
            "f(x, avogadro)",
            "-k * x^2",
        ] {
            assert_eq!(roundtrip(formula), parse_formula(formula).unwrap(), "{formula}");
        }
    }

    #[test]
    fn test_distribution_csymbol_and_units() {
        let math = parse_formula("normal(0 mM, 1 mM)").unwrap();
        let xml = to_mathml(&math).to_xml_string(false).unwrap();
        assert!(xml.contains("http://www.sbml.org/sbml/symbols/distrib/normal"));
        assert!(xml.contains("sbml:units=\"mM\""));
        assert_eq!(roundtrip("normal(0 mM, 1 mM)"), math);
    }

    #[test]
    fn test_infinity() {
        let math = Math::number(f64::INFINITY);
        let xml = to_mathml(&math).to_xml_string(false).unwrap();
        assert!(xml.contains("<infinity/>"));
        assert_eq!(
            from_mathml(&XmlElement::parse(&xml).unwrap()).unwrap(),
            Math::Constant(Constant::Infinity)
        );
    }

    #[test]
    fn test_e_notation() {
        let xml = r#"<math xmlns="http://www.w3.org/1998/Math/MathML"><cn type="e-notation"> 1.5 <sep/> -3 </cn></math>"#;
        let math = from_mathml(&XmlElement::parse(xml).unwrap()).unwrap();
        assert!(matches!(math, Math::Number { value, .. } if (value - 1.5e-3).abs() < 1e-12));
    }
}

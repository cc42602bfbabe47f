//! Uncertainty records of the distrib package.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::sbml::{PointStatistic, SpanStatistic};

/// Statistic of an uncertainty parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UncertaintyType {
    /// Carries `value` or `var`
    Point(PointStatistic),
    /// Carries `lower`/`upper` or `var_lower`/`var_upper`
    Span(SpanStatistic),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UncertaintyParameter {
    #[serde(rename = "type")]
    pub kind: UncertaintyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_lower: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_upper: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl UncertaintyParameter {
    pub fn point(statistic: PointStatistic, value: f64, unit: Option<&str>) -> Self {
        Self {
            kind: UncertaintyType::Point(statistic),
            value: Some(value),
            var: None,
            lower: None,
            upper: None,
            var_lower: None,
            var_upper: None,
            unit: unit.map(str::to_string),
        }
    }

    pub fn span(statistic: SpanStatistic, lower: f64, upper: f64, unit: Option<&str>) -> Self {
        Self {
            kind: UncertaintyType::Span(statistic),
            value: None,
            var: None,
            lower: Some(lower),
            upper: Some(upper),
            var_lower: None,
            var_upper: None,
            unit: unit.map(str::to_string),
        }
    }
}

/// Uncertainty of an entity: summary statistics and an optional
/// distribution formula such as `normal(0, 1)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Uncertainty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<UncertaintyParameter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistic_kinds() {
        let uncertainty: Uncertainty = serde_json::from_value(serde_json::json!({
            "formula": "normal(1.0, 0.1)",
            "parameters": [
                {"type": "mean", "value": 1.0, "unit": "mM"},
                {"type": "range", "lower": 0.5, "upper": 1.5}
            ]
        }))
        .unwrap();
        assert_eq!(
            uncertainty.parameters[0].kind,
            UncertaintyType::Point(PointStatistic::Mean)
        );
        assert_eq!(
            uncertainty.parameters[1].kind,
            UncertaintyType::Span(SpanStatistic::Range)
        );
        assert!(serde_json::from_value::<UncertaintyParameter>(
            serde_json::json!({"type": "spread"})
        )
        .is_err());
    }

    #[test]
    fn test_span_constructor() {
        let span = UncertaintyParameter::span(SpanStatistic::ConfidenceInterval, 1.0, 2.0, None);
        assert_eq!(span.value, None);
        assert_eq!((span.lower, span.upper), (Some(1.0), Some(2.0)));
    }
}

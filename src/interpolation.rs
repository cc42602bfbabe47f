//! Interpolation models
//!
//! Turns a table of data into a model descriptor whose parameters follow the
//! data over time. The first column holds the time points, every further
//! column becomes a non-constant parameter with an assignment rule encoding
//! a piecewise constant, linear or natural cubic spline interpolation.
//!
//! The parameters are exposed as ports, so the generated model can be used
//! as a submodel of another model or merged into it as a descriptor module.
//!
//! ```no_run
//! use sbmlutils::interpolation::{Interpolation, InterpolationMethod};
//!
//! let interpolation = Interpolation::new(
//!     "time",
//!     vec![0.0, 1.0, 2.0],
//!     vec![("glc".to_string(), vec![5.0, 4.0, 2.5])],
//!     InterpolationMethod::Linear,
//! )
//! .unwrap();
//! let descriptor = interpolation.descriptor();
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::{Meta, ModelDescriptor, Parameter, Rule, Value};
use crate::error::BuildError;
use crate::math::{Math, Operator};
use crate::preprocess::DescriptorModule;
use crate::sbml::{is_valid_sid, Package};

const NOTES: &str = r#"<body xmlns="http://www.w3.org/1999/xhtml">
  <h1>Data interpolator</h1>
  <p>Model for the interpolation of tabular data.</p>
</body>"#;

#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("Interpolation needs a time column and at least one data column")]
    TooFewColumns,

    #[error("Interpolation needs at least {required} data rows, found {found}")]
    TooFewRows { required: usize, found: usize },

    #[error("Column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Column '{0}' is not a valid SBML identifier")]
    InvalidId(String),

    #[error("Column '{column}' contains a missing or non-finite value in row {row}")]
    InvalidValue { column: String, row: usize },

    #[error("Time points must be strictly increasing, found {0} twice")]
    DuplicateTime(f64),

    #[error("Unknown interpolation method '{0}'")]
    UnknownMethod(String),

    #[error("Failed to read interpolation table: {0}")]
    Read(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// The value of the last data point until the next one
    Constant,
    #[default]
    Linear,
    /// Natural cubic spline through all data points
    CubicSpline,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMethod::Constant => "constant",
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::CubicSpline => "cubic_spline",
        }
    }
}

impl FromStr for InterpolationMethod {
    type Err = InterpolationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "constant" => Ok(InterpolationMethod::Constant),
            "linear" => Ok(InterpolationMethod::Linear),
            "cubic_spline" | "cubic" | "spline" => Ok(InterpolationMethod::CubicSpline),
            _ => Err(InterpolationError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data series interpolated against shared time points.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub time_column: String,
    pub time: Vec<f64>,
    pub series: Vec<(String, Vec<f64>)>,
    pub method: InterpolationMethod,
}

impl Interpolation {
    /// Creates an interpolation, sorting rows by time.
    ///
    /// # Arguments
    ///
    /// * `time_column` - Name of the time column
    /// * `time` - Time points
    /// * `series` - Named data columns, one value per time point
    /// * `method` - Interpolation method
    pub fn new(
        time_column: impl Into<String>,
        time: Vec<f64>,
        series: Vec<(String, Vec<f64>)>,
        method: InterpolationMethod,
    ) -> Result<Self, InterpolationError> {
        let time_column = time_column.into();
        if series.is_empty() {
            return Err(InterpolationError::TooFewColumns);
        }
        let required = match method {
            InterpolationMethod::CubicSpline => 3,
            _ => 2,
        };
        if time.len() < required {
            return Err(InterpolationError::TooFewRows {
                required,
                found: time.len(),
            });
        }
        check_values(&time_column, &time)?;
        for (name, values) in &series {
            if !is_valid_sid(name) {
                return Err(InterpolationError::InvalidId(name.clone()));
            }
            if values.len() != time.len() {
                return Err(InterpolationError::LengthMismatch {
                    column: name.clone(),
                    expected: time.len(),
                    found: values.len(),
                });
            }
            check_values(name, values)?;
        }

        let mut order: Vec<usize> = (0..time.len()).collect();
        if !time.windows(2).all(|w| w[0] <= w[1]) {
            log::warn!("Time column '{time_column}' is not ascending, rows are sorted");
            order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
        }
        let time: Vec<f64> = order.iter().map(|&i| time[i]).collect();
        if let Some(w) = time.windows(2).find(|w| w[0] == w[1]) {
            return Err(InterpolationError::DuplicateTime(w[0]));
        }
        let series = series
            .into_iter()
            .map(|(name, values)| (name, order.iter().map(|&i| values[i]).collect()))
            .collect();

        Ok(Self {
            time_column,
            time,
            series,
            method,
        })
    }

    /// Reads an interpolation table from a CSV or TSV file with a header
    /// row. Files ending in `.tsv` are tab separated.
    #[cfg(feature = "tabular")]
    pub fn from_csv(
        path: impl AsRef<Path>,
        method: InterpolationMethod,
    ) -> Result<Self, InterpolationError> {
        use polars::io::SerReader;
        use polars::prelude::{CsvParseOptions, CsvReadOptions, DataType};

        let path = path.as_ref();
        let separator = match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") => b'\t',
            _ => b',',
        };
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_separator(separator))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| InterpolationError::Read(e.to_string()))?;

        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().trim().to_string();
            let values = column
                .cast(&DataType::Float64)
                .map_err(|e| InterpolationError::Read(e.to_string()))?;
            let values = values
                .f64()
                .map_err(|e| InterpolationError::Read(e.to_string()))?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value.ok_or_else(|| InterpolationError::InvalidValue {
                        column: name.clone(),
                        row,
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            columns.push((name, values));
        }

        let mut columns = columns.into_iter();
        let (time_column, time) = columns.next().ok_or(InterpolationError::TooFewColumns)?;
        Self::new(time_column, time, columns.collect(), method)
    }

    /// Id of the generated model, e.g. `Interpolation_linear`.
    pub fn model_id(&self) -> String {
        format!("Interpolation_{}", self.method)
    }

    /// Interpolation formula of one data column in terms of `time`.
    pub fn formula(&self, values: &[f64]) -> Math {
        match self.method {
            InterpolationMethod::Constant => constant_formula(&self.time, values),
            InterpolationMethod::Linear => linear_formula(&self.time, values),
            InterpolationMethod::CubicSpline => cubic_spline_formula(&self.time, values),
        }
    }

    /// Model descriptor with one parameter and assignment rule per data
    /// column. Parameters are exposed as ports.
    pub fn descriptor(&self) -> ModelDescriptor {
        let mid = self.model_id();
        let mut parameters = Vec::with_capacity(self.series.len());
        let mut rules = Vec::with_capacity(self.series.len());
        for (name, values) in &self.series {
            parameters.push(Parameter {
                meta: Meta::new(name.clone()).with_name(name.clone()).with_port(),
                value: None,
                unit: None,
                constant: false,
            });
            rules.push(Rule::assignment(
                name.clone(),
                Value::Formula(self.formula(values).to_string()),
            ));
        }

        ModelDescriptor {
            mid: mid.clone(),
            name: Some(mid),
            notes: Some(NOTES.to_string()),
            packages: vec![Package::Comp],
            parameters,
            rules,
            ..Default::default()
        }
    }

    /// The descriptor as a module that can be merged into another model.
    pub fn module(&self) -> Result<DescriptorModule, BuildError> {
        let mut descriptor = self.descriptor();
        descriptor.notes = None;
        descriptor.packages.clear();
        for parameter in descriptor.parameters.iter_mut() {
            parameter.meta.port = false;
        }
        DescriptorModule::from_descriptor(self.model_id(), &descriptor)
    }
}

fn check_values(column: &str, values: &[f64]) -> Result<(), InterpolationError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(row) => Err(InterpolationError::InvalidValue {
            column: column.to_string(),
            row,
        }),
        None => Ok(()),
    }
}

fn time_op(op: Operator, x: f64) -> Math {
    Math::apply(op, vec![Math::Time, Math::number(x)])
}

fn between(lower: f64, upper_op: Operator, upper: f64) -> Math {
    Math::apply(
        Operator::And,
        vec![time_op(Operator::Geq, lower), time_op(upper_op, upper)],
    )
}

/// `(time - x)`
fn offset(x: f64) -> Math {
    Math::apply(Operator::Minus, vec![Math::Time, Math::number(x)])
}

fn piecewise(pieces: Vec<(Math, Math)>) -> Math {
    Math::Piecewise {
        pieces,
        otherwise: Some(Box::new(Math::number(0.0))),
    }
}

fn constant_formula(x: &[f64], y: &[f64]) -> Math {
    let n = x.len();
    let mut pieces = vec![(Math::number(y[0]), time_op(Operator::Lt, x[0]))];
    for k in 0..n - 1 {
        pieces.push((Math::number(y[k]), between(x[k], Operator::Lt, x[k + 1])));
    }
    pieces.push((Math::number(y[n - 1]), time_op(Operator::Geq, x[n - 1])));
    piecewise(pieces)
}

fn linear_formula(x: &[f64], y: &[f64]) -> Math {
    let n = x.len();
    let mut pieces = Vec::with_capacity(n);
    for k in 0..n - 1 {
        let slope = (y[k + 1] - y[k]) / (x[k + 1] - x[k]);
        let value = Math::apply(
            Operator::Plus,
            vec![
                Math::number(y[k]),
                Math::times(Math::number(slope), offset(x[k])),
            ],
        );
        pieces.push((value, between(x[k], Operator::Lt, x[k + 1])));
    }
    pieces.push((Math::number(y[n - 1]), time_op(Operator::Geq, x[n - 1])));
    piecewise(pieces)
}

fn cubic_spline_formula(x: &[f64], y: &[f64]) -> Math {
    let pieces = natural_spline_coefficients(x, y)
        .into_iter()
        .enumerate()
        .map(|(k, [a, b, c, d])| {
            let power = |p: f64| Math::apply(Operator::Power, vec![offset(x[k]), Math::number(p)]);
            let value = Math::apply(
                Operator::Plus,
                vec![
                    Math::times(Math::number(d), power(3.0)),
                    Math::times(Math::number(c), power(2.0)),
                    Math::times(Math::number(b), offset(x[k])),
                    Math::number(a),
                ],
            );
            (value, between(x[k], Operator::Leq, x[k + 1]))
        })
        .collect();
    piecewise(pieces)
}

/// Coefficients `[a, b, c, d]` of the natural cubic spline segments
/// `d (t - x_k)^3 + c (t - x_k)^2 + b (t - x_k) + a` on `[x_k, x_k+1]`.
///
/// The second derivative vanishes at both ends; the tridiagonal system is
/// solved with the Thomas algorithm.
pub fn natural_spline_coefficients(x: &[f64], y: &[f64]) -> Vec<[f64; 4]> {
    let n = x.len().saturating_sub(1);
    if n == 0 {
        return Vec::new();
    }
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    let mut alpha = vec![0.0; n];
    for i in 1..n {
        alpha[i] = 3.0 / h[i] * (y[i + 1] - y[i]) - 3.0 / h[i - 1] * (y[i] - y[i - 1]);
    }

    let mut l = vec![1.0; n + 1];
    let mut mu = vec![0.0; n + 1];
    let mut z = vec![0.0; n + 1];
    for i in 1..n {
        l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }

    let mut c = vec![0.0; n + 1];
    let mut coefficients = vec![[0.0; 4]; n];
    for j in (0..n).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
        let b = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
        let d = (c[j + 1] - c[j]) / (3.0 * h[j]);
        coefficients[j] = [y[j], b, c[j], d];
    }
    coefficients
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_document, BuildOptionsBuilder};
    use approx::assert_relative_eq;

    fn evaluate(segment: &[f64; 4], dt: f64) -> f64 {
        let [a, b, c, d] = *segment;
        a + b * dt + c * dt.powi(2) + d * dt.powi(3)
    }

    #[test]
    fn test_spline_passes_through_points() {
        let x = [0.0, 1.0, 2.5, 4.0];
        let y = [1.0, 3.0, 2.0, 5.0];
        let coefficients = natural_spline_coefficients(&x, &y);
        assert_eq!(coefficients.len(), 3);

        for k in 0..3 {
            assert_relative_eq!(evaluate(&coefficients[k], 0.0), y[k]);
            assert_relative_eq!(
                evaluate(&coefficients[k], x[k + 1] - x[k]),
                y[k + 1],
                epsilon = 1e-12
            );
        }
        // natural boundary conditions
        assert_relative_eq!(coefficients[0][2], 0.0);
        let [_, _, c, d] = coefficients[2];
        assert_relative_eq!(2.0 * c + 6.0 * d * 1.5, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spline_of_line_is_linear() {
        let coefficients = natural_spline_coefficients(&[0.0, 1.0, 2.0], &[0.0, 2.0, 4.0]);
        for [_, b, c, d] in coefficients {
            assert_relative_eq!(b, 2.0, epsilon = 1e-12);
            assert_relative_eq!(c, 0.0, epsilon = 1e-12);
            assert_relative_eq!(d, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rows_are_sorted() {
        let interpolation = Interpolation::new(
            "time",
            vec![2.0, 0.0, 1.0],
            vec![("y".to_string(), vec![20.0, 0.0, 10.0])],
            InterpolationMethod::Constant,
        )
        .unwrap();
        assert_eq!(interpolation.time, vec![0.0, 1.0, 2.0]);
        assert_eq!(interpolation.series[0].1, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_invalid_tables() {
        let result = Interpolation::new(
            "time",
            vec![0.0, 1.0],
            vec![("y".to_string(), vec![1.0, 2.0])],
            InterpolationMethod::CubicSpline,
        );
        assert!(matches!(result, Err(InterpolationError::TooFewRows { .. })));

        let result = Interpolation::new(
            "time",
            vec![0.0, 1.0],
            vec![("1y".to_string(), vec![1.0, 2.0])],
            InterpolationMethod::Linear,
        );
        assert!(matches!(result, Err(InterpolationError::InvalidId(_))));

        let result = Interpolation::new(
            "time",
            vec![0.0, 0.0],
            vec![("y".to_string(), vec![1.0, 2.0])],
            InterpolationMethod::Linear,
        );
        assert!(matches!(result, Err(InterpolationError::DuplicateTime(_))));
    }

    #[test]
    fn test_linear_formula() {
        let interpolation = Interpolation::new(
            "time",
            vec![0.0, 2.0],
            vec![("y".to_string(), vec![1.0, 5.0])],
            InterpolationMethod::Linear,
        )
        .unwrap();
        let formula = interpolation.formula(&interpolation.series[0].1);
        let Math::Piecewise { pieces, otherwise } = &formula else {
            panic!("expected piecewise, got {formula}");
        };
        assert_eq!(pieces.len(), 2);
        assert_eq!(otherwise.as_deref(), Some(&Math::number(0.0)));
        assert!(formula.to_string().contains("time >= 2"));
    }

    #[test]
    fn test_descriptor_builds() {
        let interpolation = Interpolation::new(
            "time",
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                ("glc".to_string(), vec![5.0, 4.0, 2.5, 2.0]),
                ("lac".to_string(), vec![0.0, 1.0, 2.5, 3.0]),
            ],
            InterpolationMethod::CubicSpline,
        )
        .unwrap();
        let descriptor = interpolation.descriptor();
        assert_eq!(descriptor.mid, "Interpolation_cubic_spline");
        assert!(descriptor.rules.iter().all(|rule| rule.value.is_formula()));
        assert!(descriptor.parameters.iter().all(|p| p.value.is_none()));

        let options = BuildOptionsBuilder::default().units_check(false).build().unwrap();
        let result = build_document(&descriptor, &options).unwrap();
        let model = result.document.model.unwrap();
        assert_eq!(model.rules.len(), 2);
        assert_eq!(model.ports.len(), 2);
        assert!(!model.parameter("glc").unwrap().constant);
        assert!(result.validation.unwrap().is_valid);
    }
}

//! Core collapse methods and the reduction kernel they share

use crate::errors::{CfKitError, Result};
use ndarray::ArrayD;
use std::fmt;
use std::str::FromStr;

/// Supported statistical reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollapseMethod {
    Mean,
    Sum,
    Min,
    Max,
    Range,
    MidRange,
    StandardDeviation,
    Variance,
    SampleSize,
    Median,
}

impl CollapseMethod {
    /// The name recorded in `cell_methods`.
    pub fn cell_method_name(self) -> &'static str {
        match self {
            CollapseMethod::Mean => "mean",
            CollapseMethod::Sum => "sum",
            CollapseMethod::Min => "minimum",
            CollapseMethod::Max => "maximum",
            CollapseMethod::Range => "range",
            CollapseMethod::MidRange => "mid_range",
            CollapseMethod::StandardDeviation => "standard_deviation",
            CollapseMethod::Variance => "variance",
            CollapseMethod::SampleSize => "sample_size",
            CollapseMethod::Median => "median",
        }
    }

    /// Methods that take cell weights into account.
    pub fn uses_weights(self) -> bool {
        matches!(
            self,
            CollapseMethod::Mean | CollapseMethod::StandardDeviation | CollapseMethod::Variance
        )
    }

    /// Reduce one set of values. NaN entries are skipped; an all-missing input
    /// gives NaN (0 for sample size). `weights`, when given, has the same length
    /// as `values`.
    pub fn reduce(self, values: &[f64], weights: Option<&[f64]>, ddof: f64) -> f64 {
        let valid: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .map(|(i, &v)| (v, weights.map(|w| w[i]).unwrap_or(1.0)))
            .filter(|(_, w)| w.is_finite())
            .collect();

        if valid.is_empty() {
            return match self {
                CollapseMethod::SampleSize => 0.0,
                _ => f64::NAN,
            };
        }

        let min = || valid.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min);
        let max = || valid.iter().map(|(v, _)| *v).fold(f64::NEG_INFINITY, f64::max);

        match self {
            CollapseMethod::Mean => weighted_mean(&valid),
            CollapseMethod::Sum => valid.iter().map(|(v, _)| v).sum(),
            CollapseMethod::Min => min(),
            CollapseMethod::Max => max(),
            CollapseMethod::Range => max() - min(),
            CollapseMethod::MidRange => (max() + min()) / 2.0,
            CollapseMethod::Variance => weighted_variance(&valid, ddof),
            CollapseMethod::StandardDeviation => weighted_variance(&valid, ddof).sqrt(),
            CollapseMethod::SampleSize => valid.len() as f64,
            CollapseMethod::Median => {
                let mut sorted: Vec<f64> = valid.iter().map(|(v, _)| *v).collect();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let n = sorted.len();
                if n % 2 == 1 {
                    sorted[n / 2]
                } else {
                    (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
                }
            }
        }
    }
}

fn weighted_mean(valid: &[(f64, f64)]) -> f64 {
    let sum_w: f64 = valid.iter().map(|(_, w)| w).sum();
    if sum_w == 0.0 {
        return f64::NAN;
    }
    valid.iter().map(|(v, w)| v * w).sum::<f64>() / sum_w
}

/// Reliability-weighted variance: `Σw(x-m)² / (V1 - ddof·V2/V1)`, which reduces
/// to `Σ(x-m)² / (n - ddof)` for unit weights.
fn weighted_variance(valid: &[(f64, f64)], ddof: f64) -> f64 {
    let mean = weighted_mean(valid);
    let v1: f64 = valid.iter().map(|(_, w)| w).sum();
    let v2: f64 = valid.iter().map(|(_, w)| w * w).sum();
    let denominator = v1 - ddof * v2 / v1;
    if !(denominator > 0.0) {
        return f64::NAN;
    }
    valid.iter().map(|(v, w)| w * (v - mean).powi(2)).sum::<f64>() / denominator
}

impl FromStr for CollapseMethod {
    type Err = CfKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" => Ok(CollapseMethod::Mean),
            "sum" => Ok(CollapseMethod::Sum),
            "min" | "minimum" => Ok(CollapseMethod::Min),
            "max" | "maximum" => Ok(CollapseMethod::Max),
            "range" => Ok(CollapseMethod::Range),
            "mid_range" | "midrange" => Ok(CollapseMethod::MidRange),
            "sd" | "std" | "standard_deviation" => Ok(CollapseMethod::StandardDeviation),
            "var" | "variance" => Ok(CollapseMethod::Variance),
            "sample_size" | "count" => Ok(CollapseMethod::SampleSize),
            "median" => Ok(CollapseMethod::Median),
            other => Err(CfKitError::Collapse(format!("unknown collapse method '{}'", other))),
        }
    }
}

impl fmt::Display for CollapseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cell_method_name())
    }
}

/// Trait for arrays that can be reduced along a set of axes
pub trait StatisticalReduction {
    /// Reduce over `axes`, keeping them as size-1 dimensions.
    fn reduce_along_axes(
        &self,
        axes: &[usize],
        method: CollapseMethod,
        weights: Option<&ArrayD<f64>>,
        ddof: f64,
    ) -> Result<ArrayD<f64>>;
}

impl StatisticalReduction for ArrayD<f64> {
    fn reduce_along_axes(
        &self,
        axes: &[usize],
        method: CollapseMethod,
        weights: Option<&ArrayD<f64>>,
        ddof: f64,
    ) -> Result<ArrayD<f64>> {
        if let Some(bad) = axes.iter().find(|&&a| a >= self.ndim()) {
            return Err(CfKitError::Collapse(format!(
                "Axis {} is out of bounds for array with {} dimensions",
                bad,
                self.ndim()
            )));
        }
        if let Some(w) = weights {
            if w.shape() != self.shape() {
                return Err(CfKitError::Collapse(format!(
                    "weights shape {:?} does not match data shape {:?}",
                    w.shape(),
                    self.shape()
                )));
            }
        }
        super::parallel::parallel_reduce_axes(self, axes, method, weights, ddof)
    }
}

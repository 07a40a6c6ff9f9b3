//! # Return Data
//!
//! $$
//! r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Validated return-series matrix and price-to-return preprocessing helpers.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;

use crate::error::AnalysisError;
use crate::error::AnalysisResult;

/// Convert a close-price series to simple percentage returns.
///
/// Non-positive prices terminate nothing; the affected step is dropped, which
/// mirrors the upstream forward-fill/drop treatment of bad quotes.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(closes.len().saturating_sub(1));
  for i in 1..closes.len() {
    if closes[i - 1] > 0.0 && closes[i] > 0.0 {
      out.push(closes[i] / closes[i - 1] - 1.0);
    }
  }
  out
}

/// Aligned per-asset return series: rows are periods, columns are assets.
///
/// Construction validates shape and content; everything downstream may assume
/// a finite, rectangular matrix with at least two periods per asset.
#[derive(Clone, Debug)]
pub struct ReturnMatrix {
  assets: Vec<String>,
  returns: Array2<f64>,
}

impl ReturnMatrix {
  /// Build from an asset list and an already-aligned matrix.
  pub fn new(assets: Vec<String>, returns: Array2<f64>) -> AnalysisResult<Self> {
    if assets.is_empty() {
      return Err(AnalysisError::data("no assets supplied"));
    }
    if returns.ncols() != assets.len() {
      return Err(AnalysisError::data(format!(
        "matrix has {} columns but {} asset names",
        returns.ncols(),
        assets.len()
      )));
    }
    if returns.nrows() < 2 {
      return Err(AnalysisError::data(format!(
        "need at least 2 return periods, got {}",
        returns.nrows()
      )));
    }
    for i in 0..assets.len() {
      for j in (i + 1)..assets.len() {
        if assets[i] == assets[j] {
          return Err(AnalysisError::data(format!(
            "duplicate asset name '{}'",
            assets[i]
          )));
        }
      }
    }
    if let Some(bad) = returns.indexed_iter().find(|(_, v)| !v.is_finite()) {
      let ((row, col), _) = bad;
      return Err(AnalysisError::data(format!(
        "non-finite return for '{}' at period {row}",
        assets[col]
      )));
    }

    Ok(Self { assets, returns })
  }

  /// Build from named columns, rejecting misaligned lengths.
  pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> AnalysisResult<Self> {
    let n_periods = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
    if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != n_periods) {
      return Err(AnalysisError::data(format!(
        "column '{}' has {} periods, expected {n_periods}",
        name,
        col.len()
      )));
    }

    let assets: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
    let mut returns = Array2::zeros((n_periods, columns.len()));
    for (j, (_, col)) in columns.iter().enumerate() {
      for (t, &r) in col.iter().enumerate() {
        returns[(t, j)] = r;
      }
    }

    Self::new(assets, returns)
  }

  /// Asset names in column order.
  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  pub fn n_periods(&self) -> usize {
    self.returns.nrows()
  }

  /// Return series of one asset by column index.
  pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
    self.returns.column(index)
  }

  /// The full matrix, rows = periods.
  pub fn values(&self) -> &Array2<f64> {
    &self.returns
  }

  /// Per-asset mean daily return.
  pub fn mean_daily(&self) -> Array1<f64> {
    // nrows >= 2 is a construction invariant, mean_axis cannot fail
    self
      .returns
      .mean_axis(Axis(0))
      .unwrap_or_else(|| Array1::zeros(self.n_assets()))
  }

  /// Per-asset expected annual return `mean * trading_days`, the mu vector
  /// handed to the optimizer.
  pub fn expected_annual_returns(&self, trading_days: f64) -> Array1<f64> {
    self.mean_daily() * trading_days
  }
}

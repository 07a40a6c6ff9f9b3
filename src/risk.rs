//! # Risk Model
//!
//! $$
//! \Sigma = 252\,\widehat{\mathrm{Cov}}(r),\qquad
//! \rho_{ij}=\frac{\Sigma_{ij}}{\sigma_i\sigma_j}
//! $$
//!
//! Annualized sample covariance with diagonal regularization, plus the
//! derived correlation view.

use ndarray::Array2;

use crate::returns::ReturnMatrix;

/// Annualized covariance structure of a return matrix.
#[derive(Clone, Debug)]
pub struct RiskModel {
  assets: Vec<String>,
  covariance: Array2<f64>,
}

impl RiskModel {
  /// Estimate the annualized sample covariance (`ddof = 1`, scaled by the
  /// trading-days constant; covariance scales linearly in time under i.i.d.
  /// daily returns).
  pub fn from_returns(matrix: &ReturnMatrix, trading_days: f64) -> Self {
    let n = matrix.n_assets();
    let t = matrix.n_periods();
    let means = matrix.mean_daily();

    let mut covariance = Array2::zeros((n, n));
    for i in 0..n {
      let xi = matrix.column(i);
      for j in i..n {
        let xj = matrix.column(j);
        let mut acc = 0.0;
        for k in 0..t {
          acc += (xi[k] - means[i]) * (xj[k] - means[j]);
        }
        let cov = acc / (t - 1) as f64 * trading_days;
        covariance[(i, j)] = cov;
        covariance[(j, i)] = cov;
      }
    }

    Self {
      assets: matrix.assets().to_vec(),
      covariance,
    }
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// The annualized covariance matrix, unregularized.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  /// Covariance with `epsilon` added to every diagonal entry. Every quadratic
  /// form inside an optimizer objective must use this view so near-singular
  /// matrices from redundant assets stay numerically positive-definite.
  pub fn regularized(&self, epsilon: f64) -> Array2<f64> {
    let mut cov = self.covariance.clone();
    for i in 0..cov.nrows() {
      cov[(i, i)] += epsilon;
    }
    cov
  }

  /// Derived correlation matrix; entries involving a zero-variance asset are
  /// defined as 0 rather than dividing by zero.
  pub fn correlation(&self) -> Array2<f64> {
    let n = self.covariance.nrows();
    let sigmas: Vec<f64> = (0..n)
      .map(|i| self.covariance[(i, i)].max(0.0).sqrt())
      .collect();

    let mut corr = Array2::zeros((n, n));
    for i in 0..n {
      for j in 0..n {
        let denom = sigmas[i] * sigmas[j];
        corr[(i, j)] = if denom > 0.0 {
          (self.covariance[(i, j)] / denom).clamp(-1.0, 1.0)
        } else {
          0.0
        };
      }
    }

    corr
  }
}

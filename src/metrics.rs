//! # Asset Metrics
//!
//! $$
//! \text{Sharpe}=\frac{R_a - r_f}{\sigma_a},\qquad
//! \text{MDD}=\min_t\left(\frac{V_t}{\max_{s\le t}V_s}-1\right)
//! $$
//!
//! Per-asset annualized performance statistics from daily return series.

use ndarray::ArrayView1;
use serde::Serialize;

use crate::returns::ReturnMatrix;

/// Annualized risk/return statistics for a single asset.
#[derive(Clone, Debug, Serialize)]
pub struct AssetMetrics {
  pub asset: String,
  /// Geometric annualization `(1 + mean)^T - 1`.
  pub annualized_return: f64,
  /// Sample stdev of daily returns scaled by `sqrt(T)`.
  pub annualized_volatility: f64,
  /// Excess return over volatility, 0 for zero-variance assets.
  pub sharpe: f64,
  /// Excess return over downside deviation, 0 when no downside exists.
  pub sortino: f64,
  /// Most negative peak-to-trough drop of the cumulative growth path.
  pub max_drawdown: f64,
}

fn sample_std(xs: ArrayView1<'_, f64>) -> f64 {
  if xs.len() < 2 {
    return 0.0;
  }
  let mean = xs.mean().unwrap_or(0.0);
  let ss: f64 = xs.iter().map(|&x| (x - mean) * (x - mean)).sum();
  (ss / (xs.len() - 1) as f64).sqrt()
}

fn downside_std(xs: ArrayView1<'_, f64>) -> f64 {
  let downs: Vec<f64> = xs.iter().copied().filter(|&x| x < 0.0).collect();
  if downs.len() < 2 {
    return 0.0;
  }
  let mean = downs.iter().sum::<f64>() / downs.len() as f64;
  let ss: f64 = downs.iter().map(|&x| (x - mean) * (x - mean)).sum();
  (ss / (downs.len() - 1) as f64).sqrt()
}

fn max_drawdown(xs: ArrayView1<'_, f64>) -> f64 {
  let mut cumulative = 1.0_f64;
  let mut peak = 1.0_f64;
  let mut worst = 0.0_f64;

  for &r in xs.iter() {
    cumulative *= 1.0 + r;
    peak = peak.max(cumulative);
    worst = worst.min(cumulative / peak - 1.0);
  }

  worst
}

/// Compute [`AssetMetrics`] for every asset in the matrix.
pub fn asset_metrics(matrix: &ReturnMatrix, risk_free: f64, trading_days: f64) -> Vec<AssetMetrics> {
  matrix
    .assets()
    .iter()
    .enumerate()
    .map(|(i, asset)| {
      let series = matrix.column(i);
      let mean_daily = series.mean().unwrap_or(0.0);

      let annualized_return = (1.0 + mean_daily).powf(trading_days) - 1.0;
      let annualized_volatility = sample_std(series) * trading_days.sqrt();
      let downside = downside_std(series) * trading_days.sqrt();

      let sharpe = if annualized_volatility > 0.0 {
        (annualized_return - risk_free) / annualized_volatility
      } else {
        0.0
      };
      let sortino = if downside > 0.0 {
        (annualized_return - risk_free) / downside
      } else {
        0.0
      };

      AssetMetrics {
        asset: asset.clone(),
        annualized_return,
        annualized_volatility,
        sharpe,
        sortino,
        max_drawdown: max_drawdown(series),
      }
    })
    .collect()
}

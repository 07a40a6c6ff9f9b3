//! # Frontier Builder
//!
//! $$
//! \sigma^\*(r)=\min_{\mathbf{w}}\ \sigma_p(\mathbf{w})
//! \quad\text{s.t.}\quad \mathbf{w}^\top\mu=r
//! $$
//!
//! Drives the optimizer across a grid of target returns per constraint
//! regime. Grid points are independent and solve in parallel; the configured
//! failure policy is applied in a sequential pass afterwards.

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::error::OptimizationFailure;
use crate::optimizer::MeanVarianceModel;
use crate::types::PortfolioPoint;
use crate::types::Regime;

/// Extrapolation slope for synthesized short-allowed points.
const SHORT_ALLOWED_SLOPE: f64 = 1.5;
/// Steeper slope for the long-only frontier, which bends harder near its top.
const LONG_ONLY_SLOPE: f64 = 2.0;

/// What to do with a frontier grid point whose solve failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum FrontierPolicy {
  /// Drop the point and record the failure. The frontier may end up with
  /// fewer points than requested. Default, since extrapolation fabricates
  /// unvalidated data.
  #[default]
  Skip,
  /// Synthesize a point from the last success by linear volatility
  /// extrapolation, flagging it so consumers never mistake it for a solve.
  Extrapolate,
}

/// One frontier grid point, solved or synthesized.
#[derive(Clone, Debug, Serialize)]
pub struct FrontierPoint {
  /// Gridded target return this point was solved for.
  pub target_return: f64,
  /// Achieved model return.
  pub expected_return: f64,
  /// Minimum volatility at the target (extrapolated when `synthesized`).
  pub volatility: f64,
  /// Allocation; the last success's weights when `synthesized`.
  pub weights: Vec<f64>,
  /// True when produced by the extrapolation policy rather than a solve.
  pub synthesized: bool,
}

/// Minimum-variance frontier of one regime, ordered by increasing target.
#[derive(Clone, Debug, Serialize)]
pub struct Frontier {
  pub regime: Regime,
  pub points: Vec<FrontierPoint>,
  /// Per-point failures, also recorded for synthesized points.
  pub failures: Vec<OptimizationFailure>,
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
  if count <= 1 || end - start < 1e-12 {
    return vec![start];
  }
  let step = (end - start) / (count - 1) as f64;
  (0..count).map(|i| start + step * i as f64).collect()
}

/// Builds the minimum-variance frontier for a [`MeanVarianceModel`].
#[derive(Clone, Debug)]
pub struct FrontierBuilder<'a> {
  model: &'a MeanVarianceModel,
  points: usize,
  policy: FrontierPolicy,
  short_upper_factor: f64,
}

impl<'a> FrontierBuilder<'a> {
  pub fn new(model: &'a MeanVarianceModel) -> Self {
    Self {
      model,
      points: 50,
      policy: FrontierPolicy::default(),
      short_upper_factor: 1.2,
    }
  }

  /// Number of grid targets (at least 1).
  pub fn points(mut self, points: usize) -> Self {
    self.points = points.max(1);
    self
  }

  pub fn policy(mut self, policy: FrontierPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Multiplier extending the short-allowed grid past the best single-asset
  /// return to render the frontier's upper bend.
  pub fn short_upper_factor(mut self, factor: f64) -> Self {
    self.short_upper_factor = factor;
    self
  }

  /// Build the frontier for one regime, anchored at the regime's GMVP
  /// return. A GMVP failure is fatal to the regime and propagates.
  pub fn build(&self, regime: Regime) -> Result<Frontier, OptimizationFailure> {
    let gmvp = self.model.gmvp(regime)?;

    let max_mu = self.model.max_expected_return();
    let upper = match regime {
      Regime::ShortAllowed => max_mu * self.short_upper_factor,
      Regime::LongOnly => max_mu,
    };
    let targets = linspace(gmvp.expected_return, upper, self.points);

    let solved: Vec<Result<PortfolioPoint, OptimizationFailure>> = targets
      .par_iter()
      .map(|&target| self.model.minimize_volatility_for_return(regime, target))
      .collect();

    let mut points: Vec<FrontierPoint> = Vec::with_capacity(targets.len());
    let mut failures = Vec::new();

    for (target, outcome) in targets.into_iter().zip(solved) {
      match outcome {
        Ok(point) => points.push(FrontierPoint {
          target_return: target,
          expected_return: point.expected_return,
          volatility: point.volatility,
          weights: point.weights,
          synthesized: false,
        }),
        Err(failure) => {
          warn!(%regime, target, %failure, "frontier grid point failed");

          if self.policy == FrontierPolicy::Extrapolate {
            if let Some(last) = points.last() {
              if target > last.target_return {
                let slope = match regime {
                  Regime::ShortAllowed => SHORT_ALLOWED_SLOPE,
                  Regime::LongOnly => LONG_ONLY_SLOPE,
                };
                points.push(FrontierPoint {
                  target_return: target,
                  expected_return: target,
                  volatility: last.volatility + slope * (target - last.target_return),
                  weights: last.weights.clone(),
                  synthesized: true,
                });
              }
            }
          }
          failures.push(failure);
        }
      }
    }

    Ok(Frontier {
      regime,
      points,
      failures,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::optimizer::MeanVarianceModel;
  use approx::assert_abs_diff_eq;
  use ndarray::arr1;
  use ndarray::arr2;

  fn three_asset_model() -> MeanVarianceModel {
    MeanVarianceModel::new(
      vec!["A".to_string(), "B".to_string(), "C".to_string()],
      arr1(&[0.08, 0.10, 0.12]),
      arr2(&[
        [0.04, 0.006, 0.0],
        [0.006, 0.09, 0.012],
        [0.0, 0.012, 0.16],
      ]),
    )
    .unwrap()
  }

  fn two_asset_model() -> MeanVarianceModel {
    MeanVarianceModel::new(
      vec!["A".to_string(), "B".to_string()],
      arr1(&[0.10, 0.05]),
      arr2(&[[0.04, 0.0], [0.0, 0.01]]),
    )
    .unwrap()
  }

  #[test]
  fn long_only_frontier_volatility_is_non_decreasing() {
    let model = three_asset_model();
    let frontier = FrontierBuilder::new(&model)
      .points(12)
      .build(Regime::LongOnly)
      .unwrap();

    assert!(frontier.failures.is_empty());
    assert!(frontier.points.iter().all(|p| !p.synthesized));
    for pair in frontier.points.windows(2) {
      assert!(pair[1].target_return > pair[0].target_return);
      assert!(pair[1].volatility >= pair[0].volatility - 1e-4);
    }
  }

  #[test]
  fn gmvp_is_the_least_volatile_frontier_point() {
    let model = three_asset_model();
    let gmvp = model.gmvp(Regime::LongOnly).unwrap();
    let frontier = FrontierBuilder::new(&model)
      .points(12)
      .build(Regime::LongOnly)
      .unwrap();

    for point in &frontier.points {
      assert!(gmvp.volatility <= point.volatility + 1e-4);
    }
  }

  #[test]
  fn skip_policy_drops_unreachable_targets_and_reports_them() {
    // With bounds [-1, 1] and full investment the best reachable return is
    // 0.10, so the 1.2x-extended short-allowed grid must lose its top.
    let model = two_asset_model();
    let frontier = FrontierBuilder::new(&model)
      .points(8)
      .build(Regime::ShortAllowed)
      .unwrap();

    assert!(!frontier.failures.is_empty());
    assert!(frontier.points.len() < 8);
    assert!(frontier.points.iter().all(|p| !p.synthesized));
  }

  #[test]
  fn extrapolate_policy_flags_synthesized_points() {
    let model = two_asset_model();
    let frontier = FrontierBuilder::new(&model)
      .points(8)
      .policy(FrontierPolicy::Extrapolate)
      .build(Regime::ShortAllowed)
      .unwrap();

    assert!(!frontier.failures.is_empty());
    let synthesized: Vec<&FrontierPoint> =
      frontier.points.iter().filter(|p| p.synthesized).collect();
    assert!(!synthesized.is_empty());

    // Synthesized volatility extends linearly past the last solved point.
    for pair in frontier.points.windows(2) {
      assert!(pair[1].volatility >= pair[0].volatility - 1e-4);
    }
  }

  #[test]
  fn single_asset_frontier_degenerates_to_one_point() {
    let model = MeanVarianceModel::new(
      vec!["ONLY".to_string()],
      arr1(&[0.07]),
      arr2(&[[0.09]]),
    )
    .unwrap();

    let frontier = FrontierBuilder::new(&model)
      .points(50)
      .build(Regime::LongOnly)
      .unwrap();

    assert_eq!(frontier.points.len(), 1);
    assert_eq!(frontier.points[0].weights, vec![1.0]);
    assert_abs_diff_eq!(frontier.points[0].expected_return, 0.07, epsilon = 1e-12);
    assert_abs_diff_eq!(frontier.points[0].volatility, 0.3, epsilon = 1e-12);
  }
}

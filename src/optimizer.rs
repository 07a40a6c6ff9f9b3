//! # Portfolio Optimizer
//!
//! $$
//! \min_{\mathbf{w}}\ \sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\ \mathbf{w}^\top\mu=r^\*
//! $$
//!
//! Constrained mean-variance solves: minimum variance for a target return,
//! GMVP, maximum Sharpe and quadratic utility. The budget constraint is
//! structural (the last weight is `1 - sum` of the free parameters); box
//! bounds and the return target enter as quadratic penalties, and every
//! non-converged or infeasible solve surfaces as [`OptimizationFailure`].

use std::time::Duration;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use ndarray::Array2;

use crate::error::AnalysisError;
use crate::error::AnalysisResult;
use crate::error::FailureContext;
use crate::error::OptimizationFailure;
use crate::error::SolverStatus;
use crate::types::PortfolioPoint;
use crate::types::Regime;
use crate::types::UtilityPortfolio;

const BOUND_PENALTY: f64 = 1e6;
const RETURN_PENALTY: f64 = 1e4;
const BOUND_TOLERANCE: f64 = 1e-4;
const RETURN_TOLERANCE: f64 = 5e-3;
const SD_TOLERANCE: f64 = 1e-10;
const MAX_ITERS: u64 = 10_000;

fn embed_weights(x: &[f64]) -> Vec<f64> {
  let mut w = Vec::with_capacity(x.len() + 1);
  w.extend_from_slice(x);
  w.push(1.0 - x.iter().sum::<f64>());
  w
}

fn dot_mu(mu: &Array1<f64>, w: &[f64]) -> f64 {
  mu.iter().zip(w.iter()).map(|(m, wi)| m * wi).sum()
}

fn quadratic_form(cov: &Array2<f64>, w: &[f64]) -> f64 {
  let n = w.len();
  let mut acc = 0.0;
  for i in 0..n {
    for j in 0..n {
      acc += w[i] * cov[(i, j)] * w[j];
    }
  }
  acc
}

/// Clamp residual penalty slack to the bounds and restore the exact budget
/// by spreading the (tiny) leftover over components with room.
fn polish_weights(w: &mut [f64], lower: f64, upper: f64) {
  for _ in 0..4 {
    for wi in w.iter_mut() {
      *wi = wi.clamp(lower, upper);
    }

    let residual = 1.0 - w.iter().sum::<f64>();
    if residual.abs() < 1e-12 {
      return;
    }

    let room: Vec<usize> = (0..w.len())
      .filter(|&i| {
        if residual > 0.0 {
          w[i] < upper - 1e-12
        } else {
          w[i] > lower + 1e-12
        }
      })
      .collect();
    if room.is_empty() {
      return;
    }

    let share = residual / room.len() as f64;
    for i in room {
      w[i] += share;
    }
  }
}

#[derive(Clone, Copy, Debug)]
enum ObjectiveKind {
  Volatility,
  NegSharpe { risk_free: f64 },
  NegUtility { risk_aversion: f64 },
}

/// Objective-and-constraints bundle for one solve. Built fresh per call so
/// concurrent solves never share solver state.
struct ObjectiveBundle {
  mu: Array1<f64>,
  cov: Array2<f64>,
  kind: ObjectiveKind,
  target_return: Option<f64>,
  lower: f64,
  upper: f64,
}

impl CostFunction for ObjectiveBundle {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let w = embed_weights(x);
    let port_ret = dot_mu(&self.mu, &w);
    let port_var = quadratic_form(&self.cov, &w);

    let base = match self.kind {
      ObjectiveKind::Volatility => port_var.max(0.0).sqrt(),
      ObjectiveKind::NegSharpe { risk_free } => {
        let vol = port_var.max(0.0).sqrt();
        if vol < 1e-12 {
          return Ok(1e9);
        }
        -(port_ret - risk_free) / vol
      }
      ObjectiveKind::NegUtility { risk_aversion } => -(port_ret - 0.5 * risk_aversion * port_var),
    };

    let mut penalty = 0.0;
    if let Some(target) = self.target_return {
      penalty += RETURN_PENALTY * (port_ret - target).powi(2);
    }
    for &wi in &w {
      let violation = (self.lower - wi).max(wi - self.upper).max(0.0);
      penalty += BOUND_PENALTY * violation * violation;
    }

    let cost = base + penalty;
    Ok(if cost.is_finite() { cost } else { 1e12 })
  }
}

/// Mean-variance inputs of one analysis run: expected annual returns and a
/// regularized annualized covariance, aligned to a fixed asset order.
#[derive(Clone, Debug)]
pub struct MeanVarianceModel {
  assets: Vec<String>,
  mu: Array1<f64>,
  cov: Array2<f64>,
  timeout: Option<Duration>,
}

impl MeanVarianceModel {
  /// Build a model; `cov` must already carry its diagonal regularization
  /// (see [`crate::risk::RiskModel::regularized`]).
  pub fn new(assets: Vec<String>, mu: Array1<f64>, cov: Array2<f64>) -> AnalysisResult<Self> {
    let n = assets.len();
    if n == 0 {
      return Err(AnalysisError::data("model needs at least one asset"));
    }
    if mu.len() != n || cov.nrows() != n || cov.ncols() != n {
      return Err(AnalysisError::data(format!(
        "shape mismatch: {n} assets, mu of {}, cov of {}x{}",
        mu.len(),
        cov.nrows(),
        cov.ncols()
      )));
    }

    Ok(Self {
      assets,
      mu,
      cov,
      timeout: None,
    })
  }

  /// Bound the wall-clock time of every subsequent solve.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  /// Expected annual return vector.
  pub fn expected_returns(&self) -> &Array1<f64> {
    &self.mu
  }

  /// Largest single-asset expected return, the frontier's upper anchor.
  pub fn max_expected_return(&self) -> f64 {
    self.mu.iter().copied().fold(f64::NEG_INFINITY, f64::max)
  }

  /// Annualized model return of a weight vector.
  pub fn portfolio_return(&self, w: &[f64]) -> f64 {
    dot_mu(&self.mu, w)
  }

  /// Annualized model volatility of a weight vector.
  pub fn portfolio_volatility(&self, w: &[f64]) -> f64 {
    quadratic_form(&self.cov, w).max(0.0).sqrt()
  }

  /// Minimize volatility subject to the budget, the regime's bounds and a
  /// return-target equality.
  pub fn minimize_volatility_for_return(
    &self,
    regime: Regime,
    target_return: f64,
  ) -> Result<PortfolioPoint, OptimizationFailure> {
    let context = FailureContext::FrontierPoint { target_return };
    let w = self.solve(
      regime,
      ObjectiveKind::Volatility,
      Some(target_return),
      &context,
    )?;

    let achieved = self.portfolio_return(&w);
    let residual = (achieved - target_return).abs();
    if residual > RETURN_TOLERANCE {
      return Err(OptimizationFailure::new(
        regime,
        context,
        SolverStatus::InfeasibleTarget,
        format!("return residual {residual:.3e} above tolerance {RETURN_TOLERANCE:.1e}"),
      ));
    }

    Ok(self.point(w, None))
  }

  /// Global minimum-variance portfolio: budget and bounds only.
  pub fn gmvp(&self, regime: Regime) -> Result<PortfolioPoint, OptimizationFailure> {
    let w = self.solve(regime, ObjectiveKind::Volatility, None, &FailureContext::Gmvp)?;
    Ok(self.point(w, None))
  }

  /// Maximum-Sharpe (tangent) portfolio for a given risk-free rate.
  pub fn market_portfolio(
    &self,
    regime: Regime,
    risk_free: f64,
  ) -> Result<PortfolioPoint, OptimizationFailure> {
    let context = FailureContext::MarketPortfolio;
    let w = self.solve(
      regime,
      ObjectiveKind::NegSharpe { risk_free },
      None,
      &context,
    )?;

    let excess = self.portfolio_return(&w) - risk_free;
    if excess <= 0.0 {
      return Err(OptimizationFailure::new(
        regime,
        context,
        SolverStatus::NoPositiveExcessReturn,
        format!("best feasible excess return {excess:.3e} is not positive"),
      ));
    }

    let volatility = self.portfolio_volatility(&w);
    let sharpe = if volatility > 0.0 { excess / volatility } else { 0.0 };
    Ok(self.point(w, Some(sharpe)))
  }

  /// Maximize the quadratic utility `w'mu - (A/2) w'Sigma w`, long-only.
  pub fn maximize_utility(
    &self,
    risk_aversion: f64,
  ) -> Result<UtilityPortfolio, OptimizationFailure> {
    let context = FailureContext::Utility { risk_aversion };
    let w = self.solve(
      Regime::LongOnly,
      ObjectiveKind::NegUtility { risk_aversion },
      None,
      &context,
    )?;

    let expected_return = self.portfolio_return(&w);
    let variance = quadratic_form(&self.cov, &w).max(0.0);
    let volatility = variance.sqrt();
    let utility = expected_return - 0.5 * risk_aversion * variance;
    let sharpe = if volatility > 0.0 {
      expected_return / volatility
    } else {
      0.0
    };

    Ok(UtilityPortfolio {
      point: PortfolioPoint {
        weights: w,
        expected_return,
        volatility,
        sharpe: Some(sharpe),
      },
      risk_aversion,
      utility,
    })
  }

  fn point(&self, weights: Vec<f64>, sharpe: Option<f64>) -> PortfolioPoint {
    let expected_return = self.portfolio_return(&weights);
    let volatility = self.portfolio_volatility(&weights);
    PortfolioPoint {
      weights,
      expected_return,
      volatility,
      sharpe,
    }
  }

  fn solve(
    &self,
    regime: Regime,
    kind: ObjectiveKind,
    target_return: Option<f64>,
    context: &FailureContext,
  ) -> Result<Vec<f64>, OptimizationFailure> {
    let n = self.assets.len();
    let (lower, upper) = regime.bounds();
    // Fully invested single-asset portfolios admit exactly one allocation.
    if n == 1 {
      return Ok(vec![1.0]);
    }

    let fail = |status: SolverStatus, message: String| {
      OptimizationFailure::new(regime, context.clone(), status, message)
    };

    tracing::debug!(%regime, %context, "starting constrained solve");

    let bundle = ObjectiveBundle {
      mu: self.mu.clone(),
      cov: self.cov.clone(),
      kind,
      target_return,
      lower,
      upper,
    };

    // Equal-weight start in the n-1 dimensional free parameterization.
    let x0 = vec![1.0 / n as f64; n - 1];
    let mut simplex = Vec::with_capacity(n);
    simplex.push(x0.clone());
    for i in 0..(n - 1) {
      let mut vertex = x0.clone();
      vertex[i] += 0.1;
      simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex)
      .with_sd_tolerance(SD_TOLERANCE)
      .map_err(|e| fail(SolverStatus::SolverError, e.to_string()))?;

    let mut executor =
      Executor::new(bundle, solver).configure(|state| state.max_iters(MAX_ITERS));
    if let Some(timeout) = self.timeout {
      executor = executor.timeout(timeout);
    }

    let res = executor
      .run()
      .map_err(|e| fail(SolverStatus::SolverError, e.to_string()))?;

    if !res.state.best_cost.is_finite() {
      return Err(fail(
        SolverStatus::DidNotConverge,
        format!("non-finite best cost ({:?})", res.state.termination_status),
      ));
    }
    let best_x = res.state.best_param.clone().ok_or_else(|| {
      fail(
        SolverStatus::DidNotConverge,
        format!("no best parameter ({:?})", res.state.termination_status),
      )
    })?;

    let mut w = embed_weights(&best_x);
    let max_violation = w
      .iter()
      .map(|&wi| (lower - wi).max(wi - upper).max(0.0))
      .fold(0.0, f64::max);
    if max_violation > BOUND_TOLERANCE {
      return Err(fail(
        SolverStatus::DidNotConverge,
        format!("bound violation {max_violation:.3e} above tolerance {BOUND_TOLERANCE:.1e}"),
      ));
    }

    polish_weights(&mut w, lower, upper);
    Ok(w)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;
  use ndarray::arr1;
  use ndarray::arr2;

  fn two_asset_model() -> MeanVarianceModel {
    MeanVarianceModel::new(
      vec!["A".to_string(), "B".to_string()],
      arr1(&[0.10, 0.05]),
      arr2(&[[0.04, 0.0], [0.0, 0.01]]),
    )
    .unwrap()
  }

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

  #[test]
  fn gmvp_of_uncorrelated_assets_is_inverse_variance_weighted() {
    let point = two_asset_model().gmvp(Regime::ShortAllowed).unwrap();

    assert_abs_diff_eq!(point.weights[0], 0.2, epsilon = 5e-3);
    assert_abs_diff_eq!(point.weights[1], 0.8, epsilon = 5e-3);
    assert_abs_diff_eq!(point.expected_return, 0.06, epsilon = 1e-3);
    assert_abs_diff_eq!(
      point.volatility,
      (1.0_f64 / (1.0 / 0.04 + 1.0 / 0.01)).sqrt(),
      epsilon = 1e-3
    );
  }

  #[test]
  fn weights_sum_to_one_under_both_regimes() {
    let model = three_asset_model();
    for regime in [Regime::ShortAllowed, Regime::LongOnly] {
      let point = model.gmvp(regime).unwrap();
      let sum: f64 = point.weights.iter().sum();
      assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
    }
  }

  #[test]
  fn long_only_weights_respect_box_bounds() {
    let model = three_asset_model();
    let point = model
      .minimize_volatility_for_return(Regime::LongOnly, 0.11)
      .unwrap();

    for &w in &point.weights {
      assert!(w >= -1e-9 && w <= 1.0 + 1e-9, "weight {w} out of [0,1]");
    }
  }

  #[test]
  fn repeated_solves_are_deterministic() {
    let model = three_asset_model();
    let a = model.gmvp(Regime::LongOnly).unwrap();
    let b = model.gmvp(Regime::LongOnly).unwrap();

    for (wa, wb) in a.weights.iter().zip(b.weights.iter()) {
      assert_abs_diff_eq!(*wa, *wb, epsilon = 1e-12);
    }
  }

  #[test]
  fn unattainable_long_only_target_is_an_infeasible_failure() {
    let err = two_asset_model()
      .minimize_volatility_for_return(Regime::LongOnly, 0.20)
      .unwrap_err();

    assert_eq!(err.status, SolverStatus::InfeasibleTarget);
    assert_eq!(err.regime, Regime::LongOnly);
    assert!(matches!(
      err.context,
      FailureContext::FrontierPoint { .. }
    ));
  }

  #[test]
  fn market_portfolio_without_positive_excess_fails() {
    let model = MeanVarianceModel::new(
      vec!["A".to_string(), "B".to_string()],
      arr1(&[0.01, 0.005]),
      arr2(&[[0.04, 0.0], [0.0, 0.01]]),
    )
    .unwrap();

    let err = model
      .market_portfolio(Regime::LongOnly, 0.05)
      .unwrap_err();
    assert_eq!(err.status, SolverStatus::NoPositiveExcessReturn);
  }

  #[test]
  fn market_portfolio_beats_equal_weights_on_sharpe() {
    let model = three_asset_model();
    let point = model.market_portfolio(Regime::LongOnly, 0.02).unwrap();

    let eq = vec![1.0 / 3.0; 3];
    let eq_sharpe =
      (model.portfolio_return(&eq) - 0.02) / model.portfolio_volatility(&eq);
    assert!(point.sharpe.unwrap() + 1e-6 >= eq_sharpe);
  }

  #[test]
  fn single_asset_degenerates_to_full_weight() {
    let model = MeanVarianceModel::new(
      vec!["ONLY".to_string()],
      arr1(&[0.07]),
      arr2(&[[0.09]]),
    )
    .unwrap();

    let gmvp = model.gmvp(Regime::LongOnly).unwrap();
    assert_eq!(gmvp.weights, vec![1.0]);
    assert_abs_diff_eq!(gmvp.expected_return, 0.07, epsilon = 1e-12);
    assert_abs_diff_eq!(gmvp.volatility, 0.3, epsilon = 1e-12);

    let market = model.market_portfolio(Regime::LongOnly, 0.02).unwrap();
    assert_eq!(market.weights, vec![1.0]);
  }

  #[test]
  fn higher_risk_aversion_lowers_volatility() {
    let model = three_asset_model();
    let aggressive = model.maximize_utility(1.5).unwrap();
    let conservative = model.maximize_utility(12.0).unwrap();

    assert!(conservative.point.volatility <= aggressive.point.volatility + 1e-6);
    let sum: f64 = conservative.point.weights.iter().sum();
    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
  }
}

//! # Types
//!
//! $$
//! \mathbf{w}\in\mathbb{R}^n,\quad \sum_i w_i = 1
//! $$
//!
//! Shared enums and result containers for the mean-variance engine.

use serde::Serialize;

/// Weight bound configuration applied to every optimization call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Regime {
  /// Weights bounded to `[-1, 1]` componentwise (bounded leverage).
  ShortAllowed,
  /// Weights bounded to `[0, 1]` componentwise.
  LongOnly,
}

impl Regime {
  /// Componentwise `(lower, upper)` weight bounds for this regime.
  pub fn bounds(&self) -> (f64, f64) {
    match self {
      Regime::ShortAllowed => (-1.0, 1.0),
      Regime::LongOnly => (0.0, 1.0),
    }
  }
}

impl std::fmt::Display for Regime {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Regime::ShortAllowed => write!(f, "short-allowed"),
      Regime::LongOnly => write!(f, "long-only"),
    }
  }
}

/// A solved portfolio: weights plus its model return and volatility.
#[derive(Clone, Debug, Serialize)]
pub struct PortfolioPoint {
  /// Portfolio weights aligned to the model's asset order, summing to 1.
  pub weights: Vec<f64>,
  /// Annualized model return `w' mu`.
  pub expected_return: f64,
  /// Annualized model volatility `sqrt(w' Sigma w)`.
  pub volatility: f64,
  /// Sharpe ratio, populated only by the market-portfolio solve.
  pub sharpe: Option<f64>,
}

/// Output of a utility-maximizing solve for one risk-aversion level.
#[derive(Clone, Debug, Serialize)]
pub struct UtilityPortfolio {
  /// The solved allocation.
  pub point: PortfolioPoint,
  /// Risk-aversion coefficient `A` used in the objective.
  pub risk_aversion: f64,
  /// Achieved utility `w' mu - (A/2) w' Sigma w`.
  pub utility: f64,
}

/// A named risk-aversion level.
#[derive(Clone, Debug, Serialize)]
pub struct RiskProfile {
  /// Display label, e.g. "Aggressive".
  pub label: String,
  /// Risk-aversion coefficient `A`; larger values penalize variance harder.
  pub risk_aversion: f64,
}

impl RiskProfile {
  pub fn new(label: impl Into<String>, risk_aversion: f64) -> Self {
    Self {
      label: label.into(),
      risk_aversion,
    }
  }
}

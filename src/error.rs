//! # Errors
//!
//! $$
//! \text{status}\in\{\text{converged},\dots\}
//! $$
//!
//! Structured error taxonomy: fatal data errors and per-call solver failures.

use serde::Serialize;
use thiserror::Error;

use crate::types::Regime;

/// Specialized Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Top-level error for an analysis run.
#[derive(Error, Debug, Clone, Serialize)]
pub enum AnalysisError {
  /// Malformed or misaligned input matrix, rejected before any optimization.
  #[error("invalid return data: {message}")]
  Data {
    /// What the validation found.
    message: String,
  },

  /// A solver call failed; see [`OptimizationFailure`] for the call identity.
  #[error(transparent)]
  Optimization(#[from] OptimizationFailure),
}

impl AnalysisError {
  pub(crate) fn data(message: impl Into<String>) -> Self {
    Self::Data {
      message: message.into(),
    }
  }
}

/// Which optimization call produced a failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum FailureContext {
  /// Global minimum-variance solve.
  Gmvp,
  /// Maximum-Sharpe (tangent) solve.
  MarketPortfolio,
  /// Minimum-volatility solve for one frontier grid target.
  FrontierPoint {
    /// The targeted annualized return.
    target_return: f64,
  },
  /// Utility-maximizing solve for one risk-aversion coefficient.
  Utility {
    /// Risk-aversion coefficient `A` of the objective.
    risk_aversion: f64,
  },
  /// Utility-maximizing solve for one named risk profile.
  RiskProfile {
    /// Catalog label of the profile.
    label: String,
  },
}

impl std::fmt::Display for FailureContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FailureContext::Gmvp => write!(f, "GMVP"),
      FailureContext::MarketPortfolio => write!(f, "market portfolio"),
      FailureContext::FrontierPoint { target_return } => {
        write!(f, "frontier point (target {target_return:.6})")
      }
      FailureContext::Utility { risk_aversion } => {
        write!(f, "utility maximization (A={risk_aversion})")
      }
      FailureContext::RiskProfile { label } => write!(f, "risk profile '{label}'"),
    }
  }
}

/// Diagnostic classification of a failed solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
  /// The solver terminated without reaching a feasible stationary point.
  DidNotConverge,
  /// The return target is unattainable under the regime's bounds.
  InfeasibleTarget,
  /// No feasible point has positive excess return over the risk-free rate.
  NoPositiveExcessReturn,
  /// The solver itself reported an error.
  SolverError,
}

impl std::fmt::Display for SolverStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SolverStatus::DidNotConverge => write!(f, "did not converge"),
      SolverStatus::InfeasibleTarget => write!(f, "infeasible target"),
      SolverStatus::NoPositiveExcessReturn => write!(f, "no positive excess return"),
      SolverStatus::SolverError => write!(f, "solver error"),
    }
  }
}

/// Structured record of a single failed optimization call.
///
/// Callers branch on `status` and `context` instead of parsing `message`;
/// `message` carries the solver diagnostic for logs and reports.
#[derive(Error, Clone, Debug, Serialize)]
#[error("{context} under {regime} regime: {status} ({message})")]
pub struct OptimizationFailure {
  /// Bound regime of the failed call.
  pub regime: Regime,
  /// Identity of the failed call.
  pub context: FailureContext,
  /// Diagnostic classification.
  pub status: SolverStatus,
  /// Free-form solver diagnostic.
  pub message: String,
}

impl OptimizationFailure {
  pub(crate) fn new(
    regime: Regime,
    context: FailureContext,
    status: SolverStatus,
    message: impl Into<String>,
  ) -> Self {
    Self {
      regime,
      context,
      status,
      message: message.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn failure_display_names_call_and_regime() {
    let failure = OptimizationFailure::new(
      Regime::LongOnly,
      FailureContext::FrontierPoint {
        target_return: 0.125,
      },
      SolverStatus::InfeasibleTarget,
      "return residual 2.1e-2 above tolerance",
    );

    let text = failure.to_string();
    assert!(text.contains("frontier point"));
    assert!(text.contains("long-only"));
    assert!(text.contains("infeasible target"));
  }
}

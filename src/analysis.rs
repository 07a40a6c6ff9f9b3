//! # Analysis Engine
//!
//! $$
//! \text{returns} \to (\mu, \Sigma) \to \text{frontier} + \text{profiles}
//! $$
//!
//! Orchestration entry point: per-asset statistics, risk matrices, both
//! regime frontiers with GMVP and market portfolios, and the risk-profile
//! allocations, assembled into a plain serializable report.

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::config::FundCatalog;
use crate::error::AnalysisResult;
use crate::error::OptimizationFailure;
use crate::frontier::Frontier;
use crate::frontier::FrontierBuilder;
use crate::metrics::asset_metrics;
use crate::metrics::AssetMetrics;
use crate::optimizer::MeanVarianceModel;
use crate::profiles::allocate_profiles;
use crate::profiles::ProfileOutcome;
use crate::returns::ReturnMatrix;
use crate::risk::RiskModel;
use crate::types::PortfolioPoint;
use crate::types::Regime;

/// Per-asset statistics merged with catalog metadata.
#[derive(Clone, Debug, Serialize)]
pub struct AssetReport {
  #[serde(flatten)]
  pub metrics: AssetMetrics,
  pub ticker: Option<String>,
  pub description: String,
  pub asset_class: String,
}

/// Complete results of one regime.
#[derive(Clone, Debug, Serialize)]
pub struct RegimeReport {
  pub regime: Regime,
  pub gmvp: PortfolioPoint,
  pub market: PortfolioPoint,
  pub frontier: Frontier,
}

/// A regime either completes or fails as a unit; there is no principled
/// partial result when its minimum-variance anchor does not exist.
#[derive(Clone, Debug, Serialize)]
pub enum RegimeOutcome {
  Ready(RegimeReport),
  Failed {
    regime: Regime,
    failure: OptimizationFailure,
  },
}

impl RegimeOutcome {
  pub fn regime(&self) -> Regime {
    match self {
      RegimeOutcome::Ready(report) => report.regime,
      RegimeOutcome::Failed { regime, .. } => *regime,
    }
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, RegimeOutcome::Ready(_))
  }
}

/// Everything one analysis run produces, as plain structured data ready for
/// an external serialization or charting layer.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
  pub assets: Vec<String>,
  pub asset_reports: Vec<AssetReport>,
  pub covariance: Vec<Vec<f64>>,
  pub correlation: Vec<Vec<f64>>,
  pub regimes: Vec<RegimeOutcome>,
  pub profiles: Vec<ProfileOutcome>,
}

fn to_nested(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
  matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Single entry point driving the full pipeline over one return matrix.
#[derive(Clone, Debug, Default)]
pub struct AnalysisEngine {
  config: AnalysisConfig,
}

impl AnalysisEngine {
  pub fn new(config: AnalysisConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  /// Run the full analysis. Only invalid input data is fatal; solver
  /// failures degrade the affected regime, grid point or profile and are
  /// reported in place.
  pub fn run(&self, matrix: &ReturnMatrix, catalog: &FundCatalog) -> AnalysisResult<AnalysisReport> {
    let cfg = &self.config;
    debug!(
      assets = matrix.n_assets(),
      periods = matrix.n_periods(),
      "starting analysis run"
    );

    let metrics = asset_metrics(matrix, cfg.risk_free, cfg.trading_days);
    let asset_reports: Vec<AssetReport> = metrics
      .into_iter()
      .map(|m| {
        let info = catalog.lookup(&m.asset);
        AssetReport {
          metrics: m,
          ticker: info.ticker,
          description: info.description,
          asset_class: info.asset_class,
        }
      })
      .collect();

    let risk = RiskModel::from_returns(matrix, cfg.trading_days);
    let mu = matrix.expected_annual_returns(cfg.trading_days);
    let model = MeanVarianceModel::new(
      matrix.assets().to_vec(),
      mu,
      risk.regularized(cfg.ridge_epsilon),
    )?
    .with_timeout(cfg.solve_timeout);

    let regimes = [Regime::ShortAllowed, Regime::LongOnly]
      .into_iter()
      .map(|regime| match self.regime_report(&model, regime) {
        Ok(report) => RegimeOutcome::Ready(report),
        Err(failure) => {
          warn!(%regime, %failure, "regime-level optimization failed");
          RegimeOutcome::Failed { regime, failure }
        }
      })
      .collect();

    let profiles = allocate_profiles(
      &model,
      &cfg.risk_profiles,
      cfg.materiality_threshold,
      cfg.weight_precision,
    );

    Ok(AnalysisReport {
      assets: matrix.assets().to_vec(),
      asset_reports,
      covariance: to_nested(risk.covariance()),
      correlation: to_nested(&risk.correlation()),
      regimes,
      profiles,
    })
  }

  fn regime_report(
    &self,
    model: &MeanVarianceModel,
    regime: Regime,
  ) -> Result<RegimeReport, OptimizationFailure> {
    let cfg = &self.config;
    let gmvp = model.gmvp(regime)?;
    let market = model.market_portfolio(regime, cfg.risk_free)?;
    let frontier = FrontierBuilder::new(model)
      .points(cfg.frontier_points)
      .policy(cfg.frontier_policy)
      .short_upper_factor(cfg.short_upper_factor)
      .build(regime)?;

    Ok(RegimeReport {
      regime,
      gmvp,
      market,
      frontier,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::returns::ReturnMatrix;

  fn synthetic_matrix() -> ReturnMatrix {
    let n = 60;
    let col = |freq: f64, drift: f64, amp: f64| {
      (0..n)
        .map(|t| drift + amp * (t as f64 * freq).sin())
        .collect::<Vec<f64>>()
    };

    ReturnMatrix::from_columns(vec![
      ("Alpha Fund".to_string(), col(0.9, 0.0020, 0.010)),
      ("Beta Fund".to_string(), col(0.53, 0.0015, 0.008)),
      ("Gamma Fund".to_string(), col(1.7, 0.0010, 0.012)),
    ])
    .unwrap()
  }

  fn small_config() -> AnalysisConfig {
    AnalysisConfig {
      frontier_points: 10,
      ..AnalysisConfig::default()
    }
  }

  #[test]
  fn full_run_produces_both_regimes_and_all_profiles() {
    let engine = AnalysisEngine::new(small_config());
    let report = engine
      .run(&synthetic_matrix(), &FundCatalog::new())
      .unwrap();

    assert_eq!(report.assets.len(), 3);
    assert_eq!(report.asset_reports.len(), 3);
    assert_eq!(report.covariance.len(), 3);
    assert_eq!(report.covariance[0].len(), 3);
    assert_eq!(report.correlation.len(), 3);

    assert_eq!(report.regimes.len(), 2);
    assert!(report.regimes.iter().all(RegimeOutcome::is_ready));
    assert_eq!(report.profiles.len(), 5);
    assert!(report.profiles.iter().all(ProfileOutcome::is_allocated));
  }

  #[test]
  fn report_serializes_to_plain_json() {
    let engine = AnalysisEngine::new(small_config());
    let report = engine
      .run(&synthetic_matrix(), &FundCatalog::new())
      .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert!(value.get("covarianceMatrix").is_none());
    assert!(value["covariance"].is_array());
    assert!(value["regimes"].is_array());
    assert!(value["asset_reports"][0]["description"].is_string());
  }

  #[test]
  fn single_asset_run_degenerates_cleanly() {
    let n = 40;
    let matrix = ReturnMatrix::from_columns(vec![(
      "Solo Fund".to_string(),
      (0..n)
        .map(|t| 0.002 + 0.009 * (t as f64 * 1.1).sin())
        .collect(),
    )])
    .unwrap();

    let engine = AnalysisEngine::new(small_config());
    let report = engine.run(&matrix, &FundCatalog::new()).unwrap();

    for outcome in &report.regimes {
      let RegimeOutcome::Ready(regime) = outcome else {
        panic!("expected ready regime");
      };
      assert_eq!(regime.gmvp.weights, vec![1.0]);
      assert_eq!(regime.market.weights, vec![1.0]);
      assert!(!regime.frontier.points.is_empty());
    }
    for profile in &report.profiles {
      assert!(profile.is_allocated());
    }
  }
}

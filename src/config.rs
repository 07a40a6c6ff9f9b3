//! # Configuration
//!
//! $$
//! r_f,\ T,\ \varepsilon,\ \{A_k\}
//! $$
//!
//! Run configuration and the injected fund-metadata catalog.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::frontier::FrontierPolicy;
use crate::profiles::default_risk_profiles;
use crate::types::RiskProfile;

/// Tunables of one analysis run. Every run is a pure function of the input
/// matrix and this configuration.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
  /// Annual risk-free rate entering Sharpe/Sortino and the tangent solve.
  pub risk_free: f64,
  /// Trading periods per year used for annualization.
  pub trading_days: f64,
  /// Number of frontier grid targets per regime.
  pub frontier_points: usize,
  /// Ridge added to the covariance diagonal before any optimizer use.
  pub ridge_epsilon: f64,
  /// Failure policy for frontier grid points.
  pub frontier_policy: FrontierPolicy,
  /// Upper-grid extension factor for the short-allowed frontier.
  pub short_upper_factor: f64,
  /// Minimum weight kept in a profile's recommended allocation.
  pub materiality_threshold: f64,
  /// Decimal places of recommended-allocation weights.
  pub weight_precision: u32,
  /// Named risk-aversion catalog evaluated by the profile allocator.
  pub risk_profiles: Vec<RiskProfile>,
  /// Wall-clock bound per solver call; convergence time is unbounded on
  /// pathological inputs.
  pub solve_timeout: Option<Duration>,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.03,
      trading_days: 252.0,
      frontier_points: 50,
      ridge_epsilon: 1e-8,
      frontier_policy: FrontierPolicy::Skip,
      short_upper_factor: 1.2,
      materiality_threshold: 0.01,
      weight_precision: 4,
      risk_profiles: default_risk_profiles(),
      solve_timeout: Some(Duration::from_secs(5)),
    }
  }
}

/// Static descriptive metadata for one fund.
#[derive(Clone, Debug)]
pub struct FundInfo {
  pub ticker: Option<String>,
  pub description: String,
  pub asset_class: String,
}

impl Default for FundInfo {
  fn default() -> Self {
    Self {
      ticker: None,
      description: "No description available.".to_string(),
      asset_class: "Equity".to_string(),
    }
  }
}

/// Injected asset-name to [`FundInfo`] lookup. Plain configuration data
/// owned by the caller, never process-wide state.
#[derive(Clone, Debug, Default)]
pub struct FundCatalog {
  funds: BTreeMap<String, FundInfo>,
}

impl FundCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, info: FundInfo) {
    self.funds.insert(name.into(), info);
  }

  /// Builder-style insertion.
  pub fn with_fund(mut self, name: impl Into<String>, info: FundInfo) -> Self {
    self.insert(name, info);
    self
  }

  /// Metadata for a fund, falling back to the default placeholders for
  /// names the catalog does not carry.
  pub fn lookup(&self, name: &str) -> FundInfo {
    self.funds.get(name).cloned().unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_funds_get_placeholder_metadata() {
    let catalog = FundCatalog::new().with_fund(
      "SPDR Gold Shares",
      FundInfo {
        ticker: Some("O87.SI".to_string()),
        description: "Gold bullion exposure.".to_string(),
        asset_class: "Alternative - Commodities".to_string(),
      },
    );

    let known = catalog.lookup("SPDR Gold Shares");
    assert_eq!(known.ticker.as_deref(), Some("O87.SI"));

    let unknown = catalog.lookup("Mystery Fund");
    assert_eq!(unknown.description, "No description available.");
    assert_eq!(unknown.asset_class, "Equity");
    assert!(unknown.ticker.is_none());
  }

  #[test]
  fn default_config_matches_documented_policy() {
    let config = AnalysisConfig::default();
    assert_eq!(config.frontier_policy, FrontierPolicy::Skip);
    assert_eq!(config.frontier_points, 50);
    assert_eq!(config.risk_profiles.len(), 5);
  }
}

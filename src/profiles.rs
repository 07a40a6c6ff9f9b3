//! # Risk Profiles
//!
//! $$
//! U(\mathbf{w}) = \mathbf{w}^\top\mu - \tfrac{A}{2}\,\mathbf{w}^\top\Sigma\mathbf{w}
//! $$
//!
//! Maps named risk-aversion levels to utility-optimal long-only allocations
//! and derives the materially-held "recommended" view per profile.

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::error::FailureContext;
use crate::error::OptimizationFailure;
use crate::optimizer::MeanVarianceModel;
use crate::types::RiskProfile;

/// The stock five-profile catalog, aggressive to very conservative.
pub fn default_risk_profiles() -> Vec<RiskProfile> {
  vec![
    RiskProfile::new("Aggressive", 1.5),
    RiskProfile::new("Growth-Oriented", 2.5),
    RiskProfile::new("Moderate", 3.5),
    RiskProfile::new("Conservative", 6.0),
    RiskProfile::new("Very Conservative", 12.0),
  ]
}

/// A weight attached to a named asset.
#[derive(Clone, Debug, Serialize)]
pub struct AssetWeight {
  pub asset: String,
  pub weight: f64,
}

/// Utility-optimal allocation for one named profile.
#[derive(Clone, Debug, Serialize)]
pub struct ProfileAllocation {
  pub label: String,
  pub risk_aversion: f64,
  /// Every asset with its solved weight.
  pub full_allocation: Vec<AssetWeight>,
  /// Weights strictly above the materiality threshold, renormalized to 1
  /// and rounded to the configured precision.
  pub recommended_allocation: Vec<AssetWeight>,
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: f64,
  pub utility: f64,
}

/// Outcome of one profile; failures stay isolated to their profile.
#[derive(Clone, Debug, Serialize)]
pub enum ProfileOutcome {
  Allocated(ProfileAllocation),
  Failed {
    label: String,
    risk_aversion: f64,
    failure: OptimizationFailure,
  },
}

impl ProfileOutcome {
  pub fn label(&self) -> &str {
    match self {
      ProfileOutcome::Allocated(allocation) => &allocation.label,
      ProfileOutcome::Failed { label, .. } => label,
    }
  }

  pub fn is_allocated(&self) -> bool {
    matches!(self, ProfileOutcome::Allocated(_))
  }
}

fn round_to(value: f64, precision: u32) -> f64 {
  let scale = 10f64.powi(precision as i32);
  (value * scale).round() / scale
}

/// Solve every catalog profile against the model, long-only. Profiles are
/// independent solves and evaluate in parallel; output order follows the
/// catalog.
pub fn allocate_profiles(
  model: &MeanVarianceModel,
  profiles: &[RiskProfile],
  materiality_threshold: f64,
  weight_precision: u32,
) -> Vec<ProfileOutcome> {
  profiles
    .par_iter()
    .map(|profile| match model.maximize_utility(profile.risk_aversion) {
      Ok(solved) => {
        let full_allocation: Vec<AssetWeight> = model
          .assets()
          .iter()
          .zip(solved.point.weights.iter())
          .map(|(asset, &weight)| AssetWeight {
            asset: asset.clone(),
            weight,
          })
          .collect();

        let material: Vec<&AssetWeight> = full_allocation
          .iter()
          .filter(|aw| aw.weight > materiality_threshold)
          .collect();
        let material_sum: f64 = material.iter().map(|aw| aw.weight).sum();
        let recommended_allocation = if material_sum > 0.0 {
          material
            .iter()
            .map(|aw| AssetWeight {
              asset: aw.asset.clone(),
              weight: round_to(aw.weight / material_sum, weight_precision),
            })
            .collect()
        } else {
          Vec::new()
        };

        ProfileOutcome::Allocated(ProfileAllocation {
          label: profile.label.clone(),
          risk_aversion: profile.risk_aversion,
          full_allocation,
          recommended_allocation,
          expected_return: solved.point.expected_return,
          volatility: solved.point.volatility,
          sharpe: solved.point.sharpe.unwrap_or(0.0),
          utility: solved.utility,
        })
      }
      Err(mut failure) => {
        warn!(label = %profile.label, %failure, "risk profile allocation failed");
        failure.context = FailureContext::RiskProfile {
          label: profile.label.clone(),
        };
        ProfileOutcome::Failed {
          label: profile.label.clone(),
          risk_aversion: profile.risk_aversion,
          failure,
        }
      }
    })
    .collect()
}

//! # frontier-rs
//!
//! $$
//! \min_{\mathbf{w}}\ \mathbf{w}^\top\Sigma\mathbf{w}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\ \mathbf{w}^\top\mu=r^\*
//! $$
//!
//! Mean-variance portfolio analysis: per-asset statistics, annualized risk
//! matrices, constrained Markowitz solves (GMVP, target-return minimum
//! variance, tangent and quadratic-utility portfolios), the minimum-variance
//! frontier under short-allowed and long-only regimes, and risk-profile
//! allocations.

pub mod analysis;
pub mod config;
pub mod error;
pub mod frontier;
pub mod metrics;
pub mod optimizer;
pub mod profiles;
pub mod returns;
pub mod risk;
pub mod types;

pub use analysis::AnalysisEngine;
pub use analysis::AnalysisReport;
pub use analysis::AssetReport;
pub use analysis::RegimeOutcome;
pub use analysis::RegimeReport;
pub use config::AnalysisConfig;
pub use config::FundCatalog;
pub use config::FundInfo;
pub use error::AnalysisError;
pub use error::AnalysisResult;
pub use error::FailureContext;
pub use error::OptimizationFailure;
pub use error::SolverStatus;
pub use frontier::Frontier;
pub use frontier::FrontierBuilder;
pub use frontier::FrontierPoint;
pub use frontier::FrontierPolicy;
pub use metrics::asset_metrics;
pub use metrics::AssetMetrics;
pub use optimizer::MeanVarianceModel;
pub use profiles::allocate_profiles;
pub use profiles::default_risk_profiles;
pub use profiles::AssetWeight;
pub use profiles::ProfileAllocation;
pub use profiles::ProfileOutcome;
pub use returns::simple_returns;
pub use returns::ReturnMatrix;
pub use risk::RiskModel;
pub use types::PortfolioPoint;
pub use types::Regime;
pub use types::RiskProfile;
pub use types::UtilityPortfolio;

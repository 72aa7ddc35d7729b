//! Swap simulation & risk-assessment pipeline

pub mod pipeline;
pub mod types;

pub use pipeline::{MarketSnapshot, SimulationPipeline};
pub use types::{
    ExecutionOptimization, ExecutionStrategy, GasAnalysis, GasStrategy,
    MarketConditionsAnalysis, ParameterRecommendations, PriceImpactAnalysis, RiskAssessment,
    RiskFactor, RiskReport, SlippageAnalysis, SplitRecommendation,
};

//! Slippage tolerance model

pub mod tolerance;

pub use tolerance::{
    compute_tolerance, compute_tolerance_at_hour, validate_tolerance, SlippageFactors,
    ToleranceConfig, ToleranceConfigUpdate, ToleranceResult, ToleranceValidation,
};

mod engine;
mod types;

pub use engine::{aggregate_deductions, compute, new_regime_tax, old_regime_tax};
pub use types::{
    AgeGroup, DeductionSummary, Deductions, Investments, Regime, TaxInput, TaxResult,
};

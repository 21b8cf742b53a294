pub mod aggregate;
pub mod engine;
pub mod factors;
pub mod rules;
pub mod types;
pub mod validation;

pub use aggregate::aggregate_issues;
pub use engine::{evaluate, score, FactorContribution, ScoreReport};
pub use factors::RangeOp;
pub use rules::*;
pub use types::*;
pub use validation::{validate_inputs, validate_rules, InvalidInput};

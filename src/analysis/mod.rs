//! Row classification and dashboard aggregation.

pub mod aggregator;
pub mod classifier;
pub mod verify;

pub use aggregator::*;
pub use classifier::{classify, Classification, ClassifiedTable, RuleSetting};
pub use verify::{verify_breakdowns, DEFAULT_TOLERANCE};

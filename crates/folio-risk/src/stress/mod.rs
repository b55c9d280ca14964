//! Stress testing.
//!
//! Scenarios are historical or hypothetical shocks applied to current
//! holdings. They are mutually exclusive, so the runner reports the worst
//! single scenario rather than a sum.

mod impact;
mod scenarios;

pub use impact::*;
pub use scenarios::*;

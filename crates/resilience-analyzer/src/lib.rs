//! Pattern detection, root-cause lookup, and blacklist pass-through over
//! recorded failures.

mod analyzer;
mod failure;
mod rootcause;

pub use analyzer::{FailureAnalyzer, FailureSummary};
pub use failure::{Failure, FailureAnalysis, FailurePattern, RootCause};

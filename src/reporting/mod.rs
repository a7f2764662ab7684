//! Run diagnostics: what was loaded, what each rule produced, and why
//! anything was skipped.

pub mod run_report;

pub use run_report::{
    DatasetReport, Reporter, RuleOutcome, RunReport, SkipReason, TierCounts, UnavailableKind,
};

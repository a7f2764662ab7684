//! Proximity join between category datasets

pub mod join;
pub mod spatial_index;
pub mod tier;

pub use join::{log_config_issues, TopologyJoin, TopologyOutcome};
pub use spatial_index::GridIndex;
pub use tier::{classify, classify_with_tier};

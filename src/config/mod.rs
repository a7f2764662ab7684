//! Run configuration: where datasets live, where the topology goes, and which
//! rule table and join strategy to use.

pub mod rules;

pub use rules::{
    builtin_specs, Category, ConfigIssue, RelationshipRule, RuleSpec, RuleTable, Severity,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How candidate pairs are enumerated for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStrategy {
    /// Compare every source entity with every target entity.
    #[default]
    Exhaustive,
    /// Bucket targets into a lat/lon grid and probe neighbouring cells only.
    Grid,
}

impl FromStr for JoinStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exhaustive" | "naive" => Ok(JoinStrategy::Exhaustive),
            "grid" => Ok(JoinStrategy::Grid),
            other => Err(format!("unknown join strategy '{}' (expected exhaustive or grid)", other)),
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::Exhaustive => f.write_str("exhaustive"),
            JoinStrategy::Grid => f.write_str("grid"),
        }
    }
}

/// Configuration for one topology run
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Directory holding one Turtle file per category
    pub data_dir: PathBuf,
    /// Where the generated relations are written
    pub output_file: PathBuf,
    /// File name prefix, e.g. `data_hanoi_` for `data_hanoi_school.ttl`
    pub file_prefix: String,
    pub strategy: JoinStrategy,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("datav2/cleaned"),
            output_file: PathBuf::from("datav2/data_hanoi_topology.ttl"),
            file_prefix: "data_hanoi_".to_string(),
            strategy: JoinStrategy::Exhaustive,
        }
    }
}

impl TopologyConfig {
    /// Lay out a run under `root`: datasets from `root/cleaned` when that
    /// directory exists, otherwise from `root`; output at
    /// `root/<prefix>topology.ttl`.
    pub fn from_data_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let cleaned = root.join("cleaned");
        let defaults = Self::default();
        Self {
            data_dir: if cleaned.is_dir() { cleaned } else { root.to_path_buf() },
            output_file: root.join(format!("{}topology.ttl", defaults.file_prefix)),
            ..defaults
        }
    }

    /// Candidate files for a category, most preferred first.
    pub fn dataset_candidates(&self, category: Category) -> [PathBuf; 2] {
        [
            self.data_dir.join(format!("{}{}_cleaned.ttl", self.file_prefix, category)),
            self.data_dir.join(format!("{}{}.ttl", self.file_prefix, category)),
        ]
    }
}

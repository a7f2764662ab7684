//! # POI Topology
//!
//! Links independently collected point-of-interest datasets into a semantic
//! proximity graph. For every configured pair of categories, entities within
//! a rule's maximum distance are connected by a predicate chosen from the
//! distance between them:
//!
//! - up to 50 m: `schema:containedInPlace`
//! - up to 200 m: `schema:isNextTo`
//! - beyond that, up to the rule's maximum: the rule's own predicate
//!
//! The run is a single-threaded batch: datasets are loaded once, the rule
//! table is walked, and the resulting relation set is written at the very end.
//!
//! ## Example
//!
//! ```rust
//! use poi_topology::config::{Category, RelationshipRule, RuleTable};
//! use poi_topology::storage::InMemorySource;
//! use poi_topology::topology::TopologyJoin;
//!
//! fn example() -> poi_topology::Result<()> {
//!     let rule = RelationshipRule::new(
//!         Category::BusStop,
//!         [Category::School],
//!         "schema:amenityFeature",
//!         500.0,
//!     )
//!     .expect("valid rule");
//!     let source = InMemorySource::new();
//!     let outcome = TopologyJoin::new(RuleTable::new(vec![rule]), source)?.run()?;
//!     println!("{}", outcome.report);
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::new_without_default)]

/// Core data structures and geodesy
pub mod core;

/// Namespaces and predicate resolution
pub mod vocab;

/// Run configuration and the relationship rule table
pub mod config;

/// Coordinate extraction from category datasets
pub mod parsing;

/// Dataset loading, caching, and topology serialization
pub mod storage;

/// Tier classification, spatial index, and the join orchestrator
pub mod topology;

/// Run diagnostics
pub mod reporting;

/// SPARQL inspection of generated topologies
pub mod querying;

pub mod error;

// Re-export commonly used types
pub use error::{DatasetError, Result, RuleTableError, TopologyError};

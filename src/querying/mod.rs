//! SPARQL access to generated topologies

pub mod topology_inspector;

pub use topology_inspector::{InspectionReport, TopologyInspector};

//! RDF vocabulary used by the topology: namespaces, well-known IRIs and the
//! closed prefix table for rule predicates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const SCHEMA_NS: &str = "http://schema.org/";
pub const EXT_NS: &str = "http://opendatafithou.org/def/extension/";
pub const WGS84_NS: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#";
pub const GEOSPARQL_NS: &str = "http://www.opengis.net/ont/geosparql#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const GEO_AS_WKT: &str = "http://www.opengis.net/ont/geosparql#asWKT";
pub const WGS84_LAT: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#lat";
pub const WGS84_LONG: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#long";
pub const GEO_LAT: &str = "http://www.opengis.net/ont/geosparql#lat";
pub const GEO_LONG: &str = "http://www.opengis.net/ont/geosparql#long";

/// Predicate emitted for the contained tier.
pub const CONTAINED_IN_PLACE: &str = "http://schema.org/containedInPlace";
/// Predicate emitted for the adjacent tier.
pub const IS_NEXT_TO: &str = "http://schema.org/isNextTo";

/// Namespaces a rule predicate may be written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Schema,
    Ext,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Schema, Namespace::Ext];

    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Schema => "schema",
            Namespace::Ext => "ext",
        }
    }

    pub fn base_iri(&self) -> &'static str {
        match self {
            Namespace::Schema => SCHEMA_NS,
            Namespace::Ext => EXT_NS,
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.prefix() == prefix)
    }
}

/// Why a configured predicate could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    #[error("predicate is empty")]
    Empty,

    #[error("unknown predicate prefix '{0}' (expected schema: or ext:)")]
    UnknownPrefix(String),

    #[error("predicate '{0}' has no local name")]
    MissingLocalName(String),
}

/// A rule predicate, resolved once when the rule table is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    written: String,
    iri: String,
}

impl Predicate {
    /// Resolve `schema:x` / `ext:x` through the prefix table. Absolute IRIs
    /// (`scheme://...`) pass through; anything else is rejected.
    pub fn parse(written: &str) -> Result<Self, PredicateError> {
        let written = written.trim();
        if written.is_empty() {
            return Err(PredicateError::Empty);
        }

        if written.contains("://") {
            return Ok(Self { written: written.to_string(), iri: written.to_string() });
        }

        let (prefix, local) = written
            .split_once(':')
            .ok_or_else(|| PredicateError::UnknownPrefix(written.to_string()))?;
        let ns = Namespace::from_prefix(prefix)
            .ok_or_else(|| PredicateError::UnknownPrefix(prefix.to_string()))?;
        if local.is_empty() {
            return Err(PredicateError::MissingLocalName(written.to_string()));
        }

        Ok(Self { written: written.to_string(), iri: format!("{}{}", ns.base_iri(), local) })
    }

    /// The predicate as configured, e.g. `schema:amenityFeature`.
    pub fn written(&self) -> &str {
        &self.written
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    /// True when the predicate is one of the two tier predicates.
    pub fn is_tier_predicate(&self) -> bool {
        self.iri == CONTAINED_IN_PLACE || self.iri == IS_NEXT_TO
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.written)
    }
}

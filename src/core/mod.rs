//! Core data structures shared by the extractor, join and writer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Upper bound (inclusive) of the contained tier, in meters.
pub const CONTAINED_MAX_M: f64 = 50.0;
/// Upper bound (inclusive) of the adjacent tier, in meters.
pub const ADJACENT_MAX_M: f64 = 200.0;

/// Opaque entity identifier (an IRI as it appears in the input dataset).
///
/// Identifiers produced by the ingestion pipeline look like
/// `urn:ngsi-ld:PointOfInterest:Hanoi:bus_stop:123456`; the accessors below
/// read that shape on a best-effort basis and return `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category segment of an NGSI-LD style URN (second to last `:` segment).
    /// `None` for anything that is not a `urn:` with at least three segments.
    pub fn category_segment(&self) -> Option<&str> {
        if !self.0.starts_with("urn:") {
            return None;
        }
        let mut segments = self.0.rsplit(':');
        let _local = segments.next()?;
        let category = segments.next().filter(|s| !s.is_empty())?;
        segments.next()?;
        Some(category)
    }

    /// Trailing numeric id of an NGSI-LD style URN.
    pub fn local_id(&self) -> Option<u64> {
        self.0.rsplit(':').next()?.parse().ok()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(iri: &str) -> Self {
        Self::new(iri)
    }
}

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Entity id to position, ordered so that every pass over it is deterministic.
pub type CoordinateMap = BTreeMap<EntityId, Coordinate>;

/// One directed edge of the proximity graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub source: EntityId,
    pub predicate: String,
    pub target: EntityId,
}

impl Relation {
    pub fn new(source: EntityId, predicate: impl Into<String>, target: EntityId) -> Self {
        Self { source, predicate: predicate.into(), target }
    }
}

/// Output of the join. Identical triples collapse.
pub type RelationSet = BTreeSet<Relation>;

/// Distance band that selects the output predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceTier {
    /// `d <= 50 m`
    Contained,
    /// `50 m < d <= 200 m`
    Adjacent,
    /// `d > 200 m`, bounded by the rule's own maximum
    RuleSpecific,
}

impl DistanceTier {
    pub fn from_distance(distance_m: f64) -> Self {
        if distance_m <= CONTAINED_MAX_M {
            DistanceTier::Contained
        } else if distance_m <= ADJACENT_MAX_M {
            DistanceTier::Adjacent
        } else {
            DistanceTier::RuleSpecific
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceTier::Contained => "containedInPlace",
            DistanceTier::Adjacent => "isNextTo",
            DistanceTier::RuleSpecific => "rule-specific",
        }
    }
}

impl fmt::Display for DistanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub mod geodesy;
pub use geodesy::*;

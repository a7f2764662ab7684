//! Distance tier classification.

use crate::core::DistanceTier;
use crate::vocab::{Predicate, CONTAINED_IN_PLACE, IS_NEXT_TO};

/// Predicate IRI for a pair `distance_m` apart under a rule with
/// `base_predicate`.
///
/// Up to the adjacent tier the tier predicate always wins, whatever the rule
/// configured. Callers only classify pairs already within the rule's maximum.
pub fn classify(distance_m: f64, base_predicate: &Predicate) -> &str {
    classify_with_tier(distance_m, base_predicate).1
}

pub fn classify_with_tier(distance_m: f64, base_predicate: &Predicate) -> (DistanceTier, &str) {
    let tier = DistanceTier::from_distance(distance_m);
    let iri = match tier {
        DistanceTier::Contained => CONTAINED_IN_PLACE,
        DistanceTier::Adjacent => IS_NEXT_TO,
        DistanceTier::RuleSpecific => base_predicate.iri(),
    };
    (tier, iri)
}

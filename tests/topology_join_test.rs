//! Join orchestrator integration tests
//!
//! These tests run the full join over in-memory Turtle datasets:
//! - tier classification and distance thresholds
//! - self-link suppression
//! - resilience to unavailable datasets
//! - idempotence and strategy equivalence

use poi_topology::config::{Category, JoinStrategy, RelationshipRule, RuleTable};
use poi_topology::core::{meters_to_lat_degrees, EntityId, Relation, RelationSet};
use poi_topology::reporting::UnavailableKind;
use poi_topology::storage::InMemorySource;
use poi_topology::topology::{TopologyJoin, TopologyOutcome};
use poi_topology::TopologyError;
use proptest::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const SCHEMA: &str = "http://schema.org/";
const EXT: &str = "http://opendatafithou.org/def/extension/";

const BUS_STOP_LAT: f64 = 21.0;
const BUS_STOP_LON: f64 = 105.8;

fn urn(category: Category, id: u64) -> String {
    format!("urn:ngsi-ld:PointOfInterest:Hanoi:{}:{}", category, id)
}

/// Turtle document with one WKT-located entity per `(id, lat, lon)`.
fn turtle(category: Category, points: &[(u64, f64, f64)]) -> String {
    let mut doc = String::from(
        "@prefix schema: <http://schema.org/> .\n\
         @prefix geo: <http://www.opengis.net/ont/geosparql#> .\n",
    );
    for (id, lat, lon) in points {
        doc.push_str(&format!(
            "<{}> a schema:Place ;\n    geo:asWKT \"POINT({} {})\"^^geo:wktLiteral .\n",
            urn(category, *id),
            lon,
            lat
        ));
    }
    doc
}

/// Latitude `meters` north of the reference bus stop.
fn north_of_bus_stop(meters: f64) -> f64 {
    BUS_STOP_LAT + meters_to_lat_degrees(meters)
}

fn rule(source: Category, targets: &[Category], predicate: &str, max: f64) -> RelationshipRule {
    RelationshipRule::new(source, targets.iter().copied(), predicate, max).unwrap()
}

fn run(rules: Vec<RelationshipRule>, source: InMemorySource) -> TopologyOutcome {
    TopologyJoin::new(RuleTable::new(rules), source).unwrap().run().unwrap()
}

fn relation(source: String, predicate: String, target: String) -> Relation {
    Relation::new(EntityId::new(source), predicate, EntityId::new(target))
}

fn bus_and_schools() -> InMemorySource {
    InMemorySource::new()
        .with_turtle(Category::BusStop, turtle(Category::BusStop, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
        .with_turtle(
            Category::School,
            turtle(
                Category::School,
                &[
                    (30, north_of_bus_stop(30.0), BUS_STOP_LON),
                    (150, north_of_bus_stop(150.0), BUS_STOP_LON),
                    (450, north_of_bus_stop(450.0), BUS_STOP_LON),
                    (900, north_of_bus_stop(900.0), BUS_STOP_LON),
                ],
            ),
        )
}

#[test]
fn test_bus_stop_to_schools_end_to_end() {
    let outcome = run(
        vec![rule(Category::BusStop, &[Category::School], "schema:amenityFeature", 500.0)],
        bus_and_schools(),
    );

    let bus = urn(Category::BusStop, 1);
    let expected: RelationSet = [
        relation(bus.clone(), format!("{SCHEMA}containedInPlace"), urn(Category::School, 30)),
        relation(bus.clone(), format!("{SCHEMA}isNextTo"), urn(Category::School, 150)),
        relation(bus, format!("{SCHEMA}amenityFeature"), urn(Category::School, 450)),
    ]
    .into_iter()
    .collect();

    assert_eq!(outcome.relations, expected);
    let linked: Vec<_> = outcome.relations.iter().filter_map(|r| r.target.local_id()).collect();
    assert_eq!(linked.len(), 3);
    assert!(!linked.contains(&900));
    assert_eq!(outcome.report.tiers.contained, 1);
    assert_eq!(outcome.report.tiers.adjacent, 1);
    assert_eq!(outcome.report.tiers.rule_specific, 1);
    assert_eq!(outcome.report.rule(0).unwrap().relations_emitted, 3);
}

#[test]
fn test_pair_beyond_max_distance_is_not_linked() {
    let source = InMemorySource::new()
        .with_turtle(Category::Bank, turtle(Category::Bank, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
        .with_turtle(
            Category::Atm,
            turtle(Category::Atm, &[(1, north_of_bus_stop(150.0), BUS_STOP_LON)]),
        );
    let outcome = run(vec![rule(Category::Bank, &[Category::Atm], "schema:financialService", 100.0)], source);

    assert!(outcome.relations.is_empty());
    assert_eq!(outcome.report.total_emitted, 0);
}

#[test]
fn test_contained_tier_overrides_rule_predicate() {
    let source = InMemorySource::new()
        .with_turtle(Category::Supermarket, turtle(Category::Supermarket, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
        .with_turtle(
            Category::Bank,
            turtle(
                Category::Bank,
                &[(30, north_of_bus_stop(30.0), BUS_STOP_LON), (150, north_of_bus_stop(150.0), BUS_STOP_LON)],
            ),
        );
    let outcome = run(
        vec![rule(Category::Supermarket, &[Category::Bank], "ext:shoppingDistrict", 250.0)],
        source,
    );

    let predicates: Vec<_> = outcome.relations.iter().map(|r| r.predicate.as_str()).collect();
    assert_eq!(predicates.len(), 2);
    assert!(predicates.contains(&"http://schema.org/containedInPlace"));
    assert!(predicates.contains(&"http://schema.org/isNextTo"));
    assert!(!predicates.iter().any(|p| p.starts_with(EXT)));
}

#[test]
fn test_rule_specific_tier_uses_resolved_predicate() {
    let source = InMemorySource::new()
        .with_turtle(Category::BusStop, turtle(Category::BusStop, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
        .with_turtle(
            Category::Hospital,
            turtle(Category::Hospital, &[(300, north_of_bus_stop(300.0), BUS_STOP_LON)]),
        );
    let outcome = run(
        vec![rule(Category::BusStop, &[Category::Hospital], "schema:amenityFeature", 500.0)],
        source,
    );

    let only = outcome.relations.iter().next().unwrap();
    assert_eq!(only.predicate, "http://schema.org/amenityFeature");
}

#[test]
fn test_no_self_links_within_one_category() {
    let parks = turtle(
        Category::Park,
        &[(1, BUS_STOP_LAT, BUS_STOP_LON), (2, north_of_bus_stop(10.0), BUS_STOP_LON)],
    );
    let source = InMemorySource::new().with_turtle(Category::Park, parks);
    let outcome = run(vec![rule(Category::Park, &[Category::Park], "ext:parkFacility", 200.0)], source);

    assert_eq!(outcome.relations.len(), 2);
    assert!(outcome.relations.iter().all(|r| r.source != r.target));
}

#[test]
fn test_no_self_links_for_entity_listed_in_two_categories() {
    // the same IRI appears in both datasets
    let shared = urn(Category::Cafe, 7);
    let doc = format!(
        "@prefix schema: <http://schema.org/> .\n\
         @prefix geo: <http://www.opengis.net/ont/geosparql#> .\n\
         <{}> a schema:Place ; geo:asWKT \"POINT({} {})\"^^geo:wktLiteral .\n",
        shared, BUS_STOP_LON, BUS_STOP_LAT
    );
    let source = InMemorySource::new()
        .with_turtle(Category::Cafe, doc.clone())
        .with_turtle(Category::Restaurant, doc);
    let outcome = run(vec![rule(Category::Cafe, &[Category::Restaurant], "ext:commercialCluster", 200.0)], source);

    assert!(outcome.relations.is_empty());
}

#[test]
fn test_overlapping_rules_keep_distinct_predicates() {
    let source = InMemorySource::new()
        .with_turtle(Category::Police, turtle(Category::Police, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
        .with_turtle(
            Category::Hospital,
            turtle(Category::Hospital, &[(1, north_of_bus_stop(250.0), BUS_STOP_LON)]),
        );
    let outcome = run(
        vec![
            rule(Category::Police, &[Category::Hospital], "ext:emergencyService", 300.0),
            rule(Category::Police, &[Category::Hospital], "ext:publicService", 300.0),
            rule(Category::Police, &[Category::Hospital], "ext:emergencyService", 300.0),
        ],
        source,
    );

    assert_eq!(outcome.report.total_emitted, 3);
    assert_eq!(outcome.relations.len(), 2);
    assert_eq!(outcome.report.unique_relations, 2);
}

#[test]
fn test_missing_pharmacy_only_affects_its_rules() {
    let source = bus_and_schools()
        .with_turtle(Category::Pharmacy, "@prefix broken <")
        .with_turtle(Category::Hospital, turtle(Category::Hospital, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
        .with_turtle(Category::Bank, turtle(Category::Bank, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]));
    let outcome = run(
        vec![
            rule(Category::Pharmacy, &[Category::Hospital], "schema:isNextTo", 100.0),
            rule(Category::BusStop, &[Category::School], "schema:amenityFeature", 500.0),
            rule(Category::Supermarket, &[Category::Pharmacy], "ext:shoppingDistrict", 250.0),
            rule(Category::Hospital, &[Category::Pharmacy, Category::Bank], "ext:healthcareNetwork", 200.0),
        ],
        source,
    );
    let report = &outcome.report;

    let pharmacy_rule = report.rule(0).unwrap();
    assert_eq!(pharmacy_rule.relations_emitted, 0);
    assert_eq!(pharmacy_rule.source_skipped.as_ref().unwrap().kind, UnavailableKind::ParseFailure);

    assert_eq!(report.rule(1).unwrap().relations_emitted, 3);

    let supermarket_rule = report.rule(2).unwrap();
    assert_eq!(supermarket_rule.source_skipped.as_ref().unwrap().kind, UnavailableKind::Missing);

    let hospital_rule = report.rule(3).unwrap();
    assert!(hospital_rule.source_skipped.is_none());
    assert_eq!(hospital_rule.targets_joined, vec![Category::Bank]);
    assert_eq!(hospital_rule.targets_skipped[0].category, Category::Pharmacy);
    assert_eq!(hospital_rule.relations_emitted, 1);

    assert!(outcome.relations.iter().all(|r| r.source.category_segment() != Some("pharmacy")));
    assert_eq!(report.unavailable_datasets().count(), 2);
    assert!(!report.dataset(Category::Pharmacy).unwrap().is_available());
    assert_eq!(report.dataset(Category::School).unwrap().stats.as_ref().unwrap().with_coordinates, 4);
    assert_eq!(report.skipped_rules().count(), 2);
}

#[test]
fn test_join_is_idempotent() {
    let rules = || {
        vec![
            rule(Category::BusStop, &[Category::School], "schema:amenityFeature", 500.0),
            rule(Category::School, &[Category::BusStop], "ext:educationSupport", 300.0),
        ]
    };
    let first = run(rules(), bus_and_schools());
    let second = run(rules(), bus_and_schools());

    assert_eq!(first.relations, second.relations);
    assert_eq!(first.report.tiers, second.report.tiers);
}

#[test]
fn test_interrupt_stops_the_run() {
    let flag = Arc::new(AtomicBool::new(true));
    let result = TopologyJoin::new(
        RuleTable::new(vec![rule(Category::BusStop, &[Category::School], "schema:amenityFeature", 500.0)]),
        bus_and_schools(),
    )
    .unwrap()
    .with_interrupt(flag)
    .run();

    assert!(matches!(result, Err(TopologyError::Interrupted)));
}

#[test]
fn test_builtin_table_runs_with_partial_inputs() {
    let (table, issues) = RuleTable::builtin();
    let outcome = TopologyJoin::new(table, bus_and_schools())
        .unwrap()
        .with_config_issues(issues)
        .run()
        .unwrap();

    // bus_stop -> school and school -> bus_stop are the only rules with both sides present
    assert_eq!(outcome.report.rule(0).unwrap().relations_emitted, 3);
    assert_eq!(outcome.report.datasets.iter().filter(|d| d.is_available()).count(), 2);
    assert!(!outcome.report.config_issues.is_empty());
}

#[test]
fn test_grid_with_vanishing_distance_matches_exhaustive() {
    let make = || {
        InMemorySource::new()
            .with_turtle(Category::Atm, turtle(Category::Atm, &[(1, BUS_STOP_LAT, BUS_STOP_LON)]))
            .with_turtle(
                Category::Bank,
                turtle(Category::Bank, &[(1, BUS_STOP_LAT, BUS_STOP_LON), (2, north_of_bus_stop(5.0), BUS_STOP_LON)]),
            )
    };
    let run_with = |strategy| {
        TopologyJoin::new(
            RuleTable::new(vec![rule(Category::Atm, &[Category::Bank], "ext:financialAccess", 1e-15)]),
            make(),
        )
        .unwrap()
        .with_strategy(strategy)
        .run()
        .unwrap()
    };

    let exhaustive = run_with(JoinStrategy::Exhaustive);
    let grid = run_with(JoinStrategy::Grid);

    assert_eq!(exhaustive.relations.len(), 1);
    assert_eq!(exhaustive.relations, grid.relations);
}

fn scattered(category: Category, offsets: &[(f64, f64)]) -> String {
    let points: Vec<_> = offsets
        .iter()
        .enumerate()
        .map(|(i, (dlat, dlon))| (i as u64, BUS_STOP_LAT + dlat, BUS_STOP_LON + dlon))
        .collect();
    turtle(category, &points)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_grid_matches_exhaustive(
        sources in prop::collection::vec((-0.01..0.01f64, -0.01..0.01f64), 1..25),
        targets in prop::collection::vec((-0.01..0.01f64, -0.01..0.01f64), 1..25),
        max in 20.0..800.0f64,
    ) {
        let make = || {
            InMemorySource::new()
                .with_turtle(Category::Library, scattered(Category::Library, &sources))
                .with_turtle(Category::School, scattered(Category::School, &targets))
        };
        let rules = || {
            vec![
                rule(Category::Library, &[Category::School], "ext:educationHub", max),
                rule(Category::Library, &[Category::Library], "ext:educationHub", max),
            ]
        };

        let exhaustive = TopologyJoin::new(RuleTable::new(rules()), make())
            .unwrap()
            .with_strategy(JoinStrategy::Exhaustive)
            .run()
            .unwrap();
        let grid = TopologyJoin::new(RuleTable::new(rules()), make())
            .unwrap()
            .with_strategy(JoinStrategy::Grid)
            .run()
            .unwrap();

        prop_assert_eq!(&exhaustive.relations, &grid.relations);
        prop_assert_eq!(exhaustive.report.tiers, grid.report.tiers);
    }
}

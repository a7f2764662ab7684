//! Relationship rule table: which categories link to which, under what
//! predicate, up to what distance.

use crate::core::ADJACENT_MAX_M;
use crate::error::RuleTableError;
use crate::vocab::Predicate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// POI categories produced by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Atm,
    Bank,
    PostOffice,
    BusStop,
    Parking,
    FuelStation,
    ChargingStation,
    Hospital,
    Clinic,
    Pharmacy,
    Police,
    FireStation,
    DrinkingWater,
    PublicToilet,
    WasteBasket,
    School,
    Kindergarten,
    University,
    Library,
    Park,
    Playground,
    CommunityCentre,
    Marketplace,
    Supermarket,
    ConvenienceStore,
    Cafe,
    Restaurant,
    Warehouse,
}

impl Category {
    pub const ALL: [Category; 28] = [
        Category::Atm,
        Category::Bank,
        Category::PostOffice,
        Category::BusStop,
        Category::Parking,
        Category::FuelStation,
        Category::ChargingStation,
        Category::Hospital,
        Category::Clinic,
        Category::Pharmacy,
        Category::Police,
        Category::FireStation,
        Category::DrinkingWater,
        Category::PublicToilet,
        Category::WasteBasket,
        Category::School,
        Category::Kindergarten,
        Category::University,
        Category::Library,
        Category::Park,
        Category::Playground,
        Category::CommunityCentre,
        Category::Marketplace,
        Category::Supermarket,
        Category::ConvenienceStore,
        Category::Cafe,
        Category::Restaurant,
        Category::Warehouse,
    ];

    /// Name used in dataset file names and entity URNs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Atm => "atm",
            Category::Bank => "bank",
            Category::PostOffice => "post_office",
            Category::BusStop => "bus_stop",
            Category::Parking => "parking",
            Category::FuelStation => "fuel_station",
            Category::ChargingStation => "charging_station",
            Category::Hospital => "hospital",
            Category::Clinic => "clinic",
            Category::Pharmacy => "pharmacy",
            Category::Police => "police",
            Category::FireStation => "fire_station",
            Category::DrinkingWater => "drinking_water",
            Category::PublicToilet => "public_toilet",
            Category::WasteBasket => "waste_basket",
            Category::School => "school",
            Category::Kindergarten => "kindergarten",
            Category::University => "university",
            Category::Library => "library",
            Category::Park => "park",
            Category::Playground => "playground",
            Category::CommunityCentre => "community_centre",
            Category::Marketplace => "marketplace",
            Category::Supermarket => "supermarket",
            Category::ConvenienceStore => "convenience_store",
            Category::Cafe => "cafe",
            Category::Restaurant => "restaurant",
            Category::Warehouse => "warehouse",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category '{}'", wanted))
    }
}

/// A rule as written in a rule document, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub source: String,
    pub targets: Vec<String>,
    pub predicate: String,
    #[serde(alias = "max_distance_m")]
    pub max_dist: f64,
}

/// A validated relationship rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRule {
    pub source: Category,
    /// Ordered, without duplicates.
    pub targets: Vec<Category>,
    pub base_predicate: Predicate,
    pub max_distance_m: f64,
}

impl RelationshipRule {
    /// Programmatic constructor; returns the first problem found.
    pub fn new(
        source: Category,
        targets: impl IntoIterator<Item = Category>,
        predicate: &str,
        max_distance_m: f64,
    ) -> Result<Self, ConfigIssue> {
        let spec = RuleSpec {
            source: source.as_str().to_string(),
            targets: targets.into_iter().map(|c| c.as_str().to_string()).collect(),
            predicate: predicate.to_string(),
            max_dist: max_distance_m,
        };
        let mut issues = Vec::new();
        match validate(0, &spec, &mut issues) {
            Some(rule) => Ok(rule),
            None => Err(issues.into_iter().find(|i| i.severity() == Severity::Error).unwrap_or(
                ConfigIssue::EmptyTargets { rule: 0, source: source.as_str().to_string() },
            )),
        }
    }

    /// The configured predicate can only appear on pairs farther than the
    /// adjacent tier; below that the tier predicates always win.
    pub fn base_predicate_reachable(&self) -> bool {
        self.max_distance_m > ADJACENT_MAX_M
    }
}

/// Whether an issue cost the run part of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rule or target dropped
    Error,
    /// Rule kept as configured
    Warning,
}

/// Problem found while building the rule table. `rule` is the rule's
/// zero-based position in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigIssue {
    UnknownSourceCategory { rule: usize, name: String },
    UnknownTargetCategory { rule: usize, source: String, name: String },
    InvalidPredicate { rule: usize, source: String, message: String },
    InvalidMaxDistance { rule: usize, source: String, value: f64 },
    EmptyTargets { rule: usize, source: String },
    /// Base predicate is itself a tier predicate; it only documents the rule.
    TierNamedBasePredicate { rule: usize, source: String, predicate: String },
    /// `max_dist` never exceeds the adjacent tier, so the base predicate is never emitted.
    UnreachableBasePredicate { rule: usize, source: String, predicate: String, max_distance_m: f64 },
}

impl ConfigIssue {
    pub fn severity(&self) -> Severity {
        match self {
            ConfigIssue::TierNamedBasePredicate { .. }
            | ConfigIssue::UnreachableBasePredicate { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::UnknownSourceCategory { rule, name } => {
                write!(f, "rule #{}: unknown source category '{}', rule dropped", rule, name)
            }
            ConfigIssue::UnknownTargetCategory { rule, source, name } => {
                write!(f, "rule #{} ({}): unknown target category '{}', target dropped", rule, source, name)
            }
            ConfigIssue::InvalidPredicate { rule, source, message } => {
                write!(f, "rule #{} ({}): {}, rule dropped", rule, source, message)
            }
            ConfigIssue::InvalidMaxDistance { rule, source, value } => {
                write!(f, "rule #{} ({}): max distance {} must be a positive number, rule dropped", rule, source, value)
            }
            ConfigIssue::EmptyTargets { rule, source } => {
                write!(f, "rule #{} ({}): no usable target categories, rule dropped", rule, source)
            }
            ConfigIssue::TierNamedBasePredicate { rule, source, predicate } => {
                write!(f, "rule #{} ({}): base predicate {} is a tier predicate and is decided by distance", rule, source, predicate)
            }
            ConfigIssue::UnreachableBasePredicate { rule, source, predicate, max_distance_m } => {
                write!(
                    f,
                    "rule #{} ({}): base predicate {} never surfaces with max distance {}m (tier override up to {}m)",
                    rule, source, predicate, max_distance_m, ADJACENT_MAX_M
                )
            }
        }
    }
}

fn validate(index: usize, spec: &RuleSpec, issues: &mut Vec<ConfigIssue>) -> Option<RelationshipRule> {
    let source = match spec.source.parse::<Category>() {
        Ok(c) => c,
        Err(_) => {
            issues.push(ConfigIssue::UnknownSourceCategory { rule: index, name: spec.source.clone() });
            return None;
        }
    };
    let source_name = source.as_str().to_string();

    let base_predicate = match Predicate::parse(&spec.predicate) {
        Ok(p) => p,
        Err(e) => {
            issues.push(ConfigIssue::InvalidPredicate {
                rule: index,
                source: source_name,
                message: e.to_string(),
            });
            return None;
        }
    };

    if !spec.max_dist.is_finite() || spec.max_dist <= 0.0 {
        issues.push(ConfigIssue::InvalidMaxDistance {
            rule: index,
            source: source_name,
            value: spec.max_dist,
        });
        return None;
    }

    let mut targets = Vec::with_capacity(spec.targets.len());
    for name in &spec.targets {
        match name.parse::<Category>() {
            Ok(c) if !targets.contains(&c) => targets.push(c),
            Ok(_) => {}
            Err(_) => issues.push(ConfigIssue::UnknownTargetCategory {
                rule: index,
                source: source_name.clone(),
                name: name.clone(),
            }),
        }
    }
    if targets.is_empty() {
        issues.push(ConfigIssue::EmptyTargets { rule: index, source: source_name });
        return None;
    }

    let rule = RelationshipRule { source, targets, base_predicate, max_distance_m: spec.max_dist };

    if rule.base_predicate.is_tier_predicate() {
        issues.push(ConfigIssue::TierNamedBasePredicate {
            rule: index,
            source: source_name,
            predicate: rule.base_predicate.written().to_string(),
        });
    } else if !rule.base_predicate_reachable() {
        issues.push(ConfigIssue::UnreachableBasePredicate {
            rule: index,
            source: source_name,
            predicate: rule.base_predicate.written().to_string(),
            max_distance_m: rule.max_distance_m,
        });
    }

    Some(rule)
}

/// Ordered, immutable list of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<RelationshipRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<RelationshipRule>) -> Self {
        Self { rules }
    }

    /// Validate rule specs; bad rules or targets are dropped and reported.
    pub fn from_specs(specs: &[RuleSpec]) -> (Self, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let rules = specs
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| validate(i, spec, &mut issues))
            .collect();
        (Self { rules }, issues)
    }

    pub fn from_json_str(json: &str) -> Result<(Self, Vec<ConfigIssue>), RuleTableError> {
        let specs: Vec<RuleSpec> = serde_json::from_str(json)?;
        Ok(Self::from_specs(&specs))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<(Self, Vec<ConfigIssue>), RuleTableError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuleTableError::Read { path: path.to_path_buf(), source: e })?;
        Self::from_json_str(&content)
    }

    /// The link matrix the Hanoi datasets were built around.
    pub fn builtin() -> (Self, Vec<ConfigIssue>) {
        Self::from_specs(&builtin_specs())
    }

    pub fn rules(&self) -> &[RelationshipRule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RelationshipRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every category named as a source or target, sorted.
    pub fn referenced_categories(&self) -> BTreeSet<Category> {
        self.rules
            .iter()
            .flat_map(|r| std::iter::once(r.source).chain(r.targets.iter().copied()))
            .collect()
    }
}

fn spec(source: &str, targets: &[&str], predicate: &str, max_dist: f64) -> RuleSpec {
    RuleSpec {
        source: source.to_string(),
        targets: targets.iter().map(|t| t.to_string()).collect(),
        predicate: predicate.to_string(),
        max_dist,
    }
}

/// Rule specs of the built-in table, in evaluation order.
pub fn builtin_specs() -> Vec<RuleSpec> {
    vec![
        // transport
        spec(
            "bus_stop",
            &[
                "school",
                "university",
                "hospital",
                "marketplace",
                "supermarket",
                "community_centre",
                "park",
                "clinic",
                "library",
                "post_office",
            ],
            "schema:amenityFeature",
            500.0,
        ),
        spec(
            "parking",
            &[
                "park",
                "marketplace",
                "supermarket",
                "hospital",
                "clinic",
                "restaurant",
                "cafe",
                "library",
                "community_centre",
            ],
            "schema:publicAccess",
            300.0,
        ),
        // health
        spec("pharmacy", &["hospital", "clinic"], "schema:isNextTo", 100.0),
        spec("clinic", &["pharmacy", "hospital"], "ext:healthcareNetwork", 200.0),
        // education
        spec("school", &["playground", "library", "bus_stop", "park"], "ext:educationSupport", 300.0),
        spec("kindergarten", &["playground", "park"], "ext:childFriendly", 200.0),
        spec("university", &["library", "cafe", "restaurant", "bus_stop"], "ext:campusAmenity", 500.0),
        // commercial
        spec("cafe", &["restaurant", "convenience_store", "supermarket"], "ext:commercialCluster", 200.0),
        spec("restaurant", &["cafe", "marketplace", "supermarket"], "ext:diningArea", 200.0),
        spec("supermarket", &["pharmacy", "bank", "atm"], "ext:shoppingDistrict", 250.0),
        // financial
        spec("bank", &["atm", "post_office"], "schema:financialService", 100.0),
        spec("atm", &["bank", "supermarket", "marketplace", "fuel_station"], "ext:financialAccess", 150.0),
        // public services
        spec("police", &["fire_station", "hospital", "post_office"], "ext:emergencyService", 300.0),
        spec("fire_station", &["police", "hospital"], "ext:emergencyService", 300.0),
        spec("post_office", &["bank", "community_centre"], "ext:publicService", 200.0),
        // infrastructure
        spec(
            "charging_station",
            &["parking", "fuel_station", "supermarket", "marketplace"],
            "schema:containedInPlace",
            50.0,
        ),
        spec("fuel_station", &["charging_station", "convenience_store"], "ext:vehicleService", 100.0),
        spec("waste_basket", &["bus_stop", "park", "playground", "public_toilet"], "ext:locatedNear", 30.0),
        spec("drinking_water", &["park", "playground", "school", "kindergarten"], "ext:locatedNear", 50.0),
        spec("public_toilet", &["park", "marketplace", "bus_stop", "restaurant"], "ext:publicFacility", 100.0),
        // recreation and community
        spec(
            "park",
            &["playground", "drinking_water", "public_toilet", "waste_basket"],
            "ext:parkFacility",
            200.0,
        ),
        spec("playground", &["park", "school", "kindergarten"], "ext:recreationArea", 150.0),
        spec("library", &["school", "university", "community_centre"], "ext:educationHub", 400.0),
        spec("community_centre", &["library", "park", "post_office"], "ext:communityHub", 300.0),
    ]
}

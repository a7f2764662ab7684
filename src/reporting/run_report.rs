//! Run report collected alongside the join.
//!
//! Purely observational: nothing here feeds back into which relations are
//! emitted.

use crate::config::{Category, ConfigIssue, JoinStrategy, RelationshipRule, Severity};
use crate::core::{DistanceTier, RelationSet};
use crate::error::DatasetError;
use crate::parsing::ExtractionStats;
use crate::storage::CacheEntry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Emissions per distance tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub contained: usize,
    pub adjacent: usize,
    pub rule_specific: usize,
}

impl TierCounts {
    pub fn record(&mut self, tier: DistanceTier) {
        match tier {
            DistanceTier::Contained => self.contained += 1,
            DistanceTier::Adjacent => self.adjacent += 1,
            DistanceTier::RuleSpecific => self.rule_specific += 1,
        }
    }

    pub fn get(&self, tier: DistanceTier) -> usize {
        match tier {
            DistanceTier::Contained => self.contained,
            DistanceTier::Adjacent => self.adjacent,
            DistanceTier::RuleSpecific => self.rule_specific,
        }
    }

    pub fn total(&self) -> usize {
        self.contained + self.adjacent + self.rule_specific
    }

    /// Share of all emissions in `tier`, in percent.
    pub fn share(&self, tier: DistanceTier) -> f64 {
        let total = self.total();
        if total > 0 {
            (self.get(tier) as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableKind {
    Missing,
    ReadFailure,
    ParseFailure,
}

/// Why a rule's source or one of its targets took no part in the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipReason {
    pub category: Category,
    pub kind: UnavailableKind,
    pub detail: String,
}

impl SkipReason {
    pub fn from_dataset_error(category: Category, err: &DatasetError) -> Self {
        let kind = match err {
            DatasetError::NotFound { .. } => UnavailableKind::Missing,
            DatasetError::Read { .. } => UnavailableKind::ReadFailure,
            DatasetError::Parse { .. } => UnavailableKind::ParseFailure,
        };
        Self { category, kind, detail: err.to_string() }
    }
}

/// What one category contributed to the run.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub category: Category,
    pub origin: Option<String>,
    pub stats: Option<ExtractionStats>,
    pub error: Option<String>,
}

impl DatasetReport {
    pub fn is_available(&self) -> bool {
        self.stats.is_some()
    }
}

/// What one rule produced.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub index: usize,
    pub source: Category,
    pub base_predicate: String,
    pub max_distance_m: f64,
    pub relations_emitted: usize,
    pub targets_joined: Vec<Category>,
    /// Set when the source itself was unavailable; the rule did nothing.
    pub source_skipped: Option<SkipReason>,
    pub targets_skipped: Vec<SkipReason>,
}

impl RuleOutcome {
    pub fn new(index: usize, rule: &RelationshipRule) -> Self {
        Self {
            index,
            source: rule.source,
            base_predicate: rule.base_predicate.written().to_string(),
            max_distance_m: rule.max_distance_m,
            relations_emitted: 0,
            targets_joined: Vec::new(),
            source_skipped: None,
            targets_skipped: Vec::new(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.source_skipped.is_some()
    }
}

/// Accumulates observations while the orchestrator runs.
#[derive(Debug, Default)]
pub struct Reporter {
    tiers: TierCounts,
    datasets: Vec<DatasetReport>,
    rules: Vec<RuleOutcome>,
    config_issues: Vec<ConfigIssue>,
}

impl Reporter {
    pub fn new(config_issues: Vec<ConfigIssue>) -> Self {
        Self { config_issues, ..Default::default() }
    }

    pub fn record_emission(&mut self, tier: DistanceTier) {
        self.tiers.record(tier);
    }

    pub fn record_dataset(&mut self, category: Category, entry: &CacheEntry) {
        let report = match entry {
            CacheEntry::Ready(loaded) => DatasetReport {
                category,
                origin: Some(loaded.origin.to_string()),
                stats: Some(loaded.stats.clone()),
                error: None,
            },
            CacheEntry::Unavailable(err) => DatasetReport {
                category,
                origin: None,
                stats: None,
                error: Some(err.to_string()),
            },
        };
        self.datasets.push(report);
    }

    pub fn record_rule(&mut self, outcome: RuleOutcome) {
        self.rules.push(outcome);
    }

    /// Close the report over the final relation set.
    pub fn finish(
        self,
        relations: &RelationSet,
        strategy: JoinStrategy,
        elapsed_seconds: f64,
    ) -> RunReport {
        let mut per_predicate = BTreeMap::new();
        for relation in relations {
            *per_predicate.entry(relation.predicate.clone()).or_insert(0) += 1;
        }

        RunReport {
            strategy,
            total_emitted: self.tiers.total(),
            unique_relations: relations.len(),
            tiers: self.tiers,
            per_predicate,
            datasets: self.datasets,
            rules: self.rules,
            config_issues: self.config_issues,
            elapsed_seconds,
        }
    }
}

/// Final diagnostics of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub strategy: JoinStrategy,
    /// Qualifying pairs, counting the same triple once per rule that produced it
    pub total_emitted: usize,
    /// Size of the relation set after duplicates collapsed
    pub unique_relations: usize,
    pub tiers: TierCounts,
    pub per_predicate: BTreeMap<String, usize>,
    pub datasets: Vec<DatasetReport>,
    pub rules: Vec<RuleOutcome>,
    pub config_issues: Vec<ConfigIssue>,
    pub elapsed_seconds: f64,
}

impl RunReport {
    pub fn rule(&self, index: usize) -> Option<&RuleOutcome> {
        self.rules.iter().find(|r| r.index == index)
    }

    pub fn dataset(&self, category: Category) -> Option<&DatasetReport> {
        self.datasets.iter().find(|d| d.category == category)
    }

    pub fn skipped_rules(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rules.iter().filter(|r| r.is_skipped())
    }

    pub fn unavailable_datasets(&self) -> impl Iterator<Item = &DatasetReport> {
        self.datasets.iter().filter(|d| !d.is_available())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(72);
        writeln!(f, "{}", rule)?;
        writeln!(f, "TOPOLOGY GENERATION REPORT")?;
        writeln!(f, "{}", rule)?;

        writeln!(f, "Datasets:")?;
        for d in &self.datasets {
            match (&d.stats, &d.error) {
                (Some(stats), _) => writeln!(
                    f,
                    "  ✓ {:<18} {:>6} entities, {:>6} with coordinates ({:.1}%)",
                    d.category.as_str(),
                    stats.entities,
                    stats.with_coordinates,
                    stats.success_rate()
                )?,
                (None, error) => writeln!(
                    f,
                    "  ✗ {:<18} unavailable: {}",
                    d.category.as_str(),
                    error.as_deref().unwrap_or("unknown")
                )?,
            }
        }

        writeln!(f, "\nRelations emitted: {} ({} unique)", self.total_emitted, self.unique_relations)?;
        if self.total_emitted > 0 {
            writeln!(f, "Distance tier breakdown:")?;
            for (tier, label) in [
                (DistanceTier::Contained, "<= 50m (containedInPlace)"),
                (DistanceTier::Adjacent, "50-200m (isNextTo)"),
                (DistanceTier::RuleSpecific, "> 200m (rule-specific)"),
            ] {
                writeln!(
                    f,
                    "  • {:<26} {:>8} ({:.1}%)",
                    label,
                    self.tiers.get(tier),
                    self.tiers.share(tier)
                )?;
            }
            writeln!(f, "Predicates:")?;
            for (predicate, count) in &self.per_predicate {
                writeln!(f, "  • {:<56} {:>8}", predicate, count)?;
            }
        } else {
            writeln!(f, "No relationships were generated. Check that input files carry")?;
            writeln!(f, "coordinates and that entities lie within the configured distances.")?;
        }

        let skipped: Vec<_> = self.skipped_rules().collect();
        let partial: Vec<_> =
            self.rules.iter().filter(|r| !r.is_skipped() && !r.targets_skipped.is_empty()).collect();
        if !skipped.is_empty() || !partial.is_empty() {
            writeln!(f, "\nSkipped:")?;
            for r in skipped {
                writeln!(f, "  rule #{} ({}): source unavailable", r.index, r.source)?;
            }
            for r in partial {
                let names: Vec<_> = r.targets_skipped.iter().map(|s| s.category.as_str()).collect();
                writeln!(f, "  rule #{} ({}): targets unavailable: {}", r.index, r.source, names.join(", "))?;
            }
        }

        let errors = self.config_issues.iter().filter(|i| i.severity() == Severity::Error).count();
        if errors > 0 {
            writeln!(f, "\nConfiguration errors: {}", errors)?;
            for issue in self.config_issues.iter().filter(|i| i.severity() == Severity::Error) {
                writeln!(f, "  {}", issue)?;
            }
        }

        writeln!(f, "\nStrategy: {}, elapsed {:.2}s", self.strategy, self.elapsed_seconds)?;
        write!(f, "{}", rule)
    }
}

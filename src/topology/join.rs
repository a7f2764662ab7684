//! Join orchestrator: walks the rule table and links every qualifying
//! source/target pair.
//!
//! The relation set is owned here for the whole run and handed to the
//! reporter, by reference, only once the join is complete.

use crate::config::{ConfigIssue, JoinStrategy, RelationshipRule, RuleTable, Severity};
use crate::core::{CoordinateMap, Relation, RelationSet};
use crate::error::{Result, TopologyError};
use crate::reporting::{Reporter, RuleOutcome, RunReport, SkipReason};
use crate::storage::{CacheEntry, DatasetCache, DatasetSource};
use crate::topology::spatial_index::GridIndex;
use crate::topology::tier::classify_with_tier;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a completed run.
#[derive(Debug)]
pub struct TopologyOutcome {
    pub relations: RelationSet,
    pub report: RunReport,
}

pub struct TopologyJoin<S: DatasetSource> {
    rules: RuleTable,
    cache: DatasetCache<S>,
    strategy: JoinStrategy,
    config_issues: Vec<ConfigIssue>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<S: DatasetSource> TopologyJoin<S> {
    pub fn new(rules: RuleTable, source: S) -> Result<Self> {
        Ok(Self {
            rules,
            cache: DatasetCache::new(source)?,
            strategy: JoinStrategy::default(),
            config_issues: Vec::new(),
            interrupt: None,
        })
    }

    pub fn with_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Issues found while building the rule table, carried into the report.
    pub fn with_config_issues(mut self, issues: Vec<ConfigIssue>) -> Self {
        self.config_issues = issues;
        self
    }

    /// Flag polled during the run; once set, the run stops with
    /// [`TopologyError::Interrupted`].
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn check_interrupt(&self) -> Result<()> {
        match &self.interrupt {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(TopologyError::Interrupted),
            _ => Ok(()),
        }
    }

    pub fn run(mut self) -> Result<TopologyOutcome> {
        let started = Instant::now();
        let mut reporter = Reporter::new(std::mem::take(&mut self.config_issues));

        let categories = self.rules.referenced_categories();
        info!(rules = self.rules.len(), categories = categories.len(), "loading datasets");
        for category in categories {
            self.check_interrupt()?;
            let entry = self.cache.load(category);
            reporter.record_dataset(category, entry);
        }

        let mut relations = RelationSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            self.check_interrupt()?;
            let outcome = self.run_rule(index, rule, &mut relations, &mut reporter)?;
            reporter.record_rule(outcome);
        }

        let report = reporter.finish(&relations, self.strategy, started.elapsed().as_secs_f64());
        info!(
            emitted = report.total_emitted,
            unique = report.unique_relations,
            "topology join complete"
        );
        Ok(TopologyOutcome { relations, report })
    }

    fn run_rule(
        &self,
        index: usize,
        rule: &RelationshipRule,
        relations: &mut RelationSet,
        reporter: &mut Reporter,
    ) -> Result<RuleOutcome> {
        let mut outcome = RuleOutcome::new(index, rule);

        let sources = match self.cache.get(rule.source) {
            Some(CacheEntry::Ready(loaded)) => &loaded.coordinates,
            Some(CacheEntry::Unavailable(err)) => {
                warn!(rule = index, source = %rule.source, "source dataset unavailable, rule skipped");
                outcome.source_skipped = Some(SkipReason::from_dataset_error(rule.source, err));
                return Ok(outcome);
            }
            None => return Ok(outcome),
        };

        for &target in &rule.targets {
            let targets = match self.cache.get(target) {
                Some(CacheEntry::Ready(loaded)) => &loaded.coordinates,
                Some(CacheEntry::Unavailable(err)) => {
                    debug!(rule = index, target = %target, "target dataset unavailable, skipped");
                    outcome.targets_skipped.push(SkipReason::from_dataset_error(target, err));
                    continue;
                }
                None => continue,
            };

            let emitted = self.join_pair(rule, sources, targets, relations, reporter)?;
            debug!(rule = index, source = %rule.source, target = %target, emitted, "pair joined");
            outcome.relations_emitted += emitted;
            outcome.targets_joined.push(target);
        }

        info!(
            rule = index,
            source = %rule.source,
            predicate = %rule.base_predicate,
            emitted = outcome.relations_emitted,
            "rule processed"
        );
        Ok(outcome)
    }

    fn join_pair(
        &self,
        rule: &RelationshipRule,
        sources: &CoordinateMap,
        targets: &CoordinateMap,
        relations: &mut RelationSet,
        reporter: &mut Reporter,
    ) -> Result<usize> {
        let index = match self.strategy {
            JoinStrategy::Exhaustive => None,
            JoinStrategy::Grid => {
                let built = GridIndex::build(targets, sources, rule.max_distance_m);
                if built.is_none() {
                    debug!(source = %rule.source, "grid unusable for this data, comparing exhaustively");
                }
                built
            }
        };

        let mut emitted = 0;
        for (source_id, source_coord) in sources {
            self.check_interrupt()?;

            let candidates: Box<dyn Iterator<Item = _>> = match &index {
                Some(grid) => Box::new(grid.candidates(source_coord)),
                None => Box::new(targets.iter()),
            };

            for (target_id, target_coord) in candidates {
                if source_id == target_id {
                    continue;
                }
                let distance_m = source_coord.distance_to(target_coord);
                if distance_m <= rule.max_distance_m {
                    let (tier, predicate) = classify_with_tier(distance_m, &rule.base_predicate);
                    relations.insert(Relation::new(source_id.clone(), predicate, target_id.clone()));
                    reporter.record_emission(tier);
                    emitted += 1;
                }
            }
        }
        Ok(emitted)
    }
}

/// Log configuration issues the way the run treats them: dropped parts as
/// warnings, documentation-only predicates at debug level.
pub fn log_config_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        match issue.severity() {
            Severity::Error => warn!("{}", issue),
            Severity::Warning => debug!("{}", issue),
        }
    }
}

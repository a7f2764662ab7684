//! Read-back inspection of a generated topology over an in-memory Oxigraph
//! store.
//!
//! # Example
//!
//! ```ignore
//! use poi_topology::querying::TopologyInspector;
//!
//! let inspector = TopologyInspector::open("datav2/data_hanoi_topology.ttl".as_ref())?;
//! let report = inspector.inspect(5)?;
//! println!("{}", report);
//! ```

use crate::core::EntityId;
use crate::error::{Result, TopologyError};
use crate::storage::format_for_path;
use crate::vocab::{CONTAINED_IN_PLACE, IS_NEXT_TO};
use oxigraph::io::RdfParser;
use oxigraph::model::Term;
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

const PREDICATE_DISTRIBUTION: &str = r"
    SELECT ?p (COUNT(*) AS ?n)
    WHERE { ?s ?p ?o }
    GROUP BY ?p
    ORDER BY DESC(?n) ?p
";

const PARTICIPATION: &str = r"
    SELECT
      (COUNT(DISTINCT ?s) AS ?subjects)
      (COUNT(DISTINCT ?o) AS ?objects)
    WHERE { ?s ?p ?o }
";

const ALL_ENTITIES: &str = r"
    SELECT (COUNT(DISTINCT ?e) AS ?n)
    WHERE { { ?e ?p ?o } UNION { ?s ?p ?e } }
";

const MOST_CONNECTED: &str = r"
    SELECT ?e (COUNT(*) AS ?n)
    WHERE { { ?e ?p ?o } UNION { ?s ?p ?e } }
    GROUP BY ?e
    ORDER BY DESC(?n) STR(?e)
";

/// Summary of a topology file.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub triples: usize,
    /// Predicate IRI to triple count, most frequent first
    pub predicates: Vec<(String, usize)>,
    pub source_entities: usize,
    pub target_entities: usize,
    pub entities: usize,
    /// For each tier predicate, the most frequent source → target category pairs
    pub top_category_pairs: BTreeMap<String, Vec<(String, String, usize)>>,
    /// Entities with the most relations, either side counted
    pub most_connected: Vec<(String, usize)>,
}

impl InspectionReport {
    pub fn count_for(&self, predicate: &str) -> usize {
        self.predicates.iter().find(|(p, _)| p == predicate).map_or(0, |(_, n)| *n)
    }
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['/', '#']).next().unwrap_or(iri)
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total triples: {}", self.triples)?;
        writeln!(f, "\nPredicate distribution:")?;
        for (predicate, count) in &self.predicates {
            writeln!(f, "  • {}: {}", local_name(predicate), count)?;
        }
        writeln!(f, "\nUnique entities involved: {}", self.entities)?;
        writeln!(f, "  • As sources: {}", self.source_entities)?;
        write!(f, "  • As targets: {}", self.target_entities)?;
        for (predicate, pairs) in &self.top_category_pairs {
            if pairs.is_empty() {
                continue;
            }
            writeln!(f, "\n\nTop pairs for {}:", local_name(predicate))?;
            for (i, (source, target, count)) in pairs.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "  • {} → {}: {}", source, target, count)?;
            }
        }
        if !self.most_connected.is_empty() {
            write!(f, "\n\nMost connected entities:")?;
            for (entity, count) in &self.most_connected {
                write!(f, "\n  • {}: {} connections", entity, count)?;
            }
        }
        Ok(())
    }
}

pub struct TopologyInspector {
    store: Store,
}

impl TopologyInspector {
    /// Load a topology file (format from its extension) into a fresh store.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| TopologyError::io(path, e))?;
        let store = Store::new()?;
        for quad in RdfParser::from_format(format_for_path(path)).for_reader(BufReader::new(file)) {
            store.insert(&quad?)?;
        }
        debug!(path = %path.display(), triples = store.len()?, "topology loaded for inspection");
        Ok(Self { store })
    }

    /// Execute a SELECT query and return one map of variable bindings per
    /// solution. Non-SELECT queries yield no rows.
    pub fn execute_query_bindings(&self, query: &str) -> Result<Vec<HashMap<String, Term>>> {
        let evaluator = SparqlEvaluator::new();
        let parsed_query =
            evaluator.parse_query(query).map_err(|e| TopologyError::Query(e.to_string()))?;
        let results = parsed_query.on_store(&self.store).execute()?;

        let mut bindings_list = Vec::new();
        if let QueryResults::Solutions(solutions) = results {
            for solution in solutions {
                let solution = solution?;
                let mut binding = HashMap::new();
                for (var, term) in solution.iter() {
                    binding.insert(var.as_str().to_string(), term.clone());
                }
                bindings_list.push(binding);
            }
        }
        Ok(bindings_list)
    }

    pub fn triple_count(&self) -> Result<usize> {
        Ok(self.store.len()?)
    }

    pub fn predicate_distribution(&self) -> Result<Vec<(String, usize)>> {
        self.execute_query_bindings(PREDICATE_DISTRIBUTION)?
            .iter()
            .map(|row| Ok((iri_of(row, "p")?, count_of(row, "n")?)))
            .collect()
    }

    /// Distinct entities used as subject, as object, and overall.
    pub fn participation(&self) -> Result<(usize, usize, usize)> {
        let rows = self.execute_query_bindings(PARTICIPATION)?;
        let row = rows.first().ok_or_else(|| TopologyError::Query("empty aggregate".to_string()))?;
        let all = self.execute_query_bindings(ALL_ENTITIES)?;
        let all_row =
            all.first().ok_or_else(|| TopologyError::Query("empty aggregate".to_string()))?;
        Ok((count_of(row, "subjects")?, count_of(row, "objects")?, count_of(all_row, "n")?))
    }

    /// Most frequent (source category, target category) pairs linked by
    /// `predicate`. Entities whose id carries no category segment are grouped
    /// under `?`.
    pub fn category_pairs(&self, predicate: &str, limit: usize) -> Result<Vec<(String, String, usize)>> {
        let query = format!("SELECT ?s ?o WHERE {{ ?s <{}> ?o }}", predicate);
        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        for row in self.execute_query_bindings(&query)? {
            let category = |var: &str| -> Result<String> {
                let id = EntityId::new(iri_of(&row, var)?);
                Ok(id.category_segment().unwrap_or("?").to_string())
            };
            *counts.entry((category("s")?, category("o")?)).or_insert(0) += 1;
        }

        let mut pairs: Vec<_> = counts.into_iter().map(|((s, o), n)| (s, o, n)).collect();
        pairs.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| (&a.0, &a.1).cmp(&(&b.0, &b.1))));
        pairs.truncate(limit);
        Ok(pairs)
    }

    /// Entities ranked by the number of relations they take part in.
    pub fn most_connected(&self, limit: usize) -> Result<Vec<(String, usize)>> {
        let mut ranked = self
            .execute_query_bindings(MOST_CONNECTED)?
            .iter()
            .map(|row| Ok((iri_of(row, "e")?, count_of(row, "n")?)))
            .collect::<Result<Vec<_>>>()?;
        ranked.truncate(limit);
        Ok(ranked)
    }

    pub fn inspect(&self, top_pairs: usize) -> Result<InspectionReport> {
        let (source_entities, target_entities, entities) = self.participation()?;
        let mut top_category_pairs = BTreeMap::new();
        for predicate in [CONTAINED_IN_PLACE, IS_NEXT_TO] {
            top_category_pairs.insert(predicate.to_string(), self.category_pairs(predicate, top_pairs)?);
        }
        Ok(InspectionReport {
            triples: self.triple_count()?,
            predicates: self.predicate_distribution()?,
            source_entities,
            target_entities,
            entities,
            top_category_pairs,
            most_connected: self.most_connected(top_pairs)?,
        })
    }
}

fn iri_of(row: &HashMap<String, Term>, var: &str) -> Result<String> {
    match row.get(var) {
        Some(Term::NamedNode(node)) => Ok(node.as_str().to_string()),
        other => Err(TopologyError::Query(format!("expected IRI for ?{}, got {:?}", var, other))),
    }
}

fn count_of(row: &HashMap<String, Term>, var: &str) -> Result<usize> {
    match row.get(var) {
        Some(Term::Literal(literal)) => literal
            .value()
            .parse()
            .map_err(|_| TopologyError::Query(format!("non-numeric count for ?{}", var))),
        other => Err(TopologyError::Query(format!("expected count for ?{}, got {:?}", var, other))),
    }
}

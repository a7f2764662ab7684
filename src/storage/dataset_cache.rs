//! Category dataset loading and the per-run coordinate cache.
//!
//! A category is loaded at most once per run. What the cache keeps is the
//! coordinate map and its extraction statistics; the parsed quads are dropped
//! as soon as coordinates have been pulled out of them.

use crate::config::{Category, TopologyConfig};
use crate::core::CoordinateMap;
use crate::error::DatasetError;
use crate::parsing::{CoordinateExtractor, ExtractionStats};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Quad;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where a dataset was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOrigin {
    Cleaned(PathBuf),
    Raw(PathBuf),
    Memory,
}

impl fmt::Display for DatasetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetOrigin::Cleaned(path) => write!(f, "cleaned ({})", path.display()),
            DatasetOrigin::Raw(path) => write!(f, "raw ({})", path.display()),
            DatasetOrigin::Memory => write!(f, "in-memory"),
        }
    }
}

/// Parsed statements of one category.
pub struct Dataset {
    pub origin: DatasetOrigin,
    pub quads: Vec<Quad>,
}

/// Anything that can hand over the dataset backing a category.
pub trait DatasetSource {
    fn load(&self, category: Category) -> Result<Dataset, DatasetError>;
}

fn parse_turtle(reader: impl Read, label: &str) -> Result<Vec<Quad>, DatasetError> {
    RdfParser::from_format(RdfFormat::Turtle)
        .for_reader(reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DatasetError::Parse { path: label.to_string(), message: e.to_string() })
}

/// Turtle files in a directory, `<prefix><category>_cleaned.ttl` preferred
/// over `<prefix><category>.ttl`.
pub struct TurtleDirectory {
    config: TopologyConfig,
}

impl TurtleDirectory {
    pub fn new(config: TopologyConfig) -> Self {
        Self { config }
    }
}

impl DatasetSource for TurtleDirectory {
    fn load(&self, category: Category) -> Result<Dataset, DatasetError> {
        let [cleaned, raw] = self.config.dataset_candidates(category);

        let (path, origin) = if cleaned.is_file() {
            (cleaned.clone(), DatasetOrigin::Cleaned(cleaned))
        } else if raw.is_file() {
            (raw.clone(), DatasetOrigin::Raw(raw))
        } else {
            return Err(DatasetError::NotFound {
                tried: vec![cleaned.display().to_string(), raw.display().to_string()],
            });
        };

        let label = path.display().to_string();
        let file = File::open(&path)
            .map_err(|e| DatasetError::Read { path: label.clone(), message: e.to_string() })?;

        debug!(category = %category, path = %label, "parsing dataset");
        let quads = parse_turtle(BufReader::new(file), &label)?;
        Ok(Dataset { origin, quads })
    }
}

/// Turtle documents held in memory, keyed by category.
#[derive(Default)]
pub struct InMemorySource {
    documents: HashMap<Category, String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turtle(mut self, category: Category, turtle: impl Into<String>) -> Self {
        self.documents.insert(category, turtle.into());
        self
    }
}

impl DatasetSource for InMemorySource {
    fn load(&self, category: Category) -> Result<Dataset, DatasetError> {
        let turtle = self.documents.get(&category).ok_or_else(|| DatasetError::NotFound {
            tried: vec![format!("<memory:{}>", category)],
        })?;
        let quads = parse_turtle(turtle.as_bytes(), &format!("<memory:{}>", category))?;
        Ok(Dataset { origin: DatasetOrigin::Memory, quads })
    }
}

/// A category that loaded and went through coordinate extraction.
#[derive(Debug)]
pub struct LoadedDataset {
    pub origin: DatasetOrigin,
    pub coordinates: CoordinateMap,
    pub stats: ExtractionStats,
}

/// Outcome of loading one category, kept for the rest of the run.
#[derive(Debug)]
pub enum CacheEntry {
    Ready(LoadedDataset),
    Unavailable(DatasetError),
}

impl CacheEntry {
    pub fn coordinates(&self) -> Option<&CoordinateMap> {
        match self {
            CacheEntry::Ready(loaded) => Some(&loaded.coordinates),
            CacheEntry::Unavailable(_) => None,
        }
    }
}

pub struct DatasetCache<S: DatasetSource> {
    source: S,
    extractor: CoordinateExtractor,
    entries: BTreeMap<Category, CacheEntry>,
}

impl<S: DatasetSource> DatasetCache<S> {
    pub fn new(source: S) -> Result<Self, regex::Error> {
        Ok(Self { source, extractor: CoordinateExtractor::new()?, entries: BTreeMap::new() })
    }

    /// Load `category` unless it was already attempted in this run.
    /// Failures are logged and remembered, never returned.
    pub fn load(&mut self, category: Category) -> &CacheEntry {
        let source = &self.source;
        let extractor = &self.extractor;
        self.entries.entry(category).or_insert_with(|| match source.load(category) {
            Ok(dataset) => {
                let extraction = extractor.extract(dataset.quads);
                let stats = extraction.stats;
                info!(
                    category = %category,
                    origin = %dataset.origin,
                    entities = stats.entities,
                    with_coordinates = stats.with_coordinates,
                    "dataset loaded"
                );
                if stats.without_coordinates() > 0 {
                    warn!(
                        category = %category,
                        missing = stats.without_coordinates(),
                        malformed_wkt = stats.malformed_wkt,
                        "entities without usable coordinates excluded from the join"
                    );
                }
                CacheEntry::Ready(LoadedDataset {
                    origin: dataset.origin,
                    coordinates: extraction.coordinates,
                    stats,
                })
            }
            Err(err) => {
                warn!(category = %category, error = %err, "dataset unavailable");
                CacheEntry::Unavailable(err)
            }
        })
    }

    pub fn get(&self, category: Category) -> Option<&CacheEntry> {
        self.entries.get(&category)
    }

    /// Coordinate map of a category that has loaded successfully.
    pub fn coordinates(&self, category: Category) -> Option<&CoordinateMap> {
        self.entries.get(&category).and_then(CacheEntry::coordinates)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Category, &CacheEntry)> {
        self.entries.iter()
    }
}

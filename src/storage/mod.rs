//! Dataset input and topology output

pub mod dataset_cache;
pub mod topology_writer;

pub use dataset_cache::{
    CacheEntry, Dataset, DatasetCache, DatasetOrigin, DatasetSource, InMemorySource,
    LoadedDataset, TurtleDirectory,
};
pub use topology_writer::{format_for_path, read_topology, write_topology};

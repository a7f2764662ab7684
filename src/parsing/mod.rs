//! Reading coordinates out of category datasets

pub mod coordinate_extractor;

pub use coordinate_extractor::{
    CoordinateExtractor, CoordinateSource, Extraction, ExtractionStats,
};

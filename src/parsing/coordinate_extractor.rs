//! Coordinate extraction with a fallback chain of encodings.
//!
//! Only subjects carrying an `rdf:type` statement count as entities. For each,
//! the first encoding that yields a valid position wins:
//! 1. `geo:asWKT` literal of the form `POINT(<lon> <lat>)`
//! 2. `wgs84_pos:lat` + `wgs84_pos:long`
//! 3. `geosparql:lat` + `geosparql:long`
//!
//! Entities without a usable position are left out of the returned map and
//! show up only in [`ExtractionStats`].

use crate::core::{Coordinate, CoordinateMap, EntityId};
use crate::vocab::{GEO_AS_WKT, GEO_LAT, GEO_LONG, RDF_TYPE, WGS84_LAT, WGS84_LONG};
use oxigraph::model::{Quad, Term};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Which encoding a coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSource {
    Wkt,
    Wgs84,
    Geo,
}

/// Counters describing one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Subjects with an `rdf:type`
    pub entities: usize,
    /// Entities that ended up in the coordinate map
    pub with_coordinates: usize,
    pub from_wkt: usize,
    pub from_wgs84: usize,
    pub from_geo: usize,
    /// WKT literals present but not a parsable point
    pub malformed_wkt: usize,
}

impl ExtractionStats {
    pub fn without_coordinates(&self) -> usize {
        self.entities - self.with_coordinates
    }

    /// Share of entities with coordinates, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.entities > 0 {
            (self.with_coordinates as f64 / self.entities as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
pub struct Extraction {
    pub coordinates: CoordinateMap,
    pub stats: ExtractionStats,
}

#[derive(Default)]
struct EntityProperties {
    typed: bool,
    wkt: Vec<String>,
    wgs84_lat: Option<f64>,
    wgs84_long: Option<f64>,
    geo_lat: Option<f64>,
    geo_long: Option<f64>,
}

pub struct CoordinateExtractor {
    wkt_point_regex: Regex,
}

impl CoordinateExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";
        Ok(CoordinateExtractor {
            wkt_point_regex: Regex::new(&format!(r"POINT\(\s*({NUMBER})\s+({NUMBER})\s*\)"))?,
        })
    }

    /// Parse `POINT(lon lat)`. Anything else, including out-of-range values,
    /// yields `None`.
    pub fn parse_wkt_point(&self, wkt: &str) -> Option<Coordinate> {
        let captures = self.wkt_point_regex.captures(wkt)?;
        let lon = captures.get(1)?.as_str().parse::<f64>().ok()?;
        let lat = captures.get(2)?.as_str().parse::<f64>().ok()?;
        Coordinate::new(lat, lon)
    }

    pub fn extract<I>(&self, quads: I) -> Extraction
    where
        I: IntoIterator<Item = Quad>,
    {
        let mut entities: BTreeMap<EntityId, EntityProperties> = BTreeMap::new();

        for quad in quads {
            let Term::NamedNode(subject) = Term::from(quad.subject) else {
                continue;
            };
            let predicate = quad.predicate.as_str();
            let slot = match predicate {
                RDF_TYPE | GEO_AS_WKT | WGS84_LAT | WGS84_LONG | GEO_LAT | GEO_LONG => {
                    entities.entry(EntityId::new(subject.into_string())).or_default()
                }
                _ => continue,
            };

            if predicate == RDF_TYPE {
                slot.typed = true;
                continue;
            }

            let Term::Literal(literal) = &quad.object else {
                continue;
            };
            let value = literal.value();
            match predicate {
                GEO_AS_WKT => slot.wkt.push(value.to_string()),
                WGS84_LAT => set_first_number(&mut slot.wgs84_lat, value),
                WGS84_LONG => set_first_number(&mut slot.wgs84_long, value),
                GEO_LAT => set_first_number(&mut slot.geo_lat, value),
                GEO_LONG => set_first_number(&mut slot.geo_long, value),
                _ => {}
            }
        }

        let mut stats = ExtractionStats::default();
        let mut coordinates = CoordinateMap::new();

        for (id, props) in entities.into_iter().filter(|(_, p)| p.typed) {
            stats.entities += 1;
            if let Some((coordinate, source)) = self.resolve(&props, &mut stats) {
                match source {
                    CoordinateSource::Wkt => stats.from_wkt += 1,
                    CoordinateSource::Wgs84 => stats.from_wgs84 += 1,
                    CoordinateSource::Geo => stats.from_geo += 1,
                }
                stats.with_coordinates += 1;
                coordinates.insert(id, coordinate);
            }
        }

        Extraction { coordinates, stats }
    }

    fn resolve(
        &self,
        props: &EntityProperties,
        stats: &mut ExtractionStats,
    ) -> Option<(Coordinate, CoordinateSource)> {
        if !props.wkt.is_empty() {
            match props.wkt.iter().find_map(|wkt| self.parse_wkt_point(wkt)) {
                Some(c) => return Some((c, CoordinateSource::Wkt)),
                None => stats.malformed_wkt += 1,
            }
        }

        let pairs = [
            (props.wgs84_lat, props.wgs84_long, CoordinateSource::Wgs84),
            (props.geo_lat, props.geo_long, CoordinateSource::Geo),
        ];
        pairs.into_iter().find_map(|(lat, lon, source)| {
            Coordinate::new(lat?, lon?).map(|c| (c, source))
        })
    }
}

fn set_first_number(slot: &mut Option<f64>, raw: &str) {
    if slot.is_none() {
        *slot = raw.trim().parse::<f64>().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wkt_point() {
        let extractor = CoordinateExtractor::new().unwrap();
        let c = extractor.parse_wkt_point("POINT(105.8342 21.0278)").unwrap();
        assert_eq!(c.lon, 105.8342);
        assert_eq!(c.lat, 21.0278);

        let c = extractor.parse_wkt_point("POINT(  -0.5   51.5 )").unwrap();
        assert_eq!((c.lon, c.lat), (-0.5, 51.5));
    }

    #[test]
    fn test_wkt_with_crs_prefix() {
        let extractor = CoordinateExtractor::new().unwrap();
        let wkt = "<http://www.opengis.net/def/crs/OGC/1.3/CRS84> POINT(105.8 21.0)";
        assert!(extractor.parse_wkt_point(wkt).is_some());
    }

    #[test]
    fn test_malformed_wkt_is_none() {
        let extractor = CoordinateExtractor::new().unwrap();
        assert!(extractor.parse_wkt_point("POINT(105.8)").is_none());
        assert!(extractor.parse_wkt_point("POINT(abc def)").is_none());
        assert!(extractor.parse_wkt_point("LINESTRING(1 2, 3 4)").is_none());
        assert!(extractor.parse_wkt_point("POINT(200 21)").is_none());
    }

    #[test]
    fn test_success_rate_of_empty_dataset() {
        assert_eq!(ExtractionStats::default().success_rate(), 0.0);
    }
}

//! Uniform lat/lon grid used to prune candidate pairs before the distance
//! call.
//!
//! Cells are sized so that any two points within `max_distance_m` of each
//! other fall in the same or adjacent cells. For latitude the span of a
//! great-circle arc bounds the latitude difference directly. For longitude,
//! from the haversine identity,
//! `sin(Δλ/2) <= sin(d / 2R) / cos(φ_max)`, where `φ_max` is the largest
//! absolute latitude either point can have.
//!
//! Building returns `None` when that bound degenerates (close to the poles),
//! when the probe window would wrap around the antimeridian, or when cells
//! are so small that their indices leave the `i64` range; callers then fall
//! back to the exhaustive comparison.

use crate::core::{meters_to_lat_degrees, Coordinate, CoordinateMap, EntityId, EARTH_RADIUS_M};
use std::collections::HashMap;

/// Slack on cell sizes so float rounding at the exact threshold can never
/// push a qualifying pair two cells apart.
const CELL_SLACK: f64 = 1.01;
const MAX_USABLE_LAT: f64 = 89.0;
/// Largest cell index magnitude; neighbour offsets must stay within `i64`.
const MAX_CELL_INDEX: f64 = 1e15;

type Cell = (i64, i64);

pub struct GridIndex<'a> {
    cell_lat_deg: f64,
    cell_lon_deg: f64,
    cells: HashMap<Cell, Vec<(&'a EntityId, &'a Coordinate)>>,
}

impl<'a> GridIndex<'a> {
    /// Index `targets` for probes from `sources` within `max_distance_m`.
    pub fn build(
        targets: &'a CoordinateMap,
        sources: &CoordinateMap,
        max_distance_m: f64,
    ) -> Option<Self> {
        let all = || targets.values().chain(sources.values());
        let max_abs_lat = all().map(|c| c.lat.abs()).fold(0.0_f64, f64::max);
        let max_abs_lon = all().map(|c| c.lon.abs()).fold(0.0_f64, f64::max);

        let cell_lat_deg = meters_to_lat_degrees(max_distance_m) * CELL_SLACK;
        let lat_bound = max_abs_lat + cell_lat_deg;
        if lat_bound >= MAX_USABLE_LAT {
            return None;
        }

        let ratio = (max_distance_m / (2.0 * EARTH_RADIUS_M)).sin() / lat_bound.to_radians().cos();
        if ratio >= 1.0 {
            return None;
        }
        let cell_lon_deg = (2.0 * ratio.asin()).to_degrees() * CELL_SLACK;
        if max_abs_lon + 2.0 * cell_lon_deg >= 180.0 {
            return None;
        }
        if !(cell_lat_deg > 0.0 && cell_lon_deg > 0.0)
            || max_abs_lat / cell_lat_deg > MAX_CELL_INDEX
            || max_abs_lon / cell_lon_deg > MAX_CELL_INDEX
        {
            return None;
        }

        let mut index = Self { cell_lat_deg, cell_lon_deg, cells: HashMap::new() };
        for (id, coordinate) in targets {
            let cell = index.cell_of(coordinate);
            index.cells.entry(cell).or_default().push((id, coordinate));
        }
        Some(index)
    }

    fn cell_of(&self, c: &Coordinate) -> Cell {
        ((c.lat / self.cell_lat_deg).floor() as i64, (c.lon / self.cell_lon_deg).floor() as i64)
    }

    /// Targets in the probe's cell and its eight neighbours.
    pub fn candidates<'s>(
        &'s self,
        probe: &Coordinate,
    ) -> impl Iterator<Item = (&'a EntityId, &'a Coordinate)> + 's {
        let (row, col) = self.cell_of(probe);
        (-1..=1)
            .flat_map(move |dr| (-1..=1).map(move |dc| (row + dr, col + dc)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flat_map(|bucket| bucket.iter().copied())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(points: &[(&str, f64, f64)]) -> CoordinateMap {
        points
            .iter()
            .map(|(id, lat, lon)| (EntityId::new(*id), Coordinate { lat: *lat, lon: *lon }))
            .collect()
    }

    #[test]
    fn test_near_target_is_a_candidate() {
        let targets = map(&[("urn:t:1", 21.0010, 105.8000), ("urn:t:2", 21.5, 105.8)]);
        let sources = map(&[("urn:s:1", 21.0, 105.8)]);
        let index = GridIndex::build(&targets, &sources, 200.0).unwrap();

        let ids: Vec<_> =
            index.candidates(&sources[&EntityId::new("urn:s:1")]).map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["urn:t:1"]);
    }

    #[test]
    fn test_cells_cover_the_data() {
        let targets = map(&[("urn:t:1", 21.0, 105.8), ("urn:t:2", 21.0, 105.8), ("urn:t:3", 21.2, 105.9)]);
        let sources = map(&[("urn:s:1", 21.0, 105.8)]);
        let index = GridIndex::build(&targets, &sources, 200.0).unwrap();
        assert_eq!(index.cell_count(), 2);
    }

    #[test]
    fn test_vanishing_distance_falls_back() {
        let targets = map(&[("urn:t:1", 21.0, 105.8)]);
        let sources = map(&[("urn:s:1", 21.0, 105.8)]);
        assert!(GridIndex::build(&targets, &sources, 1e-15).is_none());
        assert!(GridIndex::build(&targets, &sources, 1e-3).is_some());
    }

    #[test]
    fn test_polar_data_falls_back() {
        let targets = map(&[("urn:t:1", 89.5, 0.0)]);
        let sources = map(&[("urn:s:1", 89.4, 0.0)]);
        assert!(GridIndex::build(&targets, &sources, 500.0).is_none());
    }

    #[test]
    fn test_antimeridian_data_falls_back() {
        let targets = map(&[("urn:t:1", 0.0, 179.9999)]);
        let sources = map(&[("urn:s:1", 0.0, -179.9999)]);
        assert!(GridIndex::build(&targets, &sources, 500.0).is_none());
    }
}

//! Distance engine properties

use poi_topology::core::{haversine, meters_to_lat_degrees, Coordinate};
use proptest::prelude::*;

fn lat() -> impl Strategy<Value = f64> {
    -89.0..89.0f64
}

fn lon() -> impl Strategy<Value = f64> {
    -179.0..179.0f64
}

proptest! {
    #[test]
    fn prop_symmetric(lat1 in lat(), lon1 in lon(), lat2 in lat(), lon2 in lon()) {
        let ab = haversine(lat1, lon1, lat2, lon2);
        let ba = haversine(lat2, lon2, lat1, lon1);
        prop_assert!((ab - ba).abs() < 1e-9, "{} vs {}", ab, ba);
    }

    #[test]
    fn prop_identity_is_zero(lat1 in lat(), lon1 in lon()) {
        prop_assert!(haversine(lat1, lon1, lat1, lon1).abs() < 1e-6);
    }

    #[test]
    fn prop_non_negative_and_bounded(lat1 in lat(), lon1 in lon(), lat2 in lat(), lon2 in lon()) {
        let d = haversine(lat1, lon1, lat2, lon2);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * 6_371_000.0 + 1e-6);
    }

    #[test]
    fn prop_meridian_offset_matches_requested_distance(lat1 in -60.0..60.0f64, lon1 in lon(), d in 1.0..2000.0f64) {
        let lat2 = lat1 + meters_to_lat_degrees(d);
        prop_assert!((haversine(lat1, lon1, lat2, lon1) - d).abs() < 1e-3);
    }
}

#[test]
fn test_one_minute_of_latitude_is_a_nautical_mile() {
    let d = haversine(21.0, 105.8, 21.0 + 1.0 / 60.0, 105.8);
    assert!((d - 1852.0).abs() <= 1852.0 * 0.01, "got {}", d);
}

#[test]
fn test_coordinate_distance_matches_free_function() {
    let a = Coordinate::new(21.0285, 105.8542).unwrap();
    let b = Coordinate::new(21.0362, 105.8345).unwrap();
    assert_eq!(a.distance_to(&b), haversine(a.lat, a.lon, b.lat, b.lon));
    assert!(a.distance_to(&b) > 2000.0 && a.distance_to(&b) < 2300.0);
}

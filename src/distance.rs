use itertools::Itertools;

use crate::model::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Sum of consecutive-pair distances along the path.
pub fn route_length_km(path: &[GeoPoint]) -> f64 {
    path.iter()
        .tuple_windows()
        .map(|(a, b)| haversine_km(a, b))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_km(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.001, "got {d}");
    }

    #[test]
    fn known_city_pair() {
        // MG Road -> Koramangala, Bangalore
        let d = haversine_km(&GeoPoint::new(12.9758, 77.6055), &GeoPoint::new(12.9348, 77.6264));
        assert!((d - 5.09).abs() < 0.01, "got {d}");
    }

    #[test]
    fn short_paths_have_zero_length() {
        assert_eq!(route_length_km(&[]), 0.0);
        assert_eq!(route_length_km(&[GeoPoint::new(12.97, 77.59)]), 0.0);
    }

    #[test]
    fn length_sums_legs() {
        let a = GeoPoint::new(12.90, 77.50);
        let b = GeoPoint::new(12.95, 77.55);
        let c = GeoPoint::new(13.00, 77.52);
        let expected = haversine_km(&a, &b) + haversine_km(&b, &c);
        assert!((route_length_km(&[a, b, c]) - expected).abs() < 1e-12);
    }

    fn point() -> impl Strategy<Value = GeoPoint> {
        (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
    }

    proptest! {
        #[test]
        fn identical_points_are_zero_apart(p in point()) {
            prop_assert_eq!(haversine_km(&p, &p), 0.0);
        }

        #[test]
        fn distance_is_symmetric(a in point(), b in point()) {
            prop_assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-9);
        }

        #[test]
        fn path_is_never_shorter_than_its_chord(path in prop::collection::vec(point(), 2..20)) {
            let chord = haversine_km(&path[0], &path[path.len() - 1]);
            prop_assert!(route_length_km(&path) + 1e-6 >= chord);
        }
    }
}

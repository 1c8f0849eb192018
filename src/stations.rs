use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use crate::distance::{EARTH_RADIUS_KM, haversine_km};
use crate::model::{GeoPoint, NearbyStation, PoliceStation};

pub const DEFAULT_NEARBY_KM: f64 = 3.0;

// Bangalore reference list
const BANGALORE_STATIONS: &[(&str, f64, f64)] = &[
    ("Cubbon Park Police Station", 12.9768, 77.5953),
    ("Commercial Street Police Station", 12.9815, 77.6082),
    ("Ashok Nagar Police Station", 12.9784, 77.5778),
    ("Ulsoor Police Station", 12.9789, 77.6214),
    ("HSR Layout Police Station", 12.9116, 77.6473),
    ("Koramangala Police Station", 12.9348, 77.6264),
    ("Jayanagar Police Station", 12.9302, 77.5834),
    ("Indiranagar Police Station", 12.9782, 77.6408),
    ("Whitefield Police Station", 12.9698, 77.7499),
    ("Yeshwanthpur Police Station", 13.0256, 77.5485),
    ("Madiwala Police Station", 12.9185, 77.6198),
    ("BTM Layout Police Station", 12.9167, 77.6100),
    ("Banashankari Police Station", 12.9254, 77.5468),
    ("J.P. Nagar Police Station", 12.9123, 77.5856),
    ("Basavanagudi Police Station", 12.9416, 77.5733),
    ("Shivajinagar Police Station", 12.9818, 77.6023),
    ("Vijayanagar Police Station", 12.9692, 77.5332),
    ("Rajajinagar Police Station", 12.9916, 77.5512),
    ("Malleshwaram Police Station", 13.0069, 77.5751),
    ("Seshadripuram Police Station", 12.9982, 77.5821),
    ("Frazer Town Police Station", 12.9989, 77.6128),
    ("RT Nagar Police Station", 13.0286, 77.5934),
    ("Hebbal Police Station", 13.0392, 77.5910),
    ("Yelahanka Police Station", 13.1007, 77.5963),
    ("Electronic City Police Station", 12.8456, 77.6651),
    ("Bommanahalli Police Station", 12.8892, 77.6284),
    ("Kengeri Police Station", 12.9065, 77.4833),
];

pub fn default_stations() -> Vec<PoliceStation> {
    BANGALORE_STATIONS
        .iter()
        .map(|&(name, lat, lng)| PoliceStation::new(name, lat, lng))
        .collect()
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// R-tree over the points of one route, keyed `[lng, lat]`.
pub struct RouteIndex<'a> {
    path: &'a [GeoPoint],
    tree: RTree<IndexedPoint>,
}

impl<'a> RouteIndex<'a> {
    pub fn new(path: &'a [GeoPoint]) -> Self {
        let points = path
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new(p.lng_lat(), i))
            .collect();
        Self { path, tree: RTree::bulk_load(points) }
    }

    /// Minimum haversine distance from `target` to the route, if it is
    /// within `threshold_km`.
    pub fn min_distance_within(&self, target: &GeoPoint, threshold_km: f64) -> Option<f64> {
        let best = match search_envelope(target, threshold_km) {
            Some(envelope) => self
                .tree
                .locate_in_envelope(&envelope)
                .map(|p| haversine_km(target, &self.path[p.data]))
                .min_by(f64::total_cmp),
            None => self
                .path
                .iter()
                .map(|p| haversine_km(target, p))
                .min_by(f64::total_cmp),
        };
        best.filter(|&d| d <= threshold_km)
    }
}

/// Lat/lng box holding every point within `radius_km` of `center`.
/// `None` when the box would touch a pole or wrap the antimeridian.
fn search_envelope(center: &GeoPoint, radius_km: f64) -> Option<AABB<[f64; 2]>> {
    const EPS_DEG: f64 = 1e-9;

    let angle = radius_km / EARTH_RADIUS_KM;
    let d_lat = angle.to_degrees() + EPS_DEG;
    let lat_max = center.latitude.abs() + d_lat;
    if lat_max >= 90.0 {
        return None;
    }

    let s = (angle / 2.0).sin() / lat_max.to_radians().cos();
    if s >= 1.0 {
        return None;
    }
    let d_lng = (2.0 * s.asin()).to_degrees() + EPS_DEG;
    if center.longitude - d_lng < -180.0 || center.longitude + d_lng > 180.0 {
        return None;
    }

    Some(AABB::from_corners(
        [center.longitude - d_lng, center.latitude - d_lat],
        [center.longitude + d_lng, center.latitude + d_lat],
    ))
}

/// Stations whose minimum distance to `path` is at most `threshold_km`,
/// each listed once, nearest first.
pub fn find_nearby_stations(
    path: &[GeoPoint],
    stations: &[PoliceStation],
    threshold_km: f64,
) -> Vec<NearbyStation> {
    if path.is_empty() || threshold_km < 0.0 {
        return Vec::new();
    }

    let index = RouteIndex::new(path);
    let mut nearby: Vec<NearbyStation> = stations
        .iter()
        .filter_map(|station| {
            index
                .min_distance_within(&station.position(), threshold_km)
                .map(|distance_km| NearbyStation { station: station.clone(), distance_km })
        })
        .collect();

    // stable: equal distances keep reference-list order
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

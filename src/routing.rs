use std::f64::consts::PI;
use std::future::Future;
use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distance::haversine_km;
use crate::error::LookupError;
use crate::jitter::Jitter;
use crate::model::{GeoPoint, RoutePath};
use crate::safety::ScoringProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteVariant {
    Safest,
    Balanced,
    Fastest,
}

impl RouteVariant {
    pub const ALL: [RouteVariant; 3] = [Self::Safest, Self::Balanced, Self::Fastest];

    /// Span, in degrees, of the random wiggle applied to the midpoint.
    fn variation(self) -> f64 {
        match self {
            Self::Safest => 0.02,
            Self::Balanced => 0.04,
            Self::Fastest => 0.08,
        }
    }

    fn waypoint_shift(self) -> (f64, f64) {
        match self {
            Self::Safest => (0.0, 0.0),
            Self::Balanced => (0.01, -0.01),
            Self::Fastest => (-0.01, 0.01),
        }
    }

    /// Lateral offset of the fallback curve at angle `t`.
    fn curve(self, t: f64) -> f64 {
        match self {
            Self::Safest => t.sin() * 0.015,
            Self::Balanced => (t * 1.5).sin() * 0.025,
            Self::Fastest => (t * 2.0).sin() * 0.01,
        }
    }

    fn fallback_kmh(self) -> f64 {
        match self {
            Self::Fastest => 30.0,
            _ => 25.0,
        }
    }

    pub fn profile(self) -> ScoringProfile {
        match self {
            Self::Safest => ScoringProfile {
                lighting_bonus: 20.0,
                crowd_bonus: 15.0,
                score_multiplier: 1.2,
                cruise_kmh: 28.0,
            },
            Self::Balanced => ScoringProfile::NEUTRAL,
            Self::Fastest => ScoringProfile {
                score_multiplier: 0.7,
                cruise_kmh: 35.0,
                ..ScoringProfile::NEUTRAL
            },
        }
    }

    /// The via-point this variant is routed through.
    pub fn waypoint(self, start: &GeoPoint, end: &GeoPoint, jitter: &mut impl Jitter) -> GeoPoint {
        let span = self.variation();
        let (d_lat, d_lng) = self.waypoint_shift();
        GeoPoint::new(
            (start.latitude + end.latitude) / 2.0 + jitter.offset(span) + d_lat,
            (start.longitude + end.longitude) / 2.0 + jitter.offset(span) + d_lng,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometrySource {
    Routed,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteGeometry {
    pub path: RoutePath,
    pub distance_km: f64,
    pub duration_min: u32,
    pub source: GeometrySource,
}

pub trait RouteProvider {
    fn route(&self, points: &[GeoPoint]) -> impl Future<Output = Result<RouteGeometry, LookupError>> + Send;
}

const FALLBACK_STEPS: usize = 20;

/// Deterministic stand-in path used when the routing service fails.
pub fn fallback_route(start: &GeoPoint, end: &GeoPoint, variant: RouteVariant) -> RouteGeometry {
    let path = (0..=FALLBACK_STEPS)
        .map(|i| {
            let progress = i as f64 / FALLBACK_STEPS as f64;
            let offset = variant.curve(progress * PI * 2.0);
            GeoPoint::new(
                start.latitude + (end.latitude - start.latitude) * progress + offset,
                start.longitude + (end.longitude - start.longitude) * progress + offset * 0.5,
            )
        })
        .collect();

    let straight = haversine_km(start, end);
    RouteGeometry {
        path,
        distance_km: straight,
        duration_min: (straight / variant.fallback_kmh() * 60.0).floor() as u32,
        source: GeometrySource::Fallback,
    }
}

#[derive(Deserialize, Debug)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize, Debug)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
}

#[derive(Deserialize, Debug)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>, // [lon, lat]
}

pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OsrmClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("saferoute/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url: base_url.to_string(), timeout })
    }

    fn route_url(&self, points: &[GeoPoint]) -> String {
        let coords = points
            .iter()
            .map(|p| format!("{},{}", p.longitude, p.latitude))
            .join(";");
        format!(
            "{}/route/v1/driving/{coords}?overview=full&geometries=geojson&alternatives=false",
            self.base_url
        )
    }
}

impl RouteProvider for OsrmClient {
    async fn route(&self, points: &[GeoPoint]) -> Result<RouteGeometry, LookupError> {
        let url = self.route_url(points);
        debug!(%url, "requesting route");

        let exchange = async {
            let response = self.client.get(&url).send().await?.error_for_status()?;
            Ok::<_, LookupError>(response.json::<OsrmResponse>().await?)
        };
        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LookupError::Timeout(self.timeout.as_millis() as u64))??;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::Empty("no routes in response".to_string()))?;
        if route.geometry.coordinates.is_empty() {
            return Err(LookupError::Empty("route has no geometry".to_string()));
        }

        Ok(RouteGeometry {
            path: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| GeoPoint::new(lat, lng))
                .collect(),
            distance_km: route.distance / 1000.0,
            duration_min: (route.duration / 60.0).floor() as u32,
            source: GeometrySource::Routed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::{NoJitter, SeededJitter};

    const MG_ROAD: GeoPoint = GeoPoint::new(12.9758, 77.6055);
    const KORAMANGALA: GeoPoint = GeoPoint::new(12.9348, 77.6264);

    #[test]
    fn fallback_runs_start_to_end() {
        for variant in RouteVariant::ALL {
            let route = fallback_route(&MG_ROAD, &KORAMANGALA, variant);
            assert_eq!(route.path.len(), FALLBACK_STEPS + 1);
            assert_eq!(route.source, GeometrySource::Fallback);
            let first = route.path[0];
            let last = route.path[FALLBACK_STEPS];
            assert!(haversine_km(&first, &MG_ROAD) < 1e-6);
            assert!(haversine_km(&last, &KORAMANGALA) < 1e-6);
        }
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_route(&MG_ROAD, &KORAMANGALA, RouteVariant::Balanced);
        let b = fallback_route(&MG_ROAD, &KORAMANGALA, RouteVariant::Balanced);
        assert_eq!(a.path, b.path);
    }

    #[test]
    fn fallback_eta_uses_straight_line() {
        let safest = fallback_route(&MG_ROAD, &KORAMANGALA, RouteVariant::Safest);
        let fastest = fallback_route(&MG_ROAD, &KORAMANGALA, RouteVariant::Fastest);
        assert!((safest.distance_km - haversine_km(&MG_ROAD, &KORAMANGALA)).abs() < 1e-12);
        // ~5.06 km at 25 km/h and 30 km/h
        assert_eq!(safest.duration_min, 12);
        assert_eq!(fastest.duration_min, 10);
    }

    #[test]
    fn waypoints_without_jitter_are_fixed() {
        let mid_lat = (MG_ROAD.latitude + KORAMANGALA.latitude) / 2.0;
        let mid_lng = (MG_ROAD.longitude + KORAMANGALA.longitude) / 2.0;
        let safest = RouteVariant::Safest.waypoint(&MG_ROAD, &KORAMANGALA, &mut NoJitter);
        assert_eq!(safest, GeoPoint::new(mid_lat, mid_lng));
        let balanced = RouteVariant::Balanced.waypoint(&MG_ROAD, &KORAMANGALA, &mut NoJitter);
        assert_eq!(balanced, GeoPoint::new(mid_lat + 0.01, mid_lng - 0.01));
        let fastest = RouteVariant::Fastest.waypoint(&MG_ROAD, &KORAMANGALA, &mut NoJitter);
        assert_eq!(fastest, GeoPoint::new(mid_lat - 0.01, mid_lng + 0.01));
    }

    #[test]
    fn jittered_waypoint_stays_within_variation() {
        let mut jitter = SeededJitter::new(3);
        let mid_lat = (MG_ROAD.latitude + KORAMANGALA.latitude) / 2.0;
        for _ in 0..100 {
            let p = RouteVariant::Fastest.waypoint(&MG_ROAD, &KORAMANGALA, &mut jitter);
            assert!((p.latitude - (mid_lat - 0.01)).abs() <= 0.04);
        }
    }

    #[test]
    fn osrm_url_uses_lng_lat_pairs() {
        let client = OsrmClient::new("https://router.example", Duration::from_secs(1)).unwrap();
        let url = client.route_url(&[GeoPoint::new(12.5, 77.25), GeoPoint::new(13.0, 77.5)]);
        assert_eq!(
            url,
            "https://router.example/route/v1/driving/77.25,12.5;77.5,13?overview=full&geometries=geojson&alternatives=false"
        );
    }

    #[test]
    fn osrm_response_parses() {
        let body = r#"{"code":"Ok","routes":[{"geometry":{"type":"LineString","coordinates":[[77.6,12.97],[77.61,12.96]]},"distance":1520.0,"duration":250.0}]}"#;
        let parsed: OsrmResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.routes[0].geometry.coordinates.len(), 2);
        assert_eq!(parsed.routes[0].distance, 1520.0);
    }

    #[tokio::test]
    async fn unreachable_router_is_an_error() {
        let client = OsrmClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(client.route(&[MG_ROAD, KORAMANGALA]).await.is_err());
    }

    /// Accepts connections and never writes a byte back.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn silent_router_times_out() {
        let client = OsrmClient::new(&silent_server().await, Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let err = client.route(&[MG_ROAD, KORAMANGALA]).await.unwrap_err();
        assert!(matches!(err, LookupError::Timeout(200)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}

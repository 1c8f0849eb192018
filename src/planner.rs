use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::DEFAULT_LOOKUP_TIMEOUT;
use crate::distance::route_length_km;
use crate::error::{ApiError, LookupError};
use crate::geocode::{Geocoder, fallback_place};
use crate::jitter::Jitter;
use crate::model::{GeoPoint, NearbyStation, Place, PoliceStation, SafetyAssessment};
use crate::ranking::{Ranked, Scored, rank_routes};
use crate::routing::{RouteGeometry, RouteProvider, RouteVariant, fallback_route};
use crate::safety::{ScoreBand, ScoringParams, assess};
use crate::stations::find_nearby_stations;

#[derive(Debug, Clone, Serialize)]
pub struct CandidateRoute {
    pub variant: RouteVariant,
    pub waypoint: GeoPoint,
    pub geometry: RouteGeometry,
    pub nearby_stations: Vec<NearbyStation>,
    pub assessment: SafetyAssessment,
    pub band: &'static str,
    pub band_color: &'static str,
}

impl Scored for CandidateRoute {
    fn assessment(&self) -> &SafetyAssessment {
        &self.assessment
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
    pub start: Place,
    pub end: Place,
    pub hour: u32,
    pub routes: Vec<Ranked<CandidateRoute>>,
}

pub struct Planner<G, R> {
    geocoder: G,
    router: R,
    stations: Vec<PoliceStation>,
    nearby_km: f64,
    params: ScoringParams,
    lookup_timeout: Duration,
}

impl<G: Geocoder + Sync, R: RouteProvider + Sync> Planner<G, R> {
    pub fn new(geocoder: G, router: R, stations: Vec<PoliceStation>, nearby_km: f64) -> Self {
        Self {
            geocoder,
            router,
            stations,
            nearby_km,
            params: ScoringParams::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Upper bound on each geocoder and router call, whatever the provider does internally.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    fn timed_out(&self) -> LookupError {
        LookupError::Timeout(self.lookup_timeout.as_millis() as u64)
    }

    pub fn stations(&self) -> &[PoliceStation] {
        &self.stations
    }

    async fn resolve(&self, query: &str) -> Result<Place, ApiError> {
        let found = tokio::time::timeout(self.lookup_timeout, self.geocoder.geocode(query))
            .await
            .unwrap_or_else(|_| Err(self.timed_out()));
        let place = match found {
            Ok(found) => found,
            Err(e) => {
                warn!(query, error = %e, "geocoder error, using built-in places");
                fallback_place(query)
            }
        };
        place.ok_or_else(|| ApiError::LocationNotFound(query.to_string()))
    }

    async fn geometry(&self, start: &GeoPoint, waypoint: GeoPoint, end: &GeoPoint, variant: RouteVariant) -> RouteGeometry {
        let routed = tokio::time::timeout(self.lookup_timeout, self.router.route(&[*start, waypoint, *end]))
            .await
            .unwrap_or_else(|_| Err(self.timed_out()));
        match routed {
            Ok(geometry) if !geometry.path.is_empty() => geometry,
            Ok(_) => {
                warn!(?variant, "routing returned an empty path, using fallback");
                fallback_route(start, end, variant)
            }
            Err(e) => {
                warn!(?variant, error = %e, "routing failed, using fallback");
                fallback_route(start, end, variant)
            }
        }
    }

    fn candidate(&self, variant: RouteVariant, waypoint: GeoPoint, geometry: RouteGeometry, hour: u32) -> CandidateRoute {
        let nearby_stations = find_nearby_stations(&geometry.path, &self.stations, self.nearby_km);
        let assessment = assess(
            route_length_km(&geometry.path),
            nearby_stations.len(),
            hour,
            &variant.profile(),
            &self.params,
        );
        let band = ScoreBand::of(assessment.safety_score);
        CandidateRoute {
            variant,
            waypoint,
            geometry,
            band: band.label(),
            band_color: band.color(),
            nearby_stations,
            assessment,
        }
    }

    /// Geocodes both ends, routes the three variants and ranks them.
    pub async fn plan(
        &self,
        start_query: &str,
        end_query: &str,
        hour: u32,
        jitter: &mut (impl Jitter + Send),
    ) -> Result<RoutePlan, ApiError> {
        if start_query.trim().is_empty() || end_query.trim().is_empty() {
            return Err(ApiError::BadRequest("start and end are required".to_string()));
        }
        if hour > 23 {
            return Err(ApiError::BadRequest(format!("hour out of range: {hour}")));
        }

        let (start, end) = tokio::join!(self.resolve(start_query), self.resolve(end_query));
        let (start, end) = (start?, end?);
        info!(start = %start.display_name, end = %end.display_name, hour, "planning routes");

        let [safest, balanced, fastest] =
            RouteVariant::ALL.map(|v| (v, v.waypoint(&start.point, &end.point, &mut *jitter)));

        let (g0, g1, g2) = tokio::join!(
            self.geometry(&start.point, safest.1, &end.point, safest.0),
            self.geometry(&start.point, balanced.1, &end.point, balanced.0),
            self.geometry(&start.point, fastest.1, &end.point, fastest.0),
        );

        let candidates = vec![
            self.candidate(safest.0, safest.1, g0, hour),
            self.candidate(balanced.0, balanced.1, g1, hour),
            self.candidate(fastest.0, fastest.1, g2, hour),
        ];

        Ok(RoutePlan { start, end, hour, routes: rank_routes(candidates) })
    }
}

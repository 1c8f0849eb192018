mod config;
mod distance;
mod emergency;
mod error;
mod geocode;
mod heatmap;
mod jitter;
mod map_state;
mod model;
mod overpass;
mod planner;
mod ranking;
mod routing;
mod safety;
mod stations;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::emergency::EmergencyShare;
use crate::error::ApiError;
use crate::geocode::{Geocoder, NominatimClient};
use crate::heatmap::{CrowdGrid, HeatCell, crowd_samples, is_weekend};
use crate::jitter::{NoJitter, SeededJitter};
use crate::map_state::{Bounds, MapEvent, MapMessage, MapState};
use crate::model::{GeoPoint, PoliceStation};
use crate::overpass::{OverpassClient, StationSource};
use crate::planner::{Planner, RoutePlan};
use crate::routing::{OsrmClient, RouteProvider};

struct AppState<G, R, S> {
    planner: Planner<G, R>,
    station_source: S,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "saferoute=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let stations = config.load_stations()?;
    tracing::info!("Loaded {} police stations", stations.len());

    let geocoder = NominatimClient::new(&config.nominatim_url, &config.city, config.lookup_timeout)?;
    let router = OsrmClient::new(&config.osrm_url, config.lookup_timeout)?;
    let station_source = OverpassClient::new(&config.overpass_url, config.lookup_timeout)?;
    let planner =
        Planner::new(geocoder, router, stations, config.nearby_km).with_lookup_timeout(config.lookup_timeout);

    let app = app(Arc::new(AppState { planner, station_source }));

    tracing::info!("API server running on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app<G, R, S>(state: Arc<AppState<G, R, S>>) -> Router
where
    G: Geocoder + Send + Sync + 'static,
    R: RouteProvider + Send + Sync + 'static,
    S: StationSource + Send + Sync + 'static,
{
    // Allows the map page to call the API from any origin
    let cors = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_origin(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/route", post(plan_route::<G, R, S>))
        .route("/stations", get(list_stations::<G, R, S>))
        .route("/heatmap", get(crowd_heatmap))
        .route("/map/event", post(map_event))
        .route("/emergency", get(emergency_share))
        .layer(cors)
        .with_state(state)
}

// --- API DTOs ---

#[derive(Deserialize)]
struct RouteRequest {
    start: String,
    end: String,
    /// Hour of day to score for; defaults to the server's local hour.
    hour: Option<u32>,
}

/// Map viewport; all four edges or none.
#[derive(Deserialize)]
struct StationsQuery {
    south: Option<f64>,
    west: Option<f64>,
    north: Option<f64>,
    east: Option<f64>,
}

impl StationsQuery {
    fn area(&self) -> Result<Option<Bounds>, ApiError> {
        match (self.south, self.west, self.north, self.east) {
            (None, None, None, None) => Ok(None),
            (Some(south), Some(west), Some(north), Some(east)) => {
                let area = Bounds { south, west, north, east };
                if area.is_valid() {
                    Ok(Some(area))
                } else {
                    Err(ApiError::BadRequest("invalid station area".to_string()))
                }
            }
            _ => Err(ApiError::BadRequest("south, west, north and east go together".to_string())),
        }
    }
}

#[derive(Deserialize)]
struct PositionQuery {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct HeatmapQuery {
    hour: Option<u32>,
    weekend: Option<bool>,
    seed: Option<u64>,
    /// `false` pins every sample to its hotspot center.
    scatter: Option<bool>,
}

#[derive(Serialize)]
struct HeatmapResponse {
    hour: u32,
    weekend: bool,
    cells: Vec<HeatCell>,
}

#[derive(Deserialize)]
struct MapEventRequest {
    #[serde(default)]
    state: MapState,
    event: MapEvent,
}

#[derive(Serialize)]
struct MapEventResponse {
    state: MapState,
    message: Option<MapMessage>,
    /// Viewport for the selected route.
    bounds: Option<Bounds>,
}

// --- Handlers ---

async fn plan_route<G, R, S>(
    State(state): State<Arc<AppState<G, R, S>>>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<RoutePlan>, ApiError>
where
    G: Geocoder + Send + Sync + 'static,
    R: RouteProvider + Send + Sync + 'static,
    S: StationSource + Send + Sync + 'static,
{
    let hour = payload.hour.unwrap_or_else(|| Local::now().hour());
    let mut jitter = SeededJitter::from_entropy();
    let plan = state
        .planner
        .plan(&payload.start, &payload.end, hour, &mut jitter)
        .await?;
    Ok(Json(plan))
}

async fn list_stations<G, R, S>(
    State(state): State<Arc<AppState<G, R, S>>>,
    Query(query): Query<StationsQuery>,
) -> Result<Json<Vec<PoliceStation>>, ApiError>
where
    G: Geocoder + Send + Sync + 'static,
    R: RouteProvider + Send + Sync + 'static,
    S: StationSource + Send + Sync + 'static,
{
    let Some(area) = query.area()? else {
        return Ok(Json(state.planner.stations().to_vec()));
    };
    match state.station_source.stations_in(&area).await {
        Ok(stations) => Ok(Json(stations)),
        Err(e) => {
            tracing::warn!(error = %e, "station lookup failed, using built-in list");
            let known = state.planner.stations().iter().filter(|s| area.contains(&s.position()));
            Ok(Json(known.cloned().collect()))
        }
    }
}

async fn emergency_share(Query(query): Query<PositionQuery>) -> Result<Json<EmergencyShare>, ApiError> {
    let here = GeoPoint::new(query.lat, query.lng);
    if !here.is_valid() {
        return Err(ApiError::BadRequest("invalid position".to_string()));
    }
    Ok(Json(EmergencyShare::at(&here)))
}

async fn crowd_heatmap(Query(query): Query<HeatmapQuery>) -> Result<Json<HeatmapResponse>, ApiError> {
    let now = Local::now().naive_local();
    let hour = query.hour.unwrap_or_else(|| now.hour());
    if hour > 23 {
        return Err(ApiError::BadRequest(format!("hour out of range: {hour}")));
    }
    let weekend = query.weekend.unwrap_or_else(|| is_weekend(&now));
    let samples = match (query.scatter, query.seed) {
        (Some(false), _) => crowd_samples(hour, weekend, &mut NoJitter),
        (_, Some(seed)) => crowd_samples(hour, weekend, &mut SeededJitter::new(seed)),
        (_, None) => crowd_samples(hour, weekend, &mut SeededJitter::from_entropy()),
    };

    let grid = CrowdGrid::from_samples(&samples);
    Ok(Json(HeatmapResponse { hour, weekend, cells: grid.cells() }))
}

async fn map_event(Json(payload): Json<MapEventRequest>) -> Json<MapEventResponse> {
    let (state, message) = payload.state.apply(payload.event);
    let bounds = state.selected_bounds(0.1);
    Json(MapEventResponse { state, message, bounds })
}

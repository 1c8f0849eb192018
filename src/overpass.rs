//! Live police-station lookup from OpenStreetMap through the Overpass API.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::LookupError;
use crate::map_state::Bounds;
use crate::model::{GeoPoint, PoliceStation};

pub trait StationSource {
    fn stations_in(&self, area: &Bounds) -> impl Future<Output = Result<Vec<PoliceStation>, LookupError>> + Send;
}

const UNNAMED: &str = "Police Station";

/// Police nodes, ways and relations inside `area`, with centers for the latter two.
pub fn overpass_query(area: &Bounds) -> String {
    let bbox = format!("{},{},{},{}", area.south, area.west, area.north, area.east);
    format!(
        "[out:json][timeout:25];(node[\"amenity\"=\"police\"]({bbox});way[\"amenity\"=\"police\"]({bbox});relation[\"amenity\"=\"police\"]({bbox}););out center;"
    )
}

#[derive(Deserialize, Debug)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize, Debug)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn into_station(mut self) -> Option<PoliceStation> {
        let point = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => GeoPoint::new(lat, lon),
            (_, _, Some(center)) => GeoPoint::new(center.lat, center.lon),
            _ => return None,
        };
        if !point.is_valid() {
            return None;
        }
        let name = self
            .tags
            .remove("name")
            .or_else(|| self.tags.remove("name:en"))
            .unwrap_or_else(|| UNNAMED.to_string());
        Some(PoliceStation::new(name, point.latitude, point.longitude))
    }
}

pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OverpassClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("saferoute/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url: base_url.to_string(), timeout })
    }
}

impl StationSource for OverpassClient {
    async fn stations_in(&self, area: &Bounds) -> Result<Vec<PoliceStation>, LookupError> {
        let url = format!("{}/api/interpreter", self.base_url);
        let query = overpass_query(area);
        let exchange = async {
            let response = self
                .client
                .get(&url)
                .query(&[("data", query.as_str())])
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, LookupError>(response.json::<OverpassResponse>().await?)
        };

        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LookupError::Timeout(self.timeout.as_millis() as u64))??;

        let stations: Vec<PoliceStation> = body.elements.into_iter().filter_map(OverpassElement::into_station).collect();
        debug!(count = stations.len(), "fetched police stations");
        Ok(stations)
    }
}

use std::time::Duration;

use crate::error::ConfigError;
use crate::model::PoliceStation;
use crate::stations::{DEFAULT_NEARBY_KM, default_stations};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(8000);

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    /// Appended to every geocoding query.
    pub city: String,
    pub nominatim_url: String,
    pub osrm_url: String,
    pub overpass_url: String,
    /// Bounds every geocoding, routing and station lookup.
    pub lookup_timeout: Duration,
    pub nearby_km: f64,
    pub stations_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            city: "Bangalore".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            osrm_url: "https://router.project-osrm.org".to_string(),
            overpass_url: "https://overpass-api.de".to_string(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            nearby_km: DEFAULT_NEARBY_KM,
            stations_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("SAFEROUTE_BIND") {
            config.bind = v;
        }
        if let Some(v) = lookup("SAFEROUTE_CITY") {
            config.city = v;
        }
        if let Some(v) = lookup("SAFEROUTE_NOMINATIM_URL") {
            config.nominatim_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SAFEROUTE_OSRM_URL") {
            config.osrm_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SAFEROUTE_OVERPASS_URL") {
            config.overpass_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SAFEROUTE_LOOKUP_TIMEOUT_MS") {
            let ms: u64 = v
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "SAFEROUTE_LOOKUP_TIMEOUT_MS", value: v.clone() })?;
            config.lookup_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("SAFEROUTE_NEARBY_KM") {
            config.nearby_km = match v.parse::<f64>() {
                Ok(km) if km.is_finite() && km >= 0.0 => km,
                _ => return Err(ConfigError::Invalid { key: "SAFEROUTE_NEARBY_KM", value: v }),
            };
        }
        config.stations_file = lookup("SAFEROUTE_STATIONS_FILE");

        Ok(config)
    }

    /// The configured station file, or the built-in list.
    pub fn load_stations(&self) -> Result<Vec<PoliceStation>, ConfigError> {
        match &self.stations_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::StationsIo { path: path.clone(), source })?;
                serde_json::from_str(&raw)
                    .map_err(|source| ConfigError::StationsJson { path: path.clone(), source })
            }
            None => Ok(default_stations()),
        }
    }
}

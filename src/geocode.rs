use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::model::{GeoPoint, Place};

pub trait Geocoder {
    /// `Ok(None)` means the service answered but knows no such place.
    fn geocode(&self, query: &str) -> impl Future<Output = Result<Option<Place>, LookupError>> + Send;
}

lazy_static! {
    // Used only when the geocoding service is unreachable.
    static ref FALLBACK_PLACES: HashMap<&'static str, Place> = {
        let entries: [(&str, f64, f64, &str); 11] = [
            ("mg road", 12.9758, 77.6055, "MG Road, Bangalore"),
            ("koramangala", 12.9348, 77.6264, "Koramangala, Bangalore"),
            ("indiranagar", 12.9782, 77.6408, "Indiranagar, Bangalore"),
            ("hsr layout", 12.9116, 77.6473, "HSR Layout, Bangalore"),
            ("whitefield", 12.9698, 77.7499, "Whitefield, Bangalore"),
            ("jayanagar", 12.9302, 77.5834, "Jayanagar, Bangalore"),
            ("electronic city", 12.8456, 77.6651, "Electronic City, Bangalore"),
            ("marathahalli", 12.9569, 77.7011, "Marathahalli, Bangalore"),
            ("yeshwanthpur", 13.0256, 77.5485, "Yeshwanthpur, Bangalore"),
            ("yelahanka", 13.1007, 77.5963, "Yelahanka, Bangalore"),
            ("kengeri", 12.9065, 77.4833, "Kengeri, Bangalore"),
        ];
        entries
            .into_iter()
            .map(|(key, lat, lng, name)| {
                (key, Place { point: GeoPoint::new(lat, lng), display_name: name.to_string() })
            })
            .collect()
    };
}

pub fn fallback_place(query: &str) -> Option<Place> {
    FALLBACK_PLACES.get(query.trim().to_lowercase().as_str()).cloned()
}

#[derive(Deserialize, Debug)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimResult {
    fn into_place(self) -> Result<Place, LookupError> {
        let point = match (self.lat.parse::<f64>(), self.lon.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => GeoPoint::new(lat, lng),
            _ => return Err(LookupError::Empty(format!("unparsable coordinates for {}", self.display_name))),
        };
        if !point.is_valid() {
            return Err(LookupError::Empty(format!("coordinates out of range for {}", self.display_name)));
        }
        Ok(Place { point, display_name: self.display_name })
    }
}

pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    city: String,
    timeout: Duration,
}

impl NominatimClient {
    pub fn new(base_url: &str, city: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("saferoute/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            city: city.to_string(),
            timeout,
        })
    }

    async fn search(&self, query: &str) -> Result<Option<Place>, LookupError> {
        let q = format!("{query}, {}", self.city);
        let url = format!("{}/search", self.base_url);
        let exchange = async {
            let response = self
                .client
                .get(&url)
                .query(&[("format", "json"), ("limit", "1"), ("q", q.as_str())])
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, LookupError>(response.json::<Vec<NominatimResult>>().await?)
        };

        // bounds connect, headers and body together
        let results = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LookupError::Timeout(self.timeout.as_millis() as u64))??;

        results.into_iter().next().map(NominatimResult::into_place).transpose()
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<Place>, LookupError> {
        match self.search(query).await {
            Ok(found) => {
                debug!(query, found = found.is_some(), "geocoded");
                Ok(found)
            }
            Err(e) => {
                warn!(query, error = %e, "geocoding failed, using built-in places");
                Ok(fallback_place(query))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_case_and_space_insensitive() {
        let place = fallback_place("  MG Road ").unwrap();
        assert_eq!(place.display_name, "MG Road, Bangalore");
        assert_eq!(place.point, GeoPoint::new(12.9758, 77.6055));
    }

    #[test]
    fn unknown_fallback_is_none() {
        assert!(fallback_place("Atlantis").is_none());
    }

    fn result(lat: &str, lon: &str) -> NominatimResult {
        NominatimResult { lat: lat.into(), lon: lon.into(), display_name: "Somewhere".into() }
    }

    #[test]
    fn result_coordinates_are_parsed() {
        let place = result("12.9348", "77.6264").into_place().unwrap();
        assert_eq!(place.point, GeoPoint::new(12.9348, 77.6264));
    }

    #[test]
    fn non_finite_or_out_of_range_results_are_rejected() {
        for (lat, lon) in [("NaN", "77.6"), ("12.9", "inf"), ("-inf", "77.6"), ("95.0", "77.6"), ("12.9", "181")] {
            assert!(matches!(result(lat, lon).into_place(), Err(LookupError::Empty(_))), "{lat},{lon}");
        }
        assert!(result("north", "77.6").into_place().is_err());
    }

    #[tokio::test]
    async fn unreachable_service_uses_fallback_table() {
        // port 9 (discard) on localhost refuses connections
        let client = NominatimClient::new("http://127.0.0.1:9", "Bangalore", Duration::from_millis(500)).unwrap();
        let found = client.geocode("Koramangala").await.unwrap();
        assert_eq!(found.map(|p| p.display_name), Some("Koramangala, Bangalore".to_string()));
        assert!(client.geocode("Atlantis").await.unwrap().is_none());
    }
}

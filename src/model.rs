use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `[lng, lat]`, the axis order GeoJSON and OSRM use.
    pub fn lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Finite and inside ±90 latitude, ±180 longitude.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliceStation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl PoliceStation {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self { name: name.into(), lat, lng }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

pub type RoutePath = Vec<GeoPoint>;

/// A geocoded place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub point: GeoPoint,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    #[serde(flatten)]
    pub station: PoliceStation,
    pub distance_km: f64,
}

/// Synthetic safety metrics for one candidate route.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAssessment {
    pub police_station_count: u32,
    pub estimated_cctv_count: u32,
    pub lighting_percent: u32,
    pub crowd_percent: u32,
    pub safety_score: f64,
    pub route_length_km: f64,
    pub estimated_minutes: u32,
    pub risk_notes: Vec<String>,
    pub safe_notes: Vec<String>,
    pub police_score: f64,
    pub lighting_score: f64,
    pub crowd_score: f64,
    pub cctv_score: f64,
}

impl SafetyAssessment {
    /// Zeroed metrics shown when a route carries no usable safety data.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn or_placeholder(assessment: Option<&SafetyAssessment>) -> Self {
        assessment.cloned().unwrap_or_else(Self::placeholder)
    }
}

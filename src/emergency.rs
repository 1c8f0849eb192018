use serde::Serialize;

use crate::model::GeoPoint;

/// Police emergency number in India.
pub const EMERGENCY_NUMBER: &str = "100";

pub fn maps_url(point: &GeoPoint) -> String {
    format!("https://www.google.com/maps?q={},{}", point.latitude, point.longitude)
}

/// Text sent to a trusted contact with the sender's position.
pub fn emergency_message(point: &GeoPoint) -> String {
    format!("EMERGENCY: I need help! My current location: {}", maps_url(point))
}

/// What the client needs to dial for help or share its position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyShare {
    pub number: &'static str,
    pub maps_url: String,
    pub message: String,
}

impl EmergencyShare {
    pub fn at(point: &GeoPoint) -> Self {
        Self {
            number: EMERGENCY_NUMBER,
            maps_url: maps_url(point),
            message: emergency_message(point),
        }
    }
}

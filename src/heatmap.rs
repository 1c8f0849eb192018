//! Synthetic crowd-density layer.
//!
//! Samples are scattered around fixed hotspots, scaled by time of day, and
//! binned into H3 cells so the map gets one intensity per hexagon.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime, Weekday};
use h3o::{CellIndex, LatLng, Resolution};
use serde::Serialize;

use crate::jitter::Jitter;

pub const CELL_RESOLUTION: Resolution = Resolution::Nine;

const SAMPLES_PER_HOTSPOT: usize = 10;
const HOTSPOT_SCATTER_DEG: f64 = 0.015;
const BACKGROUND_SAMPLES: usize = 30;
const BACKGROUND_SCATTER_DEG: f64 = 0.3;
const CITY_CENTER: (f64, f64) = (12.97, 77.59);

struct Hotspot {
    lat: f64,
    lng: f64,
    base: f64,
    variation: f64,
    /// Inclusive hour windows.
    peaks: &'static [(u32, u32)],
}

const HOTSPOTS: &[Hotspot] = &[
    Hotspot { lat: 12.9716, lng: 77.5946, base: 0.7, variation: 0.3, peaks: &[(18, 21)] }, // MG Road
    Hotspot { lat: 12.9758, lng: 77.6055, base: 0.8, variation: 0.4, peaks: &[(19, 23)] }, // Brigade Road
    Hotspot { lat: 12.9815, lng: 77.6082, base: 0.6, variation: 0.3, peaks: &[(11, 19)] }, // Commercial Street
    Hotspot { lat: 12.9698, lng: 77.7499, base: 0.6, variation: 0.4, peaks: &[(8, 10), (17, 19)] }, // Whitefield
    Hotspot { lat: 12.9569, lng: 77.7011, base: 0.7, variation: 0.5, peaks: &[(8, 11), (17, 20)] }, // Marathahalli
    Hotspot { lat: 12.8456, lng: 77.6651, base: 0.5, variation: 0.4, peaks: &[(8, 10), (17, 19)] }, // Electronic City
    Hotspot { lat: 12.9782, lng: 77.6408, base: 0.5, variation: 0.3, peaks: &[(18, 22)] }, // Indiranagar
    Hotspot { lat: 12.9348, lng: 77.6264, base: 0.6, variation: 0.3, peaks: &[(19, 23)] }, // Koramangala
    Hotspot { lat: 12.9302, lng: 77.5834, base: 0.5, variation: 0.2, peaks: &[(17, 21)] }, // Jayanagar
    Hotspot { lat: 12.9116, lng: 77.6473, base: 0.4, variation: 0.2, peaks: &[(19, 22)] }, // HSR Layout
    Hotspot { lat: 12.9784, lng: 77.5778, base: 0.7, variation: 0.4, peaks: &[(7, 10), (17, 20)] }, // Majestic
    Hotspot { lat: 13.0256, lng: 77.5485, base: 0.4, variation: 0.3, peaks: &[(7, 10), (17, 19)] }, // Yeshwanthpur
    Hotspot { lat: 12.9185, lng: 77.6198, base: 0.5, variation: 0.3, peaks: &[(8, 10), (18, 20)] }, // Madiwala
    Hotspot { lat: 12.9167, lng: 77.6100, base: 0.4, variation: 0.2, peaks: &[(18, 22)] }, // BTM Layout
    Hotspot { lat: 12.9254, lng: 77.5468, base: 0.3, variation: 0.2, peaks: &[(17, 20)] }, // Banashankari
    Hotspot { lat: 12.9416, lng: 77.5733, base: 0.3, variation: 0.2, peaks: &[(17, 20)] }, // Basavanagudi
    Hotspot { lat: 12.9818, lng: 77.6023, base: 0.6, variation: 0.3, peaks: &[(10, 19)] }, // Shivajinagar
    Hotspot { lat: 12.9789, lng: 77.6214, base: 0.3, variation: 0.2, peaks: &[(17, 20)] }, // Ulsoor
    Hotspot { lat: 13.1007, lng: 77.5963, base: 0.2, variation: 0.1, peaks: &[(8, 10), (17, 19)] }, // Yelahanka
    Hotspot { lat: 12.9065, lng: 77.4833, base: 0.2, variation: 0.1, peaks: &[(8, 10), (17, 19)] }, // Kengeri
];

/// Crowd scaling for the hour of day, boosted on weekends.
pub fn time_multiplier(hour: u32, weekend: bool) -> f64 {
    let mut m = match hour {
        7..=9 => 0.8,
        17..=19 => 0.9,
        20..=23 => 1.2,
        0..=5 => 0.3,
        12..=14 => 1.1,
        _ => 1.0,
    };
    if weekend {
        m *= 1.3;
        if (11..=18).contains(&hour) {
            m *= 1.2;
        }
    }
    m
}

pub fn is_weekend(at: &NaiveDateTime) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatSample {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

pub fn crowd_samples(hour: u32, weekend: bool, jitter: &mut impl Jitter) -> Vec<HeatSample> {
    let time = time_multiplier(hour, weekend);
    let mut samples = Vec::with_capacity(HOTSPOTS.len() * SAMPLES_PER_HOTSPOT + BACKGROUND_SAMPLES);

    for spot in HOTSPOTS {
        let peak = spot.peaks.iter().any(|&(from, to)| (from..=to).contains(&hour));
        let base = spot.base * time * if peak { 1.3 } else { 1.0 };
        for _ in 0..SAMPLES_PER_HOTSPOT {
            samples.push(HeatSample {
                lat: spot.lat + jitter.offset(HOTSPOT_SCATTER_DEG),
                lng: spot.lng + jitter.offset(HOTSPOT_SCATTER_DEG),
                intensity: (base + jitter.offset(spot.variation)).clamp(0.1, 1.0),
            });
        }
    }

    for _ in 0..BACKGROUND_SAMPLES {
        let intensity = (0.2 + jitter.unit() * 0.4) * time;
        samples.push(HeatSample {
            lat: CITY_CENTER.0 + jitter.offset(BACKGROUND_SCATTER_DEG),
            lng: CITY_CENTER.1 + jitter.offset(BACKGROUND_SCATTER_DEG),
            intensity: intensity.min(1.0),
        });
    }

    samples
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    pub cell: String,
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

/// Max intensity per H3 cell.
#[derive(Debug, Default)]
pub struct CrowdGrid {
    cells: HashMap<CellIndex, f64>,
}

impl CrowdGrid {
    pub fn from_samples(samples: &[HeatSample]) -> Self {
        let mut cells: HashMap<CellIndex, f64> = HashMap::new();
        for s in samples {
            // out-of-range coordinates are dropped
            let Ok(ll) = LatLng::new(s.lat, s.lng) else {
                continue;
            };
            let slot = cells.entry(ll.to_cell(CELL_RESOLUTION)).or_insert(0.0);
            *slot = slot.max(s.intensity);
        }
        Self { cells }
    }

    /// Cells with their centers, densest first.
    pub fn cells(&self) -> Vec<HeatCell> {
        let mut out: Vec<HeatCell> = self
            .cells
            .iter()
            .map(|(cell, &intensity)| {
                let center = LatLng::from(*cell);
                HeatCell {
                    cell: cell.to_string(),
                    lat: center.lat(),
                    lng: center.lng(),
                    intensity,
                }
            })
            .collect();
        out.sort_by(|a, b| b.intensity.total_cmp(&a.intensity).then_with(|| a.cell.cmp(&b.cell)));
        out
    }
}

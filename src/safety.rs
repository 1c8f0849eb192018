//! Deterministic safety scoring.
//!
//! Every metric here is a heuristic estimate derived from route length,
//! the number of nearby police stations and the hour of day. Nothing reads
//! the clock or a random source; callers pass the hour in.

use serde::{Deserialize, Serialize};

use crate::model::SafetyAssessment;

/// Global constants of the scoring model.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    pub cctv_base: f64,
    pub cctv_per_km: f64,
    pub cctv_per_station: f64,
    pub lighting_base: f64,
    pub lighting_per_station: f64,
    pub lighting_cap: f64,
    pub lighting_night_factor: f64,
    pub crowd_base: f64,
    pub crowd_per_station: f64,
    pub crowd_cap: f64,
    pub crowd_night_factor: f64,
    /// First hour of the evening counted as night.
    pub night_from: u32,
    /// Last morning hour still counted as night.
    pub night_until: u32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            cctv_base: 0.0,
            cctv_per_km: 1.5,
            cctv_per_station: 2.0,
            lighting_base: 40.0,
            lighting_per_station: 3.0,
            lighting_cap: 95.0,
            lighting_night_factor: 0.7,
            crowd_base: 35.0,
            crowd_per_station: 4.0,
            crowd_cap: 90.0,
            crowd_night_factor: 0.6,
            night_from: 20,
            night_until: 6,
        }
    }
}

impl ScoringParams {
    pub fn is_night(&self, hour: u32) -> bool {
        hour >= self.night_from || hour <= self.night_until
    }
}

/// Per-route adjustments layered on top of [`ScoringParams`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub lighting_bonus: f64,
    pub crowd_bonus: f64,
    pub score_multiplier: f64,
    pub cruise_kmh: f64,
}

impl ScoringProfile {
    pub const NEUTRAL: Self = Self {
        lighting_bonus: 0.0,
        crowd_bonus: 0.0,
        score_multiplier: 1.0,
        cruise_kmh: 28.0,
    };
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

const POLICE_SCORE_MAX: f64 = 3.0;
const LIGHTING_SCORE_MAX: f64 = 3.0;
const CROWD_SCORE_MAX: f64 = 2.0;
const CCTV_SCORE_MAX: f64 = 2.0;
const CCTV_FULL_COVERAGE: f64 = 20.0;
const SCORE_MAX: f64 = 10.0;

pub fn assess(
    route_length_km: f64,
    nearby_count: usize,
    hour: u32,
    profile: &ScoringProfile,
    params: &ScoringParams,
) -> SafetyAssessment {
    let length = route_length_km.max(0.0);
    let n = nearby_count as f64;
    let night = params.is_night(hour);

    let cctv = (params.cctv_base + length * params.cctv_per_km + n * params.cctv_per_station)
        .floor()
        .max(0.0);

    let mut lighting = (params.lighting_base + n * params.lighting_per_station + profile.lighting_bonus)
        .min(params.lighting_cap);
    let mut crowd =
        (params.crowd_base + n * params.crowd_per_station + profile.crowd_bonus).min(params.crowd_cap);
    if night {
        lighting *= params.lighting_night_factor;
        crowd *= params.crowd_night_factor;
    }
    let lighting = lighting.clamp(0.0, 100.0).round();
    let crowd = crowd.clamp(0.0, 100.0).round();

    let police_score = (n * 0.3).min(POLICE_SCORE_MAX);
    let lighting_score = (lighting / 100.0 * LIGHTING_SCORE_MAX).min(LIGHTING_SCORE_MAX);
    let crowd_score = (crowd / 100.0 * CROWD_SCORE_MAX).min(CROWD_SCORE_MAX);
    let cctv_score = (cctv / CCTV_FULL_COVERAGE * CCTV_SCORE_MAX).min(CCTV_SCORE_MAX);

    let raw = (police_score + lighting_score + crowd_score + cctv_score) * profile.score_multiplier;
    let safety_score = round1(raw.clamp(0.0, SCORE_MAX));

    let estimated_minutes = if profile.cruise_kmh > 0.0 {
        (length / profile.cruise_kmh * 60.0).floor() as u32
    } else {
        0
    };

    let mut risk_notes = Vec::new();
    if nearby_count < 2 {
        risk_notes.push(format!("Limited police presence ({nearby_count} stations)"));
    }
    if lighting < 60.0 {
        risk_notes.push(format!("Poorly lit areas ({lighting}% well-lit)"));
    }
    if crowd < 50.0 {
        risk_notes.push(format!("Low crowd visibility ({crowd}% populated)"));
    }
    if length > 10.0 && nearby_count < 4 {
        risk_notes.push("Long stretches with limited surveillance".to_string());
    }
    if night {
        risk_notes.push("Night time travel - extra caution advised".to_string());
    }

    let mut safe_notes = Vec::new();
    if nearby_count >= 3 {
        safe_notes.push(format!("Good police coverage ({nearby_count} stations nearby)"));
    }
    if lighting >= 75.0 {
        safe_notes.push(format!("Well-lit route ({lighting}% well-lit)"));
    }
    if crowd >= 70.0 {
        safe_notes.push(format!("Populated areas ({crowd}% crowded)"));
    }
    if cctv >= 15.0 {
        safe_notes.push(format!("Good CCTV coverage ({cctv} cameras estimated)"));
    }

    SafetyAssessment {
        police_station_count: nearby_count as u32,
        estimated_cctv_count: cctv as u32,
        lighting_percent: lighting as u32,
        crowd_percent: crowd as u32,
        safety_score,
        route_length_km: length,
        estimated_minutes,
        risk_notes,
        safe_notes,
        police_score: round1(police_score),
        lighting_score: round1(lighting_score),
        crowd_score: round1(crowd_score),
        cctv_score: round1(cctv_score),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Display band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBand {
    VerySafe,
    Safe,
    ModeratelySafe,
    NeedsCaution,
}

impl ScoreBand {
    pub fn of(score: f64) -> Self {
        if score >= 8.0 {
            Self::VerySafe
        } else if score >= 7.0 {
            Self::Safe
        } else if score >= 6.0 {
            Self::ModeratelySafe
        } else {
            Self::NeedsCaution
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VerySafe => "Very Safe",
            Self::Safe => "Safe",
            Self::ModeratelySafe => "Moderately Safe",
            Self::NeedsCaution => "Needs Caution",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::VerySafe => "#28A745",
            Self::Safe => "#FFC107",
            Self::ModeratelySafe => "#FF9800",
            Self::NeedsCaution => "#DC3545",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn neutral(len: f64, n: usize, hour: u32) -> SafetyAssessment {
        assess(len, n, hour, &ScoringProfile::NEUTRAL, &ScoringParams::default())
    }

    #[test]
    fn afternoon_five_km_three_stations() {
        let a = neutral(5.0, 3, 14);
        assert_eq!(a.estimated_cctv_count, 13);
        assert_eq!(a.lighting_percent, 49);
        assert_eq!(a.crowd_percent, 47);
        assert_eq!(a.police_station_count, 3);
        assert_eq!(a.estimated_minutes, 10);
        assert!((a.safety_score - 4.6).abs() < 1e-9, "got {}", a.safety_score);
        assert_eq!(
            a.risk_notes,
            vec!["Poorly lit areas (49% well-lit)", "Low crowd visibility (47% populated)"]
        );
        assert_eq!(a.safe_notes, vec!["Good police coverage (3 stations nearby)"]);
    }

    #[test]
    fn night_dims_lighting_and_crowd() {
        let a = neutral(2.0, 0, 22);
        assert_eq!(a.lighting_percent, 28);
        assert_eq!(a.crowd_percent, 21);
        assert!(a.risk_notes.iter().any(|n| n.starts_with("Night time travel")));
        assert!(a.risk_notes.iter().any(|n| n.starts_with("Limited police presence (0")));
    }

    #[test]
    fn night_window_edges() {
        let params = ScoringParams::default();
        assert!(params.is_night(6));
        assert!(!params.is_night(7));
        assert!(!params.is_night(19));
        assert!(params.is_night(20));
        assert!(params.is_night(0));
    }

    #[test]
    fn lighting_and_crowd_are_capped() {
        let a = neutral(1.0, 25, 12);
        assert_eq!(a.lighting_percent, 95);
        assert_eq!(a.crowd_percent, 90);
        assert_eq!(a.police_score, 3.0);
    }

    #[test]
    fn long_sparse_route_is_flagged() {
        let a = neutral(12.0, 1, 10);
        assert!(a.risk_notes.contains(&"Long stretches with limited surveillance".to_string()));
        assert!(a.safe_notes.contains(&"Good CCTV coverage (20 cameras estimated)".to_string()));
    }

    #[test]
    fn profile_bonus_and_multiplier_apply() {
        let safest = ScoringProfile {
            lighting_bonus: 20.0,
            crowd_bonus: 15.0,
            score_multiplier: 1.2,
            cruise_kmh: 28.0,
        };
        let a = assess(5.0, 3, 14, &safest, &ScoringParams::default());
        assert_eq!(a.lighting_percent, 69);
        assert_eq!(a.crowd_percent, 62);
        // (0.9 + 2.07 + 1.24 + 1.3) * 1.2 = 6.612
        assert!((a.safety_score - 6.6).abs() < 1e-9, "got {}", a.safety_score);
    }

    #[test]
    fn zero_speed_profile_reports_no_eta() {
        let profile = ScoringProfile { cruise_kmh: 0.0, ..ScoringProfile::NEUTRAL };
        assert_eq!(assess(5.0, 0, 12, &profile, &ScoringParams::default()).estimated_minutes, 0);
    }

    #[test]
    fn score_bands() {
        assert_eq!(ScoreBand::of(8.0), ScoreBand::VerySafe);
        assert_eq!(ScoreBand::of(7.9).label(), "Safe");
        assert_eq!(ScoreBand::of(6.0).color(), "#FF9800");
        assert_eq!(ScoreBand::of(0.0), ScoreBand::NeedsCaution);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        #[test]
        fn score_stays_in_range(
            len in 0.0f64..200.0,
            n in 0usize..=27,
            hour in 0u32..24,
            multiplier in 0.0f64..3.0,
            bonus in 0.0f64..60.0,
        ) {
            let profile = ScoringProfile {
                lighting_bonus: bonus,
                crowd_bonus: bonus,
                score_multiplier: multiplier,
                cruise_kmh: 28.0,
            };
            let a = assess(len, n, hour, &profile, &ScoringParams::default());
            prop_assert!((0.0..=10.0).contains(&a.safety_score));
            prop_assert!(a.lighting_percent <= 95);
            prop_assert!(a.crowd_percent <= 90);
        }

        #[test]
        fn same_inputs_same_output(len in 0.0f64..200.0, n in 0usize..30, hour in 0u32..24) {
            prop_assert_eq!(neutral(len, n, hour), neutral(len, n, hour));
        }
    }
}

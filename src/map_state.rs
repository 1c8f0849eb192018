//! Layer state for the map view.
//!
//! The renderer owns a [`MapState`] value and feeds it [`MapEvent`]s; each
//! event yields the next state plus an optional message for the host screen.

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::model::{GeoPoint, NearbyStation, RoutePath, SafetyAssessment};

const SELECTED_STYLE: (f64, u32) = (0.9, 8);
const UNSELECTED_STYLE: (f64, u32) = (0.3, 4);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLayer {
    pub label: String,
    pub color: String,
    pub path: RoutePath,
    pub opacity: f64,
    pub weight: u32,
    #[serde(default)]
    pub dashed: bool,
    #[serde(default)]
    pub assessment: Option<SafetyAssessment>,
    #[serde(default)]
    pub stations: Vec<NearbyStation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Both corners are valid coordinates and south-west is below and left of north-east.
    pub fn is_valid(&self) -> bool {
        GeoPoint::new(self.south, self.west).is_valid()
            && GeoPoint::new(self.north, self.east).is_valid()
            && self.south <= self.north
            && self.west <= self.east
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude) && (self.west..=self.east).contains(&point.longitude)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapState {
    pub routes: Vec<RouteLayer>,
    pub selected: Option<usize>,
    /// Stations drawn along the selected route.
    pub route_markers: Vec<NearbyStation>,
    pub police_visible: bool,
    pub heatmap_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapEvent {
    ShowRoutes { routes: Vec<RouteLayer> },
    SelectRoute { index: usize },
    TogglePolice,
    ToggleHeatmap,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapMessage {
    RoutesReady { count: usize },
    RouteSelected { index: usize, label: String, analysis: SafetyAssessment },
    PoliceToggled { visible: bool },
    HeatmapToggled { visible: bool },
}

impl MapState {
    pub fn apply(self, event: MapEvent) -> (MapState, Option<MapMessage>) {
        match event {
            MapEvent::ShowRoutes { routes } => {
                let count = routes.len();
                let state = MapState { routes, selected: None, route_markers: Vec::new(), ..self };
                if count == 0 {
                    return (state, Some(MapMessage::RoutesReady { count }));
                }
                let (state, _) = state.select(0);
                (state, Some(MapMessage::RoutesReady { count }))
            }
            MapEvent::SelectRoute { index } => self.select(index),
            MapEvent::TogglePolice => {
                let visible = !self.police_visible;
                (MapState { police_visible: visible, ..self }, Some(MapMessage::PoliceToggled { visible }))
            }
            MapEvent::ToggleHeatmap => {
                let visible = !self.heatmap_visible;
                (MapState { heatmap_visible: visible, ..self }, Some(MapMessage::HeatmapToggled { visible }))
            }
            MapEvent::Clear => (
                MapState {
                    police_visible: self.police_visible,
                    heatmap_visible: self.heatmap_visible,
                    ..MapState::default()
                },
                None,
            ),
        }
    }

    fn select(mut self, index: usize) -> (MapState, Option<MapMessage>) {
        if index >= self.routes.len() {
            return (self, None);
        }
        for (i, layer) in self.routes.iter_mut().enumerate() {
            let (opacity, weight) = if i == index { SELECTED_STYLE } else { UNSELECTED_STYLE };
            layer.opacity = opacity;
            layer.weight = weight;
        }
        let layer = &self.routes[index];
        let message = MapMessage::RouteSelected {
            index,
            label: layer.label.clone(),
            analysis: SafetyAssessment::or_placeholder(layer.assessment.as_ref()),
        };
        self.route_markers = layer.stations.clone();
        self.selected = Some(index);
        (self, Some(message))
    }

    /// Box around the selected route, padded by `pad` of its size per side.
    pub fn selected_bounds(&self, pad: f64) -> Option<Bounds> {
        let layer = self.routes.get(self.selected?)?;
        path_bounds(&layer.path, pad)
    }
}

pub fn path_bounds(path: &[GeoPoint], pad: f64) -> Option<Bounds> {
    let line: LineString<f64> = path
        .iter()
        .map(|p| Coord { x: p.longitude, y: p.latitude })
        .collect();
    let rect = line.bounding_rect()?;
    let dx = rect.width() * pad;
    let dy = rect.height() * pad;
    Some(Bounds {
        south: rect.min().y - dy,
        west: rect.min().x - dx,
        north: rect.max().y + dy,
        east: rect.max().x + dx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PoliceStation;

    fn layer(label: &str, score: Option<f64>) -> RouteLayer {
        RouteLayer {
            label: label.to_string(),
            color: "#28a745".to_string(),
            path: vec![GeoPoint::new(12.90, 77.50), GeoPoint::new(13.00, 77.60)],
            opacity: 0.6,
            weight: 6,
            dashed: false,
            assessment: score.map(|s| SafetyAssessment { safety_score: s, ..Default::default() }),
            stations: vec![NearbyStation {
                station: PoliceStation::new(format!("{label} station"), 12.95, 77.55),
                distance_km: 0.4,
            }],
        }
    }

    fn shown() -> MapState {
        let routes = vec![layer("Safest Route", Some(7.2)), layer("Balanced Route", None)];
        MapState::default().apply(MapEvent::ShowRoutes { routes }).0
    }

    #[test]
    fn showing_routes_selects_the_first() {
        let (state, msg) = MapState::default()
            .apply(MapEvent::ShowRoutes { routes: vec![layer("Safest Route", Some(7.2))] });
        assert_eq!(msg, Some(MapMessage::RoutesReady { count: 1 }));
        assert_eq!(state.selected, Some(0));
        assert_eq!(state.routes[0].opacity, 0.9);
        assert_eq!(state.route_markers.len(), 1);
    }

    #[test]
    fn selecting_restyles_layers() {
        let (state, msg) = shown().apply(MapEvent::SelectRoute { index: 1 });
        assert_eq!(state.selected, Some(1));
        assert_eq!((state.routes[0].opacity, state.routes[0].weight), (0.3, 4));
        assert_eq!((state.routes[1].opacity, state.routes[1].weight), (0.9, 8));
        assert_eq!(state.route_markers[0].station.name, "Balanced Route station");
        match msg {
            Some(MapMessage::RouteSelected { index, analysis, .. }) => {
                assert_eq!(index, 1);
                // no assessment on this layer
                assert_eq!(analysis, SafetyAssessment::placeholder());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let before = shown();
        let (after, msg) = before.clone().apply(MapEvent::SelectRoute { index: 5 });
        assert_eq!(after, before);
        assert!(msg.is_none());
    }

    #[test]
    fn toggles_flip_and_report() {
        let (state, msg) = MapState::default().apply(MapEvent::TogglePolice);
        assert!(state.police_visible);
        assert_eq!(msg, Some(MapMessage::PoliceToggled { visible: true }));
        let (state, msg) = state.apply(MapEvent::TogglePolice);
        assert!(!state.police_visible);
        assert_eq!(msg, Some(MapMessage::PoliceToggled { visible: false }));
        let (state, _) = state.apply(MapEvent::ToggleHeatmap);
        assert!(state.heatmap_visible);
    }

    #[test]
    fn clear_keeps_layer_toggles() {
        let (state, _) = shown().apply(MapEvent::TogglePolice);
        let (state, msg) = state.apply(MapEvent::Clear);
        assert!(msg.is_none());
        assert!(state.routes.is_empty());
        assert!(state.route_markers.is_empty());
        assert_eq!(state.selected, None);
        assert!(state.police_visible);
    }

    #[test]
    fn bounds_are_padded() {
        let b = shown().selected_bounds(0.1).unwrap();
        assert!((b.south - 12.89).abs() < 1e-9);
        assert!((b.east - 77.61).abs() < 1e-9);
        assert!(path_bounds(&[], 0.1).is_none());
    }

    #[test]
    fn bounds_validity_and_containment() {
        let area = Bounds { south: 12.9, west: 77.5, north: 13.0, east: 77.7 };
        assert!(area.is_valid());
        assert!(area.contains(&GeoPoint::new(12.9758, 77.6055)));
        assert!(!area.contains(&GeoPoint::new(13.1007, 77.5963)));
        assert!(!Bounds { south: 13.0, north: 12.9, ..area }.is_valid());
        assert!(!Bounds { east: f64::NAN, ..area }.is_valid());
    }

    #[test]
    fn events_use_host_message_names() {
        let event: MapEvent = serde_json::from_str(r#"{"type":"SELECT_ROUTE","index":2}"#).unwrap();
        assert_eq!(event, MapEvent::SelectRoute { index: 2 });
        let json = serde_json::to_value(MapMessage::PoliceToggled { visible: true }).unwrap();
        assert_eq!(json["type"], "POLICE_TOGGLED");
    }
}

use landview_shared::LatLng;
use landview_shared::format::{format_area, format_distance};
use landview_shared::geo::{Position, haversine_distance_m, polygon_area_sqm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureMode {
    #[default]
    Off,
    Distance,
    Area,
}

impl MeasureMode {
    pub fn label(self) -> &'static str {
        match self {
            MeasureMode::Off => "Off",
            MeasureMode::Distance => "Distance",
            MeasureMode::Area => "Area",
        }
    }
}

/// Points clicked on the map while a measurement mode is active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureTool {
    mode: MeasureMode,
    points: Vec<LatLng>,
}

impl MeasureTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> MeasureMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != MeasureMode::Off
    }

    /// Switching mode always starts a fresh measurement.
    pub fn set_mode(&mut self, mode: MeasureMode) {
        self.mode = mode;
        self.points.clear();
    }

    /// Returns false when no mode is active.
    pub fn add_point(&mut self, point: LatLng) -> bool {
        if !self.is_active() {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn undo(&mut self) -> Option<LatLng> {
        self.points.pop()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn distance_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| haversine_distance_m(w[0], w[1]))
            .sum()
    }

    pub fn area_sqm(&self) -> f64 {
        let ring: Vec<Position> = self.points.iter().map(|p| [p.lng, p.lat]).collect();
        polygon_area_sqm(&ring)
    }

    /// Formatted result, once enough points exist for the current mode.
    pub fn result(&self) -> Option<String> {
        match self.mode {
            MeasureMode::Off => None,
            MeasureMode::Distance if self.points.len() >= 2 => {
                Some(format_distance(self.distance_m()))
            }
            MeasureMode::Area if self.points.len() >= 3 => Some(format_area(self.area_sqm())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_mode_ignores_clicks() {
        let mut tool = MeasureTool::new();
        assert!(!tool.add_point(LatLng::new(0.0, 0.0)));
        assert!(tool.points().is_empty());
        assert_eq!(tool.result(), None);
    }

    #[test]
    fn distance_needs_two_points() {
        let mut tool = MeasureTool::new();
        tool.set_mode(MeasureMode::Distance);
        tool.add_point(LatLng::new(0.0, 0.0));
        assert_eq!(tool.result(), None);
        tool.add_point(LatLng::new(0.0, 0.001));
        // 0.001° of longitude at the equator is about 111 m.
        assert_eq!(tool.result().as_deref(), Some("111 m"));
        tool.add_point(LatLng::new(0.0, 0.02));
        assert_eq!(tool.result().as_deref(), Some("2.22 km"));
    }

    #[test]
    fn area_needs_three_points() {
        let mut tool = MeasureTool::new();
        tool.set_mode(MeasureMode::Area);
        tool.add_point(LatLng::new(0.0, 0.0));
        tool.add_point(LatLng::new(0.0, 0.001));
        assert_eq!(tool.result(), None);
        tool.add_point(LatLng::new(0.001, 0.001));
        tool.add_point(LatLng::new(0.001, 0.0));
        // 12,392 m² falls in the hectare band.
        assert_eq!(tool.result().as_deref(), Some("1.24 hectares"));
    }

    #[test]
    fn mode_change_and_clear_reset_points() {
        let mut tool = MeasureTool::new();
        tool.set_mode(MeasureMode::Distance);
        tool.add_point(LatLng::new(0.0, 0.0));
        tool.add_point(LatLng::new(1.0, 1.0));
        assert_eq!(tool.undo(), Some(LatLng::new(1.0, 1.0)));
        tool.set_mode(MeasureMode::Area);
        assert!(tool.points().is_empty());
        tool.add_point(LatLng::new(0.0, 0.0));
        tool.clear();
        assert!(tool.points().is_empty());
        assert_eq!(tool.mode(), MeasureMode::Area);
    }
}

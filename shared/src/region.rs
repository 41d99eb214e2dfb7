use serde::{Deserialize, Serialize};

use crate::colors::region_color_hex;
use crate::geo::FocusRequest;

/// One of the administrative regions the viewer knows about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub name: &'static str,
    /// Map view used by the region's focus button.
    pub focus: FocusRequest,
}

impl Region {
    pub fn color_hex(&self) -> &'static str {
        region_color_hex(self.name)
    }
}

pub const KNOWN_REGIONS: [Region; 3] = [
    Region {
        name: "Dar es Salaam",
        focus: FocusRequest::new(-6.7924, 39.2083, 13.0),
    },
    Region {
        name: "Arusha",
        focus: FocusRequest::new(-3.3869, 36.6830, 12.0),
    },
    Region {
        name: "Bagamoyo",
        focus: FocusRequest::new(-6.4429, 38.9019, 12.0),
    },
];

/// Whole-country view shown before anything else is focused.
pub const INITIAL_VIEW: FocusRequest = FocusRequest::new(-6.369028, 34.888822, 6.0);

pub fn find_region(name: &str) -> Option<&'static Region> {
    KNOWN_REGIONS.iter().find(|r| r.name == name)
}

/// Ordered region → enabled flags. Only known regions ever appear here, so
/// features from any other region are never rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFilterState {
    entries: Vec<(String, bool)>,
}

impl Default for RegionFilterState {
    fn default() -> Self {
        Self {
            entries: KNOWN_REGIONS
                .iter()
                .map(|r| (r.name.to_string(), true))
                .collect(),
        }
    }
}

impl RegionFilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a region's flag. Returns false (and changes nothing) for unknown names.
    pub fn toggle(&mut self, name: &str) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, enabled)) => {
                *enabled = !*enabled;
                true
            }
            None => false,
        }
    }

    /// Set a region's flag. Returns true if the flag changed.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, flag)) if *flag != enabled => {
                *flag = enabled;
                true
            }
            _ => false,
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, enabled)| *enabled && n == name)
    }

    pub fn enabled_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), *e))
    }

    pub fn enabled_count(&self) -> usize {
        self.entries.iter().filter(|(_, e)| *e).count()
    }

    /// Apply flags restored from a previous session. Names that are no longer
    /// known are dropped; known regions missing from `saved` keep their flag.
    pub fn restore_from(&mut self, saved: &RegionFilterState) {
        for (name, enabled) in saved.iter() {
            self.set(name, enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_all_known_regions_enabled_in_order() {
        let state = RegionFilterState::new();
        assert_eq!(
            state.enabled_names(),
            vec!["Dar es Salaam", "Arusha", "Bagamoyo"]
        );
        assert_eq!(state.enabled_count(), 3);
    }

    #[test]
    fn toggle_flips_and_preserves_order() {
        let mut state = RegionFilterState::new();
        assert!(state.toggle("Arusha"));
        assert!(!state.is_enabled("Arusha"));
        assert_eq!(state.enabled_names(), vec!["Dar es Salaam", "Bagamoyo"]);
        assert!(state.toggle("Arusha"));
        assert_eq!(
            state.enabled_names(),
            vec!["Dar es Salaam", "Arusha", "Bagamoyo"]
        );
    }

    #[test]
    fn unknown_regions_are_ignored() {
        let mut state = RegionFilterState::new();
        assert!(!state.toggle("Dodoma"));
        assert!(!state.is_enabled("Dodoma"));
        assert_eq!(state, RegionFilterState::new());
    }

    #[test]
    fn restore_keeps_only_known_regions() {
        let saved: RegionFilterState = serde_json::from_str(
            r#"{"entries": [["Arusha", false], ["Dodoma", true]]}"#,
        )
        .expect("parse");
        let mut state = RegionFilterState::new();
        state.restore_from(&saved);
        assert_eq!(state.enabled_names(), vec!["Dar es Salaam", "Bagamoyo"]);
        assert!(!state.is_enabled("Dodoma"));
    }

    #[test]
    fn region_focus_views() {
        let dar = find_region("Dar es Salaam").expect("known");
        assert_eq!(dar.focus.zoom, 13.0);
        assert_eq!(dar.color_hex(), "#10B981");
        assert_eq!(find_region("Arusha").map(|r| r.focus.zoom), Some(12.0));
        assert!(find_region("Mwanza").is_none());
    }
}

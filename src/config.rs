//! Persisted settings
//!
//! Small RON file next to the executable; any load problem falls back to
//! defaults so a missing or stale file never blocks startup.

use serde::{Deserialize, Serialize};

use crate::math::{DEFAULT_ZOOM_LEVEL, NUM_ZOOM_LEVELS};

pub const SETTINGS_PATH: &str = "settings.ron";

/// Pit sizes selectable on the start screen: 3x3, 4x4, 5x5.
pub const PIT_SIZES: [usize; 3] = [3, 4, 5];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Index into `PIT_SIZES`.
    pub pit_size: usize,
    /// Index into `math::ZOOM_LUT`.
    pub zoom_level: usize,
    /// Falling piece draw mode: wireframe when true, corner points when
    /// false.
    pub wireframe: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pit_size: 2,
            zoom_level: DEFAULT_ZOOM_LEVEL,
            wireframe: true,
        }
    }
}

impl Settings {
    /// Clamp indices that may come from an edited file.
    fn sanitized(mut self) -> Self {
        self.pit_size = self.pit_size.min(PIT_SIZES.len() - 1);
        self.zoom_level = self.zoom_level.min(NUM_ZOOM_LEVELS - 1);
        self
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        match std::fs::read_to_string(SETTINGS_PATH) {
            Ok(text) => match ron::from_str::<Settings>(&text) {
                Ok(settings) => settings.sanitized(),
                Err(e) => {
                    eprintln!("Ignoring malformed {}: {}", SETTINGS_PATH, e);
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        Settings::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<(), String> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        std::fs::write(SETTINGS_PATH, text)
            .map_err(|e| format!("Failed to write {}: {}", SETTINGS_PATH, e))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_through_ron() {
        let s = Settings {
            pit_size: 1,
            zoom_level: 5,
            wireframe: false,
        };
        let text = ron::ser::to_string_pretty(&s, ron::ser::PrettyConfig::default()).unwrap();
        let back: Settings = ron::from_str(&text).unwrap();
        assert_eq!(back.pit_size, 1);
        assert_eq!(back.zoom_level, 5);
        assert!(!back.wireframe);
    }

    #[test]
    fn sanitize_clamps_out_of_range_indices() {
        let s = Settings {
            pit_size: 99,
            zoom_level: 99,
            wireframe: true,
        }
        .sanitized();
        assert_eq!(s.pit_size, PIT_SIZES.len() - 1);
        assert_eq!(s.zoom_level, NUM_ZOOM_LEVELS - 1);
    }
}

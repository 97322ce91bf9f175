//! JSON configuration file for the sensor.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tracker::{
    ColorRange, ConfigError, DetectionMode, MAX_HUE, SessionConfig, TrackerParams,
};

use super::wind_speed::{FilterSettings, WindSpeedModel};

/// Contents of `config.json`.
///
/// Only `mode` is mandatory. Which color ranges must be present depends on
/// the mode and is checked when a session is started, never defaulted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// Camera device index, used by the acquisition layer.
    #[serde(default)]
    pub camera_index: u32,
    pub mode: DetectionMode,
    #[serde(default)]
    pub ball_colors: BallColors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rod_color: Option<ColorRange>,
    /// Ground-truth serial link, used by the logging layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<SerialSettings>,
    /// Per-side angle to wind speed calibration (`"left"`, `"right"`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conversion_params: BTreeMap<String, WindSpeedModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub butterworth_filter: Option<FilterSettings>,
    #[serde(default)]
    pub detection: TrackerParams,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct BallColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<ColorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving: Option<ColorRange>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
}

impl SensorConfig {
    /// Minimal configuration for the given mode, with no color ranges.
    pub fn new(mode: DetectionMode) -> Self {
        Self {
            camera_index: 0,
            mode,
            ball_colors: BallColors::default(),
            rod_color: None,
            serial: None,
            conversion_params: BTreeMap::new(),
            butterworth_filter: None,
            detection: TrackerParams::default(),
        }
    }

    /// Parse a config. Hues above 179 are rejected here, before any session sees them.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check_hues()?;
        Ok(config)
    }

    fn check_hues(&self) -> Result<(), ConfigError> {
        let ranges = [
            ("pivot", self.ball_colors.pivot),
            ("moving", self.ball_colors.moving),
            ("rod", self.rod_color),
        ];
        for (role, range) in ranges {
            if let Some(hue) = range.map(|r| r.max_hue()).filter(|&h| h > MAX_HUE) {
                return Err(ConfigError::HueOutOfRange { role, hue });
            }
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&fs::read_to_string(path)?)?;
        log::info!("loaded {} config from {}", config.mode, path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_json_string()?)?;
        Ok(())
    }

    /// Mode and ranges to start a session with.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mode: self.mode,
            pivot: self.ball_colors.pivot,
            moving: self.ball_colors.moving,
            rod: self.rod_color,
        }
    }

    /// Wind speed calibration for one side of the tunnel.
    pub fn wind_speed_model(&self, side: &str) -> Result<WindSpeedModel, ConfigError> {
        self.conversion_params
            .get(side)
            .copied()
            .ok_or_else(|| ConfigError::UnknownSide(side.to_string()))
    }
}

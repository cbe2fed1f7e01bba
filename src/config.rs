//! Configuration loading for GatiDrive

use crate::error::{DriveError, Result};
use crate::navigation::NavigationStrategy;
use crate::sim::SimConfig;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DriveConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub travel: TravelConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

/// Control loop settings
#[derive(Clone, Debug, Deserialize)]
pub struct ControlConfig {
    /// Control tick frequency in Hz (default: 50.0)
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f32,
}

/// Straight-line travel parameters
#[derive(Clone, Debug, Deserialize)]
pub struct TravelConfig {
    /// Base drive speed, normalized [0, 1] (default: 0.4)
    #[serde(default = "default_travel_base_speed")]
    pub base_speed: f32,

    /// Extra distance added to the target to counter mechanical coast (mm)
    #[serde(default = "default_overshoot_mm")]
    pub overshoot_mm: f32,

    /// Proportional gain on the left/right encoder distance difference
    #[serde(default = "default_encoder_gain")]
    pub encoder_gain: f32,

    /// Proportional gain on the heading error once it is small
    #[serde(default = "default_heading_gain")]
    pub heading_gain: f32,

    /// Heading error magnitude below which the heading correction takes
    /// over from the encoder correction (degrees)
    #[serde(default = "default_heading_threshold")]
    pub heading_threshold_deg: f32,

    /// Enable the heading-override correction; when false only the
    /// encoder-difference correction is applied
    #[serde(default = "default_heading_correction")]
    pub heading_correction: bool,
}

/// In-place turn parameters
#[derive(Clone, Debug, Deserialize)]
pub struct TurnConfig {
    /// Proportional gain on heading error (default: 0.015)
    #[serde(default = "default_turn_kp")]
    pub kp: f32,

    /// Derivative gain on heading error (default: 0.005)
    #[serde(default = "default_turn_kd")]
    pub kd: f32,

    /// Heading error magnitude considered on-target (degrees)
    #[serde(default = "default_turn_tolerance")]
    pub tolerance_deg: f32,

    /// Minimum command magnitude sent to the actuator while turning
    #[serde(default = "default_turn_deadband")]
    pub deadband: f32,

    /// Time the heading must hold inside tolerance before the turn is
    /// finalized and the drift offset updated (seconds)
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: f32,
}

/// Coordinate navigation parameters
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Strategy: continuous heading seek or sequential turn-then-travel
    #[serde(default)]
    pub strategy: NavigationStrategy,

    /// Base drive speed, normalized [0, 1] (default: 0.4)
    #[serde(default = "default_nav_base_speed")]
    pub base_speed: f32,

    /// Proportional gain on heading error while seeking
    #[serde(default = "default_nav_kp_heading")]
    pub kp_heading: f32,

    /// Distance to the target below which navigation completes (mm)
    #[serde(default = "default_target_tolerance")]
    pub target_tolerance_mm: f32,

    /// Minimum per-wheel command magnitude while seeking
    #[serde(default = "default_nav_deadband")]
    pub deadband: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
        }
    }
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            base_speed: default_travel_base_speed(),
            overshoot_mm: default_overshoot_mm(),
            encoder_gain: default_encoder_gain(),
            heading_gain: default_heading_gain(),
            heading_threshold_deg: default_heading_threshold(),
            heading_correction: default_heading_correction(),
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            kp: default_turn_kp(),
            kd: default_turn_kd(),
            tolerance_deg: default_turn_tolerance(),
            deadband: default_turn_deadband(),
            settle_delay_secs: default_settle_delay(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            strategy: NavigationStrategy::default(),
            base_speed: default_nav_base_speed(),
            kp_heading: default_nav_kp_heading(),
            target_tolerance_mm: default_target_tolerance(),
            deadband: default_nav_deadband(),
        }
    }
}

// Default value functions
fn default_tick_hz() -> f32 {
    50.0
}
fn default_travel_base_speed() -> f32 {
    0.4
}
fn default_overshoot_mm() -> f32 {
    300.0
}
fn default_encoder_gain() -> f32 {
    1e-4
}
fn default_heading_gain() -> f32 {
    0.005
}
fn default_heading_threshold() -> f32 {
    2.0
}
fn default_heading_correction() -> bool {
    true
}
fn default_turn_kp() -> f32 {
    0.015
}
fn default_turn_kd() -> f32 {
    0.005
}
fn default_turn_tolerance() -> f32 {
    3.0
}
fn default_turn_deadband() -> f32 {
    0.2
}
fn default_settle_delay() -> f32 {
    0.15
}
fn default_nav_base_speed() -> f32 {
    0.4
}
fn default_nav_kp_heading() -> f32 {
    0.015
}
fn default_target_tolerance() -> f32 {
    50.0
}
fn default_nav_deadband() -> f32 {
    0.2
}

impl DriveConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriveError::Config(format!("Failed to read config file: {}", e)))?;
        let config: DriveConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriveConfig::default();
        assert_eq!(config.control.tick_hz, 50.0);
        assert_eq!(config.travel.overshoot_mm, 300.0);
        assert_eq!(config.turn.tolerance_deg, 3.0);
        assert_eq!(config.navigation.target_tolerance_mm, 50.0);
        assert_eq!(config.navigation.strategy, NavigationStrategy::Continuous);
        assert!(config.travel.heading_correction);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: DriveConfig = toml::from_str(
            r#"
            [travel]
            overshoot_mm = 0.0

            [navigation]
            strategy = "sequential"
            "#,
        )
        .unwrap();

        assert_eq!(config.travel.overshoot_mm, 0.0);
        // Untouched sections keep their defaults
        assert_eq!(config.travel.base_speed, 0.4);
        assert_eq!(config.navigation.strategy, NavigationStrategy::Sequential);
        assert_eq!(config.turn.kp, 0.015);
    }
}

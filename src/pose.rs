//! Field-coordinate pose estimation
//!
//! Integrates encoder distance and heading into an estimated (x, y)
//! position in millimeters. The estimator owns the heading sensor and the
//! external correction channel: when a corrected heading has been published
//! (e.g. from vision), the sensor is re-zeroed once and the correction is
//! folded in as a fixed offset added to all subsequent raw readings. This
//! is one-shot re-anchoring, not continuous fusion.

use tracing::info;

use crate::devices::{CorrectionSource, HeadingSensor};
use crate::utils::normalize_deg_360;

/// Pose estimator for a differential-drive platform.
///
/// Position is mutated once per control tick by the active motion
/// primitive and is never reset implicitly; callers re-anchor at known
/// field positions via [`PoseEstimator::set_coordinates`].
pub struct PoseEstimator<H, C> {
    sensor: H,
    correction: C,
    /// Offset added to raw sensor readings after a re-anchor (degrees)
    heading_offset_deg: f32,
    x_mm: f32,
    y_mm: f32,
}

impl<H: HeadingSensor, C: CorrectionSource> PoseEstimator<H, C> {
    pub fn new(sensor: H, correction: C) -> Self {
        Self {
            sensor,
            correction,
            heading_offset_deg: 0.0,
            x_mm: 0.0,
            y_mm: 0.0,
        }
    }

    /// Overwrite the stored position unconditionally (heading untouched).
    ///
    /// Used to re-anchor the estimate at a known field position.
    pub fn set_coordinates(&mut self, x_mm: f32, y_mm: f32) {
        self.x_mm = x_mm;
        self.y_mm = y_mm;
    }

    /// Current estimated position (x, y) in mm.
    pub fn coordinates(&self) -> (f32, f32) {
        (self.x_mm, self.y_mm)
    }

    /// Current heading in degrees [0, 360).
    ///
    /// Polls the correction channel first: a pending corrected heading
    /// re-zeroes the sensor and replaces the stored offset, so this and all
    /// subsequent reads report the corrected value.
    pub fn heading_deg(&mut self) -> f32 {
        if let Some(corrected) = self.correction.take_correction_deg() {
            info!("Re-anchoring heading to {:.1}° from external correction", corrected);
            self.sensor.zero();
            self.heading_offset_deg = corrected;
        }
        normalize_deg_360(self.sensor.heading_deg() + self.heading_offset_deg)
    }

    /// Recompute position from a travel origin: the heading recorded at the
    /// start of the travel is used for the whole run, which keeps odometry
    /// self-consistent while heading correction nudges the motor outputs.
    pub(crate) fn apply_travel(
        &mut self,
        origin_x_mm: f32,
        origin_y_mm: f32,
        avg_distance_mm: f32,
        heading_deg: f32,
        direction: f32,
    ) {
        let rad = heading_deg.to_radians();
        self.x_mm = origin_x_mm + avg_distance_mm * rad.cos() * direction;
        self.y_mm = origin_y_mm + avg_distance_mm * rad.sin() * direction;
    }

    /// Advance position by a signed distance delta along the given heading.
    /// Used by continuous-seek navigation, which assumes small per-tick
    /// heading changes.
    pub(crate) fn advance(&mut self, delta_mm: f32, heading_deg: f32) {
        let rad = heading_deg.to_radians();
        self.x_mm += delta_mm * rad.cos();
        self.y_mm += delta_mm * rad.sin();
    }

    /// Clear the stored origin: position back to (0, 0), sensor re-zeroed,
    /// any folded-in correction discarded.
    pub(crate) fn reset(&mut self) {
        self.x_mm = 0.0;
        self.y_mm = 0.0;
        self.heading_offset_deg = 0.0;
        self.sensor.zero();
    }
}

//! Straight-line travel primitive
//!
//! Drives to a target signed distance using average encoder distance for
//! termination and two mutually exclusive per-tick corrections to stay
//! straight: an encoder-difference correction that cancels mechanical skew
//! while the heading error is large, and a heading correction that takes
//! over to settle precisely once the error is small.

use tracing::{debug, info};

use crate::StepStatus;
use crate::config::TravelConfig;
use crate::devices::{CorrectionSource, DualActuator, Encoder, HeadingSensor};
use crate::pose::PoseEstimator;
use crate::utils::normalize_deg_180;

/// State of an in-flight travel. Present only while active.
#[derive(Clone, Copy, Debug)]
pub struct TravelState {
    /// Signed target distance with overshoot compensation applied (mm)
    pub target_distance_mm: f32,
    /// Heading recorded when the travel started (degrees)
    pub start_heading: f32,
    /// Position when the travel started (mm)
    pub start_x: f32,
    pub start_y: f32,
}

/// Straight-line travel controller.
pub struct TravelController {
    config: TravelConfig,
    state: Option<TravelState>,
}

impl TravelController {
    pub fn new(config: TravelConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Check if a travel is in flight.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Current travel state, if active.
    pub fn state(&self) -> Option<&TravelState> {
        self.state.as_ref()
    }

    /// Begin a travel of `distance_mm` (sign encodes direction).
    ///
    /// Resets both encoders, records the current heading and position as
    /// the run's reference, and applies overshoot compensation to the
    /// target. A zero distance produces a zero target and finishes on the
    /// first update.
    pub fn start<L, R, H, C>(
        &mut self,
        left: &mut L,
        right: &mut R,
        pose: &mut PoseEstimator<H, C>,
        distance_mm: f32,
    ) where
        L: Encoder,
        R: Encoder,
        H: HeadingSensor,
        C: CorrectionSource,
    {
        left.reset();
        right.reset();

        let overshoot = if distance_mm > 0.0 {
            self.config.overshoot_mm
        } else if distance_mm < 0.0 {
            -self.config.overshoot_mm
        } else {
            0.0
        };

        let (start_x, start_y) = pose.coordinates();
        let start_heading = pose.heading_deg();
        let target_distance_mm = distance_mm + overshoot;

        info!(
            "Travel start: {:.0}mm (target {:.0}mm with overshoot), heading {:.1}°",
            distance_mm, target_distance_mm, start_heading
        );

        self.state = Some(TravelState {
            target_distance_mm,
            start_heading,
            start_x,
            start_y,
        });
    }

    /// Advance the travel by one control tick.
    ///
    /// Reads the encoders, computes the per-tick correction, updates the
    /// pose estimate from the run's start heading, and either applies the
    /// actuator command or terminates with both channels zeroed.
    pub fn update<L, R, A, H, C>(
        &mut self,
        left: &L,
        right: &R,
        actuator: &mut A,
        pose: &mut PoseEstimator<H, C>,
    ) -> StepStatus
    where
        L: Encoder,
        R: Encoder,
        A: DualActuator,
        H: HeadingSensor,
        C: CorrectionSource,
    {
        let Some(state) = self.state else {
            return StepStatus::Finished;
        };

        let direction = if state.target_distance_mm >= 0.0 {
            1.0
        } else {
            -1.0
        };
        let base_speed = self.config.base_speed * direction;

        let left_dist = left.distance_mm().abs();
        let right_dist = right.distance_mm().abs();
        let avg_dist = (left_dist + right_dist) / 2.0;

        let mut encoder_correction = self.config.encoder_gain * (left_dist - right_dist);
        let mut heading_correction = 0.0;

        // The heading is read every tick even when the heading correction is
        // disabled, so a pending external correction is folded in promptly.
        // Drift is measured counter-clockwise from the start heading; only
        // one of the two corrections may act per tick so they cannot fight
        // each other.
        let heading_error = normalize_deg_180(pose.heading_deg() - state.start_heading);
        if self.config.heading_correction && heading_error.abs() <= self.config.heading_threshold_deg
        {
            heading_correction = self.config.heading_gain * heading_error;
            encoder_correction = 0.0;
        }

        let left_speed = base_speed - encoder_correction + heading_correction;
        let right_speed = base_speed + encoder_correction - heading_correction;

        pose.apply_travel(
            state.start_x,
            state.start_y,
            avg_dist,
            state.start_heading,
            direction,
        );

        if avg_dist < state.target_distance_mm.abs() {
            debug!(
                "Travel: {:.0}/{:.0}mm, cmd=({:.3}, {:.3})",
                avg_dist,
                state.target_distance_mm.abs(),
                left_speed,
                right_speed
            );
            actuator.set_speeds(left_speed, right_speed);
            StepStatus::Running
        } else {
            actuator.set_speeds(0.0, 0.0);
            info!("Travel complete: {:.0}mm traveled", avg_dist);
            self.state = None;
            StepStatus::Finished
        }
    }

    /// Abort any in-flight travel without touching the actuator.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

//! In-place turn primitive
//!
//! Rotates to a target heading with PD control, a stiction deadband, and a
//! settle phase: once the heading error drops inside tolerance the
//! actuators are zeroed and the sensor is given a short delay to stop
//! oscillating before the reading is trusted. The residual error measured
//! at that point is accumulated into a drift offset that pre-compensates
//! future turn targets for systematic sensor/mechanical bias.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::StepStatus;
use crate::config::TurnConfig;
use crate::devices::{CorrectionSource, DualActuator, HeadingSensor};
use crate::pose::PoseEstimator;
use crate::utils::{normalize_deg_180, normalize_deg_360};

/// State of an in-flight turn. Present only while active.
#[derive(Clone, Copy, Debug)]
pub struct TurnState {
    /// Target heading, normalized to [0, 360)
    pub target_heading: f32,
    /// Maximum command magnitude, signed by turn direction
    pub base_speed: f32,
    /// Previous tick's heading error for the derivative term
    prev_error: f32,
    /// Set when the error first drops inside tolerance; cleared by any
    /// disturbance that pushes it back out
    settle_start: Option<Instant>,
}

/// In-place turn controller.
///
/// The drift offset is owned by the instance rather than shared globally,
/// so independent drives (e.g. in simulation) do not interfere.
pub struct TurnController {
    config: TurnConfig,
    state: Option<TurnState>,
    drift_offset_deg: f32,
}

impl TurnController {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            config,
            state: None,
            drift_offset_deg: 0.0,
        }
    }

    /// Check if a turn is in flight.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Target heading of the in-flight turn, if any.
    pub fn target_heading_deg(&self) -> Option<f32> {
        self.state.map(|s| s.target_heading)
    }

    /// Accumulated drift offset applied to future turn targets (degrees).
    pub fn drift_offset_deg(&self) -> f32 {
        self.drift_offset_deg
    }

    /// Begin a turn of `relative_deg` from the current heading at up to
    /// `base_speed`. The learned drift offset is subtracted from the target
    /// so past residual bias is pre-compensated.
    pub fn start<H, C>(
        &mut self,
        pose: &mut PoseEstimator<H, C>,
        relative_deg: f32,
        base_speed: f32,
    ) where
        H: HeadingSensor,
        C: CorrectionSource,
    {
        let current = pose.heading_deg();
        let target_heading = normalize_deg_360(current + relative_deg - self.drift_offset_deg);
        let base_speed = if relative_deg < 0.0 {
            -base_speed.abs()
        } else {
            base_speed.abs()
        };

        info!(
            "Turn start: {:+.1}° from {:.1}° -> target {:.1}° (drift offset {:+.2}°)",
            relative_deg, current, target_heading, self.drift_offset_deg
        );

        self.state = Some(TurnState {
            target_heading,
            base_speed,
            prev_error: 0.0,
            settle_start: None,
        });
    }

    /// Advance the turn by one control tick.
    pub fn update<A, H, C>(
        &mut self,
        actuator: &mut A,
        pose: &mut PoseEstimator<H, C>,
    ) -> StepStatus
    where
        A: DualActuator,
        H: HeadingSensor,
        C: CorrectionSource,
    {
        let Some(state) = self.state.as_mut() else {
            return StepStatus::Finished;
        };

        let current = pose.heading_deg();
        let error = normalize_deg_180(state.target_heading - current);

        if error.abs() < self.config.tolerance_deg {
            actuator.set_speeds(0.0, 0.0);

            let Some(settle_start) = state.settle_start else {
                // First tick inside tolerance: hold and let the sensor settle
                state.settle_start = Some(Instant::now());
                return StepStatus::Running;
            };

            let settle_delay = Duration::from_secs_f32(self.config.settle_delay_secs);
            if settle_start.elapsed() >= settle_delay {
                let final_error = normalize_deg_180(state.target_heading - pose.heading_deg());
                self.drift_offset_deg += final_error;
                info!(
                    "Turn complete: final error {:+.2}°, drift offset now {:+.2}°",
                    final_error, self.drift_offset_deg
                );
                self.state = None;
                return StepStatus::Finished;
            }

            return StepStatus::Running;
        }

        // Outside tolerance: any settle timer is void
        state.settle_start = None;

        let derivative = error - state.prev_error;
        let mut turn_speed = self.config.kp * error + self.config.kd * derivative;

        // Never command below stiction
        if turn_speed.abs() < self.config.deadband {
            turn_speed = self.config.deadband.copysign(turn_speed);
        }

        let max_speed = state.base_speed.abs();
        turn_speed = turn_speed.clamp(-max_speed, max_speed);

        debug!(
            "Turn: heading {:.1}°, error {:+.2}°, cmd {:+.3}",
            current, error, turn_speed
        );
        actuator.set_speeds(-turn_speed, turn_speed);
        state.prev_error = error;

        StepStatus::Running
    }

    /// Abort any in-flight turn. The learned drift offset is kept: it
    /// models systematic bias and is meant to persist across resets.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::NoCorrection;
    use crate::sim::{SimConfig, SimRobot};

    fn fast_settle_config() -> TurnConfig {
        TurnConfig {
            settle_delay_secs: 0.0,
            ..TurnConfig::default()
        }
    }

    #[test]
    fn test_target_normalized_across_wrap() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, _a, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        sim.set_heading_deg(350.0);
        controller.start(&mut pose, 20.0, 0.4);
        let target = controller.target_heading_deg().unwrap();
        assert!((target - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_commands_rotate_in_place() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        controller.start(&mut pose, 90.0, 0.4);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Running);

        let (left_cmd, right_cmd) = sim.commands();
        // Opposite-sign rotation, clamped to base speed, CCW for positive turns
        assert_eq!(left_cmd, -right_cmd);
        assert!((right_cmd - 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_deadband_floors_small_commands() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        controller.start(&mut pose, 90.0, 0.4);
        // 5 degrees short of target: kp*5 = 0.075, below the 0.2 deadband
        sim.set_heading_deg(85.0);
        controller.update(&mut actuator, &mut pose);

        let (_, right_cmd) = sim.commands();
        assert!((right_cmd - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_settle_then_finish_updates_drift_offset() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        controller.start(&mut pose, 90.0, 0.4);

        // Land just inside tolerance: first tick arms the settle timer
        sim.set_heading_deg(89.0);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Running);
        assert_eq!(sim.commands(), (0.0, 0.0));

        // Sensor keeps drifting slightly while settling; with zero settle
        // delay the next tick finalizes and learns the residual
        sim.set_heading_deg(88.5);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Finished);
        assert!(!controller.is_active());
        assert!((controller.drift_offset_deg() - 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_disturbance_during_settle_resumes_turning() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        controller.start(&mut pose, 90.0, 0.4);

        sim.set_heading_deg(89.0);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Running);

        // Knocked well off target while settling: back to turning
        sim.set_heading_deg(45.0);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Running);
        let (_, right_cmd) = sim.commands();
        assert!(right_cmd > 0.0);

        // Re-entering tolerance re-arms the timer from scratch
        sim.set_heading_deg(89.5);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Running);
        assert_eq!(controller.update(&mut actuator, &mut pose), StepStatus::Finished);
    }

    #[test]
    fn test_drift_offset_biases_next_target() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        // First turn ends 2 degrees short: offset becomes +2
        controller.start(&mut pose, 90.0, 0.4);
        sim.set_heading_deg(88.0);
        controller.update(&mut actuator, &mut pose);
        controller.update(&mut actuator, &mut pose);
        assert!((controller.drift_offset_deg() - 2.0).abs() < 1e-3);

        // Second turn pre-compensates: target = 88 + 90 - 2 = 176
        controller.start(&mut pose, 90.0, 0.4);
        let target = controller.target_heading_deg().unwrap();
        assert!((target - 176.0).abs() < 1e-3);
    }

    #[test]
    fn test_negative_turn_direction() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        sim.set_heading_deg(180.0);
        controller.start(&mut pose, -90.0, 0.3);
        controller.update(&mut actuator, &mut pose);

        let (left_cmd, right_cmd) = sim.commands();
        // Clockwise: left forward, right backward
        assert!((left_cmd - 0.3).abs() < 1e-4);
        assert!((right_cmd + 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_reset_keeps_drift_offset() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);
        let mut controller = TurnController::new(fast_settle_config());

        controller.start(&mut pose, 90.0, 0.4);
        sim.set_heading_deg(89.0);
        controller.update(&mut actuator, &mut pose);
        controller.update(&mut actuator, &mut pose);
        let offset = controller.drift_offset_deg();
        assert!(offset.abs() > 0.0 || offset == 0.0);

        controller.start(&mut pose, 45.0, 0.4);
        controller.reset();
        assert!(!controller.is_active());
        assert_eq!(controller.drift_offset_deg(), offset);
    }
}

//! Coordinate navigation composer
//!
//! Drives to a field coordinate using one of two strategies:
//!
//! - **Continuous** (default): skip the explicit turn and seek the target
//!   directly, recomputing the desired heading from the live pose every
//!   tick and blending a proportional heading correction into the base
//!   speed. Smoother for small corrections during long runs.
//! - **Sequential**: rotate in place to face the target, then travel the
//!   straight-line distance. More accurate for large heading changes.
//!
//! The strategy is a configuration choice, not a code path to hard-code:
//! both remain first-class.

use serde::Deserialize;
use tracing::{debug, info};

use crate::StepStatus;
use crate::config::NavigationConfig;
use crate::devices::{CorrectionSource, DualActuator, Encoder, HeadingSensor};
use crate::pose::PoseEstimator;
use crate::travel::TravelController;
use crate::turn::TurnController;
use crate::utils::{normalize_deg_180, normalize_deg_360};

/// How a navigation reaches its target coordinate.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NavigationStrategy {
    /// Continuous heading seek toward the target
    #[default]
    Continuous,
    /// Turn to face the target, then travel the distance
    Sequential,
}

/// Phase of a sequential navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SeqPhase {
    Turning,
    Traveling,
}

#[derive(Clone, Copy, Debug)]
enum NavState {
    /// Target was already inside the arrival tolerance at start; the first
    /// update reports completion with the actuators zeroed
    Arrived,
    Continuous {
        target_x: f32,
        target_y: f32,
        /// Previous average encoder reading, for delta integration
        prev_avg_mm: f32,
    },
    Sequential {
        distance_mm: f32,
        phase: SeqPhase,
    },
}

/// Desired heading toward a displacement, degrees in [0, 360).
pub(crate) fn bearing_deg(dx_mm: f32, dy_mm: f32) -> f32 {
    normalize_deg_360(dy_mm.atan2(dx_mm).to_degrees())
}

/// Coordinate navigation controller.
pub struct NavigationController {
    config: NavigationConfig,
    state: Option<NavState>,
}

impl NavigationController {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Check if a navigation is in flight.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Begin navigating from the current pose to `(target_x, target_y)` mm.
    ///
    /// In sequential mode this immediately arms the turn primitive; the
    /// travel is armed when the turn completes. A target already inside the
    /// arrival tolerance finishes on the first update in either mode
    /// without arming anything.
    pub fn start<L, R, H, C>(
        &mut self,
        left: &mut L,
        right: &mut R,
        turn: &mut TurnController,
        pose: &mut PoseEstimator<H, C>,
        target_x: f32,
        target_y: f32,
    ) where
        L: Encoder,
        R: Encoder,
        H: HeadingSensor,
        C: CorrectionSource,
    {
        let (x, y) = pose.coordinates();
        let dx = target_x - x;
        let dy = target_y - y;
        let distance_mm = dx.hypot(dy);

        info!(
            "Navigation start ({:?}): ({:.0}, {:.0}) -> ({:.0}, {:.0}), {:.0}mm",
            self.config.strategy, x, y, target_x, target_y, distance_mm
        );

        if distance_mm < self.config.target_tolerance_mm {
            self.state = Some(NavState::Arrived);
            return;
        }

        match self.config.strategy {
            NavigationStrategy::Continuous => {
                left.reset();
                right.reset();
                self.state = Some(NavState::Continuous {
                    target_x,
                    target_y,
                    prev_avg_mm: 0.0,
                });
            }
            NavigationStrategy::Sequential => {
                let desired = bearing_deg(dx, dy);
                let relative = normalize_deg_180(desired - pose.heading_deg());
                turn.start(pose, relative, self.config.base_speed);
                self.state = Some(NavState::Sequential {
                    distance_mm,
                    phase: SeqPhase::Turning,
                });
            }
        }
    }

    /// Advance the navigation by one control tick.
    pub fn update<L, R, A, H, C>(
        &mut self,
        left: &mut L,
        right: &mut R,
        actuator: &mut A,
        turn: &mut TurnController,
        travel: &mut TravelController,
        pose: &mut PoseEstimator<H, C>,
    ) -> StepStatus
    where
        L: Encoder,
        R: Encoder,
        A: DualActuator,
        H: HeadingSensor,
        C: CorrectionSource,
    {
        let Some(state) = self.state.as_mut() else {
            return StepStatus::Finished;
        };

        match state {
            NavState::Arrived => {
                actuator.set_speeds(0.0, 0.0);
                info!("Navigation complete: target within tolerance at start");
                self.state = None;
                StepStatus::Finished
            }
            NavState::Continuous {
                target_x,
                target_y,
                prev_avg_mm,
            } => {
                // Dead-reckon along the current heading using the average
                // encoder delta since the previous tick
                let avg_mm = (left.distance_mm() + right.distance_mm()) / 2.0;
                let delta_mm = avg_mm - *prev_avg_mm;
                *prev_avg_mm = avg_mm;

                let current_heading = pose.heading_deg();
                pose.advance(delta_mm, current_heading);

                let (x, y) = pose.coordinates();
                let dx = *target_x - x;
                let dy = *target_y - y;
                let distance = dx.hypot(dy);

                if distance < self.config.target_tolerance_mm {
                    actuator.set_speeds(0.0, 0.0);
                    info!("Navigation complete: {:.0}mm from target", distance);
                    self.state = None;
                    return StepStatus::Finished;
                }

                let desired = bearing_deg(dx, dy);
                let heading_error = normalize_deg_180(desired - current_heading);
                let turn_correction = self.config.kp_heading * heading_error;

                let mut left_speed = self.config.base_speed - turn_correction;
                let mut right_speed = self.config.base_speed + turn_correction;

                // Per-wheel stiction floor
                if left_speed.abs() < self.config.deadband {
                    left_speed = self.config.deadband.copysign(left_speed);
                }
                if right_speed.abs() < self.config.deadband {
                    right_speed = self.config.deadband.copysign(right_speed);
                }

                debug!(
                    "Seek: {:.0}mm to go, desired {:.1}°, error {:+.2}°, cmd=({:.3}, {:.3})",
                    distance, desired, heading_error, left_speed, right_speed
                );
                actuator.set_speeds(left_speed, right_speed);
                StepStatus::Running
            }
            NavState::Sequential { distance_mm, phase } => match phase {
                SeqPhase::Turning => {
                    if turn.update(actuator, pose).is_finished() {
                        travel.start(left, right, pose, *distance_mm);
                        *phase = SeqPhase::Traveling;
                    }
                    StepStatus::Running
                }
                SeqPhase::Traveling => {
                    if travel.update(left, right, actuator, pose).is_finished() {
                        info!("Navigation complete");
                        self.state = None;
                        return StepStatus::Finished;
                    }
                    StepStatus::Running
                }
            },
        }
    }

    /// Abort any in-flight navigation without touching the actuator.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TravelConfig, TurnConfig};
    use crate::devices::NoCorrection;
    use crate::sim::{SimConfig, SimRobot};

    #[test]
    fn test_bearing() {
        assert!((bearing_deg(1.0, 0.0) - 0.0).abs() < 1e-3);
        assert!((bearing_deg(0.0, 1.0) - 90.0).abs() < 1e-3);
        assert!((bearing_deg(-1.0, 0.0) - 180.0).abs() < 1e-3);
        assert!((bearing_deg(0.0, -1.0) - 270.0).abs() < 1e-3);
        // Field scenario: target at (706, 113)
        assert!((bearing_deg(706.0, 113.0) - 9.09).abs() < 0.05);
    }

    fn rig(config: NavigationConfig) -> (SimRobot, NavigationController, TurnController, TravelController) {
        let sim = SimRobot::new(SimConfig::default());
        let nav = NavigationController::new(config);
        let turn = TurnController::new(TurnConfig {
            settle_delay_secs: 0.0,
            ..TurnConfig::default()
        });
        let travel = TravelController::new(TravelConfig::default());
        (sim, nav, turn, travel)
    }

    #[test]
    fn test_zero_length_navigation_finishes_first_tick() {
        let (sim, mut nav, mut turn, mut travel) = rig(NavigationConfig::default());
        let (mut left, mut right, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);

        pose.set_coordinates(100.0, 100.0);
        nav.start(&mut left, &mut right, &mut turn, &mut pose, 100.0, 100.0);
        let status = nav.update(
            &mut left,
            &mut right,
            &mut actuator,
            &mut turn,
            &mut travel,
            &mut pose,
        );
        assert_eq!(status, StepStatus::Finished);
        assert!(!nav.is_active());
        assert_eq!(sim.commands(), (0.0, 0.0));
    }

    #[test]
    fn test_zero_length_sequential_skips_the_turn() {
        let config = NavigationConfig {
            strategy: NavigationStrategy::Sequential,
            ..NavigationConfig::default()
        };
        let (sim, mut nav, mut turn, mut travel) = rig(config);
        let (mut left, mut right, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);

        // Facing 90 degrees with the target underfoot: no turn toward
        // bearing 0 may be armed
        sim.set_heading_deg(90.0);
        nav.start(&mut left, &mut right, &mut turn, &mut pose, 0.0, 0.0);
        assert!(!turn.is_active());

        let status = nav.update(
            &mut left,
            &mut right,
            &mut actuator,
            &mut turn,
            &mut travel,
            &mut pose,
        );
        assert_eq!(status, StepStatus::Finished);
        assert!(!nav.is_active());
        assert_eq!(sim.commands(), (0.0, 0.0));
    }

    #[test]
    fn test_seek_steers_toward_target() {
        let (sim, mut nav, mut turn, mut travel) = rig(NavigationConfig::default());
        let (mut left, mut right, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);

        // Target is 45 degrees CCW of the current heading
        nav.start(&mut left, &mut right, &mut turn, &mut pose, 1000.0, 1000.0);
        nav.update(
            &mut left,
            &mut right,
            &mut actuator,
            &mut turn,
            &mut travel,
            &mut pose,
        );

        let (left_cmd, right_cmd) = sim.commands();
        assert!(right_cmd > left_cmd);
    }

    #[test]
    fn test_seek_deadband_floor() {
        let config = NavigationConfig {
            base_speed: 0.1,
            ..NavigationConfig::default()
        };
        let (sim, mut nav, mut turn, mut travel) = rig(config);
        let (mut left, mut right, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);

        nav.start(&mut left, &mut right, &mut turn, &mut pose, 1000.0, 0.0);
        nav.update(
            &mut left,
            &mut right,
            &mut actuator,
            &mut turn,
            &mut travel,
            &mut pose,
        );

        // Base speed below the floor: both wheels snapped up to it
        let (left_cmd, right_cmd) = sim.commands();
        assert!((left_cmd - 0.2).abs() < 1e-4);
        assert!((right_cmd - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_sequential_turns_before_traveling() {
        let config = NavigationConfig {
            strategy: NavigationStrategy::Sequential,
            ..NavigationConfig::default()
        };
        let (sim, mut nav, mut turn, mut travel) = rig(config);
        let (mut left, mut right, heading, mut actuator, _s) = sim.handles();
        let mut pose = PoseEstimator::new(heading, NoCorrection);

        // Target straight up: requires a 90 degree turn first
        nav.start(&mut left, &mut right, &mut turn, &mut pose, 0.0, 1000.0);
        assert!(turn.is_active());
        assert!(!travel.is_active());

        nav.update(
            &mut left,
            &mut right,
            &mut actuator,
            &mut turn,
            &mut travel,
            &mut pose,
        );
        let (left_cmd, right_cmd) = sim.commands();
        assert_eq!(left_cmd, -right_cmd);
        assert!(right_cmd > 0.0);

        // Snap the heading onto the target: turn settles, then travel arms
        sim.set_heading_deg(90.0);
        nav.update(&mut left, &mut right, &mut actuator, &mut turn, &mut travel, &mut pose);
        let status = nav.update(&mut left, &mut right, &mut actuator, &mut turn, &mut travel, &mut pose);
        assert_eq!(status, StepStatus::Running);
        assert!(!turn.is_active());
        assert!(travel.is_active());
    }
}

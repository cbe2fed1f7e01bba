//! Motion dispatcher
//!
//! The caller-facing surface of the motion core. Holds the devices, the
//! pose estimator and the three primitives, and guarantees that at most
//! one primitive is active at a time: the active primitive is a single
//! tagged variant, so "two primitives running" is unrepresentable rather
//! than a flag-discipline convention.
//!
//! The owning application (teleop or autonomous routine) calls `update()`
//! once per control tick; every call is non-blocking and O(1).
//! Cancellation is caller-driven via `reset()`; there is no internal
//! timeout, and a motion that never satisfies its completion condition
//! runs until externally reset.

use tracing::{info, warn};

use crate::StepStatus;
use crate::config::DriveConfig;
use crate::devices::{CorrectionSource, DualActuator, Encoder, HeadingSensor};
use crate::navigation::NavigationController;
use crate::pose::PoseEstimator;
use crate::travel::TravelController;
use crate::turn::TurnController;

/// Which motion primitive currently owns the actuator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ActiveMotion {
    #[default]
    Idle,
    Traveling,
    Turning,
    Navigating,
}

/// Result of a dispatcher tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionStatus {
    /// No primitive is active
    Idle,
    /// The active primitive is still in progress
    Running,
    /// The active primitive completed on this tick; the dispatcher is
    /// idle again
    Finished,
}

/// Motion dispatcher for a differential-drive platform.
///
/// Starting a primitive while another is active is a caller error; the
/// dispatcher handles it as a logged no-op returning `false` (callers are
/// expected to check `is_traveling()/is_turning()/is_navigating()` first).
pub struct MotionDispatcher<L, R, A, H, C> {
    left: L,
    right: R,
    actuator: A,
    pose: PoseEstimator<H, C>,
    travel: TravelController,
    turn: TurnController,
    navigation: NavigationController,
    active: ActiveMotion,
}

impl<L, R, A, H, C> MotionDispatcher<L, R, A, H, C>
where
    L: Encoder,
    R: Encoder,
    A: DualActuator,
    H: HeadingSensor,
    C: CorrectionSource,
{
    pub fn new(
        config: DriveConfig,
        left: L,
        right: R,
        actuator: A,
        heading: H,
        correction: C,
    ) -> Self {
        Self {
            left,
            right,
            actuator,
            pose: PoseEstimator::new(heading, correction),
            travel: TravelController::new(config.travel),
            turn: TurnController::new(config.turn),
            navigation: NavigationController::new(config.navigation),
            active: ActiveMotion::Idle,
        }
    }

    /// Begin a straight travel of `distance_mm` (sign encodes direction).
    /// Returns false if another primitive is active.
    pub fn start_travel(&mut self, distance_mm: f32) -> bool {
        if self.active != ActiveMotion::Idle {
            warn!(
                "start_travel({:.0}) ignored: {:?} already active",
                distance_mm, self.active
            );
            return false;
        }
        self.travel
            .start(&mut self.left, &mut self.right, &mut self.pose, distance_mm);
        self.active = ActiveMotion::Traveling;
        true
    }

    /// Begin an in-place turn of `relative_deg` at up to `base_speed`.
    /// Returns false if another primitive is active.
    pub fn start_turn(&mut self, relative_deg: f32, base_speed: f32) -> bool {
        if self.active != ActiveMotion::Idle {
            warn!(
                "start_turn({:+.1}) ignored: {:?} already active",
                relative_deg, self.active
            );
            return false;
        }
        self.turn.start(&mut self.pose, relative_deg, base_speed);
        self.active = ActiveMotion::Turning;
        true
    }

    /// Begin navigating from the current pose to `(target_x, target_y)` mm.
    /// Returns false if another primitive is active.
    pub fn start_navigation(&mut self, target_x: f32, target_y: f32) -> bool {
        if self.active != ActiveMotion::Idle {
            warn!(
                "start_navigation({:.0}, {:.0}) ignored: {:?} already active",
                target_x, target_y, self.active
            );
            return false;
        }
        self.navigation.start(
            &mut self.left,
            &mut self.right,
            &mut self.turn,
            &mut self.pose,
            target_x,
            target_y,
        );
        self.active = ActiveMotion::Navigating;
        true
    }

    /// Advance the active primitive by one control tick.
    pub fn update(&mut self) -> MotionStatus {
        let status = match self.active {
            ActiveMotion::Idle => return MotionStatus::Idle,
            ActiveMotion::Traveling => self.travel.update(
                &self.left,
                &self.right,
                &mut self.actuator,
                &mut self.pose,
            ),
            ActiveMotion::Turning => self.turn.update(&mut self.actuator, &mut self.pose),
            ActiveMotion::Navigating => self.navigation.update(
                &mut self.left,
                &mut self.right,
                &mut self.actuator,
                &mut self.turn,
                &mut self.travel,
                &mut self.pose,
            ),
        };

        match status {
            StepStatus::Running => MotionStatus::Running,
            StepStatus::Finished => {
                self.active = ActiveMotion::Idle;
                MotionStatus::Finished
            }
        }
    }

    /// Abort any active motion: actuators zeroed, all primitive state
    /// cleared, pose origin re-anchored at (0, 0) with the heading sensor
    /// re-zeroed. The turn drift offset is preserved: it models
    /// systematic bias and is meant to persist across mode transitions.
    /// Idempotent.
    pub fn reset(&mut self) {
        info!("Drive reset");
        self.actuator.set_speeds(0.0, 0.0);
        self.travel.reset();
        self.turn.reset();
        self.navigation.reset();
        self.pose.reset();
        self.active = ActiveMotion::Idle;
    }

    /// Re-anchor the position estimate at a known field coordinate (mm).
    pub fn set_coordinates(&mut self, x_mm: f32, y_mm: f32) {
        self.pose.set_coordinates(x_mm, y_mm);
    }

    /// Current estimated position (x, y) in mm.
    pub fn coordinates(&self) -> (f32, f32) {
        self.pose.coordinates()
    }

    /// Current heading in degrees [0, 360).
    pub fn heading_deg(&mut self) -> f32 {
        self.pose.heading_deg()
    }

    /// Accumulated turn drift offset (degrees).
    pub fn drift_offset_deg(&self) -> f32 {
        self.turn.drift_offset_deg()
    }

    pub fn is_traveling(&self) -> bool {
        self.active == ActiveMotion::Traveling
    }

    pub fn is_turning(&self) -> bool {
        self.active == ActiveMotion::Turning
    }

    pub fn is_navigating(&self) -> bool {
        self.active == ActiveMotion::Navigating
    }
}

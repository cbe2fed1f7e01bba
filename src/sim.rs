//! Kinematic differential-drive simulator
//!
//! Implements the [`crate::devices`] traits over a shared kinematic model
//! so the motion core can be exercised without hardware: actuator commands
//! are integrated into per-wheel distances and a heading on each
//! [`SimRobot::step`], with configurable per-side slip and optional
//! gaussian heading noise for closed-loop robustness tests.
//!
//! Tests may also script the model directly via the setter methods instead
//! of stepping the kinematics.

use parking_lot::Mutex;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use serde::Deserialize;
use std::sync::Arc;

use crate::devices::{CorrectionSource, DualActuator, Encoder, HeadingSensor};
use crate::utils::normalize_deg_360;

/// Simulated robot parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    /// Wheel speed at full command, mm/s per unit of command
    #[serde(default = "default_speed_scale")]
    pub speed_scale_mm_s: f32,

    /// Distance between wheel centers (mm)
    #[serde(default = "default_track_width")]
    pub track_width_mm: f32,

    /// Multiplier on commanded left-wheel distance (1.0 = ideal)
    #[serde(default = "default_slip")]
    pub left_slip: f32,

    /// Multiplier on commanded right-wheel distance (1.0 = ideal)
    #[serde(default = "default_slip")]
    pub right_slip: f32,

    /// Standard deviation of gaussian noise on heading readings (degrees)
    #[serde(default)]
    pub heading_noise_deg: f32,

    /// RNG seed for reproducible noise (0 = entropy)
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed_scale_mm_s: default_speed_scale(),
            track_width_mm: default_track_width(),
            left_slip: default_slip(),
            right_slip: default_slip(),
            heading_noise_deg: 0.0,
            seed: default_seed(),
        }
    }
}

fn default_speed_scale() -> f32 {
    1000.0
}
fn default_track_width() -> f32 {
    300.0
}
fn default_slip() -> f32 {
    1.0
}
fn default_seed() -> u64 {
    42
}

/// Seedable gaussian noise source.
struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        n * stddev
    }
}

struct SimState {
    /// Encoder counters since last reset (mm, signed)
    left_mm: f32,
    right_mm: f32,
    /// True heading, degrees CCW positive (unbounded)
    true_heading_deg: f32,
    /// Reference subtracted by the heading sensor after zero()
    sensor_zero_deg: f32,
    /// Last actuator commands, [-1, 1]
    left_cmd: f32,
    right_cmd: f32,
    /// Pending vision heading correction
    vision_heading_deg: Option<f32>,
    noise: NoiseGenerator,
}

/// Simulated differential-drive robot.
///
/// Hands out cloned device handles sharing its state; call [`Self::step`]
/// between control ticks to integrate the last actuator commands.
pub struct SimRobot {
    state: Arc<Mutex<SimState>>,
    config: SimConfig,
}

impl SimRobot {
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            left_mm: 0.0,
            right_mm: 0.0,
            true_heading_deg: 0.0,
            sensor_zero_deg: 0.0,
            left_cmd: 0.0,
            right_cmd: 0.0,
            vision_heading_deg: None,
            noise: NoiseGenerator::new(config.seed),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            config,
        }
    }

    /// Device handles: (left encoder, right encoder, heading sensor,
    /// actuator, vision correction slot).
    pub fn handles(
        &self,
    ) -> (
        SimEncoder,
        SimEncoder,
        SimHeadingSensor,
        SimActuator,
        SimVisionSlot,
    ) {
        (
            SimEncoder {
                state: Arc::clone(&self.state),
                side: WheelSide::Left,
            },
            SimEncoder {
                state: Arc::clone(&self.state),
                side: WheelSide::Right,
            },
            SimHeadingSensor {
                state: Arc::clone(&self.state),
                noise_deg: self.config.heading_noise_deg,
            },
            SimActuator {
                state: Arc::clone(&self.state),
            },
            SimVisionSlot {
                state: Arc::clone(&self.state),
            },
        )
    }

    /// Integrate the last actuator commands over `dt` seconds.
    pub fn step(&self, dt: f32) {
        let mut state = self.state.lock();

        let left_delta = state.left_cmd * self.config.speed_scale_mm_s * dt * self.config.left_slip;
        let right_delta =
            state.right_cmd * self.config.speed_scale_mm_s * dt * self.config.right_slip;

        state.left_mm += left_delta;
        state.right_mm += right_delta;

        // Differential drive: right wheel leading turns the robot CCW
        let dtheta_rad = (right_delta - left_delta) / self.config.track_width_mm;
        state.true_heading_deg += dtheta_rad.to_degrees();
    }

    /// Heading as the sensor frame sees it (degrees, noise-free).
    pub fn heading_deg(&self) -> f32 {
        let state = self.state.lock();
        normalize_deg_360(state.true_heading_deg - state.sensor_zero_deg)
    }

    /// Force the sensor-frame heading (for scripted tests).
    pub fn set_heading_deg(&self, deg: f32) {
        let mut state = self.state.lock();
        state.true_heading_deg = deg + state.sensor_zero_deg;
    }

    /// Current encoder counters (left, right) in mm.
    pub fn wheel_distances_mm(&self) -> (f32, f32) {
        let state = self.state.lock();
        (state.left_mm, state.right_mm)
    }

    /// Force the encoder counters (for scripted tests).
    pub fn set_wheel_distances_mm(&self, left_mm: f32, right_mm: f32) {
        let mut state = self.state.lock();
        state.left_mm = left_mm;
        state.right_mm = right_mm;
    }

    /// Last actuator commands (left, right).
    pub fn commands(&self) -> (f32, f32) {
        let state = self.state.lock();
        (state.left_cmd, state.right_cmd)
    }

    /// Publish a vision-corrected heading into the shared slot.
    pub fn publish_vision_heading(&self, deg: f32) {
        self.state.lock().vision_heading_deg = Some(deg);
    }
}

#[derive(Clone, Copy, Debug)]
enum WheelSide {
    Left,
    Right,
}

/// Simulated wheel encoder.
#[derive(Clone)]
pub struct SimEncoder {
    state: Arc<Mutex<SimState>>,
    side: WheelSide,
}

impl Encoder for SimEncoder {
    fn reset(&mut self) {
        let mut state = self.state.lock();
        match self.side {
            WheelSide::Left => state.left_mm = 0.0,
            WheelSide::Right => state.right_mm = 0.0,
        }
    }

    fn distance_mm(&self) -> f32 {
        let state = self.state.lock();
        match self.side {
            WheelSide::Left => state.left_mm,
            WheelSide::Right => state.right_mm,
        }
    }
}

/// Simulated heading sensor with optional gaussian read noise.
#[derive(Clone)]
pub struct SimHeadingSensor {
    state: Arc<Mutex<SimState>>,
    noise_deg: f32,
}

impl HeadingSensor for SimHeadingSensor {
    fn heading_deg(&self) -> f32 {
        let mut state = self.state.lock();
        let noise = state.noise.gaussian(self.noise_deg);
        normalize_deg_360(state.true_heading_deg - state.sensor_zero_deg + noise)
    }

    fn zero(&mut self) {
        let mut state = self.state.lock();
        state.sensor_zero_deg = state.true_heading_deg;
    }
}

/// Simulated drive actuator. Commands are clamped to [-1, 1].
#[derive(Clone)]
pub struct SimActuator {
    state: Arc<Mutex<SimState>>,
}

impl DualActuator for SimActuator {
    fn set_speeds(&mut self, left: f32, right: f32) {
        let mut state = self.state.lock();
        state.left_cmd = left.clamp(-1.0, 1.0);
        state.right_cmd = right.clamp(-1.0, 1.0);
    }
}

/// Simulated vision correction slot.
#[derive(Clone)]
pub struct SimVisionSlot {
    state: Arc<Mutex<SimState>>,
}

impl CorrectionSource for SimVisionSlot {
    fn take_correction_deg(&mut self) -> Option<f32> {
        self.state.lock().vision_heading_deg.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_step_moves_both_wheels() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, _h, mut actuator, _s) = sim.handles();

        actuator.set_speeds(0.5, 0.5);
        sim.step(0.1);

        // 0.5 * 1000mm/s * 0.1s = 50mm per side, no rotation
        let (left, right) = sim.wheel_distances_mm();
        assert!((left - 50.0).abs() < 1e-3);
        assert!((right - 50.0).abs() < 1e-3);
        assert!(sim.heading_deg().abs() < 1e-3);
    }

    #[test]
    fn test_opposite_commands_rotate_ccw() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, _h, mut actuator, _s) = sim.handles();

        actuator.set_speeds(-0.4, 0.4);
        sim.step(0.1);

        // Right wheel leading: heading increases (CCW)
        assert!(sim.heading_deg() > 1.0);
        assert!(sim.heading_deg() < 90.0);
    }

    #[test]
    fn test_encoder_reset_is_per_side() {
        let sim = SimRobot::new(SimConfig::default());
        let (mut left, _right, _h, mut actuator, _s) = sim.handles();

        actuator.set_speeds(1.0, 1.0);
        sim.step(1.0);
        left.reset();

        let (left_mm, right_mm) = sim.wheel_distances_mm();
        assert_eq!(left_mm, 0.0);
        assert!(right_mm > 900.0);
    }

    #[test]
    fn test_sensor_zero_reanchors_reading() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, mut heading, mut actuator, _s) = sim.handles();

        actuator.set_speeds(-0.4, 0.4);
        sim.step(0.5);
        let before = heading.heading_deg();
        assert!(before > 1.0);

        heading.zero();
        assert!(heading.heading_deg().abs() < 1e-3);
    }

    #[test]
    fn test_actuator_clamps_commands() {
        let sim = SimRobot::new(SimConfig::default());
        let (_l, _r, _h, mut actuator, _s) = sim.handles();

        actuator.set_speeds(2.5, -3.0);
        assert_eq!(sim.commands(), (1.0, -1.0));
    }

    #[test]
    fn test_slip_skews_wheels() {
        let config = SimConfig {
            left_slip: 0.9,
            ..SimConfig::default()
        };
        let sim = SimRobot::new(config);
        let (_l, _r, _h, mut actuator, _s) = sim.handles();

        actuator.set_speeds(0.5, 0.5);
        sim.step(1.0);

        let (left, right) = sim.wheel_distances_mm();
        assert!(left < right);
        // Left lagging turns the robot CCW
        assert!(sim.heading_deg() > 0.0);
    }
}

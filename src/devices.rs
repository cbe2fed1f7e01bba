//! Hardware abstraction traits
//!
//! The motion core never touches hardware directly; it drives these traits.
//! Real deployments implement them over the platform's motor controllers
//! and sensors, the [`crate::sim`] module implements them over a kinematic
//! model for hardware-free testing.
//!
//! Sign conventions: positive actuator commands mean forward on both sides
//! (an implementation inverts whichever physical side requires it
//! internally); encoder distances are signed by direction of travel;
//! headings are degrees in [0, 360) increasing counter-clockwise.

use parking_lot::Mutex;
use std::sync::Arc;

/// One incremental wheel-distance counter.
pub trait Encoder {
    /// Zero the cumulative distance counter.
    fn reset(&mut self);

    /// Cumulative signed distance since the last reset (mm).
    fn distance_mm(&self) -> f32;
}

/// Absolute heading sensor.
pub trait HeadingSensor {
    /// Current heading in degrees, [0, 360).
    fn heading_deg(&self) -> f32;

    /// Re-zero the sensor so the current orientation reads as 0.
    fn zero(&mut self);
}

/// Two-channel drive actuator.
///
/// Both commands are normalized to [-1, 1] and applied symmetrically to the
/// left-side and right-side drive motors.
pub trait DualActuator {
    fn set_speeds(&mut self, left: f32, right: f32);
}

/// Source of externally supplied corrected headings (e.g. from vision).
///
/// Polled once per heading read; a `Some` value is consumed exactly once
/// and triggers a one-shot re-anchor of the heading estimate.
pub trait CorrectionSource {
    fn take_correction_deg(&mut self) -> Option<f32>;
}

/// A correction source that never produces a value.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCorrection;

impl CorrectionSource for NoCorrection {
    fn take_correction_deg(&mut self) -> Option<f32> {
        None
    }
}

/// Shared single-value slot an external process publishes corrected
/// headings into.
///
/// Clones share the same underlying slot, so one handle can live with the
/// telemetry/vision glue while another is consumed by the pose estimator.
#[derive(Clone, Debug, Default)]
pub struct CorrectionSlot {
    value: Arc<Mutex<Option<f32>>>,
}

impl CorrectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a corrected heading (degrees). Overwrites any unconsumed value.
    pub fn publish(&self, heading_deg: f32) {
        *self.value.lock() = Some(heading_deg);
    }

    /// Check whether an unconsumed correction is pending.
    pub fn is_pending(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl CorrectionSource for CorrectionSlot {
    fn take_correction_deg(&mut self) -> Option<f32> {
        self.value.lock().take()
    }
}

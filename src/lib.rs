//! GatiDrive - Motion control core for a differential-drive platform
//!
//! Converts high-level motion intents ("travel a signed distance", "turn to
//! a heading", "navigate to a field coordinate") into continuous per-side
//! actuator commands, using incremental wheel-encoder feedback and a heading
//! sensor to correct drift and terminate each motion at the right moment.
//!
//! ## Architecture
//!
//! The crate is built around three motion primitives and a dispatcher that
//! serializes them:
//!
//! - **Travel** ([`travel`]): straight-line motion to a signed distance with
//!   encoder-skew and heading corrections
//! - **Turn** ([`turn`]): in-place PD rotation to a target heading with
//!   drift-offset learning across turns
//! - **Navigation** ([`navigation`]): drive to a field coordinate, either by
//!   continuous heading seeking or by composing a turn then a travel
//! - **Dispatcher** ([`dispatcher`]): the caller-facing state machine that
//!   guarantees at most one primitive is active per control tick
//!
//! Hardware is reached only through the traits in [`devices`]; the [`sim`]
//! module provides a kinematic differential-drive implementation of those
//! traits for hardware-free testing.
//!
//! The control model is single-threaded and cooperative: the owning
//! application calls [`dispatcher::MotionDispatcher::update`] at a fixed
//! cadence (e.g. 50Hz) and every call performs O(1) work.

pub mod config;
pub mod devices;
pub mod dispatcher;
pub mod error;
pub mod navigation;
pub mod pose;
pub mod sim;
pub mod travel;
pub mod turn;
pub mod utils;

// Re-export commonly used types
pub use config::DriveConfig;
pub use dispatcher::{MotionDispatcher, MotionStatus};
pub use error::{DriveError, Result};

/// Per-tick progress signal returned by the motion primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// Motion is still in progress; call again next tick
    Running,
    /// Completion condition reached this tick; actuators have been zeroed
    Finished,
}

impl StepStatus {
    /// Check if the primitive reported completion.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self, StepStatus::Finished)
    }
}

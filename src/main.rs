//! GatiDrive demo mission
//!
//! Runs the motion core against the built-in kinematic simulator: a
//! straight travel, an in-place turn, then a coordinate navigation, ticking
//! the dispatcher at the configured control rate and logging progress.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use gati_drive::sim::SimRobot;
use gati_drive::{DriveConfig, MotionDispatcher, MotionStatus, Result};

/// Ticks after which a motion is declared stuck and aborted.
const MOTION_TICK_CAP: u32 = 5_000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gati_drive=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        DriveConfig::load(config_path)?
    } else if Path::new("gati.toml").exists() {
        info!("Loading configuration from gati.toml");
        DriveConfig::load(Path::new("gati.toml"))?
    } else {
        info!("Using default configuration");
        DriveConfig::default()
    };

    let tick = Duration::from_secs_f32(1.0 / config.control.tick_hz);
    let turn_speed = config.navigation.base_speed;

    let sim = SimRobot::new(config.sim.clone());
    let (left, right, heading, actuator, vision) = sim.handles();
    let mut drive = MotionDispatcher::new(config, left, right, actuator, heading, vision);

    info!("Mission: travel 1000mm, turn +90°, navigate to (706, 113)");

    drive.start_travel(1000.0);
    run_motion(&mut drive, &sim, tick, "travel");

    drive.start_turn(90.0, turn_speed);
    run_motion(&mut drive, &sim, tick, "turn");

    drive.set_coordinates(0.0, 0.0);
    drive.start_navigation(706.0, 113.0);
    run_motion(&mut drive, &sim, tick, "navigation");

    let (x, y) = drive.coordinates();
    info!(
        "Mission complete: pose ({:.0}, {:.0})mm, heading {:.1}°, drift offset {:+.2}°",
        x,
        y,
        drive.heading_deg(),
        drive.drift_offset_deg()
    );

    Ok(())
}

/// Tick the dispatcher and the simulator until the motion finishes.
fn run_motion<L, R, A, H, C>(
    drive: &mut MotionDispatcher<L, R, A, H, C>,
    sim: &SimRobot,
    tick: Duration,
    label: &str,
) where
    L: gati_drive::devices::Encoder,
    R: gati_drive::devices::Encoder,
    A: gati_drive::devices::DualActuator,
    H: gati_drive::devices::HeadingSensor,
    C: gati_drive::devices::CorrectionSource,
{
    let started = Instant::now();
    for ticks in 0..MOTION_TICK_CAP {
        let deadline = Instant::now() + tick;

        if drive.update() == MotionStatus::Finished {
            let (x, y) = drive.coordinates();
            info!(
                "{} finished after {} ticks ({:.1}s): pose ({:.0}, {:.0})mm",
                label,
                ticks,
                started.elapsed().as_secs_f32(),
                x,
                y
            );
            return;
        }

        sim.step(tick.as_secs_f32());

        if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(remaining);
        }
    }

    warn!("{} did not finish within {} ticks, aborting", label, MOTION_TICK_CAP);
    drive.reset();
}

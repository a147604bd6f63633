// Encoder check: drive the simulated drivetrain through a short pattern and
// print raw ticks, calibrated inches and heading after each segment.
//
// Usage: cargo run --example encoder_check

use pidbot_drivetrain::drivetrain::{Drivetrain, DrivetrainConfig, RAW_MULTIPLIER, Side};
use pidbot_drivetrain::hal::Simulation;

const STEP_SECS: f64 = 0.02;

// (label, left, right, seconds)
const SEGMENTS: [(&str, f64, f64, f64); 4] = [
    ("Forward", 0.5, 0.5, 1.0),
    ("Turn right", 0.4, -0.4, 0.5),
    ("Reverse", -0.3, -0.3, 1.0),
    ("Arc left", 0.2, 0.6, 0.5),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let sim = Simulation::new();
    let mut bus = sim.bus();
    let mut drivetrain =
        Drivetrain::init(&mut bus, &mut sim.imu(), &DrivetrainConfig::default())?;

    println!("Raw multiplier: {:.9} in/tick", RAW_MULTIPLIER);
    println!();
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Segment", "L raw", "R raw", "L in", "R in", "Max in", "Heading"
    );

    for (label, left, right, secs) in SEGMENTS {
        drivetrain.tank_drive(left, right);
        let steps = (secs / STEP_SECS).round() as usize;
        for _ in 0..steps {
            sim.step(STEP_SECS);
        }

        println!(
            "{:<12} {:>10.1} {:>10.1} {:>10.2} {:>10.2} {:>10.2} {:>10.1}",
            label,
            drivetrain.raw_distance(Side::Left),
            drivetrain.raw_distance(Side::Right),
            drivetrain.calibrated_distance(Side::Left),
            drivetrain.calibrated_distance(Side::Right),
            drivetrain.max_magnitude_distance(),
            drivetrain.gyro_angle(),
        );
    }

    drivetrain.stop();
    drivetrain.reset_gyro();
    println!();
    println!("Stopped, heading reset to {:.1}", drivetrain.gyro_angle());
    Ok(())
}

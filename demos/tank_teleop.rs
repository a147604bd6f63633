// Keyboard tank teleop: W/S left side, I/K right side, R/F speed, G reset gyro, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use pidbot_drivetrain::config::{TOPIC_CMD_RESET_GYRO, TOPIC_CMD_TANK};
use pidbot_drivetrain::messages::TankDriveCommand;

const SPEEDS: [f64; 3] = [0.25, 0.5, 1.0]; // normalized output
const INPUT_TIMEOUT_MS: u64 = 100; // Release a side after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_tank = session.declare_publisher(TOPIC_CMD_TANK).await?;
    let pub_reset_gyro = session.declare_publisher(TOPIC_CMD_RESET_GYRO).await?;

    info!("Controls: W/S=left, I/K=right, R/F=speed, G=reset gyro, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&pub_tank, &pub_reset_gyro).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    pub_tank: &zenoh::pubsub::Publisher<'_>,
    pub_reset_gyro: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Each side holds its output until its keys go quiet
    let mut cmd = TankDriveCommand::stop();
    let mut last_left_input = Instant::now();
    let mut last_right_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        cmd.left = SPEEDS[speed_idx];
                        last_left_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        cmd.left = -SPEEDS[speed_idx];
                        last_left_input = Instant::now();
                    }
                    KeyCode::Char('i') if pressed => {
                        cmd.right = SPEEDS[speed_idx];
                        last_right_input = Instant::now();
                    }
                    KeyCode::Char('k') if pressed => {
                        cmd.right = -SPEEDS[speed_idx];
                        last_right_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(SPEEDS.len() - 1);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    KeyCode::Char('g') if pressed => {
                        info!("Resetting gyro");
                        pub_reset_gyro.put("{}").await?;
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        let timeout = Duration::from_millis(INPUT_TIMEOUT_MS);
        if last_left_input.elapsed() > timeout {
            cmd.left = 0.0;
        }
        if last_right_input.elapsed() > timeout {
            cmd.right = 0.0;
        }

        // Always publish at ~50Hz
        pub_tank.put(serde_json::to_string(&cmd)?).await?;
    }

    // Leave the robot stopped rather than waiting on the watchdog
    pub_tank.put(serde_json::to_string(&TankDriveCommand::stop())?).await?;
    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}

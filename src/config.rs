// Loop timing, topics, CAN wiring and simulation parameters
use std::time::Duration;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_TANK: &str = "pidbot/cmd/tank"; // tank drive commands
pub const TOPIC_CMD_RESET_GYRO: &str = "pidbot/cmd/reset_gyro"; // any payload resets heading
pub const TOPIC_STATE_DRIVETRAIN: &str = "pidbot/state/drivetrain"; // distances + heading
pub const TOPIC_HEALTH: &str = "pidbot/state/health"; // health status

// Motor CAN ids (top / middle / bottom on each side, bottom leads)
pub const LEFT_TOP_MOTOR_ID: u8 = 3;
pub const LEFT_MIDDLE_MOTOR_ID: u8 = 2;
pub const LEFT_BOTTOM_MOTOR_ID: u8 = 1;
pub const RIGHT_TOP_MOTOR_ID: u8 = 6;
pub const RIGHT_MIDDLE_MOTOR_ID: u8 = 5;
pub const RIGHT_BOTTOM_MOTOR_ID: u8 = 4;

// Simulation: encoder ticks per second at full output
pub const SIM_FREE_SPEED_TICKS_PER_SEC: f64 = 12_000.0;

// Simulation: wheel-to-wheel distance used to integrate heading
pub const SIM_TRACK_WIDTH_INCHES: f64 = 24.0;

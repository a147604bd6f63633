// Drivetrain subsystem
//
// Provides:
// - Encoder tick to inch calibration
// - Distance estimation over the left/right leader encoders
// - Leader/follower motor banks
// - The six-motor tank drivetrain tying banks, encoders and gyro together

mod bank;
pub mod calibration;
pub mod estimator;
mod subsystem;

pub use bank::{BankConfig, MotorBank};
pub use calibration::{RAW_MULTIPLIER, max_magnitude, ticks_to_inches};
pub use estimator::{DistanceEstimator, EncoderSource, Side};
pub use subsystem::{DriveEncoders, Drivetrain, DrivetrainConfig};

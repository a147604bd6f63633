// Message types exchanged over zenoh

use serde::{Deserialize, Serialize};

// Command from teleop/scripts -> runtime
// Each side is a normalized output in [-1, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct TankDriveCommand {
    pub left: f64,
    pub right: f64,
}

impl TankDriveCommand {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn stop() -> Self {
        Self::default()
    }
}

/// Drivetrain state published by runtime every tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct DrivetrainTelemetry {
    /// Left encoder position in raw ticks
    pub left_raw: f64,
    /// Right encoder position in raw ticks
    pub right_raw: f64,
    pub left_inches: f64,
    pub right_inches: f64,
    /// Larger-magnitude of the two calibrated distances, sign kept
    pub max_inches: f64,
    /// Gyro heading in degrees, clockwise positive
    pub heading_deg: f64,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

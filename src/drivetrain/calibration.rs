// Encoder tick to inch calibration for the drivetrain wheels
//
// Both sides share one multiplier: same wheel diameter, same encoder resolution.

use std::f64::consts::PI;

/// Empirical correction from measured drive runs
pub const EMPIRICAL_RAW_MULTIPLIER: f64 = (63.7 / 63.0) * 61.1 / ((463.544 + 461.814) / 2.0);

/// Wheel diameter in inches
pub const WHEEL_DIAMETER_INCHES: f64 = 6.0;

/// Wheel circumference in inches
pub const INCHES_PER_REVOLUTION: f64 = PI * WHEEL_DIAMETER_INCHES;

/// Encoder resolution
pub const ENCODER_TICKS_PER_REVOLUTION: f64 = 1024.0;

/// Inches of travel per raw encoder tick
pub const RAW_MULTIPLIER: f64 =
    EMPIRICAL_RAW_MULTIPLIER * INCHES_PER_REVOLUTION / ENCODER_TICKS_PER_REVOLUTION;

/// Convert a raw tick count to inches, keeping the sign
pub fn ticks_to_inches(raw: f64) -> f64 {
    raw * RAW_MULTIPLIER
}

/// Pick whichever distance has the larger magnitude, keeping its sign
///
/// The comparison is strict, so a tie returns `right`. A NaN on either side
/// also returns `right`, which means a NaN `right` comes back as NaN.
pub fn max_magnitude(left: f64, right: f64) -> f64 {
    if left.abs() > right.abs() { left } else { right }
}

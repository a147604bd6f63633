// Distance estimation from the two drive encoders

use super::calibration::{max_magnitude, ticks_to_inches};

/// Drivetrain side, one encoder per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// Anything that can report a raw encoder position per side
pub trait EncoderSource {
    /// Raw tick count for `side`, exactly as the hardware reports it
    fn encoder_position(&self, side: Side) -> f64;
}

/// Converts raw encoder ticks into distance traveled in inches
///
/// Holds no state besides its source; every read goes to the hardware.
#[derive(Debug)]
pub struct DistanceEstimator<S> {
    source: S,
}

impl<S: EncoderSource> DistanceEstimator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Unmodified tick count for `side`
    pub fn raw_distance(&self, side: Side) -> f64 {
        self.source.encoder_position(side)
    }

    /// Distance for `side` in inches, sign preserved
    pub fn calibrated_distance(&self, side: Side) -> f64 {
        ticks_to_inches(self.raw_distance(side))
    }

    /// The calibrated distance with the larger magnitude, sign preserved.
    /// Ties go to the right side.
    pub fn max_magnitude_distance(&self) -> f64 {
        max_magnitude(
            self.calibrated_distance(Side::Left),
            self.calibrated_distance(Side::Right),
        )
    }
}

//! # Wrap-safe angles
//!
//! [`Angle`] stores a single angle in radians which is always normalised into the range
//! (-pi, pi]. Arithmetic between angles wraps the result back into that range, so comparisons and
//! trig functions never see a value outside of it.
//!
//! Quantities which must be allowed to grow without bound (accumulated steer positions, the
//! revolution-counted robot heading) are kept as plain `f64` radians instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An angle normalised into the range (-pi, pi].
///
/// Units: radians
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Angle(f64);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Angle {
    pub const ZERO: Angle = Angle(0.0);
    pub const PI: Angle = Angle(PI);
    pub const PI_OVER_2: Angle = Angle(FRAC_PI_2);
    pub const NEG_PI_OVER_2: Angle = Angle(-FRAC_PI_2);

    /// Create a new angle from a value in radians, wrapping it into (-pi, pi].
    pub fn from_radians(rad: f64) -> Self {
        Angle(wrap_pi(rad))
    }

    /// Create a new angle from a value in degrees, wrapping it into (-pi, pi].
    pub fn from_degrees(deg: f64) -> Self {
        Self::from_radians(deg.to_radians())
    }

    /// The angle whose tangent is `y / x`, using the signs of both to pick the quadrant.
    pub fn atan2(y: f64, x: f64) -> Self {
        Self::from_radians(y.atan2(x))
    }

    /// Value in radians, in the range (-pi, pi].
    pub fn radians(&self) -> f64 {
        self.0
    }

    /// Value in degrees, in the range (-180, 180].
    pub fn degrees(&self) -> f64 {
        self.0.to_degrees()
    }

    pub fn sin(&self) -> f64 {
        self.0.sin()
    }

    pub fn cos(&self) -> f64 {
        self.0.cos()
    }
}

impl From<f64> for Angle {
    fn from(rad: f64) -> Self {
        Angle::from_radians(rad)
    }
}

impl From<Angle> for f64 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.0 + rhs.0)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        *self = *self + rhs;
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.0 - rhs.0)
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        *self = *self - rhs;
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle::from_radians(-self.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalisation() {
        assert!(close(Angle::from_degrees(190.0).degrees(), -170.0));
        assert!(close(Angle::from_degrees(-190.0).degrees(), 170.0));
        assert!(close(Angle::from_degrees(720.0 + 45.0).degrees(), 45.0));

        // -pi is folded onto pi so the range is half open
        assert_eq!(Angle::from_radians(-PI).radians(), PI);
        assert_eq!(Angle::from_radians(PI).radians(), PI);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let a = Angle::from_degrees(170.0);
        let b = Angle::from_degrees(20.0);

        assert!(close((a + b).degrees(), -170.0));
        assert!(close((b - a).degrees(), -150.0));
        assert!(close((-a).degrees(), -170.0));

        let mut c = Angle::from_degrees(-170.0);
        c -= Angle::from_degrees(20.0);
        assert!(close(c.degrees(), 170.0));
    }

    #[test]
    fn test_comparisons_and_trig() {
        assert!(Angle::from_degrees(100.0) > Angle::PI_OVER_2);
        assert!(Angle::from_degrees(-100.0) < Angle::NEG_PI_OVER_2);
        assert!(close(Angle::atan2(1.0, 0.0).radians(), FRAC_PI_2));
        assert!(close(Angle::from_degrees(30.0).sin(), 0.5));
        assert!(close(Angle::from_degrees(60.0).cos(), 0.5));
    }

    #[test]
    fn test_from_f64_wraps() {
        let a = Angle::from(4.0);
        assert!(close(a.radians(), 4.0 - 2.0 * PI));
        assert!(close(f64::from(a), 4.0 - 2.0 * PI));
    }
}

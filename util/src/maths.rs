//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value between the given minimum and maximum.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Return the length of the vector `(x, y)`.
pub fn length<T>(x: T, y: T) -> T
where
    T: Float
{
    x.hypot(y)
}

/// Return the largest of the given values, or `None` if there are no values.
///
/// NaN values are ignored.
pub fn max_of<T>(values: &[T]) -> Option<T>
where
    T: Float
{
    values.iter().fold(None, |acc, v| match acc {
        _ if v.is_nan() => acc,
        Some(m) if m >= *v => Some(m),
        _ => Some(*v),
    })
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle in radians into the range (-pi, pi].
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t: T = pi_t + pi_t;

    let r = rem_euclid(value + pi_t, tau_t) - pi_t;

    // rem_euclid gives [-pi, pi), move the lower bound across
    if r <= -pi_t {
        r + tau_t
    }
    else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_wrap_pi() {
        assert_eq!(wrap_pi(0f64), 0f64);
        assert_eq!(wrap_pi(PI), PI);
        assert_eq!(wrap_pi(-PI), PI);
        assert!((wrap_pi(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_pi(-TAU - 1.0) + 1.0).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&2.0, &-0.5, &0.5), 0.5);
        assert_eq!(clamp(&-2.0, &-0.5, &0.5), -0.5);
        assert_eq!(clamp(&0.1, &-0.5, &0.5), 0.1);
    }

    #[test]
    fn test_max_of() {
        assert_eq!(max_of(&[0.5, 1.5, -3.0, 1.2]), Some(1.5));
        assert_eq!(max_of::<f64>(&[]), None);
        assert_eq!(max_of(&[f64::NAN, 0.25]), Some(0.25));
    }
}

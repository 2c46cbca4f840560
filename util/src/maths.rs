//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Return `min(cap, magnitude)` carrying the sign of `sign_of`.
///
/// Used for saturating proportional commands, where the magnitude is computed
/// from the absolute error and the direction comes from the signed error.
pub fn signed_sat<T>(magnitude: T, cap: T, sign_of: T) -> T
where
    T: Float
{
    let m = magnitude.abs().min(cap);
    if sign_of < T::zero() { -m } else { m }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// Due to floating point round-off the result can equal `rhs.abs()` when
/// `lhs` is a very small negative number.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_360(angle_deg: f64) -> f64 {
    let a = rem_euclid(angle_deg, 360.0);

    // Guard the round-off case from rem_euclid
    if a >= 360.0 { 0.0 } else { a }
}

/// Get the signed shortest rotation from `from_deg` to `to_deg`, in the range
/// `(-180, 180]` degrees. Positive is counter-clockwise.
pub fn ang_err_deg(from_deg: f64, to_deg: f64) -> f64 {
    let e = wrap_360(to_deg - from_deg);
    if e > 180.0 { e - 360.0 } else { e }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 100.0), (0.0, 1.0), 25.0), 0.25);
        assert_eq!(lin_map((-1.0, 1.0), (0.0, 10.0), 0.0), 5.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(35.0, -30.0, 30.0), 30.0);
        assert_eq!(clamp(-35.0, -30.0, 30.0), -30.0);
        assert_eq!(clamp(12.0, -30.0, 30.0), 12.0);
    }

    #[test]
    fn test_signed_sat() {
        assert_eq!(signed_sat(0.8, 0.5, -1.0), -0.5);
        assert_eq!(signed_sat(0.2, 0.5, 3.0), 0.2);
    }

    #[test]
    fn test_wrap_360() {
        assert_eq!(wrap_360(0.0), 0.0);
        assert_eq!(wrap_360(360.0), 0.0);
        assert_eq!(wrap_360(-90.0), 270.0);
        assert_eq!(wrap_360(725.0), 5.0);
        assert!(wrap_360(-1e-20) < 360.0);
    }

    #[test]
    fn test_ang_err_deg() {
        assert_eq!(ang_err_deg(270.0, 90.0), 180.0);
        assert_eq!(ang_err_deg(90.0, 270.0), 180.0);
        assert_eq!(ang_err_deg(350.0, 10.0), 20.0);
        assert_eq!(ang_err_deg(10.0, 350.0), -20.0);
        assert_eq!(ang_err_deg(45.0, 45.0), 0.0);
        assert_eq!(ang_err_deg(0.0, -90.0), -90.0);
    }
}

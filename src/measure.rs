//! Coordinate and time helpers (semicircle <-> degree <-> radian, GPS epoch).
//!
//! Loosely modeled on the zero-overhead "poor man's units of measure" pattern:
//! newtypes around the underlying numeric representation rather than a single
//! opaque `f64`, so a semicircle and a degree can't be added to each other by
//! accident.

use std::f64::consts::PI;

use chrono::{DateTime, TimeZone, Utc};

/// Seconds between the POSIX epoch and the Garmin/GPS epoch
/// (1989-12-31T00:00:00 UTC).
pub const GPS_EPOCH_OFFSET: i64 = 631_065_600;

/// Sentinel for an unknown/unmeasured floating point quantity (altitude,
/// depth, distance, temperature).
pub const INVALID_FLOAT: f64 = 1.0e25;

/// Sentinel for an unknown time or ETE value.
pub const INVALID_TIME: u32 = 0xFFFF_FFFF;

/// Mean earth radius in meters, as used by the haversine distance below.
const EARTH_RADIUS_M: f64 = 6_367_000.0;

/// An angle stored as a signed 32-bit semicircle: `2^31` semicircles span
/// 180 degrees.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Semicircle(pub i32);

/// An angle in degrees.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Default)]
pub struct Degree(pub f64);

/// An angle in radians.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Default)]
pub struct Radian(pub f64);

impl Semicircle {
    pub fn to_degrees(self) -> Degree {
        Degree(self.0 as f64 * 180.0 / 2f64.powi(31))
    }

    pub fn to_radians(self) -> Radian {
        self.to_degrees().to_radians()
    }
}

impl Degree {
    pub fn to_semicircle(self) -> Semicircle {
        Semicircle((self.0 * 2f64.powi(31) / 180.0).round() as i32)
    }

    pub fn to_radians(self) -> Radian {
        Radian(self.0 * PI / 180.0)
    }
}

impl Radian {
    pub fn to_degrees(self) -> Degree {
        Degree(self.0 * 180.0 / PI)
    }
}

impl From<i32> for Semicircle {
    fn from(value: i32) -> Self {
        Semicircle(value)
    }
}

impl From<Semicircle> for i32 {
    fn from(value: Semicircle) -> Self {
        value.0
    }
}

/// Convert a device timestamp (seconds since the GPS epoch) to UTC.
///
/// Returns `None` if `secs` is the invalid-time sentinel, or if the
/// resulting timestamp is out of `chrono`'s representable range.
pub fn gps_epoch_to_utc(secs: u32) -> Option<DateTime<Utc>> {
    if secs == INVALID_TIME {
        return None;
    }
    Utc.timestamp_opt(GPS_EPOCH_OFFSET + secs as i64, 0).single()
}

/// Convert a UTC timestamp to seconds since the GPS epoch, for upload.
///
/// Returns `None` if `when` precedes the GPS epoch or doesn't fit in `u32`.
pub fn utc_to_gps_epoch(when: DateTime<Utc>) -> Option<u32> {
    let secs = when.timestamp() - GPS_EPOCH_OFFSET;
    u32::try_from(secs).ok()
}

/// Whether a floating point field carries a real measurement rather than
/// the device's "unknown" sentinel.
pub fn is_valid_float(value: f64) -> bool {
    value < INVALID_FLOAT * 0.5
}

/// Whether a time/ETE field carries a real value rather than the device's
/// "unknown" sentinel.
pub fn is_valid_time(value: u32) -> bool {
    value != INVALID_TIME
}

/// Great-circle distance between two points given as semicircle
/// latitude/longitude pairs, in meters.
pub fn haversine_distance_m(
    lat1: Semicircle,
    lon1: Semicircle,
    lat2: Semicircle,
    lon2: Semicircle,
) -> f64 {
    let phi1 = lat1.to_radians().0;
    let phi2 = lat2.to_radians().0;
    let d_phi = phi2 - phi1;
    let d_lambda = lon2.to_radians().0 - lon1.to_radians().0;

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn semicircle_round_trip(s: i32) -> bool {
        Semicircle(s).to_degrees().to_semicircle().0 == s
    }

    #[test]
    fn degree_zero_is_semicircle_zero() {
        assert_eq!(Degree(0.0).to_semicircle(), Semicircle(0));
    }

    #[test]
    fn invalid_time_sentinel() {
        assert!(!is_valid_time(INVALID_TIME));
        assert!(is_valid_time(0));
        assert_eq!(gps_epoch_to_utc(INVALID_TIME), None);
    }

    #[test]
    fn invalid_float_sentinel() {
        assert!(!is_valid_float(INVALID_FLOAT));
        assert!(is_valid_float(123.4));
    }

    #[test]
    fn epoch_round_trip() {
        let utc = gps_epoch_to_utc(0).unwrap();
        assert_eq!(utc_to_gps_epoch(utc), Some(0));
    }

    #[test]
    fn haversine_zero_distance() {
        let p = Degree(45.0).to_semicircle();
        assert_abs_diff_eq!(haversine_distance_m(p, p, p, p), 0.0, epsilon = 1e-6);
    }
}

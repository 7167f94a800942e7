//! # Unit Conversions and Bearing Arithmetic
//!
//! Providers disagree on units: NOAA reports currents in knots, the weather
//! forecast comes back in miles per hour. Everything inside the pipeline is
//! knots and degrees true, converted here at the edges.
//!
//! Bearings are circular, so averaging 350° and 10° must give 0°, not 180°.
//! [`interpolate_bearing`] always travels along the shorter arc.

use serde::{Deserialize, Serialize};

/// Statute miles per hour in one knot.
pub const MPH_PER_KNOT: f64 = 1.150_78;

pub fn knots_to_mph(knots: f64) -> f64 {
    knots * MPH_PER_KNOT
}

pub fn mph_to_knots(mph: f64) -> f64 {
    mph / MPH_PER_KNOT
}

/// Wrap any bearing into `[0, 360)`.
pub fn normalize_bearing(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Interpolate between two bearings along the shortest arc.
///
/// `alpha = 0.0` returns `from`, `alpha = 1.0` returns `to` (both normalized).
///
/// # Example
/// ```
/// use launch_window_lib::units::interpolate_bearing;
///
/// let mid = interpolate_bearing(350.0, 10.0, 0.5);
/// assert!(mid.abs() < 1e-9);
/// ```
pub fn interpolate_bearing(from: f64, to: f64, alpha: f64) -> f64 {
    let from = normalize_bearing(from);
    let mut delta = normalize_bearing(to) - from;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    normalize_bearing(from + alpha * delta)
}

/// 16-point compass name for a bearing, e.g. `"SSW"` for 200°.
pub fn compass_point(deg: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let index = (normalize_bearing(deg) / 22.5).round() as usize % 16;
    POINTS[index]
}

/// A clockwise arc of bearings, inclusive at both ends.
///
/// `from_deg > to_deg` wraps through north, so `{from: 315, to: 45}` covers
/// NW through NE.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BearingRange {
    pub from_deg: f64,
    pub to_deg: f64,
}

impl BearingRange {
    pub fn new(from_deg: f64, to_deg: f64) -> Self {
        BearingRange { from_deg, to_deg }
    }

    pub fn contains(&self, bearing: f64) -> bool {
        let b = normalize_bearing(bearing);
        let from = normalize_bearing(self.from_deg);
        let to = normalize_bearing(self.to_deg);
        if from <= to {
            (from..=to).contains(&b)
        } else {
            b >= from || b <= to
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_conversion_roundtrip() {
        let knots = 12.0;
        let back = mph_to_knots(knots_to_mph(knots));
        assert!((back - knots).abs() < 1e-12);
        assert!((knots_to_mph(2.0) - 2.30156).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_bearing() {
        assert_eq!(normalize_bearing(370.0), 10.0);
        assert_eq!(normalize_bearing(-90.0), 270.0);
        assert_eq!(normalize_bearing(360.0), 0.0);
    }

    #[test]
    fn test_interpolate_bearing_takes_short_arc() {
        assert!((interpolate_bearing(10.0, 350.0, 0.5) - 0.0).abs() < 1e-9);
        assert!((interpolate_bearing(90.0, 180.0, 0.5) - 135.0).abs() < 1e-9);
        assert!((interpolate_bearing(270.0, 90.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_compass_point() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(359.0), "N");
        assert_eq!(compass_point(200.0), "SSW");
        assert_eq!(compass_point(90.0), "E");
    }

    #[test]
    fn test_bearing_range_wraps_through_north() {
        let north = BearingRange::new(315.0, 45.0);
        assert!(north.contains(0.0));
        assert!(north.contains(315.0));
        assert!(north.contains(45.0));
        assert!(!north.contains(180.0));

        let south = BearingRange::new(135.0, 225.0);
        assert!(south.contains(180.0));
        assert!(!south.contains(90.0));
    }
}

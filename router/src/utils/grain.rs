//! Snapping to the router's canonical grid. Values within `EPSILON` of a
//! grid line count as on it, so float noise never pushes a coordinate a
//! whole grain away.

use eda_common::geom::point::EPSILON;

#[inline]
pub fn up_to_grain(v: f64, grain: f64) -> f64 {
    let q = v / grain;
    if (q - q.round()).abs() < EPSILON {
        q.round() * grain
    } else {
        q.ceil() * grain
    }
}

#[inline]
pub fn down_to_grain(v: f64, grain: f64) -> f64 {
    let q = v / grain;
    if (q - q.round()).abs() < EPSILON {
        q.round() * grain
    } else {
        q.floor() * grain
    }
}

#[inline]
pub fn is_on_grain(v: f64, grain: f64) -> bool {
    let q = v / grain;
    (q - q.round()).abs() < EPSILON
}

/// Integer key at 1/1000 unit resolution.
#[inline]
pub fn quantize(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapping() {
        assert_eq!(up_to_grain(2.5, 1.0), 3.0);
        assert_eq!(down_to_grain(2.5, 1.0), 2.0);
        assert_eq!(up_to_grain(-2.5, 1.0), -2.0);
        assert_eq!(down_to_grain(7.0, 2.0), 6.0);
        // noise below the tolerance stays on the line
        assert_eq!(up_to_grain(3.000_000_000_1, 1.0), 3.0);
        assert!(is_on_grain(0.6, 0.2));
        assert!(!is_on_grain(0.5, 0.2));
    }
}

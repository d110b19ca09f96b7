// Vector and angle helpers, LERP, clamping
//
// Vectors are glam's immutable `Vec2`; everything here is free functions so
// field blend functions can be plain `fn` pointers.
use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Where `x` sits between `a` and `b`, as a fraction.
///
/// Returns 0 for an empty interval instead of dividing by zero.
#[inline]
pub fn inverse_lerp(a: f64, b: f64, x: f64) -> f64 {
    let span = b - a;
    if span == 0.0 { 0.0 } else { (x - a) / span }
}

/// Clamp a value between min and max.
///
/// Unlike `f64::clamp` this never panics when `min > max`; `max` wins.
#[inline]
pub fn clamped(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Wrap an angle into `[-PI, PI)`.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Interpolate along the shorter arc between two angles.
#[inline]
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    a + t * normalize_angle(b - a)
}

/// Parse a `[x, y]` wire pair.
pub fn vec2_from_json(value: &serde_json::Value) -> Option<Vec2> {
    match value.as_array()?.as_slice() {
        [x, y] => Some(Vec2::new(x.as_f64()? as f32, y.as_f64()? as f32)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_lerp_angle_takes_short_path() {
        let mid = lerp_angle(3.0, -3.0, 0.5);
        // Halfway between 3.0 and -3.0 the short way is +-PI, not 0.
        assert!(approx(normalize_angle(mid).abs(), PI));
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            let a = normalize_angle(lerp_angle(3.0, -3.0, t));
            assert!(a.abs() >= 3.0 - 1e-4, "t={} gave {}", t, a);
        }
    }

    #[test]
    fn test_normalize_angle_range() {
        assert!(approx(normalize_angle(TAU + 0.5), 0.5));
        assert!(approx(normalize_angle(-TAU - 0.5), -0.5));
        assert!(approx(normalize_angle(PI), -PI));
    }

    #[test]
    fn test_inverse_lerp() {
        assert_eq!(inverse_lerp(100.0, 200.0, 150.0), 0.5);
        assert_eq!(inverse_lerp(5.0, 5.0, 5.0), 0.0);
    }

    #[test]
    fn test_clamped_prefers_max() {
        assert_eq!(clamped(5.0, 0.0, 3.0), 3.0);
        assert_eq!(clamped(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(clamped(1.0, 4.0, 3.0), 3.0);
    }

    #[test]
    fn test_vec2_from_json() {
        assert_eq!(vec2_from_json(&json!([1, 2.5])), Some(Vec2::new(1.0, 2.5)));
        assert_eq!(vec2_from_json(&json!([1])), None);
        assert_eq!(vec2_from_json(&json!({"x": 1, "y": 2})), None);
    }
}

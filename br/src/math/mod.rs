//! Angle and index arithmetic shared by the offset algebra and automatic bindings
//!
//! All angles are in degrees. Index helpers operate on floats because rule
//! evaluation produces floats; callers truncate where an integer is needed.

mod offset;

pub use kurbo::Vec2;
pub use offset::Offset;

/// Rotate a vector counter-clockwise by `degrees`
pub fn rotate(v: Vec2, degrees: f64) -> Vec2 {
    if degrees == 0.0 {
        return v;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y)
}

/// Angle in degrees of the vector `(x, y)`
pub fn atan2d(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

/// Angle in degrees pointing from `from` toward `to`
pub fn angle_from_to(from: Vec2, to: Vec2) -> f64 {
    atan2d(to.y - from.y, to.x - from.x)
}

/// Non-negative remainder of `x` by `by`
pub fn modulo(by: f64, x: f64) -> f64 {
    x - by * (x / by).floor()
}

/// Non-negative remainder for integer indices
pub fn modulo_index(by: i64, x: i64) -> i64 {
    if by == 0 { 0 } else { x.rem_euclid(by) }
}

/// `1` for even `x`, `-1` for odd `x`
pub fn pm1_mod(x: f64) -> f64 {
    1.0 - 2.0 * modulo(2.0, x)
}

/// Folds `[0, by)` into two halves that both count up from zero.
///
/// For `by = 6`: `0 1 2 0 1 2`. For `by = 5`: `0 1 2 1 2`.
pub fn h_mod(by: f64, x: f64) -> f64 {
    let y = modulo(by, x);
    if y < by * 0.5 { y } else { y - (by * 0.5).floor() }
}

/// Companion of [`h_mod`] giving the signed lateral position within each half.
///
/// For `by = 4`: `0.5 1.5 -0.5 -1.5`.
pub fn hn_mod(by: f64, x: f64) -> f64 {
    let y = modulo(by, x);
    let half = by * 0.5;
    if y < half {
        y + half.floor() + 0.5 - half
    } else {
        half - 0.5 - y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vec2::new(1.0, 0.0), 90.0);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 1.0));
    }

    #[test]
    fn test_rotate_zero_is_identity() {
        let v = Vec2::new(3.0, -2.0);
        assert_eq!(rotate(v, 0.0), v);
    }

    #[test]
    fn test_angle_from_to() {
        assert!(approx(angle_from_to(Vec2::new(0.0, 0.0), Vec2::new(0.0, 5.0)), 90.0));
        assert!(approx(angle_from_to(Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)), 180.0));
    }

    #[test]
    fn test_modulo_negative() {
        assert!(approx(modulo(4.0, -1.0), 3.0));
        assert!(approx(modulo(4.0, 9.0), 1.0));
        assert_eq!(modulo_index(4, -1), 3);
        assert_eq!(modulo_index(0, 5), 0);
    }

    #[test]
    fn test_pm1_mod() {
        assert!(approx(pm1_mod(0.0), 1.0));
        assert!(approx(pm1_mod(1.0), -1.0));
        assert!(approx(pm1_mod(4.0), 1.0));
    }

    #[test]
    fn test_h_mod_even_and_odd() {
        let even: Vec<f64> = (0..6).map(|i| h_mod(6.0, i as f64)).collect();
        assert_eq!(even, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        let odd: Vec<f64> = (0..5).map(|i| h_mod(5.0, i as f64)).collect();
        assert_eq!(odd, vec![0.0, 1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_hn_mod_halves_mirror() {
        let vals: Vec<f64> = (0..4).map(|i| hn_mod(4.0, i as f64)).collect();
        assert_eq!(vals, vec![0.5, 1.5, -0.5, -1.5]);
    }
}

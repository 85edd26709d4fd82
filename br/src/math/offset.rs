//! Compound position: a nonrotational part plus a rotational part at an angle

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::{Vec2, rotate};

/// Offset descriptor `{nx, ny, rx, ry, angle}`.
///
/// The true location is `(nx, ny) + rotate((rx, ry), angle)`. Patterns step the
/// rotational part and the angle to produce rings and spirals while the
/// nonrotational part stays fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offset {
    /// Nonrotational x
    pub nx: f64,
    /// Nonrotational y
    pub ny: f64,
    /// Rotational x
    pub rx: f64,
    /// Rotational y
    pub ry: f64,
    /// Rotation of the rotational part, in degrees
    pub angle: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset {
        nx: 0.0,
        ny: 0.0,
        rx: 0.0,
        ry: 0.0,
        angle: 0.0,
    };

    pub fn new(nx: f64, ny: f64, rx: f64, ry: f64, angle: f64) -> Self {
        Self { nx, ny, rx, ry, angle }
    }

    /// Purely nonrotational offset
    pub fn nrot(nx: f64, ny: f64) -> Self {
        Self::new(nx, ny, 0.0, 0.0, 0.0)
    }

    /// Purely rotational offset
    pub fn rot(rx: f64, ry: f64) -> Self {
        Self::new(0.0, 0.0, rx, ry, 0.0)
    }

    /// Angle-only offset
    pub fn angle(angle: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, angle)
    }

    pub fn nonrotational(&self) -> Vec2 {
        Vec2::new(self.nx, self.ny)
    }

    pub fn rotational(&self) -> Vec2 {
        Vec2::new(self.rx, self.ry)
    }

    pub fn true_location(&self) -> Vec2 {
        self.nonrotational() + rotate(self.rotational(), self.angle)
    }

    /// Collapse the rotational part into the nonrotational part.
    ///
    /// The result has `rx = ry = 0` and the same true location, with the
    /// angle replaced by `new_angle` when supplied.
    pub fn bank(&self, new_angle: Option<f64>) -> Self {
        let tl = self.true_location();
        Self::new(tl.x, tl.y, 0.0, 0.0, new_angle.unwrap_or(self.angle))
    }

    /// Bank, then turn the angle by `angle_offset`
    pub fn bank_offset(&self, angle_offset: f64) -> Self {
        self.bank(Some(self.angle + angle_offset))
    }

    /// Rotate the nonrotational part by `by` and add `by` to the angle.
    ///
    /// Both parts end up rotated, so the whole true location turns about the
    /// origin.
    pub fn rotate_all(&self, by: f64) -> Self {
        let n = rotate(self.nonrotational(), by);
        Self::new(n.x, n.y, self.rx, self.ry, self.angle + by)
    }

    /// Same offset with the angle overwritten
    pub fn with_angle(&self, angle: f64) -> Self {
        Self { angle, ..*self }
    }

    /// Same offset with `v` added to the nonrotational part
    pub fn with_offset(&self, v: Vec2) -> Self {
        Self::new(self.nx + v.x, self.ny + v.y, self.rx, self.ry, self.angle)
    }

    /// Same offset with `degrees` added to the angle
    pub fn turned(&self, degrees: f64) -> Self {
        self.with_angle(self.angle + degrees)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, o: Offset) -> Offset {
        Offset::new(
            self.nx + o.nx,
            self.ny + o.ny,
            self.rx + o.rx,
            self.ry + o.ry,
            self.angle + o.angle,
        )
    }
}

impl AddAssign for Offset {
    fn add_assign(&mut self, o: Offset) {
        *self = *self + o;
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, o: Offset) -> Offset {
        Offset::new(
            self.nx - o.nx,
            self.ny - o.ny,
            self.rx - o.rx,
            self.ry - o.ry,
            self.angle - o.angle,
        )
    }
}

impl SubAssign for Offset {
    fn sub_assign(&mut self, o: Offset) {
        *self = *self - o;
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Offset {
        Offset::ZERO - self
    }
}

impl Mul<f64> for Offset {
    type Output = Offset;

    fn mul(self, f: f64) -> Offset {
        Offset::new(self.nx * f, self.ny * f, self.rx * f, self.ry * f, self.angle * f)
    }
}

impl Mul<Offset> for f64 {
    type Output = Offset;

    fn mul(self, o: Offset) -> Offset {
        o * self
    }
}

impl Div<f64> for Offset {
    type Output = Offset;

    fn div(self, f: f64) -> Offset {
        Offset::new(self.nx / f, self.ny / f, self.rx / f, self.ry / f, self.angle / f)
    }
}

impl Add<Vec2> for Offset {
    type Output = Offset;

    fn add(self, v: Vec2) -> Offset {
        self.with_offset(v)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}:{},{}:{}>", self.nx, self.ny, self.rx, self.ry, self.angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).hypot() < 1e-6
    }

    #[test]
    fn test_true_location() {
        let o = Offset::new(1.0, 2.0, 3.0, 0.0, 90.0);
        let tl = o.true_location();
        assert!((tl.x - 1.0).abs() < EPS);
        assert!((tl.y - 5.0).abs() < EPS);
    }

    #[test]
    fn test_bank_preserves_location() {
        let o = Offset::new(1.0, -1.0, 2.0, 3.0, 33.0);
        let banked = o.bank(None);
        assert_eq!(banked.rx, 0.0);
        assert_eq!(banked.ry, 0.0);
        assert_eq!(banked.angle, 33.0);
        assert!(close(banked.true_location(), o.true_location()));
    }

    #[test]
    fn test_bank_with_new_angle() {
        let o = Offset::rot(1.0, 0.0);
        let banked = o.bank(Some(45.0));
        assert_eq!(banked.angle, 45.0);
        assert!(close(banked.nonrotational(), Vec2::new(1.0, 0.0)));
        assert_eq!(o.bank_offset(10.0).angle, 10.0);
    }

    #[test]
    fn test_rotate_all_turns_location() {
        let o = Offset::new(1.0, 0.0, 1.0, 0.0, 0.0);
        let r = o.rotate_all(90.0);
        assert!(close(r.true_location(), Vec2::new(0.0, 2.0)));
        assert_eq!(r.angle, 90.0);
    }

    #[test]
    fn test_component_arithmetic() {
        let a = Offset::new(1.0, 2.0, 3.0, 4.0, 5.0);
        let b = Offset::new(0.5, 0.5, 0.5, 0.5, 0.5);
        assert_eq!(a + b - b, a);
        assert_eq!((a * 2.0) / 2.0, a);
        assert_eq!(2.0 * a, a * 2.0);
        assert_eq!(-a + a, Offset::ZERO);
        assert_eq!((a + Vec2::new(1.0, 1.0)).nx, 2.0);
        assert_eq!(a.turned(5.0).angle, 10.0);
    }

    #[test]
    fn test_display() {
        let o = Offset::new(1.0, 2.0, 3.0, 4.0, 90.0);
        assert_eq!(o.to_string(), "<1,2:3,4:90>");
    }

    proptest! {
        #[test]
        fn test_bank_is_location_preserving(
            nx in -100.0f64..100.0, ny in -100.0f64..100.0,
            rx in -100.0f64..100.0, ry in -100.0f64..100.0,
            angle in -720.0f64..720.0,
        ) {
            let o = Offset::new(nx, ny, rx, ry, angle);
            prop_assert!(close(o.bank(None).true_location(), o.true_location()));
        }

        #[test]
        fn test_rotate_all_rotates_true_location(
            nx in -100.0f64..100.0, ny in -100.0f64..100.0,
            rx in -100.0f64..100.0, ry in -100.0f64..100.0,
            angle in -360.0f64..360.0, by in -360.0f64..360.0,
        ) {
            let o = Offset::new(nx, ny, rx, ry, angle);
            let expected = rotate(o.true_location(), by);
            prop_assert!(close(o.rotate_all(by).true_location(), expected));
        }
    }
}

//! Grid geometry: compass directions, integer coordinates and polar vectors.
//!
//! Compass numbering follows the keypad layout with north pointing at +y:
//!
//! ```text
//!     6  7  8        NW  N  NE
//!     3  4  5         W  C  E
//!     0  1  2        SW  S  SE
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// One of the eight compass directions, or `Center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Dir {
    SW = 0,
    S = 1,
    SE = 2,
    W = 3,
    Center = 4,
    E = 5,
    NW = 6,
    N = 7,
    NE = 8,
}

/// Clockwise ring starting at north, used for rotation.
const RING: [Dir; 8] = [Dir::N, Dir::NE, Dir::E, Dir::SE, Dir::S, Dir::SW, Dir::W, Dir::NW];

impl Dir {
    pub const ALL: [Dir; 9] = [
        Dir::SW,
        Dir::S,
        Dir::SE,
        Dir::W,
        Dir::Center,
        Dir::E,
        Dir::NW,
        Dir::N,
        Dir::NE,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn as_index(self) -> u8 {
        self as u8
    }

    /// A uniformly chosen non-center direction.
    pub fn random8<R: Rng + ?Sized>(rng: &mut R) -> Self {
        RING[rng.gen_range(0..RING.len())]
    }

    pub fn as_normalized_coord(self) -> Coord {
        let d = self as i16;
        Coord::new(d % 3 - 1, d / 3 - 1)
    }

    pub fn as_normalized_polar(self) -> Polar {
        Polar::new(1, self)
    }

    /// Rotate clockwise by `n` × 45°; negative `n` rotates counter-clockwise.
    pub fn rotate(self, n: i32) -> Self {
        if self == Dir::Center {
            return self;
        }
        let pos = RING.iter().position(|&d| d == self).unwrap_or(0) as i32;
        RING[(pos + n).rem_euclid(8) as usize]
    }

    pub fn rotate_90_cw(self) -> Self {
        self.rotate(2)
    }

    pub fn rotate_90_ccw(self) -> Self {
        self.rotate(-2)
    }

    pub fn rotate_180(self) -> Self {
        self.rotate(4)
    }
}

impl Default for Dir {
    fn default() -> Self {
        Dir::Center
    }
}

/// Signed 16-bit location or displacement. Arithmetic wraps like `i16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub fn is_normalized(self) -> bool {
        (-1..=1).contains(&self.x) && (-1..=1).contains(&self.y)
    }

    pub fn normalize(self) -> Self {
        self.as_dir().as_normalized_coord()
    }

    /// Euclidean length, rounded down.
    pub fn length(self) -> u32 {
        let (x, y) = (self.x as f64, self.y as f64);
        (x * x + y * y).sqrt() as u32
    }

    /// Nearest of the eight 45° sectors; `Center` for the zero vector.
    pub fn as_dir(self) -> Dir {
        if self.x == 0 && self.y == 0 {
            return Dir::Center;
        }
        let angle = (self.y as f64).atan2(self.x as f64);
        let sector = (angle / FRAC_PI_4).round() as i32;
        match sector.rem_euclid(8) {
            0 => Dir::E,
            1 => Dir::NE,
            2 => Dir::N,
            3 => Dir::NW,
            4 => Dir::W,
            5 => Dir::SW,
            6 => Dir::S,
            _ => Dir::SE,
        }
    }

    pub fn as_polar(self) -> Polar {
        Polar::new(self.length() as i32, self.as_dir())
    }

    /// Cosine similarity of the two rays, -1.0 (opposite) to 1.0 (same).
    /// Anything compared with a zero vector is considered the same.
    pub fn ray_sameness(self, other: Coord) -> f32 {
        let mag = (self.x as i64 * self.x as i64 + self.y as i64 * self.y as i64)
            * (other.x as i64 * other.x as i64 + other.y as i64 * other.y as i64);
        if mag == 0 {
            return 1.0;
        }
        let dot = self.x as i64 * other.x as i64 + self.y as i64 * other.y as i64;
        (dot as f64 / (mag as f64).sqrt()) as f32
    }

    pub fn ray_sameness_dir(self, dir: Dir) -> f32 {
        self.ray_sameness(dir.as_normalized_coord())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Coord {
    type Output = Coord;
    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}

impl Sub for Coord {
    type Output = Coord;
    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x.wrapping_sub(rhs.x), self.y.wrapping_sub(rhs.y))
    }
}

impl Mul<i32> for Coord {
    type Output = Coord;
    fn mul(self, rhs: i32) -> Coord {
        Coord::new(
            (self.x as i32).wrapping_mul(rhs) as i16,
            (self.y as i32).wrapping_mul(rhs) as i16,
        )
    }
}

impl Add<Dir> for Coord {
    type Output = Coord;
    fn add(self, rhs: Dir) -> Coord {
        self + rhs.as_normalized_coord()
    }
}

impl Sub<Dir> for Coord {
    type Output = Coord;
    fn sub(self, rhs: Dir) -> Coord {
        self - rhs.as_normalized_coord()
    }
}

impl Add<Polar> for Coord {
    type Output = Coord;
    fn add(self, rhs: Polar) -> Coord {
        self + rhs.as_coord()
    }
}

/// Signed magnitude along a compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Polar {
    pub mag: i32,
    pub dir: Dir,
}

impl Polar {
    pub const fn new(mag: i32, dir: Dir) -> Self {
        Self { mag, dir }
    }

    /// Diagonal magnitudes are scaled by 1/√2 and rounded half away from zero.
    pub fn as_coord(self) -> Coord {
        let len = match self.dir {
            Dir::Center => 0,
            Dir::N | Dir::S | Dir::E | Dir::W => self.mag,
            _ => (self.mag as f64 * FRAC_1_SQRT_2).round() as i32,
        };
        self.dir.as_normalized_coord() * len
    }

    /// Integer dot product of the coordinate forms.
    pub fn dot(self, other: Polar) -> i32 {
        let a = self.as_coord();
        let b = other.as_coord();
        a.x as i32 * b.x as i32 + a.y as i32 * b.y as i32
    }
}

impl Add for Polar {
    type Output = Polar;
    fn add(self, rhs: Polar) -> Polar {
        (self.as_coord() + rhs.as_coord()).as_polar()
    }
}

impl Add<Coord> for Polar {
    type Output = Polar;
    fn add(self, rhs: Coord) -> Polar {
        (self.as_coord() + rhs).as_polar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.0001
    }

    #[test]
    fn test_dir_indices() {
        for (i, dir) in Dir::ALL.iter().enumerate() {
            assert_eq!(dir.as_index() as usize, i);
            assert_eq!(Dir::from_index(i as u8), Some(*dir));
        }
        assert_eq!(Dir::from_index(9), None);
    }

    #[test]
    fn test_dir_rotation() {
        assert_eq!(Dir::NE.rotate(1), Dir::E);
        assert_eq!(Dir::NE.rotate(2), Dir::SE);
        assert_eq!(Dir::NE.rotate(-1), Dir::N);
        assert_eq!(Dir::NE.rotate(-2), Dir::NW);
        assert_eq!(Dir::N.rotate(1), Dir::NE);
        assert_eq!(Dir::SW.rotate(-2), Dir::SE);
        assert_eq!(Dir::Center.rotate(3), Dir::Center);
        assert_eq!(Dir::E.rotate_90_cw(), Dir::S);
        assert_eq!(Dir::E.rotate_90_ccw(), Dir::N);
        assert_eq!(Dir::W.rotate_180(), Dir::E);
    }

    #[test]
    fn test_normalized_coords() {
        assert_eq!(Dir::Center.as_normalized_coord(), Coord::new(0, 0));
        assert_eq!(Dir::SW.as_normalized_coord(), Coord::new(-1, -1));
        assert_eq!(Dir::S.as_normalized_coord(), Coord::new(0, -1));
        assert_eq!(Dir::SE.as_normalized_coord(), Coord::new(1, -1));
        assert_eq!(Dir::W.as_normalized_coord(), Coord::new(-1, 0));
        assert_eq!(Dir::E.as_normalized_coord(), Coord::new(1, 0));
        assert_eq!(Dir::NW.as_normalized_coord(), Coord::new(-1, 1));
        assert_eq!(Dir::N.as_normalized_coord(), Coord::new(0, 1));
        assert_eq!(Dir::NE.as_normalized_coord(), Coord::new(1, 1));
    }

    #[test]
    fn test_coord_normalize() {
        assert!(!Coord::new(9, 101).is_normalized());
        assert!(Coord::new(-1, -1).is_normalized());
        assert!(!Coord::new(-2, 0).is_normalized());

        assert_eq!(Coord::new(0, 0).normalize(), Coord::new(0, 0));
        assert_eq!(Coord::new(100, 5).normalize(), Coord::new(1, 0));
        assert_eq!(Coord::new(100, 105).normalize(), Coord::new(1, 1));
        assert_eq!(Coord::new(-5, 101).normalize(), Coord::new(0, 1));
        assert_eq!(Coord::new(-500, 10).normalize(), Coord::new(-1, 0));
        assert_eq!(Coord::new(-500, -490).normalize(), Coord::new(-1, -1));
        assert_eq!(Coord::new(-1, -490).normalize(), Coord::new(0, -1));
        assert_eq!(Coord::new(1101, -1090).as_dir(), Dir::SE);
        assert_eq!(Coord::new(1101, -3).as_dir(), Dir::E);
    }

    #[test]
    fn test_coord_length_rounds_down() {
        assert_eq!(Coord::new(0, 0).length(), 0);
        assert_eq!(Coord::new(-1, -1).length(), 1);
        assert_eq!(Coord::new(22, 22).length(), 31);
        assert_eq!(Coord::new(10, -10).length(), 14);
        assert_eq!(Coord::new(-310, 0).length(), 310);
    }

    #[test]
    fn test_coord_arithmetic() {
        assert_eq!(Coord::new(-70, 20) + Coord::new(10, -10), Coord::new(-60, 10));
        assert_eq!(Coord::new(-70, 20) - Coord::new(10, -10), Coord::new(-80, 30));
        assert_eq!(Coord::new(11, 5) * -5, Coord::new(-55, -25));
        assert_eq!(Coord::new(0, 0) + Dir::SW, Coord::new(-1, -1));
        assert_eq!(Coord::new(0, 0) - Dir::SW, Coord::new(1, 1));
        assert_eq!(Coord::new(i16::MAX, 0) + Dir::E, Coord::new(i16::MIN, 0));
    }

    #[test]
    fn test_ray_sameness() {
        let zero = Coord::new(0, 0);
        let c = Coord::new(10, 11);
        assert_eq!(zero.ray_sameness(c), 1.0);
        assert_eq!(c.ray_sameness(zero), 1.0);
        assert_eq!(c.ray_sameness_dir(Dir::Center), 1.0);
        assert_eq!(c.ray_sameness(c), 1.0);
        assert!(close(Coord::new(-10, -10).ray_sameness(Coord::new(10, 10)), -1.0));
        assert!(close(Coord::new(0, 11).ray_sameness(Coord::new(20, 0)), 0.0));
        assert!(close(Coord::new(0, 444).ray_sameness(Coord::new(113, 113)), 0.707_106_77));
        assert!(close(Coord::new(0, 444).ray_sameness(Coord::new(113, -113)), -0.707_106_77));
    }

    #[test]
    fn test_polar_conversions() {
        assert_eq!(Coord::new(-10, -10).as_polar(), Polar::new(14, Dir::SW));
        assert_eq!(Coord::new(100, 1).as_polar(), Polar::new(100, Dir::E));
        assert_eq!(Polar::new(10, Dir::Center).as_coord(), Coord::new(0, 0));
        assert_eq!(Polar::new(20, Dir::N).as_coord(), Coord::new(0, 20));
        assert_eq!(Polar::new(12, Dir::W).as_coord(), Coord::new(-12, 0));
        assert_eq!(Polar::new(14, Dir::NE).as_coord(), Coord::new(10, 10));
        assert_eq!(Polar::new(-14, Dir::NE).as_coord(), Coord::new(-10, -10));
        assert_eq!(Polar::new(-14, Dir::E).as_coord(), Coord::new(-14, 0));
    }

    #[test]
    fn test_polar_combination() {
        let east = Polar::new(3, Dir::E);
        let north = Polar::new(3, Dir::N);
        assert_eq!((east + north).dir, Dir::NE);
        assert_eq!(east.dot(north), 0);
        assert_eq!(east.dot(Polar::new(2, Dir::W)), -6);
        assert_eq!((east + Coord::new(-3, 0)).mag, 0);
    }

    proptest! {
        #[test]
        fn prop_dir_coord_round_trip(index in 0u8..9) {
            let dir = Dir::from_index(index).unwrap();
            prop_assert_eq!(dir.as_normalized_coord().as_dir(), dir);
            let polar = dir.as_normalized_polar();
            prop_assert_eq!(polar.dir, dir);
            if dir != Dir::Center {
                prop_assert_eq!(polar.as_coord().as_dir(), dir);
            }
        }

        #[test]
        fn prop_normalize_is_idempotent(x in any::<i16>(), y in any::<i16>()) {
            let once = Coord::new(x, y).normalize();
            prop_assert!(once.is_normalized());
            prop_assert_eq!(once.normalize(), once);
        }

        #[test]
        fn prop_rotation_inverse(index in 0u8..9, n in -16i32..16) {
            let dir = Dir::from_index(index).unwrap();
            prop_assert_eq!(dir.rotate(n).rotate(-n), dir);
        }
    }
}

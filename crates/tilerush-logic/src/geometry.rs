//! Planar geometry primitives shared by the navmesh and the motion controller.
//!
//! Map coordinates grow rightwards in X and downwards in Y, so a [`Rect`]'s
//! `top` is its smallest Y and `bottom` its largest.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Tolerance used for point-on-boundary tests.
pub const EPSILON: f32 = 1e-5;

/// A 2D vector in map coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            Vec2::ZERO
        }
    }

    /// Shorten the vector to at most `max_len`, keeping its direction.
    pub fn clamp_length(self, max_len: f32) -> Vec2 {
        let len = self.length();
        if len > max_len && len > 0.0 {
            self * (max_len / len)
        } else {
            self
        }
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on `center`.
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn left(&self) -> f32 {
        self.x
    }
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
    pub fn top(&self) -> f32 {
        self.y
    }
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left() + self.right()) / 2.0,
            (self.top() + self.bottom()) / 2.0,
        )
    }

    /// The same rectangle moved by `offset`.
    pub fn translated(&self, offset: Vec2) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Open-interval overlap test: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }
}

/// Convex polygon with vertices in boundary order (either winding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Vec2>,
}

impl Polygon {
    /// Wrap a vertex list. Convexity is the caller's responsibility; the
    /// navmesh builder rejects lists with fewer than three vertices.
    pub fn new(vertices: Vec<Vec2>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned square cell with its top-left corner at `origin`.
    pub fn square(origin: Vec2, size: f32) -> Self {
        Self::new(vec![
            origin,
            Vec2::new(origin.x + size, origin.y),
            Vec2::new(origin.x + size, origin.y + size),
            Vec2::new(origin.x, origin.y + size),
        ])
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Boundary segments in vertex order, closing back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Average of the vertices. Good enough as a representative point for
    /// convex cells.
    pub fn centroid(&self) -> Vec2 {
        if self.vertices.is_empty() {
            return Vec2::ZERO;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vec2::ZERO, |acc, &v| acc + v);
        sum * (1.0 / self.vertices.len() as f32)
    }

    /// Twice the signed area; positive for clockwise order in map coordinates.
    pub fn signed_area2(&self) -> f32 {
        self.edges().map(|(a, b)| a.cross(b)).sum()
    }

    /// Point-in-convex-polygon test. Points on the boundary are inside.
    pub fn contains(&self, point: Vec2) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let mut sign = 0.0_f32;
        for (a, b) in self.edges() {
            let side = (b - a).cross(point - a);
            if side.abs() <= EPSILON {
                continue;
            }
            if sign == 0.0 {
                sign = side.signum();
            } else if side.signum() != sign {
                return false;
            }
        }
        true
    }
}

use std::f32::consts::TAU;

use crate::geometry::vector::Vector2;

/*
Shapes
======

A shape is a parametric curve: `point_at(t)` for `t` in [0, 1] walks the beam
from the start of the curve to its end. The producer samples every shape of a
frame in order, so the end of one shape should usually meet the start of the
next or the beam visibly jumps.

The weight decides how many of a frame's samples a shape receives. It is the
curve's length for the built-in shapes, so a long outline is drawn with as
much beam density as a short one and simple shapes don't end up brighter.
*/

const BEZIER_LENGTH_SEGMENTS: usize = 16;

/// A parametric curve contributing points to a frame.
pub trait Shape: Send + Sync {
    /// Point on the curve at `t ∈ [0, 1]`.
    fn point_at(&self, t: f32) -> Vector2;

    /// Relative share of a frame's samples. Non-finite or non-positive weights
    /// mark the shape as malformed and it is not drawn.
    fn weight(&self) -> f32;
}

/// Straight segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Vector2,
    pub end: Vector2,
}

impl Line {
    pub fn new(start: Vector2, end: Vector2) -> Self {
        Self { start, end }
    }
}

impl Shape for Line {
    fn point_at(&self, t: f32) -> Vector2 {
        self.start.lerp(self.end, t)
    }

    fn weight(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// Elliptical arc, optionally rotated about its centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: Vector2,
    pub radius_x: f32,
    pub radius_y: f32,
    pub rotation: f32,
    pub start_angle: f32,
    pub sweep: f32,
}

impl Ellipse {
    /// Full circle starting at angle zero.
    pub fn circle(center: Vector2, radius: f32) -> Self {
        Self {
            center,
            radius_x: radius,
            radius_y: radius,
            rotation: 0.0,
            start_angle: 0.0,
            sweep: TAU,
        }
    }

    pub fn arc(center: Vector2, radius: f32, start_angle: f32, sweep: f32) -> Self {
        Self {
            start_angle,
            sweep,
            ..Self::circle(center, radius)
        }
    }
}

impl Shape for Ellipse {
    fn point_at(&self, t: f32) -> Vector2 {
        let angle = self.start_angle + self.sweep * t;
        let local = Vector2::new(self.radius_x * angle.cos(), self.radius_y * angle.sin());
        self.center + local.rotate(self.rotation)
    }

    fn weight(&self) -> f32 {
        // Ramanujan's perimeter approximation, scaled by the swept fraction
        let a = self.radius_x.abs();
        let b = self.radius_y.abs();
        let h = ((a - b) / (a + b)).powi(2);
        let perimeter = std::f32::consts::PI * (a + b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()));
        perimeter * (self.sweep.abs() / TAU)
    }
}

/// Cubic Bézier curve through `p0` and `p3` with control points `p1`, `p2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Vector2,
    pub p1: Vector2,
    pub p2: Vector2,
    pub p3: Vector2,
}

impl CubicBezier {
    pub fn new(p0: Vector2, p1: Vector2, p2: Vector2, p3: Vector2) -> Self {
        Self { p0, p1, p2, p3 }
    }
}

impl Shape for CubicBezier {
    fn point_at(&self, t: f32) -> Vector2 {
        let u = 1.0 - t;
        self.p0 * (u * u * u)
            + self.p1 * (3.0 * u * u * t)
            + self.p2 * (3.0 * u * t * t)
            + self.p3 * (t * t * t)
    }

    fn weight(&self) -> f32 {
        let mut length = 0.0;
        let mut previous = self.p0;
        for i in 1..=BEZIER_LENGTH_SEGMENTS {
            let point = self.point_at(i as f32 / BEZIER_LENGTH_SEGMENTS as f32);
            length += previous.distance(point);
            previous = point;
        }
        length
    }
}

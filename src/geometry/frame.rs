use std::{fmt, sync::Arc};

use crate::geometry::{
    shape::{Line, Shape},
    vector::Vector2,
};

/// One complete image: shapes traced in order.
///
/// Cloning is cheap; the shapes are shared so a source can hand out its
/// previous frame again whenever it has nothing new.
#[derive(Clone)]
pub struct Frame {
    shapes: Arc<[Box<dyn Shape>]>,
}

impl Frame {
    pub fn new(shapes: Vec<Box<dyn Shape>>) -> Self {
        Self {
            shapes: shapes.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Closed outline through `points`.
    pub fn from_polygon(points: &[Vector2]) -> Self {
        let shapes = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(&a, &b)| Box::new(Line::new(a, b)) as Box<dyn Shape>)
            .collect();
        Self::new(shapes)
    }

    pub fn shapes(&self) -> &[Box<dyn Shape>] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Sum of the weights of the drawable shapes.
    pub fn total_weight(&self) -> f32 {
        self.shapes
            .iter()
            .map(|shape| usable_weight(shape.as_ref()))
            .sum()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("shapes", &self.shapes.len())
            .finish()
    }
}

/// Weight of a shape, or zero if the shape is malformed.
pub(crate) fn usable_weight(shape: &dyn Shape) -> f32 {
    let weight = shape.weight();
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_closes() {
        let square = [
            Vector2::new(-1.0, -1.0),
            Vector2::new(1.0, -1.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(-1.0, 1.0),
        ];
        let frame = Frame::from_polygon(&square);
        assert_eq!(frame.len(), 4);
        assert!((frame.total_weight() - 8.0).abs() < 1e-5);
        let last = &frame.shapes()[3];
        assert_eq!(last.point_at(1.0), square[0]);
    }

    #[test]
    fn test_malformed_shapes_carry_no_weight() {
        struct Broken;
        impl Shape for Broken {
            fn point_at(&self, _t: f32) -> Vector2 {
                Vector2::ZERO
            }
            fn weight(&self) -> f32 {
                f32::NAN
            }
        }

        let frame = Frame::new(vec![
            Box::new(Broken),
            Box::new(Line::new(Vector2::ZERO, Vector2::new(2.0, 0.0))),
        ]);
        assert!((frame.total_weight() - 2.0).abs() < 1e-6);
    }
}
